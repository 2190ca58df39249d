//! Stochastic, context-sensitive string rewriting over the road alphabet.
//!
//! A [`RuleSet`] is an ordered list of [`ProductionRule`]s. For every symbol the rules
//! are scanned in order and the first rule that matches the symbol, satisfies its
//! [`RuleCondition`] *and* wins its own independent probability draw is applied.
//! Rules are not weighted against each other: a later rule only gets a chance when
//! every earlier candidate failed its draw.
//!
//! [`GrammarEngine`] keeps rule sets by name and comes with the built-in [`Pattern`]s.

use crate::error::{Result, RoadError};
use crate::turtle::RoadOp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Default upper bound on the length of any intermediate string.
pub const DEFAULT_MAX_SYMBOLS: usize = 250_000;

/// Extra requirement a rule places on where and when it applies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RuleCondition {
    #[default]
    Always,
    /// The symbol's window (itself plus its left and right neighbours, clipped to the
    /// string) contains this run of symbols.
    ContextMatches(String),
    /// The zero-based rewriting round is at least this value.
    IterationAtLeast(u32),
}

impl RuleCondition {
    pub fn holds(&self, window: &[char], iteration: u32) -> bool {
        match self {
            Self::Always => true,
            Self::ContextMatches(pattern) => {
                let n = pattern.chars().count();
                n == 0
                    || window
                        .windows(n)
                        .any(|run| run.iter().copied().eq(pattern.chars()))
            }
            Self::IterationAtLeast(min) => iteration >= *min,
        }
    }
}

/// A single production: `predecessor -> successor` with a firing probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub predecessor: char,
    pub successor: String,
    pub probability: f64,
    #[serde(default)]
    pub condition: RuleCondition,
}

impl ProductionRule {
    pub fn new(predecessor: char, successor: impl Into<String>, probability: f64) -> Self {
        Self {
            predecessor,
            successor: successor.into(),
            probability,
            condition: RuleCondition::Always,
        }
    }

    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Draws whether this rule fires. Certain outcomes consume no randomness.
    fn fires<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.probability >= 1.0 {
            true
        } else if self.probability <= 0.0 {
            false
        } else {
            rng.random::<f64>() < self.probability
        }
    }
}

/// A named, ordered list of production rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<ProductionRule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<ProductionRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// Checks that every symbol the rules mention belongs to the road alphabet and
    /// every probability lies in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RoadError::EmptyRuleSetName);
        }
        let invalid_symbol = |symbol| RoadError::InvalidSymbol {
            ruleset: self.name.clone(),
            symbol,
        };

        for rule in &self.rules {
            if !RoadOp::is_symbol(rule.predecessor) {
                return Err(invalid_symbol(rule.predecessor));
            }
            if let Some(bad) = rule.successor.chars().find(|c| !RoadOp::is_symbol(*c)) {
                return Err(invalid_symbol(bad));
            }
            if let RuleCondition::ContextMatches(pattern) = &rule.condition
                && let Some(bad) = pattern.chars().find(|c| !RoadOp::is_symbol(*c))
            {
                return Err(invalid_symbol(bad));
            }
            if !(0.0..=1.0).contains(&rule.probability) {
                return Err(RoadError::InvalidProbability {
                    ruleset: self.name.clone(),
                    probability: rule.probability,
                });
            }
        }
        Ok(())
    }

    /// Picks the rule to apply to `symbol`, or `None` to copy it unchanged.
    fn select<R: Rng + ?Sized>(
        &self,
        symbol: char,
        window: &[char],
        iteration: u32,
        rng: &mut R,
    ) -> Option<&ProductionRule> {
        self.rules
            .iter()
            .filter(|rule| rule.predecessor == symbol && rule.condition.holds(window, iteration))
            .find(|rule| rule.fires(rng))
    }

    /// Rewrites `axiom` for `iterations` rounds.
    ///
    /// Fails with [`RoadError::GenerationTooLarge`] as soon as a string grows past
    /// `max_symbols`, instead of exhausting memory on explosive rule sets.
    pub fn rewrite<R: Rng + ?Sized>(
        &self,
        axiom: &str,
        iterations: u32,
        max_symbols: usize,
        rng: &mut R,
    ) -> Result<String> {
        let mut current: Vec<char> = axiom.chars().collect();
        if current.len() > max_symbols {
            return Err(RoadError::GenerationTooLarge {
                symbols: current.len(),
                limit: max_symbols,
                iteration: 0,
            });
        }

        for iteration in 0..iterations {
            let mut next = Vec::with_capacity(current.len() * 2);
            for (i, &symbol) in current.iter().enumerate() {
                let window = &current[i.saturating_sub(1)..(i + 2).min(current.len())];
                match self.select(symbol, window, iteration, rng) {
                    Some(rule) => next.extend(rule.successor.chars()),
                    None => next.push(symbol),
                }
                if next.len() > max_symbols {
                    return Err(RoadError::GenerationTooLarge {
                        symbols: next.len(),
                        limit: max_symbols,
                        iteration,
                    });
                }
            }
            debug!(ruleset = %self.name, iteration, symbols = next.len(), "rewrite round");
            current = next;
        }

        Ok(current.into_iter().collect())
    }
}

/// The built-in city layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Grid,
    Organic,
    Suburban,
    Highway,
    Downtown,
}

impl Pattern {
    pub const ALL: [Pattern; 5] = [
        Self::Grid,
        Self::Organic,
        Self::Suburban,
        Self::Highway,
        Self::Downtown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Organic => "organic",
            Self::Suburban => "suburban",
            Self::Highway => "highway",
            Self::Downtown => "downtown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Starting string used when the caller supplies no axiom.
    pub fn default_axiom(self) -> &'static str {
        match self {
            Self::Grid => "R+R+R+R",
            Self::Organic => "R~R[+R~R]-R~R",
            Self::Suburban => "R[+R.]R[-R.]R",
            Self::Highway => "H~H[+R]H~H",
            Self::Downtown => "R+R+R+R[-R+R+R]",
        }
    }

    /// The production rules that give this pattern its character.
    pub fn rule_set(self) -> RuleSet {
        use RuleCondition::{ContextMatches, IterationAtLeast};
        let rules = match self {
            // Straight blocks that sprout perpendicular side streets.
            Self::Grid => vec![
                ProductionRule::new('R', "R[+R]R", 0.25),
                ProductionRule::new('R', "R[-R]R", 0.25),
                ProductionRule::new('R', "RR", 0.2).when(IterationAtLeast(1)),
            ],
            // Meandering streets; branches only grow out of longer straight runs.
            Self::Organic => vec![
                ProductionRule::new('R', "R[+R~R]R", 0.3).when(ContextMatches("RRR".into())),
                ProductionRule::new('R', "R~R", 0.4),
                ProductionRule::new('R', "R[-R~R]R", 0.2),
                ProductionRule::new('~', "~~", 0.1),
            ],
            // Collector roads lined with cul-de-sacs.
            Self::Suburban => vec![
                ProductionRule::new('R', "R[+R.]R", 0.35),
                ProductionRule::new('R', "R[-R.]R", 0.35).when(IterationAtLeast(1)),
                ProductionRule::new('.', "R.", 0.3).when(IterationAtLeast(2)),
            ],
            // Long highway runs with occasional local exits.
            Self::Highway => vec![
                ProductionRule::new('H', "H[+R]H", 0.2).when(ContextMatches("HH".into())),
                ProductionRule::new('H', "H[-R]H", 0.2).when(ContextMatches("HH".into())),
                ProductionRule::new('H', "HH", 0.3),
                ProductionRule::new('R', "RR", 0.3),
            ],
            // Dense, short blocks.
            Self::Downtown => vec![
                ProductionRule::new('R', "R[+R]R[-R]R", 0.3),
                ProductionRule::new('R', "R+R-R", 0.2),
            ],
        };
        RuleSet::new(self.name(), rules)
    }
}

/// Registry of named rule sets with a growth limit.
#[derive(Clone, Debug)]
pub struct GrammarEngine {
    rulesets: HashMap<String, RuleSet>,
    max_symbols: usize,
}

impl Default for GrammarEngine {
    /// An engine with every built-in [`Pattern`] registered.
    fn default() -> Self {
        let mut engine = Self::empty();
        for pattern in Pattern::ALL {
            let ruleset = pattern.rule_set();
            debug_assert!(
                ruleset.validate().is_ok(),
                "built-in rule set {} is invalid",
                ruleset.name
            );
            engine.rulesets.insert(ruleset.name.clone(), ruleset);
        }
        engine
    }
}

impl GrammarEngine {
    /// An engine without any rule sets. Until one named `grid` is registered,
    /// unknown pattern names rewrite nothing.
    pub fn empty() -> Self {
        Self {
            rulesets: HashMap::new(),
            max_symbols: DEFAULT_MAX_SYMBOLS,
        }
    }

    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols;
        self
    }

    pub fn max_symbols(&self) -> usize {
        self.max_symbols
    }

    /// Validates and registers `ruleset`, replacing any rule set with the same name.
    pub fn register(&mut self, ruleset: RuleSet) -> Result<()> {
        ruleset.validate()?;
        debug!(name = %ruleset.name, rules = ruleset.rules.len(), "registered rule set");
        self.rulesets.insert(ruleset.name.clone(), ruleset);
        Ok(())
    }

    pub fn ruleset(&self, name: &str) -> Option<&RuleSet> {
        self.rulesets.get(name)
    }

    /// Looks up `pattern`, falling back to the `grid` rule set for unknown names.
    pub fn resolve(&self, pattern: &str) -> Option<&RuleSet> {
        self.rulesets.get(pattern).or_else(|| {
            debug!(pattern, "unknown pattern, falling back to grid");
            self.rulesets.get(Pattern::Grid.name())
        })
    }

    /// Rewrites `axiom` with the rule set registered as `pattern`.
    pub fn rewrite<R: Rng + ?Sized>(
        &self,
        axiom: &str,
        pattern: &str,
        iterations: u32,
        rng: &mut R,
    ) -> Result<String> {
        match self.resolve(pattern) {
            Some(ruleset) => ruleset.rewrite(axiom, iterations, self.max_symbols, rng),
            None => RuleSet::new(pattern, Vec::new()).rewrite(
                axiom,
                iterations,
                self.max_symbols,
                rng,
            ),
        }
    }
}
