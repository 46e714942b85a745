//! Ordered, named rule chains.
//!
//! A [`Ruler`] keeps rules in insertion order, lets callers insert relative to
//! an existing rule and toggles rules on and off without removing them. Each
//! rule can also join alternate chains (for example `"paragraph"`, the rules
//! consulted when deciding whether a line interrupts a paragraph). Lists of
//! active rules per chain are rebuilt on every mutation.

use std::collections::HashMap;

use crate::error::RulerError;

/// Options attached to a rule at registration time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RuleOptions {
    /// Names of alternate chains the rule also belongs to.
    pub alt: Vec<String>,
}

impl RuleOptions {
    pub fn alt<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alt: chains.into_iter().map(Into::into).collect(),
        }
    }
}

struct Rule<F> {
    name: String,
    enabled: bool,
    func: F,
    alt: Vec<String>,
}

pub struct Ruler<F> {
    rules: Vec<Rule<F>>,
    // chain name -> indices into `rules`; "" is the main chain
    cache: HashMap<String, Vec<usize>>,
}

impl<F> Default for Ruler<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Ruler<F> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Appends a rule to the end of the chain.
    pub fn push(&mut self, name: &str, func: F, options: RuleOptions) -> Result<(), RulerError> {
        self.ensure_unique(name)?;
        self.rules.push(Rule::new(name, func, options));
        self.compile();
        Ok(())
    }

    /// Inserts a rule directly before `anchor`.
    pub fn before(
        &mut self,
        anchor: &str,
        name: &str,
        func: F,
        options: RuleOptions,
    ) -> Result<(), RulerError> {
        let index = self.find(anchor)?;
        self.ensure_unique(name)?;
        self.rules.insert(index, Rule::new(name, func, options));
        self.compile();
        Ok(())
    }

    /// Inserts a rule directly after `anchor`.
    pub fn after(
        &mut self,
        anchor: &str,
        name: &str,
        func: F,
        options: RuleOptions,
    ) -> Result<(), RulerError> {
        let index = self.find(anchor)?;
        self.ensure_unique(name)?;
        self.rules.insert(index + 1, Rule::new(name, func, options));
        self.compile();
        Ok(())
    }

    /// Replaces the function and options of an existing rule, keeping its position.
    pub fn at(&mut self, name: &str, func: F, options: RuleOptions) -> Result<(), RulerError> {
        let index = self.find(name)?;
        let rule = &mut self.rules[index];
        rule.func = func;
        rule.alt = options.alt;
        self.compile();
        Ok(())
    }

    /// Enables the named rules and returns the names that were found.
    pub fn enable(
        &mut self,
        names: &[&str],
        ignore_invalid: bool,
    ) -> Result<Vec<String>, RulerError> {
        self.set_enabled(names, true, ignore_invalid)
    }

    /// Disables the named rules and returns the names that were found.
    pub fn disable(
        &mut self,
        names: &[&str],
        ignore_invalid: bool,
    ) -> Result<Vec<String>, RulerError> {
        self.set_enabled(names, false, ignore_invalid)
    }

    /// Enables exactly the named rules and disables every other one.
    pub fn enable_only(
        &mut self,
        names: &[&str],
        ignore_invalid: bool,
    ) -> Result<Vec<String>, RulerError> {
        if !ignore_invalid {
            for name in names {
                self.find(name)?;
            }
        }
        for rule in &mut self.rules {
            rule.enabled = false;
        }
        self.set_enabled(names, true, ignore_invalid)
    }

    /// Active rules of a chain, in order. Unknown chains have no rules.
    pub fn get_rules(&self, chain: &str) -> Vec<&F> {
        self.cache
            .get(chain)
            .map(|indices| indices.iter().map(|&i| &self.rules[i].func).collect())
            .unwrap_or_default()
    }

    /// Names of all registered rules, enabled or not, in chain order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.name == name && rule.enabled)
    }

    fn set_enabled(
        &mut self,
        names: &[&str],
        enabled: bool,
        ignore_invalid: bool,
    ) -> Result<Vec<String>, RulerError> {
        let mut found = Vec::new();
        for name in names {
            match self.find(name) {
                Ok(index) => {
                    self.rules[index].enabled = enabled;
                    found.push((*name).to_string());
                }
                Err(err) if !ignore_invalid => {
                    self.compile();
                    return Err(err);
                }
                Err(_) => {}
            }
        }
        self.compile();
        Ok(found)
    }

    fn find(&self, name: &str) -> Result<usize, RulerError> {
        self.rules
            .iter()
            .position(|rule| rule.name == name)
            .ok_or_else(|| RulerError::UnknownRule {
                name: name.to_string(),
            })
    }

    fn ensure_unique(&self, name: &str) -> Result<(), RulerError> {
        if self.rules.iter().any(|rule| rule.name == name) {
            return Err(RulerError::DuplicateRule {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn compile(&mut self) {
        let mut chains = vec![String::new()];
        for rule in self.rules.iter().filter(|rule| rule.enabled) {
            for chain in &rule.alt {
                if !chains.contains(chain) {
                    chains.push(chain.clone());
                }
            }
        }

        self.cache.clear();
        for chain in chains {
            let indices = self
                .rules
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.enabled)
                .filter(|(_, rule)| chain.is_empty() || rule.alt.contains(&chain))
                .map(|(index, _)| index)
                .collect();
            self.cache.insert(chain, indices);
        }
    }
}

impl<F> Rule<F> {
    fn new(name: &str, func: F, options: RuleOptions) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            func,
            alt: options.alt,
        }
    }
}
