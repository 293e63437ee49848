use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::fmt;

use crate::error::{Error, Result};
use crate::term::{classify, Term, TermKind, Value};

/// A stored fact's arguments.
pub type Tuple = Vec<Value>;

/// A registered predicate (e.g. `parent/2`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredicateInfo {
    /// The name of the predicate
    pub name: String,
    /// Number of arguments every fact of this predicate carries
    pub arity: usize,
}

impl fmt::Display for PredicateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Predicate registry, fact store and atom universe.
///
/// Every instance owns independent state. Queries live in [`crate::engine`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    /// Name -> arity, in declaration order
    predicates: IndexMap<String, usize>,
    /// Name -> stored tuples, in assertion order. Duplicates are kept.
    facts: IndexMap<String, Vec<Tuple>>,
    /// Every value ever asserted. Only grows until [`KnowledgeBase::clear`].
    atoms: IndexSet<Value>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every predicate, fact and atom.
    pub fn clear(&mut self) {
        debug!(
            "clearing {} predicates and {} atoms",
            self.predicates.len(),
            self.atoms.len()
        );
        self.predicates.clear();
        self.facts.clear();
        self.atoms.clear();
    }

    /// Register `name/arity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a blank name, [`Error::DuplicatePredicate`]
    /// if `name` is already registered with any arity.
    pub fn declare_predicate(&mut self, name: &str, arity: usize) -> Result<()> {
        validate_name(name)?;
        if self.predicates.contains_key(name) {
            return Err(Error::DuplicatePredicate {
                name: name.to_string(),
            });
        }
        debug!("declared predicate {name}/{arity}");
        self.predicates.insert(name.to_string(), arity);
        Ok(())
    }

    /// Returns whether `name` is registered with exactly `arity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a blank name.
    pub fn predicate_exists(&self, name: &str, arity: usize) -> Result<bool> {
        validate_name(name)?;
        Ok(self.predicates.get(name) == Some(&arity))
    }

    /// Delete `name/arity` together with all of its facts.
    ///
    /// Returns `false` without touching anything if `name` is registered
    /// with a different arity.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a blank name, [`Error::UnknownPredicate`]
    /// if `name` is not registered.
    pub fn delete_predicate(&mut self, name: &str, arity: usize) -> Result<bool> {
        validate_name(name)?;
        let declared = self.arity_of(name)?;
        if declared != arity {
            return Ok(false);
        }

        self.predicates.shift_remove(name);
        let dropped = self.facts.shift_remove(name).map_or(0, |facts| facts.len());
        debug!("deleted predicate {name}/{arity} and {dropped} facts");
        Ok(true)
    }

    /// Declared arity of `name`, if registered.
    #[must_use]
    pub fn predicate_arity(&self, name: &str) -> Option<usize> {
        self.predicates.get(name).copied()
    }

    /// Append a fact to `name`.
    ///
    /// Arguments are stored as given: a variable-shaped value is accepted and
    /// simply never matches a goal. Every argument joins the atom universe.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPredicate`] or [`Error::ArityMismatch`].
    pub fn assert_fact<I, V>(&mut self, name: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple: Tuple = args.into_iter().map(Into::into).collect();
        self.check_arity(name, tuple.len())?;

        self.atoms.extend(tuple.iter().cloned());
        debug!("asserted {}", FactDisplay(name, &tuple));
        self.facts.entry(name.to_string()).or_default().push(tuple);
        Ok(())
    }

    /// Remove the first stored fact equal to `args`.
    ///
    /// Returns `false` (and changes nothing) if any argument is
    /// variable-shaped or no equal fact is stored. The atom universe is
    /// never pruned.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPredicate`] or [`Error::ArityMismatch`].
    pub fn retract_fact<I, V>(&mut self, name: &str, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple: Tuple = args.into_iter().map(Into::into).collect();
        self.check_arity(name, tuple.len())?;

        if tuple.iter().any(|value| classify(value) != TermKind::Atom) {
            debug!("refusing pattern retraction of {}", FactDisplay(name, &tuple));
            return Ok(false);
        }

        let Some(stored) = self.facts.get_mut(name) else {
            return Ok(false);
        };
        let Some(position) = stored.iter().position(|fact| *fact == tuple) else {
            return Ok(false);
        };

        stored.remove(position);
        debug!("retracted {}", FactDisplay(name, &tuple));
        Ok(true)
    }

    /// Number of facts stored under `name` (0 if unknown).
    #[must_use]
    pub fn fact_count(&self, name: &str) -> usize {
        self.facts.get(name).map_or(0, Vec::len)
    }

    /// Candidate values for binding variables in goals against `name`.
    ///
    /// Every atom of the universe that occurs in any argument position of
    /// any fact of `name`, in universe order. Positions are not
    /// distinguished. Variable-shaped values stored by a loose assertion are
    /// left out, so they never bind. Empty if `name` has no facts.
    #[must_use]
    pub fn domain_for(&self, name: &str) -> Vec<Value> {
        let Some(stored) = self.facts.get(name) else {
            return Vec::new();
        };
        let present: IndexSet<&Value> = stored.iter().flatten().collect();

        self.atoms
            .iter()
            .filter(|atom| present.contains(atom) && classify(atom) == TermKind::Atom)
            .cloned()
            .collect()
    }

    /// Whether the fully bound `terms` equal some stored fact of `name`.
    ///
    /// Variables never match.
    pub(crate) fn matches_fact(&self, name: &str, terms: &[Term]) -> bool {
        self.facts.get(name).is_some_and(|stored| {
            stored.iter().any(|fact| {
                fact.len() == terms.len()
                    && fact.iter().zip(terms).all(|(value, term)| match term {
                        Term::Atom(atom) => atom == value,
                        Term::Variable(_) | Term::Anonymous => false,
                    })
            })
        })
    }

    /// Declared arity of `name`.
    fn arity_of(&self, name: &str) -> Result<usize> {
        self.predicate_arity(name)
            .ok_or_else(|| Error::UnknownPredicate {
                name: name.to_string(),
            })
    }

    /// Fails unless `name` is registered with arity `found`.
    pub(crate) fn check_arity(&self, name: &str, found: usize) -> Result<()> {
        let expected = self.arity_of(name)?;
        if expected == found {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                name: name.to_string(),
                expected,
                found,
            })
        }
    }

    /// Registered predicates in declaration order.
    #[must_use]
    pub fn predicates(&self) -> Vec<PredicateInfo> {
        self.predicates
            .iter()
            .map(|(name, &arity)| PredicateInfo {
                name: name.clone(),
                arity,
            })
            .collect()
    }

    /// Stored facts rendered as `name(arg1, arg2, ...)`.
    #[must_use]
    pub fn facts(&self) -> Vec<String> {
        self.facts
            .iter()
            .flat_map(|(name, stored)| {
                stored
                    .iter()
                    .map(move |tuple| FactDisplay(name, tuple).to_string())
            })
            .collect()
    }

    /// The atom universe in first-seen order.
    #[must_use]
    pub fn atoms(&self) -> Vec<Value> {
        self.atoms.iter().cloned().collect()
    }

    /// JSON snapshot of the registered predicates and stored facts.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] if encoding fails.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        #[derive(serde::Serialize)]
        struct Snapshot<'a> {
            predicates: Vec<PredicateInfo>,
            facts: &'a IndexMap<String, Vec<Tuple>>,
        }

        let snapshot = Snapshot {
            predicates: self.predicates(),
            facts: &self.facts,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(format!(
            "predicate name must not be blank, got {name:?}"
        )));
    }
    Ok(())
}

struct FactDisplay<'a>(&'a str, &'a [Value]);

impl fmt::Display for FactDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0)?;
        for (i, value) in self.1.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    if items.is_empty() {
        return f.write_str("[ ]");
    }
    f.write_str("[ ")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(" ]")
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---------------")?;
        f.write_str("Preds:\t")?;
        write_list(f, &self.predicates())?;
        f.write_str("\nFacts:\t")?;
        write_list(f, &self.facts())?;
        write!(f, "\n---------------")
    }
}
