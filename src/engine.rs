use log::{debug, trace};
use smallvec::SmallVec;
use std::fmt;

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeBase;
use crate::term::{Term, Value};

/// Terms of a goal, inline for the common small arities.
type Terms = SmallVec<[Term; 4]>;

/// A goal: predicate name plus ordered terms (e.g. `parent(denethor, X)`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Goal {
    /// The name of the predicate being queried
    pub predicate: String,
    /// The classified arguments
    pub terms: SmallVec<[Term; 4]>,
}

impl Goal {
    /// Builds a goal, classifying every value once.
    ///
    /// ```rust
    /// use factlog::{Goal, Term};
    ///
    /// let goal = Goal::new("parent", ["denethor", "X"]);
    /// assert_eq!(goal.terms[1], Term::Variable("X".to_string()));
    /// ```
    pub fn new<I, V>(predicate: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::from_terms(
            predicate,
            values.into_iter().map(|value| Term::from_value(value.into())),
        )
    }

    /// Builds a goal from already tagged terms.
    pub fn from_terms(predicate: impl Into<String>, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms: terms.into_iter().collect(),
        }
    }

    /// Number of named (reported) variable positions.
    #[must_use]
    pub fn named_variables(&self) -> usize {
        self.terms
            .iter()
            .filter(|term| matches!(term, Term::Variable(_)))
            .count()
    }

    /// Number of anonymous variable positions.
    #[must_use]
    pub fn anonymous_variables(&self) -> usize {
        self.terms
            .iter()
            .filter(|term| matches!(term, Term::Anonymous))
            .count()
    }

    fn is_ground(&self) -> bool {
        !self.terms.iter().any(Term::is_variable)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str(")")
    }
}

/// Result of the combined [`KnowledgeBase::query`] entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryOutcome {
    /// Answer of a ground or existential check
    Definite(bool),
    /// `"Name = value"` bindings in discovery order, duplicates kept
    Bindings(Vec<String>),
}

impl QueryOutcome {
    /// True for `Definite(true)` or a non-empty binding list.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Definite(answer) => *answer,
            Self::Bindings(bindings) => !bindings.is_empty(),
        }
    }

    /// The bindings, empty for a definite answer.
    #[must_use]
    pub fn bindings(&self) -> &[String] {
        match self {
            Self::Definite(_) => &[],
            Self::Bindings(bindings) => bindings,
        }
    }
}

/// Backtracking search over the candidate domain of one predicate.
///
/// Each step binds the leftmost unbound position to every candidate in turn
/// and recurses on a fresh copy of the terms. Fully bound goals are checked
/// against the fact store. Repeated variable names are not unified: every
/// position is searched on its own.
struct Search<'a> {
    kb: &'a KnowledgeBase,
    predicate: &'a str,
    domain: Vec<Value>,
}

impl<'a> Search<'a> {
    fn new(kb: &'a KnowledgeBase, predicate: &'a str) -> Self {
        let domain = kb.domain_for(predicate);
        trace!("domain for {predicate}: {} candidates", domain.len());
        Self {
            kb,
            predicate,
            domain,
        }
    }

    /// Whether some assignment of the unbound positions is a stored fact.
    fn exists(&self, terms: &[Term]) -> bool {
        let Some(position) = first_unbound(terms) else {
            return self.kb.matches_fact(self.predicate, terms);
        };

        self.domain.iter().any(|candidate| {
            let next = substitute(terms, position, candidate);
            trace!("exists: trying position {position} = {candidate}");
            self.exists(&next)
        })
    }

    /// Appends a binding for every candidate of the leftmost unbound
    /// position that extends to a stored fact, each followed by the
    /// bindings of its suffix.
    fn enumerate(&self, terms: &[Term], bindings: &mut Vec<String>) {
        let Some(position) = first_unbound(terms) else {
            return;
        };
        let variable = match &terms[position] {
            Term::Variable(name) => Some(name.as_str()),
            Term::Anonymous | Term::Atom(_) => None,
        };
        let last = terms[position + 1..].iter().all(|term| !term.is_variable());

        for candidate in &self.domain {
            let next = substitute(terms, position, candidate);
            trace!("enumerate: trying position {position} = {candidate}");

            if last {
                if self.kb.matches_fact(self.predicate, &next) {
                    push_binding(bindings, variable, candidate);
                }
            } else if self.exists(&next) {
                push_binding(bindings, variable, candidate);
                self.enumerate(&next, bindings);
            }
        }
    }
}

fn first_unbound(terms: &[Term]) -> Option<usize> {
    terms.iter().position(Term::is_variable)
}

fn substitute(terms: &[Term], position: usize, value: &Value) -> Terms {
    terms
        .iter()
        .enumerate()
        .map(|(i, term)| {
            if i == position {
                Term::Atom(value.clone())
            } else {
                term.clone()
            }
        })
        .collect()
}

fn push_binding(bindings: &mut Vec<String>, variable: Option<&str>, value: &Value) {
    if let Some(name) = variable {
        bindings.push(format!("{name} = {value}"));
    }
}

impl KnowledgeBase {
    /// Fails unless the goal's predicate is declared with the goal's arity.
    fn check_goal(&self, goal: &Goal) -> Result<()> {
        self.check_arity(&goal.predicate, goal.terms.len())
    }

    /// Returns whether the goal holds.
    ///
    /// A ground goal is a direct membership test. Any variable, named or
    /// anonymous, turns it into an existential check over the predicate's
    /// domain. A predicate without facts is simply false.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPredicate`] or [`Error::ArityMismatch`].
    pub fn eval(&self, goal: &Goal) -> Result<bool> {
        self.check_goal(goal)?;
        debug!("eval {goal}");

        if goal.is_ground() {
            Ok(self.matches_fact(&goal.predicate, &goal.terms))
        } else {
            Ok(Search::new(self, &goal.predicate).exists(&goal.terms))
        }
    }

    /// Returns `"Name = value"` bindings for the goal's named variables.
    ///
    /// Anonymous positions are searched but never reported. No
    /// deduplication is performed.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPredicate`], [`Error::ArityMismatch`], or
    /// [`Error::NoVariablesToSolve`] when the goal has no named variables.
    pub fn solve(&self, goal: &Goal) -> Result<Vec<String>> {
        self.check_goal(goal)?;
        if goal.named_variables() == 0 {
            return Err(Error::NoVariablesToSolve {
                name: goal.predicate.clone(),
            });
        }
        debug!("solve {goal}");
        Ok(self.enumerate(goal))
    }

    /// Evaluates or solves the goal depending on its shape.
    ///
    /// Named variables yield [`QueryOutcome::Bindings`]; otherwise
    /// anonymous variables yield an existential check and a ground goal a
    /// membership test, both as [`QueryOutcome::Definite`].
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPredicate`] or [`Error::ArityMismatch`].
    pub fn query(&self, goal: &Goal) -> Result<QueryOutcome> {
        self.check_goal(goal)?;
        let named = goal.named_variables();
        let anonymous = goal.anonymous_variables();
        debug!("query {goal}: {named} named, {anonymous} anonymous");

        let outcome = if named > 0 {
            QueryOutcome::Bindings(self.enumerate(goal))
        } else if anonymous > 0 {
            QueryOutcome::Definite(Search::new(self, &goal.predicate).exists(&goal.terms))
        } else {
            QueryOutcome::Definite(self.matches_fact(&goal.predicate, &goal.terms))
        };
        Ok(outcome)
    }

    fn enumerate(&self, goal: &Goal) -> Vec<String> {
        let mut bindings = Vec::new();
        Search::new(self, &goal.predicate).enumerate(&goal.terms, &mut bindings);
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermKind;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn middle_earth() -> KnowledgeBase {
        init_logger();
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("parent", 2).unwrap();
        kb.declare_predicate("race", 2).unwrap();
        kb.declare_predicate("married", 2).unwrap();

        kb.assert_fact("parent", ["denethor", "faramir"]).unwrap();
        kb.assert_fact("parent", ["denethor", "boromir"]).unwrap();
        kb.assert_fact("race", ["'Gandalf'", "ainur"]).unwrap();
        kb.assert_fact("race", ["legolas", "elf"]).unwrap();
        kb.assert_fact("race", ["aragorn", "human"]).unwrap();
        kb
    }

    fn bindings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_ground_check() {
        let kb = middle_earth();

        assert!(kb.eval(&Goal::new("parent", ["denethor", "faramir"])).unwrap());
        assert!(!kb.eval(&Goal::new("parent", ["faramir", "denethor"])).unwrap());
        assert_eq!(
            kb.query(&Goal::new("race", ["legolas", "elf"])).unwrap(),
            QueryOutcome::Definite(true)
        );
    }

    #[test]
    fn test_existential_check_with_anonymous_variable() {
        let kb = middle_earth();

        assert_eq!(
            kb.query(&Goal::new("parent", ["denethor", "_"])).unwrap(),
            QueryOutcome::Definite(true)
        );
        assert_eq!(
            kb.query(&Goal::new("parent", ["legolas", "_"])).unwrap(),
            QueryOutcome::Definite(false)
        );
        assert_eq!(
            kb.query(&Goal::new("parent", ["?", "boromir"])).unwrap(),
            QueryOutcome::Definite(true)
        );
        assert_eq!(
            kb.query(&Goal::new("parent", ["_", "_"])).unwrap(),
            QueryOutcome::Definite(true)
        );
    }

    #[test]
    fn test_eval_treats_named_variables_existentially() {
        let kb = middle_earth();

        assert!(kb.eval(&Goal::new("parent", ["denethor", "Child"])).unwrap());
        assert!(!kb.eval(&Goal::new("parent", ["Who", "denethor"])).unwrap());
        assert!(kb.eval(&Goal::new("race", ["X", "Y"])).unwrap());
    }

    #[test]
    fn test_binding_enumeration() {
        let kb = middle_earth();

        let outcome = kb.query(&Goal::new("parent", ["denethor", "X"])).unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Bindings(bindings(&["X = faramir", "X = boromir"]))
        );
        assert!(outcome.is_success());

        assert_eq!(
            kb.solve(&Goal::new("parent", ["Father", "boromir"])).unwrap(),
            bindings(&["Father = denethor"])
        );
    }

    #[test]
    fn test_enumeration_without_match_is_empty() {
        let kb = middle_earth();

        let outcome = kb.query(&Goal::new("parent", ["legolas", "X"])).unwrap();
        assert_eq!(outcome, QueryOutcome::Bindings(Vec::new()));
        assert!(!outcome.is_success());
        assert!(outcome.bindings().is_empty());
    }

    #[test]
    fn test_enumeration_of_two_variables() {
        let kb = middle_earth();

        // the first position's binding precedes the bindings of its suffix
        assert_eq!(
            kb.solve(&Goal::new("parent", ["X", "Y"])).unwrap(),
            bindings(&["X = denethor", "Y = faramir", "Y = boromir"])
        );
    }

    #[test]
    fn test_anonymous_positions_are_not_reported() {
        let kb = middle_earth();

        assert_eq!(
            kb.solve(&Goal::new("parent", ["_", "Child"])).unwrap(),
            bindings(&["Child = faramir", "Child = boromir"])
        );
        assert_eq!(
            kb.solve(&Goal::new("race", ["Who", "?"])).unwrap(),
            bindings(&["Who = 'Gandalf'", "Who = legolas", "Who = aragorn"])
        );
    }

    #[test]
    fn test_quoted_atom_is_ground() {
        let kb = middle_earth();

        let quoted = Goal::new("race", ["'Gandalf'", "ainur"]);
        assert_eq!(quoted.terms[0].kind(), TermKind::Atom);
        assert_eq!(kb.query(&quoted).unwrap(), QueryOutcome::Definite(true));

        let bare = Goal::new("race", ["Gandalf", "ainur"]);
        assert_eq!(bare.terms[0].kind(), TermKind::NamedVariable);
        assert_eq!(
            kb.query(&bare).unwrap(),
            QueryOutcome::Bindings(bindings(&["Gandalf = 'Gandalf'"]))
        );
    }

    #[test]
    fn test_repeated_variable_is_not_unified() {
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("same", 2).unwrap();
        kb.assert_fact("same", ["a", "b"]).unwrap();
        kb.assert_fact("same", ["c", "c"]).unwrap();

        // each occurrence of X is searched independently
        assert_eq!(
            kb.solve(&Goal::new("same", ["X", "X"])).unwrap(),
            bindings(&["X = a", "X = b", "X = c", "X = c"])
        );
    }

    #[test]
    fn test_candidates_from_any_column_are_pruned() {
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("edge", 2).unwrap();
        kb.assert_fact("edge", ["a", "b"]).unwrap();
        kb.assert_fact("edge", ["b", "c"]).unwrap();

        assert_eq!(
            kb.solve(&Goal::new("edge", ["From", "c"])).unwrap(),
            bindings(&["From = b"])
        );
        assert!(!kb.eval(&Goal::new("edge", ["c", "_"])).unwrap());
    }

    #[test]
    fn test_non_text_atoms() {
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("age", 2).unwrap();
        kb.assert_fact("age", [Value::from("faramir"), Value::Integer(36)])
            .unwrap();
        kb.assert_fact("age", [Value::from("boromir"), Value::Integer(41)])
            .unwrap();

        let goal = Goal::from_terms("age", [Term::from("Who"), Term::from(41_i64)]);
        assert_eq!(kb.solve(&goal).unwrap(), bindings(&["Who = boromir"]));
        assert_eq!(
            kb.solve(&Goal::new("age", ["faramir", "Years"])).unwrap(),
            bindings(&["Years = 36"])
        );
    }

    #[test]
    fn test_predicate_without_facts_degrades() {
        let kb = middle_earth();

        assert!(!kb.eval(&Goal::new("married", ["aragorn", "arwen"])).unwrap());
        assert_eq!(
            kb.query(&Goal::new("married", ["aragorn", "_"])).unwrap(),
            QueryOutcome::Definite(false)
        );
        assert_eq!(
            kb.query(&Goal::new("married", ["aragorn", "X"])).unwrap(),
            QueryOutcome::Bindings(Vec::new())
        );
        assert!(kb.solve(&Goal::new("married", ["X", "Y"])).unwrap().is_empty());
    }

    #[test]
    fn test_variable_shaped_fact_never_matches() {
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("ring", 1).unwrap();
        kb.assert_fact("ring", ["One"]).unwrap();

        assert!(!kb.eval(&Goal::new("ring", ["_"])).unwrap());
        assert!(kb.solve(&Goal::new("ring", ["X"])).unwrap().is_empty());
        // only an explicitly tagged atom reaches it
        let tagged = Goal::from_terms("ring", [Term::Atom(Value::from("One"))]);
        assert!(kb.eval(&tagged).unwrap());
    }

    #[test]
    fn test_solve_requires_named_variables() {
        let kb = middle_earth();

        for values in [["_", "_"], ["denethor", "faramir"]] {
            let err = kb.solve(&Goal::new("parent", values)).unwrap_err();
            assert!(
                matches!(err, Error::NoVariablesToSolve { ref name } if name == "parent"),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn test_goal_validation() {
        let kb = middle_earth();

        let unknown = Goal::new("friend", ["frodo", "sam"]);
        assert!(matches!(kb.eval(&unknown), Err(Error::UnknownPredicate { .. })));
        assert!(matches!(kb.query(&unknown), Err(Error::UnknownPredicate { .. })));

        let wrong_arity = Goal::new("parent", ["X"]);
        assert!(matches!(
            kb.solve(&wrong_arity),
            Err(Error::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(kb.query(&wrong_arity), Err(Error::ArityMismatch { .. })));
    }

    #[test]
    fn test_assert_then_ground_query() {
        let mut kb = middle_earth();
        kb.assert_fact("married", ["aragorn", "arwen"]).unwrap();
        assert!(kb.eval(&Goal::new("married", ["aragorn", "arwen"])).unwrap());
    }

    #[test]
    fn test_delete_then_redeclare_forgets_facts() {
        let mut kb = middle_earth();
        assert!(kb.delete_predicate("parent", 2).unwrap());
        kb.declare_predicate("parent", 2).unwrap();

        assert!(!kb.eval(&Goal::new("parent", ["denethor", "faramir"])).unwrap());
        assert!(kb.solve(&Goal::new("parent", ["denethor", "X"])).unwrap().is_empty());
    }

    #[test]
    fn test_retract_then_query() {
        let mut kb = middle_earth();
        kb.assert_fact("parent", ["denethor", "faramir"]).unwrap();

        assert!(kb.retract_fact("parent", ["denethor", "faramir"]).unwrap());
        assert!(
            kb.eval(&Goal::new("parent", ["denethor", "faramir"])).unwrap(),
            "a duplicate remains"
        );
        assert!(kb.retract_fact("parent", ["denethor", "faramir"]).unwrap());
        assert!(!kb.eval(&Goal::new("parent", ["denethor", "faramir"])).unwrap());

        assert_eq!(
            kb.solve(&Goal::new("parent", ["denethor", "X"])).unwrap(),
            bindings(&["X = boromir"])
        );
    }

    #[test]
    fn test_clear_forgets_predicates() {
        let mut kb = middle_earth();
        kb.clear();
        assert!(matches!(
            kb.query(&Goal::new("parent", ["denethor", "_"])),
            Err(Error::UnknownPredicate { .. })
        ));
    }

    #[test]
    fn test_duplicate_facts_duplicate_nothing_in_single_position() {
        let mut kb = middle_earth();
        kb.assert_fact("parent", ["denethor", "faramir"]).unwrap();

        // the domain is a set, so one candidate per value
        assert_eq!(
            kb.solve(&Goal::new("parent", ["denethor", "X"])).unwrap(),
            bindings(&["X = faramir", "X = boromir"])
        );
    }

    #[test]
    fn test_three_positions() {
        let mut kb = KnowledgeBase::new();
        kb.declare_predicate("trio", 3).unwrap();
        kb.assert_fact("trio", ["a", "b", "c"]).unwrap();

        assert!(kb.eval(&Goal::new("trio", ["_", "_", "_"])).unwrap());
        assert_eq!(
            kb.solve(&Goal::new("trio", ["X", "_", "Z"])).unwrap(),
            bindings(&["X = a", "Z = c"])
        );
        assert_eq!(
            kb.solve(&Goal::new("trio", ["_", "Y", "_"])).unwrap(),
            bindings(&["Y = b"])
        );
    }

    #[test]
    fn test_goal_display_and_counts() {
        let goal = Goal::new("parent", ["X", "_", "denethor", "?"]);
        assert_eq!(goal.to_string(), "parent(X, _, denethor, _)");
        assert_eq!(goal.named_variables(), 1);
        assert_eq!(goal.anonymous_variables(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_outcome_serialization() {
        let outcome = QueryOutcome::Bindings(bindings(&["X = faramir"]));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({ "Bindings": ["X = faramir"] }));
    }
}
