//! # Factlog
//!
//! A minimal in-memory fact database with a Prolog-like query interface.
//!
//! ## Features
//!
//! - Predicates with a fixed arity and ground facts stored under them
//! - Goals built from tagged terms: atoms, named variables, anonymous variables
//! - Ground checks, existential checks and binding enumeration
//!
//! ## Example
//!
//! ```rust
//! use factlog::{Goal, KnowledgeBase, QueryOutcome};
//!
//! let mut kb = KnowledgeBase::new();
//! kb.declare_predicate("parent", 2)?;
//! kb.assert_fact("parent", ["denethor", "faramir"])?;
//! kb.assert_fact("parent", ["denethor", "boromir"])?;
//!
//! assert!(kb.eval(&Goal::new("parent", ["denethor", "_"]))?);
//!
//! let outcome = kb.query(&Goal::new("parent", ["denethor", "X"]))?;
//! assert_eq!(
//!     outcome,
//!     QueryOutcome::Bindings(vec!["X = faramir".into(), "X = boromir".into()])
//! );
//! # Ok::<(), factlog::Error>(())
//! ```

/// Query evaluation over a knowledge base.
pub mod engine;
/// Error type shared by every fallible operation.
pub mod error;
/// Predicate registry, fact store and atom universe.
pub mod knowledge;
/// Values, terms and the term classifier.
pub mod term;

pub use engine::{Goal, QueryOutcome};
pub use error::{Error, Result};
pub use knowledge::{KnowledgeBase, PredicateInfo, Tuple};
pub use term::{classify, Term, TermKind, Value};
