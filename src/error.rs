use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Contract violations raised by knowledge base and query operations.
///
/// None of these leave the knowledge base in a partially mutated state.
#[derive(Debug, Error)]
pub enum Error {
    /// A value that cannot name a predicate was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The predicate name is already registered, whatever its arity.
    #[error("predicate '{name}' is already defined")]
    DuplicatePredicate {
        /// Name that was being declared.
        name: String,
    },

    /// The predicate was never declared, or has been deleted.
    #[error("predicate '{name}' hasn't been defined")]
    UnknownPredicate {
        /// Name that was referenced.
        name: String,
    },

    /// Term count disagrees with the declared arity.
    #[error("arity mismatch for '{name}': expected {expected}, found {found}")]
    ArityMismatch {
        /// Predicate name.
        name: String,
        /// Declared arity.
        expected: usize,
        /// Number of terms supplied.
        found: usize,
    },

    /// `solve` was called on a goal without named variables.
    #[error("there are no variables to solve in goal for '{name}'")]
    NoVariablesToSolve {
        /// Predicate name of the goal.
        name: String,
    },

    /// Snapshot could not be encoded.
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
