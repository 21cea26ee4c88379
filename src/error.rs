//! Error types for store construction and mutation.

/// Errors raised by the store engine.
///
/// User actions report their own failures through `anyhow::Error`; those
/// never pass through this type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The options passed to `define_store` carried no state factory.
    #[error("store {store:?} has no state factory")]
    MissingStateFactory {
        /// Name of the store being defined.
        store: String,
    },

    /// A typed value was expected to serialize to a record but did not.
    #[error("expected a record (JSON object), found {found}")]
    NotARecord {
        /// Kind of value actually produced.
        found: &'static str,
    },

    /// Converting between typed values and state records failed.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No action with the given name is bound on the store.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A nested proxy write targeted a parent that is missing or not a record.
    #[error("cannot write through {path}: parent is not an object")]
    NotAnObject {
        /// Dotted path to the parent that failed to resolve.
        path: String,
    },
}

/// Names the JSON kind of a value for error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
