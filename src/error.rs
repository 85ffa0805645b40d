//! Error model for variable substitution, expression evaluation and
//! payload assertions.
//!
//! Every failure reaches the calling step unchanged. Nothing here is retried
//! or swallowed; the scenario runner decides whether a failing step aborts.

use std::path::PathBuf;

use crate::compare::Mismatch;

/// Result alias used throughout the crate.
pub type Result<T, E = VarsError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum VarsError {
    /// Relaxed JSON could not be downgraded or a stored value could not be
    /// encoded for substitution.
    #[error("template error: {reason}")]
    Template { reason: String },

    /// Malformed factory call, e.g. an unmatched parenthesis.
    #[error("syntax error in {expr:?}: {reason}")]
    Syntax { expr: String, reason: String },

    #[error("missing generator {0:?}")]
    UnknownGenerator(String),

    #[error("missing factory {0:?}")]
    UnknownFactory(String),

    #[error("generating value with {name:?}: {source}")]
    Generator {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("factory {name:?} failed: {source}")]
    Factory {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// An argument of a factory call could not be resolved.
    #[error("factory {factory:?} argument {index}: {source}")]
    FactoryArgument {
        factory: String,
        index: usize,
        #[source]
        source: Box<VarsError>,
    },

    #[error("decoding {input:?}: {source}")]
    Decode {
        input: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find variable {0}")]
    NotFound(String),

    #[error("variable {name} is defined with value {value}")]
    AlreadyDefined { name: String, value: String },

    #[error("invalid variable name {name:?}, expected {prefix} followed by word characters")]
    InvalidName { name: String, prefix: char },

    #[error("two columns expected in the table, {0} received")]
    InvalidTable(usize),

    #[error("json path {path}: {reason}")]
    JsonPath { path: String, reason: String },

    #[error("{0}")]
    Mismatch(Mismatch),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VarsError {
    pub(crate) fn template(reason: impl Into<String>) -> Self {
        Self::Template {
            reason: reason.into(),
        }
    }

    pub(crate) fn syntax(expr: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(input: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            input: input.to_string(),
            source,
        }
    }

    /// Rendered diff when this is a comparison failure.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Self::Mismatch(m) => Some(m),
            _ => None,
        }
    }
}
