//! Error taxonomy for a generation run.
//!
//! Every variant is fatal to the run. The four pipeline variants carry a
//! [`Location`] so a failure can be traced back to a layer, a neuron, or a
//! dialect.

use std::fmt;
use std::path::PathBuf;

use crate::emit::Dialect;

/// Where in the model (or in which output dialect) a failure happened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub layer: Option<usize>,
    pub neuron: Option<usize>,
    pub dialect: Option<Dialect>,
}

impl Location {
    pub fn model() -> Self {
        Self::default()
    }

    pub fn layer(layer: usize) -> Self {
        Self {
            layer: Some(layer),
            ..Self::default()
        }
    }

    pub fn neuron(layer: usize, neuron: usize) -> Self {
        Self {
            layer: Some(layer),
            neuron: Some(neuron),
            dialect: None,
        }
    }

    pub fn dialect(dialect: Dialect) -> Self {
        Self {
            dialect: Some(dialect),
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layer.is_none() && self.neuron.is_none() && self.dialect.is_none()
    }
}

/// Renders as ` (layer 1, neuron 3, vhdl)` or nothing when empty.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(layer) = self.layer {
            parts.push(format!("layer {}", layer));
        }
        if let Some(neuron) = self.neuron {
            parts.push(format!("neuron {}", neuron));
        }
        if let Some(dialect) = self.dialect {
            parts.push(dialect.name().to_string());
        }
        write!(f, " ({})", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Malformed or inconsistent layer shapes.
    #[error("structure error{at}: {message}")]
    Structure { at: Location, message: String },

    /// A neuron's truth table is not a total function over its input domain.
    #[error("incomplete truth table{at}: {message}")]
    TableIncomplete { at: Location, message: String },

    /// An IR reference does not resolve.
    #[error("wiring error{at}: {message}")]
    Wiring { at: Location, message: String },

    /// A dialect-specific constraint is violated.
    #[error("emission error{at}: {message}")]
    Emission { at: Location, message: String },

    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model file at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type GenResult<T> = Result<T, GenError>;

impl GenError {
    pub fn structure(at: Location, message: impl Into<String>) -> Self {
        GenError::Structure {
            at,
            message: message.into(),
        }
    }

    pub fn table(at: Location, message: impl Into<String>) -> Self {
        GenError::TableIncomplete {
            at,
            message: message.into(),
        }
    }

    pub fn wiring(at: Location, message: impl Into<String>) -> Self {
        GenError::Wiring {
            at,
            message: message.into(),
        }
    }

    pub fn emission(at: Location, message: impl Into<String>) -> Self {
        GenError::Emission {
            at,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }

    /// The location attached to a pipeline error, if any.
    pub fn location(&self) -> Option<Location> {
        match self {
            GenError::Structure { at, .. }
            | GenError::TableIncomplete { at, .. }
            | GenError::Wiring { at, .. }
            | GenError::Emission { at, .. } => Some(*at),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GenError {
    fn from(e: serde_json::Error) -> Self {
        GenError::Parse {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}
