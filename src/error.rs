//! Error types for Tabflow.
//!
//! All errors in Tabflow are represented by the `TabflowError` enum.
//! Node-local variants (`Parameter`, `ParameterValidation`, `NodeExecution`)
//! end up inside a node's result record; the structural variants
//! (`UnknownNodeType`, `Graph`, `CycleDetected`) are raised synchronously.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Tabflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum TabflowError {
    /// A parameter was read before any value or default was available.
    #[error("{0}")]
    Parameter(String),

    /// A parameter value violates its declared type, or a required value is missing.
    #[error("{0}")]
    ParameterValidation(String),

    /// A serialized node references a type key absent from the registry.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Structural violation of the graph (missing node, bad edge, bad file path).
    #[error("{0}")]
    Graph(String),

    /// The graph contains a cycle, so no execution order exists.
    #[error("{0}")]
    CycleDetected(String),

    /// Arity mismatch or failure inside a node's transform.
    #[error("{0}")]
    NodeExecution(String),

    /// Node registration errors (duplicate keys).
    #[error("{0}")]
    Registry(String),

    /// Engine-level errors (startup, run handling).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, CSV, etc.).
    #[error("{0}")]
    Convert(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl From<std::io::Error> for TabflowError {
    fn from(error: std::io::Error) -> Self {
        TabflowError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for TabflowError {
    fn from(error: serde_json::Error) -> Self {
        TabflowError::Convert(error.to_string())
    }
}

impl From<csv::Error> for TabflowError {
    fn from(error: csv::Error) -> Self {
        TabflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for TabflowError {
    fn from(error: toml::de::Error) -> Self {
        TabflowError::Config(error.to_string())
    }
}

impl From<globset::Error> for TabflowError {
    fn from(error: globset::Error) -> Self {
        TabflowError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_keep_message_and_class() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert_eq!(TabflowError::from(io), TabflowError::IoError("no such file".to_string()));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(TabflowError::from(json), TabflowError::Convert(_)));

        let toml = toml::from_str::<toml::Table>("a = ").unwrap_err();
        assert!(matches!(TabflowError::from(toml), TabflowError::Config(_)));
    }
}
