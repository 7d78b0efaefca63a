//! Structured faults reported by the server or synthesized by the client.
//!
//! # Design
//! A fault on the wire is any JSON object tagged `"objectType": "Fault"`.
//! Server faults carry a server-assigned `code`; faults synthesized while
//! handling a response use the reserved `client::` codes below so callers
//! can tell "the server said no" apart from "the response was unusable".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of the `objectType` discriminator that marks a fault object.
pub const FAULT_OBJECT_TYPE: &str = "Fault";

/// Code of the fault produced when a non-void call gets no usable result.
pub const RESPONSE_TYPE_ERROR: &str = "client::response_type_error";

/// Code of the fault produced when unwrapping or deserialization fails.
pub const GENERAL_ERROR: &str = "client::general_error";

/// Which part of the taxonomy a fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    ResponseType,
    General,
    Server,
}

/// A named argument attached to a server fault, e.g. the id that was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultArg {
    pub name: String,
    pub value: String,
}

/// A structured error reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiFault {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<FaultArg>,
}

impl ApiFault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            args: Vec::new(),
        }
    }

    pub fn response_type_error(message: impl Into<String>) -> Self {
        Self::new(RESPONSE_TYPE_ERROR, message)
    }

    pub fn general_error(message: impl Into<String>) -> Self {
        Self::new(GENERAL_ERROR, message)
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(FaultArg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }

    pub fn kind(&self) -> FaultKind {
        match self.code.as_str() {
            RESPONSE_TYPE_ERROR => FaultKind::ResponseType,
            GENERAL_ERROR => FaultKind::General,
            _ => FaultKind::Server,
        }
    }

    /// Whether an untyped value carries the fault discriminator.
    pub fn is_tagged(value: &serde_json::Value) -> bool {
        value
            .get("objectType")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|object_type| object_type == FAULT_OBJECT_TYPE)
    }
}
