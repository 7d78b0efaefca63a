//! Typed response handling for an RPC style API client.
//!
//! # Overview
//! Takes whatever the transport received for one call, strips the `result` /
//! `error` envelope, decides whether it is a result or a fault, builds the
//! typed value and hands the `Outcome` to the caller's completion callback.
//! The core never touches the network; the caller owns the round-trip.
//!
//! # Design
//! - `TypedRequest<T>` carries the expected `ResponseShape` and the callback.
//!   `handle_response` never fails: unusable payloads become faults.
//! - Building typed values is delegated to a `ResponseParser`; the default
//!   `ObjectParser` uses serde.
//! - Whether envelopes are present is a deployment setting, read from the
//!   process-wide `ClientConfig` on every call.

pub mod config;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod outcome;
pub mod parser;
pub mod request;

pub use config::ClientConfig;
pub use envelope::Envelope;
pub use error::{ConfigError, ParseError};
pub use fault::{ApiFault, FaultKind, FAULT_OBJECT_TYPE};
pub use outcome::Outcome;
pub use parser::{Deserialized, ObjectParser, ResponseParser, ResponseShape, ResponseType};
pub use request::{RawPayload, RequestParams, TypedRequest};
