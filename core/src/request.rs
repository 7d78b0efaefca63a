//! A single typed call and the handling of its response.
//!
//! # Design
//! `TypedRequest` is built once per logical call with the shape the caller
//! expects back. When the transport has a payload it calls
//! `handle_response`, which never fails: every problem with the payload is
//! folded into the fault slot of the returned `Outcome`. The same outcome is
//! pushed to the completion callback, if one is registered, so callers can
//! consume it either way. Callbacks must be `Send` so a request can be handed
//! to whichever thread runs the transport.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{self, ClientConfig};
use crate::envelope;
use crate::error::ParseError;
use crate::fault::ApiFault;
use crate::outcome::Outcome;
use crate::parser::{Deserialized, ObjectParser, ResponseParser, ResponseShape};

/// The service, action and parameters that identify a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    service: String,
    action: String,
    params: Map<String, Value>,
}

impl RequestParams {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

/// What the transport handed over for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// The transport produced nothing.
    Absent,
    /// An untyped JSON tree, possibly wrapped in an envelope.
    Json(Value),
    /// A fault the transport already built, e.g. when a batch failed as a
    /// whole and every call in it gets the same fault.
    Fault(ApiFault),
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        RawPayload::Json(value)
    }
}

impl From<Option<Value>> for RawPayload {
    fn from(value: Option<Value>) -> Self {
        value.map_or(RawPayload::Absent, RawPayload::Json)
    }
}

impl From<ApiFault> for RawPayload {
    fn from(fault: ApiFault) -> Self {
        RawPayload::Fault(fault)
    }
}

/// Completion handler invoked with the outcome of a call.
pub type Completion<T> = Box<dyn FnMut(&Outcome<T>) + Send>;

/// How a payload is to be turned into an outcome.
#[derive(Debug, PartialEq)]
enum Classified<'a> {
    Absent,
    FaultInstance(&'a ApiFault),
    FaultTagged(&'a Value),
    Typed(&'a Value),
}

fn classify(payload: &RawPayload, nested_response: bool) -> Classified<'_> {
    match payload {
        RawPayload::Absent => Classified::Absent,
        RawPayload::Fault(fault) => Classified::FaultInstance(fault),
        RawPayload::Json(value) => {
            let value = envelope::unwrap(value, nested_response);
            if value.is_null() {
                Classified::Absent
            } else if ApiFault::is_tagged(value) {
                Classified::FaultTagged(value)
            } else {
                Classified::Typed(value)
            }
        }
    }
}

pub struct TypedRequest<T, P = ObjectParser> {
    params: RequestParams,
    shape: ResponseShape,
    parser: P,
    callback: Option<Completion<T>>,
}

impl<T: DeserializeOwned> TypedRequest<T> {
    /// A request parsed by the default `ObjectParser`.
    pub fn new(params: RequestParams, shape: ResponseShape) -> Self {
        Self::with_parser(params, shape, ObjectParser)
    }
}

impl<T: DeserializeOwned, P: ResponseParser> TypedRequest<T, P> {
    pub fn with_parser(params: RequestParams, shape: ResponseShape, parser: P) -> Self {
        Self {
            params,
            shape,
            parser,
            callback: None,
        }
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    pub fn shape(&self) -> &ResponseShape {
        &self.shape
    }

    /// Replace the completion callback.
    pub fn on_complete(mut self, callback: impl FnMut(&Outcome<T>) + Send + 'static) -> Self {
        self.set_completion(callback);
        self
    }

    pub fn set_completion(
        &mut self,
        callback: impl FnMut(&Outcome<T>) + Send + 'static,
    ) -> &mut Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Handle a payload using the process-wide configuration.
    pub fn handle_response(&mut self, payload: impl Into<RawPayload>) -> Outcome<T> {
        let config = config::global();
        self.handle_response_with(&config, payload)
    }

    /// Turn `payload` into an outcome, notify the callback and return the
    /// outcome. Both the envelope mode and the parser settings come from
    /// `config`.
    pub fn handle_response_with(
        &mut self,
        config: &ClientConfig,
        payload: impl Into<RawPayload>,
    ) -> Outcome<T> {
        let payload = payload.into();
        tracing::debug!(
            service = %self.params.service,
            action = %self.params.action,
            shape = %self.shape,
            "handling response"
        );

        let resolved = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(config, &payload)));
        let outcome = match resolved {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => self.general_error(err.to_string()),
            Err(panic) => self.general_error(panic_message(&*panic)),
        };

        self.deliver(&outcome);
        outcome
    }

    fn resolve(&self, config: &ClientConfig, payload: &RawPayload) -> Result<Outcome<T>, ParseError> {
        let parsed = match classify(payload, config.response.nested_response) {
            Classified::Absent => Deserialized::Empty,
            Classified::FaultInstance(fault) => Deserialized::Fault(fault.clone()),
            Classified::FaultTagged(raw) => {
                match self
                    .parser
                    .parse_property::<ApiFault>("", &ResponseShape::fault(), raw, &config.parser)?
                {
                    Deserialized::Value(fault) | Deserialized::Fault(fault) => Deserialized::Fault(fault),
                    Deserialized::Empty => Deserialized::Empty,
                }
            }
            Classified::Typed(raw) => self.parser.parse_property("", &self.shape, raw, &config.parser)?,
        };

        Ok(match parsed {
            Deserialized::Value(result) => Outcome::success(result),
            Deserialized::Fault(fault) => Outcome::failure(fault),
            Deserialized::Empty if self.shape.is_void() => Outcome::empty(),
            Deserialized::Empty => Outcome::failure(ApiFault::response_type_error(format!(
                "server response is undefined, expected '{}'",
                self.shape
            ))),
        })
    }

    fn general_error(&self, message: String) -> Outcome<T> {
        tracing::warn!(
            service = %self.params.service,
            action = %self.params.action,
            error = %message,
            "failed to handle response"
        );
        Outcome::failure(ApiFault::general_error(message))
    }

    fn deliver(&mut self, outcome: &Outcome<T>) {
        let Some(callback) = self.callback.as_mut() else {
            return;
        };
        // Callback panics are logged and dropped; they never reach the caller.
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(outcome))) {
            tracing::warn!(
                service = %self.params.service,
                action = %self.params.action,
                panic = %panic_message(&*panic),
                "completion callback panicked"
            );
        }
    }
}

impl<T, P: fmt::Debug> fmt::Debug for TypedRequest<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRequest")
            .field("params", &self.params)
            .field("shape", &self.shape)
            .field("parser", &self.parser)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
