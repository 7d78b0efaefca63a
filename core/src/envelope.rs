//! Envelope shapes a transport may wrap around a result or a fault.
//!
//! # Design
//! Multi-call transports wrap every response as `{"result": ..}` or
//! `{"error": ..}`, and report a failed call inside a batch as
//! `{"result": {"error": ..}}`. `Envelope::classify` matches a payload
//! against those shapes in a fixed priority order; anything else is `Raw`.

use std::fmt;

use serde_json::Value;

/// A payload matched against the known envelope shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    /// `{"result": {"error": E}}`, a fault reported inside a batch.
    NestedError(&'a Value),
    /// `{"result": R}`. `R` may be `null`.
    Result(&'a Value),
    /// `{"error": E}` with no `result` key.
    Error(&'a Value),
    /// No envelope.
    Raw(&'a Value),
}

impl<'a> Envelope<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        let Some(fields) = payload.as_object() else {
            return Envelope::Raw(payload);
        };
        if let Some(result) = fields.get("result") {
            if let Some(error) = result.as_object().and_then(|inner| inner.get("error")) {
                return Envelope::NestedError(error);
            }
            return Envelope::Result(result);
        }
        if let Some(error) = fields.get("error") {
            return Envelope::Error(error);
        }
        Envelope::Raw(payload)
    }

    /// The value the envelope carries.
    pub fn payload(self) -> &'a Value {
        match self {
            Envelope::NestedError(value)
            | Envelope::Result(value)
            | Envelope::Error(value)
            | Envelope::Raw(value) => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Envelope::NestedError(_) => "nested_error",
            Envelope::Result(_) => "result",
            Envelope::Error(_) => "error",
            Envelope::Raw(_) => "raw",
        }
    }
}

impl fmt::Display for Envelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value to parse: the envelope's content in nested-response mode, the
/// payload itself otherwise.
pub fn unwrap(payload: &Value, nested_response: bool) -> &Value {
    if !nested_response {
        return payload;
    }
    let envelope = Envelope::classify(payload);
    tracing::debug!(envelope = %envelope, "unwrapped response envelope");
    envelope.payload()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_error_takes_priority() {
        let payload = json!({"result": {"error": {"code": "X"}}});
        assert_eq!(
            Envelope::classify(&payload),
            Envelope::NestedError(&json!({"code": "X"}))
        );
    }

    #[test]
    fn result_envelope() {
        let payload = json!({"result": {"objectType": "Item", "id": 5}});
        let envelope = Envelope::classify(&payload);
        assert_eq!(envelope.name(), "result");
        assert_eq!(envelope.payload(), &json!({"objectType": "Item", "id": 5}));
    }

    #[test]
    fn null_result_is_still_a_result_envelope() {
        let payload = json!({"result": null});
        assert_eq!(Envelope::classify(&payload), Envelope::Result(&Value::Null));
    }

    #[test]
    fn scalar_result_is_not_searched_for_errors() {
        let payload = json!({"result": "error"});
        assert_eq!(Envelope::classify(&payload), Envelope::Result(&json!("error")));
    }

    #[test]
    fn error_envelope() {
        let payload = json!({"error": {"code": "X"}});
        assert_eq!(Envelope::classify(&payload), Envelope::Error(&json!({"code": "X"})));
    }

    #[test]
    fn result_beats_sibling_error() {
        let payload = json!({"result": 1, "error": {"code": "X"}});
        assert_eq!(Envelope::classify(&payload), Envelope::Result(&json!(1)));
    }

    #[test]
    fn anything_else_is_raw() {
        for payload in [json!({"id": 5}), json!([1, 2]), json!("ok"), Value::Null] {
            assert_eq!(Envelope::classify(&payload), Envelope::Raw(&payload));
        }
    }

    #[test]
    fn unwrap_is_identity_when_nested_mode_is_off() {
        let payload = json!({"result": {"error": {"code": "X"}}});
        assert_eq!(unwrap(&payload, false), &payload);
        assert_eq!(unwrap(&payload, true), &json!({"code": "X"}));
    }
}
