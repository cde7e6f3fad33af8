//! Reduction of the upstream response shape to one canonical measurement object.
//!
//! The nearest-measurement endpoint has been observed answering with a bare
//! object, a list of objects ordered by distance, or a `{ "data": ... }`
//! envelope. Each layer is decoded into a [`Payload`] variant and peeled off
//! until a canonical object (or nothing usable) remains.

use serde_json::{Map, Value};

/// Field name of the envelope wrapper.
pub const ENVELOPE_FIELD: &str = "data";

// ---

/// One decoded layer of a response.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// `null`, booleans, numbers and strings. Never a measurement.
    Scalar,
    /// A result list; only the first (closest) element is consulted.
    Sequence(&'a [Value]),
    /// An object wrapping the real payload under [`ENVELOPE_FIELD`].
    Envelope(&'a Value),
    /// Already the canonical measurement object.
    Canonical(&'a Map<String, Value>),
}

impl<'a> Payload<'a> {
    /// Classify a single layer without descending into it.
    pub fn decode(value: &'a Value) -> Self {
        // ---
        match value {
            Value::Array(items) => Payload::Sequence(items),
            Value::Object(map) => match map.get(ENVELOPE_FIELD) {
                Some(inner) if is_truthy(inner) => Payload::Envelope(inner),
                _ => Payload::Canonical(map),
            },
            _ => Payload::Scalar,
        }
    }
}

/// Unwrap `value` down to its canonical object, or `None` for "no data".
///
/// Descent is bounded by the nesting depth of the document, so this always
/// terminates on a finite JSON tree.
pub fn normalize(value: &Value) -> Option<&Map<String, Value>> {
    // ---
    let mut layer = value;
    loop {
        match Payload::decode(layer) {
            Payload::Scalar => return None,
            Payload::Sequence(items) => layer = items.first()?,
            Payload::Envelope(inner) => layer = inner,
            Payload::Canonical(map) => return Some(map),
        }
    }
}

/// An envelope whose payload is empty-ish (`null`, `false`, `0`, `""`) is
/// not treated as a wrapper.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
