//! # Canonical Bytes
//!
//! [`CanonicalBytes`] is the only input accepted by the digest functions in
//! [`crate::digest`]. Construction goes through `serde_json` and then RFC 8785
//! (JSON Canonicalization Scheme) via `serde_jcs`: sorted keys, compact
//! separators, one byte sequence per logical value.
//!
//! Floats are rejected. Concentrations serialize as decimal strings, so a
//! snapshot never reaches this module with a float in it unless a caller
//! bypassed [`crate::Concentration`].

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by JCS canonicalization of a float-free value.
///
/// The inner buffer is private; [`CanonicalBytes::new`] is the sole
/// constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// [`CanonicalizationError::FloatRejected`] if the value tree contains a
    /// non-integer number; [`CanonicalizationError::SerializationFailed`] if
    /// serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let text = serde_jcs::to_string(&value)?;
        Ok(Self(text.into_bytes()))
    }

    /// The canonical byte sequence.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => Err(CanonicalizationError::FloatRejected(f)),
            _ => Ok(()),
        },
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Concentration;

    #[test]
    fn keys_are_sorted_and_compact() {
        let data = serde_json::json!({"status": "prohibited", "category": "restricted", "id": 7});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"category":"restricted","id":7,"status":"prohibited"}"#
        );
    }

    #[test]
    fn nested_objects_are_sorted() {
        let data = serde_json::json!({"z": {"b": 1, "a": [2, 1]}, "a": null});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"a":null,"z":{"a":[2,1],"b":1}}"#
        );
    }

    #[test]
    fn floats_are_rejected_anywhere() {
        assert!(matches!(
            CanonicalBytes::new(&serde_json::json!({"limit": 0.2})),
            Err(CanonicalizationError::FloatRejected(_))
        ));
        assert!(CanonicalBytes::new(&serde_json::json!([[1, 2.5]])).is_err());
    }

    #[test]
    fn concentrations_canonicalize_as_strings() {
        let c = Concentration::from_percent_str("0.2").unwrap();
        let cb = CanonicalBytes::new(&serde_json::json!({ "limit": c })).unwrap();
        assert_eq!(std::str::from_utf8(cb.as_bytes()).unwrap(), r#"{"limit":"0.2"}"#);
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let cb = CanonicalBytes::new(&serde_json::json!({"name": "安息香酸"})).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"name":"安息香酸"}"#
        );
    }
}
