//! Typed records exchanged with the remote record store.
//!
//! Records arrive as loosely shaped JSON objects. Every entity here is decoded
//! and checked at that boundary so the rest of the workspace only ever sees
//! well-formed values.

pub mod activity;
pub mod codec;
pub mod contact;
pub mod deal;
pub mod money;
pub mod stage;
pub mod validation;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

pub use activity::{Activity, ActivityFields, ActivityForm, ActivityKind};
pub use contact::{Contact, ContactFields, ContactForm};
pub use deal::{Deal, DealFields, DealForm};
pub use money::Money;
pub use stage::{ParseStageError, Stage, StageValue};

/// Store-assigned record identifier.
pub type RecordId = i64;

/// Raw record as carried on the wire.
pub type Record = Map<String, Value>;

/// Key under which the store carries a record's identifier.
pub const ID_KEY: &str = "Id";

/// A record type persisted in one table of the remote store.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name on the remote store.
    const TABLE: &'static str;
    /// Human label used in notifications ("Deal", "Contact").
    const LABEL: &'static str;

    /// Client-writable fields, sent on create and on full-record update.
    type Fields: Serialize + Clone + Send + Sync + 'static;

    fn id(&self) -> RecordId;

    /// Snapshot of the writable fields, used for full-record replacement.
    fn fields(&self) -> Self::Fields;

    /// Invariants serde cannot express.
    fn check(&self) -> Result<(), DecodeError> {
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed {entity} record: {message}")]
pub struct DecodeError {
    pub entity: &'static str,
    pub field: Option<String>,
    pub message: String,
}

impl DecodeError {
    pub fn new(entity: &'static str, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Decode one raw store record into a typed entity.
pub fn decode<E: Entity>(record: Record) -> Result<E, DecodeError> {
    let entity: E = serde_json::from_value(Value::Object(record)).map_err(|err| {
        let message = err.to_string();
        DecodeError {
            entity: E::LABEL,
            field: field_from_message(&message),
            message,
        }
    })?;
    entity.check()?;
    Ok(entity)
}

/// Encode client-writable fields into a raw record.
pub fn encode<F: Serialize>(fields: &F) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected an object, found {other}"
        ))),
    }
}

// serde reports the offending key between backticks ("missing field `title`").
fn field_from_message(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    let name = &message[start..start + len];
    let is_key = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_key.then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let err = decode::<Deal>(record(json!({
            "Id": 4,
            "title": "Renewal",
            "stage": "Lead"
        })))
        .unwrap_err();
        assert_eq!(err.entity, "Deal");
        assert_eq!(err.field.as_deref(), Some("contactId"));
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&42).is_err());
        let map = encode(&json!({ "title": "x" })).unwrap();
        assert_eq!(map.get("title"), Some(&json!("x")));
    }

    #[test]
    fn field_extraction_ignores_non_keys() {
        assert_eq!(field_from_message("invalid type: `a b`"), None);
        assert_eq!(
            field_from_message("missing field `firstName`").as_deref(),
            Some("firstName")
        );
    }
}
