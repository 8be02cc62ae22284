use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::{Validate, ValidationErrors};

use crate::{
    Entity, RecordId, codec,
    validation::{field_error, not_blank, trimmed},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Call,
    Email,
    Meeting,
    #[default]
    Note,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::Call,
        ActivityKind::Email,
        ActivityKind::Meeting,
        ActivityKind::Note,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Call => "Call",
            ActivityKind::Email => "Email",
            ActivityKind::Meeting => "Meeting",
            ActivityKind::Note => "Note",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        ActivityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown activity type {value:?}"))
    }
}

impl Serialize for ActivityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub contact_id: RecordId,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
    pub subject: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "codec::timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "codec::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Activity {
    const TABLE: &'static str = "activities";
    const LABEL: &'static str = "Activity";

    type Fields = ActivityFields;

    fn id(&self) -> RecordId {
        self.id
    }

    fn fields(&self) -> ActivityFields {
        ActivityFields {
            kind: self.kind,
            contact_id: self.contact_id,
            deal_id: self.deal_id,
            subject: self.subject.clone(),
            notes: self.notes.clone(),
            date: self.date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFields {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub contact_id: RecordId,
    pub deal_id: Option<RecordId>,
    pub subject: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityForm {
    #[serde(rename = "type")]
    pub kind: Option<ActivityKind>,
    #[validate(required(message = "Contact is required"))]
    pub contact_id: Option<RecordId>,
    pub deal_id: Option<RecordId>,
    #[validate(custom(function = "not_blank", message = "Subject is required"))]
    pub subject: String,
    pub notes: Option<String>,
}

impl ActivityForm {
    /// Logged activities are stamped with the moment they are recorded.
    pub fn into_fields(self, now: DateTime<Utc>) -> Result<ActivityFields, ValidationErrors> {
        self.validate()?;
        let contact_id = self
            .contact_id
            .ok_or_else(|| field_error("contact_id", "required", "Contact is required"))?;
        Ok(ActivityFields {
            kind: self.kind.unwrap_or_default(),
            contact_id,
            deal_id: self.deal_id,
            subject: self.subject.trim().to_string(),
            notes: trimmed(self.notes),
            date: now,
        })
    }
}
