use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Pipeline stage. Declaration order is board column order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    #[default]
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Closed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Lead,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Lead => "Lead",
            Stage::Qualified => "Qualified",
            Stage::Proposal => "Proposal",
            Stage::Negotiation => "Negotiation",
            Stage::Closed => "Closed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown stage {0:?}")]
pub struct ParseStageError(pub String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseStageError(value.to_string()))
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Stage as stored on a record.
///
/// The store is free-form text; anything outside the enumeration is kept
/// verbatim so boards can surface it instead of losing the deal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StageValue {
    Known(Stage),
    Unrecognized(String),
}

impl StageValue {
    pub fn known(&self) -> Option<Stage> {
        match self {
            StageValue::Known(stage) => Some(*stage),
            StageValue::Unrecognized(_) => None,
        }
    }

    pub fn is(&self, stage: Stage) -> bool {
        self.known() == Some(stage)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StageValue::Known(stage) => stage.as_str(),
            StageValue::Unrecognized(raw) => raw,
        }
    }
}

impl Default for StageValue {
    fn default() -> Self {
        StageValue::Unrecognized(String::new())
    }
}

impl From<Stage> for StageValue {
    fn from(stage: Stage) -> Self {
        StageValue::Known(stage)
    }
}

impl From<&str> for StageValue {
    fn from(raw: &str) -> Self {
        match raw.parse() {
            Ok(stage) => StageValue::Known(stage),
            Err(_) => StageValue::Unrecognized(raw.to_string()),
        }
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(StageValue::from).unwrap_or_default())
    }
}
