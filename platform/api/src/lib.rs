use std::{collections::BTreeMap, fmt, sync::Arc};

use async_graphql::{Error, ErrorExtensions};
use entity::{DecodeError, RecordId};
use platform_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Shared result type for adapters and resolvers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: RecordId },
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("record store unavailable")]
    Store(Arc<anyhow::Error>),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Store(_) => "STORE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn not_found(entity: impl Into<String>, id: RecordId) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id,
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    /// Underlying cause for logs; never sent to clients.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Store(err) | ApiError::Internal(err) => format!("{err:#}"),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { table, id } => Self::NotFound { entity: table, id },
            other => Self::Store(Arc::new(other.into())),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(FieldErrors::from(&value))
    }
}

impl From<DecodeError> for ApiError {
    fn from(value: DecodeError) -> Self {
        Self::Validation(FieldErrors::from(&value))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::Validation(fields) = self {
            if let Ok(value) = async_graphql::to_value(fields) {
                err = err.extend_with(|_err, e| {
                    e.set("fields", value);
                });
            }
        }
        err
    }
}

/// Field name to first error message, keyed by the camelCase input name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.insert(field, message);
        errors
    }

    /// Keeps the first message recorded for a field.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0
            .entry(camel_case(&field.into()))
            .or_insert_with(|| message.into());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(value: &ValidationErrors) -> Self {
        let mut errors = Self::default();
        for (field, list) in value.field_errors() {
            if let Some(first) = list.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                errors.insert(field.to_string(), message);
            }
        }
        errors
    }
}

impl From<&DecodeError> for FieldErrors {
    fn from(value: &DecodeError) -> Self {
        Self::single(
            value.field.clone().unwrap_or_else(|| "record".into()),
            value.message.clone(),
        )
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
