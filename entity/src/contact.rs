use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    Entity, RecordId, codec,
    validation::{not_blank, trimmed},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub company: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "codec::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "codec::optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "Ada Lovelace - Analytical Engines", as shown in contact pickers.
    pub fn label(&self) -> String {
        format!("{} - {}", self.full_name(), self.company)
    }
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";
    const LABEL: &'static str = "Contact";

    type Fields = ContactFields;

    fn id(&self) -> RecordId {
        self.id
    }

    fn fields(&self) -> ContactFields {
        ContactFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            position: self.position.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: String,
    pub position: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    pub first_name: String,
    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    pub last_name: String,
    #[validate(
        custom(function = "not_blank", message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,
    pub phone: Option<String>,
    #[validate(custom(function = "not_blank", message = "Company is required"))]
    pub company: String,
    pub position: Option<String>,
    pub notes: Option<String>,
}

impl ContactForm {
    pub fn into_fields(mut self) -> Result<ContactFields, ValidationErrors> {
        self.email = self.email.trim().to_string();
        self.validate()?;
        Ok(ContactFields {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email,
            phone: trimmed(self.phone),
            company: self.company.trim().to_string(),
            position: trimmed(self.position),
            notes: trimmed(self.notes),
        })
    }
}
