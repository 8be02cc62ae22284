use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::{
    DecodeError, Entity, Money, RecordId, Stage, StageValue, codec,
    validation::{field_error, not_blank, positive_money, trimmed},
};

/// Probability applied to new deals when the form leaves it empty.
pub const DEFAULT_PROBABILITY: u8 = 25;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(rename = "Id")]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub value: Option<Money>,
    #[serde(default)]
    pub stage: StageValue,
    #[serde(default, deserialize_with = "codec::probability")]
    pub probability: u8,
    #[serde(default, deserialize_with = "codec::optional_date")]
    pub expected_close_date: Option<NaiveDate>,
    pub contact_id: RecordId,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "codec::optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "codec::optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Value with a missing amount counted as zero.
    pub fn amount(&self) -> Money {
        self.value.unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.stage.is(Stage::Closed)
    }

    /// Writable fields with only the stage replaced.
    pub fn fields_with_stage(&self, stage: Stage) -> DealFields {
        DealFields {
            stage: stage.into(),
            ..self.fields()
        }
    }
}

impl Entity for Deal {
    const TABLE: &'static str = "deals";
    const LABEL: &'static str = "Deal";

    type Fields = DealFields;

    fn id(&self) -> RecordId {
        self.id
    }

    fn fields(&self) -> DealFields {
        DealFields {
            title: self.title.clone(),
            value: self.value,
            stage: self.stage.clone(),
            probability: self.probability,
            expected_close_date: self.expected_close_date,
            contact_id: self.contact_id,
            notes: self.notes.clone(),
        }
    }

    fn check(&self) -> Result<(), DecodeError> {
        if self.title.trim().is_empty() {
            return Err(DecodeError::new(
                Self::LABEL,
                Some("title"),
                "title must not be blank",
            ));
        }
        Ok(())
    }
}

/// Everything a client may write on a deal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFields {
    pub title: String,
    pub value: Option<Money>,
    pub stage: StageValue,
    pub probability: u8,
    pub expected_close_date: Option<NaiveDate>,
    pub contact_id: RecordId,
    pub notes: Option<String>,
}

/// Deal editor input, validated before anything reaches the store.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DealForm {
    #[validate(custom(function = "not_blank", message = "Deal title is required"))]
    pub title: String,
    #[validate(required(message = "Contact is required"))]
    pub contact_id: Option<RecordId>,
    #[validate(required(message = "Valid deal value is required"))]
    pub value: Option<Money>,
    pub stage: Option<Stage>,
    #[validate(range(max = 100, message = "Probability must be between 0 and 100"))]
    pub probability: Option<u8>,
    #[validate(required(message = "Expected close date is required"))]
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl DealForm {
    pub fn into_fields(self) -> Result<DealFields, ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(value) = &self.value {
            if let Err(mut err) = positive_money(value) {
                err.message = Some("Valid deal value is required".into());
                errors.add("value", err);
            }
        }
        if !errors.errors().is_empty() {
            return Err(errors);
        }
        let contact_id = self
            .contact_id
            .ok_or_else(|| field_error("contact_id", "required", "Contact is required"))?;
        Ok(DealFields {
            title: self.title.trim().to_string(),
            value: self.value,
            stage: self.stage.unwrap_or_default().into(),
            probability: self.probability.unwrap_or(DEFAULT_PROBABILITY),
            expected_close_date: self.expected_close_date,
            contact_id,
            notes: trimmed(self.notes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use serde_json::{Value, json};

    fn decode_json(value: Value) -> Result<Deal, DecodeError> {
        match value {
            Value::Object(map) => decode(map),
            _ => panic!("fixture must be an object"),
        }
    }

    fn valid_form() -> DealForm {
        DealForm {
            title: "  Platform rollout ".into(),
            contact_id: Some(3),
            value: Some(Money::from_units(12_000)),
            stage: None,
            probability: None,
            expected_close_date: NaiveDate::from_ymd_opt(2025, 2, 14),
            notes: Some("   ".into()),
        }
    }

    #[test]
    fn decodes_store_record() {
        let deal = decode_json(json!({
            "Id": 7,
            "title": "Annual license",
            "value": 4500,
            "stage": "proposal",
            "probability": 60,
            "expectedCloseDate": "2025-03-01T00:00:00.000Z",
            "contactId": 2,
            "createdAt": "2025-01-10T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(deal.id, 7);
        assert_eq!(deal.stage, StageValue::Known(Stage::Proposal));
        assert_eq!(deal.amount(), Money::from_units(4500));
        assert_eq!(deal.expected_close_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(deal.updated_at.is_none());
    }

    #[test]
    fn missing_value_counts_as_zero() {
        let deal = decode_json(json!({
            "Id": 1, "title": "Pilot", "stage": "Lead", "contactId": 1
        }))
        .unwrap();
        assert_eq!(deal.value, None);
        assert_eq!(deal.amount(), Money::ZERO);
    }

    #[test]
    fn rejects_malformed_records() {
        let negative = decode_json(json!({
            "Id": 1, "title": "Pilot", "value": -10, "contactId": 1
        }));
        assert!(negative.is_err());
        let blank = decode_json(json!({ "Id": 1, "title": " ", "contactId": 1 })).unwrap_err();
        assert_eq!(blank.field.as_deref(), Some("title"));
        let odds = decode_json(json!({
            "Id": 1, "title": "Pilot", "probability": 101, "contactId": 1
        }));
        assert!(odds.is_err());
    }

    #[test]
    fn stage_only_replacement_keeps_other_fields() {
        let deal = decode_json(json!({
            "Id": 2, "title": "Expansion", "value": 2000, "stage": "Lead",
            "probability": 40, "contactId": 5, "notes": "call back"
        }))
        .unwrap();
        let fields = deal.fields_with_stage(Stage::Negotiation);
        assert_eq!(fields.stage, StageValue::Known(Stage::Negotiation));
        assert_eq!(fields.title, "Expansion");
        assert_eq!(fields.value, Some(Money::from_units(2000)));
        assert_eq!(fields.contact_id, 5);
        assert_eq!(fields.notes.as_deref(), Some("call back"));
    }

    #[test]
    fn form_defaults_and_normalizes() {
        let fields = valid_form().into_fields().unwrap();
        assert_eq!(fields.title, "Platform rollout");
        assert_eq!(fields.stage, StageValue::Known(Stage::Lead));
        assert_eq!(fields.probability, DEFAULT_PROBABILITY);
        assert_eq!(fields.notes, None);
    }

    #[test]
    fn form_reports_every_invalid_field() {
        let form = DealForm {
            title: " ".into(),
            value: Some(Money::ZERO),
            probability: Some(120),
            ..DealForm::default()
        };
        let errors = form.into_fields().unwrap_err();
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|key| key.replace('_', "").to_lowercase())
            .collect();
        fields.sort();
        assert_eq!(
            fields,
            ["contactid", "expectedclosedate", "probability", "title", "value"]
        );
    }
}
