//! Record Store Adapters: typed access to one table each.
//!
//! Two surfaces per entity. The `try_*` methods return typed errors and leave
//! reporting to the caller. The plain methods catch every failure, raise a
//! notification and hand back a sentinel (`Vec::new()`, `None`, `false`), so
//! each mutation attempt through them ends in exactly one notification. The
//! `*_notified` methods sit in between: one notification, typed result.

use std::{marker::PhantomData, sync::Arc};

use entity::{
    Activity, ActivityKind, Contact, Deal, Entity, RecordId, Stage, decode, encode,
};
use platform_api::{ApiError, ApiResult};
use platform_store::{RecordStore, StoreError};
use tracing::{instrument, warn};

use crate::notify::{Notifier, Severity};

/// Notification wording for an entity type.
pub trait Notices: Entity {
    fn noun() -> String {
        Self::LABEL.to_lowercase()
    }

    fn created() -> String {
        format!("{} created successfully", Self::LABEL)
    }

    fn create_failed() -> String {
        format!("Failed to save {}", Self::noun())
    }

    fn updated() -> String {
        format!("{} updated successfully", Self::LABEL)
    }

    fn update_failed() -> String {
        format!("Failed to save {}", Self::noun())
    }

    fn deleted() -> String {
        format!("{} deleted successfully", Self::LABEL)
    }

    fn delete_failed() -> String {
        format!("Failed to delete {}", Self::noun())
    }

    fn load_failed() -> String {
        format!("Failed to load {}", Self::TABLE)
    }

    fn fetch_failed() -> String {
        format!("Failed to load {}", Self::noun())
    }

    fn skipped(count: usize) -> String {
        let plural = if count == 1 { "" } else { "s" };
        format!("Skipped {count} malformed {} record{plural}", Self::noun())
    }
}

impl Notices for Contact {}

impl Notices for Deal {}

impl Notices for Activity {
    fn created() -> String {
        "Activity logged successfully".into()
    }

    fn create_failed() -> String {
        "Failed to log activity".into()
    }
}

pub type ContactService = EntityService<Contact>;
pub type DealService = EntityService<Deal>;
pub type ActivityService = EntityService<Activity>;

pub struct EntityService<E> {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            _entity: PhantomData,
        }
    }
}

impl<E: Notices> EntityService<E> {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            _entity: PhantomData,
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn notify(&self, severity: Severity, message: &str) {
        self.notifier.notify(severity, message);
    }

    fn store_error(err: StoreError, id: RecordId) -> ApiError {
        match err {
            StoreError::NotFound { .. } => ApiError::not_found(E::LABEL, id),
            other => other.into(),
        }
    }

    /// Every decodable record. Malformed rows are skipped with a single warning.
    #[instrument(skip(self), fields(table = E::TABLE))]
    pub async fn try_list(&self) -> ApiResult<Vec<E>> {
        let rows = self.store.list(E::TABLE).await?;
        let mut items = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in rows {
            match decode::<E>(row) {
                Ok(item) => items.push(item),
                Err(err) => {
                    skipped += 1;
                    warn!(error = %err, field = ?err.field, "skipping malformed record");
                }
            }
        }
        if skipped > 0 {
            self.notify(Severity::Warning, &E::skipped(skipped));
        }
        Ok(items)
    }

    #[instrument(skip(self), fields(table = E::TABLE))]
    pub async fn try_get(&self, id: RecordId) -> ApiResult<E> {
        let row = self
            .store
            .get(E::TABLE, id)
            .await
            .map_err(|err| Self::store_error(err, id))?;
        Ok(decode(row)?)
    }

    #[instrument(skip(self, fields), fields(table = E::TABLE))]
    pub async fn try_create(&self, fields: &E::Fields) -> ApiResult<E> {
        let record = encode(fields).map_err(|err| ApiError::internal(err.into()))?;
        let row = self.store.create(E::TABLE, record).await?;
        Ok(decode(row)?)
    }

    /// Full-record replace.
    #[instrument(skip(self, fields), fields(table = E::TABLE))]
    pub async fn try_update(&self, id: RecordId, fields: &E::Fields) -> ApiResult<E> {
        let record = encode(fields).map_err(|err| ApiError::internal(err.into()))?;
        let row = self
            .store
            .update(E::TABLE, id, record)
            .await
            .map_err(|err| Self::store_error(err, id))?;
        Ok(decode(row)?)
    }

    #[instrument(skip(self), fields(table = E::TABLE))]
    pub async fn try_delete(&self, id: RecordId) -> ApiResult<()> {
        self.store
            .delete(E::TABLE, id)
            .await
            .map_err(|err| Self::store_error(err, id))
    }

    pub async fn list(&self) -> Vec<E> {
        match self.try_list().await {
            Ok(items) => items,
            Err(err) => {
                warn!(table = E::TABLE, error = %err.detail(), "list failed");
                self.notify(Severity::Error, &E::load_failed());
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: RecordId) -> Option<E> {
        match self.try_get(id).await {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(table = E::TABLE, id, error = %err.detail(), "get failed");
                self.notify(Severity::Error, &E::fetch_failed());
                None
            }
        }
    }

    /// Like `try_create`, but reports the outcome as one notification.
    pub async fn create_notified(&self, fields: &E::Fields) -> ApiResult<E> {
        let result = self.try_create(fields).await;
        match &result {
            Ok(_) => self.notify(Severity::Success, &E::created()),
            Err(err) => {
                warn!(table = E::TABLE, error = %err.detail(), "create failed");
                self.notify(Severity::Error, &E::create_failed());
            }
        }
        result
    }

    pub async fn update_notified(&self, id: RecordId, fields: &E::Fields) -> ApiResult<E> {
        let result = self.try_update(id, fields).await;
        match &result {
            Ok(_) => self.notify(Severity::Success, &E::updated()),
            Err(err) => {
                warn!(table = E::TABLE, id, error = %err.detail(), "update failed");
                self.notify(Severity::Error, &E::update_failed());
            }
        }
        result
    }

    pub async fn delete_notified(&self, id: RecordId) -> ApiResult<()> {
        let result = self.try_delete(id).await;
        match &result {
            Ok(()) => self.notify(Severity::Success, &E::deleted()),
            Err(err) => {
                warn!(table = E::TABLE, id, error = %err.detail(), "delete failed");
                self.notify(Severity::Error, &E::delete_failed());
            }
        }
        result
    }

    pub async fn create(&self, fields: &E::Fields) -> Option<E> {
        self.create_notified(fields).await.ok()
    }

    pub async fn update(&self, id: RecordId, fields: &E::Fields) -> Option<E> {
        self.update_notified(id, fields).await.ok()
    }

    pub async fn delete(&self, id: RecordId) -> bool {
        self.delete_notified(id).await.is_ok()
    }
}

impl DealService {
    pub async fn try_by_contact(&self, contact_id: RecordId) -> ApiResult<Vec<Deal>> {
        let deals = self.try_list().await?;
        Ok(deals
            .into_iter()
            .filter(|deal| deal.contact_id == contact_id)
            .collect())
    }

    pub async fn try_by_stage(&self, stage: Stage) -> ApiResult<Vec<Deal>> {
        let deals = self.try_list().await?;
        Ok(deals.into_iter().filter(|deal| deal.stage.is(stage)).collect())
    }

    /// Stage names match case-insensitively; an unknown name is a validation error.
    pub async fn try_by_stage_name(&self, stage: &str) -> ApiResult<Vec<Deal>> {
        let stage: Stage = stage
            .parse()
            .map_err(|err: entity::ParseStageError| ApiError::invalid("stage", err.to_string()))?;
        self.try_by_stage(stage).await
    }
}

impl ActivityService {
    pub async fn try_by_contact(&self, contact_id: RecordId) -> ApiResult<Vec<Activity>> {
        let activities = self.try_list().await?;
        Ok(activities
            .into_iter()
            .filter(|activity| activity.contact_id == contact_id)
            .collect())
    }

    pub async fn try_by_deal(&self, deal_id: RecordId) -> ApiResult<Vec<Activity>> {
        let activities = self.try_list().await?;
        Ok(activities
            .into_iter()
            .filter(|activity| activity.deal_id == Some(deal_id))
            .collect())
    }

    pub async fn try_by_kind(&self, kind: ActivityKind) -> ApiResult<Vec<Activity>> {
        let activities = self.try_list().await?;
        Ok(activities
            .into_iter()
            .filter(|activity| activity.kind == kind)
            .collect())
    }
}
