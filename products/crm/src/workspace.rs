use std::sync::Arc;

use entity::{Activity, Contact, Deal, ParseStageError, RecordId, Stage};
use platform_api::{ApiError, ApiResult};
use platform_store::RecordStore;
use tracing::{instrument, warn};

use crate::{
    notify::{Notifier, Severity},
    pipeline::{PipelineBoard, STAGE_CHANGE_FAILED},
    service::{ActivityService, ContactService, DealService},
};

/// One adapter per entity type, sharing a store handle and a notifier.
#[derive(Clone)]
pub struct CrmServices {
    pub contacts: ContactService,
    pub deals: DealService,
    pub activities: ActivityService,
}

impl CrmServices {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            contacts: ContactService::new(store.clone(), notifier.clone()),
            deals: DealService::new(store.clone(), notifier.clone()),
            activities: ActivityService::new(store, notifier),
        }
    }

    pub async fn board(&self) -> ApiResult<PipelineBoard> {
        PipelineBoard::try_load(self.deals.clone()).await
    }

    pub async fn load_workspace(&self) -> ApiResult<Workspace> {
        Workspace::load(self).await
    }

    /// One-shot stage move: load the board, then move the deal on it.
    ///
    /// A failed board load counts as a failed move and is reported as such.
    pub async fn move_deal(&self, id: RecordId, stage: &str) -> ApiResult<Deal> {
        let stage: Stage = stage
            .parse()
            .map_err(|err: ParseStageError| ApiError::invalid("stage", err.to_string()))?;
        let mut board = match self.board().await {
            Ok(board) => board,
            Err(err) => {
                warn!(deal_id = id, error = %err.detail(), "board load failed");
                self.deals
                    .notifier()
                    .notify(Severity::Error, STAGE_CHANGE_FAILED);
                return Err(err);
            }
        };
        board.change_stage(id, stage).await
    }
}

/// Everything the dashboard and reports views read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workspace {
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
}

impl Workspace {
    /// Issues the three list reads concurrently. Any failure fails the whole load.
    #[instrument(name = "crm.workspace.load", skip_all)]
    pub async fn load(services: &CrmServices) -> ApiResult<Self> {
        let (contacts, deals, activities) = tokio::try_join!(
            services.contacts.try_list(),
            services.deals.try_list(),
            services.activities.try_list(),
        )
        .map_err(|err| {
            warn!(error = %err.detail(), "workspace load failed");
            err
        })?;
        Ok(Self {
            contacts,
            deals,
            activities,
        })
    }

    pub fn contact(&self, id: RecordId) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationFeed;
    use crate::testing::{TestStore, deal_record, record};
    use serde_json::json;

    async fn seeded() -> Arc<TestStore> {
        let store = TestStore::shared();
        store
            .insert(
                "contacts",
                record(json!({
                    "Id": 1, "firstName": "Ada", "lastName": "Lovelace",
                    "email": "ada@engines.io", "company": "Engines"
                })),
            )
            .await;
        store.insert("deals", deal_record(1, "Pilot", "Lead", 100)).await;
        store
            .insert(
                "activities",
                record(json!({
                    "Id": 1, "type": "Call", "contactId": 1,
                    "subject": "Intro", "date": "2025-01-01"
                })),
            )
            .await;
        store
    }

    #[tokio::test]
    async fn loads_all_three_tables() {
        let store = seeded().await;
        let services = CrmServices::new(store, NotificationFeed::shared(5));
        let workspace = services.load_workspace().await.unwrap();
        assert_eq!(workspace.contacts.len(), 1);
        assert_eq!(workspace.deals.len(), 1);
        assert_eq!(workspace.activities.len(), 1);
        assert_eq!(workspace.contact(1).map(|c| c.full_name()), Some("Ada Lovelace".into()));
    }

    #[tokio::test]
    async fn move_deal_parses_then_moves() {
        let store = seeded().await;
        let feed = NotificationFeed::shared(5);
        let services = CrmServices::new(store.clone(), feed.clone());

        let moved = services.move_deal(1, "negotiation").await.unwrap();
        assert_eq!(moved.stage, entity::StageValue::Known(Stage::Negotiation));
        assert_eq!(
            feed.messages(),
            [(Severity::Success, "Deal moved to Negotiation".to_string())]
        );

        assert_eq!(services.move_deal(1, "Won").await.unwrap_err().code(), "VALIDATION");
        assert_eq!(feed.len(), 1);

        store.fail_table("deals");
        assert!(services.move_deal(1, "Lead").await.is_err());
        assert_eq!(
            feed.recent(1)[0].message,
            STAGE_CHANGE_FAILED
        );
    }

    #[tokio::test]
    async fn one_failing_table_fails_the_whole_load() {
        let store = seeded().await;
        store.fail_table("activities");
        let feed = NotificationFeed::shared(5);
        let services = CrmServices::new(store, feed.clone());
        let err = services.load_workspace().await.unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
        assert!(feed.is_empty());
    }
}
