//! Pipeline Aggregator: stage buckets, totals and stage moves for one board.

use entity::{Deal, Money, RecordId, Stage};
use platform_api::{ApiError, ApiResult};
use tracing::{Instrument, info_span, warn};

use crate::{
    notify::Severity,
    service::DealService,
};

pub const STAGE_CHANGE_FAILED: &str = "Failed to update deal stage";

#[derive(Clone, Debug, PartialEq)]
pub struct StageColumn {
    pub stage: Stage,
    pub deals: Vec<Deal>,
}

impl StageColumn {
    pub fn total(&self) -> Money {
        total_value(&self.deals)
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.deals.iter().map(|deal| deal.id).collect()
    }
}

/// Pairwise-disjoint partition of a deal collection over the board stages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageBuckets {
    pub columns: Vec<StageColumn>,
    /// Deals whose stage is unrecognized or not on the board.
    pub unmatched: Vec<Deal>,
}

impl StageBuckets {
    pub fn column(&self, stage: Stage) -> Option<&StageColumn> {
        self.columns.iter().find(|column| column.stage == stage)
    }

    pub fn ids(&self, stage: Stage) -> Vec<RecordId> {
        self.column(stage).map(StageColumn::ids).unwrap_or_default()
    }

    pub fn matched_count(&self) -> usize {
        self.columns.iter().map(|column| column.deals.len()).sum()
    }
}

/// Buckets keep source order. Repeated stages only get their first column.
pub fn group_by_stage(deals: &[Deal], stages: &[Stage]) -> StageBuckets {
    let mut buckets = StageBuckets::default();
    for stage in stages {
        if buckets.column(*stage).is_none() {
            buckets.columns.push(StageColumn {
                stage: *stage,
                deals: Vec::new(),
            });
        }
    }
    for deal in deals {
        let column = deal
            .stage
            .known()
            .and_then(|stage| buckets.columns.iter_mut().find(|c| c.stage == stage));
        match column {
            Some(column) => column.deals.push(deal.clone()),
            None => buckets.unmatched.push(deal.clone()),
        }
    }
    buckets
}

pub fn stage_total(deals: &[Deal], stage: Stage) -> Money {
    deals
        .iter()
        .filter(|deal| deal.stage.is(stage))
        .map(Deal::amount)
        .sum()
}

/// Sum over the whole collection, unmatched deals included.
pub fn total_value(deals: &[Deal]) -> Money {
    deals.iter().map(Deal::amount).sum()
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(RecordId),
}

/// A board view: owns its deal collection and mutates it only through `&mut self`.
pub struct PipelineBoard {
    service: DealService,
    stages: Vec<Stage>,
    deals: Vec<Deal>,
    drag: DragState,
}

impl PipelineBoard {
    pub fn new(service: DealService, deals: Vec<Deal>) -> Self {
        Self {
            service,
            stages: Stage::ALL.to_vec(),
            deals,
            drag: DragState::Idle,
        }
    }

    pub fn with_stages(mut self, stages: impl Into<Vec<Stage>>) -> Self {
        self.stages = stages.into();
        self
    }

    /// Loads through the sentinel surface: a failed read yields an empty board.
    pub async fn load(service: DealService) -> Self {
        let deals = service.list().await;
        Self::new(service, deals)
    }

    pub async fn try_load(service: DealService) -> ApiResult<Self> {
        let deals = service.try_list().await?;
        Ok(Self::new(service, deals))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn deal(&self, id: RecordId) -> Option<&Deal> {
        self.deals.iter().find(|deal| deal.id == id)
    }

    pub fn buckets(&self) -> StageBuckets {
        let span = info_span!(
            "crm.pipeline.group",
            deals = self.deals.len(),
            stages = self.stages.len()
        );
        let _guard = span.enter();
        group_by_stage(&self.deals, &self.stages)
    }

    pub fn stage_total(&self, stage: Stage) -> Money {
        stage_total(&self.deals, stage)
    }

    pub fn total_value(&self) -> Money {
        total_value(&self.deals)
    }

    /// Move a deal to `stage` with a full-record update that replaces only the stage.
    ///
    /// Emits exactly one notification. On failure the collection is untouched.
    /// An id missing from the collection fails without reaching the store.
    /// A write the store accepted counts as a move even when its echoed record
    /// does not decode; the local deal then takes the new stage.
    pub async fn change_stage(&mut self, id: RecordId, stage: Stage) -> ApiResult<Deal> {
        let notifier = self.service.notifier().clone();
        let Some(index) = self.deals.iter().position(|deal| deal.id == id) else {
            warn!(deal_id = id, "stage change for deal not on board");
            notifier.notify(Severity::Error, STAGE_CHANGE_FAILED);
            return Err(ApiError::not_found("Deal", id));
        };
        let fields = self.deals[index].fields_with_stage(stage);
        let result = self
            .service
            .try_update(id, &fields)
            .instrument(info_span!("crm.pipeline.changeStage", deal_id = id, stage = %stage))
            .await;
        match result {
            Ok(updated) => {
                self.deals[index] = updated.clone();
                notifier.notify(Severity::Success, &format!("Deal moved to {stage}"));
                Ok(updated)
            }
            Err(ApiError::Validation(errors)) => {
                warn!(deal_id = id, %errors, "stage change stored but response did not decode");
                let moved = Deal {
                    stage: stage.into(),
                    ..self.deals[index].clone()
                };
                self.deals[index] = moved.clone();
                notifier.notify(Severity::Success, &format!("Deal moved to {stage}"));
                Ok(moved)
            }
            Err(err) => {
                warn!(deal_id = id, error = %err.detail(), "stage change failed");
                notifier.notify(Severity::Error, STAGE_CHANGE_FAILED);
                Err(err)
            }
        }
    }

    /// Parses the stage name case-insensitively before any store traffic.
    pub async fn change_stage_named(&mut self, id: RecordId, stage: &str) -> ApiResult<Deal> {
        let stage: Stage = stage
            .parse()
            .map_err(|err: entity::ParseStageError| ApiError::invalid("stage", err.to_string()))?;
        self.change_stage(id, stage).await
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn begin_drag(&mut self, id: RecordId) {
        self.drag = DragState::Dragging(id);
    }

    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn is_lifted(&self, id: RecordId) -> bool {
        self.drag == DragState::Dragging(id)
    }

    /// Dropping while idle does nothing and returns `None`.
    pub async fn drop_on(&mut self, stage: Stage) -> Option<ApiResult<Deal>> {
        let DragState::Dragging(id) = std::mem::take(&mut self.drag) else {
            return None;
        };
        Some(self.change_stage(id, stage).await)
    }
}
