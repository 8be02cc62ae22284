mod nodes;
mod resolvers;

use std::sync::Arc;

use async_graphql::{EmptySubscription, ErrorExtensions, ID, Object, Schema, SimpleObject};
use crm::{CrmServices, NotificationFeed};
use entity::RecordId;
use platform_api::{ApiError, ApiResult};
use platform_store::RecordStore;
use serde::Serialize;
use tracing::{instrument, warn};

pub use self::resolvers::{CrmMutation, CrmQuery};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Request-independent data shared by every resolver.
#[derive(Clone)]
pub struct GraphqlData {
    pub services: CrmServices,
    pub feed: Arc<NotificationFeed>,
}

impl GraphqlData {
    /// Services notify into `feed`, which the `notifications` query reads back.
    pub fn new(store: Arc<dyn RecordStore>, feed: Arc<NotificationFeed>) -> Self {
        Self {
            services: CrmServices::new(store, feed.clone()),
            feed,
        }
    }
}

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(data)
        .finish()
}

/// Maps adapter failures onto GraphQL errors, logging causes clients never see.
pub(crate) fn gql_error(err: ApiError) -> async_graphql::Error {
    if matches!(err, ApiError::Store(_) | ApiError::Internal(_)) {
        warn!(code = err.code(), error = %err.detail(), "resolver failed");
    }
    err.extend()
}

pub(crate) fn parse_id(field: &str, id: &ID) -> ApiResult<RecordId> {
    id.parse::<RecordId>()
        .map_err(|_| ApiError::invalid(field, format!("invalid id {:?}", id.as_str())))
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}
