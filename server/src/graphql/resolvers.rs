use async_graphql::{Context, ID, InputObject, Object, Result};
use chrono::{NaiveDate, Utc};
use crm::{ActivityFilter, ContactFilter, Dashboard, Report, companies, month_stats};
use entity::{ActivityForm, ContactForm, DealForm, Money, Stage};
use platform_api::ApiResult;
use tracing::instrument;

use super::{
    GraphqlData, gql_error, parse_id,
    nodes::{
        ActivityNode, ActivityStats, ActivityType, ContactNode, DashboardPayload, DealNode,
        DealStage, NotificationNode, PipelineBoard, ReportPayload, ReportRangeOption,
    },
};

const DEFAULT_NOTIFICATIONS: i32 = 20;

fn optional_id(field: &str, id: Option<&ID>) -> ApiResult<Option<i64>> {
    id.map(|id| parse_id(field, id)).transpose()
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: String,
    pub position: Option<String>,
    pub notes: Option<String>,
}

impl From<ContactInput> for ContactForm {
    fn from(input: ContactInput) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            company: input.company,
            position: input.position,
            notes: input.notes,
        }
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct DealInput {
    pub title: String,
    pub contact_id: Option<ID>,
    pub value_cents: Option<i64>,
    pub stage: Option<DealStage>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl DealInput {
    fn into_form(self) -> ApiResult<DealForm> {
        Ok(DealForm {
            title: self.title,
            contact_id: optional_id("contactId", self.contact_id.as_ref())?,
            // Negative amounts become zero so the positive-value rule reports them.
            value: self
                .value_cents
                .map(|cents| Money::from_cents(cents.max(0))),
            stage: self.stage.map(Stage::from),
            probability: self
                .probability
                .map(|p| u8::try_from(p).unwrap_or(u8::MAX)),
            expected_close_date: self.expected_close_date,
            notes: self.notes,
        })
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ActivityInput {
    #[graphql(name = "type")]
    pub kind: Option<ActivityType>,
    pub contact_id: Option<ID>,
    pub deal_id: Option<ID>,
    pub subject: String,
    pub notes: Option<String>,
}

impl ActivityInput {
    fn into_form(self) -> ApiResult<ActivityForm> {
        Ok(ActivityForm {
            kind: self.kind.map(Into::into),
            contact_id: optional_id("contactId", self.contact_id.as_ref())?,
            deal_id: optional_id("dealId", self.deal_id.as_ref())?,
            subject: self.subject,
            notes: self.notes,
        })
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ContactFilterInput {
    pub search: Option<String>,
    pub company: Option<String>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ActivityFilterInput {
    #[graphql(name = "type")]
    pub kind: Option<ActivityType>,
    pub contact_id: Option<ID>,
}

#[derive(Default)]
pub struct CrmQuery;

#[Object]
impl CrmQuery {
    #[instrument(name = "graphql.crm.contacts", skip_all)]
    async fn contacts(
        &self,
        ctx: &Context<'_>,
        filter: Option<ContactFilterInput>,
    ) -> Result<Vec<ContactNode>> {
        let data = ctx.data::<GraphqlData>()?;
        let contacts = data.services.contacts.try_list().await.map_err(gql_error)?;
        let filter = filter
            .map(|f| ContactFilter {
                search: f.search,
                company: f.company,
            })
            .unwrap_or_default();
        Ok(filter
            .apply(&contacts)
            .into_iter()
            .cloned()
            .map(ContactNode::from)
            .collect())
    }

    #[instrument(name = "graphql.crm.contact", skip_all)]
    async fn contact(&self, ctx: &Context<'_>, id: ID) -> Result<ContactNode> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        let contact = data.services.contacts.try_get(id).await.map_err(gql_error)?;
        Ok(contact.into())
    }

    /// Distinct company names, sorted.
    async fn companies(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        let data = ctx.data::<GraphqlData>()?;
        let contacts = data.services.contacts.try_list().await.map_err(gql_error)?;
        Ok(companies(&contacts))
    }

    #[instrument(name = "graphql.crm.deals", skip_all)]
    async fn deals(
        &self,
        ctx: &Context<'_>,
        stage: Option<DealStage>,
        contact_id: Option<ID>,
    ) -> Result<Vec<DealNode>> {
        let data = ctx.data::<GraphqlData>()?;
        let contact_id = optional_id("contactId", contact_id.as_ref()).map_err(gql_error)?;
        let deals = match (stage, contact_id) {
            (Some(stage), _) => data.services.deals.try_by_stage(stage.into()).await,
            (None, Some(contact_id)) => data.services.deals.try_by_contact(contact_id).await,
            (None, None) => data.services.deals.try_list().await,
        }
        .map_err(gql_error)?;
        Ok(deals
            .into_iter()
            .filter(|deal| contact_id.is_none_or(|id| deal.contact_id == id))
            .map(DealNode::from)
            .collect())
    }

    #[instrument(name = "graphql.crm.deal", skip_all)]
    async fn deal(&self, ctx: &Context<'_>, id: ID) -> Result<DealNode> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        let deal = data.services.deals.try_get(id).await.map_err(gql_error)?;
        Ok(deal.into())
    }

    /// Timeline, newest first.
    #[instrument(name = "graphql.crm.activities", skip_all)]
    async fn activities(
        &self,
        ctx: &Context<'_>,
        filter: Option<ActivityFilterInput>,
    ) -> Result<Vec<ActivityNode>> {
        let data = ctx.data::<GraphqlData>()?;
        let filter = match filter {
            Some(input) => ActivityFilter {
                kind: input.kind.map(Into::into),
                contact_id: optional_id("contactId", input.contact_id.as_ref())
                    .map_err(gql_error)?,
            },
            None => ActivityFilter::default(),
        };
        let activities = data
            .services
            .activities
            .try_list()
            .await
            .map_err(gql_error)?;
        Ok(filter
            .apply(&activities)
            .into_iter()
            .cloned()
            .map(ActivityNode::from)
            .collect())
    }

    /// Activities logged since the start of the current month.
    #[instrument(name = "graphql.crm.activity_stats", skip_all)]
    async fn activity_stats(&self, ctx: &Context<'_>) -> Result<ActivityStats> {
        let data = ctx.data::<GraphqlData>()?;
        let activities = data
            .services
            .activities
            .try_list()
            .await
            .map_err(gql_error)?;
        Ok(month_stats(&activities, Utc::now()).into())
    }

    #[instrument(name = "graphql.crm.pipeline_board", skip_all)]
    async fn pipeline_board(&self, ctx: &Context<'_>) -> Result<PipelineBoard> {
        let data = ctx.data::<GraphqlData>()?;
        let board = data.services.board().await.map_err(gql_error)?;
        Ok(PipelineBoard::new(board.buckets(), board.total_value()))
    }

    #[instrument(name = "graphql.crm.dashboard", skip_all)]
    async fn dashboard(&self, ctx: &Context<'_>) -> Result<DashboardPayload> {
        let data = ctx.data::<GraphqlData>()?;
        let workspace = data.services.load_workspace().await.map_err(gql_error)?;
        Ok(Dashboard::compute(&workspace, Utc::now().date_naive()).into())
    }

    #[instrument(name = "graphql.crm.report", skip_all)]
    async fn report(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] range: ReportRangeOption,
    ) -> Result<ReportPayload> {
        let data = ctx.data::<GraphqlData>()?;
        let workspace = data.services.load_workspace().await.map_err(gql_error)?;
        Ok(Report::compute(&workspace, range.into(), Utc::now()).into())
    }

    /// Most recent adapter notifications, newest first.
    async fn notifications(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] first: i32,
    ) -> Result<Vec<NotificationNode>> {
        let data = ctx.data::<GraphqlData>()?;
        let limit = usize::try_from(first).unwrap_or(DEFAULT_NOTIFICATIONS as usize);
        Ok(data
            .feed
            .recent(limit)
            .into_iter()
            .map(NotificationNode::from)
            .collect())
    }
}

#[derive(Default)]
pub struct CrmMutation;

#[Object]
impl CrmMutation {
    #[instrument(name = "graphql.crm.create_contact", skip_all)]
    async fn create_contact(&self, ctx: &Context<'_>, input: ContactInput) -> Result<ContactNode> {
        let data = ctx.data::<GraphqlData>()?;
        let fields = ContactForm::from(input)
            .into_fields()
            .map_err(|err| gql_error(err.into()))?;
        let contact = data
            .services
            .contacts
            .create_notified(&fields)
            .await
            .map_err(gql_error)?;
        Ok(contact.into())
    }

    #[instrument(name = "graphql.crm.update_contact", skip_all)]
    async fn update_contact(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: ContactInput,
    ) -> Result<ContactNode> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        let fields = ContactForm::from(input)
            .into_fields()
            .map_err(|err| gql_error(err.into()))?;
        let contact = data
            .services
            .contacts
            .update_notified(id, &fields)
            .await
            .map_err(gql_error)?;
        Ok(contact.into())
    }

    #[instrument(name = "graphql.crm.delete_contact", skip_all)]
    async fn delete_contact(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        data.services
            .contacts
            .delete_notified(id)
            .await
            .map_err(gql_error)?;
        Ok(true)
    }

    #[instrument(name = "graphql.crm.create_deal", skip_all)]
    async fn create_deal(&self, ctx: &Context<'_>, input: DealInput) -> Result<DealNode> {
        let data = ctx.data::<GraphqlData>()?;
        let fields = input
            .into_form()
            .and_then(|form| form.into_fields().map_err(Into::into))
            .map_err(gql_error)?;
        let deal = data
            .services
            .deals
            .create_notified(&fields)
            .await
            .map_err(gql_error)?;
        Ok(deal.into())
    }

    #[instrument(name = "graphql.crm.update_deal", skip_all)]
    async fn update_deal(&self, ctx: &Context<'_>, id: ID, input: DealInput) -> Result<DealNode> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        let fields = input
            .into_form()
            .and_then(|form| form.into_fields().map_err(Into::into))
            .map_err(gql_error)?;
        let deal = data
            .services
            .deals
            .update_notified(id, &fields)
            .await
            .map_err(gql_error)?;
        Ok(deal.into())
    }

    #[instrument(name = "graphql.crm.delete_deal", skip_all)]
    async fn delete_deal(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        data.services
            .deals
            .delete_notified(id)
            .await
            .map_err(gql_error)?;
        Ok(true)
    }

    /// Moves a deal to another pipeline stage. Stage names are case-insensitive.
    #[instrument(name = "graphql.crm.move_deal_stage", skip_all)]
    async fn move_deal_stage(&self, ctx: &Context<'_>, id: ID, stage: String) -> Result<DealNode> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        let deal = data
            .services
            .move_deal(id, &stage)
            .await
            .map_err(gql_error)?;
        Ok(deal.into())
    }

    #[instrument(name = "graphql.crm.log_activity", skip_all)]
    async fn log_activity(&self, ctx: &Context<'_>, input: ActivityInput) -> Result<ActivityNode> {
        let data = ctx.data::<GraphqlData>()?;
        let fields = input
            .into_form()
            .and_then(|form| form.into_fields(Utc::now()).map_err(Into::into))
            .map_err(gql_error)?;
        let activity = data
            .services
            .activities
            .create_notified(&fields)
            .await
            .map_err(gql_error)?;
        Ok(activity.into())
    }

    #[instrument(name = "graphql.crm.delete_activity", skip_all)]
    async fn delete_activity(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let data = ctx.data::<GraphqlData>()?;
        let id = parse_id("id", &id).map_err(gql_error)?;
        data.services
            .activities
            .delete_notified(id)
            .await
            .map_err(gql_error)?;
        Ok(true)
    }
}
