use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, Json, Object, Schema, SimpleObject,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use platform_api::ApiError;
use products_crm::{Counts, CrmStore, LeadError, MarketingEvent, PipelineStatus, status::shared_str};
use serde::Serialize;
use tracing::instrument;

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(store: CrmStore) -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(store)
        .finish()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Marketing dashboard tiles. `asOf` defaults to today's server date.
    #[instrument(name = "graphql.marketing_counts", skip(self, ctx))]
    async fn marketing_counts(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<i32>,
        as_of: Option<NaiveDate>,
    ) -> async_graphql::Result<Json<Counts>> {
        let store = ctx.data::<CrmStore>()?;
        let counts = store
            .marketing_counts(employee_id, as_of.unwrap_or_else(today))
            .await
            .map_err(extend)?;
        Ok(Json(counts))
    }

    #[instrument(name = "graphql.management_counts", skip(self, ctx))]
    async fn management_counts(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<i32>,
        as_of: Option<NaiveDate>,
    ) -> async_graphql::Result<Json<Counts>> {
        let store = ctx.data::<CrmStore>()?;
        let counts = store
            .management_counts(employee_id, as_of.unwrap_or_else(today))
            .await
            .map_err(extend)?;
        Ok(Json(counts))
    }

    /// Every followup of one marketing client, newest first.
    #[instrument(name = "graphql.client_followups", skip(self, ctx))]
    async fn client_followups(
        &self,
        ctx: &Context<'_>,
        client_id: i32,
    ) -> async_graphql::Result<Vec<FollowupNode>> {
        let store = ctx.data::<CrmStore>()?;
        let events = store.client_followups(client_id).await.map_err(extend)?;
        Ok(events.into_iter().map(FollowupNode::from).collect())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn extend(err: LeadError) -> async_graphql::Error {
    ApiError::from(err).extend()
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct FollowupNode {
    pub id: i32,
    pub client_id: i32,
    pub contact_person_id: Option<i32>,
    pub employee_id: i32,
    pub status: String,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub shared: String,
    pub following: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MarketingEvent> for FollowupNode {
    fn from(event: MarketingEvent) -> Self {
        Self {
            id: event.id,
            client_id: event.client,
            contact_person_id: event.contact_person_id,
            employee_id: event.employee_id,
            status: event.status.as_str().to_string(),
            remarks: event.remarks,
            next_followup_date: event.next_followup_date,
            shared: shared_str(event.shared).to_string(),
            following: event.following,
            created_at: event.created_at,
        }
    }
}
