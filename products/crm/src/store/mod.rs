//! Persistence-backed operations of both pipelines. Reads are set based and
//! retried on transient connectivity errors; multi-row writes run in one
//! transaction and publish a [`LeadChanged`](crate::notify::LeadChanged)
//! after commit.

mod management;
mod marketing;
pub(crate) mod sql;

use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::Duration;
use entity::{contact_person, followup, management_followup};
use platform_db::{DbPool, RetryPolicy, retry_transient};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, prelude::DateTimeWithTimeZone,
};

use crate::{
    clock::{Clock, SystemClock},
    error::LeadResult,
    event::{ClientId, LeadRef, ManagementEvent, MarketingEvent},
    legacy::ParsedContact,
    notify::{LeadChanged, LeadEvents, Pipeline},
    resolver::latest_by_key,
    status::PipelineStatus,
};

use self::sql::{EventSource, LeadFilter};

/// Bound on `IN (...)` lists per statement.
const ID_CHUNK: usize = 500;

#[derive(Debug, Clone)]
pub struct CrmStore {
    db: DbPool,
    clock: Arc<dyn Clock>,
    events: LeadEvents,
    retry: RetryPolicy,
}

impl CrmStore {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            events: LeadEvents::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: LeadEvents) -> Self {
        self.events = events;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    pub fn events(&self) -> &LeadEvents {
        &self.events
    }

    fn now(&self) -> DateTimeWithTimeZone {
        self.clock.now().into()
    }

    async fn read<T, F, Fut>(&self, op: F) -> LeadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        Ok(retry_transient(self.retry, op).await?)
    }

    async fn latest_rows<E: EntityTrait>(&self, source: EventSource, filter: LeadFilter<'_>) -> LeadResult<Vec<E::Model>> {
        match filter {
            LeadFilter::Ids(ids) => {
                let mut rows = Vec::new();
                for chunk in ids.chunks(ID_CHUNK) {
                    rows.extend(self.run_latest::<E>(source, LeadFilter::Ids(chunk)).await?);
                }
                Ok(rows)
            }
            scope => self.run_latest::<E>(source, scope).await,
        }
    }

    async fn run_latest<E: EntityTrait>(&self, source: EventSource, filter: LeadFilter<'_>) -> LeadResult<Vec<E::Model>> {
        let stmt = sql::latest_events(self.db.get_database_backend(), source, filter);
        let db = &self.db;
        self.read(|| E::find().from_raw_sql(stmt.clone()).all(db)).await
    }

    async fn latest_marketing(&self, filter: LeadFilter<'_>) -> LeadResult<HashMap<ClientId, MarketingEvent>> {
        let rows = self
            .latest_rows::<followup::Entity>(sql::MARKETING_EVENTS, filter)
            .await?;
        Ok(latest_by_key(rows.into_iter().map(MarketingEvent::from)))
    }

    async fn latest_management(&self, source: EventSource, filter: LeadFilter<'_>) -> LeadResult<HashMap<LeadRef, ManagementEvent>> {
        let rows = self
            .latest_rows::<management_followup::Entity>(source, filter)
            .await?;
        let events = rows
            .into_iter()
            .map(ManagementEvent::try_from)
            .collect::<LeadResult<Vec<_>>>()?;
        Ok(latest_by_key(events))
    }

    fn publish_marketing(&self, event: &MarketingEvent) {
        self.events.publish(LeadChanged {
            pipeline: Pipeline::Marketing,
            lead: LeadRef::Marketing(event.client),
            followup_id: event.id,
            status: event.status.as_str(),
            employee_id: event.employee_id,
            at: event.created_at,
        });
    }

    fn publish_management(&self, event: &ManagementEvent) {
        self.events.publish(LeadChanged {
            pipeline: Pipeline::Management,
            lead: event.client,
            followup_id: event.id,
            status: event.status.as_str(),
            employee_id: event.employee_id,
            at: event.created_at,
        });
    }
}

async fn insert_contact_person<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    contact: ParsedContact,
    now: DateTimeWithTimeZone,
) -> LeadResult<contact_person::Model> {
    let model = contact_person::ActiveModel {
        id: NotSet,
        client_id: Set(client_id),
        name: Set(contact.name),
        phone: Set(contact.phone),
        email: Set(contact.email),
        designation: Set(contact.designation),
        created_at: Set(now),
    };
    Ok(model.insert(conn).await?)
}

/// Timestamp for a new event of a lead. It never sorts before the lead's
/// latest event in the same pipeline and always sorts strictly after its
/// latest event in the other pipeline.
fn event_stamp(
    now: DateTimeWithTimeZone,
    own: Option<DateTimeWithTimeZone>,
    other: Option<DateTimeWithTimeZone>,
) -> DateTimeWithTimeZone {
    let mut at = now;
    if let Some(own) = own {
        at = at.max(own);
    }
    if let Some(other) = other {
        at = at.max(other + Duration::milliseconds(1));
    }
    at
}

async fn latest_marketing_row<C: ConnectionTrait>(conn: &C, client_id: ClientId) -> LeadResult<Option<followup::Model>> {
    Ok(followup::Entity::find()
        .filter(followup::Column::ClientId.eq(client_id))
        .order_by_desc(followup::Column::CreatedAt)
        .order_by_desc(followup::Column::Id)
        .one(conn)
        .await?)
}

/// Latest management event recorded against a handed-over marketing client.
async fn latest_management_row<C: ConnectionTrait>(
    conn: &C,
    marketing_client_id: ClientId,
) -> LeadResult<Option<management_followup::Model>> {
    Ok(management_followup::Entity::find()
        .filter(management_followup::Column::IsMarketing.eq(true))
        .filter(management_followup::Column::MarketingClientId.eq(marketing_client_id))
        .order_by_desc(management_followup::Column::CreatedAt)
        .order_by_desc(management_followup::Column::Id)
        .one(conn)
        .await?)
}

/// Groups rows by key, keeping the order rows arrived in.
fn group_by<K, V, I, F>(rows: I, key: F) -> HashMap<K, Vec<V>>
where
    K: std::hash::Hash + Eq,
    I: IntoIterator<Item = V>,
    F: Fn(&V) -> K,
{
    let mut grouped: HashMap<K, Vec<V>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn stamps_move_past_the_other_pipeline() {
        let now: DateTimeWithTimeZone = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap().into();
        assert_eq!(event_stamp(now, None, None), now);
        assert_eq!(event_stamp(now, Some(now), None), now);
        assert_eq!(event_stamp(now, None, Some(now)), now + Duration::milliseconds(1));

        let later = now + Duration::milliseconds(3);
        assert_eq!(event_stamp(now, Some(later), Some(now)), later);
        assert_eq!(event_stamp(now, Some(now), Some(later)), later + Duration::milliseconds(1));
        assert_eq!(event_stamp(later, None, Some(now)), later);
    }
}
