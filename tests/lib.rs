//! Shared fixtures: a migrated in-memory SQLite database and a store whose
//! clock only moves when a test says so.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, RetryPolicy};
use products_crm::{
    CrmStore, ManualClock,
    input::{AppendFollowup, NewClient},
};
use sea_orm::{ConnectOptions, Database};

pub async fn memory_db() -> DbPool {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection: every connection to `:memory:` is its own database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Dashboard date used by most tests; later than every event they append.
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub struct TestCrm {
    pub store: CrmStore,
    pub clock: Arc<ManualClock>,
}

impl TestCrm {
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let store = CrmStore::new(memory_db().await)
            .with_clock(clock.clone())
            .with_retry(RetryPolicy::none());
        Self { store, clock }
    }

    pub fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }

    pub async fn client(&self, employee_id: i32, company: &str) -> i32 {
        self.store
            .create_client(new_client(employee_id, company))
            .await
            .expect("create client")
            .id
    }

    /// Append a plain followup and move the clock on.
    pub async fn append(&self, client_id: i32, status: &str) -> i32 {
        let event = self
            .store
            .append_followup(followup(client_id, status))
            .await
            .expect("append followup");
        self.tick();
        event.id
    }
}

pub fn new_client(employee_id: i32, company: &str) -> NewClient {
    NewClient {
        employee_id: Some(employee_id),
        company_name: Some(company.to_string()),
        customer_name: Some(format!("{company} buyer")),
        ..NewClient::default()
    }
}

pub fn followup(client_id: i32, status: &str) -> AppendFollowup {
    AppendFollowup {
        client_id: Some(client_id),
        employee_id: Some(1),
        status: Some(status.to_string()),
        ..AppendFollowup::default()
    }
}
