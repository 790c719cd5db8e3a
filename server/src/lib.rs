//! HTTP and GraphQL surface of the lead tracker.

pub mod config;
pub mod graphql;
pub mod http;
pub mod notifier;
pub mod seed;

use std::sync::Arc;

use platform_db::DbPool;
use products_crm::{CrmStore, LeadEvents};

use crate::{config::AppConfig, http::AppState};

/// Assemble the shared state: one store, one lead-change bus, one schema.
pub fn app_state(pool: DbPool, config: AppConfig) -> AppState {
    let store = CrmStore::new(pool).with_events(LeadEvents::new(config.notify_capacity));
    state_with_store(store, config)
}

pub fn state_with_store(store: CrmStore, config: AppConfig) -> AppState {
    AppState {
        schema: graphql::build_schema(store.clone()),
        store,
        config: Arc::new(config),
    }
}
