//! Set-based latest-event query: one self-join against the per-lead
//! `MAX(created_at)`, no per-lead round trips.

use platform_db::SqlParams;
use sea_orm::{DatabaseBackend, Statement};

use crate::event::{ClientId, EmployeeId};

/// Where a pipeline's events live and which client table scopes them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EventSource {
    pub table: &'static str,
    pub key_column: &'static str,
    pub is_marketing: Option<bool>,
    pub client_table: &'static str,
}

pub(crate) const MARKETING_EVENTS: EventSource = EventSource {
    table: "followup",
    key_column: "client_id",
    is_marketing: None,
    client_table: "client",
};

pub(crate) const MANAGEMENT_OWNED_EVENTS: EventSource = EventSource {
    table: "management_followup",
    key_column: "client_id",
    is_marketing: Some(false),
    client_table: "management_client",
};

pub(crate) const MANAGEMENT_LINKED_EVENTS: EventSource = EventSource {
    table: "management_followup",
    key_column: "marketing_client_id",
    is_marketing: Some(true),
    client_table: "client",
};

#[derive(Clone, Copy, Debug)]
pub(crate) enum LeadFilter<'a> {
    /// Explicit keys, active or not. Must not be empty.
    Ids(&'a [ClientId]),
    /// Every active client, optionally owned by one employee.
    Active { employee_id: Option<EmployeeId> },
}

/// Rows carrying the newest `created_at` of each lead. Several rows come
/// back for a lead only when timestamps tie; callers collapse them on id.
pub(crate) fn latest_events(backend: DatabaseBackend, source: EventSource, filter: LeadFilter<'_>) -> Statement {
    let mut params = SqlParams::new(backend);
    let key = source.key_column;
    let mut inner_where = vec![format!("f.{key} IS NOT NULL")];
    let mut join = String::new();

    if let Some(flag) = source.is_marketing {
        inner_where.push(format!("f.is_marketing = {}", params.bind(flag)));
    }
    match filter {
        LeadFilter::Ids(ids) => {
            inner_where.push(format!("f.{key} IN ({})", params.bind_list(ids.iter().copied())));
        }
        LeadFilter::Active { employee_id } => {
            join = format!(" JOIN {} c ON c.id = f.{key}", source.client_table);
            inner_where.push(format!("c.active = {}", params.bind(true)));
            if let Some(employee_id) = employee_id {
                inner_where.push(format!("c.employee_id = {}", params.bind(employee_id)));
            }
        }
    }

    let mut sql = format!(
        "SELECT e.* FROM {table} e JOIN (SELECT f.{key} AS lead_key, MAX(f.created_at) AS max_created \
         FROM {table} f{join} WHERE {conditions} GROUP BY f.{key}) m \
         ON e.{key} = m.lead_key AND e.created_at = m.max_created",
        table = source.table,
        conditions = inner_where.join(" AND "),
    );
    if let Some(flag) = source.is_marketing {
        sql.push_str(&format!(" WHERE e.is_marketing = {}", params.bind(flag)));
    }
    sql.push_str(&format!(" ORDER BY e.{key}, e.id DESC"));
    params.into_statement(sql)
}
