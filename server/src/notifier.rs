use products_crm::{LeadChanged, LeadEvents};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{info, warn};

/// Logs every lead change. Stands in for the realtime push collaborator.
pub fn spawn_lead_logger(events: &LeadEvents) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(change) => log_change(&change),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "lead change logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_change(change: &LeadChanged) {
    info!(
        pipeline = change.pipeline.as_str(),
        lead = ?change.lead,
        followup_id = change.followup_id,
        status = change.status,
        employee_id = change.employee_id,
        at = %change.at,
        "lead changed"
    );
}
