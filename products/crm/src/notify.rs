//! Post-append hook. The stores publish a [`LeadChanged`] after every
//! committed append; whoever cares subscribes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::{EmployeeId, FollowupId, LeadRef};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    Marketing,
    Management,
}

impl Pipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Pipeline::Marketing => "marketing",
            Pipeline::Management => "management",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeadChanged {
    pub pipeline: Pipeline,
    pub lead: LeadRef,
    pub followup_id: FollowupId,
    pub status: &'static str,
    pub employee_id: EmployeeId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LeadEvents {
    sender: broadcast::Sender<LeadChanged>,
}

impl LeadEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Never fails: with no subscribers the event is dropped.
    pub fn publish(&self, event: LeadChanged) {
        if let Err(err) = self.sender.send(event) {
            debug!(followup_id = err.0.followup_id, "lead change had no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LeadEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
