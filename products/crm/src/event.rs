//! The pipeline-agnostic followup event and the keys that identify a lead.

use chrono::{DateTime, Utc};
use entity::{followup, management_followup};
use serde::Serialize;

use crate::{
    error::{LeadError, LeadResult},
    status::{ManagementStatus, MarketingStatus, SharedChannel},
};

pub type ClientId = i32;
pub type EmployeeId = i32;
pub type FollowupId = i32;

/// One immutable status change of a lead. `K` identifies the lead inside its
/// pipeline, `S` is the pipeline's status vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupEvent<K, S> {
    pub id: FollowupId,
    #[serde(rename = "clientID")]
    pub client: K,
    #[serde(rename = "contactPersonID")]
    pub contact_person_id: Option<i32>,
    #[serde(rename = "employeeID")]
    pub employee_id: EmployeeId,
    pub status: S,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub shared: SharedChannel,
    #[serde(rename = "Following")]
    pub following: bool,
    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl<K, S> FollowupEvent<K, S> {
    /// Total order used to pick the latest event of a lead.
    pub fn order_key(&self) -> (DateTime<Utc>, FollowupId) {
        (self.created_at, self.id)
    }
}

pub type MarketingEvent = FollowupEvent<ClientId, MarketingStatus>;
pub type ManagementEvent = FollowupEvent<LeadRef, ManagementStatus>;

/// A lead in the management pipeline is either owned by management or is a
/// marketing client that was handed over.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LeadRef {
    Management(ClientId),
    Marketing(ClientId),
}

impl LeadRef {
    pub fn from_target(client_id: ClientId, is_marketing: bool) -> Self {
        if is_marketing {
            LeadRef::Marketing(client_id)
        } else {
            LeadRef::Management(client_id)
        }
    }

    pub fn id(self) -> ClientId {
        match self {
            LeadRef::Management(id) | LeadRef::Marketing(id) => id,
        }
    }

    pub fn is_marketing(self) -> bool {
        matches!(self, LeadRef::Marketing(_))
    }
}

impl From<followup::Model> for MarketingEvent {
    fn from(model: followup::Model) -> Self {
        Self {
            id: model.id,
            client: model.client_id,
            contact_person_id: model.contact_person_id,
            employee_id: model.employee_id,
            status: model.status,
            remarks: model.remarks,
            next_followup_date: model.next_followup_date,
            shared: model.shared,
            following: model.following,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<management_followup::Model> for ManagementEvent {
    type Error = LeadError;

    fn try_from(model: management_followup::Model) -> LeadResult<Self> {
        let client = match (model.is_marketing, model.client_id, model.marketing_client_id) {
            (true, _, Some(id)) => LeadRef::Marketing(id),
            (false, Some(id), _) => LeadRef::Management(id),
            _ => {
                return Err(LeadError::integrity(format!(
                    "management followup {} has no client for is_marketing={}",
                    model.id, model.is_marketing
                )))
            }
        };
        Ok(Self {
            id: model.id,
            client,
            contact_person_id: model.contact_id,
            employee_id: model.employee_id,
            status: model.status,
            remarks: model.remarks,
            next_followup_date: model.next_followup_date,
            shared: SharedChannel::NotShared,
            following: false,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}
