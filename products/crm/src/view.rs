//! Read models returned by the stores and serialized by the HTTP layer.

use chrono::{DateTime, Utc};
use entity::{client, contact_person, management_client, management_contact, meeting};
use serde::Serialize;

use crate::{
    classifier::{ManagementBucket, MarketingBucket},
    event::{ClientId, EmployeeId, LeadRef, ManagementEvent, MarketingEvent},
    status::ManagementStatus,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactView {
    pub id: i32,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub designation: Option<String>,
}

impl From<contact_person::Model> for ContactView {
    fn from(model: contact_person::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            designation: model.designation,
        }
    }
}

impl From<management_contact::Model> for ContactView {
    fn from(model: management_contact::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            designation: model.designation,
        }
    }
}

/// Identity of a client in either pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientDetails {
    pub id: ClientId,
    #[serde(rename = "employeeID")]
    pub employee_id: EmployeeId,
    pub company_name: String,
    pub customer_name: String,
    pub industry_type: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub reference: Option<String>,
    pub requirements: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub contacts: Vec<ContactView>,
}

macro_rules! client_details_from {
    ($model:ty) => {
        impl From<$model> for ClientDetails {
            fn from(model: $model) -> Self {
                Self {
                    id: model.id,
                    employee_id: model.employee_id,
                    company_name: model.company_name,
                    customer_name: model.customer_name,
                    industry_type: model.industry_type,
                    website: model.website,
                    address: model.address,
                    city: model.city,
                    state: model.state,
                    reference: model.reference,
                    requirements: model.requirements,
                    active: model.active,
                    created_at: model.created_at.with_timezone(&Utc),
                    updated_at: model.updated_at.with_timezone(&Utc),
                    contacts: Vec::new(),
                }
            }
        }
    };
}

client_details_from!(client::Model);
client_details_from!(management_client::Model);

impl ClientDetails {
    pub fn with_contacts(mut self, contacts: Vec<ContactView>) -> Self {
        self.contacts = contacts;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingView {
    pub id: i32,
    #[serde(rename = "followupID")]
    pub followup_id: i32,
    #[serde(rename = "employeeID")]
    pub employee_id: EmployeeId,
    pub title: String,
    pub meeting_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl From<meeting::Model> for MeetingView {
    fn from(model: meeting::Model) -> Self {
        Self {
            id: model.id,
            followup_id: model.followup_id,
            employee_id: model.employee_id,
            title: model.title,
            meeting_date: model.meeting_date,
            start_time: model.start_time,
            end_time: model.end_time,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// One row of a marketing bucket listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarketingLead {
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    pub client_details: ClientDetails,
    pub latest_status: Option<MarketingEvent>,
    pub bucket: MarketingBucket,
    pub missed: bool,
    pub management_status: Option<ManagementStatus>,
    /// Newest first.
    pub history: Vec<MarketingEvent>,
    pub meetings: Vec<MeetingView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManagementLead {
    #[serde(rename = "clientID")]
    pub client: LeadRef,
    pub client_details: ClientDetails,
    pub latest_status: Option<ManagementEvent>,
    pub bucket: ManagementBucket,
    pub missed: bool,
    /// Newest first.
    pub history: Vec<ManagementEvent>,
}
