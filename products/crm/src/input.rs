//! Request payloads and their validation. Field names follow the JSON the
//! frontend sends (`clientID`, `employeeID`, ...).

use serde::{Deserialize, Deserializer};

use crate::{
    error::{LeadError, LeadResult},
    event::{ClientId, EmployeeId, LeadRef},
    legacy::{ParsedContact, non_blank},
    meeting::{CompleteMeeting, MeetingPayload},
    status::{ManagementStatus, MarketingStatus, PipelineStatus, SharedChannel, parse_shared},
};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
}

impl NewContact {
    /// Inline contacts count as supplied when a name or a phone is present.
    fn supplied(self) -> Option<ParsedContact> {
        let name = non_blank(self.name);
        let phone = non_blank(self.phone);
        if name.is_none() && phone.is_none() {
            return None;
        }
        Some(ParsedContact {
            name: name.or_else(|| phone.clone()).unwrap_or_default(),
            phone,
            email: non_blank(self.email),
            designation: non_blank(self.designation),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewClient {
    #[serde(rename = "employeeID", alias = "employee_id", default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub industry_type: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub contacts: Vec<NewContact>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientFields {
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
    pub contacts: Vec<ParsedContact>,
}

impl NewClient {
    pub fn validate(self) -> LeadResult<ClientFields> {
        let employee_id = required(self.employee_id, "employeeID")?;
        let company_name = required(non_blank(self.company_name), "company_name")?;
        let customer_name = required(non_blank(self.customer_name), "customer_name")?;
        let contacts = self
            .contacts
            .into_iter()
            .enumerate()
            .map(|(index, contact)| {
                let name = non_blank(contact.name)
                    .ok_or_else(|| LeadError::validation(format!("contacts[{index}].name is required")))?;
                Ok(ParsedContact {
                    name,
                    phone: non_blank(contact.phone),
                    email: non_blank(contact.email),
                    designation: non_blank(contact.designation),
                })
            })
            .collect::<LeadResult<Vec<_>>>()?;
        Ok(ClientFields {
            employee_id,
            company_name,
            customer_name,
            industry_type: non_blank(self.industry_type),
            website: non_blank(self.website),
            address: non_blank(self.address),
            city: non_blank(self.city),
            state: non_blank(self.state),
            reference: non_blank(self.reference),
            requirements: non_blank(self.requirements),
            contacts,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppendFollowup {
    #[serde(rename = "clientID", default)]
    pub client_id: Option<ClientId>,
    #[serde(rename = "employeeID", default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(rename = "nextFollowupDate", default)]
    pub next_followup_date: Option<String>,
    #[serde(rename = "contactPersonID", default)]
    pub contact_person_id: Option<i32>,
    #[serde(default)]
    pub shared: Option<String>,
    #[serde(rename = "Following", default, deserialize_with = "flag")]
    pub following: Option<bool>,
    #[serde(rename = "newContact", default)]
    pub new_contact: Option<NewContact>,
    #[serde(default)]
    pub meeting: Option<MeetingPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidFollowup {
    pub client_id: ClientId,
    pub employee_id: EmployeeId,
    pub status: MarketingStatus,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub contact_person_id: Option<i32>,
    pub shared: SharedChannel,
    /// `None` inherits the flag of the lead's latest event.
    pub following: Option<bool>,
    pub new_contact: Option<ParsedContact>,
    pub meeting: Option<CompleteMeeting>,
}

impl AppendFollowup {
    pub fn validate(self) -> LeadResult<ValidFollowup> {
        let client_id = required(self.client_id, "clientID")?;
        let employee_id = required(self.employee_id, "employeeID")?;
        let status: MarketingStatus = parse_status(self.status.as_deref())?;
        let shared = match self.shared.as_deref() {
            None => SharedChannel::NotShared,
            Some(raw) => parse_shared(raw).ok_or_else(|| {
                LeadError::validation(format!(
                    "invalid shared '{raw}'; expected one of: none, email, whatsapp, both"
                ))
            })?,
        };
        let new_contact = self
            .new_contact
            .and_then(NewContact::supplied)
            .filter(|_| crate::status::accepts_new_contact(status));
        Ok(ValidFollowup {
            client_id,
            employee_id,
            status,
            remarks: non_blank(self.remarks),
            next_followup_date: non_blank(self.next_followup_date),
            contact_person_id: self.contact_person_id,
            shared,
            following: self.following,
            new_contact,
            meeting: self.meeting.as_ref().and_then(MeetingPayload::complete),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppendManagementFollowup {
    #[serde(rename = "clientID", default)]
    pub client_id: Option<ClientId>,
    #[serde(rename = "marketingClientID", default)]
    pub marketing_client_id: Option<ClientId>,
    #[serde(rename = "isMarketing", default, deserialize_with = "flag")]
    pub is_marketing: Option<bool>,
    #[serde(rename = "employeeID", default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(rename = "nextFollowupDate", default)]
    pub next_followup_date: Option<String>,
    #[serde(rename = "contactID", default)]
    pub contact_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidManagementFollowup {
    pub target: LeadRef,
    pub employee_id: EmployeeId,
    pub status: ManagementStatus,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub contact_id: Option<i32>,
}

impl AppendManagementFollowup {
    pub fn validate(self) -> LeadResult<ValidManagementFollowup> {
        let target = if self.is_marketing.unwrap_or(false) {
            LeadRef::Marketing(required(
                self.marketing_client_id.or(self.client_id),
                "marketingClientID",
            )?)
        } else {
            LeadRef::Management(required(self.client_id, "clientID")?)
        };
        let employee_id = required(self.employee_id, "employeeID")?;
        let status: ManagementStatus = parse_status(self.status.as_deref())?;
        Ok(ValidManagementFollowup {
            target,
            employee_id,
            status,
            remarks: non_blank(self.remarks),
            next_followup_date: non_blank(self.next_followup_date),
            contact_id: self.contact_id,
        })
    }
}

/// Hand-over and return requests name a marketing client.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LeadTransfer {
    #[serde(rename = "clientID", default)]
    pub client_id: Option<ClientId>,
    #[serde(rename = "employeeID", default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidTransfer {
    pub client_id: ClientId,
    pub employee_id: EmployeeId,
    pub remarks: Option<String>,
}

impl LeadTransfer {
    pub fn validate(self) -> LeadResult<ValidTransfer> {
        Ok(ValidTransfer {
            client_id: required(self.client_id, "clientID")?,
            employee_id: required(self.employee_id, "employeeID")?,
            remarks: non_blank(self.remarks),
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> LeadResult<T> {
    value.ok_or_else(|| LeadError::validation(format!("{field} is required")))
}

pub(crate) fn parse_status<S: PipelineStatus>(raw: Option<&str>) -> LeadResult<S> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| LeadError::validation("status is required"))?;
    S::parse(raw).ok_or_else(|| {
        let allowed: Vec<_> = S::ALL.iter().map(|status| status.as_str()).collect();
        LeadError::validation(format!(
            "invalid status '{raw}'; expected one of: {}",
            allowed.join(", ")
        ))
    })
}

/// Flags arrive as booleans or as the 0/1 integers older clients send.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Bool(value)) => Ok(Some(value)),
        Some(Raw::Int(value)) => Ok(Some(value != 0)),
        Some(Raw::Text(text)) => match text.trim() {
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            "" => Ok(None),
            other => Err(serde::de::Error::custom(format!("invalid flag '{other}'"))),
        },
    }
}
