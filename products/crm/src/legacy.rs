//! The embedded JSON contact array older management records carried
//! (`[{id, name, phone, email, designation}]`). Only used to import and
//! export; contacts are stored as normalized rows.

use entity::management_contact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LeadError, LeadResult};

/// Incoming legacy contact. The legacy `id` is ignored; rows get a fresh id.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LegacyContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedContact {
    pub id: i32,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub designation: Option<String>,
}

impl From<management_contact::Model> for ExportedContact {
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

/// A contact ready to insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedContact {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub designation: Option<String>,
}

/// Accepts the array itself or the array double-encoded as a JSON string,
/// both of which occur in legacy exports. `null` is an empty list.
pub fn parse_legacy_contacts(raw: Value) -> LeadResult<Vec<ParsedContact>> {
    let value = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::String(text) if text.trim().is_empty() => return Ok(Vec::new()),
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|err| LeadError::validation(format!("contacts is not valid JSON: {err}")))?,
        other => other,
    };
    let contacts: Vec<LegacyContact> = serde_json::from_value(value)
        .map_err(|err| LeadError::validation(format!("contacts must be an array of contacts: {err}")))?;
    contacts
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
        .collect()
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
