//! Persisted tables of the lead tracker.
//!
//! Marketing and management pipelines keep separate client and event
//! tables; the management side may point back at a marketing client.

pub mod client;
pub mod contact_person;
pub mod followup;
pub mod management_client;
pub mod management_contact;
pub mod management_followup;
pub mod meeting;
