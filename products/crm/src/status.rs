//! Closed status vocabularies of the two pipelines.

use std::{fmt::Debug, hash::Hash};

use entity::{followup, management_followup};

pub use followup::{SharedChannel, Status as MarketingStatus};
pub use management_followup::Status as ManagementStatus;

/// Behaviour every pipeline status enum shares. Parsing is strict: a value
/// outside [`PipelineStatus::ALL`] is rejected instead of being bucketed.
pub trait PipelineStatus: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Terminal statuses close the lead; they never count as missed.
    fn is_terminal(self) -> bool;

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|status| status.as_str() == raw)
    }
}

impl PipelineStatus for MarketingStatus {
    const ALL: &'static [Self] = &[
        MarketingStatus::FirstFollowup,
        MarketingStatus::SecondFollowup,
        MarketingStatus::NotAvailable,
        MarketingStatus::NotInterested,
        MarketingStatus::NotReachable,
        MarketingStatus::Converted,
        MarketingStatus::Droped,
    ];

    fn as_str(self) -> &'static str {
        match self {
            MarketingStatus::FirstFollowup => "first_followup",
            MarketingStatus::SecondFollowup => "second_followup",
            MarketingStatus::NotAvailable => "not_available",
            MarketingStatus::NotInterested => "not_interested",
            MarketingStatus::NotReachable => "not_reachable",
            MarketingStatus::Converted => "converted",
            MarketingStatus::Droped => "droped",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, MarketingStatus::Converted | MarketingStatus::Droped)
    }
}

impl PipelineStatus for ManagementStatus {
    const ALL: &'static [Self] = &[
        ManagementStatus::Inprogress,
        ManagementStatus::Meeting,
        ManagementStatus::Proposed,
        ManagementStatus::Billing,
        ManagementStatus::Lead,
        ManagementStatus::Droped,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ManagementStatus::Inprogress => "inprogress",
            ManagementStatus::Meeting => "meeting",
            ManagementStatus::Proposed => "proposed",
            ManagementStatus::Billing => "billing",
            ManagementStatus::Lead => "lead",
            ManagementStatus::Droped => "droped",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, ManagementStatus::Billing | ManagementStatus::Droped)
    }
}

/// Marketing statuses that may create a contact person inline: the caller
/// reached someone other than the recorded contact.
pub fn accepts_new_contact(status: MarketingStatus) -> bool {
    matches!(
        status,
        MarketingStatus::NotAvailable | MarketingStatus::NotReachable
    )
}

pub fn shared_str(shared: SharedChannel) -> &'static str {
    match shared {
        SharedChannel::NotShared => "none",
        SharedChannel::Email => "email",
        SharedChannel::Whatsapp => "whatsapp",
        SharedChannel::Both => "both",
    }
}

pub fn parse_shared(raw: &str) -> Option<SharedChannel> {
    match raw.trim() {
        "" | "none" => Some(SharedChannel::NotShared),
        "email" => Some(SharedChannel::Email),
        "whatsapp" => Some(SharedChannel::Whatsapp),
        "both" => Some(SharedChannel::Both),
        _ => None,
    }
}
