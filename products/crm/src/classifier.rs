//! Bucket rules for both pipelines and the missed-followup overlay.

use std::{fmt::Debug, hash::Hash};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{
    event::{FollowupEvent, ManagementEvent, MarketingEvent},
    status::{ManagementStatus, MarketingStatus, PipelineStatus},
};

/// A dashboard category. Keys double as the wire names of count tiles and
/// of the `status` listing filter.
pub trait Bucket: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn key(self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|bucket| bucket.key() == raw)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketingBucket {
    NoFollowup,
    FirstFollowup,
    NotReachable,
    NotAvailable,
    NotInterested,
    SecondFollowup,
    Converted,
    Droped,
    #[serde(rename = "returned")]
    Returned,
    #[serde(rename = "returnedConverted")]
    ReturnedConverted,
    #[serde(rename = "returnedDroped")]
    ReturnedDroped,
}

impl Bucket for MarketingBucket {
    const ALL: &'static [Self] = &[
        MarketingBucket::NoFollowup,
        MarketingBucket::FirstFollowup,
        MarketingBucket::NotReachable,
        MarketingBucket::NotAvailable,
        MarketingBucket::NotInterested,
        MarketingBucket::SecondFollowup,
        MarketingBucket::Converted,
        MarketingBucket::Droped,
        MarketingBucket::Returned,
        MarketingBucket::ReturnedConverted,
        MarketingBucket::ReturnedDroped,
    ];

    fn key(self) -> &'static str {
        match self {
            MarketingBucket::NoFollowup => "no_followup",
            MarketingBucket::FirstFollowup => "first_followup",
            MarketingBucket::NotReachable => "not_reachable",
            MarketingBucket::NotAvailable => "not_available",
            MarketingBucket::NotInterested => "not_interested",
            MarketingBucket::SecondFollowup => "second_followup",
            MarketingBucket::Converted => "converted",
            MarketingBucket::Droped => "droped",
            MarketingBucket::Returned => "returned",
            MarketingBucket::ReturnedConverted => "returnedConverted",
            MarketingBucket::ReturnedDroped => "returnedDroped",
        }
    }
}

impl MarketingBucket {
    /// Sub-buckets shown together on the first-followup tile.
    pub fn in_first_followup_tile(self) -> bool {
        matches!(
            self,
            MarketingBucket::NoFollowup
                | MarketingBucket::FirstFollowup
                | MarketingBucket::NotReachable
                | MarketingBucket::NotAvailable
                | MarketingBucket::NotInterested
        )
    }

    /// Listing filter: asking for `first_followup` returns the whole tile.
    pub fn matches(self, requested: MarketingBucket) -> bool {
        if requested == MarketingBucket::FirstFollowup {
            self.in_first_followup_tile()
        } else {
            self == requested
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementBucket {
    Followup,
    Inprogress,
    Meeting,
    Proposed,
    Billing,
    Lead,
    Droped,
}

impl Bucket for ManagementBucket {
    const ALL: &'static [Self] = &[
        ManagementBucket::Followup,
        ManagementBucket::Inprogress,
        ManagementBucket::Meeting,
        ManagementBucket::Proposed,
        ManagementBucket::Billing,
        ManagementBucket::Lead,
        ManagementBucket::Droped,
    ];

    fn key(self) -> &'static str {
        match self {
            ManagementBucket::Followup => "followup",
            ManagementBucket::Inprogress => "inprogress",
            ManagementBucket::Meeting => "meeting",
            ManagementBucket::Proposed => "proposed",
            ManagementBucket::Billing => "billing",
            ManagementBucket::Lead => "lead",
            ManagementBucket::Droped => "droped",
        }
    }
}

pub fn classify_marketing(latest: Option<&MarketingEvent>) -> MarketingBucket {
    let Some(event) = latest else {
        return MarketingBucket::NoFollowup;
    };
    match (event.status, event.following) {
        (MarketingStatus::Converted, true) => MarketingBucket::ReturnedConverted,
        (MarketingStatus::Droped, true) => MarketingBucket::ReturnedDroped,
        (_, true) => MarketingBucket::Returned,
        (MarketingStatus::FirstFollowup, false) => MarketingBucket::FirstFollowup,
        (MarketingStatus::NotReachable, false) => MarketingBucket::NotReachable,
        (MarketingStatus::NotAvailable, false) => MarketingBucket::NotAvailable,
        (MarketingStatus::NotInterested, false) => MarketingBucket::NotInterested,
        (MarketingStatus::SecondFollowup, false) => MarketingBucket::SecondFollowup,
        (MarketingStatus::Converted, false) => MarketingBucket::Converted,
        (MarketingStatus::Droped, false) => MarketingBucket::Droped,
    }
}

/// Zero management events means the lead is waiting for its first followup.
pub fn classify_management(latest: Option<&ManagementEvent>) -> ManagementBucket {
    match latest.map(|event| event.status) {
        None => ManagementBucket::Followup,
        Some(ManagementStatus::Inprogress) => ManagementBucket::Inprogress,
        Some(ManagementStatus::Meeting) => ManagementBucket::Meeting,
        Some(ManagementStatus::Proposed) => ManagementBucket::Proposed,
        Some(ManagementStatus::Billing) => ManagementBucket::Billing,
        Some(ManagementStatus::Lead) => ManagementBucket::Lead,
        Some(ManagementStatus::Droped) => ManagementBucket::Droped,
    }
}

/// Classification of a marketing lead, annotated with where the lead stands
/// in management when it was handed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub bucket: MarketingBucket,
    pub management_status: Option<ManagementStatus>,
}

/// The marketing event's `Following` flag decides the returned buckets; the
/// management event never moves a lead between marketing buckets.
pub fn classify(latest: Option<&MarketingEvent>, management_latest: Option<&ManagementEvent>) -> Classification {
    Classification {
        bucket: classify_marketing(latest),
        management_status: management_latest.map(|event| event.status),
    }
}

/// True when the latest event asks for a followup strictly before `as_of`
/// and the lead is still open.
pub fn is_missed<K, S: PipelineStatus>(latest: Option<&FollowupEvent<K, S>>, as_of: NaiveDate) -> bool {
    let Some(event) = latest else {
        return false;
    };
    if event.status.is_terminal() {
        return false;
    }
    event
        .next_followup_date
        .as_deref()
        .and_then(parse_followup_date)
        .is_some_and(|due| due < as_of)
}

/// Followup dates are caller-supplied strings. Accepts a plain date, an
/// RFC 3339 timestamp or a `YYYY-MM-DD HH:MM[:SS]` datetime; anything else
/// is treated as having no date.
pub fn parse_followup_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|ts| ts.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::LeadRef, status::SharedChannel};
    use chrono::{TimeZone, Utc};

    fn marketing(status: MarketingStatus, following: bool, next: Option<&str>) -> MarketingEvent {
        MarketingEvent {
            id: 1,
            client: 1,
            contact_person_id: None,
            employee_id: 1,
            status,
            remarks: None,
            next_followup_date: next.map(str::to_string),
            shared: SharedChannel::NotShared,
            following,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    fn management(status: ManagementStatus, next: Option<&str>) -> ManagementEvent {
        ManagementEvent {
            id: 1,
            client: LeadRef::Management(1),
            contact_person_id: None,
            employee_id: 1,
            status,
            remarks: None,
            next_followup_date: next.map(str::to_string),
            shared: SharedChannel::NotShared,
            following: false,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn no_event_is_no_followup_in_first_tile() {
        let bucket = classify_marketing(None);
        assert_eq!(bucket, MarketingBucket::NoFollowup);
        assert!(bucket.in_first_followup_tile());
    }

    #[test]
    fn following_flag_selects_returned_buckets() {
        let cases = [
            (MarketingStatus::Converted, false, MarketingBucket::Converted),
            (MarketingStatus::Droped, false, MarketingBucket::Droped),
            (MarketingStatus::Converted, true, MarketingBucket::ReturnedConverted),
            (MarketingStatus::Droped, true, MarketingBucket::ReturnedDroped),
            (MarketingStatus::SecondFollowup, true, MarketingBucket::Returned),
            (MarketingStatus::NotReachable, true, MarketingBucket::Returned),
            (MarketingStatus::NotInterested, false, MarketingBucket::NotInterested),
        ];
        for (status, following, expected) in cases {
            let event = marketing(status, following, None);
            assert_eq!(classify_marketing(Some(&event)), expected, "{status:?}/{following}");
        }
    }

    #[test]
    fn management_latest_only_annotates() {
        let event = marketing(MarketingStatus::Converted, false, None);
        let handed = management(ManagementStatus::Proposed, None);
        let classification = classify(Some(&event), Some(&handed));
        assert_eq!(classification.bucket, MarketingBucket::Converted);
        assert_eq!(classification.management_status, Some(ManagementStatus::Proposed));
    }

    #[test]
    fn first_followup_filter_spans_the_tile() {
        assert!(MarketingBucket::NotAvailable.matches(MarketingBucket::FirstFollowup));
        assert!(MarketingBucket::NoFollowup.matches(MarketingBucket::FirstFollowup));
        assert!(!MarketingBucket::SecondFollowup.matches(MarketingBucket::FirstFollowup));
        assert!(!MarketingBucket::FirstFollowup.matches(MarketingBucket::NoFollowup));
    }

    #[test]
    fn bucket_keys_parse_back() {
        for bucket in MarketingBucket::ALL {
            assert_eq!(MarketingBucket::parse(bucket.key()), Some(*bucket));
            let json = serde_json::to_value(bucket).unwrap();
            assert_eq!(json, bucket.key());
        }
        assert_eq!(ManagementBucket::parse("followup"), Some(ManagementBucket::Followup));
        assert_eq!(ManagementBucket::parse("missed"), None);
    }

    #[test]
    fn management_without_events_is_followup() {
        assert_eq!(classify_management(None), ManagementBucket::Followup);
        let event = management(ManagementStatus::Billing, None);
        assert_eq!(classify_management(Some(&event)), ManagementBucket::Billing);
    }

    #[test]
    fn missed_requires_a_past_date_and_open_status() {
        let yesterday = marketing(MarketingStatus::FirstFollowup, false, Some("2025-03-09"));
        let same_day = marketing(MarketingStatus::FirstFollowup, false, Some("2025-03-10"));
        let tomorrow = marketing(MarketingStatus::FirstFollowup, false, Some("2025-03-11"));
        let closed = marketing(MarketingStatus::Converted, false, Some("2025-03-01"));
        let garbage = marketing(MarketingStatus::FirstFollowup, false, Some("next week"));

        assert!(is_missed(Some(&yesterday), today()));
        assert!(!is_missed(Some(&same_day), today()));
        assert!(!is_missed(Some(&tomorrow), today()));
        assert!(!is_missed(Some(&closed), today()));
        assert!(!is_missed(Some(&garbage), today()));
        assert!(!is_missed::<i32, MarketingStatus>(None, today()));

        let billed = management(ManagementStatus::Billing, Some("2025-01-01"));
        let meeting = management(ManagementStatus::Meeting, Some("2025-01-01"));
        assert!(!is_missed(Some(&billed), today()));
        assert!(is_missed(Some(&meeting), today()));
    }

    #[test]
    fn followup_dates_accept_common_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9);
        assert_eq!(parse_followup_date("2025-03-09"), expected);
        assert_eq!(parse_followup_date(" 2025-03-09 "), expected);
        assert_eq!(parse_followup_date("2025-03-09T18:30:00Z"), expected);
        assert_eq!(parse_followup_date("2025-03-09T18:30:00+05:30"), expected);
        assert_eq!(parse_followup_date("2025-03-09 18:30:00"), expected);
        assert_eq!(parse_followup_date("2025-03-09T18:30"), expected);
        assert_eq!(parse_followup_date("09/03/2025"), None);
        assert_eq!(parse_followup_date(""), None);
    }
}
