//! One generic followup pipeline, instantiated for marketing and for
//! management. The configs supply the vocabulary and bucket rules; the
//! resolver and aggregator are shared.

use std::{collections::HashMap, fmt::Debug, hash::Hash, marker::PhantomData};

use chrono::NaiveDate;

use crate::{
    aggregate::{Counts, aggregate_counts},
    classifier::{self, Bucket, ManagementBucket, MarketingBucket},
    event::{ClientId, FollowupEvent, LeadRef},
    resolver,
    status::{ManagementStatus, MarketingStatus, PipelineStatus},
};

pub trait PipelineConfig: Send + Sync + 'static {
    type Key: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static;
    type Status: PipelineStatus;
    type Bucket: Bucket;

    /// Span and event label, e.g. `marketing`.
    const NAME: &'static str;

    fn classify(latest: Option<&FollowupEvent<Self::Key, Self::Status>>) -> Self::Bucket;

    /// Whether a lead in `bucket` belongs in a listing filtered by `requested`.
    fn matches(bucket: Self::Bucket, requested: Self::Bucket) -> bool {
        bucket == requested
    }

    /// Composite tiles computed from the per-bucket counts.
    fn derive_totals(_counts: &mut Counts) {}
}

#[derive(Debug, Clone, Copy)]
pub struct Marketing;

#[derive(Debug, Clone, Copy)]
pub struct Management;

const FIRST_FOLLOWUP_TILE: [&str; 5] = [
    "no_followup",
    "first_followup",
    "not_reachable",
    "not_available",
    "not_interested",
];

// Reproduces the dashboard figure: converted and droped are counted here and
// in their own tiles.
const SECOND_FOLLOWUP_TILE: [&str; 3] = ["second_followup", "converted", "droped"];

impl PipelineConfig for Marketing {
    type Key = ClientId;
    type Status = MarketingStatus;
    type Bucket = MarketingBucket;

    const NAME: &'static str = "marketing";

    fn classify(latest: Option<&FollowupEvent<ClientId, MarketingStatus>>) -> MarketingBucket {
        classifier::classify_marketing(latest)
    }

    fn matches(bucket: MarketingBucket, requested: MarketingBucket) -> bool {
        bucket.matches(requested)
    }

    fn derive_totals(counts: &mut Counts) {
        counts.set("total_first_followup", counts.sum(&FIRST_FOLLOWUP_TILE));
        counts.set("total_second_followup", counts.sum(&SECOND_FOLLOWUP_TILE));
    }
}

impl PipelineConfig for Management {
    type Key = LeadRef;
    type Status = ManagementStatus;
    type Bucket = ManagementBucket;

    const NAME: &'static str = "management";

    fn classify(latest: Option<&FollowupEvent<LeadRef, ManagementStatus>>) -> ManagementBucket {
        classifier::classify_management(latest)
    }
}

/// Stateless entry point over a pipeline config.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowupPipeline<C>(PhantomData<fn() -> C>);

pub type MarketingPipeline = FollowupPipeline<Marketing>;
pub type ManagementPipeline = FollowupPipeline<Management>;

pub type PipelineEvent<C> = FollowupEvent<<C as PipelineConfig>::Key, <C as PipelineConfig>::Status>;

impl<C: PipelineConfig> FollowupPipeline<C> {
    pub fn name() -> &'static str {
        C::NAME
    }

    pub fn parse_status(raw: &str) -> Option<C::Status> {
        C::Status::parse(raw)
    }

    pub fn parse_bucket(raw: &str) -> Option<C::Bucket> {
        C::Bucket::parse(raw)
    }

    pub fn resolve_latest<Keys, Events>(keys: Keys, events: Events) -> HashMap<C::Key, Option<PipelineEvent<C>>>
    where
        Keys: IntoIterator<Item = C::Key>,
        Events: IntoIterator<Item = PipelineEvent<C>>,
    {
        resolver::resolve_latest(keys, events)
    }

    pub fn classify(latest: Option<&PipelineEvent<C>>) -> C::Bucket {
        C::classify(latest)
    }

    pub fn matches(bucket: C::Bucket, requested: C::Bucket) -> bool {
        C::matches(bucket, requested)
    }

    pub fn is_missed(latest: Option<&PipelineEvent<C>>, as_of: NaiveDate) -> bool {
        classifier::is_missed(latest, as_of)
    }

    pub fn aggregate_counts<'a, I>(snapshots: I, as_of: NaiveDate) -> Counts
    where
        I: IntoIterator<Item = Option<&'a PipelineEvent<C>>>,
    {
        aggregate_counts::<C, I>(snapshots, as_of)
    }
}
