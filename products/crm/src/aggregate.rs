//! Dashboard counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    classifier::{Bucket, is_missed},
    event::FollowupEvent,
    pipeline::PipelineConfig,
};

pub const MISSED: &str = "missed";
pub const TOTAL: &str = "total";

/// Tile name to count. Every key of the pipeline is present, zero or not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<&'static str, u64>);

impl Counts {
    pub fn zeroed<B: Bucket>() -> Self {
        let mut counts = BTreeMap::new();
        for bucket in B::ALL {
            counts.insert(bucket.key(), 0);
        }
        counts.insert(MISSED, 0);
        counts.insert(TOTAL, 0);
        Self(counts)
    }

    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, key: &'static str) {
        *self.0.entry(key).or_insert(0) += 1;
    }

    pub fn set(&mut self, key: &'static str, value: u64) {
        self.0.insert(key, value);
    }

    pub fn sum(&self, keys: &[&str]) -> u64 {
        keys.iter().map(|key| self.get(key)).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn into_map(self) -> BTreeMap<&'static str, u64> {
        self.0
    }
}

/// Tally one latest-event snapshot per lead in scope. `None` entries are
/// leads without events. Each lead lands in exactly one bucket; the missed
/// overlay is counted on top.
pub fn aggregate_counts<'a, C, I>(snapshots: I, as_of: NaiveDate) -> Counts
where
    C: PipelineConfig,
    I: IntoIterator<Item = Option<&'a FollowupEvent<C::Key, C::Status>>>,
{
    let mut counts = Counts::zeroed::<C::Bucket>();
    for latest in snapshots {
        counts.increment(C::classify(latest).key());
        if is_missed(latest, as_of) {
            counts.increment(MISSED);
        }
        counts.increment(TOTAL);
    }
    C::derive_totals(&mut counts);
    counts
}
