//! Latest-event resolution. The latest event of a lead is the one with the
//! greatest `(created_at, id)`; arrival order never matters.

use std::{collections::HashMap, hash::Hash};

use crate::event::FollowupEvent;

/// Resolve the latest event for every requested key. Keys without events map
/// to `None`; events for keys that were not requested are ignored.
pub fn resolve_latest<K, S, Keys, Events>(keys: Keys, events: Events) -> HashMap<K, Option<FollowupEvent<K, S>>>
where
    K: Copy + Eq + Hash,
    Keys: IntoIterator<Item = K>,
    Events: IntoIterator<Item = FollowupEvent<K, S>>,
{
    let mut resolved: HashMap<K, Option<FollowupEvent<K, S>>> =
        keys.into_iter().map(|key| (key, None)).collect();
    for event in events {
        if let Some(slot) = resolved.get_mut(&event.client) {
            keep_latest(slot, event);
        }
    }
    resolved
}

/// Collapse an event stream to one latest event per key.
pub fn latest_by_key<K, S, Events>(events: Events) -> HashMap<K, FollowupEvent<K, S>>
where
    K: Copy + Eq + Hash,
    Events: IntoIterator<Item = FollowupEvent<K, S>>,
{
    let mut latest: HashMap<K, FollowupEvent<K, S>> = HashMap::new();
    for event in events {
        match latest.get_mut(&event.client) {
            Some(current) if current.order_key() >= event.order_key() => {}
            Some(current) => *current = event,
            None => {
                latest.insert(event.client, event);
            }
        }
    }
    latest
}

fn keep_latest<K, S>(slot: &mut Option<FollowupEvent<K, S>>, event: FollowupEvent<K, S>) {
    let newer = slot
        .as_ref()
        .map_or(true, |current| event.order_key() > current.order_key());
    if newer {
        *slot = Some(event);
    }
}

/// Sort a history newest first, by the same key the resolver uses.
pub fn sort_newest_first<K, S>(events: &mut [FollowupEvent<K, S>]) {
    events.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::MarketingEvent,
        status::{MarketingStatus, SharedChannel},
    };
    use chrono::{Duration, TimeZone, Utc};

    fn event(id: i32, client: i32, minutes: i64, status: MarketingStatus) -> MarketingEvent {
        MarketingEvent {
            id,
            client,
            contact_person_id: None,
            employee_id: 1,
            status,
            remarks: None,
            next_followup_date: None,
            shared: SharedChannel::NotShared,
            following: false,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn latest_wins_regardless_of_arrival_order() {
        let events = vec![
            event(3, 1, 30, MarketingStatus::Converted),
            event(1, 1, 10, MarketingStatus::FirstFollowup),
            event(2, 1, 20, MarketingStatus::SecondFollowup),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        for batch in [events, reversed] {
            let latest = resolve_latest([1], batch);
            assert_eq!(latest[&1].as_ref().map(|e| e.id), Some(3));
        }
    }

    #[test]
    fn equal_timestamps_break_ties_on_id() {
        let events = vec![
            event(8, 5, 0, MarketingStatus::Droped),
            event(4, 5, 0, MarketingStatus::FirstFollowup),
        ];
        let latest = resolve_latest([5], events.clone());
        assert_eq!(latest[&5].as_ref().map(|e| e.id), Some(8));

        let collapsed = latest_by_key(events.into_iter().rev());
        assert_eq!(collapsed[&5].id, 8);
    }

    #[test]
    fn keys_without_events_resolve_to_none() {
        let latest = resolve_latest([1, 2], vec![event(1, 1, 0, MarketingStatus::FirstFollowup)]);
        assert!(latest[&1].is_some());
        assert!(latest[&2].is_none());
    }

    #[test]
    fn unrequested_keys_are_ignored() {
        let latest = resolve_latest([1], vec![event(1, 9, 0, MarketingStatus::FirstFollowup)]);
        assert_eq!(latest.len(), 1);
        assert!(latest[&1].is_none());
    }

    #[test]
    fn history_sorts_newest_first() {
        let mut history = vec![
            event(1, 1, 0, MarketingStatus::FirstFollowup),
            event(3, 1, 5, MarketingStatus::Converted),
            event(2, 1, 5, MarketingStatus::SecondFollowup),
        ];
        sort_newest_first(&mut history);
        let ids: Vec<_> = history.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
