use entity::{client, contact_person, followup, meeting};
use products_crm::{
    LeadError, MarketingBucket, MarketingStatus, Pipeline,
    input::{AppendFollowup, NewContact},
    meeting::MeetingPayload,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use suite_tests::{TestCrm, as_of, followup as request, new_client};

const BUCKET_KEYS: [&str; 11] = [
    "no_followup",
    "first_followup",
    "not_reachable",
    "not_available",
    "not_interested",
    "second_followup",
    "converted",
    "droped",
    "returned",
    "returnedConverted",
    "returnedDroped",
];

fn dated(client_id: i32, status: &str, next: &str) -> AppendFollowup {
    AppendFollowup {
        next_followup_date: Some(next.to_string()),
        ..request(client_id, status)
    }
}

#[tokio::test]
async fn appending_never_rewrites_earlier_events() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Acme").await;
    crm.append(id, "first_followup").await;
    let before = crm.store.client_followups(id).await.unwrap();

    crm.append(id, "second_followup").await;
    let after = crm.store.client_followups(id).await.unwrap();

    assert_eq!(after.len(), 2);
    assert_eq!(after[0].status, MarketingStatus::SecondFollowup);
    assert_eq!(after[1], before[0]);
}

#[tokio::test]
async fn same_instant_events_resolve_to_the_higher_id() {
    let crm = TestCrm::new().await;
    let busy = crm.client(1, "Busy").await;
    let idle = crm.client(1, "Idle").await;

    // No tick in between: both rows share created_at.
    let first = crm.store.append_followup(request(busy, "first_followup")).await.unwrap();
    let second = crm.store.append_followup(request(busy, "not_reachable")).await.unwrap();
    assert_eq!(first.created_at, second.created_at);

    let latest = crm.store.resolve_latest(&[busy, idle]).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[&busy].as_ref().map(|event| event.id), Some(second.id));
    assert!(latest[&idle].is_none());
}

#[tokio::test]
async fn lead_walks_through_the_buckets() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Walker").await;

    let bucket_of = |counts: &products_crm::Counts| {
        BUCKET_KEYS
            .iter()
            .copied()
            .find(|key| counts.get(key) == 1)
            .map(str::to_string)
    };

    let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(bucket_of(&counts).as_deref(), Some("no_followup"));

    for (status, bucket) in [
        ("first_followup", "first_followup"),
        ("second_followup", "second_followup"),
        ("converted", "converted"),
    ] {
        crm.append(id, status).await;
        let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
        assert_eq!(bucket_of(&counts).as_deref(), Some(bucket), "after {status}");
    }

    let returned = AppendFollowup {
        following: Some(true),
        ..request(id, "droped")
    };
    crm.store.append_followup(returned).await.unwrap();
    let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(bucket_of(&counts).as_deref(), Some("returnedDroped"));
}

#[tokio::test]
async fn following_flag_is_inherited_when_omitted() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Sticky").await;
    let flagged = AppendFollowup {
        following: Some(true),
        ..request(id, "first_followup")
    };
    crm.store.append_followup(flagged).await.unwrap();
    crm.tick();

    let next = crm.store.append_followup(request(id, "converted")).await.unwrap();
    assert!(next.following);

    let leads = crm
        .store
        .list_followups(MarketingBucket::ReturnedConverted, None, as_of())
        .await
        .unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].client_id, id);
}

#[tokio::test]
async fn meeting_is_stored_only_when_complete() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Meet").await;

    let partial = AppendFollowup {
        meeting: Some(MeetingPayload {
            title: Some("Demo".into()),
            date: Some("2025-03-12".into()),
            start_time: Some("10:00".into()),
            end_time: None,
        }),
        ..request(id, "second_followup")
    };
    crm.store.append_followup(partial).await.unwrap();
    assert_eq!(meeting::Entity::find().count(crm.store.db()).await.unwrap(), 0);
    crm.tick();

    let full = AppendFollowup {
        meeting: Some(MeetingPayload {
            title: Some("Demo".into()),
            date: Some("2025-03-12".into()),
            start_time: Some("10:00".into()),
            end_time: Some("11:00".into()),
        }),
        ..request(id, "second_followup")
    };
    let event = crm.store.append_followup(full).await.unwrap();
    let meetings = meeting::Entity::find().all(crm.store.db()).await.unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].followup_id, event.id);
    assert_eq!(meetings[0].end_time, "11:00");
    assert_eq!(followup::Entity::find().count(crm.store.db()).await.unwrap(), 2);
}

#[tokio::test]
async fn missed_overlay_uses_the_supplied_date() {
    let crm = TestCrm::new().await;
    let overdue = crm.client(1, "Overdue").await;
    let due_today = crm.client(1, "Today").await;
    let closed = crm.client(1, "Closed").await;

    crm.store.append_followup(dated(overdue, "first_followup", "2025-03-09")).await.unwrap();
    crm.store.append_followup(dated(due_today, "second_followup", "2025-03-10")).await.unwrap();
    crm.store.append_followup(dated(closed, "converted", "2025-03-01")).await.unwrap();

    let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(counts.get("missed"), 1);

    let later = as_of().succ_opt().unwrap();
    let counts = crm.store.marketing_counts(None, later).await.unwrap();
    assert_eq!(counts.get("missed"), 2);

    let leads = crm
        .store
        .list_followups(MarketingBucket::FirstFollowup, None, as_of())
        .await
        .unwrap();
    assert_eq!(leads.len(), 1);
    assert!(leads[0].missed);
}

#[tokio::test]
async fn deactivated_clients_leave_counts_and_come_back_intact() {
    let crm = TestCrm::new().await;
    let kept = crm.client(1, "Kept").await;
    let paused = crm.client(1, "Paused").await;
    crm.append(kept, "first_followup").await;
    crm.append(paused, "second_followup").await;
    let history = crm.store.client_followups(paused).await.unwrap();

    let details = crm.store.set_client_active(paused, false).await.unwrap();
    assert!(!details.active);

    let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(counts.get("total"), 1);
    assert_eq!(counts.get("second_followup"), 0);
    let listed = crm
        .store
        .list_followups(MarketingBucket::SecondFollowup, None, as_of())
        .await
        .unwrap();
    assert!(listed.is_empty());
    let visible = crm.store.list_clients(None, false).await.unwrap();
    assert_eq!(visible.iter().map(|client| client.id).collect::<Vec<_>>(), vec![kept]);
    assert_eq!(crm.store.list_clients(None, true).await.unwrap().len(), 2);

    let err = crm
        .store
        .append_followup(request(paused, "converted"))
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::NotFound { .. }));

    crm.store.set_client_active(paused, true).await.unwrap();
    let counts = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(counts.get("total"), 2);
    assert_eq!(counts.get("second_followup"), 1);
    assert_eq!(crm.store.client_followups(paused).await.unwrap(), history);
}

#[tokio::test]
async fn counts_partition_the_scope() {
    let crm = TestCrm::new().await;
    let statuses = [
        "first_followup",
        "not_reachable",
        "not_available",
        "not_interested",
        "second_followup",
        "converted",
        "droped",
    ];
    for (index, status) in statuses.iter().enumerate() {
        let id = crm.client(1, &format!("Lead {index}")).await;
        crm.append(id, status).await;
    }
    crm.client(1, "Fresh").await;
    let other = crm.client(2, "Elsewhere").await;
    crm.append(other, "converted").await;

    let counts = crm.store.marketing_counts(Some(1), as_of()).await.unwrap();
    assert_eq!(counts.keys().count(), 15);
    assert_eq!(counts.get("total"), 8);
    let bucket_sum: u64 = BUCKET_KEYS.iter().map(|key| counts.get(key)).sum();
    assert_eq!(bucket_sum, counts.get("total"));
    assert_eq!(counts.get("no_followup"), 1);
    assert_eq!(counts.get("converted"), 1);
    assert_eq!(counts.get("total_first_followup"), 5);
    assert_eq!(counts.get("total_second_followup"), 3);

    let everyone = crm.store.marketing_counts(None, as_of()).await.unwrap();
    assert_eq!(everyone.get("total"), 9);
    assert_eq!(everyone.get("converted"), 2);
}

#[tokio::test]
async fn inline_contact_is_created_for_unreached_leads() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Reach").await;

    let unreached = AppendFollowup {
        new_contact: Some(NewContact {
            phone: Some("98450 11111".into()),
            ..NewContact::default()
        }),
        ..request(id, "not_reachable")
    };
    let event = crm.store.append_followup(unreached).await.unwrap();
    let contact_id = event.contact_person_id.expect("contact linked");

    let details = crm.store.get_client(id).await.unwrap();
    assert_eq!(details.contacts.len(), 1);
    assert_eq!(details.contacts[0].id, contact_id);
    assert_eq!(details.contacts[0].name, "98450 11111");
    crm.tick();

    let converted = AppendFollowup {
        new_contact: Some(NewContact {
            name: Some("Ravi".into()),
            ..NewContact::default()
        }),
        ..request(id, "converted")
    };
    let event = crm.store.append_followup(converted).await.unwrap();
    assert!(event.contact_person_id.is_none());
    assert_eq!(contact_person::Entity::find().count(crm.store.db()).await.unwrap(), 1);

    let foreign = crm.client(1, "Other").await;
    let borrowed = AppendFollowup {
        contact_person_id: Some(contact_id),
        ..request(foreign, "first_followup")
    };
    let err = crm.store.append_followup(borrowed).await.unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));
}

#[tokio::test]
async fn rejected_appends_write_nothing() {
    let crm = TestCrm::new().await;
    let id = crm.client(1, "Strict").await;

    let err = crm.store.append_followup(request(9_999, "first_followup")).await.unwrap_err();
    assert!(matches!(err, LeadError::NotFound { entity: "client", id: 9_999 }));

    let err = crm.store.append_followup(request(id, "won")).await.unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));

    let missing_status = AppendFollowup {
        status: None,
        ..request(id, "")
    };
    let err = crm.store.append_followup(missing_status).await.unwrap_err();
    assert_eq!(err.to_string(), "status is required");

    assert_eq!(followup::Entity::find().count(crm.store.db()).await.unwrap(), 0);
    assert!(matches!(
        crm.store.client_followups(9_999).await.unwrap_err(),
        LeadError::NotFound { .. }
    ));
}

#[tokio::test]
async fn first_followup_listing_covers_the_tile() {
    let crm = TestCrm::new().await;
    let fresh = crm.client(1, "Fresh").await;
    let called = crm.client(1, "Called").await;
    let unreachable = crm.client(1, "Unreachable").await;
    let advanced = crm.client(1, "Advanced").await;

    crm.append(called, "first_followup").await;
    crm.append(unreachable, "first_followup").await;
    crm.append(unreachable, "not_reachable").await;
    crm.append(advanced, "second_followup").await;
    let with_meeting = AppendFollowup {
        meeting: Some(MeetingPayload {
            title: Some("Kickoff".into()),
            date: Some("2025-03-11".into()),
            start_time: Some("09:30".into()),
            end_time: Some("10:00".into()),
        }),
        ..request(called, "first_followup")
    };
    crm.store.append_followup(with_meeting).await.unwrap();

    let leads = crm
        .store
        .list_followups(MarketingBucket::FirstFollowup, None, as_of())
        .await
        .unwrap();
    let ids: Vec<_> = leads.iter().map(|lead| lead.client_id).collect();
    // Most recently worked first, leads without events last.
    assert_eq!(ids, vec![called, unreachable, fresh]);

    let unreached = &leads[1];
    assert_eq!(unreached.bucket, MarketingBucket::NotReachable);
    assert_eq!(unreached.history.len(), 2);
    assert_eq!(unreached.history[0].status, MarketingStatus::NotReachable);
    assert_eq!(unreached.history[1].status, MarketingStatus::FirstFollowup);

    assert_eq!(leads[0].meetings.len(), 1);
    assert_eq!(leads[0].meetings[0].title, "Kickoff");
    assert!(leads[2].latest_status.is_none());
    assert_eq!(leads[2].bucket, MarketingBucket::NoFollowup);

    let narrow = crm
        .store
        .list_followups(MarketingBucket::NotReachable, None, as_of())
        .await
        .unwrap();
    assert_eq!(narrow.len(), 1);
    assert_eq!(narrow[0].client_id, unreachable);
}

#[tokio::test]
async fn import_is_all_or_nothing() {
    let crm = TestCrm::new().await;
    let broken = products_crm::input::NewClient {
        company_name: None,
        ..new_client(1, "Broken")
    };
    let err = crm
        .store
        .import_clients(vec![new_client(1, "Good"), broken])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "clients[1]: company_name is required");
    assert_eq!(client::Entity::find().count(crm.store.db()).await.unwrap(), 0);

    let ids = crm
        .store
        .import_clients(vec![new_client(1, "One"), new_client(2, "Two")])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(crm.store.list_clients(Some(2), false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn appends_are_published_after_commit() {
    let crm = TestCrm::new().await;
    let mut changes = crm.store.events().subscribe();
    let id = crm.client(1, "Loud").await;

    let event = crm.store.append_followup(request(id, "first_followup")).await.unwrap();
    let change = changes.recv().await.unwrap();
    assert_eq!(change.pipeline, Pipeline::Marketing);
    assert_eq!(change.followup_id, event.id);
    assert_eq!(change.status, "first_followup");
    assert_eq!(change.at, event.created_at);

    let _ = crm.store.append_followup(request(id, "bogus")).await;
    assert!(changes.try_recv().is_err());
}
