//! Event management through the event service.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use voloconnect_core::types::{EventFilter, EventStatus, EventUpdate, UserId};
use voloconnect_core::LedgerError;
use voloconnect_testing::{LedgerHarness, sample_event};

#[tokio::test]
async fn test_create_event_defaults() {
    let harness = LedgerHarness::new();
    let organizer = UserId::new();

    let event = harness
        .events
        .create_event(organizer, sample_event(12))
        .await
        .unwrap();

    assert_eq!(event.organizer_id, organizer);
    assert_eq!(event.capacity, 12);
    assert_eq!(event.current_volunteers, 0);
    assert_eq!(event.status, EventStatus::Active);
    assert_eq!(harness.events.get_event(event.id).await.unwrap(), event);
}

#[tokio::test]
async fn test_create_event_rejects_zero_capacity() {
    let harness = LedgerHarness::new();

    let result = harness
        .events
        .create_event(UserId::new(), sample_event(0))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    assert_eq!(harness.ledger.event_count(), 0);
}

#[tokio::test]
async fn test_update_is_organizer_only() {
    let harness = LedgerHarness::new();
    let organizer = UserId::new();
    let event = harness
        .events
        .create_event(organizer, sample_event(3))
        .await
        .unwrap();
    let update = EventUpdate {
        title: Some("Renamed".to_string()),
        ..EventUpdate::default()
    };

    let forbidden = harness
        .events
        .update_event(event.id, UserId::new(), update.clone())
        .await;
    assert!(matches!(forbidden, Err(LedgerError::Forbidden(_))));

    let updated = harness
        .events
        .update_event(event.id, organizer, update)
        .await
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.capacity, 3);
}

#[tokio::test]
async fn test_capacity_cannot_drop_below_current_volunteers() {
    let harness = LedgerHarness::new();
    let organizer = UserId::new();
    let event = harness
        .events
        .create_event(organizer, sample_event(3))
        .await
        .unwrap();
    harness
        .participation
        .join_event(event.id, UserId::new())
        .await
        .unwrap();
    harness
        .participation
        .join_event(event.id, UserId::new())
        .await
        .unwrap();

    let too_low = harness
        .events
        .update_event(
            event.id,
            organizer,
            EventUpdate {
                capacity: Some(1),
                ..EventUpdate::default()
            },
        )
        .await;
    assert!(matches!(too_low, Err(LedgerError::Validation(_))));
    assert_eq!(harness.ledger.event(event.id).unwrap().capacity, 3);

    let exact = harness
        .events
        .update_event(
            event.id,
            organizer,
            EventUpdate {
                capacity: Some(2),
                ..EventUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(exact.capacity, 2);
    assert_eq!(exact.status, EventStatus::Full);
}

#[tokio::test]
async fn test_delete_cascades_to_participation_and_queries() {
    let harness = LedgerHarness::new();
    let organizer = UserId::new();
    let volunteer = UserId::new();
    let event = harness
        .events
        .create_event(organizer, sample_event(3))
        .await
        .unwrap();
    harness
        .participation
        .join_event(event.id, volunteer)
        .await
        .unwrap();
    harness
        .queries
        .create_query(event.id, volunteer, "Is lunch provided?")
        .await
        .unwrap();

    let forbidden = harness.events.delete_event(event.id, volunteer).await;
    assert!(matches!(forbidden, Err(LedgerError::Forbidden(_))));

    harness.events.delete_event(event.id, organizer).await.unwrap();

    assert!(harness.ledger.event(event.id).is_none());
    assert_eq!(harness.ledger.participation_count(event.id), 0);
    assert_eq!(harness.ledger.query_count(event.id), 0);
    assert!(
        harness
            .participation
            .list_joined_events(volunteer)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        harness.events.get_event(event.id).await,
        Err(LedgerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_list_events_filters_and_paginates() {
    let harness = LedgerHarness::new();
    let organizer = UserId::new();
    for _ in 0..5 {
        harness
            .events
            .create_event(organizer, sample_event(2))
            .await
            .unwrap();
    }
    let mut pending = sample_event(2);
    pending.status = Some(EventStatus::Pending);
    harness
        .events
        .create_event(UserId::new(), pending)
        .await
        .unwrap();

    let all = harness.events.list_events(EventFilter::default()).await.unwrap();
    assert_eq!(all.len(), 6);

    let mine = harness
        .events
        .list_events(EventFilter {
            organizer_id: Some(organizer),
            ..EventFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 5);

    let pending_only = harness
        .events
        .list_events(EventFilter {
            status: Some(EventStatus::Pending),
            ..EventFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pending_only.len(), 1);

    let second_page = harness
        .events
        .list_events(EventFilter {
            page: 1,
            page_size: 4,
            ..EventFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(second_page.len(), 2);
}
