//! End-to-end ticket lifecycle scenarios against the public API

mod common;

use common::{report, seeded_tracker, table_counts};
use ticket_engine::TrackerError;
use ticket_engine::core::{
    CategoryKey, NewUser, Outcome, TicketChange, TicketQueryBuilder, TicketStatus,
};

#[tokio::test]
async fn test_report_close_and_reopen_scenario() {
    let tracker = seeded_tracker().await;

    let request = ticket_engine::core::CreateTicketBuilder::new()
        .category("Test")
        .reference("t1")
        .summary("s")
        .title("ti")
        .build();
    let created = tracker.create_ticket(request.clone()).await.unwrap();

    let open_t1 = TicketQueryBuilder::new()
        .reference("t1")
        .status(TicketStatus::Open)
        .build();
    let rows = tracker.list_tickets(&open_t1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, created.ticket_id);

    tracker.close_ticket(created.ticket_id, None).await.unwrap();
    assert!(tracker.list_tickets(&open_t1).await.unwrap().is_empty());

    let reopened = tracker.create_ticket(request).await.unwrap();
    assert!(!reopened.appended);
    assert_ne!(reopened.ticket_id, created.ticket_id);

    let rows = tracker.list_tickets(&open_t1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, reopened.ticket_id);
    assert_eq!(tracker.list_all_tickets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_add_system_is_rejected() {
    let tracker = seeded_tracker().await;
    let id = tracker.add_system("X").await.unwrap();
    let before = tracker.list_systems().await.unwrap();

    let err = tracker.add_system("X").await.unwrap_err();
    match &err {
        TrackerError::AlreadyExists { id: existing, .. } => assert_eq!(*existing, id),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(tracker.list_systems().await.unwrap(), before);

    // The transport view carries the reason, never a raw error
    let outcome: Outcome<i64> = Err(err).into();
    assert!(!outcome.ok);
    assert!(outcome.message.contains(&id.to_string()));
}

#[tokio::test]
async fn test_repeated_reference_shares_one_ticket() {
    let tracker = seeded_tracker().await;
    let first = tracker.create_ticket(report("R", "one")).await.unwrap();
    let second = tracker.create_ticket(report("R", "two")).await.unwrap();

    assert_eq!(first.ticket_id, second.ticket_id);
    assert_eq!(tracker.list_all_tickets().await.unwrap().len(), 1);
    let details = tracker.ticket_details(first.ticket_id).await.unwrap().unwrap();
    assert_eq!(details.logs.len(), 2);
}

#[tokio::test]
async fn test_every_created_ticket_has_a_log() {
    let tracker = seeded_tracker().await;
    for reference in ["a", "b", "a", "c"] {
        let created = tracker.create_ticket(report(reference, "x")).await.unwrap();
        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert!(!details.logs.is_empty());
    }
}

#[tokio::test]
async fn test_close_on_missing_ticket_changes_nothing() {
    let tracker = seeded_tracker().await;
    tracker.create_ticket(report("R", "one")).await.unwrap();
    let counts = table_counts(&tracker).await;
    let tickets = tracker.list_all_tickets().await.unwrap();

    assert!(matches!(
        tracker.close_ticket(999, None).await.unwrap_err(),
        TrackerError::TicketNotFound(_)
    ));

    assert_eq!(table_counts(&tracker).await, counts);
    assert_eq!(tracker.list_all_tickets().await.unwrap(), tickets);
}

#[tokio::test]
async fn test_change_with_unknown_category_rolls_back() {
    let tracker = seeded_tracker().await;
    let created = tracker.create_ticket(report("R", "one")).await.unwrap();
    let before = tracker.ticket_details(created.ticket_id).await.unwrap();

    let change = TicketChange::new(created.ticket_id)
        .title("Edited")
        .reference("R2")
        .category("nope");
    assert!(matches!(
        tracker.change_ticket(change).await.unwrap_err(),
        TrackerError::CategoryNotFound { .. }
    ));

    assert_eq!(tracker.ticket_details(created.ticket_id).await.unwrap(), before);
}

#[tokio::test]
async fn test_filters_and_pagination_over_the_full_listing() {
    let tracker = seeded_tracker().await;
    tracker.add_category("Main", "Network").await.unwrap();
    tracker
        .register_user(NewUser::new("ann", "ann@example.com", "pw"))
        .await
        .unwrap();
    tracker
        .assign_user_to_category("ann", &CategoryKey::new("Test", "Main"))
        .await
        .unwrap();

    for i in 0..10 {
        let created = tracker
            .create_ticket(report(&format!("ref-{i}"), "x"))
            .await
            .unwrap();
        if i % 3 == 0 {
            tracker
                .assign_user_to_ticket("ann", created.ticket_id, None)
                .await
                .unwrap();
        }
        if i % 4 == 0 {
            tracker.close_ticket(created.ticket_id, None).await.unwrap();
        }
    }

    let all = tracker.list_all_tickets().await.unwrap();
    assert_eq!(all.len(), 10);

    let page = TicketQueryBuilder::new().skip(2).take(5).build();
    assert_eq!(tracker.list_tickets(&page).await.unwrap(), all[2..7].to_vec());

    let filters = [
        TicketQueryBuilder::new().status(TicketStatus::Closed).build(),
        TicketQueryBuilder::new().user("ann").build(),
        TicketQueryBuilder::new().unassigned().status(TicketStatus::Open).build(),
        TicketQueryBuilder::new().reference("ref-1").build(),
        TicketQueryBuilder::new().category("Network").build(),
    ];
    for query in filters {
        let rows = tracker.list_tickets(&query).await.unwrap();
        let expected: Vec<_> = all.iter().filter(|row| query.filter.matches(row)).cloned().collect();
        assert_eq!(rows, expected);
    }
}

#[tokio::test]
async fn test_nested_operations_run_on_a_single_connection() {
    // The in-memory store has exactly one connection: a nested create that
    // asked the pool for another would never complete.
    let tracker = seeded_tracker().await;
    tracker.add_category("Main", "Network").await.unwrap();
    tracker
        .register_user(NewUser::new("ann", "ann@example.com", "pw"))
        .await
        .unwrap();
    tracker
        .assign_user_to_category("ann", &CategoryKey::new("Test", "Main"))
        .await
        .unwrap();
    let created = tracker.create_ticket(report("R", "one")).await.unwrap();
    let id = created.ticket_id;

    let steps = async {
        tracker.assign_user_to_ticket("ann", id, Some("ann")).await?;
        tracker.unassign_user_from_ticket(id, None).await?;
        tracker
            .change_ticket(TicketChange::new(id).category("Network"))
            .await?;
        tracker.close_ticket(id, Some("ann")).await
    };
    tokio::time::timeout(std::time::Duration::from_secs(10), steps)
        .await
        .expect("nested operation requested a second connection")
        .unwrap();

    let details = tracker.ticket_details(id).await.unwrap().unwrap();
    let summaries: Vec<_> = details.logs.iter().map(|log| log.summary.as_str()).collect();
    assert_eq!(
        summaries,
        vec![
            "one",
            "assigned to ann",
            "became unassigned",
            "ticket changed",
            "ticket closed"
        ]
    );
    assert_eq!(details.header.status, TicketStatus::Closed);
}
