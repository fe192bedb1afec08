//! Ticket lifecycle
//!
//! Every successful mutation writes exactly one log row. Close, change,
//! assign and unassign produce theirs by issuing a [`CreateTicket`] for the
//! ticket's own reference inside their transaction; the create joins that
//! transaction and appends to the open ticket instead of opening a new one.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{Tracker, required, resolve_category, resolve_user};
use crate::core::{
    CreateTicket, CreatedTicket, Ticket, TicketChange, TicketKey, TicketStatus, non_blank,
};
use crate::error::{Result, TrackerError};
use crate::storage::{IsolationLevel, Transaction, repository};

const CLOSED_SUMMARY: &str = "ticket closed";
const CHANGED_SUMMARY: &str = "ticket changed";
const UNASSIGNED_SUMMARY: &str = "became unassigned";

impl Tracker {
    /// Report an issue: opens a ticket for `(reference, system)` or appends
    /// to the one already open
    pub async fn create_ticket(&self, request: CreateTicket) -> Result<CreatedTicket> {
        self.create_ticket_within(None, request).await
    }

    /// [`Self::create_ticket`] that joins `ambient` when given
    ///
    /// A joined create neither commits nor rolls back; its error is handed
    /// back to the caller that owns the transaction.
    pub async fn create_ticket_within(
        &self,
        ambient: Option<&mut Transaction<'_>>,
        request: CreateTicket,
    ) -> Result<CreatedTicket> {
        let report = request.validate()?;
        let mut tx = self.db.enter(ambient, IsolationLevel::Serializable).await?;
        let joined = !tx.is_owner();

        let outcome: Result<CreatedTicket> = async {
            let category = resolve_category(
                tx.conn(),
                report.category.trim(),
                report.system.as_deref().map(str::trim),
            )
            .await?;
            let author = match report.creator.as_deref() {
                Some(username) => Some(resolve_user(tx.conn(), username.trim()).await?.id),
                None => None,
            };

            let reference = report.reference.trim();
            let now = Utc::now();
            let existing = repository::find_open_ticket(tx.conn(), reference, category.system_id).await?;
            let (ticket_id, appended) = match existing {
                Some(ticket) => (ticket.id, true),
                None => {
                    let id = repository::insert_ticket(
                        tx.conn(),
                        &category,
                        reference,
                        report.title.trim(),
                        now,
                    )
                    .await?;
                    (id, false)
                },
            };

            let log_id = repository::insert_log(
                tx.conn(),
                ticket_id,
                report.summary.trim(),
                &report.details,
                now,
                author,
            )
            .await?;

            Ok(CreatedTicket {
                ticket_id,
                log_id,
                appended,
            })
        }
        .await;

        let created = tx.finish(outcome).await?;
        if joined {
            debug!(ticket_id = created.ticket_id, log_id = created.log_id, "Log appended");
        } else if created.appended {
            info!(ticket_id = created.ticket_id, log_id = created.log_id, "Report appended to open ticket");
        } else {
            info!(ticket_id = created.ticket_id, reference = %report.reference, "Ticket opened");
        }
        Ok(created)
    }

    /// Close an open ticket, recording who closed it; returns its id
    pub async fn close_ticket(
        &self,
        key: impl Into<TicketKey>,
        actor: Option<&str>,
    ) -> Result<i64> {
        let key = key.into();
        let actor = non_blank(actor.map(str::to_string));

        // Nothing is opened for a key that does not name an open ticket
        let id = {
            let mut conn = self.db.pool().acquire().await?;
            open_ticket_by_key(&mut conn, &key).await?.id
        };

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<()> = async {
            let ticket = open_ticket(tx.conn(), id).await?;
            let report = synthesized_report(tx.conn(), &ticket, CLOSED_SUMMARY, None, actor).await?;
            self.create_ticket_within(Some(&mut tx), report).await?;

            if !repository::transition_open_ticket(tx.conn(), id, TicketStatus::Closed).await? {
                return Err(TrackerError::TicketNotFound(key.to_string()));
            }
            Ok(())
        }
        .await;

        tx.finish(outcome).await?;
        info!(id, "Ticket closed");
        Ok(id)
    }

    /// Edit category, title or reference of an open ticket; returns its id
    ///
    /// The new category is looked up in the ticket's own system. The log
    /// entry lists one `<field> changed from <old> to <new>` line per field
    /// whose value actually differs.
    pub async fn change_ticket(&self, change: TicketChange) -> Result<i64> {
        let id = change.validated_id()?;
        let trimmed = |value: Option<String>| non_blank(value).map(|v| v.trim().to_string());
        let new_category = trimmed(change.category);
        let new_title = trimmed(change.title);
        let new_reference = trimmed(change.reference);
        let actor = trimmed(change.actor);

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<usize> = async {
            let ticket = open_ticket(tx.conn(), id).await?;
            let mut diff = Vec::new();

            let mut category_id = ticket.category_id;
            if let Some(name) = new_category {
                let current = repository::category_by_id(tx.conn(), ticket.category_id).await?;
                let current_name = current.map(|c| c.name);
                if current_name.as_deref() != Some(name.as_str()) {
                    let Some(category) =
                        repository::find_category(tx.conn(), &name, ticket.system_id).await?
                    else {
                        let system = repository::system_by_id(tx.conn(), ticket.system_id).await?;
                        return Err(TrackerError::CategoryNotFound {
                            name,
                            system: system.map(|s| s.name),
                        });
                    };
                    let old = current_name.unwrap_or_else(|| format!("#{}", ticket.category_id));
                    diff.push(format!("category changed from {old} to {name}"));
                    category_id = category.id;
                }
            }

            let mut title = ticket.title.clone();
            if let Some(new) = new_title {
                if new != ticket.title {
                    diff.push(format!("title changed from {} to {new}", ticket.title));
                    title = new;
                }
            }

            let mut reference = ticket.reference.clone();
            if let Some(new) = new_reference {
                if new != ticket.reference {
                    let clash = repository::find_open_ticket(tx.conn(), &new, ticket.system_id).await?;
                    if let Some(other) = clash {
                        return Err(TrackerError::ReferenceConflict {
                            reference: new,
                            id: other.id,
                        });
                    }
                    diff.push(format!("reference changed from {} to {new}", ticket.reference));
                    reference = new;
                }
            }

            repository::update_ticket_fields(tx.conn(), id, category_id, &title, &reference).await?;

            let ticket = open_ticket(tx.conn(), id).await?;
            let details = (!diff.is_empty()).then(|| diff.join("\n"));
            let report = synthesized_report(tx.conn(), &ticket, CHANGED_SUMMARY, details, actor).await?;
            self.create_ticket_within(Some(&mut tx), report).await?;
            Ok(diff.len())
        }
        .await;

        let changed_fields = tx.finish(outcome).await?;
        info!(id, changed_fields, "Ticket changed");
        Ok(id)
    }

    /// Make `username` the owner of an open ticket
    ///
    /// The user must hold a membership on the ticket's category.
    pub async fn assign_user_to_ticket(
        &self,
        username: &str,
        ticket_id: i64,
        actor: Option<&str>,
    ) -> Result<()> {
        let username = required("user", username)?;
        let actor = non_blank(actor.map(str::to_string));

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<()> = async {
            let user = resolve_user(tx.conn(), username).await?;
            let ticket = open_ticket(tx.conn(), ticket_id).await?;
            let Some(category) = repository::category_by_id(tx.conn(), ticket.category_id).await?
            else {
                return Err(TrackerError::CategoryNotFound {
                    name: format!("#{}", ticket.category_id),
                    system: None,
                });
            };

            let membership = repository::find_membership(tx.conn(), user.id, category.id).await?;
            if membership.is_none() {
                return Err(TrackerError::NotCategoryMember {
                    user: user.username,
                    category: category.name,
                });
            }

            repository::set_ticket_user(tx.conn(), ticket_id, Some(user.id)).await?;
            let summary = format!("assigned to {}", user.username);
            let report = synthesized_report(tx.conn(), &ticket, &summary, None, actor).await?;
            self.create_ticket_within(Some(&mut tx), report).await?;
            Ok(())
        }
        .await;

        tx.finish(outcome).await?;
        info!(ticket_id, username, "Ticket assigned");
        Ok(())
    }

    /// Clear the owner of an open ticket
    pub async fn unassign_user_from_ticket(&self, ticket_id: i64, actor: Option<&str>) -> Result<()> {
        let actor = non_blank(actor.map(str::to_string));

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<()> = async {
            let ticket = open_ticket(tx.conn(), ticket_id).await?;
            repository::set_ticket_user(tx.conn(), ticket_id, None).await?;
            let report = synthesized_report(tx.conn(), &ticket, UNASSIGNED_SUMMARY, None, actor).await?;
            self.create_ticket_within(Some(&mut tx), report).await?;
            Ok(())
        }
        .await;

        tx.finish(outcome).await?;
        info!(ticket_id, "Ticket unassigned");
        Ok(())
    }
}

async fn open_ticket(conn: &mut SqliteConnection, id: i64) -> Result<Ticket> {
    repository::ticket_by_id(conn, id)
        .await?
        .filter(|ticket| ticket.status == TicketStatus::Open)
        .ok_or_else(|| TrackerError::TicketNotFound(TicketKey::Id(id).to_string()))
}

async fn open_ticket_by_key(conn: &mut SqliteConnection, key: &TicketKey) -> Result<Ticket> {
    match key {
        TicketKey::Id(id) => open_ticket(conn, *id).await,
        TicketKey::Reference { reference, system } => {
            let not_found = || TrackerError::TicketNotFound(key.to_string());
            let Some(system) = repository::find_system(conn, system.trim()).await? else {
                return Err(not_found());
            };
            repository::find_open_ticket(conn, reference.trim(), system.id)
                .await?
                .ok_or_else(not_found)
        },
    }
}

/// Report that lands on `ticket` when created in the same transaction
async fn synthesized_report(
    conn: &mut SqliteConnection,
    ticket: &Ticket,
    summary: &str,
    details: Option<String>,
    creator: Option<String>,
) -> Result<CreateTicket> {
    let Some(system) = repository::system_by_id(conn, ticket.system_id).await? else {
        return Err(TrackerError::SystemNotFound(format!("#{}", ticket.system_id)));
    };
    let Some(category) = repository::category_by_id(conn, ticket.category_id).await? else {
        return Err(TrackerError::CategoryNotFound {
            name: format!("#{}", ticket.category_id),
            system: Some(system.name),
        });
    };

    Ok(CreateTicket {
        category: category.name,
        system: Some(system.name),
        reference: ticket.reference.clone(),
        summary: summary.to_string(),
        title: ticket.title.clone(),
        details,
        creator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryKey, CreateTicketBuilder, NewUser};
    use crate::test_utils::TestTracker;

    async fn log_summaries(tracker: &Tracker, id: i64) -> Vec<String> {
        tracker
            .ticket_details(id)
            .await
            .unwrap()
            .unwrap()
            .logs
            .into_iter()
            .map(|log| log.summary)
            .collect()
    }

    #[tokio::test]
    async fn test_create_opens_ticket_with_creation_log() {
        let fixture = TestTracker::seeded().await;
        let created = fixture.report("t1", "disk full").await;
        assert!(!created.appended);

        let details = fixture.tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.status, TicketStatus::Open);
        assert_eq!(details.header.user, None);
        assert_eq!(details.logs.len(), 1);
        assert_eq!(details.logs[0].id, created.log_id);
        // Details default to the summary
        assert_eq!(details.logs[0].details, "disk full");
    }

    #[tokio::test]
    async fn test_second_report_appends_to_open_ticket() {
        let fixture = TestTracker::seeded().await;
        let first = fixture.report("t1", "first").await;
        let second = fixture.report("t1", "second").await;

        assert!(second.appended);
        assert_eq!(first.ticket_id, second.ticket_id);
        assert_eq!(fixture.tracker.list_all_tickets().await.unwrap().len(), 1);
        assert_eq!(
            log_summaries(&fixture.tracker, first.ticket_id).await,
            vec!["first", "second"]
        );
    }

    #[tokio::test]
    async fn test_create_validates_before_store_access() {
        let fixture = TestTracker::seeded().await;
        let err = fixture
            .tracker
            .create_ticket(CreateTicket {
                category: "Test".to_string(),
                reference: " ".to_string(),
                ..CreateTicket::default()
            })
            .await
            .unwrap_err();
        match err {
            TrackerError::MissingFields(fields) => {
                assert_eq!(fields, vec!["reference", "summary", "title"]);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_or_creator() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;

        let unknown_category = CreateTicketBuilder::new()
            .category("nope")
            .reference("r")
            .summary("s")
            .title("t")
            .build();
        assert!(matches!(
            tracker.create_ticket(unknown_category).await.unwrap_err(),
            TrackerError::CategoryNotFound { .. }
        ));

        let unknown_creator = CreateTicketBuilder::new()
            .category("Test")
            .reference("r")
            .summary("s")
            .title("t")
            .creator("ghost")
            .build();
        assert!(matches!(
            tracker.create_ticket(unknown_creator).await.unwrap_err(),
            TrackerError::UserNotFound(_)
        ));
        assert!(tracker.list_all_tickets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_name_shared_by_systems_needs_a_system() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        tracker.add_system("Other").await.unwrap();
        tracker.add_category("Other", "Test").await.unwrap();

        let request = |system: Option<&str>| {
            let mut builder = CreateTicketBuilder::new()
                .category("Test")
                .reference("r")
                .summary("s")
                .title("t");
            if let Some(system) = system {
                builder = builder.system(system);
            }
            builder.build()
        };

        assert!(matches!(
            tracker.create_ticket(request(None)).await.unwrap_err(),
            TrackerError::AmbiguousCategory { count: 2, .. }
        ));
        let main = tracker.create_ticket(request(Some("Main"))).await.unwrap();
        let other = tracker.create_ticket(request(Some("Other"))).await.unwrap();
        // Same reference, different systems: two open tickets
        assert_ne!(main.ticket_id, other.ticket_id);
    }

    #[tokio::test]
    async fn test_close_then_report_starts_new_ticket() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        let first = fixture.report("t1", "broken").await;

        let closed = tracker.close_ticket(first.ticket_id, None).await.unwrap();
        assert_eq!(closed, first.ticket_id);

        let details = tracker.ticket_details(first.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.status, TicketStatus::Closed);
        assert_eq!(details.logs.last().unwrap().summary, CLOSED_SUMMARY);

        let again = fixture.report("t1", "broken again").await;
        assert!(!again.appended);
        assert_ne!(again.ticket_id, first.ticket_id);
    }

    #[tokio::test]
    async fn test_close_by_reference_records_actor() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        tracker
            .register_user(NewUser::new("alice", "alice@example.com", "pw"))
            .await
            .unwrap();
        let created = fixture.report("t1", "broken").await;

        tracker
            .close_ticket(TicketKey::reference("t1", "Main"), Some("alice"))
            .await
            .unwrap();

        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        let closing = details.logs.last().unwrap();
        assert_eq!(closing.summary, CLOSED_SUMMARY);
        assert_eq!(closing.author.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_close_unknown_or_closed_ticket_fails() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;

        assert!(matches!(
            tracker.close_ticket(999, None).await.unwrap_err(),
            TrackerError::TicketNotFound(_)
        ));

        let created = fixture.report("t1", "broken").await;
        tracker.close_ticket(created.ticket_id, None).await.unwrap();
        assert!(matches!(
            tracker.close_ticket(created.ticket_id, None).await.unwrap_err(),
            TrackerError::TicketNotFound(_)
        ));
        assert_eq!(log_summaries(tracker, created.ticket_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_close_fails_when_category_was_deleted() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        let created = fixture.report("t1", "broken").await;
        tracker.delete_category("Main", "Test").await.unwrap();

        assert!(matches!(
            tracker.close_ticket(created.ticket_id, None).await.unwrap_err(),
            TrackerError::CategoryNotFound { .. }
        ));

        // Shallow delete kept the ticket; the failed close changed nothing
        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.status, TicketStatus::Open);
        assert_eq!(details.header.category, None);
        assert_eq!(details.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_change_writes_diff_log() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        tracker.add_category("Main", "Network").await.unwrap();
        let created = fixture.report("t1", "broken").await;

        tracker
            .change_ticket(
                TicketChange::new(created.ticket_id)
                    .category("Network")
                    .title("Router down")
                    .reference("t1"),
            )
            .await
            .unwrap();

        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.category.as_deref(), Some("Network"));
        assert_eq!(details.header.title, "Router down");
        assert_eq!(details.header.reference, "t1");

        let log = details.logs.last().unwrap();
        assert_eq!(log.summary, CHANGED_SUMMARY);
        assert_eq!(
            log.details,
            "category changed from Test to Network\ntitle changed from Title t1 to Router down"
        );
    }

    #[tokio::test]
    async fn test_change_with_unknown_category_leaves_ticket_untouched() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        let created = fixture.report("t1", "broken").await;
        let before = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();

        let err = tracker
            .change_ticket(TicketChange::new(created.ticket_id).title("New").category("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::CategoryNotFound { .. }));

        let after = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_change_requires_id_and_open_ticket() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;

        assert!(matches!(
            tracker.change_ticket(TicketChange::default()).await.unwrap_err(),
            TrackerError::IdNotSpecified
        ));
        assert!(matches!(
            tracker.change_ticket(TicketChange::new(-1)).await.unwrap_err(),
            TrackerError::IdNotSpecified
        ));
        assert!(matches!(
            tracker.change_ticket(TicketChange::new(42).title("x")).await.unwrap_err(),
            TrackerError::TicketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_change_reference_onto_open_ticket_conflicts() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        let first = fixture.report("t1", "a").await;
        let second = fixture.report("t2", "b").await;

        let err = tracker
            .change_ticket(TicketChange::new(second.ticket_id).reference("t1"))
            .await
            .unwrap_err();
        match err {
            TrackerError::ReferenceConflict { reference, id } => {
                assert_eq!(reference, "t1");
                assert_eq!(id, first.ticket_id);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(log_summaries(tracker, second.ticket_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_requires_membership() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        tracker
            .register_user(NewUser::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();
        let created = fixture.report("t1", "broken").await;

        assert!(matches!(
            tracker
                .assign_user_to_ticket("bob", created.ticket_id, None)
                .await
                .unwrap_err(),
            TrackerError::NotCategoryMember { .. }
        ));

        tracker
            .assign_user_to_category("bob", &CategoryKey::new("Test", "Main"))
            .await
            .unwrap();
        tracker
            .assign_user_to_ticket("bob", created.ticket_id, None)
            .await
            .unwrap();

        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.user.as_deref(), Some("bob"));
        assert_eq!(details.logs.last().unwrap().summary, "assigned to bob");
    }

    #[tokio::test]
    async fn test_assign_unknown_user_or_ticket() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        let created = fixture.report("t1", "broken").await;

        assert!(matches!(
            tracker
                .assign_user_to_ticket("ghost", created.ticket_id, None)
                .await
                .unwrap_err(),
            TrackerError::UserNotFound(_)
        ));

        tracker
            .register_user(NewUser::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();
        assert!(matches!(
            tracker.assign_user_to_ticket("bob", 999, None).await.unwrap_err(),
            TrackerError::TicketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_unassign_clears_owner() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;
        tracker
            .register_user(NewUser::new("bob", "bob@example.com", "pw"))
            .await
            .unwrap();
        tracker
            .assign_user_to_category("bob", &CategoryKey::new("Test", "Main"))
            .await
            .unwrap();
        let created = fixture.report("t1", "broken").await;
        tracker
            .assign_user_to_ticket("bob", created.ticket_id, Some("bob"))
            .await
            .unwrap();

        tracker
            .unassign_user_from_ticket(created.ticket_id, Some("bob"))
            .await
            .unwrap();

        let details = tracker.ticket_details(created.ticket_id).await.unwrap().unwrap();
        assert_eq!(details.header.user, None);
        assert_eq!(
            details.logs.iter().map(|l| l.summary.as_str()).collect::<Vec<_>>(),
            vec!["broken", "assigned to bob", UNASSIGNED_SUMMARY]
        );
        assert!(details.logs.iter().skip(1).all(|l| l.author.as_deref() == Some("bob")));
    }

    #[tokio::test]
    async fn test_inner_create_joins_outer_transaction() {
        let fixture = TestTracker::seeded().await;
        let tracker = &fixture.tracker;

        let mut tx = tracker
            .database()
            .begin(IsolationLevel::Serializable)
            .await
            .unwrap();
        let request = CreateTicketBuilder::new()
            .category("Test")
            .reference("inner")
            .summary("s")
            .title("t")
            .build();
        tracker.create_ticket_within(Some(&mut tx), request).await.unwrap();
        // The joined create did not commit; dropping the owner's work discards it
        tx.rollback().await;

        assert!(tracker.list_all_tickets().await.unwrap().is_empty());
    }
}
