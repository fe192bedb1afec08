//! Ticket commands

use colored::Colorize;
use serde_json::json;

use crate::cli::{ChangeArgs, CloseArgs, CreateArgs, ListArgs, OutputFormatter, TicketCommands};
use crate::core::{
    CreateTicket, Outcome, TicketChange, TicketDetails, TicketKey, TicketQuery, TicketQueryBuilder,
    TicketRow, TicketStatus,
};
use crate::error::{Result, TrackerError};
use crate::tracker::Tracker;

pub async fn handle_ticket_command(
    command: TicketCommands,
    tracker: &Tracker,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        TicketCommands::Create(args) => handle_create(args, tracker, output).await,
        TicketCommands::Close(args) => handle_close(args, tracker, output).await,
        TicketCommands::Change(args) => handle_change(args, tracker, output).await,
        TicketCommands::Assign {
            id,
            username,
            actor,
        } => {
            tracker
                .assign_user_to_ticket(&username, id, actor.as_deref())
                .await?;
            output.outcome(
                &Outcome::success(
                    format!("Assigned ticket #{id} to '{username}'"),
                    json!({ "id": id, "user": username }),
                ),
                |_| {},
            )
        },
        TicketCommands::Unassign { id, actor } => {
            tracker.unassign_user_from_ticket(id, actor.as_deref()).await?;
            output.outcome(
                &Outcome::success(format!("Unassigned ticket #{id}"), json!({ "id": id })),
                |_| {},
            )
        },
        TicketCommands::List(args) => handle_list(args, tracker, output).await,
        TicketCommands::Show { id } => {
            let details = tracker
                .ticket_details(id)
                .await?
                .ok_or_else(|| TrackerError::TicketNotFound(TicketKey::Id(id).to_string()))?;
            let message = format!("Ticket #{id}");
            output.outcome(&Outcome::success(message, details), |details| {
                print_details(details, output);
            })
        },
    }
}

async fn handle_create(args: CreateArgs, tracker: &Tracker, output: &OutputFormatter) -> Result<()> {
    let request = CreateTicket {
        category: args.category,
        system: args.system,
        reference: args.reference,
        summary: args.summary,
        title: args.title,
        details: args.details,
        creator: args.creator,
    };
    let created = tracker.create_ticket(request).await?;

    let message = if created.appended {
        format!("Appended to open ticket #{}", created.ticket_id)
    } else {
        format!("Opened ticket #{}", created.ticket_id)
    };
    output.outcome(&Outcome::success(message, created), |_| {})
}

async fn handle_close(args: CloseArgs, tracker: &Tracker, output: &OutputFormatter) -> Result<()> {
    let key = match (args.id, args.reference, args.system) {
        (Some(id), _, _) => TicketKey::Id(id),
        (None, Some(reference), Some(system)) => TicketKey::reference(reference, system),
        _ => {
            return Err(TrackerError::InvalidInput(
                "Pass a ticket id or --reference with --system".to_string(),
            ));
        },
    };

    let id = tracker.close_ticket(key, args.actor.as_deref()).await?;
    output.outcome(
        &Outcome::success(format!("Closed ticket #{id}"), json!({ "id": id })),
        |_| {},
    )
}

async fn handle_change(args: ChangeArgs, tracker: &Tracker, output: &OutputFormatter) -> Result<()> {
    let change = TicketChange {
        id: Some(args.id),
        category: args.category,
        title: args.title,
        reference: args.reference,
        actor: args.actor,
    };
    let id = tracker.change_ticket(change).await?;
    output.outcome(
        &Outcome::success(format!("Changed ticket #{id}"), json!({ "id": id })),
        |_| {},
    )
}

async fn handle_list(args: ListArgs, tracker: &Tracker, output: &OutputFormatter) -> Result<()> {
    let query = build_query(args)?;
    let rows = tracker.list_tickets(&query).await?;
    let total = tracker.count_tickets(&query.filter).await?;

    let message = format!("Tickets ({} of {total})", rows.len());
    output.outcome(&Outcome::success(message, rows), |rows| {
        for row in rows {
            print_row(row, output);
        }
    })
}

fn build_query(args: ListArgs) -> Result<TicketQuery> {
    let mut builder = TicketQueryBuilder::new().skip(args.skip);
    if let Some(category) = args.category {
        builder = builder.category(category);
    }
    if let Some(reference) = args.reference {
        builder = builder.reference(reference);
    }
    if let Some(status) = args.status {
        builder = builder.status(status.parse::<TicketStatus>()?);
    }
    if let Some(title) = args.title {
        builder = builder.title(title);
    }
    if let Some(system) = args.system {
        builder = builder.system(system);
    }
    if let Some(user) = args.user {
        builder = builder.user(user);
    } else if args.unassigned {
        builder = builder.unassigned();
    }
    if let Some(take) = args.take {
        builder = builder.take(take);
    }
    Ok(builder.build())
}

fn status_label(status: TicketStatus) -> String {
    match status {
        TicketStatus::Open => status.as_str().green().to_string(),
        TicketStatus::Closed => status.as_str().dimmed().to_string(),
    }
}

fn print_row(row: &TicketRow, output: &OutputFormatter) {
    let location = format!(
        "{}/{}",
        row.system.as_deref().unwrap_or("-"),
        row.category.as_deref().unwrap_or("-")
    );
    output.info(&format!(
        "  {:>5}  {:<6}  {:<16} {}  {} {}",
        row.id,
        status_label(row.status),
        row.reference,
        row.title,
        output.dim(&location),
        row.user.as_deref().map(|user| format!("@{user}")).unwrap_or_default()
    ));
}

fn print_details(details: &TicketDetails, output: &OutputFormatter) {
    let header = &details.header;
    output.info(&format!("  {}", header.title.bold()));
    output.info(&format!("  Reference: {}", header.reference));
    output.info(&format!("  Status:    {}", status_label(header.status)));
    output.info(&format!(
        "  Category:  {}/{}",
        header.system.as_deref().unwrap_or("-"),
        header.category.as_deref().unwrap_or("-")
    ));
    output.info(&format!(
        "  Assignee:  {}",
        header.user.as_deref().unwrap_or("(unassigned)")
    ));
    output.info(&format!("  Opened:    {}", header.time.format("%Y-%m-%d %H:%M:%S UTC")));
    output.info("");
    output.info(&format!("  Log ({}):", details.logs.len()));
    for log in &details.logs {
        let author = log.author.as_deref().unwrap_or("-");
        output.info(&format!(
            "    {}  {}  {}",
            output.dim(&log.time.format("%Y-%m-%d %H:%M").to_string()),
            log.summary,
            output.dim(author)
        ));
        if log.details != log.summary {
            for line in log.details.lines() {
                output.info(&format!("        {line}"));
            }
        }
    }
}
