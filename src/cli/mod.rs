//! Command-line boundary
//!
//! Each subcommand maps onto one [`crate::tracker::Tracker`] operation.
//! Handlers convert the result into an [`crate::core::Outcome`] and print it
//! either as text or as JSON.

pub mod handlers;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use output::OutputFormatter;

#[derive(Parser, Debug)]
#[command(name = "ticket-engine")]
#[command(author, version, about = "Ticket lifecycle engine for system/category ticket tracking")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, e.g. sqlite:///var/lib/tickets.db
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// System management
    #[command(subcommand)]
    System(SystemCommands),

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// User accounts
    #[command(subcommand)]
    User(UserCommands),

    /// Category membership grants
    #[command(subcommand)]
    Member(MemberCommands),

    /// Ticket lifecycle and listing
    #[command(subcommand)]
    Ticket(TicketCommands),
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Add a system
    Add { name: String },
    /// Rename a system
    Rename { old_name: String, new_name: String },
    /// Delete a system (tickets are kept)
    Delete { name: String },
    /// List systems
    List,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Add a category to a system
    Add {
        name: String,
        #[arg(long, short = 's')]
        system: String,
    },
    /// Rename a category
    Rename {
        old_name: String,
        new_name: String,
        #[arg(long, short = 's')]
        system: String,
    },
    /// Delete a category and its membership grants (tickets are kept)
    Delete {
        name: String,
        #[arg(long, short = 's')]
        system: String,
    },
    /// List categories
    List {
        /// Only categories of this system
        #[arg(long, short = 's')]
        system: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Change email and/or password
    Change {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Set a user's role (Admin or User)
    Role { username: String, role: String },
    /// Delete a user and its membership grants
    Delete { username: String },
    /// Show one user
    Show { username: String },
    /// List users
    List,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommands {
    /// Grant a user access to a category
    Grant {
        username: String,
        #[arg(long)]
        category: String,
        #[arg(long, short = 's')]
        system: String,
    },
    /// Revoke a user's access to a category
    Revoke {
        username: String,
        #[arg(long)]
        category: String,
        #[arg(long, short = 's')]
        system: String,
    },
    /// Categories a user may be assigned tickets in
    List { username: String },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// Report an issue; appends to the open ticket with the same reference
    Create(CreateArgs),
    /// Close an open ticket
    Close(CloseArgs),
    /// Change category, title or reference of an open ticket
    Change(ChangeArgs),
    /// Assign an open ticket to a category member
    Assign {
        id: i64,
        username: String,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Clear the assignee of an open ticket
    Unassign {
        id: i64,
        #[arg(long)]
        actor: Option<String>,
    },
    /// List tickets
    List(ListArgs),
    /// Show a ticket with its log
    Show { id: i64 },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub category: String,
    /// System owning the category; required when the name is not unique
    #[arg(long, short = 's')]
    pub system: Option<String>,
    #[arg(long, short = 'r')]
    pub reference: String,
    #[arg(long)]
    pub summary: String,
    #[arg(long, short = 't')]
    pub title: String,
    /// Defaults to the summary
    #[arg(long, short = 'd')]
    pub details: Option<String>,
    #[arg(long)]
    pub creator: Option<String>,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Ticket id; omit to close by --reference/--system
    #[arg(required_unless_present = "reference")]
    pub id: Option<i64>,
    #[arg(long, short = 'r', conflicts_with = "id", requires = "system")]
    pub reference: Option<String>,
    #[arg(long, short = 's')]
    pub system: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args, Debug)]
pub struct ChangeArgs {
    #[arg(allow_negative_numbers = true)]
    pub id: i64,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, short = 't')]
    pub title: Option<String>,
    #[arg(long, short = 'r')]
    pub reference: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Exact category name
    #[arg(long)]
    pub category: Option<String>,
    /// Reference substring
    #[arg(long, short = 'r')]
    pub reference: Option<String>,
    /// Open or Closed
    #[arg(long)]
    pub status: Option<String>,
    /// Title substring
    #[arg(long, short = 't')]
    pub title: Option<String>,
    /// Exact system name
    #[arg(long, short = 's')]
    pub system: Option<String>,
    /// Only tickets assigned to this user
    #[arg(long, conflicts_with = "unassigned")]
    pub user: Option<String>,
    /// Only tickets without an assignee
    #[arg(long)]
    pub unassigned: bool,
    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub skip: u32,
    /// Maximum rows to return
    #[arg(long)]
    pub take: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_close_accepts_id_or_reference() {
        let cli = Cli::try_parse_from(["ticket-engine", "ticket", "close", "7"]).unwrap();
        match cli.command {
            Commands::Ticket(TicketCommands::Close(args)) => assert_eq!(args.id, Some(7)),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "ticket-engine", "ticket", "close", "--reference", "t1", "--system", "Main",
        ])
        .unwrap();
        match cli.command {
            Commands::Ticket(TicketCommands::Close(args)) => {
                assert_eq!(args.id, None);
                assert_eq!(args.reference.as_deref(), Some("t1"));
            },
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["ticket-engine", "ticket", "close"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ticket-engine", "system", "list", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
    }
}
