//! Command handlers
//!
//! Each handler runs one tracker operation and prints its outcome. Errors
//! are returned to `main`, which reports them and sets the exit status.

mod accounts;
mod relations;
mod tickets;

use super::{Commands, OutputFormatter};
use crate::error::Result;
use crate::tracker::Tracker;

pub use accounts::handle_user_command;
pub use relations::{handle_category_command, handle_member_command, handle_system_command};
pub use tickets::handle_ticket_command;

/// Route a parsed command to its handler
pub async fn dispatch(command: Commands, tracker: &Tracker, output: &OutputFormatter) -> Result<()> {
    match command {
        Commands::System(command) => handle_system_command(command, tracker, output).await,
        Commands::Category(command) => handle_category_command(command, tracker, output).await,
        Commands::User(command) => handle_user_command(command, tracker, output).await,
        Commands::Member(command) => handle_member_command(command, tracker, output).await,
        Commands::Ticket(command) => handle_ticket_command(command, tracker, output).await,
    }
}
