//! User account commands

use serde_json::json;

use crate::cli::{OutputFormatter, UserCommands};
use crate::core::{NewUser, Outcome, Role, User, UserChange};
use crate::error::{Result, TrackerError};
use crate::tracker::Tracker;

pub async fn handle_user_command(
    command: UserCommands,
    tracker: &Tracker,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        UserCommands::Register {
            username,
            email,
            password,
        } => {
            let id = tracker
                .register_user(NewUser::new(username.as_str(), email, password))
                .await?;
            output.outcome(
                &Outcome::success(format!("Registered user '{username}' (#{id})"), json!({ "id": id })),
                |_| {},
            )
        },
        UserCommands::Change {
            username,
            email,
            password,
        } => {
            let change = UserChange { email, password }.normalized();
            if change.is_empty() {
                return Err(TrackerError::InvalidInput(
                    "Nothing to change. Pass --email and/or --password".to_string(),
                ));
            }
            tracker.change_user(&username, change).await?;
            output.outcome(
                &Outcome::success(format!("Changed user '{username}'"), json!({})),
                |_| {},
            )
        },
        UserCommands::Role { username, role } => {
            let role: Role = role.parse()?;
            tracker.change_user_role(&username, role).await?;
            output.outcome(
                &Outcome::success(
                    format!("User '{username}' is now {role}"),
                    json!({ "role": role }),
                ),
                |_| {},
            )
        },
        UserCommands::Delete { username } => {
            let id = tracker.delete_user(&username).await?;
            output.outcome(
                &Outcome::success(format!("Deleted user '{username}'"), json!({ "id": id })),
                |_| {},
            )
        },
        UserCommands::Show { username } => {
            let user = tracker
                .find_user(&username)
                .await?
                .ok_or(TrackerError::UserNotFound(username))?;
            output.outcome(&Outcome::success(user.username.clone(), user), |user| {
                print_user(user, output);
            })
        },
        UserCommands::List => {
            let users = tracker.list_users().await?;
            let message = format!("Users ({})", users.len());
            output.outcome(&Outcome::success(message, users), |users| {
                for user in users {
                    print_user(user, output);
                }
            })
        },
    }
}

fn print_user(user: &User, output: &OutputFormatter) {
    output.info(&format!(
        "  {:>4}  {:<16} {:<28} {}",
        user.id, user.username, user.email, user.role
    ));
}
