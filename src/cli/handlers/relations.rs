//! System, category and membership commands

use serde_json::json;

use crate::cli::{CategoryCommands, MemberCommands, OutputFormatter, SystemCommands};
use crate::core::{CategoryKey, CategoryView, Outcome};
use crate::error::Result;
use crate::tracker::Tracker;

pub async fn handle_system_command(
    command: SystemCommands,
    tracker: &Tracker,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        SystemCommands::Add { name } => {
            let id = tracker.add_system(&name).await?;
            output.outcome(
                &Outcome::success(format!("Added system '{name}' (#{id})"), json!({ "id": id })),
                |_| {},
            )
        },
        SystemCommands::Rename { old_name, new_name } => {
            let id = tracker.rename_system(&old_name, &new_name).await?;
            output.outcome(
                &Outcome::success(
                    format!("Renamed system '{old_name}' to '{new_name}'"),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        SystemCommands::Delete { name } => {
            let id = tracker.delete_system(&name).await?;
            output.outcome(
                &Outcome::success(format!("Deleted system '{name}'"), json!({ "id": id })),
                |_| {},
            )?;
            output.warning("Tickets and categories of the deleted system were kept");
            Ok(())
        },
        SystemCommands::List => {
            let systems = tracker.list_systems().await?;
            let message = format!("Systems ({})", systems.len());
            output.outcome(&Outcome::success(message, systems), |systems| {
                for system in systems {
                    output.info(&format!("  {:>4}  {}", system.id, system.name));
                }
            })
        },
    }
}

pub async fn handle_category_command(
    command: CategoryCommands,
    tracker: &Tracker,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        CategoryCommands::Add { name, system } => {
            let id = tracker.add_category(&system, &name).await?;
            output.outcome(
                &Outcome::success(
                    format!("Added category '{name}' to '{system}' (#{id})"),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        CategoryCommands::Rename {
            old_name,
            new_name,
            system,
        } => {
            let id = tracker.rename_category(&system, &old_name, &new_name).await?;
            output.outcome(
                &Outcome::success(
                    format!("Renamed category '{old_name}' to '{new_name}' in '{system}'"),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        CategoryCommands::Delete { name, system } => {
            let id = tracker.delete_category(&system, &name).await?;
            output.outcome(
                &Outcome::success(
                    format!("Deleted category '{name}' from '{system}'"),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        CategoryCommands::List { system } => {
            let categories = tracker.list_categories(system.as_deref()).await?;
            let message = format!("Categories ({})", categories.len());
            output.outcome(&Outcome::success(message, categories), |categories| {
                print_categories(categories, output);
            })
        },
    }
}

pub async fn handle_member_command(
    command: MemberCommands,
    tracker: &Tracker,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        MemberCommands::Grant {
            username,
            category,
            system,
        } => {
            let key = CategoryKey::new(category, system);
            let id = tracker.assign_user_to_category(&username, &key).await?;
            output.outcome(
                &Outcome::success(
                    format!("Granted '{username}' access to {}/{}", key.system, key.name),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        MemberCommands::Revoke {
            username,
            category,
            system,
        } => {
            let key = CategoryKey::new(category, system);
            let id = tracker.unassign_user_from_category(&username, &key).await?;
            output.outcome(
                &Outcome::success(
                    format!("Revoked '{username}' access to {}/{}", key.system, key.name),
                    json!({ "id": id }),
                ),
                |_| {},
            )
        },
        MemberCommands::List { username } => {
            let categories = tracker.categories_of(&username).await?;
            let message = format!("Categories of '{username}' ({})", categories.len());
            output.outcome(&Outcome::success(message, categories), |categories| {
                print_categories(categories, output);
            })
        },
    }
}

fn print_categories(categories: &[CategoryView], output: &OutputFormatter) {
    for category in categories {
        let system = category.system.as_deref().unwrap_or("-");
        output.info(&format!(
            "  {:>4}  {}  {}",
            category.id,
            category.name,
            output.dim(system)
        ));
    }
}
