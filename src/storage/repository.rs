//! Row-level access to the entity store
//!
//! Every function takes the connection to run on, so the same lookup works
//! inside an owned transaction, a joined one, or a plain pooled connection.
//! Existence checks always go through a unique key, never through whole-row
//! comparison.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::core::{
    Category, CategoryView, LogEntry, Membership, Role, System, Ticket, TicketFilter, TicketQuery,
    TicketRow, TicketStatus, User, UserFilter,
};
use crate::error::Result;

// Systems

fn system_from_row(row: &SqliteRow) -> Result<System> {
    Ok(System {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

pub async fn find_system(conn: &mut SqliteConnection, name: &str) -> Result<Option<System>> {
    let row = sqlx::query("SELECT id, name FROM systems WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(system_from_row).transpose()
}

pub async fn system_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<System>> {
    let row = sqlx::query("SELECT id, name FROM systems WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(system_from_row).transpose()
}

pub async fn list_systems(conn: &mut SqliteConnection) -> Result<Vec<System>> {
    let rows = sqlx::query("SELECT id, name FROM systems ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(system_from_row).collect()
}

pub async fn insert_system(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO systems (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn rename_system(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<()> {
    sqlx::query("UPDATE systems SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_system(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM systems WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// Categories

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        system_id: row.try_get("system_id")?,
    })
}

fn category_view_from_row(row: &SqliteRow) -> Result<CategoryView> {
    Ok(CategoryView {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        system_id: row.try_get("system_id")?,
        system: row.try_get("system")?,
    })
}

/// Category by its natural key `(name, system_id)`
pub async fn find_category(
    conn: &mut SqliteConnection,
    name: &str,
    system_id: i64,
) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, system_id FROM categories WHERE name = ? AND system_id = ?")
        .bind(name)
        .bind(system_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(category_from_row).transpose()
}

/// Every category called `name`, across all systems
pub async fn categories_named(conn: &mut SqliteConnection, name: &str) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, system_id FROM categories WHERE name = ? ORDER BY id")
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(category_from_row).collect()
}

pub async fn category_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, system_id FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(category_from_row).transpose()
}

pub async fn list_categories(
    conn: &mut SqliteConnection,
    system_id: Option<i64>,
) -> Result<Vec<CategoryView>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT c.id, c.name, c.system_id, s.name AS system
         FROM categories c LEFT JOIN systems s ON s.id = c.system_id",
    );
    if let Some(system_id) = system_id {
        query.push(" WHERE c.system_id = ").push_bind(system_id);
    }
    query.push(" ORDER BY c.id");

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(category_view_from_row).collect()
}

pub async fn insert_category(conn: &mut SqliteConnection, name: &str, system_id: i64) -> Result<i64> {
    let result = sqlx::query("INSERT INTO categories (name, system_id) VALUES (?, ?)")
        .bind(name)
        .bind(system_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn rename_category(conn: &mut SqliteConnection, id: i64, name: &str) -> Result<()> {
    sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_category(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// Users

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>()?,
    })
}

const USER_COLUMNS: &str = "SELECT id, username, email, password_hash, role FROM users";

pub async fn find_user(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{USER_COLUMNS} WHERE username = ?"))
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{USER_COLUMNS} WHERE email = ?"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn list_users(conn: &mut SqliteConnection) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("{USER_COLUMNS} ORDER BY id"))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(user_from_row).collect()
}

pub async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update_user_email(conn: &mut SqliteConnection, id: i64, email: &str) -> Result<()> {
    sqlx::query("UPDATE users SET email = ? WHERE id = ?")
        .bind(email)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_user_password(
    conn: &mut SqliteConnection,
    id: i64,
    password_hash: &str,
) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_user_role(conn: &mut SqliteConnection, id: i64, role: Role) -> Result<()> {
    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_user(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// Memberships

pub async fn find_membership(
    conn: &mut SqliteConnection,
    user_id: i64,
    category_id: i64,
) -> Result<Option<Membership>> {
    let row = sqlx::query(
        "SELECT id, user_id, category_id FROM memberships WHERE user_id = ? AND category_id = ?",
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| -> Result<Membership> {
        Ok(Membership {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            category_id: row.try_get("category_id")?,
        })
    })
    .transpose()
}

pub async fn insert_membership(
    conn: &mut SqliteConnection,
    user_id: i64,
    category_id: i64,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO memberships (user_id, category_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn delete_membership(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM memberships WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Remove every grant held by a user; returns how many were removed
pub async fn delete_memberships_of_user(conn: &mut SqliteConnection, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM memberships WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Remove every grant on a category; returns how many were removed
pub async fn delete_memberships_of_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM memberships WHERE category_id = ?")
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn categories_of_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<CategoryView>> {
    let rows = sqlx::query(
        "SELECT c.id, c.name, c.system_id, s.name AS system
         FROM memberships m
         JOIN categories c ON c.id = m.category_id
         LEFT JOIN systems s ON s.id = c.system_id
         WHERE m.user_id = ?
         ORDER BY c.id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(category_view_from_row).collect()
}

// Tickets

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket> {
    let status: String = row.try_get("status")?;
    Ok(Ticket {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        reference: row.try_get("reference")?,
        status: status.parse::<TicketStatus>()?,
        title: row.try_get("title")?,
        time: row.try_get("time")?,
        user_id: row.try_get("user_id")?,
        system_id: row.try_get("system_id")?,
    })
}

const TICKET_COLUMNS: &str =
    "SELECT id, category_id, reference, status, title, time, user_id, system_id FROM tickets";

pub async fn ticket_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Ticket>> {
    let row = sqlx::query(&format!("{TICKET_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(ticket_from_row).transpose()
}

/// The open ticket for `(reference, system_id)`, if any
pub async fn find_open_ticket(
    conn: &mut SqliteConnection,
    reference: &str,
    system_id: i64,
) -> Result<Option<Ticket>> {
    let row = sqlx::query(&format!(
        "{TICKET_COLUMNS} WHERE reference = ? AND system_id = ? AND status = 'Open'"
    ))
    .bind(reference)
    .bind(system_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(ticket_from_row).transpose()
}

pub async fn insert_ticket(
    conn: &mut SqliteConnection,
    category: &Category,
    reference: &str,
    title: &str,
    time: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO tickets (category_id, reference, status, title, time, user_id, system_id)
         VALUES (?, ?, ?, ?, ?, NULL, ?)",
    )
    .bind(category.id)
    .bind(reference)
    .bind(TicketStatus::Open.as_str())
    .bind(title)
    .bind(time)
    .bind(category.system_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Overwrite the editable fields of a ticket
pub async fn update_ticket_fields(
    conn: &mut SqliteConnection,
    id: i64,
    category_id: i64,
    title: &str,
    reference: &str,
) -> Result<()> {
    sqlx::query("UPDATE tickets SET category_id = ?, title = ?, reference = ? WHERE id = ?")
        .bind(category_id)
        .bind(title)
        .bind(reference)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Move an open ticket to `status`; returns `false` if it was not open
pub async fn transition_open_ticket(
    conn: &mut SqliteConnection,
    id: i64,
    status: TicketStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE tickets SET status = ? WHERE id = ? AND status = 'Open'")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_ticket_user(
    conn: &mut SqliteConnection,
    id: i64,
    user_id: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE tickets SET user_id = ? WHERE id = ?")
        .bind(user_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// Logs

pub async fn insert_log(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    summary: &str,
    details: &str,
    time: DateTime<Utc>,
    user_id: Option<i64>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO logs (ticket_id, summary, details, time, user_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ticket_id)
    .bind(summary)
    .bind(details)
    .bind(time)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Audit entries of a ticket, oldest first
pub async fn logs_of_ticket(conn: &mut SqliteConnection, ticket_id: i64) -> Result<Vec<LogEntry>> {
    let rows = sqlx::query(
        "SELECT l.id, l.ticket_id, l.summary, l.details, l.time, l.user_id, u.username AS author
         FROM logs l LEFT JOIN users u ON u.id = l.user_id
         WHERE l.ticket_id = ?
         ORDER BY l.id ASC",
    )
    .bind(ticket_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<LogEntry> {
            Ok(LogEntry {
                id: row.try_get("id")?,
                ticket_id: row.try_get("ticket_id")?,
                summary: row.try_get("summary")?,
                details: row.try_get("details")?,
                time: row.try_get("time")?,
                user_id: row.try_get("user_id")?,
                author: row.try_get("author")?,
            })
        })
        .collect()
}

// Listing

const TICKET_ROW_SELECT: &str = "SELECT t.id, t.reference, t.status, t.title, t.time,
        t.category_id, c.name AS category, t.system_id, s.name AS system,
        t.user_id, u.username AS username
    FROM tickets t
    LEFT JOIN categories c ON c.id = t.category_id
    LEFT JOIN systems s ON s.id = t.system_id
    LEFT JOIN users u ON u.id = t.user_id
    WHERE 1 = 1";

fn ticket_row_from_row(row: &SqliteRow) -> Result<TicketRow> {
    let status: String = row.try_get("status")?;
    Ok(TicketRow {
        id: row.try_get("id")?,
        reference: row.try_get("reference")?,
        status: status.parse::<TicketStatus>()?,
        title: row.try_get("title")?,
        time: row.try_get("time")?,
        category_id: row.try_get("category_id")?,
        category: row.try_get("category")?,
        system_id: row.try_get("system_id")?,
        system: row.try_get("system")?,
        user_id: row.try_get("user_id")?,
        user: row.try_get("username")?,
    })
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    if let Some(ref category) = filter.category {
        query.push(" AND c.name = ").push_bind(category.clone());
    }
    if let Some(ref reference) = filter.reference {
        query
            .push(" AND instr(t.reference, ")
            .push_bind(reference.clone())
            .push(") > 0");
    }
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(ref title) = filter.title {
        query
            .push(" AND instr(t.title, ")
            .push_bind(title.clone())
            .push(") > 0");
    }
    if let Some(ref system) = filter.system {
        query.push(" AND s.name = ").push_bind(system.clone());
    }
    match &filter.user {
        UserFilter::Any => {},
        UserFilter::Unassigned => {
            query.push(" AND t.user_id IS NULL");
        },
        UserFilter::User(username) => {
            query.push(" AND u.username = ").push_bind(username.clone());
        },
    }
}

/// Filtered, id-ordered, paged listing
pub async fn list_ticket_rows(
    conn: &mut SqliteConnection,
    request: &TicketQuery,
) -> Result<Vec<TicketRow>> {
    let mut query = QueryBuilder::<Sqlite>::new(TICKET_ROW_SELECT);
    push_filter(&mut query, &request.filter);
    // SQLite reads a negative LIMIT as "no limit"
    let limit = request.page.count.map_or(-1, i64::from);
    query
        .push(" ORDER BY t.id ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(i64::from(request.page.from));

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(ticket_row_from_row).collect()
}

pub async fn count_ticket_rows(conn: &mut SqliteConnection, filter: &TicketFilter) -> Result<u64> {
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT COUNT(*) FROM ({TICKET_ROW_SELECT}"
    ));
    push_filter(&mut query, filter);
    query.push(")");

    let count: i64 = query.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(u64::try_from(count).unwrap_or_default())
}

pub async fn ticket_row_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<TicketRow>> {
    let mut query = QueryBuilder::<Sqlite>::new(TICKET_ROW_SELECT);
    query.push(" AND t.id = ").push_bind(id);
    let row = query.build().fetch_optional(&mut *conn).await?;
    row.as_ref().map(ticket_row_from_row).transpose()
}
