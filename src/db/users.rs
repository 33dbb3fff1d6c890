use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;

/// Colors a user may pick for their profile badge.
pub const PROFILE_COLORS: &[&str] = &[
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4", "#3b82f6", "#6366f1", "#a855f7",
    "#ec4899", "#78716c",
];

pub fn is_valid_profile_color(color: &str) -> bool {
    PROFILE_COLORS.contains(&color)
}

const USER_COLUMNS: &str = "id, email, username, password_hash, profile_color, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        profile_color: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a user. `password_hash` is `None` for accounts created through OAuth.
pub fn insert_user(
    conn: &Connection,
    email: &str,
    username: &str,
    password_hash: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (email, username, password_hash) VALUES (?1, ?2, ?3)",
        params![email, username, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_user_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        params![username],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
        params![email],
        user_from_row,
    )
    .optional()
}

pub fn username_exists(conn: &Connection, username: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )
}

pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )
}

pub fn update_profile_color(conn: &Connection, user_id: i64, color: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET profile_color = ?1 WHERE id = ?2",
        params![color, user_id],
    )?;
    Ok(())
}

/// First free username of the form `base`, `base1`, `base2`, ...
pub fn unique_username(conn: &Connection, base: &str) -> rusqlite::Result<String> {
    let base = if base.trim().is_empty() { "user" } else { base.trim() };
    if !username_exists(conn, base)? {
        return Ok(base.to_string());
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{}{}", base, suffix);
        if !username_exists(conn, &candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
