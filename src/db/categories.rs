use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Category;
use crate::error::{AppError, AppResult};

/// "Gnrl", the category every post without an explicit choice lands in.
pub const GENERAL_CATEGORY_ID: i64 = 1;

pub fn list_categories(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE name = ?1 COLLATE NOCASE",
        params![name],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Map submitted category names to ids, dropping blanks and duplicates.
/// An unknown name is a bad request rather than a new category.
pub fn resolve_categories(conn: &Connection, names: &[String]) -> AppResult<Vec<i64>> {
    let mut ids = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let category = find_category_by_name(conn, name)?
            .ok_or_else(|| AppError::BadRequest(format!("Unknown category: {}", name)))?;
        if !ids.contains(&category.id) {
            ids.push(category.id);
        }
    }
    Ok(ids)
}
