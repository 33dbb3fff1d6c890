use rusqlite::{params, Connection};

use crate::db::categories::GENERAL_CATEGORY_ID;
use crate::db::models::MediaKind;

pub struct NewMedia {
    pub file_path: String,
    pub kind: MediaKind,
}

pub struct NewPost {
    pub user_id: i64,
    pub content: String,
    pub category_ids: Vec<i64>,
    pub media: Option<NewMedia>,
}

/// Insert a post with its category links and optional media in one
/// transaction. No categories means the post is filed under Gnrl only.
pub fn create_post(conn: &mut Connection, post: &NewPost) -> rusqlite::Result<i64> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO posts (user_id, content) VALUES (?1, ?2)",
        params![post.user_id, post.content],
    )?;
    let post_id = tx.last_insert_rowid();

    let category_ids: &[i64] = if post.category_ids.is_empty() {
        &[GENERAL_CATEGORY_ID]
    } else {
        &post.category_ids
    };
    for category_id in category_ids {
        tx.execute(
            "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
            params![post_id, category_id],
        )?;
    }

    if let Some(media) = &post.media {
        tx.execute(
            "INSERT INTO media (post_id, file_path, file_type) VALUES (?1, ?2, ?3)",
            params![post_id, media.file_path, media.kind.as_str()],
        )?;
    }

    tx.commit()?;
    Ok(post_id)
}

pub fn create_comment(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
    content: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
        params![post_id, user_id, content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn post_exists(conn: &Connection, post_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id],
        |row| row.get(0),
    )
}

pub fn comment_belongs_to_post(
    conn: &Connection,
    comment_id: i64,
    post_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1 AND post_id = ?2)",
        params![comment_id, post_id],
        |row| row.get(0),
    )
}
