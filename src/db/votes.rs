//! Likes and dislikes on posts and comments.
//!
//! A user holds at most one vote per target. The read-then-write toggle runs
//! inside an immediate transaction and the `votes` table carries a unique
//! index on the target key, so concurrent requests cannot leave both a like
//! and a dislike behind.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    fn is_like(self) -> bool {
        matches!(self, VoteKind::Like)
    }

    fn from_is_like(is_like: bool) -> Self {
        if is_like {
            VoteKind::Like
        } else {
            VoteKind::Dislike
        }
    }
}

/// What a vote points at. `comment_id == None` targets the post itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTarget {
    pub post_id: i64,
    pub comment_id: Option<i64>,
}

impl VoteTarget {
    pub fn post(post_id: i64) -> Self {
        Self {
            post_id,
            comment_id: None,
        }
    }

    pub fn comment(post_id: i64, comment_id: i64) -> Self {
        Self {
            post_id,
            comment_id: Some(comment_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// No previous vote existed.
    Created,
    /// The opposite vote was replaced.
    Switched,
    /// The same vote already existed; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCounts {
    pub likes: i64,
    pub dislikes: i64,
}

/// Record `kind` for `user_id` on `target`. Repeating the current vote is a no-op.
pub fn set_vote(
    conn: &mut Connection,
    user_id: i64,
    target: VoteTarget,
    kind: VoteKind,
) -> rusqlite::Result<VoteOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing: Option<bool> = tx
        .query_row(
            "SELECT is_like FROM votes
             WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS ?3",
            params![user_id, target.post_id, target.comment_id],
            |row| row.get(0),
        )
        .optional()?;

    let outcome = match existing.map(VoteKind::from_is_like) {
        Some(current) if current == kind => VoteOutcome::Unchanged,
        Some(_) => {
            tx.execute(
                "DELETE FROM votes
                 WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS ?3",
                params![user_id, target.post_id, target.comment_id],
            )?;
            VoteOutcome::Switched
        }
        None => VoteOutcome::Created,
    };

    if outcome != VoteOutcome::Unchanged {
        tx.execute(
            "INSERT INTO votes (user_id, post_id, comment_id, is_like) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, target.post_id, target.comment_id, kind.is_like()],
        )?;
    }

    tx.commit()?;
    Ok(outcome)
}

pub fn current_vote(
    conn: &Connection,
    user_id: i64,
    target: VoteTarget,
) -> rusqlite::Result<Option<VoteKind>> {
    let is_like: Option<bool> = conn
        .query_row(
            "SELECT is_like FROM votes
             WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS ?3",
            params![user_id, target.post_id, target.comment_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(is_like.map(VoteKind::from_is_like))
}

pub fn count_votes(conn: &Connection, target: VoteTarget) -> rusqlite::Result<VoteCounts> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN is_like = 1 THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN is_like = 0 THEN 1 ELSE 0 END), 0)
         FROM votes
         WHERE post_id = ?1 AND comment_id IS ?2",
        params![target.post_id, target.comment_id],
        |row| {
            Ok(VoteCounts {
                likes: row.get(0)?,
                dislikes: row.get(1)?,
            })
        },
    )
}

pub fn count_comments(conn: &Connection, post_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed(conn: &Connection) -> (i64, i64, i64) {
        conn.execute(
            "INSERT INTO users (email, username, password_hash) VALUES ('a@gmail.com', 'alice', 'h')",
            [],
        )
        .unwrap();
        let user_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO posts (user_id, content) VALUES (?1, 'hello')",
            params![user_id],
        )
        .unwrap();
        let post_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, 'reply')",
            params![post_id, user_id],
        )
        .unwrap();
        let comment_id = conn.last_insert_rowid();
        (user_id, post_id, comment_id)
    }

    fn rows_for(conn: &Connection, user_id: i64, target: VoteTarget) -> Vec<bool> {
        let mut stmt = conn
            .prepare(
                "SELECT is_like FROM votes
                 WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS ?3",
            )
            .unwrap();
        stmt.query_map(
            params![user_id, target.post_id, target.comment_id],
            |row| row.get(0),
        )
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
    }

    #[test]
    fn like_then_dislike_then_like_keeps_one_row() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let (user_id, post_id, _) = seed(&conn);
        let target = VoteTarget::post(post_id);

        assert_eq!(
            set_vote(&mut conn, user_id, target, VoteKind::Like).unwrap(),
            VoteOutcome::Created
        );
        assert_eq!(rows_for(&conn, user_id, target), vec![true]);

        assert_eq!(
            set_vote(&mut conn, user_id, target, VoteKind::Dislike).unwrap(),
            VoteOutcome::Switched
        );
        assert_eq!(rows_for(&conn, user_id, target), vec![false]);

        assert_eq!(
            set_vote(&mut conn, user_id, target, VoteKind::Like).unwrap(),
            VoteOutcome::Switched
        );
        assert_eq!(rows_for(&conn, user_id, target), vec![true]);
    }

    #[test]
    fn repeating_a_vote_is_a_no_op() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let (user_id, post_id, _) = seed(&conn);
        let target = VoteTarget::post(post_id);

        set_vote(&mut conn, user_id, target, VoteKind::Dislike).unwrap();
        assert_eq!(
            set_vote(&mut conn, user_id, target, VoteKind::Dislike).unwrap(),
            VoteOutcome::Unchanged
        );
        assert_eq!(rows_for(&conn, user_id, target), vec![false]);
        assert_eq!(
            current_vote(&conn, user_id, target).unwrap(),
            Some(VoteKind::Dislike)
        );
    }

    #[test]
    fn post_and_comment_votes_are_independent() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let (user_id, post_id, comment_id) = seed(&conn);
        let on_post = VoteTarget::post(post_id);
        let on_comment = VoteTarget::comment(post_id, comment_id);

        set_vote(&mut conn, user_id, on_post, VoteKind::Like).unwrap();
        set_vote(&mut conn, user_id, on_comment, VoteKind::Dislike).unwrap();

        assert_eq!(
            count_votes(&conn, on_post).unwrap(),
            VoteCounts {
                likes: 1,
                dislikes: 0
            }
        );
        assert_eq!(
            count_votes(&conn, on_comment).unwrap(),
            VoteCounts {
                likes: 0,
                dislikes: 1
            }
        );
        assert_eq!(current_vote(&conn, user_id, on_post).unwrap(), Some(VoteKind::Like));
    }

    #[test]
    fn counts_default_to_zero() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let (_, post_id, _) = seed(&conn);
        assert_eq!(
            count_votes(&conn, VoteTarget::post(post_id)).unwrap(),
            VoteCounts::default()
        );
        assert_eq!(count_comments(&conn, post_id).unwrap(), 1);
        assert_eq!(count_comments(&conn, post_id + 1).unwrap(), 0);
    }
}
