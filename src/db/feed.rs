//! Read side of the forum: posts assembled with their counts, media and
//! comments, per-category feeds, and the logged-in user's profile.

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};

use crate::auth::session::{SessionStatus, SessionStore};
use crate::db::categories::{list_categories, GENERAL_CATEGORY_ID};
use crate::db::models::{CategoryFeed, Comment, Media, MediaKind, Post, UserProfile};
use crate::db::users::find_user_by_id;
use crate::db::votes::count_comments;
use crate::error::AppResult;

/// Which posts a feed query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Category(i64),
    LikedBy(i64),
    DislikedBy(i64),
    AuthoredBy(i64),
}

impl PostFilter {
    /// Extra join, WHERE clause and bound parameter for this filter.
    fn clause(self) -> (&'static str, &'static str, Option<i64>) {
        match self {
            PostFilter::All => ("", "", None),
            PostFilter::Category(id) => (
                "JOIN post_categories pc ON pc.post_id = p.id",
                "WHERE pc.category_id = ?1",
                Some(id),
            ),
            PostFilter::LikedBy(user_id) => (
                "",
                "WHERE EXISTS (SELECT 1 FROM votes mv WHERE mv.post_id = p.id
                     AND mv.comment_id IS NULL AND mv.user_id = ?1 AND mv.is_like = 1)",
                Some(user_id),
            ),
            PostFilter::DislikedBy(user_id) => (
                "",
                "WHERE EXISTS (SELECT 1 FROM votes mv WHERE mv.post_id = p.id
                     AND mv.comment_id IS NULL AND mv.user_id = ?1 AND mv.is_like = 0)",
                Some(user_id),
            ),
            PostFilter::AuthoredBy(user_id) => ("", "WHERE p.user_id = ?1", Some(user_id)),
        }
    }
}

pub fn fetch_posts(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    query_posts(conn, PostFilter::All)
}

pub fn fetch_posts_by_category(conn: &Connection, category_id: i64) -> rusqlite::Result<Vec<Post>> {
    query_posts(conn, PostFilter::Category(category_id))
}

pub fn fetch_liked_posts(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Post>> {
    query_posts(conn, PostFilter::LikedBy(user_id))
}

pub fn fetch_disliked_posts(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Post>> {
    query_posts(conn, PostFilter::DislikedBy(user_id))
}

pub fn fetch_created_posts(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Post>> {
    query_posts(conn, PostFilter::AuthoredBy(user_id))
}

/// One feed per category, Gnrl excluded since the main feed already covers it.
pub fn fetch_category_feeds(conn: &Connection) -> rusqlite::Result<Vec<CategoryFeed>> {
    list_categories(conn)?
        .into_iter()
        .filter(|c| c.id != GENERAL_CATEGORY_ID)
        .map(|c| {
            Ok(CategoryFeed {
                posts: fetch_posts_by_category(conn, c.id)?,
                id: c.id,
                name: c.name,
            })
        })
        .collect()
}

pub fn fetch_user_profile(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<UserProfile>> {
    let Some(user) = find_user_by_id(conn, user_id)? else {
        return Ok(None);
    };

    Ok(Some(UserProfile {
        user_id: user.id,
        username: user.username,
        profile_color: user.profile_color,
        liked_posts: fetch_liked_posts(conn, user_id)?,
        disliked_posts: fetch_disliked_posts(conn, user_id)?,
        created_posts: fetch_created_posts(conn, user_id)?,
    }))
}

/// Resolve a session token to the owner's profile. A blank, unknown or
/// expired token yields `None`, never an error.
pub fn fetch_user_profile_by_session_token(
    sessions: &SessionStore,
    conn: &Connection,
    token: &str,
) -> AppResult<Option<UserProfile>> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    match sessions.validate_on(conn, token)? {
        SessionStatus::Valid(user_id) => Ok(fetch_user_profile(conn, user_id)?),
        SessionStatus::Expired | SessionStatus::NotFound => Ok(None),
    }
}

fn query_posts(conn: &Connection, filter: PostFilter) -> rusqlite::Result<Vec<Post>> {
    let (joins, where_clause, param) = filter.clause();
    let sql = format!(
        "SELECT p.id, p.user_id, u.username, u.profile_color, p.content, p.created_at,
                COALESCE(SUM(CASE WHEN v.is_like = 1 THEN 1 ELSE 0 END), 0) AS likes,
                COALESCE(SUM(CASE WHEN v.is_like = 0 THEN 1 ELSE 0 END), 0) AS dislikes
         FROM posts p
         JOIN users u ON u.id = p.user_id
         {}
         LEFT JOIN votes v ON v.post_id = p.id AND v.comment_id IS NULL
         {}
         GROUP BY p.id
         ORDER BY p.created_at DESC, p.id DESC",
        joins, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(param.iter()), |row| {
            Ok(Post {
                id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                profile_color: row.get(3)?,
                content: row.get(4)?,
                created_at: format_date(&row.get::<_, String>(5)?),
                likes: row.get(6)?,
                dislikes: row.get(7)?,
                media: Vec::new(),
                comments: Vec::new(),
                comment_count: 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|mut post| {
            post.media = fetch_media(conn, post.id)?;
            post.comments = fetch_comments(conn, post.id)?;
            post.comment_count = count_comments(conn, post.id)?;
            Ok(post)
        })
        .collect()
}

pub fn fetch_media(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<Media>> {
    let mut stmt = conn.prepare(
        "SELECT file_path, file_type FROM media WHERE post_id = ?1 ORDER BY id",
    )?;
    let media = stmt
        .query_map(params![post_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(file_path, file_type)| {
            MediaKind::parse(&file_type).map(|file_type| Media {
                file_path,
                file_type,
            })
        })
        .collect();
    Ok(media)
}

pub fn fetch_comments(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, u.username, c.content, c.created_at,
                COALESCE(SUM(CASE WHEN v.is_like = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN v.is_like = 0 THEN 1 ELSE 0 END), 0)
         FROM comments c
         JOIN users u ON u.id = c.user_id
         LEFT JOIN votes v ON v.comment_id = c.id
         WHERE c.post_id = ?1
         GROUP BY c.id
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let comments = stmt
        .query_map(params![post_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                username: row.get(2)?,
                content: row.get(3)?,
                created_at: format_date(&row.get::<_, String>(4)?),
                likes: row.get(5)?,
                dislikes: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Render a SQLite `datetime('now')` value as e.g. `05 Mar 2025`.
pub fn format_date(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d %b %Y").to_string())
        .unwrap_or_else(|_| db_time.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::posts::{create_comment, create_post, NewMedia, NewPost};
    use crate::db::test_pool;
    use crate::db::users::insert_user;
    use crate::db::votes::{set_vote, VoteKind, VoteTarget};

    fn post(conn: &mut Connection, user_id: i64, content: &str, categories: Vec<i64>) -> i64 {
        create_post(
            conn,
            &NewPost {
                user_id,
                content: content.into(),
                category_ids: categories,
                media: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn format_date_handles_db_format() {
        assert_eq!(format_date("2025-03-05 12:00:00"), "05 Mar 2025");
    }

    #[test]
    fn format_date_bad_input_returns_raw() {
        assert_eq!(format_date("not-a-date"), "not-a-date");
    }

    #[test]
    fn fetch_posts_newest_first_with_counts_and_comments() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = insert_user(&conn, "a@gmail.com", "alice", None).unwrap();
        let bob = insert_user(&conn, "b@gmail.com", "bob", None).unwrap();

        let first = post(&mut conn, alice, "first", vec![]);
        let second = create_post(
            &mut conn,
            &NewPost {
                user_id: bob,
                content: "second".into(),
                category_ids: vec![],
                media: Some(NewMedia {
                    file_path: "/assets/uploads/clip.mp4".into(),
                    kind: MediaKind::Video,
                }),
            },
        )
        .unwrap();

        let comment = create_comment(&conn, bob, first, "nice").unwrap();
        set_vote(&mut conn, alice, VoteTarget::post(first), VoteKind::Like).unwrap();
        set_vote(&mut conn, bob, VoteTarget::post(first), VoteKind::Dislike).unwrap();
        set_vote(&mut conn, alice, VoteTarget::comment(first, comment), VoteKind::Like).unwrap();

        let posts = fetch_posts(&conn).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, second);
        assert!(posts[0].media[0].is_video());
        assert_eq!(posts[0].username, "bob");

        let first_post = &posts[1];
        assert_eq!(first_post.likes, 1);
        assert_eq!(first_post.dislikes, 1);
        assert_eq!(first_post.comment_count, 1);
        assert_eq!(first_post.comments[0].username, "bob");
        assert_eq!(first_post.comments[0].likes, 1);
        assert_eq!(first_post.comments[0].dislikes, 0);
    }

    #[test]
    fn category_feed_only_contains_tagged_posts() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = insert_user(&conn, "a@gmail.com", "alice", None).unwrap();
        let gaming = post(&mut conn, alice, "gg", vec![3]);
        post(&mut conn, alice, "plain", vec![]);

        let posts = fetch_posts_by_category(&conn, 3).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, gaming);

        let feeds = fetch_category_feeds(&conn).unwrap();
        assert_eq!(feeds.len(), 6);
        assert_eq!(feeds[0].name, "Memes");
        let gaming_feed = feeds.iter().find(|f| f.id == 3).unwrap();
        assert_eq!(gaming_feed.posts.len(), 1);
        assert!(feeds.iter().filter(|f| f.id != 3).all(|f| f.posts.is_empty()));
    }

    #[test]
    fn profile_splits_liked_disliked_and_authored() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();
        let alice = insert_user(&conn, "a@gmail.com", "alice", None).unwrap();
        let bob = insert_user(&conn, "b@gmail.com", "bob", None).unwrap();
        let liked = post(&mut conn, bob, "liked", vec![]);
        let disliked = post(&mut conn, bob, "disliked", vec![]);
        let own = post(&mut conn, alice, "mine", vec![]);

        set_vote(&mut conn, alice, VoteTarget::post(liked), VoteKind::Like).unwrap();
        set_vote(&mut conn, bob, VoteTarget::post(liked), VoteKind::Like).unwrap();
        set_vote(&mut conn, alice, VoteTarget::post(disliked), VoteKind::Dislike).unwrap();

        let profile = fetch_user_profile(&conn, alice).unwrap().unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.liked_posts.len(), 1);
        assert_eq!(profile.liked_posts[0].id, liked);
        assert_eq!(profile.liked_posts[0].likes, 2);
        assert_eq!(profile.disliked_posts[0].id, disliked);
        assert_eq!(profile.created_posts.len(), 1);
        assert_eq!(profile.created_posts[0].id, own);

        assert!(fetch_user_profile(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn profile_by_token_resolves_only_live_sessions() {
        let pool = test_pool();
        let live = SessionStore::new(pool.clone(), 1);
        let lapsed = SessionStore::new(pool.clone(), 0);
        let user_id = {
            let conn = pool.get().unwrap();
            insert_user(&conn, "a@gmail.com", "alice", None).unwrap()
        };
        let token = live.issue(user_id).unwrap();

        let conn = pool.get().unwrap();
        let profile = fetch_user_profile_by_session_token(&live, &conn, &token)
            .unwrap()
            .unwrap();
        assert_eq!(profile.user_id, user_id);
        assert!(fetch_user_profile_by_session_token(&live, &conn, "")
            .unwrap()
            .is_none());
        assert!(fetch_user_profile_by_session_token(&live, &conn, "not-a-token")
            .unwrap()
            .is_none());
        drop(conn);

        let expired = lapsed.issue(user_id).unwrap();
        let conn = pool.get().unwrap();
        assert!(fetch_user_profile_by_session_token(&lapsed, &conn, &expired)
            .unwrap()
            .is_none());
    }
}
