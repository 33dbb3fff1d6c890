use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::posts::{comment_belongs_to_post, post_exists};
use crate::db::votes::{set_vote, VoteKind, VoteTarget};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::posts::parse_id;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VoteForm {
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

impl VoteForm {
    fn post_id(&self) -> AppResult<i64> {
        parse_id(self.post_id.as_deref().unwrap_or_default())
    }

    fn comment_id(&self) -> AppResult<i64> {
        parse_id(self.comment_id.as_deref().unwrap_or_default())
    }
}

/// Where the browser lands after voting.
#[derive(Clone, Copy)]
enum Anchor {
    Post,
    CommentSection,
}

impl Anchor {
    fn location(self, post_id: i64) -> String {
        match self {
            Anchor::Post => format!("/#post={}", post_id),
            Anchor::CommentSection => format!("/#CommentSection={}", post_id),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/like", post(like_post))
        .route("/dislike", post(dislike_post))
        .route("/inPostlike", post(like_post_in_comments))
        .route("/inPostdislike", post(dislike_post_in_comments))
        .route("/Commentlike", post(like_comment))
        .route("/Commentdislike", post(dislike_comment))
}

fn record_vote(
    state: &AppState,
    user: &CurrentUser,
    target: VoteTarget,
    kind: VoteKind,
    anchor: Anchor,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;

    if !post_exists(&conn, target.post_id)? {
        return Err(AppError::NotFound);
    }
    if let Some(comment_id) = target.comment_id {
        if !comment_belongs_to_post(&conn, comment_id, target.post_id)? {
            return Err(AppError::NotFound);
        }
    }

    let outcome = set_vote(&mut conn, user.id, target, kind)?;
    tracing::debug!(
        "{} {:?} on {:?}: {:?}",
        user.username,
        kind,
        target,
        outcome
    );

    Ok(Redirect::to(&anchor.location(target.post_id)).into_response())
}

async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::post(form.post_id()?);
    record_vote(&state, &user, target, VoteKind::Like, Anchor::Post)
}

async fn dislike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::post(form.post_id()?);
    record_vote(&state, &user, target, VoteKind::Dislike, Anchor::Post)
}

async fn like_post_in_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::post(form.post_id()?);
    record_vote(&state, &user, target, VoteKind::Like, Anchor::CommentSection)
}

async fn dislike_post_in_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::post(form.post_id()?);
    record_vote(&state, &user, target, VoteKind::Dislike, Anchor::CommentSection)
}

async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::comment(form.post_id()?, form.comment_id()?);
    record_vote(&state, &user, target, VoteKind::Like, Anchor::CommentSection)
}

async fn dislike_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let target = VoteTarget::comment(form.post_id()?, form.comment_id()?);
    record_vote(&state, &user, target, VoteKind::Dislike, Anchor::CommentSection)
}
