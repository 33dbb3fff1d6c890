use std::path::Path as FsPath;

use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::categories::resolve_categories;
use crate::db::models::MediaKind;
use crate::db::posts::{create_comment, create_post, post_exists, NewMedia, NewPost};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Upper bound for post and comment bodies, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 366;

/// Public URL prefix the uploads directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/assets/uploads";

// --- Forms ---

#[derive(Deserialize)]
pub struct CreateCommentForm {
    #[serde(rename = "commentInput")]
    pub comment_input: String,
    #[serde(rename = "hiddenID")]
    pub hidden_id: String,
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub post_id: Option<String>,
}

/// A file part pulled out of the post form, not yet on disk.
struct Upload {
    extension: String,
    kind: MediaKind,
    data: axum::body::Bytes,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createpost", post(create_post_handler))
        .route("/createcomment", post(create_comment_handler))
        .route("/redirect", get(redirect_to_post))
}

/// Trimmed body text, or a bad request when it is empty or too long.
pub fn validate_content(raw: &str) -> AppResult<String> {
    let content = raw.trim();
    match content.chars().count() {
        0 => Err(AppError::BadRequest("Content cannot be empty".into())),
        n if n > MAX_CONTENT_CHARS => Err(AppError::BadRequest(format!(
            "Content must be {} characters or less",
            MAX_CONTENT_CHARS
        ))),
        _ => Ok(content.to_string()),
    }
}

pub fn parse_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("Invalid request".into()))
}

// --- Handlers ---

/// POST /createpost (multipart: postText, catInputs*, postImage?)
async fn create_post_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut text = String::new();
    let mut category_names = Vec::new();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "postText" => {
                text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            "catInputs" => {
                category_names.push(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?,
                );
            }
            "postImage" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                upload = Some(inspect_upload(&file_name, data)?);
            }
            _ => {}
        }
    }

    let content = validate_content(&text)?;
    let category_ids = {
        let conn = state.db.get()?;
        resolve_categories(&conn, &category_names)?
    };

    let media = match upload {
        Some(upload) => Some(store_upload(&state.config.uploads_path(), upload).await?),
        None => None,
    };
    let stored_file = media.as_ref().map(|m| m.file_path.clone());

    let new_post = NewPost {
        user_id: user.id,
        content,
        category_ids,
        media,
    };
    let created = {
        let mut conn = state.db.get()?;
        create_post(&mut conn, &new_post)
    };

    match created {
        Ok(post_id) => {
            tracing::info!("User {} created post {}", user.username, post_id);
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            if let Some(url) = stored_file {
                discard_upload(&state.config.uploads_path(), &url).await;
            }
            Err(e.into())
        }
    }
}

/// POST /createcomment (commentInput, hiddenID)
async fn create_comment_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CreateCommentForm>,
) -> AppResult<Response> {
    let post_id = parse_id(&form.hidden_id)?;
    let content = validate_content(&form.comment_input)?;

    let conn = state.db.get()?;
    if !post_exists(&conn, post_id)? {
        return Err(AppError::NotFound);
    }
    create_comment(&conn, user.id, post_id, &content)?;

    Ok(Redirect::to(&format!("/#CommentSection={}", post_id)).into_response())
}

/// GET /redirect?post_id=N
async fn redirect_to_post(Query(query): Query<RedirectQuery>) -> AppResult<Response> {
    let raw = query.post_id.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(AppError::BadRequest("Missing post id".into()));
    }
    let post_id = parse_id(&raw)?;
    Ok(Redirect::to(&format!("/#post={}", post_id)).into_response())
}

// --- Uploads ---

fn inspect_upload(file_name: &str, data: axum::body::Bytes) -> AppResult<Upload> {
    let extension = FsPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let kind = MediaKind::from_extension(&extension)
        .ok_or_else(|| AppError::BadRequest("Unsupported file type".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    Ok(Upload {
        extension,
        kind,
        data,
    })
}

async fn store_upload(dir: &FsPath, upload: Upload) -> AppResult<NewMedia> {
    let name = format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp(),
        uuid::Uuid::new_v4(),
        upload.extension
    );
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&name), &upload.data).await?;

    Ok(NewMedia {
        file_path: format!("{}/{}", UPLOADS_URL_PREFIX, name),
        kind: upload.kind,
    })
}

async fn discard_upload(dir: &FsPath, url: &str) {
    let Some(name) = url.rsplit('/').next() else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(dir.join(name)).await {
        tracing::warn!("Could not remove orphaned upload {}: {}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_limit_is_counted_in_chars() {
        assert!(validate_content(&"a".repeat(366)).is_ok());
        assert!(validate_content(&"a".repeat(367)).is_err());
        // Multi-byte characters count once each.
        assert!(validate_content(&"é".repeat(366)).is_ok());
    }

    #[test]
    fn content_is_trimmed_and_must_not_be_blank() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
        assert!(validate_content("   ").is_err());
        assert!(validate_content("").is_err());
    }

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id(" 42 ").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
        assert!(parse_id("").is_err());
    }

    #[test]
    fn upload_kind_comes_from_extension() {
        let data = axum::body::Bytes::from_static(b"data");
        let image = inspect_upload("cat.PNG", data.clone()).unwrap();
        assert_eq!(image.kind, MediaKind::Image);
        assert_eq!(image.extension, "png");
        assert_eq!(
            inspect_upload("clip.webm", data.clone()).unwrap().kind,
            MediaKind::Video
        );
        assert!(inspect_upload("notes.txt", data.clone()).is_err());
        assert!(inspect_upload("noext", data).is_err());
        assert!(inspect_upload("empty.png", axum::body::Bytes::new()).is_err());
    }

    #[tokio::test]
    async fn stored_upload_lands_in_dir_with_public_path() {
        let tmp = tempfile::tempdir().unwrap();
        let upload = inspect_upload("pic.jpg", axum::body::Bytes::from_static(b"jpeg")).unwrap();
        let media = store_upload(tmp.path(), upload).await.unwrap();

        assert!(media.file_path.starts_with("/assets/uploads/"));
        assert!(media.file_path.ends_with(".jpg"));
        let name = media.file_path.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(tmp.path().join(name)).unwrap(), b"jpeg");

        discard_upload(tmp.path(), &media.file_path).await;
        assert!(!tmp.path().join(name).exists());
    }
}
