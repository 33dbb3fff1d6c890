use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub profile_color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Infer the media kind from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(MediaKind::Image),
            "mp4" | "mov" | "avi" | "webm" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub file_path: String,
    pub file_type: MediaKind,
}

impl Media {
    pub fn is_video(&self) -> bool {
        self.file_type == MediaKind::Video
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
}

/// A post as shown in a feed, with its engagement and attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_color: String,
    pub content: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub media: Vec<Media>,
    pub comments: Vec<Comment>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFeed {
    pub id: i64,
    pub name: String,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub profile_color: String,
    pub liked_posts: Vec<Post>,
    pub disliked_posts: Vec<Post>,
    pub created_posts: Vec<Post>,
}
