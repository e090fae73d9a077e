use rusqlite::Row;
use serde::Serialize;

pub type UserId = i64;
pub type PostId = i64;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub bio: String,
    pub profile_image: String,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, username, bio, profile_image, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            bio: row.get(2)?,
            profile_image: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn profile_path(&self) -> String {
        profile_path(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub image: String,
    pub link: String,
    pub smiles: i64,
    pub timestamp: String,
}

impl Post {
    pub const COLUMNS: &'static str =
        "posts.id, posts.user_id, posts.content, posts.image, posts.link, posts.smiles, posts.timestamp";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            content: row.get(2)?,
            image: row.get(3)?,
            link: row.get(4)?,
            smiles: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reaction {
    pub user_id: UserId,
    pub post_id: PostId,
    pub emoji: String,
}

/// Site path of a user's profile page, with the name percent-encoded.
pub fn profile_path(username: &str) -> String {
    let mut url = match url::Url::parse("http://localhost/user/") {
        Ok(url) => url,
        Err(_) => return "/".to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(username);
    }
    url.path().to_string()
}
