use chrono::{DateTime, Utc};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(sqlx::FromRow)]
pub struct UserEntity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        User {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            avatar: entity.avatar,
            role: Role::from(entity.role.as_str()),
            created_at: entity.created_at,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComicType {
    Manga,
    Manhwa,
    Manhua,
}

impl ComicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComicType::Manga => "Manga",
            ComicType::Manhwa => "Manhwa",
            ComicType::Manhua => "Manhua",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "manga" => Some(ComicType::Manga),
            "manhwa" => Some(ComicType::Manhwa),
            "manhua" => Some(ComicType::Manhua),
            _ => None,
        }
    }
}

#[derive(sqlx::FromRow, serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow)]
pub struct ComicEntity {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub alternative_title: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub rating: f64,
    #[sqlx(rename = "type")]
    pub comic_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Comic {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub alternative_title: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub rating: f64,
    #[serde(rename = "type")]
    pub comic_type: ComicType,
    pub genres: Vec<Genre>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comic {
    #[tracing::instrument(name = "transform comic", skip_all, fields(comic_id = entity.id))]
    pub fn from_entity(entity: ComicEntity, genres: &[ComicGenre]) -> Self {
        let comic_genres = genres
            .iter()
            .filter(|g| g.comic_id == entity.id)
            .map(|g| g.genre.clone())
            .collect();

        Comic {
            id: entity.id,
            slug: entity.slug,
            title: entity.title,
            alternative_title: entity.alternative_title,
            author: entity.author,
            status: entity.status,
            cover_url: entity.cover_url,
            synopsis: entity.synopsis,
            rating: entity.rating,
            comic_type: ComicType::parse(&entity.comic_type).unwrap_or(ComicType::Manga),
            genres: comic_genres,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// A genre row joined with the comic it belongs to.
pub struct ComicGenre {
    pub comic_id: i64,
    pub genre: Genre,
}

/// The few fields list pages need to render a comic card.
#[derive(sqlx::FromRow, serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ComicSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub cover_url: Option<String>,
    pub rating: f64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub comic_type: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };

        PageMeta {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct ComicPage {
    pub data: Vec<Comic>,
    pub pagination: PageMeta,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct BookmarkedComic {
    #[serde(flatten)]
    pub comic: ComicSummary,
    pub bookmarked_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct HistoryEntry {
    pub comic: ComicSummary,
    pub chapter_slug: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq, Eq)]
pub struct UserStats {
    pub bookmarks: i64,
    pub history: i64,
    pub read_chapters: i64,
}
