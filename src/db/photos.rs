use sqlx::{FromRow, PgPool};

use crate::models;
pub use crate::models::photos::PhotoId;

#[derive(Debug, FromRow)]
pub struct Photo {
    pub id: PhotoId,
    pub source: String,
    pub caption: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

/// Parses a photo id as it appears in a URL.
///
/// Anything that isn't a valid id can never have been handed out by the database, so callers
/// should treat `None` as "no such photo" rather than as a malformed request.
pub fn parse_photo_id(photo_id: &str) -> Option<PhotoId> {
    photo_id.parse().ok()
}

#[async_trait::async_trait]
pub trait PhotoProvider: std::fmt::Debug + Send + Sync {
    async fn get_all_photos(&self) -> Result<Vec<models::photos::Photo>, sqlx::Error>;

    async fn get_photo_by_id(
        &self,
        photo_id: &str,
    ) -> Result<Option<models::photos::Photo>, sqlx::Error>;

    async fn insert_photo(&self, photo: &models::photos::NewPhoto)
        -> Result<PhotoId, sqlx::Error>;
}

#[async_trait::async_trait]
impl PhotoProvider for PgPool {
    async fn get_all_photos(&self) -> Result<Vec<models::photos::Photo>, sqlx::Error> {
        let res: Vec<Photo> = sqlx::query_as(
            r#"
                SELECT
                    id, source, caption, created_at, updated_at
                FROM
                    photos
                ORDER BY
                    id ASC
            "#,
        )
        .fetch_all(self)
        .await?;

        Ok(res.into_iter().map(models::photos::Photo::from).collect())
    }


    async fn get_photo_by_id(
        &self,
        photo_id: &str,
    ) -> Result<Option<models::photos::Photo>, sqlx::Error> {
        let photo_id = match parse_photo_id(photo_id) {
            Some(photo_id) => photo_id,
            None => return Ok(None),
        };

        let res: Option<Photo> = sqlx::query_as(
            r#"
                SELECT
                    id, source, caption, created_at, updated_at
                FROM
                    photos
                WHERE
                    id = $1
            "#,
        )
        .bind(photo_id)
        .fetch_optional(self)
        .await?;

        Ok(res.map(models::photos::Photo::from))
    }


    async fn insert_photo(
        &self,
        photo: &models::photos::NewPhoto,
    ) -> Result<PhotoId, sqlx::Error> {
        let (id,): (PhotoId,) = sqlx::query_as(
            r#"
                INSERT INTO photos
                    (source, caption)
                VALUES
                    ($1, $2)
                RETURNING
                    id
            "#,
        )
        .bind(&photo.source)
        .bind(&photo.caption)
        .fetch_one(self)
        .await?;

        Ok(id)
    }
}
