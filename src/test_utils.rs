use std::sync::{Arc, Mutex};

use crate::db::photos::{parse_photo_id, PhotoProvider};
use crate::models::photos::{format_timestamp, NewPhoto, Photo, PhotoId};

/// In-memory stand-in for the photos table.
#[derive(Clone, Debug, Default)]
pub struct MemoryPhotos {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<Photo>,
    lookups: Vec<String>,
    unavailable: bool,
}

impl MemoryPhotos {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every query fails as if the database were unreachable.
    pub fn unavailable() -> Self {
        let photos = Self::default();
        photos.inner.lock().unwrap().unavailable = true;
        photos
    }

    pub fn all(&self) -> Vec<Photo> {
        self.inner.lock().unwrap().rows.clone()
    }

    /// Raw ids passed to `get_photo_by_id`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.inner.lock().unwrap().lookups.clone()
    }

    fn check_available(inner: &Inner) -> Result<(), sqlx::Error> {
        if inner.unavailable {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PhotoProvider for MemoryPhotos {
    async fn get_all_photos(&self) -> Result<Vec<Photo>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner.rows.clone())
    }

    async fn get_photo_by_id(&self, photo_id: &str) -> Result<Option<Photo>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.lookups.push(photo_id.to_string());
        Self::check_available(&inner)?;

        let photo_id = match parse_photo_id(photo_id) {
            Some(photo_id) => photo_id,
            None => return Ok(None),
        };
        Ok(inner.rows.iter().find(|photo| photo.id == photo_id).cloned())
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        let id = inner.rows.last().map_or(1, |last| last.id + 1);
        let now = format_timestamp(time::OffsetDateTime::now_utc());
        inner.rows.push(Photo {
            id,
            source: photo.source.clone(),
            caption: photo.caption.clone(),
            created_at: now.clone(),
            updated_at: now,
        });
        Ok(id)
    }
}

pub fn test_state(photos: MemoryPhotos) -> crate::State {
    let tera = tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*.html"))
        .expect("couldn't load templates");

    crate::State {
        photos: Arc::new(photos),
        tera: Arc::new(tera),
    }
}

pub fn test_app(photos: MemoryPhotos) -> tide::Server<crate::State> {
    let mut app = tide::with_state(test_state(photos));
    crate::web::mount(&mut app);
    app
}
