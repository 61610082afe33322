use serde::Serialize;
use time::format_description::well_known::Rfc3339;

pub type PhotoId = i32;

#[derive(Clone, Debug, Serialize)]
pub struct Photo {
    pub id: PhotoId,
    pub source: String,
    pub caption: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A photo that has not been stored yet, and so has no id or timestamps.
#[derive(Debug)]
pub struct NewPhoto {
    pub source: String,
    pub caption: String,
}

/// Formats a timestamp for display, or an empty string if it can't be expressed in RFC 3339.
pub(crate) fn format_timestamp(timestamp: time::OffsetDateTime) -> String {
    match timestamp.format(&Rfc3339) {
        Ok(formatted) => formatted,
        Err(err) => {
            tide::log::error!("Failed to format timestamp {:?}: {}", timestamp, err);
            String::new()
        },
    }
}

impl From<crate::db::photos::Photo> for Photo {
    fn from(p: crate::db::photos::Photo) -> Self {
        Photo {
            id: p.id,
            source: p.source,
            caption: p.caption,
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
        }
    }
}
