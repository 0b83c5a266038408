//! Development fixture loader.
//!
//! Reads a JSON array of listings and creates the missing ones, so a fresh
//! database has something to browse.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use listings_core::{
    slugify, Condition, Field, FindRequest, PropertyDraft, RichText, Where,
};
use listings_storage::{Database, NewMedia, PropertyError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProperty {
    pub title: String,
    pub location: String,
    pub price: f64,
    pub image: SeedImage,
    pub description: SeedDescription,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Either a full rich-text document or plain text split on blank lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedDescription {
    Document(RichText),
    Text(String),
}

impl SeedDescription {
    fn into_rich_text(self) -> RichText {
        match self {
            Self::Document(doc) => doc,
            Self::Text(text) => RichText::from_plain_text(&text),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
    /// Entries that failed schema validation.
    pub rejected: usize,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to create property: {0}")]
    Property(#[from] PropertyError),
}

pub async fn load_file(
    database: &Database,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<SeedProperty> = serde_json::from_str(&raw)?;
    load(database, entries, now).await
}

/// Creates every valid entry whose slug is not taken yet.
///
/// Each entry's media and property rows are written together or not at all.
/// Entries get increasing timestamps so the listing shows the last entry first.
pub async fn load(
    database: &Database,
    entries: Vec<SeedProperty>,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let properties = database.properties();
    let mut report = SeedReport::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let slug = slugify(&entry.title);
        if slug_taken(database, &slug).await? {
            warn!(stage = "seed", %slug, "property already exists, skipping");
            report.skipped += 1;
            continue;
        }

        let created_at = now + Duration::seconds(index as i64);
        let media = NewMedia {
            url: &entry.image.url,
            alt: entry.image.alt.as_deref(),
            created_at,
        };
        let draft = PropertyDraft {
            title: Some(entry.title.clone()),
            location: Some(entry.location),
            price: Some(entry.price),
            description: Some(entry.description.into_rich_text()),
            is_published: Some(entry.is_published),
            ..PropertyDraft::default()
        };

        match properties.create_with_media(media, draft, created_at).await {
            Ok(property) => {
                info!(stage = "seed", slug = %property.slug, published = property.is_published, "property created");
                report.created += 1;
            }
            Err(PropertyError::DuplicateSlug(slug)) => {
                warn!(stage = "seed", %slug, "property already exists, skipping");
                report.skipped += 1;
            }
            Err(err @ (PropertyError::Invalid(_) | PropertyError::Media(_))) => {
                warn!(stage = "seed", title = %entry.title, error = %err, "invalid entry, skipping");
                report.rejected += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report)
}

async fn slug_taken(database: &Database, slug: &str) -> Result<bool, PropertyError> {
    let request = FindRequest {
        filter: Where::new().and(Condition::equals(Field::Slug, slug)),
        page: 1,
        limit: 1,
        depth: 0,
    };
    Ok(database.properties().find(&request).await?.total_docs > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use listings_core::query::{detail_request, ListingParams, ListingQuery};
    use std::io::Write;

    const FIXTURE: &str = r#"[
        {
            "title": "Garden Cottage",
            "location": "Cotswolds",
            "price": 385000,
            "image": {"url": "/media/cottage.jpg", "alt": "Cottage front"},
            "description": "Stone walls.\n\nMature garden.",
            "isPublished": true
        },
        {
            "title": "???",
            "location": "Unknown",
            "price": 5,
            "image": {"url": "/media/unknown.jpg"},
            "description": "No slug can be derived from this title."
        },
        {
            "title": "Draft Listing",
            "location": "Nowhere",
            "price": 1,
            "image": {"url": "/media/draft.jpg"},
            "description": {"root": {"children": [
                {"type": "paragraph", "children": [{"type": "text", "text": "Work in progress"}]}
            ]}}
        }
    ]"#;

    async fn media_rows(database: &Database) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM media")
            .fetch_one(database.pool())
            .await
            .expect("count media")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    #[tokio::test]
    async fn loads_fixture_skipping_taken_and_invalid_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database = Database::open(&dir.path().join("seed.db"))
            .await
            .expect("open");
        database.run_migrations().await.expect("migrations");

        let fixture = dir.path().join("properties.json");
        std::fs::File::create(&fixture)
            .and_then(|mut file| file.write_all(FIXTURE.as_bytes()))
            .expect("write fixture");

        let report = load_file(&database, &fixture, now()).await.expect("seed");
        assert_eq!(
            report,
            SeedReport {
                created: 2,
                skipped: 0,
                rejected: 1
            }
        );
        assert_eq!(media_rows(&database).await, 2, "rejected entry leaves no media");

        let again = load_file(&database, &fixture, now()).await.expect("reseed");
        assert_eq!(
            again,
            SeedReport {
                created: 0,
                skipped: 2,
                rejected: 1
            }
        );
        assert_eq!(media_rows(&database).await, 2, "skipped entries add no media");

        let cottage = database
            .properties()
            .find(&detail_request("garden-cottage"))
            .await
            .expect("find");
        let cottage = cottage.first().expect("cottage is published");
        assert_eq!(
            cottage.description.paragraphs(),
            vec!["Stone walls.", "Mature garden."]
        );
        assert_eq!(cottage.image.alt(), Some("Cottage front"));

        let listing = database
            .properties()
            .find(&ListingQuery::from_params(&ListingParams::default()).request)
            .await
            .expect("listing");
        assert_eq!(listing.total_docs, 1, "draft listing stays hidden");
    }
}
