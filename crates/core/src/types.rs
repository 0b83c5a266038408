use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::richtext::RichText;

/// Identifier assigned by the store to a property record.
pub type PropertyId = i64;

/// Identifier assigned by the store to a media record.
pub type MediaId = i64;

/// Listing record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub slug: String,
    pub location: String,
    pub price: f64,
    pub image: ImageRef,
    pub description: RichText,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Uploaded asset referenced by a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: MediaId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Image field of a property.
///
/// Queries at depth 0 only carry the media id; deeper queries resolve the
/// referenced media record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Reference(MediaId),
    Expanded(Media),
}

impl ImageRef {
    /// Returns the public URL when the reference was resolved and carries one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Expanded(media) if !media.url.is_empty() => Some(media.url.as_str()),
            _ => None,
        }
    }

    pub fn alt(&self) -> Option<&str> {
        match self {
            Self::Expanded(media) => media.alt.as_deref().filter(|alt| !alt.is_empty()),
            Self::Reference(_) => None,
        }
    }
}

/// One page of documents returned by a store query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocs<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub total_pages: u64,
    pub page: u64,
    pub limit: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl<T> PaginatedDocs<T> {
    /// Builds the page envelope from the matched total.
    ///
    /// A `limit` of zero means the whole result set was returned on one page.
    pub fn new(docs: Vec<T>, total_docs: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 {
            u64::from(total_docs > 0)
        } else {
            total_docs.div_ceil(limit)
        };
        Self {
            docs,
            total_docs,
            total_pages,
            page,
            limit,
            has_prev_page: page > 1,
            has_next_page: page < total_pages,
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.docs.first()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
