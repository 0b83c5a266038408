use serde::Deserialize;
use thiserror::Error;

use crate::richtext::RichText;
use crate::types::MediaId;

/// Storage kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Upload { relation_to: &'static str },
    RichText,
    Checkbox { default: bool },
}

/// Declaration of one field of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Field layout of the `property` collection.
pub const PROPERTY_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "title",
        kind: FieldKind::Text,
        required: true,
    },
    FieldSpec {
        name: "slug",
        kind: FieldKind::Text,
        required: true,
    },
    FieldSpec {
        name: "location",
        kind: FieldKind::Text,
        required: true,
    },
    FieldSpec {
        name: "price",
        kind: FieldKind::Number,
        required: true,
    },
    FieldSpec {
        name: "image",
        kind: FieldKind::Upload {
            relation_to: "media",
        },
        required: true,
    },
    FieldSpec {
        name: "description",
        kind: FieldKind::RichText,
        required: true,
    },
    FieldSpec {
        name: "isPublished",
        kind: FieldKind::Checkbox { default: false },
        required: true,
    },
];

/// Normalises a title into a URL-safe slug.
///
/// The title is lowercased, every run of characters outside `[a-z0-9]`
/// becomes a single hyphen, and leading/trailing hyphens are dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Before-validate hook for the `slug` field.
///
/// A present title always wins; otherwise the supplied slug is kept as is.
pub fn derive_slug(title: Option<&str>, slug: Option<&str>) -> Option<String> {
    match title {
        Some(title) if !title.is_empty() => Some(slugify(title)),
        _ => slug.map(str::to_owned),
    }
}

/// Unvalidated input for a new property record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image: Option<MediaId>,
    #[serde(default)]
    pub description: Option<RichText>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Property input that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProperty {
    pub title: String,
    pub slug: String,
    pub location: String,
    pub price: f64,
    pub image: MediaId,
    pub description: RichText,
    pub is_published: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field '{0}' is required")]
    MissingField(&'static str),
    #[error("field '{0}' must be a finite number")]
    InvalidNumber(&'static str),
}

impl PropertyDraft {
    /// Runs the slug hook, applies defaults and checks required fields.
    pub fn validate(self) -> Result<ValidatedProperty, SchemaError> {
        let slug = derive_slug(self.title.as_deref(), self.slug.as_deref());

        let title = required_text("title", self.title)?;
        // A title made only of punctuation derives to an empty slug.
        let slug = required_text("slug", slug)?;
        let location = required_text("location", self.location)?;
        let price = self.price.ok_or(SchemaError::MissingField("price"))?;
        if !price.is_finite() {
            return Err(SchemaError::InvalidNumber("price"));
        }
        let image = self.image.ok_or(SchemaError::MissingField("image"))?;
        let description = self
            .description
            .ok_or(SchemaError::MissingField("description"))?;

        Ok(ValidatedProperty {
            title,
            slug,
            location,
            price,
            image,
            description,
            is_published: self
                .is_published
                .unwrap_or_else(|| checkbox_default("isPublished")),
        })
    }
}

/// Default declared for a checkbox field in [`PROPERTY_FIELDS`].
fn checkbox_default(name: &str) -> bool {
    PROPERTY_FIELDS
        .iter()
        .find_map(|field| match field.kind {
            FieldKind::Checkbox { default } if field.name == name => Some(default),
            _ => None,
        })
        .unwrap_or(false)
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, SchemaError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SchemaError::MissingField(field)),
    }
}
