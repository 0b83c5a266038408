//! Domain layer for the property listing site.
//!
//! Holds the record types, the `property` collection schema, the rich-text
//! model and the builders that turn page requests into store queries. Nothing
//! in this crate performs I/O.

pub mod query;
pub mod richtext;
pub mod schema;
pub mod types;

pub use query::{
    detail_request, published_by_id, Condition, Field, FieldValue, FindRequest, ListingParams,
    ListingQuery, Matcher, Where,
};
pub use richtext::RichText;
pub use schema::{slugify, PropertyDraft, SchemaError, ValidatedProperty};
pub use types::{ImageRef, Media, MediaId, PaginatedDocs, Property, PropertyId};
