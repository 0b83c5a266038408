use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::types::PropertyId;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 12;
/// Depth at which media references are resolved into full records.
pub const DEFAULT_DEPTH: u8 = 1;

/// Queryable fields of the `property` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Slug,
    Location,
    IsPublished,
}

impl Field {
    /// Returns the field name used in the store's where-documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Slug => "slug",
            Self::Location => "location",
            Self::IsPublished => "isPublished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Comparison applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Exact match.
    Equals(FieldValue),
    /// Case-insensitive substring match on text fields.
    Contains(String),
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Equals(value) => map.serialize_entry("equals", value)?,
            Self::Contains(text) => map.serialize_entry("contains", text)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub matcher: Matcher,
}

impl Condition {
    pub fn equals(field: Field, value: impl Into<FieldValue>) -> Self {
        Self {
            field,
            matcher: Matcher::Equals(value.into()),
        }
    }

    pub fn contains(field: Field, text: impl Into<String>) -> Self {
        Self {
            field,
            matcher: Matcher::Contains(text.into()),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field.as_str(), &self.matcher)?;
        map.end()
    }
}

/// Filter document understood by the store.
///
/// Every entry of `all` must hold. When `any` is present at least one of its
/// conditions must hold as well. `any` is never an empty list: an empty `or`
/// group would match nothing, so the constructors drop it instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    all: Vec<Condition>,
    any: Option<Vec<Condition>>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching published records only.
    pub fn published() -> Self {
        Self::new().and(Condition::equals(Field::IsPublished, true))
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.all.push(condition);
        self
    }

    /// Attaches an `or` group. An empty group leaves the filter unchanged.
    pub fn or(mut self, conditions: Vec<Condition>) -> Self {
        if !conditions.is_empty() {
            self.any = Some(conditions);
        }
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.all
    }

    pub fn any_of(&self) -> Option<&[Condition]> {
        self.any.as_deref()
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.all.len() + usize::from(self.any.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for condition in &self.all {
            map.serialize_entry(condition.field.as_str(), &condition.matcher)?;
        }
        if let Some(any) = &self.any {
            map.serialize_entry("or", any)?;
        }
        map.end()
    }
}

/// Arguments of a store `find` call against the `property` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindRequest {
    #[serde(rename = "where")]
    pub filter: Where,
    pub page: i64,
    pub limit: i64,
    pub depth: u8,
}

/// Raw query-string parameters of the listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingParams {
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListingParams {
    /// Collects the known keys from decoded query pairs.
    ///
    /// The first occurrence of a repeated key wins and unknown keys are
    /// ignored, so no query string is ever rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "search" => &mut params.search,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Listing request derived from user input.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    /// Search term carried into rendered links; empty when no search is active.
    pub search: String,
    pub request: FindRequest,
}

impl ListingQuery {
    /// Builds the published-only listing request.
    ///
    /// `page` and `limit` fall back to their defaults when they carry no
    /// leading integer. Zero or negative values are forwarded untouched.
    pub fn from_params(params: &ListingParams) -> Self {
        let search = params.search.clone().unwrap_or_default();
        let page = parse_leading_int(params.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = parse_leading_int(params.limit.as_deref()).unwrap_or(DEFAULT_LIMIT);

        let mut filter = Where::published();
        if !search.is_empty() {
            filter = filter.or(vec![
                Condition::contains(Field::Title, search.as_str()),
                Condition::contains(Field::Location, search.as_str()),
            ]);
        }

        Self {
            search,
            request: FindRequest {
                filter,
                page,
                limit,
                depth: DEFAULT_DEPTH,
            },
        }
    }
}

/// Lookup of a single published record by slug.
pub fn detail_request(slug: &str) -> FindRequest {
    FindRequest {
        filter: Where::published().and(Condition::equals(Field::Slug, slug)),
        page: DEFAULT_PAGE,
        limit: 1,
        depth: DEFAULT_DEPTH,
    }
}

/// Lookup of a single published record by id.
pub fn published_by_id(id: PropertyId) -> FindRequest {
    FindRequest {
        filter: Where::published().and(Condition::equals(Field::Id, id)),
        page: DEFAULT_PAGE,
        limit: 1,
        depth: DEFAULT_DEPTH,
    }
}

/// Parses the integer prefix of `raw`, ignoring leading whitespace and any
/// trailing characters. Returns `None` when no digits lead the value.
fn parse_leading_int(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim_start();
    let (sign_len, digits) = match trimmed.as_bytes().first() {
        Some(b'+') | Some(b'-') => (1, &trimmed[1..]),
        _ => (0, trimmed),
    };
    let digit_len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if digit_len == 0 {
        return None;
    }
    trimmed[..sign_len + digit_len].parse().ok()
}
