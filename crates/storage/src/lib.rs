use std::{path::Path, str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Executor, QueryBuilder, Row, Sqlite, SqlitePool,
};
use thiserror::Error;

use listings_core::{
    query::{Condition, Field, FieldValue, FindRequest, Matcher, Where},
    schema::{PropertyDraft, SchemaError, ValidatedProperty},
    types::{ImageRef, Media, MediaId, PaginatedDocs, Property, PropertyId},
    RichText,
};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url).map_err(StorageError::Connect)?;
        Self::connect_with(options).await
    }

    /// Opens (creating when missing) the SQLite file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self, StorageError> {
        // Pragmas go through the connect options so every pooled connection gets them.
        let options = options
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to query and create property records.
    pub fn properties(&self) -> PropertyRepository {
        PropertyRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for media records.
    pub fn media(&self) -> MediaRepository {
        MediaRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const PROPERTY_SELECT: &str = "SELECT p.id, p.title, p.slug, p.location, p.price, p.image_id, \
     p.description_json, p.is_published, p.created_at, p.updated_at, \
     m.id AS media_id, m.url AS media_url, m.alt AS media_alt \
     FROM properties AS p \
     LEFT JOIN media AS m ON m.id = p.image_id";

/// Repository backing the `property` collection.
#[derive(Clone)]
pub struct PropertyRepository {
    pool: SqlitePool,
}

impl PropertyRepository {
    /// Runs a filtered, paginated query over property records.
    ///
    /// Results are ordered newest first. A `page` below 1 is read as page 1 and
    /// a `limit` of zero or less returns every match on a single page.
    ///
    /// `contains` matchers ignore case for ASCII letters only: `ÉTÉ` does not
    /// match `été`.
    pub async fn find(
        &self,
        request: &FindRequest,
    ) -> Result<PaginatedDocs<Property>, PropertyError> {
        let page = request.page.max(1);
        let paginate = request.limit > 0;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM properties AS p");
        push_where(&mut count, &request.filter);
        let total_docs: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(PROPERTY_SELECT);
        push_where(&mut select, &request.filter);
        select.push(" ORDER BY p.created_at DESC, p.id DESC");
        if paginate {
            let offset = (page - 1).saturating_mul(request.limit);
            select.push(" LIMIT ");
            select.push_bind(request.limit);
            select.push(" OFFSET ");
            select.push_bind(offset);
        }

        let rows: Vec<PropertyRow> = select
            .build_query_as::<PropertyRow>()
            .fetch_all(&self.pool)
            .await?;
        let docs = rows
            .into_iter()
            .map(|row| row.into_domain(request.depth))
            .collect::<Result<Vec<_>, _>>()?;

        let limit = if paginate { request.limit as u64 } else { 0 };
        Ok(PaginatedDocs::new(
            docs,
            total_docs.max(0) as u64,
            page as u64,
            limit,
        ))
    }

    /// Loads a record by id regardless of its publication state.
    pub async fn find_by_id(
        &self,
        id: PropertyId,
        depth: u8,
    ) -> Result<Option<Property>, PropertyError> {
        let request = FindRequest {
            filter: Where::new().and(Condition::equals(Field::Id, id)),
            page: 1,
            limit: 1,
            depth,
        };
        Ok(self.find(&request).await?.docs.into_iter().next())
    }

    /// Validates the draft against the collection schema and inserts it.
    pub async fn create(
        &self,
        draft: PropertyDraft,
        now: DateTime<Utc>,
    ) -> Result<Property, PropertyError> {
        let record = draft.validate()?;
        let id = insert_property(&self.pool, &record, now).await?;
        self.find_by_id(id, 1)
            .await?
            .ok_or(PropertyError::NotFound(id))
    }

    /// Inserts a media record and the property referencing it in one transaction.
    ///
    /// The draft's `image` is replaced by the new media id. When validation or
    /// either insert fails, nothing is written.
    pub async fn create_with_media(
        &self,
        media: NewMedia<'_>,
        mut draft: PropertyDraft,
        now: DateTime<Utc>,
    ) -> Result<Property, PropertyError> {
        check_media(&media)?;

        let mut tx = self.pool.begin().await?;
        let media_id = insert_media(&mut *tx, &media).await?;
        draft.image = Some(media_id);
        let record = draft.validate()?;
        let id = insert_property(&mut *tx, &record, now).await?;
        tx.commit().await?;

        self.find_by_id(id, 1)
            .await?
            .ok_or(PropertyError::NotFound(id))
    }
}

async fn insert_property<'e, E>(
    executor: E,
    record: &ValidatedProperty,
    now: DateTime<Utc>,
) -> Result<PropertyId, PropertyError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let description_json = serde_json::to_string(&record.description)?;
    let timestamp = to_rfc3339(now);

    let row = sqlx::query(
        "INSERT INTO properties \
         (title, slug, location, price, image_id, description_json, is_published, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&record.title)
    .bind(&record.slug)
    .bind(&record.location)
    .bind(record.price)
    .bind(record.image)
    .bind(&description_json)
    .bind(record.is_published)
    .bind(&timestamp)
    .bind(&timestamp)
    .fetch_one(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|code| code.into_owned());
            match code.as_deref() {
                Some("2067") => PropertyError::DuplicateSlug(record.slug.clone()),
                Some("787") => PropertyError::MissingMedia(record.image),
                _ => PropertyError::Database(sqlx::Error::Database(db_err)),
            }
        }
        other => PropertyError::Database(other),
    })?;

    Ok(row.get("id"))
}

/// Errors raised by the property repository.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("invalid property: {0}")]
    Invalid(#[from] SchemaError),
    #[error("a property with slug '{0}' already exists")]
    DuplicateSlug(String),
    #[error("media {0} does not exist")]
    MissingMedia(MediaId),
    #[error("property {0} not found")]
    NotFound(PropertyId),
    #[error("invalid media: {0}")]
    Media(#[from] MediaError),
    #[error("failed to encode or decode description json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Raw row shape of the property select, joined with its media record.
#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    id: i64,
    title: String,
    slug: String,
    location: String,
    price: f64,
    image_id: i64,
    description_json: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    media_id: Option<i64>,
    media_url: Option<String>,
    media_alt: Option<String>,
}

impl PropertyRow {
    fn into_domain(self, depth: u8) -> Result<Property, PropertyError> {
        let description: RichText = serde_json::from_str(&self.description_json)?;
        let image = match (self.media_id, self.media_url) {
            (Some(id), Some(url)) if depth > 0 => ImageRef::Expanded(Media {
                id,
                url,
                alt: self.media_alt,
            }),
            _ => ImageRef::Reference(self.image_id),
        };

        Ok(Property {
            id: self.id,
            title: self.title,
            slug: self.slug,
            location: self.location,
            price: self.price,
            image,
            description,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Where) {
    let mut first = true;
    for condition in filter.conditions() {
        builder.push(if first { " WHERE " } else { " AND " });
        first = false;
        push_condition(builder, condition);
    }

    if let Some(any) = filter.any_of() {
        builder.push(if first { " WHERE (" } else { " AND (" });
        for (index, condition) in any.iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            push_condition(builder, condition);
        }
        builder.push(")");
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Sqlite>, condition: &Condition) {
    let column = column_name(condition.field);
    match &condition.matcher {
        Matcher::Equals(value) => {
            builder.push(column);
            builder.push(" = ");
            match value {
                FieldValue::Integer(value) => builder.push_bind(*value),
                FieldValue::Text(value) => builder.push_bind(value.clone()),
                FieldValue::Bool(value) => builder.push_bind(*value),
            };
        }
        Matcher::Contains(text) => {
            builder.push("instr(lower(");
            builder.push(column);
            builder.push("), lower(");
            builder.push_bind(text.clone());
            builder.push(")) > 0");
        }
    }
}

fn column_name(field: Field) -> &'static str {
    match field {
        Field::Id => "p.id",
        Field::Title => "p.title",
        Field::Slug => "p.slug",
        Field::Location => "p.location",
        Field::IsPublished => "p.is_published",
    }
}

/// Repository for uploaded media records.
#[derive(Clone)]
pub struct MediaRepository {
    pool: SqlitePool,
}

/// Data required to register a media record.
#[derive(Debug, Clone)]
pub struct NewMedia<'a> {
    pub url: &'a str,
    pub alt: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl MediaRepository {
    /// Inserts a media record and returns it with its assigned id.
    pub async fn create(&self, media: NewMedia<'_>) -> Result<Media, MediaError> {
        check_media(&media)?;
        let id = insert_media(&self.pool, &media).await?;

        Ok(Media {
            id,
            url: media.url.to_string(),
            alt: media.alt.map(str::to_string),
        })
    }
}

fn check_media(media: &NewMedia<'_>) -> Result<(), MediaError> {
    if media.url.trim().is_empty() {
        return Err(MediaError::MissingUrl);
    }
    Ok(())
}

async fn insert_media<'e, E>(executor: E, media: &NewMedia<'_>) -> Result<MediaId, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let timestamp = to_rfc3339(media.created_at);
    let row = sqlx::query(
        "INSERT INTO media (url, alt, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(media.url)
    .bind(media.alt)
    .bind(&timestamp)
    .bind(&timestamp)
    .fetch_one(executor)
    .await?;
    Ok(row.get("id"))
}

/// Errors raised by the media repository.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media url is required")]
    MissingUrl,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
