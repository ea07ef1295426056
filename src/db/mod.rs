//! Record and blob store seams.
//!
//! Handlers only see `dyn RecordStore` and `dyn BlobStore`. The Postgres
//! backends are used in production; the in-memory ones back
//! `DATABASE_URL=memory://` and the tests.

pub mod blobs;
pub mod memory;
pub mod records;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use log::info;
use sqlx::PgPool;

use crate::models::employee::{Employee, EmployeeUpdate, NewEmployee};
use crate::models::image::ImageMeta;

pub use blobs::PgBlobStore;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use records::PgRecordStore;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    InvalidId(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::InvalidId(id) => write!(f, "Invalid id: {}", id),
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Image bytes as they come out of the blob store, one chunk per item.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// All records in insertion order.
    async fn find_all(&self) -> Result<Vec<Employee>, StoreError>;

    /// The oldest record carrying `employee_id`, if any.
    async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError>;

    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError>;

    /// Applies the allow-listed fields of `update` and returns the new state,
    /// or `None` when no record matches.
    async fn update_by_employee_id(
        &self,
        employee_id: &str,
        update: &EmployeeUpdate,
    ) -> Result<Option<Employee>, StoreError>;

    /// Removes the record `find_by_employee_id` would return and hands it back.
    async fn delete_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError>;
}

/// Write side of an upload. The id only exists once `finish` has flushed
/// every chunk.
#[async_trait]
pub trait BlobSink: Send {
    async fn write(&mut self, data: Bytes) -> Result<(), StoreError>;

    async fn finish(self: Box<Self>) -> Result<String, StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn open_upload(&self, filename: &str, content_type: &str) -> Result<Box<dyn BlobSink>, StoreError>;

    /// Fails with `NotFound` or `InvalidId` before any byte is produced.
    async fn open_download(&self, id: &str) -> Result<(ImageMeta, ByteStream), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// The pair of stores injected into the handlers.
#[derive(Clone)]
pub struct Stores {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Stores {
            records: Arc::new(MemoryRecordStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, StoreError> {
    Ok(PgPool::connect(database_url).await?)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id UUID PRIMARY KEY,
        employee_id TEXT NOT NULL,
        name TEXT NOT NULL,
        phone TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        date_of_joining DATE NOT NULL,
        department TEXT NOT NULL,
        employment_status TEXT NOT NULL,
        marital TEXT,
        gender TEXT NOT NULL,
        address_city TEXT,
        address_district TEXT,
        address_state TEXT,
        profile_image TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    // employee_id is derived and may collide, so it is indexed but not unique
    "CREATE INDEX IF NOT EXISTS employees_employee_id_idx ON employees (employee_id)",
    r#"
    CREATE TABLE IF NOT EXISTS image_files (
        id UUID PRIMARY KEY,
        filename TEXT NOT NULL,
        content_type TEXT NOT NULL,
        length BIGINT NOT NULL,
        chunk_size INTEGER NOT NULL,
        upload_date TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS image_chunks (
        files_id UUID NOT NULL,
        n INTEGER NOT NULL,
        data BYTEA NOT NULL,
        PRIMARY KEY (files_id, n)
    )
    "#,
];

pub async fn init_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Opens the stores named by `database_url`. `memory://` keeps everything
/// in-process; anything else is treated as a Postgres connection string.
pub async fn connect(database_url: &str) -> Result<Stores, StoreError> {
    if database_url.starts_with("memory://") {
        info!("Using in-memory record and image stores");
        return Ok(Stores::in_memory());
    }

    let pool = create_pool(database_url).await?;
    init_schema(&pool).await?;
    info!("Connected to Postgres, schema ready");

    Ok(Stores {
        records: Arc::new(PgRecordStore::new(pool.clone())),
        blobs: Arc::new(PgBlobStore::new(pool)),
    })
}

/// Postgres pools for the `#[ignore]`d backend tests. Run them with
/// `DATABASE_URL=postgres://... cargo test -- --ignored`.
#[cfg(test)]
pub(crate) mod scratch {
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use uuid::Uuid;

    /// A pool whose connections only see a fresh schema, or `None` when
    /// `DATABASE_URL` is not a Postgres URL.
    pub(crate) async fn pool() -> Option<(PgPool, String)> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| url.starts_with("postgres"))?;
        let schema = format!("scratch_{}", Uuid::new_v4().simple());
        let search_path = format!("SET search_path TO {}", schema);

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .after_connect(move |conn, _meta| {
                let sql = search_path.clone();
                Box::pin(async move {
                    sqlx::query(&sql).execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("connect to DATABASE_URL");
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&pool)
            .await
            .expect("create scratch schema");
        super::init_schema(&pool).await.expect("create tables");
        Some((pool, schema))
    }

    pub(crate) async fn drop_schema(pool: &PgPool, schema: &str) {
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", schema))
            .execute(pool)
            .await
            .expect("drop scratch schema");
    }
}
