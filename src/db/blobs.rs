use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::stream;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{BlobSink, BlobStore, ByteStream, StoreError};
use crate::models::image::{ImageMeta, DEFAULT_CHUNK_SIZE};

#[derive(sqlx::FromRow, Debug)]
struct ImageRow {
    id: Uuid,
    filename: String,
    content_type: String,
    length: i64,
    chunk_size: i32,
    upload_date: DateTime<Utc>,
}

impl From<ImageRow> for ImageMeta {
    fn from(row: ImageRow) -> Self {
        ImageMeta {
            id: row.id.to_string(),
            filename: row.filename,
            content_type: row.content_type,
            length: row.length,
            chunk_size: row.chunk_size,
            upload_date: row.upload_date,
        }
    }
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Chunked image storage in `image_files` / `image_chunks`.
///
/// An upload runs in one transaction: chunks are inserted as the buffer
/// fills and the `image_files` row is written last, so a half-written image
/// is never visible. Downloads fetch one chunk per poll.
#[derive(Clone)]
pub struct PgBlobStore {
    pool: PgPool,
    chunk_size: usize,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        PgBlobStore {
            pool,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

struct PgBlobSink {
    tx: Transaction<'static, Postgres>,
    id: Uuid,
    filename: String,
    content_type: String,
    chunk_size: usize,
    buffer: BytesMut,
    next_chunk: i32,
    length: i64,
}

impl PgBlobSink {
    async fn insert_chunk(&mut self, data: Bytes) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO image_chunks (files_id, n, data) VALUES ($1, $2, $3)")
            .bind(self.id)
            .bind(self.next_chunk)
            .bind(data.as_ref())
            .execute(&mut *self.tx)
            .await?;
        self.next_chunk += 1;
        Ok(())
    }
}

#[async_trait]
impl BlobSink for PgBlobSink {
    async fn write(&mut self, data: Bytes) -> Result<(), StoreError> {
        self.length += data.len() as i64;
        self.buffer.extend_from_slice(&data);
        while self.buffer.len() >= self.chunk_size {
            let chunk = self.buffer.split_to(self.chunk_size).freeze();
            self.insert_chunk(chunk).await?;
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<String, StoreError> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split().freeze();
            self.insert_chunk(rest).await?;
        }

        let PgBlobSink {
            mut tx,
            id,
            filename,
            content_type,
            chunk_size,
            length,
            ..
        } = *self;

        sqlx::query(
            r#"
            INSERT INTO image_files (id, filename, content_type, length, chunk_size, upload_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&filename)
        .bind(&content_type)
        .bind(length)
        .bind(chunk_size as i32)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id.to_string())
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn open_upload(&self, filename: &str, content_type: &str) -> Result<Box<dyn BlobSink>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBlobSink {
            tx,
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            chunk_size: self.chunk_size,
            buffer: BytesMut::with_capacity(self.chunk_size),
            next_chunk: 0,
            length: 0,
        }))
    }

    async fn open_download(&self, id: &str) -> Result<(ImageMeta, ByteStream), StoreError> {
        let file_id = parse_id(id)?;
        let row = sqlx::query_as::<_, ImageRow>("SELECT * FROM image_files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("Image not found".to_string()))?;

        let chunk_count = chunk_count(row.length, row.chunk_size);
        let pool = self.pool.clone();

        let chunks = stream::unfold(0, move |n| {
            let pool = pool.clone();
            async move {
                if n >= chunk_count {
                    return None;
                }
                let item = sqlx::query_scalar::<_, Vec<u8>>(
                    "SELECT data FROM image_chunks WHERE files_id = $1 AND n = $2",
                )
                .bind(file_id)
                .bind(n)
                .fetch_optional(&pool)
                .await
                .map_err(StoreError::from)
                .and_then(|data| {
                    data.map(Bytes::from).ok_or_else(|| {
                        StoreError::Database(format!("chunk {} of image {} is missing", n, file_id))
                    })
                });
                // stop after the first failure
                let next = if item.is_ok() { n + 1 } else { chunk_count };
                Some((item, next))
            }
        });

        Ok((row.into(), Box::pin(chunks)))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let file_id = parse_id(id)?;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM image_files WHERE id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(StoreError::NotFound(format!("File not found for id {}", id)));
        }

        sqlx::query("DELETE FROM image_chunks WHERE files_id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

pub(crate) fn chunk_count(length: i64, chunk_size: i32) -> i32 {
    if length <= 0 || chunk_size <= 0 {
        return 0;
    }
    ((length + chunk_size as i64 - 1) / chunk_size as i64) as i32
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;
    use crate::db::scratch;

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(chunk_count(0, 4), 0);
        assert_eq!(chunk_count(4, 4), 1);
        assert_eq!(chunk_count(5, 4), 2);
        assert_eq!(chunk_count(DEFAULT_CHUNK_SIZE as i64 * 3, DEFAULT_CHUNK_SIZE as i32), 3);
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(matches!(parse_id("not-an-id"), Err(StoreError::InvalidId(_))));
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn upload_is_chunked_and_streamed_back_in_order() {
        let Some((pool, schema)) = scratch::pool().await else { return };
        let store = PgBlobStore {
            pool: pool.clone(),
            chunk_size: 4,
        };

        let mut sink = store.open_upload("avatar.png", "image/png").await.unwrap();
        sink.write(Bytes::from_static(b"0123456")).await.unwrap();
        sink.write(Bytes::from_static(b"789")).await.unwrap();
        let id = sink.finish().await.unwrap();

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_chunks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 3);

        let (meta, stream) = store.open_download(&id).await.unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.length, 10);
        assert_eq!(meta.chunk_size, 4);
        assert_eq!(meta.content_type, "image/png");
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"0123456789".to_vec());

        scratch::drop_schema(&pool, &schema).await;
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn abandoned_upload_leaves_nothing_behind() {
        let Some((pool, schema)) = scratch::pool().await else { return };
        let store = PgBlobStore {
            pool: pool.clone(),
            chunk_size: 4,
        };

        let mut sink = store.open_upload("a.jpg", "image/jpeg").await.unwrap();
        sink.write(Bytes::from_static(b"partial upload")).await.unwrap();
        drop(sink);

        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_chunks")
            .fetch_one(&pool)
            .await
            .unwrap();
        let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_files")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((chunks, files), (0, 0));

        scratch::drop_schema(&pool, &schema).await;
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn delete_removes_file_and_chunks() {
        let Some((pool, schema)) = scratch::pool().await else { return };
        let store = PgBlobStore::new(pool.clone());

        let mut sink = store.open_upload("b.png", "image/png").await.unwrap();
        sink.write(Bytes::from_static(b"bytes")).await.unwrap();
        let id = sink.finish().await.unwrap();

        store.delete(&id).await.unwrap();
        assert!(matches!(store.open_download(&id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("not-an-id").await, Err(StoreError::InvalidId(_))));

        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_chunks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(chunks, 0);

        scratch::drop_schema(&pool, &schema).await;
    }
}
