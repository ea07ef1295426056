//! In-process stores with the same behaviour as the Postgres backends.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures_util::stream;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::blobs::parse_id;
use super::{BlobSink, BlobStore, ByteStream, RecordStore, StoreError};
use crate::models::employee::{Employee, EmployeeUpdate, NewEmployee};
use crate::models::image::{ImageMeta, DEFAULT_CHUNK_SIZE};

/// Records kept in insertion order.
#[derive(Default)]
pub struct MemoryRecordStore {
    employees: RwLock<Vec<Employee>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_all(&self) -> Result<Vec<Employee>, StoreError> {
        Ok(self.employees.read().await.clone())
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let employees = self.employees.read().await;
        Ok(employees.iter().find(|e| e.employee_id == employee_id).cloned())
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let now = Utc::now();
        let record = Employee {
            id: Uuid::new_v4(),
            employee_id: employee.employee_id,
            name: employee.name,
            phone: employee.phone,
            date_of_birth: employee.date_of_birth,
            date_of_joining: employee.date_of_joining,
            department: employee.department,
            employment_status: employee.employment_status,
            marital: employee.marital,
            gender: employee.gender,
            address: employee.address,
            profile_image: employee.profile_image,
            created_at: now,
            updated_at: now,
        };
        self.employees.write().await.push(record.clone());
        Ok(record)
    }

    async fn update_by_employee_id(
        &self,
        employee_id: &str,
        update: &EmployeeUpdate,
    ) -> Result<Option<Employee>, StoreError> {
        let mut employees = self.employees.write().await;
        Ok(employees.iter_mut().find(|e| e.employee_id == employee_id).map(|employee| {
            update.apply(employee);
            employee.updated_at = Utc::now();
            employee.clone()
        }))
    }

    async fn delete_by_employee_id(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let mut employees = self.employees.write().await;
        let position = employees.iter().position(|e| e.employee_id == employee_id);
        Ok(position.map(|index| employees.remove(index)))
    }
}

struct StoredImage {
    meta: ImageMeta,
    chunks: Vec<Bytes>,
}

type ImageMap = Arc<RwLock<HashMap<Uuid, StoredImage>>>;

/// Chunked image storage held in a map.
#[derive(Clone)]
pub struct MemoryBlobStore {
    images: ImageMap,
    chunk_size: usize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        MemoryBlobStore {
            images: Arc::new(RwLock::new(HashMap::new())),
            chunk_size: chunk_size.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct MemoryBlobSink {
    images: ImageMap,
    id: Uuid,
    filename: String,
    content_type: String,
    chunk_size: usize,
    buffer: BytesMut,
    chunks: Vec<Bytes>,
    length: i64,
}

#[async_trait]
impl BlobSink for MemoryBlobSink {
    async fn write(&mut self, data: Bytes) -> Result<(), StoreError> {
        self.length += data.len() as i64;
        self.buffer.extend_from_slice(&data);
        while self.buffer.len() >= self.chunk_size {
            self.chunks.push(self.buffer.split_to(self.chunk_size).freeze());
        }
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<String, StoreError> {
        let MemoryBlobSink {
            images,
            id,
            filename,
            content_type,
            chunk_size,
            mut buffer,
            mut chunks,
            length,
        } = *self;

        if !buffer.is_empty() {
            chunks.push(buffer.split().freeze());
        }
        let meta = ImageMeta {
            id: id.to_string(),
            filename,
            content_type,
            length,
            chunk_size: chunk_size as i32,
            upload_date: Utc::now(),
        };
        images.write().await.insert(id, StoredImage { meta, chunks });
        Ok(id.to_string())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn open_upload(&self, filename: &str, content_type: &str) -> Result<Box<dyn BlobSink>, StoreError> {
        Ok(Box::new(MemoryBlobSink {
            images: self.images.clone(),
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            chunk_size: self.chunk_size,
            buffer: BytesMut::new(),
            chunks: Vec::new(),
            length: 0,
        }))
    }

    async fn open_download(&self, id: &str) -> Result<(ImageMeta, ByteStream), StoreError> {
        let file_id = parse_id(id)?;
        let images = self.images.read().await;
        let image = images
            .get(&file_id)
            .ok_or_else(|| StoreError::NotFound("Image not found".to_string()))?;

        let chunks = image.chunks.clone();
        Ok((image.meta.clone(), Box::pin(stream::iter(chunks.into_iter().map(Ok::<Bytes, StoreError>)))))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let file_id = parse_id(id)?;
        self.images
            .write()
            .await
            .remove(&file_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("File not found for id {}", id)))
    }
}
