use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::BytesMut;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{error, info};

use crate::db::BlobStore;
use crate::errors::AppError;
use crate::models::image::UploadResponse;

const IMAGE_FIELD: &str = "profileImage";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: BytesMut,
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart payload: {}", err))
}

/// Buffers the `profileImage` file part in memory and ignores every other
/// part. A plain text field under that name is not a file.
async fn read_image_field(mut payload: Multipart) -> Result<Option<UploadedFile>, AppError> {
    let mut upload = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let disposition = field.content_disposition();
        let filename = disposition.get_filename().map(str::to_string);
        let is_image = disposition.get_name() == Some(IMAGE_FIELD) && filename.is_some();
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if is_image {
                data.extend_from_slice(&chunk);
            }
        }

        if is_image && upload.is_none() {
            upload = Some(UploadedFile {
                filename: filename
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "upload".to_string()),
                content_type,
                data,
            });
        }
    }

    Ok(upload)
}

/// The declared type unless it is missing or generic, then whatever the
/// bytes look like.
fn resolve_content_type(declared: Option<String>, data: &[u8]) -> String {
    match declared {
        Some(content_type) if content_type != FALLBACK_CONTENT_TYPE => content_type,
        _ => infer::get(data)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
    }
}

pub async fn upload_file(blobs: web::Data<dyn BlobStore>, payload: Multipart) -> Result<HttpResponse, AppError> {
    let file = read_image_field(payload)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let content_type = resolve_content_type(file.content_type, &file.data);
    let size = file.data.len();

    let upload_error = |err| AppError::storage("Failed to upload image", err);
    let mut sink = blobs
        .open_upload(&file.filename, &content_type)
        .await
        .map_err(upload_error)?;
    sink.write(file.data.freeze()).await.map_err(upload_error)?;
    let image_id = sink.finish().await.map_err(upload_error)?;
    info!("Stored image {} ({}, {} bytes) as {}", file.filename, content_type, size, image_id);

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        image_id,
    }))
}

/// Streams the stored chunks straight into the response.
///
/// A failure on the first chunk is still reported as a 500. Once headers are
/// out, a failing chunk aborts the response; `Content-Length` lets the
/// client see the truncation.
pub async fn get_image(
    blobs: web::Data<dyn BlobStore>,
    image_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let (meta, mut chunks) = blobs
        .open_download(&image_id)
        .await
        .map_err(|err| AppError::storage("Error retrieving image", err))?;

    let first = match chunks.next().await {
        Some(Ok(bytes)) => Some(bytes),
        Some(Err(err)) => return Err(AppError::storage("Error retrieving image", err)),
        None => None,
    };

    let id = meta.id.clone();
    let body = stream::iter(first.map(Ok)).chain(chunks).map(move |item| {
        item.map_err(|err| {
            error!("Image {} failed mid-stream: {}", id, err);
            AppError::storage("Error retrieving image", err)
        })
    });

    Ok(HttpResponse::Ok()
        .content_type(meta.content_type)
        .no_chunking(meta.length.max(0) as u64)
        .streaming(body))
}
