//! Terminal rendition of the employee records front end.
//!
//! `ApiClient` talks to the HTTP API; `filter` and `view` hold the list
//! search and the text rendering used by the `emp` binary.

pub mod filter;
pub mod view;

use std::fmt;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::models::employee::{CreateEmployeeRequest, Employee, EmployeeUpdate, MessageResponse, UpdateResponse};
use crate::models::image::UploadResponse;

#[derive(Debug)]
pub enum ClientError {
    InvalidUrl(String),
    File { path: String, message: String },
    Http(reqwest::Error),
    Status { status: u16, message: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidUrl(msg) => write!(f, "Invalid server URL: {}", msg),
            ClientError::File { path, message } => write!(f, "Could not read {}: {}", path, message),
            ClientError::Http(err) => write!(f, "Request failed: {}", err),
            ClientError::Status { status, message } => write!(f, "Server answered {}: {}", status, message),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}

/// A fetched profile image.
#[derive(Debug, Clone)]
pub struct Image {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|err| ClientError::InvalidUrl(format!("{}: {}", base_url, err)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(ApiClient {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// `base` with `segments` appended, each one percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn image_url(&self, image_id: &str) -> Url {
        self.endpoint(&["image", image_id])
    }

    pub async fn list(&self) -> Result<Vec<Employee>, ClientError> {
        let resp = self.http.get(self.base.clone()).send().await?;
        json(resp).await
    }

    pub async fn detail(&self, employee_id: &str) -> Result<Employee, ClientError> {
        let resp = self.http.get(self.endpoint(&["viewdetail", employee_id])).send().await?;
        json(resp).await
    }

    pub async fn image(&self, image_id: &str) -> Result<Image, ClientError> {
        let resp = check(self.http.get(self.image_url(image_id)).send().await?).await?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        // errors out if the body is shorter than Content-Length
        let data = resp.bytes().await?;
        Ok(Image { content_type, data })
    }

    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<String, ClientError> {
        let mime = infer::get(&data).map(|kind| kind.mime_type());
        let mut part = Part::bytes(data).file_name(filename.to_string());
        if let Some(mime) = mime {
            part = part.mime_str(mime)?;
        }
        let form = Form::new().part("profileImage", part);

        let resp = self.http.post(self.endpoint(&["upload"])).multipart(form).send().await?;
        let uploaded: UploadResponse = json(resp).await?;
        Ok(uploaded.image_id)
    }

    pub async fn create(&self, employee: &CreateEmployeeRequest) -> Result<Employee, ClientError> {
        let resp = self.http.post(self.endpoint(&["create"])).json(employee).send().await?;
        json(resp).await
    }

    pub async fn update(&self, employee_id: &str, update: &EmployeeUpdate) -> Result<Employee, ClientError> {
        let resp = self
            .http
            .put(self.endpoint(&["update", employee_id]))
            .json(update)
            .send()
            .await?;
        let updated: UpdateResponse = json(resp).await?;
        Ok(updated.data)
    }

    pub async fn delete(&self, employee_id: &str) -> Result<String, ClientError> {
        let resp = self.http.delete(self.endpoint(&["delete", employee_id])).send().await?;
        let deleted: MessageResponse = json(resp).await?;
        Ok(deleted.message)
    }
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body: Option<Value> = resp.json().await.ok();
    Err(ClientError::Status {
        status,
        message: error_message(body.as_ref()),
    })
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    Ok(check(resp).await?.json().await?)
}

fn error_message(body: Option<&Value>) -> String {
    body.and_then(|body| body.get("error").or_else(|| body.get("message")))
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string()
}
