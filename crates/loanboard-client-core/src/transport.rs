use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::normalize_base_url;
use crate::credential::Credential;
use crate::error::ApiError;

/// Decoded response body. Empty bodies decode to `Value::Null`.
pub type Payload = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, Attachment)>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.files.push((name.into(), attachment));
        self
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, attachment) in self.files {
            let mut part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
            if let Some(content_type) = attachment.content_type {
                part = part.mime_str(&content_type).map_err(|error| {
                    ApiError::transport(format!("invalid content type '{content_type}': {error}"))
                })?;
            }
            form = form.part(name, part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: RequestBody::Json(serialize_body(payload)?),
        })
    }

    pub fn patch_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            method: HttpMethod::Patch,
            path: path.into(),
            body: RequestBody::Json(serialize_body(payload)?),
        })
    }

    pub fn post_multipart(path: impl Into<String>, form: MultipartForm) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: RequestBody::Multipart(form),
        }
    }
}

fn serialize_body<T: Serialize + ?Sized>(payload: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(payload)
        .map_err(|error| ApiError::decode(0, format!("failed to serialize request body: {error}")))
}

/// Outbound seam to the remote service.
///
/// Implementations attach `Authorization: Bearer <token>` when a credential
/// is supplied and omit it otherwise, and report every failure as an
/// [`ApiError`] regardless of the layer it happened in.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn call(
        &self,
        request: ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, crate::config::ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn call(
        &self,
        request: ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError> {
        let url = self
            .endpoint(&request.path)
            .ok_or_else(|| ApiError::transport("request path must not be empty"))?;
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            request_id = %request_id,
            authenticated = credential.is_some(),
            "sending request"
        );

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(url.as_str()),
            HttpMethod::Post => self.http.post(url.as_str()),
            HttpMethod::Patch => self.http.patch(url.as_str()),
        }
        .header("x-request-id", request_id.as_str());

        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.expose());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(form) => builder.multipart(form.into_form()?),
        };

        let response = builder.send().await.map_err(|error| {
            warn!(path = %request.path, request_id = %request_id, %error, "request failed");
            ApiError::transport(format!("Network error: {error}"))
        })?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|error| {
            ApiError::transport(format!("failed to read response: {error}"))
        })?;

        if !(200..=299).contains(&status) {
            let error = ApiError::from_http_response(status, &bytes);
            warn!(
                path = %request.path,
                request_id = %request_id,
                status,
                message = %error.message,
                "request rejected"
            );
            return Err(error);
        }

        decode_body(status, &bytes)
    }
}

fn decode_body(status: u16, bytes: &[u8]) -> Result<Payload, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|error| ApiError::decode(status, format!("failed to decode response: {error}")))
}
