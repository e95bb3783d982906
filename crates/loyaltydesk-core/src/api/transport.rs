//! The transport seam under `ApiClient`.
//!
//! A `Transport` executes exactly one request and hands back the raw status
//! and body. It never interprets the status; classification and the
//! unauthorized hook live in `ApiClient::dispatch`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, StatusCode};

use super::ApiError;

/// Header carrying the token for endpoints that do not accept bearer auth.
pub const USER_TOKEN_HEADER: &str = "User-Token";

#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    None,
    Bearer(String),
    UserToken(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub credential: Credential,
    pub accept: Option<&'static str>,
    pub body: RequestBody,
    /// Suppress the client's unauthorized hook for this request.
    pub skip_unauthorized_hook: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            credential: Credential::None,
            accept: None,
            body: RequestBody::Empty,
            skip_unauthorized_hook: false,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Mark the request as a probe: a 401 is reported to the caller as a
    /// permission error and does not end the session.
    pub fn skip_unauthorized_hook(mut self) -> Self {
        self.skip_unauthorized_hook = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Production transport backed by a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form, ApiError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self.client.request(request.method, &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.credential {
            Credential::None => builder,
            Credential::Bearer(token) => builder.bearer_auth(token),
            Credential::UserToken(token) => builder.header(USER_TOKEN_HEADER, token),
        };

        if let Some(accept) = request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse { status, body })
    }
}
