use std::time::Duration;

use reqwest::{header::AUTHORIZATION, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::{extract_detail, ApiError},
    models::{Course, Lecturer, Student, Subject},
    session::SessionStore,
};

use super::resource::{Resource, ResourceClient};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Shared HTTP client for the school records API.
///
/// Attaches `Authorization: Token <token>` whenever the session holds one and
/// clears the session on any 401. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: SessionStore,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &AppConfig, session: SessionStore) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout(), session)
    }

    /// Session backing this client.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Absolute URL for an API path such as `students/3/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a token and store it in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = LoginRequest { email, password };
        let response: LoginResponse = self.send_json(Method::POST, "login/", &body).await?;
        if let Err(err) = self.session.set_token(response.token) {
            warn!(?err, "Failed to persist session token");
        }
        info!(email, "Logged in");
        Ok(())
    }

    /// Drop the stored token.
    pub fn logout(&self) {
        if let Err(err) = self.session.clear() {
            warn!(?err, "Failed to clear persisted session");
        }
    }

    /// Typed client for any collection.
    pub fn resource<R: Resource>(&self) -> ResourceClient<R> {
        ResourceClient::new(self.clone())
    }

    /// Typed client for `/students/`.
    pub fn students(&self) -> ResourceClient<Student> {
        ResourceClient::new(self.clone())
    }

    /// Typed client for `/courses/`.
    pub fn courses(&self) -> ResourceClient<Course> {
        ResourceClient::new(self.clone())
    }

    /// Typed client for `/lecturers/`.
    pub fn lecturers(&self) -> ResourceClient<Lecturer> {
        ResourceClient::new(self.clone())
    }

    /// Typed client for `/subjects/`.
    pub fn subjects(&self) -> ResourceClient<Subject> {
        ResourceClient::new(self.clone())
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        decode(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(method, path).json(body)).await?;
        decode(response).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "API request");
        let builder = self.http.request(method, url);
        match self.session.get_token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {token}")),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = read_error_body(response).await;
        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected credentials; clearing session");
            if let Err(err) = self.session.clear() {
                warn!(?err, "Failed to clear persisted session");
            }
            return Err(ApiError::Unauthorized {
                detail: extract_detail(&body),
            });
        }

        warn!(%status, "API request rejected");
        Err(ApiError::Rejected { status, body })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Error payload as JSON. Bodies that are not JSON (proxy or server error
/// pages) carry no usable detail and come back as `Value::Null`.
async fn read_error_body(response: Response) -> Value {
    match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&bytes);
            warn!(body = %text.trim(), "Error response body is not JSON");
            Value::Null
        }),
        Ok(_) => Value::Null,
        Err(err) => {
            warn!(?err, "Failed to read error body");
            Value::Null
        }
    }
}
