//! API client for communicating with the loyalty REST API.
//!
//! Every request goes through `ApiClient::dispatch`, the single point where
//! responses are observed. A 401 on a request that did not opt out ends the
//! session through the hook registered with `on_unauthorized`; the error is
//! still returned to the caller. The client never retries.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{Credentials, Role};
use crate::config::Config;
use crate::models::{Registration, TokenGrant};

use super::transport::{ApiRequest, ApiResponse, Credential, ReqwestTransport, Transport};
use super::ApiError;

/// Callback run when the server rejects the session token.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Base URLs for the two API hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    api_base: String,
    identity_base: String,
}

impl Endpoints {
    pub fn new(api_base: &str, identity_base: &str) -> Self {
        Self {
            api_base: Self::with_trailing_slash(api_base),
            identity_base: Self::with_trailing_slash(identity_base),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, &config.identity_base_url)
    }

    fn with_trailing_slash(base: &str) -> String {
        let base = base.trim();
        if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        }
    }

    pub(crate) fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path.trim_start_matches('/'))
    }

    pub(crate) fn identity(&self, path: &str) -> String {
        format!("{}{}", self.identity_base, path.trim_start_matches('/'))
    }
}

/// API client for the loyalty program.
/// Clone is cheap - the transport and hook are shared behind `Arc`s.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    token: Option<String>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
            token: None,
            on_unauthorized: None,
        }
    }

    /// Build a client over the production HTTP transport.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), Endpoints::from_config(config)))
    }

    /// Register the callback run when a non-probe request gets a 401.
    pub fn on_unauthorized(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    /// Create a new ApiClient with the given token, sharing transport and hook.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn token(&self) -> Result<&str, ApiError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::Authentication("Not authenticated - no user token found".into())
            })
    }

    pub(crate) fn bearer(&self) -> Result<Credential, ApiError> {
        Ok(Credential::Bearer(self.token()?.to_string()))
    }

    pub(crate) fn user_token(&self) -> Result<Credential, ApiError> {
        Ok(Credential::UserToken(self.token()?.to_string()))
    }

    /// Send one request and classify the response.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let probe = request.skip_unauthorized_hook;
        let method = request.method.clone();
        let url = request.url.clone();
        debug!(%method, url = %url, probe, "Sending request");

        let response = self.transport.execute(request).await?;
        if response.status.is_success() {
            debug!(%method, url = %url, status = %response.status, "Request succeeded");
            return Ok(response);
        }

        let error = ApiError::from_status(response.status, &response.body, probe);
        warn!(%method, url = %url, status = %response.status, error = %error, "Request failed");

        if error.is_session_expired() {
            if let Some(ref hook) = self.on_unauthorized {
                warn!("Session rejected by server, logging out");
                hook();
            }
        }
        Err(error)
    }

    /// Dispatch and decode a JSON response body.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let url = request.url.clone();
        let response = self.dispatch(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    /// Dispatch a request whose response body is not needed.
    pub(crate) async fn send(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.dispatch(request).await.map(|_| ())
    }

    // ===== Identity =====

    /// Exchange credentials for a token.
    ///
    /// A 401 here means bad credentials, not a dead session, so the request
    /// never triggers the unauthorized hook.
    pub async fn issue_token(
        &self,
        credentials: &Credentials,
        role: Role,
    ) -> Result<TokenGrant, ApiError> {
        let body = serde_json::json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
            "isEmployee": credentials.is_employee,
            "orgId": credentials.org_id,
            "role": role,
        });
        let request = ApiRequest::new(Method::POST, self.endpoints.identity("user/v2/login"))
            .json(body)
            .skip_unauthorized_hook();
        self.fetch_json(request).await
    }

    /// Create a new customer account, optionally crediting a referrer.
    pub async fn register(
        &self,
        registration: &Registration,
        org_id: i64,
        redirect_url: &str,
    ) -> Result<(), ApiError> {
        registration.validate()?;
        if org_id <= 0 {
            return Err(ApiError::Validation("An organization id is required".into()));
        }

        let body = serde_json::to_value(registration.body(org_id, redirect_url))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let mut request =
            ApiRequest::new(Method::POST, self.endpoints.identity("user/v2/register")).json(body);
        let referrer = registration
            .referrer
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if let Some(referrer) = referrer {
            request = request.query("referrer", referrer);
        }
        self.send(request).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::api::transport::RequestBody;

    fn credentials() -> Credentials {
        Credentials {
            email: "a@b.com".into(),
            password: "pw".into(),
            is_employee: false,
            org_id: 2,
        }
    }

    #[test]
    fn test_endpoint_joining() {
        let endpoints = Endpoints::new("https://api.example/v1", "https://id.example/");
        assert_eq!(endpoints.api("loyalty/tier/list"), "https://api.example/v1/loyalty/tier/list");
        assert_eq!(endpoints.api("/loyalty/tier/list"), "https://api.example/v1/loyalty/tier/list");
        assert_eq!(endpoints.identity("user/v2/register"), "https://id.example/user/v2/register");
    }

    #[tokio::test]
    async fn test_unauthorized_triggers_hook_once() {
        let (client, stub, logouts) = stub_client();
        stub.respond(401, "");

        let request = ApiRequest::new(Method::GET, client.endpoints().api("loyalty/tier/list"));
        let result = client.dispatch(request).await;

        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(hook_calls(&logouts), 1);
    }

    #[tokio::test]
    async fn test_probe_unauthorized_skips_hook() {
        let (client, stub, logouts) = stub_client();
        stub.respond(401, r#"{"message": "nope"}"#);

        let request = ApiRequest::new(Method::GET, client.endpoints().api("loyalty/tier/list"))
            .skip_unauthorized_hook();
        let result = client.dispatch(request).await;

        assert!(matches!(result, Err(ApiError::Authorization(_))));
        assert_eq!(hook_calls(&logouts), 0);
    }

    #[tokio::test]
    async fn test_other_failures_skip_hook() {
        let (client, stub, logouts) = stub_client();
        stub.respond(403, "").respond(500, "boom").respond(200, "{}");

        for _ in 0..2 {
            let request = ApiRequest::new(Method::GET, client.endpoints().api("x"));
            assert!(client.dispatch(request).await.is_err());
        }
        let request = ApiRequest::new(Method::GET, client.endpoints().api("x"));
        assert!(client.dispatch(request).await.is_ok());
        assert_eq!(hook_calls(&logouts), 0);
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_client_without_hook_still_rejects() {
        let stub = Arc::new(crate::api::transport::stub::StubTransport::new());
        stub.respond(401, "");
        let client = ApiClient::new(stub.clone(), Endpoints::new(API_BASE, IDENTITY_BASE));

        let request = ApiRequest::new(Method::GET, client.endpoints().api("x"));
        assert!(matches!(client.dispatch(request).await, Err(ApiError::SessionExpired)));
    }

    #[tokio::test]
    async fn test_issue_token_request_shape() {
        let (client, stub, logouts) = stub_client();
        stub.respond(401, "");

        let result = client.issue_token(&credentials(), Role::Admin).await;
        assert!(matches!(result, Err(ApiError::Authorization(_))));
        // Bad credentials never end an existing session
        assert_eq!(hook_calls(&logouts), 0);

        let request = stub.last_request();
        assert_eq!(request.url, "https://identity.test/user/v2/login");
        assert_eq!(request.credential, Credential::None);
        assert!(request.skip_unauthorized_hook);
        match request.body {
            RequestBody::Json(body) => {
                assert_eq!(body["email"], "a@b.com");
                assert_eq!(body["role"], "admin");
                assert_eq!(body["orgId"], 2);
                assert_eq!(body["isEmployee"], false);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let (client, stub, _) = stub_client();
        stub.respond(200, "<html>");
        let result = client.issue_token(&credentials(), Role::User).await;
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_register_with_referrer() {
        let (client, stub, _) = stub_client();
        stub.respond(200, "");

        let registration = Registration {
            name: "Mona".into(),
            email: "mona@example.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            referrer: Some("77".into()),
        };
        client
            .register(&registration, 2, "https://example.com/activate")
            .await
            .unwrap();

        let request = stub.last_request();
        assert_eq!(request.url, "https://identity.test/user/v2/register");
        assert_eq!(request.query, vec![("referrer".to_string(), "77".to_string())]);
        match request.body {
            RequestBody::Json(body) => {
                assert_eq!(body["confirmation_flag"], true);
                assert_eq!(body["org_id"], 2);
                assert_eq!(body["redirect_url"], "https://example.com/activate");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_validates_before_sending() {
        let (client, stub, _) = stub_client();
        let registration = Registration {
            name: "Mona".into(),
            email: "mona@example.com".into(),
            password: "secret".into(),
            confirm_password: "different".into(),
            referrer: None,
        };
        assert!(matches!(
            client.register(&registration, 2, "x").await,
            Err(ApiError::Validation(_))
        ));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_sending() {
        let stub = Arc::new(crate::api::transport::stub::StubTransport::new());
        let client = ApiClient::new(stub.clone(), Endpoints::new(API_BASE, IDENTITY_BASE));
        assert!(!client.has_token());
        assert!(matches!(client.bearer(), Err(ApiError::Authentication(_))));
        assert!(stub.requests().is_empty());
    }
}
