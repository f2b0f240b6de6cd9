//! Authenticated HTTP client for the medical-records API.
//!
//! # Design
//! `ApiClient` is the single dispatch point. Each call is split into
//! `build_request` (path joining, default headers, JSON body), a round trip
//! through the interceptors and the transport, and `parse_response` (JSON
//! decoding). The client holds no per-request state: the credential is read
//! from the shared `SessionStore` on every dispatch.
//!
//! Nothing is retried, except the single refresh-then-retry that
//! `UnauthorizedPolicy::RefreshThenRetry` opts into. Refreshes are
//! single-flight across clones of a client: a request whose token was
//! already replaced by a concurrent refresh retries with the stored token
//! instead of refreshing again.

use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument};

use crate::config::{ClientConfig, UnauthorizedPolicy};
use crate::error::ApiError;
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, ACCEPT, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE,
};
use crate::interceptor::{Interceptors, RequestAuth, SessionEvent};
use crate::session::SessionStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{ListQuery, RefreshResponse};

pub(crate) const REFRESH_PATH: &str = "/auth/refresh";

/// Per-call extras: query parameters and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

impl From<&ListQuery> for RequestOptions {
    fn from(query: &ListQuery) -> Self {
        Self {
            query: query.to_pairs(),
            headers: Vec::new(),
        }
    }
}

/// A decoded 2xx response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    interceptors: Interceptors,
    refresh_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client dispatching over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Self::with_transport(config, transport, session)
    }

    /// Client dispatching over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the configuration is invalid.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let interceptors = Interceptors::new(session.clone(), &config.sign_in_path);
        Ok(Self {
            config,
            transport,
            session,
            interceptors,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Receive `SessionEvent::Invalidated` whenever a 401 clears the session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.interceptors.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Get, path, None, options).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Post, path, Some(body), &RequestOptions::default())
            .await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Post, path, None, &RequestOptions::default())
            .await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Put, path, Some(body), &RequestOptions::default())
            .await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Patch, path, Some(body), &RequestOptions::default())
            .await
    }

    /// PATCH without a body, for bare state transitions.
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Patch, path, None, &RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(HttpMethod::Delete, path, None, &RequestOptions::default())
            .await
    }

    /// Dispatch a request with an already-encoded JSON body.
    ///
    /// # Errors
    ///
    /// Transport failures pass through unchanged; non-2xx statuses become the
    /// matching `ApiError` variant (401 only after the session was cleared);
    /// an undecodable 2xx body is `ApiError::Deserialization`.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<ApiResponse<T>, ApiError> {
        let request = self.build_request(method, path, options, body)?;
        let response = self.dispatch(request, path).await?;
        parse_response(response)
    }

    /// Join `path` to the base address and apply default headers, `options`
    /// and `body`. No credential is attached here; that is the outbound
    /// hook's job at dispatch time.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if query parameters are given and the
    /// resulting URL does not parse.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = join_url(&self.config.base_url, path);
        if !options.query.is_empty() {
            let mut parsed =
                Url::parse(&url).map_err(|e| ApiError::Config(format!("invalid url {url:?}: {e}")))?;
            parsed
                .query_pairs_mut()
                .extend_pairs(options.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            url = parsed.to_string();
        }

        let mut request = HttpRequest::new(method, url);
        request.set_header(CONTENT_TYPE, APPLICATION_JSON);
        request.set_header(ACCEPT, APPLICATION_JSON);
        for (name, value) in &options.headers {
            request.set_header(name, value.as_str());
        }
        request.body = body;
        Ok(request)
    }

    async fn dispatch(&self, request: HttpRequest, path: &str) -> Result<HttpResponse, ApiError> {
        let (sent_token, mut response) = self.round_trip(request.clone()).await?;

        if response.status == 401
            && self.config.unauthorized_policy == UnauthorizedPolicy::RefreshThenRetry
            && path != REFRESH_PATH
        {
            if let Some(stale) = sent_token {
                if let Some(retried) = self.refresh_and_retry(request, &stale).await? {
                    response = retried;
                }
            }
        }

        self.interceptors.inbound(response)
    }

    /// Outbound hook, then the transport. Returns the bearer token the
    /// request actually carried. Transport failures propagate as is.
    async fn round_trip(&self, mut request: HttpRequest) -> Result<(Option<String>, HttpResponse), ApiError> {
        let auth = self.interceptors.outbound(&mut request);
        let sent_token = match auth {
            RequestAuth::TokenAttached => request
                .header(AUTHORIZATION)
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string),
            RequestAuth::NoToken => None,
        };
        debug!(method = %request.method, url = %request.path, ?auth, "dispatching request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "response received");
        Ok((sent_token, response))
    }

    /// Make sure the session holds a token newer than `stale`, then re-send
    /// `original` once.
    ///
    /// `Ok(None)` means no newer token could be obtained and the original 401
    /// stands.
    async fn refresh_and_retry(
        &self,
        original: HttpRequest,
        stale: &str,
    ) -> Result<Option<HttpResponse>, ApiError> {
        {
            let _guard = self.refresh_lock.lock().await;
            match self.session.token() {
                None => {
                    debug!("session cleared while waiting to refresh; keeping original 401");
                    return Ok(None);
                }
                Some(current) if current != stale => {
                    debug!("token already refreshed by a concurrent request");
                }
                Some(_) => {
                    let Some(token) = self.refresh().await else {
                        debug!("token refresh failed; keeping original 401");
                        return Ok(None);
                    };
                    info!("token refreshed after 401; retrying once");
                    self.session.set_token(&token);
                }
            }
        }

        let (_, response) = self.round_trip(original).await?;
        Ok(Some(response))
    }

    /// `POST /auth/refresh` with the current token, bypassing the inbound
    /// hook. Any failure is `None`.
    async fn refresh(&self) -> Option<String> {
        let request = self
            .build_request(HttpMethod::Post, REFRESH_PATH, &RequestOptions::default(), None)
            .ok()?;
        match self.round_trip(request).await {
            Ok((_, response)) if response.is_success() => serde_json::from_str::<RefreshResponse>(&response.body)
                .ok()
                .map(|refreshed| refreshed.token),
            Ok(_) | Err(_) => None,
        }
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Decode a 2xx body. An empty body decodes as JSON `null`, so `()`,
/// `Option<_>` and `IgnoredAny` accept it and anything else reports a
/// deserialization error.
fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<ApiResponse<T>, ApiError> {
    let data = if response.body.trim().is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_str(&response.body)
    }
    .map_err(|e| {
        ApiError::Deserialization(format!("status {}: {e}", response.status))
    })?;

    Ok(ApiResponse {
        status: response.status,
        headers: response.headers,
        data,
    })
}

#[cfg(test)]
mod tests {
    use serde::de::IgnoredAny;

    use super::*;
    use crate::types::{Role, User};

    fn client() -> ApiClient {
        ApiClient::new(
            ClientConfig::new("http://localhost:3000/api"),
            Arc::new(SessionStore::in_memory()),
        )
        .unwrap()
    }

    fn ok(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_request_joins_path_and_sets_json_headers() {
        let req = client()
            .build_request(HttpMethod::Get, "/auth/me", &RequestOptions::default(), None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/api/auth/me");
        assert_eq!(req.header(CONTENT_TYPE), Some("application/json"));
        assert_eq!(req.header(ACCEPT), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_never_attaches_credentials() {
        let c = client();
        c.session().set_session(
            "tok",
            &User {
                id: "u1".to_string(),
                email: "a@b.com".to_string(),
                name: "Ann".to_string(),
                role: Role::Patient,
                phone: None,
                avatar_url: None,
                created_at: None,
            },
        );
        let req = c
            .build_request(HttpMethod::Get, "/auth/me", &RequestOptions::default(), None)
            .unwrap();
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn build_request_tolerates_missing_leading_slash() {
        let req = client()
            .build_request(HttpMethod::Delete, "medical/medications/m1", &RequestOptions::default(), None)
            .unwrap();
        assert_eq!(req.path, "http://localhost:3000/api/medical/medications/m1");
    }

    #[test]
    fn build_request_encodes_query_parameters() {
        let options = RequestOptions::new().query("search", "Lê Văn").query("page", 2);
        let req = client()
            .build_request(HttpMethod::Get, "/medical/patients", &options, None)
            .unwrap();
        assert_eq!(
            req.path,
            "http://localhost:3000/api/medical/patients?search=L%C3%AA+V%C4%83n&page=2"
        );
    }

    #[test]
    fn build_request_applies_extra_headers_over_defaults() {
        let options = RequestOptions::new()
            .header("Accept", "text/csv")
            .header("x-request-id", "r1");
        let req = client()
            .build_request(HttpMethod::Get, "/medical/patients", &options, None)
            .unwrap();
        assert_eq!(req.header(ACCEPT), Some("text/csv"));
        assert_eq!(req.header("X-Request-Id"), Some("r1"));
    }

    #[test]
    fn encode_body_produces_json() {
        let body = encode_body(&serde_json::json!({"email": "a@b.com"})).unwrap();
        assert_eq!(body, r#"{"email":"a@b.com"}"#);
    }

    #[test]
    fn parse_response_decodes_json() {
        let resp: ApiResponse<RefreshResponse> = parse_response(ok(200, r#"{"token":"t2"}"#)).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.into_data().token, "t2");
    }

    #[test]
    fn parse_response_empty_body_is_null() {
        let resp: ApiResponse<()> = parse_response(ok(204, "")).unwrap();
        assert_eq!(resp.status, 204);
        let resp: ApiResponse<Option<RefreshResponse>> = parse_response(ok(200, "  ")).unwrap();
        assert_eq!(resp.data, None);
        let resp: ApiResponse<IgnoredAny> = parse_response(ok(200, r#"{"message":"ok"}"#)).unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn parse_response_bad_json_is_deserialization_error() {
        let err = parse_response::<RefreshResponse>(ok(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
        let err = parse_response::<RefreshResponse>(ok(204, "")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = ApiClient::new(
            ClientConfig::new("localhost:3000"),
            Arc::new(SessionStore::in_memory()),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn list_query_converts_to_options() {
        let options = RequestOptions::from(&ListQuery {
            page: Some(1),
            limit: Some(20),
            search: None,
        });
        assert_eq!(options.query.len(), 2);
        assert!(options.headers.is_empty());
    }
}
