//! Interceptor pipeline and session lifecycle against a scripted transport.
//!
//! # Design
//! `ScriptedTransport` records every request that reaches the network seam
//! and answers from a queue, so each test can assert exactly which headers
//! went out and how many round trips happened.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use medrec_core::types::{
    BlogPost, ListQuery, Notification, NotificationKind, RegisterRequest, Role, UpdateProfile, User,
};
use medrec_core::{
    ApiClient, ApiError, AuthService, ClientConfig, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, MedicalService, RequestOptions, SessionEvent, SessionStore, UnauthorizedPolicy,
};
use serde_json::Value;

const USER_JSON: &str = r#"{"id":"u1","email":"a@b.com","name":"Ann","role":"patient"}"#;

enum Reply {
    Respond(u16, String),
    NetworkDown,
}

#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn reply(&self, status: u16, body: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Respond(status, body.to_string()));
        self
    }

    fn fail(&self) -> &Self {
        self.replies.lock().unwrap().push_back(Reply::NetworkDown);
        self
    }

    fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn last(&self) -> HttpRequest {
        self.seen().pop().expect("no request was sent")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Respond(status, body)) => Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body,
            }),
            Some(Reply::NetworkDown) => Err(ApiError::Network("connection reset".to_string())),
            None => panic!("transport received an unscripted request"),
        }
    }
}

fn setup(policy: UnauthorizedPolicy) -> (Arc<ScriptedTransport>, ApiClient) {
    let transport = Arc::new(ScriptedTransport::default());
    let config = ClientConfig::new("http://backend.test/api").with_unauthorized_policy(policy);
    let client = ApiClient::with_transport(
        config,
        transport.clone(),
        Arc::new(SessionStore::in_memory()),
    )
    .unwrap();
    (transport, client)
}

fn user() -> User {
    serde_json::from_str(USER_JSON).unwrap()
}

// ---------------------------------------------------------------------------
// Outbound hook
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_present_attaches_exact_bearer_header() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok-abc.def", &user());
    transport.reply(200, "[]");

    let _: Vec<Value> = client
        .get("/medical/patients", &RequestOptions::default())
        .await
        .unwrap()
        .into_data();

    let sent = transport.last();
    assert_eq!(sent.header("Authorization"), Some("Bearer tok-abc.def"));
    assert_eq!(sent.header("Content-Type"), Some("application/json"));
    assert_eq!(sent.path, "http://backend.test/api/medical/patients");
}

#[tokio::test]
async fn no_token_sends_no_authorization_header() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(202, r#"{"message":"sent"}"#);

    AuthService::new(client).reset_password("a@b.com").await.unwrap();

    let sent = transport.last();
    assert_eq!(sent.header("Authorization"), None);
    assert_eq!(sent.method, HttpMethod::Post);
    let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({"email": "a@b.com"}));
}

// ---------------------------------------------------------------------------
// Login / session scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_establishes_session() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(
        200,
        &format!(r#"{{"token":"tok1","user":{USER_JSON},"expiresIn":3600}}"#),
    );
    let auth = AuthService::new(client.clone());

    let resp = auth.login("a@b.com", "x").await.unwrap();

    assert_eq!(resp.expires_in, 3600);
    assert_eq!(client.session().token().as_deref(), Some("tok1"));
    assert!(auth.is_authenticated());
    assert_eq!(auth.cached_user().map(|u| u.id).as_deref(), Some("u1"));

    let sent = transport.last();
    assert_eq!(sent.path, "http://backend.test/api/auth/login");
    let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({"email": "a@b.com", "password": "x"}));
}

#[tokio::test]
async fn failed_login_leaves_session_empty() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(401, r#"{"error":"invalid credentials"}"#);

    let err = AuthService::new(client.clone())
        .login("a@b.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn register_establishes_session() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(
        201,
        &format!(r#"{{"token":"tok-reg","user":{USER_JSON},"expiresIn":600}}"#),
    );

    AuthService::new(client.clone())
        .register(&RegisterRequest {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
            name: "Ann".to_string(),
            role: Role::Patient,
            phone: None,
        })
        .await
        .unwrap();

    assert_eq!(client.session().token().as_deref(), Some("tok-reg"));
    assert_eq!(client.session().user(), Some(user()));
    let body: Value = serde_json::from_str(transport.last().body.as_deref().unwrap()).unwrap();
    assert_eq!(body["role"], "patient");
}

#[tokio::test]
async fn unauthorized_on_non_auth_call_clears_session_and_signals() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    let mut events = client.subscribe();
    transport.reply(401, r#"{"error":"expired"}"#);

    let err = MedicalService::new(client.clone())
        .get_patient("p1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().token(), None);
    assert_eq!(client.session().user(), None);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            redirect_to: "/login".to_string()
        }
    );
    // hard logout: no refresh attempt
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn sign_in_location_comes_from_config() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = ApiClient::with_transport(
        ClientConfig::new("http://backend.test").with_sign_in_path("/auth/sign-in"),
        transport.clone(),
        Arc::new(SessionStore::in_memory()),
    )
    .unwrap();
    let mut events = client.subscribe();
    transport.reply(401, "");

    let _ = client
        .get::<Value>("/auth/me", &RequestOptions::default())
        .await;

    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            redirect_to: "/auth/sign-in".to_string()
        }
    );
}

#[tokio::test]
async fn update_profile_refreshes_cached_user_only() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport.reply(
        200,
        r#"{"id":"u1","email":"a@b.com","name":"New","role":"patient"}"#,
    );

    let update = UpdateProfile {
        name: Some("New".to_string()),
        ..UpdateProfile::default()
    };
    AuthService::new(client.clone())
        .update_profile("u1", &update)
        .await
        .unwrap();

    assert_eq!(client.session().user().unwrap().name, "New");
    assert_eq!(client.session().token().as_deref(), Some("tok1"));
    let sent = transport.last();
    assert_eq!(sent.method, HttpMethod::Put);
    assert_eq!(sent.path, "http://backend.test/api/auth/profile/u1");
    assert_eq!(sent.body.as_deref(), Some(r#"{"name":"New"}"#));
}

#[tokio::test]
async fn logout_clears_session_even_when_backend_is_unreachable() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport.fail();

    AuthService::new(client.clone()).logout().await;

    assert_eq!(client.session().token(), None);
    assert_eq!(client.session().user(), None);
    assert_eq!(transport.last().path, "http://backend.test/api/auth/logout");
}

#[tokio::test]
async fn logout_clears_session_when_backend_errors() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport.reply(500, "boom");

    AuthService::new(client.clone()).logout().await;

    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn explicit_refresh_replaces_token_and_keeps_user() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("old", &user());
    transport.reply(200, r#"{"token":"new"}"#);

    let token = AuthService::new(client.clone()).refresh_token().await.unwrap();

    assert_eq!(token, "new");
    assert_eq!(client.session().token().as_deref(), Some("new"));
    assert_eq!(client.session().user(), Some(user()));
    assert_eq!(transport.last().header("authorization"), Some("Bearer old"));
}

// ---------------------------------------------------------------------------
// Error propagation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn other_failures_propagate_and_keep_session() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    let mut events = client.subscribe();
    let medical = MedicalService::new(client.clone());

    transport.reply(404, r#"{"error":"patient not found"}"#);
    let err = medical.get_patient("nope").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { ref body } if body.contains("patient")));

    transport.reply(403, "forbidden");
    let err = medical.get_doctor("d1").await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 403, .. }));

    transport.reply(503, "maintenance");
    let err = medical.list_arv_protocols().await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 503, ref body } if body == "maintenance"));

    transport.fail();
    let err = medical.get_medication("m1").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));

    assert!(client.session().is_authenticated());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn undecodable_success_body_is_deserialization_error() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(200, r#"{"unexpected":true}"#);

    let err = MedicalService::new(client)
        .get_patient("p1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Deserialization(_)));
}

#[tokio::test]
async fn concurrent_unauthorized_responses_are_idempotent() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    let mut events = client.subscribe();
    transport.reply(401, "").reply(401, "");

    let medical = MedicalService::new(client.clone());
    let (a, b) = tokio::join!(medical.get_patient("p1"), medical.get_doctor("d1"));

    assert!(matches!(a, Err(ApiError::Unauthorized { .. })));
    assert!(matches!(b, Err(ApiError::Unauthorized { .. })));
    assert!(!client.session().is_authenticated());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Refresh-then-retry policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_then_retry_resends_once_with_new_token() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    let mut events = client.subscribe();
    transport
        .reply(401, "")
        .reply(200, r#"{"token":"fresh"}"#)
        .reply(200, USER_JSON);

    let me = AuthService::new(client.clone()).current_user().await.unwrap();

    assert_eq!(me, user());
    let seen = transport.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].header("authorization"), Some("Bearer stale"));
    assert_eq!(seen[1].path, "http://backend.test/api/auth/refresh");
    assert_eq!(seen[1].header("authorization"), Some("Bearer stale"));
    assert_eq!(seen[2].path, "http://backend.test/api/auth/me");
    assert_eq!(seen[2].header("authorization"), Some("Bearer fresh"));

    assert_eq!(client.session().token().as_deref(), Some("fresh"));
    assert_eq!(client.session().user(), Some(user()));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn refresh_then_retry_keeps_request_body_on_resend() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    transport
        .reply(401, "")
        .reply(200, r#"{"token":"fresh"}"#)
        .reply(200, r#"{"id":"m1","patientId":"p1","name":"DTG","dosage":"50mg","frequency":"daily","startDate":"2026-01-10","status":"stopped"}"#);

    MedicalService::new(client)
        .stop_medication("m1", Some("side effects"))
        .await
        .unwrap();

    let seen = transport.seen();
    assert_eq!(seen[0].body, seen[2].body);
    assert_eq!(seen[2].method, HttpMethod::Patch);
}

#[tokio::test]
async fn failed_refresh_falls_back_to_hard_logout() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    let mut events = client.subscribe();
    transport.reply(401, "").reply(401, "refresh rejected");

    let err = MedicalService::new(client.clone())
        .list_patients(&ListQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(transport.seen().len(), 2);
    assert!(!client.session().is_authenticated());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err(), "exactly one invalidation");
}

#[tokio::test]
async fn refresh_network_failure_falls_back_to_hard_logout() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    transport.reply(401, "").fail();

    let err = MedicalService::new(client.clone())
        .get_patient("p1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn retry_that_is_still_unauthorized_clears_session() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    let mut events = client.subscribe();
    transport
        .reply(401, "")
        .reply(200, r#"{"token":"fresh"}"#)
        .reply(401, "still no");

    let err = MedicalService::new(client.clone())
        .get_patient("p1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { ref body } if body == "still no"));
    assert_eq!(transport.seen().len(), 3);
    assert!(!client.session().is_authenticated());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn refresh_policy_skips_requests_without_token() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    transport.reply(401, "");

    let err = client
        .get::<Value>("/auth/me", &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test]
async fn refresh_endpoint_itself_is_never_retried() {
    let (transport, client) = setup(UnauthorizedPolicy::RefreshThenRetry);
    client.session().set_session("stale", &user());
    transport.reply(401, "");

    let err = AuthService::new(client.clone())
        .refresh_token()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(transport.seen().len(), 1);
    assert!(!client.session().is_authenticated());
}

/// Backend double that rotates tokens on refresh, like the real one: the
/// refreshed token stops working, even for another refresh. Yields before
/// answering so concurrent calls interleave.
struct RotatingBackend {
    state: Mutex<Rotation>,
}

struct Rotation {
    live: Option<String>,
    refreshable: Vec<String>,
    refreshes: usize,
    issued: usize,
}

impl RotatingBackend {
    fn with_expired(token: &str) -> Self {
        Self {
            state: Mutex::new(Rotation {
                live: None,
                refreshable: vec![token.to_string()],
                refreshes: 0,
                issued: 0,
            }),
        }
    }

    fn refreshes(&self) -> usize {
        self.state.lock().unwrap().refreshes
    }
}

#[async_trait]
impl HttpTransport for RotatingBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tokio::task::yield_now().await;
        let bearer = request
            .header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        let mut state = self.state.lock().unwrap();
        let (status, body) = if request.path.ends_with("/auth/refresh") {
            match bearer.and_then(|t| {
                let pos = state.refreshable.iter().position(|r| *r == t)?;
                Some(state.refreshable.remove(pos))
            }) {
                Some(_) => {
                    state.refreshes += 1;
                    state.issued += 1;
                    let fresh = format!("fresh-{}", state.issued);
                    state.live = Some(fresh.clone());
                    (200, format!(r#"{{"token":"{fresh}"}}"#))
                }
                None => (401, r#"{"error":"token cannot be refreshed"}"#.to_string()),
            }
        } else if bearer.is_some() && bearer == state.live {
            (200, "[]".to_string())
        } else {
            (401, r#"{"error":"invalid or expired token"}"#.to_string())
        };
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}

#[tokio::test]
async fn concurrent_unauthorized_responses_share_one_refresh() {
    let backend = Arc::new(RotatingBackend::with_expired("stale"));
    let client = ApiClient::with_transport(
        ClientConfig::new("http://backend.test/api")
            .with_unauthorized_policy(UnauthorizedPolicy::RefreshThenRetry),
        backend.clone(),
        Arc::new(SessionStore::in_memory()),
    )
    .unwrap();
    client.session().set_session("stale", &user());
    let mut events = client.subscribe();

    let medical = MedicalService::new(client.clone());
    let query = ListQuery::default();
    let (patients, doctors) = tokio::join!(
        medical.list_patients(&query),
        medical.list_doctors(&query)
    );

    assert!(patients.is_ok(), "{patients:?}");
    assert!(doctors.is_ok(), "{doctors:?}");
    assert_eq!(backend.refreshes(), 1);
    assert_eq!(client.session().token().as_deref(), Some("fresh-1"));
    assert_eq!(client.session().user(), Some(user()));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn cloned_clients_share_the_refresh() {
    let backend = Arc::new(RotatingBackend::with_expired("stale"));
    let client = ApiClient::with_transport(
        ClientConfig::new("http://backend.test/api")
            .with_unauthorized_policy(UnauthorizedPolicy::RefreshThenRetry),
        backend.clone(),
        Arc::new(SessionStore::in_memory()),
    )
    .unwrap();
    client.session().set_session("stale", &user());

    let auth = AuthService::new(client.clone());
    let medical = MedicalService::new(client.clone());
    let options = RequestOptions::default();
    let (protocols, me) = tokio::join!(
        medical.list_arv_protocols(),
        client.get::<Value>("/auth/me", &options)
    );

    assert!(protocols.is_ok(), "{protocols:?}");
    assert!(me.is_ok(), "{me:?}");
    assert_eq!(backend.refreshes(), 1);
    assert!(auth.is_authenticated());
}

// ---------------------------------------------------------------------------
// Service path mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_patients_sends_query_parameters() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(200, r#"[{"id":"p1","name":"Nguyen Van A"}]"#);

    let patients = MedicalService::new(client)
        .list_patients(&ListQuery {
            page: Some(2),
            limit: Some(10),
            search: Some("van a".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(patients.len(), 1);
    assert_eq!(
        transport.last().path,
        "http://backend.test/api/medical/patients?page=2&limit=10&search=van+a"
    );
}

#[tokio::test]
async fn cancel_appointment_is_a_patch_with_reason() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(
        200,
        r#"{"id":"a1","patientId":"p1","doctorId":"d1","scheduledAt":"2026-05-04T09:30:00Z","durationMinutes":30,"type":"consultation","status":"cancelled"}"#,
    );

    MedicalService::new(client)
        .cancel_appointment("a1", Some("travel"))
        .await
        .unwrap();

    let sent = transport.last();
    assert_eq!(sent.method, HttpMethod::Patch);
    assert_eq!(sent.path, "http://backend.test/api/medical/appointments/a1/cancel");
    assert_eq!(sent.body.as_deref(), Some(r#"{"reason":"travel"}"#));
}

#[tokio::test]
async fn delete_accepts_empty_no_content_response() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    transport.reply(204, "").reply(200, r#"{"deleted":true}"#);
    let medical = MedicalService::new(client);

    medical.delete_arv_protocol("arv1").await.unwrap();
    medical.delete_appointment("a1").await.unwrap();

    let seen = transport.seen();
    assert_eq!(seen[0].method, HttpMethod::Delete);
    assert_eq!(seen[0].path, "http://backend.test/api/medical/arv-protocols/arv1");
    assert_eq!(seen[1].path, "http://backend.test/api/medical/appointments/a1");
}

#[tokio::test]
async fn change_password_sends_camel_case_body() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport.reply(204, "");

    AuthService::new(client)
        .change_password("old", "new")
        .await
        .unwrap();

    let sent = transport.last();
    assert_eq!(sent.path, "http://backend.test/api/auth/change-password");
    let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({"oldPassword": "old", "newPassword": "new"}));
}

#[tokio::test]
async fn ids_are_encoded_as_a_single_path_segment() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport.reply(204, "").reply(200, "[]");
    let medical = MedicalService::new(client.clone());

    medical
        .delete_medication("m1/../../arv-protocols/arv1")
        .await
        .unwrap();
    medical.list_test_results("p1?page=2#x").await.unwrap();

    let seen = transport.seen();
    assert_eq!(
        seen[0].path,
        "http://backend.test/api/medical/medications/m1%2F..%2F..%2Farv-protocols%2Farv1"
    );
    assert_eq!(
        seen[1].path,
        "http://backend.test/api/medical/patients/p1%3Fpage%3D2%23x/test-results"
    );
}

#[tokio::test]
async fn dot_segment_ids_never_reach_the_transport() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());

    let err = MedicalService::new(client.clone())
        .delete_arv_protocol("..")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(ref id) if id == ".."));

    let err = AuthService::new(client.clone())
        .update_profile("", &UpdateProfile::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(_)));

    assert!(transport.seen().is_empty());
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn content_shapes_decode_through_generic_verbs() {
    let (transport, client) = setup(UnauthorizedPolicy::HardLogout);
    client.session().set_session("tok1", &user());
    transport
        .reply(
            200,
            r#"[{"id":"n1","userId":"u1","type":"medication_reminder","title":"Dose due","message":"Take DTG","createdAt":"2026-05-04T08:00:00Z"}]"#,
        )
        .reply(
            200,
            r#"{"id":"b1","title":"Living well","content":"...","authorId":"d1","tags":["arv"]}"#,
        );

    let notifications: Vec<Notification> = client
        .get("/notifications", &RequestOptions::new().query("unread", true))
        .await
        .unwrap()
        .into_data();
    let post: BlogPost = client
        .get("/blog/posts/b1", &RequestOptions::default())
        .await
        .unwrap()
        .into_data();

    assert_eq!(notifications[0].kind, NotificationKind::MedicationReminder);
    assert!(!notifications[0].read);
    assert_eq!(post.tags, vec!["arv".to_string()]);
    assert_eq!(
        transport.seen()[0].path,
        "http://backend.test/api/notifications?unread=true"
    );
    assert_eq!(transport.seen()[1].header("authorization"), Some("Bearer tok1"));
}
