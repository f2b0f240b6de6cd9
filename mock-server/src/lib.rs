//! In-memory stand-in for the medical-records backend.
//!
//! Implements the `/auth/*` and `/medical/*` REST contract closely enough for
//! client integration tests: bearer tokens are checked on every protected
//! route, and tests can revoke or expire tokens through `AppState` to provoke
//! 401s. Medical resources are stored as JSON documents and echoed back with a
//! server-assigned `id`; nothing beyond the shape is validated.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

pub const TOKEN_TTL_SECS: u64 = 3600;
pub const DEMO_EMAIL: &str = "doctor@clinic.test";
pub const DEMO_PASSWORD: &str = "secret";
pub const SEED_PATIENT_ID: &str = "p1";
pub const SEED_DOCTOR_ID: &str = "d1";
pub const SEED_PROTOCOL_ID: &str = "arv1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordBody {
    pub email: String,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

struct Account {
    user: User,
    password: String,
}

/// JSON documents keyed by id.
#[derive(Default)]
struct Collection {
    items: BTreeMap<String, Value>,
}

impl Collection {
    /// Store `doc` under a fresh id, filling `defaults` for absent fields.
    fn insert(&mut self, mut doc: Value, defaults: &[(&str, Value)]) -> Value {
        let id = Uuid::new_v4().to_string();
        if let Some(obj) = doc.as_object_mut() {
            for (key, value) in defaults {
                obj.entry(key.to_string()).or_insert_with(|| value.clone());
            }
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        self.items.insert(id, doc.clone());
        doc
    }

    fn seed(&mut self, doc: Value) {
        if let Some(id) = doc["id"].as_str() {
            self.items.insert(id.to_string(), doc);
        }
    }

    fn get(&self, id: &str) -> Option<Value> {
        self.items.get(id).cloned()
    }

    /// Full replacement; fields absent from `doc` keep their stored value.
    fn replace(&mut self, id: &str, doc: Value) -> Option<Value> {
        let stored = self.items.get_mut(id)?;
        if let (Some(target), Some(source)) = (stored.as_object_mut(), doc.as_object()) {
            for (key, value) in source {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Some(stored.clone())
    }

    fn set_fields(&mut self, id: &str, fields: &[(&str, Value)]) -> Option<Value> {
        let stored = self.items.get_mut(id)?;
        if let Some(obj) = stored.as_object_mut() {
            for (key, value) in fields {
                obj.insert(key.to_string(), value.clone());
            }
        }
        Some(stored.clone())
    }

    fn remove(&mut self, id: &str) -> bool {
        self.items.remove(id).is_some()
    }

    fn all(&self) -> Vec<Value> {
        self.items.values().cloned().collect()
    }

    fn filter(&self, field: &str, value: &str) -> Vec<Value> {
        self.items
            .values()
            .filter(|doc| doc[field].as_str() == Some(value))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct Db {
    accounts: HashMap<String, Account>,
    /// Live access tokens → user id.
    tokens: HashMap<String, String>,
    /// Expired tokens → user id; only `/auth/refresh` accepts them.
    expired: HashMap<String, String>,
    patients: Collection,
    doctors: Collection,
    records: Collection,
    test_results: Collection,
    medications: Collection,
    appointments: Collection,
    protocols: Collection,
}

impl Db {
    fn seeded() -> Self {
        let mut db = Db::default();
        db.accounts.insert(
            DEMO_EMAIL.to_string(),
            Account {
                user: User {
                    id: "u-demo".to_string(),
                    email: DEMO_EMAIL.to_string(),
                    name: "Demo Doctor".to_string(),
                    role: "doctor".to_string(),
                    phone: None,
                    avatar_url: None,
                },
                password: DEMO_PASSWORD.to_string(),
            },
        );
        db.doctors.seed(json!({
            "id": SEED_DOCTOR_ID,
            "userId": "u-demo",
            "name": "Demo Doctor",
            "specialization": "Infectious disease",
            "available": true
        }));
        db.patients.seed(json!({
            "id": SEED_PATIENT_ID,
            "name": "Nguyen Van A",
            "gender": "male",
            "dateOfBirth": "1990-04-12",
            "assignedDoctorId": SEED_DOCTOR_ID
        }));
        db.protocols.seed(json!({
            "id": SEED_PROTOCOL_ID,
            "name": "TDF + 3TC + DTG",
            "status": "active",
            "drugs": [
                {"name": "Tenofovir", "dosage": "300mg", "frequency": "daily"},
                {"name": "Lamivudine", "dosage": "300mg", "frequency": "daily"},
                {"name": "Dolutegravir", "dosage": "50mg", "frequency": "daily"}
            ]
        }));
        db
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.accounts
            .values()
            .map(|a| &a.user)
            .find(|u| u.id == user_id)
    }

    fn account_by_id_mut(&mut self, user_id: &str) -> Option<&mut Account> {
        self.accounts.values_mut().find(|a| a.user.id == user_id)
    }
}

/// Shared handle on the mock backend's state.
#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            db: Arc::new(RwLock::new(Db::seeded())),
        }
    }

    /// Invalidate every token outright; even refresh will reject them.
    pub async fn revoke_tokens(&self) {
        let mut db = self.db.write().await;
        db.tokens.clear();
        db.expired.clear();
    }

    /// Expire every live token: protected routes answer 401 but
    /// `/auth/refresh` still exchanges them for fresh ones.
    pub async fn expire_tokens(&self) {
        let mut db = self.db.write().await;
        let live: Vec<(String, String)> = db.tokens.drain().collect();
        db.expired.extend(live);
    }

    pub async fn live_token_count(&self) -> usize {
        self.db.read().await.tokens.len()
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn authenticate(db: &Db, headers: &HeaderMap) -> ApiResult<User> {
    let token = bearer(headers).ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "missing token"))?;
    let user_id = db
        .tokens
        .get(token)
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "invalid or expired token"))?;
    db.user_by_id(user_id)
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "unknown user"))
}

fn not_found(what: &str) -> (StatusCode, Json<Value>) {
    failure(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/profile/{user_id}", put(update_profile))
        .route("/auth/change-password", post(change_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/medical/patients", get(list_patients))
        .route("/medical/patients/{id}", get(get_patient))
        .route(
            "/medical/patients/{id}/records",
            get(list_records).post(create_record),
        )
        .route(
            "/medical/patients/{id}/test-results",
            get(list_test_results).post(create_test_result),
        )
        .route("/medical/patients/{id}/medications", get(list_patient_medications))
        .route("/medical/patients/{id}/appointments", get(list_patient_appointments))
        .route("/medical/doctors", get(list_doctors))
        .route("/medical/doctors/{id}", get(get_doctor))
        .route("/medical/doctors/{id}/appointments", get(list_doctor_appointments))
        .route("/medical/appointments", post(create_appointment))
        .route(
            "/medical/appointments/{id}",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/medical/appointments/{id}/cancel", patch(cancel_appointment))
        .route("/medical/medications", post(create_medication))
        .route(
            "/medical/medications/{id}",
            get(get_medication).put(update_medication).delete(delete_medication),
        )
        .route("/medical/medications/{id}/stop", patch(stop_medication))
        .route(
            "/medical/arv-protocols",
            get(list_protocols).post(create_protocol),
        )
        .route(
            "/medical/arv-protocols/{id}",
            get(get_protocol).put(update_protocol).delete(delete_protocol),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn auth_payload(token: String, user: &User) -> Value {
    json!({ "token": token, "user": user, "expiresIn": TOKEN_TTL_SECS })
}

// --- auth ---

async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    let user = match db.accounts.get(&body.email) {
        Some(account) if account.password == body.password => account.user.clone(),
        _ => return Err(failure(StatusCode::UNAUTHORIZED, "invalid credentials")),
    };
    let token = db.issue_token(&user.id);
    info!(user_id = %user.id, "login");
    Ok(Json(auth_payload(token, &user)))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    if db.accounts.contains_key(&body.email) {
        return Err(failure(StatusCode::CONFLICT, "email already registered"));
    }
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: body.email.clone(),
        name: body.name,
        role: body.role,
        phone: body.phone,
        avatar_url: None,
    };
    db.accounts.insert(
        body.email,
        Account {
            user: user.clone(),
            password: body.password,
        },
    );
    let token = db.issue_token(&user.id);
    info!(user_id = %user.id, "register");
    Ok((StatusCode::CREATED, Json(auth_payload(token, &user))))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer(&headers) {
        let mut db = state.db.write().await;
        db.tokens.remove(token);
        db.expired.remove(token);
    }
    StatusCode::NO_CONTENT
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let token = bearer(&headers).ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "missing token"))?;
    let mut db = state.db.write().await;
    let user_id = match db.tokens.remove(token) {
        Some(id) => id,
        None => db
            .expired
            .remove(token)
            .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "token cannot be refreshed"))?,
    };
    let fresh = db.issue_token(&user_id);
    Ok(Json(json!({ "token": fresh })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let db = state.db.read().await;
    authenticate(&db, &headers).map(Json)
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<ProfileBody>,
) -> ApiResult<Json<User>> {
    let mut db = state.db.write().await;
    let caller = authenticate(&db, &headers)?;
    if caller.id != user_id {
        return Err(failure(StatusCode::FORBIDDEN, "cannot edit another user's profile"));
    }
    let account = db
        .account_by_id_mut(&user_id)
        .ok_or_else(|| not_found("user"))?;
    if let Some(name) = body.name {
        account.user.name = name;
    }
    if let Some(email) = body.email {
        account.user.email = email;
    }
    if let Some(phone) = body.phone {
        account.user.phone = Some(phone);
    }
    if let Some(avatar_url) = body.avatar_url {
        account.user.avatar_url = Some(avatar_url);
    }
    Ok(Json(account.user.clone()))
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordBody>,
) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    let caller = authenticate(&db, &headers)?;
    let account = db
        .account_by_id_mut(&caller.id)
        .ok_or_else(|| not_found("user"))?;
    if account.password != body.old_password {
        return Err(failure(StatusCode::BAD_REQUEST, "old password does not match"));
    }
    account.password = body.new_password;
    Ok(StatusCode::NO_CONTENT)
}

/// Always accepted, so the response does not reveal which emails exist.
async fn reset_password(Json(_body): Json<ResetPasswordBody>) -> (StatusCode, Json<Value>) {
    info!("password reset requested");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "if the account exists, a reset email was sent" })),
    )
}

// --- patients ---

async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    Ok(Json(paginate(db.patients.all(), &params)))
}

/// Apply `search` (case-insensitive on `name`), then `page`/`limit` (1-based).
fn paginate(items: Vec<Value>, params: &ListParams) -> Vec<Value> {
    let needle = params.search.as_deref().map(str::to_lowercase);
    let matching = items.into_iter().filter(|doc| match &needle {
        Some(n) => doc["name"]
            .as_str()
            .map_or(false, |name| name.to_lowercase().contains(n)),
        None => true,
    });
    match params.limit {
        Some(limit) => {
            let page = params.page.unwrap_or(1).max(1);
            matching.skip((page - 1).saturating_mul(limit)).take(limit).collect()
        }
        None => matching.collect(),
    }
}

async fn get_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).map(Json).ok_or_else(|| not_found("patient"))
}

async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    Ok(Json(db.records.filter("patientId", &id)))
}

async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    let caller = authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    let created = db.records.insert(
        body,
        &[
            ("patientId", json!(id)),
            ("createdAt", json!("2026-01-01T00:00:00Z")),
            ("createdBy", json!(caller.id)),
        ],
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_test_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    Ok(Json(db.test_results.filter("patientId", &id)))
}

async fn create_test_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    let created = db
        .test_results
        .insert(body, &[("patientId", json!(id)), ("status", json!("pending"))]);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_patient_medications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    Ok(Json(db.medications.filter("patientId", &id)))
}

async fn list_patient_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.patients.get(&id).ok_or_else(|| not_found("patient"))?;
    Ok(Json(db.appointments.filter("patientId", &id)))
}

// --- doctors ---

async fn list_doctors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    Ok(Json(paginate(db.doctors.all(), &params)))
}

async fn get_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.doctors.get(&id).map(Json).ok_or_else(|| not_found("doctor"))
}

async fn list_doctor_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.doctors.get(&id).ok_or_else(|| not_found("doctor"))?;
    Ok(Json(db.appointments.filter("doctorId", &id)))
}

// --- appointments ---

async fn create_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    let created = db.appointments.insert(body, &[("status", json!("scheduled"))]);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.appointments.get(&id).map(Json).ok_or_else(|| not_found("appointment"))
}

async fn update_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    db.appointments
        .replace(&id, body)
        .map(Json)
        .ok_or_else(|| not_found("appointment"))
}

async fn cancel_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    let reason = body.get("reason").cloned().unwrap_or(Value::Null);
    db.appointments
        .set_fields(&id, &[("status", json!("cancelled")), ("notes", reason)])
        .map(Json)
        .ok_or_else(|| not_found("appointment"))
}

async fn delete_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    if db.appointments.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("appointment"))
    }
}

// --- medications ---

async fn create_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    let created = db.medications.insert(body, &[("status", json!("active"))]);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.medications.get(&id).map(Json).ok_or_else(|| not_found("medication"))
}

async fn update_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    db.medications
        .replace(&id, body)
        .map(Json)
        .ok_or_else(|| not_found("medication"))
}

async fn stop_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    let reason = body.get("reason").cloned().unwrap_or(Value::Null);
    db.medications
        .set_fields(&id, &[("status", json!("stopped")), ("stopReason", reason)])
        .map(Json)
        .ok_or_else(|| not_found("medication"))
}

async fn delete_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    if db.medications.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("medication"))
    }
}

// --- ARV protocols ---

async fn list_protocols(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<Value>>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    Ok(Json(db.protocols.all()))
}

async fn create_protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    let created = db.protocols.insert(body, &[("status", json!("active"))]);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let db = state.db.read().await;
    authenticate(&db, &headers)?;
    db.protocols.get(&id).map(Json).ok_or_else(|| not_found("protocol"))
}

async fn update_protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    db.protocols
        .replace(&id, body)
        .map(Json)
        .ok_or_else(|| not_found("protocol"))
}

async fn delete_protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    authenticate(&db, &headers)?;
    if db.protocols.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("protocol"))
    }
}
