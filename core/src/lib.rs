//! Authenticated client core for the medical-records API.
//!
//! # Overview
//! A single `ApiClient` dispatches every call. An outbound hook attaches the
//! bearer token from the `SessionStore`; an inbound hook clears the session
//! and publishes `SessionEvent::Invalidated` on 401. `AuthService` and
//! `MedicalService` map domain operations onto fixed paths and typed payloads.
//!
//! # Design
//! - Requests and responses cross the `HttpTransport` seam as plain data, so
//!   the pipeline runs the same over `reqwest` or a scripted test transport.
//! - The session lives behind `KeyValueStore`: memory, a JSON file, or (with
//!   the `browser` feature) `window.localStorage`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod services;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::{ApiClient, ApiResponse, RequestOptions};
pub use config::{ClientConfig, UnauthorizedPolicy};
pub use error::{ApiError, ErrorCategory};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{Interceptors, RequestAuth, SessionEvent};
pub use services::{AuthService, MedicalService};
pub use session::{Session, SessionStore};
#[cfg(feature = "browser")]
pub use storage::LocalStorage;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
pub use transport::{HttpTransport, ReqwestTransport};
