//! Request/response hooks wrapped around every dispatch.
//!
//! # Design
//! The outbound hook copies the current token from the session store into an
//! `Authorization: Bearer` header. It is a synchronous read and never fails; a
//! missing token just means the request goes out unauthenticated.
//!
//! The inbound hook turns non-2xx responses into errors. A 401 additionally
//! clears the session and publishes `SessionEvent::Invalidated` before the
//! error reaches the caller. Navigation is left to whoever subscribes, so this
//! layer has no UI dependency. Concurrent 401s each clear (a no-op after the
//! first) and each publish one event.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, AUTHORIZATION};
use crate::session::SessionStore;

const EVENT_CAPACITY: usize = 16;

/// Published when the backend has rejected the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session was cleared after a 401; the UI should navigate to
    /// `redirect_to`.
    Invalidated { redirect_to: String },
}

/// Authorization state of a request once the outbound hook has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAuth {
    NoToken,
    TokenAttached,
}

#[derive(Debug, Clone)]
pub struct Interceptors {
    session: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    sign_in_path: String,
}

impl Interceptors {
    pub fn new(session: Arc<SessionStore>, sign_in_path: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session,
            events,
            sign_in_path: sign_in_path.to_string(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Attach the bearer credential if the session holds one.
    pub fn outbound(&self, request: &mut HttpRequest) -> RequestAuth {
        match self.session.token() {
            Some(token) => {
                request.set_header(AUTHORIZATION, format!("Bearer {token}"));
                RequestAuth::TokenAttached
            }
            None => {
                request.remove_header(AUTHORIZATION);
                RequestAuth::NoToken
            }
        }
    }

    /// Pass 2xx through; turn everything else into an `ApiError`, clearing
    /// the session first on 401.
    pub fn inbound(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
        if response.is_success() {
            return Ok(response);
        }
        if response.status == 401 {
            self.invalidate_session();
        } else {
            debug!(status = response.status, "request failed");
        }
        Err(ApiError::from_status(response.status, response.body))
    }

    /// Clear the session and tell subscribers to send the user to sign-in.
    pub fn invalidate_session(&self) {
        warn!(redirect_to = %self.sign_in_path, "session rejected by backend; clearing");
        self.session.clear_session();
        // No subscribers is fine; there is simply nobody to redirect.
        let _ = self.events.send(SessionEvent::Invalidated {
            redirect_to: self.sign_in_path.clone(),
        });
    }
}
