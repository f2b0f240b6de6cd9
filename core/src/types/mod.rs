//! Wire records exchanged with the medical-records backend.
//!
//! # Design
//! Every record is plain serde data with camelCase field names on the wire.
//! Fields the backend leaves loosely shaped get a closed enum here instead of
//! a free-form string or map. The client attaches no behavior to these types;
//! validation is the backend's job.

pub mod auth;
pub mod content;
pub mod medical;

pub use auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshResponse, RegisterRequest,
    ResetPasswordRequest, Role, UpdateProfile, User,
};
pub use content::{BlogPost, Notification, NotificationKind};
pub use medical::{
    Appointment, AppointmentStatus, AppointmentType, ArvDrug, ArvProtocol, CancelAppointment,
    Doctor, Gender, ListQuery, MedicalRecord, Medication, MedicationStatus, NewAppointment,
    NewArvProtocol, NewMedicalRecord, NewMedication, NewTestResult, Patient, ProtocolStatus,
    StopMedication, TestKind, TestResult, TestResultStatus,
};
