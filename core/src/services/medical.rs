//! `/medical/*` operations: patients and their sub-resources, doctors,
//! appointments, medications and ARV protocols.

use serde::de::IgnoredAny;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::services::segment;
use crate::types::{
    Appointment, ArvProtocol, CancelAppointment, Doctor, ListQuery, MedicalRecord, Medication,
    NewAppointment, NewArvProtocol, NewMedicalRecord, NewMedication, NewTestResult, Patient,
    StopMedication, TestResult,
};

const PATIENTS: &str = "/medical/patients";
const DOCTORS: &str = "/medical/doctors";
const APPOINTMENTS: &str = "/medical/appointments";
const MEDICATIONS: &str = "/medical/medications";
const ARV_PROTOCOLS: &str = "/medical/arv-protocols";

#[derive(Debug, Clone)]
pub struct MedicalService {
    client: ApiClient,
}

impl MedicalService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // --- patients ---

    pub async fn list_patients(&self, query: &ListQuery) -> Result<Vec<Patient>, ApiError> {
        Ok(self.client.get(PATIENTS, &query.into()).await?.into_data())
    }

    pub async fn get_patient(&self, id: &str) -> Result<Patient, ApiError> {
        self.fetch(&format!("{PATIENTS}/{}", segment(id)?)).await
    }

    pub async fn list_medical_records(&self, patient_id: &str) -> Result<Vec<MedicalRecord>, ApiError> {
        self.fetch(&format!("{PATIENTS}/{}/records", segment(patient_id)?)).await
    }

    pub async fn create_medical_record(
        &self,
        patient_id: &str,
        record: &NewMedicalRecord,
    ) -> Result<MedicalRecord, ApiError> {
        Ok(self
            .client
            .post(&format!("{PATIENTS}/{}/records", segment(patient_id)?), record)
            .await?
            .into_data())
    }

    pub async fn list_test_results(&self, patient_id: &str) -> Result<Vec<TestResult>, ApiError> {
        self.fetch(&format!("{PATIENTS}/{}/test-results", segment(patient_id)?)).await
    }

    pub async fn create_test_result(
        &self,
        patient_id: &str,
        result: &NewTestResult,
    ) -> Result<TestResult, ApiError> {
        Ok(self
            .client
            .post(&format!("{PATIENTS}/{}/test-results", segment(patient_id)?), result)
            .await?
            .into_data())
    }

    pub async fn list_patient_medications(&self, patient_id: &str) -> Result<Vec<Medication>, ApiError> {
        self.fetch(&format!("{PATIENTS}/{}/medications", segment(patient_id)?)).await
    }

    pub async fn list_patient_appointments(&self, patient_id: &str) -> Result<Vec<Appointment>, ApiError> {
        self.fetch(&format!("{PATIENTS}/{}/appointments", segment(patient_id)?)).await
    }

    // --- doctors ---

    pub async fn list_doctors(&self, query: &ListQuery) -> Result<Vec<Doctor>, ApiError> {
        Ok(self.client.get(DOCTORS, &query.into()).await?.into_data())
    }

    pub async fn get_doctor(&self, id: &str) -> Result<Doctor, ApiError> {
        self.fetch(&format!("{DOCTORS}/{}", segment(id)?)).await
    }

    pub async fn list_doctor_appointments(&self, doctor_id: &str) -> Result<Vec<Appointment>, ApiError> {
        self.fetch(&format!("{DOCTORS}/{}/appointments", segment(doctor_id)?)).await
    }

    // --- appointments ---

    pub async fn get_appointment(&self, id: &str) -> Result<Appointment, ApiError> {
        self.fetch(&format!("{APPOINTMENTS}/{}", segment(id)?)).await
    }

    pub async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment, ApiError> {
        Ok(self.client.post(APPOINTMENTS, appointment).await?.into_data())
    }

    pub async fn update_appointment(
        &self,
        id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, ApiError> {
        Ok(self
            .client
            .put(&format!("{APPOINTMENTS}/{}", segment(id)?), appointment)
            .await?
            .into_data())
    }

    /// `PATCH /medical/appointments/{id}/cancel`.
    pub async fn cancel_appointment(&self, id: &str, reason: Option<&str>) -> Result<Appointment, ApiError> {
        let body = CancelAppointment {
            reason: reason.map(str::to_string),
        };
        Ok(self
            .client
            .patch(&format!("{APPOINTMENTS}/{}/cancel", segment(id)?), &body)
            .await?
            .into_data())
    }

    pub async fn delete_appointment(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{APPOINTMENTS}/{}", segment(id)?)).await
    }

    // --- medications ---

    pub async fn get_medication(&self, id: &str) -> Result<Medication, ApiError> {
        self.fetch(&format!("{MEDICATIONS}/{}", segment(id)?)).await
    }

    pub async fn create_medication(&self, medication: &NewMedication) -> Result<Medication, ApiError> {
        Ok(self.client.post(MEDICATIONS, medication).await?.into_data())
    }

    pub async fn update_medication(&self, id: &str, medication: &NewMedication) -> Result<Medication, ApiError> {
        Ok(self
            .client
            .put(&format!("{MEDICATIONS}/{}", segment(id)?), medication)
            .await?
            .into_data())
    }

    /// `PATCH /medical/medications/{id}/stop`.
    pub async fn stop_medication(&self, id: &str, reason: Option<&str>) -> Result<Medication, ApiError> {
        let body = StopMedication {
            reason: reason.map(str::to_string),
        };
        Ok(self
            .client
            .patch(&format!("{MEDICATIONS}/{}/stop", segment(id)?), &body)
            .await?
            .into_data())
    }

    pub async fn delete_medication(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{MEDICATIONS}/{}", segment(id)?)).await
    }

    // --- ARV protocols ---

    pub async fn list_arv_protocols(&self) -> Result<Vec<ArvProtocol>, ApiError> {
        self.fetch(ARV_PROTOCOLS).await
    }

    pub async fn get_arv_protocol(&self, id: &str) -> Result<ArvProtocol, ApiError> {
        self.fetch(&format!("{ARV_PROTOCOLS}/{}", segment(id)?)).await
    }

    pub async fn create_arv_protocol(&self, protocol: &NewArvProtocol) -> Result<ArvProtocol, ApiError> {
        Ok(self.client.post(ARV_PROTOCOLS, protocol).await?.into_data())
    }

    pub async fn update_arv_protocol(&self, id: &str, protocol: &NewArvProtocol) -> Result<ArvProtocol, ApiError> {
        Ok(self
            .client
            .put(&format!("{ARV_PROTOCOLS}/{}", segment(id)?), protocol)
            .await?
            .into_data())
    }

    pub async fn delete_arv_protocol(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{ARV_PROTOCOLS}/{}", segment(id)?)).await
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Ok(self
            .client
            .get(path, &RequestOptions::default())
            .await?
            .into_data())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.client.delete::<IgnoredAny>(path).await?;
        Ok(())
    }
}
