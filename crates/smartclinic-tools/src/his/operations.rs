use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use serde_json::{Value, json};

use smartclinic_common::{ParamDefault, ToolParameters, ToolResult, ToolSchema};

use super::HisClient;
use super::specialty_query;
use crate::ToolImplementation;

const INIT_ALL: &str = "his/AppointmentsAPI/InitAll";
const RECORDSET: &str = "clinicaldocs/VisitDocs/GetRecordset";
const USER_DATASET: &str = "his/AppointmentsAPI/GetUserDataset";

/// One HIS endpoint exposed as a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HisOperation {
    DoctorSpecialties,
    ActivateSso,
    SearchPatientByIdNumber,
    TodayAppointments,
    OngoingVisits,
    InitAppointments,
    FindAppointmentResources,
    SessionSlots,
    CreateWalkin,
    AppointmentNumber,
    CreateVisit,
    PatientJourney,
    AppointmentFollowup,
}

/// A resolved outbound call.
#[derive(Debug, Clone, PartialEq)]
enum HisRequest {
    Get {
        path: &'static str,
        query: Vec<(&'static str, String)>,
    },
    Post {
        path: &'static str,
        query: Vec<(&'static str, String)>,
        body: Value,
    },
}

/// Trimmed value of `name`, or an empty string.
fn text(parameters: &ToolParameters, name: &str) -> String {
    parameters
        .get(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Trimmed value of `name`, or JSON `null` when absent or blank.
fn nullable(parameters: &ToolParameters, name: &str) -> Value {
    parameters
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map_or(Value::Null, |v| Value::String(v.to_string()))
}

fn recordset(query_name: &str, visit_id: String) -> HisRequest {
    HisRequest::Get {
        path: RECORDSET,
        query: vec![("QueryName", query_name.to_string()), ("VisitId", visit_id)],
    }
}

impl HisOperation {
    /// Every operation, in catalog order.
    pub const ALL: [Self; 13] = [
        Self::DoctorSpecialties,
        Self::ActivateSso,
        Self::SearchPatientByIdNumber,
        Self::TodayAppointments,
        Self::OngoingVisits,
        Self::InitAppointments,
        Self::FindAppointmentResources,
        Self::SessionSlots,
        Self::CreateWalkin,
        Self::AppointmentNumber,
        Self::CreateVisit,
        Self::PatientJourney,
        Self::AppointmentFollowup,
    ];

    /// Name the model uses to select this tool.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::DoctorSpecialties => "get_doctor_specialties",
            Self::ActivateSso => "activate_sso",
            Self::SearchPatientByIdNumber => "search_patient_by_id_number",
            Self::TodayAppointments => "get_today_appointments",
            Self::OngoingVisits => "get_ongoing_visits",
            Self::InitAppointments => "init_appointments",
            Self::FindAppointmentResources => "find_appointment_resources",
            Self::SessionSlots => "get_session_slots",
            Self::CreateWalkin => "create_walkin",
            Self::AppointmentNumber => "get_appointment_number",
            Self::CreateVisit => "create_visit",
            Self::PatientJourney => "get_patient_journey",
            Self::AppointmentFollowup => "get_appointment_followup",
        }
    }

    #[must_use]
    pub fn schema(self) -> ToolSchema {
        let schema = |description: &str| {
            ToolSchema::builder()
                .tool_name(self.tool_name())
                .description(description)
                .build()
        };

        match self {
            Self::DoctorSpecialties => schema(
                "Look up the hospital's doctor specialties, either the full list or those matching the user's words",
            )
            .optional("query", "Specialty question or keywords", None),
            Self::ActivateSso => schema("Activate single sign-on for an account")
                .require("activation_id", "SSO activation ID", "a1b2c3d4"),
            Self::SearchPatientByIdNumber => {
                schema("Find a patient by national ID number")
                    .require("id_number", "Patient ID number", "DD15021998")
            }
            Self::TodayAppointments => schema("List today's appointments for a visit")
                .require("visit_id", "Visit ID", "3598"),
            Self::OngoingVisits => {
                schema("List ongoing visits").require("visit_id", "Visit ID", "3598")
            }
            Self::InitAppointments => {
                schema("Load appointment reference data (specialties, clinics, resources)")
            }
            Self::FindAppointmentResources => schema(
                "Find doctors and resources with bookable sessions in a date range",
            )
            .optional("date_from", "Start date (YYYY-MM-DD)", Some(ParamDefault::Today))
            .optional("date_to", "End date (YYYY-MM-DD)", Some(ParamDefault::Today))
            .optional(
                "resource_type",
                "Resource type",
                Some(ParamDefault::Literal("1".to_string())),
            )
            .optional("specialty_id", "Specialty ID", None)
            .optional("resource_id", "Doctor/Resource ID", None)
            .optional("clinic_id", "Clinic ID", None)
            .optional("from_time", "Earliest time (HH:MM)", None)
            .optional("to_time", "Latest time (HH:MM)", None),
            Self::SessionSlots => schema("List the free slots of a doctor session")
                .require("resource_id", "Doctor/Resource ID", "2")
                .require("session_id", "Session ID", "363")
                .optional("session_date", "Session date (YYYY-MM-DD)", Some(ParamDefault::Today)),
            Self::CreateWalkin => schema("Create a walk-in appointment")
                .require("resource_id", "Doctor/Resource ID", "2")
                .require("session_id", "Session ID", "363")
                .require("session_date", "Appointment date (YYYY-MM-DD)", "2025-06-25")
                .require("from_time", "Preferred time (HH:MM:SS)", "07:10:00")
                .require("patient_id", "Patient ID", "3598"),
            Self::AppointmentNumber => schema("Get the appointment number of a visit")
                .require("visit_id", "Visit ID", "1820"),
            Self::CreateVisit => schema("Create a visit from an appointment")
                .require("appointment_id", "Appointment ID", "1820"),
            Self::PatientJourney => schema("Show the journey of a patient through a visit")
                .require("visit_id", "Visit ID", "3502"),
            Self::AppointmentFollowup => schema("List follow-up appointments of a patient")
                .require("patient_id", "Patient ID", "3598")
                .optional("date_from", "Start date (YYYY-MM-DD)", Some(ParamDefault::Today))
                .optional("date_to", "End date (YYYY-MM-DD)", Some(ParamDefault::Today))
                .optional("from_time", "Earliest time (HH:MM)", None)
                .optional("to_time", "Latest time (HH:MM)", None),
        }
    }

    fn request(self, p: &ToolParameters) -> HisRequest {
        match self {
            Self::DoctorSpecialties | Self::InitAppointments => HisRequest::Get {
                path: INIT_ALL,
                query: Vec::new(),
            },
            Self::ActivateSso => HisRequest::Get {
                path: "visitmgmt/Accounts/ActivateSSO",
                query: vec![("Id", text(p, "activation_id"))],
            },
            Self::SearchPatientByIdNumber => HisRequest::Get {
                path: "clinicaldocs/Codes/SearchText",
                query: vec![
                    ("CodeName", "CHECKIDNO".to_string()),
                    ("text", text(p, "id_number")),
                ],
            },
            Self::TodayAppointments => recordset("GET_TODAYAPPTS", text(p, "visit_id")),
            Self::OngoingVisits => recordset("GET_ONGOINGVISITS", text(p, "visit_id")),
            Self::AppointmentNumber => recordset("GET_APPTNO", text(p, "visit_id")),
            Self::PatientJourney => recordset("GET_PATIENT_JOURNEY", text(p, "visit_id")),
            Self::FindAppointmentResources => HisRequest::Post {
                path: USER_DATASET,
                query: vec![("QueryName", "APPOINTMENTFINDRESC".to_string())],
                body: json!({
                    "RESOURCETYPE": nullable(p, "resource_type"),
                    "SPECIALITYID": nullable(p, "specialty_id"),
                    "RESOURCEID": nullable(p, "resource_id"),
                    "CLINICID": nullable(p, "clinic_id"),
                    "FROMDATE": nullable(p, "date_from"),
                    "TODATE": nullable(p, "date_to"),
                    "FROM_TIME": nullable(p, "from_time"),
                    "TO_TIME": nullable(p, "to_time"),
                }),
            },
            Self::SessionSlots => HisRequest::Get {
                path: "his/AppointmentsAPI/GetSessionSlots",
                query: vec![
                    ("Id", text(p, "resource_id")),
                    (
                        "SessionDate",
                        format!("{}T00:00:00.000Z", text(p, "session_date")),
                    ),
                    ("SessionId", text(p, "session_id")),
                ],
            },
            Self::CreateWalkin => HisRequest::Get {
                path: "his/AppointmentsAPI/CreateWalkin",
                query: vec![
                    ("ResourceId", text(p, "resource_id")),
                    ("SessionId", text(p, "session_id")),
                    ("SessionDate", text(p, "session_date")),
                    ("FromTime", text(p, "from_time")),
                    ("PatientId", text(p, "patient_id")),
                ],
            },
            Self::CreateVisit => HisRequest::Get {
                path: "his/AppointmentsAPI/CreateVisit",
                query: vec![("AppointmentId", text(p, "appointment_id"))],
            },
            Self::AppointmentFollowup => HisRequest::Post {
                path: USER_DATASET,
                query: vec![("QueryName", "APPOINTMENTFOLLOWUP".to_string())],
                body: json!({
                    "PATIENTID": nullable(p, "patient_id"),
                    "FROMDATE": nullable(p, "date_from"),
                    "TODATE": nullable(p, "date_to"),
                    "FROM_TIME": nullable(p, "from_time"),
                    "TO_TIME": nullable(p, "to_time"),
                }),
            },
        }
    }
}

/// Tool backed by a single HIS endpoint.
#[derive(Debug, Clone)]
pub struct HisTool {
    operation: HisOperation,
    client: Arc<HisClient>,
}

impl HisTool {
    #[must_use]
    pub const fn new(operation: HisOperation, client: Arc<HisClient>) -> Self {
        Self { operation, client }
    }
}

#[async_trait]
impl ToolImplementation for HisTool {
    fn schema(&self) -> ToolSchema {
        self.operation.schema()
    }

    async fn execute(&self, parameters: &ToolParameters) -> ToolResult {
        let name = self.operation.tool_name();
        let response = match self.operation.request(parameters) {
            HisRequest::Get { path, query } => self.client.get_json(path, &query).await,
            HisRequest::Post { path, query, body } => {
                self.client.post_json(path, &query, &body).await
            }
        };

        match response {
            Ok(payload) if payload.get("error").is_some() => {
                let reported = &payload["error"];
                let message = reported
                    .as_str()
                    .map_or_else(|| reported.to_string(), str::to_string);
                error!("{name} reported: {message}");
                ToolResult::error(message)
            }
            Ok(payload) if self.operation == HisOperation::DoctorSpecialties => {
                let query = specialty_query::classify(&text(parameters, "query"));
                info!("{name}: {query:?}");
                ToolResult::ok(query.select(&payload))
            }
            Ok(payload) => ToolResult::ok(payload),
            Err(e) => {
                error!("{name} failed: {e}");
                ToolResult::error(e.to_string())
            }
        }
    }
}
