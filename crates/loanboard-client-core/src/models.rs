//! Wire types exchanged with the loan service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Closed set of dashboard roles. Anything else from the service is treated
/// as a failed identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    pub client_id: u64,
    pub client_name: String,
    pub client_email: String,
    pub loan_type: String,
    pub amount: f64,
    pub purpose: String,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub additional_documents: Vec<String>,
    /// Kept as text so unexpected values still render (as pending).
    pub status: String,
    #[serde(default)]
    pub admin_note: String,
    #[serde(default)]
    pub requires_additional_docs: bool,
    #[serde(default)]
    pub required_docs_note: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
    pub admin_note: String,
    pub requires_additional_docs: bool,
    pub required_docs_note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw.trim())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub owner_id: u64,
    pub owner_name: String,
    pub owner_email: String,
    #[serde(default)]
    pub assigned_admin_id: Option<u64>,
    #[serde(default)]
    pub assigned_admin_name: Option<String>,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCreateRequest {
    pub subject: String,
    pub message: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatusUpdateRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicStats {
    pub total_applications: u64,
    pub approved_applications: u64,
    pub rejected_applications: u64,
    pub pending_applications: u64,
    pub approval_rate: f64,
    pub total_disbursed_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub customer_name: String,
    pub product: String,
    pub rating: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub total_api_events: u64,
    pub open_tickets: u64,
    pub in_progress_tickets: u64,
    pub resolved_tickets: u64,
    #[serde(default)]
    pub top_paths: Vec<PathCount>,
    #[serde(default)]
    pub role_breakdown: Vec<RoleCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmiRequest {
    pub principal: f64,
    pub annual_rate: f64,
    pub months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmiQuote {
    pub emi: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactReceipt {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_decodes_known_roles() {
        let identity: Identity = serde_json::from_str(
            r#"{"id":7,"name":"Asha","email":"asha@example.com","role":"super_admin"}"#,
        )
        .expect("identity");
        assert_eq!(identity.role, Role::SuperAdmin);
    }

    #[test]
    fn identity_rejects_unknown_role() {
        let result = serde_json::from_str::<Identity>(
            r#"{"id":7,"name":"Asha","email":"asha@example.com","role":"auditor"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn application_decodes_naive_timestamps() {
        let application: Application = serde_json::from_str(
            r#"{
                "id": 42, "client_id": 3, "client_name": "Asha", "client_email": "asha@example.com",
                "loan_type": "Home Loan", "amount": 250000.0, "purpose": "renovation",
                "documents": ["3_id.pdf"], "additional_documents": [],
                "status": "Pending", "admin_note": "", "requires_additional_docs": false,
                "required_docs_note": "", "created_at": "2024-05-01T09:30:00.123456"
            }"#,
        )
        .expect("application");
        assert_eq!(application.id, 42);
        assert_eq!(application.documents, vec!["3_id.pdf".to_string()]);
    }

    #[test]
    fn status_update_serializes_service_casing() {
        let body = serde_json::to_value(UpdateApplicationStatusRequest {
            status: ApplicationStatus::Approved,
            admin_note: String::new(),
            requires_additional_docs: false,
            required_docs_note: String::new(),
        })
        .expect("serialize");
        assert_eq!(body["status"], "Approved");

        let ticket = serde_json::to_value(TicketStatusUpdateRequest {
            status: TicketStatus::InProgress,
        })
        .expect("serialize");
        assert_eq!(ticket["status"], "in_progress");
    }

    #[test]
    fn ticket_status_parse_matches_wire_names() {
        assert_eq!(TicketStatus::parse("resolved"), Some(TicketStatus::Resolved));
        assert_eq!(TicketStatus::parse(" open "), Some(TicketStatus::Open));
        assert_eq!(TicketStatus::parse("closed"), None);
    }
}
