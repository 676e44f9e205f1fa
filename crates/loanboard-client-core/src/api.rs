use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::credential::Credential;
use crate::error::ApiError;
use crate::models::{
    Application, ContactReceipt, EmiQuote, EmiRequest, Faq, Identity, LoginRequest, Partner,
    PublicStats, RegisterRequest, Review, Ticket, TicketCreateRequest, TicketStatusUpdateRequest,
    TokenResponse, TrafficStats, UpdateApplicationStatusRequest,
};
use crate::transport::{ApiRequest, ApiTransport, Attachment, MultipartForm, Payload};

pub const PUBLIC_STATS_PATH: &str = "/api/public/stats";
pub const PUBLIC_PARTNERS_PATH: &str = "/api/public/partners";
pub const PUBLIC_REVIEWS_PATH: &str = "/api/public/reviews";
pub const PUBLIC_FAQS_PATH: &str = "/api/public/faqs";
pub const AUTH_REGISTER_PATH: &str = "/api/auth/register";
pub const AUTH_LOGIN_PATH: &str = "/api/auth/login";
pub const AUTH_ME_PATH: &str = "/api/auth/me";
pub const APPLICATIONS_PATH: &str = "/api/applications";
pub const MY_APPLICATIONS_PATH: &str = "/api/applications/my";
pub const TICKETS_PATH: &str = "/api/tickets";
pub const MY_TICKETS_PATH: &str = "/api/tickets/my";
pub const EMI_CALCULATE_PATH: &str = "/api/emi/calculate";
pub const CONTACT_PATH: &str = "/api/contact";
pub const SUPER_ADMIN_TRAFFIC_PATH: &str = "/api/super-admin/traffic";

/// Loan application form carried as multipart with its three proof files.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSubmission {
    pub loan_type: String,
    pub amount: f64,
    pub purpose: String,
    pub id_proof: Attachment,
    pub income_proof: Attachment,
    pub address_proof: Attachment,
}

impl ApplicationSubmission {
    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text("loan_type", self.loan_type)
            .text("amount", self.amount.to_string())
            .text("purpose", self.purpose)
            .file("id_proof", self.id_proof)
            .file("income_proof", self.income_proof)
            .file("address_proof", self.address_proof)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Typed wrappers over the service endpoints.
#[derive(Clone)]
pub struct DashboardApi {
    transport: Arc<dyn ApiTransport>,
}

impl DashboardApi {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn application_path(application_id: u64) -> String {
        format!("{APPLICATIONS_PATH}/{application_id}")
    }

    #[must_use]
    pub fn additional_documents_path(application_id: u64) -> String {
        format!("{APPLICATIONS_PATH}/{application_id}/additional-documents")
    }

    #[must_use]
    pub fn ticket_status_path(ticket_id: u64) -> String {
        format!("{TICKETS_PATH}/{ticket_id}/status")
    }

    pub async fn call(
        &self,
        request: ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError> {
        self.transport.call(request, credential).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        let payload = self.call(request, credential).await?;
        decode_payload(payload)
    }

    pub async fn public_stats(&self) -> Result<PublicStats, ApiError> {
        self.fetch(ApiRequest::get(PUBLIC_STATS_PATH), None).await
    }

    pub async fn public_partners(&self) -> Result<Vec<Partner>, ApiError> {
        self.fetch(ApiRequest::get(PUBLIC_PARTNERS_PATH), None).await
    }

    pub async fn public_reviews(&self) -> Result<Vec<Review>, ApiError> {
        self.fetch(ApiRequest::get(PUBLIC_REVIEWS_PATH), None).await
    }

    pub async fn public_faqs(&self) -> Result<Vec<Faq>, ApiError> {
        self.fetch(ApiRequest::get(PUBLIC_FAQS_PATH), None).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity, ApiError> {
        self.fetch(ApiRequest::post_json(AUTH_REGISTER_PATH, request)?, None)
            .await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.fetch(ApiRequest::post_json(AUTH_LOGIN_PATH, request)?, None)
            .await
    }

    pub async fn me(&self, credential: Option<&Credential>) -> Result<Identity, ApiError> {
        self.fetch(ApiRequest::get(AUTH_ME_PATH), credential).await
    }

    pub async fn my_applications(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<Application>, ApiError> {
        self.fetch(ApiRequest::get(MY_APPLICATIONS_PATH), credential)
            .await
    }

    pub async fn all_applications(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<Application>, ApiError> {
        self.fetch(ApiRequest::get(APPLICATIONS_PATH), credential)
            .await
    }

    pub async fn submit_application(
        &self,
        submission: ApplicationSubmission,
        credential: Option<&Credential>,
    ) -> Result<Application, ApiError> {
        let request = ApiRequest::post_multipart(APPLICATIONS_PATH, submission.into_form());
        self.fetch(request, credential).await
    }

    pub async fn update_application_status(
        &self,
        application_id: u64,
        request: &UpdateApplicationStatusRequest,
        credential: Option<&Credential>,
    ) -> Result<Application, ApiError> {
        let request = ApiRequest::patch_json(Self::application_path(application_id), request)?;
        self.fetch(request, credential).await
    }

    pub async fn upload_additional_document(
        &self,
        application_id: u64,
        document: Attachment,
        credential: Option<&Credential>,
    ) -> Result<Application, ApiError> {
        let request = ApiRequest::post_multipart(
            Self::additional_documents_path(application_id),
            MultipartForm::new().file("document", document),
        );
        self.fetch(request, credential).await
    }

    pub async fn my_tickets(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<Ticket>, ApiError> {
        self.fetch(ApiRequest::get(MY_TICKETS_PATH), credential).await
    }

    pub async fn all_tickets(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<Ticket>, ApiError> {
        self.fetch(ApiRequest::get(TICKETS_PATH), credential).await
    }

    pub async fn create_ticket(
        &self,
        request: &TicketCreateRequest,
        credential: Option<&Credential>,
    ) -> Result<Ticket, ApiError> {
        self.fetch(ApiRequest::post_json(TICKETS_PATH, request)?, credential)
            .await
    }

    pub async fn update_ticket_status(
        &self,
        ticket_id: u64,
        request: &TicketStatusUpdateRequest,
        credential: Option<&Credential>,
    ) -> Result<Ticket, ApiError> {
        let request = ApiRequest::patch_json(Self::ticket_status_path(ticket_id), request)?;
        self.fetch(request, credential).await
    }

    pub async fn calculate_emi(&self, request: &EmiRequest) -> Result<EmiQuote, ApiError> {
        self.fetch(ApiRequest::post_json(EMI_CALCULATE_PATH, request)?, None)
            .await
    }

    pub async fn submit_contact(
        &self,
        submission: ContactSubmission,
    ) -> Result<ContactReceipt, ApiError> {
        let form = MultipartForm::new()
            .text("name", submission.name)
            .text("email", submission.email)
            .text("message", submission.message);
        self.fetch(ApiRequest::post_multipart(CONTACT_PATH, form), None)
            .await
    }

    pub async fn traffic(&self, credential: Option<&Credential>) -> Result<TrafficStats, ApiError> {
        self.fetch(ApiRequest::get(SUPER_ADMIN_TRAFFIC_PATH), credential)
            .await
    }
}

pub fn decode_payload<T: DeserializeOwned>(payload: Payload) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|error| ApiError::decode(0, format!("failed to decode response: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers_are_deterministic() {
        assert_eq!(DashboardApi::application_path(42), "/api/applications/42");
        assert_eq!(
            DashboardApi::additional_documents_path(42),
            "/api/applications/42/additional-documents"
        );
        assert_eq!(DashboardApi::ticket_status_path(7), "/api/tickets/7/status");
    }

    #[test]
    fn application_submission_uses_service_field_names() {
        let form = ApplicationSubmission {
            loan_type: "Home Loan".to_string(),
            amount: 250_000.0,
            purpose: "renovation".to_string(),
            id_proof: Attachment::new("id.pdf", vec![1]),
            income_proof: Attachment::new("income.pdf", vec![2]),
            address_proof: Attachment::new("address.pdf", vec![3]),
        }
        .into_form();
        let field_names: Vec<&str> = form.fields.iter().map(|(name, _)| name.as_str()).collect();
        let file_names: Vec<&str> = form.files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(field_names, ["loan_type", "amount", "purpose"]);
        assert_eq!(file_names, ["id_proof", "income_proof", "address_proof"]);
        assert_eq!(form.fields[1].1, "250000");
    }

    #[test]
    fn decode_failure_is_reported_as_decode_error() {
        let error = decode_payload::<Vec<Faq>>(serde_json::json!({"unexpected": true}))
            .expect_err("shape mismatch");
        assert_eq!(error.kind, crate::error::ApiErrorKind::Decode);
    }
}
