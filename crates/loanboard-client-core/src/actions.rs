//! Mutation actions and the command table that names them.
//!
//! Rendered affordances and the CLI both refer to actions by name; the
//! [`CommandTable`] turns a name plus string arguments into a typed
//! [`ActionCommand`]. Executing a command performs exactly one write.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::api::{ApplicationSubmission, ContactSubmission, DashboardApi};
use crate::credential::Credential;
use crate::dispatch::LoaderKind;
use crate::error::{ApiError, InputError};
use crate::models::{
    ApplicationStatus, TicketCreateRequest, TicketPriority, TicketStatus,
    TicketStatusUpdateRequest, UpdateApplicationStatusRequest,
};
use crate::transport::Attachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionName {
    ApplicationApprove,
    ApplicationReject,
    ApplicationRequestDocs,
    ApplicationUploadDocument,
    ApplicationSubmit,
    TicketSetStatus,
    TicketCreate,
    ContactSubmit,
}

impl ActionName {
    pub const ALL: [Self; 8] = [
        Self::ApplicationApprove,
        Self::ApplicationReject,
        Self::ApplicationRequestDocs,
        Self::ApplicationUploadDocument,
        Self::ApplicationSubmit,
        Self::TicketSetStatus,
        Self::TicketCreate,
        Self::ContactSubmit,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApplicationApprove => "application.approve",
            Self::ApplicationReject => "application.reject",
            Self::ApplicationRequestDocs => "application.request_docs",
            Self::ApplicationUploadDocument => "application.upload_document",
            Self::ApplicationSubmit => "application.submit",
            Self::TicketSetStatus => "ticket.set_status",
            Self::TicketCreate => "ticket.create",
            Self::ContactSubmit => "contact.submit",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == raw.trim())
    }

    /// Loaders whose data this write can change.
    #[must_use]
    pub fn affected_loaders(self) -> &'static [LoaderKind] {
        match self {
            // A status change also opens a system ticket, which moves the
            // ticket counters on the traffic view.
            Self::ApplicationApprove | Self::ApplicationReject | Self::ApplicationRequestDocs => {
                &[LoaderKind::Admin, LoaderKind::SuperAdmin, LoaderKind::Public]
            }
            Self::ApplicationUploadDocument => &[LoaderKind::Client],
            Self::ApplicationSubmit => &[LoaderKind::Client, LoaderKind::Public],
            Self::TicketSetStatus => &[LoaderKind::Admin, LoaderKind::SuperAdmin],
            Self::TicketCreate => &[LoaderKind::Client, LoaderKind::Admin, LoaderKind::SuperAdmin],
            Self::ContactSubmit => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionCommand {
    ApproveApplication {
        application_id: u64,
    },
    RejectApplication {
        application_id: u64,
        note: String,
    },
    RequestDocuments {
        application_id: u64,
        note: String,
    },
    UploadDocument {
        application_id: u64,
        document: Attachment,
    },
    SubmitApplication(ApplicationSubmission),
    SetTicketStatus {
        ticket_id: u64,
        status: TicketStatus,
    },
    CreateTicket(TicketCreateRequest),
    SubmitContact(ContactSubmission),
}

impl ActionCommand {
    #[must_use]
    pub fn name(&self) -> ActionName {
        match self {
            Self::ApproveApplication { .. } => ActionName::ApplicationApprove,
            Self::RejectApplication { .. } => ActionName::ApplicationReject,
            Self::RequestDocuments { .. } => ActionName::ApplicationRequestDocs,
            Self::UploadDocument { .. } => ActionName::ApplicationUploadDocument,
            Self::SubmitApplication(_) => ActionName::ApplicationSubmit,
            Self::SetTicketStatus { .. } => ActionName::TicketSetStatus,
            Self::CreateTicket(_) => ActionName::TicketCreate,
            Self::SubmitContact(_) => ActionName::ContactSubmit,
        }
    }

    #[must_use]
    pub fn affected_loaders(&self) -> &'static [LoaderKind] {
        self.name().affected_loaders()
    }

    /// Performs the single write for this command and returns the
    /// notification text to show on success.
    pub async fn execute(
        self,
        api: &DashboardApi,
        credential: Option<&Credential>,
    ) -> Result<String, ApiError> {
        let name = self.name();
        debug!(action = name.as_str(), "executing action");
        let message = match self {
            Self::ApproveApplication { application_id } => {
                let request = status_update(
                    ApplicationStatus::Approved,
                    String::new(),
                    false,
                    String::new(),
                );
                api.update_application_status(application_id, &request, credential)
                    .await?;
                "Application Approved".to_string()
            }
            Self::RejectApplication {
                application_id,
                note,
            } => {
                let request =
                    status_update(ApplicationStatus::Rejected, note, false, String::new());
                api.update_application_status(application_id, &request, credential)
                    .await?;
                "Application Rejected".to_string()
            }
            Self::RequestDocuments {
                application_id,
                note,
            } => {
                let request =
                    status_update(ApplicationStatus::Pending, String::new(), true, note);
                api.update_application_status(application_id, &request, credential)
                    .await?;
                "Additional documents requested".to_string()
            }
            Self::UploadDocument {
                application_id,
                document,
            } => {
                api.upload_additional_document(application_id, document, credential)
                    .await?;
                "Document uploaded".to_string()
            }
            Self::SubmitApplication(submission) => {
                let application = api.submit_application(submission, credential).await?;
                format!("Application #{} submitted", application.id)
            }
            Self::SetTicketStatus { ticket_id, status } => {
                let request = TicketStatusUpdateRequest { status };
                api.update_ticket_status(ticket_id, &request, credential)
                    .await?;
                "Ticket updated".to_string()
            }
            Self::CreateTicket(request) => {
                let ticket = api.create_ticket(&request, credential).await?;
                format!("Ticket #{} created", ticket.id)
            }
            Self::SubmitContact(submission) => api.submit_contact(submission).await?.message,
        };
        info!(action = name.as_str(), "action succeeded");
        Ok(message)
    }
}

fn status_update(
    status: ApplicationStatus,
    admin_note: String,
    requires_additional_docs: bool,
    required_docs_note: String,
) -> UpdateApplicationStatusRequest {
    UpdateApplicationStatusRequest {
        status,
        admin_note,
        requires_additional_docs,
        required_docs_note,
    }
}

/// String arguments plus any attached files for one action invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
    values: BTreeMap<String, String>,
    attachments: BTreeMap<String, Attachment>,
}

impl ActionArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, key: impl Into<String>, attachment: Attachment) -> Self {
        self.attachments.insert(key.into(), attachment);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn insert_attachment(&mut self, key: impl Into<String>, attachment: Attachment) {
        self.attachments.insert(key.into(), attachment);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn required(&self, action: ActionName, key: &'static str) -> Result<&str, InputError> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(InputError::MissingArgument {
                action: action.as_str(),
                argument: key,
            })
    }

    fn optional(&self, key: &str) -> String {
        self.get(key).map(str::trim).unwrap_or_default().to_string()
    }

    fn id(&self, action: ActionName, key: &'static str) -> Result<u64, InputError> {
        let raw = self.required(action, key)?;
        raw.parse().map_err(|_| InputError::InvalidArgument {
            action: action.as_str(),
            argument: key,
            value: raw.to_string(),
        })
    }

    fn attachment(&self, action: ActionName, key: &'static str) -> Result<Attachment, InputError> {
        self.attachments
            .get(key)
            .cloned()
            .ok_or(InputError::MissingArgument {
                action: action.as_str(),
                argument: key,
            })
    }
}

type CommandBuilder = fn(&ActionArgs) -> Result<ActionCommand, InputError>;

/// Action name to command builder.
#[derive(Clone)]
pub struct CommandTable {
    builders: BTreeMap<ActionName, CommandBuilder>,
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.builders.keys().map(|name| name.as_str())).finish()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Every dashboard action.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(ActionName::ApplicationApprove, build_approve);
        table.register(ActionName::ApplicationReject, build_reject);
        table.register(ActionName::ApplicationRequestDocs, build_request_docs);
        table.register(ActionName::ApplicationUploadDocument, build_upload_document);
        table.register(ActionName::ApplicationSubmit, build_submit_application);
        table.register(ActionName::TicketSetStatus, build_set_ticket_status);
        table.register(ActionName::TicketCreate, build_create_ticket);
        table.register(ActionName::ContactSubmit, build_submit_contact);
        table
    }

    pub fn register(&mut self, name: ActionName, builder: CommandBuilder) {
        self.builders.insert(name, builder);
    }

    #[must_use]
    pub fn is_registered(&self, name: ActionName) -> bool {
        self.builders.contains_key(&name)
    }

    pub fn names(&self) -> impl Iterator<Item = ActionName> + '_ {
        self.builders.keys().copied()
    }

    pub fn build(&self, name: &str, args: &ActionArgs) -> Result<ActionCommand, InputError> {
        let builder = ActionName::parse(name)
            .and_then(|action| self.builders.get(&action))
            .ok_or_else(|| InputError::UnknownAction(name.trim().to_string()))?;
        builder(args)
    }
}

fn build_approve(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    Ok(ActionCommand::ApproveApplication {
        application_id: args.id(ActionName::ApplicationApprove, "id")?,
    })
}

fn build_reject(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    Ok(ActionCommand::RejectApplication {
        application_id: args.id(ActionName::ApplicationReject, "id")?,
        note: args.optional("note"),
    })
}

fn build_request_docs(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::ApplicationRequestDocs;
    Ok(ActionCommand::RequestDocuments {
        application_id: args.id(action, "id")?,
        note: args.required(action, "note")?.to_string(),
    })
}

fn build_upload_document(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::ApplicationUploadDocument;
    Ok(ActionCommand::UploadDocument {
        application_id: args.id(action, "id")?,
        document: args.attachment(action, "document")?,
    })
}

fn build_submit_application(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::ApplicationSubmit;
    let raw_amount = args.required(action, "amount")?;
    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| InputError::InvalidArgument {
            action: action.as_str(),
            argument: "amount",
            value: raw_amount.to_string(),
        })?;
    if amount.is_nan() || amount <= 0.0 {
        return Err(InputError::NotPositive { field: "amount" });
    }
    Ok(ActionCommand::SubmitApplication(ApplicationSubmission {
        loan_type: args.required(action, "loan_type")?.to_string(),
        amount,
        purpose: args.required(action, "purpose")?.to_string(),
        id_proof: args.attachment(action, "id_proof")?,
        income_proof: args.attachment(action, "income_proof")?,
        address_proof: args.attachment(action, "address_proof")?,
    }))
}

fn build_set_ticket_status(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::TicketSetStatus;
    let raw_status = args.required(action, "status")?;
    let status = TicketStatus::parse(raw_status).ok_or_else(|| InputError::InvalidArgument {
        action: action.as_str(),
        argument: "status",
        value: raw_status.to_string(),
    })?;
    Ok(ActionCommand::SetTicketStatus {
        ticket_id: args.id(action, "id")?,
        status,
    })
}

fn build_create_ticket(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::TicketCreate;
    let priority = match args.get("priority").map(str::trim).filter(|raw| !raw.is_empty()) {
        None => TicketPriority::default(),
        Some(raw) => TicketPriority::parse(raw).ok_or_else(|| InputError::InvalidArgument {
            action: action.as_str(),
            argument: "priority",
            value: raw.to_string(),
        })?,
    };
    Ok(ActionCommand::CreateTicket(TicketCreateRequest {
        subject: args.required(action, "subject")?.to_string(),
        message: args.required(action, "message")?.to_string(),
        priority,
    }))
}

fn build_submit_contact(args: &ActionArgs) -> Result<ActionCommand, InputError> {
    let action = ActionName::ContactSubmit;
    Ok(ActionCommand::SubmitContact(ContactSubmission {
        name: args.required(action, "name")?.to_string(),
        email: crate::session::normalize_email(args.required(action, "email")?)?,
        message: args.required(action, "message")?.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_parse() {
        for name in ActionName::ALL {
            assert_eq!(ActionName::parse(name.as_str()), Some(name));
        }
        assert_eq!(ActionName::parse("application.delete"), None);
    }

    #[test]
    fn application_decisions_refresh_admin_traffic_and_public() {
        for name in [
            ActionName::ApplicationApprove,
            ActionName::ApplicationReject,
            ActionName::ApplicationRequestDocs,
        ] {
            assert_eq!(
                name.affected_loaders(),
                &[LoaderKind::Admin, LoaderKind::SuperAdmin, LoaderKind::Public]
            );
        }
        assert!(ActionName::ContactSubmit.affected_loaders().is_empty());
    }

    #[test]
    fn every_ticket_write_refreshes_the_traffic_counters() {
        for name in [
            ActionName::ApplicationApprove,
            ActionName::ApplicationReject,
            ActionName::ApplicationRequestDocs,
            ActionName::TicketCreate,
            ActionName::TicketSetStatus,
        ] {
            assert!(
                name.affected_loaders().contains(&LoaderKind::SuperAdmin),
                "{} leaves traffic stale",
                name.as_str()
            );
        }
    }

    #[test]
    fn table_builds_typed_commands() {
        let table = CommandTable::standard();
        let command = table
            .build("application.approve", &ActionArgs::new().with("id", "42"))
            .expect("approve");
        assert_eq!(
            command,
            ActionCommand::ApproveApplication { application_id: 42 }
        );

        let command = table
            .build(
                "ticket.set_status",
                &ActionArgs::new().with("id", "9").with("status", "in_progress"),
            )
            .expect("set status");
        assert_eq!(
            command,
            ActionCommand::SetTicketStatus {
                ticket_id: 9,
                status: TicketStatus::InProgress,
            }
        );
    }

    #[test]
    fn create_ticket_defaults_priority_to_medium() {
        let command = CommandTable::standard()
            .build(
                "ticket.create",
                &ActionArgs::new()
                    .with("subject", "Loan status")
                    .with("message", "Any update?"),
            )
            .expect("create ticket");
        let request = match command {
            ActionCommand::CreateTicket(request) => request,
            other => panic!("unexpected command {other:?}"),
        };
        assert_eq!(request.priority, TicketPriority::Medium);
    }

    #[test]
    fn table_rejects_bad_input() {
        let table = CommandTable::standard();
        assert_eq!(
            table.build("application.delete", &ActionArgs::new()),
            Err(InputError::UnknownAction("application.delete".to_string()))
        );
        assert_eq!(
            table.build("application.request_docs", &ActionArgs::new().with("id", "42")),
            Err(InputError::MissingArgument {
                action: "application.request_docs",
                argument: "note",
            })
        );
        assert_eq!(
            table.build("application.approve", &ActionArgs::new().with("id", "forty-two")),
            Err(InputError::InvalidArgument {
                action: "application.approve",
                argument: "id",
                value: "forty-two".to_string(),
            })
        );
        assert_eq!(
            table.build(
                "ticket.set_status",
                &ActionArgs::new().with("id", "1").with("status", "closed")
            ),
            Err(InputError::InvalidArgument {
                action: "ticket.set_status",
                argument: "status",
                value: "closed".to_string(),
            })
        );
    }

    #[test]
    fn upload_requires_an_attachment() {
        let table = CommandTable::standard();
        let args = ActionArgs::new().with("id", "5");
        assert!(matches!(
            table.build("application.upload_document", &args),
            Err(InputError::MissingArgument {
                argument: "document",
                ..
            })
        ));
        let args = args.with_attachment("document", Attachment::new("slip.pdf", vec![1, 2, 3]));
        assert!(matches!(
            table.build("application.upload_document", &args),
            Ok(ActionCommand::UploadDocument {
                application_id: 5,
                ..
            })
        ));
    }

    #[test]
    fn unregistered_action_is_unknown() {
        let table = CommandTable::empty();
        assert!(!table.is_registered(ActionName::ApplicationApprove));
        assert_eq!(
            table.build("application.approve", &ActionArgs::new().with("id", "1")),
            Err(InputError::UnknownAction("application.approve".to_string()))
        );
    }
}
