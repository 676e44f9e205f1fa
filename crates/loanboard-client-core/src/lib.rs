#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

pub mod actions;
pub mod api;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod loaders;
pub mod models;
pub mod notify;
pub mod render;
pub mod session;
pub mod shell;
pub mod transport;

pub use actions::{ActionArgs, ActionCommand, ActionName, CommandTable};
pub use api::{ApplicationSubmission, ContactSubmission, DashboardApi};
pub use config::{ClientConfig, ConfigError};
pub use credential::{
    CREDENTIAL_SLOT_KEY, Credential, CredentialStore, CredentialStoreError, FileCredentialStore,
    MemoryCredentialStore,
};
pub use dispatch::{DispatchPlan, LoaderKind, Panel, PanelVisibility, dispatch};
pub use error::{ActionError, ApiError, ApiErrorKind, InputError};
pub use loaders::{LoadReport, ViewBoard, ViewId};
pub use models::{EmiQuote, EmiRequest, Identity, Role, TicketPriority, TicketStatus};
pub use notify::{Notification, NotificationSurface};
pub use render::status_badge_class;
pub use session::{LoginOutcome, SessionManager, SessionPhase, SessionResolution, SessionState};
pub use shell::{BootReport, DashboardShell, DispatchOutcome, ShellError};
pub use transport::{ApiRequest, ApiTransport, Attachment, HttpTransport, Payload};
