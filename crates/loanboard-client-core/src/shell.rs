//! The dashboard shell: boot, session transitions, mutation actions, and the
//! refresh that follows them.
//!
//! Every failure is converted into a notification at this boundary. Methods
//! still return the error so callers (the CLI, tests) can inspect it.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::actions::{ActionArgs, ActionCommand, CommandTable};
use crate::api::DashboardApi;
use crate::config::{ClientConfig, ConfigError};
use crate::credential::{CredentialStore, CredentialStoreError, FileCredentialStore};
use crate::dispatch::{DispatchPlan, LoaderKind, dispatch};
use crate::error::{ActionError, InputError};
use crate::loaders::{LoadReport, ViewBoard, ViewId, loader_views, run_loaders};
use crate::models::{EmiQuote, EmiRequest, Identity, Role};
use crate::notify::NotificationSurface;
use crate::render::{self, DashboardDocument, SectionFragments};
use crate::session::{LoginOutcome, SessionManager, SessionPhase, SessionResolution};
use crate::transport::{ApiTransport, HttpTransport};

pub const LOGGED_OUT_MESSAGE: &str = "Logged out";
pub const REGISTERED_MESSAGE: &str = "Registration successful. Please log in.";
pub const SESSION_NOT_SAVED_MESSAGE: &str =
    "Your session could not be saved and will end when this dashboard closes.";

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    CredentialStore(#[from] CredentialStoreError),
}

/// Outcome of one resolve-and-dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub resolution: SessionResolution,
    pub plan: DispatchPlan,
    pub report: LoadReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub public: LoadReport,
    pub dispatch: DispatchOutcome,
}

pub struct DashboardShell {
    api: DashboardApi,
    session: SessionManager,
    notifications: NotificationSurface,
    board: ViewBoard,
    commands: CommandTable,
    plan: RwLock<DispatchPlan>,
    emi_fragment: Mutex<Option<String>>,
}

impl DashboardShell {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        store: Arc<dyn CredentialStore>,
        notifications: NotificationSurface,
    ) -> Result<Self, CredentialStoreError> {
        let api = DashboardApi::new(transport);
        let session = SessionManager::new(api.clone(), store)?;
        Ok(Self {
            api,
            session,
            notifications,
            board: ViewBoard::new(),
            commands: CommandTable::standard(),
            plan: RwLock::new(dispatch(None)),
            emi_fragment: Mutex::new(None),
        })
    }

    /// HTTP transport plus file-backed credential slot, per `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ShellError> {
        let transport = HttpTransport::new(&config.base_url)?;
        let store = FileCredentialStore::new(config.state_path.clone());
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(store),
            NotificationSurface::new(config.notification_ttl),
        )?)
    }

    #[must_use]
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationSurface {
        &self.notifications
    }

    #[must_use]
    pub fn board(&self) -> &ViewBoard {
        &self.board
    }

    #[must_use]
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    #[must_use]
    pub fn plan(&self) -> DispatchPlan {
        self.plan
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Page load: public content loads alongside session resolution and
    /// the role loaders that follow it.
    pub async fn boot(&self) -> BootReport {
        info!("dashboard boot");
        let (public, dispatch) = tokio::join!(
            self.run_loaders(&[LoaderKind::Public]),
            self.resolve_and_dispatch()
        );
        BootReport { public, dispatch }
    }

    /// Re-derives identity from the stored credential, then dispatches.
    /// A rejected credential is purged here and the pass converges on the
    /// anonymous view without further input.
    pub async fn resolve_and_dispatch(&self) -> DispatchOutcome {
        let resolution = self.session.resolve().await;
        if let Some(error) = &resolution.rejected {
            self.notifications.notify(error.to_string());
        }
        let (plan, report) = self.dispatch_role(resolution.role()).await;
        DispatchOutcome {
            resolution,
            plan,
            report,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ActionError> {
        match self.session.login(email, password).await {
            Ok(LoginOutcome {
                identity,
                persist_error,
            }) => {
                let mut message = format!("Welcome back, {}", identity.name);
                if persist_error.is_some() {
                    message.push_str(". ");
                    message.push_str(SESSION_NOT_SAVED_MESSAGE);
                }
                self.notifications.notify(message);
                self.dispatch_role(Some(identity.role)).await;
                Ok(identity)
            }
            Err(error) => {
                self.notifications.notify(error.to_string());
                if self.session.phase() != SessionPhase::Authenticated {
                    self.dispatch_role(None).await;
                }
                Err(error)
            }
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ActionError> {
        let outcome = self.session.register(name, email, password).await;
        match &outcome {
            Ok(_) => self.notifications.notify(REGISTERED_MESSAGE),
            Err(error) => self.notifications.notify(error.to_string()),
        };
        outcome
    }

    pub async fn logout(&self) -> DispatchOutcome {
        self.session.logout();
        self.notifications.notify(LOGGED_OUT_MESSAGE);
        self.resolve_and_dispatch().await
    }

    /// Performs one mutation. On success the affected views are re-fetched;
    /// on failure nothing is refreshed.
    pub async fn run_action(&self, command: ActionCommand) -> Result<String, ActionError> {
        let name = command.name();
        let affected = command.affected_loaders();
        let credential = self.session.credential();
        match command.execute(&self.api, credential.as_ref()).await {
            Ok(message) => {
                self.notifications.notify(message.clone());
                let refresh = self.refresh_set(affected);
                debug!(
                    action = name.as_str(),
                    loaders = ?refresh.iter().map(|kind| kind.as_str()).collect::<Vec<_>>(),
                    "refreshing affected loaders"
                );
                self.run_loaders(&refresh).await;
                Ok(message)
            }
            Err(error) => {
                warn!(
                    action = name.as_str(),
                    status = error.status_code,
                    message = %error.message,
                    "action failed"
                );
                self.notifications.notify(error.to_string());
                Err(error.into())
            }
        }
    }

    /// Looks `name` up in the command table and runs it.
    pub async fn dispatch_action(
        &self,
        name: &str,
        args: &ActionArgs,
    ) -> Result<String, ActionError> {
        let command = match self.commands.build(name, args) {
            Ok(command) => command,
            Err(error) => {
                self.notifications.notify(error.to_string());
                return Err(error.into());
            }
        };
        self.run_action(command).await
    }

    /// Read-only quote; refreshes nothing.
    pub async fn calculate_emi(&self, request: EmiRequest) -> Result<EmiQuote, ActionError> {
        let outcome = match validate_emi(&request) {
            Ok(()) => self
                .api
                .calculate_emi(&request)
                .await
                .map_err(ActionError::from),
            Err(error) => Err(error.into()),
        };
        match &outcome {
            Ok(quote) => {
                *self
                    .emi_fragment
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) =
                    Some(render::render_emi(quote).into_string());
            }
            Err(error) => {
                self.notifications.notify(error.to_string());
            }
        }
        outcome
    }

    /// Loaders to re-run after a write: affected ∩ (active ∪ public).
    #[must_use]
    pub fn refresh_set(&self, affected: &[LoaderKind]) -> Vec<LoaderKind> {
        let plan = self.plan();
        LoaderKind::ALL
            .into_iter()
            .filter(|kind| affected.contains(kind) && plan.runs(*kind))
            .collect()
    }

    #[must_use]
    pub fn render_dashboard(&self) -> String {
        let plan = self.plan();
        let identity = self.session.identity();
        let notification = self.notifications.current_text();
        let fragments = self.board.fragments();
        let emi = self
            .emi_fragment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let view = |id: ViewId| fragments.get(&id).map(String::as_str);
        render::render_dashboard(&DashboardDocument {
            identity: identity.as_ref(),
            panels: plan.panels,
            notification: notification.as_deref(),
            fragments: SectionFragments {
                stats: view(ViewId::PublicStats),
                partners: view(ViewId::Partners),
                reviews: view(ViewId::Reviews),
                faqs: view(ViewId::Faqs),
                client_applications: view(ViewId::ClientApplications),
                client_tickets: view(ViewId::ClientTickets),
                admin_applications: view(ViewId::AdminApplications),
                admin_tickets: view(ViewId::AdminTickets),
                traffic: view(ViewId::Traffic),
                emi: emi.as_deref(),
            },
        })
    }

    async fn dispatch_role(&self, role: Option<Role>) -> (DispatchPlan, LoadReport) {
        let plan = dispatch(role);
        let previous = {
            let mut current = self.plan.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, plan.clone())
        };

        let hidden: Vec<ViewId> = LoaderKind::ALL
            .into_iter()
            .filter(|kind| previous.runs(*kind) && !plan.runs(*kind))
            .flat_map(|kind| loader_views(kind).iter().copied())
            .collect();
        if !hidden.is_empty() {
            debug!(views = hidden.len(), "invalidating views of hidden panels");
            self.board.invalidate(&hidden);
        }

        info!(
            role = role.map_or("anonymous", Role::as_str),
            loaders = plan.loaders.len(),
            "panels dispatched"
        );
        let report = self.run_loaders(&plan.loaders).await;
        (plan, report)
    }

    async fn run_loaders(&self, kinds: &[LoaderKind]) -> LoadReport {
        if kinds.is_empty() {
            return LoadReport::default();
        }
        let credential = self.session.credential();
        let report = run_loaders(
            kinds,
            &self.api,
            credential.as_ref(),
            &self.commands,
            &self.board,
        )
        .await;
        for (_, error) in &report.failures {
            self.notifications.notify(error.to_string());
        }
        report
    }
}

fn validate_emi(request: &EmiRequest) -> Result<(), InputError> {
    if request.principal.is_nan() || request.principal <= 0.0 {
        return Err(InputError::NotPositive { field: "principal" });
    }
    if request.annual_rate.is_nan() || request.annual_rate <= 0.0 {
        return Err(InputError::NotPositive {
            field: "annual_rate",
        });
    }
    if request.months == 0 {
        return Err(InputError::NotPositive { field: "months" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emi_inputs_must_be_positive() {
        let valid = EmiRequest {
            principal: 100_000.0,
            annual_rate: 9.5,
            months: 12,
        };
        assert_eq!(validate_emi(&valid), Ok(()));
        assert_eq!(
            validate_emi(&EmiRequest {
                principal: 0.0,
                ..valid
            }),
            Err(InputError::NotPositive { field: "principal" })
        );
        assert_eq!(
            validate_emi(&EmiRequest {
                annual_rate: f64::NAN,
                ..valid
            }),
            Err(InputError::NotPositive {
                field: "annual_rate"
            })
        );
        assert_eq!(
            validate_emi(&EmiRequest { months: 0, ..valid }),
            Err(InputError::NotPositive { field: "months" })
        );
    }
}
