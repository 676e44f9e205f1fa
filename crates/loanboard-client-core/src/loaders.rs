//! Per-role data loaders and the view board they commit into.
//!
//! A loader fetches its sibling resources with an all-or-nothing join and
//! renders one fragment per view. Loaders for different roles run as
//! independent futures: one failing never blocks another's commit.
//!
//! Every view carries a monotonically increasing load sequence. A run takes
//! a ticket per view before it fetches, and its fragment is committed only if
//! no newer ticket for that view was issued in the meantime.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::actions::CommandTable;
use crate::api::DashboardApi;
use crate::credential::Credential;
use crate::dispatch::LoaderKind;
use crate::error::ApiError;
use crate::render::{self, Audience};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewId {
    PublicStats,
    Partners,
    Reviews,
    Faqs,
    ClientApplications,
    ClientTickets,
    AdminApplications,
    AdminTickets,
    Traffic,
}

impl ViewId {
    pub const ALL: [Self; 9] = [
        Self::PublicStats,
        Self::Partners,
        Self::Reviews,
        Self::Faqs,
        Self::ClientApplications,
        Self::ClientTickets,
        Self::AdminApplications,
        Self::AdminTickets,
        Self::Traffic,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicStats => "public-stats",
            Self::Partners => "partners",
            Self::Reviews => "reviews",
            Self::Faqs => "faqs",
            Self::ClientApplications => "client-applications",
            Self::ClientTickets => "client-tickets",
            Self::AdminApplications => "admin-applications",
            Self::AdminTickets => "admin-tickets",
            Self::Traffic => "traffic",
        }
    }

    #[must_use]
    pub fn loader(self) -> LoaderKind {
        match self {
            Self::PublicStats | Self::Partners | Self::Reviews | Self::Faqs => LoaderKind::Public,
            Self::ClientApplications | Self::ClientTickets => LoaderKind::Client,
            Self::AdminApplications | Self::AdminTickets => LoaderKind::Admin,
            Self::Traffic => LoaderKind::SuperAdmin,
        }
    }
}

/// Views a loader renders into.
#[must_use]
pub fn loader_views(kind: LoaderKind) -> &'static [ViewId] {
    match kind {
        LoaderKind::Public => &[
            ViewId::PublicStats,
            ViewId::Partners,
            ViewId::Reviews,
            ViewId::Faqs,
        ],
        LoaderKind::Client => &[ViewId::ClientApplications, ViewId::ClientTickets],
        LoaderKind::Admin => &[ViewId::AdminApplications, ViewId::AdminTickets],
        LoaderKind::SuperAdmin => &[ViewId::Traffic],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket {
    pub view: ViewId,
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct ViewSlot {
    issued: u64,
    committed_sequence: u64,
    fragment: Option<String>,
}

/// Result of committing one batch of fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub committed: Vec<ViewId>,
    pub discarded: Vec<ViewId>,
}

/// Latest rendered fragment for every view.
#[derive(Debug, Default)]
pub struct ViewBoard {
    slots: Mutex<BTreeMap<ViewId, ViewSlot>>,
}

impl ViewBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh ticket for each view, superseding older ones.
    pub fn issue(&self, views: &[ViewId]) -> Vec<LoadTicket> {
        let mut slots = self.lock();
        views
            .iter()
            .map(|view| {
                let slot = slots.entry(*view).or_default();
                slot.issued += 1;
                LoadTicket {
                    view: *view,
                    sequence: slot.issued,
                }
            })
            .collect()
    }

    /// Commits every fragment whose ticket is still the latest for its view,
    /// all under a single lock so the batch becomes visible at once.
    pub fn commit(&self, batch: Vec<(LoadTicket, String)>) -> CommitReport {
        let mut report = CommitReport::default();
        let mut slots = self.lock();
        for (ticket, fragment) in batch {
            let slot = slots.entry(ticket.view).or_default();
            if ticket.sequence == slot.issued {
                slot.committed_sequence = ticket.sequence;
                slot.fragment = Some(fragment);
                report.committed.push(ticket.view);
            } else {
                debug!(
                    view = ticket.view.as_str(),
                    ticket = ticket.sequence,
                    latest = slot.issued,
                    "discarding stale view result"
                );
                report.discarded.push(ticket.view);
            }
        }
        report
    }

    /// Supersedes any in-flight load for `views` and drops their content.
    pub fn invalidate(&self, views: &[ViewId]) {
        let mut slots = self.lock();
        for view in views {
            let slot = slots.entry(*view).or_default();
            slot.issued += 1;
            slot.fragment = None;
        }
    }

    #[must_use]
    pub fn fragment(&self, view: ViewId) -> Option<String> {
        self.lock()
            .get(&view)
            .and_then(|slot| slot.fragment.clone())
    }

    #[must_use]
    pub fn latest_sequence(&self, view: ViewId) -> u64 {
        self.lock().get(&view).map_or(0, |slot| slot.issued)
    }

    #[must_use]
    pub fn committed_sequence(&self, view: ViewId) -> u64 {
        self.lock()
            .get(&view)
            .map_or(0, |slot| slot.committed_sequence)
    }

    /// Copy of every committed fragment.
    #[must_use]
    pub fn fragments(&self) -> BTreeMap<ViewId, String> {
        self.lock()
            .iter()
            .filter_map(|(view, slot)| slot.fragment.clone().map(|fragment| (*view, fragment)))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ViewId, ViewSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fetches everything `kind` needs and renders one fragment per view.
pub async fn load_views(
    kind: LoaderKind,
    api: &DashboardApi,
    credential: Option<&Credential>,
    commands: &CommandTable,
) -> Result<Vec<(ViewId, String)>, ApiError> {
    let views = match kind {
        LoaderKind::Public => {
            let (stats, partners, reviews, faqs) = tokio::try_join!(
                api.public_stats(),
                api.public_partners(),
                api.public_reviews(),
                api.public_faqs(),
            )?;
            vec![
                (ViewId::PublicStats, render::render_public_stats(&stats)),
                (ViewId::Partners, render::render_partners(&partners)),
                (ViewId::Reviews, render::render_reviews(&reviews)),
                (ViewId::Faqs, render::render_faqs(&faqs)),
            ]
        }
        LoaderKind::Client => {
            let (applications, tickets) = tokio::try_join!(
                api.my_applications(credential),
                api.my_tickets(credential),
            )?;
            vec![
                (
                    ViewId::ClientApplications,
                    render::render_applications(&applications, Audience::Owner, commands),
                ),
                (
                    ViewId::ClientTickets,
                    render::render_tickets(&tickets, Audience::Owner, commands),
                ),
            ]
        }
        LoaderKind::Admin => {
            let (applications, tickets) = tokio::try_join!(
                api.all_applications(credential),
                api.all_tickets(credential),
            )?;
            vec![
                (
                    ViewId::AdminApplications,
                    render::render_applications(&applications, Audience::Reviewer, commands),
                ),
                (
                    ViewId::AdminTickets,
                    render::render_tickets(&tickets, Audience::Reviewer, commands),
                ),
            ]
        }
        LoaderKind::SuperAdmin => {
            let traffic = api.traffic(credential).await?;
            vec![(ViewId::Traffic, render::render_traffic(&traffic))]
        }
    };
    Ok(views
        .into_iter()
        .map(|(view, markup)| (view, markup.into_string()))
        .collect())
}

/// What one concurrent loader run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub succeeded: Vec<LoaderKind>,
    pub failures: Vec<(LoaderKind, ApiError)>,
    pub commit: CommitReport,
}

impl LoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs `kinds` concurrently, then commits every successful loader's
/// fragments to `board` in one batch once all of them have settled.
pub async fn run_loaders(
    kinds: &[LoaderKind],
    api: &DashboardApi,
    credential: Option<&Credential>,
    commands: &CommandTable,
    board: &ViewBoard,
) -> LoadReport {
    let runs = kinds.iter().map(move |kind| {
        let tickets = board.issue(loader_views(*kind));
        async move {
            debug!(loader = kind.as_str(), "loader started");
            let outcome = load_views(*kind, api, credential, commands).await;
            (*kind, tickets, outcome)
        }
    });
    let outcomes = join_all(runs).await;

    let mut report = LoadReport::default();
    let mut batch = Vec::new();
    for (kind, tickets, outcome) in outcomes {
        match outcome {
            Ok(fragments) => {
                for (view, fragment) in fragments {
                    if let Some(ticket) = tickets.iter().find(|ticket| ticket.view == view) {
                        batch.push((*ticket, fragment));
                    }
                }
                report.succeeded.push(kind);
            }
            Err(error) => {
                warn!(
                    loader = kind.as_str(),
                    status = error.status_code,
                    kind = error.kind.as_str(),
                    message = %error.message,
                    "loader failed"
                );
                report.failures.push((kind, error));
            }
        }
    }
    report.commit = board.commit(batch);
    info!(
        succeeded = report.succeeded.len(),
        failed = report.failures.len(),
        committed = report.commit.committed.len(),
        discarded = report.commit.discarded.len(),
        "loaders settled"
    );
    report
}
