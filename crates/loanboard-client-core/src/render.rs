//! Markup for every dashboard view.
//!
//! Renderers are pure: the same records and context always produce the same
//! fragment. Empty collections render an explicit placeholder, never an empty
//! container. Action affordances carry `data-action` names from the
//! [`CommandTable`] and are emitted only for registered actions.

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::actions::{ActionName, CommandTable};
use crate::dispatch::{Panel, PanelVisibility};
use crate::models::{
    Application, EmiQuote, Faq, Identity, Partner, PublicStats, Review, Ticket, TicketStatus,
    TrafficStats,
};

pub const EMPTY_PLACEHOLDER_TEXT: &str = "No records found.";
pub const BADGE_APPROVED: &str = "approved";
pub const BADGE_REJECTED: &str = "rejected";
pub const BADGE_PENDING: &str = "pending";

/// Three-way badge rule shared by applications and tickets.
#[must_use]
pub fn status_badge_class(status: &str) -> &'static str {
    match status {
        "Approved" | "resolved" => BADGE_APPROVED,
        "Rejected" => BADGE_REJECTED,
        _ => BADGE_PENDING,
    }
}

/// Whose view of a collection is being rendered; decides the affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Owner,
    Reviewer,
}

#[must_use]
pub fn empty_placeholder() -> Markup {
    html! {
        p class="empty-state" { (EMPTY_PLACEHOLDER_TEXT) }
    }
}

#[must_use]
pub fn status_badge(status: &str) -> Markup {
    html! {
        span class={ "badge " (status_badge_class(status)) } { (status) }
    }
}

fn action_button(
    commands: &CommandTable,
    action: ActionName,
    id: u64,
    label: &str,
) -> Option<Markup> {
    commands.is_registered(action).then(|| {
        html! {
            button type="button" class="action" data-action=(action.as_str()) data-id=(id) {
                (label)
            }
        }
    })
}

#[must_use]
pub fn render_applications(
    applications: &[Application],
    audience: Audience,
    commands: &CommandTable,
) -> Markup {
    if applications.is_empty() {
        return empty_placeholder();
    }
    html! {
        div class="record-list applications" {
            @for application in applications {
                (application_row(application, audience, commands))
            }
        }
    }
}

fn application_row(
    application: &Application,
    audience: Audience,
    commands: &CommandTable,
) -> Markup {
    html! {
        article class="record application" data-id=(application.id) {
            header {
                h4 { "#" (application.id) " · " (application.loan_type) }
                (status_badge(&application.status))
            }
            dl {
                @if audience == Audience::Reviewer {
                    dt { "Client" }
                    dd { (application.client_name) " <" (application.client_email) ">" }
                }
                dt { "Amount" }
                dd { (format_amount(application.amount)) }
                dt { "Purpose" }
                dd { (application.purpose) }
                dt { "Documents" }
                dd { (application.documents.len() + application.additional_documents.len()) }
                dt { "Submitted" }
                dd { (application.created_at.format("%Y-%m-%d %H:%M")) }
                @if !application.admin_note.is_empty() {
                    dt { "Admin note" }
                    dd { (application.admin_note) }
                }
            }
            @if application.requires_additional_docs {
                p class="docs-required" {
                    "Additional documents required"
                    @if !application.required_docs_note.is_empty() {
                        ": " (application.required_docs_note)
                    }
                }
            }
            (application_actions(application, audience, commands))
        }
    }
}

fn application_actions(
    application: &Application,
    audience: Audience,
    commands: &CommandTable,
) -> Markup {
    match audience {
        Audience::Reviewer => html! {
            div class="actions" {
                @if let Some(button) = action_button(commands, ActionName::ApplicationApprove, application.id, "Approve") {
                    (button)
                }
                @if let Some(button) = action_button(commands, ActionName::ApplicationReject, application.id, "Reject") {
                    (button)
                }
                @if commands.is_registered(ActionName::ApplicationRequestDocs) {
                    input type="text" name="note" placeholder="Documents needed" data-arg="note";
                    @if let Some(button) = action_button(commands, ActionName::ApplicationRequestDocs, application.id, "Request docs") {
                        (button)
                    }
                }
            }
        },
        Audience::Owner => html! {
            @if application.requires_additional_docs && commands.is_registered(ActionName::ApplicationUploadDocument) {
                div class="actions" {
                    input type="file" name="document" data-arg="document";
                    @if let Some(button) = action_button(commands, ActionName::ApplicationUploadDocument, application.id, "Upload document") {
                        (button)
                    }
                }
            }
        },
    }
}

#[must_use]
pub fn render_tickets(tickets: &[Ticket], audience: Audience, commands: &CommandTable) -> Markup {
    if tickets.is_empty() {
        return empty_placeholder();
    }
    html! {
        div class="record-list tickets" {
            @for ticket in tickets {
                article class="record ticket" data-id=(ticket.id) {
                    header {
                        h4 { "#" (ticket.id) " · " (ticket.subject) }
                        (status_badge(&ticket.status))
                    }
                    p { (ticket.message) }
                    dl {
                        dt { "Priority" }
                        dd { (ticket.priority) }
                        @if audience == Audience::Reviewer {
                            dt { "Raised by" }
                            dd { (ticket.owner_name) " <" (ticket.owner_email) ">" }
                        }
                        dt { "Assigned to" }
                        dd { (ticket.assigned_admin_name.as_deref().unwrap_or("Unassigned")) }
                        dt { "Created" }
                        dd { (ticket.created_at.format("%Y-%m-%d %H:%M")) " by " (ticket.created_by) }
                    }
                    @if audience == Audience::Reviewer && commands.is_registered(ActionName::TicketSetStatus) {
                        div class="actions" {
                            select name="status" data-action=(ActionName::TicketSetStatus.as_str()) data-id=(ticket.id) data-arg="status" {
                                @for status in TicketStatus::ALL {
                                    option value=(status.as_str()) selected[status.as_str() == ticket.status] {
                                        (status.as_str())
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[must_use]
pub fn render_public_stats(stats: &PublicStats) -> Markup {
    html! {
        div class="stat-grid public-stats" {
            (stat_card("Applications", &stats.total_applications.to_string()))
            (stat_card("Approved", &stats.approved_applications.to_string()))
            (stat_card("Rejected", &stats.rejected_applications.to_string()))
            (stat_card("Pending", &stats.pending_applications.to_string()))
            (stat_card("Approval rate", &format!("{:.2}%", stats.approval_rate)))
            (stat_card("Disbursed", &format_amount(stats.total_disbursed_amount)))
        }
    }
}

#[must_use]
pub fn render_partners(partners: &[Partner]) -> Markup {
    if partners.is_empty() {
        return empty_placeholder();
    }
    html! {
        ul class="partners" {
            @for partner in partners {
                li { strong { (partner.name) } " " span class="muted" { (partner.category) } }
            }
        }
    }
}

#[must_use]
pub fn render_reviews(reviews: &[Review]) -> Markup {
    if reviews.is_empty() {
        return empty_placeholder();
    }
    html! {
        div class="reviews" {
            @for review in reviews {
                blockquote class="review" {
                    p { (review.text) }
                    footer {
                        (review.customer_name) " · " (review.product) " · "
                        span class="rating" { (rating_stars(review.rating)) }
                    }
                }
            }
        }
    }
}

#[must_use]
pub fn render_faqs(faqs: &[Faq]) -> Markup {
    if faqs.is_empty() {
        return empty_placeholder();
    }
    html! {
        div class="faqs" {
            @for faq in faqs {
                details {
                    summary { (faq.question) }
                    p { (faq.answer) }
                }
            }
        }
    }
}

#[must_use]
pub fn render_traffic(traffic: &TrafficStats) -> Markup {
    html! {
        div class="stat-grid traffic" {
            (stat_card("API events", &traffic.total_api_events.to_string()))
            (stat_card("Open tickets", &traffic.open_tickets.to_string()))
            (stat_card("In progress", &traffic.in_progress_tickets.to_string()))
            (stat_card("Resolved", &traffic.resolved_tickets.to_string()))
        }
        h4 { "Top paths" }
        @if traffic.top_paths.is_empty() {
            (empty_placeholder())
        } @else {
            table class="top-paths" {
                tr { th { "Path" } th { "Hits" } }
                @for entry in &traffic.top_paths {
                    tr { td { (entry.path) } td { (entry.count) } }
                }
            }
        }
        h4 { "Traffic by role" }
        @if traffic.role_breakdown.is_empty() {
            (empty_placeholder())
        } @else {
            table class="role-breakdown" {
                tr { th { "Role" } th { "Hits" } }
                @for entry in &traffic.role_breakdown {
                    tr { td { (entry.role) } td { (entry.count) } }
                }
            }
        }
    }
}

#[must_use]
pub fn render_emi(quote: &EmiQuote) -> Markup {
    html! {
        div class="stat-grid emi" {
            (stat_card("Monthly EMI", &format_amount(quote.emi)))
            (stat_card("Total payment", &format_amount(quote.total_payment)))
            (stat_card("Total interest", &format_amount(quote.total_interest)))
        }
    }
}

#[must_use]
pub fn render_notification(text: Option<&str>) -> Markup {
    html! {
        div id="notification" class="notification" hidden[text.is_none()] {
            @if let Some(text) = text {
                (text)
            }
        }
    }
}

fn stat_card(label: &str, value: &str) -> Markup {
    html! {
        div class="stat-card" {
            span class="stat-label" { (label) }
            strong class="stat-value" { (value) }
        }
    }
}

fn rating_stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("₹{amount:.2}")
}

/// Already-rendered fragments for one section; `None` means never loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionFragments<'a> {
    pub stats: Option<&'a str>,
    pub partners: Option<&'a str>,
    pub reviews: Option<&'a str>,
    pub faqs: Option<&'a str>,
    pub client_applications: Option<&'a str>,
    pub client_tickets: Option<&'a str>,
    pub admin_applications: Option<&'a str>,
    pub admin_tickets: Option<&'a str>,
    pub traffic: Option<&'a str>,
    pub emi: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardDocument<'a> {
    pub identity: Option<&'a Identity>,
    pub panels: PanelVisibility,
    pub notification: Option<&'a str>,
    pub fragments: SectionFragments<'a>,
}

#[must_use]
pub fn render_dashboard(document: &DashboardDocument<'_>) -> String {
    let fragments = &document.fragments;
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Loan Dashboard" }
            }
            body {
                header class="topbar" {
                    span class="brand" { "Loan Dashboard" }
                    @if let Some(identity) = document.identity {
                        span class="session-label" {
                            (identity.name) " · " (identity.role.as_str())
                        }
                    }
                }
                (render_notification(document.notification))
                section id="public" {
                    (fragment_slot("public-stats", "Platform at a glance", fragments.stats))
                    (fragment_slot("partners", "Partners", fragments.partners))
                    (fragment_slot("reviews", "Reviews", fragments.reviews))
                    (fragment_slot("faqs", "FAQs", fragments.faqs))
                    (fragment_slot("emi-result", "EMI calculator", fragments.emi))
                }
                section id=(Panel::AuthForms.as_str()) hidden[!document.panels.is_visible(Panel::AuthForms)] {
                    form id="login-form" { h3 { "Log in" } }
                    form id="register-form" { h3 { "Create account" } }
                }
                section id=(Panel::Client.as_str()) hidden[!document.panels.is_visible(Panel::Client)] {
                    (fragment_slot("client-applications", "My applications", fragments.client_applications))
                    (fragment_slot("client-tickets", "My tickets", fragments.client_tickets))
                }
                section id=(Panel::Admin.as_str()) hidden[!document.panels.is_visible(Panel::Admin)] {
                    (fragment_slot("admin-applications", "All applications", fragments.admin_applications))
                    (fragment_slot("admin-tickets", "All tickets", fragments.admin_tickets))
                }
                section id=(Panel::SuperAdmin.as_str()) hidden[!document.panels.is_visible(Panel::SuperAdmin)] {
                    (fragment_slot("traffic", "Traffic analytics", fragments.traffic))
                }
            }
        }
    };
    markup.into_string()
}

fn fragment_slot(id: &str, heading: &str, fragment: Option<&str>) -> Markup {
    html! {
        div id=(id) class="view" {
            h3 { (heading) }
            @if let Some(fragment) = fragment {
                (PreEscaped(fragment))
            } @else {
                p class="loading" { "Loading…" }
            }
        }
    }
}
