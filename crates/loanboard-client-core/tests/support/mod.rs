//! In-process stand-in for the loan service.
//!
//! Responses are scripted per `"METHOD /path"` key and every request is
//! recorded, so tests can assert exactly which endpoints a flow touched.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use loanboard_client_core::{
    Credential, CredentialStore, DashboardShell, HttpTransport, MemoryCredentialStore,
    NotificationSurface,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedCall {
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone, Default)]
struct StubState {
    routes: Arc<Mutex<HashMap<String, (StatusCode, Value)>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct ServiceStub {
    pub base_url: String,
    state: StubState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ServiceStub {
    pub async fn spawn() -> Result<Self> {
        let state = StubState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    pub async fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state
            .routes
            .lock()
            .await
            .insert(format!("{method} {path}"), (status, body));
    }

    pub async fn ok(&self, method: &str, path: &str, body: Value) {
        self.route(method, path, 200, body).await;
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().await.clone()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.calls().await.iter().map(RecordedCall::key).collect()
    }

    pub async fn find(&self, key: &str) -> Option<RecordedCall> {
        self.calls()
            .await
            .into_iter()
            .find(|call| call.key() == key)
    }

    pub async fn clear_calls(&self) {
        self.state.calls.lock().await.clear();
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Scripts every public endpoint with small fixed payloads.
    pub async fn seed_public(&self) {
        self.ok(
            "GET",
            "/api/public/stats",
            json!({
                "total_applications": 12, "approved_applications": 5,
                "rejected_applications": 2, "pending_applications": 5,
                "approval_rate": 41.67, "total_disbursed_amount": 2_500_000.0
            }),
        )
        .await;
        self.ok(
            "GET",
            "/api/public/partners",
            json!([{"name": "HDFC Bank", "category": "Bank"}]),
        )
        .await;
        self.ok(
            "GET",
            "/api/public/reviews",
            json!([{
                "customer_name": "Ravi",
                "product": "Personal Loan",
                "rating": 5,
                "text": "Quick approval"
            }]),
        )
        .await;
        self.ok(
            "GET",
            "/api/public/faqs",
            json!([{"question": "How long does approval take?", "answer": "Two working days."}]),
        )
        .await;
    }

    /// Scripts the identity endpoint and every role-gated list as empty.
    pub async fn seed_identity(&self, role: &str, name: &str) {
        self.ok("GET", "/api/auth/me", json!({"role": role, "name": name}))
            .await;
        for path in [
            "/api/applications/my",
            "/api/tickets/my",
            "/api/applications",
            "/api/tickets",
        ] {
            self.ok("GET", path, json!([])).await;
        }
        self.ok(
            "GET",
            "/api/super-admin/traffic",
            json!({
                "total_api_events": 340, "open_tickets": 3,
                "in_progress_tickets": 1, "resolved_tickets": 8,
                "top_paths": [{"path": "/api/public/stats", "count": 120}],
                "role_breakdown": [{"role": "client", "count": 200}]
            }),
        )
        .await;
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let call = RecordedCall {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        authorization: header_text(header::AUTHORIZATION),
        request_id: header_text(header::HeaderName::from_static("x-request-id")),
        content_type: header_text(header::CONTENT_TYPE),
        body: body.to_vec(),
    };
    let key = call.key();
    state.calls.lock().await.push(call);

    match state.routes.lock().await.get(&key).cloned() {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))).into_response(),
    }
}

pub fn application_json(id: u64, status: &str) -> Value {
    json!({
        "id": id, "client_id": 3, "client_name": "Asha", "client_email": "asha@example.com",
        "loan_type": "Home Loan", "amount": 250000.0, "purpose": "renovation",
        "documents": ["3_id.pdf", "3_income.pdf", "3_address.pdf"],
        "additional_documents": [],
        "status": status, "admin_note": "", "requires_additional_docs": false,
        "required_docs_note": "", "created_at": "2024-05-01T09:30:00"
    })
}

pub fn ticket_json(id: u64, status: &str) -> Value {
    json!({
        "id": id, "owner_id": 3, "owner_name": "Asha", "owner_email": "asha@example.com",
        "assigned_admin_id": 1, "assigned_admin_name": "Platform Admin",
        "subject": "Loan status", "message": "Any update?", "priority": "medium",
        "status": status, "created_by": "client", "created_at": "2024-05-02T11:00:00"
    })
}

pub const TEST_NOTIFICATION_TTL: Duration = Duration::from_secs(60);

pub fn shell_with_store(
    stub: &ServiceStub,
    store: Arc<dyn CredentialStore>,
) -> Result<DashboardShell> {
    let transport = HttpTransport::new(&stub.base_url)?;
    Ok(DashboardShell::new(
        Arc::new(transport),
        store,
        NotificationSurface::new(TEST_NOTIFICATION_TTL),
    )?)
}

pub fn anonymous_shell(stub: &ServiceStub) -> Result<DashboardShell> {
    shell_with_store(stub, Arc::new(MemoryCredentialStore::new()))
}

pub fn shell_with_token(stub: &ServiceStub, token: &str) -> Result<DashboardShell> {
    let credential =
        Credential::new(token).ok_or_else(|| anyhow::anyhow!("token must not be blank"))?;
    shell_with_store(
        stub,
        Arc::new(MemoryCredentialStore::with_credential(credential)),
    )
}
