//! In-process stub of the ledger backend for integration tests.
//!
//! State lives in memory. Scan jobs follow a [`ScanScript`] so tests can
//! decide how many polls report `scanning` before a job finishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use staylog_core::attachment::{Attachment, AttachmentRef};
use staylog_core::booking::{Booking, CreateBooking};
use staylog_core::earning::{CreateEarning, Earning};
use staylog_core::expense::{CreateExpense, Expense};
use staylog_core::property::{CreateProperty, Property, UpdateProperty};
use staylog_core::scan::{ScanReport, ScanTicket, StartScan};
use staylog_core::stats::{
    share_percent, EarningsBreakdown, ExpensesBreakdown, MonthlyStats, PropertyAmount,
};
use tokio::net::TcpListener;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// How the stub answers status queries for scan jobs.
#[derive(Debug, Clone)]
pub struct ScanScript {
    /// Number of `scanning` reports before the job resolves.
    pub polls_before_done: u32,
    /// Output returned with `completed`.
    pub output: Value,
    /// When set, the job resolves to `failed` with this message instead.
    pub fail_with: Option<String>,
}

impl Default for ScanScript {
    fn default() -> Self {
        Self {
            polls_before_done: 0,
            output: json!({}),
            fail_with: None,
        }
    }
}

#[derive(Default)]
struct StubData {
    properties: Vec<Property>,
    bookings: Vec<Booking>,
    earnings: Vec<Earning>,
    expenses: Vec<Expense>,
    attachments: Vec<Attachment>,
    /// Status queries served per scan task.
    scans: HashMap<String, u32>,
}

pub struct StubBackend {
    api_key: Option<String>,
    data: Mutex<StubData>,
    script: Mutex<ScanScript>,
    status_polls: AtomicU32,
}

impl StubBackend {
    pub fn set_scan_script(&self, script: ScanScript) {
        *self.script.lock().unwrap() = script;
    }

    /// Total status queries served across all scan jobs.
    pub fn status_polls(&self) -> u32 {
        self.status_polls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubData> {
        self.data.lock().unwrap()
    }
}

pub type StubState = Arc<StubBackend>;

/// Build the stub router. With `api_key`, every route except health
/// requires `Authorization: Bearer <api_key>`.
pub fn stub_router(api_key: Option<String>) -> (Router, StubState) {
    let state = Arc::new(StubBackend {
        api_key,
        data: Mutex::new(StubData::default()),
        script: Mutex::new(ScanScript::default()),
        status_polls: AtomicU32::new(0),
    });

    let public = Router::new().route("/api/health", get(|| async { Json(json!({"status": "ok"})) }));

    let protected = Router::new()
        .route("/api/properties", get(list_properties).post(create_property))
        .route(
            "/api/properties/{id}",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route(
            "/api/properties/{id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route("/api/attachments/{id}", delete(delete_attachment))
        .route("/api/attachments/{id}/download", get(download_attachment))
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/{id}", delete(delete_booking))
        .route("/api/earnings", get(list_earnings).post(create_earning))
        .route("/api/earnings/{id}", delete(delete_earning))
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/{id}", delete(delete_expense))
        .route("/api/stats/monthly", get(monthly_stats))
        .route("/api/agent/scan", post(start_scan))
        .route("/api/agent/scan/{task_id}", get(scan_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let router = public
        .merge(protected)
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .with_state(state.clone());
    (router, state)
}

/// A running stub server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub state: StubState,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn the stub on a random port without authentication.
pub async fn spawn_test_server() -> TestServer {
    spawn_with(None).await
}

/// Spawn the stub requiring the given bearer token.
pub async fn spawn_test_server_with_auth(api_key: &str) -> TestServer {
    spawn_with(Some(api_key.to_string())).await
}

async fn spawn_with(api_key: Option<String>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let (app, state) = stub_router(api_key);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        state,
        _handle: handle,
    }
}

async fn require_bearer(State(state): State<StubState>, request: Request, next: Next) -> Response {
    let expected = match &state.api_key {
        Some(key) => key,
        None => return next.run(request).await,
    };
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if token == Some(expected.as_str()) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "session expired" })),
        )
            .into_response()
    }
}

fn error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": msg.into() })))
}

fn not_found(what: &str, id: &str) -> (StatusCode, Json<Value>) {
    error(StatusCode::NOT_FOUND, format!("{what} {id} not found"))
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Deserialize)]
struct PropertyFilter {
    property_id: Option<String>,
}

// -- Properties --

async fn list_properties(State(state): State<StubState>) -> ApiResult {
    Ok(Json(json!(state.lock().properties)))
}

async fn get_property(State(state): State<StubState>, Path(id): Path<String>) -> ApiResult {
    let data = state.lock();
    data.properties
        .iter()
        .find(|p| p.id == id)
        .map(|p| Json(json!(p)))
        .ok_or_else(|| not_found("property", &id))
}

async fn create_property(
    State(state): State<StubState>,
    Json(input): Json<CreateProperty>,
) -> ApiResult {
    if input.name.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "name is required"));
    }
    let now = Utc::now();
    let property = Property {
        id: new_id(),
        name: input.name,
        address: input.address,
        rooms: input.rooms,
        created_at: now,
        updated_at: now,
    };
    state.lock().properties.push(property.clone());
    Ok(Json(json!(property)))
}

async fn update_property(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateProperty>,
) -> ApiResult {
    let mut data = state.lock();
    let property = data
        .properties
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| not_found("property", &id))?;
    if let Some(name) = update.name {
        property.name = name;
    }
    if let Some(address) = update.address {
        property.address = address;
    }
    if update.rooms.is_some() {
        property.rooms = update.rooms;
    }
    property.updated_at = Utc::now();
    Ok(Json(json!(property)))
}

async fn delete_property(
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.lock();
    let before = data.properties.len();
    data.properties.retain(|p| p.id != id);
    if data.properties.len() == before {
        return Err(not_found("property", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Attachments --

async fn list_attachments(State(state): State<StubState>, Path(id): Path<String>) -> ApiResult {
    let data = state.lock();
    let items: Vec<&Attachment> = data
        .attachments
        .iter()
        .filter(|a| a.property_id == id)
        .collect();
    Ok(Json(json!(items)))
}

async fn upload_attachment(
    State(state): State<StubState>,
    Path(property_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult {
    if !state.lock().properties.iter().any(|p| p.id == property_id) {
        return Err(not_found("property", &property_id));
    }
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let label = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(String::from);
        let data = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let attachment = Attachment {
            id: new_id(),
            property_id,
            label,
            content_type,
            size_bytes: data.len() as i64,
            created_at: Utc::now(),
        };
        let reference: AttachmentRef = attachment.to_ref();
        state.lock().attachments.push(attachment);
        return Ok(Json(json!(reference)));
    }
    Err(error(StatusCode::BAD_REQUEST, "missing file field"))
}

async fn download_attachment(State(state): State<StubState>, Path(id): Path<String>) -> ApiResult {
    let data = state.lock();
    let attachment = data
        .attachments
        .iter()
        .find(|a| a.id == id)
        .ok_or_else(|| not_found("attachment", &id))?;
    Ok(Json(json!({
        "url": format!("https://files.invalid/{}/{}", attachment.id, attachment.label)
    })))
}

async fn delete_attachment(
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.lock();
    let before = data.attachments.len();
    data.attachments.retain(|a| a.id != id);
    if data.attachments.len() == before {
        return Err(not_found("attachment", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Bookings / earnings / expenses --

async fn list_bookings(
    State(state): State<StubState>,
    Query(q): Query<PropertyFilter>,
) -> ApiResult {
    let data = state.lock();
    let items: Vec<&Booking> = data
        .bookings
        .iter()
        .filter(|b| q.property_id.as_deref().map_or(true, |pid| b.property_id == pid))
        .collect();
    Ok(Json(json!(items)))
}

async fn create_booking(
    State(state): State<StubState>,
    Json(input): Json<CreateBooking>,
) -> ApiResult {
    input
        .validate()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let booking = Booking {
        id: new_id(),
        property_id: input.property_id,
        guest_name: input.guest_name,
        check_in: input.check_in,
        check_out: input.check_out,
        guests: input.guests,
        amount: input.amount,
        channel: input.channel,
        attachment_id: input.attachment_id,
        created_at: Utc::now(),
    };
    state.lock().bookings.push(booking.clone());
    Ok(Json(json!(booking)))
}

async fn delete_booking(
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.lock();
    let before = data.bookings.len();
    data.bookings.retain(|b| b.id != id);
    if data.bookings.len() == before {
        return Err(not_found("booking", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_earnings(
    State(state): State<StubState>,
    Query(q): Query<PropertyFilter>,
) -> ApiResult {
    let data = state.lock();
    let items: Vec<&Earning> = data
        .earnings
        .iter()
        .filter(|e| q.property_id.as_deref().map_or(true, |pid| e.property_id == pid))
        .collect();
    Ok(Json(json!(items)))
}

async fn create_earning(
    State(state): State<StubState>,
    Json(input): Json<CreateEarning>,
) -> ApiResult {
    input
        .validate()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let earning = Earning {
        id: new_id(),
        property_id: input.property_id,
        amount: input.amount,
        date: input.date,
        description: input.description,
        booking_id: input.booking_id,
        attachment_id: input.attachment_id,
        created_at: Utc::now(),
    };
    state.lock().earnings.push(earning.clone());
    Ok(Json(json!(earning)))
}

async fn delete_earning(
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.lock();
    let before = data.earnings.len();
    data.earnings.retain(|e| e.id != id);
    if data.earnings.len() == before {
        return Err(not_found("earning", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_expenses(
    State(state): State<StubState>,
    Query(q): Query<PropertyFilter>,
) -> ApiResult {
    let data = state.lock();
    let items: Vec<&Expense> = data
        .expenses
        .iter()
        .filter(|e| q.property_id.as_deref().map_or(true, |pid| e.property_id == pid))
        .collect();
    Ok(Json(json!(items)))
}

async fn create_expense(
    State(state): State<StubState>,
    Json(input): Json<CreateExpense>,
) -> ApiResult {
    input
        .validate()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let expense = Expense {
        id: new_id(),
        property_id: input.property_id,
        amount: input.amount,
        date: input.date,
        category: input.category,
        description: input.description,
        attachment_id: input.attachment_id,
        created_at: Utc::now(),
    };
    state.lock().expenses.push(expense.clone());
    Ok(Json(json!(expense)))
}

async fn delete_expense(
    State(state): State<StubState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut data = state.lock();
    let before = data.expenses.len();
    data.expenses.retain(|e| e.id != id);
    if data.expenses.len() == before {
        return Err(not_found("expense", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Stats --

#[derive(Debug, Deserialize)]
struct MonthQuery {
    month: u32,
    year: i32,
}

fn in_month(date: NaiveDate, q: &MonthQuery) -> bool {
    date.month() == q.month && date.year() == q.year
}

fn add_amount(rows: &mut Vec<PropertyAmount>, data: &StubData, property_id: &str, amount: f64) {
    match rows.iter_mut().find(|r| r.property_id == property_id) {
        Some(row) => row.amount += amount,
        None => {
            let property_name = data
                .properties
                .iter()
                .find(|p| p.id == property_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            rows.push(PropertyAmount {
                property_id: property_id.to_string(),
                property_name,
                amount,
                percentage: 0.0,
            });
        }
    }
}

async fn monthly_stats(State(state): State<StubState>, Query(q): Query<MonthQuery>) -> ApiResult {
    if !(1..=12).contains(&q.month) {
        return Err(error(StatusCode::BAD_REQUEST, "month must be 1-12"));
    }
    let data = state.lock();

    let mut earnings = EarningsBreakdown::default();
    let mut booking_count = 0;
    for b in data.bookings.iter().filter(|b| in_month(b.check_in, &q)) {
        booking_count += 1;
        earnings.total_amount += b.amount;
        add_amount(&mut earnings.by_property, &data, &b.property_id, b.amount);
    }
    for e in data.earnings.iter().filter(|e| in_month(e.date, &q)) {
        earnings.total_amount += e.amount;
        add_amount(&mut earnings.by_property, &data, &e.property_id, e.amount);
    }
    for row in &mut earnings.by_property {
        row.percentage = share_percent(row.amount, earnings.total_amount);
    }

    let mut expenses = ExpensesBreakdown::default();
    for x in data.expenses.iter().filter(|x| in_month(x.date, &q)) {
        expenses.total_amount += x.amount;
        add_amount(&mut expenses.by_property, &data, &x.property_id, x.amount);
    }
    for row in &mut expenses.by_property {
        row.percentage = share_percent(row.amount, expenses.total_amount);
    }

    Ok(Json(json!(MonthlyStats {
        month: q.month,
        year: q.year,
        earnings,
        expenses,
        booking_count,
    })))
}

// -- Scans --

async fn start_scan(State(state): State<StubState>, Json(input): Json<StartScan>) -> ApiResult {
    let mut data = state.lock();
    if !data.attachments.iter().any(|a| a.id == input.attachment_id) {
        return Err(not_found("attachment", &input.attachment_id));
    }
    let task_id = new_id();
    data.scans.insert(task_id.clone(), 0);
    Ok(Json(json!(ScanTicket { task_id })))
}

async fn scan_status(State(state): State<StubState>, Path(task_id): Path<String>) -> ApiResult {
    state.status_polls.fetch_add(1, Ordering::SeqCst);
    let script = state.script.lock().unwrap().clone();
    let mut data = state.lock();
    let polls = data
        .scans
        .get_mut(&task_id)
        .ok_or_else(|| not_found("scan task", &task_id))?;
    *polls += 1;

    let report = if *polls <= script.polls_before_done {
        ScanReport::scanning()
    } else if let Some(msg) = script.fail_with {
        ScanReport::failed(msg)
    } else {
        ScanReport::completed(script.output)
    };
    Ok(Json(json!(report)))
}
