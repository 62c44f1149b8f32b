// src/backend/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::backend::AppState;
use crate::billing::{self, tier};
use crate::database::db::queries;
use crate::database::models::{ClientStatus, ServiceMap, TierDefinition};
use crate::error::AppError;

/* ==========Dashboard========== */

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<billing::PeriodSummary>, AppError> {
    if period.start > period.end {
        return Err(AppError::Validation(
            "period start is after period end".to_string(),
        ));
    }
    let summary = billing::aggregate(&state.db, period.start, period.end).await?;
    Ok(Json(summary))
}

pub async fn dashboard_mrr(
    State(state): State<AppState>,
) -> Result<Json<billing::MrrProjection>, AppError> {
    let projection = billing::projected_mrr(&state.db, Utc::now().naive_utc()).await?;
    Ok(Json(projection))
}

/* ==========Clients========== */

#[derive(Debug, Deserialize)]
pub struct CreateClientReq {
    pub client_name: String,
    pub email: Option<String>,
    pub created_at: Option<NaiveDateTime>, // defaults to now
    pub next_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub tiered_payments: Vec<TierDefinition>,
    #[serde(default)]
    pub final_services: ServiceMap,
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreateClientReq>,
) -> Result<impl IntoResponse, AppError> {
    tier::validate_tiers(&req.tiered_payments)?;
    let created_at = req.created_at.unwrap_or_else(|| Utc::now().naive_utc());

    // seed the billing snapshot at onboarding; the sweep keeps it current
    let initial = tier::resolve_tier(
        created_at,
        created_at,
        &req.tiered_payments,
        &req.final_services,
    )?;

    let client_id = queries::create_client(
        &state.db,
        &req.client_name,
        req.email.as_deref(),
        created_at,
        req.next_payment_date,
        &req.tiered_payments,
        &req.final_services,
        &initial.services,
        initial.total_amount,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "client_id": client_id }))))
}

pub async fn list_clients(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let clients = queries::get_all_clients(&state.db).await?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let client = queries::get_client_by_id(&state.db, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("client {}", client_id)))?;
    Ok(Json(client))
}

pub async fn terminate_client(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::set_client_status(&state.db, client_id, ClientStatus::Terminated).await?;
    if !found {
        return Err(AppError::NotFound(format!("client {}", client_id)));
    }
    Ok(Json(json!({ "client_id": client_id, "status": "terminated" })))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_client(&state.db, client_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("client {}", client_id)));
    }
    Ok(Json(json!({ "deleted": client_id })))
}

/* ==========Payments========== */

#[derive(Debug, Deserialize)]
pub struct RecordPaymentReq {
    pub client_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub paid_at: NaiveDate,
}

pub async fn record_payment(
    State(state): State<AppState>,
    Json(req): Json<RecordPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    // payments must reference a known client
    queries::get_client_by_id(&state.db, req.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("client {}", req.client_id)))?;

    let payment_id = queries::record_payment(
        &state.db,
        req.client_id,
        req.amount,
        req.description.as_deref(),
        req.paid_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "payment_id": payment_id }))))
}

pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let payments = queries::get_all_payments(&state.db).await?;
    Ok(Json(payments))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_payment(&state.db, payment_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("payment {}", payment_id)));
    }
    Ok(Json(json!({ "deleted": payment_id })))
}

/* ==========Expenses========== */

#[derive(Debug, Deserialize)]
pub struct RecordExpenseReq {
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
    pub spent_at: NaiveDate,
}

pub async fn record_expense(
    State(state): State<AppState>,
    Json(req): Json<RecordExpenseReq>,
) -> Result<impl IntoResponse, AppError> {
    let expense_id = queries::record_expense(
        &state.db,
        req.amount,
        req.category.as_deref(),
        req.description.as_deref(),
        req.spent_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "expense_id": expense_id }))))
}

pub async fn list_expenses(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let expenses = queries::get_all_expenses(&state.db).await?;
    Ok(Json(expenses))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_expense(&state.db, expense_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("expense {}", expense_id)));
    }
    Ok(Json(json!({ "deleted": expense_id })))
}

/* ==========Team & Payroll========== */

#[derive(Debug, Deserialize)]
pub struct CreateTeamMemberReq {
    pub member_name: String,
    pub role: Option<String>,
    pub monthly_salary: Decimal,
    pub joined_at: Option<NaiveDate>, // defaults to today
}

pub async fn create_team_member(
    State(state): State<AppState>,
    Json(req): Json<CreateTeamMemberReq>,
) -> Result<impl IntoResponse, AppError> {
    let joined_at = req.joined_at.unwrap_or_else(|| Utc::now().date_naive());
    let member_id = queries::create_team_member(
        &state.db,
        &req.member_name,
        req.role.as_deref(),
        req.monthly_salary,
        joined_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "member_id": member_id }))))
}

pub async fn list_team_members(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let members = queries::get_all_team_members(&state.db).await?;
    Ok(Json(members))
}

pub async fn delete_team_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_team_member(&state.db, member_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("team member {}", member_id)));
    }
    Ok(Json(json!({ "deleted": member_id })))
}

#[derive(Debug, Deserialize)]
pub struct RecordSalaryReq {
    pub member_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub paid_at: NaiveDate,
}

pub async fn record_salary(
    State(state): State<AppState>,
    Json(req): Json<RecordSalaryReq>,
) -> Result<impl IntoResponse, AppError> {
    let salary_id = queries::record_salary(
        &state.db,
        req.member_id,
        req.amount,
        req.description.as_deref(),
        req.paid_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "salary_id": salary_id }))))
}

pub async fn list_salaries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let salaries = queries::get_all_salaries(&state.db).await?;
    Ok(Json(salaries))
}

/* ==========Tasks========== */

#[derive(Debug, Deserialize)]
pub struct CreateTaskReq {
    pub title: String,
    pub assignee_id: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskReq>,
) -> Result<impl IntoResponse, AppError> {
    let task_id = queries::create_task(
        &state.db,
        &req.title,
        req.assignee_id,
        req.due_date,
        Utc::now().naive_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "task_id": task_id }))))
}

pub async fn list_tasks(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tasks = queries::get_all_tasks(&state.db).await?;
    Ok(Json(tasks))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusReq {
    pub status: String,
}

pub async fn update_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(req): Json<UpdateTaskStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(req.status.as_str(), "todo" | "in_progress" | "done") {
        return Err(AppError::Validation(format!(
            "unknown task status '{}'",
            req.status
        )));
    }
    let found = queries::update_task_status(&state.db, task_id, &req.status).await?;
    if !found {
        return Err(AppError::NotFound(format!("task {}", task_id)));
    }
    Ok(Json(json!({ "task_id": task_id, "status": req.status })))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_task(&state.db, task_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("task {}", task_id)));
    }
    Ok(Json(json!({ "deleted": task_id })))
}

/* ==========Notes========== */

#[derive(Debug, Deserialize)]
pub struct NoteReq {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<NoteReq>,
) -> Result<impl IntoResponse, AppError> {
    let note_id =
        queries::create_note(&state.db, &req.title, &req.body, Utc::now().naive_utc()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "note_id": note_id }))))
}

pub async fn list_notes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let notes = queries::get_all_notes(&state.db).await?;
    Ok(Json(notes))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Json(req): Json<NoteReq>,
) -> Result<impl IntoResponse, AppError> {
    let found =
        queries::update_note(&state.db, note_id, &req.title, &req.body, Utc::now().naive_utc())
            .await?;
    if !found {
        return Err(AppError::NotFound(format!("note {}", note_id)));
    }
    Ok(Json(json!({ "note_id": note_id })))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let found = queries::delete_note(&state.db, note_id).await?;
    if !found {
        return Err(AppError::NotFound(format!("note {}", note_id)));
    }
    Ok(Json(json!({ "deleted": note_id })))
}

/* ==========Reminders========== */

// Invoked once per day by an external cron trigger: clients whose next
// payment lands exactly tomorrow get handed to the notifier. Delivery
// failures are logged per client, never propagated.
pub async fn run_reminders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let due = queries::clients_due_on(&state.db, tomorrow).await?;

    let mut notified = 0;
    for client in &due {
        match state.notifier.send_reminder(client) {
            Ok(()) => notified += 1,
            Err(err) => {
                tracing::warn!(client_id = client.client_id, error = %err, "reminder delivery failed");
            }
        }
    }

    Ok(Json(json!({ "due": due.len(), "notified": notified })))
}
