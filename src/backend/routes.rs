use axum::{
    routing::{delete, get, post, put},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // dashboard widgets
        .route("/api/dashboard/summary", get(handlers::dashboard_summary))
        .route("/api/dashboard/mrr", get(handlers::dashboard_mrr))
        // clients
        .route("/api/clients", post(handlers::create_client).get(handlers::list_clients))
        .route("/api/clients/:id", get(handlers::get_client).delete(handlers::delete_client))
        .route("/api/clients/:id/terminate", post(handlers::terminate_client))
        // money in / money out
        .route("/api/payments", post(handlers::record_payment).get(handlers::list_payments))
        .route("/api/payments/:id", delete(handlers::delete_payment))
        .route("/api/expenses", post(handlers::record_expense).get(handlers::list_expenses))
        .route("/api/expenses/:id", delete(handlers::delete_expense))
        // team and payroll
        .route("/api/team-members", post(handlers::create_team_member).get(handlers::list_team_members))
        .route("/api/team-members/:id", delete(handlers::delete_team_member))
        .route("/api/salaries", post(handlers::record_salary).get(handlers::list_salaries))
        // task board and notes
        .route("/api/tasks", post(handlers::create_task).get(handlers::list_tasks))
        .route("/api/tasks/:id/status", put(handlers::update_task_status))
        .route("/api/tasks/:id", delete(handlers::delete_task))
        .route("/api/notes", post(handlers::create_note).get(handlers::list_notes))
        .route("/api/notes/:id", put(handlers::update_note).delete(handlers::delete_note))
        // daily payment-reminder trigger (invoked by cron)
        .route("/api/reminders/run", post(handlers::run_reminders))
}
