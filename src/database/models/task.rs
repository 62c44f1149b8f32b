use serde::{Serialize, Deserialize};
use sqlx::FromRow;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: i64,
    pub title: String,
    pub status: String,             // todo/in_progress/done
    pub assignee_id: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}
