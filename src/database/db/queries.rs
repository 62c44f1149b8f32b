use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Sqlite};
use sqlx::Row;
use rust_decimal::Decimal;
use std::str::FromStr;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::database::models::{
    Client, ClientStatus, Expense, Note, Payment, Salary, ServiceMap, Task, TeamMember,
    TierDefinition,
};
/*
This file contains the specific SQL query,
CRUD (Create, Read, Update, Delete) logic
and is responsible for interacting with the database.

Money columns are TEXT decimal strings; tier plans and service maps are
TEXT JSON. Decoding happens here so callers only see model types.
 */

fn decode_amount(text: &str, column: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(text)
        .map_err(|e| sqlx::Error::Decode(format!("invalid decimal in {}: {}", column, e).into()))
}

fn decode_json<T: DeserializeOwned>(text: &str, column: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(text)
        .map_err(|e| sqlx::Error::Decode(format!("invalid JSON in {}: {}", column, e).into()))
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value)
        .map_err(|e| sqlx::Error::Encode(format!("unserializable value: {}", e).into()))
}

/*==========Client Queries=========== */

fn client_from_row(row: &SqliteRow) -> Result<Client, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let tiers_text: String = row.try_get("tiered_payments")?;
    let finals_text: String = row.try_get("final_services")?;
    let current_text: String = row.try_get("current_services")?;
    let rate_text: String = row.try_get("current_rate")?;

    Ok(Client {
        client_id: row.try_get("client_id")?,
        client_name: row.try_get("client_name")?,
        email: row.try_get("email")?,
        status: ClientStatus::parse(&status),
        created_at: row.try_get("created_at")?,
        next_payment_date: row.try_get("next_payment_date")?,
        tiered_payments: decode_json(&tiers_text, "tiered_payments")?,
        final_services: decode_json(&finals_text, "final_services")?,
        current_services: decode_json(&current_text, "current_services")?,
        current_rate: decode_amount(&rate_text, "current_rate")?,
    })
}

// Create client together with its immutable tier plan
#[allow(clippy::too_many_arguments)]
pub async fn create_client(
    pool: &Pool<Sqlite>,
    client_name: &str,
    email: Option<&str>,
    created_at: NaiveDateTime,
    next_payment_date: Option<NaiveDate>,
    tiers: &[TierDefinition],
    final_services: &ServiceMap,
    current_services: &ServiceMap,
    current_rate: Decimal,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO clients (
            client_name, email, status, created_at, next_payment_date,
            tiered_payments, final_services, current_services, current_rate
        )
        VALUES (?, ?, 'active', ?, ?, ?, ?, ?, ?)
        RETURNING client_id
        "#,
    )
    .bind(client_name)
    .bind(email)
    .bind(created_at)
    .bind(next_payment_date)
    .bind(encode_json(&tiers)?)
    .bind(encode_json(final_services)?)
    .bind(encode_json(current_services)?)
    .bind(current_rate.to_string())
    .fetch_one(pool)
    .await?;

    row.try_get("client_id")
}

// Get client by id
pub async fn get_client_by_id(
    pool: &Pool<Sqlite>,
    client_id: i64,
) -> Result<Option<Client>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            client_id, client_name, email, status, created_at,
            next_payment_date, tiered_payments, final_services,
            current_services, current_rate
        FROM clients
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(client_from_row).transpose()
}

// Get all clients (active and terminated)
pub async fn get_all_clients(pool: &Pool<Sqlite>) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT
            client_id, client_name, email, status, created_at,
            next_payment_date, tiered_payments, final_services,
            current_services, current_rate
        FROM clients
        ORDER BY client_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(client_from_row)
    .collect()
}

// Ids only: the sweep and the MRR projection load each client separately
// so one unreadable row cannot fail the whole batch
pub async fn get_active_client_ids(pool: &Pool<Sqlite>) -> Result<Vec<i64>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT client_id
        FROM clients
        WHERE status = 'active'
        ORDER BY client_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(|row| row.try_get("client_id")).collect()
}

// Persist the resolver's result. This is the only write path for
// current_services / current_rate.
pub async fn update_current_services(
    pool: &Pool<Sqlite>,
    client_id: i64,
    services: &ServiceMap,
    total: Decimal,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE clients
        SET current_services = ?, current_rate = ?
        WHERE client_id = ?
        "#,
    )
    .bind(encode_json(services)?)
    .bind(total.to_string())
    .bind(client_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Mark a client active/terminated
pub async fn set_client_status(
    pool: &Pool<Sqlite>,
    client_id: i64,
    status: ClientStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE clients
        SET status = ?
        WHERE client_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(client_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Delete client
pub async fn delete_client(pool: &Pool<Sqlite>, client_id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // First need to delete all payment records associated with the client
    sqlx::query(
        r#"
        DELETE FROM payments
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        r#"
        DELETE FROM clients
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

// Active clients whose next payment falls on the given day (reminder job)
pub async fn clients_due_on(
    pool: &Pool<Sqlite>,
    due_date: NaiveDate,
) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT
            client_id, client_name, email, status, created_at,
            next_payment_date, tiered_payments, final_services,
            current_services, current_rate
        FROM clients
        WHERE status = 'active' AND next_payment_date = ?
        ORDER BY client_id ASC
        "#,
    )
    .bind(due_date)
    .fetch_all(pool)
    .await?
    .iter()
    .map(client_from_row)
    .collect()
}

/*==========Payment Queries=========== */

fn payment_from_row(row: &SqliteRow) -> Result<Payment, sqlx::Error> {
    let amount_text: String = row.try_get("amount")?;
    Ok(Payment {
        payment_id: row.try_get("payment_id")?,
        client_id: row.try_get("client_id")?,
        amount: decode_amount(&amount_text, "amount")?,
        description: row.try_get("description")?,
        paid_at: row.try_get("paid_at")?,
    })
}

// Record payment
pub async fn record_payment(
    pool: &Pool<Sqlite>,
    client_id: i64,
    amount: Decimal,
    description: Option<&str>,
    paid_at: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO payments (client_id, amount, description, paid_at)
        VALUES (?, ?, ?, ?)
        RETURNING payment_id
        "#,
    )
    .bind(client_id)
    .bind(amount.to_string())
    .bind(description)
    .bind(paid_at)
    .fetch_one(pool)
    .await?;

    row.try_get("payment_id")
}

// Payments with paid_at inside [start, end], both ends inclusive
pub async fn payments_between(
    pool: &Pool<Sqlite>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT payment_id, client_id, amount, description, paid_at
        FROM payments
        WHERE paid_at BETWEEN ? AND ?
        ORDER BY paid_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?
    .iter()
    .map(payment_from_row)
    .collect()
}

// Get all payments
pub async fn get_all_payments(pool: &Pool<Sqlite>) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT payment_id, client_id, amount, description, paid_at
        FROM payments
        ORDER BY paid_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(payment_from_row)
    .collect()
}

// Delete payment
pub async fn delete_payment(pool: &Pool<Sqlite>, payment_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM payments
        WHERE payment_id = ?
        "#,
    )
    .bind(payment_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Expense Queries=========== */

fn expense_from_row(row: &SqliteRow) -> Result<Expense, sqlx::Error> {
    let amount_text: String = row.try_get("amount")?;
    Ok(Expense {
        expense_id: row.try_get("expense_id")?,
        amount: decode_amount(&amount_text, "amount")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        spent_at: row.try_get("spent_at")?,
    })
}

// Record expense
pub async fn record_expense(
    pool: &Pool<Sqlite>,
    amount: Decimal,
    category: Option<&str>,
    description: Option<&str>,
    spent_at: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO expenses (amount, category, description, spent_at)
        VALUES (?, ?, ?, ?)
        RETURNING expense_id
        "#,
    )
    .bind(amount.to_string())
    .bind(category)
    .bind(description)
    .bind(spent_at)
    .fetch_one(pool)
    .await?;

    row.try_get("expense_id")
}

// Expenses with spent_at inside [start, end], both ends inclusive
pub async fn expenses_between(
    pool: &Pool<Sqlite>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT expense_id, amount, category, description, spent_at
        FROM expenses
        WHERE spent_at BETWEEN ? AND ?
        ORDER BY spent_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

// Get all expenses
pub async fn get_all_expenses(pool: &Pool<Sqlite>) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT expense_id, amount, category, description, spent_at
        FROM expenses
        ORDER BY spent_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

// Delete expense
pub async fn delete_expense(pool: &Pool<Sqlite>, expense_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM expenses
        WHERE expense_id = ?
        "#,
    )
    .bind(expense_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Team Member Queries=========== */

fn member_from_row(row: &SqliteRow) -> Result<TeamMember, sqlx::Error> {
    let salary_text: String = row.try_get("monthly_salary")?;
    Ok(TeamMember {
        member_id: row.try_get("member_id")?,
        member_name: row.try_get("member_name")?,
        role: row.try_get("role")?,
        monthly_salary: decode_amount(&salary_text, "monthly_salary")?,
        joined_at: row.try_get("joined_at")?,
    })
}

// Create team member
pub async fn create_team_member(
    pool: &Pool<Sqlite>,
    member_name: &str,
    role: Option<&str>,
    monthly_salary: Decimal,
    joined_at: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO team_members (member_name, role, monthly_salary, joined_at)
        VALUES (?, ?, ?, ?)
        RETURNING member_id
        "#,
    )
    .bind(member_name)
    .bind(role)
    .bind(monthly_salary.to_string())
    .bind(joined_at)
    .fetch_one(pool)
    .await?;

    row.try_get("member_id")
}

// Get all team members
pub async fn get_all_team_members(pool: &Pool<Sqlite>) -> Result<Vec<TeamMember>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT member_id, member_name, role, monthly_salary, joined_at
        FROM team_members
        ORDER BY member_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(member_from_row)
    .collect()
}

// Delete team member
pub async fn delete_team_member(pool: &Pool<Sqlite>, member_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM team_members
        WHERE member_id = ?
        "#,
    )
    .bind(member_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Salary Queries=========== */

fn salary_from_row(row: &SqliteRow) -> Result<Salary, sqlx::Error> {
    let amount_text: String = row.try_get("amount")?;
    Ok(Salary {
        salary_id: row.try_get("salary_id")?,
        member_id: row.try_get("member_id")?,
        amount: decode_amount(&amount_text, "amount")?,
        description: row.try_get("description")?,
        paid_at: row.try_get("paid_at")?,
    })
}

// Record salary payout
pub async fn record_salary(
    pool: &Pool<Sqlite>,
    member_id: i64,
    amount: Decimal,
    description: Option<&str>,
    paid_at: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO salaries (member_id, amount, description, paid_at)
        VALUES (?, ?, ?, ?)
        RETURNING salary_id
        "#,
    )
    .bind(member_id)
    .bind(amount.to_string())
    .bind(description)
    .bind(paid_at)
    .fetch_one(pool)
    .await?;

    row.try_get("salary_id")
}

// Salary payouts with paid_at inside [start, end], both ends inclusive
pub async fn salaries_between(
    pool: &Pool<Sqlite>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Salary>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT salary_id, member_id, amount, description, paid_at
        FROM salaries
        WHERE paid_at BETWEEN ? AND ?
        ORDER BY paid_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?
    .iter()
    .map(salary_from_row)
    .collect()
}

// Get all salary payouts
pub async fn get_all_salaries(pool: &Pool<Sqlite>) -> Result<Vec<Salary>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT salary_id, member_id, amount, description, paid_at
        FROM salaries
        ORDER BY paid_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(salary_from_row)
    .collect()
}

/*==========Task Queries=========== */

// Create task (starts on the 'todo' column)
pub async fn create_task(
    pool: &Pool<Sqlite>,
    title: &str,
    assignee_id: Option<i64>,
    due_date: Option<NaiveDate>,
    created_at: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO tasks (title, status, assignee_id, due_date, created_at)
        VALUES (?, 'todo', ?, ?, ?)
        RETURNING task_id
        "#,
    )
    .bind(title)
    .bind(assignee_id)
    .bind(due_date)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    row.try_get("task_id")
}

// Get all tasks
pub async fn get_all_tasks(pool: &Pool<Sqlite>) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        r#"
        SELECT task_id, title, status, assignee_id, due_date, created_at
        FROM tasks
        ORDER BY task_id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

// Move task across the board
pub async fn update_task_status(
    pool: &Pool<Sqlite>,
    task_id: i64,
    status: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = ?
        WHERE task_id = ?
        "#,
    )
    .bind(status)
    .bind(task_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Delete task
pub async fn delete_task(pool: &Pool<Sqlite>, task_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM tasks
        WHERE task_id = ?
        "#,
    )
    .bind(task_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Note Queries=========== */

// Create note
pub async fn create_note(
    pool: &Pool<Sqlite>,
    title: &str,
    body: &str,
    created_at: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO notes (title, body, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING note_id
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(created_at)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    row.try_get("note_id")
}

// Get all notes
pub async fn get_all_notes(pool: &Pool<Sqlite>) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(
        r#"
        SELECT note_id, title, body, created_at, updated_at
        FROM notes
        ORDER BY note_id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

// Update note
pub async fn update_note(
    pool: &Pool<Sqlite>,
    note_id: i64,
    title: &str,
    body: &str,
    updated_at: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notes
        SET title = ?, body = ?, updated_at = ?
        WHERE note_id = ?
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(updated_at)
    .bind(note_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Delete note
pub async fn delete_note(pool: &Pool<Sqlite>, note_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM notes
        WHERE note_id = ?
        "#,
    )
    .bind(note_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_tiers() -> Vec<TierDefinition> {
        vec![
            TierDefinition {
                duration_months: 3,
                services: [("reels".to_string(), Decimal::from(500))]
                    .into_iter()
                    .collect(),
            },
            TierDefinition {
                duration_months: 6,
                services: [("reels".to_string(), Decimal::from(800))]
                    .into_iter()
                    .collect(),
            },
        ]
    }

    #[tokio::test]
    async fn client_round_trips_with_tier_plan_and_snapshot() {
        let pool = test_pool().await;
        let created_at = day(2026, 1, 15).and_hms_opt(9, 30, 0).unwrap();
        let finals: ServiceMap = [("management".to_string(), Decimal::from(2000))]
            .into_iter()
            .collect();

        let id = create_client(
            &pool,
            "Acme Social",
            Some("billing@acme.test"),
            created_at,
            Some(day(2026, 9, 1)),
            &sample_tiers(),
            &finals,
            &ServiceMap::new(),
            Decimal::ZERO,
        )
        .await
        .unwrap();

        let client = get_client_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(client.client_name, "Acme Social");
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.created_at, created_at);
        assert_eq!(client.next_payment_date, Some(day(2026, 9, 1)));
        assert_eq!(client.tiered_payments.len(), 2);
        assert_eq!(client.tiered_payments[1].duration_months, 6);
        assert_eq!(client.final_services, finals);
        assert_eq!(client.current_rate, Decimal::ZERO);

        assert!(get_client_by_id(&pool, id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_update_only_touches_current_fields() {
        let pool = test_pool().await;
        let created_at = day(2026, 1, 15).and_hms_opt(0, 0, 0).unwrap();
        let id = create_client(
            &pool,
            "Client",
            None,
            created_at,
            None,
            &sample_tiers(),
            &ServiceMap::new(),
            &ServiceMap::new(),
            Decimal::ZERO,
        )
        .await
        .unwrap();

        let snapshot: ServiceMap = [("reels".to_string(), Decimal::from(800))]
            .into_iter()
            .collect();
        assert!(
            update_current_services(&pool, id, &snapshot, Decimal::from(800))
                .await
                .unwrap()
        );

        let client = get_client_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(client.current_services, snapshot);
        assert_eq!(client.current_rate, Decimal::from(800));
        // the plan itself stays untouched
        assert_eq!(client.tiered_payments.len(), 2);
    }

    #[tokio::test]
    async fn clients_due_on_matches_the_exact_day_for_active_clients_only() {
        let pool = test_pool().await;
        let created_at = day(2026, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let due = day(2026, 8, 25);
        let none = ServiceMap::new();

        let due_id = create_client(
            &pool, "due", None, created_at, Some(due), &[], &none, &none, Decimal::ZERO,
        )
        .await
        .unwrap();
        create_client(
            &pool, "later", None, created_at, Some(day(2026, 8, 26)), &[], &none, &none, Decimal::ZERO,
        )
        .await
        .unwrap();
        let gone_id = create_client(
            &pool, "gone", None, created_at, Some(due), &[], &none, &none, Decimal::ZERO,
        )
        .await
        .unwrap();
        set_client_status(&pool, gone_id, ClientStatus::Terminated)
            .await
            .unwrap();

        let due_clients = clients_due_on(&pool, due).await.unwrap();
        assert_eq!(due_clients.len(), 1);
        assert_eq!(due_clients[0].client_id, due_id);
    }
}
