//! Payment-reminder delivery seam.
//!
//! The daily trigger hands each client whose next payment is due tomorrow
//! to a `ReminderNotifier`. The real email transport lives outside this
//! crate; the bundled implementation only logs.

use crate::database::models::Client;
use crate::error::AppError;

pub trait ReminderNotifier: Send + Sync {
    fn send_reminder(&self, client: &Client) -> Result<(), AppError>;
}

pub struct LogNotifier;

impl ReminderNotifier for LogNotifier {
    fn send_reminder(&self, client: &Client) -> Result<(), AppError> {
        tracing::info!(
            client_id = client.client_id,
            client_name = %client.client_name,
            due = ?client.next_payment_date,
            "payment reminder: due tomorrow"
        );
        Ok(())
    }
}
