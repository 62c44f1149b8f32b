pub mod client;
pub mod payment;
pub mod expense;
pub mod team_member;
pub mod salary;
pub mod task;
pub mod note;


pub use client::{Client, ClientStatus, ServiceMap, TierDefinition};
pub use payment::Payment;
pub use expense::Expense;
pub use team_member::TeamMember;
pub use salary::Salary;
pub use task::Task;
pub use note::Note;
