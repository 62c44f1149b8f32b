// src/lib.rs
pub mod backend;
pub mod billing;
pub mod database;
pub mod error;
pub mod notify;
pub mod sweep;
