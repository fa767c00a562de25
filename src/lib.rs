#![doc = "The `taskdesk` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, the task lifecycle rules, dashboards and exports,"]
#![doc = "routing configuration and error handling for the TaskDesk service. The binary"]
#![doc = "(`main.rs`) wires these into an actix-web `HttpServer`."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod reports;
pub mod routes;
pub mod uploads;

pub use crate::error::AppError;
