//! # PizzaOps Integration Library
//!
//! Core functionality for the operations dashboard of a pizza restaurant
//! chain: a typed client for the backend's integration hub plus the session
//! flows built on it (connection management, webhook monitoring, order
//! submission).

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod models;
pub mod monitor;
pub mod session;
pub mod telemetry;
