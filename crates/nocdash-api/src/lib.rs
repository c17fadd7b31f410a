//! Async client for the NOC dashboard backend API.
//!
//! The backend aggregates alarms from a fleet of Zabbix-like monitoring
//! instances and fronts an AI investigation service. Every operation is a
//! single request/response pair except [`ApiClient::stream_investigation`],
//! which returns a long-lived handle over a server-sent-event stream.

mod client;
mod error;
mod stream;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
pub use stream::{InvestigationStream, StreamEvent};
