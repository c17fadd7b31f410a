//! Reactive data layer between `nocdash-api` and UI consumers.
//!
//! This crate owns the business logic and reactive state for the NOC
//! dashboard workspace:
//!
//! - **[`Session`]** — Central facade managing the dashboard lifecycle:
//!   [`start()`](Session::start) performs an initial data fetch, then
//!   spawns background poll tasks for alarms, instances, and backend
//!   health. Alarm acknowledgement and AI investigations route through
//!   it as well.
//!
//! - **[`DataStore`]** — Lock-free reactive storage built on
//!   `EntityCollection<T>` (`DashMap` + `tokio::sync::watch` channels).
//!   Holds alarms, instances, filters, stats, and the investigation
//!   chat transcript.
//!
//! - **[`EntityStream<T>`]** — Subscription handle vended by the
//!   `DataStore`. Exposes `snapshot()` / `changed()` for reactive
//!   rendering.
//!
//! - **Domain model** ([`model`]) — The backend wire types re-exported
//!   as canonical domain types, plus chat transcript types that only
//!   exist client-side.

pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use session::{Session, SessionConfig};
pub use store::DataStore;
pub use store::chat::{ChatMessage, ChatRole, ChatState};
pub use stream::EntityStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alarm, AlarmFilters, AlarmStats, HealthStatus, Instance, InstanceStatus, ProblemCounts,
    ServiceHealth, Severity, SeverityCounts,
};
