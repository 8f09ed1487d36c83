/// API route handlers
///
/// - `health`: public health check
/// - `auth`: registration, login, token refresh
/// - `tasks`: task CRUD, assignment, status changes, filtered listing
/// - `dashboard`: per-user aggregation counters

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod tasks;
