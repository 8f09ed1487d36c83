/// Domain models for Syncboard
///
/// # Models
///
/// - `task`: the central Task entity, its status/priority enums, and the
///   store-level create/update records
/// - `user`: user accounts referenced by tasks and realtime sessions

pub mod task;
pub mod user;
