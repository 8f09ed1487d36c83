/// Database utilities
///
/// - `pool`: connection pool creation with startup health check

pub mod pool;
