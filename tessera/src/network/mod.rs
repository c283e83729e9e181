//! Per-connection networking: request loop, chunk workers, policies.

pub mod connection;
pub mod rate_limit;

pub use connection::Connection;
pub use rate_limit::RateLimiter;
