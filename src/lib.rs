pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod insights;
pub mod middleware;
pub mod state;
pub mod telemetry;

#[cfg(test)]
mod test_support;
