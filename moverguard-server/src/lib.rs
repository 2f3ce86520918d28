//! HTTP surface for moverguard: settings, manual operations, webhook
//! triggers, the scheduler and the alert feed.

pub mod handlers;
pub mod infra;
pub mod routes;
pub mod services;

pub use infra::app_state::AppState;
pub use routes::create_app;
