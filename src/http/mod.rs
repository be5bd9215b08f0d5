//! HTTP surface for the service
//!
//! - POST /events - trigger-event webhook (session start/stop)
//! - GET /sessions/:id/action-items - action items collected so far
//! - GET /health - health check
//!
//! The webhook always acknowledges receipt; downstream session startup runs
//! asynchronously and reports its failures through the log sink.

mod handlers;
mod routes;
mod state;

pub use handlers::TriggerEvent;
pub use routes::create_router;
pub use state::AppState;
