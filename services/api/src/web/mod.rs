pub mod generate_task;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod workspace;

// Re-export the router builder so the binary and the integration tests can
// construct the full application.
pub use router::build_router;
pub use state::AppState;
