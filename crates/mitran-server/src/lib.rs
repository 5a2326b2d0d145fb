//! Mitran HTTP layer: JSON + SSE API over the chat client, and the
//! single-page chat UI.

pub mod error;
pub mod routes;
pub mod server;
pub mod ui;

pub use error::ApiError;
pub use routes::{build_router, AppState};
pub use server::run_server;
