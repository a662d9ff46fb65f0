//! Web layer for bus stop search and departure watching.
//!
//! Provides a JSON API for finding stops, listing their lines and choosing
//! a line to be notified about.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
