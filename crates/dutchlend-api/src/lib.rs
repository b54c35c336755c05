//! dutchlend-api: HTTP API over the auction lending protocol
//!
//! Serves loan listings, auction operations and the reference vault to
//! local clients.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, Clock, ManualClock, Protocol, StateError, SystemClock};
