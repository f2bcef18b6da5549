//! API module
//!
//! HTTP endpoint definitions and request-level middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use crate::mediator::CommandMediator;
use crate::projection::ProjectionStore;

pub use routes::create_router;

/// Shared state handed to every handler. `mediator` is the single
/// entry point for the three mutating commands; `projections` backs the two
/// read endpoints directly against the read-model tables.
#[derive(Clone)]
pub struct AppState {
    pub mediator: Arc<CommandMediator>,
    pub projections: ProjectionStore,
}
