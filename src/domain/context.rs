//! Operation Context
//!
//! Metadata about the current request, threaded through the mediator for tracing.
//! Authentication and multi-tenant authorization are explicitly out of scope;
//! this only carries what the command-side substrate needs for correlation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, used for tracing/correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Correlation ID for request tracing, echoed into every log line and
    /// into the stored event's context so a request can be traced end to end.
    pub correlation_id: Uuid,
}

impl OperationContext {
    /// Start a new context with a fresh correlation ID.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn with_correlation_id(correlation_id: Uuid) -> Self {
        Self { correlation_id }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_default_has_correlation_id() {
        let ctx = OperationContext::new();
        assert_ne!(ctx.correlation_id, Uuid::nil());
    }

    #[test]
    fn test_context_with_correlation_id() {
        let id = Uuid::new_v4();
        let ctx = OperationContext::with_correlation_id(id);
        assert_eq!(ctx.correlation_id, id);
    }
}
