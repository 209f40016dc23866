//! Service status for health monitoring.
//!
//! Services with external backends report their availability through
//! this enum so the embedding shell can degrade gracefully instead of
//! failing.

/// Standard service status for services with external backends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    /// Service is running and operational.
    Active,
    /// Service is starting up.
    #[default]
    Initializing,
    /// Service stopped due to error.
    Error(Option<String>),
    /// Service intentionally disabled or unavailable.
    Unavailable,
}

impl ServiceStatus {
    /// Check if the service is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, ServiceStatus::Active)
    }

    /// Get a human-readable label for the status.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Active => "Active",
            ServiceStatus::Initializing => "Starting",
            ServiceStatus::Error(_) => "Error",
            ServiceStatus::Unavailable => "Unavailable",
        }
    }

    /// Get the error message if this is an error status.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ServiceStatus::Error(msg) => msg.as_deref(),
            _ => None,
        }
    }
}
