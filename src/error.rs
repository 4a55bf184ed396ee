//! Error types for physics operations.

use thiserror::Error;

/// Errors returned by world, body, shape and constraint operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// The world could not be created from its configuration.
    #[error("World creation failed: {0}")]
    WorldCreationFailed(String),

    /// Internal engine failure.
    #[error("Physics engine error: {0}")]
    EngineError(String),

    /// A rigid body could not be created or registered.
    #[error("Body creation failed: {0}")]
    BodyCreationFailed(String),

    /// Shape parameters were rejected.
    #[error("Shape creation failed: {0}")]
    ShapeCreationFailed(String),

    /// Constraint parameters or bodies were rejected.
    #[error("Constraint creation failed: {0}")]
    ConstraintCreationFailed(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulation error: {0}")]
    SimulationError(String),

    /// A numeric argument was out of its accepted range.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The operation is not available in the current state (e.g. disposed world).
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Physics engine not initialized")]
    EngineNotInitialized,

    /// The target of the operation does not exist or is in the wrong state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl PhysicsError {
    /// Creates an invalid-parameters error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Creates a shape-creation error.
    #[must_use]
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeCreationFailed(msg.into())
    }
}

/// Result type for physics operations.
pub type PhysicsResult<T> = std::result::Result<T, PhysicsError>;

/// Fails with [`PhysicsError::InvalidParameters`] unless `value` lies in `[min, max]`.
pub(crate) fn ensure_range(name: &str, value: f32, min: f32, max: f32) -> PhysicsResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(PhysicsError::invalid(format!(
            "{name} must be in [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysicsError::UnsupportedOperation("PhysicsWorld is disposed".into());
        assert_eq!(err.to_string(), "Unsupported operation: PhysicsWorld is disposed");
        assert_eq!(
            PhysicsError::EngineNotInitialized.to_string(),
            "Physics engine not initialized"
        );
    }

    #[test]
    fn test_ensure_range() {
        assert!(ensure_range("restitution", 0.5, 0.0, 1.0).is_ok());
        assert!(matches!(
            ensure_range("restitution", 1.5, 0.0, 1.0),
            Err(PhysicsError::InvalidParameters(_))
        ));
        assert!(ensure_range("friction", f32::NAN, 0.0, f32::MAX).is_err());
    }
}
