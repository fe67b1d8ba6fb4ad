//! Prediction identifier generation.

/// Source of fresh, opaque prediction identifiers.
///
/// Identifiers are never derived from request content, so retries of the
/// same request never collide.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
