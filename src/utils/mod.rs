pub mod pagination;
pub mod random;
pub mod tracing;
pub mod validation;
