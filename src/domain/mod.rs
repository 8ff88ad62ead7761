// Market data and analysis value objects
pub mod market;

// Collaborator interfaces
pub mod ports;

// Per-row data integrity checks
pub mod validation;

// Domain-specific error types
pub mod errors;
