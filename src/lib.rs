// API module for the collaboration backend
pub mod api;

// Re-export api modules at crate root so internal code and tests can use
// crate::models, crate::services, etc.
pub use api::models;
pub use api::routes;
pub use api::services;
pub use api::transport;
