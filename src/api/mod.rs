// API module organization
pub mod models;
pub mod routes;
pub mod services;
pub mod transport;
