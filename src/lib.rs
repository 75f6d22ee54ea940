pub mod config;
pub mod evolution;
pub mod logging;
pub mod services;
pub mod store;
