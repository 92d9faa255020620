// Shared infrastructure
pub mod config;
pub mod error;

// Storage and delivery backends
pub mod gateway;
pub mod registry;

// Core handlers
pub mod broadcast;
pub mod registrar;

// HTTP trigger surface
pub mod api;
pub mod server;
