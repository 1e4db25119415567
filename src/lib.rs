// Configuration (TOML + environment)
pub mod config;

// OAuth 1.0a signing primitives
pub mod oauth1;

// Temporary credentials, sessions, handoff codes
pub mod credentials;

// Outbound HTTP to the upstream service
pub mod upstream;

// Three-legged flow controller
pub mod oauth;

// Session id extraction and cookies
pub mod auth;

// HTTP API
pub mod api;
