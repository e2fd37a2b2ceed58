//! Configuration and the HTTP identity provider for the thesis server
//! binary.

pub mod config;
pub mod provider;

pub use config::ServerConfig;
pub use provider::HttpIdentityProvider;
