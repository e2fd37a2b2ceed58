//! Core types, trait definitions, and workflows for the thesis service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::ThesisStore`]; identity providers
//! implement [`identity::IdentityProvider`]. The workflow modules take both
//! as explicit arguments, together with the caller's [`identity::Identity`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod allocation;
pub mod bridge;
pub mod comment;
pub mod error;
pub mod feedback;
pub mod identity;
pub mod memory;
pub mod notification;
pub mod profile;
pub mod proposal;
pub mod settings;
pub mod store;
pub mod thesis;
pub mod user;
pub mod versions;
pub mod workflow;

pub use error::{Error, Result};
