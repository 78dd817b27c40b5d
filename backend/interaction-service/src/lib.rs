//! Interaction Service
//!
//! Likes, follows, comments, direct messages and grouped notifications over
//! an in-memory entity store, exposed in-process through [`Engine`] and over
//! HTTP through [`handlers`].

pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod reconciliation;
pub mod services;
pub mod state;
pub mod store;

// Public re-exports
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use reconciliation::{Optimistic, SocialClient};
pub use services::Engine;
pub use state::AppState;
pub use store::EntityStore;
