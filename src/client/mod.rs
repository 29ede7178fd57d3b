//! HTTP plumbing for REST sources.
//!
//! This module provides the [`HttpSession`] used by the API extractor, along
//! with authentication types ([`Auth`], [`AuthType`]).

mod auth;
mod session;

pub use auth::{Auth, AuthType};
pub use session::HttpSession;
