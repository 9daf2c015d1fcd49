//! Core types shared by every layer of conftree.
//!
//! Every fallible operation in the library returns [`ConftreeError`]. The CLI
//! layer works with [`anyhow::Result`] and turns the first error of a run into an
//! [`ErrorContext`] via [`user_friendly_error`], which adds details and
//! suggestions before the message is printed.
//!
//! ```rust
//! use conftree::core::{ConftreeError, ErrorContext};
//!
//! let context = ErrorContext::new(ConftreeError::Config {
//!     message: "shell must not be empty".to_string(),
//! })
//! .with_suggestion("Set shell = \"bash\" in the settings file");
//!
//! assert!(context.to_string().contains("shell must not be empty"));
//! ```

pub mod error;

pub use error::{ConftreeError, ErrorContext, find_similar, user_friendly_error};
