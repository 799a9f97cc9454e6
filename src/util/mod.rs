//! Utility functions for common operations.
//!
//! - **Endpoint validation**: HTTPS enforcement for the feed endpoint
//! - **Text processing**: Control-character stripping and width-aware truncation
//!   for printing feed-supplied text to a terminal

mod text;
mod url_validator;

pub use text::{sanitize_line, truncate_to_width};
pub use url_validator::{validate_endpoint_url, UrlValidationError};
