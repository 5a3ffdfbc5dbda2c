//! Terminal user interface for reviewing merge suggestions.
//!
//! ## Entry points
//!
//! - [`review::run_review`]: step through suggestions and decide each one.

pub mod buffer;
pub mod review;
