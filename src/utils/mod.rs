//! Utility modules for common functionality
//!
//! - `logging`: Logging configuration and setup

pub mod logging;
