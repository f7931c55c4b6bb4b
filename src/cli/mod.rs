//! Command Line Interface module
//!
//! - `serve`: run the HTTP service
//! - `search`: run one search from the terminal
//! - `index`: enumerate the whole folder
//! - `check`: report configuration and try the credentials
//! - `config`: inspect the effective configuration

pub mod check;
pub mod config;
pub mod index;
pub mod output;
pub mod search;
pub mod serve;
