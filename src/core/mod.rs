//! Core functionality modules
//!
//! This module contains the search domain organized into logical layers:
//! - `model`: Request and file types shared by every layer
//! - `query`: Drive query grammar, escaping and completion cleanup
//! - `translator`: Structured fields to query string via the language model
//! - `search`: The validate, translate, search pipeline
//! - `services`: External API integrations and service clients

pub mod model;
pub mod query;
pub mod search;
pub mod services;
pub mod translator;
