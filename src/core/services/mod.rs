//! External services integration
//!
//! This module contains integrations with the hosted Google APIs:
//! - Service account credentials and the memoized Drive handle
//! - Drive `files.list` for search and folder enumeration
//! - Gemini `generateContent` for query translation

pub mod credentials;
pub mod drive;
pub mod gemini;

