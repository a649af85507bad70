//! # CaseLink Common Library
//!
//! Shared code for CaseLink services including:
//! - Common error and result types
//! - Configuration loading and root folder resolution
//! - Database pool initialization and case-record queries

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
