//! Foundation types for homeshell.
//!
//! This crate holds the types every other homeshell crate agrees on: the
//! shared error enum and the launcher's path configuration.

pub mod config;
pub mod error;
