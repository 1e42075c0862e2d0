//! # beacon-core
//!
//! Core types, traits, configuration, and error handling for Beacon.

pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod text;
pub mod traits;
