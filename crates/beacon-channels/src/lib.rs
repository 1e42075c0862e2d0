//! # beacon-channels
//!
//! Chat platform integrations for Beacon.

pub mod slack;
