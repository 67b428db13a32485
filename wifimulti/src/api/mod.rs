//! Public API module.
//!
//! This module contains the user-facing API for the `wifimulti` crate.

pub mod config;
pub mod models;
pub mod radio;
pub mod wifi_multi;
