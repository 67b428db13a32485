//! Type definitions and constants.
//!
//! This module contains radio codes and manager defaults.

pub(crate) mod constants;
