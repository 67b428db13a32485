//! Utility modules.

pub(crate) mod clock;
pub(crate) mod utils;
