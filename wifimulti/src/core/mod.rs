//! Core internal logic: the registry, the shared link state and the three
//! long-running loops that drive scanning, event handling and connecting.

pub(crate) mod connector;
pub(crate) mod dispatcher;
pub(crate) mod registry;
pub(crate) mod scan;
pub(crate) mod selection;
pub(crate) mod state;

#[cfg(test)]
pub(crate) mod mock;
