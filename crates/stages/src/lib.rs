//! Per-user stage management driven by reactions on a control message.
//!
//! Each community gets its own worker ([`worker::CommunityHandle`]) owning a
//! [`community::CommunityState`]; the [`dispatcher::Dispatcher`] routes
//! platform events and sweep ticks to them.

pub mod commands;
pub mod community;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod pair;
pub mod reconciler;
pub mod registry;
pub mod sweeper;
pub mod worker;

#[cfg(test)]
mod testing;

pub use {
    commands::{Command, CommandTable},
    community::{CommunityOptions, CommunityState, CommunityTask},
    dispatcher::Dispatcher,
    error::{Result, StageError},
    pair::DynamicResourcePair,
    registry::ResourceRegistry,
    sweeper::Sweeper,
};
