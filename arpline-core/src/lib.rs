//! # arpline-core
//!
//! UI-thread side of the arpline arpeggiator: pattern storage and editing,
//! compilation into a playable `Timeline`, configuration, and presets.
//!
//! ## Module Overview
//!
//! - [`compiler`]: `compile()` turns a `Pattern` into an immutable `Timeline`
//! - [`store`]: `SharedPattern`, the mutex-guarded pattern handle
//! - [`editor`]: `PatternEditor`, the editing entry points; every edit recompiles
//!   and publishes through a `TimelinePublisher`
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`persistence`]: JSON preset save/load with integrity checking

pub mod compiler;
pub mod config;
pub mod editor;
pub mod persistence;
pub mod store;

pub use compiler::compile;
pub use editor::{PatternEditor, TimelinePublisher};
pub use store::SharedPattern;
