// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the `include` / `exclude` glob patterns for the source root.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Classifying raw notify events into typed [`WatchEvent`]s.
//! - Telling saves over existing files apart from new files.
//! - Holding events until the written path is stable.
//!
//! It does **not** decide what an event means for the build; that is the
//! engine's job.
//!
//! [`WatchEvent`]: crate::types::WatchEvent

pub mod event_handler;
pub mod known;
pub mod path_utils;
pub mod patterns;
pub mod settle;
pub mod watcher;

pub use event_handler::{classify, Classified};
pub use known::KnownFiles;
pub use patterns::WatchFilter;
pub use settle::WriteSettler;
pub use watcher::{spawn_watcher, WatcherHandle};
