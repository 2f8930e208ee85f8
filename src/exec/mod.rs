// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessLauncher` trait and the `ShellLauncher`
//!   used in production, which tests replace with a fake implementation.
//! - [`supervisor`] owns the single live build process.
//! - [`stream_filter`] forwards the build's stderr minus known noise.
//! - [`typegen`] runs the optional declaration generator.

pub mod backend;
pub mod stream_filter;
pub mod supervisor;
pub mod typegen;

pub use backend::{
    shell_command, BuildCommand, LaunchedProcess, ProcessLauncher, ProcessStatus, ShellLauncher,
};
pub use stream_filter::StderrFilter;
pub use supervisor::{BuildSupervisor, SupervisedProcess};
pub use typegen::TypegenRunner;
