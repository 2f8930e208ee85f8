// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source = "src"
/// output = "dist"
/// declarations = "dist/dts"
/// cache_file = ".tsbuildinfo"
///
/// [build]
/// cmd = "tsup"
/// watch_args = ["--watch"]
///
/// [watch]
/// quiet_period_ms = 500
/// ```
///
/// All sections are optional and have defaults matching the usual
/// `src` → `dist` package layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration. Obtain one through `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub build: BuildSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        build: BuildSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            paths,
            build,
            watch,
        }
    }
}

/// `[paths]` section. Every entry is relative to the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Declaration-output root. `None` disables its reconciliation.
    #[serde(default = "default_declarations")]
    pub declarations: Option<PathBuf>,

    /// Incremental-build cache file owned by the build tool.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

fn default_declarations() -> Option<PathBuf> {
    Some(PathBuf::from("dist/dts"))
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(".tsbuildinfo")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            declarations: default_declarations(),
            cache_file: default_cache_file(),
        }
    }
}

impl PathsSection {
    /// Join every configured path onto `working_dir`.
    pub fn resolve(&self, working_dir: &Path) -> ResolvedPaths {
        ResolvedPaths {
            source_root: working_dir.join(&self.source),
            output_root: working_dir.join(&self.output),
            declaration_root: self.declarations.as_ref().map(|d| working_dir.join(d)),
            cache_file: working_dir.join(&self.cache_file),
        }
    }
}

/// Absolute roots the core works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub declaration_root: Option<PathBuf>,
    pub cache_file: PathBuf,
}

impl ResolvedPaths {
    /// Output root first, then the declaration root if configured.
    pub fn output_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.output_root.clone()];
        if let Some(dts) = &self.declaration_root {
            if *dts != self.output_root {
                roots.push(dts.clone());
            }
        }
        roots
    }
}

/// `[build]` section: how to launch the watch-mode build tool.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_cmd")]
    pub cmd: String,

    /// Arguments that put the tool into its own watch mode.
    #[serde(default = "default_watch_args")]
    pub watch_args: Vec<String>,

    /// Name of the build-mode environment variable.
    #[serde(default = "default_mode_var")]
    pub mode_var: String,

    /// Value of the build-mode variable while watching.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Extra environment entries for the build process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Regex patterns; stderr lines matching any of them are not forwarded.
    #[serde(default = "default_suppress_stderr")]
    pub suppress_stderr: Vec<String>,

    /// Optional one-shot declaration generator run before each restart.
    #[serde(default)]
    pub typegen_cmd: Option<String>,
}

fn default_cmd() -> String {
    "tsup".to_string()
}

fn default_watch_args() -> Vec<String> {
    vec!["--watch".to_string()]
}

fn default_mode_var() -> String {
    "NODE_ENV".to_string()
}

fn default_mode() -> String {
    "development".to_string()
}

fn default_suppress_stderr() -> Vec<String> {
    vec![
        r"DeprecationWarning: The `punycode` module is deprecated".to_string(),
        r"Use `node --trace-deprecation \.\.\.` to show where the warning was created".to_string(),
    ]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: default_cmd(),
            watch_args: default_watch_args(),
            mode_var: default_mode_var(),
            mode: default_mode(),
            env: BTreeMap::new(),
            suppress_stderr: default_suppress_stderr(),
            typegen_cmd: None,
        }
    }
}

impl BuildSection {
    /// The full command line handed to the shell.
    pub fn command_line(&self) -> String {
        let mut line = self.cmd.trim().to_string();
        for arg in &self.watch_args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// `[watch]` section: filtering and timing.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// File globs (relative to the source root) worth reacting to.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Globs for files and directories to ignore entirely.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Orchestrator-level coalescing window.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Per-path "await write finish" window.
    #[serde(default = "default_stability_ms")]
    pub stability_ms: u64,

    /// Whether a removal also schedules a build restart.
    #[serde(default = "default_true")]
    pub restart_on_remove: bool,

    /// Run a full reconciliation before the first spawn.
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,

    /// Upper bound for the shutdown cleanup sequence.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_include() -> Vec<String> {
    vec!["**/*.ts".to_string(), "**/*.tsx".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules".to_string(),
        "**/node_modules/**".to_string(),
        "**/.*".to_string(),
        "**/.*/**".to_string(),
    ]
}

fn default_quiet_period_ms() -> u64 {
    500
}

fn default_stability_ms() -> u64 {
    200
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            quiet_period_ms: default_quiet_period_ms(),
            stability_ms: default_stability_ms(),
            restart_on_remove: true,
            reconcile_on_startup: true,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_conventional_layout() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        assert_eq!(raw.paths.source, PathBuf::from("src"));
        assert_eq!(raw.paths.declarations, Some(PathBuf::from("dist/dts")));
        assert_eq!(raw.build.command_line(), "tsup --watch");
        assert_eq!(raw.watch.quiet_period_ms, 500);
        assert!(raw.watch.restart_on_remove);
    }

    #[test]
    fn output_roots_skip_duplicate_declaration_root() {
        let paths = PathsSection {
            declarations: Some(PathBuf::from("dist")),
            ..PathsSection::default()
        };
        let resolved = paths.resolve(Path::new("/work"));
        assert_eq!(resolved.output_roots(), vec![PathBuf::from("/work/dist")]);
    }
}
