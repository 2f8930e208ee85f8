#![allow(dead_code)]

use distwatch::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn source(mut self, dir: &str) -> Self {
        self.config.paths.source = dir.into();
        self
    }

    pub fn output(mut self, dir: &str) -> Self {
        self.config.paths.output = dir.into();
        self
    }

    pub fn declarations(mut self, dir: Option<&str>) -> Self {
        self.config.paths.declarations = dir.map(Into::into);
        self
    }

    pub fn cache_file(mut self, file: &str) -> Self {
        self.config.paths.cache_file = file.into();
        self
    }

    pub fn cmd(mut self, cmd: &str, watch_args: &[&str]) -> Self {
        self.config.build.cmd = cmd.to_string();
        self.config.build.watch_args = watch_args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn typegen(mut self, cmd: &str) -> Self {
        self.config.build.typegen_cmd = Some(cmd.to_string());
        self
    }

    pub fn suppress_stderr(mut self, pattern: &str) -> Self {
        self.config.build.suppress_stderr.push(pattern.to_string());
        self
    }

    pub fn quiet_period_ms(mut self, ms: u64) -> Self {
        self.config.watch.quiet_period_ms = ms;
        self
    }

    pub fn stability_ms(mut self, ms: u64) -> Self {
        self.config.watch.stability_ms = ms;
        self
    }

    pub fn restart_on_remove(mut self, val: bool) -> Self {
        self.config.watch.restart_on_remove = val;
        self
    }

    pub fn reconcile_on_startup(mut self, val: bool) -> Self {
        self.config.watch.reconcile_on_startup = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
