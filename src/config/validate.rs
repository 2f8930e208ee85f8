// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DistwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DistwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.paths, raw.build, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_build(cfg)?;
    validate_timings(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> DistwatchError {
    DistwatchError::ConfigError(msg.into())
}

/// Drop `.` components so `./src` and `src` compare equal. An all-`.`
/// path becomes empty, which `starts_with` treats as everything's ancestor.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if cfg.paths.source.as_os_str().is_empty() {
        return Err(config_error("[paths].source must not be empty"));
    }
    let source_buf = normalized(&cfg.paths.source);
    let source = source_buf.as_path();

    let mut outputs: Vec<(&str, &Path)> = vec![("output", cfg.paths.output.as_path())];
    if let Some(dts) = &cfg.paths.declarations {
        outputs.push(("declarations", dts.as_path()));
    }

    for (key, raw_out) in outputs {
        if raw_out.as_os_str().is_empty() {
            return Err(config_error(format!("[paths].{key} must not be empty")));
        }
        let out_buf = normalized(raw_out);
        let out = out_buf.as_path();
        if out == source {
            return Err(config_error(format!(
                "[paths].{key} ({}) must differ from [paths].source",
                out.display()
            )));
        }
        // Reconciliation deletes under output roots; an output inside the
        // source tree would also feed the watcher with its own deletions.
        if out.starts_with(source) {
            return Err(config_error(format!(
                "[paths].{key} ({}) must not lie inside [paths].source ({})",
                out.display(),
                source.display()
            )));
        }
        if source.starts_with(out) {
            return Err(config_error(format!(
                "[paths].source ({}) must not lie inside [paths].{key} ({})",
                source.display(),
                out.display()
            )));
        }
    }

    if cfg.paths.cache_file.as_os_str().is_empty() {
        return Err(config_error("[paths].cache_file must not be empty"));
    }

    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.cmd.trim().is_empty() {
        return Err(config_error("[build].cmd must not be empty"));
    }
    if cfg.build.mode_var.trim().is_empty() {
        return Err(config_error("[build].mode_var must not be empty"));
    }
    if let Some(typegen) = &cfg.build.typegen_cmd {
        if typegen.trim().is_empty() {
            return Err(config_error(
                "[build].typegen_cmd must not be empty when set (remove it to disable)",
            ));
        }
    }
    Ok(())
}

fn validate_timings(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.quiet_period_ms == 0 {
        return Err(config_error("[watch].quiet_period_ms must be >= 1 (got 0)"));
    }
    if cfg.watch.shutdown_timeout_ms == 0 {
        return Err(config_error(
            "[watch].shutdown_timeout_ms must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (key, patterns) in [
        ("include", &cfg.watch.include),
        ("exclude", &cfg.watch.exclude),
    ] {
        for pat in patterns {
            Glob::new(pat).map_err(|e| {
                config_error(format!("invalid glob in [watch].{key}: {pat:?}: {e}"))
            })?;
        }
    }

    for pat in &cfg.build.suppress_stderr {
        Regex::new(pat).map_err(|e| {
            config_error(format!(
                "invalid regex in [build].suppress_stderr: {pat:?}: {e}"
            ))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    fn expect_config_error(raw: RawConfigFile, needle: &str) {
        match ConfigFile::try_from(raw) {
            Err(DistwatchError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
            }
            Err(e) => panic!("expected ConfigError, got {e:?}"),
            Ok(_) => panic!("expected ConfigError, got Ok"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.paths.output, PathBuf::from("dist"));
    }

    #[test]
    fn output_equal_to_source_is_rejected() {
        expect_config_error(
            raw("[paths]\nsource = \"src\"\noutput = \"src\"\n"),
            "must differ",
        );
    }

    #[test]
    fn output_inside_source_is_rejected() {
        expect_config_error(
            raw("[paths]\nsource = \"src\"\ndeclarations = \"src/types\"\n"),
            "must not lie inside",
        );
    }

    #[test]
    fn dot_prefixed_paths_are_compared_normalized() {
        expect_config_error(
            raw("[paths]\nsource = \"./src\"\noutput = \"src/out\"\n"),
            "must not lie inside",
        );
        expect_config_error(
            raw("[paths]\nsource = \"src\"\noutput = \"./src\"\n"),
            "must differ",
        );
    }

    #[test]
    fn package_root_as_source_is_rejected() {
        expect_config_error(raw("[paths]\nsource = \".\"\n"), "must not lie inside");
    }

    #[test]
    fn zero_quiet_period_is_rejected() {
        expect_config_error(raw("[watch]\nquiet_period_ms = 0\n"), "quiet_period_ms");
    }

    #[test]
    fn bad_glob_is_rejected() {
        expect_config_error(raw("[watch]\ninclude = [\"src/[*.ts\"]\n"), "invalid glob");
    }

    #[test]
    fn bad_regex_is_rejected() {
        expect_config_error(
            raw("[build]\nsuppress_stderr = [\"(unclosed\"]\n"),
            "invalid regex",
        );
    }

    #[test]
    fn empty_cmd_is_rejected() {
        expect_config_error(raw("[build]\ncmd = \"  \"\n"), "[build].cmd");
    }
}
