// Logging setup
//
// Stdout gets colored, human-oriented lines; the optional file sink gets the
// same lines without colors, in a date-based file rotated daily by fern.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ValueEnum;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Log verbosity as exposed on the command line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// Per-module log level override, written as `module=level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module: String,
    pub level: LogLevel,
}

impl FromStr for ModuleConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, level) = s
            .split_once('=')
            .ok_or_else(|| format!("Invalid module filter '{}', expected module=level", s))?;
        let level = <LogLevel as FromStr>::from_str(level.trim())
            .map_err(|_| format!("Unknown log level '{}'", level))?;
        Ok(Self {
            module: module.trim().to_string(),
            level,
        })
    }
}

/// Install the global logger. Must be called once, before any log macro.
pub fn setup(
    level: LevelFilter,
    file_level: LevelFilter,
    logs_dir: Option<&Path>,
    filename: &str,
    disable_colors: bool,
    module_levels: &[(String, LevelFilter)],
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .debug(Color::Green)
        .info(Color::Cyan)
        .warn(Color::Yellow)
        .error(Color::Red);

    let mut stdout = fern::Dispatch::new()
        .format(move |out, message, record| {
            if disable_colors {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            }
        })
        .level(level);
    for (module, module_level) in module_levels {
        stdout = stdout.level_for(module.clone(), *module_level);
    }
    let stdout = stdout.chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new().chain(stdout);

    if let Some(dir) = logs_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create logs directory {}", dir.display()))?;

        let mut file = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(file_level);
        for (module, module_level) in module_levels {
            file = file.level_for(module.clone(), *module_level);
        }
        let prefix = dir.join("");
        let file = file.chain(fern::DateBased::new(prefix, format!("%Y-%m-%d.{}", filename)));

        dispatch = dispatch.chain(file);
    }

    dispatch.apply().context("Failed to set the global logger")?;
    Ok(())
}
