use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime settings of the integral server. Every field has a default, so an empty
/// (or missing) TOML file is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// one of `error|warn|info|debug|trace|off`
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// number of points the plot samples
    pub samples: usize,
    /// plotted x range
    pub domain: (f64, f64),
    pub figure_width: u32,
    pub figure_height: u32,
    /// session slots kept by the graph store besides the default one
    pub max_sessions: usize,
    /// Simpson intervals of the definite-integral cross-check
    pub quadrature_intervals: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_file: None,
            samples: 400,
            domain: (-10.0, 10.0),
            figure_width: 1000,
            figure_height: 600,
            max_sessions: 64,
            quadrature_intervals: 2000,
        }
    }
}

/// Command line of `integral-server`; flags override the TOML file.
#[derive(Parser, Debug, Default)]
#[command(name = "integral-server", about = "Symbolic integration over HTTP")]
pub struct Args {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    /// error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config, String> {
        let config: Config =
            toml::from_str(text).map_err(|e| format!("invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Config::from_toml_str(&text)
    }

    /// File (if any) first, then the flags given on the command line.
    pub fn load(args: &Args) -> Result<Config, String> {
        let mut config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(host) = &args.host {
            config.host = host.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn level_filter(&self) -> Result<LevelFilter, String> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| format!("unknown log level '{}'", self.log_level))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), String> {
        self.level_filter()?;
        if self.samples < 2 {
            return Err(format!("samples must be at least 2, got {}", self.samples));
        }
        let (a, b) = self.domain;
        if !(a.is_finite() && b.is_finite() && a < b) {
            return Err(format!("domain must be an increasing finite range, got [{}, {}]", a, b));
        }
        if self.figure_width == 0 || self.figure_height == 0 {
            return Err("figure size must be positive".to_string());
        }
        if self.quadrature_intervals < 2 {
            return Err("quadrature_intervals must be at least 2".to_string());
        }
        Ok(())
    }
}
