//! different utility modules used throughout the project
/// server configuration: TOML file + command line overrides
pub mod config;
/// tiny module to set up terminal/file logging
pub mod logger;
/// comparison plot of a function and its antiderivative, rendered to PNG bytes
pub mod plots;
