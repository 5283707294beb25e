use crate::Utils::config::Config;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;

/// Terminal logger plus an optional file logger, both at the configured level.
/// A second call (tests start several servers) keeps the first logger.
pub fn init_logger(config: &Config) -> Result<(), String> {
    let level = config.level_filter()?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.log_file {
        let file = File::create(path)
            .map_err(|e| format!("cannot create log file {}: {}", path.display(), e))?;
        loggers.push(WriteLogger::new(level, LogConfig::default(), file));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}
