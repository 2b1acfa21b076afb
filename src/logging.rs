//! Console logging bootstrap on top of the `log` facade and `log4rs`.

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::SimError;

/// Initializes the global logger with a stderr appender at the given level.
///
/// Must be called at most once per process; a second call reports a
/// configuration error.
pub fn init(level: LevelFilter) -> Result<(), SimError> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|err| SimError::ConfigError(format!("invalid logging configuration: {err}")))?;

    log4rs::init_config(config)
        .map_err(|err| SimError::ConfigError(format!("logger already initialized: {err}")))?;

    Ok(())
}
