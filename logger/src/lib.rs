use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

/// Installs the global logger.
///
/// Records always go to `log_file`, truncated on startup, so store outages
/// stay visible to operators. `console` mirrors them to stdout.
pub fn setup(log_file: &str, console: bool) -> Result<(), fern::InitError> {
    std::fs::File::create(log_file)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let color = match record.level() {
                log::Level::Info => "green",
                log::Level::Warn => "yellow",
                log::Level::Error => "red",
                log::Level::Debug => "magenta",
                log::Level::Trace => "bright black",
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Utc::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level().to_string().color(color),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        // connection pools and drivers are noisy at debug
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("deadpool", log::LevelFilter::Warn)
        .level_for("deadpool_redis", log::LevelFilter::Warn)
        .level_for("redis", log::LevelFilter::Warn)
        .level_for("actix_server", log::LevelFilter::Info)
        .level_for("h2", log::LevelFilter::Off)
        .chain(fern::log_file(log_file)?);

    if console {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch.apply()?;
    Ok(())
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}
