use clap::ValueEnum;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Install the stderr subscriber. Later calls are ignored.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

/// Forward a session diagnostic into the tracing pipeline.
pub fn forward_session_log(level: serlink_session::LogLevel, message: &str) {
    use serlink_session::LogLevel as Session;

    match level {
        Session::Trace => tracing::trace!(target: "serlink::session", "{message}"),
        Session::Debug => tracing::debug!(target: "serlink::session", "{message}"),
        Session::Info => tracing::info!(target: "serlink::session", "{message}"),
        Session::Warning => tracing::warn!(target: "serlink::session", "{message}"),
        Session::Error | Session::Fatal => {
            tracing::error!(target: "serlink::session", "{message}")
        }
    }
}

/// Forward a link status notice into the tracing pipeline.
pub fn forward_status(code: serlink_session::StatusCode, message: &str) {
    use serlink_session::StatusCode;

    match code {
        StatusCode::ConnectionActive => tracing::debug!(status = %code, "{message}"),
        StatusCode::ConnectionLost => tracing::warn!(status = %code, "{message}"),
        _ => tracing::error!(status = %code, "{message}"),
    }
}
