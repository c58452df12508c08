use std::path::PathBuf;

use log::LevelFilter;
use log4rs::{
    append::rolling_file::{
        policy::compound::{
            roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
        },
        RollingFileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

type AnyError = Box<dyn std::error::Error>;

fn err(msg: impl Into<String>) -> AnyError {
    Box::new(std::io::Error::other(msg.into()))
}

fn log_paths() -> Result<(PathBuf, PathBuf), AnyError> {
    let logs_dir = dirs::data_local_dir()
        .ok_or_else(|| err("failed to resolve local data dir"))?
        .join("higu-patcher")
        .join("logs");
    let log_file = logs_dir.join("higu-patcher.log");
    Ok((logs_dir, log_file))
}

pub fn init() -> Result<(), AnyError> {
    let (logs_dir, log_file) = log_paths()?;
    std::fs::create_dir_all(&logs_dir).map_err(|e| err(e.to_string()))?;

    // 10MB per file, keep 5 rolled files.
    let roller = FixedWindowRoller::builder()
        .build(
            &logs_dir
                .join("higu-patcher.{}.log")
                .to_string_lossy()
                .to_string(),
            5,
        )
        .map_err(|e| err(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(10 * 1024 * 1024)), Box::new(roller));

    let file_appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} {M} - {m}{n}",
        )))
        .build(&log_file, Box::new(policy))
        .map_err(|e| err(e.to_string()))?;

    let cfg_builder = {
        let cfg_builder =
            Config::builder().appender(Appender::builder().build("file", Box::new(file_appender)));

        // In dev builds, also log to console for convenience.
        #[cfg(debug_assertions)]
        let cfg_builder = {
            use log4rs::append::console::ConsoleAppender;
            let stdout = ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
                .build();
            cfg_builder.appender(Appender::builder().build("stdout", Box::new(stdout)))
        };

        cfg_builder
    };

    let root_builder = {
        let root_builder = Root::builder().appender("file");
        #[cfg(debug_assertions)]
        let root_builder = root_builder.appender("stdout");
        root_builder
    };

    let cfg = cfg_builder
        .build(root_builder.build(LevelFilter::Info))
        .map_err(|e| err(e.to_string()))?;

    // Ignore error if already initialized.
    if log4rs::init_config(cfg).is_err() {
        return Ok(());
    }

    std::panic::set_hook(Box::new(|info| {
        log::error!("panic: {info}");
    }));

    log::info!("logger initialized");
    log::info!("log file: {}", log_file.to_string_lossy());
    Ok(())
}
