use slog::LevelFilter;
use slog::{Drain, Logger, o};
use std::fs;
use std::fs::OpenOptions;
use std::sync::OnceLock;

// 全局logger静态变量
static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

// 设置全局logger
pub fn set_global_logger(logger: Logger) {
    let _ = GLOBAL_LOGGER.set(logger);
}

// 获取全局logger, 未初始化时返回丢弃所有记录的logger
pub fn get_logger() -> &'static Logger {
    GLOBAL_LOGGER.get_or_init(|| Logger::root(slog::Discard, o!()))
}

// 控制台与 ./logs/<name>.log 同时输出, 同时设置全局logger
pub fn setup_logging(policy_name: &str) -> Logger {
    let stdout_decorator = slog_term::TermDecorator::new().build();
    let stdout_drain = slog_term::FullFormat::new(stdout_decorator).build().fuse();
    let stdout_drain = slog_async::Async::new(stdout_drain).build().fuse();

    fs::create_dir_all("./logs").unwrap_or(());
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(format!("./logs/{}.log", policy_name));

    let clogger = match file {
        Ok(file) => {
            let file_decorator = slog_term::PlainDecorator::new(file);
            let file_drain = slog_term::FullFormat::new(file_decorator).build().fuse();
            let file_drain = slog_async::Async::new(file_drain).build().fuse();

            // 组合drains
            let drain = slog::Duplicate::new(stdout_drain, file_drain).map(slog::Fuse);
            let drain = LevelFilter::new(drain, slog::Level::Info).map(slog::Fuse);
            Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
        }
        Err(e) => {
            let drain = LevelFilter::new(stdout_drain, slog::Level::Info).map(slog::Fuse);
            let logger = Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")));
            slog::warn!(logger, "log file unavailable, console only"; "error" => %e);
            logger
        }
    };

    set_global_logger(clogger.clone());

    clogger
}
