//! 工具模块
//! 日志初始化等跨服务的基础设施

use log::LevelFilter;

/// 初始化全局日志输出
///
/// 进程内只应调用一次；重复调用时 fern 返回错误，由调用方决定忽略与否。
pub fn init_logging(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
