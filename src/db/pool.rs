use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 创建数据库连接池 (仅用于启动时读取账本快照)
pub async fn create_pool(database_url: &str, config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(connect_options(database_url, config)?)
        .await
}

/// 解析连接串并按配置设置慢语句日志
///
/// 账本加载是整表扫描，启动卡住时靠这条 WARN 定位。
pub fn connect_options(database_url: &str, config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?;

    Ok(match config.slow_statement_ms {
        0 => options.disable_statement_logging(),
        ms => options.log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_millis(ms)),
    })
}
