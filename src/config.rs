use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 默认配置文件名 (存在时自动读取)
pub const DEFAULT_CONFIG_FILE: &str = "adjudicator.toml";

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub batch: BatchConfig,
    pub screening: ScreeningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体上限 (字节)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// 可选的账本数据库来源 (只读)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub ledger_table: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 账本表较大时加载可能很慢，超过该阈值 (毫秒) 的语句记 WARN；0 表示关闭
    pub slow_statement_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            ledger_table: "invoice_line_item".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
            slow_statement_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// 账本种子 CSV
    pub seed_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// None 时使用 rayon 全局线程池
    pub worker_threads: Option<usize>,
    pub progress_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            progress_every: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub enabled: bool,
    pub amount_ceiling: f64,
    pub review_threshold: f64,
    pub timeout_ms: u64,
    pub concurrency: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amount_ceiling: 10_000.0,
            review_threshold: 0.8,
            timeout_ms: 500,
            concurrency: 8,
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 < 配置文件 < ADJUDICATOR__* 环境变量 < 兼容变量
    ///
    /// 兼容变量沿用旧服务的 `DATABASE_URL`、`SERVER_HOST`、`SERVER_PORT`。
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("ADJUDICATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .map(i64::from),
            )?
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_service_conventions() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert!(config.database.url.is_none());
        assert!(!config.screening.enabled);
        assert_eq!(config.batch.progress_every, 100);
        assert_eq!(config.database.slow_statement_ms, 5000);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = std::env::temp_dir().join(format!("adjudicator-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[database]\nslow_statement_ms = 0\n\n[batch]\nworker_threads = 3\n\n[screening]\nenabled = true\nreview_threshold = 0.5\n"
        )
        .unwrap();
        drop(file);

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.batch.worker_threads, Some(3));
        assert!(config.screening.enabled);
        assert_eq!(config.screening.review_threshold, 0.5);
        assert_eq!(config.screening.timeout_ms, 500);
        assert_eq!(config.database.slow_statement_ms, 0);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("adjudicator-does-not-exist.toml");
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
