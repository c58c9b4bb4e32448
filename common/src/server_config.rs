use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

// "database": {
//   "dbtype": "postgresql",
//   "host": "127.0.0.1",
//   "port": 5432,
//   "username": "root",
//   "password": "secret",
//   "database": "clinic"
// }
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub dbtype: String, //数据库类型 postgresql | memory
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

fn default_access_token_minutes() -> i64 {
    5
}

fn default_refresh_token_days() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub log: Option<LogConfig>,
}

static APP_ENV: &str = "APP_ENV";
static APP_PREFIX: &str = "CLINIC";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    // 1. 加载 .env 文件
    dotenv().ok();

    // 2. 从 .env 获取当前环境 (默认 dev)
    let env = env::var(APP_ENV).unwrap_or_else(|_| "dev".into());

    // 3. 动态加载配置文件 (如 application.dev.json)
    load_config_from(&format!("application.{}.json", env))
}

pub fn load_config_from(config_path: &str) -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name(config_path).required(true))
        // 环境变量覆盖配置, 如 CLINIC_JWT__SECRET=...
        .add_source(
            Environment::with_prefix(APP_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

pub fn generate_pg_database_connection(dbconfig: &DatabaseConfig) -> Result<String, String> {
    if dbconfig.host.is_empty() || dbconfig.database.is_empty() {
        return Err("database host and name are required".to_string());
    }
    // 密码中可能含有 @ : / 等字符
    let password = urlencoding::encode(&dbconfig.password);
    Ok(format!(
        "postgresql://{}:{}@{}:{}/{}",
        dbconfig.username, password, dbconfig.host, dbconfig.port, dbconfig.database
    ))
}
