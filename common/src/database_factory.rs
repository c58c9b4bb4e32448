use crate::server_config;
use crate::server_config::DatabaseConfig;
use database::clinic_dbprovider::DbProvider;
use database::clinic_mem::MemDbProvider;
use database::clinic_pg::PgDbProvider;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Unsupported database: {0}")]
    UnsupportedDatabase(String),
}

// 根据配置文件生成数据库实例, 返回 Result 而不是直接退出
pub async fn create_db_instance(
    dbconfig: &DatabaseConfig,
) -> Result<Arc<dyn DbProvider>, DatabaseError> {
    let db_type = dbconfig.dbtype.to_lowercase();
    match db_type.as_str() {
        "postgresql" => {
            let conn_url = server_config::generate_pg_database_connection(dbconfig)
                .map_err(DatabaseError::ConfigError)?;

            let pg_provider = PgDbProvider::new(conn_url);
            // 启动时建表, 同时验证连接可用
            pg_provider
                .init_schema()
                .await
                .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
            Ok(Arc::new(pg_provider))
        }
        "memory" => Ok(Arc::new(MemDbProvider::new())),
        _ => Err(DatabaseError::UnsupportedDatabase(format!(
            "Unsupported database type: {}, only postgresql and memory are supported",
            db_type
        ))),
    }
}
