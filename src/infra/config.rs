use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

use crate::core::schema_builder::WritePolicy;
use crate::error::{AppError, Result};
use crate::models::schema::TableRef;

const DEFAULT_TABLE: &str = "csv_data_table01";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
    pub table: TableRef,
    pub csv_path: Option<PathBuf>,
    pub policy: WritePolicy,
    pub delimiter: u8,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源构造配置，空值视为未设置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let connect_options = match get("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url)
                .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {}", e)))?,
            None => PgConnectOptions::new()
                .host(&require("POSTGRES_HOST")?)
                .port(parse_or("POSTGRES_PORT", get("POSTGRES_PORT"), 5432)?)
                .username(&require("POSTGRES_USER")?)
                .password(&require("POSTGRES_PASSWORD")?)
                .database(&require("POSTGRES_DB")?),
        };

        let delimiter = match get("CSV_DELIMITER") {
            Some(d) if d.len() == 1 => d.as_bytes()[0],
            Some(d) => {
                return Err(AppError::Config(format!(
                    "CSV_DELIMITER must be a single byte, got {:?}",
                    d
                )))
            }
            None => b',',
        };

        let policy = if parse_or("INGEST_APPEND", get("INGEST_APPEND"), false)? {
            WritePolicy::Append
        } else {
            WritePolicy::Overwrite
        };

        Ok(Self {
            connect_options,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5)?,
            table: TableRef::new(
                get("POSTGRES_SCHEMA").unwrap_or_else(|| "public".to_string()),
                get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            ),
            csv_path: get("CSV_PATH").map(PathBuf::from),
            policy,
            delimiter,
            bind_addr: parse_or(
                "BIND_ADDR",
                get("BIND_ADDR"),
                SocketAddr::from(([0, 0, 0, 0], 8000)),
            )?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {:?}", key, v))),
        None => Ok(default),
    }
}
