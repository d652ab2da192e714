//! Binding between a conversation and a configured external database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Engine family of an external datasource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DatasourceType {
    Mysql,
    Postgresql,
    Oracle,
    Sqlserver,
    Clickhouse,
    Starrocks,
    Doris,
    Other(String),
}

impl DatasourceType {
    pub fn as_str(&self) -> &str {
        match self {
            DatasourceType::Mysql => "mysql",
            DatasourceType::Postgresql => "postgresql",
            DatasourceType::Oracle => "oracle",
            DatasourceType::Sqlserver => "sqlserver",
            DatasourceType::Clickhouse => "clickhouse",
            DatasourceType::Starrocks => "starrocks",
            DatasourceType::Doris => "doris",
            DatasourceType::Other(name) => name.as_str(),
        }
    }
}

impl FromStr for DatasourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => DatasourceType::Mysql,
            "postgresql" | "postgres" | "pg" => DatasourceType::Postgresql,
            "oracle" => DatasourceType::Oracle,
            "sqlserver" | "mssql" => DatasourceType::Sqlserver,
            "clickhouse" | "ck" => DatasourceType::Clickhouse,
            "starrocks" => DatasourceType::Starrocks,
            "doris" => DatasourceType::Doris,
            other => DatasourceType::Other(other.to_string()),
        })
    }
}

impl From<String> for DatasourceType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<DatasourceType> for String {
    fn from(value: DatasourceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DatasourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which external database a conversation talks to, and under which
/// governor session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDatasourceBinding {
    pub datasource_id: i64,
    pub datasource_type: DatasourceType,
    /// Opaque connection settings, decrypted only by a `ConfigCipher`.
    pub encrypted_config: String,
    pub session_id: String,
}

impl ExternalDatasourceBinding {
    /// Bind to a datasource. Without an explicit conversation id the session
    /// id falls back to `datasource_<id>`.
    pub fn new(
        datasource_id: i64,
        datasource_type: DatasourceType,
        encrypted_config: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| fallback_session_id(datasource_id));
        Self {
            datasource_id,
            datasource_type,
            encrypted_config: encrypted_config.into(),
            session_id,
        }
    }
}

pub fn fallback_session_id(datasource_id: i64) -> String {
    format!("datasource_{datasource_id}")
}
