//! Shared fixtures for datachat_engine integration tests.
//!
//! Spreadsheets are generated in memory; live-database collaborators are
//! in-process fakes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_xlsxwriter::Workbook;
use serde_json::{json, Map, Value};

use datachat_engine::datasource::{
    ConfigCipher, DatasourceRecord, DatasourceType, FieldMetadata, LiveQueryExecutor,
    MetadataStore, TableMetadata,
};
use datachat_engine::errors::{EngineError, EngineResult};
use datachat_engine::spec::{GovernorConfig, RegistryConfig};
use datachat_engine::{SessionRegistry, ToolCallGovernor};

/// One spreadsheet cell for fixture workbooks.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

/// Build an xlsx workbook with one sheet per `(name, rows)`; the first row
/// is the header.
pub fn workbook(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).expect("valid sheet name");
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Text(text) => {
                        sheet.write_string(r, c, *text).expect("write string");
                    }
                    Cell::Number(value) => {
                        sheet.write_number(r, c, *value).expect("write number");
                    }
                    Cell::Blank => {}
                }
            }
        }
    }
    workbook.save_to_buffer().expect("workbook should serialize")
}

/// Customers (3 rows), Orders (4 rows), Products (2 rows).
pub fn three_sheet_workbook() -> Vec<u8> {
    use Cell::{Number as N, Text as T};
    workbook(&[
        (
            "Customers",
            vec![
                vec![T("id"), T("name")],
                vec![N(1.0), T("Acme")],
                vec![N(2.0), T("Globex")],
                vec![N(3.0), T("Initech")],
            ],
        ),
        (
            "Orders",
            vec![
                vec![T("order_id"), T("customer_id"), T("amount")],
                vec![N(10.0), N(1.0), N(99.5)],
                vec![N(11.0), N(2.0), N(15.0)],
                vec![N(12.0), N(2.0), N(7.25)],
                vec![N(13.0), N(3.0), N(42.0)],
            ],
        ),
        (
            "Products",
            vec![
                vec![T("sku"), T("price")],
                vec![T("A-1"), N(3.5)],
                vec![T("B-2"), N(8.0)],
            ],
        ),
    ])
}

/// A `TestData` sheet with five rows whose `owner` column is `owner`.
pub fn test_data_workbook(owner: &'static str) -> Vec<u8> {
    use Cell::{Number as N, Text as T};
    let mut rows = vec![vec![T("id"), T("owner"), T("score")]];
    for i in 1..=5 {
        rows.push(vec![N(i as f64), T(owner), N(i as f64 * 1.5)]);
    }
    workbook(&[("TestData", rows)])
}

/// Fifteen sales rows.
pub fn sales_csv() -> Vec<u8> {
    let mut text = String::from("sale_id,region,amount,sold_on\n");
    for i in 1..=15 {
        let region = ["north", "south", "east"][i % 3];
        text.push_str(&format!("{i},{region},{}.50,2024-01-{i:02}\n", i * 10));
    }
    text.into_bytes()
}

pub fn registry() -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(RegistryConfig::default()))
}

pub fn governor(max_calls: u32, failure_limit: u32) -> Arc<ToolCallGovernor> {
    Arc::new(ToolCallGovernor::new(GovernorConfig {
        max_calls_per_session: max_calls,
        consecutive_failure_limit: failure_limit,
        ledger_capacity: 64,
    }))
}

#[derive(Default)]
pub struct InMemoryMetadata {
    pub records: HashMap<i64, DatasourceRecord>,
}

#[async_trait]
impl MetadataStore for InMemoryMetadata {
    async fn datasource(&self, datasource_id: i64) -> EngineResult<Option<DatasourceRecord>> {
        Ok(self.records.get(&datasource_id).cloned())
    }
}

/// "Decrypts" by parsing the stored text as JSON.
pub struct PlainCipher;

impl ConfigCipher for PlainCipher {
    fn decrypt(&self, encrypted: &str) -> EngineResult<Value> {
        serde_json::from_str(encrypted).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Returns canned rows for known SQL and counts invocations.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub responses: HashMap<String, Result<Vec<Map<String, Value>>, String>>,
    pub calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn respond(mut self, sql: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.as_object().cloned().expect("object row"))
            .collect();
        self.responses.insert(sql.to_string(), Ok(rows));
        self
    }

    pub fn fail(mut self, sql: &str, message: &str) -> Self {
        self.responses.insert(sql.to_string(), Err(message.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveQueryExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _datasource_type: &DatasourceType,
        config: &Value,
        sql: &str,
    ) -> EngineResult<Vec<Map<String, Value>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if config.get("host").is_none() {
            return Err(EngineError::Connection("no host configured".to_string()));
        }
        match self.responses.get(sql) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(EngineError::Query(message.clone())),
            None => Err(EngineError::Query(format!("unexpected SQL: {sql}"))),
        }
    }
}

/// Datasource 7: orders and customers with a diagram edge between them.
pub fn orders_datasource() -> DatasourceRecord {
    let field = |id, name: &str, field_type: &str, comment: Option<&str>| FieldMetadata {
        id,
        name: name.to_string(),
        field_type: field_type.to_string(),
        comment: comment.map(str::to_string),
    };
    DatasourceRecord {
        id: 7,
        datasource_type: DatasourceType::Starrocks,
        tables: vec![
            TableMetadata {
                id: 1,
                name: "t_orders".to_string(),
                comment: Some("Customer orders".to_string()),
                columns: vec![
                    field(11, "id", "bigint", None),
                    field(12, "customer_id", "bigint", Some("buyer")),
                ],
            },
            TableMetadata {
                id: 2,
                name: "t_customers".to_string(),
                comment: None,
                columns: vec![field(21, "id", "bigint", None)],
            },
        ],
        table_relation: json!([
            {"id": 1, "shape": "er-rect", "ports": {"items": [
                {"id": 12, "attrs": {"portNameLabel": {"text": "customer_id"}}}
            ]}},
            {"id": 2, "shape": "er-rect"},
            {"shape": "edge", "source": {"cell": 1, "port": 12}, "target": {"cell": 2, "port": 21}}
        ]),
    }
}

pub fn encrypted_config() -> String {
    json!({"host": "db.internal", "port": 9030}).to_string()
}
