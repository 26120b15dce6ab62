// テスト用の共有モック
//
// ライブスキーマをメモリ上に保持するスキーマ適用者と、メモリ上の完了ログ。

#![allow(dead_code)]

use async_trait::async_trait;
use metamorph::adapters::traits::{CompletionEntry, CompletionLog, SchemaApplier};
use metamorph::core::error::MigrationError;
use metamorph::core::schema::{Column, ForeignKey, Index, TableDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// メモリ上のテーブル状態
#[derive(Debug, Clone, Default)]
pub struct StoredTable {
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// メモリ上のスキーマ適用者
///
/// 呼び出された操作を文字列として記録し、テーブル状態を更新します。
/// `fail_on_sql` に一致する生SQLの実行は失敗します。
#[derive(Debug, Default)]
pub struct MockApplier {
    pub tables: Mutex<HashMap<String, StoredTable>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_on_sql: Option<String>,
}

impl MockApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, table: StoredTable) -> Self {
        self.tables.lock().unwrap().insert(name.to_string(), table);
        self
    }

    pub fn failing_on_sql(mut self, sql: &str) -> Self {
        self.fail_on_sql = Some(sql.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SchemaApplier for MockApplier {
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError> {
        Ok(self.tables.lock().unwrap().contains_key(table))
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<Column>, MigrationError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn describe_indexes(&self, table: &str) -> Result<Vec<Index>, MigrationError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }

    async fn describe_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, MigrationError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<(), MigrationError> {
        self.record(format!("create_table {}", definition.name));
        self.tables.lock().unwrap().insert(
            definition.name.clone(),
            StoredTable {
                columns: definition.columns.clone(),
                indexes: definition.indexes.clone(),
                foreign_keys: definition.foreign_keys.clone(),
            },
        );
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &Column) -> Result<(), MigrationError> {
        self.record(format!("add_column {} {}", table, column.name));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.columns.push(column.clone());
        }
        Ok(())
    }

    async fn modify_column(&self, table: &str, column: &Column) -> Result<(), MigrationError> {
        self.record(format!("modify_column {} {}", table, column.name));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            if let Some(existing) = stored.columns.iter_mut().find(|c| c.name == column.name) {
                *existing = column.clone();
            }
        }
        Ok(())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), MigrationError> {
        self.record(format!("drop_column {} {}", table, column));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.columns.retain(|c| c.name != column);
        }
        Ok(())
    }

    async fn add_index(&self, table: &str, index: &Index) -> Result<(), MigrationError> {
        self.record(format!("add_index {} {}", table, index.name));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.indexes.push(index.clone());
        }
        Ok(())
    }

    async fn drop_index(&self, table: &str, index: &str) -> Result<(), MigrationError> {
        self.record(format!("drop_index {} {}", table, index));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.indexes.retain(|i| i.name != index);
        }
        Ok(())
    }

    async fn add_primary_key(&self, table: &str, index: &Index) -> Result<(), MigrationError> {
        self.record(format!("add_primary_key {}", table));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.indexes.push(index.clone());
        }
        Ok(())
    }

    async fn drop_primary_key(&self, table: &str) -> Result<(), MigrationError> {
        self.record(format!("drop_primary_key {}", table));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.indexes.retain(|i| !i.is_primary());
        }
        Ok(())
    }

    async fn add_foreign_key(&self, table: &str, key: &ForeignKey) -> Result<(), MigrationError> {
        self.record(format!("add_foreign_key {} {}", table, key.name));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.foreign_keys.push(key.clone());
        }
        Ok(())
    }

    async fn drop_foreign_key(&self, table: &str, key: &str) -> Result<(), MigrationError> {
        self.record(format!("drop_foreign_key {} {}", table, key));
        if let Some(stored) = self.tables.lock().unwrap().get_mut(table) {
            stored.foreign_keys.retain(|k| k.name != key);
        }
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<(), MigrationError> {
        if self.fail_on_sql.as_deref() == Some(sql) {
            return Err(MigrationError::applier_with_sql("statement rejected", sql));
        }
        self.record(format!("execute {}", sql));
        Ok(())
    }
}

/// メモリ上の完了ログ
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub entries: Mutex<Vec<CompletionEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(self, versions: &[&str]) -> Self {
        {
            let now = chrono::Utc::now();
            let mut entries = self.entries.lock().unwrap();
            for version in versions {
                entries.push(CompletionEntry::new(version.to_string(), now, now));
            }
        }
        self
    }

    pub fn versions(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.version.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionLog for MemoryLog {
    async fn append(&self, entry: &CompletionEntry) -> Result<(), MigrationError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn remove(&self, version: &str) -> Result<(), MigrationError> {
        self.entries.lock().unwrap().retain(|e| e.version != version);
        Ok(())
    }

    async fn list(&self) -> Result<HashSet<String>, MigrationError> {
        Ok(self.versions().into_iter().collect())
    }

    async fn latest(&self) -> Result<Option<String>, MigrationError> {
        Ok(self.versions().last().cloned())
    }
}
