// 完了ログアダプター
//
// 適用済みバージョンの永続記録を提供します。期待される2つの保存先、
// バージョン文字列をキーとするデータベーステーブルと、バージョン文字列を
// 1行ずつ追記するフラットテキストファイルの両方を実装します。

use crate::adapters::traits::{CompletionEntry, CompletionLog};
use crate::core::error::MigrationError;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use std::collections::HashSet;
use std::path::PathBuf;

/// SQL文字列リテラル用のエスケープ
fn escape_sql(value: &str) -> String {
    value.replace('\'', "''")
}

/// データベーステーブルによる完了ログ
///
/// バージョン文字列を主キーとする1テーブルに開始・終了時刻とともに記録します。
#[derive(Debug, Clone)]
pub struct DatabaseCompletionLog {
    pool: AnyPool,
    table: String,
}

impl DatabaseCompletionLog {
    /// 新しいDatabaseCompletionLogを作成
    pub fn new(pool: AnyPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// ログテーブル作成SQLを生成
    pub fn generate_create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    version VARCHAR(255) PRIMARY KEY,\n    start_time VARCHAR(64) NOT NULL,\n    end_time VARCHAR(64) NOT NULL\n)",
            self.table
        )
    }

    /// エントリ追記のINSERT SQLを生成
    pub fn generate_append_sql(&self, entry: &CompletionEntry) -> String {
        format!(
            "INSERT INTO {} (version, start_time, end_time) VALUES ('{}', '{}', '{}')",
            self.table,
            escape_sql(&entry.version),
            entry.started_at.to_rfc3339(),
            entry.finished_at.to_rfc3339()
        )
    }

    /// エントリ削除のDELETE SQLを生成
    pub fn generate_remove_sql(&self, version: &str) -> String {
        format!(
            "DELETE FROM {} WHERE version = '{}'",
            self.table,
            escape_sql(version)
        )
    }

    /// ログテーブルが無ければ作成
    pub async fn ensure_table(&self) -> Result<(), MigrationError> {
        let sql = self.generate_create_table_sql();
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::CompletionLog {
                message: format!("Failed to create completion log table: {}", e),
            })
    }
}

#[async_trait]
impl CompletionLog for DatabaseCompletionLog {
    async fn append(&self, entry: &CompletionEntry) -> Result<(), MigrationError> {
        let sql = self.generate_append_sql(entry);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::CompletionLog {
                message: format!("Failed to append completion log entry: {}", e),
            })
    }

    async fn remove(&self, version: &str) -> Result<(), MigrationError> {
        let sql = self.generate_remove_sql(version);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| MigrationError::CompletionLog {
                message: format!("Failed to remove completion log entry: {}", e),
            })
    }

    async fn list(&self) -> Result<HashSet<String>, MigrationError> {
        let sql = format!("SELECT version FROM {}", self.table);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrationError::CompletionLog {
                message: format!("Failed to list completion log entries: {}", e),
            })?;

        Ok(rows.iter().map(|row| row.get::<String, _>(0)).collect())
    }

    async fn latest(&self) -> Result<Option<String>, MigrationError> {
        let sql = format!(
            "SELECT version FROM {} ORDER BY end_time DESC, version DESC LIMIT 1",
            self.table
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrationError::CompletionLog {
                message: format!("Failed to fetch latest version: {}", e),
            })?;

        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

/// フラットテキストファイルによる完了ログ
///
/// バージョン文字列を1行ずつ追記します。削除はファイルの書き直しで行います。
#[derive(Debug, Clone)]
pub struct FileCompletionLog {
    path: PathBuf,
}

impl FileCompletionLog {
    /// 新しいFileCompletionLogを作成
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn io_error(&self, context: &str, e: std::io::Error) -> MigrationError {
        MigrationError::CompletionLog {
            message: format!("{}: {} ({})", context, self.path.display(), e),
        }
    }

    /// ファイルの全行を読み込む（ファイルが無ければ空）
    async fn read_versions(&self) -> Result<Vec<String>, MigrationError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error("Failed to read completion log", e)),
        }
    }
}

#[async_trait]
impl CompletionLog for FileCompletionLog {
    async fn append(&self, entry: &CompletionEntry) -> Result<(), MigrationError> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error("Failed to open completion log", e))?;

        file.write_all(format!("{}\n", entry.version).as_bytes())
            .await
            .map_err(|e| self.io_error("Failed to append completion log entry", e))
    }

    async fn remove(&self, version: &str) -> Result<(), MigrationError> {
        let versions = self.read_versions().await?;
        let remaining: Vec<String> = versions.into_iter().filter(|v| v != version).collect();

        let mut content = remaining.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error("Failed to rewrite completion log", e))
    }

    async fn list(&self) -> Result<HashSet<String>, MigrationError> {
        Ok(self.read_versions().await?.into_iter().collect())
    }

    async fn latest(&self) -> Result<Option<String>, MigrationError> {
        Ok(self.read_versions().await?.into_iter().last())
    }
}
