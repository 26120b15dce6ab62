// データベース接続アダプターとスキーマ適用実装
//
// SQLxを使用したデータベース接続の管理と、SchemaApplierトレイトの
// SQL発行による実装を提供します。DDLはMySQL系の構文（MODIFY COLUMN,
// AFTER/FIRST, UNSIGNED）で生成されます。

use crate::core::error::MigrationError;
use crate::core::schema::{
    Column, ColumnPosition, ColumnType, ForeignKey, Index, IndexKind, TableDefinition,
};
use async_trait::async_trait;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool, Row};
use std::time::Duration;

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `connection_string` - 接続文字列
    /// * `timeout_secs` - 接続タイムアウト秒数（省略時は30秒）
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(
        &self,
        connection_string: &str,
        timeout_secs: Option<u64>,
    ) -> Result<AnyPool, MigrationError> {
        self.create_pool_options(timeout_secs)
            .connect(connection_string)
            .await
            .map_err(|e| {
                MigrationError::applier(format!("Failed to create database connection pool: {}", e))
            })
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, pool: &AnyPool) -> Result<(), MigrationError> {
        // シンプルなクエリで接続をテスト
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                MigrationError::applier(format!("Failed to test database connection: {}", e))
            })
    }

    /// プールオプションを作成
    pub fn create_pool_options(&self, timeout_secs: Option<u64>) -> PoolOptions<Any> {
        PoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
    }
}

impl Default for DatabaseConnectionService {
    fn default() -> Self {
        Self::new()
    }
}

/// 識別子をクォート
fn quote_ident(name: &str) -> String {
    format!("`{}`", name)
}

/// information_schemaの型名をColumnTypeにマッピング
fn column_type_from_sql(data_type: &str) -> ColumnType {
    match data_type.to_lowercase().as_str() {
        "int" | "integer" | "mediumint" => ColumnType::Integer,
        "bigint" => ColumnType::BigInteger,
        "smallint" => ColumnType::SmallInteger,
        "varchar" => ColumnType::Varchar,
        "char" => ColumnType::Char,
        "tinyint" | "boolean" | "bool" => ColumnType::Boolean,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" => ColumnType::DateTime,
        "timestamp" => ColumnType::Timestamp,
        "decimal" | "numeric" => ColumnType::Decimal,
        "float" => ColumnType::Float,
        "double" => ColumnType::Double,
        "json" => ColumnType::Json,
        "blob" | "binary" | "varbinary" => ColumnType::Blob,
        _ => ColumnType::Text,
    }
}

/// SQL発行によるスキーマ適用サービス
///
/// SchemaApplierの具象実装。ライブスキーマの観測はinformation_schemaへの
/// 問い合わせ、構造操作はDDLの発行で行います。各操作は独立に適用され、
/// 失敗時のロールバックは行いません。
#[derive(Debug, Clone)]
pub struct SqlSchemaApplier {
    pool: AnyPool,
}

impl SqlSchemaApplier {
    /// 新しいSqlSchemaApplierを作成
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// 接続プールへの参照を取得
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// カラム定義のSQL文字列を生成
    ///
    /// ALTER文で使用する場合のみ位置ヒント（FIRST / AFTER）を含めます。
    pub fn generate_column_definition(&self, column: &Column, with_position: bool) -> String {
        let mut parts = Vec::new();

        parts.push(quote_ident(&column.name));
        parts.push(column.column_type.to_sql_type(column.size));

        if column.unsigned {
            parts.push("UNSIGNED".to_string());
        }

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        // AUTO_INCREMENTはデータ型の後に指定
        if column.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if let Some(ref default_value) = column.default_value {
            parts.push(format!("DEFAULT {}", default_value));
        }

        if with_position {
            match &column.position {
                Some(ColumnPosition::First) => parts.push("FIRST".to_string()),
                Some(ColumnPosition::After(after)) => {
                    parts.push(format!("AFTER {}", quote_ident(after)));
                }
                None => {}
            }
        }

        parts.join(" ")
    }

    /// CREATE TABLE文を生成
    pub fn generate_create_table_sql(&self, definition: &TableDefinition) -> String {
        let mut lines: Vec<String> = definition
            .columns
            .iter()
            .map(|c| format!("    {}", self.generate_column_definition(c, false)))
            .collect();

        for index in &definition.indexes {
            let columns = index
                .columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            let line = match index.kind {
                IndexKind::Primary => format!("    PRIMARY KEY ({})", columns),
                IndexKind::Unique => {
                    format!("    UNIQUE KEY {} ({})", quote_ident(&index.name), columns)
                }
                IndexKind::Plain => {
                    format!("    KEY {} ({})", quote_ident(&index.name), columns)
                }
            };
            lines.push(line);
        }

        for key in &definition.foreign_keys {
            lines.push(format!("    {}", self.generate_foreign_key_clause(key)));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_ident(&definition.name),
            lines.join(",\n")
        );

        if let Some(engine) = definition.options.get("engine") {
            sql.push_str(&format!(" ENGINE={}", engine));
        }

        sql
    }

    /// 外部キー句を生成
    fn generate_foreign_key_clause(&self, key: &ForeignKey) -> String {
        let columns = key
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let referenced_columns = key
            .referenced_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let referenced_table = match &key.referenced_schema {
            Some(schema) => format!(
                "{}.{}",
                quote_ident(schema),
                quote_ident(&key.referenced_table)
            ),
            None => quote_ident(&key.referenced_table),
        };

        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&key.name),
            columns,
            referenced_table,
            referenced_columns
        );

        if let Some(on_update) = key.on_update {
            clause.push_str(&format!(" ON UPDATE {}", on_update));
        }
        if let Some(on_delete) = key.on_delete {
            clause.push_str(&format!(" ON DELETE {}", on_delete));
        }

        clause
    }

    /// ADD COLUMN文を生成
    pub fn generate_add_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table),
            self.generate_column_definition(column, true)
        )
    }

    /// MODIFY COLUMN文を生成
    pub fn generate_modify_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            quote_ident(table),
            self.generate_column_definition(column, true)
        )
    }

    /// DROP COLUMN文を生成
    pub fn generate_drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_ident(table),
            quote_ident(column)
        )
    }

    /// ADD INDEX文を生成
    pub fn generate_add_index_sql(&self, table: &str, index: &Index) -> String {
        let columns = index
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let keyword = match index.kind {
            IndexKind::Unique => "UNIQUE INDEX",
            _ => "INDEX",
        };
        format!(
            "ALTER TABLE {} ADD {} {} ({})",
            quote_ident(table),
            keyword,
            quote_ident(&index.name),
            columns
        )
    }

    /// DROP INDEX文を生成
    pub fn generate_drop_index_sql(&self, table: &str, index: &str) -> String {
        format!(
            "ALTER TABLE {} DROP INDEX {}",
            quote_ident(table),
            quote_ident(index)
        )
    }

    /// ADD PRIMARY KEY文を生成
    pub fn generate_add_primary_key_sql(&self, table: &str, index: &Index) -> String {
        let columns = index
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            quote_ident(table),
            columns
        )
    }

    /// DROP PRIMARY KEY文を生成
    pub fn generate_drop_primary_key_sql(&self, table: &str) -> String {
        format!("ALTER TABLE {} DROP PRIMARY KEY", quote_ident(table))
    }

    /// ADD FOREIGN KEY文を生成
    pub fn generate_add_foreign_key_sql(&self, table: &str, key: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            quote_ident(table),
            self.generate_foreign_key_clause(key)
        )
    }

    /// DROP FOREIGN KEY文を生成
    pub fn generate_drop_foreign_key_sql(&self, table: &str, key: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            quote_ident(table),
            quote_ident(key)
        )
    }

    /// DDLを実行
    async fn run(&self, sql: String, context: &str) -> Result<(), MigrationError> {
        tracing::debug!(sql = %sql, "executing schema operation");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                MigrationError::applier_with_sql(format!("{}: {}", context, e), sql)
            })
    }
}

#[async_trait]
impl crate::adapters::traits::SchemaApplier for SqlSchemaApplier {
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError> {
        let sql = "SELECT TABLE_NAME FROM information_schema.TABLES \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?";

        let row = sqlx::query(sql)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::applier_with_sql(
                    format!("Failed to check table existence: {}", e),
                    sql,
                )
            })?;

        Ok(row.is_some())
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<Column>, MigrationError> {
        let sql = "SELECT COLUMN_NAME, DATA_TYPE, CHARACTER_MAXIMUM_LENGTH, IS_NULLABLE, \
                   COLUMN_DEFAULT, COLUMN_TYPE, EXTRA, COLUMN_KEY \
                   FROM information_schema.COLUMNS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   ORDER BY ORDINAL_POSITION";

        let rows = sqlx::query(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::applier_with_sql(
                    format!("Failed to describe columns: {}", e),
                    sql,
                )
            })?;

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let data_type: String = row.get(1);
                let max_length: Option<i64> = row.get(2);
                let is_nullable: String = row.get(3);
                let default_value: Option<String> = row.get(4);
                let column_type: String = row.get(5);
                let extra: String = row.get(6);
                let column_key: String = row.get(7);

                Column {
                    name,
                    column_type: column_type_from_sql(&data_type),
                    size: max_length.and_then(|l| u32::try_from(l).ok()),
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default_value,
                    unsigned: column_type.to_lowercase().contains("unsigned"),
                    auto_increment: extra.to_lowercase().contains("auto_increment"),
                    primary: column_key == "PRI",
                    position: None,
                }
            })
            .collect();

        Ok(columns)
    }

    async fn describe_indexes(&self, table: &str) -> Result<Vec<Index>, MigrationError> {
        let sql = "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE \
                   FROM information_schema.STATISTICS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   ORDER BY INDEX_NAME, SEQ_IN_INDEX";

        let rows = sqlx::query(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::applier_with_sql(
                    format!("Failed to describe indexes: {}", e),
                    sql,
                )
            })?;

        let mut indexes: Vec<Index> = Vec::new();
        for row in &rows {
            let index_name: String = row.get(0);
            let column_name: String = row.get(1);
            let non_unique: i64 = row.get(2);

            if let Some(existing) = indexes.iter_mut().find(|i| i.name == index_name) {
                existing.columns.push(column_name);
            } else {
                let kind = if index_name == Index::PRIMARY_NAME {
                    IndexKind::Primary
                } else if non_unique == 0 {
                    IndexKind::Unique
                } else {
                    IndexKind::Plain
                };
                indexes.push(Index::new(index_name, vec![column_name], kind));
            }
        }

        Ok(indexes)
    }

    async fn describe_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, MigrationError> {
        let sql = "SELECT k.CONSTRAINT_NAME, k.COLUMN_NAME, k.REFERENCED_TABLE_SCHEMA, \
                   k.REFERENCED_TABLE_NAME, k.REFERENCED_COLUMN_NAME, r.UPDATE_RULE, r.DELETE_RULE \
                   FROM information_schema.KEY_COLUMN_USAGE k \
                   JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
                     ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA \
                    AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
                   WHERE k.TABLE_SCHEMA = DATABASE() AND k.TABLE_NAME = ? \
                     AND k.REFERENCED_TABLE_NAME IS NOT NULL \
                   ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

        let rows = sqlx::query(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::applier_with_sql(
                    format!("Failed to describe foreign keys: {}", e),
                    sql,
                )
            })?;

        let mut keys: Vec<ForeignKey> = Vec::new();
        for row in &rows {
            let constraint_name: String = row.get(0);
            let column_name: String = row.get(1);
            let referenced_schema: Option<String> = row.get(2);
            let referenced_table: String = row.get(3);
            let referenced_column: String = row.get(4);
            let update_rule: String = row.get(5);
            let delete_rule: String = row.get(6);

            if let Some(existing) = keys.iter_mut().find(|k| k.name == constraint_name) {
                existing.columns.push(column_name);
                existing.referenced_columns.push(referenced_column);
            } else {
                let mut key = ForeignKey::new(
                    constraint_name,
                    vec![column_name],
                    referenced_table,
                    vec![referenced_column],
                );
                key.referenced_schema = referenced_schema;
                key.on_update = parse_reference_action(&update_rule);
                key.on_delete = parse_reference_action(&delete_rule);
                keys.push(key);
            }
        }

        Ok(keys)
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<(), MigrationError> {
        let sql = self.generate_create_table_sql(definition);
        self.run(sql, "Failed to create table").await
    }

    async fn add_column(&self, table: &str, column: &Column) -> Result<(), MigrationError> {
        let sql = self.generate_add_column_sql(table, column);
        self.run(sql, "Failed to add column").await
    }

    async fn modify_column(&self, table: &str, column: &Column) -> Result<(), MigrationError> {
        let sql = self.generate_modify_column_sql(table, column);
        self.run(sql, "Failed to modify column").await
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), MigrationError> {
        let sql = self.generate_drop_column_sql(table, column);
        self.run(sql, "Failed to drop column").await
    }

    async fn add_index(&self, table: &str, index: &Index) -> Result<(), MigrationError> {
        let sql = self.generate_add_index_sql(table, index);
        self.run(sql, "Failed to add index").await
    }

    async fn drop_index(&self, table: &str, index: &str) -> Result<(), MigrationError> {
        let sql = self.generate_drop_index_sql(table, index);
        self.run(sql, "Failed to drop index").await
    }

    async fn add_primary_key(&self, table: &str, index: &Index) -> Result<(), MigrationError> {
        let sql = self.generate_add_primary_key_sql(table, index);
        self.run(sql, "Failed to add primary key").await
    }

    async fn drop_primary_key(&self, table: &str) -> Result<(), MigrationError> {
        let sql = self.generate_drop_primary_key_sql(table);
        self.run(sql, "Failed to drop primary key").await
    }

    async fn add_foreign_key(&self, table: &str, key: &ForeignKey) -> Result<(), MigrationError> {
        let sql = self.generate_add_foreign_key_sql(table, key);
        self.run(sql, "Failed to add foreign key").await
    }

    async fn drop_foreign_key(&self, table: &str, key: &str) -> Result<(), MigrationError> {
        let sql = self.generate_drop_foreign_key_sql(table, key);
        self.run(sql, "Failed to drop foreign key").await
    }

    async fn execute(&self, sql: &str) -> Result<(), MigrationError> {
        self.run(sql.to_string(), "Failed to execute statement").await
    }
}

/// information_schemaの参照アクション文字列をパース
fn parse_reference_action(rule: &str) -> Option<crate::core::schema::ReferenceAction> {
    use crate::core::schema::ReferenceAction;

    match rule.to_uppercase().as_str() {
        "RESTRICT" => Some(ReferenceAction::Restrict),
        "CASCADE" => Some(ReferenceAction::Cascade),
        "SET NULL" => Some(ReferenceAction::SetNull),
        "NO ACTION" => Some(ReferenceAction::NoAction),
        _ => None,
    }
}
