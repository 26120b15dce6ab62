// マイグレーションユニットのローダー
//
// バージョンディレクトリ配下の `<テーブル名>.yaml` を解析し、
// MigrationUnitトレイトを実装するSqlMigrationUnitに変換します。
// morphはターゲット定義として、その他のフックは生SQLのリストとして
// 宣言されます。

use crate::adapters::traits::{Hook, MigrationUnit, MigrationUnitProvider, SchemaApplier};
use crate::core::error::MigrationError;
use crate::core::schema::{Column, ForeignKey, Index, TableDefinition};
use crate::core::version::Version;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// ユニットファイルのmorphセクション
///
/// テーブル名はファイル名から決まるため、ファイル内には含めません。
#[derive(Debug, Clone, Deserialize)]
pub struct MorphSpec {
    /// カラム定義のリスト（宣言順）
    pub columns: Vec<Column>,

    /// インデックス定義のリスト
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// 外部キー定義のリスト
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    /// テーブルオプション
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl MorphSpec {
    /// テーブル定義に変換
    fn into_definition(self, table: &str) -> TableDefinition {
        TableDefinition {
            name: table.to_string(),
            columns: self.columns,
            indexes: self.indexes,
            foreign_keys: self.foreign_keys,
            options: self.options,
        }
    }
}

/// ユニットファイル全体
#[derive(Debug, Clone, Deserialize)]
pub struct UnitSpec {
    /// 構造照合のターゲット定義
    #[serde(default)]
    pub morph: Option<MorphSpec>,

    /// 前進時のデータ操作SQL
    #[serde(default)]
    pub up: Vec<String>,

    /// 前進完了後のSQL
    #[serde(default)]
    pub after_up: Vec<String>,

    /// 後退時のデータ操作SQL
    #[serde(default)]
    pub down: Vec<String>,

    /// 後退完了後のSQL
    #[serde(default)]
    pub after_down: Vec<String>,

    /// テーブル作成直後のSQL
    #[serde(default)]
    pub after_create_table: Vec<String>,
}

/// YAMLユニットファイルから構築されるマイグレーションユニット
///
/// 各フックは宣言されたSQL文を順番に実行します。宣言の無いフックは
/// `declares` がfalseを返すため呼び出されません。
#[derive(Debug, Clone)]
pub struct SqlMigrationUnit {
    table: String,
    morph: Option<TableDefinition>,
    up: Vec<String>,
    after_up: Vec<String>,
    down: Vec<String>,
    after_down: Vec<String>,
    after_create_table: Vec<String>,
}

impl SqlMigrationUnit {
    /// UnitSpecから構築
    pub fn from_spec(table: &str, spec: UnitSpec) -> Self {
        Self {
            table: table.to_string(),
            morph: spec.morph.map(|m| m.into_definition(table)),
            up: spec.up,
            after_up: spec.after_up,
            down: spec.down,
            after_down: spec.after_down,
            after_create_table: spec.after_create_table,
        }
    }

    /// YAML文字列から構築
    ///
    /// # Arguments
    ///
    /// * `table` - 対象テーブル名（ファイル名のステム）
    /// * `yaml` - ユニットファイルの内容
    /// * `source` - エラー表示用のパス
    pub fn parse(table: &str, yaml: &str, source: &str) -> Result<Self, MigrationError> {
        let spec: UnitSpec =
            serde_saphyr::from_str(yaml).map_err(|e| MigrationError::UnitParse {
                path: source.to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self::from_spec(table, spec))
    }

    /// SQL文のリストを順番に実行
    async fn run_all(
        &self,
        applier: &dyn SchemaApplier,
        statements: &[String],
    ) -> Result<(), MigrationError> {
        for sql in statements {
            applier.execute(sql).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationUnit for SqlMigrationUnit {
    fn table(&self) -> &str {
        &self.table
    }

    fn declares(&self, hook: Hook) -> bool {
        match hook {
            Hook::Morph => self.morph.is_some(),
            Hook::Up => !self.up.is_empty(),
            Hook::AfterUp => !self.after_up.is_empty(),
            Hook::Down => !self.down.is_empty(),
            Hook::AfterDown => !self.after_down.is_empty(),
            Hook::AfterCreateTable => !self.after_create_table.is_empty(),
        }
    }

    fn morph_target(&self) -> Option<&TableDefinition> {
        self.morph.as_ref()
    }

    async fn up(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        self.run_all(applier, &self.up).await
    }

    async fn after_up(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        self.run_all(applier, &self.after_up).await
    }

    async fn down(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        self.run_all(applier, &self.down).await
    }

    async fn after_down(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        self.run_all(applier, &self.after_down).await
    }

    async fn after_create_table(
        &self,
        applier: &dyn SchemaApplier,
    ) -> Result<(), MigrationError> {
        self.run_all(applier, &self.after_create_table).await
    }
}

/// ファイルシステムからユニットを解決するプロバイダー
///
/// バージョンの発見ディレクトリ直下の `<テーブル名>.yaml`（または `.yml`）
/// を読み込みます。
#[derive(Debug, Clone, Default)]
pub struct FileUnitProvider;

impl FileUnitProvider {
    /// 新しいFileUnitProviderを作成
    pub fn new() -> Self {
        Self
    }

    fn unit_path(dir: &Path, table: &str) -> Option<std::path::PathBuf> {
        for extension in ["yaml", "yml"] {
            let candidate = dir.join(format!("{}.{}", table, extension));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl MigrationUnitProvider for FileUnitProvider {
    fn resolve(
        &self,
        version: &Version,
        table: &str,
    ) -> Result<Box<dyn MigrationUnit>, MigrationError> {
        let not_found = || MigrationError::MigrationUnitNotFound {
            table: table.to_string(),
            version: version.to_string(),
        };

        let dir = version.path().ok_or_else(not_found)?;
        let path = Self::unit_path(dir, table).ok_or_else(not_found)?;

        let content =
            std::fs::read_to_string(&path).map_err(|e| MigrationError::DirectoryRead {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;

        let unit = SqlMigrationUnit::parse(table, &content, &path.display().to_string())?;
        Ok(Box::new(unit))
    }
}
