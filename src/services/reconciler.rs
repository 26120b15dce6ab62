// スキーマ照合エンジン（morph）
//
// ライブテーブルを宣言されたターゲット形状に変換するために必要な最小の
// 構造操作集合を計算し、順に適用します。処理順はカラム→インデックス→
// 外部キーで固定です（依存する制約より先に構造的前提を整えるため）。
//
// 各操作はスキーマ適用者に1つずつ送られ、失敗した時点で残りの操作は
// 中断されます。部分適用された操作の補償（巻き戻し）は行いません。

use crate::adapters::traits::SchemaApplier;
use crate::core::error::MigrationError;
use crate::core::field::FieldList;
use crate::core::schema::{Column, ForeignKey, Index, TableDefinition};
use std::collections::HashSet;

/// 構造操作
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOperation {
    CreateTable(TableDefinition),
    AddColumn(Column),
    ModifyColumn(Column),
    DropColumn(String),
    AddIndex(Index),
    DropIndex(String),
    AddPrimaryKey(Index),
    DropPrimaryKey,
    AddForeignKey(ForeignKey),
    DropForeignKey(String),
}

impl SchemaOperation {
    /// 操作の種類を文字列で取得（ログ用）
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaOperation::CreateTable(_) => "CreateTable",
            SchemaOperation::AddColumn(_) => "AddColumn",
            SchemaOperation::ModifyColumn(_) => "ModifyColumn",
            SchemaOperation::DropColumn(_) => "DropColumn",
            SchemaOperation::AddIndex(_) => "AddIndex",
            SchemaOperation::DropIndex(_) => "DropIndex",
            SchemaOperation::AddPrimaryKey(_) => "AddPrimaryKey",
            SchemaOperation::DropPrimaryKey => "DropPrimaryKey",
            SchemaOperation::AddForeignKey(_) => "AddForeignKey",
            SchemaOperation::DropForeignKey(_) => "DropForeignKey",
        }
    }
}

/// ライブテーブルのスナップショット
#[derive(Debug, Clone, Default)]
pub struct LiveTable {
    /// ライブ側のカラム（定義順）
    pub columns: Vec<Column>,
    /// ライブ側のインデックス
    pub indexes: Vec<Index>,
    /// ライブ側の外部キー
    pub foreign_keys: Vec<ForeignKey>,
}

/// morphの実行結果
#[derive(Debug, Clone)]
pub struct MorphOutcome {
    /// テーブルを新規作成したかどうか（afterCreateTableフックの発火条件）
    pub created: bool,
    /// 適用された操作
    pub operations: Vec<SchemaOperation>,
}

/// スキーマ照合サービス
#[derive(Debug, Clone)]
pub struct Reconciler {}

impl Reconciler {
    /// 新しいReconcilerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// 必要な構造操作集合を計算
    ///
    /// # Arguments
    ///
    /// * `live` - ライブテーブルのスナップショット（テーブルが存在しない場合はNone）
    /// * `target` - 宣言されたターゲット形状
    ///
    /// # Returns
    ///
    /// 適用順に並んだ操作のリスト
    pub fn plan(
        &self,
        live: Option<&LiveTable>,
        target: &TableDefinition,
    ) -> Result<Vec<SchemaOperation>, MigrationError> {
        if target.columns.is_empty() {
            return Err(MigrationError::TableMustHaveColumns {
                table: target.name.clone(),
            });
        }

        let live = match live {
            None => {
                return Ok(vec![SchemaOperation::CreateTable(target.clone())]);
            }
            Some(live) => live,
        };

        let mut operations = Vec::new();
        self.plan_columns(live, target, &mut operations);
        self.plan_indexes(live, target, &mut operations);
        self.plan_foreign_keys(live, target, &mut operations);
        Ok(operations)
    }

    /// カラムの差分を計画
    fn plan_columns(
        &self,
        live: &LiveTable,
        target: &TableDefinition,
        operations: &mut Vec<SchemaOperation>,
    ) {
        let live_fields = FieldList::from_columns(live.columns.clone());
        let target_fields = FieldList::from_columns(target.columns.clone());

        for column in target_fields.iter() {
            match live_fields.find(&column.name) {
                None => operations.push(SchemaOperation::AddColumn(column.clone())),
                // 変更適用には新しい宣言全体を使うため、旧定義は不要
                Some(live_column) if live_column.definition_changed(column) => {
                    operations.push(SchemaOperation::ModifyColumn(column.clone()));
                }
                Some(_) => {}
            }
        }

        for column in live_fields.iter() {
            if target_fields.find(&column.name).is_none() {
                operations.push(SchemaOperation::DropColumn(column.name.clone()));
            }
        }
    }

    /// インデックスの差分を計画
    ///
    /// カラムリストの比較は順序を無視した要素数と所属の比較です。
    /// 差異があれば削除+追加で置き換え、その場での変更は行いません。
    fn plan_indexes(
        &self,
        live: &LiveTable,
        target: &TableDefinition,
        operations: &mut Vec<SchemaOperation>,
    ) {
        for index in &target.indexes {
            match live.indexes.iter().find(|i| i.name == index.name) {
                None => {
                    if index.is_primary() {
                        operations.push(SchemaOperation::AddPrimaryKey(index.clone()));
                    } else {
                        operations.push(SchemaOperation::AddIndex(index.clone()));
                    }
                }
                Some(live_index) if !same_column_set(&live_index.columns, &index.columns) => {
                    if index.is_primary() {
                        operations.push(SchemaOperation::DropPrimaryKey);
                        operations.push(SchemaOperation::AddPrimaryKey(index.clone()));
                    } else {
                        operations.push(SchemaOperation::DropIndex(index.name.clone()));
                        operations.push(SchemaOperation::AddIndex(index.clone()));
                    }
                }
                Some(_) => {}
            }
        }

        for index in &live.indexes {
            if target.get_index(&index.name).is_none() {
                if index.is_primary() {
                    operations.push(SchemaOperation::DropPrimaryKey);
                } else {
                    operations.push(SchemaOperation::DropIndex(index.name.clone()));
                }
            }
        }
    }

    /// 外部キーの差分を計画
    fn plan_foreign_keys(
        &self,
        live: &LiveTable,
        target: &TableDefinition,
        operations: &mut Vec<SchemaOperation>,
    ) {
        for key in &target.foreign_keys {
            match live.foreign_keys.iter().find(|k| k.name == key.name) {
                None => operations.push(SchemaOperation::AddForeignKey(key.clone())),
                Some(live_key) if foreign_key_changed(live_key, key) => {
                    operations.push(SchemaOperation::DropForeignKey(key.name.clone()));
                    operations.push(SchemaOperation::AddForeignKey(key.clone()));
                }
                Some(_) => {}
            }
        }

        for key in &live.foreign_keys {
            if target.get_foreign_key(&key.name).is_none() {
                operations.push(SchemaOperation::DropForeignKey(key.name.clone()));
            }
        }
    }

    /// ライブスキーマを観測して操作を計算し、順に適用する
    ///
    /// # Arguments
    ///
    /// * `applier` - スキーマ適用者
    /// * `target` - 宣言されたターゲット形状
    ///
    /// # Returns
    ///
    /// 適用結果。いずれかの操作が拒否された場合、そのテーブルの残りの
    /// 操作は中断され、エラーがそのまま伝播します。
    pub async fn morph(
        &self,
        applier: &dyn SchemaApplier,
        target: &TableDefinition,
    ) -> Result<MorphOutcome, MigrationError> {
        let exists = applier.table_exists(&target.name).await?;

        let live = if exists {
            Some(LiveTable {
                columns: applier.describe_columns(&target.name).await?,
                indexes: applier.describe_indexes(&target.name).await?,
                foreign_keys: applier.describe_foreign_keys(&target.name).await?,
            })
        } else {
            None
        };

        let operations = self.plan(live.as_ref(), target)?;

        for operation in &operations {
            tracing::info!(
                table = %target.name,
                operation = operation.kind(),
                "applying schema operation"
            );
            self.apply(applier, &target.name, operation).await?;
        }

        Ok(MorphOutcome {
            created: !exists,
            operations,
        })
    }

    /// 1つの操作をスキーマ適用者に送る
    async fn apply(
        &self,
        applier: &dyn SchemaApplier,
        table: &str,
        operation: &SchemaOperation,
    ) -> Result<(), MigrationError> {
        match operation {
            SchemaOperation::CreateTable(definition) => applier.create_table(definition).await,
            SchemaOperation::AddColumn(column) => applier.add_column(table, column).await,
            SchemaOperation::ModifyColumn(column) => applier.modify_column(table, column).await,
            SchemaOperation::DropColumn(name) => applier.drop_column(table, name).await,
            SchemaOperation::AddIndex(index) => applier.add_index(table, index).await,
            SchemaOperation::DropIndex(name) => applier.drop_index(table, name).await,
            SchemaOperation::AddPrimaryKey(index) => applier.add_primary_key(table, index).await,
            SchemaOperation::DropPrimaryKey => applier.drop_primary_key(table).await,
            SchemaOperation::AddForeignKey(key) => applier.add_foreign_key(table, key).await,
            SchemaOperation::DropForeignKey(name) => applier.drop_foreign_key(table, name).await,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// 順序を無視したカラム集合の比較
fn same_column_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let a_set: HashSet<&String> = a.iter().collect();
    b.iter().all(|c| a_set.contains(c))
}

/// 外部キーの比較（参照先テーブル→ローカル列数→参照列数→ローカル列所属→
/// 参照列所属の順に比較し、最初の不一致で打ち切る）
fn foreign_key_changed(live: &ForeignKey, target: &ForeignKey) -> bool {
    if live.referenced_table != target.referenced_table {
        return true;
    }
    if live.columns.len() != target.columns.len() {
        return true;
    }
    if live.referenced_columns.len() != target.referenced_columns.len() {
        return true;
    }
    if !same_column_set(&live.columns, &target.columns) {
        return true;
    }
    if !same_column_set(&live.referenced_columns, &target.referenced_columns) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnType, IndexKind};

    fn int(name: &str) -> Column {
        Column::new(name, ColumnType::Integer).nullable(false)
    }

    fn varchar(name: &str, size: u32) -> Column {
        Column::new(name, ColumnType::Varchar).size(size)
    }

    fn live_with_columns(columns: Vec<Column>) -> LiveTable {
        LiveTable {
            columns,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn test_plan_create_table_when_absent() {
        let mut target = TableDefinition::new("users");
        target.add_column(int("id"));

        let operations = Reconciler::new().plan(None, &target).unwrap();
        assert_eq!(operations.len(), 1);
        assert!(matches!(operations[0], SchemaOperation::CreateTable(_)));
    }

    #[test]
    fn test_plan_rejects_empty_columns() {
        let target = TableDefinition::new("users");
        let error = Reconciler::new().plan(None, &target).unwrap_err();
        assert!(error.is_table_must_have_columns());
    }

    #[test]
    fn test_plan_add_column_only() {
        // ライブ: (id int) / ターゲット: (id int, name varchar(50))
        let live = live_with_columns(vec![int("id")]);
        let mut target = TableDefinition::new("users");
        target.add_column(int("id"));
        target.add_column(varchar("name", 50));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(operations.len(), 1);
        match &operations[0] {
            SchemaOperation::AddColumn(column) => assert_eq!(column.name, "name"),
            other => panic!("expected AddColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_modify_column_on_definition_drift() {
        let live = live_with_columns(vec![varchar("name", 50)]);
        let mut target = TableDefinition::new("users");
        target.add_column(varchar("name", 100));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(operations.len(), 1);
        match &operations[0] {
            SchemaOperation::ModifyColumn(column) => {
                assert_eq!(column.name, "name");
                assert_eq!(column.size, Some(100));
            }
            other => panic!("expected ModifyColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_drop_column() {
        let live = live_with_columns(vec![int("id"), varchar("legacy", 10)]);
        let mut target = TableDefinition::new("users");
        target.add_column(int("id"));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(
            operations,
            vec![SchemaOperation::DropColumn("legacy".to_string())]
        );
    }

    #[test]
    fn test_plan_index_replacement_is_drop_then_add() {
        let mut live = live_with_columns(vec![int("a"), int("b")]);
        live.indexes.push(Index::new(
            "idx_a",
            vec!["a".to_string()],
            IndexKind::Plain,
        ));

        let mut target = TableDefinition::new("t");
        target.add_column(int("a"));
        target.add_column(int("b"));
        target.add_index(Index::new(
            "idx_a",
            vec!["b".to_string()],
            IndexKind::Plain,
        ));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(
            operations,
            vec![
                SchemaOperation::DropIndex("idx_a".to_string()),
                SchemaOperation::AddIndex(target.indexes[0].clone()),
            ]
        );
    }

    #[test]
    fn test_plan_index_column_order_is_ignored() {
        let mut live = live_with_columns(vec![int("a"), int("b")]);
        live.indexes.push(Index::new(
            "idx_ab",
            vec!["a".to_string(), "b".to_string()],
            IndexKind::Plain,
        ));

        let mut target = TableDefinition::new("t");
        target.add_column(int("a"));
        target.add_column(int("b"));
        target.add_index(Index::new(
            "idx_ab",
            vec!["b".to_string(), "a".to_string()],
            IndexKind::Plain,
        ));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_plan_primary_key_uses_dedicated_operations() {
        let mut live = live_with_columns(vec![int("id"), int("tenant_id")]);
        live.indexes.push(Index::new(
            Index::PRIMARY_NAME,
            vec!["id".to_string()],
            IndexKind::Primary,
        ));

        let mut target = TableDefinition::new("t");
        target.add_column(int("id"));
        target.add_column(int("tenant_id"));
        target.add_index(Index::new(
            Index::PRIMARY_NAME,
            vec!["id".to_string(), "tenant_id".to_string()],
            IndexKind::Primary,
        ));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(operations.len(), 2);
        assert!(matches!(operations[0], SchemaOperation::DropPrimaryKey));
        assert!(matches!(operations[1], SchemaOperation::AddPrimaryKey(_)));
    }

    #[test]
    fn test_plan_foreign_key_replacement() {
        let mut live = live_with_columns(vec![int("user_id")]);
        live.foreign_keys.push(ForeignKey::new(
            "fk_user",
            vec!["user_id".to_string()],
            "users",
            vec!["id".to_string()],
        ));

        let mut target = TableDefinition::new("orders");
        target.add_column(int("user_id"));
        target.add_foreign_key(ForeignKey::new(
            "fk_user",
            vec!["user_id".to_string()],
            "accounts",
            vec!["id".to_string()],
        ));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert_eq!(
            operations,
            vec![
                SchemaOperation::DropForeignKey("fk_user".to_string()),
                SchemaOperation::AddForeignKey(target.foreign_keys[0].clone()),
            ]
        );
    }

    #[test]
    fn test_plan_is_empty_when_shapes_match() {
        let mut target = TableDefinition::new("users");
        target.add_column(int("id"));
        target.add_column(varchar("name", 50));
        target.add_index(Index::new(
            "idx_name",
            vec!["name".to_string()],
            IndexKind::Plain,
        ));

        let live = LiveTable {
            columns: target.columns.clone(),
            indexes: target.indexes.clone(),
            foreign_keys: target.foreign_keys.clone(),
        };

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_columns_planned_before_indexes_and_foreign_keys() {
        let live = live_with_columns(vec![int("id")]);

        let mut target = TableDefinition::new("orders");
        target.add_column(int("id"));
        target.add_column(int("user_id"));
        target.add_index(Index::new(
            "idx_user",
            vec!["user_id".to_string()],
            IndexKind::Plain,
        ));
        target.add_foreign_key(ForeignKey::new(
            "fk_user",
            vec!["user_id".to_string()],
            "users",
            vec!["id".to_string()],
        ));

        let operations = Reconciler::new().plan(Some(&live), &target).unwrap();
        let kinds: Vec<&str> = operations.iter().map(|o| o.kind()).collect();
        assert_eq!(kinds, vec!["AddColumn", "AddIndex", "AddForeignKey"]);
    }

    #[test]
    fn test_foreign_key_changed_short_circuits() {
        let base = ForeignKey::new(
            "fk",
            vec!["a".to_string()],
            "users",
            vec!["id".to_string()],
        );

        let mut other_table = base.clone();
        other_table.referenced_table = "accounts".to_string();
        assert!(foreign_key_changed(&base, &other_table));

        let mut more_columns = base.clone();
        more_columns.columns.push("b".to_string());
        assert!(foreign_key_changed(&base, &more_columns));

        // on_update / on_delete は比較対象外
        let mut action_only = base.clone();
        action_only.on_delete = Some(crate::core::schema::ReferenceAction::Cascade);
        assert!(!foreign_key_changed(&base, &action_only));
    }
}
