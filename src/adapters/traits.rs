// 外部コラボレーターのインターフェース定義
//
// コアはライブスキーマへの構造操作（SchemaApplier）、適用済みバージョンの
// 永続記録（CompletionLog）、バージョン×テーブルごとのマイグレーション
// ユニット（MigrationUnit）を、ここで定義するトレイト経由でのみ扱います。
//
// すべての呼び出しはブロッキングI/Oとして逐次実行され、各操作が完全に
// 完了してから次の操作が始まります（後続の操作は先行操作の観測可能な
// 事後状態に依存するため）。

use crate::core::error::MigrationError;
use crate::core::schema::{Column, ForeignKey, Index, TableDefinition};
use crate::core::version::Version;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// スキーマ適用インターフェース
///
/// ライブスキーマの観測（tableExists / describe*）と構造操作を提供します。
/// 操作の失敗は致命的であり、呼び出し側はリトライも補償も行いません。
#[async_trait]
pub trait SchemaApplier: Send + Sync {
    /// テーブルが存在するかどうか
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError>;

    /// ライブテーブルのカラム一覧を取得（定義順）
    async fn describe_columns(&self, table: &str) -> Result<Vec<Column>, MigrationError>;

    /// ライブテーブルのインデックス一覧を取得
    async fn describe_indexes(&self, table: &str) -> Result<Vec<Index>, MigrationError>;

    /// ライブテーブルの外部キー一覧を取得
    async fn describe_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, MigrationError>;

    /// テーブルを作成
    async fn create_table(&self, definition: &TableDefinition) -> Result<(), MigrationError>;

    /// カラムを追加
    async fn add_column(&self, table: &str, column: &Column) -> Result<(), MigrationError>;

    /// カラム定義を変更（新しい宣言全体を適用）
    async fn modify_column(&self, table: &str, column: &Column) -> Result<(), MigrationError>;

    /// カラムを削除
    async fn drop_column(&self, table: &str, column: &str) -> Result<(), MigrationError>;

    /// インデックスを追加
    async fn add_index(&self, table: &str, index: &Index) -> Result<(), MigrationError>;

    /// インデックスを削除
    async fn drop_index(&self, table: &str, index: &str) -> Result<(), MigrationError>;

    /// プライマリキーを追加
    async fn add_primary_key(&self, table: &str, index: &Index) -> Result<(), MigrationError>;

    /// プライマリキーを削除
    async fn drop_primary_key(&self, table: &str) -> Result<(), MigrationError>;

    /// 外部キーを追加
    async fn add_foreign_key(&self, table: &str, key: &ForeignKey) -> Result<(), MigrationError>;

    /// 外部キーを削除
    async fn drop_foreign_key(&self, table: &str, key: &str) -> Result<(), MigrationError>;

    /// 生SQLを実行（データ操作フック用）
    async fn execute(&self, sql: &str) -> Result<(), MigrationError>;
}

/// 完了ログのエントリ
///
/// 前進ステップの成功時に作成され、同じバージョンのロールバック時に
/// 削除されます。
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEntry {
    /// バージョン文字列
    pub version: String,
    /// 実行開始時刻
    pub started_at: DateTime<Utc>,
    /// 実行終了時刻
    pub finished_at: DateTime<Utc>,
}

impl CompletionEntry {
    /// 新しいエントリを作成
    pub fn new(version: String, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            version,
            started_at,
            finished_at,
        }
    }
}

/// 完了ログインターフェース
///
/// 適用済みバージョンの永続記録。データベーステーブルまたはフラット
/// テキストファイルのどちらでも実装でき、コアはどちらかを意識しません。
#[async_trait]
pub trait CompletionLog: Send + Sync {
    /// エントリを追記
    async fn append(&self, entry: &CompletionEntry) -> Result<(), MigrationError>;

    /// 指定バージョンのエントリを削除
    async fn remove(&self, version: &str) -> Result<(), MigrationError>;

    /// 適用済みバージョンの集合を取得
    async fn list(&self) -> Result<HashSet<String>, MigrationError>;

    /// 最後に適用されたバージョンを取得（未適用ならNone）
    async fn latest(&self) -> Result<Option<String>, MigrationError>;
}

/// マイグレーションユニットのフック種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Morph,
    Up,
    AfterUp,
    Down,
    AfterDown,
    AfterCreateTable,
}

/// マイグレーションユニット
///
/// 1テーブル×1バージョンのマイグレーション単位。各フックは任意実装であり、
/// ステートマシンは `declares` で宣言されたフックだけを呼び出し、
/// それ以外は黙ってスキップします。
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// 対象テーブル名
    fn table(&self) -> &str;

    /// 指定されたフックを宣言しているかどうか
    fn declares(&self, hook: Hook) -> bool;

    /// 構造照合のターゲット定義（morphステップを宣言しない場合はNone）
    fn morph_target(&self) -> Option<&TableDefinition> {
        None
    }

    /// 前進時のデータ操作ステップ
    async fn up(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        let _ = applier;
        Ok(())
    }

    /// 前進完了後のフック
    async fn after_up(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        let _ = applier;
        Ok(())
    }

    /// 後退時のデータ操作ステップ
    async fn down(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        let _ = applier;
        Ok(())
    }

    /// 後退完了後のフック
    async fn after_down(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        let _ = applier;
        Ok(())
    }

    /// テーブル作成直後のフック
    async fn after_create_table(&self, applier: &dyn SchemaApplier) -> Result<(), MigrationError> {
        let _ = applier;
        Ok(())
    }
}

/// マイグレーションユニットの解決インターフェース
///
/// バージョンとテーブル名からユニットを生成します。期待されるユニットが
/// 存在しない場合はMigrationUnitNotFoundを返します。
pub trait MigrationUnitProvider: Send + Sync {
    /// ユニットを解決
    fn resolve(
        &self,
        version: &Version,
        table: &str,
    ) -> Result<Box<dyn MigrationUnit>, MigrationError>;
}
