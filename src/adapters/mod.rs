// アダプターモジュール
//
// コアが呼び出す外部コラボレーターの抽象化（スキーマ適用・完了ログ・
// マイグレーションユニット）と、その具象実装を提供します。

pub mod completion_log;
pub mod database;
pub mod traits;

pub use completion_log::{DatabaseCompletionLog, FileCompletionLog};
pub use database::{DatabaseConnectionService, SqlSchemaApplier};
pub use traits::{
    CompletionEntry, CompletionLog, Hook, MigrationUnit, MigrationUnitProvider, SchemaApplier,
};
