// サービス層モジュール
//
// バージョン探索・ユニット読み込み・構造照合・実行・生成の各サービスを提供します。

pub mod discovery;
pub mod generator;
pub mod reconciler;
pub mod runner;
pub mod unit_loader;

pub use discovery::{discover_versions, resolve_scope, snapshot_tables, TableScope};
pub use generator::Generator;
pub use reconciler::{LiveTable, MorphOutcome, Reconciler, SchemaOperation};
pub use runner::{Direction, MigrationRunner, RunReport, StatusReport};
pub use unit_loader::{FileUnitProvider, SqlMigrationUnit, UnitSpec};
