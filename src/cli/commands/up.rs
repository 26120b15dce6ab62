// upコマンドハンドラー
//
// 目標バージョン（省略時は発見された最大バージョン）まで前進します。

use crate::adapters::database::SqlSchemaApplier;
use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_report, table_scope};
use crate::cli::OutputFormat;
use crate::services::runner::MigrationRunner;
use crate::services::unit_loader::FileUnitProvider;
use anyhow::Result;
use std::path::PathBuf;

/// upコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct UpCommand {
    /// 設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 目標バージョン
    pub target: Option<String>,
    /// 対象テーブル名のリスト
    pub tables: Vec<String>,
    /// テーブル名の前方一致
    pub prefix: Option<String>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// upコマンドハンドラー
#[derive(Debug, Clone)]
pub struct UpCommandHandler {}

impl UpCommandHandler {
    /// 新しいUpCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// upコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - upコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は実行レポートのサマリー、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &UpCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let pool = context.connect(&command.env).await?;

        let applier = SqlSchemaApplier::new(pool.clone());
        let log = context.completion_log(&pool).await?;
        let provider = FileUnitProvider::new();
        let runner = MigrationRunner::new(
            &applier,
            log.as_ref(),
            &provider,
            context.version_factory(),
        );

        let scope = table_scope(&command.tables, command.prefix.as_deref());
        let report = runner
            .run(
                &context.config.migrations_dirs,
                command.target.as_deref(),
                &scope,
            )
            .await?;

        render_report(&report, command.format)
    }
}
