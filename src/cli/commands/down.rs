// downコマンドハンドラー
//
// 目標バージョンまで後退します。目標バージョン自体は適用されたまま残り、
// それより後のバージョンがロールバックされます。

use crate::adapters::database::SqlSchemaApplier;
use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_report, table_scope};
use crate::cli::OutputFormat;
use crate::services::runner::MigrationRunner;
use crate::services::unit_loader::FileUnitProvider;
use anyhow::Result;
use std::path::PathBuf;

/// downコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DownCommand {
    /// 設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 目標バージョン
    pub target: String,
    /// 対象テーブル名のリスト
    pub tables: Vec<String>,
    /// テーブル名の前方一致
    pub prefix: Option<String>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// downコマンドハンドラー
#[derive(Debug, Clone)]
pub struct DownCommandHandler {}

impl DownCommandHandler {
    /// 新しいDownCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// downコマンドを実行
    pub async fn execute(&self, command: &DownCommand) -> Result<String> {
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
                Some(&command.target),
                &scope,
            )
            .await?;

        render_report(&report, command.format)
    }
}
