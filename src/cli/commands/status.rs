// statusコマンドハンドラー
//
// 発見されたバージョンと完了ログを照合し、適用済み/未適用の状態を表示します。

use crate::adapters::database::SqlSchemaApplier;
use crate::cli::command_context::CommandContext;
use crate::cli::OutputFormat;
use crate::services::runner::{MigrationRunner, StatusReport};
use crate::services::unit_loader::FileUnitProvider;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// 設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// statusコマンドハンドラー
#[derive(Debug, Clone)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
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

        let report = runner.status(&context.config.migrations_dirs).await?;
        match command.format {
            OutputFormat::Text => Ok(self.format_status(&report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
        }
    }

    /// ステータスレポートを整形
    fn format_status(&self, report: &StatusReport) -> String {
        if report.entries.is_empty() {
            return "No migrations found.".to_string();
        }

        let mut lines = Vec::new();
        lines.push(format!(
            "Current version: {}",
            report
                .current
                .as_deref()
                .unwrap_or("(none)")
                .bold()
        ));
        lines.push(String::new());

        for (version, applied) in &report.entries {
            let status = if *applied {
                "Applied".green()
            } else {
                "Pending".yellow()
            };
            lines.push(format!("  {:<24} {}", version, status));
        }

        let applied = report.entries.iter().filter(|(_, a)| *a).count();
        let pending = report.entries.len() - applied;
        lines.push(format!("\n{} applied, {} pending.", applied, pending));

        lines.join("\n")
    }
}
