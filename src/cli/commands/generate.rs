// generateコマンドハンドラー
//
// 新しいバージョンディレクトリを予約し、必要ならユニットファイルの
// 雛形を配置します。

use crate::cli::command_context::CommandContext;
use crate::services::generator::Generator;
use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::PathBuf;

/// generateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct GenerateCommand {
    /// 設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 明示的なバージョン
    pub version: Option<String>,
    /// 雛形を配置するテーブル名のリスト
    pub tables: Vec<String>,
    /// 既存バージョンのディレクトリを再利用するかどうか
    pub force: bool,
}

/// generateコマンドハンドラー
#[derive(Debug, Clone)]
pub struct GenerateCommandHandler {}

impl GenerateCommandHandler {
    /// 新しいGenerateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// generateコマンドを実行
    pub async fn execute(&self, command: &GenerateCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;

        // 複数の探索ディレクトリがある場合、生成先は先頭のディレクトリ
        let location = context
            .config
            .migrations_dirs
            .first()
            .ok_or_else(|| anyhow!("No migrations directory configured"))?;

        let generator = Generator::new(context.version_factory());
        let version = generator.reserve(location, command.version.as_deref(), command.force)?;

        if !command.tables.is_empty() {
            generator.scaffold_tables(&version, &command.tables)?;
        }

        Ok(format!(
            "{} version {} at {}",
            "Reserved".green().bold(),
            version,
            version
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ))
    }
}
