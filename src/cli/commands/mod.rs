// コマンドハンドラー群

pub mod down;
pub mod generate;
pub mod status;
pub mod up;

use crate::cli::OutputFormat;
use crate::services::discovery::TableScope;
use crate::services::runner::{Direction, RunReport};
use anyhow::Result;
use colored::Colorize;

/// CLI引数からテーブルスコープを解決
pub fn table_scope(tables: &[String], prefix: Option<&str>) -> TableScope {
    if !tables.is_empty() {
        TableScope::Named(tables.to_vec())
    } else if let Some(prefix) = prefix {
        TableScope::Prefix(prefix.to_string())
    } else {
        TableScope::All
    }
}

/// 実行レポートを指定フォーマットで整形
pub fn render_report(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_report(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// 実行レポートを表示用文字列に整形
pub fn format_report(report: &RunReport) -> String {
    let Some(direction) = report.direction else {
        return "Nothing to do.".to_string();
    };

    let mut lines = Vec::new();
    let verb = match direction {
        Direction::Forward => "Applied",
        Direction::Backward => "Rolled back",
    };

    for version in &report.executed {
        lines.push(format!("{} {}", verb.green().bold(), version));
    }
    for version in &report.skipped {
        lines.push(format!("{} {}", "Skipped".yellow(), version));
    }

    if report.executed.is_empty() && report.skipped.is_empty() {
        lines.push("Nothing to do.".to_string());
    } else {
        lines.push(format!(
            "\n{} executed, {} skipped.",
            report.executed.len(),
            report.skipped.len()
        ));
    }

    lines.join("\n")
}
