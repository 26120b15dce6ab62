// コマンド実行コンテキスト
//
// 設定ファイルの読み込みと、コマンド間で共有されるコラボレーター
// （接続プール・完了ログ・バージョンファクトリ）の構築を行います。

use crate::adapters::completion_log::{DatabaseCompletionLog, FileCompletionLog};
use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::traits::CompletionLog;
use crate::core::config::{CompletionLogBacking, Config};
use crate::core::version::VersionFactory;
use anyhow::{Context, Result};
use sqlx::AnyPool;
use std::path::{Path, PathBuf};

/// コマンド実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// 読み込まれた設定
    pub config: Config,
}

impl CommandContext {
    /// 設定ファイルを読み込んでコンテキストを作成
    ///
    /// # Arguments
    ///
    /// * `config_path` - 設定ファイルパス（Noneならデフォルトパス）
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Config::DEFAULT_CONFIG_PATH));
        let config = Config::load(&path)?;
        Ok(Self { config })
    }

    /// バージョンファクトリを構築
    pub fn version_factory(&self) -> VersionFactory {
        VersionFactory::new(self.config.version_scheme)
    }

    /// 指定された環境の接続プールを作成
    pub async fn connect(&self, environment: &str) -> Result<AnyPool> {
        let db_config = self.config.get_database_config(environment)?;
        let service = DatabaseConnectionService::new();
        let pool = service
            .create_pool(&db_config.to_connection_string(), db_config.timeout)
            .await
            .with_context(|| format!("Failed to connect to environment '{}'", environment))?;
        Ok(pool)
    }

    /// 設定された保存先の完了ログを構築
    pub async fn completion_log(&self, pool: &AnyPool) -> Result<Box<dyn CompletionLog>> {
        match &self.config.completion_log {
            CompletionLogBacking::Database { table } => {
                let log = DatabaseCompletionLog::new(pool.clone(), table.clone());
                log.ensure_table().await?;
                Ok(Box::new(log))
            }
            CompletionLogBacking::File { path } => {
                Ok(Box::new(FileCompletionLog::new(path.clone())))
            }
        }
    }
}
