// エラー型定義
//
// マイグレーション実行全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、バージョン書式・スキーマ適用・探索の各エラーを定義します。

use thiserror::Error;

/// マイグレーションエラー
///
/// バージョン解決からスキーマ適用までの全工程で発生するエラーを表現します。
/// いずれの種類も現在の実行に対して致命的であり、内部でリトライされません。
/// 失敗前に適用済みの構造操作や完了ログのエントリはそのまま残ります。
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Malformed version identifier
    #[error("Invalid version format: '{raw}'")]
    InvalidVersionFormat {
        /// 不正な入力文字列
        raw: String,
    },

    /// Version model used before a numbering scheme was selected
    #[error("Version scheme is not configured")]
    UnknownVersionScheme,

    /// Target version already exists on the generation path
    #[error("Version '{version}' already exists at {path} (use force to overwrite)")]
    DuplicateVersion {
        /// 既存のバージョン
        version: String,
        /// 衝突したディレクトリパス
        path: String,
    },

    /// Migrations directory does not exist
    #[error("Migrations directory not found: {path}")]
    MigrationsDirectoryMissing {
        /// 存在しなかったパス
        path: String,
    },

    /// Version recorded as applied but no migration directory was discovered
    #[error("Version '{version}' has no discovered migration directory")]
    VersionNotDiscovered {
        /// 対象バージョン
        version: String,
    },

    /// Expected migration unit file is absent
    #[error("Migration unit for table '{table}' not found at version {version}")]
    MigrationUnitNotFound {
        /// 対象テーブル名
        table: String,
        /// 対象バージョン
        version: String,
    },

    /// Structural or data operation rejected by the live schema
    #[error("Schema operation failed: {message}")]
    SchemaApplierFailure {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL文
        sql: Option<String>,
    },

    /// Empty column set in a create/modify definition
    #[error("Table '{table}' must have at least one column")]
    TableMustHaveColumns {
        /// 対象テーブル名
        table: String,
    },

    /// Filesystem error while scanning migration locations
    #[error("Failed to read migrations directory: {path} (cause: {cause})")]
    DirectoryRead {
        /// 読み取りに失敗したパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Filesystem error while creating or writing migration files
    #[error("Failed to write to migrations directory: {path} (cause: {cause})")]
    DirectoryWrite {
        /// 書き込みに失敗したパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Migration unit file could not be parsed
    #[error("Failed to parse migration unit: {path} (cause: {cause})")]
    UnitParse {
        /// 対象ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Completion log backing failed
    #[error("Completion log error: {message}")]
    CompletionLog {
        /// エラーメッセージ
        message: String,
    },
}

impl MigrationError {
    /// バージョン書式エラーかどうか
    pub fn is_invalid_version_format(&self) -> bool {
        matches!(self, MigrationError::InvalidVersionFormat { .. })
    }

    /// バージョン体系未設定エラーかどうか
    pub fn is_unknown_version_scheme(&self) -> bool {
        matches!(self, MigrationError::UnknownVersionScheme)
    }

    /// バージョン重複エラーかどうか
    pub fn is_duplicate_version(&self) -> bool {
        matches!(self, MigrationError::DuplicateVersion { .. })
    }

    /// マイグレーションディレクトリ欠落エラーかどうか
    pub fn is_migrations_directory_missing(&self) -> bool {
        matches!(self, MigrationError::MigrationsDirectoryMissing { .. })
    }

    /// バージョンディレクトリ欠落エラーかどうか
    pub fn is_version_not_discovered(&self) -> bool {
        matches!(self, MigrationError::VersionNotDiscovered { .. })
    }

    /// マイグレーションユニット欠落エラーかどうか
    pub fn is_migration_unit_not_found(&self) -> bool {
        matches!(self, MigrationError::MigrationUnitNotFound { .. })
    }

    /// スキーマ適用エラーかどうか
    pub fn is_schema_applier_failure(&self) -> bool {
        matches!(self, MigrationError::SchemaApplierFailure { .. })
    }

    /// カラム未定義エラーかどうか
    pub fn is_table_must_have_columns(&self) -> bool {
        matches!(self, MigrationError::TableMustHaveColumns { .. })
    }

    /// ディレクトリ書き込みエラーかどうか
    pub fn is_directory_write(&self) -> bool {
        matches!(self, MigrationError::DirectoryWrite { .. })
    }

    /// ユニット解析エラーかどうか
    pub fn is_unit_parse(&self) -> bool {
        matches!(self, MigrationError::UnitParse { .. })
    }

    /// 完了ログエラーかどうか
    pub fn is_completion_log(&self) -> bool {
        matches!(self, MigrationError::CompletionLog { .. })
    }

    /// スキーマ適用エラーを作成
    pub fn applier(message: impl Into<String>) -> Self {
        MigrationError::SchemaApplierFailure {
            message: message.into(),
            sql: None,
        }
    }

    /// 失敗したSQLを添えてスキーマ適用エラーを作成
    pub fn applier_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        MigrationError::SchemaApplierFailure {
            message: message.into(),
            sql: Some(sql.into()),
        }
    }
}
