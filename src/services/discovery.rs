// バージョン探索サービス
//
// 1つ以上の探索ディレクトリから、有効なバージョン識別子を名前に持つ
// サブディレクトリを列挙します。各バージョンディレクトリはテーブルごとの
// ユニットファイルを保持します。

use crate::core::error::MigrationError;
use crate::core::version::{Version, VersionFactory};
use std::path::{Path, PathBuf};

/// テーブルスコープ
///
/// 1バージョンの実行対象テーブルの選択方法。
#[derive(Debug, Clone, PartialEq)]
pub enum TableScope {
    /// スナップショット内の全ユニットファイル
    All,
    /// 明示的なテーブル名リスト
    Named(Vec<String>),
    /// スナップショットのファイル名に対する前方一致
    Prefix(String),
}

/// 探索ディレクトリからバージョンを列挙
///
/// # Arguments
///
/// * `locations` - 探索ディレクトリのリスト
/// * `factory` - バージョンファクトリ（有効性判定と構築に使用）
///
/// # Returns
///
/// 発見ディレクトリが設定されたバージョンのリスト（順序は未定義）。
/// 探索ディレクトリ自体が存在しない場合はMigrationsDirectoryMissing。
pub fn discover_versions(
    locations: &[PathBuf],
    factory: &VersionFactory,
) -> Result<Vec<Version>, MigrationError> {
    let mut versions = Vec::new();

    for location in locations {
        if !location.is_dir() {
            return Err(MigrationError::MigrationsDirectoryMissing {
                path: location.display().to_string(),
            });
        }

        let entries =
            std::fs::read_dir(location).map_err(|e| MigrationError::DirectoryRead {
                path: location.display().to_string(),
                cause: e.to_string(),
            })?;

        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::DirectoryRead {
                path: location.display().to_string(),
                cause: e.to_string(),
            })?;

            if !entry.path().is_dir() {
                continue;
            }

            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };

            if factory.is_valid(name) {
                versions.push(factory.create(Some(name))?.with_path(entry.path()));
            }
        }
    }

    Ok(versions)
}

/// バージョンディレクトリ内のテーブル名（ユニットファイルのステム）を列挙
pub fn snapshot_tables(dir: &Path) -> Result<Vec<String>, MigrationError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MigrationError::DirectoryRead {
        path: dir.display().to_string(),
        cause: e.to_string(),
    })?;

    let mut tables = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrationError::DirectoryRead {
            path: dir.display().to_string(),
            cause: e.to_string(),
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            tables.push(stem.to_string());
        }
    }

    tables.sort();
    Ok(tables)
}

/// テーブルスコープを実際のテーブル名リストに解決
pub fn resolve_scope(tables: &[String], scope: &TableScope) -> Vec<String> {
    match scope {
        TableScope::All => tables.to_vec(),
        TableScope::Named(names) => names.clone(),
        TableScope::Prefix(prefix) => tables
            .iter()
            .filter(|t| t.starts_with(prefix.as_str()))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionScheme;
    use std::fs;

    #[test]
    fn test_discover_versions_filters_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("0.0.1")).unwrap();
        fs::create_dir(dir.path().join("0.0.2")).unwrap();
        fs::create_dir(dir.path().join("not a version!")).unwrap();
        fs::write(dir.path().join("0.0.3"), "a file, not a directory").unwrap();

        let factory = VersionFactory::new(VersionScheme::Incremental);
        let versions =
            discover_versions(&[dir.path().to_path_buf()], &factory).unwrap();

        let mut names: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["0.0.1", "0.0.2"]);
        assert!(versions.iter().all(|v| v.path().is_some()));
    }

    #[test]
    fn test_discover_versions_missing_location() {
        let factory = VersionFactory::new(VersionScheme::Incremental);
        let error =
            discover_versions(&[PathBuf::from("/nonexistent/migrations")], &factory).unwrap_err();
        assert!(error.is_migrations_directory_missing());
    }

    #[test]
    fn test_discover_versions_multiple_locations() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("0.0.1")).unwrap();
        fs::create_dir(b.path().join("0.0.2")).unwrap();

        let factory = VersionFactory::new(VersionScheme::Incremental);
        let versions = discover_versions(
            &[a.path().to_path_buf(), b.path().to_path_buf()],
            &factory,
        )
        .unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn test_snapshot_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("users.yaml"), "").unwrap();
        fs::write(dir.path().join("orders.yaml"), "").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let tables = snapshot_tables(dir.path()).unwrap();
        assert_eq!(tables, vec!["orders", "users"]);
    }

    #[test]
    fn test_resolve_scope() {
        let tables = vec![
            "orders".to_string(),
            "order_items".to_string(),
            "users".to_string(),
        ];

        assert_eq!(resolve_scope(&tables, &TableScope::All), tables);
        assert_eq!(
            resolve_scope(&tables, &TableScope::Named(vec!["users".to_string()])),
            vec!["users"]
        );
        assert_eq!(
            resolve_scope(&tables, &TableScope::Prefix("order".to_string())),
            vec!["orders", "order_items"]
        );
    }
}
