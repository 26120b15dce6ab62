// バージョン生成サービス
//
// 新しいマイグレーションバージョンのディレクトリを予約し、
// テーブルごとのユニットファイルの雛形を配置します。

use crate::core::error::MigrationError;
use crate::core::version::{maximum, Version, VersionFactory};
use crate::services::discovery::discover_versions;
use std::path::Path;

/// ユニットファイルの雛形
const UNIT_TEMPLATE: &str = "morph:\n  columns:\n    - name: id\n      type: integer\n      nullable: false\n      primary: true\n";

/// バージョン生成者
#[derive(Debug, Clone)]
pub struct Generator {
    factory: VersionFactory,
}

impl Generator {
    /// 新しいGeneratorを作成
    pub fn new(factory: VersionFactory) -> Self {
        Self { factory }
    }

    /// 次のバージョンを予約してディレクトリを作成
    ///
    /// # Arguments
    ///
    /// * `location` - マイグレーションディレクトリ（無ければ作成されます）
    /// * `explicit` - 明示的なバージョン（Noneなら最大バージョン+1）
    /// * `force` - 既存バージョンのディレクトリを再利用するかどうか
    ///
    /// # Returns
    ///
    /// 作成されたディレクトリをパスに持つバージョン。
    /// 既存バージョンと衝突し、forceが指定されていない場合はDuplicateVersion。
    pub fn reserve(
        &self,
        location: &Path,
        explicit: Option<&str>,
        force: bool,
    ) -> Result<Version, MigrationError> {
        if !location.is_dir() {
            std::fs::create_dir_all(location).map_err(|e| MigrationError::DirectoryWrite {
                path: location.display().to_string(),
                cause: e.to_string(),
            })?;
        }

        let discovered = discover_versions(&[location.to_path_buf()], &self.factory)?;

        let version = match explicit {
            Some(raw) => self.factory.create(Some(raw))?,
            None => match maximum(&discovered) {
                Some(latest) => latest.add_minor(1),
                None => self.factory.create(None)?.add_minor(1),
            },
        };

        let dir = location.join(version.to_string());
        if dir.exists() && !force {
            return Err(MigrationError::DuplicateVersion {
                version: version.to_string(),
                path: dir.display().to_string(),
            });
        }

        std::fs::create_dir_all(&dir).map_err(|e| MigrationError::DirectoryWrite {
            path: dir.display().to_string(),
            cause: e.to_string(),
        })?;

        tracing::info!(version = %version, path = %dir.display(), "reserved version");
        Ok(version.with_path(dir))
    }

    /// 指定されたテーブルのユニットファイルの雛形を配置
    ///
    /// 既存のユニットファイルは上書きしません。
    pub fn scaffold_tables(
        &self,
        version: &Version,
        tables: &[String],
    ) -> Result<(), MigrationError> {
        let dir = version
            .path()
            .ok_or_else(|| MigrationError::VersionNotDiscovered {
                version: version.to_string(),
            })?;

        for table in tables {
            let path = dir.join(format!("{}.yaml", table));
            if path.exists() {
                continue;
            }

            std::fs::write(&path, UNIT_TEMPLATE).map_err(|e| MigrationError::DirectoryWrite {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;
            tracing::info!(table = %table, path = %path.display(), "scaffolded unit file");
        }

        Ok(())
    }
}
