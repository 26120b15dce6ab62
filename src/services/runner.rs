// マイグレーション実行ステートマシン
//
// Idle → Resolving → DirectionDecided → Iterating → {Skipped | Executed}
// → Done | Aborted の流れでバージョンを前進・後退させます。
// すべての操作は逐次実行され、失敗は即座に実行を中断します。
// 失敗前に書き込まれた完了ログのエントリはそのまま残ります。

use crate::adapters::traits::{
    CompletionEntry, CompletionLog, Hook, MigrationUnitProvider, SchemaApplier,
};
use crate::core::error::MigrationError;
use crate::core::version::{between, maximum, sort_desc, Version, VersionFactory};
use crate::services::discovery::{
    discover_versions, resolve_scope, snapshot_tables, TableScope,
};
use crate::services::reconciler::Reconciler;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;

/// 実行方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// 1回の実行結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// 決定された方向（何もすることが無かった場合はNone）
    pub direction: Option<Direction>,
    /// 実行されたバージョン（実行順）
    pub executed: Vec<String>,
    /// スキップされたバージョン
    pub skipped: Vec<String>,
}

impl RunReport {
    fn nothing_to_do() -> Self {
        Self {
            direction: None,
            executed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// ステータス表示用のバージョン状態
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// 最後に適用されたバージョン
    pub current: Option<String>,
    /// 発見されたバージョンと適用済みフラグ（スタンプ昇順）
    pub entries: Vec<(String, bool)>,
}

/// マイグレーション実行者
///
/// スキーマ適用者・完了ログ・ユニットプロバイダーを外部コラボレーターとして
/// 受け取り、バージョン集合の発見から各フックの呼び出しまでを駆動します。
pub struct MigrationRunner<'a> {
    applier: &'a dyn SchemaApplier,
    log: &'a dyn CompletionLog,
    provider: &'a dyn MigrationUnitProvider,
    factory: VersionFactory,
    reconciler: Reconciler,
}

impl<'a> MigrationRunner<'a> {
    /// 新しいMigrationRunnerを作成
    pub fn new(
        applier: &'a dyn SchemaApplier,
        log: &'a dyn CompletionLog,
        provider: &'a dyn MigrationUnitProvider,
        factory: VersionFactory,
    ) -> Self {
        Self {
            applier,
            log,
            provider,
            factory,
            reconciler: Reconciler::new(),
        }
    }

    /// マイグレーションを実行
    ///
    /// # Arguments
    ///
    /// * `locations` - バージョン探索ディレクトリ
    /// * `target` - 目標バージョン（Noneなら発見された最大バージョン）
    /// * `scope` - 実行対象テーブルの選択
    ///
    /// # Returns
    ///
    /// 実行・スキップされたバージョンのレポート。フックや構造操作の失敗は
    /// そのまま伝播し、残りのバージョンは実行されません。
    pub async fn run(
        &self,
        locations: &[PathBuf],
        target: Option<&str>,
        scope: &TableScope,
    ) -> Result<RunReport, MigrationError> {
        // Resolving
        let discovered = discover_versions(locations, &self.factory)?;
        let completed = self.log.list().await?;
        let latest = self.log.latest().await?;
        let current = self.factory.create(latest.as_deref())?;

        let target_version = match target {
            Some(raw) => self.factory.create(Some(raw))?,
            None => maximum(&discovered).unwrap_or_else(|| current.clone()),
        };

        tracing::info!(
            current = %current,
            target = %target_version,
            discovered = discovered.len(),
            completed = completed.len(),
            "resolved migration state"
        );

        // 現在位置が目標と一致し、発見済みがすべて適用済みなら何もしない
        if current.stamp() == target_version.stamp() && completed.len() == discovered.len() {
            tracing::info!("nothing to do");
            return Ok(RunReport::nothing_to_do());
        }

        // DirectionDecided
        let direction = if target_version.stamp() > current.stamp() {
            Direction::Forward
        } else {
            Direction::Backward
        };
        tracing::info!(direction = ?direction, "direction decided");

        // 現在バージョンを発見集合に挿入して再ソートすることで、過去の実行が
        // 取りこぼした古いバージョンも候補に含める。現在バージョンは後から
        // 挿入されるため、同一スタンプのスロットを獲得する。
        let mut union = discovered.clone();
        union.push(current.clone());
        let candidates = between(&current, &target_version, &union);

        let mut report = RunReport {
            direction: Some(direction),
            executed: Vec::new(),
            skipped: Vec::new(),
        };

        match direction {
            Direction::Forward => {
                self.walk_forward(&candidates, &current, &completed, scope, &mut report)
                    .await?
            }
            Direction::Backward => {
                self.walk_backward(
                    &candidates,
                    &current,
                    &discovered,
                    &completed,
                    scope,
                    &mut report,
                )
                .await?
            }
        }

        Ok(report)
    }

    /// 前進方向の反復
    async fn walk_forward(
        &self,
        candidates: &[Version],
        current: &Version,
        completed: &std::collections::HashSet<String>,
        scope: &TableScope,
        report: &mut RunReport,
    ) -> Result<(), MigrationError> {
        for candidate in candidates {
            // 起点の現在バージョン自体は再実行しない
            if candidate.stamp() == current.stamp() {
                continue;
            }

            if completed.contains(&candidate.to_string()) {
                tracing::info!(version = %candidate, "already applied, skipping");
                report.skipped.push(candidate.to_string());
                continue;
            }

            let started_at = Utc::now();
            self.execute_forward(candidate, scope).await?;

            self.log
                .append(&CompletionEntry::new(
                    candidate.to_string(),
                    started_at,
                    Utc::now(),
                ))
                .await?;
            report.executed.push(candidate.to_string());
        }

        Ok(())
    }

    /// 1バージョン分の前進ステップ
    async fn execute_forward(
        &self,
        version: &Version,
        scope: &TableScope,
    ) -> Result<(), MigrationError> {
        tracing::info!(version = %version, "applying version");

        for table in self.tables_for(version, scope)? {
            let unit = self.provider.resolve(version, &table)?;

            if let Some(target) = unit.morph_target() {
                let outcome = self.reconciler.morph(self.applier, target).await?;
                if outcome.created && unit.declares(Hook::AfterCreateTable) {
                    unit.after_create_table(self.applier).await?;
                }
            }

            if unit.declares(Hook::Up) {
                unit.up(self.applier).await?;
            }
            if unit.declares(Hook::AfterUp) {
                unit.after_up(self.applier).await?;
            }
        }

        Ok(())
    }

    /// 後退方向の反復
    ///
    /// 各ステップはカーソル（直前のバージョン）をロールバックし、候補 `v`
    /// 以下で最初にmorphを宣言する発見済みバージョンのmorphだけを実行して
    /// 構造を戻します（`up`/`down`は実行しません）。
    async fn walk_backward(
        &self,
        candidates: &[Version],
        current: &Version,
        discovered: &[Version],
        completed: &std::collections::HashSet<String>,
        scope: &TableScope,
        report: &mut RunReport,
    ) -> Result<(), MigrationError> {
        let descending = sort_desc(discovered);
        let mut cursor = current.clone();

        for candidate in candidates {
            // 起点の現在バージョンはカーソルの初期位置であり、候補としては扱わない
            if candidate.stamp() == current.stamp() {
                continue;
            }

            if !completed.contains(&cursor.to_string()) {
                tracing::info!(version = %cursor, "not applied, treating as already rolled back");
                report.skipped.push(cursor.to_string());
                cursor = candidate.clone();
                continue;
            }

            let rolled_back = cursor.to_string();
            self.execute_backward(&cursor, candidate, discovered, &descending, scope)
                .await?;

            self.log.remove(&rolled_back).await?;
            report.executed.push(rolled_back);
            cursor = candidate.clone();
        }

        Ok(())
    }

    /// 1バージョン分の後退ステップ
    async fn execute_backward(
        &self,
        cursor: &Version,
        candidate: &Version,
        discovered: &[Version],
        descending: &[Version],
        scope: &TableScope,
    ) -> Result<(), MigrationError> {
        tracing::info!(version = %cursor, "rolling back version");

        // カーソルは完了ログ由来の場合があるため、発見済みの実体に読み替える
        let located = Self::locate(discovered, cursor)?;

        for table in self.tables_for(located, scope)? {
            let unit = self.provider.resolve(located, &table)?;

            if unit.declares(Hook::Down) {
                unit.down(self.applier).await?;
            }
            if unit.declares(Hook::AfterDown) {
                unit.after_down(self.applier).await?;
            }
        }

        // 候補以下で最初にmorphを宣言するバージョンを探し、その構造を復元する
        for earlier in descending {
            if earlier.stamp() > candidate.stamp() {
                continue;
            }

            let mut restored = false;
            for table in self.tables_for(earlier, scope)? {
                let unit = self.provider.resolve(earlier, &table)?;
                if let Some(target) = unit.morph_target() {
                    tracing::info!(
                        version = %earlier,
                        table = %table,
                        "restoring structure"
                    );
                    self.reconciler.morph(self.applier, target).await?;
                    restored = true;
                }
            }

            if restored {
                break;
            }
        }

        Ok(())
    }

    /// ステータスを取得
    pub async fn status(&self, locations: &[PathBuf]) -> Result<StatusReport, MigrationError> {
        let discovered = discover_versions(locations, &self.factory)?;
        let completed = self.log.list().await?;
        let current = self.log.latest().await?;

        let entries = crate::core::version::sort_asc(&discovered)
            .iter()
            .map(|v| {
                let name = v.to_string();
                let applied = completed.contains(&name);
                (name, applied)
            })
            .collect();

        Ok(StatusReport { current, entries })
    }

    /// バージョンのスナップショットから対象テーブルを解決
    fn tables_for(
        &self,
        version: &Version,
        scope: &TableScope,
    ) -> Result<Vec<String>, MigrationError> {
        let dir = version
            .path()
            .ok_or_else(|| MigrationError::VersionNotDiscovered {
                version: version.to_string(),
            })?;
        let tables = snapshot_tables(dir)?;
        Ok(resolve_scope(&tables, scope))
    }

    /// 完了ログ由来のバージョンを発見済みの実体（パス付き）に読み替える
    fn locate<'v>(
        discovered: &'v [Version],
        version: &Version,
    ) -> Result<&'v Version, MigrationError> {
        discovered
            .iter()
            .find(|d| d.stamp() == version.stamp())
            .ok_or_else(|| MigrationError::VersionNotDiscovered {
                version: version.to_string(),
            })
    }
}
