// バージョンモデル
//
// マイグレーションのバージョン識別子を表現する型システム。
// インクリメンタル方式（ドット区切り: 1.2.0）とタイムスタンプ方式
// （数値タイムスタンプ+スラッグ: 1699999999_create_users）の2つの
// 採番体系をサポートし、構築・検証・比較・ソート・範囲選択を提供します。
//
// 採番体系は明示的な設定値（VersionScheme）としてVersionFactoryに
// 注入され、プロセス全体のグローバル状態には依存しません。
// 1回の実行内ではすべての比較が単一の体系を前提とします。

use crate::core::error::MigrationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// インクリメンタルバージョンの固定アリティ（不足分は"0"で埋め、超過分は切り捨て）
const INCREMENTAL_PARTS: usize = 3;

/// 下位3パートに適用される位置ごとの重み
const PART_WEIGHTS: [u64; INCREMENTAL_PARTS] = [100, 10, 1];

fn incremental_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*$").expect("invalid incremental pattern")
    })
}

fn timestamped_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{7,}(_[a-z0-9]+)*$").expect("invalid timestamped pattern"))
}

/// バージョン採番体系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// ドット区切りのインクリメンタル方式（例: 1.2.0）
    Incremental,
    /// 数値タイムスタンプ方式（例: 1699999999_create_users）
    Timestamped,
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionScheme::Incremental => write!(f, "incremental"),
            VersionScheme::Timestamped => write!(f, "timestamped"),
        }
    }
}

/// インクリメンタルバージョン
///
/// ドット区切りのパート列を固定アリティに正規化して保持します。
/// スタンプは下位3パートの重み付き和（100, 10, 1）で、数値パートは
/// その数値、英字パートは先頭1文字の文字コードとして評価されます。
/// 100以上のパートや複数文字の英字パートは衝突なしに表現できません
/// （互換性のために温存された既知の制限）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalVersion {
    /// 正規化済みのパート列（常にINCREMENTAL_PARTS個）
    parts: Vec<String>,
    /// 全順序キー
    stamp: u64,
    /// このバージョンが発見されたディレクトリ
    path: Option<PathBuf>,
}

impl IncrementalVersion {
    fn parse(raw: &str) -> Result<Self, MigrationError> {
        if !incremental_pattern().is_match(raw) {
            return Err(MigrationError::InvalidVersionFormat {
                raw: raw.to_string(),
            });
        }

        let mut parts: Vec<String> = raw
            .split('.')
            .take(INCREMENTAL_PARTS)
            .map(|p| p.to_string())
            .collect();
        while parts.len() < INCREMENTAL_PARTS {
            parts.push("0".to_string());
        }

        let stamp = Self::compute_stamp(&parts);

        Ok(Self {
            parts,
            stamp,
            path: None,
        })
    }

    /// パート列からスタンプを計算
    fn compute_stamp(parts: &[String]) -> u64 {
        parts
            .iter()
            .zip(PART_WEIGHTS.iter())
            .map(|(part, weight)| part_value(part) * weight)
            .sum()
    }

    /// 最下位パートをn加算した新しいバージョンを返す
    fn add_minor(&self, n: u64) -> Self {
        let mut parts = self.parts.clone();
        let last = parts
            .last_mut()
            .expect("incremental version always has parts");
        *last = (part_value(last) + n).to_string();

        let stamp = Self::compute_stamp(&parts);
        Self {
            parts,
            stamp,
            path: self.path.clone(),
        }
    }
}

impl fmt::Display for IncrementalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

/// パートの値を評価（数値パートはその値、英字パートは先頭バイトの文字コード）
fn part_value(part: &str) -> u64 {
    match part.parse::<u64>() {
        Ok(value) => value,
        // 複数文字の英字パートは先頭1文字に縮退する（既知の制限）
        Err(_) => part.bytes().next().map(u64::from).unwrap_or(0),
    }
}

/// タイムスタンプバージョン
///
/// `{数値タイムスタンプ}[_{スラッグ}]*` 形式。スタンプは数値タイムスタンプ
/// のみで決まるため、スラッグだけが異なる2つのバージョンは等価に比較されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedVersion {
    /// タイムスタンプ部の元の文字列表現
    timestamp: String,
    /// タイムスタンプに続くスラッグ部（先頭の'_'を含む、無ければ空）
    suffix: String,
    /// 全順序キー（数値タイムスタンプ）
    stamp: u64,
    /// このバージョンが発見されたディレクトリ
    path: Option<PathBuf>,
}

impl TimestampedVersion {
    fn parse(raw: &str) -> Result<Self, MigrationError> {
        if !timestamped_pattern().is_match(raw) {
            return Err(MigrationError::InvalidVersionFormat {
                raw: raw.to_string(),
            });
        }

        let (timestamp, suffix) = match raw.find('_') {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        };

        let stamp =
            timestamp
                .parse::<u64>()
                .map_err(|_| MigrationError::InvalidVersionFormat {
                    raw: raw.to_string(),
                })?;

        Ok(Self {
            timestamp: timestamp.to_string(),
            suffix: suffix.to_string(),
            stamp,
            path: None,
        })
    }

    fn add_minor(&self, n: u64) -> Self {
        let stamp = self.stamp + n;
        Self {
            timestamp: stamp.to_string(),
            suffix: self.suffix.clone(),
            stamp,
            path: self.path.clone(),
        }
    }
}

impl fmt::Display for TimestampedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.timestamp, self.suffix)
    }
}

/// バージョン識別子
///
/// 有効な採番体系のどちらか一方のバリアントを保持します。
/// 1回の実行内のすべての比較は単一のバリアントを前提とします。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    Incremental(IncrementalVersion),
    Timestamped(TimestampedVersion),
}

impl Version {
    /// 全順序キーを取得
    pub fn stamp(&self) -> u64 {
        match self {
            Version::Incremental(v) => v.stamp,
            Version::Timestamped(v) => v.stamp,
        }
    }

    /// このバージョンが発見されたディレクトリを取得
    pub fn path(&self) -> Option<&Path> {
        match self {
            Version::Incremental(v) => v.path.as_deref(),
            Version::Timestamped(v) => v.path.as_deref(),
        }
    }

    /// 発見ディレクトリを設定したバージョンを返す
    pub fn with_path(mut self, path: PathBuf) -> Self {
        match &mut self {
            Version::Incremental(v) => v.path = Some(path),
            Version::Timestamped(v) => v.path = Some(path),
        }
        self
    }

    /// 最下位パートをn加算した新しいバージョンを返す
    ///
    /// 数値パートは算術加算、英字パートは文字コードに変換してから加算され、
    /// 以降は文字としての意味を失います。スタンプは再計算されます。
    pub fn add_minor(&self, n: u64) -> Version {
        match self {
            Version::Incremental(v) => Version::Incremental(v.add_minor(n)),
            Version::Timestamped(v) => Version::Timestamped(v.add_minor(n)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Incremental(v) => v.fmt(f),
            Version::Timestamped(v) => v.fmt(f),
        }
    }
}

/// バージョンファクトリ
///
/// 設定から注入された採番体系に従ってバージョンを構築・検証します。
#[derive(Debug, Clone, Copy)]
pub struct VersionFactory {
    scheme: Option<VersionScheme>,
}

impl VersionFactory {
    /// 採番体系を指定してファクトリを作成
    pub fn new(scheme: VersionScheme) -> Self {
        Self {
            scheme: Some(scheme),
        }
    }

    /// 採番体系が未設定のファクトリを作成
    pub fn unconfigured() -> Self {
        Self { scheme: None }
    }

    /// 設定された採番体系を取得
    pub fn scheme(&self) -> Option<VersionScheme> {
        self.scheme
    }

    /// バージョンを構築
    ///
    /// # Arguments
    ///
    /// * `raw` - バージョン文字列（Noneまたは空文字列は体系ごとの初期値）
    ///
    /// # Returns
    ///
    /// 構築されたバージョン。体系が未設定の場合はUnknownVersionScheme、
    /// 書式が不正な場合はInvalidVersionFormat。
    pub fn create(&self, raw: Option<&str>) -> Result<Version, MigrationError> {
        let scheme = self.scheme.ok_or(MigrationError::UnknownVersionScheme)?;

        match scheme {
            VersionScheme::Incremental => {
                let raw = match raw {
                    Some(s) if !s.is_empty() => s,
                    _ => "0.0.0",
                };
                Ok(Version::Incremental(IncrementalVersion::parse(raw)?))
            }
            VersionScheme::Timestamped => {
                let raw = match raw {
                    Some(s) if !s.is_empty() => s,
                    _ => "0000000_0",
                };
                Ok(Version::Timestamped(TimestampedVersion::parse(raw)?))
            }
        }
    }

    /// バージョン文字列が有効かどうか
    pub fn is_valid(&self, raw: &str) -> bool {
        match self.scheme {
            Some(VersionScheme::Incremental) => incremental_pattern().is_match(raw),
            Some(VersionScheme::Timestamped) => timestamped_pattern().is_match(raw),
            None => false,
        }
    }
}

/// スタンプ昇順にソート
///
/// スタンプをキーとするマップ経由のソートのため、同一スタンプの要素は
/// 後から挿入されたものがスロットを奪い、重複は1件に縮退します
/// （互換性のために温存された既知の曖昧さ）。
pub fn sort_asc(items: &[Version]) -> Vec<Version> {
    let mut keyed: BTreeMap<u64, Version> = BTreeMap::new();
    for item in items {
        keyed.insert(item.stamp(), item.clone());
    }
    keyed.into_values().collect()
}

/// スタンプ降順にソート（sort_ascと同じ縮退規則）
pub fn sort_desc(items: &[Version]) -> Vec<Version> {
    let mut sorted = sort_asc(items);
    sorted.reverse();
    sorted
}

/// 最大スタンプのバージョンを取得（空入力はNone）
pub fn maximum(items: &[Version]) -> Option<Version> {
    items.iter().max_by_key(|v| v.stamp()).cloned()
}

/// 範囲選択
///
/// スタンプが閉区間 [min(a,b), max(a,b)] に入る部分列を返します。
/// a.stamp < b.stamp なら昇順、そうでなければ降順。
/// a.stamp == b.stamp の場合は空を返します。
pub fn between(a: &Version, b: &Version, items: &[Version]) -> Vec<Version> {
    if a.stamp() == b.stamp() {
        return Vec::new();
    }

    let (lo, hi) = if a.stamp() < b.stamp() {
        (a.stamp(), b.stamp())
    } else {
        (b.stamp(), a.stamp())
    };

    let ordered = if a.stamp() < b.stamp() {
        sort_asc(items)
    } else {
        sort_desc(items)
    };

    ordered
        .into_iter()
        .filter(|v| v.stamp() >= lo && v.stamp() <= hi)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> VersionFactory {
        VersionFactory::new(VersionScheme::Incremental)
    }

    fn ts_factory() -> VersionFactory {
        VersionFactory::new(VersionScheme::Timestamped)
    }

    #[test]
    fn test_create_incremental_normalizes_to_three_parts() {
        let factory = factory();

        assert_eq!(factory.create(Some("1")).unwrap().to_string(), "1.0.0");
        assert_eq!(factory.create(Some("1.2")).unwrap().to_string(), "1.2.0");
        assert_eq!(
            factory.create(Some("1.2.3")).unwrap().to_string(),
            "1.2.3"
        );
        assert_eq!(
            factory.create(Some("1.2.3.4")).unwrap().to_string(),
            "1.2.3"
        );
    }

    #[test]
    fn test_create_defaults() {
        assert_eq!(factory().create(None).unwrap().to_string(), "0.0.0");
        assert_eq!(factory().create(Some("")).unwrap().to_string(), "0.0.0");
        assert_eq!(ts_factory().create(None).unwrap().to_string(), "0000000_0");
    }

    #[test]
    fn test_create_without_scheme_fails() {
        let factory = VersionFactory::unconfigured();
        let error = factory.create(Some("1.0.0")).unwrap_err();
        assert!(error.is_unknown_version_scheme());
    }

    #[test]
    fn test_incremental_stamp_weights() {
        let factory = factory();
        assert_eq!(factory.create(Some("1.2.3")).unwrap().stamp(), 123);
        assert_eq!(factory.create(Some("0.0.1")).unwrap().stamp(), 1);
        assert_eq!(factory.create(Some("2.0.0")).unwrap().stamp(), 200);
    }

    #[test]
    fn test_incremental_stamp_letter_parts() {
        // 'a' == 97
        let version = factory().create(Some("0.0.a")).unwrap();
        assert_eq!(version.stamp(), 97);
    }

    #[test]
    fn test_timestamped_stamp_ignores_slug() {
        let factory = ts_factory();
        let a = factory.create(Some("1699999999_create_users")).unwrap();
        let b = factory.create(Some("1699999999_other")).unwrap();
        assert_eq!(a.stamp(), b.stamp());
        assert_eq!(a.to_string(), "1699999999_create_users");
    }

    #[test]
    fn test_is_valid_incremental() {
        let factory = factory();
        assert!(factory.is_valid("1.2.3"));
        assert!(factory.is_valid("1"));
        assert!(factory.is_valid("1.a.0"));
        assert!(!factory.is_valid("1..2"));
        assert!(!factory.is_valid(""));
        assert!(!factory.is_valid("1.2-3"));
    }

    #[test]
    fn test_is_valid_timestamped() {
        let factory = ts_factory();
        assert!(factory.is_valid("1699999999"));
        assert!(factory.is_valid("1699999999_create_users"));
        assert!(factory.is_valid("0000000_0"));
        assert!(!factory.is_valid("123456"));
        assert!(!factory.is_valid("1699999999_Create"));
        assert!(!factory.is_valid("abc"));
    }

    #[test]
    fn test_is_valid_without_scheme() {
        assert!(!VersionFactory::unconfigured().is_valid("1.0.0"));
    }

    #[test]
    fn test_sort_asc_and_desc_are_mutual_reverses() {
        let factory = factory();
        let items = vec![
            factory.create(Some("0.0.3")).unwrap(),
            factory.create(Some("0.0.1")).unwrap(),
            factory.create(Some("0.0.2")).unwrap(),
        ];

        let asc: Vec<String> = sort_asc(&items).iter().map(|v| v.to_string()).collect();
        let mut desc: Vec<String> = sort_desc(&items).iter().map(|v| v.to_string()).collect();
        desc.reverse();

        assert_eq!(asc, vec!["0.0.1", "0.0.2", "0.0.3"]);
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_sort_collapses_duplicate_stamps() {
        let factory = ts_factory();
        let first = factory.create(Some("1699999999_first")).unwrap();
        let second = factory.create(Some("1699999999_second")).unwrap();

        let sorted = sort_asc(&[first, second]);
        assert_eq!(sorted.len(), 1);
        // 後から挿入された要素がスロットを獲得する
        assert_eq!(sorted[0].to_string(), "1699999999_second");
    }

    #[test]
    fn test_maximum() {
        let factory = factory();
        let items = vec![
            factory.create(Some("0.0.2")).unwrap(),
            factory.create(Some("0.1.0")).unwrap(),
            factory.create(Some("0.0.9")).unwrap(),
        ];

        assert_eq!(maximum(&items).unwrap().to_string(), "0.1.0");
        assert!(maximum(&[]).is_none());
    }

    #[test]
    fn test_between_inclusive_and_directional() {
        let factory = factory();
        let a = factory.create(Some("0.0.1")).unwrap();
        let b = factory.create(Some("0.0.2")).unwrap();
        let items = vec![a.clone(), b.clone()];

        let forward: Vec<String> = between(&a, &b, &items)
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(forward, vec!["0.0.1", "0.0.2"]);

        let backward: Vec<String> = between(&b, &a, &items)
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(backward, vec!["0.0.2", "0.0.1"]);
    }

    #[test]
    fn test_between_equal_stamps_is_empty() {
        let factory = factory();
        let a = factory.create(Some("0.0.1")).unwrap();
        assert!(between(&a, &a, &[a.clone()]).is_empty());
    }

    #[test]
    fn test_between_excludes_out_of_range() {
        let factory = factory();
        let items = vec![
            factory.create(Some("0.0.1")).unwrap(),
            factory.create(Some("0.0.2")).unwrap(),
            factory.create(Some("0.0.5")).unwrap(),
        ];
        let a = factory.create(Some("0.0.1")).unwrap();
        let b = factory.create(Some("0.0.3")).unwrap();

        let range: Vec<String> = between(&a, &b, &items)
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(range, vec!["0.0.1", "0.0.2"]);
    }

    #[test]
    fn test_add_minor_numeric() {
        let version = factory().create(Some("0.0.1")).unwrap();
        let next = version.add_minor(1);
        assert_eq!(next.to_string(), "0.0.2");
        assert_eq!(next.stamp(), 2);
    }

    #[test]
    fn test_add_minor_letter_part_loses_letter_semantics() {
        // 'a' == 97 なので加算後は数値 98 になる
        let version = factory().create(Some("0.0.a")).unwrap();
        let next = version.add_minor(1);
        assert_eq!(next.to_string(), "0.0.98");
        assert_eq!(next.stamp(), 98);
    }

    #[test]
    fn test_add_minor_timestamped_preserves_slug() {
        let version = ts_factory().create(Some("1699999999_users")).unwrap();
        let next = version.add_minor(1);
        assert_eq!(next.to_string(), "1700000000_users");
        assert_eq!(next.stamp(), 1700000000);
    }

    #[test]
    fn test_with_path() {
        let version = factory()
            .create(Some("0.0.1"))
            .unwrap()
            .with_path(PathBuf::from("migrations/0.0.1"));
        assert_eq!(version.path(), Some(Path::new("migrations/0.0.1")));
    }
}
