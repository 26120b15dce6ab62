// スキーマ宣言モデル
//
// 1テーブル・1バージョン分の宣言的なターゲット形状を表現する型システム。
// TableDefinition, Column, Index, ForeignKey などの構造体を提供します。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// テーブル定義
///
/// あるバージョンにおける1テーブルの宣言的なターゲット形状を表現します。
/// 順序付きカラム宣言、名前付きインデックス、名前付き外部キー、
/// 自由形式のオプションマップ（ストレージエンジンなど）を保持します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// テーブル名
    pub name: String,

    /// カラム定義のリスト（宣言順）
    pub columns: Vec<Column>,

    /// インデックス定義のリスト
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// 外部キー定義のリスト
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    /// テーブルオプション（例: engine -> InnoDB）
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl TableDefinition {
    /// 新しいテーブル定義を作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            options: HashMap::new(),
        }
    }

    /// カラムを追加
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// インデックスを追加
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// 外部キーを追加
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.foreign_keys.push(foreign_key);
    }

    /// 指定されたカラムを取得
    pub fn get_column(&self, column_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == column_name)
    }

    /// 指定されたインデックスを取得
    pub fn get_index(&self, index_name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == index_name)
    }

    /// 指定された外部キーを取得
    pub fn get_foreign_key(&self, key_name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|k| k.name == key_name)
    }
}

/// カラム位置ヒント
///
/// カラムをテーブルの先頭、または指定カラムの直後に配置します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPosition {
    /// テーブルの先頭に配置
    First,
    /// 指定カラムの直後に配置
    After(String),
}

/// カラム型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    BigInteger,
    SmallInteger,
    Varchar,
    Char,
    Text,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Decimal,
    Float,
    Double,
    Json,
    Blob,
}

impl ColumnType {
    /// SQLの型名を取得
    pub fn to_sql_type(&self, size: Option<u32>) -> String {
        let base = match self {
            ColumnType::Integer => "INT",
            ColumnType::BigInteger => "BIGINT",
            ColumnType::SmallInteger => "SMALLINT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Char => "CHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "TINYINT",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Json => "JSON",
            ColumnType::Blob => "BLOB",
        };

        match size {
            Some(size) => format!("{}({})", base, size),
            None => base.to_string(),
        }
    }
}

/// カラム定義
///
/// テーブル内の単一カラムの宣言を表現します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// カラム名
    pub name: String,

    /// カラム型
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// 型サイズ（VARCHARの長さなど）
    pub size: Option<u32>,

    /// NULL許可フラグ
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// デフォルト値
    pub default_value: Option<String>,

    /// 符号なしフラグ
    #[serde(default)]
    pub unsigned: bool,

    /// 自動増分フラグ
    #[serde(default)]
    pub auto_increment: bool,

    /// プライマリキーの一部かどうか
    #[serde(default)]
    pub primary: bool,

    /// 位置ヒント（first / after <col>）
    pub position: Option<ColumnPosition>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// 新しいカラムを作成
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: None,
            nullable: true,
            default_value: None,
            unsigned: false,
            auto_increment: false,
            primary: false,
            position: None,
        }
    }

    /// 型サイズを設定
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// NULL許可フラグを設定
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// デフォルト値を設定
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// 符号なしフラグを設定
    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// 自動増分フラグを設定
    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// プライマリキーフラグを設定
    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 位置ヒントを設定
    pub fn position(mut self, position: ColumnPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// 照合エンジンが変更とみなす属性（型・サイズ・NULL制約・デフォルト値）が
    /// 他方と異なるかどうか
    pub fn definition_changed(&self, other: &Column) -> bool {
        self.column_type != other.column_type
            || self.size != other.size
            || self.nullable != other.nullable
            || self.default_value != other.default_value
    }

    /// 名前以外の全属性が他方と一致するかどうか（リネーム対応付けで使用）
    pub fn attributes_match(&self, other: &Column) -> bool {
        !self.definition_changed(other)
            && self.unsigned == other.unsigned
            && self.auto_increment == other.auto_increment
            && self.primary == other.primary
    }
}

/// インデックス種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    #[default]
    Plain,
}

/// インデックス定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// インデックス名（プライマリキーは "PRIMARY"）
    pub name: String,

    /// 対象カラム名のリスト
    pub columns: Vec<String>,

    /// インデックス種別
    #[serde(default)]
    pub kind: IndexKind,
}

impl Index {
    /// プライマリキー名
    pub const PRIMARY_NAME: &'static str = "PRIMARY";

    /// 新しいインデックスを作成
    pub fn new(name: impl Into<String>, columns: Vec<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            columns,
            kind,
        }
    }

    /// プライマリキーかどうか
    pub fn is_primary(&self) -> bool {
        self.name == Self::PRIMARY_NAME
    }
}

/// 参照アクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAction {
    Restrict,
    Cascade,
    SetNull,
    NoAction,
}

impl fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceAction::Restrict => write!(f, "RESTRICT"),
            ReferenceAction::Cascade => write!(f, "CASCADE"),
            ReferenceAction::SetNull => write!(f, "SET NULL"),
            ReferenceAction::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// 外部キー定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// 制約名
    pub name: String,

    /// ローカルカラム名のリスト
    pub columns: Vec<String>,

    /// 参照先スキーマ（省略時は同一スキーマ）
    pub referenced_schema: Option<String>,

    /// 参照先テーブル名
    pub referenced_table: String,

    /// 参照先カラム名のリスト
    pub referenced_columns: Vec<String>,

    /// UPDATE時のアクション
    pub on_update: Option<ReferenceAction>,

    /// DELETE時のアクション
    pub on_delete: Option<ReferenceAction>,
}

impl ForeignKey {
    /// 新しい外部キーを作成
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            referenced_schema: None,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_update: None,
            on_delete: None,
        }
    }
}
