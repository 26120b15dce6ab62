// コアドメインモジュール
//
// バージョンモデル、フィールド対応付け、スキーマ宣言モデル、
// 設定、エラー型を提供します。

pub mod config;
pub mod error;
pub mod field;
pub mod schema;
pub mod version;
