// Metamorphライブラリのエントリーポイント
//
// モジュール構造:
// - core: コアドメインロジック（バージョンモデル、フィールド対応付け、スキーマ定義）
// - adapters: データベースと完了ログへのアクセスを抽象化
// - services: 照合エンジン、バージョン探索、マイグレーション実行ステートマシン
// - cli: コマンドルーティングとハンドラー

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
