/// オドメーター検証機能モジュール
///
/// このモジュールは走行距離の入力値検証を提供します：
/// - 入力文字列の数値解釈（空・数値以外は InvalidInput）
/// - 前回値との比較（下回る場合は拒否、1000km超の増加は要確認）
/// - 確認ダイアログの注入による最終判定
pub mod models;
pub mod validator;

// 公開インターフェース
pub use models::{OdometerStatus, OdometerValidation};
pub use validator::{parse_reading, validate, ConfirmationPrompt, OdometerValidator};
