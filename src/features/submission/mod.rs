/// 送信機能モジュール
///
/// 入力済みの下書きと領収書を1件のレコードにまとめ、送信先へ引き渡す。
/// 送信先（スプレッドシート連携）は未実装のため、既定のクライアントは
/// ログ出力と待機のみを行う。
pub mod client;
pub mod models;

// 公開インターフェース
pub use client::{SimulatedSubmissionClient, SubmissionClient};
pub use models::{RecordDetails, SubmissionAck, SubmissionRecord, SubmittedReceipt};
