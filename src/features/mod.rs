/// 入力フォーム（チェックイン/アウト・給油記録）
pub mod forms;

/// オドメーター検証
pub mod odometer;

/// 領収書撮影・添付
pub mod receipts;

/// 送信
pub mod submission;
