/// 入力フォーム機能モジュール
///
/// このモジュールは車両チェックイン/アウトと給油記録の入力を管理します：
/// - 下書きの項目編集（車両番号の正規化を含む）
/// - キー入力ごとのオドメーター検証とメッセージ欄
/// - 領収書撮影・アップロードの仲介
/// - 送信の開始と結果の反映（成功時のみ下書きを初期化）
pub mod models;
pub mod session;


// 公開インターフェース
pub use models::{
    normalize_vehicle_number, parse_amount, CheckInOutDraft, CheckInOutField, CheckInOutValues,
    FormKind, FuelField, FuelLogDraft, FuelValues,
};
pub use session::{FieldLogSession, PendingSubmission};
