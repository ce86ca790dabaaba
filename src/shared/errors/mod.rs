use thiserror::Error;

/// フォーム入力・領収書撮影・送信で使用される統一エラー型
///
/// どのエラーも致命的ではなく、画面上の単一メッセージ欄に
/// `user_message()` の内容を表示して回復する。
#[derive(Debug, Error)]
pub enum AppError {
    /// 数値として解釈できない入力（空文字を含む）
    #[error("入力値エラー: {0}")]
    InvalidInput(String),

    /// 前回の走行距離より小さいオドメーター値
    #[error("オドメーター値が前回値({last_reading})を下回っています")]
    InvalidOdometer { last_reading: f64, message: String },

    /// 大きな走行距離の増加が確認されなかった
    #[error("走行距離の増加({distance_km}km)が確認されませんでした")]
    OdometerWarning { distance_km: f64, message: String },

    /// 領収書が添付されていない状態での送信
    #[error("領収書が添付されていません")]
    MissingReceipt,

    /// カメラの権限拒否・デバイス不在
    #[error("カメラを利用できません: {0}")]
    CameraUnavailable(String),

    /// カメラ要求中またはストリーミング中の重複要求
    #[error("カメラは既に使用中です")]
    CameraBusy,

    /// 現在の撮影状態では実行できない操作
    #[error("不正な状態遷移: {0}")]
    InvalidState(String),

    /// アップロードファイルのサイズ超過
    #[error("ファイルサイズ超過: {size} bytes (上限 {limit} bytes)")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// 必須項目などのバリデーションエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 送信先との連携でのエラー
    #[error("送信エラー: {0}")]
    Submission(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 画像のエンコード・プレビュー変換のエラー
    #[error("画像変換エラー: {0}")]
    Encoding(String),

    /// 並行処理関連のエラー
    #[error("並行処理エラー: {0}")]
    Concurrency(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（デバイス・送信の一時的エラーなど）
    Medium,
    /// 高重要度（設定エラーなど）
    High,
    /// 最重要（リソース管理の破綻など）
    Critical,
}

impl AppError {
    /// ユーザーに表示するためのメッセージを取得
    ///
    /// # 戻り値
    /// メッセージ欄に表示可能な文字列
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::InvalidOdometer { message, .. }
            | AppError::OdometerWarning { message, .. } => message.clone(),
            AppError::PayloadTooLarge { limit, .. } => {
                format!("Photo size should be less than {}", format_size_limit(*limit))
            }
            other => other.fixed_user_message().to_string(),
        }
    }

    fn fixed_user_message(&self) -> &'static str {
        match self {
            AppError::MissingReceipt => "Please upload receipt photo",
            AppError::CameraUnavailable(_) => "Unable to access camera. Please check permissions.",
            AppError::CameraBusy => "Camera is already open.",
            AppError::InvalidState(_) => "This action is not available right now.",
            AppError::Submission(_) => "Failed to submit. Please try again.",
            AppError::Configuration(_) => "The application is not configured correctly.",
            AppError::Encoding(_) => "Unable to process the photo. Please try again.",
            AppError::Concurrency(_) => "An internal error occurred. Please try again.",
            AppError::Io(_) => "Unable to read the photo file.",
            AppError::Json(_) => "Unable to prepare the submission.",
            _ => "Something went wrong. Please try again.",
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::InvalidInput(_) => ErrorSeverity::Low,
            AppError::InvalidOdometer { .. } => ErrorSeverity::Low,
            AppError::OdometerWarning { .. } => ErrorSeverity::Low,
            AppError::MissingReceipt => ErrorSeverity::Low,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::PayloadTooLarge { .. } => ErrorSeverity::Low,
            AppError::CameraBusy => ErrorSeverity::Low,
            AppError::InvalidState(_) => ErrorSeverity::Low,
            AppError::CameraUnavailable(_) => ErrorSeverity::Medium,
            AppError::Submission(_) => ErrorSeverity::Medium,
            AppError::Encoding(_) => ErrorSeverity::Medium,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Concurrency(_) => ErrorSeverity::Critical,
        }
    }

    /// 入力値エラーを作成するヘルパー関数
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// バリデーションエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - バリデーションエラーメッセージ
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// 不正な状態遷移エラーを作成するヘルパー関数
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        AppError::InvalidState(message.into())
    }

    /// カメラ利用不可エラーを作成するヘルパー関数
    pub fn camera_unavailable<S: Into<String>>(reason: S) -> Self {
        AppError::CameraUnavailable(reason.into())
    }

    /// 送信エラーを作成するヘルパー関数
    pub fn submission<S: Into<String>>(message: S) -> Self {
        AppError::Submission(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// 画像変換エラーを作成するヘルパー関数
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        AppError::Encoding(message.into())
    }

    /// 並行処理エラーを作成するヘルパー関数
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        AppError::Concurrency(message.into())
    }
}

/// AppErrorからStringへの変換（表示層へ文字列で渡すため）
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.user_message()
    }
}

/// image::ImageErrorからAppErrorへの変換
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> Self {
        AppError::Encoding(error.to_string())
    }
}

/// サイズ上限を表示用に整形する（1MB = 1024 * 1024 bytes）
fn format_size_limit(limit: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if limit >= MIB {
        let tenths = (limit * 10 + MIB / 2) / MIB;
        if tenths % 10 == 0 {
            format!("{}MB", tenths / 10)
        } else {
            format!("{}.{}MB", tenths / 10, tenths % 10)
        }
    } else if limit >= KIB {
        format!("{}KB", limit / KIB)
    } else {
        format!("{limit} bytes")
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;
