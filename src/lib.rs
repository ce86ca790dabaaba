pub mod features;
pub mod shared;

use log::{info, warn};

pub use features::forms::{CheckInOutField, FieldLogSession, FormKind, FuelField};
pub use features::odometer::{ConfirmationPrompt, OdometerValidator};
pub use features::receipts::{CameraDevice, CaptureState, ReceiptCaptureManager, ReceiptFile};
pub use features::submission::{SimulatedSubmissionClient, SubmissionClient};
pub use shared::config::{EnvironmentConfig, FieldLogConfig};
pub use shared::errors::{AppError, AppResult};

/// 環境変数・ログ・設定を初期化する
///
/// 表示層の起動時に一度だけ呼び出す。
///
/// # 戻り値
/// 検証済みの設定、または設定エラー
pub fn initialize() -> AppResult<FieldLogConfig> {
    shared::config::load_environment_variables();

    let env_config = EnvironmentConfig::from_env();
    shared::config::initialize_logging_system(&env_config);

    info!("アプリケーション初期化を開始します...");

    match FieldLogConfig::from_env() {
        Ok(config) => {
            info!(
                "設定を読み込みました: environment={:?}, endpoint={}",
                config.environment, config.submission_endpoint_url
            );
            Ok(config)
        }
        Err(e) if env_config.is_production() => Err(e.into()),
        Err(e) => {
            warn!("設定エラーのため既定値で続行します（開発環境）: {e}");
            Ok(FieldLogConfig {
                environment: env_config.environment,
                ..FieldLogConfig::default()
            })
        }
    }
}
