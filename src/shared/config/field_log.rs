// 入力フォーム・領収書撮影・送信の設定

use super::environment::{get_environment, Environment};
use log::{debug, info, warn};
use thiserror::Error;

/// 送信先（Google Apps Script）の既定URL
pub const DEFAULT_SUBMISSION_ENDPOINT_URL: &str = "https://script.google.com/macros/s/AKfycbzNxjFr9X7F_ZDQwW0lo0vj0DCWmN5Jevc2YXg_4w0LLtYZUBAQDtxQQz2UUCEh7HXL/exec";

/// 領収書ファイルの上限サイズ（5MB）
pub const DEFAULT_MAX_RECEIPT_BYTES: u64 = 5 * 1024 * 1024;

/// 確認が必要となる走行距離の増加幅（km）
pub const DEFAULT_WARNING_THRESHOLD_KM: f64 = 1000.0;

/// 送信シミュレーションの待機時間（ミリ秒）
pub const DEFAULT_SUBMISSION_DELAY_MS: u64 = 800;

/// カメラ撮影画像のJPEG品質
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// 設定関連のエラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} の値が不正です: {value}")]
    InvalidValue { key: String, value: String },

    #[error("送信先URLが不正です: {0}")]
    InvalidEndpoint(String),

    #[error("本番環境ではHTTPSの送信先URLが必要です: {0}")]
    InsecureEndpoint(String),
}

impl From<ConfigError> for crate::shared::errors::AppError {
    fn from(error: ConfigError) -> Self {
        crate::shared::errors::AppError::Configuration(error.to_string())
    }
}

/// フォーム全体の設定
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLogConfig {
    pub environment: Environment,
    pub submission_endpoint_url: String,
    pub submission_delay_ms: u64,
    pub max_receipt_bytes: u64,
    pub warning_threshold_km: f64,
    pub last_odometer: f64,
    pub jpeg_quality: u8,
}

impl Default for FieldLogConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            submission_endpoint_url: default_endpoint_url(),
            submission_delay_ms: DEFAULT_SUBMISSION_DELAY_MS,
            max_receipt_bytes: DEFAULT_MAX_RECEIPT_BYTES,
            warning_threshold_km: DEFAULT_WARNING_THRESHOLD_KM,
            last_odometer: 0.0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// コンパイル時埋め込み値を優先して既定の送信先URLを決定する
fn default_endpoint_url() -> String {
    option_env!("EMBEDDED_SUBMISSION_ENDPOINT_URL")
        .unwrap_or(DEFAULT_SUBMISSION_ENDPOINT_URL)
        .to_string()
}

impl FieldLogConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("フォーム設定を環境変数から読み込み中...");
        let config = Self::from_lookup(get_environment(), |key| std::env::var(key).ok())?;
        info!("フォーム設定の読み込みが完了しました");
        Ok(config)
    }

    /// 任意の取得関数から設定を読み込む
    ///
    /// # 引数
    /// * `environment` - 実行環境
    /// * `lookup` - キーに対応する値を返す関数（未設定はNone）
    pub fn from_lookup<F>(environment: Environment, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            environment,
            submission_endpoint_url: lookup("SUBMISSION_ENDPOINT_URL")
                .unwrap_or(defaults.submission_endpoint_url),
            submission_delay_ms: parse_or("SUBMISSION_DELAY_MS", &lookup, defaults.submission_delay_ms)?,
            max_receipt_bytes: parse_or("MAX_RECEIPT_BYTES", &lookup, defaults.max_receipt_bytes)?,
            warning_threshold_km: parse_or(
                "ODOMETER_WARNING_THRESHOLD_KM",
                &lookup,
                defaults.warning_threshold_km,
            )?,
            last_odometer: parse_or("LAST_ODOMETER", &lookup, defaults.last_odometer)?,
            jpeg_quality: parse_or("JPEG_QUALITY", &lookup, defaults.jpeg_quality)?,
        };

        config.validate()?;

        debug!(
            "設定詳細: endpoint={}, delay_ms={}, max_receipt_bytes={}, threshold_km={}, last_odometer={}",
            config.submission_endpoint_url,
            config.submission_delay_ms,
            config.max_receipt_bytes,
            config.warning_threshold_km,
            config.last_odometer
        );

        Ok(config)
    }

    /// 設定値を検証する
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.submission_endpoint_url)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {e}", self.submission_endpoint_url)))?;

        match endpoint.scheme() {
            "https" => {}
            "http" if self.environment == Environment::Development => {
                warn!("開発環境のためHTTPの送信先URLを許可します: {endpoint}");
            }
            "http" => {
                return Err(ConfigError::InsecureEndpoint(
                    self.submission_endpoint_url.clone(),
                ))
            }
            other => {
                return Err(ConfigError::InvalidEndpoint(format!(
                    "サポートされていないスキームです: {other}"
                )))
            }
        }

        if self.max_receipt_bytes == 0 {
            return Err(invalid("MAX_RECEIPT_BYTES", self.max_receipt_bytes));
        }
        if !self.warning_threshold_km.is_finite() || self.warning_threshold_km <= 0.0 {
            return Err(invalid(
                "ODOMETER_WARNING_THRESHOLD_KM",
                self.warning_threshold_km,
            ));
        }
        if !self.last_odometer.is_finite() || self.last_odometer < 0.0 {
            return Err(invalid("LAST_ODOMETER", self.last_odometer));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("JPEG_QUALITY", self.jpeg_quality));
        }

        Ok(())
    }

    /// 本番環境かどうか
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn invalid<T: std::fmt::Display>(key: &str, value: T) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
