// オドメーター値の検証

use super::models::{OdometerStatus, OdometerValidation};
use crate::shared::config::field_log::DEFAULT_WARNING_THRESHOLD_KM;
use crate::shared::config::FieldLogConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};

/// 利用者への確認ダイアログ
///
/// 検証器自身は確認が必要かどうかを判断するだけで、
/// 実際の確認は表示層から注入されたこの実装が行う。
pub trait ConfirmationPrompt {
    /// メッセージを提示し、利用者が承認した場合はtrueを返す
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmationPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// 入力文字列をオドメーター値として解釈する
///
/// 空文字・数値以外・負の値・非有限値は `InvalidInput` とする。
pub fn parse_reading(input: &str) -> AppResult<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("Please enter the odometer reading"));
    }

    let value = trimmed
        .parse::<f64>()
        .map_err(|_| AppError::invalid_input("Odometer reading must be a number"))?;

    if !value.is_finite() {
        return Err(AppError::invalid_input("Odometer reading must be a number"));
    }
    if value < 0.0 {
        return Err(AppError::invalid_input(
            "Odometer reading cannot be negative",
        ));
    }

    Ok(value)
}

/// 既定のしきい値（1000km）で検証する
pub fn validate(current: f64, last: f64) -> OdometerValidation {
    classify(current, last, DEFAULT_WARNING_THRESHOLD_KM)
}

fn classify(current: f64, last: f64, threshold_km: f64) -> OdometerValidation {
    let (status, message) = if current < last {
        (
            OdometerStatus::Rejected,
            format!(
                "Odometer reading cannot be lower than last reading ({})",
                format_km(last)
            ),
        )
    } else if current - last > threshold_km {
        (
            OdometerStatus::Warning,
            format!(
                "Warning: {}km since last reading. Is this correct?",
                format_km(current - last)
            ),
        )
    } else {
        (OdometerStatus::Accepted, String::new())
    };

    OdometerValidation {
        status,
        message,
        current,
        last,
    }
}

/// 表示用に小数第一位で丸める
fn format_km(value: f64) -> String {
    format!("{}", (value * 10.0).round() / 10.0)
}

/// 前回値を保持するオドメーター検証器
#[derive(Debug, Clone, PartialEq)]
pub struct OdometerValidator {
    last_reading: f64,
    warning_threshold_km: f64,
}

impl Default for OdometerValidator {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_WARNING_THRESHOLD_KM)
    }
}

impl OdometerValidator {
    pub fn new(last_reading: f64, warning_threshold_km: f64) -> Self {
        Self {
            last_reading,
            warning_threshold_km,
        }
    }

    /// 設定から検証器を作成する
    pub fn from_config(config: &FieldLogConfig) -> Self {
        Self::new(config.last_odometer, config.warning_threshold_km)
    }

    /// 前回値（検証の基準値）
    pub fn last_reading(&self) -> f64 {
        self.last_reading
    }

    /// 外部から供給された前回値を設定する
    pub fn set_last_reading(&mut self, last_reading: f64) {
        debug!(
            "前回オドメーター値を更新: {} -> {last_reading}",
            self.last_reading
        );
        self.last_reading = last_reading;
    }

    /// 送信成功後に基準値を進める（小さい値では戻さない）
    pub fn advance_to(&mut self, reading: f64) {
        if reading > self.last_reading {
            self.set_last_reading(reading);
        }
    }

    /// 数値を検証する（副作用なし）
    pub fn validate(&self, current: f64) -> OdometerValidation {
        classify(current, self.last_reading, self.warning_threshold_km)
    }

    /// 入力文字列を解釈して検証する（キー入力ごとの検証用）
    pub fn check_input(&self, input: &str) -> AppResult<OdometerValidation> {
        let current = parse_reading(input)?;
        Ok(self.validate(current))
    }

    /// 検証結果を確定する
    ///
    /// Warning の場合のみ確認ダイアログを表示する。
    /// 確認が拒否された場合はこの送信試行に限り受け入れ不可とし、
    /// 検証器の状態は変更しない。
    pub fn resolve(
        &self,
        validation: &OdometerValidation,
        prompt: &dyn ConfirmationPrompt,
    ) -> AppResult<()> {
        match validation.status {
            OdometerStatus::Accepted => Ok(()),
            OdometerStatus::Rejected => {
                warn!(
                    "オドメーター値を拒否しました: current={}, last={}",
                    validation.current, validation.last
                );
                Err(AppError::InvalidOdometer {
                    last_reading: validation.last,
                    message: validation.message.clone(),
                })
            }
            OdometerStatus::Warning => {
                if prompt.confirm(&validation.message) {
                    info!(
                        "大きな走行距離の増加が確認されました: {}km",
                        validation.distance_km()
                    );
                    Ok(())
                } else {
                    warn!(
                        "走行距離の増加が確認されませんでした: {}km",
                        validation.distance_km()
                    );
                    Err(AppError::OdometerWarning {
                        distance_km: validation.distance_km(),
                        message: validation.message.clone(),
                    })
                }
            }
        }
    }

    /// 送信時の検証（解釈・検証・確認を一度に行う）
    ///
    /// # 戻り値
    /// 受け入れられたオドメーター値
    pub fn validate_for_submission(
        &self,
        input: &str,
        prompt: &dyn ConfirmationPrompt,
    ) -> AppResult<f64> {
        let validation = self.check_input(input)?;
        self.resolve(&validation, prompt)?;
        Ok(validation.current)
    }
}
