// オドメーター検証のデータモデル

use serde::{Deserialize, Serialize};

/// 検証結果の区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdometerStatus {
    /// 受け入れ可能
    Accepted,
    /// 大きな増加のため利用者の確認が必要
    Warning,
    /// 前回値を下回るため受け入れ不可
    Rejected,
}

/// 検証結果（区分と表示用メッセージ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerValidation {
    pub status: OdometerStatus,
    /// Accepted の場合は空文字（メッセージ欄をクリアする）
    pub message: String,
    pub current: f64,
    pub last: f64,
}

impl OdometerValidation {
    /// 前回値からの走行距離（km）
    pub fn distance_km(&self) -> f64 {
        self.current - self.last
    }

    /// 確認が必要かどうか
    pub fn requires_confirmation(&self) -> bool {
        self.status == OdometerStatus::Warning
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OdometerStatus::Accepted
    }

    pub fn is_rejected(&self) -> bool {
        self.status == OdometerStatus::Rejected
    }
}
