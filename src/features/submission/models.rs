// 送信データのモデル

use crate::features::forms::models::FormKind;
use crate::features::receipts::{fingerprint, ReceiptAttachment};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use chrono_tz::Asia::Jakarta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 現在時刻（Asia/Jakarta、RFC3339形式）
pub fn now_jakarta_rfc3339() -> String {
    Utc::now().with_timezone(&Jakarta).to_rfc3339()
}

/// 送信される領収書画像
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedReceipt {
    pub file_name: String,
    pub content_type: String,
    pub source: String,
    pub size: u64,
    pub sha256: String,
    /// Base64エンコードされた画像データ
    pub data: String,
}

impl From<&ReceiptAttachment> for SubmittedReceipt {
    fn from(attachment: &ReceiptAttachment) -> Self {
        let bytes = attachment.bytes();
        Self {
            file_name: attachment.file_name().to_string(),
            content_type: attachment.content_type().to_string(),
            source: attachment.source().to_string(),
            size: bytes.len() as u64,
            sha256: fingerprint(bytes),
            data: STANDARD.encode(bytes),
        }
    }
}

/// フォーム種別ごとの項目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDetails {
    CheckInOut { destination: String },
    Fuel { liters: f64, cost: f64 },
}

/// 送信先に渡す1件のレコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub form: FormKind,
    pub vehicle_number: String,
    #[serde(rename = "driverNIK")]
    pub driver_nik: String,
    pub odometer: f64,
    #[serde(flatten)]
    pub details: RecordDetails,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub receipt: Option<SubmittedReceipt>,
    pub submitted_at: String,
}

impl SubmissionRecord {
    /// 新しいIDと送信時刻でレコードを作成する
    pub fn new(
        form: FormKind,
        vehicle_number: String,
        driver_nik: String,
        odometer: f64,
        details: RecordDetails,
        receipt: Option<SubmittedReceipt>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            form,
            vehicle_number,
            driver_nik,
            odometer,
            details,
            receipt,
            submitted_at: now_jakarta_rfc3339(),
        }
    }
}

/// 送信成功の受領情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAck {
    pub record_id: Uuid,
    pub endpoint: String,
    pub received_at: String,
}
