// 送信先クライアント

use super::models::{now_jakarta_rfc3339, SubmissionAck, SubmissionRecord};
use crate::shared::config::FieldLogConfig;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;

/// 記録を永続化する送信先
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    /// レコードを送信する
    ///
    /// 成功・失敗が確定するまで呼び出し側は下書きを変更しない。
    async fn submit(&self, record: &SubmissionRecord) -> AppResult<SubmissionAck>;
}

/// 送信をログ出力と待機で模擬するクライアント
///
/// 送信先URLは保持するが、実際の通信は行わない。
#[derive(Debug, Clone)]
pub struct SimulatedSubmissionClient {
    endpoint_url: String,
    delay: Duration,
}

impl SimulatedSubmissionClient {
    pub fn new<S: Into<String>>(endpoint_url: S, delay: Duration) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            delay,
        }
    }

    pub fn from_config(config: &FieldLogConfig) -> Self {
        Self::new(
            config.submission_endpoint_url.clone(),
            Duration::from_millis(config.submission_delay_ms),
        )
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl SubmissionClient for SimulatedSubmissionClient {
    async fn submit(&self, record: &SubmissionRecord) -> AppResult<SubmissionAck> {
        let payload = serde_json::to_vec(record)?;
        info!(
            "送信を開始します: id={}, form={:?}, vehicle={}, payload={} bytes",
            record.id,
            record.form,
            record.vehicle_number,
            payload.len()
        );
        if let Some(receipt) = &record.receipt {
            debug!(
                "領収書を含みます: file={}, size={}, sha256={}",
                receipt.file_name, receipt.size, receipt.sha256
            );
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let ack = SubmissionAck {
            record_id: record.id,
            endpoint: self.endpoint_url.clone(),
            received_at: now_jakarta_rfc3339(),
        };
        info!(
            "送信が完了しました: id={}, endpoint={}",
            record.id, self.endpoint_url
        );
        Ok(ack)
    }
}
