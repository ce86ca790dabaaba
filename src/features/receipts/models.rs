// 領収書機能のデータモデル

use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// 撮影・添付の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// カメラ未使用・添付なし
    Idle,
    /// カメラの権限・デバイスを要求中
    Requesting,
    /// カメラ映像を表示中
    Streaming,
    /// 領収書が添付済み（カメラは停止済み）
    Captured,
}

/// 表示層に渡すカメラセッションの表示用ハンドル
///
/// ストリーム本体は撮影マネージャーが所有し、表示層には渡さない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayHandle {
    pub session_id: Uuid,
    pub stream_label: String,
}

/// 利用者が選択した領収書ファイル
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ReceiptFile {
    pub fn new<N, C>(file_name: N, content_type: C, data: Vec<u8>) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// ファイルサイズ（バイト）
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// パスからファイルを読み込む
    ///
    /// 読み込み前にメタデータでサイズを確認し、上限を超える場合は
    /// 内容を読まずに `PayloadTooLarge` を返す。
    pub async fn from_path(path: &Path, max_bytes: u64) -> AppResult<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let size = metadata.len();
        log::debug!("領収書ファイルサイズ: {size} bytes, path={path:?}");

        if size > max_bytes {
            return Err(AppError::PayloadTooLarge {
                size,
                limit: max_bytes,
            });
        }

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::validation(format!("ファイル名の取得に失敗しました: {path:?}")))?
            .to_string();

        let data = tokio::fs::read(path).await?;
        let content_type = content_type_for(&file_name);

        Ok(Self::new(file_name, content_type, data))
    }
}

/// 拡張子からContent-Typeを推定する
pub fn content_type_for(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png".to_string(),
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "webp" => "image/webp".to_string(),
        "heic" => "image/heic".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// カメラで撮影した静止画（JPEG）
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// 送信待ちの領収書
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptAttachment {
    /// アップロードされた元ファイル
    Upload(ReceiptFile),
    /// カメラ撮影画像
    Camera(CapturedPhoto),
}

impl ReceiptAttachment {
    pub fn file_name(&self) -> &str {
        match self {
            ReceiptAttachment::Upload(file) => &file.file_name,
            ReceiptAttachment::Camera(photo) => &photo.file_name,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            ReceiptAttachment::Upload(file) => &file.content_type,
            ReceiptAttachment::Camera(_) => "image/jpeg",
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ReceiptAttachment::Upload(file) => &file.data,
            ReceiptAttachment::Camera(photo) => &photo.jpeg,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            ReceiptAttachment::Upload(_) => "upload",
            ReceiptAttachment::Camera(_) => "camera",
        }
    }
}

/// 表示用プレビュー（data URL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptPreview(String);

impl ReceiptPreview {
    pub fn new(data_url: String) -> Self {
        Self(data_url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 添付とそのプレビューの組
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReceipt {
    pub attachment: ReceiptAttachment,
    pub preview: ReceiptPreview,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("receipt.JPG"), "image/jpeg");
        assert_eq!(content_type_for("receipt.png"), "image/png");
        assert_eq!(content_type_for("receipt.heic"), "image/heic");
        assert_eq!(content_type_for("receipt"), "application/octet-stream");
    }

    #[test]
    fn test_attachment_accessors() {
        let upload = ReceiptAttachment::Upload(ReceiptFile::new(
            "nota.png",
            "image/png",
            vec![1, 2, 3],
        ));
        assert_eq!(upload.file_name(), "nota.png");
        assert_eq!(upload.content_type(), "image/png");
        assert_eq!(upload.bytes(), &[1, 2, 3]);
        assert_eq!(upload.source(), "upload");

        let camera = ReceiptAttachment::Camera(CapturedPhoto {
            file_name: "receipt.jpg".to_string(),
            width: 1,
            height: 1,
            jpeg: vec![0xFF, 0xD8],
            captured_at: Utc::now(),
        });
        assert_eq!(camera.content_type(), "image/jpeg");
        assert_eq!(camera.source(), "camera");
    }

    #[tokio::test]
    async fn test_from_path_reads_small_file() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let receipt = ReceiptFile::from_path(file.path(), 1024).await.unwrap();
        assert_eq!(receipt.size(), 4);
        assert_eq!(receipt.content_type, "image/jpeg");
        assert!(receipt.file_name.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_from_path_rejects_oversized_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 2048]).unwrap();

        let result = ReceiptFile::from_path(file.path(), 1024).await;
        assert!(matches!(
            result,
            Err(AppError::PayloadTooLarge {
                size: 2048,
                limit: 1024
            })
        ));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = ReceiptFile::from_path(&dir.path().join("missing.jpg"), 1024).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
