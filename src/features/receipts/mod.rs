// 領収書撮影・添付機能モジュール

pub mod camera;
pub mod capture;
pub mod models;
pub mod preview;

#[cfg(test)]
pub mod mock;

// 公開インターフェース

// カメラ
pub use camera::{
    CameraConstraints, CameraDevice, CameraError, CameraStream, FacingMode, MediaStream,
    VideoFrame,
};

// 撮影マネージャー
pub use capture::ReceiptCaptureManager;

// モデル
pub use models::{
    content_type_for, CaptureState, CapturedPhoto, DisplayHandle, PendingReceipt,
    ReceiptAttachment, ReceiptFile, ReceiptPreview,
};

// エンコード
pub use preview::{decode_preview, encode_jpeg, fingerprint, sniff_content_type, to_data_url};
