// カメラデバイスの抽象化とストリームの所有権管理

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// カメラの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// 背面カメラ（領収書撮影用）
    Environment,
    /// 前面カメラ
    User,
}

/// カメラ要求時の制約
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
}

impl CameraConstraints {
    /// 背面カメラを要求する制約
    pub fn rear() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
        }
    }
}

/// カメラ取得時のエラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("カメラの使用が許可されませんでした")]
    PermissionDenied,

    #[error("利用可能なカメラがありません")]
    NotFound,

    #[error("フレームを取得できません: {0}")]
    FrameUnavailable(String),

    #[error("カメラエラー: {0}")]
    Device(String),
}

/// 映像の1フレーム（RGBA8）
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    /// 幅・高さと画素数が一致するかどうか
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() == (self.width as usize) * (self.height as usize) * 4
    }
}

/// 開かれた映像ストリーム
///
/// 実装は全トラックの停止を冪等に行うこと。
pub trait MediaStream: Send {
    /// ストリーム識別子
    fn id(&self) -> String;

    /// 表示用のラベル（デバイス名など）
    fn label(&self) -> String;

    /// 現在のフレームを取得する
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// 動作中のトラック数
    fn active_track_count(&self) -> usize;

    /// すべてのトラックを停止する
    fn stop_all_tracks(&mut self);
}

/// カメラデバイス
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// 制約に合うカメラを開く（権限確認を含む）
    async fn open(&self, constraints: &CameraConstraints)
        -> Result<Box<dyn MediaStream>, CameraError>;
}

/// 開いているストリームを排他的に所有するハンドル
///
/// どの経路で手放されても（撮影・キャンセル・破棄）
/// Drop 時に全トラックを停止する。
pub struct CameraStream {
    inner: Box<dyn MediaStream>,
    stopped: bool,
}

impl CameraStream {
    pub fn new(inner: Box<dyn MediaStream>) -> Self {
        debug!("カメラストリームを取得しました: id={}", inner.id());
        Self {
            inner,
            stopped: false,
        }
    }

    pub fn id(&self) -> String {
        self.inner.id()
    }

    pub fn label(&self) -> String {
        self.inner.label()
    }

    pub fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.inner.read_frame()
    }

    /// ストリームを停止して手放す
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.stopped {
            return;
        }
        self.inner.stop_all_tracks();
        self.stopped = true;

        let remaining = self.inner.active_track_count();
        if remaining > 0 {
            error!(
                "カメラストリームの停止後もトラックが残っています: id={}, remaining={remaining}",
                self.inner.id()
            );
        } else {
            info!("カメラストリームを停止しました: id={}", self.inner.id());
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStream")
            .field("id", &self.inner.id())
            .field("stopped", &self.stopped)
            .finish()
    }
}
