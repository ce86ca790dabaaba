// 領収書撮影マネージャー
//
// カメラストリームは常に高々1本で、このマネージャーだけが所有する。

use super::camera::{CameraConstraints, CameraDevice, CameraStream, VideoFrame};
use super::models::{
    CaptureState, CapturedPhoto, DisplayHandle, PendingReceipt, ReceiptAttachment, ReceiptFile,
    ReceiptPreview,
};
use super::preview::{decode_preview, encode_jpeg, fingerprint, to_data_url};
use crate::shared::config::FieldLogConfig;
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

enum Session {
    Idle,
    Requesting { request_id: Uuid },
    Streaming { session_id: Uuid, stream: CameraStream },
}

struct CaptureInner {
    session: Session,
    pending: Option<PendingReceipt>,
    /// アップロード・撮影・削除のたびに進める（古いプレビュー結果の破棄用）
    generation: u64,
    shut_down: bool,
}

/// 待機中のカメラ要求
///
/// `open_camera` のフューチャーが許可前に破棄された場合、
/// 自身の要求のままであれば Idle に戻す。
struct PendingRequest<'a> {
    inner: &'a Mutex<CaptureInner>,
    request_id: Uuid,
    settled: bool,
}

impl PendingRequest<'_> {
    /// 要求の結果を受け取った（以降は呼び出し側が状態を更新する）
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if matches!(
            inner.session,
            Session::Requesting { request_id } if request_id == self.request_id
        ) {
            inner.session = Session::Idle;
            warn!(
                "カメラ要求が完了前に破棄されたため Idle に戻します: request_id={}",
                self.request_id
            );
        }
    }
}

/// カメラ撮影とファイルアップロードから領収書添付を作成する
pub struct ReceiptCaptureManager {
    camera: Arc<dyn CameraDevice>,
    max_upload_bytes: u64,
    jpeg_quality: u8,
    inner: Mutex<CaptureInner>,
}

impl ReceiptCaptureManager {
    pub fn new(camera: Arc<dyn CameraDevice>, max_upload_bytes: u64, jpeg_quality: u8) -> Self {
        Self {
            camera,
            max_upload_bytes,
            jpeg_quality,
            inner: Mutex::new(CaptureInner {
                session: Session::Idle,
                pending: None,
                generation: 0,
                shut_down: false,
            }),
        }
    }

    /// 設定から撮影マネージャーを作成する
    pub fn from_config(camera: Arc<dyn CameraDevice>, config: &FieldLogConfig) -> Self {
        Self::new(camera, config.max_receipt_bytes, config.jpeg_quality)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, CaptureInner>> {
        self.inner
            .lock()
            .map_err(|e| AppError::concurrency(format!("撮影状態のロック取得失敗: {e}")))
    }

    /// 現在の状態
    pub fn state(&self) -> AppResult<CaptureState> {
        let inner = self.lock()?;
        Ok(match inner.session {
            Session::Requesting { .. } => CaptureState::Requesting,
            Session::Streaming { .. } => CaptureState::Streaming,
            Session::Idle if inner.pending.is_some() => CaptureState::Captured,
            Session::Idle => CaptureState::Idle,
        })
    }

    /// 背面カメラを開く
    ///
    /// 要求中・表示中の重複要求は `CameraBusy` で拒否する。
    /// 権限拒否・デバイス不在の場合は `CameraUnavailable` を返し、Idle に戻る。
    pub async fn open_camera(&self) -> AppResult<DisplayHandle> {
        let request_id = {
            let mut inner = self.lock()?;
            if inner.shut_down {
                return Err(AppError::invalid_state("撮影マネージャーは終了済みです"));
            }
            match inner.session {
                Session::Requesting { .. } | Session::Streaming { .. } => {
                    warn!("カメラ要求を拒否しました: 既に使用中です");
                    return Err(AppError::CameraBusy);
                }
                Session::Idle => {}
            }
            let request_id = Uuid::new_v4();
            inner.session = Session::Requesting { request_id };
            request_id
        };

        info!("カメラを要求しています: request_id={request_id}");
        let pending = PendingRequest {
            inner: &self.inner,
            request_id,
            settled: false,
        };
        let result = self
            .camera
            .open(&CameraConstraints::rear())
            .await
            .map(CameraStream::new);
        pending.settle();

        let mut inner = self.lock()?;
        let still_requested = matches!(
            inner.session,
            Session::Requesting { request_id: current } if current == request_id
        );

        match result {
            Ok(stream) if still_requested => {
                let handle = DisplayHandle {
                    session_id: request_id,
                    stream_label: stream.label(),
                };
                info!(
                    "カメラ映像を開始しました: session_id={request_id}, stream={}",
                    stream.id()
                );
                inner.session = Session::Streaming {
                    session_id: request_id,
                    stream,
                };
                Ok(handle)
            }
            Ok(stream) => {
                // 要求中にキャンセル・終了された場合は即座に停止する
                warn!("要求が取り消されたためカメラを停止します: request_id={request_id}");
                stream.stop();
                Err(AppError::camera_unavailable(
                    "camera request was cancelled before it was granted",
                ))
            }
            Err(e) => {
                if still_requested {
                    inner.session = Session::Idle;
                }
                error!("カメラを利用できません: request_id={request_id}, error={e}");
                Err(AppError::camera_unavailable(e.to_string()))
            }
        }
    }

    /// 表示中の現在フレームを取得する（表示層のプレビュー用）
    pub fn preview_frame(&self) -> AppResult<VideoFrame> {
        let mut inner = self.lock()?;
        match &mut inner.session {
            Session::Streaming { stream, .. } => stream
                .read_frame()
                .map_err(|e| AppError::camera_unavailable(e.to_string())),
            _ => Err(AppError::invalid_state("カメラ映像は表示されていません")),
        }
    }

    /// 現在のフレームを撮影して添付にする
    ///
    /// 表示中のみ有効。成功時はカメラを停止して Captured に遷移する。
    /// フレーム取得・エンコードに失敗した場合は表示中のまま残る。
    pub fn capture_photo(&self) -> AppResult<ReceiptPreview> {
        let mut inner = self.lock()?;

        let (session_id, mut stream) = match std::mem::replace(&mut inner.session, Session::Idle) {
            Session::Streaming { session_id, stream } => (session_id, stream),
            other => {
                inner.session = other;
                warn!("撮影を拒否しました: カメラ映像が表示されていません");
                return Err(AppError::invalid_state("カメラ映像が表示されていません"));
            }
        };

        let encoded = stream
            .read_frame()
            .map_err(|e| AppError::camera_unavailable(e.to_string()))
            .and_then(|frame| {
                encode_jpeg(&frame, self.jpeg_quality).map(|jpeg| (frame.width, frame.height, jpeg))
            });

        let (width, height, jpeg) = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("撮影に失敗しました: session_id={session_id}, error={e}");
                inner.session = Session::Streaming { session_id, stream };
                return Err(e);
            }
        };

        stream.stop();

        let preview = ReceiptPreview::new(to_data_url("image/jpeg", &jpeg));
        info!(
            "領収書を撮影しました: session_id={session_id}, {width}x{height}, {} bytes, sha256={}",
            jpeg.len(),
            fingerprint(&jpeg)
        );

        inner.pending = Some(PendingReceipt {
            attachment: ReceiptAttachment::Camera(CapturedPhoto {
                file_name: format!("receipt_{session_id}.jpg"),
                width,
                height,
                jpeg,
                captured_at: Utc::now(),
            }),
            preview: preview.clone(),
        });
        inner.generation += 1;

        Ok(preview)
    }

    /// カメラをキャンセルする（添付は作成しない）
    ///
    /// 要求中の場合は要求を取り消し、後から許可されたストリームは即座に停止される。
    pub fn cancel_camera(&self) -> AppResult<()> {
        let mut inner = self.lock()?;
        match std::mem::replace(&mut inner.session, Session::Idle) {
            Session::Streaming { session_id, stream } => {
                stream.stop();
                info!("カメラをキャンセルしました: session_id={session_id}");
                Ok(())
            }
            Session::Requesting { request_id } => {
                info!("カメラ要求を取り消しました: request_id={request_id}");
                Ok(())
            }
            Session::Idle => Err(AppError::invalid_state("カメラは開かれていません")),
        }
    }

    /// ファイルから領収書を添付する（カメラを経由しない）
    ///
    /// 上限サイズを超える場合は状態を変えずに `PayloadTooLarge` を返す。
    pub async fn upload_file(&self, file: ReceiptFile) -> AppResult<ReceiptPreview> {
        let size = file.size();
        if size > self.max_upload_bytes {
            warn!(
                "領収書ファイルが大きすぎます: file={}, size={size}, limit={}",
                file.file_name, self.max_upload_bytes
            );
            return Err(AppError::PayloadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let generation = {
            let mut inner = self.lock()?;
            if inner.shut_down {
                return Err(AppError::invalid_state("撮影マネージャーは終了済みです"));
            }
            if !matches!(inner.session, Session::Idle) {
                warn!("カメラ使用中のためアップロードを拒否しました");
                return Err(AppError::CameraBusy);
            }
            inner.generation += 1;
            inner.generation
        };

        info!(
            "領収書ファイルを読み込んでいます: file={}, size={size}",
            file.file_name
        );
        let (file, preview) = decode_preview(file).await?;

        let mut inner = self.lock()?;
        if inner.generation != generation {
            debug!("より新しい操作があったためプレビュー結果を破棄します: file={}", file.file_name);
            return Err(AppError::invalid_state("アップロードは新しい操作で置き換えられました"));
        }

        info!("領収書ファイルを添付しました: file={}", file.file_name);
        inner.pending = Some(PendingReceipt {
            attachment: ReceiptAttachment::Upload(file),
            preview: preview.clone(),
        });

        Ok(preview)
    }

    /// 添付とプレビューを破棄する
    pub fn clear_attachment(&self) -> AppResult<()> {
        let mut inner = self.lock()?;
        match inner.pending.take() {
            Some(pending) => {
                inner.generation += 1;
                info!(
                    "領収書の添付を削除しました: file={}",
                    pending.attachment.file_name()
                );
                Ok(())
            }
            None => Err(AppError::invalid_state("削除する領収書がありません")),
        }
    }

    /// 送信待ちの添付
    pub fn attachment(&self) -> AppResult<Option<ReceiptAttachment>> {
        Ok(self.lock()?.pending.as_ref().map(|p| p.attachment.clone()))
    }

    /// 表示用プレビュー
    pub fn receipt_preview(&self) -> AppResult<Option<ReceiptPreview>> {
        Ok(self.lock()?.pending.as_ref().map(|p| p.preview.clone()))
    }

    /// 終了処理（表示層の破棄時）
    ///
    /// 開いているストリームを停止し、以降のカメラ要求を拒否する。
    pub fn shutdown(&self) -> AppResult<()> {
        let mut inner = self.lock()?;
        inner.shut_down = true;
        match std::mem::replace(&mut inner.session, Session::Idle) {
            Session::Streaming { session_id, stream } => {
                stream.stop();
                info!("終了処理でカメラを停止しました: session_id={session_id}");
            }
            Session::Requesting { request_id } => {
                info!("終了処理でカメラ要求を取り消しました: request_id={request_id}");
            }
            Session::Idle => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::receipts::mock::MockCamera;
    use std::time::Duration;

    const MIB: usize = 1024 * 1024;

    fn manager_with(camera: &MockCamera) -> ReceiptCaptureManager {
        ReceiptCaptureManager::new(Arc::new(camera.clone()), 5 * MIB as u64, 85)
    }

    #[tokio::test]
    async fn test_open_capture_releases_camera() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        let handle = manager.open_camera().await.unwrap();
        assert!(handle.stream_label.contains("Environment"));
        assert_eq!(manager.state().unwrap(), CaptureState::Streaming);
        assert_eq!(camera.live_tracks(), 1);

        let preview = manager.capture_photo().unwrap();
        assert!(preview.as_str().starts_with("data:image/jpeg;base64,"));
        assert_eq!(manager.state().unwrap(), CaptureState::Captured);
        assert_eq!(camera.live_tracks(), 0);

        let attachment = manager.attachment().unwrap().unwrap();
        assert_eq!(attachment.content_type(), "image/jpeg");
        assert_eq!(&attachment.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_cancel_releases_camera_without_attachment() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        manager.open_camera().await.unwrap();
        manager.cancel_camera().unwrap();

        assert_eq!(camera.live_tracks(), 0);
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);
        assert!(manager.attachment().unwrap().is_none());

        // 二回目のキャンセルは失敗するがトラックは増えない
        assert!(matches!(
            manager.cancel_camera(),
            Err(AppError::InvalidState(_))
        ));
        assert_eq!(camera.live_tracks(), 0);
        assert_eq!(camera.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_returns_to_idle() {
        let camera = MockCamera::denied();
        let manager = manager_with(&camera);

        let result = manager.open_camera().await;
        assert!(matches!(result, Err(AppError::CameraUnavailable(_))));
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);
        assert_eq!(camera.live_tracks(), 0);

        // 再試行は可能
        assert!(matches!(
            manager.open_camera().await,
            Err(AppError::CameraUnavailable(_))
        ));
    }

    #[test]
    fn test_capture_in_idle_has_no_side_effects() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        assert!(matches!(
            manager.capture_photo(),
            Err(AppError::InvalidState(_))
        ));
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);
        assert!(manager.attachment().unwrap().is_none());
        assert_eq!(camera.opened(), 0);
    }

    #[tokio::test]
    async fn test_second_open_while_streaming_is_rejected() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        manager.open_camera().await.unwrap();
        assert!(matches!(
            manager.open_camera().await,
            Err(AppError::CameraBusy)
        ));
        assert_eq!(camera.opened(), 1);
        assert_eq!(camera.live_tracks(), 1);

        manager.cancel_camera().unwrap();
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_second_open_while_requesting_is_rejected() {
        let camera = MockCamera::with_grant_delay(Duration::from_millis(50));
        let manager = manager_with(&camera);

        let (first, second) = tokio::join!(manager.open_camera(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(manager.state().unwrap(), CaptureState::Requesting);
            manager.open_camera().await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::CameraBusy)));
        assert_eq!(camera.opened(), 1);
        assert_eq!(camera.live_tracks(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_request_stops_late_stream() {
        let camera = MockCamera::with_grant_delay(Duration::from_millis(50));
        let manager = manager_with(&camera);

        let (opened, _) = tokio::join!(manager.open_camera(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            manager.shutdown().unwrap();
        });

        assert!(matches!(opened, Err(AppError::CameraUnavailable(_))));
        assert_eq!(camera.opened(), 1);
        assert_eq!(camera.live_tracks(), 0);
        assert!(matches!(
            manager.open_camera().await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_during_request_stops_late_stream() {
        let camera = MockCamera::with_grant_delay(Duration::from_millis(50));
        let manager = manager_with(&camera);

        let (opened, cancelled) = tokio::join!(manager.open_camera(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            manager.cancel_camera()
        });

        assert!(cancelled.is_ok());
        assert!(matches!(opened, Err(AppError::CameraUnavailable(_))));
        assert_eq!(camera.opened(), 1);
        assert_eq!(camera.live_tracks(), 0);
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);

        // 取り消し後も再度開ける
        manager.open_camera().await.unwrap();
        assert_eq!(camera.live_tracks(), 1);
        manager.cancel_camera().unwrap();
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_returns_to_idle() {
        let camera = MockCamera::with_grant_delay(Duration::from_millis(100));
        let manager = manager_with(&camera);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), manager.open_camera()).await;
        assert!(timed_out.is_err());
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);
        assert_eq!(camera.live_tracks(), 0);

        let file = ReceiptFile::new("nota.jpg", "image/jpeg", vec![1u8; 16]);
        manager.upload_file(file).await.unwrap();
        assert_eq!(manager.state().unwrap(), CaptureState::Captured);

        manager.open_camera().await.unwrap();
        assert_eq!(manager.state().unwrap(), CaptureState::Streaming);
        assert_eq!(camera.live_tracks(), 1);
        manager.shutdown().unwrap();
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_while_streaming_stops_tracks() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        manager.open_camera().await.unwrap();
        manager.shutdown().unwrap();
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_dropping_manager_stops_tracks() {
        let camera = MockCamera::new();
        {
            let manager = manager_with(&camera);
            manager.open_camera().await.unwrap();
            assert_eq!(camera.live_tracks(), 1);
        }
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_failed_frame_keeps_streaming() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        manager.open_camera().await.unwrap();
        camera.set_frame(None);
        assert!(manager.capture_photo().is_err());
        assert_eq!(manager.state().unwrap(), CaptureState::Streaming);
        assert_eq!(camera.live_tracks(), 1);

        camera.set_frame(Some(MockCamera::test_frame(4, 4)));
        manager.capture_photo().unwrap();
        assert_eq!(camera.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_preview_frame_only_while_streaming() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        assert!(manager.preview_frame().is_err());
        manager.open_camera().await.unwrap();
        assert!(manager.preview_frame().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        let large = ReceiptFile::new("big.jpg", "image/jpeg", vec![0u8; 6 * MIB]);
        assert!(matches!(
            manager.upload_file(large).await,
            Err(AppError::PayloadTooLarge { .. })
        ));
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);

        let small = ReceiptFile::new("nota.jpg", "image/jpeg", vec![1u8; MIB]);
        let preview = manager.upload_file(small.clone()).await.unwrap();
        assert!(!preview.is_empty());
        assert_eq!(manager.state().unwrap(), CaptureState::Captured);
        assert_eq!(
            manager.attachment().unwrap(),
            Some(ReceiptAttachment::Upload(small))
        );
        assert_eq!(camera.opened(), 0);
    }

    #[tokio::test]
    async fn test_upload_exactly_at_limit_is_accepted() {
        let manager = manager_with(&MockCamera::new());
        let file = ReceiptFile::new("edge.png", "image/png", vec![0u8; 5 * MIB]);
        assert!(manager.upload_file(file).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_while_streaming_is_rejected() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        manager.open_camera().await.unwrap();
        let file = ReceiptFile::new("nota.jpg", "image/jpeg", vec![1u8; 16]);
        assert!(matches!(
            manager.upload_file(file).await,
            Err(AppError::CameraBusy)
        ));
        assert_eq!(camera.live_tracks(), 1);
    }

    #[tokio::test]
    async fn test_newer_upload_wins() {
        let manager = manager_with(&MockCamera::new());
        let first = ReceiptFile::new("first.jpg", "image/jpeg", vec![1u8; 2 * MIB]);
        let second = ReceiptFile::new("second.jpg", "image/jpeg", vec![2u8; 16]);

        let (first_result, second_result) =
            tokio::join!(manager.upload_file(first), manager.upload_file(second));

        // どちらか一方のみが添付として残る
        let attachment = manager.attachment().unwrap().unwrap();
        match (first_result, second_result) {
            (Err(AppError::InvalidState(_)), Ok(_)) => assert_eq!(attachment.file_name(), "second.jpg"),
            (Ok(_), Err(AppError::InvalidState(_))) => assert_eq!(attachment.file_name(), "first.jpg"),
            (Ok(_), Ok(_)) => assert_eq!(attachment.file_name(), "second.jpg"),
            other => panic!("unexpected results: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_attachment() {
        let manager = manager_with(&MockCamera::new());

        assert!(matches!(
            manager.clear_attachment(),
            Err(AppError::InvalidState(_))
        ));

        let file = ReceiptFile::new("nota.jpg", "image/jpeg", vec![1u8; 16]);
        manager.upload_file(file).await.unwrap();
        manager.clear_attachment().unwrap();

        assert!(manager.attachment().unwrap().is_none());
        assert!(manager.receipt_preview().unwrap().is_none());
        assert_eq!(manager.state().unwrap(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_retake_replaces_previous_attachment() {
        let camera = MockCamera::new();
        let manager = manager_with(&camera);

        let file = ReceiptFile::new("nota.jpg", "image/jpeg", vec![1u8; 16]);
        manager.upload_file(file).await.unwrap();

        manager.open_camera().await.unwrap();
        manager.capture_photo().unwrap();

        let attachment = manager.attachment().unwrap().unwrap();
        assert_eq!(attachment.source(), "camera");
        assert_eq!(camera.live_tracks(), 0);
    }
}
