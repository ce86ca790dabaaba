// テスト用のカメラデバイス

use super::camera::{CameraConstraints, CameraDevice, CameraError, MediaStream, VideoFrame};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    live_tracks: AtomicUsize,
    opened: AtomicUsize,
    stop_calls: AtomicUsize,
}

/// 動作中のトラック数を記録するモックカメラ
#[derive(Clone)]
pub struct MockCamera {
    counters: Arc<Counters>,
    denied: bool,
    grant_delay: Option<Duration>,
    frame: Arc<Mutex<Option<VideoFrame>>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            denied: false,
            grant_delay: None,
            frame: Arc::new(Mutex::new(Some(Self::test_frame(4, 3)))),
        }
    }

    /// 権限を拒否するカメラ
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::new()
        }
    }

    /// 許可までに待機するカメラ
    pub fn with_grant_delay(delay: Duration) -> Self {
        Self {
            grant_delay: Some(delay),
            ..Self::new()
        }
    }

    /// 以降に返すフレームを差し替える（Noneでフレーム取得失敗）
    pub fn set_frame(&self, frame: Option<VideoFrame>) {
        *self.frame.lock().unwrap() = frame;
    }

    pub fn test_frame(width: u32, height: u32) -> VideoFrame {
        let rgba = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 128, 64, 255])
            .collect();
        VideoFrame {
            width,
            height,
            rgba,
        }
    }

    pub fn live_tracks(&self) -> usize {
        self.counters.live_tracks.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.counters.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn open(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        if let Some(delay) = self.grant_delay {
            tokio::time::sleep(delay).await;
        }
        if self.denied {
            return Err(CameraError::PermissionDenied);
        }

        let index = self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.live_tracks.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockStream {
            id: format!("mock-stream-{index}"),
            label: format!("mock {:?} camera", constraints.facing_mode),
            active: true,
            counters: Arc::clone(&self.counters),
            frame: Arc::clone(&self.frame),
        }))
    }
}

struct MockStream {
    id: String,
    label: String,
    active: bool,
    counters: Arc<Counters>,
    frame: Arc<Mutex<Option<VideoFrame>>>,
}

impl MediaStream for MockStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.active {
            return Err(CameraError::FrameUnavailable("stream stopped".to_string()));
        }
        self.frame
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CameraError::FrameUnavailable("no frame yet".to_string()))
    }

    fn active_track_count(&self) -> usize {
        usize::from(self.active)
    }

    fn stop_all_tracks(&mut self) {
        self.counters.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.active {
            self.active = false;
            self.counters.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
