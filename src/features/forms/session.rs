// 入力フォームの状態管理
//
// 表示層はこのセッションに入力イベントを渡し、メッセージ欄・プレビュー・
// 送信中フラグを読み取って描画する。

use super::models::{CheckInOutDraft, CheckInOutField, FormKind, FuelField, FuelLogDraft};
use crate::features::odometer::{parse_reading, ConfirmationPrompt, OdometerValidator};
use crate::features::receipts::{
    CameraDevice, CaptureState, DisplayHandle, ReceiptCaptureManager, ReceiptFile,
    ReceiptPreview, VideoFrame,
};
use crate::features::submission::{
    RecordDetails, SubmissionAck, SubmissionClient, SubmissionRecord, SubmittedReceipt,
};
use crate::shared::config::FieldLogConfig;
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// 送信中のレコード
///
/// 結果が確定するまで下書きは変更されない。
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub record: SubmissionRecord,
}

impl PendingSubmission {
    pub fn form(&self) -> FormKind {
        self.record.form
    }
}

/// 入力中の2つの下書き・メッセージ欄・撮影マネージャーを束ねるセッション
pub struct FieldLogSession {
    active_tab: FormKind,
    checkinout: CheckInOutDraft,
    fuel: FuelLogDraft,
    message: Option<String>,
    loading: bool,
    validator: OdometerValidator,
    capture: ReceiptCaptureManager,
    submitter: Arc<dyn SubmissionClient>,
}

impl FieldLogSession {
    pub fn new(
        validator: OdometerValidator,
        capture: ReceiptCaptureManager,
        submitter: Arc<dyn SubmissionClient>,
    ) -> Self {
        Self {
            active_tab: FormKind::CheckInOut,
            checkinout: CheckInOutDraft::default(),
            fuel: FuelLogDraft::default(),
            message: None,
            loading: false,
            validator,
            capture,
            submitter,
        }
    }

    /// 設定からセッションを作成する
    pub fn from_config(
        config: &FieldLogConfig,
        camera: Arc<dyn CameraDevice>,
        submitter: Arc<dyn SubmissionClient>,
    ) -> Self {
        Self::new(
            OdometerValidator::from_config(config),
            ReceiptCaptureManager::from_config(camera, config),
            submitter,
        )
    }

    pub fn active_tab(&self) -> FormKind {
        self.active_tab
    }

    /// タブを切り替える（両方の下書きは保持される）
    pub fn switch_tab(&mut self, tab: FormKind) {
        debug!("タブを切り替えます: {:?} -> {tab:?}", self.active_tab);
        self.active_tab = tab;
    }

    pub fn checkinout(&self) -> &CheckInOutDraft {
        &self.checkinout
    }

    pub fn fuel(&self) -> &FuelLogDraft {
        &self.fuel
    }

    /// メッセージ欄の内容
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// 送信中かどうか
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// 検証の基準となる前回オドメーター値
    pub fn last_odometer(&self) -> f64 {
        self.validator.last_reading()
    }

    /// 外部から前回オドメーター値を設定する
    pub fn set_last_odometer(&mut self, reading: f64) {
        self.validator.set_last_reading(reading);
    }

    /// エラーをメッセージ欄に表示し、そのまま返す
    fn report(&mut self, error: AppError) -> AppError {
        match error.severity() {
            ErrorSeverity::Low => warn!("{}", error.details()),
            _ => error!("{}", error.details()),
        }
        self.message = Some(error.user_message());
        error
    }

    fn ensure_editable(&mut self) -> AppResult<()> {
        if self.loading {
            return Err(self.report(AppError::invalid_state("送信中は編集できません")));
        }
        Ok(())
    }

    /// チェックイン/アウトの項目を更新する
    pub fn set_checkinout_field(&mut self, field: CheckInOutField, value: &str) -> AppResult<()> {
        self.ensure_editable()?;
        self.checkinout.set(field, value);
        Ok(())
    }

    /// 給油記録の項目を更新する
    ///
    /// オドメーター値はキー入力ごとに検証し、結果をメッセージ欄に反映する。
    /// ここでは確認ダイアログは表示しない（送信時のみ）。
    pub fn set_fuel_field(&mut self, field: FuelField, value: &str) -> AppResult<()> {
        self.ensure_editable()?;
        self.fuel.set(field, value);

        if field == FuelField::CurrentOdometer {
            match self.validator.check_input(value) {
                Ok(validation) if validation.is_accepted() => self.message = None,
                Ok(validation) => self.message = Some(validation.message),
                Err(e) => self.message = Some(e.user_message()),
            }
        }
        Ok(())
    }

    // 領収書撮影（エラーはメッセージ欄に表示する）

    pub async fn open_camera(&mut self) -> AppResult<DisplayHandle> {
        self.ensure_editable()?;
        let result = self.capture.open_camera().await;
        match result {
            Ok(handle) => Ok(handle),
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn preview_frame(&self) -> AppResult<VideoFrame> {
        self.capture.preview_frame()
    }

    pub fn capture_photo(&mut self) -> AppResult<ReceiptPreview> {
        self.ensure_editable()?;
        match self.capture.capture_photo() {
            Ok(preview) => {
                self.message = None;
                Ok(preview)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn cancel_camera(&mut self) -> AppResult<()> {
        self.capture.cancel_camera().map_err(|e| self.report(e))
    }

    pub async fn upload_receipt(&mut self, file: ReceiptFile) -> AppResult<ReceiptPreview> {
        self.ensure_editable()?;
        let result = self.capture.upload_file(file).await;
        match result {
            Ok(preview) => {
                self.message = None;
                Ok(preview)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn clear_receipt(&mut self) -> AppResult<()> {
        self.ensure_editable()?;
        self.capture.clear_attachment().map_err(|e| self.report(e))
    }

    pub fn capture_state(&self) -> AppResult<CaptureState> {
        self.capture.state()
    }

    pub fn receipt_preview(&self) -> AppResult<Option<ReceiptPreview>> {
        self.capture.receipt_preview()
    }

    /// 表示層の破棄時に呼ぶ（カメラを確実に停止する）
    pub fn shutdown(&self) -> AppResult<()> {
        self.capture.shutdown()
    }

    // 送信

    /// チェックイン/アウトの送信を開始する
    pub fn begin_checkinout_submission(&mut self) -> AppResult<PendingSubmission> {
        self.ensure_editable()?;
        let record = self.checkinout_record().map_err(|e| self.report(e))?;
        Ok(self.start_loading(record))
    }

    fn checkinout_record(&self) -> AppResult<SubmissionRecord> {
        let values = self.checkinout.required_values()?;
        let odometer = parse_reading(&values.odometer)?;

        Ok(SubmissionRecord::new(
            FormKind::CheckInOut,
            values.vehicle_number,
            values.driver_nik,
            odometer,
            RecordDetails::CheckInOut {
                destination: values.destination,
            },
            None,
        ))
    }

    /// 給油記録の送信を開始する
    ///
    /// 必須項目 → オドメーター（必要なら確認）→ 領収書 の順に確認する。
    pub fn begin_fuel_submission(
        &mut self,
        prompt: &dyn ConfirmationPrompt,
    ) -> AppResult<PendingSubmission> {
        self.ensure_editable()?;
        let record = self.fuel_record(prompt).map_err(|e| self.report(e))?;
        Ok(self.start_loading(record))
    }

    fn fuel_record(&self, prompt: &dyn ConfirmationPrompt) -> AppResult<SubmissionRecord> {
        let values = self.fuel.required_values()?;
        let odometer = self
            .validator
            .validate_for_submission(&values.current_odometer, prompt)?;
        let attachment = self.capture.attachment()?.ok_or(AppError::MissingReceipt)?;

        Ok(SubmissionRecord::new(
            FormKind::Fuel,
            values.vehicle_number,
            values.driver_nik,
            odometer,
            RecordDetails::Fuel {
                liters: values.liters,
                cost: values.cost,
            },
            Some(SubmittedReceipt::from(&attachment)),
        ))
    }

    fn start_loading(&mut self, record: SubmissionRecord) -> PendingSubmission {
        self.loading = true;
        self.message = None;
        info!("送信待ちレコードを作成しました: id={}, form={:?}", record.id, record.form);
        PendingSubmission { record }
    }

    /// 送信結果を反映する
    ///
    /// 成功時のみ下書きを初期化する。失敗時は下書きを保持し、
    /// 再度編集・送信できる状態に戻す。
    pub fn complete_submission(
        &mut self,
        pending: PendingSubmission,
        outcome: AppResult<SubmissionAck>,
    ) -> AppResult<SubmissionAck> {
        self.loading = false;
        let record = pending.record;

        match outcome {
            Ok(ack) => {
                match record.form {
                    FormKind::CheckInOut => self.checkinout = CheckInOutDraft::default(),
                    FormKind::Fuel => {
                        self.fuel = FuelLogDraft::default();
                        if let Err(e) = self.capture.clear_attachment() {
                            warn!("送信後の領収書削除に失敗しました: {e}");
                        }
                        // 前回値は検証・確認済みの給油記録の値でのみ更新する
                        self.validator.advance_to(record.odometer);
                    }
                }
                self.message = None;
                info!(
                    "送信に成功しました: id={}, form={:?}, received_at={}",
                    ack.record_id, record.form, ack.received_at
                );
                Ok(ack)
            }
            Err(e) => {
                let e = match e {
                    AppError::Submission(_) => e,
                    other => AppError::submission(other.details()),
                };
                error!("送信に失敗しました: id={}, form={:?}", record.id, record.form);
                Err(self.report(e))
            }
        }
    }

    /// チェックイン/アウトを送信する
    pub async fn submit_checkinout(&mut self) -> AppResult<SubmissionAck> {
        let pending = self.begin_checkinout_submission()?;
        let outcome = self.submitter.submit(&pending.record).await;
        self.complete_submission(pending, outcome)
    }

    /// 給油記録を送信する
    pub async fn submit_fuel(
        &mut self,
        prompt: &dyn ConfirmationPrompt,
    ) -> AppResult<SubmissionAck> {
        let pending = self.begin_fuel_submission(prompt)?;
        let outcome = self.submitter.submit(&pending.record).await;
        self.complete_submission(pending, outcome)
    }
}
