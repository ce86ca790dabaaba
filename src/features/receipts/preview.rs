// 領収書画像のエンコードとプレビュー生成

use super::camera::VideoFrame;
use super::models::{ReceiptFile, ReceiptPreview};
use crate::shared::errors::{AppError, AppResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::io::Cursor;

/// フレームをJPEGにエンコードする
pub fn encode_jpeg(frame: &VideoFrame, quality: u8) -> AppResult<Vec<u8>> {
    if !frame.is_complete() {
        return Err(AppError::encoding(format!(
            "フレームが不完全です: {}x{}, {} bytes",
            frame.width,
            frame.height,
            frame.rgba.len()
        )));
    }

    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| AppError::encoding("RGBAバッファが不正です"))?;
    // JPEGはアルファを持たないためRGBに変換する
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;

    let jpeg = out.into_inner();
    debug!(
        "フレームをJPEGにエンコードしました: {}x{}, {} bytes",
        frame.width,
        frame.height,
        jpeg.len()
    );
    Ok(jpeg)
}

/// data URL を生成する
pub fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

/// 内容から画像形式を判定し、判定できない場合は申告されたContent-Typeを使う
pub fn sniff_content_type(bytes: &[u8], declared: &str) -> String {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg".to_string(),
        Ok(ImageFormat::Png) => "image/png".to_string(),
        Ok(ImageFormat::WebP) => "image/webp".to_string(),
        Ok(ImageFormat::Gif) => "image/gif".to_string(),
        _ => declared.to_string(),
    }
}

/// SHA-256 フィンガープリント（ログ・送信時の整合性確認用）
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// アップロードファイルのプレビューを非同期で生成する
///
/// 内容は元ファイルのまま返すが、Content-Type は判定結果で置き換える。
/// 呼び出し側はこれを添付として保持する。
pub async fn decode_preview(file: ReceiptFile) -> AppResult<(ReceiptFile, ReceiptPreview)> {
    tokio::task::spawn_blocking(move || {
        let mut file = file;
        let content_type = sniff_content_type(&file.data, &file.content_type);
        if content_type != file.content_type {
            warn!(
                "申告されたContent-Typeと内容が一致しません: file={}, declared={}, detected={content_type}",
                file.file_name, file.content_type
            );
            file.content_type = content_type.clone();
        }
        let preview = ReceiptPreview::new(to_data_url(&content_type, &file.data));
        debug!(
            "プレビューを生成しました: file={}, content_type={content_type}, sha256={}",
            file.file_name,
            fingerprint(&file.data)
        );
        (file, preview)
    })
    .await
    .map_err(|e| AppError::concurrency(format!("プレビュー生成タスクが失敗しました: {e}")))
}
