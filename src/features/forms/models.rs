// 入力フォームの下書きモデル

use crate::shared::errors::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("空白パターンは常に有効"));

/// フォーム（タブ）の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// 車両のチェックイン/アウト
    CheckInOut,
    /// 給油記録
    Fuel,
}

/// 車両番号を正規化する（大文字化・連続空白の圧縮）
pub fn normalize_vehicle_number(value: &str) -> String {
    WHITESPACE_RUN.replace_all(&value.to_uppercase(), " ").into_owned()
}

/// 必須項目の確認
fn require(label: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{label} is required")));
    }
    Ok(trimmed.to_string())
}

/// 数量・金額を解釈する（負の値・数値以外は InvalidInput）
pub fn parse_amount(label: &str, value: &str) -> AppResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(AppError::invalid_input(format!(
            "{label} must be a non-negative number"
        ))),
    }
}

/// チェックイン/アウトの入力項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutField {
    VehicleNumber,
    DriverNik,
    Odometer,
    Destination,
}

impl CheckInOutField {
    pub fn label(&self) -> &'static str {
        match self {
            CheckInOutField::VehicleNumber => "Vehicle Number",
            CheckInOutField::DriverNik => "Driver NIK",
            CheckInOutField::Odometer => "Odometer Reading",
            CheckInOutField::Destination => "Destination",
        }
    }
}

/// チェックイン/アウトの下書き
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutDraft {
    pub vehicle_number: String,
    #[serde(rename = "driverNIK")]
    pub driver_nik: String,
    pub odometer: String,
    pub destination: String,
}

impl CheckInOutDraft {
    /// 項目を更新する
    pub fn set(&mut self, field: CheckInOutField, value: &str) {
        match field {
            CheckInOutField::VehicleNumber => {
                self.vehicle_number = normalize_vehicle_number(value)
            }
            CheckInOutField::DriverNik => self.driver_nik = value.to_string(),
            CheckInOutField::Odometer => self.odometer = value.to_string(),
            CheckInOutField::Destination => self.destination = value.to_string(),
        }
    }

    /// 必須項目を確認し、送信用の値を返す
    pub fn required_values(&self) -> AppResult<CheckInOutValues> {
        Ok(CheckInOutValues {
            vehicle_number: require(CheckInOutField::VehicleNumber.label(), &self.vehicle_number)?,
            driver_nik: require(CheckInOutField::DriverNik.label(), &self.driver_nik)?,
            odometer: require(CheckInOutField::Odometer.label(), &self.odometer)?,
            destination: require(CheckInOutField::Destination.label(), &self.destination)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// 必須確認済みのチェックイン/アウト項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutValues {
    pub vehicle_number: String,
    pub driver_nik: String,
    pub odometer: String,
    pub destination: String,
}

/// 給油記録の入力項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelField {
    VehicleNumber,
    DriverNik,
    Liters,
    Cost,
    CurrentOdometer,
}

impl FuelField {
    pub fn label(&self) -> &'static str {
        match self {
            FuelField::VehicleNumber => "Vehicle Number",
            FuelField::DriverNik => "Driver NIK",
            FuelField::Liters => "Liters of Fuel",
            FuelField::Cost => "Total Cost (Rp)",
            FuelField::CurrentOdometer => "Current Odometer",
        }
    }
}

/// 給油記録の下書き（領収書は撮影マネージャーが保持する）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelLogDraft {
    pub vehicle_number: String,
    #[serde(rename = "driverNIK")]
    pub driver_nik: String,
    pub liters: String,
    pub cost: String,
    pub current_odometer: String,
}

impl FuelLogDraft {
    /// 項目を更新する
    pub fn set(&mut self, field: FuelField, value: &str) {
        match field {
            FuelField::VehicleNumber => self.vehicle_number = normalize_vehicle_number(value),
            FuelField::DriverNik => self.driver_nik = value.to_string(),
            FuelField::Liters => self.liters = value.to_string(),
            FuelField::Cost => self.cost = value.to_string(),
            FuelField::CurrentOdometer => self.current_odometer = value.to_string(),
        }
    }

    /// 必須項目と数値項目を確認し、送信用の値を返す
    ///
    /// オドメーター値の検証は前回値との比較が必要なため呼び出し側で行う。
    pub fn required_values(&self) -> AppResult<FuelValues> {
        let vehicle_number = require(FuelField::VehicleNumber.label(), &self.vehicle_number)?;
        let driver_nik = require(FuelField::DriverNik.label(), &self.driver_nik)?;
        let liters = require(FuelField::Liters.label(), &self.liters)?;
        let cost = require(FuelField::Cost.label(), &self.cost)?;
        let current_odometer =
            require(FuelField::CurrentOdometer.label(), &self.current_odometer)?;

        Ok(FuelValues {
            vehicle_number,
            driver_nik,
            liters: parse_amount(FuelField::Liters.label(), &liters)?,
            cost: parse_amount(FuelField::Cost.label(), &cost)?,
            current_odometer,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// 必須確認済みの給油記録項目
#[derive(Debug, Clone, PartialEq)]
pub struct FuelValues {
    pub vehicle_number: String,
    pub driver_nik: String,
    pub liters: f64,
    pub cost: f64,
    pub current_odometer: String,
}
