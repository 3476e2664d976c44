/// ワイヤ形式モジュール
///
/// インメモリ表現とリモートストアのワイヤ表現の相互変換を行います。
/// リモートストアのレスポンスは形状が一定しないため（素の配列、既知の
/// キーでラップされた配列、単一オブジェクト）、優先順位付きの展開規則で
/// 正規化してから解析します。
use crate::features::subscriptions::models::{
    BillingCycle, Subscription, UpdateSubscriptionDto, COLOR_PALETTE, DEFAULT_CURRENCY,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// コレクションをラップする既知のキー（優先順）
const COLLECTION_KEYS: [&str; 4] = ["subscriptions", "data", "items", "results"];

/// 単一レコードをラップする既知のキー（優先順）
const RECORD_KEYS: [&str; 4] = ["subscription", "data", "record", "result"];

/// 日時をワイヤ形式の文字列に変換する
///
/// # 引数
/// * `datetime` - 変換する日時
///
/// # 戻り値
/// `Z`ではなく明示的な`+00:00`オフセットを付けたISO-8601文字列
pub fn format_wire_datetime(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// ワイヤ形式の日時文字列を解析する
///
/// # 引数
/// * `text` - 日時文字列
///
/// # 戻り値
/// 解析できた場合はUTCの日時、できなかった場合はNone
///
/// # 対応形式
/// - ISO-8601（`+00:00`および`Z`のどちらのサフィックスも受理）
/// - `YYYY-MM-DD`（UTCの深夜0時として読む）
pub fn parse_wire_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }

    // 日付のみの形式へのフォールバック
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// 作成リクエストのワイヤ表現
#[derive(Debug, Serialize)]
pub struct WireSubscription {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub billing_cycle: String,
    pub next_payment_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub category: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Subscription> for WireSubscription {
    fn from(record: &Subscription) -> Self {
        Self {
            name: record.name.clone(),
            price: record.price,
            currency: record.currency.clone(),
            billing_cycle: record.billing_cycle.as_str().to_string(),
            next_payment_date: format_wire_datetime(record.next_payment_date),
            start_date: record.start_date.map(format_wire_datetime),
            category: record.category.clone(),
            color: record.color.clone(),
            icon: record.icon.clone(),
            image_url: record.image_url.clone(),
        }
    }
}

/// 部分更新リクエストのワイヤ表現（変更されたフィールドのみ）
#[derive(Debug, Default, Serialize)]
pub struct WireSubscriptionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&UpdateSubscriptionDto> for WireSubscriptionPatch {
    fn from(dto: &UpdateSubscriptionDto) -> Self {
        Self {
            name: dto.name.clone(),
            price: dto.price,
            currency: dto.currency.clone(),
            billing_cycle: dto.billing_cycle.map(|c| c.as_str().to_string()),
            next_payment_date: dto.next_payment_date.map(format_wire_datetime),
            start_date: dto.start_date.map(format_wire_datetime),
            category: dto.category.clone(),
            color: dto.color.clone(),
            icon: dto.icon.clone(),
            image_url: dto.image_url.clone(),
        }
    }
}

/// IDのワイヤ表現（文字列と数値の両方を受理）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

/// 価格のワイヤ表現（数値と数値文字列の両方を受理）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn into_f64(self) -> Option<f64> {
        match self {
            PriceValue::Number(number) => Some(number),
            PriceValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// レコードのワイヤ表現（受信用）
///
/// 日付と請求サイクルのキーはsnake_caseとcamelCaseの両方を受理します。
#[derive(Debug, Default, Deserialize)]
pub struct RawSubscription {
    #[serde(default)]
    id: Option<IdValue>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<PriceValue>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, alias = "billingCycle")]
    billing_cycle: Option<String>,
    #[serde(default, alias = "nextPaymentDate")]
    next_payment_date: Option<String>,
    #[serde(default, alias = "startDate")]
    start_date: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
}

impl RawSubscription {
    /// ワイヤ表現をインメモリ表現に変換する
    ///
    /// # 戻り値
    /// 完全なレコードとして成立する場合はSome、識別に必要なフィールドが
    /// 欠けている場合はNone
    ///
    /// ID・サービス名・価格・請求サイクル・次回支払日が揃っていることを
    /// 「完全なレコード」の条件とします。それ以外のフィールドは欠けていても
    /// デフォルト値で補います。
    pub fn into_subscription(self) -> Option<Subscription> {
        let id = self.id?.into_string();
        let name = self.name?;
        let price = self.price?.into_f64()?;
        let billing_cycle = parse_billing_cycle(self.billing_cycle.as_deref()?)?;
        let next_payment_date = parse_wire_datetime(&self.next_payment_date?)?;

        Some(Subscription {
            id,
            name,
            price,
            currency: self
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            billing_cycle,
            next_payment_date,
            start_date: self.start_date.as_deref().and_then(parse_wire_datetime),
            category: self
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Other".to_string()),
            color: self
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| COLOR_PALETTE[0].to_string()),
            icon: self.icon.filter(|i| !i.is_empty()),
            image_url: self.image_url.filter(|u| !u.is_empty()),
        })
    }
}

/// 請求サイクルのワイヤ文字列を解析する
///
/// # 引数
/// * `text` - 請求サイクルの文字列
///
/// # 戻り値
/// 解析できた場合はSome、未知の値の場合はNone
fn parse_billing_cycle(text: &str) -> Option<BillingCycle> {
    match text {
        "monthly" => Some(BillingCycle::Monthly),
        // 一部のバックエンドは年額を"annual"と表現する
        "yearly" | "annual" => Some(BillingCycle::Yearly),
        _ => None,
    }
}

/// コレクションレスポンスを展開する
///
/// # 引数
/// * `value` - レスポンスボディ
///
/// # 戻り値
/// レコード候補の配列、または展開できない場合はNone
///
/// # 展開規則（優先順）
/// 1. 素の配列
/// 2. 既知のキー（subscriptions / data / items / results）でラップされた配列
/// 3. 単一オブジェクト（1件のコレクションとして扱う）
pub fn unwrap_collection(value: &Value) -> Option<Vec<Value>> {
    if let Some(array) = value.as_array() {
        return Some(array.clone());
    }

    if let Some(object) = value.as_object() {
        for key in COLLECTION_KEYS {
            if let Some(array) = object.get(key).and_then(Value::as_array) {
                return Some(array.clone());
            }
        }
        return Some(vec![value.clone()]);
    }

    None
}

/// 単一レコードレスポンスを展開する
///
/// # 引数
/// * `value` - レスポンスボディ
///
/// # 戻り値
/// ラップを外したレコード候補（ラップされていない場合はそのまま）
///
/// # 展開規則（優先順）
/// 1. 既知のキー（subscription / data / record / result）でラップされたオブジェクト
/// 2. ボディそのもの
pub fn unwrap_record(value: Value) -> Value {
    if let Some(object) = value.as_object() {
        for key in RECORD_KEYS {
            if let Some(inner) = object.get(key) {
                if inner.is_object() {
                    return inner.clone();
                }
            }
        }
    }
    value
}

/// レスポンス中のレコード候補をインメモリ表現に正規化する
///
/// # 引数
/// * `value` - レコード候補
///
/// # 戻り値
/// 完全なレコードとして解析できた場合はSome、できなかった場合はNone
pub fn normalize_record(value: Value) -> Option<Subscription> {
    let raw: RawSubscription = serde_json::from_value(value).ok()?;
    raw.into_subscription()
}
