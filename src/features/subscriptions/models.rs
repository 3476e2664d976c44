use crate::shared::errors::AppResult;
use crate::shared::utils::dates::{days_until, month_difference};
use crate::shared::utils::{validate_price, validate_required_field, validate_text_length};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// デフォルトの通貨記号
pub const DEFAULT_CURRENCY: &str = "€";

/// カテゴリの推奨セット（サーバー側では強制されない）
pub const SUGGESTED_CATEGORIES: [&str; 10] = [
    "Entertainment",
    "Music",
    "Fitness",
    "Insurance",
    "Phone",
    "Cloud",
    "Shopping",
    "Streaming",
    "Software",
    "Other",
];

/// アクセントカラーの固定パレット（任意の文字列も許容される）
pub const COLOR_PALETTE: [&str; 7] = [
    "hsl(262, 83%, 58%)",
    "hsl(0, 75%, 50%)",
    "hsl(142, 70%, 45%)",
    "hsl(200, 80%, 50%)",
    "hsl(38, 92%, 50%)",
    "hsl(280, 70%, 50%)",
    "hsl(340, 75%, 55%)",
];

/// 「まもなく支払い」と表示するまでの残り日数
pub const URGENT_THRESHOLD_DAYS: i64 = 3;

/// 請求サイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// 月額
    Monthly,
    /// 年額
    Yearly,
}

impl BillingCycle {
    /// ワイヤ表現の文字列を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

/// 一覧のソート方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    /// 次回支払日が近い順
    #[default]
    Recent,
    /// サービス名順
    Name,
    /// 価格が高い順
    Price,
}

/// サブスクリプションデータモデル
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// リモートストアが割り当てる一意なID（応答前はタイムスタンプ由来の仮ID）
    pub id: String,
    /// サービス名
    pub name: String,
    /// 1請求サイクルあたりの価格（月額換算ではない）
    pub price: f64,
    /// 通貨記号
    pub currency: String,
    /// 請求サイクル
    pub billing_cycle: BillingCycle,
    /// 次回支払日（自動更新はされず、利用者が進める）
    pub next_payment_date: DateTime<Utc>,
    /// 契約開始日（利用総額の概算にのみ使用）
    pub start_date: Option<DateTime<Utc>>,
    /// カテゴリ
    pub category: String,
    /// アクセントカラー
    pub color: String,
    /// 画像がない場合の1文字グリフ
    pub icon: Option<String>,
    /// ロゴ画像のURL（データURIも可）
    pub image_url: Option<String>,
}

/// サブスクリプションの派生値（保存されず、都度再計算される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStats {
    /// 月額換算価格
    pub monthly_price: f64,
    /// 年額換算価格
    pub yearly_price: f64,
    /// 利用月数（1以上）
    pub months_active: i32,
    /// これまでの利用総額の概算
    pub total_spent: f64,
}

impl Subscription {
    /// 月額換算価格を計算する
    ///
    /// # 戻り値
    /// 年額の場合は12分の1、月額の場合はそのままの価格
    pub fn monthly_price(&self) -> f64 {
        match self.billing_cycle {
            BillingCycle::Yearly => self.price / 12.0,
            BillingCycle::Monthly => self.price,
        }
    }

    /// 年額換算価格を計算する
    ///
    /// # 戻り値
    /// 月額の場合は12倍、年額の場合はそのままの価格
    pub fn yearly_price(&self) -> f64 {
        match self.billing_cycle {
            BillingCycle::Yearly => self.price,
            BillingCycle::Monthly => self.price * 12.0,
        }
    }

    /// 指定時点での派生値を計算する
    ///
    /// # 引数
    /// * `now` - 評価時点
    ///
    /// # 戻り値
    /// 派生値一式
    ///
    /// 開始日が未設定の場合は評価時点を開始日とみなすため、
    /// 利用総額は1期間分に縮退します。
    pub fn stats_at(&self, now: DateTime<Utc>) -> SubscriptionStats {
        let start_date = self.start_date.unwrap_or(now);
        let months_active = (month_difference(now, start_date) + 1).max(1);
        let monthly_price = self.monthly_price();

        SubscriptionStats {
            monthly_price,
            yearly_price: self.yearly_price(),
            months_active,
            total_spent: monthly_price * f64::from(months_active),
        }
    }

    /// 現在時点での派生値を計算する
    pub fn stats(&self) -> SubscriptionStats {
        self.stats_at(Utc::now())
    }

    /// 次回支払日までの残り日数を計算する
    ///
    /// # 引数
    /// * `now` - 評価時点
    ///
    /// # 戻り値
    /// 残り日数（当日は0、過ぎている場合は負）
    pub fn days_until_payment_at(&self, now: DateTime<Utc>) -> i64 {
        days_until(self.next_payment_date, now, false)
    }

    /// 支払いが間近かどうかを判定する
    ///
    /// # 引数
    /// * `now` - 評価時点
    ///
    /// # 戻り値
    /// 残り日数が閾値以下の場合はtrue
    pub fn is_payment_urgent_at(&self, now: DateTime<Utc>) -> bool {
        self.days_until_payment_at(now) <= URGENT_THRESHOLD_DAYS
    }

    /// 30日ウィンドウ内での支払い進捗率を計算する
    ///
    /// # 引数
    /// * `now` - 評価時点
    ///
    /// # 戻り値
    /// 0〜100のパーセント値（支払日が近いほど大きい）
    pub fn payment_progress_at(&self, now: DateTime<Utc>) -> f64 {
        let max_days = 30.0;
        let remaining = self.days_until_payment_at(now) as f64;
        (((max_days - remaining) / max_days) * 100.0).clamp(0.0, 100.0)
    }

    /// 画像がない場合に表示する1文字グリフを取得する
    ///
    /// # 戻り値
    /// 設定されたグリフ、またはサービス名の先頭文字を大文字化したもの
    pub fn fallback_glyph(&self) -> String {
        if let Some(icon) = &self.icon {
            if !icon.is_empty() {
                return icon.clone();
            }
        }
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default()
    }
}

/// サブスクリプション作成用DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionDto {
    pub name: String,
    pub price: f64,
    /// 省略時はデフォルト通貨
    pub currency: Option<String>,
    pub billing_cycle: BillingCycle,
    pub next_payment_date: DateTime<Utc>,
    /// 省略時は作成時点
    pub start_date: Option<DateTime<Utc>>,
    pub category: String,
    /// 省略時はパレットの先頭色
    pub color: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
}

impl CreateSubscriptionDto {
    /// DTOからローカルレコードを構築する
    ///
    /// # 引数
    /// * `id` - 割り当てるID（リモート応答前はタイムスタンプ由来の仮ID）
    /// * `now` - 作成時点
    ///
    /// # 戻り値
    /// サブスクリプションレコード
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> Subscription {
        let icon = self.icon.filter(|i| !i.is_empty()).or_else(|| {
            self.name
                .chars()
                .next()
                .map(|c| c.to_uppercase().to_string())
        });

        Subscription {
            id,
            name: self.name,
            price: self.price,
            currency: self
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            billing_cycle: self.billing_cycle,
            next_payment_date: self.next_payment_date,
            start_date: self.start_date.or(Some(now)),
            category: self.category,
            color: self
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| COLOR_PALETTE[0].to_string()),
            icon,
            image_url: self.image_url,
        }
    }
}

/// サブスクリプション更新用DTO（部分更新）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubscriptionDto {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
}

impl UpdateSubscriptionDto {
    /// 指定されたフィールドのみをレコードにマージする
    ///
    /// # 引数
    /// * `record` - マージ先のレコード
    pub fn apply_to(&self, record: &mut Subscription) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(currency) = &self.currency {
            record.currency = currency.clone();
        }
        if let Some(billing_cycle) = self.billing_cycle {
            record.billing_cycle = billing_cycle;
        }
        if let Some(next_payment_date) = self.next_payment_date {
            record.next_payment_date = next_payment_date;
        }
        if let Some(start_date) = self.start_date {
            record.start_date = Some(start_date);
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(color) = &self.color {
            record.color = color.clone();
        }
        if let Some(icon) = &self.icon {
            record.icon = Some(icon.clone());
        }
        if let Some(image_url) = &self.image_url {
            record.image_url = Some(image_url.clone());
        }
    }
}

/// サブスクリプション作成DTOのバリデーション
///
/// # 引数
/// * `dto` - サブスクリプション作成用DTO
///
/// # 戻り値
/// バリデーション成功時はOk(())、失敗時はエラー
///
/// ネットワーク呼び出しの前に実行します。
pub fn validate_create_subscription_dto(dto: &CreateSubscriptionDto) -> AppResult<()> {
    validate_required_field(&dto.name, "サービス名")?;
    validate_text_length(&dto.name, 100, "サービス名")?;
    validate_price(dto.price)?;
    validate_required_field(&dto.category, "カテゴリ")?;
    validate_text_length(&dto.category, 50, "カテゴリ")?;
    Ok(())
}

/// サブスクリプション更新DTOのバリデーション
///
/// # 引数
/// * `dto` - サブスクリプション更新用DTO
///
/// # 戻り値
/// バリデーション成功時はOk(())、失敗時はエラー
pub fn validate_update_subscription_dto(dto: &UpdateSubscriptionDto) -> AppResult<()> {
    if let Some(name) = &dto.name {
        validate_required_field(name, "サービス名")?;
        validate_text_length(name, 100, "サービス名")?;
    }

    if let Some(price) = dto.price {
        validate_price(price)?;
    }

    if let Some(category) = &dto.category {
        validate_required_field(category, "カテゴリ")?;
        validate_text_length(category, 50, "カテゴリ")?;
    }

    Ok(())
}
