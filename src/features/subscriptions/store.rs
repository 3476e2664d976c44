/// コレクションビューモジュール
///
/// インメモリのサブスクリプション一覧と、その派生ビュー（ソート済み一覧、
/// 直近の支払い、集計値）を提供します。派生ビューは現在の状態から都度
/// 再計算される純粋な関数で、キャッシュは持ちません。
use crate::features::subscriptions::models::{
    BillingCycle, SortOption, Subscription, UpdateSubscriptionDto,
};
use crate::shared::utils::dates::days_until;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 直近の支払いとして表示する日数の上限（30日ウィンドウ）
pub const UPCOMING_HORIZON_DAYS: i64 = 30;

/// 直近の支払いとして表示する件数の上限
pub const UPCOMING_LIMIT: usize = 4;

/// コレクション全体の集計値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 全レコードの月額換算合計
    pub monthly_total: f64,
    /// 月額合計の12倍（年額請求の実額合計ではない）
    pub yearly_total: f64,
    /// レコード件数
    pub total_count: usize,
}

/// サブスクリプションのインメモリコレクション
///
/// レコードは挿入順（直近の全件取得またはその後の増分変更の順）で保持し、
/// IDの一意性はID一致時の置き換えセマンティクスで維持します。
#[derive(Debug, Default)]
pub struct SubscriptionStore {
    /// レコード一覧（挿入順）
    items: Vec<Subscription>,
    /// 現在のソート方法
    sort_by: SortOption,
}

impl SubscriptionStore {
    /// 新しい空のストアを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// コレクション全体を置き換える（全件取得の成功後に使用）
    ///
    /// # 引数
    /// * `records` - 新しいレコード一覧
    pub fn set_all(&mut self, records: Vec<Subscription>) {
        log::debug!("コレクションを置き換えます: count={}", records.len());
        self.items = records;
    }

    /// レコードを1件追加する（リモート作成の成功後に使用）
    ///
    /// # 引数
    /// * `record` - 追加するレコード
    pub fn insert(&mut self, record: Subscription) {
        self.items.push(record);
    }

    /// IDが一致するレコードに部分変更をマージする
    ///
    /// # 引数
    /// * `id` - 対象のID
    /// * `changes` - マージする変更
    ///
    /// IDが存在しない場合は何もしません（エラーにもしません）。
    pub fn replace(&mut self, id: &str, changes: &UpdateSubscriptionDto) {
        if let Some(record) = self.items.iter_mut().find(|r| r.id == id) {
            changes.apply_to(record);
        } else {
            log::warn!("マージ対象のレコードが見つかりませんでした: id={id}");
        }
    }

    /// IDが一致するレコードを完全なレコードで置き換える
    ///
    /// # 引数
    /// * `record` - 新しいレコード
    ///
    /// IDが存在しない場合は何もしません。
    pub fn replace_record(&mut self, record: Subscription) {
        if let Some(existing) = self.items.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            log::warn!(
                "置き換え対象のレコードが見つかりませんでした: id={}",
                record.id
            );
        }
    }

    /// IDが一致するレコードを削除する
    ///
    /// # 引数
    /// * `id` - 対象のID
    ///
    /// IDが存在しない場合は何もしません。
    pub fn remove(&mut self, id: &str) {
        self.items.retain(|r| r.id != id);
    }

    /// IDでレコードを検索する
    ///
    /// # 引数
    /// * `id` - 対象のID
    ///
    /// # 戻り値
    /// 見つかった場合はレコードへの参照
    pub fn find(&self, id: &str) -> Option<&Subscription> {
        self.items.iter().find(|r| r.id == id)
    }

    /// レコード一覧を挿入順で取得する
    pub fn all(&self) -> &[Subscription] {
        &self.items
    }

    /// レコード件数を取得する
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// コレクションが空かどうかを判定する
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 現在のソート方法を取得する
    pub fn sort_by(&self) -> SortOption {
        self.sort_by
    }

    /// ソート方法を設定する
    ///
    /// # 引数
    /// * `sort_by` - 新しいソート方法
    pub fn set_sort_by(&mut self, sort_by: SortOption) {
        self.sort_by = sort_by;
    }

    /// 現在のソート方法で並べたビューを取得する
    ///
    /// # 戻り値
    /// ソート済みのレコード一覧
    ///
    /// すべてのソート方法で安定ソートを使用し、キーが等しいレコードは
    /// 挿入順の相対位置を保ちます。
    pub fn sorted(&self) -> Vec<Subscription> {
        let mut sorted = self.items.clone();
        match self.sort_by {
            SortOption::Recent => {
                sorted.sort_by(|a, b| a.next_payment_date.cmp(&b.next_payment_date));
            }
            SortOption::Name => {
                sorted.sort_by(|a, b| compare_names(&a.name, &b.name));
            }
            SortOption::Price => {
                sorted.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal));
            }
        }
        sorted
    }

    /// 指定時点での直近の支払いビューを取得する
    ///
    /// # 引数
    /// * `now` - 評価時点
    ///
    /// # 戻り値
    /// 残り日数が[0, 30]の範囲にあるレコードを支払日の昇順で並べ、
    /// 最大4件に切り詰めた一覧
    ///
    /// 当日（残り0日）は含み、期限を過ぎたもの（負）は含みません。
    pub fn upcoming_at(&self, now: DateTime<Utc>) -> Vec<Subscription> {
        let mut due: Vec<Subscription> = self
            .items
            .iter()
            .filter(|r| {
                let days = days_until(r.next_payment_date, now, false);
                (0..=UPCOMING_HORIZON_DAYS).contains(&days)
            })
            .cloned()
            .collect();

        due.sort_by(|a, b| a.next_payment_date.cmp(&b.next_payment_date));
        due.truncate(UPCOMING_LIMIT);
        due
    }

    /// 現在時点での直近の支払いビューを取得する
    pub fn upcoming(&self) -> Vec<Subscription> {
        self.upcoming_at(Utc::now())
    }

    /// コレクション全体の集計値を計算する
    ///
    /// # 戻り値
    /// 集計値一式
    ///
    /// 年額合計は月額合計の12倍です。年額請求レコードの実額を合計する
    /// のではなく、2つの数値の整合性を保つための意図的な単純化です。
    pub fn stats(&self) -> CollectionStats {
        let monthly_total: f64 = self.items.iter().map(Subscription::monthly_price).sum();

        CollectionStats {
            monthly_total,
            yearly_total: monthly_total * 12.0,
            total_count: self.items.len(),
        }
    }

    /// 月額請求のレコードのみを年額換算して合計する
    ///
    /// # 戻り値
    /// 月額請求レコードの価格×12の合計
    pub fn monthly_billed_yearly_total(&self) -> f64 {
        self.items
            .iter()
            .filter(|r| r.billing_cycle == BillingCycle::Monthly)
            .map(|r| r.price * 12.0)
            .sum()
    }
}

/// サービス名の比較（ロケールを考慮した近似）
///
/// # 引数
/// * `a` - 比較する名前
/// * `b` - 比較する名前
///
/// # 戻り値
/// 大文字小文字を区別しない比較結果（同一の場合は元の順序を保つ）
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::{COLOR_PALETTE, DEFAULT_CURRENCY};
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    fn record(id: &str, name: &str, price: f64, next_payment_date: DateTime<Utc>) -> Subscription {
        Subscription {
            id: id.to_string(),
            name: name.to_string(),
            price,
            currency: DEFAULT_CURRENCY.to_string(),
            billing_cycle: BillingCycle::Monthly,
            next_payment_date,
            start_date: None,
            category: "Entertainment".to_string(),
            color: COLOR_PALETTE[0].to_string(),
            icon: None,
            image_url: None,
        }
    }

    fn populated_store(now: DateTime<Utc>) -> SubscriptionStore {
        let mut store = SubscriptionStore::new();
        store.set_all(vec![
            record("1", "Netflix", 15.99, now + Duration::days(5)),
            record("2", "Spotify", 9.99, now + Duration::days(12)),
            record("3", "iCloud", 2.99, now + Duration::days(8)),
        ]);
        store
    }

    #[test]
    fn test_set_all_replaces_collection() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);
        assert_eq!(store.len(), 3);

        store.set_all(vec![record("9", "Disney+", 8.99, now)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].id, "9");
    }

    #[test]
    fn test_replace_merges_partial_changes() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);

        let changes = UpdateSubscriptionDto {
            price: Some(19.99),
            ..UpdateSubscriptionDto::default()
        };
        store.replace("1", &changes);

        let updated = store.find("1").unwrap();
        assert!((updated.price - 19.99).abs() < 1e-9);
        assert_eq!(updated.name, "Netflix");
    }

    #[test]
    fn test_replace_and_remove_are_noops_for_unknown_id() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);

        // 存在しないIDへの操作はパニックせず、状態も変えない
        store.replace(
            "missing",
            &UpdateSubscriptionDto {
                price: Some(1.0),
                ..UpdateSubscriptionDto::default()
            },
        );
        store.remove("missing");
        store.replace_record(record("missing", "Ghost", 0.0, now));

        assert_eq!(store.len(), 3);
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_remove_deletes_matching_record() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);

        store.remove("2");

        assert_eq!(store.len(), 2);
        assert!(store.find("2").is_none());
    }

    #[test]
    fn test_sorted_by_recent() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);
        store.set_sort_by(SortOption::Recent);

        let sorted = store.sorted();
        let ids: Vec<&str> = sorted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "2"]);
    }

    #[test]
    fn test_sorted_by_price_descending() {
        let now = utc(2024, 3, 15);
        let mut store = populated_store(now);
        store.set_sort_by(SortOption::Price);

        let sorted = store.sorted();
        let ids: Vec<&str> = sorted.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_sorted_by_name_is_case_insensitive() {
        let now = utc(2024, 3, 15);
        let mut store = SubscriptionStore::new();
        store.set_all(vec![
            record("1", "spotify", 9.99, now),
            record("2", "Netflix", 15.99, now),
            record("3", "iCloud", 2.99, now),
        ]);
        store.set_sort_by(SortOption::Name);

        let sorted = store.sorted();
        let names: Vec<&str> = sorted.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["iCloud", "Netflix", "spotify"]);
    }

    #[test]
    fn test_sorting_is_stable_for_equal_keys() {
        let now = utc(2024, 3, 15);
        let mut store = SubscriptionStore::new();
        store.set_all(vec![
            record("a", "Netflix", 10.0, now + Duration::days(3)),
            record("b", "Netflix", 10.0, now + Duration::days(3)),
            record("c", "Netflix", 10.0, now + Duration::days(3)),
        ]);

        // 3つのソート方法すべてで、同キーのレコードは挿入順を保つ
        for sort_by in [SortOption::Recent, SortOption::Name, SortOption::Price] {
            store.set_sort_by(sort_by);
            let sorted = store.sorted();
            let ids: Vec<&str> = sorted.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, ["a", "b", "c"], "sort_by={sort_by:?}");
        }
    }

    #[test]
    fn test_upcoming_bounds() {
        let now = utc(2024, 3, 15);
        let mut store = SubscriptionStore::new();
        store.set_all(vec![
            record("today", "Today", 1.0, now), // 当日は含む
            record("overdue", "Overdue", 1.0, now - Duration::days(1)), // 期限切れは含まない
            record("in30", "In30", 1.0, now + Duration::days(30)), // 30日目は含む
            record("in31", "In31", 1.0, now + Duration::days(31)), // 31日目は含まない
            record("in5", "In5", 1.0, now + Duration::days(5)),
            record("in10", "In10", 1.0, now + Duration::days(10)),
        ]);

        let upcoming = store.upcoming_at(now);

        // 最大4件、支払日の昇順
        assert_eq!(upcoming.len(), UPCOMING_LIMIT);
        let ids: Vec<&str> = upcoming.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["today", "in5", "in10", "in30"]);

        // 負の残り日数は決して含まれない
        assert!(upcoming
            .iter()
            .all(|r| days_until(r.next_payment_date, now, false) >= 0));
    }

    #[test]
    fn test_upcoming_includes_today_by_time_of_day() {
        // 当日の深夜でも時刻に関係なく残り0日として含まれる
        let now = utc(2024, 3, 15);
        let mut store = SubscriptionStore::new();
        store.set_all(vec![record(
            "late",
            "Late",
            1.0,
            Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 0).unwrap(),
        )]);

        assert_eq!(store.upcoming_at(now).len(), 1);
    }

    #[test]
    fn test_stats_monthly_total() {
        let now = utc(2024, 3, 15);
        let mut store = SubscriptionStore::new();
        store.set_all(vec![
            record("1", "A", 12.0, now),
            record("2", "B", 24.0, now),
        ]);

        let stats = store.stats();
        assert!((stats.monthly_total - 36.0).abs() < 1e-9);
        assert!((stats.yearly_total - 432.0).abs() < 1e-9);
        assert_eq!(stats.total_count, 2);
    }

    #[test]
    fn test_stats_yearly_record_contributes_one_twelfth() {
        let now = utc(2024, 3, 15);
        let mut yearly = record("1", "Prime", 24.0, now);
        yearly.billing_cycle = BillingCycle::Yearly;

        let mut store = SubscriptionStore::new();
        store.set_all(vec![yearly]);

        let stats = store.stats();
        assert!((stats.monthly_total - 2.0).abs() < 1e-9);
        // 年額合計は実額の24ではなく、月額合計の12倍
        assert!((stats.yearly_total - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_billed_yearly_total_excludes_yearly_records() {
        let now = utc(2024, 3, 15);
        let mut yearly = record("1", "Prime", 69.90, now);
        yearly.billing_cycle = BillingCycle::Yearly;

        let mut store = SubscriptionStore::new();
        store.set_all(vec![yearly, record("2", "Netflix", 10.0, now)]);

        assert!((store.monthly_billed_yearly_total() - 120.0).abs() < 1e-9);
    }
}
