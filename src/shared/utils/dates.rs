use chrono::{DateTime, Datelike, Utc};

/// 2つの日時の暦日差を計算する
///
/// # 引数
/// * `a` - 比較先の日時
/// * `b` - 比較元の日時
///
/// # 戻り値
/// `b`から`a`までの暦日数（過去の場合は負、同じ暦日の場合は0）
///
/// # 計算方法
/// 両方の日時をUTCの暦日（深夜0時）に正規化してから差を取ります。
/// 時刻成分による端数やサマータイムのずれの影響を受けません。
pub fn day_difference(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a.date_naive() - b.date_naive()).num_days()
}

/// 対象日までの残り日数を計算する
///
/// # 引数
/// * `target` - 対象の日時
/// * `from` - 起点の日時（通常は現在時刻）
/// * `inclusive` - trueの場合、当日を1日目として数える
///
/// # 戻り値
/// 残り日数（当日は`inclusive`がfalseなら0、trueなら1）
pub fn days_until(target: DateTime<Utc>, from: DateTime<Utc>, inclusive: bool) -> i64 {
    let diff = day_difference(target, from);
    if inclusive {
        diff + 1
    } else {
        diff
    }
}

/// 2つの日時の暦月差を計算する
///
/// # 引数
/// * `a` - 比較先の日時
/// * `b` - 比較元の日時
///
/// # 戻り値
/// `b`から`a`までの暦月数（日にちは無視）
///
/// # 注意
/// 月末の31日に開始して翌月1日に評価しても1ヶ月として数えます。
/// 利用期間の概算専用であり、請求日の厳密な計算には使えません。
pub fn month_difference(a: DateTime<Utc>, b: DateTime<Utc>) -> i32 {
    (a.year() - b.year()) * 12 + (a.month() as i32 - b.month() as i32)
}
