/// 共通ユーティリティモジュール
///
/// バリデーションや日付計算など、機能モジュール間で共有される
/// 純粋関数を提供します。
pub mod dates;

use crate::shared::errors::{AppError, AppResult};

/// 必須フィールドのバリデーション
///
/// # 引数
/// * `text` - 検証対象の文字列
/// * `field_name` - フィールド名（エラーメッセージ用）
///
/// # 戻り値
/// 空でない場合はOk(())、空の場合はエラー
pub fn validate_required_field(text: &str, field_name: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation(format!("{field_name}は必須項目です")));
    }
    Ok(())
}

/// 文字列の長さバリデーション
///
/// # 引数
/// * `text` - 検証対象の文字列
/// * `max_length` - 最大文字数
/// * `field_name` - フィールド名（エラーメッセージ用）
///
/// # 戻り値
/// 有効な長さの場合はOk(())、無効な場合はエラー
pub fn validate_text_length(text: &str, max_length: usize, field_name: &str) -> AppResult<()> {
    let char_count = text.chars().count();
    if char_count > max_length {
        return Err(AppError::validation(format!(
            "{field_name}は{max_length}文字以内で入力してください（現在: {char_count}文字）"
        )));
    }
    Ok(())
}

/// 価格のバリデーション
///
/// # 引数
/// * `price` - 1請求サイクルあたりの価格
///
/// # 戻り値
/// 有効な価格の場合はOk(())、無効な場合はエラー
///
/// # バリデーション規則
/// - 0以上の数値であること（無料プランの0は許可）
/// - 有限の数値であること
/// - 10桁以内であること
pub fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() {
        return Err(AppError::validation("無効な価格です"));
    }

    if price < 0.0 {
        return Err(AppError::validation("価格は0以上で入力してください"));
    }

    if price >= 10_000_000_000.0 {
        return Err(AppError::validation("価格は10桁以内で入力してください"));
    }

    Ok(())
}

/// 文字列の正規化（前後の空白を削除）
///
/// # 引数
/// * `text` - 正規化対象の文字列
///
/// # 戻り値
/// 正規化された文字列
pub fn normalize_string(text: &str) -> String {
    text.trim().to_string()
}
