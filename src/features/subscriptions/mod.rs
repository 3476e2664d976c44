/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション管理に関連するすべての機能を提供します：
/// - サブスクリプションの作成、読み取り、更新、削除（リモートストア経由）
/// - レスポンス形状の正規化とワイヤ形式の相互変換
/// - ソート済み一覧・直近の支払い・集計値の派生ビュー
pub mod models;
pub mod service;
pub mod store;
pub mod wire;

// 公開インターフェース
pub use models::{
    validate_create_subscription_dto, validate_update_subscription_dto, BillingCycle,
    CreateSubscriptionDto, SortOption, Subscription, SubscriptionStats, UpdateSubscriptionDto,
    COLOR_PALETTE, DEFAULT_CURRENCY, SUGGESTED_CATEGORIES,
};

pub use service::{resolve_update, SubscriptionService};

pub use store::{CollectionStats, SubscriptionStore, UPCOMING_HORIZON_DAYS, UPCOMING_LIMIT};
