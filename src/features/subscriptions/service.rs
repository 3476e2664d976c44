/// サブスクリプション同期サービス
///
/// コレクションビューの作成・取得・更新・削除の意図を、認証付きHTTP
/// リクエストへ変換します。ローカルコレクションはリモート呼び出しが成功
/// した場合にのみ変更され、失敗時は直前の正常な状態が維持されます。
use crate::features::auth::session::SessionContext;
use crate::features::subscriptions::models::{
    validate_create_subscription_dto, validate_update_subscription_dto, CreateSubscriptionDto,
    SortOption, Subscription, UpdateSubscriptionDto,
};
use crate::features::subscriptions::store::{CollectionStats, SubscriptionStore};
use crate::features::subscriptions::wire::{
    normalize_record, unwrap_collection, unwrap_record, WireSubscription, WireSubscriptionPatch,
};
use crate::shared::api_client::ApiClient;
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// サブスクリプションのエンドポイントパス
const SUBSCRIPTIONS_ENDPOINT: &str = "/api/subscriptions";

/// サブスクリプション同期サービス
pub struct SubscriptionService {
    /// APIクライアント
    api: ApiClient,
    /// セッションコンテキスト
    session: Arc<Mutex<SessionContext>>,
    /// インメモリコレクション
    store: SubscriptionStore,
    /// 全件取得の失敗状態（次の成功まで保持される）
    fetch_error: Option<String>,
}

impl SubscriptionService {
    /// 新しいSubscriptionServiceを作成する
    ///
    /// # 引数
    /// * `api` - APIクライアント
    /// * `session` - セッションコンテキスト
    ///
    /// # 戻り値
    /// SubscriptionServiceインスタンス
    pub fn new(api: ApiClient, session: Arc<Mutex<SessionContext>>) -> Self {
        Self {
            api,
            session,
            store: SubscriptionStore::new(),
            fetch_error: None,
        }
    }

    /// 全件取得する
    ///
    /// # 戻り値
    /// 成功時はOk(())、失敗時はエラー
    ///
    /// 成功時はコレクション全体を置き換えます。失敗時は既存のコレクションに
    /// 一切触れず、次の成功まで残るエラーフラグを立てます。部分的な上書きは
    /// 行いません。
    pub async fn fetch_all(&mut self) -> AppResult<()> {
        let token = self.bearer_token();

        let payload: Value = match self
            .api
            .get(SUBSCRIPTIONS_ENDPOINT, token.as_deref())
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!("サブスクリプション一覧の取得に失敗しました: {e}");
                self.fetch_error = Some(e.user_message());
                return Err(e);
            }
        };

        let candidates = match unwrap_collection(&payload) {
            Some(candidates) => candidates,
            None => {
                let e = AppError::unexpected_shape(
                    "サブスクリプション一覧のレスポンスを展開できませんでした",
                );
                warn!("{e}");
                self.fetch_error = Some(e.user_message());
                return Err(e);
            }
        };

        // 解析できないレコードは失敗扱いにせず、警告を出して読み飛ばす
        let total = candidates.len();
        let records: Vec<Subscription> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let record = normalize_record(candidate);
                if record.is_none() {
                    warn!("解析できないレコードを読み飛ばしました");
                }
                record
            })
            .collect();

        info!(
            "サブスクリプション一覧を取得しました: count={}/{total}",
            records.len()
        );

        self.store.set_all(records);
        self.fetch_error = None;
        Ok(())
    }

    /// サブスクリプションを作成する
    ///
    /// # 引数
    /// * `dto` - サブスクリプション作成用DTO
    ///
    /// # 戻り値
    /// 追加されたレコード、または失敗時はエラー
    ///
    /// 楽観的な挿入は行いません。リモート呼び出しが失敗した場合、ローカル
    /// コレクションは変更されません。
    pub async fn create(&mut self, dto: CreateSubscriptionDto) -> AppResult<Subscription> {
        // バリデーション（ネットワーク呼び出しの前）
        validate_create_subscription_dto(&dto)?;

        let now = Utc::now();

        // リモート応答前の仮IDはタイムスタンプ由来
        let placeholder_id = now.timestamp_millis().to_string();
        let local_record = dto.into_record(placeholder_id, now);
        let payload = WireSubscription::from(&local_record);

        let token = self.bearer_token();
        let response: Value = self
            .api
            .post(SUBSCRIPTIONS_ENDPOINT, &payload, token.as_deref())
            .await?;

        // レスポンスを正規化できた場合はサーバーのレコードを採用し、
        // できなかった場合は仮IDのままのローカルレコードを採用する
        let record = normalize_record(unwrap_record(response)).unwrap_or_else(|| {
            warn!("作成レスポンスを解析できなかったため、ローカルレコードを使用します");
            local_record
        });

        info!("サブスクリプションを作成しました: id={}", record.id);

        self.store.insert(record.clone());
        Ok(record)
    }

    /// サブスクリプションを部分更新する
    ///
    /// # 引数
    /// * `id` - 対象のID
    /// * `changes` - 変更されたフィールドのみを持つDTO
    ///
    /// # 戻り値
    /// 更新後のレコード、または失敗時はエラー
    ///
    /// 送信するのは変更されたフィールドのみです。レスポンスの扱いは
    /// `resolve_update`の2経路に従います。
    pub async fn update(
        &mut self,
        id: &str,
        changes: UpdateSubscriptionDto,
    ) -> AppResult<Subscription> {
        // バリデーション（ネットワーク呼び出しの前）
        validate_update_subscription_dto(&changes)?;

        let prior = self.store.find(id).cloned();
        let payload = WireSubscriptionPatch::from(&changes);
        let endpoint = format!("{SUBSCRIPTIONS_ENDPOINT}/{id}");

        let token = self.bearer_token();
        let response: Value = self.api.put(&endpoint, &payload, token.as_deref()).await?;

        let record = resolve_update(prior.as_ref(), &changes, response)?;

        info!("サブスクリプションを更新しました: id={}", record.id);

        self.store.replace_record(record.clone());
        Ok(record)
    }

    /// サブスクリプションを削除する
    ///
    /// # 引数
    /// * `id` - 対象のID
    ///
    /// # 戻り値
    /// 成功時はOk(())、失敗時はエラー
    ///
    /// ローカルレコードの削除は、リモート呼び出しが2xxで確定した後に
    /// のみ行います。
    pub async fn delete(&mut self, id: &str) -> AppResult<()> {
        let endpoint = format!("{SUBSCRIPTIONS_ENDPOINT}/{id}");

        let token = self.bearer_token();
        self.api.delete(&endpoint, token.as_deref()).await?;

        self.store.remove(id);
        info!("サブスクリプションを削除しました: id={id}");
        Ok(())
    }

    /// 現在のソート方法で並べたビューを取得する
    pub fn sorted(&self) -> Vec<Subscription> {
        self.store.sorted()
    }

    /// 直近の支払いビューを取得する
    pub fn upcoming(&self) -> Vec<Subscription> {
        self.store.upcoming()
    }

    /// コレクション全体の集計値を取得する
    pub fn stats(&self) -> CollectionStats {
        self.store.stats()
    }

    /// ソート方法を設定する
    pub fn set_sort_by(&mut self, sort_by: SortOption) {
        self.store.set_sort_by(sort_by);
    }

    /// レコード一覧を挿入順で取得する
    pub fn subscriptions(&self) -> &[Subscription] {
        self.store.all()
    }

    /// 全件取得の失敗状態を取得する
    ///
    /// # 戻り値
    /// 直近の全件取得が失敗している場合はそのメッセージ、
    /// 成功している場合はNone
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// インメモリコレクションへの参照を取得する（ビュー計算用）
    pub fn store(&self) -> &SubscriptionStore {
        &self.store
    }

    /// セッションからBearerトークンを取得する
    ///
    /// トークンがない場合はNoneを返し、リクエストは未認証のまま送信されます
    /// （拒否の判断はリモートサービス側の責務）。
    fn bearer_token(&self) -> Option<String> {
        match self.session.lock() {
            Ok(session) => session.token(),
            Err(e) => {
                warn!("セッションロックエラー: {e}");
                None
            }
        }
    }
}

/// 更新レスポンスの2経路の解決
///
/// # 引数
/// * `prior` - 更新前に把握していたローカルレコード
/// * `changes` - リクエストした変更
/// * `response` - サーバーのレスポンスボディ
///
/// # 戻り値
/// 新しいローカルレコード、またはどちらの経路も成立しない場合はエラー
///
/// # 経路
/// 1. レスポンスが完全なレコードとして正規化できる場合はそれを採用
/// 2. 識別フィールドを欠く不完全なエコーの場合は、リクエストした変更を
///    既知のローカルレコードへマージしたものを採用（欠損の多いバックエンド
///    への防御であり、この維持は仕様）
pub fn resolve_update(
    prior: Option<&Subscription>,
    changes: &UpdateSubscriptionDto,
    response: Value,
) -> AppResult<Subscription> {
    if let Some(full_record) = normalize_record(unwrap_record(response)) {
        return Ok(full_record);
    }

    match prior {
        Some(prior) => {
            warn!(
                "不完全な更新レスポンスのため、ローカルレコードに変更をマージします: id={}",
                prior.id
            );
            let mut merged = prior.clone();
            changes.apply_to(&mut merged);
            Ok(merged)
        }
        None => Err(AppError::unexpected_shape(
            "更新レスポンスが不完全で、マージ元のローカルレコードもありません",
        )),
    }
}
