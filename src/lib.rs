// 機能モジュール構造
pub mod features;
pub mod shared;

use features::auth::service::AuthService;
use features::auth::session::SessionContext;
use features::subscriptions::service::SubscriptionService;
use log::info;
use shared::api_client::{ApiClient, ApiClientConfig};
use shared::config::environment::{
    initialize_logging_system, load_environment_variables, ApiConfig,
};
use shared::errors::{AppError, AppResult};
use std::sync::{Arc, Mutex};

/// アプリケーション状態
///
/// セッションコンテキストと各サービスを保持します。セッションは起動時に
/// 1度だけ作成され、両サービスに明示的に注入されます。
pub struct App {
    /// セッションコンテキスト
    pub session: Arc<Mutex<SessionContext>>,
    /// 認証サービス
    pub auth: AuthService,
    /// サブスクリプション同期サービス
    pub subscriptions: SubscriptionService,
}

impl App {
    /// 環境変数の設定からアプリケーション状態を作成する
    ///
    /// # 戻り値
    /// アプリケーション状態、または失敗時はエラー
    pub fn new() -> AppResult<Self> {
        let api_config = ApiConfig::from_env();
        Self::with_config(api_config)
    }

    /// 設定を指定してアプリケーション状態を作成する
    ///
    /// # 引数
    /// * `api_config` - API設定
    ///
    /// # 戻り値
    /// アプリケーション状態、または失敗時はエラー
    pub fn with_config(api_config: ApiConfig) -> AppResult<Self> {
        api_config.validate().map_err(AppError::configuration)?;

        let session = Arc::new(Mutex::new(SessionContext::new()));

        let auth = AuthService::new(&api_config, Arc::clone(&session))
            .map_err(|e| AppError::configuration(format!("認証サービス初期化失敗: {e}")))?;

        let client_config = ApiClientConfig {
            base_url: api_config.base_url.clone(),
            timeout_seconds: api_config.timeout_seconds,
            max_retries: api_config.max_retries,
        };
        let api = ApiClient::new_with_config(client_config)?;
        let subscriptions = SubscriptionService::new(api, Arc::clone(&session));

        info!(
            "アプリケーション状態を初期化しました: base_url={}",
            api_config.base_url
        );

        Ok(Self {
            session,
            auth,
            subscriptions,
        })
    }

    /// 環境変数とログシステムを初期化してからアプリケーション状態を作成する
    ///
    /// # 戻り値
    /// アプリケーション状態、または失敗時はエラー
    ///
    /// # 処理内容
    /// 1. 環境に応じた.envファイルを読み込み（ログシステム初期化前に実行）
    /// 2. ログシステムを初期化
    /// 3. アプリケーション状態を作成
    pub fn bootstrap() -> AppResult<Self> {
        load_environment_variables();
        initialize_logging_system();
        Self::new()
    }
}
