/// 認証サービス
///
/// リモートサービスのメール・パスワード認証エンドポイントと通信し、
/// Bearerトークンをセッションコンテキストに保持します。認証済みAPIコールの
/// 401応答に対しては、サイレントリフレッシュを1回だけ試みます。
use crate::features::auth::models::{
    AuthError, AuthResponse, CredentialsRequest, MeResponse, RefreshRequest, RefreshResponse, User,
};
use crate::features::auth::session::SessionContext;
use crate::shared::config::environment::ApiConfig;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

/// 認証サービス
#[derive(Clone)]
pub struct AuthService {
    /// リモートサービスのベースURL
    api_base_url: String,
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// セッションコンテキスト
    session: Arc<Mutex<SessionContext>>,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `config` - API設定
    /// * `session` - セッションコンテキスト
    ///
    /// # 戻り値
    /// AuthServiceインスタンス
    pub fn new(
        config: &ApiConfig,
        session: Arc<Mutex<SessionContext>>,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AuthError::ConfigError(format!("HTTPクライアント作成エラー: {e}")))?;

        log::info!(
            "AuthServiceを初期化しました: api_base_url={}",
            config.base_url
        );

        Ok(Self {
            api_base_url: config.base_url.clone(),
            http_client,
            session,
        })
    }

    /// ログインする
    ///
    /// # 引数
    /// * `email` - メールアドレス
    /// * `password` - パスワード
    ///
    /// # 戻り値
    /// サーバーが返したユーザー情報、または失敗時はエラー
    ///
    /// 成功時はトークンとユーザーをセッションに保存します。
    /// 失敗時はトークンを保存しません。
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>, AuthError> {
        validate_credentials(email, password)?;

        let request_body = CredentialsRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: None,
        };

        self.authenticate("/api/auth/login", &request_body).await
    }

    /// サインアップする
    ///
    /// # 引数
    /// * `email` - メールアドレス
    /// * `password` - パスワード
    /// * `name` - 表示名（任意）
    ///
    /// # 戻り値
    /// サーバーが返したユーザー情報、または失敗時はエラー
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        validate_credentials(email, password)?;

        let request_body = CredentialsRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: name.map(|n| n.to_string()),
        };

        self.authenticate("/api/auth/signup", &request_body).await
    }

    /// 認証エンドポイントに認証情報を送信する
    ///
    /// # 引数
    /// * `endpoint` - エンドポイントパス
    /// * `request_body` - 認証情報
    ///
    /// # 戻り値
    /// サーバーが返したユーザー情報、または失敗時はエラー
    async fn authenticate(
        &self,
        endpoint: &str,
        request_body: &CredentialsRequest,
    ) -> Result<Option<User>, AuthError> {
        let url = format!("{}{endpoint}", self.api_base_url);

        log::debug!("認証リクエストを送信: url={url}");

        let response = self
            .http_client
            .post(&url)
            .json(request_body)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("認証リクエストエラー: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "不明なエラー".to_string());
            let message = if error_text.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                error_text
            };
            return Err(AuthError::Rejected(message));
        }

        let auth_response: AuthResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ParseError(format!("認証レスポンスのパースエラー: {e}")))?;

        // トークンとユーザーをセッションに保存
        {
            let mut session = self
                .session
                .lock()
                .map_err(|e| AuthError::StorageError(format!("セッションロックエラー: {e}")))?;
            if let Some(token) = &auth_response.token {
                session.save_token(token);
            }
            session.set_user(auth_response.user.clone());
        }

        log::info!("認証に成功しました: endpoint={endpoint}");

        Ok(auth_response.user)
    }

    /// 現在のユーザーを取得する（起動時のセッション復元）
    ///
    /// # 戻り値
    /// サインイン中のユーザー（未サインインまたは復元失敗時はNone）
    ///
    /// # 処理内容
    /// 1. トークンがなければ未サインインとして終了
    /// 2. `/api/auth/me` にトークンを付与してリクエスト
    /// 3. 401の場合のみ、サイレントリフレッシュを1回だけ試み、成功すれば再試行
    /// 4. リフレッシュ失敗を含むあらゆる失敗でトークンをクリアし未サインイン扱い
    pub async fn fetch_current_user(&self) -> Option<User> {
        let token = match self.stored_token() {
            Ok(Some(token)) => token,
            _ => {
                log::debug!("保存されたトークンがないため、未サインインとして扱います");
                return None;
            }
        };

        match self.try_fetch_current_user(&token).await {
            Ok(user) => {
                if let Ok(mut session) = self.session.lock() {
                    session.set_user(user.clone());
                }
                user
            }
            Err(e) => {
                log::warn!("セッション復元に失敗しました: {e}");
                self.clear_session();
                None
            }
        }
    }

    /// 現在のユーザー取得を実行する
    ///
    /// # 引数
    /// * `token` - 現在のトークン
    ///
    /// # 戻り値
    /// サーバーが返したユーザー情報、または失敗時はエラー
    async fn try_fetch_current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let url = format!("{}/api/auth/me", self.api_base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("ユーザー取得リクエストエラー: {e}")))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // 401の場合のみリフレッシュを1回試み、新しいトークンで再試行する
            let new_token = self.refresh_token(token).await?;

            let retry_response = self
                .http_client
                .get(&url)
                .bearer_auth(&new_token)
                .send()
                .await
                .map_err(|e| {
                    AuthError::NetworkError(format!("ユーザー取得リトライエラー: {e}"))
                })?;

            if !retry_response.status().is_success() {
                return Err(AuthError::InvalidToken);
            }

            let me: MeResponse = retry_response.json().await.map_err(|e| {
                AuthError::ParseError(format!("ユーザー情報のパースエラー: {e}"))
            })?;
            return Ok(me.user);
        }

        if !response.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ParseError(format!("ユーザー情報のパースエラー: {e}")))?;

        Ok(me.user)
    }

    /// トークンをリフレッシュする
    ///
    /// # 引数
    /// * `current` - 現在のトークン
    ///
    /// # 戻り値
    /// 新しいトークン、または失敗時はエラー
    async fn refresh_token(&self, current: &str) -> Result<String, AuthError> {
        log::info!("トークンの有効期限切れを検出しました。リフレッシュを試みます");

        let url = format!("{}/api/auth/refresh", self.api_base_url);
        let request_body = RefreshRequest {
            token: current.to_string(),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(current)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("リフレッシュリクエストエラー: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidToken);
        }

        let refresh_response: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ParseError(format!("リフレッシュレスポンスのパースエラー: {e}")))?;

        let new_token = refresh_response.token.ok_or(AuthError::InvalidToken)?;

        {
            let mut session = self
                .session
                .lock()
                .map_err(|e| AuthError::StorageError(format!("セッションロックエラー: {e}")))?;
            session.save_token(&new_token);
        }

        log::info!("トークンのリフレッシュに成功しました");

        Ok(new_token)
    }

    /// ログアウト処理
    ///
    /// セッションのトークンとユーザーを同期的にクリアします。
    /// ネットワーク呼び出しは行いません。
    ///
    /// # 戻り値
    /// 処理結果
    pub fn logout(&self) -> Result<(), AuthError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| AuthError::StorageError(format!("セッションロックエラー: {e}")))?;
        session.clear();

        log::info!("ログアウト処理が完了しました");
        Ok(())
    }

    /// 保存されているセッショントークンを取得する
    ///
    /// # 戻り値
    /// セッショントークン（存在しない場合はNone）
    pub fn stored_token(&self) -> Result<Option<String>, AuthError> {
        let session = self
            .session
            .lock()
            .map_err(|e| AuthError::StorageError(format!("セッションロックエラー: {e}")))?;
        Ok(session.token())
    }

    /// セッションをクリアする（失敗パス用）
    fn clear_session(&self) {
        if let Ok(mut session) = self.session.lock() {
            session.clear();
        }
    }
}

/// 認証情報のバリデーション
///
/// # 引数
/// * `email` - メールアドレス
/// * `password` - パスワード
///
/// # 戻り値
/// 必須項目が揃っている場合はOk(())、欠けている場合はエラー
///
/// ネットワーク呼び出しの前に実行します。
fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::ValidationError(
            "メールアドレスを入力してください".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AuthError::ValidationError(
            "パスワードを入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service(base_url: &str) -> (AuthService, Arc<Mutex<SessionContext>>) {
        let session = Arc::new(Mutex::new(SessionContext::new()));
        let config = ApiConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_retries: 0,
        };
        let service = AuthService::new(&config, Arc::clone(&session)).unwrap();
        (service, session)
    }

    #[test]
    fn test_validate_credentials() {
        // 有効な認証情報
        assert!(validate_credentials("user@example.com", "secret").is_ok());

        // 必須項目の欠落
        assert!(validate_credentials("", "secret").is_err());
        assert!(validate_credentials("   ", "secret").is_err());
        assert!(validate_credentials("user@example.com", "").is_err());
    }

    #[tokio::test]
    async fn test_login_validates_before_network() {
        // バリデーション失敗時はネットワーク呼び出しに到達しない
        // （存在しないホストでもエラー種別はValidationErrorになる）
        let (service, session) = test_service("http://127.0.0.1:9");

        let result = service.login("", "secret").await;
        assert!(matches!(result, Err(AuthError::ValidationError(_))));
        assert!(session.lock().unwrap().token().is_none());
    }

    #[tokio::test]
    async fn test_fetch_current_user_without_token_is_signed_out() {
        // トークンがない場合はネットワーク呼び出しなしで未サインイン
        let (service, _session) = test_service("http://127.0.0.1:9");

        assert!(service.fetch_current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_current_user_failure_clears_token() {
        // 認証済み取得の失敗パスではトークンがクリアされる
        let (service, session) = test_service("http://127.0.0.1:9");
        session.lock().unwrap().save_token("stale-token");

        let user = service.fetch_current_user().await;

        assert!(user.is_none());
        assert!(session.lock().unwrap().token().is_none());
    }

    #[tokio::test]
    async fn test_login_failure_stores_no_token() {
        // ログイン失敗時はトークンを保存しない
        let (service, session) = test_service("http://127.0.0.1:9");

        let result = service.login("user@example.com", "secret").await;

        assert!(result.is_err());
        assert!(session.lock().unwrap().token().is_none());
    }

    #[test]
    fn test_logout_clears_session_synchronously() {
        let (service, session) = test_service("http://127.0.0.1:9");
        {
            let mut guard = session.lock().unwrap();
            guard.save_token("token-abc");
            guard.set_user(Some(User {
                id: "user-1".to_string(),
                email: "user@example.com".to_string(),
                name: None,
            }));
        }

        service.logout().unwrap();

        let guard = session.lock().unwrap();
        assert!(guard.token().is_none());
        assert!(!guard.is_authenticated());
    }
}
