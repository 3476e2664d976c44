/// 汎用APIクライアント
///
/// リモートのレコードストレージサービスとの通信を行う汎用的なクライアント。
/// サブスクリプションAPIなど、Bearerトークンを任意で付与するエンドポイントで
/// 使用できます。
use crate::shared::config::environment::ApiConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

/// APIクライアント設定
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

impl ApiClientConfig {
    /// 環境設定からAPIクライアント設定を作成
    pub fn from_env() -> Self {
        let api_config = ApiConfig::from_env();
        Self {
            base_url: api_config.base_url,
            timeout_seconds: api_config.timeout_seconds,
            max_retries: api_config.max_retries,
        }
    }
}

/// 汎用APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    /// 新しいAPIクライアントを作成
    pub fn new() -> AppResult<Self> {
        let config = ApiClientConfig::from_env();
        Self::new_with_config(config)
    }

    /// 設定を指定してAPIクライアントを作成
    pub fn new_with_config(config: ApiClientConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, config })
    }

    /// GETリクエストを送信
    pub async fn get<T>(&self, endpoint: &str, auth_token: Option<&str>) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        info!("GETリクエスト送信: endpoint={endpoint}");

        let url = format!("{}{endpoint}", self.config.base_url);
        let mut request = self.client.get(&url);

        // 認証トークンがある場合は追加
        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        self.send_request_with_retry(request, "GET", endpoint).await
    }

    /// POSTリクエストを送信
    pub async fn post<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        auth_token: Option<&str>,
    ) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("POSTリクエスト送信: endpoint={endpoint}");

        let url = format!("{}{endpoint}", self.config.base_url);
        let mut request = self.client.post(&url).json(body);

        // 認証トークンがある場合は追加
        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        self.send_request_with_retry(request, "POST", endpoint)
            .await
    }

    /// PUTリクエストを送信
    pub async fn put<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        auth_token: Option<&str>,
    ) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("PUTリクエスト送信: endpoint={endpoint}");

        let url = format!("{}{endpoint}", self.config.base_url);
        let mut request = self.client.put(&url).json(body);

        // 認証トークンがある場合は追加
        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        self.send_request_with_retry(request, "PUT", endpoint).await
    }

    /// DELETEリクエストを送信
    ///
    /// DELETEリクエストは通常レスポンスボディがないため、
    /// 成功ステータス（2xx）のみをチェックします。
    pub async fn delete(&self, endpoint: &str, auth_token: Option<&str>) -> AppResult<()> {
        let url = format!("{}{endpoint}", self.config.base_url);
        info!("DELETEリクエスト送信: endpoint={endpoint}, url={url}");

        let mut request = self.client.delete(&url);

        // 認証トークンがある場合は追加
        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let mut attempts = 0;
        loop {
            let cloned_request = request.try_clone().ok_or_else(|| {
                AppError::network("リクエストのクローンに失敗しました".to_string())
            })?;

            match cloned_request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        info!("DELETEリクエスト成功: endpoint={endpoint}");
                        return Ok(());
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    if attempts < self.config.max_retries {
                        attempts += 1;
                        let delay = Duration::from_secs(2_u64.pow(attempts));
                        warn!(
                            "APIリクエスト失敗、リトライします: attempt={attempts}/{}, delay={delay:?}",
                            self.config.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        return Err(AppError::network(format!(
                            "APIサーバーへの接続に失敗しました: {e}"
                        )));
                    }
                }
            }
        }
    }

    /// リトライ機能付きでリクエストを送信
    ///
    /// トランスポート層の失敗のみリトライ対象とし、非2xxレスポンスは
    /// 即座にHTTPエラーとして返します。
    async fn send_request_with_retry<T>(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        endpoint: &str,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let mut attempts = 0;
        loop {
            let cloned_request = request.try_clone().ok_or_else(|| {
                AppError::network("リクエストのクローンに失敗しました".to_string())
            })?;

            match cloned_request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        let result: T = response.json().await.map_err(|e| {
                            AppError::unexpected_shape(format!("レスポンス解析エラー: {e}"))
                        })?;

                        info!("{method}リクエスト成功: endpoint={endpoint}");
                        return Ok(result);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    if attempts < self.config.max_retries {
                        attempts += 1;
                        let delay = Duration::from_secs(2_u64.pow(attempts));
                        warn!(
                            "APIリクエスト失敗、リトライします: attempt={attempts}/{}, delay={delay:?}",
                            self.config.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        return Err(AppError::network(format!(
                            "APIサーバーへの接続に失敗しました: {e}"
                        )));
                    }
                }
            }
        }
    }

    /// エラーレスポンスを処理し、HTTPステータスエラーに変換する
    ///
    /// リモートサービスのエラーボディは形式が一定しないため、
    /// 既知の形式を順に試し、どれにも当てはまらない場合は
    /// ステータスコードに応じた汎用メッセージを使用します。
    async fn handle_error_response(&self, response: Response) -> AppError {
        let status = response.status();
        let status_code = status.as_u16();

        let response_text = response.text().await.unwrap_or_default();

        // 構造化エラーボディの解析を試行
        if let Some(message) = extract_error_message(&response_text) {
            debug!("APIサーバーから構造化エラーレスポンスを受信: message={message}");
            return AppError::http(status_code, message);
        }

        // 構造化されていない場合はステータスコードに応じた汎用メッセージ
        let user_message = match status_code {
            400 => "リクエストの形式が正しくありません",
            401 => "認証に失敗しました。再度ログインしてください",
            403 => "この操作を実行する権限がありません",
            404 => "指定されたリソースが見つかりません",
            429 => "リクエストが多すぎます。しばらく待ってから再試行してください",
            500 => "サーバー内部エラーが発生しました",
            502 | 503 | 504 => "APIサーバーが一時的に利用できません",
            _ => "不明なエラーが発生しました",
        };

        warn!("APIサーバーから非構造化エラーレスポンス: status={status_code}, body={response_text}");

        AppError::http(status_code, user_message)
    }
}

/// エラーボディからメッセージを抽出する
///
/// # 引数
/// * `body` - レスポンスボディの文字列
///
/// # 戻り値
/// 抽出できた場合はメッセージ、できなかった場合はNone
///
/// # 対応形式（優先順）
/// 1. `{"error": {"message": "..."}}`
/// 2. `{"error": "..."}`
/// 3. `{"message": "..."}`
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    if let Some(error) = value.get("error") {
        if let Some(message) = error.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
        if let Some(message) = error.as_str() {
            return Some(message.to_string());
        }
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_nested() {
        let body = r#"{"error": {"code": "NOT_FOUND", "message": "レコードが見つかりません"}}"#;
        assert_eq!(
            extract_error_message(body),
            Some("レコードが見つかりません".to_string())
        );
    }

    #[test]
    fn test_extract_error_message_flat() {
        let body = r#"{"error": "invalid request"}"#;
        assert_eq!(
            extract_error_message(body),
            Some("invalid request".to_string())
        );
    }

    #[test]
    fn test_extract_error_message_top_level() {
        let body = r#"{"message": "unauthorized"}"#;
        assert_eq!(
            extract_error_message(body),
            Some("unauthorized".to_string())
        );
    }

    #[test]
    fn test_extract_error_message_unstructured() {
        assert_eq!(extract_error_message("Internal Server Error"), None);
        assert_eq!(extract_error_message(""), None);
        assert_eq!(extract_error_message(r#"{"status": 500}"#), None);
    }

    #[test]
    fn test_client_creation_with_config() {
        let config = ApiClientConfig {
            base_url: "http://localhost:9999".to_string(),
            timeout_seconds: 5,
            max_retries: 0,
        };
        assert!(ApiClient::new_with_config(config).is_ok());
    }
}
