use serde::{Deserialize, Serialize};

/// ユーザー情報を表す構造体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// 表示名
    pub name: Option<String>,
}

/// ログイン・サインアップのリクエストボディ
#[derive(Debug, Serialize)]
pub struct CredentialsRequest {
    /// メールアドレス
    pub email: String,
    /// パスワード
    pub password: String,
    /// 表示名（サインアップ時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// ログイン・サインアップのレスポンスボディ
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// Bearerトークン
    pub token: Option<String>,
    /// ユーザー情報
    pub user: Option<User>,
}

/// トークンリフレッシュのリクエストボディ
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    /// 現在のトークン
    pub token: String,
}

/// トークンリフレッシュのレスポンスボディ
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    /// 新しいトークン
    pub token: Option<String>,
}

/// 現在のユーザー取得のレスポンスボディ
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    /// ユーザー情報
    pub user: Option<User>,
}

/// 認証エラーの種類
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 設定エラー
    #[error("認証設定エラー: {0}")]
    ConfigError(String),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// 認証情報が拒否された場合のエラー
    #[error("認証に失敗しました: {0}")]
    Rejected(String),

    /// トークンが無効な場合のエラー
    #[error("トークンが無効です")]
    InvalidToken,

    /// レスポンス解析エラー
    #[error("認証レスポンスの解析エラー: {0}")]
    ParseError(String),

    /// セッションストアへのアクセスエラー
    #[error("セッションストアエラー: {0}")]
    StorageError(String),

    /// バリデーションエラー
    #[error("入力エラー: {0}")]
    ValidationError(String),
}

impl AuthError {
    /// ユーザーに表示するためのメッセージを取得
    ///
    /// # 戻り値
    /// ユーザーに表示可能なエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            AuthError::ConfigError(_) => "認証設定に問題があります".to_string(),
            AuthError::NetworkError(_) => "サーバーとの通信に失敗しました".to_string(),
            AuthError::Rejected(msg) => msg.clone(),
            AuthError::InvalidToken => "セッションの有効期限が切れました".to_string(),
            AuthError::ParseError(_) => "サーバーからの応答を解釈できませんでした".to_string(),
            AuthError::StorageError(_) => "セッション情報へのアクセスに失敗しました".to_string(),
            AuthError::ValidationError(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_request_omits_missing_name() {
        // nameがNoneの場合はシリアライズに含めない
        let request = CredentialsRequest {
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
            name: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("name").is_none());
        assert_eq!(json["email"], "user@example.com");
    }

    #[test]
    fn test_auth_response_tolerates_missing_fields() {
        // トークンやユーザーが欠けたレスポンスも解析できる
        let response: AuthResponse = serde_json::from_str("{}").unwrap();
        assert!(response.token.is_none());
        assert!(response.user.is_none());

        let response: AuthResponse =
            serde_json::from_str(r#"{"token": "abc", "user": {"id": "1", "email": "a@b.c"}}"#)
                .unwrap();
        assert_eq!(response.token.as_deref(), Some("abc"));
        assert_eq!(response.user.unwrap().id, "1");
    }

    #[test]
    fn test_auth_error_user_message() {
        let error = AuthError::Rejected("メールアドレスまたはパスワードが違います".to_string());
        assert_eq!(
            error.user_message(),
            "メールアドレスまたはパスワードが違います"
        );

        let error = AuthError::InvalidToken;
        assert_eq!(error.user_message(), "セッションの有効期限が切れました");
    }
}
