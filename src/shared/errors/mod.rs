use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
///
/// どのエラーもプロセス全体を停止させるものではなく、
/// 単一の操作の失敗としてのみ扱われます。
#[derive(Debug, Error)]
pub enum AppError {
    /// ネットワーク（トランスポート）関連のエラー
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// HTTPステータス（非2xx）のエラー
    #[error("HTTPエラー（{status}）: {message}")]
    Http { status: u16, message: String },

    /// バリデーション関連のエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 認証関連のエラー
    #[error("認証エラー: {0}")]
    Authentication(String),

    /// レスポンス形状が想定と異なる場合のエラー
    #[error("レスポンス形式エラー: {0}")]
    UnexpectedShape(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（設定エラーなど）
    High,
}

impl AppError {
    /// ユーザーに表示するためのフレンドリーなメッセージを取得
    ///
    /// # 戻り値
    /// ユーザーに表示可能なエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "サーバーとの通信に失敗しました".to_string(),
            AppError::Http { message, .. } => message.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Authentication(msg) => msg.clone(),
            AppError::UnexpectedShape(_) => {
                "サーバーからの応答を解釈できませんでした".to_string()
            }
            AppError::Configuration(_) => "設定エラーが発生しました".to_string(),
            AppError::Json(_) => "データ形式の解析でエラーが発生しました".to_string(),
        }
    }

    /// エラーの詳細情報を取得
    ///
    /// # 戻り値
    /// エラーの詳細情報（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    ///
    /// # 戻り値
    /// エラーの重要度レベル
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Network(_) => ErrorSeverity::Medium,
            AppError::Http { .. } => ErrorSeverity::Medium,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::Authentication(_) => ErrorSeverity::Low,
            AppError::UnexpectedShape(_) => ErrorSeverity::Medium,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Json(_) => ErrorSeverity::Medium,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - バリデーションエラーメッセージ
    ///
    /// # 戻り値
    /// バリデーションエラー
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// ネットワークエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - エラーメッセージ
    ///
    /// # 戻り値
    /// ネットワークエラー
    pub fn network<S: Into<String>>(message: S) -> Self {
        AppError::Network(message.into())
    }

    /// HTTPステータスエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `status` - HTTPステータスコード
    /// * `message` - エラーメッセージ
    ///
    /// # 戻り値
    /// HTTPステータスエラー
    pub fn http<S: Into<String>>(status: u16, message: S) -> Self {
        AppError::Http {
            status,
            message: message.into(),
        }
    }

    /// 設定エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - 設定エラーメッセージ
    ///
    /// # 戻り値
    /// 設定エラー
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// レスポンス形式エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - エラーメッセージ
    ///
    /// # 戻り値
    /// レスポンス形式エラー
    pub fn unexpected_shape<S: Into<String>>(message: S) -> Self {
        AppError::UnexpectedShape(message.into())
    }
}

/// AppErrorからStringへの変換（呼び出し側の表示用）
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.user_message()
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        // 各エラータイプの重要度をテスト
        assert_eq!(
            AppError::validation("テスト").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::network("接続失敗").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            AppError::http(500, "サーバーエラー").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            AppError::configuration("設定ファイル不正").severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_user_message() {
        // ユーザーメッセージのテスト
        let validation_error = AppError::validation("金額が不正です");
        assert_eq!(validation_error.user_message(), "金額が不正です");

        let http_error = AppError::http(404, "リソースが見つかりません");
        assert_eq!(http_error.user_message(), "リソースが見つかりません");

        let network_error = AppError::network("connection refused");
        assert_eq!(
            network_error.user_message(),
            "サーバーとの通信に失敗しました"
        );
    }

    #[test]
    fn test_helper_functions() {
        // ヘルパー関数のテスト
        let validation_error = AppError::validation("テストメッセージ");
        assert!(matches!(validation_error, AppError::Validation(_)));

        let http_error = AppError::http(401, "認証が必要です");
        assert!(matches!(http_error, AppError::Http { status: 401, .. }));

        let shape_error = AppError::unexpected_shape("配列ではありません");
        assert!(matches!(shape_error, AppError::UnexpectedShape(_)));
    }

    #[test]
    fn test_string_conversion() {
        // String変換のテスト
        let error = AppError::validation("テストエラー");
        let error_string: String = error.into();
        assert_eq!(error_string, "テストエラー");
    }

    #[test]
    fn test_error_details() {
        // エラー詳細のテスト
        let error = AppError::validation("詳細テスト");
        let details = error.details();
        assert!(details.contains("詳細テスト"));
    }
}
