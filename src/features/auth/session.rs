/// セッションコンテキストモジュール
///
/// Bearerトークンとサインイン中のユーザーを保持する、プロセス寿命の
/// セッションスコープストアです。起動時に作成し、ログアウトまたは
/// トークン無効化時にクリアします。グローバル変数ではなく、各サービスに
/// 明示的に注入して使用します。
use crate::features::auth::models::User;
use std::collections::HashMap;

/// セッションストアのキー定義
pub struct SessionKeys;

impl SessionKeys {
    /// セッショントークンのキー
    pub const SESSION_TOKEN: &'static str = "subtracker_token";
}

/// セッションコンテキスト
///
/// トークンは固定キーのキーバリューストアに保持されます。
/// 永続化は行わず、プロセス終了とともに破棄されます。
#[derive(Debug, Default)]
pub struct SessionContext {
    /// セッションスコープのキーバリューストア
    values: HashMap<String, String>,
    /// サインイン中のユーザー
    user: Option<User>,
}

impl SessionContext {
    /// 新しいセッションコンテキストを作成する（起動時に1度だけ）
    ///
    /// # 戻り値
    /// 空のセッションコンテキスト
    pub fn new() -> Self {
        Self::default()
    }

    /// セッショントークンを保存する
    ///
    /// # 引数
    /// * `token` - Bearerトークン
    pub fn save_token(&mut self, token: &str) {
        self.values
            .insert(SessionKeys::SESSION_TOKEN.to_string(), token.to_string());
        log::info!("セッショントークンを保存しました");
    }

    /// セッショントークンを取得する
    ///
    /// # 戻り値
    /// セッショントークン（存在しない場合はNone）
    pub fn token(&self) -> Option<String> {
        self.values.get(SessionKeys::SESSION_TOKEN).cloned()
    }

    /// サインイン中のユーザーを設定する
    ///
    /// # 引数
    /// * `user` - ユーザー情報（サインアウト時はNone）
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// サインイン中のユーザーを取得する
    ///
    /// # 戻り値
    /// ユーザー情報（未サインインの場合はNone）
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// サインイン済みかどうかを判定する
    ///
    /// # 戻り値
    /// ユーザーが設定されている場合はtrue
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// 認証情報をすべてクリアする
    ///
    /// ログアウト時およびトークン無効化時に呼び出します。
    pub fn clear(&mut self) {
        self.values.remove(SessionKeys::SESSION_TOKEN);
        self.user = None;
        log::info!("セッション情報をクリアしました");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            name: Some("テストユーザー".to_string()),
        }
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionContext::new();
        assert!(session.token().is_none());
        assert!(session.user().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_save_and_get_token() {
        let mut session = SessionContext::new();
        session.save_token("token-abc");

        assert_eq!(session.token().as_deref(), Some("token-abc"));
    }

    #[test]
    fn test_set_user() {
        let mut session = SessionContext::new();
        session.set_user(Some(test_user()));

        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().id, "user-1");
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut session = SessionContext::new();
        session.save_token("token-abc");
        session.set_user(Some(test_user()));

        session.clear();

        assert!(session.token().is_none());
        assert!(session.user().is_none());
        assert!(!session.is_authenticated());
    }
}
