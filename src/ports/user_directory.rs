use crate::domain::{user::User, value_objects::UserId};
use async_trait::async_trait;

use super::book_catalog::DeleteOutcome;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 利用者ディレクトリポート
///
/// 貸出処理からは利用者の存在確認に使われる。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// IDで利用者を取得する
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// すべての利用者を取得する
    async fn list_users(&self) -> Result<Vec<User>>;

    /// 利用者を登録する
    async fn create_user(&self, user: &User) -> Result<()>;

    /// 利用者を削除する
    ///
    /// 未返却の貸出の確認と削除は1つの作業単位で行い、
    /// 貸出を持っていれば何も変更せずに HasOpenLoan を返す。
    /// 返却済みの貸出記録は利用者と一緒に削除される。
    async fn delete_user(&self, user_id: UserId) -> Result<DeleteOutcome>;
}
