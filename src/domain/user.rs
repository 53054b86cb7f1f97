use serde::{Deserialize, Serialize};

use super::UserId;

/// 利用者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    /// 学年・クラスなどの区分
    pub standard: String,
}
