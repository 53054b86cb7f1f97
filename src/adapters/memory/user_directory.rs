use super::InMemoryLibrary;
use crate::domain::{user::User, value_objects::UserId};
use crate::ports::book_catalog::DeleteOutcome;
use crate::ports::user_directory::{Result, UserDirectory};
use async_trait::async_trait;

#[async_trait]
impl UserDirectory for InMemoryLibrary {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.read().await.users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut uow = self.begin().await;
        uow.state().users.insert(user.user_id, user.clone());
        uow.commit();
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<DeleteOutcome> {
        let mut uow = self.begin().await;
        let state = uow.state();

        if !state.users.contains_key(&user_id) {
            return Ok(DeleteOutcome::NotFound);
        }
        if state
            .loans
            .iter()
            .any(|loan| loan.user_id == user_id && loan.is_open())
        {
            return Ok(DeleteOutcome::HasOpenLoan);
        }

        state.users.remove(&user_id);
        state.loans.retain(|loan| loan.user_id != user_id);
        uow.commit();
        Ok(DeleteOutcome::Deleted)
    }
}
