use async_trait::async_trait;
use brain_core::types::{UserContext, UserId};
use brain_scheduler::{SchedulerError, UserContextResolver};
use chrono::Utc;

/// Resolves a [`UserContext`] straight from the bare user id, with no
/// backing user table — user CRUD and auth are both out of scope here, so
/// `username`/`email` are derived rather than looked up. Good enough for a
/// single-tenant deployment; a multi-tenant one would replace this with a
/// resolver backed by whatever external user store it has.
pub struct StaticUserContextResolver;

impl StaticUserContextResolver {
    pub fn context_for(user_id: &UserId) -> UserContext {
        UserContext {
            user_id: user_id.clone(),
            username: user_id.as_str().to_string(),
            email: format!("{}@local", user_id.as_str()),
            now: Utc::now(),
        }
    }
}

#[async_trait]
impl UserContextResolver for StaticUserContextResolver {
    async fn resolve(&self, user_id: &UserId) -> Result<UserContext, SchedulerError> {
        Ok(Self::context_for(user_id))
    }
}
