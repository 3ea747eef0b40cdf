use mri_auth::USERS_PATH;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::events::SessionEvent;
use crate::models::UpdateUserRequest;
use crate::request::ApiRequest;

/// Current-user profile endpoints, backed by the stored user snapshot.
#[derive(Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the current user and cache the snapshot.
    ///
    /// When the request fails or the server returns an empty body, the last
    /// cached snapshot is returned instead. Without a snapshot the error is
    /// returned.
    pub async fn get_user_info(&self) -> Result<Value> {
        let fetched = match self.client.execute(ApiRequest::get(USERS_PATH)).await {
            Ok(response) => {
                let user = response.value();
                if !is_empty_user(&user) {
                    self.client.store().set_user_info(&user).await?;
                    debug!("stored user snapshot");
                    return Ok(user);
                }
                warn!("server returned empty user info");
                Err(ApiError::Decode("empty user info response".into()))
            }
            Err(e) => {
                warn!(error = %e, "fetching user info failed");
                Err(e)
            }
        };

        match self.client.store().user_info().await {
            Some(cached) => {
                info!("using cached user info");
                Ok(cached)
            }
            None => fetched,
        }
    }

    /// Update profile fields and merge the server's answer into the snapshot.
    pub async fn update_user_info(&self, update: &UpdateUserRequest) -> Result<Value> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("no profile fields to update".into()));
        }
        let update = update.normalized()?;
        let response = self
            .client
            .execute(ApiRequest::put_json(USERS_PATH, &update)?)
            .await?;
        let returned = response.value();
        if is_empty_user(&returned) {
            return Ok(returned);
        }

        let mut user = self
            .client
            .store()
            .user_info()
            .await
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Default::default()));
        merge_into(&mut user, returned);
        self.client.store().set_user_info(&user).await?;
        info!("updated user profile");
        Ok(user)
    }

    /// Delete the account and clear every stored key.
    pub async fn delete_user(&self) -> Result<Value> {
        let response = self.client.execute(ApiRequest::delete(USERS_PATH)).await?;
        self.client.store().clear().await?;
        info!("account deleted");
        self.client.emit(SessionEvent::LoggedOut);
        Ok(response.value())
    }
}

fn is_empty_user(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Shallow merge: top-level keys of `update` overwrite those in `target`.
/// A non-object `update` replaces `target` entirely.
fn merge_into(target: &mut Value, update: Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                target.insert(key, value);
            }
        }
        (target, update) => *target = update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_top_level_keys() {
        let mut user = json!({"name": "Old", "email": "a@b.c"});
        merge_into(&mut user, json!({"name": "New", "gender": "Female"}));
        assert_eq!(
            user,
            json!({"name": "New", "email": "a@b.c", "gender": "Female"})
        );
    }

    #[test]
    fn merge_with_non_object_replaces() {
        let mut user = json!({"name": "Old"});
        merge_into(&mut user, json!("updated"));
        assert_eq!(user, json!("updated"));
    }

    #[test]
    fn empty_user_detection() {
        assert!(is_empty_user(&Value::Null));
        assert!(is_empty_user(&json!("")));
        assert!(!is_empty_user(&json!({})));
        assert!(!is_empty_user(&json!({"name": "x"})));
    }
}
