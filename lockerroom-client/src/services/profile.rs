use std::sync::Arc;

use lockerroom_cache::{CacheRead, QueryClient, QueryOptions, Subscription};
use lockerroom_core::{
    FieldError, LockerRoomApi, LockerRoomError, LockerRoomResult, Profile, ProfileUpdate, UserId,
};

use super::from_api;
use crate::keys;

#[derive(Clone)]
pub struct ProfileService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
    me: UserId,
}

impl ProfileService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient, me: UserId) -> Self {
        Self { api, client, me }
    }

    fn options(&self) -> QueryOptions {
        self.client.config().query_options()
    }

    /// The actor's profile, or `None` if they have not created one yet.
    pub async fn my_profile(&self) -> LockerRoomResult<Option<Profile>> {
        let read = self
            .client
            .fetch_query(
                keys::profile(self.me),
                self.options(),
                from_api(&self.api, |api| async move { api.my_profile().await }),
            )
            .await;
        match read {
            Ok(read) => Ok(Some(read.into_value())),
            Err(err) if err.is_expected() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn profile(&self, user_id: UserId) -> LockerRoomResult<Profile> {
        self.client
            .fetch_query(
                keys::profile(user_id),
                self.options(),
                from_api(&self.api, move |api| async move { api.profile(user_id).await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub fn watch_profile(&self, user_id: UserId) -> Subscription<Profile> {
        self.client.subscribe(
            keys::profile(user_id),
            self.options(),
            from_api(&self.api, move |api| async move { api.profile(user_id).await }),
        )
    }

    /// Apply `update` to the actor's profile. The cached profile shows the
    /// change at once and is replaced by the server's copy on success.
    pub async fn update_profile(&self, update: ProfileUpdate) -> LockerRoomResult<Profile> {
        validate_update(&update)?;
        let key = keys::profile(self.me);
        let predicted = update.clone();
        let saved = self
            .client
            .mutation::<Profile>("update_profile")
            .optimistic::<Profile, _>(key.clone(), move |current| {
                current.map(|profile| predicted.applied_to(profile))
            })
            .reconcile::<Profile, _>(key, |server| Some(server.clone()))
            .invalidates(keys::analytics(self.me))
            .execute(self.api.update_profile(&update))
            .await?;
        tracing::info!(user_id = %self.me, "Profile updated");
        Ok(saved)
    }
}

fn validate_update(update: &ProfileUpdate) -> LockerRoomResult<()> {
    if update.is_empty() {
        return Err(LockerRoomError::validation("Nothing to update", Vec::new()));
    }
    let mut fields = Vec::new();
    if let Some(name) = &update.display_name {
        if name.trim().is_empty() {
            fields.push(FieldError::new("display_name", "Display name is required"));
        }
    }
    if let Some(year) = update.graduation_year {
        if !(1950..=2100).contains(&year) {
            fields.push(FieldError::new("graduation_year", "Enter a four-digit year"));
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(LockerRoomError::validation("Profile has invalid fields", fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_validation() {
        assert!(validate_update(&ProfileUpdate::default()).is_err());

        let blank = ProfileUpdate {
            display_name: Some("  ".to_string()),
            graduation_year: Some(27),
            ..Default::default()
        };
        let err = validate_update(&blank).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["display_name", "graduation_year"]);

        let ok = ProfileUpdate {
            position: Some("Wing".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&ok).is_ok());
    }
}
