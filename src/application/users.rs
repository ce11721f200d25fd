//! Author hydration for listings.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::Authored;

/// Attaches public author profiles to authored entities in place.
#[derive(Clone)]
pub struct UserBinder {
    users: Arc<dyn UsersRepo>,
}

impl UserBinder {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    /// Look up every distinct author once and attach the profiles found.
    /// Entities whose author no longer exists keep `user = None`.
    pub async fn bind<T: Authored + Send>(&self, items: &mut [T]) -> Result<(), RepoError> {
        if items.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = items
            .iter()
            .map(Authored::author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let profiles: HashMap<_, _> = self
            .users
            .find_profiles(&ids)
            .await?
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();

        for item in items.iter_mut() {
            if let Some(profile) = profiles.get(&item.author_id()) {
                item.attach_author(profile.clone());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::{ReplyRecord, UserProfile};

    struct StaticUsers {
        profiles: Vec<UserProfile>,
        lookups: Mutex<Vec<Vec<Uuid>>>,
    }

    #[async_trait]
    impl UsersRepo for StaticUsers {
        async fn find_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, RepoError> {
            self.lookups
                .lock()
                .expect("lookups lock")
                .push(ids.to_vec());
            Ok(self
                .profiles
                .iter()
                .filter(|profile| ids.contains(&profile.id))
                .cloned()
                .collect())
        }
    }

    fn reply_by(user_id: Uuid) -> ReplyRecord {
        let now = OffsetDateTime::now_utc();
        ReplyRecord {
            id: Uuid::new_v4(),
            topic_id: Uuid::nil(),
            user_id,
            content: "<p>hi</p>".to_string(),
            deleted: false,
            version: 0,
            created_at: now,
            updated_at: now,
            user: None,
        }
    }

    #[tokio::test]
    async fn binds_each_author_with_one_lookup() {
        let alice = UserProfile {
            id: Uuid::new_v4(),
            name: "alice".to_string(),
            image_url: String::new(),
        };
        let ghost = Uuid::new_v4();
        let repo = Arc::new(StaticUsers {
            profiles: vec![alice.clone()],
            lookups: Mutex::new(Vec::new()),
        });
        let binder = UserBinder::new(repo.clone());

        let mut replies = vec![reply_by(alice.id), reply_by(ghost), reply_by(alice.id)];
        binder.bind(&mut replies).await.expect("bind users");

        assert_eq!(replies[0].user.as_ref(), Some(&alice));
        assert_eq!(replies[1].user, None);
        assert_eq!(replies[2].user.as_ref(), Some(&alice));

        let lookups = repo.lookups.lock().expect("lookups lock");
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].len(), 2);
    }

    #[tokio::test]
    async fn empty_slice_skips_lookup() {
        let repo = Arc::new(StaticUsers {
            profiles: Vec::new(),
            lookups: Mutex::new(Vec::new()),
        });
        let binder = UserBinder::new(repo.clone());

        let mut replies: Vec<ReplyRecord> = Vec::new();
        binder.bind(&mut replies).await.expect("bind users");

        assert!(repo.lookups.lock().expect("lookups lock").is_empty());
    }
}
