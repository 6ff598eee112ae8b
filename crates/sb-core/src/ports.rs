use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{ApplicationId, GuildId, RoleId, UserId},
    Result,
};

/// Hexagonal port for pushing command metadata to the platform.
///
/// Both calls replace the whole registered set for their scope (an empty
/// payload clears it).
#[async_trait]
pub trait RegistrationPort: Send + Sync {
    async fn register_guild_commands(
        &self,
        app: ApplicationId,
        guild: GuildId,
        payload: &[Value],
    ) -> Result<()>;

    async fn register_global_commands(&self, app: ApplicationId, payload: &[Value]) -> Result<()>;
}

/// One operator grant: a user or role and the custom permission strings it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct OpGrant<Id> {
    pub id: Id,
    pub perms: Vec<String>,
}

/// Per-guild operator list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OppedConfig {
    pub users: Vec<OpGrant<UserId>>,
    pub roles: Vec<OpGrant<RoleId>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GuildConfig {
    pub opped: OppedConfig,
}

/// Persisted per-guild configuration, read on every guild command.
#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    async fn get(&self, guild: GuildId) -> Result<Option<GuildConfig>>;
}

/// Process-local config store.
#[derive(Default)]
pub struct MemoryGuildConfigStore {
    configs: RwLock<HashMap<GuildId, GuildConfig>>,
}

impl MemoryGuildConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, guild: GuildId, cfg: GuildConfig) {
        self.configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guild, cfg);
    }
}

#[async_trait]
impl GuildConfigStore for MemoryGuildConfigStore {
    async fn get(&self, guild: GuildId) -> Result<Option<GuildConfig>> {
        Ok(self
            .configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&guild)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn memory_store_round_trips_per_guild() {
        let store = MemoryGuildConfigStore::new();
        let cfg = GuildConfig {
            opped: OppedConfig {
                users: vec![OpGrant {
                    id: UserId(7),
                    perms: vec!["kick".into()],
                }],
                roles: vec![],
            },
        };
        store.set(GuildId(1), cfg.clone());
        assert_eq!(store.get(GuildId(1)).await.unwrap(), Some(cfg));
        assert_eq!(store.get(GuildId(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn poisoned_lock_keeps_serving() {
        let store = Arc::new(MemoryGuildConfigStore::new());
        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.configs.write().unwrap();
            panic!("writer died");
        })
        .join();
        assert!(store.configs.is_poisoned());

        store.set(GuildId(1), GuildConfig::default());
        assert_eq!(
            store.get(GuildId(1)).await.unwrap(),
            Some(GuildConfig::default())
        );
    }
}
