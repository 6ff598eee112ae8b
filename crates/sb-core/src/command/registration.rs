use serde_json::Value;

use crate::{
    command::payload::Transmission,
    domain::{ApplicationId, GuildId},
    ports::RegistrationPort,
    Result,
};

/// One bulk-overwrite call against the platform.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistrationCall {
    Guild { guild: GuildId, payload: Vec<Value> },
    Global { payload: Vec<Value> },
}

/// Ordered registration calls for one transmission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrationPlan {
    pub calls: Vec<RegistrationCall>,
}

impl RegistrationPlan {
    /// Split `t` between the registration guild, the development guild and
    /// the global scope.
    pub fn new(t: &Transmission, command_guild: Option<GuildId>, dev_guild: Option<GuildId>) -> Self {
        let mut calls = Vec::new();

        match (command_guild, dev_guild) {
            (Some(cg), Some(dg)) if cg == dg => {
                calls.push(RegistrationCall::Guild {
                    guild: cg,
                    payload: t.all(),
                });
                calls.push(RegistrationCall::Global {
                    payload: Vec::new(),
                });
                return Self { calls };
            }
            (Some(cg), _) => {
                calls.push(RegistrationCall::Guild {
                    guild: cg,
                    payload: t.commands.clone(),
                });
                calls.push(RegistrationCall::Global {
                    payload: Vec::new(),
                });
            }
            (None, _) => calls.push(RegistrationCall::Global {
                payload: t.commands.clone(),
            }),
        }

        match dev_guild {
            Some(dg) => calls.push(RegistrationCall::Guild {
                guild: dg,
                payload: t.dev_only.clone(),
            }),
            None if !t.dev_only.is_empty() => {
                tracing::warn!(
                    count = t.dev_only.len(),
                    "dev-only commands skipped: no development guild configured"
                );
            }
            None => {}
        }

        Self { calls }
    }

    /// Run every call in order, stopping at the first failure.
    pub async fn execute(&self, port: &dyn RegistrationPort, app: ApplicationId) -> Result<()> {
        for call in &self.calls {
            let res = match call {
                RegistrationCall::Guild { guild, payload } => {
                    port.register_guild_commands(app, *guild, payload).await
                }
                RegistrationCall::Global { payload } => {
                    port.register_global_commands(app, payload).await
                }
            };
            if let Err(e) = res {
                tracing::error!(?call, "command registration failed: {e}");
                return Err(e);
            }
        }
        tracing::info!(calls = self.calls.len(), "commands registered");
        Ok(())
    }
}
