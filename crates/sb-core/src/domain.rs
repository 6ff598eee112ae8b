use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// Platform user id.
    UserId
);
snowflake!(
    /// Guild (server) id.
    GuildId
);
snowflake!(
    /// Guild role id.
    RoleId
);
snowflake!(
    /// Channel id.
    ChannelId
);
snowflake!(
    /// Message id; pagination sessions are keyed by it.
    MessageId
);
snowflake!(
    /// Bot application id (needed for registration and webhook replies).
    ApplicationId
);
snowflake!(
    /// Interaction id.
    InteractionId
);
