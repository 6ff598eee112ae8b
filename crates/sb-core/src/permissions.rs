//! Platform permission flags.
//!
//! Manifests list flags in the platform's SCREAMING_SNAKE_CASE spelling
//! (`"permissions": ["KICK_MEMBERS"]`). They fold into serenity's
//! [`Permissions`] bitflags, the same type that carries a member's
//! effective permissions.

use serde::{Deserialize, Deserializer};

pub use serenity::model::permissions::Permissions;

/// Fold flag names into one set. Unknown names are an error.
pub fn from_names<I, S>(names: I) -> Result<Permissions, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .try_fold(Permissions::empty(), |acc, name| {
            let name = name.as_ref();
            Permissions::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| format!("unknown permission flag {name:?}"))
        })
}

/// Whether `granted` covers every flag in `required`. `ADMINISTRATOR` grants everything.
pub fn has_all(granted: Permissions, required: Permissions) -> bool {
    granted.contains(Permissions::ADMINISTRATOR) || granted.contains(required)
}

/// Serde adapter for an optional list of flag names.
pub(crate) fn deserialize_names<'de, D>(deserializer: D) -> Result<Option<Permissions>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(names) = Option::<Vec<String>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    from_names(names).map(Some).map_err(serde::de::Error::custom)
}
