use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::{GuildId, UserId},
    errors::Error,
    Result,
};

const DEFAULT_COMMAND_PATH: &str = "./commands";

/// Process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,

    // Registration targets
    pub command_guild: Option<GuildId>,
    pub dev_guild: Option<GuildId>,

    // Authorization
    pub owner_id: Option<UserId>,

    // Definitions
    pub command_path: PathBuf,

    // Platform
    /// Base URL that replaces `https://discord.com` for REST calls.
    pub discord_proxy: Option<String>,

    // Pagination
    pub pagination_timeout: Duration,
    pub pagination_sweep_interval: Duration,
}

impl Config {
    /// Read the environment, falling back to `./.env` for unset keys.
    ///
    /// The process environment is never modified.
    pub fn load() -> Result<Self> {
        let file = read_dotenv(Path::new(".env"));
        Self::from_lookup(layered(|key| env::var(key).ok(), &file))
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let bot_token = get("TOKEN")
            .ok_or_else(|| Error::Config("TOKEN environment variable is required".to_string()))?;

        let command_guild = parse_id(get("COMMAND_GUILD"), "COMMAND_GUILD")?.map(GuildId);
        let dev_guild = parse_id(get("DEV_GUILD"), "DEV_GUILD")?.map(GuildId);
        let owner_id = parse_id(get("OWNER"), "OWNER")?.map(UserId);

        let command_path = get("COMMAND_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMAND_PATH));

        let discord_proxy = get("DISCORD_PROXY").map(|s| s.trim_end_matches('/').to_string());

        let pagination_timeout =
            Duration::from_secs(parse_u64(get("PAGINATION_TIMEOUT_SECS"))?.unwrap_or(300));
        let pagination_sweep_interval =
            Duration::from_secs(parse_u64(get("PAGINATION_SWEEP_SECS"))?.unwrap_or(30).max(1));

        Ok(Self {
            bot_token,
            command_guild,
            dev_guild,
            owner_id,
            command_path,
            discord_proxy,
            pagination_timeout,
            pagination_sweep_interval,
        })
    }
}

fn parse_id(raw: Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a numeric id, got {raw:?}")))
}

fn parse_u64(raw: Option<String>) -> Result<Option<u64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("expected a number, got {raw:?}")))
}

/// Key/value pairs of a dotenv file. A missing file yields nothing.
fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let Ok(iter) = dotenvy::from_path_iter(path) else {
        return HashMap::new();
    };
    iter.filter_map(|item| match item {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!(path = %path.display(), "skipping unreadable .env entry: {e}");
            None
        }
    })
    .collect()
}

/// `primary` first, then the dotenv pairs.
fn layered<'a>(
    primary: impl Fn(&str) -> Option<String> + 'a,
    file: &'a HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| primary(key).or_else(|| file.get(key).cloned())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scratch_dir, write_file};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[("TOKEN", "   ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("TOKEN", "abc")])).unwrap();
        assert_eq!(cfg.bot_token, "abc");
        assert_eq!(cfg.command_guild, None);
        assert_eq!(cfg.dev_guild, None);
        assert_eq!(cfg.owner_id, None);
        assert_eq!(cfg.command_path, PathBuf::from("./commands"));
        assert_eq!(cfg.discord_proxy, None);
        assert_eq!(cfg.pagination_timeout, Duration::from_secs(300));
        assert_eq!(cfg.pagination_sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn parses_ids_and_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("TOKEN", "abc"),
            ("COMMAND_GUILD", "111"),
            ("DEV_GUILD", " 222 "),
            ("OWNER", "333"),
            ("COMMAND_PATH", "/srv/bot/commands"),
            ("DISCORD_PROXY", "http://localhost:8080/"),
            ("PAGINATION_TIMEOUT_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(cfg.command_guild, Some(GuildId(111)));
        assert_eq!(cfg.dev_guild, Some(GuildId(222)));
        assert_eq!(cfg.owner_id, Some(UserId(333)));
        assert_eq!(cfg.command_path, PathBuf::from("/srv/bot/commands"));
        assert_eq!(cfg.discord_proxy.as_deref(), Some("http://localhost:8080"));
        assert_eq!(cfg.pagination_timeout, Duration::from_secs(60));
    }

    #[test]
    fn dotenv_fills_only_unset_keys() {
        let dir = scratch_dir("dotenv");
        write_file(
            &dir,
            ".env",
            "# local overrides\nTOKEN=\"from-file\"\nOWNER='42'\nCOMMAND_PATH=cmds\n",
        );

        let file = read_dotenv(&dir.join(".env"));
        assert_eq!(file.get("TOKEN").map(String::as_str), Some("from-file"));
        assert_eq!(file.get("OWNER").map(String::as_str), Some("42"));

        let cfg = Config::from_lookup(layered(lookup(&[("TOKEN", "from-env")]), &file)).unwrap();
        assert_eq!(cfg.bot_token, "from-env");
        assert_eq!(cfg.owner_id, Some(UserId(42)));
        assert_eq!(cfg.command_path, PathBuf::from("cmds"));

        assert!(read_dotenv(&dir.join("missing.env")).is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = Config::from_lookup(lookup(&[("TOKEN", "abc"), ("OWNER", "me")])).unwrap_err();
        assert!(err.to_string().contains("OWNER"));
    }
}
