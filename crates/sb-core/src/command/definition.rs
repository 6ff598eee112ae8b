//! Command definitions and where they come from.
//!
//! A definition source lists definition files below a root and loads each one
//! into a mutable [`CommandDef`]. The tree builder links and freezes them.
//!
//! The shipped source, [`FsDefinitionSource`], reads JSON manifests:
//!
//! ```json
//! { "name": "kick", "description": "Kick a member",
//!   "permissions": ["KICK_MEMBERS"], "opPerms": ["kick"],
//!   "guildOnly": true, "ephemeral": true, "handler": "admin/kick",
//!   "options": [{ "type": 6, "name": "user", "description": "Who", "required": true }] }
//! ```
//!
//! Each directory that contains commands needs a `__mod.json` group
//! descriptor with the same fields (minus `handler`).

use std::{
    collections::{BTreeMap, HashMap},
    fmt, fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    command::node::{AutocompleteHandler, CommandHandler},
    errors::Error,
    permissions::{self, Permissions},
    Result,
};

/// Reserved file name of a directory's group descriptor.
pub const GROUP_DESCRIPTOR: &str = "__mod.json";

const DEFINITION_EXTENSION: &str = "json";

/// A loaded, not yet linked command or group.
#[derive(Clone, Default)]
pub struct CommandDef {
    pub name: String,
    pub description: Option<String>,
    pub node_type: Option<u8>,
    pub permissions: Option<Permissions>,
    pub op_perms: Option<Vec<String>>,
    pub guild_only: Option<bool>,
    pub ephemeral: Option<bool>,
    pub owner_only: bool,
    pub dev_only: bool,
    pub options: Vec<Value>,
    pub execute: Option<Arc<dyn CommandHandler>>,
    pub auto: Option<Arc<dyn AutocompleteHandler>>,
    pub children: BTreeMap<String, CommandDef>,
}

impl CommandDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_group(&self) -> bool {
        self.execute.is_none()
    }

    /// Fill unset `permissions`, `opPerms` and `guildOnly` from `group`.
    pub fn inherit_from(&mut self, group: &CommandDef) {
        if self.permissions.is_none() {
            self.permissions = group.permissions;
        }
        if self.op_perms.is_none() {
            self.op_perms = group.op_perms.clone();
        }
        if self.guild_only.is_none() {
            self.guild_only = group.guild_only;
        }
    }
}

impl fmt::Debug for CommandDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("permissions", &self.permissions)
            .field("op_perms", &self.op_perms)
            .field("guild_only", &self.guild_only)
            .field("ephemeral", &self.ephemeral)
            .field("owner_only", &self.owner_only)
            .field("dev_only", &self.dev_only)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("execute", &self.execute.is_some())
            .field("auto", &self.auto.is_some())
            .finish()
    }
}

/// Where command definitions come from.
pub trait DefinitionSource: Send + Sync {
    /// Root-relative paths of every definition file, group descriptors included.
    fn list_all_files(&self) -> Result<Vec<PathBuf>>;

    /// Load the command defined by the file at `rel`.
    fn load_command(&self, rel: &Path) -> Result<CommandDef>;

    /// Load the group described by the descriptor in directory `rel_dir`.
    fn load_group(&self, rel_dir: &Path) -> Result<CommandDef>;
}

/// Named handlers that manifests refer to.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    autocompletes: HashMap<String, Arc<dyn AutocompleteHandler>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.insert(key.into(), handler);
        self
    }

    pub fn with_autocomplete(
        mut self,
        key: impl Into<String>,
        handler: Arc<dyn AutocompleteHandler>,
    ) -> Self {
        self.autocompletes.insert(key.into(), handler);
        self
    }

    pub fn command(&self, key: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(key).cloned()
    }

    pub fn autocomplete(&self, key: &str) -> Option<Arc<dyn AutocompleteHandler>> {
        self.autocompletes.get(key).cloned()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    node_type: Option<u8>,
    #[serde(default, deserialize_with = "permissions::deserialize_names")]
    permissions: Option<Permissions>,
    #[serde(default)]
    op_perms: Option<Vec<String>>,
    #[serde(default)]
    guild_only: Option<bool>,
    #[serde(default)]
    ephemeral: Option<bool>,
    #[serde(default)]
    owner_only: bool,
    #[serde(default)]
    dev_only: bool,
    #[serde(default)]
    options: Vec<Value>,
    #[serde(default)]
    handler: Option<String>,
    #[serde(default)]
    autocomplete: Option<String>,
}

impl Manifest {
    fn into_def(self, name: String) -> CommandDef {
        CommandDef {
            name,
            description: self.description,
            node_type: self.node_type,
            permissions: self.permissions,
            op_perms: self.op_perms,
            guild_only: self.guild_only,
            ephemeral: self.ephemeral,
            owner_only: self.owner_only,
            dev_only: self.dev_only,
            options: self.options,
            execute: None,
            auto: None,
            children: BTreeMap::new(),
        }
    }
}

/// JSON manifests on disk, bound to handlers from a [`HandlerCatalog`].
///
/// Files are re-read on every call, so rebuilding the tree picks up edits.
pub struct FsDefinitionSource {
    root: PathBuf,
    catalog: Arc<HandlerCatalog>,
}

impl FsDefinitionSource {
    pub fn new(root: impl Into<PathBuf>, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let txt = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::definition(path, "file not found"),
            _ => Error::Io(e),
        })?;
        serde_json::from_str(&txt).map_err(|e| Error::definition(path, e.to_string()))
    }
}

impl DefinitionSource for FsDefinitionSource {
    fn list_all_files(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        walk(&self.root, Path::new(""), &mut out)?;
        out.sort();
        Ok(out)
    }

    fn load_command(&self, rel: &Path) -> Result<CommandDef> {
        let path = self.root.join(rel);
        let manifest = self.read_manifest(&path)?;

        let stem = rel.with_extension("");
        let default_name = stem
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let default_key = path_key(&stem);

        let handler_key = manifest.handler.clone().unwrap_or(default_key);
        let auto_key = manifest.autocomplete.clone();
        let name = manifest.name.clone().unwrap_or(default_name);

        let mut def = manifest.into_def(name);
        def.execute = Some(self.catalog.command(&handler_key).ok_or_else(|| {
            Error::definition(&path, format!("unknown handler {handler_key:?}"))
        })?);
        if let Some(key) = auto_key {
            def.auto = Some(self.catalog.autocomplete(&key).ok_or_else(|| {
                Error::definition(&path, format!("unknown autocomplete handler {key:?}"))
            })?);
        }
        Ok(def)
    }

    fn load_group(&self, rel_dir: &Path) -> Result<CommandDef> {
        let path = self.root.join(rel_dir).join(GROUP_DESCRIPTOR);
        if !path.is_file() {
            return Err(Error::definition(&path, "missing group descriptor"));
        }
        let manifest = self.read_manifest(&path)?;
        if manifest.handler.is_some() {
            return Err(Error::definition(
                &path,
                "group descriptors cannot name a handler",
            ));
        }

        let dir_name = rel_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let name = manifest.name.clone().unwrap_or(dir_name);
        Ok(manifest.into_def(name))
    }
}

fn walk(root: &Path, rel: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for ent in fs::read_dir(root.join(rel))? {
        let ent = ent?;
        let child = rel.join(ent.file_name());
        let ft = ent.file_type()?;
        if ft.is_dir() {
            walk(root, &child, out)?;
        } else if child.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXTENSION) {
            out.push(child);
        }
    }
    Ok(())
}

/// `admin/kick` style key for a root-relative path without extension.
fn path_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
