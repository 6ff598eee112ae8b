use std::{
    collections::{btree_map::Entry, BTreeMap},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use crate::{
    command::{
        definition::{CommandDef, DefinitionSource, GROUP_DESCRIPTOR},
        node::{CommandNode, NodeKind},
        payload::{self, Transmission},
    },
    errors::Error,
    Result,
};

/// Deepest supported nesting: command > group > subcommand.
const MAX_GROUP_DEPTH: usize = 2;

/// Built command tree: top-level name -> frozen node.
#[derive(Clone, Debug, Default)]
pub struct CommandTree {
    commands: BTreeMap<String, Arc<CommandNode>>,
}

impl CommandTree {
    pub fn get(&self, name: &str) -> Option<&Arc<CommandNode>> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandNode>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registration payloads for every top-level command.
    pub fn transmission(&self) -> Transmission {
        payload::transmission(self.iter())
    }
}

/// Build the whole tree from `source`.
///
/// Group descriptors are loaded lazily, the first time a command below them
/// is seen, and are re-read on every build.
pub fn build_tree(source: &dyn DefinitionSource) -> Result<CommandTree> {
    let mut roots: BTreeMap<String, CommandDef> = BTreeMap::new();

    for rel in source.list_all_files()? {
        let Some(file_name) = rel.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if file_name == GROUP_DESCRIPTOR {
            continue; // only instantiated when a command exists below it
        }

        let groups = group_path(&rel);
        if groups.len() > MAX_GROUP_DEPTH {
            return Err(Error::definition(
                &rel,
                "nested deeper than command > group > subcommand",
            ));
        }

        let mut command = source.load_command(&rel)?;
        if command.execute.is_none() {
            return Err(Error::definition(&rel, "command has no handler"));
        }

        if groups.is_empty() {
            attach(&mut roots, command, &rel)?;
            continue;
        }

        let mut dir = PathBuf::new();
        let group = descend(source, &mut roots, &mut dir, &groups)?;
        command.inherit_from(group);
        attach(&mut group.children, command, &rel)?;
    }

    let commands = roots
        .into_iter()
        .map(|(name, def)| (name, freeze(def, 0)))
        .collect();
    Ok(CommandTree { commands })
}

fn group_path(rel: &Path) -> Vec<String> {
    rel.parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => s.to_str().map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Walk (creating as needed) the group chain for `segs`, returning the deepest group.
fn descend<'a>(
    source: &dyn DefinitionSource,
    level: &'a mut BTreeMap<String, CommandDef>,
    dir: &mut PathBuf,
    segs: &[String],
) -> Result<&'a mut CommandDef> {
    let Some((seg, rest)) = segs.split_first() else {
        return Err(Error::definition(dir.clone(), "empty group path"));
    };
    dir.push(seg);

    let group = match level.entry(seg.clone()) {
        Entry::Occupied(e) => e.into_mut(),
        Entry::Vacant(e) => e.insert(load_group(source, dir, seg)?),
    };
    if !group.is_group() {
        return Err(Error::definition(
            dir.clone(),
            format!("{seg:?} is both a command and a group"),
        ));
    }

    if rest.is_empty() {
        Ok(group)
    } else {
        descend(source, &mut group.children, dir, rest)
    }
}

fn load_group(source: &dyn DefinitionSource, dir: &Path, seg: &str) -> Result<CommandDef> {
    let mut group = source.load_group(dir)?;
    if group.name != seg {
        return Err(Error::definition(
            dir.join(GROUP_DESCRIPTOR),
            format!("group name {:?} does not match directory {seg:?}", group.name),
        ));
    }
    if group.execute.is_some() {
        return Err(Error::definition(
            dir.join(GROUP_DESCRIPTOR),
            "groups cannot be executable",
        ));
    }
    group.node_type.get_or_insert(1);
    Ok(group)
}

fn attach(level: &mut BTreeMap<String, CommandDef>, def: CommandDef, rel: &Path) -> Result<()> {
    match level.entry(def.name.clone()) {
        Entry::Occupied(_) => Err(Error::definition(
            rel,
            format!("duplicate command name {:?}", def.name),
        )),
        Entry::Vacant(e) => {
            e.insert(def);
            Ok(())
        }
    }
}

/// Children are frozen before their parent, so every attached node is complete.
fn freeze(def: CommandDef, depth: usize) -> Arc<CommandNode> {
    let kind = if depth == 0 {
        NodeKind::TopLevel
    } else if def.is_group() {
        NodeKind::Group
    } else {
        NodeKind::Subcommand
    };

    let subcommands = def
        .children
        .into_iter()
        .map(|(name, child)| (name, freeze(child, depth + 1)))
        .collect();

    Arc::new(CommandNode {
        description: def.description.unwrap_or_else(|| def.name.clone()),
        name: def.name,
        kind,
        node_type: def.node_type.unwrap_or(1),
        permissions: def.permissions,
        op_perms: def.op_perms,
        guild_only: def.guild_only,
        ephemeral: def.ephemeral,
        owner_only: def.owner_only,
        dev_only: def.dev_only,
        options: def.options,
        subcommands,
        execute: def.execute,
        auto: def.auto,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{definition::FsDefinitionSource, node::handler_fn, HandlerCatalog},
        interaction::InteractionContext,
        permissions::Permissions,
        response::CommandOutput,
        test_support::{command, scratch_dir, write_file, RecordingResponder},
    };
    use std::fs;

    fn catalog() -> Arc<HandlerCatalog> {
        let pong = handler_fn(|_ctx| async { Ok(CommandOutput::Text("pong".to_string())) });
        let noop = handler_fn(|_ctx| async { Ok(CommandOutput::NoReply) });
        Arc::new(
            HandlerCatalog::new()
                .with_command("ping", pong)
                .with_command("admin/kick", noop.clone())
                .with_command("admin/ban", noop.clone())
                .with_command("admin/roles/add", noop.clone())
                .with_command("a/b/c/deep", noop),
        )
    }

    fn fixture(tag: &str) -> PathBuf {
        let root = scratch_dir(tag);
        write_file(&root, "ping.json", r#"{"description":"Ping the bot"}"#);
        write_file(
            &root,
            "admin/__mod.json",
            r#"{"description":"Moderation","permissions":["BAN_MEMBERS"],"opPerms":["mod"],"guildOnly":true}"#,
        );
        write_file(&root, "admin/kick.json", r#"{"permissions":["KICK_MEMBERS"]}"#);
        write_file(&root, "admin/ban.json", "{}");
        write_file(&root, "admin/roles/__mod.json", r#"{"description":"Role tools"}"#);
        write_file(&root, "admin/roles/add.json", "{}");
        root
    }

    #[tokio::test]
    async fn builds_ping_and_admin_kick() {
        let root = fixture("e2e");
        let tree = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap();

        let ping = tree.get("ping").unwrap();
        assert_eq!(ping.kind, NodeKind::TopLevel);
        let ctx = InteractionContext::new(command(1, &["ping"]), RecordingResponder::new());
        let out = ping.execute.as_ref().unwrap().execute(ctx).await.unwrap();
        assert_eq!(out, CommandOutput::Text("pong".to_string()));

        let kick = tree.get("admin").unwrap().subcommand("kick").unwrap();
        assert_eq!(kick.permissions, Some(Permissions::KICK_MEMBERS));
        assert_eq!(kick.kind, NodeKind::Subcommand);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn group_chain_matches_path_segments() {
        let root = fixture("chain");
        let tree = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap();

        let admin = tree.get("admin").unwrap();
        assert_eq!(admin.name, "admin");
        assert!(admin.is_group());
        assert_eq!(admin.node_type, 1);

        let roles = admin.subcommand("roles").unwrap();
        assert_eq!(roles.name, "roles");
        assert_eq!(roles.kind, NodeKind::Group);
        assert_eq!(roles.node_type, 1);

        let add = roles.subcommand("add").unwrap();
        assert!(add.execute.is_some());
        assert!(add.subcommands.is_empty());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn commands_inherit_from_nearest_group_only() {
        let root = fixture("inherit");
        let tree = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap();
        let admin = tree.get("admin").unwrap();

        // kick set its own permissions; the rest comes from admin.
        let kick = admin.subcommand("kick").unwrap();
        assert_eq!(kick.permissions, Some(Permissions::KICK_MEMBERS));
        assert_eq!(kick.op_perms, Some(vec!["mod".to_string()]));
        assert_eq!(kick.guild_only, Some(true));

        let ban = admin.subcommand("ban").unwrap();
        assert_eq!(ban.permissions, Some(Permissions::BAN_MEMBERS));

        // roles/add inherits from roles, which declares nothing; admin's values
        // do not propagate through it.
        let add = admin.subcommand("roles").unwrap().subcommand("add").unwrap();
        assert_eq!(add.permissions, None);
        assert_eq!(add.op_perms, None);
        assert_eq!(add.guild_only, None);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn inheritance_is_copied_at_build_time() {
        let root = fixture("copy");
        let src = FsDefinitionSource::new(&root, catalog());
        let before = build_tree(&src).unwrap();

        write_file(
            &root,
            "admin/__mod.json",
            r#"{"permissions":["ADMINISTRATOR"]}"#,
        );
        let after = build_tree(&src).unwrap();

        let ban_before = before.get("admin").unwrap().subcommand("ban").unwrap();
        assert_eq!(ban_before.permissions, Some(Permissions::BAN_MEMBERS));
        let ban_after = after.get("admin").unwrap().subcommand("ban").unwrap();
        assert_eq!(ban_after.permissions, Some(Permissions::ADMINISTRATOR));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn descriptor_without_commands_is_not_instantiated() {
        let root = scratch_dir("lonely");
        write_file(&root, "ping.json", "{}");
        write_file(&root, "empty/__mod.json", "{}");
        let tree = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.get("empty").is_none());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_intermediate_descriptor_is_fatal() {
        let root = scratch_dir("missing");
        write_file(&root, "admin/__mod.json", "{}");
        write_file(&root, "admin/roles/add.json", "{}");
        let err = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap_err();
        assert!(err.to_string().contains("missing group descriptor"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn mismatched_group_name_is_rejected() {
        let root = scratch_dir("mismatch");
        write_file(&root, "admin/__mod.json", r#"{"name":"moderation"}"#);
        write_file(&root, "admin/kick.json", "{}");
        let err = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn too_deep_nesting_is_rejected() {
        let root = scratch_dir("deep");
        write_file(&root, "a/__mod.json", "{}");
        write_file(&root, "a/b/__mod.json", "{}");
        write_file(&root, "a/b/c/__mod.json", "{}");
        write_file(&root, "a/b/c/deep.json", "{}");
        let err = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn command_shadowing_a_group_is_rejected() {
        let root = scratch_dir("shadow");
        write_file(&root, "admin.json", r#"{"handler":"ping"}"#);
        write_file(&root, "admin/__mod.json", "{}");
        write_file(&root, "admin/kick.json", "{}");
        let err = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap_err();
        assert!(matches!(err, Error::Definition { .. }));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn duplicate_sibling_names_are_rejected() {
        let root = scratch_dir("dupe");
        write_file(&root, "ping.json", "{}");
        write_file(&root, "pong.json", r#"{"name":"ping","handler":"ping"}"#);
        let err = build_tree(&FsDefinitionSource::new(&root, catalog())).unwrap_err();
        assert!(err.to_string().contains("duplicate command name"));

        let _ = fs::remove_dir_all(&root);
    }
}
