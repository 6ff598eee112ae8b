use std::sync::Arc;

use crate::{
    command::{builder::CommandTree, node::CommandNode},
    interaction::Interaction,
};

/// The most specific node an interaction names, plus its qualified name.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub node: Arc<CommandNode>,
    /// Space-joined visited names, e.g. `"admin roles add"`.
    pub long: String,
}

pub fn resolve(tree: &CommandTree, interaction: &Interaction) -> Option<Resolved> {
    resolve_path(
        tree,
        interaction.command_name()?,
        interaction.subcommand_group(),
        interaction.subcommand(),
    )
}

/// Walk command > group > subcommand. Any missing segment yields `None`,
/// as does a group given without a subcommand.
pub fn resolve_path(
    tree: &CommandTree,
    name: &str,
    group: Option<&str>,
    sub: Option<&str>,
) -> Option<Resolved> {
    let mut node = tree.get(name)?;
    let mut long = vec![name];

    match (group, sub) {
        (Some(g), Some(s)) => {
            node = node.subcommand(g)?;
            node = node.subcommand(s)?;
            long.extend([g, s]);
        }
        (Some(_), None) => return None,
        (None, Some(s)) => {
            node = node.subcommand(s)?;
            long.push(s);
        }
        (None, None) => {}
    }

    Some(Resolved {
        node: Arc::clone(node),
        long: long.join(" "),
    })
}
