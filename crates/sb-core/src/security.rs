use crate::{
    command::node::CommandNode,
    domain::UserId,
    interaction::{Member, User},
    permissions,
    ports::{GuildConfig, OppedConfig},
};

/// Outcome of a permission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allowed,
    OwnerOnly,
    GuildOnly,
    MissingPermissions,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allowed
    }

    /// Text shown (ephemerally) to a denied user.
    pub fn denial_message(self) -> Option<&'static str> {
        match self {
            Access::Allowed => None,
            Access::GuildOnly => Some("That command is guild only!"),
            Access::OwnerOnly | Access::MissingPermissions => {
                Some("You don't have permission to use this command!")
            }
        }
    }
}

/// The invoking user as the evaluator sees them.
#[derive(Clone, Copy, Debug)]
pub struct Invoker<'a> {
    pub user: &'a User,
    pub member: Option<&'a Member>,
}

/// Decide whether `invoker` may run `node`. First matching rule wins.
pub fn check(
    node: &CommandNode,
    invoker: Invoker<'_>,
    owner: Option<UserId>,
    cfg: Option<&GuildConfig>,
) -> Access {
    if node.owner_only && owner != Some(invoker.user.id) {
        return Access::OwnerOnly;
    }
    if node.is_guild_only() && invoker.member.is_none() {
        return Access::GuildOnly;
    }

    let required = match node.permissions {
        Some(perms) if !perms.is_empty() => perms,
        _ => return Access::Allowed, // no perms also means no opPerms
    };

    if let Some(member) = invoker.member {
        if permissions::has_all(member.permissions, required) {
            return Access::Allowed;
        }
    }

    let found = cfg.and_then(|c| find_opped(invoker, &c.opped));
    if let (Some(granted), Some(op_perms)) = (found, node.op_perms.as_deref()) {
        if op_perms.iter().all(|p| granted.iter().any(|g| g == p)) {
            return Access::Allowed;
        }
    }

    Access::MissingPermissions
}

/// Boolean projection of [`check`].
pub fn evaluate(
    node: &CommandNode,
    invoker: Invoker<'_>,
    owner: Option<UserId>,
    cfg: Option<&GuildConfig>,
) -> bool {
    check(node, invoker, owner, cfg).is_allowed()
}

/// Operator grant for the invoker: exact user match first, then the first
/// configured role the invoker holds. No merging across matches.
fn find_opped<'c>(invoker: Invoker<'_>, opped: &'c OppedConfig) -> Option<&'c [String]> {
    if let Some(u) = opped.users.iter().find(|u| u.id == invoker.user.id) {
        return Some(&u.perms);
    }

    let member = invoker.member?;
    opped
        .roles
        .iter()
        .find(|r| member.has_role(r.id))
        .map(|r| r.perms.as_slice())
}
