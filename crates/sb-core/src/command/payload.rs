//! Platform registration schema for built commands.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::command::node::CommandNode;

const SUBCOMMAND: u8 = 1;
const SUBCOMMAND_GROUP: u8 = 2;
const CHAT_INPUT: u8 = 1;

/// Registration payloads, split by audience.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transmission {
    /// Everything not flagged dev-only.
    pub commands: Vec<Value>,
    /// Top-level commands registered only to the development guild.
    pub dev_only: Vec<Value>,
}

impl Transmission {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.dev_only.is_empty()
    }

    /// Every payload, dev-only last.
    pub fn all(&self) -> Vec<Value> {
        self.commands.iter().chain(&self.dev_only).cloned().collect()
    }
}

pub fn transmission<'a>(nodes: impl IntoIterator<Item = &'a Arc<CommandNode>>) -> Transmission {
    let mut out = Transmission::default();
    for node in nodes {
        let payload = transform(node);
        if node.dev_only {
            out.dev_only.push(payload);
        } else {
            out.commands.push(payload);
        }
    }
    out
}

/// Top-level command -> registration object.
pub fn transform(node: &CommandNode) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(node.name));
    obj.insert("type".into(), json!(node.node_type));
    if node.node_type == CHAT_INPUT {
        obj.insert("description".into(), json!(node.description));
        obj.insert("options".into(), Value::Array(options_of(node)));
    }
    obj.insert("dm_permission".into(), json!(!node.is_guild_only()));
    Value::Object(obj)
}

fn options_of(node: &CommandNode) -> Vec<Value> {
    if node.is_group() {
        node.subcommands.values().map(|c| transform_child(c)).collect()
    } else {
        node.options.clone()
    }
}

fn transform_child(node: &CommandNode) -> Value {
    let kind = if node.is_group() {
        SUBCOMMAND_GROUP
    } else {
        SUBCOMMAND
    };
    json!({
        "type": kind,
        "name": node.name,
        "description": node.description,
        "options": options_of(node),
    })
}
