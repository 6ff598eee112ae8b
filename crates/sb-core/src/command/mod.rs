//! Command tree: definitions, building, resolution and platform payloads.

pub mod builder;
pub mod definition;
pub mod node;
pub mod payload;
pub mod registration;
pub mod resolver;

pub use builder::{build_tree, CommandTree};
pub use definition::{CommandDef, DefinitionSource, FsDefinitionSource, HandlerCatalog};
pub use node::{
    autocomplete_fn, handler_fn, AutocompleteHandler, CommandHandler, CommandNode, NodeKind,
};
pub use payload::Transmission;
pub use registration::{RegistrationCall, RegistrationPlan};
pub use resolver::{resolve, Resolved};
