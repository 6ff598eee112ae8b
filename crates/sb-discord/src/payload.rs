//! serenity model <-> core model.

use serde::Deserialize;
use serde_json::{json, Value};
use serenity::{
    builder::{
        CreateActionRow, CreateAutocompleteResponse, CreateButton, CreateEmbed, CreateEmbedFooter,
        CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateSelectMenu,
        CreateSelectMenuKind, CreateSelectMenuOption, EditInteractionResponse,
    },
    model::{
        application::{
            ButtonStyle as DiscordButtonStyle, CommandDataOption, CommandDataOptionValue,
            CommandInteraction, CommandType, ComponentInteraction, ComponentInteractionDataKind,
            Interaction as DiscordInteraction,
        },
        guild::Member as DiscordMember,
        id::ApplicationId as DiscordApplicationId,
        user::User as DiscordUser,
    },
};

use sb_core::{
    domain::{ApplicationId, ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId},
    handler::GatewayEvent,
    interaction::{CommandData, ComponentData, Interaction, InteractionKind, Member, User},
    messaging::types::{
        ActionRow, AutocompleteChoice, Button, ButtonStyle, Component, Embed, Reply,
    },
    Result,
};

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Value,
}

#[derive(Deserialize)]
struct ReadyData {
    application: ReadyApplication,
}

#[derive(Deserialize)]
struct ReadyApplication {
    id: DiscordApplicationId,
}

/// Decode one gateway frame. Events the core does not consume yield `None`.
pub fn decode_frame(line: &str) -> Result<Option<GatewayEvent>> {
    let frame: Frame = serde_json::from_str(line)?;
    match frame.t.as_deref() {
        Some("READY") => {
            let ready: ReadyData = serde_json::from_value(frame.d)?;
            Ok(Some(GatewayEvent::Ready {
                application_id: ApplicationId(ready.application.id.get()),
            }))
        }
        Some("INTERACTION_CREATE") => {
            let interaction: DiscordInteraction = serde_json::from_value(frame.d)?;
            Ok(to_core(interaction).map(GatewayEvent::Interaction))
        }
        _ => Ok(None),
    }
}

/// Fields every routed interaction variant shares.
macro_rules! base_interaction {
    ($i:expr, $kind:expr) => {
        Interaction {
            id: InteractionId($i.id.get()),
            application_id: ApplicationId($i.application_id.get()),
            token: $i.token.clone(),
            kind: $kind,
            guild_id: $i.guild_id.map(|g| GuildId(g.get())),
            channel_id: Some(ChannelId($i.channel_id.get())),
            user: user(&$i.user),
            member: $i.member.as_ref().map(|m| member(m)),
            command: None,
            component: None,
        }
    };
}

/// Map a serenity interaction onto the core model. Pings and kinds the core
/// does not route yield `None`.
pub fn to_core(interaction: DiscordInteraction) -> Option<Interaction> {
    match interaction {
        DiscordInteraction::Command(cmd) => {
            let kind = match cmd.data.kind {
                CommandType::User | CommandType::Message => InteractionKind::ContextMenu,
                _ => InteractionKind::Command,
            };
            Some(command(&cmd, kind))
        }
        DiscordInteraction::Autocomplete(cmd) => {
            Some(command(&cmd, InteractionKind::Autocomplete))
        }
        DiscordInteraction::Component(c) => Some(component(&c)),
        DiscordInteraction::Modal(m) => Some(base_interaction!(m, InteractionKind::ModalSubmit)),
        _ => {
            tracing::debug!("ignoring ping or unknown interaction");
            None
        }
    }
}

fn user(u: &DiscordUser) -> User {
    User {
        id: UserId(u.id.get()),
        username: u.name.clone(),
    }
}

fn member(m: &DiscordMember) -> Member {
    Member {
        roles: m.roles.iter().map(|r| RoleId(r.get())).collect(),
        permissions: m.permissions.unwrap_or_default(),
    }
}

fn command(cmd: &CommandInteraction, kind: InteractionKind) -> Interaction {
    let mut out = base_interaction!(cmd, kind);
    out.command = Some(command_data(&cmd.data.name, &cmd.data.options));
    out
}

/// Flatten `group > subcommand > options` into the core's name path.
fn command_data(name: &str, options: &[CommandDataOption]) -> CommandData {
    let mut out = CommandData {
        name: name.to_string(),
        ..CommandData::default()
    };

    let mut opts = options;
    if let Some(CommandDataOption {
        name,
        value: CommandDataOptionValue::SubCommandGroup(inner),
        ..
    }) = opts.first()
    {
        out.subcommand_group = Some(name.clone());
        opts = inner;
    }
    if let Some(CommandDataOption {
        name,
        value: CommandDataOptionValue::SubCommand(inner),
        ..
    }) = opts.first()
    {
        out.subcommand = Some(name.clone());
        opts = inner;
    }

    for o in opts {
        if matches!(o.value, CommandDataOptionValue::Autocomplete { .. }) {
            out.focused = Some(o.name.clone());
        }
        out.options.insert(o.name.clone(), option_value(&o.value));
    }
    out
}

/// Leaf option values as JSON; ids become their decimal strings.
fn option_value(value: &CommandDataOptionValue) -> Value {
    match value {
        CommandDataOptionValue::Autocomplete { value, .. }
        | CommandDataOptionValue::String(value) => json!(value),
        CommandDataOptionValue::Boolean(b) => json!(b),
        CommandDataOptionValue::Integer(n) => json!(n),
        CommandDataOptionValue::Number(n) => json!(n),
        CommandDataOptionValue::User(id) => json!(id.get().to_string()),
        CommandDataOptionValue::Role(id) => json!(id.get().to_string()),
        CommandDataOptionValue::Channel(id) => json!(id.get().to_string()),
        CommandDataOptionValue::Mentionable(id) => json!(id.get().to_string()),
        CommandDataOptionValue::Attachment(id) => json!(id.get().to_string()),
        _ => Value::Null,
    }
}

fn component(c: &ComponentInteraction) -> Interaction {
    let (kind, values) = match &c.data.kind {
        ComponentInteractionDataKind::Button => (InteractionKind::Button, Vec::new()),
        ComponentInteractionDataKind::StringSelect { values } => {
            (InteractionKind::SelectMenu, values.clone())
        }
        ComponentInteractionDataKind::UserSelect { values } => (
            InteractionKind::SelectMenu,
            values.iter().map(|v| v.get().to_string()).collect(),
        ),
        ComponentInteractionDataKind::RoleSelect { values } => (
            InteractionKind::SelectMenu,
            values.iter().map(|v| v.get().to_string()).collect(),
        ),
        ComponentInteractionDataKind::ChannelSelect { values } => (
            InteractionKind::SelectMenu,
            values.iter().map(|v| v.get().to_string()).collect(),
        ),
        _ => (InteractionKind::SelectMenu, Vec::new()),
    };

    let mut out = base_interaction!(c, kind);
    out.component = Some(ComponentData {
        custom_id: c.data.custom_id.clone(),
        values,
        message_id: MessageId(c.message.id.get()),
    });
    out
}

/// Body of a reply or a component update.
pub fn response_message(reply: &Reply) -> CreateInteractionResponseMessage {
    let mut msg = CreateInteractionResponseMessage::new();
    if let Some(content) = &reply.content {
        msg = msg.content(content);
    }
    if reply.is_ephemeral() {
        msg = msg.ephemeral(true);
    }
    if !reply.embeds.is_empty() {
        msg = msg.embeds(reply.embeds.iter().map(embed).collect());
    }
    if !reply.components.is_empty() {
        msg = msg.components(action_rows(&reply.components));
    }
    msg
}

pub fn followup_message(reply: &Reply) -> CreateInteractionResponseFollowup {
    let mut msg = CreateInteractionResponseFollowup::new();
    if let Some(content) = &reply.content {
        msg = msg.content(content);
    }
    if reply.is_ephemeral() {
        msg = msg.ephemeral(true);
    }
    if !reply.embeds.is_empty() {
        msg = msg.embeds(reply.embeds.iter().map(embed).collect());
    }
    if !reply.components.is_empty() {
        msg = msg.components(action_rows(&reply.components));
    }
    msg
}

/// Edits cannot change visibility; `ephemeral` is ignored.
pub fn edit_response(reply: &Reply) -> EditInteractionResponse {
    let mut msg = EditInteractionResponse::new();
    if let Some(content) = &reply.content {
        msg = msg.content(content);
    }
    if !reply.embeds.is_empty() {
        msg = msg.embeds(reply.embeds.iter().map(embed).collect());
    }
    if !reply.components.is_empty() {
        msg = msg.components(action_rows(&reply.components));
    }
    msg
}

pub fn autocomplete_response(choices: &[AutocompleteChoice]) -> CreateAutocompleteResponse {
    choices
        .iter()
        .fold(CreateAutocompleteResponse::new(), |resp, choice| {
            let name = choice.name.as_str();
            match &choice.value {
                Value::Number(n) => match n.as_i64() {
                    Some(i) => resp.add_int_choice(name, i),
                    None => resp.add_number_choice(name, n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => resp.add_string_choice(name, s),
                other => resp.add_string_choice(name, other.to_string()),
            }
        })
}

fn embed(e: &Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new();
    if let Some(title) = &e.title {
        out = out.title(title);
    }
    if let Some(description) = &e.description {
        out = out.description(description);
    }
    if let Some(url) = &e.url {
        out = out.url(url);
    }
    if let Some(color) = e.color {
        out = out.colour(color);
    }
    for f in &e.fields {
        out = out.field(&f.name, &f.value, f.inline);
    }
    if let Some(footer) = &e.footer {
        out = out.footer(CreateEmbedFooter::new(&footer.text));
    }
    out
}

/// A row holding a select menu renders as that menu; otherwise as its buttons.
fn action_rows(rows: &[ActionRow]) -> Vec<CreateActionRow> {
    rows.iter()
        .filter_map(|row| {
            let menu = row.components.iter().find_map(|c| match c {
                Component::SelectMenu(m) => Some(m),
                Component::Button(_) => None,
            });
            if let Some(menu) = menu {
                let options = menu
                    .options
                    .iter()
                    .map(|o| {
                        let mut opt = CreateSelectMenuOption::new(&o.label, &o.value);
                        if let Some(d) = &o.description {
                            opt = opt.description(d);
                        }
                        opt
                    })
                    .collect();
                let mut select = CreateSelectMenu::new(
                    &menu.custom_id,
                    CreateSelectMenuKind::String { options },
                );
                if let Some(p) = &menu.placeholder {
                    select = select.placeholder(p);
                }
                return Some(CreateActionRow::SelectMenu(select));
            }

            let buttons: Vec<CreateButton> = row
                .components
                .iter()
                .filter_map(|c| match c {
                    Component::Button(b) => Some(button(b)),
                    Component::SelectMenu(_) => None,
                })
                .collect();
            (!buttons.is_empty()).then_some(CreateActionRow::Buttons(buttons))
        })
        .collect()
}

fn button(b: &Button) -> CreateButton {
    let style = match b.style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    CreateButton::new(&b.custom_id)
        .label(&b.label)
        .style(style)
        .disabled(b.disabled)
}
