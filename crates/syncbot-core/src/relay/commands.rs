//! Command Router
//!
//! Classifies inbound text as a command or a plain message and runs sync-mode
//! (`!update`, `!link`) and admin-mode (`!pause`, `!unpause`, `!reload`)
//! commands against the relay state.

use tracing::debug;

use super::links::Link;
use super::message::InboundMessage;
use super::state::RelayState;

pub const COMMAND_PREFIX: char = '!';

const SYNC_HELP: &str = "Try one of these if you do not know what to do!
\tupdate:\tlets you update your info
\tlink:\tmanage cross platform account connections
";

const ADMIN_HELP: &str = "Try one of these if you do not know what to do!
\tpause: stops syncing messages between Discord and GroupMe
\tunpause: resumes syncing messages between Discord and GroupMe
\treload: reloads the config file and reconnects the Discord client
";

const UPDATE_HELP: &str = "Available options:
\tname: change the name that shows up on the other platform
";

const LINK_HELP: &str = "Available options:
\tinit <account> <name>:\tconnect your Discord and GroupMe accounts under one shared name
\taccept:\taccept the pending account link
\tremove:\tcancel a pending or active account link
";

/// Which command set applies, chosen by the message's origin channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    /// Per-user commands, available in the sync channel/group
    Sync,
    /// Relay-wide commands, only in the admin channel
    Admin,
}

/// Routing decision for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Not a command; relay it (unless paused).
    Relay,
    /// Consumed as a command; `reply` goes back to where it came from.
    Handled { reply: Option<String> },
}

impl RouteDecision {
    fn reply(text: impl Into<String>) -> Self {
        Self::Handled {
            reply: Some(text.into()),
        }
    }

    fn silent() -> Self {
        Self::Handled { reply: None }
    }
}

/// Split command text into command word and arguments.
///
/// Returns `None` for plain messages. The remainder is split on single
/// spaces, so `"! pause"` has an empty command word (answered with help) and
/// joining the arguments with `' '` gives back the text exactly as typed.
pub fn classify(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let mut parts = rest.split(' ').map(str::to_string);
    let command = parts.next().unwrap_or_default();
    Some((command, parts.collect()))
}

fn invalid_command(word: &str) -> String {
    format!("😫  D'oh! \"{}\" is not a valid command", word)
}

/// Route `msg` in `mode`, running the command if it is one.
pub async fn route(state: &mut RelayState, mode: CommandMode, msg: &InboundMessage) -> RouteDecision {
    let Some((command, args)) = classify(&msg.text) else {
        return RouteDecision::Relay;
    };

    debug!(
        "Handling {:?} command '{}' {:?} from {} on {}",
        mode, command, args, msg.username, msg.platform
    );

    match mode {
        CommandMode::Sync => route_sync(state, msg, &command, &args).await,
        CommandMode::Admin => route_admin(state, &command).await,
    }
}

async fn route_sync(
    state: &mut RelayState,
    msg: &InboundMessage,
    command: &str,
    args: &[String],
) -> RouteDecision {
    match command {
        "update" => cmd_update(state, msg, args),
        "link" => cmd_link(state, msg, args).await,
        "" => RouteDecision::reply(SYNC_HELP),
        other => RouteDecision::reply(invalid_command(other)),
    }
}

async fn route_admin(state: &mut RelayState, command: &str) -> RouteDecision {
    match command {
        "pause" => RouteDecision::reply(state.controller.pause().await),
        "unpause" => RouteDecision::reply(state.controller.unpause().await),
        "reload" => RouteDecision::reply(state.controller.reload().await),
        "" => RouteDecision::reply(ADMIN_HELP),
        other => RouteDecision::reply(invalid_command(other)),
    }
}

/// `!update name <words...>`
fn cmd_update(state: &mut RelayState, msg: &InboundMessage, args: &[String]) -> RouteDecision {
    let Some(option) = args.first() else {
        return RouteDecision::reply(UPDATE_HELP);
    };

    match option.as_str() {
        "name" => {
            let new_name = args[1..].join(" ");
            if new_name.trim().is_empty() {
                return RouteDecision::reply("Must specify a new name");
            }
            let old_name = state.display_name(msg);
            state.names.set_override(msg, &new_name, &mut state.links);
            RouteDecision::reply(format!("'{}' is now '{}'", old_name, new_name))
        }
        other => RouteDecision::reply(invalid_command(other)),
    }
}

/// `!link init|accept|remove`
async fn cmd_link(state: &mut RelayState, msg: &InboundMessage, args: &[String]) -> RouteDecision {
    let Some(option) = args.first() else {
        return RouteDecision::reply(LINK_HELP);
    };

    match option.as_str() {
        "init" => cmd_link_init(state, msg, &args[1..]).await,
        "accept" => cmd_link_accept(state, msg).await,
        "remove" => cmd_link_remove(state, msg).await,
        other => RouteDecision::reply(invalid_command(other)),
    }
}

async fn cmd_link_init(state: &mut RelayState, msg: &InboundMessage, args: &[String]) -> RouteDecision {
    if args.len() < 2 {
        return RouteDecision::reply("Must specify the account name to link to and the new name");
    }
    let target = &args[0];
    let shared_name = args[1..].join(" ");

    let link = Link::new(msg.platform, &msg.username, target, &shared_name);
    if let Err(conflict) = state.links.check_available(&link) {
        return RouteDecision::reply(format!(
            "'{}' already has a pending or active link",
            conflict.username
        ));
    }

    let prompt = format!(
        "Link {} to {} with name {}?",
        msg.username, target, shared_name
    );
    if !state
        .controller
        .send_or_report(msg.platform.other(), &prompt)
        .await
    {
        return RouteDecision::reply("Failed to send link request");
    }

    match state.links.init(link) {
        Ok(()) => RouteDecision::reply("Link request pending"),
        Err(conflict) => RouteDecision::reply(format!(
            "'{}' already has a pending or active link",
            conflict.username
        )),
    }
}

async fn cmd_link_accept(state: &mut RelayState, msg: &InboundMessage) -> RouteDecision {
    let Some(link) = state.links.accept(msg) else {
        return RouteDecision::reply(format!(
            "There is no link request matching username {}",
            msg.username
        ));
    };

    let text = format!(
        "Linked account {} to {}",
        link.username_for(msg.platform.other()),
        msg.username
    );
    state.controller.announce(&text).await;
    RouteDecision::silent()
}

async fn cmd_link_remove(state: &mut RelayState, msg: &InboundMessage) -> RouteDecision {
    let Some(link) = state.links.remove(msg) else {
        return RouteDecision::reply(format!(
            "There is no pending or active link matching username {}",
            msg.username
        ));
    };

    let text = format!(
        "Removed link between {} and {}",
        link.username_for(msg.platform.other()),
        msg.username
    );
    state.controller.announce(&text).await;
    RouteDecision::silent()
}
