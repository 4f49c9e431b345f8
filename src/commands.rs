// Command parsing for the interactive shell
//
// Lines starting with `/` are commands, anything else is a message for the
// open conversation.

use crate::models::{CallDirection, CallMedium};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chats {
        query: String,
    },
    Open {
        contact_id: String,
    },
    Close,

    // To a conversation other than the open one
    Send {
        contact_id: String,
        content: String,
    },
    CreateGroup {
        name: String,
        members: Vec<String>,
    },
    RenameGroup {
        group_id: String,
        name: String,
    },
    AddMember {
        group_id: String,
        member_id: String,
    },
    RemoveMember {
        group_id: String,
        member_id: String,
    },
    LeaveGroup {
        group_id: String,
    },
    DeleteGroup {
        group_id: String,
    },
    Statuses,
    PostStatus {
        media_ref: String,
    },
    ViewStatus {
        user_id: String,
    },
    Calls,
    LogCall {
        contact_id: String,
        medium: CallMedium,
        direction: CallDirection,
        duration: Option<u32>,
    },
    ClearCalls,
    ToggleOnline {
        contact_id: String,
    },
    Save,
    Help,
    Quit,

    // Plain text for the open conversation
    Message {
        content: String,
    },
    Unknown {
        input: String,
    },

    // Recognised command, bad arguments
    InvalidArgs {
        command: String,
        error: String,
    },
}

fn usage(command: &str, usage: &str) -> Command {
    Command::InvalidArgs {
        command: command.into(),
        error: format!("Usage: {}", usage),
    }
}

// Text after the first `skip` words, whitespace preserved inside
fn rest_after(input: &str, skip: usize) -> String {
    let mut rest = input;
    for _ in 0..skip {
        rest = rest.trim_start();
        rest = match rest.find(char::is_whitespace) {
            Some(at) => &rest[at..],
            None => "",
        };
    }
    rest.trim().to_string()
}

/// Parse one input line
pub fn parse(input: &str) -> Command {
    let input = input.trim();

    let Some(cmd_str) = input.strip_prefix('/') else {
        return Command::Message { content: input.to_string() };
    };

    let parts: Vec<&str> = cmd_str.split_whitespace().collect();
    let command = parts.first().copied().unwrap_or("");

    match command {
        "chats" | "c" => Command::Chats { query: rest_after(cmd_str, 1) },

        "open" | "o" => match parts.get(1) {
            Some(id) => Command::Open { contact_id: id.to_string() },
            None => usage("open", "/open <contact_id>"),
        },

        "close" => Command::Close,

        "send" => match (parts.get(1), rest_after(cmd_str, 2)) {
            (Some(id), content) if !content.is_empty() => {
                Command::Send { contact_id: id.to_string(), content }
            },
            _ => usage("send", "/send <contact_id> <text>"),
        },

        "group" => parse_group(cmd_str, &parts),

        "status" => match parts.get(1).copied() {
            None | Some("list") => Command::Statuses,
            Some("post") => match rest_after(cmd_str, 2) {
                media_ref if !media_ref.is_empty() => Command::PostStatus { media_ref },
                _ => usage("status", "/status post <media_ref>"),
            },
            Some("view") => match parts.get(2) {
                Some(user) => Command::ViewStatus { user_id: user.to_string() },
                None => usage("status", "/status view <user_id>"),
            },
            Some(_) => usage("status", "/status [list|post <media_ref>|view <user_id>]"),
        },

        "calls" => match parts.get(1).copied() {
            None => Command::Calls,
            Some("clear") => Command::ClearCalls,
            Some(_) => usage("calls", "/calls [clear]"),
        },

        "call" => parse_call(&parts),

        "online" => match parts.get(1) {
            Some(id) => Command::ToggleOnline { contact_id: id.to_string() },
            None => usage("online", "/online <contact_id>"),
        },

        "save" => Command::Save,

        "help" | "h" => Command::Help,

        "quit" | "q" => Command::Quit,

        _ => Command::Unknown { input: input.to_string() },
    }
}

fn parse_call(parts: &[&str]) -> Command {
    const USAGE: &str = "/call <contact_id> <audio|video> <incoming|outgoing|missed> [seconds]";

    let (Some(contact_id), Some(medium), Some(direction)) = (parts.get(1), parts.get(2), parts.get(3)) else {
        return usage("call", USAGE);
    };
    let medium = match *medium {
        "audio" => CallMedium::Audio,
        "video" => CallMedium::Video,
        _ => return usage("call", USAGE),
    };
    let direction = match *direction {
        "incoming" | "in" => CallDirection::Incoming,
        "outgoing" | "out" => CallDirection::Outgoing,
        "missed" => CallDirection::Missed,
        _ => return usage("call", USAGE),
    };
    let duration = match parts.get(4).map(|s| s.parse::<u32>()) {
        None => None,
        Some(Ok(secs)) => Some(secs),
        Some(Err(_)) => {
            return Command::InvalidArgs { command: "call".into(), error: "Invalid duration".into() }
        },
    };

    Command::LogCall { contact_id: contact_id.to_string(), medium, direction, duration }
}

fn parse_group(cmd_str: &str, parts: &[&str]) -> Command {
    let group_id = || parts.get(2).map(|id| id.to_string());

    match parts.get(1).copied() {
        Some("create") => {
            // /group create <name> -- <member> [<member> ...]
            let spec = rest_after(cmd_str, 2);
            match spec.split_once("--") {
                Some((name, members)) if !name.trim().is_empty() => Command::CreateGroup {
                    name: name.trim().to_string(),
                    members: members.split_whitespace().map(str::to_string).collect(),
                },
                _ => usage("group", "/group create <name> -- <member_id>..."),
            }
        },
        Some("rename") => match (group_id(), rest_after(cmd_str, 3)) {
            (Some(group_id), name) if !name.is_empty() => Command::RenameGroup { group_id, name },
            _ => usage("group", "/group rename <group_id> <name>"),
        },
        Some("add") => match (group_id(), parts.get(3)) {
            (Some(group_id), Some(member)) => {
                Command::AddMember { group_id, member_id: member.to_string() }
            },
            _ => usage("group", "/group add <group_id> <member_id>"),
        },
        Some("remove") => match (group_id(), parts.get(3)) {
            (Some(group_id), Some(member)) => {
                Command::RemoveMember { group_id, member_id: member.to_string() }
            },
            _ => usage("group", "/group remove <group_id> <member_id>"),
        },
        Some("leave") => match group_id() {
            Some(group_id) => Command::LeaveGroup { group_id },
            None => usage("group", "/group leave <group_id>"),
        },
        Some("delete") => match group_id() {
            Some(group_id) => Command::DeleteGroup { group_id },
            None => usage("group", "/group delete <group_id>"),
        },
        _ => usage("group", "/group [create|rename|add|remove|leave|delete] ..."),
    }
}
