#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

mod utils;

use echochat::{
    commands::{self, Command},
    driver::{Ticker, DEFAULT_POLL_INTERVAL},
    engine::{self, Engine, EngineEvent},
    models::{CallDirection, CallMedium, DeliveryStatus, Message, MessageKind, NewCall},
    persistence::SnapshotStore,
    queries,
    status::ViewerStep,
    Clock, SimConfig, SystemClock,
};

/// Command line arguments for echochat
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "echochat: a local chat simulator with delivery receipts, typing and auto-replies.",
    long_about = "echochat simulates a messaging client with no network peer.\n\n\
    Messages walk through sending, sent, delivered and seen; online contacts type back\n\
    and reply. State is kept in JSON snapshots in the data directory.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for chats.json, calls.json and status.json
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Seed for reproducible replies
    #[arg(long)]
    seed: Option<u64>,

    /// Log file (defaults to echochat.log in the working directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Ignore saved snapshots and start from the seed data
    #[arg(long)]
    fresh: bool,
}

/// What the REPL should do after a command
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Changed,
    Unchanged,
    Save,
    Quit,
}

const HELP: &str = "\
Commands:
  /chats [filter]                      list conversations
  /open <id>  /close                   focus a conversation
  <text>                               send to the open conversation
  /send <id> <text>                    send to any conversation
  /group create <name> -- <ids...>     create a group
  /group rename <id> <name>
  /group add|remove <id> <member_id>
  /group leave|delete <id>
  /status [list]                       status updates
  /status post <media>                 post to your status
  /status view <user_id>               play someone's status
  /calls [clear]                       call history
  /call <id> <audio|video> <in|out|missed> [seconds]
  /online <id>                         toggle a contact's presence
  /save  /help  /quit";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file_path = args.log_file.clone().unwrap_or_else(|| PathBuf::from("echochat.log"));
    utils::setup_logging(Some(&log_file_path), args.log_level)?;
    info!("echochat starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);

    let mut config = SimConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;

    let snapshots = SnapshotStore::new(config.resolve_data_dir()?);
    info!("Snapshots live in {}", snapshots.dir().display());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = if args.fresh {
        info!("Starting from seed data (--fresh)");
        Engine::new(config, clock)
    } else {
        Engine::load(config, clock, &snapshots)
    };
    let shared = engine::install_global(engine);
    let (ticker, mut events) = Ticker::spawn(shared.clone(), DEFAULT_POLL_INTERVAL);

    println!("echochat - type /help for commands\n");
    print_chat_list(&*shared.lock().await);
    utils::prompt(&prompt_label(&*shared.lock().await));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let outcome = {
                    let mut engine = shared.lock().await;
                    let outcome = execute(&mut engine, commands::parse(&line));
                    if outcome != Outcome::Unchanged {
                        save(&engine, &snapshots);
                    }
                    outcome
                };
                if outcome == Outcome::Quit {
                    break;
                }
                ticker.wake();
                utils::prompt(&prompt_label(&*shared.lock().await));
            }
            Some(event) = events.recv() => {
                let engine = shared.lock().await;
                render_event(&engine, &event);
                save(&engine, &snapshots);
            }
        }
    }

    ticker.shutdown().await;
    save(&*shared.lock().await, &snapshots);
    info!("echochat shutting down");
    println!("Bye!");
    Ok(())
}

fn save(engine: &Engine, snapshots: &SnapshotStore) {
    if let Err(e) = engine.save(snapshots) {
        error!("Failed to save snapshots: {}", e);
        eprintln!("Warning: failed to save state: {}", e);
    }
}

fn prompt_label(engine: &Engine) -> String {
    engine
        .active_contact_id()
        .and_then(|id| engine.chats().contact(id))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "echochat".to_string())
}

fn execute(engine: &mut Engine, command: Command) -> Outcome {
    match command {
        Command::Chats { query } => {
            engine.set_search_query(&query);
            print_chat_list(engine);
            Outcome::Unchanged
        }
        Command::Open { contact_id } => {
            if engine.set_active_conversation(Some(&contact_id)) {
                print_conversation(engine, &contact_id);
                Outcome::Changed
            } else {
                println!("No conversation with id {}", contact_id);
                Outcome::Unchanged
            }
        }
        Command::Close => {
            engine.set_active_conversation(None);
            Outcome::Changed
        }
        Command::Message { content } => {
            if content.is_empty() {
                return Outcome::Unchanged;
            }
            match engine.active_contact_id().map(str::to_string) {
                Some(id) => send(engine, &id, &content),
                None => {
                    println!("Open a conversation first (/open <id>), or use /send <id> <text>");
                    Outcome::Unchanged
                }
            }
        }
        Command::Send { contact_id, content } => send(engine, &contact_id, &content),
        Command::CreateGroup { name, members } => match engine.create_group(&name, &members) {
            Some(id) => {
                println!("Created group {} ({})", name, id);
                print_conversation(engine, &id);
                Outcome::Changed
            }
            None => {
                println!("Could not create group: needs a name and at least one known contact");
                Outcome::Unchanged
            }
        },
        Command::RenameGroup { group_id, name } => {
            report(engine.update_group_name(&group_id, &name), "Group renamed", "No such group")
        }
        Command::AddMember { group_id, member_id } => report(
            engine.add_member_to_group(&group_id, &member_id),
            "Member added",
            "Nothing to add",
        ),
        Command::RemoveMember { group_id, member_id } => report(
            engine.remove_member_from_group(&group_id, &member_id),
            "Member removed",
            "Nothing to remove",
        ),
        Command::LeaveGroup { group_id } => {
            report(engine.leave_group(&group_id), "You left the group", "No such group")
        }
        Command::DeleteGroup { group_id } => {
            report(engine.delete_group(&group_id), "Group deleted", "No such group")
        }
        Command::Statuses => {
            print_statuses(engine);
            Outcome::Unchanged
        }
        Command::PostStatus { media_ref } => {
            report(engine.add_status(&media_ref).is_some(), "Status posted", "Nothing to post")
        }
        Command::ViewStatus { user_id } => play_status(engine, &user_id),
        Command::Calls => {
            print_calls(engine);
            Outcome::Unchanged
        }
        Command::LogCall { contact_id, medium, direction, duration } => {
            let Some(contact) = engine.chats().contact(&contact_id) else {
                println!("No contact with id {}", contact_id);
                return Outcome::Unchanged;
            };
            let call = NewCall {
                contact_id: contact.id.clone(),
                contact_name: contact.name.clone(),
                contact_avatar: contact.avatar.clone(),
                medium,
                direction,
                timestamp: engine.now(),
                duration,
            };
            engine.add_call(call);
            Outcome::Changed
        }
        Command::ClearCalls => {
            engine.clear_calls();
            println!("Call history cleared");
            Outcome::Changed
        }
        Command::ToggleOnline { contact_id } => {
            let toggled = engine.toggle_online_status(&contact_id);
            if toggled {
                if let Some(contact) = engine.chats().contact(&contact_id) {
                    let now = Local::now();
                    println!("{} is {}", contact.name, queries::presence_line(contact, engine.contacts(), &now));
                }
                Outcome::Changed
            } else {
                println!("No person with id {}", contact_id);
                Outcome::Unchanged
            }
        }
        Command::Save => Outcome::Save,
        Command::Help => {
            println!("{}", HELP);
            Outcome::Unchanged
        }
        Command::Quit => Outcome::Quit,
        Command::Unknown { input } => {
            println!("Unknown command: {} (try /help)", input);
            Outcome::Unchanged
        }
        Command::InvalidArgs { command, error } => {
            println!("/{}: {}", command, error);
            Outcome::Unchanged
        }
    }
}

fn send(engine: &mut Engine, contact_id: &str, content: &str) -> Outcome {
    match engine.send_message(contact_id, content) {
        Some(id) => {
            if let Some(message) = engine.chats().message(&id) {
                println!("{}", format_message(engine, message, &Local::now()));
            }
            Outcome::Changed
        }
        None => {
            warn!("Send to {} rejected", contact_id);
            println!("Message not sent: unknown conversation {}", contact_id);
            Outcome::Unchanged
        }
    }
}

fn report(ok: bool, done: &str, nothing: &str) -> Outcome {
    if ok {
        println!("{}", done);
        Outcome::Changed
    } else {
        println!("{}", nothing);
        Outcome::Unchanged
    }
}

fn status_mark(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sending => "🕓",
        DeliveryStatus::Sent => "✓",
        DeliveryStatus::Delivered => "✓✓",
        DeliveryStatus::Seen => "✓✓ seen",
    }
}

fn format_message(engine: &Engine, message: &Message, now: &DateTime<Local>) -> String {
    let time = message.timestamp.with_timezone(&now.timezone()).format("%H:%M");
    if message.kind == MessageKind::System {
        return format!("        * {}", message.content);
    }
    if message.is_sent {
        return format!("  [{}] {}: {}  {}", time, engine.config().user_name, message.content, status_mark(message.status));
    }
    let author = message
        .sender_name
        .clone()
        .or_else(|| engine.chats().contact(&message.contact_id).map(|c| c.name.clone()))
        .unwrap_or_default();
    format!("  [{}] {}: {}", time, author, message.content)
}

fn print_chat_list(engine: &Engine) {
    let now = Local::now();
    let rows = engine.conversation_list();
    if rows.is_empty() {
        println!("No conversations match '{}'", engine.search_query());
        return;
    }
    for row in rows {
        let preview = row
            .last_message
            .map(|m| utils::truncate(&m.content, 40))
            .unwrap_or_default();
        let time = row
            .last_message
            .map(|m| queries::chat_list_time_label(&m.timestamp, &now))
            .unwrap_or_default();
        let unread = if row.unread > 0 { format!("({})", row.unread) } else { String::new() };
        println!("{:>6}  {:<20} {:>10} {:>4}  {}", row.contact.id, row.contact.name, time, unread, preview);
    }
    let unread = queries::unread_conversations(engine.contacts(), engine.messages());
    if unread > 0 {
        println!("{} unread chat(s)", unread);
    }
}

fn print_conversation(engine: &Engine, contact_id: &str) {
    let Some(contact) = engine.chats().contact(contact_id) else {
        return;
    };
    let now = Local::now();
    println!("== {} | {} ==", contact.name, queries::presence_line(contact, engine.contacts(), &now));

    let mut divider: Option<String> = None;
    for message in engine.chats().conversation(contact_id) {
        let label = queries::date_divider_label(&message.timestamp, &now);
        if divider.as_deref() != Some(label.as_str()) {
            println!("  --- {} ---", label);
            divider = Some(label);
        }
        println!("{}", format_message(engine, message, &now));
    }
}

fn print_statuses(engine: &Engine) {
    let now = Local::now();
    let board = engine.status_board();
    match board.mine() {
        Some(mine) if !mine.items.is_empty() => println!(
            "My status: {} update(s), last {}",
            mine.items.len(),
            mine.latest()
                .map(|item| queries::chat_list_time_label(&item.timestamp, &now))
                .unwrap_or_default()
        ),
        _ => println!("My status: tap /status post <media> to add"),
    }

    let line = |status: &echochat::models::UserStatus| {
        let segments = board.ring(&status.user_id).map(|r| r.segments).unwrap_or(0);
        let when = status
            .latest()
            .map(|item| queries::chat_list_time_label(&item.timestamp, &now))
            .unwrap_or_default();
        println!("{:>6}  {:<20} {:>10}  {} segment(s)", status.user_id, status.user_name, when, segments);
    };

    let recent = board.recent_updates();
    if !recent.is_empty() {
        println!("Recent updates");
        recent.into_iter().for_each(line);
    }
    let viewed = board.viewed_updates();
    if !viewed.is_empty() {
        println!("Viewed updates");
        viewed.into_iter().for_each(line);
    }
}

fn play_status(engine: &mut Engine, user_id: &str) -> Outcome {
    let Some(mut viewer) = engine.open_status_viewer(user_id) else {
        println!("No status updates from {}", user_id);
        return Outcome::Unchanged;
    };

    let now = Local::now();
    loop {
        let board = engine.status_board();
        if let Some(item) = viewer.current(board) {
            let bar: String = viewer
                .progress(board)
                .into_iter()
                .map(|filled| if filled { '█' } else { '░' })
                .collect();
            println!("{}  {}  {}", bar, item.media_ref, queries::chat_list_time_label(&item.timestamp, &now));
        }
        if engine.advance_status_viewer(&mut viewer) == ViewerStep::Closed {
            break;
        }
    }
    Outcome::Changed
}

fn print_calls(engine: &Engine) {
    let now = Local::now();
    if engine.calls().is_empty() {
        println!("No calls yet");
        return;
    }
    for call in engine.calls() {
        let direction = match call.direction {
            CallDirection::Incoming => "↙ incoming",
            CallDirection::Outgoing => "↗ outgoing",
            CallDirection::Missed => "✗ missed",
        };
        let medium = match call.medium {
            CallMedium::Audio => "audio",
            CallMedium::Video => "video",
        };
        println!(
            "  {:<20} {:<11} {:<5} {:>10} {:>6}",
            call.contact_name,
            direction,
            medium,
            queries::call_time_label(&call.timestamp, &now),
            queries::format_call_duration(call.duration)
        );
    }
}

fn render_event(engine: &Engine, event: &EngineEvent) {
    let active = engine.active_contact_id();
    match event {
        EngineEvent::StatusChanged { message_id, status } => {
            let in_view = engine
                .chats()
                .message(message_id)
                .map(|m| Some(m.contact_id.as_str()) == active)
                .unwrap_or(false);
            if in_view {
                println!("\r  {} {}", status_mark(*status), utils::truncate(message_id, 16));
            }
        }
        EngineEvent::TypingStarted { conversation_id, .. } => {
            if let Some(contact) = engine.chats().contact(conversation_id) {
                let now = Local::now();
                println!("\r  [{}] {}", contact.name, queries::presence_line(contact, engine.contacts(), &now));
            }
        }
        EngineEvent::ReplyReceived { conversation_id, message_id } => {
            let now = Local::now();
            if let Some(message) = engine.chats().message(message_id) {
                if Some(conversation_id.as_str()) == active {
                    println!("\r{}", format_message(engine, message, &now));
                } else {
                    let name = engine
                        .chats()
                        .contact(conversation_id)
                        .map(|c| c.name.as_str())
                        .unwrap_or("?");
                    println!("\r  New message in {}: {}", name, utils::truncate(&message.content, 40));
                }
            }
        }
    }
}
