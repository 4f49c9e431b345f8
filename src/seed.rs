// Startup data used when no snapshot exists yet
//
// Timestamps are relative to `now` so the relative-time labels look sane on
// a fresh start.

use chrono::{DateTime, Duration, Utc};

use crate::calls::CallLog;
use crate::models::{
    CallDirection, CallMedium, CallRecord, Contact, DeliveryStatus, Message, MessageKind, StatusItem,
    UserStatus,
};
use crate::status::StatusBoard;
use crate::store::ChatStore;

pub const LOCAL_USER_ID: &str = "user";

fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}

fn person(id: &str, name: &str, phone: &str, status: &str, online: bool, last_seen: DateTime<Utc>) -> Contact {
    let mut contact = Contact::person(id, name, status, online, last_seen);
    contact.phone = phone.to_string();
    contact
}

pub fn contacts(now: DateTime<Utc>) -> Vec<Contact> {
    vec![
        person("1", "Sarah Wilson", "+1 555 010 0001", "Out and about ☀️", true, now),
        person("2", "Mike Johnson", "+1 555 010 0002", "In meetings all day", true, now),
        person("3", "Emily Davis", "+1 555 010 0003", "Coffee first", false, now - minutes(30)),
        person("4", "David Chen", "+1 555 010 0004", "Shipping code", true, now),
        person("5", "Jessica Martinez", "+1 555 010 0005", "On holiday 🌴", false, now - minutes(120)),
        Contact::group(
            "6",
            "Team Project",
            vec!["1".into(), "2".into(), "3".into(), "4".into()],
            LOCAL_USER_ID,
            now,
        ),
        person("7", "Alex Thompson", "+1 555 010 0007", "Available", true, now),
        person("8", "Lisa Anderson", "+1 555 010 0008", "At the gym", false, now - minutes(60)),
    ]
}

fn message(
    id: &str,
    contact_id: &str,
    content: &str,
    at: DateTime<Utc>,
    is_sent: bool,
    status: DeliveryStatus,
) -> Message {
    Message {
        id: id.to_string(),
        contact_id: contact_id.to_string(),
        content: content.to_string(),
        timestamp: at,
        is_sent,
        status,
        kind: MessageKind::Text,
        sender_id: None,
        sender_name: None,
    }
}

fn from_member(mut message: Message, sender_id: &str, sender_name: &str) -> Message {
    message.sender_id = Some(sender_id.to_string());
    message.sender_name = Some(sender_name.to_string());
    message
}

pub fn messages(now: DateTime<Utc>) -> Vec<Message> {
    use DeliveryStatus::{Delivered, Seen};
    vec![
        message("seed_1", "1", "Hey! How's your week going?", now - minutes(60), false, Seen),
        message("seed_2", "1", "Pretty good, just wrapped up work. You?", now - minutes(58), true, Seen),
        message("seed_3", "1", "Same! Dinner later?", now - minutes(56), false, Delivered),
        message("seed_4", "2", "Reminder: standup moved to 3 PM", now - minutes(120), false, Seen),
        message("seed_5", "2", "Thanks, calendar updated 👍", now - minutes(118), true, Seen),
        message("seed_6", "3", "Look at these trip photos!", now - minutes(24 * 60), false, Seen),
        message("seed_7", "4", "Could you take a look at my PR?", now - minutes(30), false, Delivered),
        message("seed_8", "5", "Happy birthday! 🎂", now - minutes(48 * 60), true, Seen),
        from_member(
            message("seed_9", "6", "How is everyone getting on?", now - minutes(90), false, Seen),
            "1",
            "Sarah Wilson",
        ),
        from_member(
            message("seed_10", "6", "Nearly there, Friday looks realistic", now - minutes(88), false, Seen),
            "2",
            "Mike Johnson",
        ),
        message("seed_11", "6", "Nice work all 🎉", now - minutes(86), true, Seen),
    ]
}

pub fn chat_store(now: DateTime<Utc>) -> ChatStore {
    ChatStore::new(contacts(now), messages(now))
}

fn call(
    id: &str,
    contact: (&str, &str),
    medium: CallMedium,
    direction: CallDirection,
    at: DateTime<Utc>,
    duration: Option<u32>,
) -> CallRecord {
    CallRecord {
        id: id.to_string(),
        contact_id: contact.0.to_string(),
        contact_name: contact.1.to_string(),
        contact_avatar: String::new(),
        medium,
        direction,
        timestamp: at,
        duration,
    }
}

pub fn call_log(now: DateTime<Utc>) -> CallLog {
    use CallDirection::{Incoming, Missed, Outgoing};
    use CallMedium::{Audio, Video};
    CallLog::new(vec![
        call("call_1", ("1", "Sarah Wilson"), Video, Incoming, now - minutes(60), Some(245)),
        call("call_2", ("2", "Mike Johnson"), Audio, Outgoing, now - minutes(120), Some(180)),
        call("call_3", ("3", "Emily Davis"), Video, Missed, now - minutes(24 * 60), None),
        call("call_4", ("7", "Alex Thompson"), Audio, Incoming, now - minutes(48 * 60), Some(420)),
        call("call_5", ("1", "Sarah Wilson"), Audio, Outgoing, now - minutes(72 * 60), Some(90)),
        call("call_6", ("5", "Jessica Martinez"), Video, Missed, now - minutes(96 * 60), None),
    ])
}

fn item(id: &str, media: &str, at: DateTime<Utc>, viewed: bool) -> StatusItem {
    StatusItem {
        id: id.to_string(),
        media_ref: media.to_string(),
        timestamp: at,
        viewed,
    }
}

fn collection(user_id: &str, user_name: &str, items: Vec<StatusItem>) -> UserStatus {
    UserStatus {
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        avatar: String::new(),
        items,
        is_mine: false,
    }
}

pub fn status_board(now: DateTime<Utc>) -> StatusBoard {
    StatusBoard::new(vec![
        collection(
            "1",
            "Sarah Wilson",
            vec![
                item("status_1", "media/mountains.jpg", now - minutes(60), false),
                item("status_2", "media/lake.jpg", now - minutes(30), false),
            ],
        ),
        collection("2", "Mike Johnson", vec![item("status_3", "media/desk.jpg", now - minutes(120), true)]),
        collection("3", "Emily Davis", vec![item("status_4", "media/latte.jpg", now - minutes(15), false)]),
        collection("7", "Alex Thompson", vec![item("status_5", "media/run.jpg", now - minutes(90), true)]),
    ])
}
