// Derived views over the current state
//
// These are pure functions of the slices they are handed. Nothing is cached:
// callers re-run them on every render, so the answers always match the store
// at the moment of the call.

use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt::Display;

use crate::models::{Contact, Message};

/// One row of the chat list
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary<'a> {
    pub contact: &'a Contact,
    pub last_message: Option<&'a Message>,
    pub unread: usize,
}

/// Most recently appended message of a conversation
pub fn last_message<'a>(messages: &'a [Message], contact_id: &str) -> Option<&'a Message> {
    messages.iter().rev().find(|m| m.contact_id == contact_id)
}

pub fn unread_count(messages: &[Message], contact_id: &str) -> usize {
    messages
        .iter()
        .filter(|m| m.contact_id == contact_id && m.is_unread())
        .count()
}

/// Case-insensitive substring match on display name; blank query keeps all
pub fn filter_by_name<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.trim().to_lowercase();
    contacts
        .iter()
        .filter(|c| needle.is_empty() || c.name.to_lowercase().contains(&needle))
        .collect()
}

/// Newest last message first; conversations without messages go last
pub fn sort_by_recent(rows: &mut [ConversationSummary<'_>]) {
    rows.sort_by(|a, b| match (a.last_message, b.last_message) {
        (Some(a), Some(b)) => b.timestamp.cmp(&a.timestamp),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// The filtered, sorted chat list
pub fn conversation_list<'a>(
    contacts: &'a [Contact],
    messages: &'a [Message],
    query: &str,
) -> Vec<ConversationSummary<'a>> {
    let mut rows: Vec<ConversationSummary<'a>> = filter_by_name(contacts, query)
        .into_iter()
        .map(|contact| ConversationSummary {
            contact,
            last_message: last_message(messages, &contact.id),
            unread: unread_count(messages, &contact.id),
        })
        .collect();
    sort_by_recent(&mut rows);
    rows
}

/// Unread messages across all live conversations (orphans are not counted)
pub fn total_unread(contacts: &[Contact], messages: &[Message]) -> usize {
    contacts.iter().map(|c| unread_count(messages, &c.id)).sum()
}

/// Number of conversations with at least one unread message
pub fn unread_conversations(contacts: &[Contact], messages: &[Message]) -> usize {
    contacts
        .iter()
        .filter(|c| unread_count(messages, &c.id) > 0)
        .count()
}

// ----- relative time -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBucket {
    Today,
    Yesterday,
    Earlier,
}

/// Which calendar day `ts` falls on relative to `now`, in `now`'s zone
pub fn day_bucket<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> DayBucket {
    let day = ts.with_timezone(&now.timezone()).date_naive();
    let today = now.date_naive();
    if day == today {
        DayBucket::Today
    } else if today.pred_opt() == Some(day) {
        DayBucket::Yesterday
    } else {
        DayBucket::Earlier
    }
}

/// `HH:MM` today, `Yesterday`, otherwise `dd/mm/yyyy`
pub fn chat_list_time_label<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let local = ts.with_timezone(&now.timezone());
    match day_bucket(ts, now) {
        DayBucket::Today => local.format("%H:%M").to_string(),
        DayBucket::Yesterday => "Yesterday".to_string(),
        DayBucket::Earlier => local.format("%d/%m/%Y").to_string(),
    }
}

/// Divider shown between days inside a conversation
pub fn date_divider_label<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    match day_bucket(ts, now) {
        DayBucket::Today => "Today".to_string(),
        DayBucket::Yesterday => "Yesterday".to_string(),
        DayBucket::Earlier => ts.with_timezone(&now.timezone()).format("%B %-d, %Y").to_string(),
    }
}

/// Header subtitle: typing, online, or when the contact was last seen.
/// `directory` resolves the name of a typing group member.
pub fn presence_line<Tz: TimeZone>(contact: &Contact, directory: &[Contact], now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    if contact.is_typing {
        let member = contact
            .typing_member
            .as_deref()
            .and_then(|id| directory.iter().find(|c| c.id == id));
        return match member {
            Some(member) if contact.is_group => format!("{} is typing...", member.name),
            _ => "typing...".to_string(),
        };
    }
    if contact.is_group {
        return contact.status.clone();
    }
    if contact.is_online {
        return "online".to_string();
    }

    let seen = contact.last_seen.with_timezone(&now.timezone());
    let time = seen.format("%H:%M");
    match day_bucket(&contact.last_seen, now) {
        DayBucket::Today => format!("last seen today at {}", time),
        DayBucket::Yesterday => format!("last seen yesterday at {}", time),
        DayBucket::Earlier => format!("last seen {} at {}", seen.format("%b %-d"), time),
    }
}

/// `h:mm AM` today, `Yesterday`, otherwise `Mon d`
pub fn call_time_label<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let local = ts.with_timezone(&now.timezone());
    match day_bucket(ts, now) {
        DayBucket::Today => local.format("%-I:%M %p").to_string(),
        DayBucket::Yesterday => "Yesterday".to_string(),
        DayBucket::Earlier => local.format("%b %-d").to_string(),
    }
}

/// `m:ss`, or empty for missing/zero durations
pub fn format_call_duration(seconds: Option<u32>) -> String {
    match seconds {
        Some(secs) if secs > 0 => format!("{}:{:02}", secs / 60, secs % 60),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, MessageKind};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    fn msg(id: &str, contact: &str, minutes_ago: i64, inbound_unread: bool) -> Message {
        Message {
            id: id.to_string(),
            contact_id: contact.to_string(),
            content: id.to_string(),
            timestamp: now() - Duration::minutes(minutes_ago),
            is_sent: !inbound_unread,
            status: if inbound_unread { DeliveryStatus::Delivered } else { DeliveryStatus::Seen },
            kind: MessageKind::Text,
            sender_id: None,
            sender_name: None,
        }
    }

    fn contacts() -> Vec<Contact> {
        vec![
            Contact::person("1", "Sarah Wilson", "", true, now()),
            Contact::person("2", "Mike Johnson", "", false, now()),
            Contact::person("3", "Lisa Anderson", "", false, now()),
        ]
    }

    #[test]
    fn list_sorts_by_last_message_and_puts_silent_chats_last() {
        let contacts = contacts();
        let messages = vec![msg("a", "1", 60, false), msg("b", "2", 5, true), msg("c", "1", 30, false)];

        let rows = conversation_list(&contacts, &messages, "");
        let ids: Vec<&str> = rows.iter().map(|r| r.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(rows[1].last_message.map(|m| m.id.as_str()), Some("c"));
        assert_eq!(rows[0].unread, 1);
    }

    #[test]
    fn name_filter_is_case_insensitive_substring() {
        let contacts = contacts();
        let names: Vec<&str> = filter_by_name(&contacts, "SON")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sarah Wilson", "Mike Johnson", "Lisa Anderson"]);
        assert_eq!(filter_by_name(&contacts, "mike").len(), 1);
        assert_eq!(filter_by_name(&contacts, "  ").len(), 3);
    }

    #[test]
    fn totals_ignore_orphaned_messages() {
        let contacts = contacts();
        let messages = vec![msg("a", "1", 1, true), msg("b", "2", 1, true), msg("c", "gone", 1, true)];
        assert_eq!(total_unread(&contacts, &messages), 2);
        assert_eq!(unread_conversations(&contacts, &messages), 2);
    }

    #[test]
    fn time_labels_bucket_by_day() {
        let today = now() - Duration::hours(1);
        let yesterday = now() - Duration::days(1);
        let older = now() - Duration::days(10);

        assert_eq!(chat_list_time_label(&today, &now()), "13:30");
        assert_eq!(chat_list_time_label(&yesterday, &now()), "Yesterday");
        assert_eq!(chat_list_time_label(&older, &now()), "05/03/2024");
        assert_eq!(date_divider_label(&older, &now()), "March 5, 2024");
        assert_eq!(call_time_label(&today, &now()), "1:30 PM");
        assert_eq!(call_time_label(&older, &now()), "Mar 5");
    }

    #[test]
    fn presence_line_prefers_typing_then_online() {
        let directory = contacts();
        let mut contact = Contact::person("1", "Ada", "", false, now() - Duration::days(1));
        assert_eq!(presence_line(&contact, &directory, &now()), "last seen yesterday at 14:30");
        contact.is_online = true;
        assert_eq!(presence_line(&contact, &directory, &now()), "online");
        contact.is_typing = true;
        assert_eq!(presence_line(&contact, &directory, &now()), "typing...");

        let mut group = Contact::group("g", "Team", vec!["2".into()], "user", now());
        assert_eq!(presence_line(&group, &directory, &now()), "2 participants");
        group.is_typing = true;
        group.typing_member = Some("2".into());
        assert_eq!(presence_line(&group, &directory, &now()), "Mike Johnson is typing...");
    }

    #[test]
    fn call_durations() {
        assert_eq!(format_call_duration(Some(245)), "4:05");
        assert_eq!(format_call_duration(Some(0)), "");
        assert_eq!(format_call_duration(None), "");
    }
}
