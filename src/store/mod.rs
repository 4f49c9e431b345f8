// Entity store for contacts, groups and messages
//
// The store is the single owner of conversation state. Every mutation is a
// named method that applies its invariants before returning, so a reader
// never sees a half-applied change. Invalid input is answered with a no-op
// (and a false/None return) instead of an error.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Contact, DeliveryStatus, Message, MessageKind};

pub mod groups;

/// Generate a prefixed unique id, e.g. `msg_3f2a...`
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStore {
    contacts: Vec<Contact>,
    messages: Vec<Message>,
    #[serde(default)]
    active_contact_id: Option<String>,
    #[serde(default)]
    search_query: String,
}

impl ChatStore {
    pub fn new(contacts: Vec<Contact>, messages: Vec<Message>) -> Self {
        ChatStore {
            contacts,
            messages,
            active_contact_id: None,
            search_query: String::new(),
        }
    }

    // ----- read side -----

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn active_contact_id(&self) -> Option<&str> {
        self.active_contact_id.as_deref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn conversation(&self, contact_id: &str) -> impl Iterator<Item = &Message> {
        let contact_id = contact_id.to_string();
        self.messages.iter().filter(move |m| m.contact_id == contact_id)
    }

    /// Inbound messages in the conversation that are not yet seen
    pub fn unread_count(&self, contact_id: &str) -> usize {
        self.conversation(contact_id).filter(|m| m.is_unread()).count()
    }

    pub(crate) fn contact_mut(&mut self, id: &str) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }

    // ----- mutations -----

    /// Focus a conversation (or none). Opening one marks its inbound messages seen.
    /// Unknown ids leave the focus untouched.
    pub fn set_active_conversation(&mut self, contact_id: Option<&str>) -> bool {
        match contact_id {
            None => {
                self.active_contact_id = None;
                true
            }
            Some(id) if self.contact(id).is_some() => {
                self.active_contact_id = Some(id.to_string());
                let marked = self.mark_as_seen(id);
                debug!("Opened conversation {} ({} messages marked seen)", id, marked);
                true
            }
            Some(id) => {
                warn!("Ignoring request to open unknown conversation {}", id);
                false
            }
        }
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    /// Mark every inbound message in the conversation seen, returning how many changed
    pub fn mark_as_seen(&mut self, contact_id: &str) -> usize {
        let mut marked = 0;
        for message in self.messages.iter_mut() {
            if message.contact_id == contact_id
                && message.is_inbound()
                && message.advance_status(DeliveryStatus::Seen)
            {
                marked += 1;
            }
        }
        marked
    }

    /// Append an outbound message in `sending` state.
    ///
    /// Blank text or an unknown conversation is a no-op and yields `None`.
    pub fn send_message(&mut self, contact_id: &str, text: &str, now: DateTime<Utc>) -> Option<String> {
        let content = text.trim();
        if content.is_empty() {
            debug!("Dropping empty message to {}", contact_id);
            return None;
        }
        if self.contact(contact_id).is_none() {
            warn!("Dropping message to unknown conversation {}", contact_id);
            return None;
        }

        let id = new_id("msg");
        self.messages.push(Message {
            id: id.clone(),
            contact_id: contact_id.to_string(),
            content: content.to_string(),
            timestamp: now,
            is_sent: true,
            status: DeliveryStatus::Sending,
            kind: MessageKind::Text,
            sender_id: None,
            sender_name: None,
        });
        info!("Queued message {} to {}", id, contact_id);
        Some(id)
    }

    /// Flip the typing flag; returns false for unknown ids
    pub fn set_typing(&mut self, contact_id: &str, is_typing: bool) -> bool {
        self.set_typing_as(contact_id, is_typing, None)
    }

    // For groups `member` names who is composing
    pub(crate) fn set_typing_as(&mut self, contact_id: &str, is_typing: bool, member: Option<&str>) -> bool {
        match self.contact_mut(contact_id) {
            Some(contact) => {
                contact.is_typing = is_typing;
                contact.typing_member = if is_typing && contact.is_group {
                    member.map(str::to_string)
                } else {
                    None
                };
                true
            }
            None => false,
        }
    }

    /// Flip a 1:1 contact's online flag and stamp last-seen
    pub fn toggle_online_status(&mut self, contact_id: &str, now: DateTime<Utc>) -> bool {
        match self.contact_mut(contact_id) {
            Some(contact) if !contact.is_group => {
                contact.is_online = !contact.is_online;
                contact.last_seen = now;
                info!("{} is now {}", contact.name, if contact.is_online { "online" } else { "offline" });
                true
            }
            _ => false,
        }
    }

    /// Move a message's delivery state forward. Missing messages and
    /// non-advancing targets are ignored.
    pub fn advance_delivery(&mut self, message_id: &str, to: DeliveryStatus) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                let from = message.status;
                let moved = message.advance_status(to);
                if moved {
                    debug!("Message {} {:?} -> {:?}", message_id, from, to);
                }
                moved
            }
            None => {
                debug!("Delivery tick for vanished message {}", message_id);
                false
            }
        }
    }

    /// Append a counterparty reply. Returns `None` when the conversation is
    /// gone or the responder can no longer speak in it.
    pub fn append_reply(
        &mut self,
        contact_id: &str,
        responder_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let conversation = self.contact(contact_id)?;
        let (sender_id, sender_name) = if conversation.is_group {
            if !conversation.has_member(responder_id) {
                debug!("Responder {} left group {}, dropping reply", responder_id, contact_id);
                return None;
            }
            let responder = self.contact(responder_id)?;
            (Some(responder.id.clone()), Some(responder.name.clone()))
        } else {
            (None, None)
        };

        let id = new_id("msg");
        self.messages.push(Message {
            id: id.clone(),
            contact_id: contact_id.to_string(),
            content: content.to_string(),
            timestamp: now,
            is_sent: false,
            // The other party's own message is never in transit from our side
            status: DeliveryStatus::Seen,
            kind: MessageKind::Text,
            sender_id,
            sender_name,
        });
        Some(id)
    }

    // System messages are local announcements: outbound and already seen
    pub(crate) fn push_system_message(&mut self, contact_id: &str, content: String, now: DateTime<Utc>) -> String {
        let id = new_id("msg");
        self.messages.push(Message {
            id: id.clone(),
            contact_id: contact_id.to_string(),
            content,
            timestamp: now,
            is_sent: true,
            status: DeliveryStatus::Seen,
            kind: MessageKind::System,
            sender_id: None,
            sender_name: None,
        });
        id
    }

    /// Outbound messages still in transit, oldest first
    pub fn pending_outbound(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.is_sent && m.status != DeliveryStatus::Seen)
    }

    /// Typing is transient and does not survive a reload
    pub fn clear_typing(&mut self) {
        for contact in &mut self.contacts {
            contact.is_typing = false;
            contact.typing_member = None;
        }
    }

    // Unknown active pointers can come from a hand-edited snapshot
    pub(crate) fn repair_active_pointer(&mut self) {
        if let Some(active) = self.active_contact_id.clone() {
            if self.contact(&active).is_none() {
                self.active_contact_id = None;
            }
        }
    }
}
