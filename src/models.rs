// Core entity types shared by the store, the schedulers and the snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 1:1 contact or a group, discriminated by `is_group`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    pub status: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub is_typing: bool,
    #[serde(default)]
    pub is_group: bool,
    // Group-only fields
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_member: Option<String>,
}

impl Contact {
    /// Create a 1:1 contact
    pub fn person(id: &str, name: &str, status: &str, is_online: bool, last_seen: DateTime<Utc>) -> Self {
        Contact {
            id: id.to_string(),
            name: name.to_string(),
            phone: String::new(),
            avatar: String::new(),
            status: status.to_string(),
            is_online,
            last_seen,
            is_typing: false,
            is_group: false,
            members: Vec::new(),
            created_by: None,
            typing_member: None,
        }
    }

    /// Create a group contact owned by `created_by`
    pub fn group(id: &str, name: &str, members: Vec<String>, created_by: &str, now: DateTime<Utc>) -> Self {
        let mut group = Contact {
            id: id.to_string(),
            name: name.to_string(),
            phone: "Group".to_string(),
            avatar: String::new(),
            status: String::new(),
            is_online: false,
            last_seen: now,
            is_typing: false,
            is_group: true,
            members,
            created_by: Some(created_by.to_string()),
            typing_member: None,
        };
        group.refresh_participant_line();
        group
    }

    pub fn has_member(&self, member_id: &str) -> bool {
        self.members.iter().any(|m| m == member_id)
    }

    // The local user counts as a participant too
    pub(crate) fn refresh_participant_line(&mut self) {
        if self.is_group {
            self.status = format!("{} participants", self.members.len() + 1);
        }
    }
}

/// Simulated transit state of a message, in lattice order
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending = 0,
    Sent = 1,
    Delivered = 2,
    Seen = 3,
}

impl DeliveryStatus {
    /// The next state in the lattice, `None` once seen
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Sending => Some(DeliveryStatus::Sent),
            DeliveryStatus::Sent => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => Some(DeliveryStatus::Seen),
            DeliveryStatus::Seen => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub contact_id: String, // Owning conversation
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_sent: bool, // true = outbound
    pub status: DeliveryStatus,
    #[serde(default)]
    pub kind: MessageKind,
    // Only set for inbound group messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl Message {
    pub fn is_inbound(&self) -> bool {
        !self.is_sent
    }

    pub fn is_unread(&self) -> bool {
        self.is_inbound() && self.status != DeliveryStatus::Seen
    }

    /// Move the delivery state forward. Returns false when `target` would not advance it.
    pub fn advance_status(&mut self, target: DeliveryStatus) -> bool {
        if target > self.status {
            self.status = target;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMedium {
    Audio,
    Video,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Incoming,
    Outgoing,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub contact_id: String,
    pub contact_name: String,
    #[serde(default)]
    pub contact_avatar: String,
    pub medium: CallMedium,
    pub direction: CallDirection,
    pub timestamp: DateTime<Utc>,
    // Seconds; never present for missed calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// A call record before the log assigns it an id
#[derive(Debug, Clone)]
pub struct NewCall {
    pub contact_id: String,
    pub contact_name: String,
    pub contact_avatar: String,
    pub medium: CallMedium,
    pub direction: CallDirection,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusItem {
    pub id: String,
    pub media_ref: String,
    pub timestamp: DateTime<Utc>,
    pub viewed: bool,
}

/// All ephemeral updates posted by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub avatar: String,
    pub items: Vec<StatusItem>,
    pub is_mine: bool,
}

impl UserStatus {
    pub fn has_unviewed(&self) -> bool {
        self.items.iter().any(|item| !item.viewed)
    }

    pub fn all_viewed(&self) -> bool {
        self.items.iter().all(|item| item.viewed)
    }

    pub fn latest(&self) -> Option<&StatusItem> {
        self.items.last()
    }
}
