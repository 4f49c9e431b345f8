// Group lifecycle and membership
//
// Groups are contacts with `is_group` set. Members must be existing 1:1
// contacts; a group never contains itself or another group. Every real
// membership change leaves a system message in the group's thread, and a
// change that would not alter the member set leaves nothing.

use chrono::{DateTime, Utc};
use log::{info, warn};

use super::{new_id, ChatStore};
use crate::models::Contact;

impl ChatStore {
    fn is_person(&self, id: &str) -> bool {
        matches!(self.contact(id), Some(c) if !c.is_group)
    }

    fn is_group(&self, id: &str) -> bool {
        matches!(self.contact(id), Some(c) if c.is_group)
    }

    /// Create a group owned by `created_by` and focus it.
    ///
    /// Member ids that are unknown, duplicated or refer to groups are dropped;
    /// if nothing valid remains the call is a no-op.
    pub fn create_group(
        &mut self,
        name: &str,
        member_ids: &[String],
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Refusing to create a group without a name");
            return None;
        }

        let mut members: Vec<String> = Vec::with_capacity(member_ids.len());
        for id in member_ids {
            if members.contains(id) {
                continue;
            }
            if self.is_person(id) {
                members.push(id.clone());
            } else {
                warn!("Skipping invalid group member {}", id);
            }
        }
        if members.is_empty() {
            warn!("Refusing to create group '{}' with no valid members", name);
            return None;
        }

        let group_id = new_id("group");
        let group = Contact::group(&group_id, name, members, created_by, now);
        info!("Created group {} ({}) with {} members", name, group_id, group.members.len());

        // Newest groups go to the top of the contact list
        self.contacts.insert(0, group);
        self.push_system_message(&group_id, format!("You created group \"{}\"", name), now);
        self.set_active_conversation(Some(&group_id));
        Some(group_id)
    }

    pub fn update_group_name(&mut self, group_id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.contact_mut(group_id) {
            Some(group) if group.is_group => {
                info!("Renamed group {} from '{}' to '{}'", group_id, group.name, name);
                group.name = name.to_string();
                true
            }
            _ => {
                warn!("Cannot rename {}: not a group", group_id);
                false
            }
        }
    }

    /// Add a 1:1 contact to a group. Already-present members are a no-op.
    pub fn add_member_to_group(&mut self, group_id: &str, member_id: &str, now: DateTime<Utc>) -> bool {
        if !self.is_group(group_id) || !self.is_person(member_id) {
            warn!("Cannot add {} to {}", member_id, group_id);
            return false;
        }
        let member_name = match self.contact(member_id) {
            Some(member) => member.name.clone(),
            None => return false,
        };

        let added = match self.contact_mut(group_id) {
            Some(group) if !group.has_member(member_id) => {
                group.members.push(member_id.to_string());
                group.refresh_participant_line();
                true
            }
            _ => false,
        };

        if added {
            info!("Added {} to group {}", member_id, group_id);
            self.push_system_message(group_id, format!("You added {}", member_name), now);
        }
        added
    }

    /// Remove a member from a group. Absent members are a no-op.
    pub fn remove_member_from_group(&mut self, group_id: &str, member_id: &str, now: DateTime<Utc>) -> bool {
        let removed = match self.contact_mut(group_id) {
            Some(group) if group.is_group && group.has_member(member_id) => {
                group.members.retain(|m| m != member_id);
                group.refresh_participant_line();
                if group.typing_member.as_deref() == Some(member_id) {
                    group.is_typing = false;
                    group.typing_member = None;
                }
                true
            }
            _ => false,
        };

        if removed {
            // The member's contact may be gone; fall back to the raw id
            let member_name = self
                .contact(member_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| member_id.to_string());
            info!("Removed {} from group {}", member_id, group_id);
            self.push_system_message(group_id, format!("You removed {}", member_name), now);
        }
        removed
    }

    pub fn leave_group(&mut self, group_id: &str) -> bool {
        self.remove_group(group_id, "Left")
    }

    pub fn delete_group(&mut self, group_id: &str) -> bool {
        self.remove_group(group_id, "Deleted")
    }

    // Drop the group, its whole thread and the focus if it pointed here
    fn remove_group(&mut self, group_id: &str, verb: &str) -> bool {
        if !self.is_group(group_id) {
            warn!("{} ignored: {} is not a group", verb, group_id);
            return false;
        }

        self.contacts.retain(|c| c.id != group_id);
        let before = self.messages.len();
        self.messages.retain(|m| m.contact_id != group_id);
        if self.active_contact_id.as_deref() == Some(group_id) {
            self.active_contact_id = None;
        }
        info!("{} group {} ({} messages removed)", verb, group_id, before - self.messages.len());
        true
    }
}
