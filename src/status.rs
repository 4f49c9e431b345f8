// Ephemeral status updates ("stories")
//
// `StatusBoard` owns every user's collection and the viewed flags.
// `StatusViewer` is the sequential viewing session: it only remembers which
// user and index are current and re-reads the board on every step, so it
// never holds on to item data that may have changed underneath it.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::models::{StatusItem, UserStatus};
use crate::store::new_id;

/// Segment count and colour hint for the avatar ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSummary {
    pub segments: usize,
    pub all_viewed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBoard {
    statuses: Vec<UserStatus>,
}

impl StatusBoard {
    pub fn new(statuses: Vec<UserStatus>) -> Self {
        StatusBoard { statuses }
    }

    pub fn statuses(&self) -> &[UserStatus] {
        &self.statuses
    }

    pub fn user(&self, user_id: &str) -> Option<&UserStatus> {
        self.statuses.iter().find(|s| s.user_id == user_id)
    }

    pub fn mine(&self) -> Option<&UserStatus> {
        self.statuses.iter().find(|s| s.is_mine)
    }

    /// Post to the local user's own collection, creating it on first use.
    /// Own items are viewed from the start.
    pub fn add_status(&mut self, media_ref: &str, owner_name: &str, now: DateTime<Utc>) -> Option<String> {
        let media_ref = media_ref.trim();
        if media_ref.is_empty() {
            return None;
        }

        let item = StatusItem {
            id: new_id("status"),
            media_ref: media_ref.to_string(),
            timestamp: now,
            viewed: true,
        };
        let id = item.id.clone();

        match self.statuses.iter_mut().find(|s| s.is_mine) {
            Some(mine) => mine.items.push(item),
            None => self.statuses.insert(
                0,
                UserStatus {
                    user_id: "me".to_string(),
                    user_name: owner_name.to_string(),
                    avatar: String::new(),
                    items: vec![item],
                    is_mine: true,
                },
            ),
        }
        info!("Posted status {}", id);
        Some(id)
    }

    /// Mark exactly one item viewed; idempotent, unknown ids are ignored
    pub fn view_status(&mut self, user_id: &str, item_id: &str) -> bool {
        let item = self
            .statuses
            .iter_mut()
            .filter(|s| s.user_id == user_id)
            .flat_map(|s| s.items.iter_mut())
            .find(|item| item.id == item_id);

        match item {
            Some(item) => {
                if !item.viewed {
                    debug!("Viewed status {} of {}", item_id, user_id);
                }
                item.viewed = true;
                true
            }
            None => false,
        }
    }

    /// Other users' non-empty collections with at least one unviewed item
    pub fn recent_updates(&self) -> Vec<&UserStatus> {
        self.others().filter(|s| s.has_unviewed()).collect()
    }

    /// Other users' non-empty collections that are fully viewed
    pub fn viewed_updates(&self) -> Vec<&UserStatus> {
        self.others().filter(|s| s.all_viewed()).collect()
    }

    fn others(&self) -> impl Iterator<Item = &UserStatus> {
        self.statuses
            .iter()
            .filter(|s| !s.is_mine && !s.items.is_empty())
    }

    pub fn ring(&self, user_id: &str) -> Option<RingSummary> {
        self.user(user_id).map(|s| RingSummary {
            segments: s.items.len(),
            all_viewed: s.all_viewed(),
        })
    }
}

/// Outcome of moving a viewer forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStep {
    Showing { index: usize, item_id: String },
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusViewer {
    user_id: String,
    index: usize,
}

impl StatusViewer {
    /// Open a user's collection at its first item and mark that item viewed.
    /// Returns `None` for unknown users and empty collections.
    pub fn open(board: &mut StatusBoard, user_id: &str) -> Option<Self> {
        let first = board.user(user_id)?.items.first()?.id.clone();
        board.view_status(user_id, &first);
        Some(StatusViewer {
            user_id: user_id.to_string(),
            index: 0,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current<'a>(&self, board: &'a StatusBoard) -> Option<&'a StatusItem> {
        board.user(&self.user_id)?.items.get(self.index)
    }

    /// Advance; the new current item is marked viewed as it becomes current.
    /// Stepping past the last item closes the viewer.
    pub fn next(&mut self, board: &mut StatusBoard) -> ViewerStep {
        let next_index = self.index + 1;
        let next_id = board
            .user(&self.user_id)
            .and_then(|s| s.items.get(next_index))
            .map(|item| item.id.clone());

        match next_id {
            Some(item_id) => {
                self.index = next_index;
                board.view_status(&self.user_id, &item_id);
                ViewerStep::Showing { index: next_index, item_id }
            }
            None => ViewerStep::Closed,
        }
    }

    /// Step back without touching viewed flags
    pub fn previous(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    /// One flag per item: filled up to and including the current one
    pub fn progress(&self, board: &StatusBoard) -> Vec<bool> {
        let len = board.user(&self.user_id).map(|s| s.items.len()).unwrap_or(0);
        (0..len).map(|i| i <= self.index).collect()
    }
}
