// Simulated delivery receipts
//
// An outbound message walks sending -> sent -> delivered -> seen on a fixed
// schedule measured from the moment it was sent. Each step is a separate
// task keyed by message id, so a step for a message that no longer exists
// simply does nothing, and a step that arrives after the message already
// moved further never pulls it back.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::config::DeliveryTimings;
use crate::models::{DeliveryStatus, Message};
use crate::scheduler::{fire_time, offset_ms, Task, TaskQueue};
use crate::store::ChatStore;

#[derive(Debug, Clone, Default)]
pub struct DeliveryScheduler {
    timings: DeliveryTimings,
}

impl DeliveryScheduler {
    pub fn new(timings: DeliveryTimings) -> Self {
        DeliveryScheduler { timings }
    }

    /// The (target state, offset from send) pairs in lattice order
    pub fn steps(&self) -> [(DeliveryStatus, Duration); 3] {
        [
            (DeliveryStatus::Sent, offset_ms(self.timings.sent_ms)),
            (DeliveryStatus::Delivered, offset_ms(self.timings.delivered_ms)),
            (DeliveryStatus::Seen, offset_ms(self.timings.seen_ms)),
        ]
    }

    /// Schedule all three steps for a freshly sent message
    pub fn schedule(&self, queue: &mut TaskQueue, message_id: &str, sent_at: DateTime<Utc>) {
        for (to, offset) in self.steps() {
            let Some(fire_at) = fire_time(sent_at, offset) else {
                warn!("Skipping {:?} step for {}: offset out of range", to, message_id);
                continue;
            };
            queue.schedule(fire_at, Task::Deliver { message_id: message_id.to_string(), to });
        }
    }

    /// Re-arm the steps a message has not reached yet, e.g. after a reload.
    /// Steps whose time has passed fire at `now`.
    pub fn resume(&self, queue: &mut TaskQueue, message: &Message, now: DateTime<Utc>) -> usize {
        let mut armed = 0;
        for (to, offset) in self.steps() {
            if to <= message.status {
                continue;
            }
            let Some(due) = fire_time(message.timestamp, offset) else {
                warn!("Skipping {:?} step for {}: offset out of range", to, message.id);
                continue;
            };
            let fire_at = std::cmp::max(due, now);
            queue.schedule(fire_at, Task::Deliver { message_id: message.id.clone(), to });
            armed += 1;
        }
        if armed > 0 {
            debug!("Resumed {} delivery steps for {}", armed, message.id);
        }
        armed
    }

    /// Apply one step. Vanished messages and stale steps are no-ops.
    pub fn apply(&self, store: &mut ChatStore, message_id: &str, to: DeliveryStatus) -> bool {
        store.advance_delivery(message_id, to)
    }
}
