// Deferred task queue
//
// Timers are plain data: an id, the instant they become due and a payload
// saying what to do. Nothing here knows how a payload is applied; the engine
// pops due tasks and routes them. Tasks with the same fire instant pop in the
// order they were scheduled.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::models::DeliveryStatus;

pub type TaskId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Move an outbound message forward to `to`
    Deliver { message_id: String, to: DeliveryStatus },
    /// Counterparty starts composing in `conversation_id`
    StartTyping {
        conversation_id: String,
        responder_id: String,
    },
    /// Counterparty stops composing and its reply lands
    Reply {
        conversation_id: String,
        responder_id: String,
        content: String,
    },
}

/// A configured millisecond offset, saturated instead of wrapping
pub fn offset_ms(value: u64) -> Duration {
    Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX))
}

/// `base + offset`, or `None` when that falls outside the representable range
pub fn fire_time(base: DateTime<Utc>, offset: Duration) -> Option<DateTime<Utc>> {
    base.checked_add_signed(offset)
}

impl Task {
    /// The conversation this task belongs to, when known without a store lookup
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Task::Deliver { .. } => None,
            Task::StartTyping { conversation_id, .. } | Task::Reply { conversation_id, .. } => {
                Some(conversation_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub fire_at: DateTime<Utc>,
    pub task: Task,
}

// Heap entry ordered by (fire_at, id); ids grow monotonically
#[derive(Debug)]
struct Entry {
    key: (DateTime<Utc>, TaskId),
    task: ScheduledTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_id: TaskId,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at: DateTime<Utc>, task: Task) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Scheduling task {} at {}: {:?}", id, fire_at, task);
        self.heap.push(Reverse(Entry {
            key: (fire_at, id),
            task: ScheduledTask { id, fire_at, task },
        }));
        id
    }

    /// Pop the earliest task if it is due at `now`
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledTask> {
        let due = matches!(self.heap.peek(), Some(Reverse(entry)) if entry.key.0 <= now);
        if due {
            self.heap.pop().map(|Reverse(entry)| entry.task)
        } else {
            None
        }
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(entry)| entry.key.0)
    }

    /// Drop every pending task matching `predicate`, returning how many went
    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        let before = self.heap.len();
        let kept: Vec<Reverse<Entry>> = self
            .heap
            .drain()
            .filter(|Reverse(entry)| !predicate(&entry.task.task))
            .collect();
        self.heap = kept.into_iter().collect();
        before - self.heap.len()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
