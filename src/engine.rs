// Simulation engine
//
// `Engine` is the one place the whole client-local state lives: the chat
// store, call history, status board and the queue of deferred tasks. Inbound
// operations mutate synchronously and may schedule tasks; `run_due` later
// fires whatever has come due on the engine's clock. The engine is not
// internally synchronised. Share it behind a mutex (see `SharedEngine`) so
// that every operation runs to completion before another starts.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::calls::CallLog;
use crate::clock::{Clock, SystemClock};
use crate::config::SimConfig;
use crate::delivery::DeliveryScheduler;
use crate::error::Result;
use crate::models::{CallRecord, Contact, DeliveryStatus, Message, NewCall, UserStatus};
use crate::persistence::{SnapshotStore, CALLS_SNAPSHOT, CHATS_SNAPSHOT, STATUS_SNAPSHOT};
use crate::presence::PresenceSimulator;
use crate::queries::{self, ConversationSummary};
use crate::scheduler::{Task, TaskQueue};
use crate::seed::{self, LOCAL_USER_ID};
use crate::status::{StatusBoard, StatusViewer, ViewerStep};
use crate::store::ChatStore;

pub type SharedEngine = Arc<TokioMutex<Engine>>;

// Process-wide instance; installed once by the binary, never torn down
static GLOBAL_ENGINE: OnceCell<SharedEngine> = OnceCell::new();

/// Install the process-wide engine. A second install keeps the first
/// engine and hands it back.
pub fn install_global(engine: Engine) -> SharedEngine {
    let shared = GLOBAL_ENGINE.get_or_init(|| Arc::new(TokioMutex::new(engine)));
    shared.clone()
}

pub fn global() -> Option<SharedEngine> {
    GLOBAL_ENGINE.get().cloned()
}

#[derive(Debug)]
pub struct Engine {
    config: SimConfig,
    clock: Arc<dyn Clock>,
    chats: ChatStore,
    calls: CallLog,
    statuses: StatusBoard,
    queue: TaskQueue,
    delivery: DeliveryScheduler,
    presence: PresenceSimulator,
}

impl Engine {
    /// An engine over the seed data, stamped relative to the clock's now
    pub fn new(config: SimConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self::with_state(
            config,
            clock,
            seed::chat_store(now),
            seed::call_log(now),
            seed::status_board(now),
        )
    }

    /// Seeded engine on wall-clock time
    pub fn with_defaults() -> Self {
        Self::new(SimConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_state(
        config: SimConfig,
        clock: Arc<dyn Clock>,
        chats: ChatStore,
        calls: CallLog,
        statuses: StatusBoard,
    ) -> Self {
        let delivery = DeliveryScheduler::new(config.delivery.clone());
        let presence = PresenceSimulator::from_seed(config.presence.clone(), config.seed);
        Engine {
            config,
            clock,
            chats,
            calls,
            statuses,
            queue: TaskQueue::new(),
            delivery,
            presence,
        }
    }

    /// Swap in a different presence simulator (e.g. one with a fixed RNG)
    pub fn with_presence(mut self, presence: PresenceSimulator) -> Self {
        self.presence = presence;
        self
    }

    /// Restore from snapshots, falling back to seed data per slice.
    /// Transient typing is dropped and unfinished deliveries are re-armed.
    pub fn load(config: SimConfig, clock: Arc<dyn Clock>, snapshots: &SnapshotStore) -> Self {
        let now = clock.now();
        let mut chats: ChatStore = snapshots.load_or(CHATS_SNAPSHOT, || seed::chat_store(now));
        let calls: CallLog = snapshots.load_or(CALLS_SNAPSHOT, || seed::call_log(now));
        let statuses: StatusBoard = snapshots.load_or(STATUS_SNAPSHOT, || seed::status_board(now));

        chats.clear_typing();
        chats.repair_active_pointer();

        let mut engine = Self::with_state(config, clock, chats, calls, statuses);
        let mut resumed = 0;
        for message in engine.chats.pending_outbound() {
            resumed += engine.delivery.resume(&mut engine.queue, message, now);
        }
        if resumed > 0 {
            info!("Re-armed {} delivery steps after reload", resumed);
        }
        engine
    }

    /// Write all three snapshots
    pub fn save(&self, snapshots: &SnapshotStore) -> Result<()> {
        snapshots.save(CHATS_SNAPSHOT, &self.chats)?;
        snapshots.save(CALLS_SNAPSHOT, &self.calls)?;
        snapshots.save(STATUS_SNAPSHOT, &self.statuses)?;
        Ok(())
    }

    // ----- observations -----

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn chats(&self) -> &ChatStore {
        &self.chats
    }

    pub fn contacts(&self) -> &[Contact] {
        self.chats.contacts()
    }

    pub fn messages(&self) -> &[Message] {
        self.chats.messages()
    }

    pub fn calls(&self) -> &[CallRecord] {
        self.calls.calls()
    }

    pub fn statuses(&self) -> &[UserStatus] {
        self.statuses.statuses()
    }

    pub fn status_board(&self) -> &StatusBoard {
        &self.statuses
    }

    pub fn active_contact_id(&self) -> Option<&str> {
        self.chats.active_contact_id()
    }

    pub fn search_query(&self) -> &str {
        self.chats.search_query()
    }

    pub fn unread_count(&self, contact_id: &str) -> usize {
        self.chats.unread_count(contact_id)
    }

    /// The chat list under the current search filter
    pub fn conversation_list(&self) -> Vec<ConversationSummary<'_>> {
        queries::conversation_list(self.chats.contacts(), self.chats.messages(), self.chats.search_query())
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.next_due()
    }

    // ----- conversation operations -----

    pub fn set_active_conversation(&mut self, contact_id: Option<&str>) -> bool {
        self.chats.set_active_conversation(contact_id)
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.chats.set_search_query(query);
    }

    /// Send a message; returns immediately after scheduling its delivery
    /// steps and, if someone is there to answer, their reply.
    pub fn send_message(&mut self, contact_id: &str, text: &str) -> Option<String> {
        let now = self.now();
        let id = self.chats.send_message(contact_id, text, now)?;
        self.delivery.schedule(&mut self.queue, &id, now);
        self.presence.schedule(&mut self.queue, &self.chats, contact_id, now);
        Some(id)
    }

    pub fn set_typing(&mut self, contact_id: &str, is_typing: bool) -> bool {
        self.chats.set_typing(contact_id, is_typing)
    }

    pub fn toggle_online_status(&mut self, contact_id: &str) -> bool {
        let now = self.now();
        self.chats.toggle_online_status(contact_id, now)
    }

    // ----- groups -----

    pub fn create_group(&mut self, name: &str, member_ids: &[String]) -> Option<String> {
        let now = self.now();
        self.chats.create_group(name, member_ids, LOCAL_USER_ID, now)
    }

    pub fn update_group_name(&mut self, group_id: &str, name: &str) -> bool {
        self.chats.update_group_name(group_id, name)
    }

    pub fn add_member_to_group(&mut self, group_id: &str, member_id: &str) -> bool {
        let now = self.now();
        self.chats.add_member_to_group(group_id, member_id, now)
    }

    pub fn remove_member_from_group(&mut self, group_id: &str, member_id: &str) -> bool {
        let now = self.now();
        self.chats.remove_member_from_group(group_id, member_id, now)
    }

    pub fn leave_group(&mut self, group_id: &str) -> bool {
        let doomed = self.thread_ids(group_id);
        let left = self.chats.leave_group(group_id);
        if left {
            self.cancel_conversation_tasks(group_id, &doomed);
        }
        left
    }

    pub fn delete_group(&mut self, group_id: &str) -> bool {
        let doomed = self.thread_ids(group_id);
        let deleted = self.chats.delete_group(group_id);
        if deleted {
            self.cancel_conversation_tasks(group_id, &doomed);
        }
        deleted
    }

    fn thread_ids(&self, contact_id: &str) -> HashSet<String> {
        self.chats.conversation(contact_id).map(|m| m.id.clone()).collect()
    }

    // Tasks would no-op at fire time anyway; dropping them keeps the queue small
    fn cancel_conversation_tasks(&mut self, contact_id: &str, message_ids: &HashSet<String>) {
        let dropped = self.queue.cancel_where(|task| match task {
            Task::Deliver { message_id, .. } => message_ids.contains(message_id),
            other => other.conversation_id() == Some(contact_id),
        });
        debug!("Dropped {} pending tasks for {}", dropped, contact_id);
    }

    // ----- status -----

    pub fn add_status(&mut self, media_ref: &str) -> Option<String> {
        let now = self.now();
        let owner = self.config.user_name.clone();
        self.statuses.add_status(media_ref, &owner, now)
    }

    pub fn view_status(&mut self, user_id: &str, item_id: &str) -> bool {
        self.statuses.view_status(user_id, item_id)
    }

    pub fn open_status_viewer(&mut self, user_id: &str) -> Option<StatusViewer> {
        StatusViewer::open(&mut self.statuses, user_id)
    }

    pub fn advance_status_viewer(&mut self, viewer: &mut StatusViewer) -> ViewerStep {
        viewer.next(&mut self.statuses)
    }

    // ----- calls -----

    pub fn add_call(&mut self, call: NewCall) -> String {
        self.calls.add_call(call)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear_calls();
    }

    // ----- timers -----

    /// Fire every task due at the clock's current time, in schedule order.
    /// Tasks that found their target gone produce no event.
    pub fn run_due(&mut self) -> Vec<EngineEvent> {
        let now = self.now();
        let mut events = Vec::new();
        while let Some(scheduled) = self.queue.pop_due(now) {
            if let Some(event) = self.apply(scheduled.task, now) {
                events.push(event);
            }
        }
        events
    }

    fn apply(&mut self, task: Task, now: DateTime<Utc>) -> Option<EngineEvent> {
        match task {
            Task::Deliver { message_id, to } => self
                .delivery
                .apply(&mut self.chats, &message_id, to)
                .then_some(EngineEvent::StatusChanged { message_id, status: to }),
            Task::StartTyping {
                conversation_id,
                responder_id,
            } => self
                .presence
                .start_typing(&mut self.chats, &conversation_id, &responder_id)
                .then_some(EngineEvent::TypingStarted {
                    conversation_id,
                    responder_id,
                }),
            Task::Reply {
                conversation_id,
                responder_id,
                content,
            } => match self
                .presence
                .deliver_reply(&mut self.chats, &conversation_id, &responder_id, &content, now)
            {
                Some(message_id) => {
                    info!("Reply {} from {} in {}", message_id, responder_id, conversation_id);
                    Some(EngineEvent::ReplyReceived {
                        conversation_id,
                        message_id,
                    })
                }
                None => {
                    warn!("Reply from {} in {} discarded", responder_id, conversation_id);
                    None
                }
            },
        }
    }
}

/// Something a fired task changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusChanged { message_id: String, status: DeliveryStatus },
    TypingStarted { conversation_id: String, responder_id: String },
    ReplyReceived { conversation_id: String, message_id: String },
}
