// Counterparty simulation
//
// There is no remote party, so after every outbound send we decide whether
// somebody "answers": an online 1:1 contact, or a random member of a
// non-empty group. The answer is two tasks, a typing indicator and later
// the reply itself. Both are resolved against the store when they fire, so
// a conversation deleted in between swallows them.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

use crate::config::PresenceTimings;
use crate::scheduler::{fire_time, offset_ms, Task, TaskQueue};
use crate::store::ChatStore;

/// Canned replies the simulated counterparty picks from
pub const REPLY_PHRASES: &[&str] = &[
    "Sounds good to me!",
    "Give me a minute, I'll check",
    "Ha, classic 😄",
    "Omw, ten minutes out",
    "Busy right now, talk later?",
    "Perfect, see you there 👍",
    "Thanks for the heads up!",
    "Funny, I was just thinking about that",
    "Count me in",
    "Shout if you need anything else",
    "That's great news 🎉",
    "Sorry, only just saw this",
    "Deal ✨",
];

/// What a counterparty will do in response to a send
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyPlan {
    pub conversation_id: String,
    pub responder_id: String,
    pub content: String,
    pub typing_after: Duration,
    pub reply_after: Duration,
}

pub struct PresenceSimulator {
    timings: PresenceTimings,
    rng: Box<dyn RngCore + Send>,
}

impl std::fmt::Debug for PresenceSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSimulator")
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl PresenceSimulator {
    /// Use any random source; tests pass a seeded one
    pub fn new(timings: PresenceTimings, rng: impl RngCore + Send + 'static) -> Self {
        PresenceSimulator {
            timings,
            rng: Box::new(rng),
        }
    }

    /// Seeded when `seed` is given, otherwise from OS entropy
    pub fn from_seed(timings: PresenceTimings, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(timings, StdRng::seed_from_u64(seed)),
            None => Self::new(timings, StdRng::from_entropy()),
        }
    }

    /// Decide whether anyone answers a send to `conversation_id`
    pub fn plan(&mut self, store: &ChatStore, conversation_id: &str) -> Option<ReplyPlan> {
        let conversation = store.contact(conversation_id)?;

        let responder_id = if conversation.is_group {
            let chosen = conversation.members.choose(&mut self.rng)?;
            // A member whose contact is gone cannot answer
            store.contact(chosen)?;
            chosen.clone()
        } else if conversation.is_online {
            conversation.id.clone()
        } else {
            debug!("{} is offline, no reply", conversation_id);
            return None;
        };

        let content = REPLY_PHRASES.choose(&mut self.rng)?.to_string();
        let (low, high) = (self.timings.reply_min_ms, self.timings.reply_max_ms);
        let reply_ms = self.rng.gen_range(low.min(high)..=high.max(low));
        // Typing never starts after the reply that clears it
        let typing_ms = self.timings.typing_ms.min(reply_ms);

        Some(ReplyPlan {
            conversation_id: conversation_id.to_string(),
            responder_id,
            content,
            typing_after: offset_ms(typing_ms),
            reply_after: offset_ms(reply_ms),
        })
    }

    /// Plan and enqueue a reply; returns the plan when one was scheduled
    pub fn schedule(
        &mut self,
        queue: &mut TaskQueue,
        store: &ChatStore,
        conversation_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Option<ReplyPlan> {
        let plan = self.plan(store, conversation_id)?;
        let (Some(typing_at), Some(reply_at)) = (
            fire_time(sent_at, plan.typing_after),
            fire_time(sent_at, plan.reply_after),
        ) else {
            warn!("Reply offset out of range, {} stays silent", conversation_id);
            return None;
        };
        queue.schedule(
            typing_at,
            Task::StartTyping {
                conversation_id: plan.conversation_id.clone(),
                responder_id: plan.responder_id.clone(),
            },
        );
        queue.schedule(
            reply_at,
            Task::Reply {
                conversation_id: plan.conversation_id.clone(),
                responder_id: plan.responder_id.clone(),
                content: plan.content.clone(),
            },
        );
        debug!(
            "{} will answer in {} after {}ms",
            plan.responder_id,
            plan.conversation_id,
            plan.reply_after.num_milliseconds()
        );
        Some(plan)
    }

    /// Show the typing indicator, unless the conversation or responder is gone
    pub fn start_typing(&self, store: &mut ChatStore, conversation_id: &str, responder_id: &str) -> bool {
        let still_there = match store.contact(conversation_id) {
            Some(c) if c.is_group => c.has_member(responder_id),
            Some(_) => true,
            None => false,
        };
        if !still_there {
            debug!("Discarding typing for {} in {}", responder_id, conversation_id);
            return false;
        }
        store.set_typing_as(conversation_id, true, Some(responder_id))
    }

    /// Clear typing and land the reply
    pub fn deliver_reply(
        &self,
        store: &mut ChatStore,
        conversation_id: &str,
        responder_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if store.contact(conversation_id).is_none() {
            debug!("Discarding reply to deleted conversation {}", conversation_id);
            return None;
        }
        store.set_typing_as(conversation_id, false, None);
        store.append_reply(conversation_id, responder_id, content, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contact;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn store() -> ChatStore {
        ChatStore::new(
            vec![
                Contact::person("on", "Online", "", true, t0()),
                Contact::person("off", "Offline", "", false, t0()),
                Contact::group("g", "Team", vec!["on".into(), "off".into()], "user", t0()),
                Contact::group("empty", "Nobody", Vec::new(), "user", t0()),
            ],
            Vec::new(),
        )
    }

    fn simulator(seed: u64) -> PresenceSimulator {
        PresenceSimulator::from_seed(PresenceTimings::default(), Some(seed))
    }

    #[test]
    fn online_contact_answers_within_the_window() {
        let plan = simulator(7).plan(&store(), "on").unwrap();
        assert_eq!(plan.responder_id, "on");
        assert!(REPLY_PHRASES.contains(&plan.content.as_str()));
        assert_eq!(plan.typing_after, Duration::milliseconds(1500));
        let reply_ms = plan.reply_after.num_milliseconds();
        assert!((3000..=5000).contains(&reply_ms));
    }

    #[test]
    fn offline_contact_and_empty_group_stay_silent() {
        let mut sim = simulator(7);
        assert!(sim.plan(&store(), "off").is_none());
        assert!(sim.plan(&store(), "empty").is_none());
        assert!(sim.plan(&store(), "missing").is_none());
    }

    #[test]
    fn group_responder_is_a_member_even_if_offline() {
        let store = store();
        let mut sim = simulator(11);
        for _ in 0..20 {
            let plan = sim.plan(&store, "g").unwrap();
            assert!(plan.responder_id == "on" || plan.responder_id == "off");
        }
    }

    #[test]
    fn same_seed_same_plan() {
        let store = store();
        assert_eq!(simulator(42).plan(&store, "g"), simulator(42).plan(&store, "g"));
    }

    #[test]
    fn group_reply_carries_sender_and_clears_typing() {
        let mut store = store();
        let sim = simulator(1);
        assert!(sim.start_typing(&mut store, "g", "on"));
        assert_eq!(store.contact("g").unwrap().typing_member.as_deref(), Some("on"));

        let id = sim.deliver_reply(&mut store, "g", "on", "hey", t0()).unwrap();
        let reply = store.message(&id).unwrap();
        assert_eq!(reply.sender_id.as_deref(), Some("on"));
        assert_eq!(reply.sender_name.as_deref(), Some("Online"));
        assert!(!store.contact("g").unwrap().is_typing);
    }

    #[test]
    fn direct_reply_has_no_sender() {
        let mut store = store();
        let sim = simulator(1);
        let id = sim.deliver_reply(&mut store, "on", "on", "hey", t0()).unwrap();
        assert!(store.message(&id).unwrap().sender_id.is_none());
    }

    #[test]
    fn typing_is_clamped_to_the_reply_instant() {
        let timings = PresenceTimings { typing_ms: 4000, reply_min_ms: 3000, reply_max_ms: 3000 };
        let plan = PresenceSimulator::from_seed(timings, Some(3)).plan(&store(), "on").unwrap();
        assert_eq!(plan.typing_after, Duration::milliseconds(3000));
        assert_eq!(plan.reply_after, Duration::milliseconds(3000));
    }

    #[test]
    fn unreachable_reply_time_schedules_nothing() {
        let timings = PresenceTimings {
            typing_ms: 1500,
            reply_min_ms: u64::MAX / 2,
            reply_max_ms: u64::MAX / 2,
        };
        let mut sim = PresenceSimulator::from_seed(timings, Some(3));
        let mut queue = TaskQueue::new();
        assert!(sim.schedule(&mut queue, &store(), "on", t0()).is_none());
        assert!(queue.is_empty());
    }
}
