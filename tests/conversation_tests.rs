// Integration tests for one-to-one conversations: delivery lifecycle,
// typing and auto-replies, read state and the chat list.

mod common;

use std::sync::Arc;

use common::{config, engine, engine_with_seed, replies, run_for, setup_logging, status_of, t0};
use echochat::models::DeliveryStatus;
use echochat::presence::REPLY_PHRASES;
use echochat::{Engine, EngineEvent, ManualClock};

#[test]
fn online_contact_walks_through_every_state_then_replies_once() {
    let (mut engine, clock) = engine();
    let before = replies(&engine, "1").len();

    let id = engine.send_message("1", "Dinner at 8?").unwrap();
    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Sending));

    clock.advance_ms(500);
    engine.run_due();
    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Sent));

    clock.advance_ms(500);
    engine.run_due();
    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Delivered));
    assert!(!engine.chats().contact("1").unwrap().is_typing);

    clock.advance_ms(500);
    engine.run_due();
    assert!(engine.chats().contact("1").unwrap().is_typing);

    clock.advance_ms(500);
    engine.run_due();
    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Seen));
    assert_eq!(replies(&engine, "1").len(), before);

    // The reply lands somewhere in the 3-5s window after the send
    clock.advance_ms(3000);
    engine.run_due();
    assert!(!engine.chats().contact("1").unwrap().is_typing);

    let after = replies(&engine, "1");
    assert_eq!(after.len(), before + 1);
    let reply = after.last().unwrap();
    assert!(REPLY_PHRASES.contains(&reply.content.as_str()));
    assert_eq!(reply.status, DeliveryStatus::Seen);
    assert!(reply.sender_id.is_none());
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn events_arrive_in_timeline_order() {
    let (mut engine, clock) = engine();
    let id = engine.send_message("2", "Running late").unwrap();

    let events = run_for(&mut engine, &clock, 6000, 100);
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            EngineEvent::StatusChanged { message_id, status } => {
                assert_eq!(message_id, &id);
                match status {
                    DeliveryStatus::Sent => "sent",
                    DeliveryStatus::Delivered => "delivered",
                    DeliveryStatus::Seen => "seen",
                    DeliveryStatus::Sending => "sending",
                }
            }
            EngineEvent::TypingStarted { .. } => "typing",
            EngineEvent::ReplyReceived { .. } => "reply",
        })
        .collect();
    assert_eq!(kinds, vec!["sent", "delivered", "typing", "seen", "reply"]);
}

#[test]
fn offline_contact_gets_receipts_but_never_types_or_replies() {
    let (mut engine, clock) = engine();
    let before = replies(&engine, "3").len();

    let id = engine.send_message("3", "Call me when you land").unwrap();
    let events = run_for(&mut engine, &clock, 8000, 250);

    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Seen));
    assert!(events.iter().all(|e| matches!(e, EngineEvent::StatusChanged { .. })));
    assert_eq!(events.len(), 3);
    assert!(!engine.chats().contact("3").unwrap().is_typing);
    assert_eq!(replies(&engine, "3").len(), before);
}

#[test]
fn going_online_turns_replies_on() {
    let (mut engine, clock) = engine();
    assert!(engine.toggle_online_status("3"));
    assert!(engine.chats().contact("3").unwrap().is_online);

    let before = replies(&engine, "3").len();
    engine.send_message("3", "You around?").unwrap();
    run_for(&mut engine, &clock, 5000, 500);
    assert_eq!(replies(&engine, "3").len(), before + 1);

    // Groups have no presence of their own
    assert!(!engine.toggle_online_status("6"));
    assert!(!engine.toggle_online_status("nobody"));
}

#[test]
fn sends_to_unknown_conversations_or_blank_text_are_ignored() {
    let (mut engine, _) = engine();
    let count = engine.messages().len();

    assert!(engine.send_message("nobody", "hello?").is_none());
    assert!(engine.send_message("1", "   ").is_none());
    assert_eq!(engine.messages().len(), count);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn sent_text_is_trimmed() {
    let (mut engine, _) = engine();
    let id = engine.send_message("1", "  see you soon \n").unwrap();
    assert_eq!(engine.chats().message(&id).unwrap().content, "see you soon");
}

#[test]
fn opening_a_conversation_clears_its_unread_count_immediately() {
    let (mut engine, _) = engine();
    assert_eq!(engine.unread_count("4"), 1);

    assert!(engine.set_active_conversation(Some("4")));
    assert_eq!(engine.unread_count("4"), 0);
    assert_eq!(engine.unread_count("1"), 1);

    // Unknown ids leave the focus where it was
    assert!(!engine.set_active_conversation(Some("ghost")));
    assert_eq!(engine.active_contact_id(), Some("4"));

    assert!(engine.set_active_conversation(None));
    assert_eq!(engine.active_contact_id(), None);
}

#[test]
fn replies_never_count_as_unread() {
    let (mut engine, clock) = engine();
    let unread = engine.unread_count("7");

    engine.send_message("7", "Gym later?").unwrap();
    run_for(&mut engine, &clock, 6000, 500);
    assert_eq!(engine.unread_count("7"), unread);
}

#[test]
fn latest_conversation_moves_to_the_top_of_the_list() {
    let (mut engine, _) = engine();
    engine.send_message("8", "Long time no see").unwrap();

    let list = engine.conversation_list();
    assert_eq!(list[0].contact.id, "8");
    assert_eq!(list.len(), engine.contacts().len());
}

#[test]
fn search_query_filters_the_list_by_name() {
    let (mut engine, _) = engine();
    engine.set_search_query("son");
    let names: Vec<String> = engine
        .conversation_list()
        .iter()
        .map(|row| row.contact.name.clone())
        .collect();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.to_lowercase().contains("son")));

    engine.set_search_query("");
    assert_eq!(engine.conversation_list().len(), engine.contacts().len());
}

#[test]
fn same_seed_gives_the_same_reply() {
    let run = |seed| {
        let (mut engine, clock) = engine_with_seed(seed);
        engine.send_message("1", "Pick a number").unwrap();
        run_for(&mut engine, &clock, 6000, 500);
        replies(&engine, "1").last().map(|m| m.content.clone())
    };
    assert_eq!(run(9), run(9));
}

#[test]
fn delivery_state_never_moves_backwards() {
    let (mut engine, clock) = engine();
    let id = engine.send_message("4", "Reviewed, looks good").unwrap();

    let mut seen = vec![status_of(&engine, &id).unwrap()];
    for _ in 0..30 {
        clock.advance_ms(100);
        engine.run_due();
        seen.push(status_of(&engine, &id).unwrap());
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&DeliveryStatus::Seen));
}

#[test]
fn typing_slower_than_the_reply_is_still_cleared() {
    setup_logging();
    let mut config = config(42);
    config.presence.typing_ms = 4000;
    config.presence.reply_min_ms = 3000;
    config.presence.reply_max_ms = 3000;
    assert!(config.validate().is_err());

    let clock = ManualClock::new(t0());
    let mut engine = Engine::new(config, Arc::new(clock.clone()));
    let before = replies(&engine, "1").len();
    engine.send_message("1", "Still there?").unwrap();

    run_for(&mut engine, &clock, 60_000, 500);
    assert!(!engine.chats().contact("1").unwrap().is_typing);
    assert_eq!(replies(&engine, "1").len(), before + 1);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn out_of_range_offsets_do_not_panic_on_send() {
    setup_logging();
    let mut config = config(42);
    config.delivery.seen_ms = u64::MAX / 2;
    assert!(config.validate().is_err());

    let clock = ManualClock::new(t0());
    let mut engine = Engine::new(config, Arc::new(clock.clone()));
    let id = engine.send_message("3", "hi").unwrap();

    run_for(&mut engine, &clock, 5_000, 500);
    assert_eq!(status_of(&engine, &id), Some(DeliveryStatus::Delivered));
    assert_eq!(engine.pending_tasks(), 0);
}
