// Call history

use log::info;
use serde::{Deserialize, Serialize};

use crate::models::{CallDirection, CallRecord, NewCall};
use crate::store::new_id;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    calls: Vec<CallRecord>,
}

impl CallLog {
    pub fn new(calls: Vec<CallRecord>) -> Self {
        CallLog { calls }
    }

    /// Newest first
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Record a call at the top of the log; missed calls never keep a duration
    pub fn add_call(&mut self, call: NewCall) -> String {
        let duration = match call.direction {
            CallDirection::Missed => None,
            _ => call.duration,
        };
        let record = CallRecord {
            id: new_id("call"),
            contact_id: call.contact_id,
            contact_name: call.contact_name,
            contact_avatar: call.contact_avatar,
            medium: call.medium,
            direction: call.direction,
            timestamp: call.timestamp,
            duration,
        };
        let id = record.id.clone();
        info!("Logged {:?} {:?} call with {}", record.direction, record.medium, record.contact_name);
        self.calls.insert(0, record);
        id
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn missed_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| c.direction == CallDirection::Missed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallMedium;
    use chrono::{TimeZone, Utc};

    fn new_call(direction: CallDirection, duration: Option<u32>) -> NewCall {
        NewCall {
            contact_id: "1".into(),
            contact_name: "Ada".into(),
            contact_avatar: String::new(),
            medium: CallMedium::Audio,
            direction,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            duration,
        }
    }

    #[test]
    fn new_calls_go_on_top() {
        let mut log = CallLog::default();
        let first = log.add_call(new_call(CallDirection::Outgoing, Some(30)));
        let second = log.add_call(new_call(CallDirection::Incoming, Some(60)));
        assert_eq!(log.calls()[0].id, second);
        assert_eq!(log.calls()[1].id, first);
    }

    #[test]
    fn missed_calls_drop_duration() {
        let mut log = CallLog::default();
        log.add_call(new_call(CallDirection::Missed, Some(99)));
        assert_eq!(log.calls()[0].duration, None);
        assert_eq!(log.missed_count(), 1);

        log.clear_calls();
        assert!(log.calls().is_empty());
    }
}
