//! Collapsing of superseded background session starts.

use beacon_domain::constants::ACTION_START;
use beacon_domain::PendingCall;

/// Drop background start calls that are immediately followed by another
/// start call.
///
/// With the device offline or sessions starting in the background, the
/// stored queue can end up looking like:
///
/// `start(B), start(B), start(F), track, start(B), track, start(F)`
///
/// where `start(B)` is a background start and `start(F)` a foreground one.
/// The first two `start(B)` calls carry no information once the following
/// start supersedes them, so they would waste a delivery slot. A background
/// start is removed iff its *immediate* successor is a start of either
/// kind; survivors keep their order. Single forward pass, one position of
/// lookahead.
pub fn collapse_background_starts(calls: Vec<PendingCall>) -> Vec<PendingCall> {
    let mut relevant = Vec::with_capacity(calls.len());
    let mut iter = calls.into_iter().peekable();

    while let Some(call) = iter.next() {
        let superseded = call.is_background_start
            && iter.peek().is_some_and(|next| next.action == ACTION_START);
        if !superseded {
            relevant.push(call);
        }
    }

    relevant
}

#[cfg(test)]
mod tests {
    use beacon_domain::constants::{params, ACTION_TRACK};
    use beacon_domain::{DeliveryClass, NewCall, PendingCall};
    use serde_json::{json, Map};

    use super::*;

    fn background_start(seq: i64) -> PendingCall {
        let mut map = Map::new();
        map.insert(params::BACKGROUND.to_string(), json!("true"));
        PendingCall::from_new(seq, NewCall::new(ACTION_START, map, DeliveryClass::Deferred))
    }

    fn foreground_start(seq: i64) -> PendingCall {
        PendingCall::from_new(
            seq,
            NewCall::new(ACTION_START, Map::new(), DeliveryClass::Deferred),
        )
    }

    fn track(seq: i64) -> PendingCall {
        PendingCall::from_new(seq, NewCall::new(ACTION_TRACK, Map::new(), DeliveryClass::Deferred))
    }

    fn actions(calls: &[PendingCall]) -> Vec<(i64, bool)> {
        calls.iter().map(|c| (c.sequence_id, c.is_background_start)).collect()
    }

    #[test]
    fn lone_background_start_survives() {
        let result = collapse_background_starts(vec![background_start(1)]);
        assert_eq!(actions(&result), vec![(1, true)]);
    }

    #[test]
    fn background_start_followed_by_foreground_start_is_dropped() {
        let result = collapse_background_starts(vec![background_start(1), foreground_start(2)]);
        assert_eq!(actions(&result), vec![(2, false)]);
    }

    #[test]
    fn consecutive_background_starts_before_foreground_all_collapse() {
        let result = collapse_background_starts(vec![
            background_start(1),
            background_start(2),
            foreground_start(3),
        ]);
        assert_eq!(actions(&result), vec![(3, false)]);
    }

    #[test]
    fn trailing_background_start_survives_without_successor() {
        // The first background start is superseded by the one after it; the
        // last has no successor and must survive.
        let result = collapse_background_starts(vec![
            foreground_start(1),
            background_start(2),
            background_start(3),
        ]);
        assert_eq!(actions(&result), vec![(1, false), (3, true)]);
    }

    #[test]
    fn non_start_predecessor_is_never_dropped() {
        let result = collapse_background_starts(vec![track(1), background_start(2)]);
        assert_eq!(actions(&result), vec![(1, false), (2, true)]);
    }

    #[test]
    fn mixed_offline_backlog_keeps_relevant_calls_in_order() {
        let result = collapse_background_starts(vec![
            background_start(1),
            background_start(2),
            foreground_start(3),
            track(4),
            background_start(5),
            track(6),
            foreground_start(7),
        ]);
        assert_eq!(
            actions(&result),
            vec![(3, false), (4, false), (5, true), (6, false), (7, false)]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(collapse_background_starts(Vec::new()).is_empty());
    }
}
