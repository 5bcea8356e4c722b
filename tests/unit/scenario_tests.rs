/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use oum_sequencer::{ChannelEmitter, DropReason, Sequencer, SequencerConfig, SequencerRequest};
use oum_sequencer::wire::parse_stamped;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Barrier};
use std::thread;

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn replicas(group: u8) -> Vec<SocketAddr> {
        (1..=3)
            .map(|i| addr(&format!("10.100.{group}.1{i}:12345")))
            .collect()
    }

    fn two_groups() -> SequencerConfig {
        SequencerConfig::new(2)
            .with_group(0, replicas(0))
            .with_group(1, replicas(1))
            .with_destination(addr("10.100.0.1:12345"), 0)
            .with_destination(addr("10.100.1.1:12345"), 1)
    }

    fn sequences(rx: &crossbeam::channel::Receiver<bytes::Bytes>) -> Vec<(u32, u32)> {
        rx.try_iter()
            .map(|packet| {
                let (stamp, _) = parse_stamped(&packet).unwrap();
                (stamp.group_id, stamp.sequence)
            })
            .collect()
    }

    #[test]
    fn test_consecutive_requests_to_one_group() {
        let emitter = ChannelEmitter::new(64);
        let inboxes: Vec<_> = replicas(0).into_iter().map(|r| emitter.attach(r)).collect();
        let sequencer = Sequencer::new(emitter, &two_groups()).unwrap();

        for _ in 0..3 {
            let outcome = sequencer.process(SequencerRequest::framed(addr("10.100.0.1:12345"), b"op"));
            assert!(outcome.is_success());
        }

        for inbox in &inboxes {
            assert_eq!(sequences(inbox), vec![(0, 0), (0, 1), (0, 2)]);
        }
        assert_eq!(sequencer.counter(0), Some(3));
        assert_eq!(sequencer.counter(1), Some(0));
    }

    #[test]
    fn test_concurrent_requests_reach_every_replica() {
        let destination = addr("10.100.0.1:12345");
        let config = SequencerConfig::new(1)
            .with_group(0, replicas(0))
            .with_destination(destination, 0);
        let emitter = ChannelEmitter::new(64);
        let inboxes: Vec<_> = replicas(0).into_iter().map(|r| emitter.attach(r)).collect();
        let sequencer = Arc::new(Sequencer::new(emitter, &config).unwrap());

        let barrier = Arc::new(Barrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sequencer = Arc::clone(&sequencer);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let outcome = sequencer.process(SequencerRequest::framed(destination, b"op"));
                    *outcome.receipt().unwrap()
                })
            })
            .collect();

        let issued: BTreeSet<u32> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .inspect(|receipt| assert!(receipt.is_fully_delivered()))
            .map(|receipt| receipt.sequence_num())
            .collect();
        assert_eq!(issued, BTreeSet::from([0, 1, 2]));

        for inbox in &inboxes {
            let seen: BTreeSet<u32> = sequences(inbox).into_iter().map(|(_, seq)| seq).collect();
            assert_eq!(seen, BTreeSet::from([0, 1, 2]));
        }
        assert_eq!(sequencer.counter(0), Some(3));
    }

    #[test]
    fn test_interleaved_groups_are_independent() {
        let emitter = ChannelEmitter::new(64);
        let g0 = emitter.attach(replicas(0)[0]);
        let g1 = emitter.attach(replicas(1)[0]);
        let sequencer = Sequencer::new(emitter, &two_groups()).unwrap();

        for destination in ["10.100.0.1:12345", "10.100.1.1:12345", "10.100.0.1:12345"] {
            sequencer.process(SequencerRequest::framed(addr(destination), b"op"));
        }

        assert_eq!(sequences(&g0), vec![(0, 0), (0, 1)]);
        assert_eq!(sequences(&g1), vec![(1, 0)]);
    }

    #[test]
    fn test_counter_at_maximum_wraps_on_next_issue() {
        let emitter = ChannelEmitter::new(64);
        let inbox = emitter.attach(replicas(0)[0]);
        let config = two_groups().with_start_value(u32::MAX);
        let sequencer = Sequencer::new(emitter, &config).unwrap();

        let first = sequencer.process(SequencerRequest::framed(addr("10.100.0.1:12345"), b"a"));
        let second = sequencer.process(SequencerRequest::framed(addr("10.100.0.1:12345"), b"b"));

        assert_eq!(first.receipt().unwrap().sequence_num(), u32::MAX);
        assert!(!first.receipt().unwrap().wrapped);
        assert_eq!(second.receipt().unwrap().sequence_num(), 0);
        assert!(second.receipt().unwrap().wrapped);
        assert_eq!(sequences(&inbox), vec![(0, u32::MAX), (0, 0)]);
        assert_eq!(sequencer.stats().wrapped, 1);
    }

    #[test]
    fn test_dropped_requests_leave_no_gap() {
        let emitter = ChannelEmitter::new(64);
        let inbox = emitter.attach(replicas(1)[2]);
        let sequencer = Sequencer::new(emitter, &two_groups()).unwrap();

        let stranger = sequencer.process(SequencerRequest::framed(addr("192.0.2.1:12345"), b"x"));
        assert_eq!(stranger.drop_reason(), Some(DropReason::Unresolved));

        for _ in 0..5 {
            sequencer.process(SequencerRequest::framed(addr("10.100.1.1:12345"), b"op"));
            sequencer.process(SequencerRequest::framed(addr("192.0.2.1:12345"), b"x"));
        }

        let seen: Vec<u32> = sequences(&inbox).into_iter().map(|(_, seq)| seq).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(sequencer.stats().dropped_unresolved, 6);
    }

    #[test]
    fn test_payload_is_forwarded_untouched() {
        let emitter = ChannelEmitter::new(8);
        let inbox = emitter.attach(replicas(0)[1]);
        let sequencer = Sequencer::new(emitter, &two_groups().with_session(3)).unwrap();

        let payload: Vec<u8> = (0..=255u8).collect();
        sequencer.process(SequencerRequest::framed(addr("10.100.0.1:12345"), &payload));

        let packet = inbox.try_recv().unwrap();
        let (stamp, forwarded) = parse_stamped(&packet).unwrap();
        assert_eq!(stamp.session, 3);
        assert_eq!(forwarded, payload.as_slice());
    }
}
