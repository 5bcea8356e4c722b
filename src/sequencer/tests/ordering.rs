/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Tests for sequence number ordering guarantees.

#[cfg(test)]
mod tests {
    use crate::config::SequencerConfig;
    use crate::emitter::ChannelEmitter;
    use crate::sequencer::{Sequencer, SequencerRequest};
    use crate::wire::parse_stamped;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn destination() -> SocketAddr {
        addr("10.0.0.1:7000")
    }

    fn replicas() -> [SocketAddr; 3] {
        [
            addr("10.0.0.11:7000"),
            addr("10.0.0.12:7000"),
            addr("10.0.0.13:7000"),
        ]
    }

    fn make_sequencer() -> Sequencer<ChannelEmitter> {
        let config = SequencerConfig::new(1)
            .with_group(0, replicas())
            .with_destination(destination(), 0);
        Sequencer::new(ChannelEmitter::new(4096), &config).unwrap()
    }

    #[test]
    fn test_monotonic_sequence_numbers() {
        let mut sequencer = make_sequencer();

        let sequences = Arc::new(Mutex::new(Vec::new()));
        let sequences_clone = sequences.clone();

        sequencer.add_listener(move |event| {
            sequences_clone.lock().unwrap().push(event.sequence_num());
        });

        for i in 0..100u32 {
            let payload = i.to_be_bytes();
            let outcome = sequencer.process(SequencerRequest::framed(destination(), &payload));
            assert!(outcome.is_success());
        }

        let seq_vec = sequences.lock().unwrap();
        assert_eq!(seq_vec.len(), 100);

        for (i, seq) in seq_vec.iter().enumerate() {
            assert_eq!(*seq, i as u32);
        }
    }

    #[test]
    fn test_no_gaps_in_sequence() {
        let sequencer = make_sequencer();
        let inboxes: Vec<_> = replicas()
            .iter()
            .map(|r| sequencer.emitter().attach(*r))
            .collect();

        for _ in 0..1000 {
            sequencer.process(SequencerRequest::framed(destination(), b"op"));
        }

        for inbox in &inboxes {
            let seq_vec: Vec<u32> = inbox
                .try_iter()
                .map(|packet| parse_stamped(&packet).unwrap().0.sequence)
                .collect();
            assert_eq!(seq_vec.len(), 1000);

            for i in 0..seq_vec.len() - 1 {
                assert_eq!(seq_vec[i + 1], seq_vec[i] + 1);
            }
        }
    }

    #[test]
    fn test_every_replica_receives_identical_stamp() {
        let sequencer = make_sequencer();
        let inboxes: Vec<_> = replicas()
            .iter()
            .map(|r| sequencer.emitter().attach(*r))
            .collect();

        let outcome = sequencer.process(SequencerRequest::framed(destination(), b"write k v"));
        let receipt = *outcome.receipt().unwrap();
        assert_eq!(receipt.fan_out, 3);
        assert!(receipt.is_fully_delivered());

        let packets: Vec<_> = inboxes.iter().map(|rx| rx.try_recv().unwrap()).collect();
        for packet in &packets {
            assert_eq!(packet, &packets[0]);
            let (stamp, payload) = parse_stamped(packet).unwrap();
            assert_eq!(stamp, receipt.stamp);
            assert_eq!(payload, b"write k v");
        }
    }

    #[test]
    fn test_timestamps_monotonic() {
        let mut sequencer = make_sequencer();

        let timestamps = Arc::new(Mutex::new(Vec::new()));
        let timestamps_clone = timestamps.clone();

        sequencer.add_listener(move |event| {
            timestamps_clone.lock().unwrap().push(event.timestamp_ns);
        });

        for _ in 0..100 {
            sequencer.process(SequencerRequest::framed(destination(), b"op"));
        }

        let ts_vec = timestamps.lock().unwrap();

        for i in 0..ts_vec.len() - 1 {
            assert!(ts_vec[i + 1] >= ts_vec[i], "Timestamps must be monotonic");
        }
    }

    #[test]
    fn test_event_carries_emitted_packet() {
        let mut sequencer = make_sequencer();
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        sequencer.add_listener(move |event| {
            events_clone.lock().unwrap().push(event.clone());
        });

        let inbox = sequencer.emitter().attach(replicas()[0]);
        sequencer.process(SequencerRequest::framed(destination(), b"op"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].destination, destination());
        assert_eq!(events[0].packet, inbox.try_recv().unwrap());
        assert!(!events[0].wrapped);
    }
}
