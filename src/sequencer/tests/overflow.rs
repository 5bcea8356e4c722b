/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Tests for counter wraparound.

#[cfg(test)]
mod tests {
    use crate::config::SequencerConfig;
    use crate::emitter::ChannelEmitter;
    use crate::sequencer::{Sequencer, SequencerRequest};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn config() -> SequencerConfig {
        SequencerConfig::new(1)
            .with_group(0, [addr("10.0.0.11:7000")])
            .with_destination(addr("10.0.0.1:7000"), 0)
    }

    fn stamp(sequencer: &Sequencer<ChannelEmitter>) -> (u32, bool) {
        let outcome = sequencer.process(SequencerRequest::framed(addr("10.0.0.1:7000"), b"op"));
        let receipt = outcome.receipt().unwrap();
        (receipt.sequence_num(), receipt.wrapped)
    }

    #[test]
    fn test_full_width_counter_wraps_to_zero() {
        let sequencer =
            Sequencer::new(ChannelEmitter::new(8), &config().with_start_value(u32::MAX)).unwrap();

        assert_eq!(stamp(&sequencer), (u32::MAX, false));
        assert_eq!(stamp(&sequencer), (0, true));
        assert_eq!(stamp(&sequencer), (1, false));

        assert_eq!(sequencer.stats().wrapped, 1);
        assert_eq!(sequencer.laps(0), Some(1));
    }

    #[test]
    fn test_narrow_counter_wraps_every_lap() {
        let sequencer =
            Sequencer::new(ChannelEmitter::new(8), &config().with_counter_bits(4)).unwrap();

        let issued: Vec<(u32, bool)> = (0..40).map(|_| stamp(&sequencer)).collect();
        for (i, (seq, wrapped)) in issued.iter().enumerate() {
            assert_eq!(*seq, (i % 16) as u32);
            assert_eq!(*wrapped, i == 16 || i == 32, "index {i}");
        }

        assert_eq!(sequencer.stats().wrapped, 2);
        assert_eq!(sequencer.laps(0), Some(2));
        assert_eq!(sequencer.counter(0), Some(8));
    }

    #[test]
    fn test_wrap_is_flagged_on_event() {
        let mut sequencer =
            Sequencer::new(ChannelEmitter::new(8), &config().with_counter_bits(1)).unwrap();

        let flags = Arc::new(Mutex::new(Vec::new()));
        let flags_clone = flags.clone();
        sequencer.add_listener(move |event| {
            flags_clone
                .lock()
                .unwrap()
                .push((event.sequence_num(), event.wrapped));
        });

        for _ in 0..4 {
            stamp(&sequencer);
        }

        assert_eq!(
            *flags.lock().unwrap(),
            vec![(0, false), (1, false), (0, true), (1, false)]
        );
    }
}
