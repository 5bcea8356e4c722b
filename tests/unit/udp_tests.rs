/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use oum_sequencer::wire::{frame_request, frame_unsequenced, parse_stamped};
use oum_sequencer::{Sequencer, SequencerConfig, UdpEmitter, UdpFrontend};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[cfg(test)]
mod tests {
    use super::*;

    async fn recv_stamp(socket: &UdpSocket) -> (u32, u32, Vec<u8>) {
        let mut buf = [0u8; 2048];
        let (n, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for stamped datagram")
            .unwrap();
        let (stamp, payload) = parse_stamped(&buf[..n]).unwrap();
        (stamp.group_id, stamp.sequence, payload.to_vec())
    }

    async fn bind_local() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_end_to_end_over_udp() {
        let replica_a = bind_local().await;
        let replica_b = bind_local().await;
        let ingress = bind_local().await;
        let ingress_addr = ingress.local_addr().unwrap();

        let fan_out: Vec<SocketAddr> = vec![
            replica_a.local_addr().unwrap(),
            replica_b.local_addr().unwrap(),
        ];
        let config = SequencerConfig::new(1)
            .with_group(0, fan_out)
            .with_destination(ingress_addr, 0);

        let emitter = UdpEmitter::bind("127.0.0.1:0").await.unwrap();
        let sequencer = Arc::new(Sequencer::new(emitter, &config).unwrap());
        let frontend =
            UdpFrontend::with_sockets(Arc::clone(&sequencer), vec![(ingress_addr, ingress)]);
        assert_eq!(frontend.local_addrs(), vec![ingress_addr]);
        let handle = frontend.spawn();

        let client = bind_local().await;
        for i in 0..3u8 {
            client
                .send_to(&frame_request(&[b'o', b'p', b'0' + i]), ingress_addr)
                .await
                .unwrap();
            assert_eq!(recv_stamp(&replica_a).await, (0, u32::from(i), vec![b'o', b'p', b'0' + i]));
            assert_eq!(recv_stamp(&replica_b).await, (0, u32::from(i), vec![b'o', b'p', b'0' + i]));
        }

        assert_eq!(handle.shutdown().await.unwrap(), 3);
        assert_eq!(sequencer.counter(0), Some(3));
        assert_eq!(sequencer.stats().stamped, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unsequenced_datagram_is_not_forwarded() {
        let replica = bind_local().await;
        let ingress = bind_local().await;
        let ingress_addr = ingress.local_addr().unwrap();

        let config = SequencerConfig::new(1)
            .with_group(0, [replica.local_addr().unwrap()])
            .with_destination(ingress_addr, 0);
        let emitter = UdpEmitter::bind("127.0.0.1:0").await.unwrap();
        let sequencer = Arc::new(Sequencer::new(emitter, &config).unwrap());
        let handle =
            UdpFrontend::with_sockets(Arc::clone(&sequencer), vec![(ingress_addr, ingress)]).spawn();

        let client = bind_local().await;
        client
            .send_to(&frame_unsequenced(b"noise"), ingress_addr)
            .await
            .unwrap();
        client
            .send_to(&frame_request(b"real"), ingress_addr)
            .await
            .unwrap();

        assert_eq!(recv_stamp(&replica).await, (0, 0, b"real".to_vec()));
        assert_eq!(handle.shutdown().await.unwrap(), 2);
        assert_eq!(sequencer.stats().dropped_unsequenced, 1);
    }
}
