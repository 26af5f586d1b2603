//! End-to-end proxy tests
//!
//! These tests drive a running proxy through its public surface: start a
//! mode, attach peers to the bound addresses, and verify relay, framing,
//! ordering, and capture behavior.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::{sleep, timeout};

use mqproxy::{Endpoint, Message, Proxy, ProxyMode, SocketRole};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn recv(endpoint: &mut Endpoint) -> Message {
    timeout(RECV_TIMEOUT, endpoint.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("endpoint closed")
}

#[tokio::test]
async fn streamer_relays_and_captures() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-streamer-front",
            "inproc://e2e-streamer-back",
            "inproc://e2e-streamer-capture",
        )
        .await
        .unwrap();

    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    let mut consumer = Endpoint::connect(SocketRole::Pull, proxy.backend_addr()).unwrap();
    let mut observer = Endpoint::connect(SocketRole::Sub, proxy.capture_addr()).unwrap();

    producer.send(Message::from_text("STREAMER_TEST")).await.unwrap();

    assert_eq!(recv(&mut consumer).await, Message::from_text("STREAMER_TEST"));
    assert_eq!(recv(&mut observer).await, Message::from_text("STREAMER_TEST"));

    proxy.stop().await;
}

#[tokio::test]
async fn framing_preserved_through_relay() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-framing-front",
            "inproc://e2e-framing-back",
            "inproc://e2e-framing-capture",
        )
        .await
        .unwrap();

    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    let mut consumer = Endpoint::connect(SocketRole::Pull, proxy.backend_addr()).unwrap();

    for frame_count in [1usize, 2, 5] {
        let frames: Vec<Bytes> = (0..frame_count)
            .map(|i| Bytes::from(format!("frame-{}", i)))
            .collect();
        let msg = Message::from_frames(frames.clone());

        producer.send(msg).await.unwrap();

        let received = recv(&mut consumer).await;
        assert_eq!(received.frame_count(), frame_count);
        assert_eq!(received.into_frames(), frames);
    }

    proxy.stop().await;
}

#[tokio::test]
async fn same_direction_fifo_preserved() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-fifo-front",
            "inproc://e2e-fifo-back",
            "inproc://e2e-fifo-capture",
        )
        .await
        .unwrap();

    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    let mut consumer = Endpoint::connect(SocketRole::Pull, proxy.backend_addr()).unwrap();

    for label in ["A", "B", "C", "D"] {
        producer.send(Message::from_text(label)).await.unwrap();
    }
    for label in ["A", "B", "C", "D"] {
        assert_eq!(recv(&mut consumer).await, Message::from_text(label));
    }

    proxy.stop().await;
}

#[tokio::test]
async fn capture_sees_every_relayed_message() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-tee-front",
            "inproc://e2e-tee-back",
            "inproc://e2e-tee-capture",
        )
        .await
        .unwrap();

    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    let mut consumer = Endpoint::connect(SocketRole::Pull, proxy.backend_addr()).unwrap();
    let mut observer = Endpoint::connect(SocketRole::Sub, proxy.capture_addr()).unwrap();

    let payloads = ["first", "second", "third"];
    for payload in payloads {
        producer.send(Message::from_text(payload)).await.unwrap();
    }

    for payload in payloads {
        // The primary path and the tee both carry the exact bytes.
        assert_eq!(recv(&mut consumer).await, Message::from_text(payload));
        assert_eq!(recv(&mut observer).await, Message::from_text(payload));
    }

    proxy.stop().await;
}

#[tokio::test]
async fn queue_routes_requests_and_replies() {
    let mut proxy = Proxy::new(ProxyMode::Queue);
    proxy
        .start(
            "inproc://e2e-queue-front",
            "inproc://e2e-queue-back",
            "inproc://e2e-queue-capture",
        )
        .await
        .unwrap();

    let mut client_a = Endpoint::connect(SocketRole::Dealer, proxy.frontend_addr()).unwrap();
    let mut client_b = Endpoint::connect(SocketRole::Dealer, proxy.frontend_addr()).unwrap();
    let mut worker = Endpoint::connect(SocketRole::Dealer, proxy.backend_addr()).unwrap();

    client_a.send(Message::from_text("request-a")).await.unwrap();
    client_b.send(Message::from_text("request-b")).await.unwrap();

    // The single worker sees each request exactly once, identity first.
    let mut seen = Vec::new();
    for _ in 0..2 {
        let mut request = recv(&mut worker).await;
        assert_eq!(request.frame_count(), 2);
        let identity = request.pop_front().unwrap();
        let body = request.pop_front().unwrap();
        seen.push(body.clone());

        let reply_body = format!("reply:{}", String::from_utf8_lossy(&body));
        let reply = Message::from_frames(vec![identity, Bytes::from(reply_body)]);
        worker.send(reply).await.unwrap();
    }
    seen.sort();
    assert_eq!(&seen[0][..], b"request-a");
    assert_eq!(&seen[1][..], b"request-b");

    // Replies come back to the client that sent the matching request.
    assert_eq!(recv(&mut client_a).await, Message::from_text("reply:request-a"));
    assert_eq!(recv(&mut client_b).await, Message::from_text("reply:request-b"));

    proxy.stop().await;
}

#[tokio::test]
async fn queue_distributes_across_workers_without_duplication() {
    let mut proxy = Proxy::new(ProxyMode::Queue);
    proxy
        .start(
            "inproc://e2e-queue2-front",
            "inproc://e2e-queue2-back",
            "inproc://e2e-queue2-capture",
        )
        .await
        .unwrap();

    let mut client = Endpoint::connect(SocketRole::Dealer, proxy.frontend_addr()).unwrap();
    let mut worker_a = Endpoint::connect(SocketRole::Dealer, proxy.backend_addr()).unwrap();
    let mut worker_b = Endpoint::connect(SocketRole::Dealer, proxy.backend_addr()).unwrap();

    client.send(Message::from_text("job-1")).await.unwrap();
    client.send(Message::from_text("job-2")).await.unwrap();

    // Load balancing hands each worker exactly one of the two requests.
    let got_a = recv(&mut worker_a).await;
    let got_b = recv(&mut worker_b).await;
    let mut bodies = vec![
        got_a.frames()[1].clone(),
        got_b.frames()[1].clone(),
    ];
    bodies.sort();
    assert_eq!(&bodies[0][..], b"job-1");
    assert_eq!(&bodies[1][..], b"job-2");

    proxy.stop().await;
}

#[tokio::test]
async fn forwarder_relays_published_messages() {
    let mut proxy = Proxy::new(ProxyMode::Forwarder);
    proxy
        .start(
            "inproc://e2e-fwd-front",
            "inproc://e2e-fwd-back",
            "inproc://e2e-fwd-capture",
        )
        .await
        .unwrap();

    assert_eq!(proxy.frontend_role(), SocketRole::XSub);
    assert_eq!(proxy.backend_role(), SocketRole::XPub);

    let mut subscriber_a = Endpoint::connect(SocketRole::Sub, proxy.backend_addr()).unwrap();
    let mut subscriber_b = Endpoint::connect(SocketRole::Sub, proxy.backend_addr()).unwrap();
    let mut publisher = Endpoint::connect(SocketRole::Pub, proxy.frontend_addr()).unwrap();

    publisher.send(Message::from_text("broadcast")).await.unwrap();

    assert_eq!(recv(&mut subscriber_a).await, Message::from_text("broadcast"));
    assert_eq!(recv(&mut subscriber_b).await, Message::from_text("broadcast"));

    proxy.stop().await;
}

#[tokio::test]
async fn accessors_round_trip_after_start() {
    let mut proxy = Proxy::new(ProxyMode::Forwarder);
    proxy
        .start(
            "inproc://e2e-acc-front",
            "inproc://e2e-acc-back",
            "inproc://e2e-acc-capture",
        )
        .await
        .unwrap();

    assert_eq!(proxy.mode(), ProxyMode::Forwarder);
    assert_eq!(proxy.frontend_addr(), "inproc://e2e-acc-front");
    assert_eq!(proxy.backend_addr(), "inproc://e2e-acc-back");
    assert_eq!(proxy.capture_addr(), "inproc://e2e-acc-capture");
    assert_eq!(proxy.capture_role(), SocketRole::Pub);
    assert!(proxy.is_running());

    proxy.stop().await;
}

#[tokio::test]
async fn stop_interrupts_a_parked_relay() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-parked-front",
            "inproc://e2e-parked-back",
            "inproc://e2e-parked-capture",
        )
        .await
        .unwrap();

    // A message arrives with no consumer ever attached, so the relay
    // parks inside the backend send waiting for a first peer.
    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    producer.send(Message::from_text("stranded")).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    // Stop must still get through and join the worker.
    timeout(Duration::from_secs(5), proxy.stop())
        .await
        .expect("stop timed out while a relay was parked");
}

#[tokio::test]
async fn capture_stall_does_not_block_relay() {
    let mut proxy = Proxy::new(ProxyMode::Streamer);
    proxy
        .start(
            "inproc://e2e-nostall-front",
            "inproc://e2e-nostall-back",
            "inproc://e2e-nostall-capture",
        )
        .await
        .unwrap();

    // No capture subscriber is ever attached; the tee drops its copies
    // and the primary path keeps moving.
    let mut producer = Endpoint::connect(SocketRole::Push, proxy.frontend_addr()).unwrap();
    let mut consumer = Endpoint::connect(SocketRole::Pull, proxy.backend_addr()).unwrap();

    for i in 0..10 {
        producer
            .send(Message::from_text(&format!("msg-{}", i)))
            .await
            .unwrap();
    }
    for i in 0..10 {
        assert_eq!(recv(&mut consumer).await, Message::from_text(&format!("msg-{}", i)));
    }

    proxy.stop().await;
}
