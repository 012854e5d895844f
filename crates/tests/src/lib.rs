//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - configuration to endpoint addressing
//! - synthetic camera -> publisher -> TCP endpoints -> subscribers

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::WireMessage;
    use publisher::SocketGroupConfig;

    #[test]
    fn test_legacy_config_to_endpoints() {
        let bp = ConfigLoader::load_from_str(
            r#"{ "publisher": { "zmq_topic_video": "cam1", "zmq_output_port": 9000,
                 "camera_stream_duplication": 2 },
                 "debug": { "debug_drop_nth_frame": 3 } }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let addrs = SocketGroupConfig::from(&bp.publisher).addrs().unwrap();
        let ports: Vec<u16> = addrs.iter().map(|a| a.port()).collect();
        assert_eq!(ports, vec![9000, 9001]);
        assert_eq!(ports, bp.publisher.endpoint_ports());
        assert_eq!(bp.debug.drop_nth_frame, 3);
    }

    #[test]
    fn test_wire_layout_is_stable() {
        let message = WireMessage::encode(b"cam1", 42, &[0x01, 0x02]);
        assert_eq!(
            &message[..],
            &[b'c', b'a', b'm', b'1', 0x2A, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x02]
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    use capture::{CameraSettings, FrameSource, SyntheticCamera};
    use contracts::{AnnotationTarget, WireMessage};
    use publisher::{
        FramePublisher, MetadataAnnotator, PublisherMetrics, SocketGroup, SocketGroupConfig,
        Subscriber, SubscriberProbe, TcpPubSocket,
    };
    use tokio::net::TcpListener;

    const TOPIC: &str = "cam1";
    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    /// Base port `p` with `p` and `p + 1` both free at the time of the call
    async fn free_port_pair() -> u16 {
        loop {
            let first = TcpListener::bind((localhost(), 0)).await.unwrap();
            let port = first.local_addr().unwrap().port();
            if port == u16::MAX {
                continue;
            }
            if TcpListener::bind((localhost(), port + 1)).await.is_ok() {
                return port;
            }
        }
    }

    fn camera(max_frames: u64) -> SyntheticCamera {
        let settings = CameraSettings {
            framerate: 200.0,
            payload_size: 64,
            ..Default::default()
        };
        SyntheticCamera::new("e2e", settings).with_max_frames(max_frames)
    }

    async fn wait_for_subscribers(probe: &SubscriberProbe, n: usize) {
        for _ in 0..400 {
            if probe.subscribers() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} subscribers, got {}", probe.subscribers());
    }

    async fn recv_n(subscriber: &mut Subscriber, n: usize) -> Vec<WireMessage> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let message = tokio::time::timeout(RECV_TIMEOUT, subscriber.recv())
                .await
                .expect("timed out waiting for frame")
                .unwrap()
                .expect("publisher closed early");
            out.push(message);
        }
        out
    }

    async fn stop(camera: SyntheticCamera) {
        tokio::task::spawn_blocking(move || {
            let mut camera = camera;
            camera.stop();
        })
        .await
        .unwrap();
    }

    /// SyntheticCamera -> FramePublisher(drop every 3rd) -> 2 endpoints -> 2 subscribers
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_duplicated_endpoints_with_drop_filter() {
        let base_port = free_port_pair().await;
        let group = SocketGroup::<TcpPubSocket>::bind(&SocketGroupConfig {
            bind_host: localhost(),
            base_port,
            duplication: 2,
            queue_capacity: 64,
        })
        .await
        .unwrap();
        let addrs = group.local_addrs();
        assert_eq!(addrs, vec![
            SocketAddr::new(localhost(), base_port),
            SocketAddr::new(localhost(), base_port + 1),
        ]);
        let probe = group.probe();

        let mut sub_a = Subscriber::connect(addrs[0], TOPIC).await.unwrap();
        let mut sub_b = Subscriber::connect(addrs[1], TOPIC).await.unwrap();
        wait_for_subscribers(&probe, 2).await;

        let metrics = Arc::new(PublisherMetrics::new());
        let publisher = FramePublisher::builder(TOPIC, group)
            .drop_every_nth(3)
            .metrics(Arc::clone(&metrics))
            .build();

        let mut camera = camera(12);
        camera.start(publisher.into_callback()).unwrap();

        let expected: Vec<u64> = vec![1, 2, 4, 5, 7, 8, 10, 11];
        let got_a = recv_n(&mut sub_a, expected.len()).await;
        let got_b = recv_n(&mut sub_b, expected.len()).await;

        let indices: Vec<u64> = got_a.iter().map(|m| m.frame_index).collect();
        assert_eq!(indices, expected);
        assert_eq!(got_a, got_b);
        for message in &got_a {
            assert_eq!(&message.topic[..], TOPIC.as_bytes());
            let header = format!("idx={} ", message.frame_index);
            assert!(
                message.payload.windows(header.len()).any(|w| w == header.as_bytes()),
                "payload of frame {} lacks its header",
                message.frame_index
            );
        }

        stop(camera).await;

        // Sockets close once the source has released the publisher
        let end = tokio::time::timeout(RECV_TIMEOUT, sub_a.recv()).await.unwrap();
        assert!(matches!(end, Ok(None)));

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_received, 12);
        assert_eq!(snap.frames_filtered, 4);
        assert_eq!(snap.frames_published, 8);
        assert_eq!(snap.messages_sent, 16);
        assert_eq!(snap.send_failures, 0);
    }

    /// Annotation set while handling frame k is visible in frame k + 1
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_annotation_reaches_next_frame() {
        let group = SocketGroup::<TcpPubSocket>::bind(&SocketGroupConfig {
            bind_host: localhost(),
            base_port: 0,
            duplication: 1,
            queue_capacity: 64,
        })
        .await
        .unwrap();
        let addr = group.local_addrs()[0];
        let probe = group.probe();

        let mut subscriber = Subscriber::connect(addr, TOPIC).await.unwrap();
        wait_for_subscribers(&probe, 1).await;

        let mut camera = camera(5);
        let target: Arc<dyn AnnotationTarget> = camera.annotation_target().unwrap();
        let publisher = FramePublisher::builder(TOPIC, group)
            .annotator(MetadataAnnotator::new("e2e-host", target))
            .build();
        camera.start(publisher.into_callback()).unwrap();

        let frames = recv_n(&mut subscriber, 5).await;
        stop(camera).await;

        let first = String::from_utf8_lossy(&frames[0].payload).into_owned();
        assert!(first.contains("ann=\n"), "got: {first}");
        for pair in frames.windows(2) {
            let payload = String::from_utf8_lossy(&pair[1].payload).into_owned();
            let stamp = format!("{:0>10}", pair[0].frame_index);
            assert!(payload.contains("ann=e2e-host "), "got: {payload}");
            assert!(payload.contains(&stamp), "missing {stamp} in: {payload}");
        }
    }

    /// A subscriber for another topic sees nothing, even though bytes arrive
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_topic_filter() {
        let group = SocketGroup::<TcpPubSocket>::bind(&SocketGroupConfig {
            bind_host: localhost(),
            base_port: 0,
            duplication: 1,
            queue_capacity: 64,
        })
        .await
        .unwrap();
        let addr = group.local_addrs()[0];
        let probe = group.probe();

        let mut other = Subscriber::connect(addr, "cam2").await.unwrap();
        wait_for_subscribers(&probe, 1).await;

        let mut camera = camera(3);
        camera
            .start(FramePublisher::new(TOPIC, group).into_callback())
            .unwrap();

        // Source stops after 3 frames; its publisher and sockets go with it
        let end = tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                if !camera.is_running() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stop(camera).await;
            other.recv().await
        })
        .await
        .unwrap();
        assert!(matches!(end, Ok(None)));
    }
}
