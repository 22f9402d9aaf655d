//! CAN frame in-step delivery: a writer stamps and sends one frame per
//! simulation step, in virtual-time order, to whichever peer discovery
//! resolves as the subscriber on the same network and media type. Wired
//! over an in-process duplex pipe rather than a real socket, mirroring the
//! router crate's own FIFO test, but the send target is resolved through
//! discovery rather than hardcoded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use synkit_discovery::{DescriptorQuery, DiscoveryService};
use synkit_participant::CanFrame;
use synkit_router::{Envelope, MessageHandler, RouterService};
use synkit_timesync::{AdvanceMode, TimeSyncConfig, TimeSyncService, step_handler};
use synkit_transport::PeerEvent;
use synkit_wire::{FrameKind, ServiceDescriptor, SimMessage, WireDecode};
use tokio::sync::mpsc;

const CAN_RECEIVER_INDEX: u16 = 1;
const ONE_MS: i64 = 1_000_000;
const NETWORK_NAME: &str = "PowertrainCAN1";
const MEDIA_TYPE: &str = "CAN";

struct RecordingCanHandler {
	tx: mpsc::Sender<(String, CanFrame)>,
}

#[async_trait]
impl MessageHandler for RecordingCanHandler {
	async fn handle(&self, envelope: Envelope) {
		if let Ok(frame) = serde_json::from_slice::<CanFrame>(&envelope.payload) {
			let _ = self.tx.send((envelope.sender_participant, frame)).await;
		}
	}
}

#[tokio::test]
async fn five_can_frames_arrive_in_order_stamped_with_step_start_time() {
	let writer_router = RouterService::spawn("Writer");
	let reader_router = RouterService::spawn("Reader");
	let discovery = DiscoveryService::spawn();

	let (client, server) = tokio::io::duplex(1 << 16);
	let (writer_to_reader, _writer_inbound) = synkit_transport::spawn(client);
	let (_reader_to_writer, mut reader_inbound) = synkit_transport::spawn(server);
	writer_router.register_peer("Reader".to_string(), writer_to_reader, synkit_router::ConnectionDirection::Dialed).await;

	let (tx, mut rx) = mpsc::channel(8);
	reader_router.register_handler(CAN_RECEIVER_INDEX, Arc::new(RecordingCanHandler { tx })).await;

	// "Reader" publishes its subscriber descriptor; the writer resolves its
	// send target from this rather than hardcoding the peer name.
	discovery
		.publish(ServiceDescriptor {
			network_name: NETWORK_NAME.to_string(),
			media_type: MEDIA_TYPE.to_string(),
			supplemental_labels: Default::default(),
			participant_name: "Reader".to_string(),
			service_name: format!("Reader/{CAN_RECEIVER_INDEX}"),
		})
		.await;

	let pump_router = reader_router.clone();
	tokio::spawn(async move {
		while let Some(event) = reader_inbound.recv().await {
			if let PeerEvent::Frame(FrameKind::SimMessage, payload) = event {
				let mut bytes = payload;
				if let Ok(message) = SimMessage::decode(&mut bytes) {
					pump_router
						.dispatch_inbound("Writer".to_string(), message.receiver_index, message.message_type, message.payload)
						.await;
				}
			}
		}
	});

	let messages: Vec<Vec<u8>> = (0..5).map(|i| format!("Test Message {i}").into_bytes()).collect();
	let step_count = Arc::new(AtomicUsize::new(0));

	let time_sync = TimeSyncService::spawn(TimeSyncConfig::new(ONE_MS, AdvanceMode::ByOwnDuration));
	{
		let messages = messages.clone();
		let step_count = step_count.clone();
		let writer_router = writer_router.clone();
		let discovery = discovery.clone();
		time_sync
			.set_step_handler(step_handler(move |now, _duration, ts| {
				let messages = messages.clone();
				let step_count = step_count.clone();
				let writer_router = writer_router.clone();
				let discovery = discovery.clone();
				async move {
					let index = step_count.fetch_add(1, Ordering::SeqCst);
					if index >= messages.len() {
						// Leave the step in progress; the barrier simply
						// halts here since nothing calls
						// complete_simulation_step again.
						return;
					}
					let frame = CanFrame { can_id: 1, payload: messages[index].clone(), timestamp: now };
					let payload = Bytes::from(serde_json::to_vec(&frame).unwrap());
					let query =
						DescriptorQuery { network_name: NETWORK_NAME.to_string(), media_type: MEDIA_TYPE.to_string(), required_labels: Vec::new() };
					for descriptor in discovery.resolve(&query).await {
						writer_router.send(descriptor.participant_name, CAN_RECEIVER_INDEX, 0, payload.clone()).await;
					}
					ts.complete_simulation_step().await;
				}
			}))
			.await;
	}
	time_sync.start().await;

	let mut received = Vec::new();
	for _ in 0..5 {
		let (sender, frame) = rx.recv().await.expect("reader should receive five frames");
		assert_eq!(sender, "Writer");
		received.push(frame);
	}

	for (index, frame) in received.iter().enumerate() {
		assert_eq!(frame.can_id, 1);
		assert_eq!(frame.payload, messages[index]);
		assert_eq!(frame.timestamp, index as i64 * ONE_MS);
	}
}
