use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::link::{
    config::LinkConfig, decode_error_message, decode_snapshot, LinkError, LinkNotice, UpstreamEvent,
};
use crate::snapshot::SimSnapshot;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Session counters for the status bar.
#[derive(Clone, Debug, Default)]
pub struct LinkStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// Handle for the broker session task.
///
/// The task owns the MQTT client and event loop. Outbound events arrive on
/// one mpsc channel and are published to their topic; inbound publishes are
/// decoded and fanned out: snapshots to the scheduler, notices to the UI.
/// Session errors never escape the task; the event loop is simply re-polled
/// after a fixed delay, and subscriptions are re-issued on every broker
/// acknowledgement.
pub struct LinkHandle {}

impl LinkHandle {
    pub fn spawn(
        config: LinkConfig,
        outbound_receiver: mpsc::Receiver<UpstreamEvent>,
        snapshot_sender: mpsc::Sender<SimSnapshot>,
        notice_sender: mpsc::Sender<LinkNotice>,
        shutdown: CancellationToken,
    ) -> Result<Self, LinkError> {
        info!("Spawning simulator link for broker {}", config.url);

        let task_handle = tokio::spawn(async move {
            if let Err(e) = run_link_loop(
                config,
                outbound_receiver,
                snapshot_sender,
                notice_sender,
                shutdown,
            )
            .await
            {
                error!("Link task terminated with error: {}", e);
            } else {
                info!("Link task finished");
            }
        });
        debug!("Tokio task spawned with handle: {:?}", task_handle);

        Ok(Self {})
    }
}

async fn run_link_loop(
    config: LinkConfig,
    mut outbound_receiver: mpsc::Receiver<UpstreamEvent>,
    snapshot_sender: mpsc::Sender<SimSnapshot>,
    notice_sender: mpsc::Sender<LinkNotice>,
    shutdown: CancellationToken,
) -> Result<(), LinkError> {
    let (host, port) = config.host_and_port();
    let mut options = MqttOptions::new(config.client_id.clone(), host, port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

    let (client, mut eventloop) = AsyncClient::new(options, 100);
    let mut status = LinkStatus::default();
    set_connection_state(&mut status, ConnectionState::Connecting, &notice_sender).await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Link shutdown requested");
                let _ = client.disconnect().await;
                return Ok(());
            }

            outbound = outbound_receiver.recv() => {
                match outbound {
                    Some(event) => publish_event(&config, &client, event, &mut status).await,
                    None => {
                        info!("Outbound channel closed, link stopping");
                        let _ = client.disconnect().await;
                        return Ok(());
                    }
                }
            }

            polled = eventloop.poll() => {
                match polled {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Broker session established");
                        set_connection_state(&mut status, ConnectionState::Connected, &notice_sender).await;
                        subscribe_inbound(&config, &client).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        status.messages_received += 1;
                        status.last_activity = Some(chrono::Local::now());
                        dispatch_inbound(
                            &config,
                            &publish.topic,
                            &publish.payload,
                            &snapshot_sender,
                            &notice_sender,
                        )
                        .await?;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            "Broker session error after {} sent / {} received: {}, retrying",
                            status.messages_sent, status.messages_received, e
                        );
                        debug!("Last broker activity: {:?}", status.last_activity);
                        set_connection_state(&mut status, ConnectionState::Reconnecting, &notice_sender).await;
                        tokio::select! {
                            _ = shutdown.cancelled() => return Ok(()),
                            _ = tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)) => {}
                        }
                    }
                }
            }
        }
    }
}

async fn publish_event(
    config: &LinkConfig,
    client: &AsyncClient,
    event: UpstreamEvent,
    status: &mut LinkStatus,
) {
    let topic = config.topic(event.topic_suffix());
    // Controller and speed updates are healed by the next edge anyway;
    // commands should survive a flaky session.
    let qos = match event {
        UpstreamEvent::Controller(_) | UpstreamEvent::Speed(_) => QoS::AtMostOnce,
        _ => QoS::AtLeastOnce,
    };

    let payload = match event.encode() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Dropping unencodable outbound event: {}", e);
            return;
        }
    };

    match client.publish(topic, qos, false, payload).await {
        Ok(_) => {
            status.messages_sent += 1;
            status.last_activity = Some(chrono::Local::now());
        }
        Err(e) => warn!("Failed to queue outbound publish: {}", e),
    }
}

async fn subscribe_inbound(config: &LinkConfig, client: &AsyncClient) {
    for suffix in ["state", "error", "generated"] {
        let topic = config.topic(suffix);
        match client.subscribe(&topic, QoS::AtLeastOnce).await {
            Ok(_) => debug!("Subscribed to {}", topic),
            Err(e) => warn!("Failed to subscribe to {}: {}", topic, e),
        }
    }
}

async fn dispatch_inbound(
    config: &LinkConfig,
    topic: &str,
    payload: &[u8],
    snapshot_sender: &mpsc::Sender<SimSnapshot>,
    notice_sender: &mpsc::Sender<LinkNotice>,
) -> Result<(), LinkError> {
    if topic == config.topic("state") {
        match decode_snapshot(payload) {
            Ok(snapshot) => snapshot_sender
                .send(snapshot)
                .await
                .map_err(|e| LinkError::ForwardError(e.to_string()))?,
            Err(e) => {
                // Local to this payload; the session keeps running.
                warn!("Malformed state payload: {}", e);
                send_notice(
                    notice_sender,
                    LinkNotice::Error("Received a malformed state update".to_string()),
                )
                .await;
            }
        }
    } else if topic == config.topic("error") {
        match decode_error_message(payload) {
            Ok(message) => send_notice(notice_sender, LinkNotice::Error(message)).await,
            Err(e) => warn!("Malformed error payload: {}", e),
        }
    } else if topic == config.topic("generated") {
        send_notice(notice_sender, LinkNotice::Generated).await;
    } else {
        debug!("Ignoring publish on unexpected topic: {}", topic);
    }

    Ok(())
}

async fn set_connection_state(
    status: &mut LinkStatus,
    state: ConnectionState,
    notice_sender: &mpsc::Sender<LinkNotice>,
) {
    if status.connection_state != state {
        debug!("Link state: {:?} -> {:?}", status.connection_state, state);
        status.connection_state = state;
        send_notice(notice_sender, LinkNotice::Connection(state)).await;
    }
}

async fn send_notice(notice_sender: &mpsc::Sender<LinkNotice>, notice: LinkNotice) {
    if notice_sender.send(notice).await.is_err() {
        warn!("Notice channel closed, dropping notice");
    }
}
