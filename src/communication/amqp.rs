use amiquip::{Connection, Exchange, Publish, QueueDeclareOptions, Result as AmiquipResult};
use log::{debug, error, info};
use std::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

use crate::global_variables::{QUEUE_EMERGENCY_ALERT, QUEUE_EMERGENCY_CLEARED, QUEUE_TRAFFIC_UPDATE};

use super::messages::TrafficMessage;
use super::notifier::Notifier;

/// Publishes broadcasts as JSON onto RabbitMQ queues, one queue per event kind.
///
/// `publish` only enqueues; a blocking task owns the connection and does the
/// network writes, so callers on the runtime never wait on the broker.
pub struct AmqpNotifier {
    outbox: Sender<TrafficMessage>,
    _publisher: JoinHandle<()>,
}

impl AmqpNotifier {
    /// Connects and declares the queues. Must be called inside a tokio runtime.
    pub fn connect(url: &str) -> AmiquipResult<Self> {
        let mut connection = Connection::insecure_open(url)?;
        let channel = connection.open_channel(None)?;
        for queue in [QUEUE_TRAFFIC_UPDATE, QUEUE_EMERGENCY_ALERT, QUEUE_EMERGENCY_CLEARED] {
            channel.queue_declare(queue, QueueDeclareOptions::default())?;
        }
        info!("[AmqpNotifier] Connected to {}", url);

        let (outbox, inbox) = mpsc::channel();
        let publisher = tokio::task::spawn_blocking(move || {
            {
                let exchange = Exchange::direct(&channel);
                drain_outbox(inbox, |queue, payload| {
                    exchange.publish(Publish::new(payload.as_bytes(), queue))
                });
            }
            if let Err(e) = channel.close() {
                error!("[AmqpNotifier] Failed to close channel: {}", e);
            }
            if let Err(e) = connection.close() {
                error!("[AmqpNotifier] Failed to close connection: {}", e);
            }
        });

        Ok(Self {
            outbox,
            _publisher: publisher,
        })
    }
}

/// Serializes and sends every queued message until all senders are gone.
/// Failures are logged per message and never stop the loop.
fn drain_outbox<F>(inbox: Receiver<TrafficMessage>, mut send: F)
where
    F: FnMut(&str, &str) -> AmiquipResult<()>,
{
    for message in inbox {
        let queue = message.queue();
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("[AmqpNotifier] Could not serialize {} message: {}", queue, e);
                continue;
            }
        };
        if let Err(e) = send(queue, &payload) {
            error!("[AmqpNotifier] Failed to publish to {}: {}", queue, e);
        }
    }
    debug!("[AmqpNotifier] Outbox closed, publisher exiting");
}

impl Notifier for AmqpNotifier {
    fn publish(&self, message: TrafficMessage) {
        if let Err(e) = self.outbox.send(message) {
            error!(
                "[AmqpNotifier] Publisher stopped, dropping {} message",
                e.0.queue()
            );
        }
    }
}
