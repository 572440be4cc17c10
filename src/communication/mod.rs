pub mod amqp;
pub mod messages;
pub mod notifier;

pub use amqp::AmqpNotifier;
pub use messages::{ClearedTarget, TrafficMessage};
pub use notifier::{LogNotifier, Notifier};
