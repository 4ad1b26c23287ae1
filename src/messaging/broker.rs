//! Thin AMQP shell: declares the topic exchange, binds a consumer's
//! queue, and relays handler outcomes back as ack/nack. Connection
//! lifecycle beyond a single consume loop (reconnects, credentials
//! rotation) belongs to the deployment, not to this module.

use std::sync::Arc;

use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};

use crate::messaging::{Consumer, Delivery, Outcome};

/// Connection and exchange parameters shared by every queue.
#[derive(Debug, Clone)]
pub struct AmqpSettings {
    pub url: String,
    pub exchange_name: String,
    pub durable: bool,
}

/// Runs one consumer against its queue until the connection drops.
///
/// Prefetch is pinned to one so a message's handler (store transaction
/// included) completes before the next message is delivered.
pub async fn run(settings: AmqpSettings, consumer: Arc<dyn Consumer>) -> Result<(), lapin::Error> {
    let connection = Connection::connect(&settings.url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel.basic_qos(1, BasicQosOptions::default()).await?;

    channel
        .exchange_declare(
            &settings.exchange_name,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: settings.durable,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_declare(
            consumer.queue_name(),
            QueueDeclareOptions {
                durable: settings.durable,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    for routing_key in consumer.routing_keys() {
        channel
            .queue_bind(
                consumer.queue_name(),
                &settings.exchange_name,
                &routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    tracing::info!(
        queue = consumer.queue_name(),
        exchange = settings.exchange_name,
        "consumer stream started"
    );

    let mut deliveries = channel
        .basic_consume(
            consumer.queue_name(),
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    while let Some(delivery) = deliveries.next().await {
        let delivery = delivery?;
        let mut message = Delivery::new(delivery.routing_key.as_str(), delivery.data.clone());
        message.content_type = delivery
            .properties
            .content_type()
            .as_ref()
            .map(|content_type| content_type.as_str().to_string());

        match consumer.handle(&message).await {
            Outcome::Ack => delivery.ack(BasicAckOptions::default()).await?,
            Outcome::Reject { requeue } => {
                delivery
                    .nack(BasicNackOptions {
                        requeue,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
    }

    Ok(())
}
