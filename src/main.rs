mod common;
mod config;
mod consumers;
mod messaging;
mod reconcile;
mod resources;

use std::sync::Arc;

use crate::config::Config;
use crate::consumers::auditor::Auditor;
use crate::consumers::stock_plate::StockPlateConsumer;
use crate::messaging::broker::{self, AmqpSettings};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

#[tokio::main]
async fn main() {
    // Set up tracing/logging
    tracing_subscriber::fmt::init();
    println!("Starting consumer...");

    // Load configuration and environment variables
    let config: Config = Config::from_env();

    let db: DatabaseConnection = Database::connect(
        config
            .db_url
            .as_ref()
            .expect("database URL must be configured"),
    )
    .await
    .expect("Failed to connect to the database");

    if db.ping().await.is_ok() {
        println!("Connected to the database");
    } else {
        println!("Could not connect to the database");
    }

    // Run migrations
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    println!("DB migrations complete");

    println!(
        "Starting consumer {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );

    let amqp = AmqpSettings {
        url: config.amqp_url.clone(),
        exchange_name: config.exchange_name.clone(),
        durable: config.durable,
    };

    let stock_plate = Arc::new(
        StockPlateConsumer::new(config.queue_name.clone(), db.clone())
            .with_stock_plate_roles(config.stock_plate_roles.clone()),
    );

    // Each queue runs as an independent stream; the store is the only
    // shared resource between them.
    let mut streams = tokio::task::JoinSet::new();
    {
        let amqp = amqp.clone();
        streams.spawn(async move { broker::run(amqp, stock_plate).await });
    }

    if let (Some(queue_name), Some(audit_file)) = (config.audit_queue_name, config.audit_file) {
        let auditor = Arc::new(Auditor::new(queue_name, audit_file));
        streams.spawn(async move { broker::run(amqp, auditor).await });
    }

    while let Some(stream) = streams.join_next().await {
        match stream {
            Ok(Ok(())) => tracing::info!("consumer stream finished"),
            Ok(Err(error)) => tracing::error!(%error, "consumer stream failed"),
            Err(error) => tracing::error!(%error, "consumer task panicked"),
        }
    }
}
