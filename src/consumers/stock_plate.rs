//! The stock plate consumer.
//!
//! When a stock plate is created in S2 it must be created in
//! Sequencescape as well. Plate creation messages carry the structure
//! of the plate; order messages identify what the plate is for. Every
//! plate creation message creates a Sequencescape plate with an
//! `Unassigned` purpose. As soon as an order message references that
//! plate under a stock plate role with a done status, the purpose is
//! promoted to `StockPlate`. If the order message arrives first, the
//! plate cannot be found and the message is requeued to wait for the
//! plate message. Tube racks are treated exactly like plates.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::common::errors::SyncError;
use crate::consumers::router::{EventKind, RoutingTable};
use crate::messaging::{Consumer, Delivery, Outcome};
use crate::reconcile::SequencescapeStore;
use crate::resources::{DecodedEvent, Order, Plate, decode};
use uuid::Uuid;

/// Item status that confirms a stock plate.
pub const ITEM_DONE_STATUS: &str = "done";

/// Order roles recognized as stock plates.
pub const DEFAULT_STOCK_PLATE_ROLES: &[&str] = &["WGS Stock Plate"];

pub struct StockPlateConsumer {
    queue_name: String,
    routes: RoutingTable,
    store: SequencescapeStore,
    stock_plate_roles: HashSet<String>,
}

impl StockPlateConsumer {
    #[must_use]
    pub fn new(queue_name: impl Into<String>, db: DatabaseConnection) -> Self {
        Self {
            queue_name: queue_name.into(),
            routes: RoutingTable::stock_plate(),
            store: SequencescapeStore::new(db),
            stock_plate_roles: DEFAULT_STOCK_PLATE_ROLES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn with_stock_plate_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.stock_plate_roles = roles.into_iter().collect();
        self
    }

    async fn plate_create(&self, plate: &Plate, uuid: Uuid) -> Outcome {
        match self.store.create_plate(plate, uuid).await {
            Ok(()) => {
                tracing::info!(plate = %uuid, wells = plate.size(), "plate created in Sequencescape");
                Outcome::Ack
            }
            Err(error) => {
                tracing::error!(plate = %uuid, %error, "error saving plate in Sequencescape");
                outcome_for(&error)
            }
        }
    }

    /// Order handling: plates referenced outside the stock plate roles
    /// are provisional and get cleaned up (failures swallowed); done
    /// items under a stock plate role are promoted. The message is
    /// acknowledged only if every promotion succeeded. Promotions that
    /// already went through stay in place across a redelivery, which
    /// is safe because promotion is idempotent.
    async fn order_update(&self, order: &Order) -> Outcome {
        for (role, items) in &order.items {
            if self.stock_plate_roles.contains(role) {
                continue;
            }
            for item in items {
                if let Err(error) = self.store.delete_unassigned_plate(item.uuid).await {
                    tracing::warn!(item = %item.uuid, %role, %error, "could not delete unassigned plate");
                }
            }
        }

        let mut all_promoted = true;
        for role in &self.stock_plate_roles {
            for item in order.items_for(role) {
                if item.status != ITEM_DONE_STATUS {
                    continue;
                }
                if let Err(error) = self.store.promote_plate(item.uuid).await {
                    tracing::warn!(item = %item.uuid, %error, "stock plate promotion failed, requeueing order");
                    all_promoted = false;
                }
            }
        }

        if all_promoted {
            Outcome::Ack
        } else {
            Outcome::Reject { requeue: true }
        }
    }

    async fn plate_transfer(&self, plate: &Plate, uuid: Uuid) -> Outcome {
        match self.store.update_aliquots(uuid, plate).await {
            Ok(()) => Outcome::Ack,
            Err(error) => {
                tracing::error!(plate = %uuid, %error, "error updating plate aliquots in Sequencescape");
                outcome_for(&error)
            }
        }
    }
}

/// Recoverable failures go back to the queue; anything else would loop
/// forever on redelivery and is dropped with an acknowledge.
fn outcome_for(error: &SyncError) -> Outcome {
    if error.is_recoverable() {
        Outcome::Reject { requeue: true }
    } else {
        Outcome::Ack
    }
}

#[async_trait]
impl Consumer for StockPlateConsumer {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn routing_keys(&self) -> Vec<String> {
        self.routes.patterns()
    }

    async fn handle(&self, delivery: &Delivery) -> Outcome {
        let Some(kind) = self.routes.resolve(&delivery.routing_key) else {
            tracing::debug!(routing_key = %delivery.routing_key, "no route for message, dropping");
            return Outcome::Ack;
        };

        let decoded = match decode(&delivery.body) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(routing_key = %delivery.routing_key, %error, "dropping undecodable message");
                return Outcome::Ack;
            }
        };

        match (kind, decoded) {
            (EventKind::PlateCreate, DecodedEvent::Plate { plate, uuid, .. }) => {
                self.plate_create(&plate, uuid).await
            }
            (EventKind::PlateTransfer, DecodedEvent::Plate { plate, uuid, .. }) => {
                self.plate_transfer(&plate, uuid).await
            }
            (EventKind::OrderUpdate, DecodedEvent::Order { order, .. }) => {
                self.order_update(&order).await
            }
            (kind, _) => {
                tracing::warn!(
                    routing_key = %delivery.routing_key,
                    ?kind,
                    "message body does not match its routing key, dropping"
                );
                Outcome::Ack
            }
        }
    }
}
