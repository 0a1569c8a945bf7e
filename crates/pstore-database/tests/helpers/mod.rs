//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use pstore_core::{PersistentObject, PersistentStore};
use pstore_core::define_key;
use pstore_database::{DefaultStore, MemoryBackend, Store, UnitOfWork};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Customer {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub tier: String,
    pub age: i64,
    pub address: Address,
    pub nickname: Option<String>,
}

impl PersistentObject for Customer {
    const COLLECTION: &'static str = "customers";

    fn id(&self) -> &Uuid {
        &self.id
    }
}

define_key!(
    /// Order identifier.
    OrderId
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: Uuid,
    #[validate(range(min = 0))]
    pub total_cents: i64,
}

impl PersistentObject<OrderId> for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &OrderId {
        &self.id
    }
}

pub fn customer(name: &str, tier: &str, age: i64, city: &str) -> Customer {
    Customer {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        tier: tier.to_string(),
        age,
        address: Address {
            city: city.to_string(),
            country: "UK".to_string(),
        },
        nickname: None,
    }
}

/// The customers most tests start from.
pub fn roster() -> Vec<Customer> {
    vec![
        customer("Ada", "gold", 36, "London"),
        customer("Grace", "silver", 85, "Arlington"),
        customer("Alan", "gold", 41, "Manchester"),
        customer("Edsger", "bronze", 72, "Nuenen"),
        customer("Barbara", "silver", 44, "London"),
    ]
}

/// A fresh in-memory backend plus a unit of work over it.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub uow: Arc<UnitOfWork<MemoryBackend>>,
}

impl TestContext {
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let uow = UnitOfWork::new(Arc::clone(&backend));
        Self { backend, uow }
    }

    /// A context whose backend already holds `customers`.
    pub async fn seeded(customers: Vec<Customer>) -> Self {
        let seeding = Self::new();
        let store = seeding.customers();
        store.add_range(customers).await.expect("seed customers");
        store.commit().await.expect("commit seed");
        seeding.fresh_session()
    }

    /// A new unit of work over the same backend.
    pub fn fresh_session(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            uow: UnitOfWork::new(Arc::clone(&self.backend)),
        }
    }

    pub fn customers(&self) -> DefaultStore<Customer, MemoryBackend> {
        self.uow.store::<Customer, Uuid>()
    }

    pub fn orders(&self) -> Store<Order, OrderId, MemoryBackend> {
        self.uow.store::<Order, OrderId>()
    }
}
