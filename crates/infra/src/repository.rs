//! Order repository: CRUD over service-order documents keyed by id.
//!
//! The core treats persistence as a key-value document store with simple
//! filtering; no relational joins are assumed. Last write wins.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use fieldorder_core::OrderId;
use fieldorder_orders::{OrderStatus, ServiceOrder};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("order not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Document-store seam for service orders.
///
/// Implementations must be whole-document atomic: an `update` either replaces
/// the stored document entirely or leaves the prior one intact.
pub trait OrderRepository: Send + Sync {
    fn create(&self, order: ServiceOrder) -> Result<(), RepositoryError>;
    fn get(&self, id: OrderId) -> Result<Option<ServiceOrder>, RepositoryError>;
    fn update(&self, order: ServiceOrder) -> Result<(), RepositoryError>;
    fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
    /// All orders, optionally filtered by status.
    fn list(&self, status: Option<OrderStatus>) -> Result<Vec<ServiceOrder>, RepositoryError>;
}

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, ServiceOrder>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, order: ServiceOrder) -> Result<(), RepositoryError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        orders.insert(order.id_typed(), order);
        Ok(())
    }

    fn get(&self, id: OrderId) -> Result<Option<ServiceOrder>, RepositoryError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(orders.get(&id).cloned())
    }

    fn update(&self, order: ServiceOrder) -> Result<(), RepositoryError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        let id = order.id_typed();
        if !orders.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        orders.insert(id, order);
        Ok(())
    }

    fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        orders.remove(&id);
        Ok(())
    }

    fn list(&self, status: Option<OrderStatus>) -> Result<Vec<ServiceOrder>, RepositoryError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        let mut result: Vec<ServiceOrder> = orders
            .values()
            .filter(|order| status.is_none_or(|s| order.status() == s))
            .cloned()
            .collect();
        // HashMap iteration order is arbitrary; present newest-first.
        result.sort_by_key(|order| std::cmp::Reverse(order.created_at()));
        Ok(result)
    }
}
