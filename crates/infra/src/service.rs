//! Inventory service: input validation and the outbound stock rule, in front of
//! an [`InventoryStore`].
//!
//! Each operation is a stateless request/response against the store. Shape
//! validation happens before any store call, so a rejected request has no side
//! effects.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use stockledger_core::{DomainError, ProductId};
use stockledger_inventory::{
    BalanceRow, InsufficientStock, MoveType, Movement, NewMovement, NewProduct, Product, Quantity,
    ensure_can_record,
};

use crate::store::{SharedStore, StoreError};

/// Default size of the recent movements list.
pub const RECENT_MOVEMENTS: usize = 50;

/// Upper bound on a caller-supplied movements limit.
pub const MAX_RECENT_MOVEMENTS: usize = 500;

/// Outcome taxonomy of every inventory operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Malformed input; rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    /// An outbound movement exceeds the balance on hand.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: Decimal, requested: Decimal },

    #[error("a product with sku {0:?} already exists")]
    DuplicateSku(String),

    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    /// The balance view is missing; distinct from an empty result.
    #[error("balance view unavailable: {0}")]
    BalanceViewUnavailable(String),

    /// Connectivity, permission, or unexpected store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for InventoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}

impl From<InsufficientStock> for InventoryError {
    fn from(err: InsufficientStock) -> Self {
        Self::InsufficientStock {
            available: err.available,
            requested: err.requested,
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateSku(sku) => Self::DuplicateSku(sku),
            StoreError::UnknownProduct(id) => Self::UnknownProduct(id),
            StoreError::ViewUnavailable(msg) => Self::BalanceViewUnavailable(msg),
            other => Self::Store(other),
        }
    }
}

/// Product registration request (raw user input).
#[derive(Debug, Clone, Default)]
pub struct RegisterProduct {
    pub sku: String,
    pub name: String,
    pub unit: Option<String>,
}

/// Movement request (raw user input).
#[derive(Debug, Clone)]
pub struct RecordMovement {
    pub product_id: String,
    pub move_type: String,
    pub qty: Decimal,
    pub note: Option<String>,
}

/// Stateless façade over the configured store.
#[derive(Clone)]
pub struct InventoryService {
    store: SharedStore,
}

impl InventoryService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// One round-trip to the store; run once at startup.
    pub async fn check_connectivity(&self) -> Result<(), InventoryError> {
        self.store.ping().await.map_err(InventoryError::Store)
    }

    pub async fn register_product(&self, req: RegisterProduct) -> Result<Product, InventoryError> {
        let new = NewProduct::new(&req.sku, &req.name, req.unit.as_deref().unwrap_or(""))?;

        let product = self.store.insert_product(&new).await.inspect_err(|e| {
            if let StoreError::DuplicateSku(sku) = e {
                warn!(sku = %sku, "product rejected: duplicate sku");
            }
        })?;

        info!(product_id = %product.id, sku = %product.sku, "product registered");
        Ok(product)
    }

    /// All products, newest first.
    pub async fn list_products(&self) -> Result<Vec<Product>, InventoryError> {
        Ok(self.store.list_products().await?)
    }

    /// Validate and record one movement.
    ///
    /// `OUT` movements read the current balance first and are rejected with
    /// [`InventoryError::InsufficientStock`] when it does not cover the
    /// requested quantity. The store repeats the check atomically with the
    /// insert, so a concurrent movement that lands in between is also caught.
    pub async fn record_movement(&self, req: RecordMovement) -> Result<Movement, InventoryError> {
        let product_id: ProductId = req.product_id.parse()?;
        let move_type: MoveType = req.move_type.parse()?;
        let qty = Quantity::new(req.qty)?;
        let movement = NewMovement::new(product_id, move_type, qty, req.note.as_deref());

        if move_type.draws_down() {
            let available = self.store.product_balance(product_id).await?;
            if let Err(shortfall) = ensure_can_record(move_type, qty, available) {
                warn!(
                    product_id = %product_id,
                    available = %shortfall.available,
                    requested = %shortfall.requested,
                    "outbound movement rejected"
                );
                return Err(shortfall.into());
            }
        }

        let stored = match self.store.record_move(&movement).await {
            Ok(m) => m,
            Err(StoreError::InsufficientStock { available }) => {
                warn!(
                    product_id = %product_id,
                    available = %available,
                    requested = %qty,
                    "outbound movement rejected by store"
                );
                return Err(InventoryError::InsufficientStock {
                    available,
                    requested: qty.value(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            movement_id = %stored.id,
            product_id = %stored.product_id,
            move_type = %stored.move_type,
            qty = %stored.qty,
            "movement recorded"
        );
        Ok(stored)
    }

    /// Most recent movements, newest first. `limit` is clamped to
    /// `1..=MAX_RECENT_MOVEMENTS`.
    pub async fn recent_movements(&self, limit: usize) -> Result<Vec<Movement>, InventoryError> {
        let limit = limit.clamp(1, MAX_RECENT_MOVEMENTS);
        Ok(self.store.recent_moves(limit).await?)
    }

    /// Balance view ordered by product name.
    pub async fn list_balances(&self) -> Result<Vec<BalanceRow>, InventoryError> {
        Ok(self.store.list_balances().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::{InMemoryStore, InventoryStore};

    /// Counts store calls so tests can assert "zero side effects".
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl InventoryStore for CountingStore {
        fn backend(&self) -> &'static str {
            "counting"
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.hit();
            self.inner.ping().await
        }
        async fn insert_product(&self, p: &NewProduct) -> Result<Product, StoreError> {
            self.hit();
            self.inner.insert_product(p).await
        }
        async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
            self.hit();
            self.inner.list_products().await
        }
        async fn product_balance(&self, id: ProductId) -> Result<Decimal, StoreError> {
            self.hit();
            self.inner.product_balance(id).await
        }
        async fn record_move(&self, m: &NewMovement) -> Result<Movement, StoreError> {
            self.hit();
            self.inner.record_move(m).await
        }
        async fn recent_moves(&self, limit: usize) -> Result<Vec<Movement>, StoreError> {
            self.hit();
            self.inner.recent_moves(limit).await
        }
        async fn list_balances(&self) -> Result<Vec<BalanceRow>, StoreError> {
            self.hit();
            self.inner.list_balances().await
        }
    }

    fn service() -> (InventoryService, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        (InventoryService::new(store.clone()), store)
    }

    fn product(sku: &str, name: &str, unit: &str) -> RegisterProduct {
        RegisterProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            unit: Some(unit.to_string()),
        }
    }

    fn movement(product_id: ProductId, move_type: &str, qty: i64) -> RecordMovement {
        RecordMovement {
            product_id: product_id.to_string(),
            move_type: move_type.to_string(),
            qty: Decimal::from(qty),
            note: None,
        }
    }

    async fn balance_of(svc: &InventoryService, id: ProductId) -> Decimal {
        svc.list_balances()
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.product_id == id)
            .map(|r| r.balance)
            .unwrap()
    }

    #[tokio::test]
    async fn bolt_scenario_rejects_overdraw_and_keeps_balance() {
        let (svc, store) = service();
        let bolt = svc
            .register_product(product("ABC-001", "Bolt M8", "pcs"))
            .await
            .unwrap();

        svc.record_movement(movement(bolt.id, "IN", 10)).await.unwrap();
        svc.record_movement(movement(bolt.id, "OUT", 4)).await.unwrap();
        assert_eq!(balance_of(&svc, bolt.id).await, Decimal::from(6));

        let err = svc
            .record_movement(movement(bolt.id, "OUT", 10))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                available: Decimal::from(6),
                requested: Decimal::from(10),
            }
        );
        assert_eq!(err.to_string(), "insufficient stock: available 6, requested 10");
        assert_eq!(balance_of(&svc, bolt.id).await, Decimal::from(6));
        assert_eq!(store.inner.movement_count(), 2);
    }

    #[tokio::test]
    async fn accepted_outbound_appends_exactly_the_submitted_quantity() {
        let (svc, store) = service();
        let p = svc.register_product(product("X", "Nut", "")).await.unwrap();
        svc.record_movement(movement(p.id, "IN", 5)).await.unwrap();

        let out = svc
            .record_movement(RecordMovement {
                qty: Decimal::new(525, 2),
                ..movement(p.id, "out", 0)
            })
            .await;
        // 5.25 > 5
        assert!(matches!(out, Err(InventoryError::InsufficientStock { .. })));

        let out = svc
            .record_movement(RecordMovement {
                qty: Decimal::new(475, 2),
                note: Some("  order 17 ".to_string()),
                ..movement(p.id, "out", 0)
            })
            .await
            .unwrap();
        assert_eq!(out.qty.value(), Decimal::new(475, 2));
        assert_eq!(out.move_type, MoveType::Out);
        assert_eq!(out.note.as_deref(), Some("order 17"));
        assert_eq!(store.inner.movement_count(), 2);
        assert_eq!(balance_of(&svc, p.id).await, Decimal::new(25, 2));
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_distinct_failure() {
        let (svc, _) = service();
        svc.register_product(product("ABC-001", "Bolt M8", "pcs"))
            .await
            .unwrap();

        let err = svc
            .register_product(product("  ABC-001", "Bolt M10", "pcs"))
            .await
            .unwrap_err();
        assert_eq!(err, InventoryError::DuplicateSku("ABC-001".to_string()));
        assert_eq!(svc.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_product_input_makes_no_store_calls() {
        let (svc, store) = service();
        for req in [product("", "Bolt", "pcs"), product("A-1", "  ", "pcs")] {
            let err = svc.register_product(req).await.unwrap_err();
            assert!(matches!(err, InventoryError::Validation(_)));
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_movement_input_makes_no_store_calls() {
        let (svc, store) = service();
        let id = ProductId::new();

        let cases = [
            RecordMovement {
                product_id: "nope".to_string(),
                ..movement(id, "IN", 1)
            },
            movement(id, "MOVE", 1),
            movement(id, "IN", 0),
            movement(id, "OUT", -3),
            RecordMovement {
                qty: Decimal::new(1, 3),
                ..movement(id, "ADJ", 0)
            },
        ];
        for req in cases {
            let err = svc.record_movement(req).await.unwrap_err();
            assert!(matches!(err, InventoryError::Validation(_)), "{err:?}");
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_reported_for_every_move_type() {
        let (svc, _) = service();
        let id = ProductId::new();
        for t in ["IN", "OUT", "ADJ"] {
            let err = svc.record_movement(movement(id, t, 1)).await.unwrap_err();
            assert_eq!(err, InventoryError::UnknownProduct(id));
        }
    }

    #[tokio::test]
    async fn adjustments_add_to_the_balance() {
        let (svc, _) = service();
        let p = svc.register_product(product("A", "Axle", "pcs")).await.unwrap();
        svc.record_movement(movement(p.id, "ADJ", 3)).await.unwrap();
        svc.record_movement(movement(p.id, "OUT", 3)).await.unwrap();
        assert_eq!(balance_of(&svc, p.id).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn recent_movements_are_newest_first_and_clamped() {
        let (svc, _) = service();
        let p = svc.register_product(product("A", "Axle", "pcs")).await.unwrap();
        for qty in 1..=3 {
            svc.record_movement(movement(p.id, "IN", qty)).await.unwrap();
        }

        let recent = svc.recent_movements(RECENT_MOVEMENTS).await.unwrap();
        let qtys: Vec<_> = recent.iter().map(|m| m.qty.value()).collect();
        assert_eq!(qtys, vec![Decimal::from(3), Decimal::from(2), Decimal::from(1)]);

        assert_eq!(svc.recent_movements(0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_balance_view_is_distinct_from_empty() {
        let (svc, store) = service();
        assert_eq!(svc.list_balances().await.unwrap(), vec![]);

        store.inner.drop_balance_view();
        assert!(matches!(
            svc.list_balances().await.unwrap_err(),
            InventoryError::BalanceViewUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn store_outage_is_distinct_from_business_rejection() {
        let (svc, store) = service();
        let p = svc.register_product(product("A", "Axle", "pcs")).await.unwrap();
        store.inner.set_offline(true);

        let err = svc.record_movement(movement(p.id, "OUT", 1)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Store(StoreError::Connectivity(_))));
        assert!(svc.check_connectivity().await.is_err());
    }

    #[tokio::test]
    async fn balance_equals_signed_sum_after_many_movements() {
        let (svc, _) = service();
        let p = svc.register_product(product("S", "Spring", "pcs")).await.unwrap();

        let script = [("IN", 7), ("ADJ", 2), ("OUT", 5), ("OUT", 9), ("IN", 1), ("OUT", 5)];
        let mut expected = Decimal::ZERO;
        for (t, q) in script {
            let qty = Decimal::from(q);
            match svc.record_movement(movement(p.id, t, q)).await {
                Ok(_) if t == "OUT" => expected -= qty,
                Ok(_) => expected += qty,
                Err(InventoryError::InsufficientStock { available, .. }) => {
                    assert_eq!(available, expected)
                }
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert_eq!(expected, Decimal::ZERO);
        assert_eq!(balance_of(&svc, p.id).await, expected);
    }
}
