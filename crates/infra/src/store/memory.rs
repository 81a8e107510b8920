use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{
    BalanceRow, Movement, NewMovement, NewProduct, Product, balance_of, ensure_can_record,
};

use super::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct State {
    // Insertion order is creation order.
    products: Vec<Product>,
    moves: Vec<Movement>,
}

impl State {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn balance(&self, id: ProductId) -> Decimal {
        balance_of(
            self.moves
                .iter()
                .filter(|m| m.product_id == id)
                .map(|m| (m.move_type, m.qty)),
        )
    }
}

/// In-memory store for tests/dev.
///
/// Emulates the SQL schema: unique SKUs, the product foreign key, and the
/// balance view. One mutex guards all state, so a movement's balance check and
/// insert are atomic.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    balance_view: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            offline: AtomicBool::new(false),
            balance_view: AtomicBool::new(true),
        }
    }

    /// Make every call fail with [`StoreError::Connectivity`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulate a store where the `stock_balance` view was never created.
    pub fn drop_balance_view(&self) {
        self.balance_view.store(false, Ordering::SeqCst);
    }

    pub fn movement_count(&self) -> usize {
        self.state.lock().map(|s| s.moves.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("in-memory store is offline".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Rejected("lock poisoned".to_string()))
    }

    fn ensure_view(&self) -> Result<(), StoreError> {
        if self.balance_view.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::ViewUnavailable(
                "relation \"stock_balance\" does not exist".to_string(),
            ))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut state = self.lock()?;
        if state.products.iter().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateSku(product.sku.to_string()));
        }

        let stored = Product {
            id: ProductId::new(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit: product.unit.clone(),
            created_at: Utc::now(),
        };
        state.products.push(stored.clone());
        Ok(stored)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.lock()?;
        Ok(state.products.iter().rev().cloned().collect())
    }

    async fn product_balance(&self, product_id: ProductId) -> Result<Decimal, StoreError> {
        let state = self.lock()?;
        self.ensure_view()?;
        state
            .product(product_id)
            .map(|_| state.balance(product_id))
            .ok_or(StoreError::UnknownProduct(product_id))
    }

    async fn record_move(&self, movement: &NewMovement) -> Result<Movement, StoreError> {
        let mut state = self.lock()?;
        if state.product(movement.product_id).is_none() {
            return Err(StoreError::UnknownProduct(movement.product_id));
        }

        let available = state.balance(movement.product_id);
        ensure_can_record(movement.move_type, movement.qty, available)
            .map_err(|e| StoreError::InsufficientStock { available: e.available })?;

        let stored = Movement {
            id: MovementId::new(),
            product_id: movement.product_id,
            move_type: movement.move_type,
            qty: movement.qty,
            note: movement.note.clone(),
            created_at: Utc::now(),
        };
        state.moves.push(stored.clone());
        Ok(stored)
    }

    async fn recent_moves(&self, limit: usize) -> Result<Vec<Movement>, StoreError> {
        let state = self.lock()?;
        Ok(state.moves.iter().rev().take(limit).cloned().collect())
    }

    async fn list_balances(&self) -> Result<Vec<BalanceRow>, StoreError> {
        let state = self.lock()?;
        self.ensure_view()?;

        let mut rows: Vec<BalanceRow> = state
            .products
            .iter()
            .map(|p| BalanceRow {
                product_id: p.id,
                sku: p.sku.to_string(),
                name: p.name.clone(),
                unit: p.unit.clone(),
                balance: state.balance(p.id),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockledger_inventory::{MoveType, Quantity};

    use super::*;

    fn product(sku: &str, name: &str) -> NewProduct {
        NewProduct::new(sku, name, "pcs").unwrap()
    }

    fn movement(product_id: ProductId, t: MoveType, qty: &str) -> NewMovement {
        NewMovement::new(product_id, t, Quantity::parse(qty).unwrap(), None)
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected_without_new_record() {
        let store = InMemoryStore::new();
        store.insert_product(&product("ABC-001", "Bolt M8")).await.unwrap();

        let err = store
            .insert_product(&product(" ABC-001 ", "Other"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateSku("ABC-001".to_string()));
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn products_are_listed_newest_first() {
        let store = InMemoryStore::new();
        store.insert_product(&product("A", "First")).await.unwrap();
        store.insert_product(&product("B", "Second")).await.unwrap();

        let names: Vec<_> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn movement_for_unknown_product_is_rejected() {
        let store = InMemoryStore::new();
        let missing = ProductId::new();
        let err = store
            .record_move(&movement(missing, MoveType::In, "1"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownProduct(missing));
        assert_eq!(store.movement_count(), 0);
    }

    #[tokio::test]
    async fn balances_include_products_without_movements_sorted_by_name() {
        let store = InMemoryStore::new();
        let washer = store.insert_product(&product("W-1", "Washer")).await.unwrap();
        store.insert_product(&product("B-1", "Bolt")).await.unwrap();
        store
            .record_move(&movement(washer.id, MoveType::In, "3.5"))
            .await
            .unwrap();
        store
            .record_move(&movement(washer.id, MoveType::Adj, "0.5"))
            .await
            .unwrap();

        let rows = store.list_balances().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Bolt");
        assert_eq!(rows[0].balance, Decimal::ZERO);
        assert_eq!(rows[1].name, "Washer");
        assert_eq!(rows[1].balance, Decimal::from(4));
    }

    #[tokio::test]
    async fn missing_view_is_distinct_from_empty_result() {
        let store = InMemoryStore::new();
        assert!(store.list_balances().await.unwrap().is_empty());

        store.drop_balance_view();
        assert!(matches!(
            store.list_balances().await.unwrap_err(),
            StoreError::ViewUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn offline_store_reports_connectivity() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.ping().await.unwrap_err(), StoreError::Connectivity(_)));
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_outbound_moves_never_overdraw() {
        let store = Arc::new(InMemoryStore::new());
        let p = store.insert_product(&product("C-1", "Cable")).await.unwrap();
        store.record_move(&movement(p.id, MoveType::In, "10")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let id = p.id;
            handles.push(tokio::spawn(async move {
                store.record_move(&movement(id, MoveType::Out, "1")).await
            }));
        }

        let mut accepted = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(StoreError::InsufficientStock { available }) => {
                    assert_eq!(available, Decimal::ZERO)
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(store.product_balance(p.id).await.unwrap(), Decimal::ZERO);
    }
}
