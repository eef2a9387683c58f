//! Behavior when the store fails mid-operation or another process changes
//! the open order between two writes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{Money, OrderId};
use domain::{InventoryError, InventoryService, Order, OrderLine, Product, Purchase, Withdrawal};
use store::{Filter, InMemoryStore, Patch, Record, Store, StoreError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Create,
    Update,
}

fn unavailable() -> StoreError {
    StoreError::Serialization(<serde_json::Error as serde::de::Error>::custom(
        "store unavailable",
    ))
}

/// In-memory store that can be told to fail one kind of write on one table.
#[derive(Clone, Default)]
struct FaultyStore {
    inner: InMemoryStore,
    failing: Arc<Mutex<Option<(Write, &'static str)>>>,
}

impl FaultyStore {
    fn fail<R: Record>(&self, write: Write) {
        *self.failing.lock().unwrap() = Some((write, R::TABLE));
    }

    fn heal(&self) {
        *self.failing.lock().unwrap() = None;
    }

    fn fails(&self, write: Write, table: &'static str) -> bool {
        *self.failing.lock().unwrap() == Some((write, table))
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn find<R: Record>(&self, filter: &Filter) -> store::Result<Vec<R>> {
        self.inner.find(filter).await
    }

    async fn create<R: Record>(&self, record: R) -> store::Result<R> {
        if self.fails(Write::Create, R::TABLE) {
            return Err(unavailable());
        }
        self.inner.create(record).await
    }

    async fn update_columns<R: Record>(&self, filter: &Filter, patch: &Patch) -> store::Result<u64> {
        if self.fails(Write::Update, R::TABLE) {
            return Err(unavailable());
        }
        self.inner.update_columns::<R>(filter, patch).await
    }

    async fn delete<R: Record>(&self, filter: &Filter) -> store::Result<u64> {
        self.inner.delete::<R>(filter).await
    }
}

/// In-memory store that, once armed, lets a second service approve an order
/// right before the next line write goes through.
struct RacingStore {
    inner: InMemoryStore,
    rival: InventoryService<InMemoryStore>,
    armed: Mutex<Option<(Write, OrderId)>>,
}

impl RacingStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            rival: InventoryService::new(inner.clone()),
            inner,
            armed: Mutex::new(None),
        }
    }

    fn approve_before_next(&self, write: Write, order_id: OrderId) {
        *self.armed.lock().unwrap() = Some((write, order_id));
    }

    fn trigger(&self, write: Write, table: &'static str) -> Option<OrderId> {
        if table != OrderLine::TABLE {
            return None;
        }
        let mut armed = self.armed.lock().unwrap();
        match *armed {
            Some((armed_write, order_id)) if armed_write == write => {
                *armed = None;
                Some(order_id)
            }
            _ => None,
        }
    }

    async fn race(&self, write: Write, table: &'static str) {
        if let Some(order_id) = self.trigger(write, table) {
            self.rival.approve_order(order_id).await.unwrap();
        }
    }
}

#[async_trait]
impl Store for RacingStore {
    async fn find<R: Record>(&self, filter: &Filter) -> store::Result<Vec<R>> {
        self.inner.find(filter).await
    }

    async fn create<R: Record>(&self, record: R) -> store::Result<R> {
        self.race(Write::Create, R::TABLE).await;
        self.inner.create(record).await
    }

    async fn update_columns<R: Record>(&self, filter: &Filter, patch: &Patch) -> store::Result<u64> {
        self.race(Write::Update, R::TABLE).await;
        self.inner.update_columns::<R>(filter, patch).await
    }

    async fn delete<R: Record>(&self, filter: &Filter) -> store::Result<u64> {
        self.inner.delete::<R>(filter).await
    }
}

mod failed_writes {
    use super::*;

    async fn order_with_a_line(service: &InventoryService<FaultyStore>) -> OrderId {
        service
            .create_product(Product::new("h2oh", 10, 50))
            .await
            .unwrap();
        service.get_open_order().await.unwrap().id()
    }

    #[tokio::test]
    async fn failed_purchase_write_keeps_the_order_open() {
        let store = FaultyStore::default();
        let service = InventoryService::new(store.clone());
        let order_id = order_with_a_line(&service).await;

        store.fail::<Purchase>(Write::Create);
        let result = service.approve_order(order_id).await;
        assert!(matches!(result, Err(InventoryError::Storage(_))));
        assert_eq!(service.get_open_order().await.unwrap().id(), order_id);

        store.heal();
        let purchase = service.approve_order(order_id).await.unwrap();
        assert_eq!(purchase.order_id, order_id);
    }

    #[tokio::test]
    async fn failed_close_discards_the_purchase() {
        let store = FaultyStore::default();
        let service = InventoryService::new(store.clone());
        let order_id = order_with_a_line(&service).await;

        store.fail::<Order>(Write::Update);
        let result = service.approve_order(order_id).await;
        assert!(matches!(result, Err(InventoryError::Storage(_))));
        assert_eq!(store.inner.count::<Purchase>().await, 0);
        assert!(service.get_order(order_id).await.unwrap().order.is_open());

        store.heal();
        service.approve_order(order_id).await.unwrap();
        assert_eq!(store.inner.count::<Purchase>().await, 1);
    }

    #[tokio::test]
    async fn unstorable_total_keeps_the_order_open() {
        let store = FaultyStore::default();
        let service = InventoryService::new(store.clone());
        service.create_product(Product::new("coke", 0, 10)).await.unwrap();
        service.create_product(Product::new("pepsi", 0, 10)).await.unwrap();
        let open = service.get_open_order().await.unwrap();
        let huge = Money::from_decimal(600_000_000_000.0).unwrap();
        for line in open.lines() {
            service.update_line_value(line.id, huge).await.unwrap();
        }

        let result = service.approve_order(open.id()).await;
        assert!(matches!(result, Err(InventoryError::InvalidArgument(_))));
        assert_eq!(service.get_open_order().await.unwrap().id(), open.id());
        assert_eq!(store.inner.count::<Purchase>().await, 0);
    }

    #[tokio::test]
    async fn failed_withdrawal_write_returns_the_stock() {
        let store = FaultyStore::default();
        let service = InventoryService::new(store.clone());
        let h2oh = service
            .create_product(Product::new("h2oh", 100, 50))
            .await
            .unwrap();

        store.fail::<Withdrawal>(Write::Create);
        let result = service.consume_product(h2oh.id, 60).await;
        assert!(matches!(result, Err(InventoryError::Storage(_))));
        assert_eq!(service.get_product(h2oh.id).await.unwrap().current_quantity, 100);
        assert_eq!(store.inner.count::<Withdrawal>().await, 0);
        assert_eq!(store.inner.count::<OrderLine>().await, 0);

        store.heal();
        service.consume_product(h2oh.id, 60).await.unwrap();
        assert_eq!(service.get_product(h2oh.id).await.unwrap().current_quantity, 40);
        let open = service.get_open_order().await.unwrap();
        assert_eq!(open.line_for(h2oh.id).unwrap().quantity, 10);
    }
}

mod closed_order_races {
    use super::*;

    #[tokio::test]
    async fn new_line_follows_an_order_approved_elsewhere() {
        let inner = InMemoryStore::new();
        let racing = Arc::new(RacingStore::new(inner.clone()));
        let service = InventoryService::from_shared(Arc::clone(&racing));

        let pepsi = service
            .create_product(Product::new("pepsi", 10, 50))
            .await
            .unwrap();
        let first = service.get_open_order().await.unwrap().id();

        racing.approve_before_next(Write::Create, first);
        let juice = service
            .create_product(Product::new("juice", 90, 110))
            .await
            .unwrap();

        let approved = service.get_order(first).await.unwrap();
        assert!(approved.order.approved);
        assert!(approved.line_for(juice.id).is_none());
        assert!(approved.line_for(pepsi.id).is_some());

        let purchase = service.get_purchase_by_order(first).await.unwrap();
        assert_eq!(purchase.order.lines().len(), 1);
        assert_eq!(
            Some(purchase.purchase.total_value),
            purchase.order.total_value()
        );

        let open = service.get_open_order().await.unwrap();
        assert_ne!(open.id(), first);
        assert_eq!(open.line_for(juice.id).unwrap().quantity, 20);
    }

    #[tokio::test]
    async fn merge_into_an_order_approved_elsewhere_is_undone() {
        let inner = InMemoryStore::new();
        let racing = Arc::new(RacingStore::new(inner.clone()));
        let service = InventoryService::from_shared(Arc::clone(&racing));

        let pepsi = service
            .create_product(Product::new("pepsi", 10, 50))
            .await
            .unwrap();
        let first = service.get_open_order().await.unwrap();
        let line = first.line_for(pepsi.id).unwrap().clone();
        service
            .update_line_value(line.id, Money::from_cents(1000))
            .await
            .unwrap();

        racing.approve_before_next(Write::Update, first.id());
        service.consume_product(pepsi.id, 5).await.unwrap();

        let approved = service.get_order(first.id()).await.unwrap();
        let kept = approved.line_for(pepsi.id).unwrap();
        assert_eq!(kept.quantity, 40);
        assert_eq!(kept.value, Money::from_cents(1000));

        let purchase = service.get_purchase_by_order(first.id()).await.unwrap();
        assert_eq!(purchase.purchase.total_value, Money::from_cents(1000));

        let open = service.get_open_order().await.unwrap();
        assert_ne!(open.id(), first.id());
        assert_eq!(open.line_for(pepsi.id).unwrap().quantity, 45);
    }
}
