use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{OrderStore, OrderTransaction, StoreError};
use crate::context::RequestContext;
use crate::domain::order::{NewLineItem, OrderStatus};
use crate::models::{Order, OrderLineItem};

// ============================================================================
// In-Memory Order Store (tests)
// ============================================================================
//
// Mirrors the PostgreSQL store: IDs come from sequences that are not rolled
// back, transactions stage writes until commit, and dropping an uncommitted
// transaction discards its writes. Failures and latency can be injected.
//
// ============================================================================

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    items: Vec<OrderLineItem>,
    next_order_id: i32,
    next_item_id: i32,
    item_inserts: usize,
}

#[derive(Default, Clone)]
struct Faults {
    latency: Option<Duration>,
    fail_begin: bool,
    fail_commit: bool,
    fail_update: bool,
    fail_item_insert_at: Option<usize>,
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Mutex<Faults>>,
}

fn injected() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every store call sleeps this long first.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().unwrap().latency = Some(latency);
    }

    pub fn fail_begin(&self) {
        self.faults.lock().unwrap().fail_begin = true;
    }

    pub fn fail_commit(&self) {
        self.faults.lock().unwrap().fail_commit = true;
    }

    pub fn fail_update(&self) {
        self.faults.lock().unwrap().fail_update = true;
    }

    /// Fail the n-th line-item insert (0-based, counted across the store).
    pub fn fail_item_insert_at(&self, n: usize) {
        self.faults.lock().unwrap().fail_item_insert_at = Some(n);
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Write an order outside any transaction, e.g. to seed listings.
    pub fn seed_order(&self, user_id: i32, status: OrderStatus, total_amount: f64) -> Order {
        let mut state = self.state.lock().unwrap();
        state.next_order_id += 1;
        let now = Utc::now();
        let order = Order {
            id: state.next_order_id,
            user_id,
            status,
            total_amount,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.orders.push(order.clone());
        order
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(latency) = self.faults().latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn OrderTransaction>, StoreError> {
        ctx.run(async {
            self.pause().await;
            if self.faults().fail_begin {
                return Err(injected());
            }
            Ok(())
        })
        .await?;
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            orders: Vec::new(),
            items: Vec::new(),
        }))
    }

    async fn get_order_by_id(&self, ctx: &RequestContext, id: i32) -> Result<Order, StoreError> {
        ctx.run(async {
            self.pause().await;
            let state = self.state.lock().unwrap();
            state
                .orders
                .iter()
                .find(|o| o.id == id)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_line_items_by_order_id(
        &self,
        ctx: &RequestContext,
        order_id: i32,
    ) -> Result<Vec<OrderLineItem>, StoreError> {
        ctx.run(async {
            self.pause().await;
            let state = self.state.lock().unwrap();
            let mut items: Vec<_> = state
                .items
                .iter()
                .filter(|i| i.order_id == order_id)
                .cloned()
                .collect();
            items.sort_by_key(|i| i.id);
            Ok(items)
        })
        .await
    }

    async fn get_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        ctx.run(async {
            self.pause().await;
            let state = self.state.lock().unwrap();
            let mut orders: Vec<_> = state
                .orders
                .iter()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(orders
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(0))
                .collect())
        })
        .await
    }

    async fn count_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
    ) -> Result<i64, StoreError> {
        ctx.run(async {
            self.pause().await;
            let state = self.state.lock().unwrap();
            Ok(state.orders.iter().filter(|o| o.user_id == user_id).count() as i64)
        })
        .await
    }

    async fn update_order_status(
        &self,
        ctx: &RequestContext,
        id: i32,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        ctx.run(async {
            self.pause().await;
            if self.faults().fail_update {
                return Err(injected());
            }
            let mut state = self.state.lock().unwrap();
            let order = state
                .orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or(StoreError::NotFound)?;
            order.status = status;
            order.updated_at = Some(Utc::now());
            Ok(order.clone())
        })
        .await
    }
}

struct InMemoryTransaction {
    store: InMemoryOrderStore,
    orders: Vec<Order>,
    items: Vec<OrderLineItem>,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn create_order(
        &mut self,
        ctx: &RequestContext,
        user_id: i32,
        status: OrderStatus,
        total_amount: f64,
    ) -> Result<Order, StoreError> {
        let store = self.store.clone();
        let order = ctx
            .run(async move {
                store.pause().await;
                let mut state = store.state.lock().unwrap();
                state.next_order_id += 1;
                let now = Utc::now();
                Ok(Order {
                    id: state.next_order_id,
                    user_id,
                    status,
                    total_amount,
                    created_at: Some(now),
                    updated_at: Some(now),
                })
            })
            .await?;
        self.orders.push(order.clone());
        Ok(order)
    }

    async fn create_line_item(
        &mut self,
        ctx: &RequestContext,
        order_id: i32,
        item: &NewLineItem,
    ) -> Result<OrderLineItem, StoreError> {
        let store = self.store.clone();
        let item = item.clone();
        let created = ctx
            .run(async move {
                store.pause().await;
                let fail_at = store.faults().fail_item_insert_at;
                let mut state = store.state.lock().unwrap();
                let attempt = state.item_inserts;
                state.item_inserts += 1;
                if fail_at == Some(attempt) {
                    return Err(injected());
                }
                state.next_item_id += 1;
                Ok(OrderLineItem {
                    id: state.next_item_id,
                    order_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
            })
            .await?;
        self.items.push(created.clone());
        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { store, orders, items } = *self;
        if store.faults().fail_commit {
            return Err(injected());
        }
        let mut state = store.state.lock().unwrap();
        state.orders.extend(orders);
        state.items.extend(items);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
