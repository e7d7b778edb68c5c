use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{OrderStore, OrderTransaction, PoolStatus, StoreError};
use crate::context::RequestContext;
use crate::domain::order::{NewLineItem, OrderStatus};
use crate::models::{Order, OrderLineItem};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, created_at, updated_at";
const LINE_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price";

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    status: String,
    total_amount: f64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(format!("order {}: {}", row.id, e)))?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            status,
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    quantity: i32,
    price: f64,
}

impl From<LineItemRow> for OrderLineItem {
    fn from(row: LineItemRow) -> Self {
        OrderLineItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the pool and check one connection out, so a bad address fails
    /// at startup rather than on the first request.
    pub async fn connect(options: PgConnectOptions, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        tracing::info!(max_connections, "✅ Database connected");
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await?;
        tracing::info!("✅ Database migrations applied");
        Ok(())
    }

    /// Read from pool counters; does no I/O, so any thread may call it.
    pub fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            connections: self.pool.size(),
            idle: self.pool.num_idle(),
            closed: self.pool.is_closed(),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn OrderTransaction>, StoreError> {
        let tx = ctx.run(async { Ok(self.pool.begin().await?) }).await?;
        Ok(Box::new(PgOrderTransaction { tx }))
    }

    async fn get_order_by_id(&self, ctx: &RequestContext, id: i32) -> Result<Order, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = ctx
            .run(async {
                Ok(sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?)
            })
            .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_line_items_by_order_id(
        &self,
        ctx: &RequestContext,
        order_id: i32,
    ) -> Result<Vec<OrderLineItem>, StoreError> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_line_items WHERE order_id = $1 ORDER BY id ASC"
        );
        let rows = ctx
            .run(async {
                Ok(sqlx::query_as::<_, LineItemRow>(&sql)
                    .bind(order_id)
                    .fetch_all(&self.pool)
                    .await?)
            })
            .await?;

        Ok(rows.into_iter().map(OrderLineItem::from).collect())
    }

    async fn get_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = ctx
            .run(async {
                Ok(sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?)
            })
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn count_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
    ) -> Result<i64, StoreError> {
        ctx.run(async {
            Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?)
        })
        .await
    }

    async fn update_order_status(
        &self,
        ctx: &RequestContext,
        id: i32,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row = ctx
            .run(async {
                Ok(sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(id)
                    .bind(status.as_str())
                    .fetch_optional(&self.pool)
                    .await?)
            })
            .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }
}

/// Dropping without `commit` rolls the transaction back when the connection
/// returns to the pool.
struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn create_order(
        &mut self,
        ctx: &RequestContext,
        user_id: i32,
        status: OrderStatus,
        total_amount: f64,
    ) -> Result<Order, StoreError> {
        let sql = format!(
            "INSERT INTO orders (user_id, status, total_amount) VALUES ($1, $2, $3) \
             RETURNING {ORDER_COLUMNS}"
        );
        let tx = &mut self.tx;
        let row = ctx
            .run(async {
                Ok(sqlx::query_as::<_, OrderRow>(&sql)
                    .bind(user_id)
                    .bind(status.as_str())
                    .bind(total_amount)
                    .fetch_one(&mut **tx)
                    .await?)
            })
            .await?;

        row.try_into()
    }

    async fn create_line_item(
        &mut self,
        ctx: &RequestContext,
        order_id: i32,
        item: &NewLineItem,
    ) -> Result<OrderLineItem, StoreError> {
        let sql = format!(
            "INSERT INTO order_line_items (order_id, product_id, quantity, price) \
             VALUES ($1, $2, $3, $4) RETURNING {LINE_ITEM_COLUMNS}"
        );
        let tx = &mut self.tx;
        let row = ctx
            .run(async {
                Ok(sqlx::query_as::<_, LineItemRow>(&sql)
                    .bind(order_id)
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .bind(item.price)
                    .fetch_one(&mut **tx)
                    .await?)
            })
            .await?;

        Ok(row.into())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// These run against a real database and are skipped unless DATABASE_URL is set.
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    static NEXT_USER: AtomicI32 = AtomicI32::new(1);

    async fn store() -> Option<PgOrderStore> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };
        let options: PgConnectOptions = url.parse().unwrap();
        let store = PgOrderStore::connect(options, 2).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    /// A user id unique to this run, with any rows from earlier runs removed.
    async fn fresh_user(store: &PgOrderStore) -> i32 {
        let user_id = (Utc::now().timestamp() % 100_000) as i32 * 10_000
            + NEXT_USER.fetch_add(1, Ordering::SeqCst);
        sqlx::query("DELETE FROM order_line_items WHERE order_id IN (SELECT id FROM orders WHERE user_id = $1)")
            .bind(user_id)
            .execute(&store.pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM orders WHERE user_id = $1")
            .bind(user_id)
            .execute(&store.pool)
            .await
            .unwrap();
        user_id
    }

    fn ctx() -> RequestContext {
        RequestContext::default()
    }

    async fn insert_order(store: &PgOrderStore, user_id: i32, items: &[NewLineItem]) -> Order {
        let mut tx = store.begin(&ctx()).await.unwrap();
        let order = tx
            .create_order(&ctx(), user_id, OrderStatus::Pending, 12.5)
            .await
            .unwrap();
        for item in items {
            tx.create_line_item(&ctx(), order.id, item).await.unwrap();
        }
        tx.commit().await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_committed_order_reads_back_with_items_in_insert_order() {
        let Some(store) = store().await else { return };
        let user_id = fresh_user(&store).await;
        let items = [
            NewLineItem { product_id: 9, quantity: 1, price: 2.5 },
            NewLineItem { product_id: 4, quantity: 2, price: 5.0 },
        ];

        let created = insert_order(&store, user_id, &items).await;

        let fetched = store.get_order_by_id(&ctx(), created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert!(fetched.created_at.is_some());

        let got = store.get_line_items_by_order_id(&ctx(), created.id).await.unwrap();
        let products: Vec<_> = got.iter().map(|i| i.product_id).collect();
        assert_eq!(products, vec![9, 4]);
        assert!(got.iter().all(|i| i.order_id == created.id));
    }

    #[tokio::test]
    async fn test_rolled_back_order_is_not_visible() {
        let Some(store) = store().await else { return };
        let user_id = fresh_user(&store).await;

        let mut tx = store.begin(&ctx()).await.unwrap();
        let order = tx
            .create_order(&ctx(), user_id, OrderStatus::Pending, 1.0)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let err = store.get_order_by_id(&ctx(), order.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.count_orders_by_user_id(&ctx(), user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_orders_by_user_newest_first_with_id_tie_break() {
        let Some(store) = store().await else { return };
        let user_id = fresh_user(&store).await;

        let older = insert_order(&store, user_id, &[]).await;

        // NOW() is fixed per transaction, so these two share created_at.
        let mut tx = store.begin(&ctx()).await.unwrap();
        let first = tx
            .create_order(&ctx(), user_id, OrderStatus::Pending, 1.0)
            .await
            .unwrap();
        let second = tx
            .create_order(&ctx(), user_id, OrderStatus::Pending, 1.0)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(first.created_at, second.created_at);

        let page = store.get_orders_by_user_id(&ctx(), user_id, 10, 0).await.unwrap();
        let ids: Vec<_> = page.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id, older.id]);

        let tail = store.get_orders_by_user_id(&ctx(), user_id, 2, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, older.id);
        assert_eq!(store.count_orders_by_user_id(&ctx(), user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_every_status_round_trips_through_update() {
        let Some(store) = store().await else { return };
        let user_id = fresh_user(&store).await;
        let order = insert_order(&store, user_id, &[]).await;

        for status in OrderStatus::ALL {
            let updated = store.update_order_status(&ctx(), order.id, status).await.unwrap();
            assert_eq!(updated.id, order.id);
            assert_eq!(updated.status, status);
            assert!(updated.updated_at >= order.updated_at);
        }
    }

    #[tokio::test]
    async fn test_update_of_missing_order_is_not_found() {
        let Some(store) = store().await else { return };

        let err = store
            .update_order_status(&ctx(), i32::MAX, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_status_check_constraint_rejects_unknown_value() {
        let Some(store) = store().await else { return };
        let user_id = fresh_user(&store).await;

        let result = sqlx::query("INSERT INTO orders (user_id, status, total_amount) VALUES ($1, 'BOGUS', 1)")
            .bind(user_id)
            .execute(&store.pool)
            .await;
        assert!(result.is_err());
    }
}
