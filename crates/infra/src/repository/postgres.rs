//! Postgres-backed repositories.
//!
//! One `PostgresRepository` serves all three ports over a shared pool. Schema
//! lives in `migrations/0001_init.sql` and is applied by [`PostgresRepository::migrate`].
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database / PoolClosed / Io / other | `Database { operation, .. }` |
//! | ColumnDecode / ColumnNotFound | `Corrupt { table, .. }` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gbau_core::{OrderId, ProductId, SellerId, UserId, VariantId};
use gbau_products::{Color, Product, Size, Variant, VariantAttributes};
use gbau_sales::{Order, OrderLine, OrderScope, OrderStatus};

use super::{OrderRepository, ProductRepository, Slice, StoreError, VariantRepository};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: Arc<PgPool>,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PostgresRepository {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, seller_id, title, description, stock, average_price
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn save(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, title, description, stock, average_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                stock = EXCLUDED.stock,
                average_price = EXCLUDED.average_price
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.seller_id().as_uuid())
        .bind(product.title())
        .bind(product.description())
        .bind(product.stock())
        .bind(product.average_price())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, slice: Slice) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, seller_id, title, description, stock, average_price
            FROM products
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(slice.limit))
        .bind(offset(slice))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        count_rows(&self.pool, "SELECT COUNT(*) FROM products", "count_products").await
    }
}

const VARIANT_COLUMNS: &str = "id, product_id, name, company, stock, value, original_value, \
                               color, design, size, capacity, weight, image";

#[async_trait]
impl VariantRepository for PostgresRepository {
    #[instrument(skip(self), fields(variant_id = %id), err)]
    async fn get(&self, id: VariantId) -> Result<Option<Variant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {VARIANT_COLUMNS} FROM variants WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_variant", e))?;

        row.as_ref().map(variant_from_row).transpose()
    }

    async fn get_many(&self, ids: &[VariantId]) -> Result<Vec<Variant>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM variants WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_variants", e))?;

        rows.iter().map(variant_from_row).collect()
    }

    async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM variants WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_product_variants", e))?;

        rows.iter().map(variant_from_row).collect()
    }

    #[instrument(skip(self, variant), fields(variant_id = %variant.id_typed()), err)]
    async fn save(&self, variant: &Variant) -> Result<(), StoreError> {
        let color: Option<Vec<String>> = variant
            .color()
            .map(|colors| colors.iter().map(|c| c.as_str().to_string()).collect());

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, name, company, stock, value, original_value,
                color, design, size, capacity, weight, image
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id)
            DO UPDATE SET
                company = EXCLUDED.company,
                stock = EXCLUDED.stock,
                value = EXCLUDED.value,
                color = EXCLUDED.color,
                design = EXCLUDED.design,
                size = EXCLUDED.size,
                capacity = EXCLUDED.capacity,
                weight = EXCLUDED.weight,
                image = EXCLUDED.image
            "#,
        )
        .bind(variant.id_typed().as_uuid())
        .bind(variant.product_id().as_uuid())
        .bind(variant.name())
        .bind(variant.company())
        .bind(variant.stock())
        .bind(variant.value())
        .bind(variant.original_value())
        .bind(color)
        .bind(variant.design())
        .bind(variant.size().map(|s| s.as_str()))
        .bind(variant.capacity())
        .bind(variant.weight())
        .bind(variant.image())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_variant", e))?;
        Ok(())
    }

    async fn delete(&self, id: VariantId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM variants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_variant", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_product(&self, product_id: ProductId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM variants WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product_variants", e))?;
        Ok(result.rows_affected())
    }

    async fn list(&self, slice: Slice) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM variants ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(slice.limit))
        .bind(offset(slice))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_variants", e))?;

        rows.iter().map(variant_from_row).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        count_rows(&self.pool, "SELECT COUNT(*) FROM variants", "count_variants").await
    }
}

#[async_trait]
impl OrderRepository for PostgresRepository {
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, buyer_id, seller_id, status, date FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        match row {
            Some(row) => {
                let mut orders = self.attach_lines(vec![row]).await?;
                Ok(orders.pop())
            }
            None => Ok(None),
        }
    }

    /// Header and lines go in one transaction.
    #[instrument(skip(self, order), fields(order_id = %order.id_typed(), lines = order.lines().len()), err)]
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, status, date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.buyer_id().as_uuid())
        .bind(order.seller_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.date())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for line in order.lines() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, variant_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(line.line_no as i32)
            .bind(line.variant_id.as_uuid())
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    async fn update_status(&self, id: OrderId, status: &OrderStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, scope: OrderScope, slice: Slice) -> Result<Vec<Order>, StoreError> {
        let (filter, party) = scope_filter(scope);
        let rows = sqlx::query(&format!(
            "SELECT id, buyer_id, seller_id, status, date FROM orders {filter} \
             ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(slice.limit))
        .bind(offset(slice))
        .bind(party)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        self.attach_lines(rows).await
    }

    async fn count(&self, scope: OrderScope) -> Result<u64, StoreError> {
        let (filter, party) = scope_filter(scope);
        let filter = filter.replace("$3", "$1");
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders {filter}"))
            .bind(party)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;
        Ok(total.max(0) as u64)
    }
}

impl PostgresRepository {
    /// Load the lines of every order in `rows` with one query.
    async fn attach_lines(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        let ids = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("orders", e))?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, line_no, variant_id, quantity, price
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_lines", e))?;

        let mut lines: Vec<(Uuid, OrderLine)> = Vec::with_capacity(line_rows.len());
        for row in &line_rows {
            lines.push(line_from_row(row).map_err(|e| corrupt("order_lines", e))?);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                let own_lines = lines
                    .iter()
                    .filter(|(order_id, _)| *order_id == id)
                    .map(|(_, line)| line.clone())
                    .collect();
                Ok(Order::restore(
                    OrderId::from_uuid(id),
                    UserId::from_uuid(row.try_get("buyer_id")?),
                    SellerId::from_uuid(row.try_get("seller_id")?),
                    OrderStatus::restore(row.try_get("status")?),
                    row.try_get::<DateTime<Utc>, _>("date")?,
                    own_lines,
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| corrupt("orders", e))
    }
}

/// WHERE clause and bound party id for an order scope. The party is always
/// bound as `$3` so the statement shape does not depend on the scope.
fn scope_filter(scope: OrderScope) -> (&'static str, Option<Uuid>) {
    match scope {
        OrderScope::All => ("WHERE $3::uuid IS NULL", None),
        OrderScope::Buyer(id) => ("WHERE buyer_id = $3", Some(*id.as_uuid())),
        OrderScope::Seller(id) => ("WHERE seller_id = $3", Some(*id.as_uuid())),
    }
}

fn offset(slice: Slice) -> i64 {
    i64::try_from(slice.offset).unwrap_or(i64::MAX)
}

async fn count_rows(pool: &PgPool, sql: &str, operation: &'static str) -> Result<u64, StoreError> {
    let total: i64 = sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(total.max(0) as u64)
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let read = || -> Result<Product, sqlx::Error> {
        Ok(Product::restore(
            ProductId::from_uuid(row.try_get("id")?),
            SellerId::from_uuid(row.try_get("seller_id")?),
            row.try_get("title")?,
            row.try_get("description")?,
            row.try_get("stock")?,
            row.try_get("average_price")?,
        ))
    };
    read().map_err(|e| corrupt("products", e))
}

fn variant_from_row(row: &PgRow) -> Result<Variant, StoreError> {
    let invalid = |message: String| StoreError::Corrupt {
        table: "variants",
        message,
    };

    let color = row
        .try_get::<Option<Vec<String>>, _>("color")
        .map_err(|e| corrupt("variants", e))?
        .map(|colors| {
            colors
                .iter()
                .map(|c| Color::parse(c))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;
    let size = row
        .try_get::<Option<String>, _>("size")
        .map_err(|e| corrupt("variants", e))?
        .map(|s| Size::parse(&s))
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;

    let read = || -> Result<Variant, sqlx::Error> {
        Ok(Variant::restore(
            VariantId::from_uuid(row.try_get("id")?),
            ProductId::from_uuid(row.try_get("product_id")?),
            row.try_get("name")?,
            row.try_get("company")?,
            row.try_get("stock")?,
            row.try_get("value")?,
            row.try_get("original_value")?,
            VariantAttributes {
                color,
                design: row.try_get("design")?,
                size,
                capacity: row.try_get("capacity")?,
                weight: row.try_get("weight")?,
            },
            row.try_get("image")?,
        ))
    };
    read().map_err(|e| corrupt("variants", e))
}

fn line_from_row(row: &PgRow) -> Result<(Uuid, OrderLine), sqlx::Error> {
    let line_no: i32 = row.try_get("line_no")?;
    Ok((
        row.try_get("order_id")?,
        OrderLine {
            line_no: line_no.max(0) as u32,
            variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
        },
    ))
}

fn corrupt(table: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::Corrupt {
        table,
        message: err.to_string(),
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Database {
            operation,
            message: match db_err.code() {
                Some(code) => format!("{} (code {})", db_err.message(), code),
                None => db_err.message().to_string(),
            },
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => StoreError::Corrupt {
            table: operation,
            message: err.to_string(),
        },
        sqlx::Error::PoolClosed => StoreError::Database {
            operation,
            message: "connection pool closed".to_string(),
        },
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
