use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use common::{ListingId, Money, NotificationId, OfferId, OrderId, UserId};
use domain::{
    CartEntry, Listing, ListingStatus, Notification, NotificationKind, NotificationPreferences,
    Offer, OfferStatus, Order, OrderItem, OrderStatus,
};

use crate::{
    LedgerError, Result,
    store::{Ledger, LedgerTx},
};

/// PostgreSQL-backed ledger store implementation.
///
/// Constraint enforcement maps one-to-one onto schema objects: open-offer
/// exclusivity is a partial unique index, payment-reference idempotency a
/// unique index, and the listing reservation a conditional `UPDATE` whose
/// row count the caller checks.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

const OPEN_OFFER_INDEX: &str = "idx_offers_one_open_per_buyer_listing";
const PAYMENT_REFERENCE_INDEX: &str = "idx_orders_payment_reference";

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("Running ledger migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_listing(row: &PgRow) -> Result<Listing> {
        let status_str: String = row.try_get("status")?;
        let status = ListingStatus::parse(&status_str).ok_or_else(|| LedgerError::InvalidRow {
            entity: "listing",
            detail: format!("unknown status {status_str}"),
        })?;
        let discount: Option<i16> = row.try_get("discount_percent")?;

        Ok(Listing {
            id: ListingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            discount_percent: discount.map(|d| d as u8),
            status,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_offer(row: &PgRow) -> Result<Offer> {
        let status_str: String = row.try_get("status")?;
        let status = OfferStatus::parse(&status_str).ok_or_else(|| LedgerError::InvalidRow {
            entity: "offer",
            detail: format!("unknown status {status_str}"),
        })?;

        Ok(Offer {
            id: OfferId::from_uuid(row.try_get::<Uuid, _>("id")?),
            listing_id: ListingId::from_uuid(row.try_get::<Uuid, _>("listing_id")?),
            buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            counter_amount: row
                .try_get::<Option<i64>, _>("counter_amount_cents")?
                .map(Money::from_cents),
            accepted_price: row
                .try_get::<Option<i64>, _>("accepted_price_cents")?
                .map(Money::from_cents),
            status,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str).ok_or_else(|| LedgerError::InvalidRow {
            entity: "order",
            detail: format!("unknown status {status_str}"),
        })?;
        let shipping_json: serde_json::Value = row.try_get("shipping")?;
        let shipping = serde_json::from_value(shipping_json)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            commission: Money::from_cents(row.try_get("commission_cents")?),
            commission_pct: row.try_get::<i16, _>("commission_pct")? as u8,
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            shipping,
            payment_reference: row.try_get("payment_reference")?,
            items,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_notification(row: &PgRow) -> Result<Notification> {
        let kind_str: String = row.try_get("kind")?;
        let kind = NotificationKind::parse(&kind_str).ok_or_else(|| LedgerError::InvalidRow {
            entity: "notification",
            detail: format!("unknown kind {kind_str}"),
        })?;

        Ok(Notification {
            id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            kind,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            metadata: row.try_get("metadata")?,
            read: row.try_get("read")?,
            send_email: row.try_get("send_email")?,
            send_push: row.try_get("send_push")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT listing_id, price_cents FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    listing_id: ListingId::from_uuid(row.try_get::<Uuid, _>("listing_id")?),
                    price: Money::from_cents(row.try_get("price_cents")?),
                })
            })
            .collect()
    }
}

fn uuids(ids: &[ListingId]) -> Vec<Uuid> {
    ids.iter().map(|id| id.as_uuid()).collect()
}

fn is_unique_violation(err: &sqlx::Error, index: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(index)
    )
}

#[async_trait]
impl Ledger for PostgresLedger {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }

    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listings (id, seller_id, title, price_cents, discount_percent, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(listing.id.as_uuid())
        .bind(listing.seller_id.as_uuid())
        .bind(&listing.title)
        .bind(listing.price.cents())
        .bind(listing.discount_percent.map(|d| d as i16))
        .bind(listing.status.as_str())
        .bind(listing.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn listing(&self, id: ListingId) -> Result<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_listing).transpose()
    }

    async fn listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>> {
        let rows = sqlx::query("SELECT * FROM listings WHERE id = ANY($1)")
            .bind(uuids(ids))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_listing).collect()
    }

    async fn listings_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>> {
        let rows =
            sqlx::query("SELECT * FROM listings WHERE seller_id = $1 ORDER BY created_at DESC")
                .bind(seller_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_listing).collect()
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offers
                (id, listing_id, buyer_id, seller_id, amount_cents,
                 counter_amount_cents, accepted_price_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(offer.id.as_uuid())
        .bind(offer.listing_id.as_uuid())
        .bind(offer.buyer_id.as_uuid())
        .bind(offer.seller_id.as_uuid())
        .bind(offer.amount.cents())
        .bind(offer.counter_amount.map(|m| m.cents()))
        .bind(offer.accepted_price.map(|m| m.cents()))
        .bind(offer.status.as_str())
        .bind(offer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, OPEN_OFFER_INDEX) {
                LedgerError::OpenOfferExists {
                    buyer_id: offer.buyer_id,
                    listing_id: offer.listing_id,
                }
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn offer(&self, id: OfferId) -> Result<Option<Offer>> {
        let row = sqlx::query("SELECT * FROM offers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_offer).transpose()
    }

    async fn update_offer(&self, offer: &Offer, expected: OfferStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE offers
            SET status = $1, counter_amount_cents = $2, accepted_price_cents = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(offer.status.as_str())
        .bind(offer.counter_amount.map(|m| m.cents()))
        .bind(offer.accepted_price.map(|m| m.cents()))
        .bind(offer.id.as_uuid())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::StaleStatus {
                offer_id: offer.id,
                expected,
            });
        }
        Ok(())
    }

    async fn offers_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Offer>> {
        let rows = sqlx::query("SELECT * FROM offers WHERE buyer_id = $1 ORDER BY created_at DESC")
            .bind(buyer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_offer).collect()
    }

    async fn offers_by_seller(&self, seller_id: UserId) -> Result<Vec<Offer>> {
        let rows =
            sqlx::query("SELECT * FROM offers WHERE seller_id = $1 ORDER BY created_at DESC")
                .bind(seller_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_offer).collect()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let items = self.items_for_order(id).await?;
                Ok(Some(Self::row_to_order(&row, items)?))
            }
            None => Ok(None),
        }
    }

    async fn orders_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC")
            .bind(buyer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = self.items_for_order(id).await?;
            orders.push(Self::row_to_order(row, items)?);
        }
        Ok(orders)
    }

    async fn order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE payment_reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                let items = self.items_for_order(id).await?;
                Ok(Some(Self::row_to_order(&row, items)?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_cart_entry(&self, entry: &CartEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, listing_id, added_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, listing_id) DO NOTHING
            "#,
        )
        .bind(entry.user_id.as_uuid())
        .bind(entry.listing_id.as_uuid())
        .bind(entry.added_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let rows = sqlx::query("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY added_at")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(CartEntry {
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                    listing_id: ListingId::from_uuid(row.try_get::<Uuid, _>("listing_id")?),
                    added_at: row.try_get("added_at")?,
                })
            })
            .collect()
    }

    async fn remove_cart_entry(&self, user_id: UserId, listing_id: ListingId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND listing_id = $2")
                .bind(user_id.as_uuid())
                .bind(listing_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, kind, title, message, metadata, read, send_email, send_push, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.metadata)
        .bind(notification.read)
        .bind(notification.send_email)
        .bind(notification.send_push)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows =
            sqlx::query("SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::row_to_notification).collect()
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id.as_uuid())
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn preferences(&self, user_id: UserId) -> Result<Option<NotificationPreferences>> {
        let row = sqlx::query("SELECT * FROM notification_preferences WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(NotificationPreferences {
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                email_purchases: row.try_get("email_purchases")?,
                email_sales: row.try_get("email_sales")?,
                email_offers: row.try_get("email_offers")?,
            })
        })
        .transpose()
    }

    async fn upsert_preferences(&self, prefs: &NotificationPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_preferences (user_id, email_purchases, email_sales, email_offers)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET email_purchases = EXCLUDED.email_purchases,
                email_sales = EXCLUDED.email_sales,
                email_offers = EXCLUDED.email_offers
            "#,
        )
        .bind(prefs.user_id.as_uuid())
        .bind(prefs.email_purchases)
        .bind(prefs.email_sales)
        .bind(prefs.email_offers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// An open transaction against a [`PostgresLedger`].
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn listings_for_update(&mut self, ids: &[ListingId]) -> Result<Vec<Listing>> {
        let rows = sqlx::query("SELECT * FROM listings WHERE id = ANY($1) FOR UPDATE")
            .bind(uuids(ids))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(PostgresLedger::row_to_listing).collect()
    }

    async fn reserve_listings(&mut self, ids: &[ListingId]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE listings SET status = 'sold' WHERE id = ANY($1) AND status = 'available'",
        )
        .bind(uuids(ids))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let shipping = serde_json::to_value(&order.shipping)?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, buyer_id, seller_id, subtotal_cents, commission_cents, commission_pct,
                 total_cents, status, shipping, payment_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.subtotal.cents())
        .bind(order.commission.cents())
        .bind(order.commission_pct as i16)
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(shipping)
        .bind(order.payment_reference.as_deref())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, PAYMENT_REFERENCE_INDEX) {
                LedgerError::DuplicatePaymentReference(
                    order.payment_reference.clone().unwrap_or_default(),
                )
            } else {
                e.into()
            }
        })?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, listing_id, price_cents, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(item.listing_id.as_uuid())
            .bind(item.price.cents())
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn delete_cart_entries(&mut self, listing_ids: &[ListingId]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE listing_id = ANY($1)")
            .bind(uuids(listing_ids))
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn expire_open_offers(&mut self, listing_ids: &[ListingId]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE offers
            SET status = 'EXPIRED', accepted_price_cents = NULL
            WHERE listing_id = ANY($1)
              AND status IN ('PENDING', 'COUNTERED', 'ACCEPTED')
            "#,
        )
        .bind(uuids(listing_ids))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
