use super::FactStore;
use crate::{
    error::MetricsResult,
    facts::{
        CustomerFact, LoyaltyFact, OrderFact, OrderItemFact, ProductFact, ReviewFact,
        ShipmentFact, StoreFact,
    },
};
use rusqlite::params;

impl FactStore {
    // ── Identity tables ────────────────────────────────────────

    pub fn insert_customer(&self, c: &CustomerFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO customer (customer_id, name, email, city, birth_date, join_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![c.customer_id, c.name, c.email, c.city, c.birth_date, c.join_date],
        )?;
        Ok(())
    }

    pub fn insert_store(&self, s: &StoreFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO store (store_id, name, city) VALUES (?1, ?2, ?3)",
            params![s.store_id, s.name, s.city],
        )?;
        Ok(())
    }

    pub fn insert_product(&self, p: &ProductFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO product (product_id, name, category, list_price)
             VALUES (?1, ?2, ?3, ?4)",
            params![p.product_id, p.name, p.category, p.list_price],
        )?;
        Ok(())
    }

    // ── Activity facts ─────────────────────────────────────────

    pub fn insert_order(&self, o: &OrderFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO orders (
                order_id, customer_id, store_id, order_date, status,
                total_amount, discount_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                o.order_id,
                o.customer_id,
                o.store_id,
                o.order_date,
                o.status.as_str(),
                o.total_amount,
                o.discount_amount,
            ],
        )?;
        Ok(())
    }

    pub fn insert_order_item(&self, i: &OrderItemFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO order_item (
                order_item_id, order_id, product_id, quantity, unit_price, discount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![i.order_item_id, i.order_id, i.product_id, i.quantity, i.unit_price, i.discount],
        )?;
        Ok(())
    }

    pub fn insert_review(&self, r: &ReviewFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO review (review_id, customer_id, product_id, rating, review_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![r.review_id, r.customer_id, r.product_id, r.rating, r.review_date],
        )?;
        Ok(())
    }

    pub fn insert_loyalty_entry(&self, l: &LoyaltyFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO loyalty_point (entry_id, customer_id, points, kind, created_on)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![l.entry_id, l.customer_id, l.points, l.kind.as_str(), l.created_on],
        )?;
        Ok(())
    }

    pub fn insert_shipment(&self, s: &ShipmentFact) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO shipment (shipment_id, order_id, shipped_date, delivered_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.shipment_id, s.order_id, s.shipped_date, s.delivered_date, s.status],
        )?;
        Ok(())
    }

    /// Wrap a bulk load in one transaction. Loaders call this; it is much
    /// faster than autocommit per row.
    pub fn bulk_load<F>(&self, load: F) -> MetricsResult<()>
    where
        F: FnOnce(&Self) -> MetricsResult<()>,
    {
        let tx = self.conn.unchecked_transaction()?;
        load(self)?;
        tx.commit()?;
        Ok(())
    }

    pub fn order_count(&self) -> MetricsResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
