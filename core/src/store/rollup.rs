use super::FactStore;
use crate::{
    aggregator::{CustomerActivity, CustomerRollup, FactSource, ProductRollup, StoreRollup},
    error::MetricsResult,
    facts::OrderStatus,
};
use chrono::NaiveDate;

/// SQL list literal of qualifying order statuses, e.g. `('delivered', 'completed')`.
fn qualifying_sql() -> String {
    let quoted: Vec<String> = OrderStatus::ALL
        .iter()
        .filter(|s| s.is_qualifying())
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    format!("({})", quoted.join(", "))
}

impl FactSource for FactStore {
    fn reference_date(&self) -> MetricsResult<NaiveDate> {
        let date: Option<NaiveDate> = self.conn.query_row(
            "SELECT COALESCE(
                 (SELECT MAX(order_date) FROM orders),
                 (SELECT MAX(join_date) FROM customer)
             )",
            [],
            |row| row.get(0),
        )?;
        // Empty store: fall back to the epoch so the pass still has a clock.
        Ok(date.unwrap_or_default())
    }

    fn customer_rollups(&self) -> MetricsResult<Vec<CustomerRollup>> {
        let q = qualifying_sql();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT c.customer_id, c.name, c.email, c.city, c.birth_date, c.join_date,
                    COALESCE(o.order_count, 0),
                    COALESCE(i.item_count, 0),
                    COALESCE(r.review_count, 0),
                    COALESCE(o.revenue, 0.0),
                    COALESCE(o.discounts, 0.0),
                    COALESCE(l.points, 0),
                    o.first_order, o.last_order
             FROM customer c
             LEFT JOIN (
                 SELECT customer_id,
                        COUNT(*)             AS order_count,
                        SUM(total_amount)    AS revenue,
                        SUM(discount_amount) AS discounts,
                        MIN(order_date)      AS first_order,
                        MAX(order_date)      AS last_order
                 FROM orders
                 WHERE status IN {q}
                 GROUP BY customer_id
             ) o ON o.customer_id = c.customer_id
             LEFT JOIN (
                 SELECT o.customer_id, SUM(oi.quantity) AS item_count
                 FROM order_item oi
                 JOIN orders o ON o.order_id = oi.order_id
                 WHERE o.status IN {q}
                 GROUP BY o.customer_id
             ) i ON i.customer_id = c.customer_id
             LEFT JOIN (
                 SELECT customer_id, COUNT(*) AS review_count
                 FROM review
                 GROUP BY customer_id
             ) r ON r.customer_id = c.customer_id
             LEFT JOIN (
                 SELECT customer_id,
                        SUM(CASE WHEN kind = 'earned' THEN points ELSE -points END) AS points
                 FROM loyalty_point
                 GROUP BY customer_id
             ) l ON l.customer_id = c.customer_id
             ORDER BY c.customer_id ASC"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CustomerRollup {
                    customer_id:      row.get(0)?,
                    name:             row.get(1)?,
                    email:            row.get(2)?,
                    city:             row.get(3)?,
                    birth_date:       row.get(4)?,
                    join_date:        row.get(5)?,
                    order_count:      row.get(6)?,
                    item_count:       row.get(7)?,
                    review_count:     row.get(8)?,
                    total_revenue:    row.get(9)?,
                    total_discounts:  row.get(10)?,
                    loyalty_points:   row.get(11)?,
                    first_order_date: row.get(12)?,
                    last_order_date:  row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn product_rollups(&self) -> MetricsResult<Vec<ProductRollup>> {
        let q = qualifying_sql();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT p.product_id, p.name, p.category, p.list_price,
                    COALESCE(s.units, 0),
                    COALESCE(s.order_count, 0),
                    COALESCE(s.gross, 0.0),
                    COALESCE(s.discounts, 0.0),
                    COALESCE(rv.review_count, 0),
                    rv.avg_rating,
                    s.first_sale, s.last_sale
             FROM product p
             LEFT JOIN (
                 SELECT oi.product_id,
                        SUM(oi.quantity)                 AS units,
                        COUNT(DISTINCT oi.order_id)      AS order_count,
                        SUM(oi.quantity * oi.unit_price) AS gross,
                        SUM(oi.discount)                 AS discounts,
                        MIN(o.order_date)                AS first_sale,
                        MAX(o.order_date)                AS last_sale
                 FROM order_item oi
                 JOIN orders o ON o.order_id = oi.order_id
                 WHERE o.status IN {q}
                 GROUP BY oi.product_id
             ) s ON s.product_id = p.product_id
             LEFT JOIN (
                 SELECT product_id, COUNT(*) AS review_count, AVG(rating) AS avg_rating
                 FROM review
                 GROUP BY product_id
             ) rv ON rv.product_id = p.product_id
             ORDER BY p.product_id ASC"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let gross_revenue: f64 = row.get(6)?;
                let total_discounts: f64 = row.get(7)?;
                Ok(ProductRollup {
                    product_id:      row.get(0)?,
                    name:            row.get(1)?,
                    category:        row.get(2)?,
                    list_price:      row.get(3)?,
                    units_sold:      row.get(4)?,
                    order_count:     row.get(5)?,
                    gross_revenue,
                    total_discounts,
                    net_revenue:     gross_revenue - total_discounts,
                    review_count:    row.get(8)?,
                    avg_rating:      row.get(9)?,
                    first_sale_date: row.get(10)?,
                    last_sale_date:  row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn store_rollups(&self) -> MetricsResult<Vec<StoreRollup>> {
        let q = qualifying_sql();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT st.store_id, st.name, st.city,
                    COALESCE(o.order_count, 0),
                    COALESCE(o.customer_count, 0),
                    COALESCE(o.revenue, 0.0),
                    COALESCE(o.discounts, 0.0),
                    d.avg_days,
                    o.first_order, o.last_order
             FROM store st
             LEFT JOIN (
                 SELECT store_id,
                        COUNT(*)                    AS order_count,
                        COUNT(DISTINCT customer_id) AS customer_count,
                        SUM(total_amount)           AS revenue,
                        SUM(discount_amount)        AS discounts,
                        MIN(order_date)             AS first_order,
                        MAX(order_date)             AS last_order
                 FROM orders
                 WHERE status IN {q}
                 GROUP BY store_id
             ) o ON o.store_id = st.store_id
             LEFT JOIN (
                 SELECT o.store_id,
                        AVG(julianday(sh.delivered_date) - julianday(o.order_date)) AS avg_days
                 FROM shipment sh
                 JOIN orders o ON o.order_id = sh.order_id
                 WHERE sh.delivered_date IS NOT NULL
                 GROUP BY o.store_id
             ) d ON d.store_id = st.store_id
             ORDER BY st.store_id ASC"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoreRollup {
                    store_id:          row.get(0)?,
                    name:              row.get(1)?,
                    city:              row.get(2)?,
                    order_count:       row.get(3)?,
                    customer_count:    row.get(4)?,
                    total_revenue:     row.get(5)?,
                    total_discounts:   row.get(6)?,
                    avg_delivery_days: row.get(7)?,
                    first_order_date:  row.get(8)?,
                    last_order_date:   row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn customer_activity(&self) -> MetricsResult<Vec<CustomerActivity>> {
        let q = qualifying_sql();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT customer_id, strftime('%Y-%m-01', order_date) AS month
             FROM orders
             WHERE status IN {q}
             ORDER BY customer_id ASC, month ASC"
        ))?;

        let pairs = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, NaiveDate>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Rows arrive grouped by customer; fold them into one entry each.
        let mut activity: Vec<CustomerActivity> = Vec::new();
        for (customer_id, month) in pairs {
            match activity.last_mut() {
                Some(last) if last.customer_id == customer_id => last.active_months.push(month),
                _ => activity.push(CustomerActivity {
                    customer_id,
                    active_months: vec![month],
                }),
            }
        }
        Ok(activity)
    }

    fn consistent_read<R, F>(&self, read: F) -> MetricsResult<R>
    where
        F: FnOnce(&Self) -> MetricsResult<R>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = read(self)?;
        tx.commit()?;
        Ok(result)
    }
}
