//! Synthetic fact generator.
//!
//! Populates a fact store with a plausible retail history: a handful of
//! stores, a catalogue with skewed sales, and customers whose monthly
//! purchase propensity decays or stops, so every tier, status, segment and
//! cohort shape shows up. Output is a pure function of the seed and the
//! generator settings.

use crate::{
    error::MetricsResult,
    facts::{
        CustomerFact, LoyaltyFact, LoyaltyKind, OrderFact, OrderItemFact, OrderStatus,
        ProductFact, ReviewFact, ShipmentFact, StoreFact,
    },
    rng::{FactRng, FactStream},
    store::FactStore,
    types,
};
use chrono::{Duration, Months, NaiveDate};

const CITIES: [&str; 6] = ["Austin", "Boston", "Chicago", "Denver", "Miami", "Seattle"];
const CATEGORIES: [&str; 5] = ["Apparel", "Electronics", "Grocery", "Home", "Outdoors"];
const FIRST_NAMES: [&str; 8] = ["Alex", "Blair", "Casey", "Devon", "Emery", "Finley", "Harper", "Jordan"];
const LAST_NAMES: [&str; 8] = ["Ng", "Okafor", "Patel", "Quinn", "Rossi", "Silva", "Tanaka", "Weber"];

#[derive(Debug, Clone)]
pub struct FactGenerator {
    pub seed:      u64,
    pub customers: usize,
    pub products:  usize,
    pub stores:    usize,
    /// First day of the simulated history.
    pub start:     NaiveDate,
    /// Length of the history in months.
    pub months:    u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratedCounts {
    pub customers:   usize,
    pub products:    usize,
    pub stores:      usize,
    pub orders:      usize,
    pub order_items: usize,
    pub reviews:     usize,
    pub loyalty:     usize,
    pub shipments:   usize,
}

impl FactGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            customers: 200,
            products:  40,
            stores:    5,
            start:     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            months:    18,
        }
    }

    pub fn with_customers(mut self, customers: usize) -> Self {
        self.customers = customers;
        self
    }

    /// Last day of the simulated history.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(self.months))
            .map(|d| d - Duration::days(1))
            .unwrap_or(self.start)
    }

    /// Write the whole history into `store` in one transaction.
    pub fn populate(&self, store: &FactStore) -> MetricsResult<GeneratedCounts> {
        let mut counts = GeneratedCounts::default();
        store.bulk_load(|s| {
            let stores = self.write_stores(s)?;
            let products = self.write_products(s)?;
            counts.stores = stores.len();
            counts.products = products.len();
            self.write_customers_and_activity(s, &stores, &products, &mut counts)
        })?;
        log::info!(
            "fixtures: seed={} customers={} orders={} items={} reviews={}",
            self.seed, counts.customers, counts.orders, counts.order_items, counts.reviews,
        );
        Ok(counts)
    }

    fn write_stores(&self, store: &FactStore) -> MetricsResult<Vec<StoreFact>> {
        let mut rng = FactRng::new(self.seed, FactStream::Stores);
        let mut stores = Vec::with_capacity(self.stores);
        for i in 0..self.stores {
            let city = CITIES[rng.index(CITIES.len())];
            let fact = StoreFact {
                store_id: format!("S{:02}", i + 1),
                name:     format!("{city} #{}", i + 1),
                city:     city.to_string(),
            };
            store.insert_store(&fact)?;
            stores.push(fact);
        }
        Ok(stores)
    }

    fn write_products(&self, store: &FactStore) -> MetricsResult<Vec<ProductFact>> {
        let mut rng = FactRng::new(self.seed, FactStream::Products);
        let mut products = Vec::with_capacity(self.products);
        for i in 0..self.products {
            let category = CATEGORIES[rng.index(CATEGORIES.len())];
            let price = (rng.pareto(8.0, 1.6).min(900.0) * 100.0).round() / 100.0;
            let fact = ProductFact {
                product_id: format!("P{:03}", i + 1),
                name:       format!("{category} item {}", i + 1),
                category:   category.to_string(),
                list_price: price,
            };
            store.insert_product(&fact)?;
            products.push(fact);
        }
        Ok(products)
    }

    fn write_customers_and_activity(
        &self,
        store: &FactStore,
        stores: &[StoreFact],
        products: &[ProductFact],
        counts: &mut GeneratedCounts,
    ) -> MetricsResult<()> {
        let mut people = FactRng::new(self.seed, FactStream::Customers);
        let mut orders = FactRng::new(self.seed, FactStream::Orders);
        let mut reviews = FactRng::new(self.seed, FactStream::Reviews);
        let mut loyalty = FactRng::new(self.seed, FactStream::Loyalty);

        let end = self.end();
        let history_days = (end - self.start).num_days().max(1);

        for i in 0..self.customers {
            let customer_id = format!("C{:04}", i + 1);
            let join_date = self.start + Duration::days(people.range_i64(0, history_days - 1));
            let birth_date = people
                .chance(0.85)
                .then(|| {
                    NaiveDate::from_ymd_opt(
                        people.range_i64(1950, 2004) as i32,
                        people.range_i64(1, 12) as u32,
                        people.range_i64(1, 28) as u32,
                    )
                })
                .flatten();
            let first = FIRST_NAMES[people.index(FIRST_NAMES.len())];
            let last = LAST_NAMES[people.index(LAST_NAMES.len())];
            store.insert_customer(&CustomerFact {
                customer_id: customer_id.clone(),
                name:        format!("{first} {last}"),
                email:       format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), i + 1),
                city:        CITIES[people.index(CITIES.len())].to_string(),
                birth_date,
                join_date,
            })?;
            counts.customers += 1;

            // Monthly purchase propensity, and the month after which the
            // customer goes quiet for good (if ever).
            let propensity = people.range_f64(0.05, 0.7);
            let lapse_after = people.chance(0.4).then(|| people.range_i64(0, i64::from(self.months)));
            let home_store = &stores[people.index(stores.len())];
            let mut points_balance: i64 = 0;

            let mut month_start = types::month_start(join_date);
            let mut month_index: i64 = 0;
            while month_start <= end {
                if lapse_after.is_some_and(|m| month_index > m) {
                    break;
                }
                let next_month = month_start.checked_add_months(Months::new(1)).unwrap_or(end);
                if orders.chance(propensity) {
                    let window_start = month_start.max(join_date);
                    let window_end = (next_month - Duration::days(1)).min(end);
                    if window_start <= window_end {
                        let span = (window_end - window_start).num_days();
                        let order_date = window_start + Duration::days(orders.range_i64(0, span));
                        let order_store = if orders.chance(0.8) {
                            home_store
                        } else {
                            &stores[orders.index(stores.len())]
                        };
                        counts.orders += 1;
                        let order_id = format!("O{:06}", counts.orders);
                        let status = roll_status(&mut orders, order_date, end);

                        let mut total = 0.0;
                        let mut discount_total = 0.0;
                        let mut items = Vec::new();
                        for line in 0..orders.range_i64(1, 4) {
                            let product = &products[orders.skewed_index(products.len(), 2.5)];
                            let quantity = orders.range_i64(1, 3);
                            let gross = product.list_price * quantity as f64;
                            let discount = if orders.chance(0.15) {
                                (gross * 0.10 * 100.0).round() / 100.0
                            } else {
                                0.0
                            };
                            total += gross - discount;
                            discount_total += discount;
                            items.push(OrderItemFact {
                                order_item_id: format!("{order_id}-{}", line + 1),
                                order_id:      order_id.clone(),
                                product_id:    product.product_id.clone(),
                                quantity,
                                unit_price:    product.list_price,
                                discount,
                            });
                        }

                        store.insert_order(&OrderFact {
                            order_id:        order_id.clone(),
                            customer_id:     customer_id.clone(),
                            store_id:        order_store.store_id.clone(),
                            order_date,
                            status,
                            total_amount:    (total * 100.0).round() / 100.0,
                            discount_amount: (discount_total * 100.0).round() / 100.0,
                        })?;
                        for item in &items {
                            store.insert_order_item(item)?;
                        }
                        counts.order_items += items.len();

                        if let Some(shipment) = shipment_for(&order_id, order_date, status, &mut orders) {
                            store.insert_shipment(&shipment)?;
                            counts.shipments += 1;
                        }

                        if status.is_qualifying() {
                            if reviews.chance(0.3) {
                                counts.reviews += 1;
                                store.insert_review(&ReviewFact {
                                    review_id:   format!("R{:06}", counts.reviews),
                                    customer_id: customer_id.clone(),
                                    product_id:  items[0].product_id.clone(),
                                    rating:      (1 + reviews.skewed_index(5, 0.6)) as u8,
                                    review_date: (order_date + Duration::days(reviews.range_i64(3, 20))).min(end),
                                })?;
                            }

                            let earned = total.floor() as i64;
                            points_balance += earned;
                            counts.loyalty += 1;
                            store.insert_loyalty_entry(&LoyaltyFact {
                                entry_id:    format!("L{:06}", counts.loyalty),
                                customer_id: customer_id.clone(),
                                points:      earned,
                                kind:        LoyaltyKind::Earned,
                                created_on:  order_date,
                            })?;
                            if points_balance > 100 && loyalty.chance(0.1) {
                                let redeemed = loyalty.range_i64(1, points_balance / 2);
                                points_balance -= redeemed;
                                counts.loyalty += 1;
                                store.insert_loyalty_entry(&LoyaltyFact {
                                    entry_id:    format!("L{:06}", counts.loyalty),
                                    customer_id: customer_id.clone(),
                                    points:      redeemed,
                                    kind:        LoyaltyKind::Redeemed,
                                    created_on:  order_date,
                                })?;
                            }
                        }
                    }
                }
                month_start = next_month;
                month_index += 1;
                if next_month == end {
                    break;
                }
            }
        }
        Ok(())
    }
}

fn roll_status(rng: &mut FactRng, order_date: NaiveDate, end: NaiveDate) -> OrderStatus {
    // Orders in the last week have not all arrived yet.
    if (end - order_date).num_days() < 7 && rng.chance(0.5) {
        return if rng.chance(0.5) { OrderStatus::Pending } else { OrderStatus::Shipped };
    }
    let roll = rng.next_f64();
    if roll < 0.86 {
        OrderStatus::Delivered
    } else if roll < 0.91 {
        OrderStatus::Completed
    } else if roll < 0.96 {
        OrderStatus::Cancelled
    } else {
        OrderStatus::Returned
    }
}

fn shipment_for(
    order_id: &str,
    order_date: NaiveDate,
    status: OrderStatus,
    rng: &mut FactRng,
) -> Option<ShipmentFact> {
    let shipped = order_date + Duration::days(1);
    let (delivered, label) = match status {
        OrderStatus::Delivered | OrderStatus::Completed | OrderStatus::Returned => {
            (Some(shipped + Duration::days(rng.range_i64(1, 6))), "delivered")
        }
        OrderStatus::Shipped => (None, "in_transit"),
        OrderStatus::Pending | OrderStatus::Cancelled => return None,
    };
    Some(ShipmentFact {
        shipment_id:    format!("SH-{order_id}"),
        order_id:       order_id.to_string(),
        shipped_date:   Some(shipped),
        delivered_date: delivered,
        status:         label.to_string(),
    })
}
