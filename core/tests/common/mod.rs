//! Shared fact-building helpers for the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use retail_metrics::{
    config::ClassificationConfig,
    engine::MetricsEngine,
    facts::{CustomerFact, OrderFact, OrderItemFact, OrderStatus, ProductFact, StoreFact},
    fixtures::FactGenerator,
    store::FactStore,
};

pub const DEFAULT_STORE: &str = "S01";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Hand-built fact sets for scenario tests. Starts with one store, no
/// customers and no products.
pub struct FactBuilder {
    store:       FactStore,
    next_order:  usize,
    next_item:   usize,
}

impl FactBuilder {
    pub fn new() -> Self {
        let store = FactStore::in_memory_migrated().expect("in-memory store");
        store
            .insert_store(&StoreFact {
                store_id: DEFAULT_STORE.into(),
                name:     "Main Street".into(),
                city:     "Austin".into(),
            })
            .expect("insert store");
        Self { store, next_order: 0, next_item: 0 }
    }

    pub fn location(&mut self, store_id: &str) -> &mut Self {
        self.store
            .insert_store(&StoreFact {
                store_id: store_id.into(),
                name:     format!("Store {store_id}"),
                city:     "Denver".into(),
            })
            .expect("insert store");
        self
    }

    pub fn customer(&mut self, customer_id: &str, join_date: NaiveDate) -> &mut Self {
        self.store
            .insert_customer(&CustomerFact {
                customer_id: customer_id.into(),
                name:        format!("Customer {customer_id}"),
                email:       format!("{}@example.com", customer_id.to_lowercase()),
                city:        "Austin".into(),
                birth_date:  None,
                join_date,
            })
            .expect("insert customer");
        self
    }

    pub fn product(&mut self, product_id: &str, list_price: f64) -> &mut Self {
        self.store
            .insert_product(&ProductFact {
                product_id: product_id.into(),
                name:       format!("Product {product_id}"),
                category:   "Home".into(),
                list_price,
            })
            .expect("insert product");
        self
    }

    /// Order at the default store. Returns the generated order id.
    pub fn order(
        &mut self,
        customer_id: &str,
        order_date: NaiveDate,
        status: OrderStatus,
        total_amount: f64,
    ) -> String {
        self.order_at(customer_id, DEFAULT_STORE, order_date, status, total_amount)
    }

    pub fn order_at(
        &mut self,
        customer_id: &str,
        store_id: &str,
        order_date: NaiveDate,
        status: OrderStatus,
        total_amount: f64,
    ) -> String {
        self.next_order += 1;
        let order_id = format!("O{:06}", self.next_order);
        self.store
            .insert_order(&OrderFact {
                order_id:        order_id.clone(),
                customer_id:     customer_id.into(),
                store_id:        store_id.into(),
                order_date,
                status,
                total_amount,
                discount_amount: 0.0,
            })
            .expect("insert order");
        order_id
    }

    pub fn item(&mut self, order_id: &str, product_id: &str, quantity: i64, unit_price: f64, discount: f64) -> &mut Self {
        self.next_item += 1;
        self.store
            .insert_order_item(&OrderItemFact {
                order_item_id: format!("I{:06}", self.next_item),
                order_id:      order_id.into(),
                product_id:    product_id.into(),
                quantity,
                unit_price,
                discount,
            })
            .expect("insert order item");
        self
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn into_store(self) -> FactStore {
        self.store
    }

    pub fn engine(self) -> MetricsEngine {
        MetricsEngine::new(self.store, ClassificationConfig::default_test())
    }
}

/// Engine over a synthetic population.
pub fn generated_engine(seed: u64, customers: usize) -> MetricsEngine {
    let store = FactStore::in_memory_migrated().expect("in-memory store");
    FactGenerator::new(seed)
        .with_customers(customers)
        .populate(&store)
        .expect("populate facts");
    MetricsEngine::new(store, ClassificationConfig::default_test())
}
