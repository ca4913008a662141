pub mod abc_classifier;
pub mod aggregator;
pub mod churn_scorer;
pub mod classifier;
pub mod clv_classifier;
pub mod cohort_engine;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod facts;
pub mod fixtures;
pub mod rfm_engine;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod types;
