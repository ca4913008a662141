//! metrics-runner: headless refresh runner for the retail metrics engine.
//!
//! Usage:
//!   metrics-runner --seed 12345 --customers 500
//!   metrics-runner --db facts.db --config data/classification.json --export out.json
//!
//! With an empty (or in-memory) database the runner seeds synthetic facts
//! from `--seed` first. An existing database with orders is used as is.

use anyhow::Result;
use retail_metrics::{
    abc_classifier::{class_summary, AbcRecord},
    churn_scorer::ChurnPriorityRecord,
    clv_classifier::{status_summary, tier_summary, CustomerValueRecord},
    cohort_engine::{retention_matrix, CohortRetention},
    config::ClassificationConfig,
    engine::MetricsEngine,
    fixtures::FactGenerator,
    rfm_engine::{segment_summary, RfmRecord},
    snapshot::Snapshot,
    store::FactStore,
};
use serde::Serialize;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 200usize);
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let config_path = str_arg(&args, "--config").unwrap_or("./data/classification.json");
    let export = str_arg(&args, "--export");

    println!("Retail metrics — metrics-runner");
    println!("  seed:       {seed}");
    println!("  customers:  {customers}");
    println!("  db:         {db}");
    println!("  config:     {config_path}");
    println!();

    let config = ClassificationConfig::load(config_path)?;

    let store = if db == ":memory:" { FactStore::in_memory()? } else { FactStore::open(db)? };
    store.migrate()?;
    if store.order_count()? == 0 {
        let counts = FactGenerator::new(seed).with_customers(customers).populate(&store)?;
        println!(
            "Seeded {} customers, {} products, {} stores, {} orders",
            counts.customers, counts.products, counts.stores, counts.orders
        );
        println!();
    }

    let engine = MetricsEngine::new(store, config);
    let mut failures = 0;
    for (kind, result) in engine.refresh_all() {
        match result {
            Ok(outcome) => log::debug!("{}: {outcome:?}", kind.name()),
            Err(e) => {
                failures += 1;
                eprintln!("  {} refresh failed: {e}", kind.name());
            }
        }
    }

    print_summary(&engine);

    if let Some(path) = export {
        export_snapshots(&engine, path)?;
        println!();
        println!("Exported published snapshots to {path}");
    }

    if failures > 0 {
        anyhow::bail!("{failures} classifier pass(es) failed");
    }
    Ok(())
}

fn print_summary(engine: &MetricsEngine) {
    let clv = engine.clv();
    println!("=== CUSTOMER VALUE ===");
    if let Some(reference_date) = clv.reference_date {
        println!("  reference date: {reference_date}");
    }
    for row in tier_summary(&clv.records) {
        println!(
            "  {:<9} {:>5} customers | revenue ${:>12.2} | avg ${:>10.2} | AOV ${:>8.2}",
            row.tier.label(), row.customers, row.total_revenue, row.avg_revenue, row.avg_order_value
        );
    }
    for (status, count) in status_summary(&clv.records) {
        println!("  {:<16} {count:>5}", status.label());
    }

    println!();
    println!("=== RFM SEGMENTS ===");
    for row in segment_summary(&engine.rfm().records) {
        println!(
            "  {:<22} {:>5} | R {:>6.1}d | F {:>5.1} | M ${:>10.2}",
            row.segment.label(), row.customers, row.avg_recency_days, row.avg_frequency, row.avg_monetary
        );
    }

    println!();
    println!("=== COHORT RETENTION (offsets 0-3) ===");
    for row in retention_matrix(&engine.cohorts().records) {
        let rates: Vec<String> = row.rates.iter().take(4).map(|r| format!("{r:.2}")).collect();
        println!("  {} (n={:>3})  {}", row.cohort.key(), row.cohort.cohort_size, rates.join("  "));
    }

    for (title, snapshot) in [("PRODUCT ABC", engine.product_abc()), ("STORE ABC", engine.store_abc())] {
        println!();
        println!("=== {title} ===");
        for row in class_summary(&snapshot.records) {
            println!(
                "  {}  {:>4} entities | ${:>12.2} | {:>5.1}%",
                row.class.label(), row.entities, row.revenue, row.revenue_share * 100.0
            );
        }
    }

    println!();
    println!("=== CHURN PRIORITY (top 10) ===");
    let churn = engine.churn_priority();
    if churn.is_empty() {
        println!("  (No customers past the at-risk floor)");
    }
    for row in churn.iter().take(10) {
        println!(
            "  {} {:<16} {:<8} {:>4}d score {:>2} | {}",
            row.customer_id, row.name, row.clv_tier.label(), row.recency_days,
            row.priority_score, row.recommended_action
        );
    }
}

#[derive(Serialize)]
struct Export<'a> {
    clv:            &'a Snapshot<CustomerValueRecord>,
    rfm:            &'a Snapshot<RfmRecord>,
    cohorts:        &'a Snapshot<CohortRetention>,
    product_abc:    &'a Snapshot<AbcRecord>,
    store_abc:      &'a Snapshot<AbcRecord>,
    churn_priority: &'a Snapshot<ChurnPriorityRecord>,
}

fn export_snapshots(engine: &MetricsEngine, path: &str) -> Result<()> {
    let (clv, rfm, cohorts) = (engine.clv(), engine.rfm(), engine.cohorts());
    let (product_abc, store_abc, churn) = (engine.product_abc(), engine.store_abc(), engine.churn_priority());
    let export = Export {
        clv:            &clv,
        rfm:            &rfm,
        cohorts:        &cohorts,
        product_abc:    &product_abc,
        store_abc:      &store_abc,
        churn_priority: &churn,
    };
    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json).map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
