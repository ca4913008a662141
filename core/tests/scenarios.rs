//! Worked examples with hand-checked answers, driven end to end through
//! the store, the aggregator and a published snapshot.

mod common;

use common::{date, FactBuilder};
use retail_metrics::{
    abc_classifier::AbcClass,
    classifier::ClassifierKind,
    clv_classifier::{ClvTier, CustomerStatus},
    facts::OrderStatus,
};

// ── Scenario A: customer value ───────────────────────────────────────────────

/// Three delivered orders totalling 50,000 over a 100-day lifespan, last
/// order 10 days before the reference date → Platinum and Active.
#[test]
fn platinum_active_customer() {
    common::init_logging();
    let mut facts = FactBuilder::new();
    facts.customer("C001", date(2023, 12, 1)).customer("C002", date(2023, 12, 1));
    facts.order("C001", date(2024, 1, 1), OrderStatus::Delivered, 20_000.0);
    facts.order("C001", date(2024, 2, 15), OrderStatus::Delivered, 15_000.0);
    facts.order("C001", date(2024, 4, 10), OrderStatus::Delivered, 15_000.0);
    // Sets the reference date 10 days after C001's last order.
    facts.order("C002", date(2024, 4, 20), OrderStatus::Delivered, 100.0);

    let engine = facts.engine();
    assert!(engine.refresh(ClassifierKind::Clv).unwrap().is_published());

    let clv = engine.clv();
    assert_eq!(clv.reference_date, Some(date(2024, 4, 20)));
    let c1 = clv.iter().find(|r| r.customer_id == "C001").expect("C001 present");
    assert_eq!(c1.total_revenue, 50_000.0);
    assert_eq!(c1.order_count, 3);
    assert_eq!(c1.lifespan_days, 100);
    assert_eq!(c1.recency_days, 10);
    assert_eq!(c1.clv_tier, ClvTier::Platinum);
    assert_eq!(c1.status, CustomerStatus::Active);
    assert!((c1.avg_order_value - 50_000.0 / 3.0).abs() < 1e-9);
    assert!((c1.projected_annual_value - 182_500.0).abs() < 1e-9);

    // Highest revenue first.
    assert_eq!(clv.records[0].customer_id, "C001");
}

// ── Scenario B: quintile sizes ───────────────────────────────────────────────

/// Frequencies [0,1,1,2,3,3,4,5,6,8]: the non-buyer drops out and the nine
/// buyers split into frequency bins of sizes {2,2,2,2,1}.
#[test]
fn frequency_quintiles_of_nine() {
    let frequencies = [0, 1, 1, 2, 3, 3, 4, 5, 6, 8];
    let mut facts = FactBuilder::new();
    let mut day = date(2024, 1, 1);
    for (i, &n) in frequencies.iter().enumerate() {
        let id = format!("C{:03}", i + 1);
        facts.customer(&id, date(2023, 6, 1));
        for _ in 0..n {
            facts.order(&id, day, OrderStatus::Completed, 50.0);
            day = day.succ_opt().unwrap();
        }
    }

    let engine = facts.engine();
    engine.refresh(ClassifierKind::Rfm).unwrap();
    let rfm = engine.rfm();

    assert_eq!(rfm.len(), 9, "the customer with no orders is not scored");
    assert!(rfm.iter().all(|r| r.customer_id != "C001"));

    let mut sizes = [0usize; 5];
    for r in rfm.iter() {
        sizes[(r.scores.f - 1) as usize] += 1;
    }
    assert_eq!(sizes, [2, 2, 2, 2, 1]);

    let top = rfm.iter().find(|r| r.customer_id == "C010").unwrap();
    assert_eq!(top.frequency, 8);
    assert_eq!(top.scores.f, 5);

    // Ties keep customer-id order: C005 and C006 both ordered 3 times and
    // straddle the 2/3 bin boundary.
    let c5 = rfm.iter().find(|r| r.customer_id == "C005").unwrap();
    let c6 = rfm.iter().find(|r| r.customer_id == "C006").unwrap();
    assert_eq!((c5.scores.f, c6.scores.f), (2, 3));
}

// ── Scenario C: cohort retention ─────────────────────────────────────────────

/// 100 first-time buyers in January 2024, 40 of whom return in February →
/// 0.40 retention at offset 1.
#[test]
fn forty_percent_return_next_month() {
    let mut facts = FactBuilder::new();
    for i in 0..100 {
        let id = format!("C{:03}", i + 1);
        facts.customer(&id, date(2023, 12, 15));
        facts.order(&id, date(2024, 1, 1 + (i % 28) as u32), OrderStatus::Delivered, 80.0);
        if i < 40 {
            facts.order(&id, date(2024, 2, 1 + (i % 28) as u32), OrderStatus::Delivered, 60.0);
        }
    }

    let engine = facts.engine();
    engine.refresh(ClassifierKind::Cohort).unwrap();
    let cohorts = engine.cohorts();

    assert_eq!(cohorts.len(), 2);
    let first = &cohorts.records[0];
    assert_eq!(first.cohort_month, date(2024, 1, 1));
    assert_eq!(first.month_offset, 0);
    assert_eq!(first.cohort_size, 100);
    assert_eq!(first.active_customers, 100);
    assert_eq!(first.retention_rate, 1.0);

    let second = &cohorts.records[1];
    assert_eq!(second.month_offset, 1);
    assert_eq!(second.active_customers, 40);
    assert_eq!(second.retention_rate, 0.40);
}

// ── Scenario D: Pareto classes ───────────────────────────────────────────────

/// Product revenues [500,300,120,50,30] with 80/95 cuts → [A,A,B,B,C].
#[test]
fn pareto_classes_for_five_products() {
    let revenues = [("P1", 500.0), ("P2", 300.0), ("P3", 120.0), ("P4", 50.0), ("P5", 30.0)];
    let mut facts = FactBuilder::new();
    facts.customer("C001", date(2024, 1, 1));
    // Insert in reverse so ranking cannot lean on insertion order.
    for (id, price) in revenues.iter().rev() {
        facts.product(id, *price);
    }
    let order = facts.order("C001", date(2024, 3, 1), OrderStatus::Delivered, 1_000.0);
    for (id, price) in revenues {
        facts.item(&order, id, 1, price, 0.0);
    }

    let engine = facts.engine();
    engine.refresh(ClassifierKind::ProductAbc).unwrap();
    let abc = engine.product_abc();

    let ids: Vec<&str> = abc.iter().map(|r| r.entity_id.as_str()).collect();
    assert_eq!(ids, ["P1", "P2", "P3", "P4", "P5"]);

    let classes: Vec<AbcClass> = abc.iter().map(|r| r.class).collect();
    assert_eq!(classes, [AbcClass::A, AbcClass::A, AbcClass::B, AbcClass::B, AbcClass::C]);

    let expected = [0.50, 0.80, 0.92, 0.97, 1.00];
    for (record, want) in abc.iter().zip(expected) {
        assert!(
            (record.cumulative_share - want).abs() < 1e-9,
            "{}: cumulative {} != {want}",
            record.entity_id,
            record.cumulative_share
        );
    }
    assert_eq!(abc.records[0].rank, 1);
    assert!((abc.records[0].revenue_share - 0.5).abs() < 1e-9);
}

/// Net product revenue subtracts line discounts before ranking.
#[test]
fn product_value_is_net_of_discounts() {
    let mut facts = FactBuilder::new();
    facts.customer("C001", date(2024, 1, 1));
    facts.product("P1", 100.0).product("P2", 90.0);
    let order = facts.order("C001", date(2024, 3, 1), OrderStatus::Delivered, 150.0);
    facts.item(&order, "P1", 1, 100.0, 40.0);
    facts.item(&order, "P2", 1, 90.0, 0.0);

    let engine = facts.engine();
    engine.refresh(ClassifierKind::ProductAbc).unwrap();
    let abc = engine.product_abc();
    assert_eq!(abc.records[0].entity_id, "P2");
    assert_eq!(abc.records[1].revenue, 60.0);
}

// ── Churn priority ───────────────────────────────────────────────────────────

#[test]
fn churn_priority_orders_by_score() {
    let mut facts = FactBuilder::new();
    for id in ["C001", "C002", "C003", "C004", "C005"] {
        facts.customer(id, date(2023, 1, 1));
    }
    let reference = date(2024, 6, 30);
    // Gold, 120 days quiet → 4 + 5.
    facts.order("C001", reference - chrono::Duration::days(120), OrderStatus::Delivered, 25_000.0);
    // Platinum, 70 days quiet → 5 + 3.
    facts.order("C002", reference - chrono::Duration::days(70), OrderStatus::Delivered, 45_000.0);
    // Basic, 200 days quiet → 1 + 5.
    facts.order("C003", reference - chrono::Duration::days(200), OrderStatus::Delivered, 300.0);
    // Active customer: below the floor, not scored.
    facts.order("C004", reference - chrono::Duration::days(30), OrderStatus::Delivered, 9_000.0);
    // C005 never purchased: not scored.
    facts.order("C004", reference, OrderStatus::Delivered, 10.0);

    let engine = facts.engine();
    engine.refresh(ClassifierKind::ChurnPriority).unwrap();
    let churn = engine.churn_priority();

    let ids: Vec<&str> = churn.iter().map(|r| r.customer_id.as_str()).collect();
    assert_eq!(ids, ["C001", "C002", "C003"]);
    assert_eq!(churn.records[0].priority_score, 9);
    assert_eq!(churn.records[0].recommended_action, "Executive outreach with an exclusive win-back offer");
    assert_eq!(churn.records[1].priority_score, 8);
    assert_eq!(churn.records[1].recommended_action, "Priority retention call from an account manager");
    assert_eq!(churn.records[2].priority_score, 6);
    assert_eq!(churn.records[2].recommended_action, "Automated win-back email sequence");
}

/// Store ABC ranks stores on qualifying order revenue only.
#[test]
fn store_abc_ignores_cancelled_orders() {
    let mut facts = FactBuilder::new();
    facts.location("S02").location("S03");
    facts.customer("C001", date(2024, 1, 1));
    facts.order_at("C001", "S01", date(2024, 2, 1), OrderStatus::Delivered, 900.0);
    facts.order_at("C001", "S02", date(2024, 2, 2), OrderStatus::Completed, 100.0);
    facts.order_at("C001", "S03", date(2024, 2, 3), OrderStatus::Cancelled, 5_000.0);

    let engine = facts.engine();
    engine.refresh(ClassifierKind::StoreAbc).unwrap();
    let abc = engine.store_abc();

    let ranked: Vec<(&str, AbcClass)> = abc.iter().map(|r| (r.entity_id.as_str(), r.class)).collect();
    assert_eq!(ranked, [("S01", AbcClass::A), ("S02", AbcClass::B), ("S03", AbcClass::C)]);
    assert_eq!(abc.records[2].revenue, 0.0);
}
