//! analytics-runner: headless driver for the billchain analytics engine.
//!
//! Usage:
//!   analytics-runner --train
//!   analytics-runner --db billing.db --train --rescore
//!   analytics-runner --db billing.db --customer 17
//!   analytics-runner --segments --config data/analytics.json

use anyhow::Result;
use billchain_analytics::{
    customer::{CustomerRecord, CustomerSource, SampleCustomers},
    prediction::RiskLevel,
    service::ModelStatus,
    store::{CustomerScores, CustomerStore},
    types::{CustomerId, ModelKind},
    AnalyticsConfig, AnalyticsService,
};
use chrono::Utc;
use std::env;
use std::path::Path;

#[derive(serde::Serialize)]
struct RunSummary {
    source:     String,
    customers:  usize,
    models:     ModelStatus,
    rescored:   usize,
    high_risk:  usize,
    avg_health: f64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = flag_value(&args, "--config").unwrap_or("data/analytics.json");
    let db = flag_value(&args, "--db");
    let customer_id = flag_value(&args, "--customer").and_then(|v| v.parse::<CustomerId>().ok());
    let train = args.iter().any(|a| a == "--train");
    let segments = args.iter().any(|a| a == "--segments");
    let rescore = args.iter().any(|a| a == "--rescore");

    let mut config = if Path::new(config_path).exists() {
        AnalyticsConfig::load(config_path)?
    } else {
        log::warn!("config {config_path} not found; using defaults");
        AnalyticsConfig::default()
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config = config.with_env_overrides();
    if let Some(dir) = flag_value(&args, "--models-dir") {
        config.models_dir = dir.into();
    }
    config.validate()?;

    println!("billchain analytics: analytics-runner");
    println!("  config:     {config_path}");
    println!("  models_dir: {}", config.models_dir.display());
    println!("  seed:       {}", config.seed);
    println!("  source:     {}", db.unwrap_or("<sample fixture>"));
    println!();

    let store = match db {
        Some(path) => {
            let store = CustomerStore::open(path)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };
    let fixture = SampleCustomers::generate(Utc::now());
    let source: &dyn CustomerSource = match &store {
        Some(s) => s as &dyn CustomerSource,
        None    => &fixture as &dyn CustomerSource,
    };

    let service = AnalyticsService::open(config)?;
    let customers = source.customers()?;
    log::info!("loaded {} customers", customers.len());

    if train {
        for kind in ModelKind::ALL {
            let outcome = service.train(kind, &customers);
            println!("=== TRAIN {} ===", kind.label());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    if let Some(id) = customer_id {
        match source.customer(id)? {
            Some(record) => {
                let insights = service.get_customer_insights(Some(id), &record);
                println!("=== CUSTOMER {id} ===");
                println!("{}", serde_json::to_string_pretty(&insights)?);
            }
            None => println!("customer {id} not found"),
        }
    }

    if segments {
        let report = service.analyze_customer_segments(&customers);
        println!("=== SEGMENTS ===");
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let rescored = match (&store, rescore) {
        (Some(store), true) => rescore_all(&service, store, &customers)?,
        (None, true) => {
            log::warn!("--rescore needs --db; nothing written");
            0
        }
        _ => 0,
    };

    print_summary(&service, source_label(db), &customers, rescored)
}

/// Score every customer and write the derived values back to the store.
fn rescore_all(service: &AnalyticsService, store: &CustomerStore, customers: &[CustomerRecord]) -> Result<usize> {
    let mut written = 0;
    for customer in customers {
        let Some(id) = customer.id else {
            continue;
        };
        let insights = service.get_customer_insights(Some(id), customer);
        store.record_scores(id, &CustomerScores::from_insights(&insights))?;
        written += 1;
    }
    log::info!("rescored {written} customers");
    Ok(written)
}

fn print_summary(service: &AnalyticsService, source: String, customers: &[CustomerRecord], rescored: usize) -> Result<()> {
    let high_risk = customers
        .iter()
        .filter_map(|c| service.predict_churn(c).into_success())
        .filter(|p| p.risk_level == RiskLevel::High)
        .count();
    let avg_health = if customers.is_empty() {
        0.0
    } else {
        customers
            .iter()
            .map(|c| service.calculate_health_score(c) as f64)
            .sum::<f64>()
            / customers.len() as f64
    };

    let summary = RunSummary {
        source,
        customers: customers.len(),
        models: service.model_status(),
        rescored,
        high_risk,
        avg_health,
    };
    println!("=== RUN SUMMARY ===");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn source_label(db: Option<&str>) -> String {
    db.map(str::to_string).unwrap_or_else(|| "sample".to_string())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
