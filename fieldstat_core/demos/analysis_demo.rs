//! End-to-end demonstration of both cores.
//!
//! Run with: cargo run --example analysis_demo

use chrono::NaiveDate;
use fieldstat_core::anova::{run, Transform};
use fieldstat_core::render::{report, ReportOptions};
use fieldstat_core::{
    logging, AnalysisConfig, EntityFilter, Item, ItemCategory, ItemInstance, Office, Organisation,
    Region, Site, SupplyCatalog,
};
use fieldstat_shared::DataFrame;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::load_from_file("config/analysis.toml")
        .unwrap_or_else(|_| AnalysisConfig::default());

    // ---- Core A: a 3 x 2 within-subjects reaction-time analysis ----
    let table = reaction_time_table()?;
    let result = run(
        &table,
        "rt",
        &["angle", "noise"],
        &[],
        "sub",
        Some("ms"),
        config.transform,
        config.alpha,
    )?;
    println!(
        "{}",
        report(
            &result,
            &ReportOptions {
                decimals: config.decimals
            }
        )
    );
    if let Err(err) = logging::log_analysis(&result) {
        eprintln!("failed to log analysis: {}", err);
    }

    // ---- Core B: the unified supply view ----
    let catalog = sample_catalog();
    let filter = EntityFilter {
        country: Some("Philippines".to_string()),
        ..Default::default()
    };
    let rows = catalog.export(&filter, &config.date_format);
    println!("Supply entities in the Philippines:");
    for row in &rows {
        println!(
            "  {:<12} {:<20} {:<30} {}",
            row.instance_type.label(),
            row.item.as_deref().unwrap_or("-"),
            row.status,
            row.organisation.as_deref().unwrap_or("-"),
        );
    }
    if let Err(err) = logging::log_export(&filter, rows.len()) {
        eprintln!("failed to log export: {}", err);
    }
    Ok(())
}

fn reaction_time_table() -> Result<DataFrame, Box<dyn std::error::Error>> {
    let rows: [[f64; 6]; 10] = [
        [420.0, 480.0, 420.0, 600.0, 480.0, 780.0],
        [420.0, 360.0, 480.0, 480.0, 480.0, 600.0],
        [480.0, 660.0, 480.0, 780.0, 540.0, 780.0],
        [420.0, 480.0, 540.0, 780.0, 540.0, 900.0],
        [540.0, 480.0, 660.0, 660.0, 540.0, 720.0],
        [360.0, 360.0, 420.0, 480.0, 360.0, 540.0],
        [480.0, 540.0, 480.0, 720.0, 600.0, 840.0],
        [480.0, 540.0, 600.0, 720.0, 660.0, 900.0],
        [540.0, 480.0, 600.0, 720.0, 540.0, 780.0],
        [480.0, 540.0, 420.0, 660.0, 540.0, 780.0],
    ];
    let mut subs = Vec::new();
    let mut angle = Vec::new();
    let mut noise = Vec::new();
    let mut values = Vec::new();
    for (s, row) in rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            subs.push(format!("s{:02}", s + 1));
            angle.push(["a0", "a4", "a8"][c / 2].to_string());
            noise.push(["absent", "present"][c % 2].to_string());
            values.push(*v);
        }
    }
    let mut df = DataFrame::new();
    df.add_labels("sub", subs)?;
    df.add_labels("angle", angle)?;
    df.add_labels("noise", noise)?;
    df.add_numeric("rt", values)?;
    Ok(df)
}

fn sample_catalog() -> SupplyCatalog {
    let mut catalog = SupplyCatalog::new();
    let food = catalog.add_category(ItemCategory {
        name: "Food".to_string(),
    });
    let rice = catalog.add_item(Item {
        name: "Rice 25kg".to_string(),
        category: Some(food),
    });
    let country = catalog.add_region(Region {
        name: "Philippines".to_string(),
        level: 0,
        parent: None,
    });
    let org = catalog.add_organisation(Organisation {
        name: "World Food Programme".to_string(),
        acronym: Some("WFP".to_string()),
    });
    let office = catalog.add_office(Office {
        name: "Manila Office".to_string(),
        organisation: Some(org),
        region: Some(country),
        comments: Some("Warehouse manager on site daily".to_string()),
    });
    let site = catalog.add_site(Site {
        name: "Manila Warehouse".to_string(),
        office: Some(office),
    });
    catalog.add_instance(ItemInstance::Stock {
        item: rice,
        site,
        quantity: 800.0,
        expiry: NaiveDate::from_ymd_opt(2026, 12, 1),
    });
    catalog.add_instance(ItemInstance::Receiving {
        item: rice,
        site,
        quantity: 200.0,
        eta: NaiveDate::from_ymd_opt(2026, 10, 20),
    });
    catalog.add_instance(ItemInstance::Planned {
        item: rice,
        site,
        quantity: 500.0,
        eta: NaiveDate::from_ymd_opt(2027, 2, 5),
    });
    catalog
}
