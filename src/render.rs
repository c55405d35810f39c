//! Table rendering for the command-line output. Rounding happens here and
//! nowhere else.

use analytics::series::SeriesField;
use analytics::MarketSnapshot;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table};
use core_types::{DerivedMetric, GroupAverage, GroupTotals, PeriodBucket};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

const NOT_AVAILABLE: &str = "N/A";

fn new_table(header: Vec<String>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}

fn fmt(value: Decimal, decimals: u32) -> String {
    value.round_dp(decimals).to_string()
}

fn fmt_opt(value: Option<Decimal>, decimals: u32) -> String {
    value
        .map(|v| fmt(v, decimals))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// One line per derived record; computed columns are the union across rows.
pub fn metric_table(rows: &[DerivedMetric], decimals: u32) -> Table {
    let computed: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.computed_fields.keys().map(String::as_str))
        .collect();

    let mut header: Vec<String> = ["Subject", "Location", "Date"]
        .into_iter()
        .map(String::from)
        .collect();
    header.extend(computed.iter().map(|name| name.to_string()));
    header.push("Classification".to_string());
    let mut table = new_table(header);

    for row in rows {
        let key = &row.key;
        let mut cells = vec![
            Cell::new(
                key.subject_name
                    .as_deref()
                    .or(key.subject_id.as_deref())
                    .unwrap_or("-"),
            ),
            Cell::new(key.location.as_deref().unwrap_or("-")),
            Cell::new(key.date.as_deref().or(key.season.as_deref()).unwrap_or("-")),
        ];
        cells.extend(
            computed
                .iter()
                .map(|name| Cell::new(fmt_opt(row.computed(name), decimals))),
        );
        cells.push(Cell::new(
            row.classification
                .map(|c| c.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ));
        table.add_row(cells);
    }
    table
}

pub fn bucket_table(buckets: &[PeriodBucket], fields: &[SeriesField], decimals: u32) -> Table {
    let mut header = vec!["Period".to_string(), "Records".to_string()];
    header.extend(fields.iter().map(|f| f.name.clone()));
    let mut table = new_table(header);

    for bucket in buckets {
        let mut cells = vec![
            Cell::new(&bucket.period_label),
            Cell::new(bucket.count),
        ];
        cells.extend(
            fields
                .iter()
                .map(|f| Cell::new(fmt_opt(bucket.value(&f.name), decimals))),
        );
        table.add_row(cells);
    }
    table
}

pub fn group_totals_table(totals: &[GroupTotals], sums: &[&str], decimals: u32) -> Table {
    let mut header = vec!["Group".to_string(), "Records".to_string()];
    header.extend(sums.iter().map(|s| s.to_string()));
    header.push("net_surplus_deficit".to_string());
    header.push("yield_per_area".to_string());
    let mut table = new_table(header);

    for group in totals {
        let mut cells = vec![Cell::new(&group.group), Cell::new(group.count)];
        cells.extend(
            sums.iter()
                .map(|s| Cell::new(fmt_opt(group.total(s), decimals))),
        );
        cells.push(Cell::new(fmt(group.net_surplus_deficit, decimals)));
        cells.push(Cell::new(fmt(group.yield_per_area, decimals)));
        table.add_row(cells);
    }
    table
}

pub fn group_average_table(averages: &[GroupAverage], field: &str, decimals: u32) -> Table {
    let mut table = new_table(vec![
        "Group".to_string(),
        "Records".to_string(),
        format!("average {field}"),
    ]);
    for avg in averages {
        table.add_row(vec![
            Cell::new(&avg.group),
            Cell::new(avg.count),
            Cell::new(fmt(avg.average, decimals)),
        ]);
    }
    table
}

pub fn snapshot_table(snapshot: &MarketSnapshot, decimals: u32) -> Table {
    let mut table = new_table(vec!["Metric".to_string(), "Value".to_string()]);
    let rows = [
        ("Total production", fmt(snapshot.total_production, decimals)),
        ("Total area", fmt(snapshot.total_area, decimals)),
        ("Yield per area", fmt(snapshot.overall_yield_per_area, decimals)),
        ("Net surplus/deficit", fmt(snapshot.net_surplus_deficit, decimals)),
        (
            "Average retail margin %",
            fmt_opt(snapshot.average_retail_margin_pct, decimals),
        ),
        ("Surplus markets", snapshot.surplus_count.to_string()),
        ("Deficit markets", snapshot.deficit_count.to_string()),
        ("Balanced markets", snapshot.balanced_count.to_string()),
        (
            "Total supply/demand gap",
            fmt(snapshot.total_supply_demand_gap, decimals),
        ),
        (
            "Average compliance %",
            fmt_opt(snapshot.average_compliance_pct, decimals),
        ),
        ("Deficient intake rows", snapshot.deficient_count.to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }
    for (family, count) in &snapshot.record_counts {
        table.add_row(vec![format!("Records: {family}"), count.to_string()]);
    }
    table
}
