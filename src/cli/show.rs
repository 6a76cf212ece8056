//! Renders the latest market snapshot as a terminal table.

use crate::core::config::AppConfig;
use crate::report::{MarketReport, SNAPSHOT_FILE, Snapshot};
use anyhow::{Context, Result};
use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use console::style;

pub fn run(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    let path = config.data_dir()?.join(SNAPSHOT_FILE);
    let contents = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "No snapshot at {} - run `mmdash update` first",
            path.display()
        )
    })?;
    let report: MarketReport = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;

    println!("{}", style(&report.insight).italic());
    println!("Generated at: {}\n", report.generated_at);

    display_items(&report.items);

    if !report.errors.is_empty() {
        println!("\n{}", style("Errors").bold().red());
        for error in &report.errors {
            println!("  {}", style(error).red());
        }
    }
    Ok(())
}

fn percent_cell(value: Option<f64>) -> Cell {
    match value {
        Some(v) if v >= 0.0 => Cell::new(format!("{v:+.2}%")).fg(Color::Green),
        Some(v) => Cell::new(format!("{v:+.2}%")).fg(Color::Red),
        None => Cell::new("N/A").fg(Color::DarkGrey),
    }
}

fn display_items(items: &[Snapshot]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header = ["Instrument", "Price", "DoD", "MoM", "YoY", "Points"]
        .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold));
    table.set_header(header.to_vec());

    for item in items {
        let price_cell = match item.price {
            Some(p) => Cell::new(format!("{p:.2}")),
            None => Cell::new("N/A").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&item.label),
            price_cell,
            percent_cell(item.dod),
            percent_cell(item.mom),
            percent_cell(item.yoy),
            Cell::new(item.raw_point_count.to_string()),
        ]);
    }

    println!("{table}");
}
