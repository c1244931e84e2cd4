// Colored terminal output for aggregated cluster tables.
//
// This module handles all terminal-specific formatting: colors, tables,
// count bars. The main.rs display code delegates here.

use colored::Colorize;

use crate::aggregate::ClusterRow;

/// Display an aggregated cluster table in the terminal.
///
/// One line per cluster: label, summed count, a bar proportional to the
/// cluster's share of all counts, and the member terms.
pub fn display_cluster_table(rows: &[ClusterRow]) {
    if rows.is_empty() {
        println!("No terms to aggregate — every input token was out of vocabulary.");
        return;
    }

    let total: u64 = rows.iter().map(|r| r.count).sum();

    println!(
        "\n{}",
        format!(
            "=== Semantic Clusters ({} clusters, {} term occurrences) ===",
            rows.len(),
            total
        )
        .bold()
    );
    println!();

    println!(
        "  {:>5}  {:>7}  {:<22} {}",
        "Label".dimmed(),
        "Count".dimmed(),
        "Share".dimmed(),
        "Terms".dimmed(),
    );
    println!("  {}", "-".repeat(72).dimmed());

    let bar_width: usize = 20;

    for row in rows {
        let share = if total > 0 {
            row.count as f64 / total as f64
        } else {
            0.0
        };
        let filled = (share * bar_width as f64).round() as usize;
        let empty = bar_width.saturating_sub(filled);
        let bar = format!("[{}{}]", "=".repeat(filled), " ".repeat(empty));

        let colored_bar = if share >= 0.25 {
            bar.bright_green()
        } else if share >= 0.10 {
            bar.bright_yellow()
        } else {
            bar.bright_blue()
        };

        println!(
            "  {:>5}  {:>7}  {} {}",
            row.label,
            row.count,
            colored_bar,
            row.terms.bold(),
        );
    }

    println!();
}
