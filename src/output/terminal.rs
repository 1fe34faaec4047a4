// Colored terminal output for ranked tokens and the run summary.
//
// This module handles all terminal-specific formatting: colors and tables.
// The main.rs command handlers delegate here.

use colored::Colorize;

use super::format_value;
use crate::pipeline::RunSummary;
use crate::ranking::RankedEntry;

/// Conventional label for an effect size magnitude.
pub fn magnitude_label(d: Option<f64>) -> &'static str {
    match d.map(f64::abs) {
        Some(m) if m >= 0.8 => "large",
        Some(m) if m >= 0.5 => "medium",
        Some(m) if m >= 0.2 => "small",
        Some(_) => "negligible",
        None => "undefined",
    }
}

/// Display each category's ranked tokens as a table.
pub fn display_rankings(entries: &[RankedEntry], label_a: &str, label_b: &str) {
    if entries.is_empty() {
        println!("No tokens could be ranked. Check the run summary below.");
        return;
    }

    let mut categories: Vec<&str> = Vec::new();
    for entry in entries {
        if !categories.contains(&entry.category.as_str()) {
            categories.push(&entry.category);
        }
    }

    for category in categories {
        let rows: Vec<&RankedEntry> = entries.iter().filter(|e| e.category == category).collect();
        println!(
            "\n{}",
            format!("=== {category}: top {} tokens ({label_a} - {label_b}) ===", rows.len()).bold()
        );
        println!();
        println!(
            "  {:>4}  {:<20} {:>8}  {:<19} {:>6}  {}",
            "Rank".dimmed(),
            "Token".dimmed(),
            "d".dimmed(),
            "95% CI".dimmed(),
            "Users".dimmed(),
            "Size".dimmed(),
        );
        println!("  {}", "-".repeat(72).dimmed());

        for entry in rows {
            let interval = match entry.ci {
                Some((lo, hi)) => format!("[{lo:>7.4}, {hi:>7.4}]"),
                None => format!("[{:>7}, {:>7}]", super::NA, super::NA),
            };
            println!(
                "  {:>4}. {:<20} {:>8}  {:<19} {:>6}  {}",
                entry.rank,
                entry.token,
                format_value(entry.cohen_d),
                interval,
                entry.n_users,
                colorize_magnitude(entry.cohen_d),
            );
        }
    }
    println!();
}

/// Display the end-of-run summary: users, exclusions, seed.
pub fn display_summary(summary: &RunSummary) {
    println!("{}", "=== Run Summary ===".bold());
    println!("  Vocabulary size:     {}", summary.vocabulary_size);
    println!("  Posts in scope:      {}", summary.posts_in_scope);
    println!(
        "  Paired users:        {} ({} dropped for missing a condition)",
        summary.complete_users, summary.incomplete_users
    );
    println!("  Tokens estimated:    {}", summary.tokens_estimated);
    if summary.undefined_estimates > 0 {
        println!(
            "  {} {} tokens have no spread in their differences (d = NA)",
            "~".yellow(),
            summary.undefined_estimates
        );
    }
    if summary.unavailable_intervals > 0 {
        println!(
            "  {} {} tokens had too few valid resamples (interval = NA)",
            "~".yellow(),
            summary.unavailable_intervals
        );
    }

    let counts = summary.exclusion_counts();
    if counts.is_empty() {
        println!("  Excluded tokens:     none");
    } else {
        println!("  Excluded tokens:");
        for (reason, count) in counts {
            println!("    {} {count} {reason}", "!".bright_red());
        }
    }
    println!("  Seed:                {}", summary.seed);
    println!(
        "  Started:             {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

/// Display per-category vocabulary size and how much of it the matrix covers.
pub fn display_vocabulary(rows: &[(String, usize, usize)], matrix_tokens: usize) {
    println!(
        "\n{}",
        format!("=== Vocabulary coverage ({matrix_tokens} matrix tokens) ===").bold()
    );
    println!();
    println!(
        "  {:<20} {:>8} {:>10} {:>8}",
        "Category".dimmed(),
        "Tokens".dimmed(),
        "In matrix".dimmed(),
        "Cover".dimmed(),
    );
    println!("  {}", "-".repeat(50).dimmed());
    for (category, total, present) in rows {
        let share = if *total > 0 {
            *present as f64 / *total as f64
        } else {
            0.0
        };
        let cover = format!("{:>7.0}%", share * 100.0);
        let cover = if share >= 0.8 {
            cover.green()
        } else if share >= 0.5 {
            cover.yellow()
        } else {
            cover.red()
        };
        println!("  {:<20} {:>8} {:>10} {}", category, total, present, cover);
    }
    println!();
}

/// Colorize a magnitude label by size.
fn colorize_magnitude(d: Option<f64>) -> colored::ColoredString {
    let label = magnitude_label(d);
    match label {
        "large" => label.red().bold(),
        "medium" => label.bright_red(),
        "small" => label.yellow(),
        "negligible" => label.green(),
        _ => label.dimmed(),
    }
}
