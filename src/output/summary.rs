use std::collections::HashMap;
use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::catalog::CategoryCatalog;
use crate::records::{CategoryDataset, Dataset};

use super::styling::{bright, bright_yellow, cyan, dim};
use super::tables::{
    color_coded_count_cell, color_coded_duration_cell, create_cyan_header, create_table,
};

const TOP_TESTS: usize = 10;

/// Prints a human-readable summary of a dataset to stdout.
///
/// Displays color-coded tables showing:
/// - Overview: project, categories, record count
/// - Categories: symbol, result, records, average duration, problem tests, duplicates
/// - Top 10 Problem Tests per category with at least one outcome
/// - Categories without results
pub fn print_summary(dataset: &Dataset) {
    println!("{}", render_summary(dataset));
}

/// Prints the resolved category catalog of a project to stdout.
pub fn print_catalog(catalog: &CategoryCatalog) {
    println!("{}", render_catalog(catalog));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

/// Test names of a category with how often they were reported, most frequent first.
fn problem_test_counts(category: &CategoryDataset) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for outcome in category.records.iter().flat_map(|r| &r.problem_test_details) {
        *counts.entry(outcome.name.as_str()).or_default() += 1;
    }

    let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

fn render_summary(dataset: &Dataset) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Project:"),
        cyan(&dataset.project),
        dim("Categories with results:"),
        bright_yellow(dataset.categories.len()),
        dim("Records:"),
        bright_yellow(dataset.total_records()),
        dim("Analysis date:"),
        dim(dataset.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if dataset.categories.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No results found."));
    } else {
        add_section_header(&mut output, "📋", "Categories");

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Category",
            "Symbol",
            "Result",
            "Records",
            "Avg Duration",
            "Problem Tests",
            "Duplicates",
        ]));

        for category in &dataset.categories {
            let summary = &category.summary;
            let problem_tests: usize = category
                .records
                .iter()
                .map(|r| r.problem_test_details.len())
                .sum();
            table.add_row(vec![
                Cell::new(&category.name),
                Cell::new(&summary.job_symbol),
                Cell::new(&summary.job_result),
                Cell::new(summary.outcome_count),
                color_coded_duration_cell(summary.job_duration_avg),
                color_coded_count_cell(problem_tests),
                color_coded_count_cell(summary.duplicates.len()),
            ]);
        }

        let _ = write!(output, "{table}\n\n");

        for category in &dataset.categories {
            let counts = problem_test_counts(category);
            if counts.is_empty() {
                continue;
            }

            add_section_header(
                &mut output,
                "❌",
                &format!("Top {TOP_TESTS} Problem Tests: {}", category.name),
            );

            let mut tests_table = create_table();
            tests_table.set_header(create_cyan_header(&["#", "Test", "Reports"]));
            for (idx, (name, count)) in counts.iter().take(TOP_TESTS).enumerate() {
                tests_table.add_row(vec![Cell::new(idx + 1), Cell::new(name), Cell::new(count)]);
            }
            if counts.len() > TOP_TESTS {
                tests_table.add_row(vec![
                    Cell::new(format!("... and {} more", counts.len() - TOP_TESTS))
                        .fg(TableColor::DarkGrey),
                    Cell::new(""),
                    Cell::new(""),
                ]);
            }

            let _ = write!(output, "{tests_table}\n\n");
        }
    }

    if !dataset.empty_categories.is_empty() {
        add_section_header(&mut output, "∅", "Categories Without Results");
        for name in &dataset.empty_categories {
            let _ = writeln!(output, "  {} {}", cyan("•"), dim(name));
        }
        output.push('\n');
    }

    if !dataset.disabled_tests.is_empty() {
        let _ = writeln!(
            output,
            "  {} {}",
            dim("Disabled tests:"),
            bright_yellow(dataset.disabled_tests.len())
        );
    }

    output
}

fn render_catalog(catalog: &CategoryCatalog) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🗂️", "Categories");
    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Project:"),
        cyan(&catalog.project),
        dim("Correlation:"),
        bright_yellow(catalog.strategy.label()),
        dim("Push window:"),
        bright_yellow(format!(
            "{} day(s), at most {} pushes",
            catalog.window.days, catalog.window.max_count
        ))
    );

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Category", "Symbol", "Result", "Tier", "Group", "Author", "Reports",
    ]));

    for category in catalog.categories() {
        let criteria = &category.criteria;
        table.add_row(vec![
            Cell::new(&category.name),
            Cell::new(&criteria.symbol),
            Cell::new(&criteria.result),
            Cell::new(criteria.tier.map_or_else(|| "-".to_string(), |t| t.to_string())),
            Cell::new(criteria.group_symbol.as_deref().unwrap_or("-")),
            Cell::new(criteria.author.as_deref().unwrap_or("-")),
            Cell::new(if category.carries_reports { "yes" } else { "no" }),
        ]);
    }

    let _ = writeln!(output, "{table}");
    output
}
