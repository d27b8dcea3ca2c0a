use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use recon_model::{MappingSuggestion, Provenance, TargetedFix};

use crate::pipeline::PipelineResult;

pub fn print_summary(result: &PipelineResult, dry_run: bool) {
    println!("Input: {}", result.input.display());
    match (&result.output, dry_run) {
        (_, true) => println!("Output: dry run, nothing written"),
        (Some(path), false) => println!("Output: {}", path.display()),
        (None, false) => {}
    }
    if let Some(path) = &result.complete_output {
        println!("Complete output: {}", path.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Source"),
        header_cell("Rows"),
        header_cell("Missing before"),
        header_cell("Missing after"),
        header_cell("Invalid"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_missing = 0usize;
    let mut total_invalid = 0usize;
    for report in &result.outcome.reports {
        total_missing += report.missing_after;
        total_invalid += report.invalid_after;
        table.add_row(vec![
            Cell::new(&report.field)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&report.source_column),
            Cell::new(report.total),
            count_cell(report.missing_before, Color::Yellow),
            count_cell(report.missing_after, Color::Yellow),
            count_cell(report.invalid_after, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(result.outcome.table.height()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total_missing, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(total_invalid, Color::Red).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if !result.unmapped_columns.is_empty() {
        println!("Unmapped columns: {}", result.unmapped_columns.join(", "));
    }
    print_issue_table(result);
    print_fix_table(&result.fixes);
    if !result.applied.is_empty() {
        println!();
        println!("Applied:");
        for entry in &result.applied {
            println!("- {} {} ({} cells)", entry.id, entry.scope, entry.changes.len());
        }
    }
    if result.promoted > 0 {
        println!("Promoted {} fixes to cleaning rules", result.promoted);
    }
}

fn print_issue_table(result: &PipelineResult) {
    let issues = &result.outcome.issues;
    if issues.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Rule"),
        header_cell("Changed"),
        header_cell("Confidence"),
        header_cell("Before"),
        header_cell("After"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.column),
            Cell::new(issue.rule),
            Cell::new(issue.changed),
            confidence_cell(issue.confidence),
            sample_cell(&issue.before_sample),
            sample_cell(&issue.after_sample),
        ]);
    }
    println!();
    println!("Cleaning:");
    println!("{table}");
}

fn print_fix_table(fixes: &[TargetedFix]) {
    if fixes.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Row"),
        header_cell("Fix"),
        header_cell("Current"),
        header_cell("Suggested"),
        header_cell("Confidence"),
        header_cell("Issue"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for fix in fixes {
        let others: Vec<&str> = fix
            .alternatives
            .iter()
            .map(String::as_str)
            .filter(|alt| *alt != fix.suggested_fix)
            .collect();
        let suggested = if others.is_empty() {
            fix.suggested_fix.clone()
        } else {
            format!("{} (or {})", fix.suggested_fix, others.join(", "))
        };
        table.add_row(vec![
            Cell::new(&fix.column),
            Cell::new(fix.row + 1),
            Cell::new(fix.kind),
            Cell::new(&fix.current_value),
            Cell::new(suggested).fg(Color::Green),
            confidence_cell(fix.confidence),
            Cell::new(&fix.issue),
        ]);
    }
    println!();
    println!("Suggested fixes:");
    println!("{table}");
}

/// Print mapping suggestions with their score breakdown.
pub fn print_suggestions(suggestions: &[MappingSuggestion]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Field"),
        header_cell("Confidence"),
        header_cell("Source"),
        header_cell("Type"),
        header_cell("Why"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for suggestion in suggestions {
        let field = match &suggestion.target {
            Some(target) => Cell::new(target)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            None => dim_cell("unmapped"),
        };
        table.add_row(vec![
            Cell::new(&suggestion.source_column),
            field,
            confidence_cell(suggestion.confidence),
            provenance_cell(suggestion.provenance),
            Cell::new(suggestion.inferred_type.as_str()),
            Cell::new(suggestion.explain()),
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(180);
    if table.column_count() >= 6 {
        let mut constraints = vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(20)),
            ColumnConstraint::UpperBoundary(Width::Fixed(28)),
            ColumnConstraint::LowerBoundary(Width::Fixed(5)),
        ];
        constraints.resize(
            table.column_count(),
            ColumnConstraint::UpperBoundary(Width::Percentage(35)),
        );
        table.set_constraints(constraints);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn provenance_cell(provenance: Provenance) -> Cell {
    match provenance {
        Provenance::Learned | Provenance::Promoted => Cell::new(provenance).fg(Color::Green),
        Provenance::Manual => Cell::new(provenance).fg(Color::Magenta),
        Provenance::Fallback => Cell::new(provenance).fg(Color::Yellow),
        Provenance::Heuristic => Cell::new(provenance),
    }
}

fn confidence_cell(confidence: f32) -> Cell {
    let color = if confidence >= 0.9 {
        Color::Green
    } else if confidence >= 0.7 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{:.0}%", confidence * 100.0)).fg(color)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn sample_cell(sample: &[String]) -> Cell {
    if sample.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(sample.join(" | "))
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
