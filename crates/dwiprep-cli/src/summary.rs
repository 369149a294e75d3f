use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use dwiprep_cli::types::{PlanResult, SubjectListing};

pub fn print_summary(result: &PlanResult) {
    println!("Dataset: {}", result.bids_dir.display());
    println!("Derivatives: {}", result.derivatives_dir.display());
    match &result.plan_dir {
        Some(dir) => println!("Plans: {}", dir.display()),
        None => println!("Plans: dry run, nothing written"),
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Subject"),
        header_cell("Session"),
        header_cell("Runs"),
        header_cell("Coreg"),
        header_cell("Skipped"),
        header_cell("Nodes"),
        header_cell("Dispatch"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);

    let mut total_runs = 0usize;
    let mut total_skipped = 0usize;
    for report in &result.reports {
        for (session, handle) in &report.handles {
            let runs = report.runs.get(session).map_or(0, Vec::len);
            let skipped = report
                .skipped
                .iter()
                .filter(|unit| &unit.session == session)
                .count();
            total_runs += runs;
            total_skipped += skipped;
            table.add_row(vec![
                Cell::new(format!("sub-{}", report.subject))
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                Cell::new(session),
                Cell::new(runs),
                flag_cell(report.coregistered),
                count_cell(skipped, Color::Yellow),
                Cell::new(handle.node_count),
                dim_cell(&handle.dispatch_id),
            ]);
        }
    }
    for failure in &result.failures {
        table.add_row(vec![
            Cell::new(format!("sub-{}", failure.subject))
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            Cell::new("FAILED").fg(Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_runs).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total_skipped, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");

    print_notes(result);
    if result.has_errors() {
        eprintln!("Errors:");
        for failure in &result.failures {
            eprintln!("- sub-{}: {}", failure.subject, failure.error);
        }
    }
}

fn print_notes(result: &PlanResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Subject"),
        header_cell("Unit"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    let mut notes = 0usize;
    for report in &result.reports {
        for advisory in &report.advisories {
            let unit = match &advisory.session {
                Some(session) => format!("ses-{session} {}", advisory.datatype),
                None => advisory.datatype.to_string(),
            };
            table.add_row(vec![
                Cell::new("ADVISORY").fg(Color::Yellow),
                Cell::new(format!("sub-{}", report.subject)),
                Cell::new(unit),
                Cell::new(&advisory.message),
            ]);
            notes += 1;
        }
        for unit in &report.skipped {
            let name = match &unit.run {
                Some(run) => format!("{} {run}", unit.session),
                None => unit.session.to_string(),
            };
            table.add_row(vec![
                Cell::new("SKIPPED").fg(Color::Yellow),
                Cell::new(format!("sub-{}", report.subject)),
                Cell::new(name),
                Cell::new(&unit.reason),
            ]);
            notes += 1;
        }
    }
    if notes == 0 {
        return;
    }
    println!();
    println!("Notes:");
    println!("{table}");
}

pub fn print_subjects(listings: &[SubjectListing]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Subject"),
        header_cell("Sessions"),
        header_cell("DWI runs"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for listing in listings {
        let sessions = if listing.sessions.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(listing.sessions.join(", "))
        };
        table.add_row(vec![
            Cell::new(format!("sub-{}", listing.subject)),
            sessions,
            count_cell(listing.runs, Color::Green),
        ]);
    }
    println!("{table}");
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
