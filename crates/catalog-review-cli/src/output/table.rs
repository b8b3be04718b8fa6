use catalog_review_core::consolidation::ConflictView;
use catalog_review_core::model::SpecEntry;
use catalog_review_core::review::{FinishSummary, ReviewSession};

use crate::commands::preview::PreviewReport;

pub fn print_products(session: &ReviewSession) {
    println!("=== {} ===\n", session.title());
    println!(
        "  {} product(s), {} reviewed, {} pending{}\n",
        session.rows().len(),
        session.reviewed_count(),
        session.unreviewed_count(),
        if session.has_unsaved_changes() {
            " (unsaved changes)"
        } else {
            ""
        }
    );

    let rows = session.visible_rows();
    if rows.is_empty() {
        println!("  No products match the filter.");
        return;
    }

    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
    let ord_width = rows
        .iter()
        .map(|r| r.ordering_number.len())
        .max()
        .unwrap_or(14)
        .max(14);

    println!(
        "  {:<id_width$}  {:<ord_width$}  {:<4}  {:<4}  Description",
        "Id", "Ordering no.", "Done", "Page"
    );
    for row in rows {
        let page = row
            .location
            .map(|l| l.page.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<id_width$}  {:<ord_width$}  {:<4}  {:<4}  {}",
            row.id,
            row.ordering_number,
            if row.reviewed { "x" } else { "" },
            page,
            row.description
        );
        if !row.specs.is_empty() {
            println!("  {:<id_width$}  {}", "", specs_line(&row.specs));
        }
    }

    println!(
        "\n  Page {} of {}",
        session.page() + 1,
        session.page_count()
    );
}

fn specs_line(specs: &[SpecEntry]) -> String {
    specs
        .iter()
        .filter(|s| !s.key.trim().is_empty())
        .map(|s| format!("{}: {}", s.key, s.value))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_conflicts(entries: &[ConflictView]) {
    println!("=== Existing products found ===\n");
    for entry in entries {
        let choice = entry
            .action
            .map(|a| a.to_string())
            .unwrap_or_else(|| "undecided".into());
        println!("  {} ({choice})", entry.ordering_number);
        println!(
            "    existing: {} [{}]",
            or_dash(&entry.existing.description),
            entry.existing.sources
        );
        if !entry.existing.specs.is_empty() {
            println!("              {}", specs_line(&entry.existing.specs));
        }
        println!("    new:      {}", or_dash(&entry.incoming.description));
        if !entry.incoming.specs.is_empty() {
            println!("              {}", specs_line(&entry.incoming.specs));
        }
        println!();
    }
    println!("  Choose with --keep <ordering number> or --replace <ordering number>.");
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "-"
    } else {
        s
    }
}

pub fn print_finish(summary: &FinishSummary) {
    println!("Review completed.\n");
    println!("  New products:        {}", summary.created);
    println!("  Linked to existing:  {}", summary.appended);
    println!("  Replaced:            {}", summary.replaced);
    println!("  Kept existing:       {}", summary.kept);
    if summary.skipped_unreviewed > 0 {
        println!("  Skipped (pending):   {}", summary.skipped_unreviewed);
    }
}

pub fn print_preview(report: &PreviewReport) {
    println!("=== {} ===\n", report.title);

    if let Some(error) = &report.error {
        println!("  {error}");
        return;
    }

    let pages = report
        .page_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".into());
    println!("  Page {} of {pages}", report.page);
    println!(
        "  Zoom {}%  (page width {:.0}px, rendered {:.0}px)",
        report.zoom_percent, report.page_width, report.rendered_width
    );

    if let Some(o) = &report.overlay {
        println!(
            "  Location on page {}: {:.1}%,{:.1}% size {:.1}%x{:.1}%, scroll {:.0}px",
            o.page,
            o.rect.left_pct,
            o.rect.top_pct,
            o.rect.width_pct,
            o.rect.height_pct,
            o.scroll_offset
        );
    }

    if report.matches.is_empty() {
        return;
    }
    println!("\n  Matches:");
    for m in &report.matches {
        let marker = match &report.scroll_to {
            Some(s) if s.page == m.page && s.line_index == m.line_index => ">",
            _ => " ",
        };
        println!("  {marker} p{} l{}: {}", m.page, m.line_index, m.text);
    }
}
