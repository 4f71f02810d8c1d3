//! Terminal rendering for forms, due-soon lists and dashboard summaries.

use permitdesk_core::{CompletionStats, CompletionSummary, DueSoonEntry, FormField, FormRecord, FormRow};

const NAME_WIDTH: usize = 44;

// ── Public API ──

/// Print catalog rows as a fixed-width table.
pub fn print_form_table(rows: &[FormRow]) {
    println!(
        "{:<6} {:<w$} {:<14} {:<8} {:<14} {:<13} {:<10} {:>4}",
        "ID",
        "NAME",
        "CATEGORY",
        "LEVEL",
        "FREQUENCY",
        "STATUS",
        "DUE",
        "PROG",
        w = NAME_WIDTH
    );
    for row in rows {
        let r = &row.record;
        let due = r.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<6} {:<w$} {:<14} {:<8} {:<14} {:<13} {:<10} {:>3}%",
            r.id,
            shorten(&r.name, NAME_WIDTH),
            r.category,
            r.jurisdiction,
            r.frequency,
            r.status,
            due,
            row.progress,
            w = NAME_WIDTH
        );
    }
    println!("\n{} forms", rows.len());
}

/// Print one form as a vertical card.
pub fn print_form_card(record: &FormRecord, progress: u8) {
    println!("=== {} ===", record.name);
    println!("{}", record.governing_body);
    println!();

    println!("Details");
    field("id", &record.id.to_string());
    field("status", record.status.as_str());
    field("category", record.category.as_str());
    field("jurisdiction", record.jurisdiction.as_str());
    field("frequency", record.frequency.as_str());
    if let Some(due) = record.due_date {
        field("due_date", &due.to_string());
    }
    field("progress", &format!("{progress}%"));
    println!();

    println!("Description");
    println!("  {}", record.description);
    println!();
    field("resource_url", &record.resource_url);
}

pub fn print_due_soon(entries: &[DueSoonEntry]) {
    if entries.is_empty() {
        println!("Nothing due in the next 30 days.");
        return;
    }
    for e in entries {
        println!(
            "  [{:<6}] {}  {}",
            e.priority.as_str(),
            e.due_date,
            shorten(&e.name, NAME_WIDTH)
        );
        if !e.document_url.is_empty() {
            println!("           {}", e.document_url);
        }
    }
}

pub fn print_completion(summary: &CompletionSummary) {
    println!("Completion");
    stat_line("all", summary.all);
    stat_line("once", summary.once);
    stat_line("annual", summary.annual);
    stat_line("quarterly", summary.quarterly);
    stat_line("miscellaneous", summary.miscellaneous);
    println!();
}

/// Print the fillable fields of a PDF, one per line.
pub fn print_fields(fields: &[FormField]) {
    for f in fields {
        let value = f.value.as_deref().unwrap_or("");
        println!("  {:<8} {:<w$} {}", f.kind, shorten(&f.name, NAME_WIDTH), value, w = NAME_WIDTH);
    }
    println!("\n{} fields", fields.len());
}

// ── Helpers ──

fn field(name: &str, value: &str) {
    println!("  {:<14} {}", name, value);
}

fn stat_line(label: &str, stats: CompletionStats) {
    println!(
        "  {:<14} {}/{}",
        label, stats.completed_count, stats.total_count
    );
}

/// Truncate to `max` characters, marking the cut with `...`.
fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_keeps_short_names() {
        assert_eq!(shorten("Seller's Permit", 20), "Seller's Permit");
    }

    #[test]
    fn shorten_cuts_on_char_boundaries() {
        assert_eq!(shorten("Déclaration annuelle", 10), "Déclara...");
        assert_eq!(shorten("abcdef", 6), "abcdef");
        assert_eq!(shorten("abcdefg", 6), "abc...");
    }
}
