use super::{Cashbook, Entry, MoneyError};

/// Collapse a cashbook's entries into printable statement lines.
///
/// Entries must belong to `cashbook` and arrive ordered by id. A run of adjacent
/// sales entries with the same tax rate and no memo text becomes a single line:
/// the first entry of the run absorbs the amounts of the others, adopts the
/// timestamp of the last one, and carries its balance forward by the absorbed
/// amounts. Every other entry is passed through unchanged.
pub fn build_statement(
    cashbook: &Cashbook,
    entries: impl IntoIterator<Item = Entry>,
) -> Result<Vec<Entry>, MoneyError> {
    let mut lines: Vec<Entry> = Vec::new();

    for entry in entries {
        debug_assert_eq!(
            entry.cashbook_id, cashbook.id,
            "statement entries must belong to one cashbook"
        );
        debug_assert!(
            lines.last().is_none_or(|last| last.id < entry.id),
            "statement entries must be ordered by id"
        );

        match lines.last_mut() {
            Some(last) if collapses_into(last, &entry) => {
                let increment = entry.amount(cashbook)?;
                let amount = last.amount(cashbook)?.checked_add(&increment)?;
                // Balance moves by the absorbed amount; the absorbed entry's own
                // balance is not copied.
                let balance = last.balance(cashbook)?.checked_add(&increment)?;
                last.set_amount(&amount);
                last.set_balance(&balance);
                last.datetime = entry.datetime;
            }
            _ => lines.push(entry),
        }
    }

    Ok(lines)
}

/// Returns true if `entry` can be merged into the statement line `last`.
pub fn collapses_into(last: &Entry, entry: &Entry) -> bool {
    entry.reason.is_collapsible()
        && last.reason == entry.reason
        && last.tax == entry.tax
        && !last.has_text()
        && !entry.has_text()
}
