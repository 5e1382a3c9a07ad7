//! Title-based deduplication across sources.

use std::collections::HashMap;

use dailypaper_shared::Record;
use tracing::debug;

/// Collapse records whose normalized titles match.
///
/// The first occurrence keeps its position. A later duplicate replaces it in
/// place only when its provenance ranks higher (tracked author over
/// institution over nothing); the replacement inherits the institution it
/// lacks. Records with an empty title are never merged.
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let input = records.len();
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(input);
    let mut kept: Vec<Record> = Vec::with_capacity(input);

    for record in records {
        let key = record.dedup_key();
        if key.is_empty() {
            kept.push(record);
            continue;
        }
        match slots.get(&key) {
            Some(&slot) => {
                let current = &mut kept[slot];
                if record.provenance_rank() > current.provenance_rank() {
                    let replaced = std::mem::replace(current, record);
                    if current.institution.is_none() {
                        current.institution = replaced.institution;
                    }
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    debug!(input, output = kept.len(), "deduplicated records");
    kept
}
