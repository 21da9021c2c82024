// Merchant SKU -> internal SKU lookup built from the mapping workbook.
use crate::error::LoadError;
use crate::table::{HeaderStyle, RawTable, SourceRow};
use crate::types::{col, MappingEntry, RawMappingRow};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

impl SourceRow for RawMappingRow {
    const REQUIRED: &'static [&'static str] = &[col::MSKU, col::SKU, col::STATUS];
    const KNOWN: &'static [&'static str] = &[col::MSKU, col::SKU, col::STATUS];
}

/// Status text marking a mapping row as broken in the source workbook.
const REFERENCE_ERROR: &str = "reference error";

/// Read-only lookup from merchant SKU to its mapping entries.
///
/// Entries are kept in file order and duplicates are preserved, so a
/// merchant SKU listed twice joins to two rows.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    index: HashMap<String, Vec<usize>>,
}

impl MappingTable {
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            index.entry(e.merchant_sku.clone()).or_default().push(i);
        }
        Self { entries, index }
    }

    /// All entries for `merchant_sku`, in file order.
    pub fn lookup(&self, merchant_sku: &str) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.index
            .get(merchant_sku)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_reference_error(status: &str) -> bool {
    status.to_lowercase().contains(REFERENCE_ERROR)
}

/// Turn decoded mapping rows into entries: rows without both identifiers
/// are skipped, rows flagged as a reference error are excluded.
pub fn build_mapping(rows: Vec<RawMappingRow>) -> MappingTable {
    let entries = rows
        .into_iter()
        .filter_map(|row| {
            let msku = row.msku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
            let sku = row.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
            let status = row.status.map(|s| s.trim().to_string()).unwrap_or_default();
            if is_reference_error(&status) {
                return None;
            }
            Some(MappingEntry {
                merchant_sku: msku,
                sku,
                status,
            })
        })
        .collect();
    MappingTable::from_entries(entries)
}

pub fn load_mapping(path: &Path) -> Result<MappingTable, LoadError> {
    let mut raw = RawTable::read(path)?;
    raw.normalize_headers(HeaderStyle::Lowercase);
    raw.require(RawMappingRow::REQUIRED)?;
    let (rows, skipped) = raw.deserialize::<RawMappingRow>();
    let total = rows.len();
    let table = build_mapping(rows);
    info!(
        path = %path.display(),
        rows = total,
        skipped,
        entries = table.len(),
        "loaded SKU mapping"
    );
    if table.is_empty() {
        warn!(path = %path.display(), "SKU mapping has no usable entries");
    }
    Ok(table)
}
