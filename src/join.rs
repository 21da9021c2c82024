// Left join of report rows against the SKU mapping.
use crate::mapping::MappingTable;
use crate::table::Table;
use crate::types::{CampaignRecord, HourlyRecord, ProductRecord, SearchTermRecord};
use serde::Serialize;
use std::borrow::Borrow;
use tracing::debug;

/// Rows that can be looked up in the mapping table.
pub trait JoinKey {
    /// The merchant identifier to match, if the row has one.
    fn join_key(&self) -> Option<&str>;
}

impl JoinKey for CampaignRecord {
    fn join_key(&self) -> Option<&str> {
        Some(self.campaign_name.as_str()).filter(|s| !s.is_empty())
    }
}

impl JoinKey for HourlyRecord {
    fn join_key(&self) -> Option<&str> {
        Some(self.campaign_name.as_str()).filter(|s| !s.is_empty())
    }
}

impl JoinKey for SearchTermRecord {
    fn join_key(&self) -> Option<&str> {
        Some(self.campaign_name.as_str()).filter(|s| !s.is_empty())
    }
}

impl JoinKey for ProductRecord {
    fn join_key(&self) -> Option<&str> {
        self.campaign_name.as_deref()
    }
}

/// A report row with the mapping columns attached. `sku` and `sku_status`
/// stay empty when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joined<R> {
    pub record: R,
    pub sku: Option<String>,
    pub sku_status: Option<String>,
}

impl<R> Joined<R> {
    pub fn unmatched(record: R) -> Self {
        Self {
            record,
            sku: None,
            sku_status: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.sku.is_some()
    }
}

impl<R> Borrow<R> for Joined<R> {
    fn borrow(&self) -> &R {
        &self.record
    }
}

/// Left join `table` against `mapping`.
///
/// Every input row appears at least once. A row whose key matches `k`
/// mapping entries appears `k` times, once per entry.
pub fn left_join<R>(table: &Table<R>, mapping: &MappingTable) -> Table<Joined<R>>
where
    R: JoinKey + Clone,
{
    let mut rows = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        let before = rows.len();
        if let Some(key) = record.join_key() {
            rows.extend(mapping.lookup(key).map(|entry| Joined {
                record: record.clone(),
                sku: Some(entry.sku.clone()),
                sku_status: Some(entry.status.clone()),
            }));
        }
        if rows.len() == before {
            rows.push(Joined::unmatched(record.clone()));
        }
    }
    let matched = rows.iter().filter(|r| r.is_matched()).count();
    debug!(
        source = %table.source.display(),
        input = table.rows.len(),
        output = rows.len(),
        matched,
        "joined against SKU mapping"
    );
    table.with_rows(rows)
}
