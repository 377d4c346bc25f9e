use std::collections::HashMap;

use csv::StringRecord;
use tank_domain::domain::Signal;

const TIMESTAMP_CANDIDATES: &[&str] = &["timestamp", "ts", "datetime", "fechahora"];
const ASSET_LABEL_CANDIDATES: &[&str] = &["asset_label", "asset", "assetname"];
const LEVEL_PERCENT_CANDIDATES: &[&str] = &["nivelporcentual", "level_percent", "level_pct"];
const LEVEL_ABSOLUTE_CANDIDATES: &[&str] = &["nivelestanque", "level_absolute", "level"];

/// Column positions of the canonical fields in one file, resolved once from
/// its header row with case-insensitive matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub timestamp: usize,
    pub asset_label: Option<usize>,
    pub level_percent: Option<usize>,
    pub level_absolute: Option<usize>,
}

impl ColumnMap {
    /// `None` when the header has no recognizable timestamp column.
    pub fn from_headers(headers: &StringRecord) -> Option<Self> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            by_name.entry(name.trim().to_lowercase()).or_insert(idx);
        }
        let find = |candidates: &[&str]| candidates.iter().find_map(|c| by_name.get(*c).copied());

        Some(Self {
            timestamp: find(TIMESTAMP_CANDIDATES)?,
            asset_label: find(ASSET_LABEL_CANDIDATES),
            level_percent: find(LEVEL_PERCENT_CANDIDATES),
            level_absolute: find(LEVEL_ABSOLUTE_CANDIDATES),
        })
    }

    /// Level signals this file actually carries.
    pub fn detected_levels(&self) -> Vec<Signal> {
        let mut found = Vec::new();
        if self.level_percent.is_some() {
            found.push(Signal::LevelPercent);
        }
        if self.level_absolute.is_some() {
            found.push(Signal::LevelAbsolute);
        }
        found
    }
}
