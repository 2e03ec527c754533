//! Session-wide settings store and structure-change reconciliation
//!
//! One store lives for the duration of a database session. Settings records
//! are created on first access, survive closing and reopening their table,
//! and are only discarded when the session closes. When a table's structure
//! changes, every ordinal-keyed entry is rebound by column name where the
//! old names are known, carried over positionally where they are not, and
//! dropped when neither works.

use std::collections::BTreeMap;
use std::mem;

use rowscope_core::TableId;

use crate::settings::{BrowseSettings, SortColumn};

/// Per-table browse settings for one database session
#[derive(Debug, Default)]
pub struct SettingsStore {
    settings: BTreeMap<TableId, BrowseSettings>,
    default_encoding: Option<String>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings of `table`, creating a default record on first access
    pub fn settings(&mut self, table: &TableId) -> &mut BrowseSettings {
        self.settings.entry(table.clone()).or_default()
    }

    /// Settings of `table` if a record exists
    pub fn get(&self, table: &TableId) -> Option<&BrowseSettings> {
        self.settings.get(table)
    }

    /// Replace the settings of `table` wholesale, as project loading does
    pub fn insert(&mut self, table: TableId, settings: BrowseSettings) {
        self.settings.insert(table, settings);
    }

    /// Drop every record, as closing the session does
    pub fn clear(&mut self) {
        self.settings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableId, &BrowseSettings)> {
        self.settings.iter()
    }

    pub fn default_encoding(&self) -> Option<&str> {
        self.default_encoding.as_deref()
    }

    /// Encoding applied to tables without their own override
    pub fn set_default_encoding(&mut self, encoding: Option<String>) {
        self.default_encoding = encoding;
    }

    /// Set one encoding override on every known table
    pub fn set_encoding_for_all(&mut self, encoding: Option<String>) {
        for settings in self.settings.values_mut() {
            settings.encoding = encoding.clone();
        }
        self.default_encoding = encoding;
    }

    /// Effective encoding of `table`: its own override or the default
    pub fn encoding_for(&self, table: &TableId) -> Option<String> {
        self.settings
            .get(table)
            .and_then(|s| s.encoding.clone())
            .or_else(|| self.default_encoding.clone())
    }

    /// Reconcile one table's settings with its new column list.
    ///
    /// `old_names` is the column list the stored ordinals were written
    /// against, when the caller still knows it. Without it only positional
    /// carry-over is possible.
    pub fn apply_structure_change(
        &mut self,
        table: &TableId,
        old_names: Option<&[String]>,
        new_names: &[String],
    ) {
        let Some(settings) = self.settings.get_mut(table) else {
            return;
        };
        let dropped = reconcile(settings, old_names, new_names);
        if dropped > 0 {
            tracing::debug!(table = %table, dropped, "dropped stale column settings");
        }
    }
}

/// Mapping from old column ordinals to new ones
enum ColumnRebind {
    /// Old names known: name matching first, positional carry-over second
    ByName(Vec<Option<usize>>),
    /// Old names unknown: identity below the new column count
    Positional(usize),
}

impl ColumnRebind {
    fn new(old_names: Option<&[String]>, new_names: &[String]) -> Self {
        match old_names {
            Some(old) => Self::by_name(old, new_names),
            None => ColumnRebind::Positional(new_names.len()),
        }
    }

    fn by_name(old: &[String], new: &[String]) -> Self {
        let mut map = vec![None; old.len()];
        let mut claimed = vec![false; new.len()];
        // first pass: exact name matches, each new column claimed once
        for (i, name) in old.iter().enumerate() {
            if let Some(j) = new.iter().position(|n| n == name) {
                if !claimed[j] {
                    map[i] = Some(j);
                    claimed[j] = true;
                }
            }
        }
        // second pass: keep unmatched ordinals in place when that slot is
        // still free and inside the new structure
        for (i, slot) in map.iter_mut().enumerate() {
            if slot.is_none() && i < new.len() && !claimed[i] {
                *slot = Some(i);
                claimed[i] = true;
            }
        }
        ColumnRebind::ByName(map)
    }

    fn resolve(&self, old: usize) -> Option<usize> {
        match self {
            ColumnRebind::ByName(map) => map.get(old).copied().flatten(),
            ColumnRebind::Positional(new_len) => (old < *new_len).then_some(old),
        }
    }
}

/// Rebind every ordinal-keyed entry in `settings`. Returns how many entries
/// had to be dropped.
fn reconcile(
    settings: &mut BrowseSettings,
    old_names: Option<&[String]>,
    new_names: &[String],
) -> usize {
    let rebind = ColumnRebind::new(old_names, new_names);
    let mut dropped = 0;

    let old_sort = mem::take(&mut settings.sort);
    for criterion in old_sort {
        match rebind.resolve(criterion.column) {
            Some(target) if !settings.sort.iter().any(|s| s.column == target) => {
                settings.sort.push(SortColumn::new(target, criterion.order));
            }
            _ => dropped += 1,
        }
    }

    settings.column_widths = remap(mem::take(&mut settings.column_widths), &rebind, &mut dropped);
    settings.filters = remap(mem::take(&mut settings.filters), &rebind, &mut dropped);
    settings.column_formats = remap(
        mem::take(&mut settings.column_formats),
        &rebind,
        &mut dropped,
    );
    settings.display_formats = remap(
        mem::take(&mut settings.display_formats),
        &rebind,
        &mut dropped,
    );
    settings.hidden_columns = remap(
        mem::take(&mut settings.hidden_columns),
        &rebind,
        &mut dropped,
    );

    dropped
}

fn remap<V>(
    entries: BTreeMap<usize, V>,
    rebind: &ColumnRebind,
    dropped: &mut usize,
) -> BTreeMap<usize, V> {
    let mut out = BTreeMap::new();
    for (ordinal, value) in entries {
        match rebind.resolve(ordinal) {
            Some(target) => {
                out.insert(target, value);
            }
            None => *dropped += 1,
        }
    }
    out
}
