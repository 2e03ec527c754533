//! Per-table browse settings
//!
//! Everything a user tweaks while browsing one table lives here: sort order,
//! filters, column widths, hidden columns, conditional formats, display
//! formats, encoding and plot selections. The whole struct serializes into
//! project files, so every field is tolerant of missing keys.

use std::collections::BTreeMap;

use rowscope_core::{Affinity, Value};
use serde::{Deserialize, Serialize};

use crate::cond_format::{style_for, CellStyle, FormatRule, FormatTarget, FORMAT_PALETTE};
use crate::display::DisplayFormat;

/// Name of the implicit SQLite row-identity column. Also the sentinel value
/// of [`BrowseSettings::unlock_view_pk`] while view editing stays locked.
pub const DEFAULT_ROW_KEY: &str = "_rowid_";

/// Sort direction of one sort criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// SQL keyword for this direction
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// One sort criterion: a column ordinal plus a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortColumn {
    pub column: usize,
    pub order: SortOrder,
}

impl SortColumn {
    pub fn new(column: usize, order: SortOrder) -> Self {
        Self { column, order }
    }

    pub fn ascending(column: usize) -> Self {
        Self::new(column, SortOrder::Ascending)
    }
}

/// Appearance of one plotted series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    pub line_style: u8,
    pub point_shape: u8,
    pub color: String,
    pub active: bool,
}

/// Plot axis selection: one X column plus per-pane Y series, keyed by column
/// name so plots survive column reordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotAxes {
    pub x_axis: Option<String>,
    pub y_axes: Vec<BTreeMap<String, PlotStyle>>,
}

impl Default for PlotAxes {
    fn default() -> Self {
        Self {
            x_axis: None,
            // two panes, matching the plot dock's two Y axes
            y_axes: vec![BTreeMap::new(), BTreeMap::new()],
        }
    }
}

/// Browse state of a single table or view.
///
/// Column-keyed maps use zero-based ordinals into the table's column list as
/// it existed when the entry was written. [`crate::store::SettingsStore`]
/// rebinds or drops those ordinals when the structure changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseSettings {
    /// Ordered sort criteria, at most one entry per column
    pub sort: Vec<SortColumn>,
    /// Column widths in pixels
    pub column_widths: BTreeMap<usize, u32>,
    /// Per-column filter strings, raw as the user typed them
    pub filters: BTreeMap<usize, String>,
    /// Filter terms applied across all visible columns
    pub global_filters: Vec<String>,
    /// Conditional-format rules per column, evaluated in order
    pub column_formats: BTreeMap<usize, Vec<FormatRule>>,
    /// Conditional-format rules matched against the row identity
    pub row_id_formats: Vec<FormatRule>,
    /// Display-format rewrites per column
    pub display_formats: BTreeMap<usize, DisplayFormat>,
    /// Columns currently hidden in the grid
    pub hidden_columns: BTreeMap<usize, bool>,
    /// Whether the row-identity column is shown as a grid column
    pub show_rowid: bool,
    /// Text encoding override for this table, `None` means the default
    pub encoding: Option<String>,
    pub plot: PlotAxes,
    /// Column treated as primary key when view editing is unlocked;
    /// [`DEFAULT_ROW_KEY`] while locked.
    pub unlock_view_pk: String,
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            sort: Vec::new(),
            column_widths: BTreeMap::new(),
            filters: BTreeMap::new(),
            global_filters: Vec::new(),
            column_formats: BTreeMap::new(),
            row_id_formats: Vec::new(),
            display_formats: BTreeMap::new(),
            hidden_columns: BTreeMap::new(),
            show_rowid: false,
            encoding: None,
            plot: PlotAxes::default(),
            unlock_view_pk: DEFAULT_ROW_KEY.to_string(),
        }
    }
}

impl BrowseSettings {
    /// Header click: cycle the primary sort on `column` between ascending and
    /// descending, replacing any multi-column sort.
    pub fn toggle_sort(&mut self, column: usize) {
        if self.sort.len() == 1 && self.sort[0].column == column {
            self.sort[0].order = self.sort[0].order.toggle();
        } else {
            self.sort = vec![SortColumn::ascending(column)];
        }
    }

    /// Ctrl-click: toggle `column` within the existing sort, appending it
    /// ascending when absent. Keeps at most one entry per column.
    pub fn toggle_sort_additive(&mut self, column: usize) {
        if let Some(entry) = self.sort.iter_mut().find(|s| s.column == column) {
            entry.order = entry.order.toggle();
        } else {
            self.sort.push(SortColumn::ascending(column));
        }
    }

    pub fn clear_sorting(&mut self) {
        self.sort.clear();
    }

    /// Drop all per-column and global filters
    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.global_filters.clear();
    }

    /// Set or clear the filter on one column; empty text removes the entry
    pub fn set_filter(&mut self, column: usize, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            self.filters.remove(&column);
        } else {
            self.filters.insert(column, text);
        }
    }

    /// Replace the global filter terms, discarding empty ones
    pub fn set_global_filters(&mut self, terms: Vec<String>) {
        self.global_filters = terms
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
    }

    pub fn set_column_width(&mut self, column: usize, width: u32) {
        self.column_widths.insert(column, width);
    }

    pub fn set_column_hidden(&mut self, column: usize, hidden: bool) {
        if hidden {
            self.hidden_columns.insert(column, true);
        } else {
            self.hidden_columns.remove(&column);
        }
    }

    pub fn is_column_hidden(&self, column: usize) -> bool {
        self.hidden_columns.get(&column).copied().unwrap_or(false)
    }

    pub fn show_all_columns(&mut self) {
        self.hidden_columns.clear();
    }

    pub fn set_show_rowid(&mut self, show: bool) {
        self.show_rowid = show;
    }

    pub fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }

    /// Unlock view editing by naming the column that acts as primary key
    pub fn unlock_view_editing(&mut self, pk_column: impl Into<String>) {
        self.unlock_view_pk = pk_column.into();
    }

    pub fn lock_view_editing(&mut self) {
        self.unlock_view_pk = DEFAULT_ROW_KEY.to_string();
    }

    pub fn is_view_editing_unlocked(&self) -> bool {
        self.unlock_view_pk != DEFAULT_ROW_KEY
    }

    /// Rules of one format target, empty when none exist
    pub fn format_rules(&self, target: FormatTarget) -> &[FormatRule] {
        match target {
            FormatTarget::Column(column) => self
                .column_formats
                .get(&column)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            FormatTarget::RowId => &self.row_id_formats,
        }
    }

    /// Mutable rules of one format target, created on demand
    pub fn format_rules_mut(&mut self, target: FormatTarget) -> &mut Vec<FormatRule> {
        match target {
            FormatTarget::Column(column) => self.column_formats.entry(column).or_default(),
            FormatTarget::RowId => &mut self.row_id_formats,
        }
    }

    /// Append a rule to the target's list
    pub fn add_format(&mut self, target: FormatTarget, rule: FormatRule) {
        self.format_rules_mut(target).push(rule);
    }

    /// Promote a filter string to a conditional format, cycling through the
    /// highlight palette for the background color.
    pub fn add_format_from_filter(&mut self, target: FormatTarget, filter: impl Into<String>) {
        let rules = self.format_rules_mut(target);
        let color = FORMAT_PALETTE[rules.len() % FORMAT_PALETTE.len()];
        rules.push(FormatRule::styled(
            filter,
            CellStyle::default().background(color),
        ));
    }

    /// Edit the first rule whose filter equals `filter`, appending a fresh
    /// rule when no such rule exists.
    pub fn upsert_format_matching_filter(
        &mut self,
        target: FormatTarget,
        filter: &str,
        edit: impl FnOnce(&mut FormatRule),
    ) {
        let rules = self.format_rules_mut(target);
        if let Some(rule) = rules.iter_mut().find(|r| r.filter == filter) {
            edit(rule);
        } else {
            let mut rule = FormatRule::new(filter);
            edit(&mut rule);
            rules.push(rule);
        }
    }

    /// Remove every format rule of one column
    pub fn clear_formats(&mut self, column: usize) {
        self.column_formats.remove(&column);
    }

    /// Remove every row-identity format rule
    pub fn clear_rowid_formats(&mut self) {
        self.row_id_formats.clear();
    }

    /// Effective style of one cell: row-identity rules are applied first,
    /// then the column's own rules layer on top of them.
    pub fn style_for_cell(
        &self,
        column: usize,
        affinity: Affinity,
        value: &Value,
        row_key: &Value,
    ) -> CellStyle {
        let mut style = style_for(&self.row_id_formats, row_key, Affinity::Numeric);
        if let Some(rules) = self.column_formats.get(&column) {
            style.merge(&style_for(rules, value, affinity));
        }
        style
    }
}
