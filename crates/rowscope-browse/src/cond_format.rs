//! Conditional-format rules and their evaluator
//!
//! A rule pairs a filter string with a partial style. Rules are kept in an
//! ordered list per column (plus one list matched against the row identity);
//! evaluation folds the list over a value, with every matching rule
//! contributing the attributes it sets and later matches overriding earlier
//! ones attribute by attribute.

use rowscope_core::{Affinity, Value};
use serde::{Deserialize, Serialize};

use crate::filter::FilterExpr;

/// Background colors cycled by [`crate::settings::BrowseSettings::add_format_from_filter`]
pub const FORMAT_PALETTE: [&str; 8] = [
    "#fff3bf", "#ffd8a8", "#ffc9c9", "#d0bfff", "#a5d8ff", "#b2f2bb", "#ffec99", "#eebefa",
];

/// Horizontal cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

/// Partial cell style. Every attribute is independently optional so rules
/// can set just a background or just a font without clobbering the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    pub foreground: Option<String>,
    pub background: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<u16>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub alignment: Option<Alignment>,
}

impl CellStyle {
    /// True when no attribute is set
    pub fn is_empty(&self) -> bool {
        *self == CellStyle::default()
    }

    /// Overlay `other` on top of this style, taking every attribute it sets
    pub fn merge(&mut self, other: &CellStyle) {
        if other.foreground.is_some() {
            self.foreground = other.foreground.clone();
        }
        if other.background.is_some() {
            self.background = other.background.clone();
        }
        if other.font_family.is_some() {
            self.font_family = other.font_family.clone();
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.alignment.is_some() {
            self.alignment = other.alignment;
        }
    }

    pub fn foreground(mut self, color: impl Into<String>) -> Self {
        self.foreground = Some(color.into());
        self
    }

    pub fn background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn font_size(mut self, size: u16) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = Some(underline);
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

/// Which rule list a format operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTarget {
    /// Rules of one column, keyed by ordinal
    Column(usize),
    /// Rules matched against the row identity value
    RowId,
}

/// One conditional-format rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatRule {
    /// Filter condition in the grid's filter grammar; empty matches all rows
    pub filter: String,
    /// Attributes applied when the condition matches
    pub style: CellStyle,
}

impl FormatRule {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            style: CellStyle::default(),
        }
    }

    pub fn styled(filter: impl Into<String>, style: CellStyle) -> Self {
        Self {
            filter: filter.into(),
            style,
        }
    }

    /// Whether this rule matches `value`. A rule whose filter fails to parse
    /// matches nothing.
    pub fn matches(&self, value: &Value, affinity: Affinity) -> bool {
        if self.filter.trim().is_empty() {
            return true;
        }
        match FilterExpr::parse(&self.filter) {
            Ok(expr) => expr.matches(value, affinity),
            Err(reason) => {
                tracing::trace!(filter = %self.filter, %reason, "format rule condition did not parse");
                false
            }
        }
    }
}

/// Fold an ordered rule list over a value. Returns an empty style when no
/// rule matches.
pub fn style_for(rules: &[FormatRule], value: &Value, affinity: Affinity) -> CellStyle {
    let mut style = CellStyle::default();
    for rule in rules {
        if rule.matches(value, affinity) {
            style.merge(&rule.style);
        }
    }
    style
}

/// Move a rule one position toward the front of its list
pub fn move_rule_up(rules: &mut [FormatRule], index: usize) {
    if index > 0 && index < rules.len() {
        rules.swap(index - 1, index);
    }
}

/// Move a rule one position toward the back of its list
pub fn move_rule_down(rules: &mut [FormatRule], index: usize) {
    if index + 1 < rules.len() {
        rules.swap(index, index + 1);
    }
}

/// Remove a rule by position; out-of-range indices are ignored
pub fn remove_rule(rules: &mut Vec<FormatRule>, index: usize) {
    if index < rules.len() {
        rules.remove(index);
    }
}
