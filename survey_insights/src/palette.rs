// Light and dark color tables.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::colors::is_invisible_color;
use crate::config::{PaletteError, ThemeMode};

/// Last-resort gray, used only if every table lookup produced an invisible color.
pub const FALLBACK_GRAY: &str = "#6b7280";

const LIGHT_PALETTE: [&str; 12] = [
    "#2563eb", // blue
    "#dc2626", // red
    "#16a34a", // green
    "#d97706", // amber
    "#9333ea", // purple
    "#0891b2", // cyan
    "#db2777", // pink
    "#65a30d", // lime
    "#ea580c", // orange
    "#4f46e5", // indigo
    "#0d9488", // teal
    "#c026d3", // fuchsia
];

// Same hues as LIGHT_PALETTE, slot for slot.
const DARK_PALETTE: [&str; 12] = [
    "#3b82f6", "#ef4444", "#22c55e", "#f59e0b", "#a855f7", "#06b6d4", "#ec4899", "#84cc16",
    "#f97316", "#6366f1", "#14b8a6", "#d946ef",
];

// (token, light, dark)
const NAMED_COLORS: [(&str, &str, &str); 16] = [
    ("red", "#dc2626", "#ef4444"),
    ("orange", "#ea580c", "#f97316"),
    ("amber", "#d97706", "#f59e0b"),
    ("yellow", "#ca8a04", "#eab308"),
    ("lime", "#65a30d", "#84cc16"),
    ("green", "#16a34a", "#22c55e"),
    ("teal", "#0d9488", "#14b8a6"),
    ("cyan", "#0891b2", "#06b6d4"),
    ("blue", "#2563eb", "#3b82f6"),
    ("indigo", "#4f46e5", "#6366f1"),
    ("purple", "#9333ea", "#a855f7"),
    ("pink", "#db2777", "#ec4899"),
    ("gray", "#6b7280", "#9ca3af"),
    ("grey", "#6b7280", "#9ca3af"),
    ("black", "#111827", "#f9fafb"),
    ("white", "#f9fafb", "#111827"),
];

// (term, light, dark)
const SEMANTIC_COLORS: [(&str, &str, &str); 17] = [
    ("critical", "#b91c1c", "#f87171"),
    ("very high", "#dc2626", "#ef4444"),
    ("high", "#ef4444", "#f87171"),
    ("medium", "#d97706", "#f59e0b"),
    ("moderate", "#d97706", "#f59e0b"),
    ("low", "#16a34a", "#22c55e"),
    ("very low", "#15803d", "#4ade80"),
    ("yes", "#16a34a", "#22c55e"),
    ("true", "#16a34a", "#22c55e"),
    ("no", "#dc2626", "#ef4444"),
    ("false", "#dc2626", "#ef4444"),
    ("not important", "#6b7280", "#9ca3af"),
    ("none", "#6b7280", "#9ca3af"),
    ("n/a", "#6b7280", "#9ca3af"),
    ("both", "#2563eb", "#3b82f6"),
    ("mixed", "#2563eb", "#3b82f6"),
    ("neutral", "#6b7280", "#9ca3af"),
];

const LIGHT_NEUTRAL: &str = "#6b7280";
const DARK_NEUTRAL: &str = "#9ca3af";

/// The tables for one theme.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ThemeTable {
    pub palette: Vec<String>,
    /// Named color tokens (lowercase) to hex.
    pub named: HashMap<String, String>,
    /// Lowercase semantic labels to hex.
    pub semantic: HashMap<String, String>,
    pub neutral: String,
}

/// Parallel light and dark tables.
///
/// Invariant: both palettes have the same number of slots, so that a label
/// keeps its slot when the theme changes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ThemeTables {
    light: ThemeTable,
    dark: ThemeTable,
}

impl ThemeTables {
    /// Validates and assembles custom tables.
    pub fn new(light: ThemeTable, dark: ThemeTable) -> Result<ThemeTables, PaletteError> {
        if light.palette.is_empty() || dark.palette.is_empty() {
            return Err(PaletteError::EmptyPalette);
        }
        if light.palette.len() != dark.palette.len() {
            return Err(PaletteError::MismatchedPalettes {
                light: light.palette.len(),
                dark: dark.palette.len(),
            });
        }
        for (name, table) in [("light", &light), ("dark", &dark)] {
            check_visible(name, &table.neutral)?;
            for c in table
                .palette
                .iter()
                .chain(table.named.values())
                .chain(table.semantic.values())
            {
                check_visible(name, c)?;
            }
        }
        Ok(ThemeTables { light, dark })
    }

    /// The built-in tables.
    pub fn standard() -> &'static ThemeTables {
        &STANDARD_TABLES
    }

    /// The default tables with the palettes replaced.
    pub fn with_palettes(light: &[String], dark: &[String]) -> Result<ThemeTables, PaletteError> {
        let std_tables = ThemeTables::standard();
        ThemeTables::new(
            ThemeTable {
                palette: light.to_vec(),
                ..std_tables.light.clone()
            },
            ThemeTable {
                palette: dark.to_vec(),
                ..std_tables.dark.clone()
            },
        )
    }

    pub fn table(&self, mode: ThemeMode) -> &ThemeTable {
        match mode {
            ThemeMode::Light => &self.light,
            ThemeMode::Dark => &self.dark,
        }
    }

    /// Number of palette slots, identical for both themes.
    pub fn palette_len(&self) -> usize {
        self.light.palette.len()
    }
}

fn check_visible(table: &'static str, color: &str) -> Result<(), PaletteError> {
    if is_invisible_color(color) {
        Err(PaletteError::InvisibleColor {
            table,
            color: color.to_string(),
        })
    } else {
        Ok(())
    }
}

fn build_table(dark: bool) -> ThemeTable {
    let pick = |l: &str, d: &str| if dark { d.to_string() } else { l.to_string() };
    let palette = if dark { DARK_PALETTE } else { LIGHT_PALETTE };
    ThemeTable {
        palette: palette.iter().map(|s| s.to_string()).collect(),
        named: NAMED_COLORS
            .iter()
            .map(|(n, l, d)| (n.to_string(), pick(l, d)))
            .collect(),
        semantic: SEMANTIC_COLORS
            .iter()
            .map(|(n, l, d)| (n.to_string(), pick(l, d)))
            .collect(),
        neutral: pick(LIGHT_NEUTRAL, DARK_NEUTRAL),
    }
}

static STANDARD_TABLES: Lazy<ThemeTables> = Lazy::new(|| ThemeTables {
    light: build_table(false),
    dark: build_table(true),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_palettes_are_parallel() {
        let t = ThemeTables::standard();
        assert_eq!(
            t.table(ThemeMode::Light).palette.len(),
            t.table(ThemeMode::Dark).palette.len()
        );
        assert_eq!(t.palette_len(), 12);
    }

    #[test]
    fn standard_tables_pass_validation() {
        let t = ThemeTables::standard();
        let rebuilt = ThemeTables::new(
            t.table(ThemeMode::Light).clone(),
            t.table(ThemeMode::Dark).clone(),
        );
        assert_eq!(rebuilt.as_ref(), Ok(t));
    }

    #[test]
    fn mismatched_palettes_are_rejected() {
        let light = vec!["#111111".to_string(), "#222222".to_string()];
        let dark = vec!["#333333".to_string()];
        assert_eq!(
            ThemeTables::with_palettes(&light, &dark),
            Err(PaletteError::MismatchedPalettes { light: 2, dark: 1 })
        );
    }

    #[test]
    fn invisible_palette_entries_are_rejected() {
        let light = vec!["#111111".to_string(), "transparent".to_string()];
        let dark = vec!["#333333".to_string(), "#444444".to_string()];
        assert!(matches!(
            ThemeTables::with_palettes(&light, &dark),
            Err(PaletteError::InvisibleColor { table: "light", .. })
        ));
    }

    #[test]
    fn empty_palettes_are_rejected() {
        assert_eq!(
            ThemeTables::with_palettes(&[], &[]),
            Err(PaletteError::EmptyPalette)
        );
    }
}
