//! Deterministic colors for category labels.
//!
//! A label is resolved to a color with the following chain, the first match winning:
//!
//! 1. an explicit override provided by the caller (exact, lowercase, then normalized label),
//! 2. the semantic dictionary of the theme ("yes", "high", "n/a", ...),
//! 3. the neutral gray of the theme, when the caller asks for neutral mode,
//! 4. a palette slot chosen by hashing the label and the salt.
//!
//! The result is then checked one last time so that an invisible color is never returned.
//!
//! ```
//! use survey_insights::{compute_color_for_label, ColorRequest};
//!
//! assert_eq!(compute_color_for_label(&ColorRequest::new("Yes")), "#16a34a");
//! assert_eq!(compute_color_for_label(&ColorRequest::new("Yes").dark(true)), "#22c55e");
//! ```

use log::{debug, warn};
use std::collections::HashMap;

use crate::config::ThemeMode;
use crate::palette::{ThemeTable, ThemeTables, FALLBACK_GRAY};

/// The inputs of a color resolution.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColorRequest<'a> {
    pub label: &'a str,
    pub lowercase_label: String,
    pub normalized_label: String,
    pub override_map: Option<&'a HashMap<String, String>>,
    /// Set for fields without categorical meaning (free text).
    pub neutral_mode: bool,
    pub color_salt: u32,
    pub is_dark_mode: bool,
}

impl<'a> ColorRequest<'a> {
    pub fn new(label: &'a str) -> ColorRequest<'a> {
        ColorRequest {
            label,
            lowercase_label: label.trim().to_lowercase(),
            normalized_label: normalize_label(label),
            override_map: None,
            neutral_mode: false,
            color_salt: 0,
            is_dark_mode: false,
        }
    }

    pub fn overrides(self, override_map: &'a HashMap<String, String>) -> ColorRequest<'a> {
        ColorRequest {
            override_map: Some(override_map),
            ..self
        }
    }

    pub fn neutral(self, neutral_mode: bool) -> ColorRequest<'a> {
        ColorRequest {
            neutral_mode,
            ..self
        }
    }

    pub fn salt(self, color_salt: u32) -> ColorRequest<'a> {
        ColorRequest { color_salt, ..self }
    }

    pub fn dark(self, is_dark_mode: bool) -> ColorRequest<'a> {
        ColorRequest {
            is_dark_mode,
            ..self
        }
    }

    pub fn theme(&self) -> ThemeMode {
        ThemeMode::from_dark_flag(self.is_dark_mode)
    }
}

/// Resolves colors against a set of theme tables.
#[derive(Debug, Clone, Copy)]
pub struct ColorResolver<'t> {
    tables: &'t ThemeTables,
}

impl Default for ColorResolver<'static> {
    fn default() -> Self {
        ColorResolver::new(ThemeTables::standard())
    }
}

impl<'t> ColorResolver<'t> {
    pub fn new(tables: &'t ThemeTables) -> ColorResolver<'t> {
        ColorResolver { tables }
    }

    pub fn tables(&self) -> &'t ThemeTables {
        self.tables
    }

    /// Returns a visible color for the request. This never fails.
    pub fn resolve(&self, req: &ColorRequest) -> String {
        let table = self.tables.table(req.theme());
        let chosen = self
            .override_color(req, table)
            .or_else(|| semantic_color(req, table))
            .or_else(|| {
                if req.neutral_mode {
                    Some(table.neutral.clone())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| self.palette_color(req, table));
        self.guard(chosen, req, table)
    }

    /// The palette slot of a label. It does not depend on the theme.
    pub fn palette_slot(&self, label: &str, color_salt: u32) -> usize {
        palette_index(label, color_salt, self.tables.palette_len())
    }

    fn override_color(&self, req: &ColorRequest, table: &ThemeTable) -> Option<String> {
        let overrides = req.override_map?;
        let raw = overrides
            .get(req.label)
            .or_else(|| overrides.get(&req.lowercase_label))
            .or_else(|| overrides.get(&req.normalized_label))?;
        let res = normalize_effective_color(raw, table);
        if res.is_none() {
            warn!(
                "resolve: ignoring unusable override {:?} for label {:?}",
                raw, req.label
            );
        }
        res
    }

    fn palette_color(&self, req: &ColorRequest, table: &ThemeTable) -> String {
        let idx = self.palette_slot(req.label, req.color_salt);
        debug!(
            "palette_color: label {:?} salt {} -> slot {}",
            req.label, req.color_salt, idx
        );
        table.palette[idx].clone()
    }

    fn guard(&self, chosen: String, req: &ColorRequest, table: &ThemeTable) -> String {
        if !is_invisible_color(&chosen) {
            return chosen;
        }
        warn!(
            "resolve: color {:?} for label {:?} is not visible, substituting",
            chosen, req.label
        );
        let substitute = if req.neutral_mode {
            table.neutral.clone()
        } else {
            self.palette_color(req, table)
        };
        if !is_invisible_color(&substitute) {
            substitute
        } else if !is_invisible_color(&table.neutral) {
            table.neutral.clone()
        } else {
            FALLBACK_GRAY.to_string()
        }
    }
}

/// Resolves a color with the built-in tables.
pub fn compute_color_for_label(req: &ColorRequest) -> String {
    ColorResolver::default().resolve(req)
}

fn semantic_color(req: &ColorRequest, table: &ThemeTable) -> Option<String> {
    table
        .semantic
        .get(&req.lowercase_label)
        .or_else(|| table.semantic.get(&req.normalized_label))
        .cloned()
}

/// Polynomial hash over the UTF-16 code units of the label, with 32-bit wrapping.
pub fn label_hash(label: &str) -> i32 {
    label
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

/// A salt derived from some context (typically a field id), so that the same
/// label in two contexts may land in different palette slots.
pub fn hash_salt_from(text: &str) -> u32 {
    label_hash(text).unsigned_abs()
}

/// The palette slot for a label: `|hash(label) + salt| mod len`.
pub fn palette_index(label: &str, color_salt: u32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mixed = (label_hash(label) as i64 + color_salt as i64).unsigned_abs();
    (mixed % len as u64) as usize
}

/// Lowercases the label and collapses every run of non-alphanumeric
/// characters into a single space.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Turns a user-provided color into a color usable with the given table.
///
/// Named tokens are mapped to the hex value of the table. Invisible or
/// malformed colors are rejected.
pub fn normalize_effective_color(raw: &str, table: &ThemeTable) -> Option<String> {
    let key = raw.trim().to_lowercase();
    if let Some(hex) = table.named.get(&key) {
        return Some(hex.clone());
    }
    if is_invisible_color(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// True if the color would not show up when rendered: transparent keywords,
/// zero alpha in hex or functional notations, or a malformed value.
pub fn is_invisible_color(color: &str) -> bool {
    let c = color.trim().to_lowercase();
    if c.is_empty() {
        return true;
    }
    if matches!(c.as_str(), "transparent" | "none" | "inherit") {
        return true;
    }
    if let Some(hex) = c.strip_prefix('#') {
        if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return true;
        }
        return match hex.len() {
            3 | 6 => false,
            4 => hex.ends_with('0'),
            8 => hex.ends_with("00"),
            _ => true,
        };
    }
    for prefix in ["rgba(", "rgb(", "hsla(", "hsl("] {
        if let Some(rest) = c.strip_prefix(prefix) {
            return match rest.strip_suffix(')') {
                Some(args) => functional_alpha_is_zero(args),
                None => true,
            };
        }
    }
    // Anything else must look like a CSS color keyword.
    !c.chars().all(|ch| ch.is_ascii_alphabetic())
}

// Alpha of `r, g, b, a` or `r g b / a`. A missing alpha is opaque.
fn functional_alpha_is_zero(args: &str) -> bool {
    let alpha = if let Some((_, a)) = args.split_once('/') {
        Some(a)
    } else {
        let parts: Vec<&str> = args.split(',').collect();
        match parts.len() {
            4 => Some(parts[3]),
            3 | 1 => None,
            _ => return true,
        }
    };
    match alpha.map(|a| a.trim()) {
        None => false,
        Some(a) => {
            let parsed = match a.strip_suffix('%') {
                Some(p) => p.trim().parse::<f64>().map(|v| v / 100.0),
                None => a.parse::<f64>(),
            };
            match parsed {
                Ok(v) => v.is_nan() || v <= 0.0,
                Err(_) => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn yes_is_green_in_both_themes() {
        assert_eq!(compute_color_for_label(&ColorRequest::new("Yes")), "#16a34a");
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("Yes").dark(true)),
            "#22c55e"
        );
    }

    #[test]
    fn semantic_lookup_ignores_case() {
        for dark in [false, true] {
            let reference = compute_color_for_label(&ColorRequest::new("high").dark(dark));
            for label in ["High", "HIGH", " high "] {
                assert_eq!(
                    compute_color_for_label(&ColorRequest::new(label).dark(dark)),
                    reference
                );
            }
        }
    }

    #[test]
    fn semantic_families() {
        let t = ThemeTables::standard().table(ThemeMode::Light);
        assert_eq!(compute_color_for_label(&ColorRequest::new("No")), "#dc2626");
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("Moderate")),
            "#d97706"
        );
        assert_eq!(compute_color_for_label(&ColorRequest::new("N/A")), t.neutral);
        assert_eq!(compute_color_for_label(&ColorRequest::new("Mixed")), "#2563eb");
        // Found through the normalized form.
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("Very-High")),
            "#dc2626"
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut overrides = HashMap::new();
        overrides.insert("Beta".to_string(), "purple".to_string());
        for label in ["Alpha", "Beta", "Other", "", "日本語", "Very high"] {
            for salt in [0, 7, u32::MAX] {
                for dark in [false, true] {
                    let req = ColorRequest::new(label)
                        .overrides(&overrides)
                        .salt(salt)
                        .dark(dark);
                    assert_eq!(
                        compute_color_for_label(&req),
                        compute_color_for_label(&req.clone())
                    );
                }
            }
        }
    }

    #[test]
    fn results_are_never_invisible() {
        init();
        let mut overrides = HashMap::new();
        overrides.insert("a".to_string(), "transparent".to_string());
        overrides.insert("b".to_string(), "#fff0".to_string());
        overrides.insert("c".to_string(), "rgba(1, 2, 3, 0)".to_string());
        overrides.insert("d".to_string(), "hsla(10 20% 30% / 0%)".to_string());
        overrides.insert("e".to_string(), "#12345".to_string());
        for label in ["a", "b", "c", "d", "e", "f", "yes"] {
            for neutral in [false, true] {
                for dark in [false, true] {
                    let req = ColorRequest::new(label)
                        .overrides(&overrides)
                        .neutral(neutral)
                        .dark(dark);
                    assert!(!is_invisible_color(&compute_color_for_label(&req)));
                }
            }
        }
    }

    #[test]
    fn palette_slot_does_not_depend_on_theme() {
        let resolver = ColorResolver::default();
        let tables = ThemeTables::standard();
        for label in ["Alpha", "Beta", "Gamma", "Option 12"] {
            let salt = hash_salt_from("field-1");
            let idx = resolver.palette_slot(label, salt);
            let light = resolver.resolve(&ColorRequest::new(label).salt(salt));
            let dark = resolver.resolve(&ColorRequest::new(label).salt(salt).dark(true));
            assert_eq!(light, tables.table(ThemeMode::Light).palette[idx]);
            assert_eq!(dark, tables.table(ThemeMode::Dark).palette[idx]);
        }
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(label_hash(""), 0);
        assert_eq!(label_hash("A"), 65);
        assert_eq!(label_hash("Ab"), 65 * 31 + 98);
        assert_eq!(palette_index("A", 0, 12), 5);
        assert_eq!(palette_index("Ab", 0, 12), 1);
        assert_eq!(palette_index("A", 3, 12), 8);
        assert_eq!(compute_color_for_label(&ColorRequest::new("A")), "#0891b2");
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("A").dark(true)),
            "#06b6d4"
        );
    }

    #[test]
    fn hash_wraps_on_long_labels() {
        let long = "a very long option label that overflows 32 bits many times over";
        assert!(palette_index(long, u32::MAX, 12) < 12);
        assert_eq!(
            palette_index(long, 5, 12),
            ((label_hash(long) as i64 + 5).unsigned_abs() % 12) as usize
        );
    }

    #[test]
    fn salt_separates_fields() {
        assert_eq!(hash_salt_from("A"), 65);
        let a = hash_salt_from("satisfaction");
        let b = hash_salt_from("department");
        assert_ne!(a, b);
        assert_eq!(a, hash_salt_from("satisfaction"));
    }

    #[test]
    fn transparent_override_falls_through() {
        let mut overrides = HashMap::new();
        overrides.insert("Yes".to_string(), "#00000000".to_string());
        overrides.insert("Alpha".to_string(), "#00000000".to_string());
        let yes = ColorRequest::new("Yes").overrides(&overrides);
        assert_eq!(compute_color_for_label(&yes), "#16a34a");
        let alpha = ColorRequest::new("Alpha").overrides(&overrides);
        assert_eq!(
            compute_color_for_label(&alpha),
            compute_color_for_label(&ColorRequest::new("Alpha"))
        );
    }

    #[test]
    fn overrides_win_and_use_named_tokens() {
        let mut overrides = HashMap::new();
        overrides.insert("yes".to_string(), "Blue".to_string());
        overrides.insert("fast lane".to_string(), "#123456".to_string());
        let light = ColorRequest::new("YES").overrides(&overrides);
        assert_eq!(compute_color_for_label(&light), "#2563eb");
        let dark = ColorRequest::new("YES").overrides(&overrides).dark(true);
        assert_eq!(compute_color_for_label(&dark), "#3b82f6");
        let normalized = ColorRequest::new("Fast-Lane!").overrides(&overrides);
        assert_eq!(compute_color_for_label(&normalized), "#123456");
    }

    #[test]
    fn neutral_mode_uses_gray_after_semantics() {
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("Something typed").neutral(true)),
            "#6b7280"
        );
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("Something typed").neutral(true).dark(true)),
            "#9ca3af"
        );
        // Semantic labels still take precedence.
        assert_eq!(
            compute_color_for_label(&ColorRequest::new("yes").neutral(true)),
            "#16a34a"
        );
    }

    #[test]
    fn invisible_patterns() {
        for c in [
            "",
            "transparent",
            "NONE",
            "inherit",
            "#0000",
            "#abc0",
            "#11223300",
            "rgba(0,0,0,0)",
            "rgba(10, 10, 10, -1)",
            "rgb(1 2 3 / 0)",
            "hsla(120, 50%, 50%, 0%)",
            "rgba(1,2,3",
            "#ggg",
            "#12345",
            "not a color",
        ] {
            assert!(is_invisible_color(c), "{:?} should be invisible", c);
        }
        for c in [
            "#abc",
            "#abcf",
            "#a1b2c3",
            "#a1b2c380",
            "rgb(1, 2, 3)",
            "rgba(1, 2, 3, 0.5)",
            "hsl(120 50% 50%)",
            "hsla(120, 50%, 50%, 10%)",
            "rebeccapurple",
        ] {
            assert!(!is_invisible_color(c), "{:?} should be visible", c);
        }
    }

    #[test]
    fn effective_color_normalization() {
        let light = ThemeTables::standard().table(ThemeMode::Light);
        assert_eq!(
            normalize_effective_color(" Green ", light),
            Some("#16a34a".to_string())
        );
        assert_eq!(
            normalize_effective_color("#ABCDEF", light),
            Some("#ABCDEF".to_string())
        );
        assert_eq!(normalize_effective_color("transparent", light), None);
        assert_eq!(normalize_effective_color("#00000000", light), None);
    }

    #[test]
    fn custom_tables_are_used() {
        let tables = ThemeTables::with_palettes(
            &["#111111".to_string(), "#222222".to_string()],
            &["#eeeeee".to_string(), "#dddddd".to_string()],
        )
        .unwrap();
        let resolver = ColorResolver::new(&tables);
        // hash("A") = 65, 65 mod 2 = 1
        assert_eq!(resolver.resolve(&ColorRequest::new("A")), "#222222");
        assert_eq!(resolver.resolve(&ColorRequest::new("A").dark(true)), "#dddddd");
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label("  Very--High! "), "very high");
        assert_eq!(normalize_label("N/A"), "n a");
        assert_eq!(normalize_label("***"), "");
    }
}
