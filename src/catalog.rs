use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Product code length used as the join key suffix. Vendor item numbers and
/// internal product codes only agree on their trailing characters.
const MAIN_CODE_LEN: usize = 5;

/// Static product knowledge: codes whose internal name doesn't match the
/// vendor's, and the headgear codes that are exempt from the
/// delivery-confirmation filter.
///
/// Defaults are compiled in; both tables can be overridden from the
/// `[catalog]` config section for testing against alternate data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductCatalog {
    pub aliases: BTreeMap<String, String>,
    pub headgear_codes: BTreeSet<String>,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        let aliases = [
            ("HCS TUBING3", "RES 37296"),
            ("HCS TUBING9", "RES 39102"),
            ("FPX HC482A", "FPHC482"),
            ("FPX HC431", "FPX HC431A"),
            ("IMX KRTUB006SS", "REPR15"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let headgear_codes = ["HCS HEADGEAR", "HCS A7035"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            aliases,
            headgear_codes,
        }
    }
}

impl ProductCatalog {
    /// Resolve a product code through the alias table (exact match only).
    pub fn canonical_code<'a>(&'a self, product_code: &'a str) -> &'a str {
        self.aliases
            .get(product_code)
            .map(String::as_str)
            .unwrap_or(product_code)
    }

    /// Derive the join key for an open-order product code: alias
    /// substitution first, then the trailing-suffix cut.
    pub fn derive_main_code(&self, product_code: &str) -> String {
        last_chars(self.canonical_code(product_code), MAIN_CODE_LEN)
    }

    pub fn is_headgear(&self, product_code: &str) -> bool {
        self.headgear_codes.contains(product_code)
    }
}

/// Last `n` characters of a string (the whole string if shorter).
pub fn last_chars(s: &str, n: usize) -> String {
    let len = s.chars().count();
    s.chars().skip(len.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_before_suffix() {
        let catalog = ProductCatalog::default();
        // "HCS TUBING3" maps to "RES 37296", and the key is the alias suffix
        assert_eq!(catalog.derive_main_code("HCS TUBING3"), "37296");
    }

    #[test]
    fn unknown_code_keeps_its_own_suffix() {
        let catalog = ProductCatalog::default();
        assert_eq!(catalog.derive_main_code("RES 63801"), "63801");
        assert_eq!(catalog.derive_main_code("ABC"), "ABC");
    }

    #[test]
    fn headgear_membership() {
        let catalog = ProductCatalog::default();
        assert!(catalog.is_headgear("HCS HEADGEAR"));
        assert!(catalog.is_headgear("HCS A7035"));
        assert!(!catalog.is_headgear("HCS TUBING3"));
    }

    #[test]
    fn last_chars_is_char_aware() {
        assert_eq!(last_chars("ABCDE-12345", 5), "12345");
        assert_eq!(last_chars("αβγδεζ", 5), "βγδεζ");
    }
}
