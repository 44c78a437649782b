//! Country identifier resolution.
//!
//! Sources identify countries either by ISO3 code or by a display name in
//! one of several spellings. [`CountryCoder`] maps both to ISO3; names are
//! matched after normalisation (case, accents, punctuation), first against
//! the classification reference, then against a fixed alias table.

use crate::classification::ClassificationTable;
use crate::constants::COUNTRY_NAME_ALIASES;
use std::collections::BTreeMap;

/// Name and code lookup to ISO3
#[derive(Debug, Clone, Default)]
pub struct CountryCoder {
    names: BTreeMap<String, String>,
}

impl CountryCoder {
    /// Coder knowing only the built-in aliases
    pub fn with_aliases() -> Self {
        let mut coder = Self::default();
        coder.extend(COUNTRY_NAME_ALIASES.iter().copied());
        coder
    }

    /// Coder knowing every classification name plus the built-in aliases
    pub fn from_classification(table: &ClassificationTable) -> Self {
        let mut coder = Self::with_aliases();
        coder.extend(table.country_names());
        coder
    }

    /// Add name → ISO3 pairs; earlier entries win on a normalised clash
    pub fn extend<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (name, code) in pairs {
            let key = normalize_name(name);
            if key.is_empty() {
                continue;
            }
            if let Some(code) = normalize_code(code) {
                self.names.entry(key).or_insert(code);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a country display name
    pub fn resolve_name(&self, name: &str) -> Option<String> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.names.get(&key).cloned()
    }

    /// Validate and normalise a code column value
    pub fn resolve_code(&self, code: &str) -> Option<String> {
        normalize_code(code)
    }
}

/// Trimmed, upper-cased ISO3 code, or `None` if not three ASCII letters
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lower-case, fold accents, turn punctuation into single spaces
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Côte d'Ivoire "), "cote d ivoire");
        assert_eq!(normalize_name("São Tomé and Príncipe"), "sao tome and principe");
        assert_eq!(normalize_name("Korea, Rep."), "korea rep");
        assert_eq!(normalize_name(" - "), "");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ken "), Some("KEN".to_string()));
        assert_eq!(normalize_code("XKX"), Some("XKX".to_string()));
        assert_eq!(normalize_code("KE"), None);
        assert_eq!(normalize_code("K3N"), None);
        assert_eq!(normalize_code(""), None);
    }

    #[test]
    fn test_aliases_resolve_known_misspellings() {
        let coder = CountryCoder::with_aliases();
        assert_eq!(coder.resolve_name("Syrua"), Some("SYR".to_string()));
        assert_eq!(coder.resolve_name("vietnam"), Some("VNM".to_string()));
        assert_eq!(coder.resolve_name("Kosovo"), Some("XKX".to_string()));
        assert_eq!(coder.resolve_name("Republika Srpska"), Some("BIH".to_string()));
        assert_eq!(coder.resolve_name("Atlantis"), None);
        assert_eq!(coder.resolve_name(""), None);
    }

    #[test]
    fn test_extend_keeps_first_mapping() {
        let mut coder = CountryCoder::default();
        coder.extend([("Kenya", "ken"), ("KENYA", "XXX"), ("Nowhere", "12")]);
        assert_eq!(coder.len(), 1);
        assert_eq!(coder.resolve_name("kenya"), Some("KEN".to_string()));
    }
}
