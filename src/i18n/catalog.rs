//! Language catalog: the ordered set of languages offered for selection.
//!
//! The catalog is built once by the composition root and shared read-only.
//! Insertion order is display order.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VidtransError};

/// One selectable language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    /// Short language code (e.g. "en", "mn")
    pub code: String,

    /// Name of the language in its own script (e.g. "Монгол")
    pub display_name: String,

    /// Glyph shown next to the name, usually a flag
    #[serde(default)]
    pub glyph: String,

    /// Value the backend expects in form fields (e.g. "Mongolian").
    /// Falls back to the display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
}

impl LanguageOption {
    pub fn new(code: &str, display_name: &str, glyph: &str, wire_name: &str) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            glyph: glyph.to_string(),
            wire_name: Some(wire_name.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.display_name)
    }

    /// "🇲🇳 Монгол"
    pub fn label(&self) -> String {
        if self.glyph.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} {}", self.glyph, self.display_name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    languages: Vec<LanguageOption>,
}

impl LanguageCatalog {
    /// Build a catalog from an explicit list. Codes must be non-empty and unique.
    pub fn new(languages: Vec<LanguageOption>) -> Result<Self> {
        let mut catalog = Self {
            languages: Vec::with_capacity(languages.len()),
        };
        for language in languages {
            catalog.push(language)?;
        }
        Ok(catalog)
    }

    /// Built-in languages followed by `extra`, in that order.
    pub fn with_extra(extra: &[LanguageOption]) -> Result<Self> {
        let mut catalog = Self::default();
        for language in extra {
            catalog.push(language.clone())?;
        }
        Ok(catalog)
    }

    fn push(&mut self, language: LanguageOption) -> Result<()> {
        if language.code.trim().is_empty() {
            return Err(VidtransError::Config(
                "Language entry with an empty code".to_string(),
            ));
        }
        if self.contains(&language.code) {
            return Err(VidtransError::Config(format!(
                "Duplicate language code '{}'",
                language.code
            )));
        }
        self.languages.push(language);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&LanguageOption> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Like `get`, but an absent or empty code is an error.
    pub fn require(&self, code: &str) -> Result<&LanguageOption> {
        if code.trim().is_empty() {
            return Err(VidtransError::Validation("Language not selected".to_string()));
        }
        self.get(code)
            .ok_or_else(|| VidtransError::UnknownLanguage(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageOption> {
        self.languages.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self {
            languages: vec![
                LanguageOption::new("en", "English", "🇺🇸", "English"),
                LanguageOption::new("mn", "Монгол", "🇲🇳", "Mongolian"),
                LanguageOption::new("ja", "日本語", "🇯🇵", "Japanese"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let catalog = LanguageCatalog::default();
        assert_eq!(catalog.codes(), vec!["en", "mn", "ja"]);
    }

    #[test]
    fn test_get_and_wire_name() {
        let catalog = LanguageCatalog::default();
        let mongolian = catalog.get("mn").unwrap();
        assert_eq!(mongolian.display_name, "Монгол");
        assert_eq!(mongolian.wire_name(), "Mongolian");
        assert_eq!(mongolian.label(), "🇲🇳 Монгол");
        assert!(catalog.get("fr").is_none());
    }

    #[test]
    fn test_require_distinguishes_empty_and_unknown() {
        let catalog = LanguageCatalog::default();
        assert!(matches!(catalog.require(""), Err(VidtransError::Validation(_))));
        assert!(matches!(
            catalog.require("fr"),
            Err(VidtransError::UnknownLanguage(_))
        ));
        assert_eq!(catalog.require("ja").unwrap().code, "ja");
    }

    #[test]
    fn test_with_extra_appends_in_order() {
        let extra = vec![LanguageOption {
            code: "fr".to_string(),
            display_name: "Français".to_string(),
            glyph: String::new(),
            wire_name: None,
        }];
        let catalog = LanguageCatalog::with_extra(&extra).unwrap();
        assert_eq!(catalog.codes(), vec!["en", "mn", "ja", "fr"]);
        let french = catalog.get("fr").unwrap();
        assert_eq!(french.wire_name(), "Français");
        assert_eq!(french.label(), "Français");
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let extra = vec![LanguageOption::new("en", "English", "", "English")];
        assert!(matches!(
            LanguageCatalog::with_extra(&extra),
            Err(VidtransError::Config(_))
        ));
    }

    #[test]
    fn test_empty_code_rejected() {
        let result = LanguageCatalog::new(vec![LanguageOption::new(" ", "Blank", "", "Blank")]);
        assert!(result.is_err());
    }
}
