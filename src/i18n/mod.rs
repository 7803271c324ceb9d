//! Languages and localized strings.
//!
//! - `catalog`: the ordered, immutable list of selectable languages
//! - `strings`: nested string tables and the dotted-key resolver
//!
//! `I18n` bundles both with the active UI language. It is constructed by the
//! composition root and passed down; there is no process-wide instance.
//!
//! ```rust,ignore
//! let i18n = I18n::new(catalog, Localizer::builtin()?, "mn")?;
//! let label = i18n.t("translate.uploadButton");
//! ```

mod catalog;
mod strings;

use std::sync::Arc;

pub use catalog::{LanguageCatalog, LanguageOption};
pub use strings::Localizer;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct I18n {
    catalog: Arc<LanguageCatalog>,
    localizer: Arc<Localizer>,
    active: String,
}

impl I18n {
    pub fn new(catalog: Arc<LanguageCatalog>, localizer: Localizer, active: &str) -> Result<Self> {
        catalog.require(active)?;
        Ok(Self {
            catalog,
            localizer: Arc::new(localizer),
            active: active.to_string(),
        })
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn active_language(&self) -> &str {
        &self.active
    }

    /// Switch the UI language. Codes outside the catalog are rejected and
    /// leave the active language unchanged.
    pub fn set_language(&mut self, code: &str) -> Result<()> {
        self.catalog.require(code)?;
        self.active = code.to_string();
        Ok(())
    }

    /// Resolve `key` for the active language.
    pub fn t(&self, key: &str) -> String {
        self.localizer.resolve(key, &self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i18n(active: &str) -> I18n {
        I18n::new(
            Arc::new(LanguageCatalog::default()),
            Localizer::builtin().unwrap(),
            active,
        )
        .unwrap()
    }

    #[test]
    fn test_t_uses_active_language() {
        let mut i18n = i18n("en");
        assert_eq!(i18n.t("header.newVideo"), "New video");
        i18n.set_language("ja").unwrap();
        assert_eq!(i18n.t("header.newVideo"), "新しい動画");
    }

    #[test]
    fn test_set_language_rejects_unknown_code() {
        let mut i18n = i18n("mn");
        assert!(i18n.set_language("fr").is_err());
        assert_eq!(i18n.active_language(), "mn");
    }

    #[test]
    fn test_new_rejects_unknown_active_language() {
        let result = I18n::new(
            Arc::new(LanguageCatalog::default()),
            Localizer::empty(),
            "xx",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_language_without_table_falls_back_to_key() {
        let extra = vec![LanguageOption::new("fr", "Français", "🇫🇷", "French")];
        let catalog = Arc::new(LanguageCatalog::with_extra(&extra).unwrap());
        let i18n = I18n::new(catalog, Localizer::builtin().unwrap(), "fr").unwrap();
        assert_eq!(i18n.t("nav.home"), "nav.home");
    }
}
