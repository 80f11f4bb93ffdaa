//! Internationalization (i18n) module
//!
//! Detects the user's language and selects the matching rust-i18n locale.
//! Supports English and Chinese Simplified; strings live in `locales/*.yml`.
//! Note: Log messages remain in English for consistency.

use std::sync::OnceLock;
use tracing::debug;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    ChineseSimplified,
}

impl Language {
    /// rust-i18n locale name
    pub fn locale(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::ChineseSimplified => "zh-CN",
        }
    }
}

/// Global language instance
static LANGUAGE: OnceLock<Language> = OnceLock::new();

/// Initialize and get the current language based on system locale
pub fn get_language() -> Language {
    *LANGUAGE.get_or_init(detect_language)
}

/// Select the translation locale for the rest of the process
pub fn init_locale() {
    let language = get_language();
    rust_i18n::set_locale(language.locale());
    debug!(?language, "Locale initialized");
}

/// Detect system language, environment variables first
fn detect_language() -> Language {
    let from_env = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));

    from_env
        .or_else(sys_locale::get_locale)
        .map(|locale| language_for(&locale))
        .unwrap_or(Language::English)
}

/// Map a locale tag such as `zh_CN.UTF-8` or `en-US` to a language
pub fn language_for(locale: &str) -> Language {
    let locale = locale.to_lowercase();
    if locale.starts_with("zh") || locale.contains("hans") || locale.contains("chinese") {
        Language::ChineseSimplified
    } else {
        Language::English
    }
}
