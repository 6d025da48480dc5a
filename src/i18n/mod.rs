//! Internationalization (i18n) support for govnews
//!
//! User-facing error and status messages are localized. Supported languages:
//! Turkish (tr, the default) and English (en).
//!
//! # Environment Variables
//!
//! - `GOVNEWS_LANG`: Set the preferred language (tr, en). Defaults to Turkish.
//!
//! # Usage
//!
//! ```rust,ignore
//! use govnews::i18n::{t, set_locale};
//!
//! set_locale("en");
//! let msg = t!("errors.timeout");
//! ```

// Note: rust_i18n::i18n! macro is declared in lib.rs (crate root)

/// Default locale when nothing else is configured
pub const DEFAULT_LOCALE: &str = "tr";

/// Set the current locale for translations
///
/// # Arguments
///
/// * `locale` - Language code (tr, en) or a regional variant (tr-TR, en_US)
pub fn set_locale(locale: &str) {
    let normalized = normalize_locale(locale);
    rust_i18n::set_locale(normalized);
}

/// Get the current locale
pub fn current_locale() -> String {
    (*rust_i18n::locale()).to_string()
}

/// Initialize i18n from environment variables
///
/// Reads `GOVNEWS_LANG` to set the locale, falling back to Turkish.
pub fn init_from_env() {
    let locale = std::env::var("GOVNEWS_LANG").unwrap_or_else(|_| DEFAULT_LOCALE.to_string());
    set_locale(&locale);
}

/// Normalize locale code to a supported locale
///
/// - tr-TR, tr_TR, turkish -> tr
/// - en-US, en_GB, english -> en
/// - anything else -> tr
pub fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.to_lowercase();

    if lower.starts_with("en") || lower == "english" {
        "en"
    } else {
        DEFAULT_LOCALE
    }
}

/// Translate a key with optional parameters
///
/// Re-export of `rust_i18n::t!`.
///
/// ```rust,ignore
/// let msg = t!("errors.rate_limit_retry", seconds = 30);
/// let english = t!("errors.timeout", locale = "en");
/// ```
#[doc(inline)]
pub use rust_i18n::t;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("tr"), "tr");
        assert_eq!(normalize_locale("tr-TR"), "tr");
        assert_eq!(normalize_locale("turkish"), "tr");

        assert_eq!(normalize_locale("en"), "en");
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale("english"), "en");

        assert_eq!(normalize_locale("de"), "tr");
    }

    #[test]
    fn test_explicit_locale_translation() {
        let en = t!("errors.timeout", locale = "en");
        let tr = t!("errors.timeout", locale = "tr");
        assert!(en.contains("timed out"));
        assert!(tr.contains("zaman aşımı"));
    }
}
