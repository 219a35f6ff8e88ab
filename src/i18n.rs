use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::OnceLock;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// JSON-backed localizer. Message tables are compiled into the binary;
/// lookups fall back to English, then to the key itself.
static EN: OnceLock<HashMap<String, String>> = OnceLock::new();
static VI: OnceLock<HashMap<String, String>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Vi,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Vi => "vi",
        }
    }

    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim_start().to_ascii_lowercase().starts_with("vi") => Lang::Vi,
            _ => Lang::En,
        }
    }

    fn table(self) -> &'static HashMap<String, String> {
        match self {
            Lang::En => EN.get_or_init(|| load(include_str!("i18n/en.json"))),
            Lang::Vi => VI.get_or_init(|| load(include_str!("i18n/vi.json"))),
        }
    }
}

fn load(raw: &str) -> HashMap<String, String> {
    serde_json::from_str(raw).expect("message table is valid JSON")
}

/// Look up a message key in the requested language.
pub fn t(lang: Lang, key: &str) -> String {
    lang.table()
        .get(key)
        .or_else(|| Lang::En.table().get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Look up a message containing a `{0}` placeholder.
pub fn t1(lang: Lang, key: &str, arg: &str) -> String {
    t(lang, key).replace("{0}", arg)
}

#[async_trait]
impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("accept-language")
            .and_then(|v| v.to_str().ok());
        Ok(Lang::from_header(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_both_languages() {
        assert_eq!(t(Lang::En, "UserIsExist"), "User already exists");
        assert_eq!(t(Lang::Vi, "UserIsExist"), "Người dùng đã tồn tại");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(t(Lang::Vi, "NoSuchKey"), "NoSuchKey");
    }

    #[test]
    fn header_parsing() {
        assert_eq!(Lang::from_header(Some("vi-VN,vi;q=0.9")), Lang::Vi);
        assert_eq!(Lang::from_header(Some("en-US")), Lang::En);
        assert_eq!(Lang::from_header(None), Lang::En);
    }

    #[test]
    fn placeholder_substitution() {
        let message = t1(Lang::En, "ConfirmEmail", "https://x/confirm");
        assert!(message.contains("https://x/confirm"));
    }
}
