//! Locales and message catalogs.
//!
//! Catalogs are JSON documents compiled into the binary. Keys are dotted
//! paths (`cart.empty`); lookups fall back from the requested locale to
//! English and finally to the key itself.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Ar, Locale::En];

    /// Accepts bare codes and region-qualified tags (`ar-EG`, `en_US`).
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "ar" => Some(Self::Ar),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// First supported language in an `Accept-Language` header, honoring q-values.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut candidates: Vec<(f32, Locale)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let locale = Self::parse(pieces.next()?)?;
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q=").and_then(|v| v.parse::<f32>().ok()))
                    .unwrap_or(1.0);
                (q > 0.0).then_some((q, locale))
            })
            .collect();
        // Stable sort keeps header order for equal weights.
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        candidates.first().map(|(_, l)| *l)
    }

    pub fn code(&self) -> &'static str {
        match self { Self::Ar => "ar", Self::En => "en" }
    }

    pub fn direction(&self) -> TextDirection {
        match self { Self::Ar => TextDirection::Rtl, Self::En => TextDirection::Ltr }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection { Rtl, Ltr }

static AR: Lazy<Value> = Lazy::new(|| parse_catalog(include_str!("messages/ar.json")));
static EN: Lazy<Value> = Lazy::new(|| parse_catalog(include_str!("messages/en.json")));

fn parse_catalog(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!(error = %e, "message catalog is not valid JSON");
        Value::Object(Default::default())
    })
}

pub fn catalog(locale: Locale) -> &'static Value {
    match locale {
        Locale::Ar => &AR,
        Locale::En => &EN,
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(root, |node, segment| node.get(segment))
}

/// Translated string for `key`, falling back to English and then to the key.
pub fn t(locale: Locale, key: &str) -> String {
    lookup(catalog(locale), key)
        .and_then(Value::as_str)
        .or_else(|| lookup(catalog(Locale::En), key).and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| key.to_owned())
}

/// Translated string with `{name}` placeholders replaced.
pub fn t_with(locale: Locale, key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(locale, key), |acc, (name, value)| acc.replace(&format!("{{{name}}}"), value))
}

pub const PAGE_SLUGS: [&str; 4] = ["about", "brands", "projects", "contact"];

/// A localized marketing page.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub slug: String,
    pub locale: Locale,
    pub direction: TextDirection,
    pub title: String,
    pub body: Value,
}

pub fn page(locale: Locale, slug: &str) -> Option<Page> {
    if !PAGE_SLUGS.contains(&slug) { return None; }
    let key = format!("pages.{slug}");
    let body = lookup(catalog(locale), &key).or_else(|| lookup(catalog(Locale::En), &key))?.clone();
    Some(Page {
        slug: slug.to_owned(),
        locale,
        direction: locale.direction(),
        title: t(locale, &format!("{key}.title")),
        body,
    })
}
