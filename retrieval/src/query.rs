//! Helpers at the edges of resolution: decorating query text and turning
//! resolved ids into asset locations.

use std::fmt::Display;

/// Append the `" - Year: YYYY"` suffix the game adds to event and option
/// titles before resolving them.
pub fn with_year(title: &str, year: impl Display) -> String {
    format!("{title} - Year: {year}")
}

/// The year part of an ISO `YYYY-MM-DD` event date.
///
/// Years before the common era are written with a leading minus sign.
pub fn year_from_date(date: &str) -> Option<&str> {
    let date = date.trim();
    let digits_start = usize::from(date.starts_with('-'));
    let end = date[digits_start..]
        .find('-')
        .map_or(date.len(), |i| i + digits_start);
    let year = &date[..end];
    let digits = &year[digits_start..];
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(year)
}

/// Decorate `title` with the year of `date` when one can be read from it.
pub fn decorate(title: &str, date: Option<&str>) -> String {
    match date.and_then(year_from_date) {
        Some(year) => with_year(title, year),
        None => title.to_string(),
    }
}

/// Turns resolved ids into paths or URLs through an `{id}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocator {
    template: String,
}

impl AssetLocator {
    /// Create a locator; every `{id}` in `template` is substituted.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Location of the asset with `id`.
    pub fn locate(&self, id: impl Display) -> String {
        self.template.replace("{id}", &id.to_string())
    }
}
