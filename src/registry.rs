//! Static content registry: which integration owns a fixed page slot, and which
//! handler renders a template `source`.
//!
//! Legacy fixed-slot entries and source-keyed template entries live in one
//! backing table. Lookups go number-first, then source.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::numbering::CategoryCode;
use crate::render::Integration;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Weather,
    ExchangeRate,
    News,
    Lottery,
    JobOffers,
    Horoscope,
    SportTable,
    SportMatches,
    TvProgram,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::Weather,
        Source::ExchangeRate,
        Source::News,
        Source::Lottery,
        Source::JobOffers,
        Source::Horoscope,
        Source::SportTable,
        Source::SportMatches,
        Source::TvProgram,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Source::Weather => "WEATHER",
            Source::ExchangeRate => "EXCHANGE_RATE",
            Source::News => "NEWS",
            Source::Lottery => "LOTTERY",
            Source::JobOffers => "JOB_OFFERS",
            Source::Horoscope => "HOROSCOPE",
            Source::SportTable => "SPORT_TABLE",
            Source::SportMatches => "SPORT_MATCHES",
            Source::TvProgram => "TV_PROGRAM",
        }
    }

    /// Accepts both `EXCHANGE_RATE` and the older `exchange-rate` spelling.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(&normalized))
    }

    /// Exhaustive source → handler dispatch. `None` means recognized but not renderable.
    pub const fn integration(self) -> Option<Integration> {
        match self {
            Source::Weather => Some(Integration::Weather),
            Source::ExchangeRate => Some(Integration::ExchangeRate),
            Source::News => Some(Integration::News),
            Source::Lottery => Some(Integration::Lottery),
            Source::JobOffers => Some(Integration::JobOffers),
            Source::SportTable => Some(Integration::SportTable),
            Source::SportMatches => Some(Integration::SportMatches),
            Source::Horoscope | Source::TvProgram => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Active,
    Soon,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Fixed slot for legacy entries; `None` for source-keyed template entries.
    pub page_number: Option<i32>,
    pub source: Source,
    pub category: CategoryCode,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub status: IntegrationStatus,
    /// Provider parameters used when a legacy slot is served without a template.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub default_config: Value,
}

impl RegistryEntry {
    pub fn handler(&self) -> Option<Integration> {
        self.source.integration()
    }
}

#[derive(Debug, Clone)]
pub struct ContentRegistry {
    entries: Vec<RegistryEntry>,
}

impl ContentRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn standard() -> Self {
        let mut entries = legacy_slots();
        entries.extend(source_entries());
        Self::new(entries)
    }

    pub fn by_number(&self, number: i32) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.page_number == Some(number))
    }

    pub fn by_source(&self, source: Source) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.page_number.is_none() && entry.source == source)
    }

    pub fn handler_for(&self, source: Source) -> Option<Integration> {
        self.by_source(source).and_then(RegistryEntry::handler)
    }

    pub fn list_by_category(&self, category: CategoryCode) -> Vec<&RegistryEntry> {
        let mut entries: Vec<&RegistryEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.category == category)
            .collect();
        entries.sort_by_key(|entry| entry.page_number.unwrap_or(i32::MAX));
        entries
    }

    pub fn active(&self) -> Vec<&RegistryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == IntegrationStatus::Active)
            .collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }
}

impl Default for ContentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn legacy_slots() -> Vec<RegistryEntry> {
    vec![
        RegistryEntry {
            page_number: Some(102),
            source: Source::News,
            category: CategoryCode::News,
            name: "Latest News",
            icon: "📰",
            description: "Headlines from Poland",
            status: IntegrationStatus::Soon,
            default_config: json!({ "language": "pl", "category": "top" }),
        },
        RegistryEntry {
            page_number: Some(201),
            source: Source::SportTable,
            category: CategoryCode::Sports,
            name: "Ekstraklasa Table",
            icon: "⚽",
            description: "Current league standings",
            status: IntegrationStatus::Active,
            default_config: Value::Null,
        },
        RegistryEntry {
            page_number: Some(202),
            source: Source::SportMatches,
            category: CategoryCode::Sports,
            name: "Ekstraklasa Matches",
            icon: "📅",
            description: "Results and fixtures",
            status: IntegrationStatus::Active,
            default_config: Value::Null,
        },
        RegistryEntry {
            page_number: Some(203),
            source: Source::SportMatches,
            category: CategoryCode::Sports,
            name: "Ekstraklasa Results",
            icon: "🏆",
            description: "Results of the current round",
            status: IntegrationStatus::Active,
            default_config: Value::Null,
        },
        RegistryEntry {
            page_number: Some(302),
            source: Source::Lottery,
            category: CategoryCode::Lottery,
            name: "Lotto Results",
            icon: "🎰",
            description: "Latest draw",
            status: IntegrationStatus::Soon,
            default_config: Value::Null,
        },
        RegistryEntry {
            page_number: Some(501),
            source: Source::Weather,
            category: CategoryCode::Weather,
            name: "Weather Wrocław",
            icon: "🌤️",
            description: "7-day forecast",
            status: IntegrationStatus::Active,
            default_config: json!({
                "city": "Wrocław",
                "latitude": 51.1,
                "longitude": 17.0333,
            }),
        },
        RegistryEntry {
            page_number: Some(801),
            source: Source::ExchangeRate,
            category: CategoryCode::Finance,
            name: "USD Exchange Rate",
            icon: "💵",
            description: "Current NBP rates",
            status: IntegrationStatus::Active,
            default_config: json!({ "currencyCode": "USD", "days": 10 }),
        },
        RegistryEntry {
            page_number: Some(802),
            source: Source::ExchangeRate,
            category: CategoryCode::Finance,
            name: "EUR Exchange Rate",
            icon: "💶",
            description: "Current NBP rates",
            status: IntegrationStatus::Active,
            default_config: json!({ "currencyCode": "EUR", "days": 10 }),
        },
    ]
}

fn source_entries() -> Vec<RegistryEntry> {
    let entry = |source, category, name, icon, description| RegistryEntry {
        page_number: None,
        source,
        category,
        name,
        icon,
        description,
        status: IntegrationStatus::Active,
        default_config: Value::Null,
    };
    vec![
        entry(Source::Weather, CategoryCode::Weather, "Weather", "🌤️", "Daily forecast from open-meteo"),
        entry(Source::ExchangeRate, CategoryCode::Finance, "Exchange rates", "💱", "Bid/ask rates from NBP"),
        entry(Source::News, CategoryCode::News, "News", "📰", "Top headlines"),
        entry(Source::Lottery, CategoryCode::Lottery, "Lottery", "🎰", "Latest draw results"),
        entry(Source::JobOffers, CategoryCode::Jobs, "Job offers", "💼", "Offers matching keywords"),
        entry(Source::Horoscope, CategoryCode::Horoscope, "Horoscope", "🔮", "Daily horoscope"),
        entry(Source::SportTable, CategoryCode::Sports, "League table", "⚽", "League standings"),
        entry(Source::SportMatches, CategoryCode::Sports, "Matches", "📅", "Fixtures and results"),
        entry(Source::TvProgram, CategoryCode::Tv, "TV program", "📺", "Channel schedule"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_accept_both_spellings() {
        assert_eq!(Source::from_tag("EXCHANGE_RATE"), Some(Source::ExchangeRate));
        assert_eq!(Source::from_tag("exchange-rate"), Some(Source::ExchangeRate));
        assert_eq!(Source::from_tag("sport-table"), Some(Source::SportTable));
        assert_eq!(Source::from_tag("manual"), None);
        assert_eq!(Source::from_tag("crypto"), None);
    }

    #[test]
    fn every_source_has_a_template_entry() {
        let registry = ContentRegistry::standard();
        for source in Source::ALL {
            let entry = registry.by_source(source).expect("source entry");
            assert_eq!(entry.page_number, None);
        }
    }

    #[test]
    fn legacy_slots_sit_inside_their_category_range() {
        let registry = ContentRegistry::standard();
        for entry in registry.entries() {
            if let Some(number) = entry.page_number {
                assert!(entry.category.range().contains(number), "{number}");
            }
        }
    }

    #[test]
    fn lookup_by_number_and_category() {
        let registry = ContentRegistry::standard();
        let lottery = registry.by_number(302).unwrap();
        assert_eq!(lottery.status, IntegrationStatus::Soon);
        assert_eq!(lottery.source, Source::Lottery);
        assert!(registry.by_number(999_999).is_none());

        let finance = registry.list_by_category(CategoryCode::Finance);
        let numbers: Vec<_> = finance.iter().map(|entry| entry.page_number).collect();
        assert_eq!(numbers, vec![Some(801), Some(802), None]);
    }

    #[test]
    fn horoscope_and_tv_have_no_handler() {
        let registry = ContentRegistry::standard();
        assert!(registry.handler_for(Source::Horoscope).is_none());
        assert!(registry.handler_for(Source::TvProgram).is_none());
        assert_eq!(registry.handler_for(Source::Weather), Some(Integration::Weather));
        assert!(registry.active().iter().all(|entry| entry.status == IntegrationStatus::Active));
    }
}
