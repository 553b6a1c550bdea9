//! Decides how a requested page number is rendered.

use serde::Serialize;

use crate::models::{Page, PageDetail, PageType};
use crate::registry::{ContentRegistry, IntegrationStatus, RegistryEntry, Source};
use crate::render::Integration;

/// The parts of a fetched page record the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct PageFacts<'a> {
    pub page_type: &'a str,
    pub source: Option<&'a str>,
}

impl<'a> From<&'a Page> for PageFacts<'a> {
    fn from(page: &'a Page) -> Self {
        Self {
            page_type: &page.page_type,
            source: page.source.as_deref(),
        }
    }
}

impl<'a> From<&'a PageDetail> for PageFacts<'a> {
    fn from(page: &'a PageDetail) -> Self {
        Self {
            page_type: &page.page_type,
            source: page.content.source.as_deref(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnresolvedReason {
    NotFound,
    NotImplemented { source: Source },
    UnknownSource { tag: String },
}

impl UnresolvedReason {
    pub fn message(&self, page_number: i32) -> String {
        match self {
            UnresolvedReason::NotFound => format!("page {page_number} does not exist"),
            UnresolvedReason::NotImplemented { source } => {
                format!("source {source} recognized but rendering not implemented")
            }
            UnresolvedReason::UnknownSource { tag } => format!("source '{tag}' is not supported"),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Resolution {
    Manual {
        page_number: i32,
    },
    Active {
        page_number: i32,
        integration: Integration,
        entry: RegistryEntry,
    },
    Pending {
        page_number: i32,
        entry: RegistryEntry,
    },
    Unresolved {
        page_number: i32,
        reason: UnresolvedReason,
    },
}

impl Resolution {
    pub fn page_number(&self) -> i32 {
        match self {
            Resolution::Manual { page_number }
            | Resolution::Active { page_number, .. }
            | Resolution::Pending { page_number, .. }
            | Resolution::Unresolved { page_number, .. } => *page_number,
        }
    }
}

pub fn resolve(number: i32, page: Option<PageFacts<'_>>, registry: &ContentRegistry) -> Resolution {
    if let Some(facts) = page {
        if PageType::parse(facts.page_type) == Some(PageType::Manual) {
            return Resolution::Manual {
                page_number: number,
            };
        }
    }

    let declared = page.and_then(|facts| facts.source);
    // a fixed slot only applies when the page does not declare a different source
    let slot = registry
        .by_number(number)
        .filter(|entry| declared.map_or(true, |tag| Source::from_tag(tag) == Some(entry.source)));

    let entry = match slot {
        Some(entry) => entry,
        None => {
            let Some(tag) = declared else {
                return unresolved(number, UnresolvedReason::NotFound);
            };
            let Some(source) = Source::from_tag(tag) else {
                return unresolved(
                    number,
                    UnresolvedReason::UnknownSource {
                        tag: tag.to_string(),
                    },
                );
            };
            match registry.by_source(source) {
                Some(entry) => entry,
                None => return unresolved(number, UnresolvedReason::NotFound),
            }
        }
    };

    match entry.status {
        IntegrationStatus::Soon => Resolution::Pending {
            page_number: number,
            entry: entry.clone(),
        },
        IntegrationStatus::Active => match entry.handler() {
            Some(integration) => Resolution::Active {
                page_number: number,
                integration,
                entry: entry.clone(),
            },
            None => unresolved(
                number,
                UnresolvedReason::NotImplemented {
                    source: entry.source,
                },
            ),
        },
    }
}

fn unresolved(page_number: i32, reason: UnresolvedReason) -> Resolution {
    Resolution::Unresolved {
        page_number,
        reason,
    }
}
