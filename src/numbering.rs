//! Page-number namespace: the per-category range table plus the allocator and
//! validators used while authoring pages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

pub const MIN_PAGE_NUMBER: i32 = 101;
pub const MAX_PAGE_NUMBER: i32 = 999;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryCode {
    News,
    Sports,
    Lottery,
    Tv,
    Weather,
    Jobs,
    Horoscope,
    Finance,
    Misc,
}

impl CategoryCode {
    pub const ALL: [CategoryCode; 9] = [
        CategoryCode::News,
        CategoryCode::Sports,
        CategoryCode::Lottery,
        CategoryCode::Tv,
        CategoryCode::Weather,
        CategoryCode::Jobs,
        CategoryCode::Horoscope,
        CategoryCode::Finance,
        CategoryCode::Misc,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CategoryCode::News => "NEWS",
            CategoryCode::Sports => "SPORTS",
            CategoryCode::Lottery => "LOTTERY",
            CategoryCode::Tv => "TV",
            CategoryCode::Weather => "WEATHER",
            CategoryCode::Jobs => "JOBS",
            CategoryCode::Horoscope => "HOROSCOPE",
            CategoryCode::Finance => "FINANCE",
            CategoryCode::Misc => "MISC",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CategoryCode::News => "News",
            CategoryCode::Sports => "Sport",
            CategoryCode::Lottery => "Lottery",
            CategoryCode::Tv => "TV Program",
            CategoryCode::Weather => "Weather",
            CategoryCode::Jobs => "Job Offers",
            CategoryCode::Horoscope => "Horoscope",
            CategoryCode::Finance => "Finance",
            CategoryCode::Misc => "Miscellaneous",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            CategoryCode::News => "Headlines and current affairs",
            CategoryCode::Sports => "League tables, fixtures and results",
            CategoryCode::Lottery => "Latest draws and jackpots",
            CategoryCode::Tv => "Today's schedule by channel",
            CategoryCode::Weather => "Forecasts for selected cities",
            CategoryCode::Jobs => "Current job offers",
            CategoryCode::Horoscope => "Daily horoscope",
            CategoryCode::Finance => "Exchange rates and markets",
            CategoryCode::Misc => "Everything else",
        }
    }

    /// Hundreds block owned by the category: `base01..=base99`.
    pub const fn range(self) -> PageRange {
        let base = match self {
            CategoryCode::News => 100,
            CategoryCode::Sports => 200,
            CategoryCode::Lottery => 300,
            CategoryCode::Tv => 400,
            CategoryCode::Weather => 500,
            CategoryCode::Jobs => 600,
            CategoryCode::Horoscope => 700,
            CategoryCode::Finance => 800,
            CategoryCode::Misc => 900,
        };
        PageRange {
            start: base + 1,
            end: base + 99,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub struct PageRange {
    pub start: i32,
    pub end: i32,
}

impl PageRange {
    pub const DEFAULT: PageRange = PageRange {
        start: MIN_PAGE_NUMBER,
        end: MAX_PAGE_NUMBER,
    };

    pub fn contains(&self, number: i32) -> bool {
        (self.start..=self.end).contains(&number)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Anything that may occupy a slot in the page-number namespace.
pub trait Numbered {
    fn page_number(&self) -> Option<i32>;

    fn template_id(&self) -> Option<Uuid> {
        None
    }
}

impl Numbered for i32 {
    fn page_number(&self) -> Option<i32> {
        Some(*self)
    }
}

impl Numbered for Option<i32> {
    fn page_number(&self) -> Option<i32> {
        *self
    }
}

/// Unknown categories get the permissive default range so authoring stays usable.
pub fn range_for(category: &str) -> PageRange {
    CategoryCode::parse(category)
        .map(CategoryCode::range)
        .unwrap_or(PageRange::DEFAULT)
}

pub fn occupied_numbers<P: Numbered>(pages: &[P]) -> BTreeSet<i32> {
    pages.iter().filter_map(Numbered::page_number).collect()
}

pub fn first_free<P: Numbered>(pages: &[P], start: i32, end: i32) -> Option<i32> {
    let occupied = occupied_numbers(pages);
    (start..=end).find(|number| !occupied.contains(number))
}

pub fn first_free_for_category<P: Numbered>(pages: &[P], category: &str) -> Option<i32> {
    let range = range_for(category);
    first_free(pages, range.start, range.end)
}

fn parse_number(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok()
}

pub fn is_valid(text: &str, min: i32, max: i32) -> bool {
    parse_number(text).is_some_and(|number| number >= min && number <= max)
}

/// [`is_valid`] with the namespace-wide bounds `101..=999`.
pub fn is_valid_default(text: &str) -> bool {
    is_valid(text, MIN_PAGE_NUMBER, MAX_PAGE_NUMBER)
}

pub fn is_occupied<P: Numbered>(pages: &[P], text: &str) -> bool {
    match parse_number(text) {
        Some(number) => occupied_numbers(pages).contains(&number),
        None => false,
    }
}

pub fn has_template_page<P: Numbered>(pages: &[P], template_id: Uuid) -> bool {
    pages
        .iter()
        .any(|page| page.template_id() == Some(template_id))
}

pub fn page_number_for_template<P: Numbered>(pages: &[P], template_id: Uuid) -> Option<i32> {
    pages
        .iter()
        .find(|page| page.template_id() == Some(template_id))
        .and_then(Numbered::page_number)
}

#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum NumberingError {
    #[error("page number must be {}-{}", MIN_PAGE_NUMBER, MAX_PAGE_NUMBER)]
    Invalid,
    #[error("page number {number} is outside the {category} range {range}")]
    OutOfRange {
        number: i32,
        category: String,
        range: PageRange,
    },
    #[error("page number {0} is already in use")]
    Occupied(i32),
    #[error("no free page numbers left in range {range} for category {category}")]
    Exhausted { category: String, range: PageRange },
}

/// Full authoring check for a user-supplied number: structure, category range,
/// then collisions. `exclude` is the number the edited page already holds.
pub fn check_number<P: Numbered>(
    pages: &[P],
    category: &str,
    text: &str,
    exclude: Option<i32>,
) -> Result<i32, NumberingError> {
    if !is_valid_default(text) {
        return Err(NumberingError::Invalid);
    }
    let number = parse_number(text).ok_or(NumberingError::Invalid)?;

    let range = range_for(category);
    if !range.contains(number) {
        return Err(NumberingError::OutOfRange {
            number,
            category: category.to_string(),
            range,
        });
    }

    if exclude != Some(number) && is_occupied(pages, text) {
        return Err(NumberingError::Occupied(number));
    }

    Ok(number)
}

pub fn allocate<P: Numbered>(pages: &[P], category: &str) -> Result<i32, NumberingError> {
    first_free_for_category(pages, category).ok_or_else(|| NumberingError::Exhausted {
        category: category.to_string(),
        range: range_for(category),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_disjoint_and_span_99_numbers() {
        for (index, code) in CategoryCode::ALL.iter().enumerate() {
            let range = code.range();
            assert_eq!(range.end - range.start + 1, 99, "{code}");
            for other in &CategoryCode::ALL[index + 1..] {
                let other = other.range();
                assert!(range.end < other.start || other.end < range.start);
            }
        }
        assert_eq!(range_for("MISC"), PageRange { start: 901, end: 999 });
    }

    #[test]
    fn unknown_category_falls_back_to_default_range() {
        assert_eq!(range_for("CURRENCY"), PageRange::DEFAULT);
        assert_eq!(range_for(""), PageRange { start: 101, end: 999 });
        assert_eq!(range_for("news"), PageRange { start: 101, end: 199 });
    }

    #[test]
    fn occupied_numbers_skip_missing_and_dedupe() {
        let pages = vec![Some(101), None, Some(101), Some(150)];
        let occupied = occupied_numbers(&pages);
        assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec![101, 150]);
    }

    #[test]
    fn first_free_for_news_after_two_pages() {
        let pages = vec![101, 102];
        assert_eq!(first_free_for_category(&pages, "NEWS"), Some(103));
    }

    #[test]
    fn first_free_fills_gaps_first() {
        let pages = vec![201, 203, 204];
        assert_eq!(first_free_for_category(&pages, "SPORTS"), Some(202));
        assert_eq!(first_free(&pages, 203, 205), Some(205));
    }

    #[test]
    fn exhausted_misc_range_is_none() {
        let pages: Vec<i32> = (901..=999).collect();
        assert_eq!(first_free_for_category(&pages, "MISC"), None);
        assert_eq!(
            allocate(&pages, "MISC"),
            Err(NumberingError::Exhausted {
                category: "MISC".into(),
                range: PageRange { start: 901, end: 999 },
            })
        );
    }

    #[test]
    fn first_free_is_smallest_free_in_range() {
        let pages = vec![105, 101, 102, 150, 104];
        let found = first_free_for_category(&pages, "NEWS").unwrap();
        let occupied = occupied_numbers(&pages);
        assert_eq!(found, 103);
        assert!((101..found).all(|number| occupied.contains(&number)));
    }

    #[test]
    fn validity_checks() {
        assert!(is_valid("150", 101, 199));
        assert!(!is_valid("99", 101, 199));
        assert!(!is_valid("abc", 101, 199));
        assert!(!is_valid("150.5", 101, 199));
        assert!(!is_valid("200", 101, 199));
        assert!(is_valid(" 199 ", 101, 199));
        assert!(is_valid_default("999"));
        assert!(!is_valid_default("1000"));
    }

    #[test]
    fn occupied_is_exact_match() {
        let pages = vec![101, 150];
        assert!(is_occupied(&pages, "150"));
        assert!(!is_occupied(&pages, "149"));
        assert!(!is_occupied(&pages, "x"));
    }

    #[test]
    fn check_number_composes_messages() {
        let pages = vec![101, 102];
        assert_eq!(check_number(&pages, "NEWS", "103", None), Ok(103));
        assert_eq!(
            check_number(&pages, "NEWS", "102", None),
            Err(NumberingError::Occupied(102))
        );
        assert_eq!(check_number(&pages, "NEWS", "102", Some(102)), Ok(102));
        assert_eq!(check_number(&pages, "NEWS", "42", None), Err(NumberingError::Invalid));
        let err = check_number(&pages, "WEATHER", "150", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "page number 150 is outside the WEATHER range 501-599"
        );
    }

    fn template_page(page_number: i32, template_id: Option<Uuid>) -> crate::models::Page {
        let now = chrono::Utc::now();
        crate::models::Page {
            id: Uuid::new_v4(),
            page_number,
            page_type: "TEMPLATE".into(),
            title: format!("Page {page_number}"),
            category: "FINANCE".into(),
            description: None,
            content: None,
            template_id,
            source: None,
            is_active: true,
            is_locked: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn template_lookup_finds_the_page_using_it() {
        let chf = Uuid::new_v4();
        let unused = Uuid::new_v4();
        let pages = vec![template_page(801, None), template_page(803, Some(chf))];
        assert!(has_template_page(&pages, chf));
        assert_eq!(page_number_for_template(&pages, chf), Some(803));
        assert!(!has_template_page(&pages, unused));
        assert_eq!(page_number_for_template(&pages, unused), None);
    }
}
