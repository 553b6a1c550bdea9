//! Teletext rendering. Every integration turns its provider payload into
//! fixed-width text rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::RegistryEntry;
use crate::resolver::UnresolvedReason;

pub const LINE_WIDTH: usize = 40;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Integration {
    Weather,
    ExchangeRate,
    News,
    Lottery,
    JobOffers,
    SportTable,
    SportMatches,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("malformed {integration:?} data: {source}")]
    Malformed {
        integration: Integration,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeletextPage {
    pub page_number: i32,
    pub title: String,
    pub lines: Vec<String>,
}

impl TeletextPage {
    pub fn text(&self) -> String {
        let mut out = format!("P{:<5}{}\n", self.page_number, fit(&self.title, LINE_WIDTH - 6));
        out.push_str(&"=".repeat(LINE_WIDTH));
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrencyData {
    code: String,
    #[serde(default)]
    currency: String,
    rates: Vec<CurrencyRate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrencyRate {
    effective_date: String,
    bid: f64,
    ask: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherData {
    daily_weathers: Vec<DailyWeather>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyWeather {
    date: String,
    max_temperature: f64,
    min_temperature: f64,
}

#[derive(Deserialize)]
struct StandingsData {
    standings: Vec<Standing>,
}

#[derive(Deserialize)]
struct Standing {
    position: Option<u32>,
    team: String,
    points: i64,
    #[serde(default)]
    wins: i64,
    #[serde(default)]
    draws: i64,
    #[serde(default)]
    loses: i64,
}

#[derive(Deserialize)]
struct MatchesData {
    matches: Vec<Match>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Match {
    home_team: String,
    away_team: String,
    home_score: Option<i64>,
    away_score: Option<i64>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct NewsData {
    articles: Vec<Article>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: String,
    source: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotteryData {
    game_type: String,
    #[serde(default)]
    last_draw_results: Vec<i64>,
    last_draw_date: Option<String>,
    next_draw_date: Option<String>,
    next_draw_prize: Option<String>,
    coupon_price: Option<String>,
    draws: Option<String>,
}

#[derive(Deserialize)]
struct JobsData {
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct Job {
    title: String,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
}

impl Integration {
    pub fn render(self, data: &Value) -> Result<Vec<String>, RenderError> {
        match self {
            Integration::ExchangeRate => self.parse(data).map(render_currency),
            Integration::Weather => self.parse(data).map(render_weather),
            Integration::SportTable => self.parse(data).map(render_standings),
            Integration::SportMatches => self.parse(data).map(render_matches),
            Integration::News => self.parse(data).map(render_news),
            Integration::Lottery => self.parse(data).map(render_lottery),
            Integration::JobOffers => self.parse(data).map(render_jobs),
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, data: &Value) -> Result<T, RenderError> {
        T::deserialize(data).map_err(|source| RenderError::Malformed {
            integration: self,
            source,
        })
    }
}

fn render_currency(data: CurrencyData) -> Vec<String> {
    let mut lines = Vec::new();
    let heading = if data.currency.is_empty() {
        format!("{} / PLN", data.code)
    } else {
        format!("{} ({}) / PLN", data.code, data.currency)
    };
    lines.push(fit(&heading.to_uppercase(), LINE_WIDTH));
    if let Some(latest) = data.rates.last() {
        lines.push(format!("MID    {:.4}", (latest.bid + latest.ask) / 2.0));
        lines.push(format!("BID    {:.4}   ASK {:.4}", latest.bid, latest.ask));
        lines.push(format!("DATE   {}", latest.effective_date));
    }
    lines.push(String::new());
    lines.push(format!("{:<12}{:>9}{:>9}{:>9}", "DATE", "BID", "ASK", "MID"));
    for rate in data.rates.iter().rev() {
        lines.push(format!(
            "{:<12}{:>9.4}{:>9.4}{:>9.4}",
            rate.effective_date,
            rate.bid,
            rate.ask,
            (rate.bid + rate.ask) / 2.0
        ));
    }
    lines
}

fn render_weather(data: WeatherData) -> Vec<String> {
    let mut lines = vec![format!("{:<12}{:>8}{:>8}", "DATE", "MAX", "MIN")];
    lines.extend(data.daily_weathers.iter().map(|day| {
        format!(
            "{:<12}{:>7.1}C{:>7.1}C",
            day.date, day.max_temperature, day.min_temperature
        )
    }));
    lines
}

fn render_standings(data: StandingsData) -> Vec<String> {
    let mut lines = vec![format!("{:<3} {:<20}{:>4}{:>4}{:>4}{:>4}", "#", "TEAM", "P", "W", "D", "L")];
    for (index, row) in data.standings.iter().enumerate() {
        let position = row.position.unwrap_or(index as u32 + 1);
        lines.push(format!(
            "{:<3} {:<20}{:>4}{:>4}{:>4}{:>4}",
            position,
            fit(&row.team, 20),
            row.points,
            row.wins,
            row.draws,
            row.loses
        ));
    }
    lines
}

fn render_matches(data: MatchesData) -> Vec<String> {
    data.matches
        .iter()
        .map(|game| {
            let score = match (game.home_score, game.away_score) {
                (Some(home), Some(away)) => format!("{home}:{away}"),
                _ => "-:-".to_string(),
            };
            let teams = format!("{} - {}", game.home_team, game.away_team);
            match &game.date {
                Some(date) => fit(&format!("{:<10} {:<23} {}", fit(date, 10), fit(&teams, 23), score), LINE_WIDTH),
                None => fit(&format!("{:<34} {}", fit(&teams, 34), score), LINE_WIDTH),
            }
        })
        .collect()
}

fn render_news(data: NewsData) -> Vec<String> {
    let mut lines = Vec::new();
    for article in &data.articles {
        lines.extend(wrap(&format!("* {}", article.title), LINE_WIDTH));
        if let Some(source) = &article.source {
            lines.push(fit(&format!("  [{source}]"), LINE_WIDTH));
        }
    }
    lines
}

fn render_lottery(data: LotteryData) -> Vec<String> {
    let numbers = data
        .last_draw_results
        .iter()
        .map(|number| format!("{number:>2}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut lines = vec![fit(&data.game_type.to_uppercase(), LINE_WIDTH), String::new(), numbers];
    let details = [
        ("LAST DRAW", &data.last_draw_date),
        ("NEXT DRAW", &data.next_draw_date),
        ("JACKPOT", &data.next_draw_prize),
        ("COUPON", &data.coupon_price),
        ("DRAWS", &data.draws),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            lines.push(fit(&format!("{label:<10} {value}"), LINE_WIDTH));
        }
    }
    lines
}

fn render_jobs(data: JobsData) -> Vec<String> {
    let mut lines = Vec::new();
    for job in &data.jobs {
        lines.push(fit(&job.title, LINE_WIDTH));
        let meta = [&job.company, &job.location, &job.salary]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        if !meta.is_empty() {
            lines.push(fit(&format!("  {meta}"), LINE_WIDTH));
        }
    }
    lines
}

pub fn render_manual(
    page_number: i32,
    title: &str,
    description: Option<&str>,
    content: Option<&str>,
) -> TeletextPage {
    let mut lines = Vec::new();
    if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
        lines.extend(wrap(description, LINE_WIDTH));
    }
    if let Some(content) = content.filter(|text| !text.trim().is_empty()) {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        for paragraph in content.lines() {
            if paragraph.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(wrap(paragraph, LINE_WIDTH));
            }
        }
    }
    TeletextPage {
        page_number,
        title: title.to_string(),
        lines,
    }
}

pub fn render_pending(page_number: i32, entry: &RegistryEntry) -> TeletextPage {
    let mut lines = vec![entry.icon.to_string(), "COMING SOON".to_string()];
    lines.extend(wrap(entry.description, LINE_WIDTH));
    lines.push(String::new());
    lines.push(format!("Page {page_number} | Category: {}", entry.category));
    TeletextPage {
        page_number,
        title: entry.name.to_string(),
        lines,
    }
}

pub fn render_unresolved(page_number: i32, reason: &UnresolvedReason) -> TeletextPage {
    TeletextPage {
        page_number,
        title: "NOT AVAILABLE".to_string(),
        lines: wrap(&reason.message(page_number), LINE_WIDTH),
    }
}

/// Truncates to `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() { 0 } else { 1 } + word.chars().count();
        if current.chars().count() + needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContentRegistry;
    use serde_json::json;

    #[test]
    fn currency_shows_latest_then_history_newest_first() {
        let data = json!({
            "code": "USD",
            "currency": "dolar amerykański",
            "rates": [
                { "effectiveDate": "2024-05-01", "bid": 3.9, "ask": 4.0 },
                { "effectiveDate": "2024-05-02", "bid": 4.0, "ask": 4.1 },
            ]
        });
        let lines = Integration::ExchangeRate.render(&data).unwrap();
        assert_eq!(lines[1], "MID    4.0500");
        assert!(lines[3].ends_with("2024-05-02"));
        let history: Vec<_> = lines.iter().filter(|line| line.starts_with("2024")).collect();
        assert!(history[0].starts_with("2024-05-02"));
        assert!(history[1].starts_with("2024-05-01"));
    }

    #[test]
    fn standings_fall_back_to_row_order() {
        let data = json!({
            "standings": [
                { "team": "Jagiellonia", "points": 40, "wins": 12, "draws": 4, "loses": 2 },
                { "team": "Lech", "points": 38 }
            ]
        });
        let lines = Integration::SportTable.render(&data).unwrap();
        assert!(lines[1].starts_with("1   Jagiellonia"));
        assert!(lines[2].starts_with("2   Lech"));
    }

    #[test]
    fn matches_without_score_show_placeholder() {
        let data = json!({ "matches": [{ "homeTeam": "Legia", "awayTeam": "Wisła" }] });
        let lines = Integration::SportMatches.render(&data).unwrap();
        assert!(lines[0].ends_with("-:-"));
        assert!(lines[0].chars().count() <= LINE_WIDTH);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = Integration::Weather.render(&json!({ "rates": [] })).unwrap_err();
        assert!(err.to_string().starts_with("malformed Weather data"));
    }

    #[test]
    fn pending_card_carries_registry_metadata() {
        let registry = ContentRegistry::standard();
        let entry = registry.by_number(302).unwrap();
        let page = render_pending(302, entry);
        assert_eq!(page.title, "Lotto Results");
        assert_eq!(page.lines[0], "🎰");
        assert!(page.lines.contains(&"Page 302 | Category: LOTTERY".to_string()));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn manual_page_joins_description_and_content() {
        let page = render_manual(901, "Welcome", Some("Intro"), Some("Line one\nLine two"));
        assert_eq!(page.lines, vec!["Intro", "", "Line one", "Line two"]);
    }

    #[test]
    fn zero_width_wraps_to_nothing() {
        assert!(wrap("Kurs średni NBP", 0).is_empty());
    }
}
