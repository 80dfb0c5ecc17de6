//! Table / JSON rendering for command results.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::odds::convert::UNAVAILABLE;
use crate::odds::format_american;
use crate::store::models::{BookmakerQuote, Event, QuoteSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print rows as a table, or `value` as JSON.
pub fn print_rows<T: Tabled, V: Serialize + ?Sized>(rows: &[T], value: &V, mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if rows.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

pub fn print_heading(text: &str, mode: OutputMode) {
    if mode == OutputMode::Table {
        println!("\n{}", text);
    }
}

pub fn print_warn(msg: &str) {
    eprintln!("\x1b[33m{msg}\x1b[0m");
}

#[derive(Debug, Tabled)]
pub struct QuoteRow {
    #[tabled(rename = "Book")]
    pub book: String,
    #[tabled(rename = "Away ML")]
    pub away_ml: String,
    #[tabled(rename = "Home ML")]
    pub home_ml: String,
    #[tabled(rename = "Total")]
    pub total: String,
    #[tabled(rename = "Over")]
    pub over: String,
    #[tabled(rename = "Under")]
    pub under: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
    #[tabled(rename = "Captured")]
    pub captured: String,
}

impl From<&BookmakerQuote> for QuoteRow {
    fn from(q: &BookmakerQuote) -> Self {
        let totals = q.totals.as_ref();
        QuoteRow {
            book: q.book.clone(),
            away_ml: format_american(q.away_ml),
            home_ml: format_american(q.home_ml),
            total: totals.map_or_else(|| UNAVAILABLE.to_string(), |t| t.point.to_string()),
            over: format_american(totals.map(|t| t.over)),
            under: format_american(totals.map(|t| t.under)),
            status: q.status.to_string(),
            updated: q.updated.clone().unwrap_or_else(|| "-".to_string()),
            captured: local_time(q.captured_at),
        }
    }
}

pub fn quote_rows(set: &QuoteSet) -> Vec<QuoteRow> {
    set.quotes.iter().map(QuoteRow::from).collect()
}

#[derive(Debug, Tabled)]
pub struct EventRow {
    #[tabled(rename = "Matchup")]
    pub matchup: String,
    #[tabled(rename = "Origin")]
    pub origin: String,
    #[tabled(rename = "Start")]
    pub start: String,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "Books")]
    pub books: usize,
}

impl From<&Event> for EventRow {
    fn from(e: &Event) -> Self {
        let score = e
            .scores
            .as_ref()
            .map(|s| {
                s.iter()
                    .map(|t| format!("{} {}", t.name, t.score))
                    .collect::<Vec<_>>()
                    .join(" - ")
            })
            .unwrap_or_else(|| "-".to_string());
        EventRow {
            matchup: e.matchup(),
            origin: e.origin.to_string(),
            start: e.commence_time.map_or_else(|| "-".to_string(), local_time),
            score,
            books: e.bookmakers.len(),
        }
    }
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
