use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::store::models::{
    Event, Origin, RawBook, RawMarket, RawOutcome, TeamScore, UpdateStamp,
};

/// Every trackable event for one sport, from both feeds.
#[derive(Debug, Clone, Serialize)]
pub struct Catalogue {
    pub sport_key: String,
    pub events: Vec<Event>,
    /// Feed failures to surface to the user; never fatal
    pub notices: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Catalogue {
    pub fn empty(sport_key: &str) -> Self {
        Catalogue {
            sport_key: sport_key.to_string(),
            events: Vec::new(),
            notices: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Look up an event by its `"{away} @ {home}"` label. Without an
    /// explicit origin the live event wins over a completed one.
    pub fn find(&self, matchup: &str, origin: Option<Origin>) -> Option<&Event> {
        let with_origin = |o: Origin| {
            self.events
                .iter()
                .find(|e| e.origin == o && e.matchup() == matchup)
        };
        match origin {
            Some(o) => with_origin(o),
            None => with_origin(Origin::Live).or_else(|| with_origin(Origin::Completed)),
        }
    }

    pub fn count(&self, origin: Origin) -> usize {
        self.events.iter().filter(|e| e.origin == origin).count()
    }
}

/// Normalize one feed body into events tagged with `origin`.
///
/// Anything other than a JSON array (the API answers errors with an object)
/// is a shape mismatch. Individual entries missing team names are skipped.
/// From the scores feed only events flagged `completed: true` are kept.
pub fn parse_events(raw: &Value, origin: Origin, sport_key: &str) -> Result<Vec<Event>, FetchError> {
    let Some(items) = raw.as_array() else {
        return Err(FetchError::Shape(describe_non_list(raw)));
    };

    let events: Vec<Event> = items
        .iter()
        .filter_map(|item| parse_event(item, origin, sport_key))
        .filter(|ev| origin == Origin::Live || ev.completed)
        .collect();

    if events.len() < items.len() {
        debug!(
            "{} feed: kept {} of {} entries",
            origin,
            events.len(),
            items.len()
        );
    }
    Ok(events)
}

fn describe_non_list(raw: &Value) -> String {
    match raw {
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(msg) => format!("error object: {}", msg),
            None => "an object".to_string(),
        },
        Value::Null => "null".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Array(_) => "an array".to_string(),
    }
}

fn parse_event(item: &Value, origin: Origin, sport_key: &str) -> Option<Event> {
    let away_team = item["away_team"].as_str()?.to_string();
    let home_team = item["home_team"].as_str()?.to_string();

    let commence_time = item["commence_time"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let bookmakers = item["bookmakers"]
        .as_array()
        .map(|books| books.iter().filter_map(parse_book).collect())
        .unwrap_or_default();

    Some(Event {
        id: item["id"].as_str().map(str::to_string),
        sport_key: item["sport_key"].as_str().unwrap_or(sport_key).to_string(),
        away_team,
        home_team,
        commence_time,
        origin,
        completed: item["completed"].as_bool().unwrap_or(false),
        scores: parse_scores(&item["scores"]),
        bookmakers,
    })
}

fn parse_book(v: &Value) -> Option<RawBook> {
    let key = v["key"].as_str()?.to_string();
    let markets = v["markets"]
        .as_array()
        .map(|ms| ms.iter().filter_map(parse_market).collect())
        .unwrap_or_default();
    Some(RawBook {
        title: v["title"].as_str().unwrap_or(&key).to_string(),
        key,
        last_update: parse_stamp(&v["last_update"]),
        markets,
    })
}

fn parse_market(v: &Value) -> Option<RawMarket> {
    let key = v["key"].as_str()?.to_string();
    let outcomes = v["outcomes"]
        .as_array()
        .map(|os| {
            os.iter()
                .filter_map(|o| {
                    Some(RawOutcome {
                        name: o["name"].as_str()?.to_string(),
                        price: parse_number(&o["price"]),
                        point: parse_number(&o["point"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Some(RawMarket { key, outcomes })
}

fn parse_stamp(v: &Value) -> Option<UpdateStamp> {
    match v {
        Value::Number(n) => n.as_f64().map(UpdateStamp::Epoch),
        Value::String(s) => Some(UpdateStamp::Text(s.clone())),
        _ => None,
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn parse_number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Final score as exactly two `{name, score}` pairs, or nothing.
fn parse_scores(v: &Value) -> Option<Vec<TeamScore>> {
    let entries = v.as_array()?;
    let scores: Vec<TeamScore> = entries
        .iter()
        .filter_map(|s| {
            let name = s["name"].as_str()?.to_string();
            let score = s["score"]
                .as_i64()
                .or_else(|| s["score"].as_str().and_then(|v| v.trim().parse().ok()))?;
            Some(TeamScore { name, score })
        })
        .collect();
    (scores.len() == 2).then_some(scores)
}
