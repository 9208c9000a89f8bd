//! Wire types exchanged with the trip planner backend.
//!
//! Field names match the backend's JSON exactly. Fields the backend fills
//! with a default are `#[serde(default)]` here so partially populated plans
//! from the language model still decode.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::PlannerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// Absent when the backend could not geocode the attraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Suggested visit length in minutes.
    #[serde(default = "default_visit_duration")]
    pub visit_duration: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub ticket_price: f64,
}

const fn default_visit_duration() -> u32 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// breakfast / lunch / dinner / snack
    #[serde(rename = "type")]
    pub meal_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub distance: String,
    #[serde(rename = "type", default)]
    pub hotel_type: String,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub total_attractions: f64,
    #[serde(default)]
    pub total_hotels: f64,
    #[serde(default)]
    pub total_meals: f64,
    #[serde(default)]
    pub total_transportation: f64,
    #[serde(default)]
    pub total: f64,
}

impl Budget {
    /// Sum of the four category totals. The backend is expected to report
    /// `total` equal to this; the client does not check it.
    #[must_use]
    pub fn category_sum(&self) -> f64 {
        self.total_attractions + self.total_hotels + self.total_meals + self.total_transportation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: String,
    pub day_index: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transportation: String,
    #[serde(default)]
    pub accommodation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel: Option<Hotel>,
    #[serde(default)]
    pub attractions: Vec<Attraction>,
    #[serde(default)]
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub date: String,
    #[serde(default)]
    pub day_weather: String,
    #[serde(default)]
    pub night_weather: String,
    #[serde(default, deserialize_with = "deserialize_temperature")]
    pub day_temp: f64,
    #[serde(default, deserialize_with = "deserialize_temperature")]
    pub night_temp: f64,
    #[serde(default)]
    pub wind_direction: String,
    #[serde(default, deserialize_with = "deserialize_wind_power")]
    pub wind_power: String,
}

/// Accepts `25`, `25.5`, `"25"` or `"25°C"`. Unparseable text reads as 0.
fn deserialize_temperature<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Ok(parse_temperature(&s)),
        _ => Ok(0.0),
    }
}

pub(crate) fn parse_temperature(raw: &str) -> f64 {
    raw.replace("°C", "")
        .replace('℃', "")
        .replace('°', "")
        .trim()
        .parse()
        .unwrap_or(0.0)
}

/// Wind power arrives as text ("≤3级") or a bare number; both become text.
fn deserialize_wind_power<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => "未知".to_string(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub city: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub weather_info: Vec<WeatherInfo>,
    #[serde(default)]
    pub overall_suggestions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_keywords: Option<Vec<String>>,
}

/// User-supplied third-party credentials forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amap_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amap_js_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsplash_access_key: Option<String>,
}

impl ApiKeys {
    /// True when no field holds a non-empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.llm_api_key,
            &self.llm_model_id,
            &self.llm_base_url,
            &self.amap_api_key,
            &self.amap_js_key,
            &self.unsplash_access_key,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(str::is_empty))
    }
}

pub const DEFAULT_PREFERENCES: &str = "历史文化";
pub const DEFAULT_BUDGET: &str = "中等";
pub const DEFAULT_TRANSPORTATION: &str = "公共交通";
pub const DEFAULT_ACCOMMODATION: &str = "经济型酒店";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlanRequest {
    pub city: String,
    pub start_date: String,
    pub end_date: String,
    pub days: u32,
    pub preferences: String,
    pub budget: String,
    pub transportation: String,
    pub accommodation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<ApiKeys>,
}

impl TripPlanRequest {
    /// Builds a request for the inclusive date range `start_date..=end_date`
    /// (both `YYYY-MM-DD`), filling the preference fields with the backend defaults.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidRequest` if a date does not parse or the
    /// range ends before it starts.
    pub fn new(
        city: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Result<Self, PlannerError> {
        let start_date = start_date.into();
        let end_date = end_date.into();
        let days = inclusive_day_count(&start_date, &end_date)?;

        Ok(Self {
            city: city.into(),
            start_date,
            end_date,
            days,
            preferences: DEFAULT_PREFERENCES.to_string(),
            budget: DEFAULT_BUDGET.to_string(),
            transportation: DEFAULT_TRANSPORTATION.to_string(),
            accommodation: DEFAULT_ACCOMMODATION.to_string(),
            api_keys: None,
        })
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: impl Into<String>) -> Self {
        self.preferences = preferences.into();
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = budget.into();
        self
    }

    #[must_use]
    pub fn with_transportation(mut self, transportation: impl Into<String>) -> Self {
        self.transportation = transportation.into();
        self
    }

    #[must_use]
    pub fn with_accommodation(mut self, accommodation: impl Into<String>) -> Self {
        self.accommodation = accommodation.into();
        self
    }

    #[must_use]
    pub fn with_api_keys(mut self, api_keys: ApiKeys) -> Self {
        self.api_keys = Some(api_keys);
        self
    }
}

fn inclusive_day_count(start_date: &str, end_date: &str) -> Result<u32, PlannerError> {
    let parse = |label: &str, raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| PlannerError::InvalidRequest(format!("{label} {raw:?}: {e}")))
    };
    let start = parse("start_date", start_date)?;
    let end = parse("end_date", end_date)?;

    let span = end.signed_duration_since(start).num_days();
    if span < 0 {
        return Err(PlannerError::InvalidRequest(format!(
            "end_date {end_date} is before start_date {start_date}"
        )));
    }

    u32::try_from(span + 1)
        .map_err(|_| PlannerError::InvalidRequest(format!("trip of {} days is too long", span + 1)))
}

/// One progress event from the streaming plan endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamProgress {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub status: String,
    /// 0–1 or 0–100 depending on the backend.
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TripPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A Xiaohongshu note preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XhsNote {
    pub id: String,
    pub title: String,
    pub note_url: String,
    pub cover_image: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XhsResponse {
    /// `success` or `fallback`
    pub status: String,
    #[serde(default)]
    pub data: Vec<XhsNote>,
    pub search_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
