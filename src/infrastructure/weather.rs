//! Weather collaborator.
//!
//! Thin client for the OpenWeatherMap current-conditions endpoint. The
//! client is constructed once and passed to whoever needs it; failures map
//! onto the categories the helmet replies distinguish.

use crate::domain::models::{Coordinates, WeatherReport};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("API key not configured")]
    MissingApiKey,
    #[error("No network connection")]
    NoNetwork,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Location not found")]
    NotFound,
    #[error("Server error")]
    Server(u16),
    #[error("Failed to fetch weather data")]
    UnexpectedStatus(u16),
    #[error("Failed to fetch weather data")]
    Request(#[source] reqwest::Error),
    #[error("Failed to parse weather data")]
    InvalidResponse,
}

pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WeatherClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Fetch current conditions at `coords`, metric units.
    pub async fn fetch(&self, coords: Coordinates) -> Result<WeatherReport, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let payload: WeatherResponse = response
            .json()
            .await
            .map_err(|_| WeatherError::InvalidResponse)?;
        payload.into_report()
    }
}

fn classify_transport_error(error: reqwest::Error) -> WeatherError {
    if error.is_connect() || error.is_timeout() {
        WeatherError::NoNetwork
    } else {
        WeatherError::Request(error)
    }
}

fn classify_status(status: StatusCode) -> WeatherError {
    match status.as_u16() {
        401 => WeatherError::InvalidApiKey,
        404 => WeatherError::NotFound,
        code @ 500..=599 => WeatherError::Server(code),
        code => WeatherError::UnexpectedStatus(code),
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainSection,
    weather: Vec<ConditionSection>,
    #[serde(default)]
    wind: WindSection,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionSection {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WindSection {
    #[serde(default)]
    speed: f64,
}

impl WeatherResponse {
    fn into_report(self) -> Result<WeatherReport, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::InvalidResponse)?;
        Ok(WeatherReport {
            temperature: self.main.temp,
            description: condition.description,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            icon: condition.icon,
        })
    }
}
