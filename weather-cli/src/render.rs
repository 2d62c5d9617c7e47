//! Text rendering of the weather session.

use std::fmt::Write;

use weather_core::{CityWeather, RequestState, WeatherSession};

pub const LOADING: &str = "Loading...";

/// Everything the screen shows for the current state, in display order.
pub fn screen(session: &WeatherSession, request: &RequestState) -> String {
    let mut out = String::new();

    if request.is_loading {
        out.push_str(LOADING);
        out.push('\n');
    }
    if let Some(err) = &request.error {
        let _ = writeln!(out, "Error: {err}");
    }
    if let Some(weather) = &session.weather {
        out.push_str(&weather_tile(weather));
    }

    out
}

pub fn weather_tile(weather: &CityWeather) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "City Name: {}", weather.name);
    let _ = writeln!(out, "Current Temperature: {}°C", weather.main.temp);
    if let Some(condition) = weather.primary_condition() {
        let _ = writeln!(out, "Weather Condition: {}", capitalize_words(&condition.description));
    }
    if let Some(url) = weather.icon_url() {
        let _ = writeln!(out, "Icon: {url}");
    }
    if let Some(local) = weather.local_observed_at() {
        let _ = writeln!(out, "Observed: {}", local.format("%Y-%m-%d %H:%M %:z"));
    }

    out
}

/// The persisted session without any request in flight.
pub fn last_session(session: &WeatherSession) -> String {
    let mut out = match session.city.as_deref() {
        Some(city) if !city.is_empty() => format!("Last search: {city}\n"),
        _ => "No previous search.\n".to_string(),
    };

    if let Some(weather) = &session.weather {
        out.push_str(&weather_tile(weather));
    }

    out
}

fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
