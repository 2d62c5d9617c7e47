use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Current conditions for one city, as returned by the OpenWeather
/// current-weather endpoint.
///
/// A value only exists if the whole response decoded; there is no
/// partially-populated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityWeather {
    pub coord: Coord,
    #[serde(deserialize_with = "non_empty_conditions")]
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub base: Option<String>,
    pub main: MainMeasurements,
    #[serde(default)]
    pub visibility: Option<u32>,
    pub wind: Wind,
    pub clouds: Clouds,
    /// Observation time, unix seconds.
    pub dt: i64,
    pub sys: Sys,
    /// Shift from UTC in seconds.
    pub timezone: i32,
    pub id: i64,
    pub name: String,
    pub cod: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainMeasurements {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: u32,
    pub humidity: u8,
    #[serde(default)]
    pub sea_level: Option<u32>,
    #[serde(default)]
    pub grnd_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: u16,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clouds {
    /// Cloud cover, percent.
    pub all: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(rename = "type", default)]
    pub kind: Option<i32>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub country: Option<String>,
    pub sunrise: i64,
    pub sunset: i64,
}

impl CityWeather {
    /// The first (primary) condition reported for the city.
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }

    /// URL of the 2x icon for the primary condition.
    pub fn icon_url(&self) -> Option<String> {
        self.primary_condition()
            .map(|c| format!("{ICON_BASE_URL}/{}@2x.png", c.icon))
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }

    /// Observation time in the city's own timezone.
    pub fn local_observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.timezone)?;
        self.observed_at().map(|t| t.with_timezone(&offset))
    }

    pub fn sunrise_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunrise, 0)
    }

    pub fn sunset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunset, 0)
    }
}

fn non_empty_conditions<'de, D>(deserializer: D) -> Result<Vec<WeatherCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    let conditions = Vec::<WeatherCondition>::deserialize(deserializer)?;
    if conditions.is_empty() {
        return Err(serde::de::Error::custom(
            "expected at least one weather condition",
        ));
    }
    Ok(conditions)
}
