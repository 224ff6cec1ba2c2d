// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Current conditions and today's forecast for one city.
//!
//! This is the single-target case of the pipeline: one fetch, one extraction,
//! no secondary resources. The batch holds exactly one city, so a failure here
//! is the batch failure.

use serde::Serialize;
use tracing::info;

use crate::{
    batch::Analyze,
    config::WeatherConfig,
    error::{ExtractionError, TargetError},
    extract::{ExtractedFacts, FieldSpec, extract},
    fetch::{Fetch, FetchOutcome, FetchRequest, USER_AGENT},
};

/// Base URL of the weather API.
pub const WEATHER_API_BASE: &str = "https://wttr.in";

/// Weather facts for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct WeatherRecord
{
    /// City as configured.
    pub city:             String,
    /// Current temperature in °C.
    pub temp_c:           i64,
    /// Apparent temperature in °C.
    pub feels_like_c:     i64,
    /// Relative humidity in percent.
    pub humidity:         i64,
    /// Localized description of the conditions.
    pub description:      String,
    /// Wind speed in km/h.
    pub wind_speed_kmph:  i64,
    /// 16-point compass wind direction.
    pub wind_direction:   String,
    /// Today's low in °C.
    pub min_temp_c:       i64,
    /// Today's high in °C.
    pub max_temp_c:       i64,
    /// Today's UV index.
    pub uv_index:         i64,
    /// Sunrise, local time.
    pub sunrise:          String,
    /// Sunset, local time.
    pub sunset:           String,
}

impl WeatherRecord
{
    /// Field set of the `format=j1` response for `lang`.
    ///
    /// English descriptions live under `weatherDesc`; other languages under
    /// `lang_<code>`.
    pub fn fields(lang: &str,) -> Vec<FieldSpec,>
    {
        let description = if lang == "en" {
            "current_condition[0].weatherDesc[0].value".to_owned()
        } else {
            format!("current_condition[0].lang_{lang}[0].value")
        };

        vec![
            FieldSpec::quoted_integer("temp_c", "current_condition[0].temp_C",),
            FieldSpec::quoted_integer("feels_like_c", "current_condition[0].FeelsLikeC",),
            FieldSpec::quoted_integer("humidity", "current_condition[0].humidity",),
            FieldSpec::text("description", description,),
            FieldSpec::quoted_integer("wind_speed_kmph", "current_condition[0].windspeedKmph",),
            FieldSpec::text("wind_direction", "current_condition[0].winddir16Point",),
            FieldSpec::quoted_integer("max_temp_c", "weather[0].maxtempC",),
            FieldSpec::quoted_integer("min_temp_c", "weather[0].mintempC",),
            FieldSpec::quoted_integer("uv_index", "weather[0].uvIndex",),
            FieldSpec::text("sunrise", "weather[0].astronomy[0].sunrise",),
            FieldSpec::text("sunset", "weather[0].astronomy[0].sunset",),
        ]
    }

    /// Builds the record from facts extracted with [`WeatherRecord::fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when a field is missing or mistyped.
    pub fn from_facts(city: &str, facts: &ExtractedFacts,) -> Result<Self, ExtractionError,>
    {
        Ok(Self {
            city:            city.to_owned(),
            temp_c:          facts.integer("temp_c",)?,
            feels_like_c:    facts.integer("feels_like_c",)?,
            humidity:        facts.integer("humidity",)?,
            description:     facts.text("description",)?.to_owned(),
            wind_speed_kmph: facts.integer("wind_speed_kmph",)?,
            wind_direction:  facts.text("wind_direction",)?.to_owned(),
            min_temp_c:      facts.integer("min_temp_c",)?,
            max_temp_c:      facts.integer("max_temp_c",)?,
            uv_index:        facts.integer("uv_index",)?,
            sunrise:         facts.text("sunrise",)?.to_owned(),
            sunset:          facts.text("sunset",)?.to_owned(),
        },)
    }
}

/// [`Analyze`] implementation for cities.
#[derive(Debug,)]
pub struct WeatherAnalyzer<F,>
{
    fetcher: F,
    lang:    String,
}

impl<F: Fetch,> WeatherAnalyzer<F,>
{
    /// Creates an analyzer requesting descriptions in the configured language.
    pub fn new(fetcher: F, config: &WeatherConfig,) -> Self
    {
        Self {
            fetcher, lang: config.lang.clone(),
        }
    }

    /// URL of the forecast resource for `city`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tempo_digest::{StaticFetcher, WeatherAnalyzer, WeatherConfig, WeatherOverrides, WeatherSection};
    ///
    /// let config = WeatherConfig::resolve(&WeatherSection::default(), WeatherOverrides::default(),)?;
    /// let analyzer = WeatherAnalyzer::new(StaticFetcher::new(), &config,);
    /// assert_eq!(analyzer.url_for("New York",), "https://wttr.in/New%20York?format=j1&lang=en");
    /// # Ok::<(), tempo_digest::Error>(())
    /// ```
    pub fn url_for(&self, city: &str,) -> String
    {
        format!("{WEATHER_API_BASE}/{}?format=j1&lang={}", urlencoding::encode(city,), self.lang)
    }
}

impl<F: Fetch,> Analyze for WeatherAnalyzer<F,>
{
    type Record = WeatherRecord;

    async fn analyze(&self, city: &str,) -> Result<WeatherRecord, TargetError,>
    {
        let url = self.url_for(city,);
        let request = FetchRequest::new(url.clone(),).header("User-Agent", USER_AGENT,);

        let raw = match self.fetcher.fetch(&request,).await? {
            FetchOutcome::Found(raw,) => raw,
            FetchOutcome::NotFound => {
                return Err(TargetError::NotFound {
                    url,
                },);
            }
        };

        let facts = extract(&raw, &WeatherRecord::fields(&self.lang,),)?;
        let record = WeatherRecord::from_facts(city, &facts,)?;
        info!("{city}: {}°C, {}", record.temp_c, record.description);

        Ok(record,)
    }
}
