// src/observation.rs
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every column an observation exposes, in the order the source dataset lists them.
pub const OBSERVATION_COLUMNS: [&str; 12] = [
    "X", "Y", "month", "day", "FFMC", "DMC", "DC", "ISI", "temp", "RH", "wind", "rain",
];

/// Largest valid grid coordinate on either axis.
pub const GRID_MAX: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Month::Jan => "jan",
            Month::Feb => "feb",
            Month::Mar => "mar",
            Month::Apr => "apr",
            Month::May => "may",
            Month::Jun => "jun",
            Month::Jul => "jul",
            Month::Aug => "aug",
            Month::Sep => "sep",
            Month::Oct => "oct",
            Month::Nov => "nov",
            Month::Dec => "dec",
        }
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown month '{}'", s))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown weekday '{}'", s))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The value of one named column of an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
    Number(f64),
    Token(&'static str),
}

impl ColumnValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ColumnValue::Number(v) => Some(*v),
            ColumnValue::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&'static str> {
        match self {
            ColumnValue::Token(t) => Some(*t),
            ColumnValue::Number(_) => None,
        }
    }
}

/// Whether a named column carries numbers or categorical tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

pub fn column_kind(name: &str) -> Option<ColumnKind> {
    match name {
        "month" | "day" => Some(ColumnKind::Categorical),
        other if OBSERVATION_COLUMNS.contains(&other) => Some(ColumnKind::Numeric),
        _ => None,
    }
}

struct GridCoordinateVisitor;

impl<'de> Visitor<'de> for GridCoordinateVisitor {
    type Value = u8;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative whole number for a grid coordinate")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u8, E> {
        u8::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u8, E> {
        u8::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u8, E> {
        if v.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&v) {
            Ok(v as u8)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    // form values arrive as text
    fn visit_str<E: de::Error>(self, v: &str) -> Result<u8, E> {
        let trimmed = v.trim();
        if let Ok(n) = trimmed.parse::<u64>() {
            return self.visit_u64(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) => self.visit_f64(f),
            Err(_) => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

/// Accepts `7`, `7.0` or `"7"` for a grid coordinate; fractional and
/// negative values are rejected.
fn grid_coordinate<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(GridCoordinateVisitor)
}

/// One wildfire observation as submitted by a client.
///
/// JSON bodies use the dataset's column names (`X`, `FFMC`, `RH`, ...). Extra
/// keys are ignored; every listed field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "X", deserialize_with = "grid_coordinate")]
    pub x: u8,
    #[serde(rename = "Y", deserialize_with = "grid_coordinate")]
    pub y: u8,
    pub month: Month,
    pub day: Weekday,
    #[serde(rename = "FFMC")]
    pub ffmc: f64,
    #[serde(rename = "DMC")]
    pub dmc: f64,
    #[serde(rename = "DC")]
    pub dc: f64,
    #[serde(rename = "ISI")]
    pub isi: f64,
    pub temp: f64,
    #[serde(rename = "RH")]
    pub rh: f64,
    pub wind: f64,
    pub rain: f64,
}

impl Observation {
    /// Looks up a column by its dataset name.
    pub fn column(&self, name: &str) -> Option<ColumnValue> {
        let value = match name {
            "X" => ColumnValue::Number(self.x as f64),
            "Y" => ColumnValue::Number(self.y as f64),
            "month" => ColumnValue::Token(self.month.as_str()),
            "day" => ColumnValue::Token(self.day.as_str()),
            "FFMC" => ColumnValue::Number(self.ffmc),
            "DMC" => ColumnValue::Number(self.dmc),
            "DC" => ColumnValue::Number(self.dc),
            "ISI" => ColumnValue::Number(self.isi),
            "temp" => ColumnValue::Number(self.temp),
            "RH" => ColumnValue::Number(self.rh),
            "wind" => ColumnValue::Number(self.wind),
            "rain" => ColumnValue::Number(self.rain),
            _ => return None,
        };
        Some(value)
    }

    /// Checks the grid bounds and that every measurement is a finite number.
    pub fn validate(&self) -> Result<(), String> {
        if self.x > GRID_MAX || self.y > GRID_MAX {
            return Err(format!(
                "grid coordinates must be within 0..={}, got X={} Y={}",
                GRID_MAX, self.x, self.y
            ));
        }
        let measurements = [
            ("FFMC", self.ffmc),
            ("DMC", self.dmc),
            ("DC", self.dc),
            ("ISI", self.isi),
            ("temp", self.temp),
            ("RH", self.rh),
            ("wind", self.wind),
            ("rain", self.rain),
        ];
        if let Some((name, value)) = measurements.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("measurement {} is not finite: {}", name, value));
        }
        Ok(())
    }
}

/// Form-encoded submission from the HTML page. Keys are lowercase and the
/// algorithm travels alongside the observation fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationForm {
    pub algo: String,
    #[serde(deserialize_with = "grid_coordinate")]
    pub x: u8,
    #[serde(deserialize_with = "grid_coordinate")]
    pub y: u8,
    pub month: Month,
    pub day: Weekday,
    pub ffmc: f64,
    pub dmc: f64,
    pub dc: f64,
    pub isi: f64,
    pub temp: f64,
    pub rh: f64,
    pub wind: f64,
    pub rain: f64,
}

impl ObservationForm {
    /// Splits the form into the algorithm name and the observation record.
    pub fn into_parts(self) -> (String, Observation) {
        let observation = Observation {
            x: self.x,
            y: self.y,
            month: self.month,
            day: self.day,
            ffmc: self.ffmc,
            dmc: self.dmc,
            dc: self.dc,
            isi: self.isi,
            temp: self.temp,
            rh: self.rh,
            wind: self.wind,
            rain: self.rain,
        };
        (self.algo, observation)
    }
}

#[cfg(test)]
pub(crate) fn sample_observation() -> Observation {
    Observation {
        x: 7,
        y: 5,
        month: Month::Mar,
        day: Weekday::Fri,
        ffmc: 86.2,
        dmc: 26.2,
        dc: 94.3,
        isi: 5.1,
        temp: 8.2,
        rh: 51.0,
        wind: 6.7,
        rain: 0.0,
    }
}
