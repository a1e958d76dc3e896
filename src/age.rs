use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed demographic ranges, ordered youngest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeBracket {
    #[serde(rename = "Criança (0-11)")]
    Child,
    #[serde(rename = "Adolescente (12-17)")]
    Teen,
    #[serde(rename = "Adulto (18-59)")]
    Adult,
    #[serde(rename = "Sênior (60+)")]
    Senior,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 4] = [
        AgeBracket::Child,
        AgeBracket::Teen,
        AgeBracket::Adult,
        AgeBracket::Senior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBracket::Child => "Criança (0-11)",
            AgeBracket::Teen => "Adolescente (12-17)",
            AgeBracket::Adult => "Adulto (18-59)",
            AgeBracket::Senior => "Sênior (60+)",
        }
    }

    /// Every bracket present with a zero count.
    pub fn zeroed() -> BTreeMap<AgeBracket, usize> {
        Self::ALL.iter().map(|bracket| (*bracket, 0)).collect()
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole years between `birth_date` and `today`.
///
/// Missing, malformed or impossible dates count as age 0 so a single bad
/// row never sinks a report. Birth dates after `today` also give 0.
pub fn age_from_birthdate(birth_date: Option<&str>, today: NaiveDate) -> u32 {
    let Some(birth) = birth_date
        .and_then(|raw| NaiveDate::parse_from_str(raw, BIRTH_DATE_FORMAT).ok())
    else {
        return 0;
    };

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }

    u32::try_from(years).unwrap_or(0)
}

pub fn bracket_from_age(age: u32) -> AgeBracket {
    match age {
        0..=11 => AgeBracket::Child,
        12..=17 => AgeBracket::Teen,
        18..=59 => AgeBracket::Adult,
        _ => AgeBracket::Senior,
    }
}
