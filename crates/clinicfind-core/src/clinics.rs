use std::collections::BTreeSet;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::doctors::DoctorId;

/// Identity of a clinic as assigned by the clinic search API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicId(String);

impl ClinicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClinicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClinicId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let coordinate = Self { lat, lng };
        coordinate.is_valid().then_some(coordinate)
    }

    /// `lat` in [-90, 90] and `lng` in [-180, 180], both finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

/// Local wall-clock time of day, stored as minutes since midnight.
///
/// `24:00` is accepted as the end of the day (1440).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const END_OF_DAY: ClockTime = ClockTime(24 * 60);

    /// Builds a time from hour and minute, `None` when out of range.
    #[must_use]
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        match (hour, minute) {
            (24, 0) => Some(Self::END_OF_DAY),
            (0..=23, 0..=59) => Some(Self(hour * 60 + minute)),
            _ => None,
        }
    }

    /// Parses a 24-hour `HH:MM` string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (hour, minute) = raw.trim().split_once(':')?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if hour.len() > 2 || minute.len() != 2 || !digits(hour) || !digits(minute) {
            return None;
        }
        let hour = hour.parse::<u16>().ok()?;
        let minute = minute.parse::<u16>().ok()?;
        Self::from_hm(hour, minute)
    }

    /// Truncates a wall-clock time to the minute.
    #[must_use]
    pub fn from_naive(time: NaiveTime) -> Self {
        // At most 23 * 60 + 59.
        #[allow(clippy::cast_possible_truncation)]
        let minutes = (time.hour() * 60 + time.minute()) as u16;
        Self(minutes)
    }

    #[must_use]
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid HH:MM time '{value}'"))
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Opening window for a single weekday. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: Option<ClockTime>,
    pub close: Option<ClockTime>,
}

impl DayHours {
    #[must_use]
    pub fn new(open: Option<ClockTime>, close: Option<ClockTime>) -> Self {
        Self { open, close }
    }

    /// Inclusive on both ends. A day missing either bound is never open.
    #[must_use]
    pub fn is_open_at(&self, time: ClockTime) -> bool {
        match (self.open, self.close) {
            (Some(open), Some(close)) => open <= time && time <= close,
            _ => false,
        }
    }
}

/// Opening hours for the seven weekdays, Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyHours {
    days: [DayHours; 7],
}

impl WeeklyHours {
    #[must_use]
    pub fn day(&self, weekday: Weekday) -> &DayHours {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, weekday: Weekday, hours: DayHours) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }

    #[must_use]
    pub fn with_day(mut self, weekday: Weekday, hours: DayHours) -> Self {
        self.set(weekday, hours);
        self
    }

    /// At least one of Saturday or Sunday has an opening time.
    #[must_use]
    pub fn has_weekend_hours(&self) -> bool {
        self.day(Weekday::Sat).open.is_some() || self.day(Weekday::Sun).open.is_some()
    }

    /// Both Saturday and Sunday have an opening time.
    #[must_use]
    pub fn open_both_weekend_days(&self) -> bool {
        self.day(Weekday::Sat).open.is_some() && self.day(Weekday::Sun).open.is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayHours)> {
        WEEK.iter().map(move |&day| (day, self.day(day)))
    }
}

impl Serialize for WeeklyHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(WEEK.len()))?;
        for (day, hours) in self.iter() {
            map.serialize_entry(weekday_key(day), hours)?;
        }
        map.end()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Lowercase English weekday name used as the opening-hours key.
#[must_use]
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Inverse of [`weekday_key`], case-insensitive.
#[must_use]
pub fn parse_weekday_key(key: &str) -> Option<Weekday> {
    let lowered = key.trim().to_ascii_lowercase();
    WEEK.iter().copied().find(|&day| weekday_key(day) == lowered)
}

/// A clinic as returned by one discovery query.
///
/// Immutable after creation; enriched doctor data is looked up by id rather
/// than written back into the record.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicRecord {
    pub id: ClinicId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub coordinate: Option<Coordinate>,
    pub opening_hours: WeeklyHours,
    pub facilities: BTreeSet<String>,
    /// Doctor identities in API order; no enrichment guarantee.
    pub doctor_refs: Vec<DoctorId>,
}

impl ClinicRecord {
    /// A bare record with no location, hours, facilities, or doctors.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ClinicId::new(id),
            name: name.into(),
            address: None,
            city: None,
            coordinate: None,
            opening_hours: WeeklyHours::default(),
            facilities: BTreeSet::new(),
            doctor_refs: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_doctors(&self) -> bool {
        !self.doctor_refs.is_empty()
    }
}

#[cfg(test)]
#[path = "clinics_test.rs"]
mod tests;
