use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Multipliers are stored in basis points: 10000 = 1.0x.
pub const MULTIPLIER_SCALE: i64 = 10_000;

/// Set of weekdays, 0 = Sunday .. 6 = Saturday, stored as a bitmask.
/// Serialized as a sorted list of weekday numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn from_days(days: &[u8]) -> Result<Self, String> {
        let mut mask = 0u8;
        for &day in days {
            if day > 6 {
                return Err(format!("weekday out of range: {day}"));
            }
            mask |= 1 << day;
        }
        Ok(Self(mask))
    }

    pub fn from_mask(mask: i16) -> Self {
        Self((mask & 0x7f) as u8)
    }

    pub fn mask(&self) -> i16 {
        self.0 as i16
    }

    pub fn contains(&self, weekday: u32) -> bool {
        weekday < 7 && self.0 & (1 << weekday) != 0
    }

    pub fn days(&self) -> Vec<u8> {
        (0..7u8).filter(|d| self.0 & (1 << d) != 0).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.days().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<u8>::deserialize(deserializer)?;
        WeekdaySet::from_days(&days).map_err(serde::de::Error::custom)
    }
}

/// Time-boxed points multiplier, managed by administrators.
/// - applicable_days: weekday bitmask, NULL means every day
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub multiplier_bp: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub applicable_days: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_bp as f64 / MULTIPLIER_SCALE as f64
    }

    pub fn weekdays(&self) -> Option<WeekdaySet> {
        self.applicable_days.map(WeekdaySet::from_mask)
    }

    /// Active flag, window containing `now`, and weekday (0 = Sunday) allowed.
    pub fn applies_at(&self, now: DateTime<Utc>, weekday: u32) -> bool {
        self.is_active
            && self.start_date <= now
            && self.end_date >= now
            && self.weekdays().is_none_or(|days| days.contains(weekday))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
