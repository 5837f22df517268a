use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoachError, Result};

/// A free window in the athlete's day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(CoachError::Validation(format!(
                "Time slot ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Free/busy state for one day, already fetched by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarContext {
    pub date: NaiveDate,
    pub free_slots: Vec<TimeSlot>,
}

impl CalendarContext {
    pub fn new(date: NaiveDate, free_slots: Vec<TimeSlot>) -> Self {
        Self { date, free_slots }
    }

    /// True if some free slot can hold `minutes` of training
    pub fn has_slot_for(&self, minutes: u32) -> bool {
        self.free_slots
            .iter()
            .any(|slot| slot.minutes() >= i64::from(minutes))
    }
}

/// Calendar collaborator
pub trait CalendarProvider {
    /// Free slots on a date; an unknown date has none
    fn free_slots(&self, date: NaiveDate) -> Vec<TimeSlot>;

    fn has_free_slot(&self, date: NaiveDate, minutes: u32) -> bool {
        self.context(date).has_slot_for(minutes)
    }

    fn context(&self, date: NaiveDate) -> CalendarContext {
        CalendarContext::new(date, self.free_slots(date))
    }
}

/// In-memory calendar, keyed by date
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    days: HashMap<NaiveDate, Vec<TimeSlot>>,
}

impl StaticCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slot(&mut self, date: NaiveDate, slot: TimeSlot) {
        self.days.entry(date).or_default().push(slot);
    }
}

impl CalendarProvider for StaticCalendar {
    fn free_slots(&self, date: NaiveDate) -> Vec<TimeSlot> {
        self.days.get(&date).cloned().unwrap_or_default()
    }
}

/// First date after `from`, within `search_days`, with room for the session
pub fn find_reschedule_date<P: CalendarProvider + ?Sized>(
    provider: &P,
    from: NaiveDate,
    minutes: u32,
    search_days: u32,
) -> Option<NaiveDate> {
    (1..=i64::from(search_days))
        .map(|offset| from + Duration::days(offset))
        .find(|date| provider.has_free_slot(*date, minutes))
}
