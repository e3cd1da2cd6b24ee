//! Groups a trip's activities into calendar days.
//!
//! Days are derived from the activity's local date in the requested zone, and
//! the range is walked date by date. No fixed 24-hour steps are involved, so
//! days that are 23 or 25 hours long around a DST switch still form exactly
//! one bucket each.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::models::activity::Activity;

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryDay {
    pub date: NaiveDate,
    /// 1-based position of the day within the trip.
    pub day_number: usize,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub timezone: String,
    pub days: Vec<ItineraryDay>,
    /// Activities whose local date lies outside the range.
    pub unscheduled: Vec<Activity>,
}

/// Local calendar date of an activity in `tz`.
pub fn local_date<Tz: TimeZone>(activity: &Activity, tz: &Tz) -> NaiveDate {
    activity.starts_at.with_timezone(tz).date_naive()
}

pub fn build_itinerary<Tz>(
    start: NaiveDate,
    end: NaiveDate,
    activities: Vec<Activity>,
    tz: &Tz,
) -> Itinerary
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    let mut unscheduled = Vec::new();

    for activity in activities {
        let date = local_date(&activity, tz);
        if start <= date && date <= end {
            buckets.entry(date).or_default().push(activity);
        } else {
            unscheduled.push(activity);
        }
    }

    let days = if end < start {
        Vec::new()
    } else {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .enumerate()
            .map(|(idx, date)| {
                let mut activities = buckets.remove(&date).unwrap_or_default();
                activities.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.title.cmp(&b.title)));
                ItineraryDay {
                    date,
                    day_number: idx + 1,
                    activities,
                }
            })
            .collect()
    };

    unscheduled.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));

    Itinerary {
        timezone: zone_label(tz, start),
        days,
        unscheduled,
    }
}

fn zone_label<Tz>(tz: &Tz, on: NaiveDate) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    on.and_hms_opt(12, 0, 0)
        .and_then(|noon| tz.from_local_datetime(&noon).earliest())
        .map(|dt| dt.offset().to_string())
        .unwrap_or_default()
}
