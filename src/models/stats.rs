use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    packing::PackingProgress,
    trip::{Trip, TripPhase},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TravelStats {
    pub trips: usize,
    pub upcoming_trips: usize,
    pub ongoing_trips: usize,
    pub past_trips: usize,
    pub destinations: usize,
    pub days_travelled: i64,
    pub journal_entries: i64,
    pub activities: i64,
    pub photos: i64,
    pub packing: PackingProgress,
}

impl TravelStats {
    /// Fills in the trip-derived figures. Ongoing trips count up to `today`.
    pub fn from_trips(trips: &[Trip], today: NaiveDate) -> Self {
        let mut stats = TravelStats {
            trips: trips.len(),
            ..Default::default()
        };
        let mut places = BTreeSet::new();

        for trip in trips {
            for destination in &trip.destinations.0 {
                places.insert(destination.trim().to_lowercase());
            }
            match trip.phase(today) {
                TripPhase::Upcoming => stats.upcoming_trips += 1,
                TripPhase::Ongoing => {
                    stats.ongoing_trips += 1;
                    stats.days_travelled += (today - trip.start_date).num_days() + 1;
                }
                TripPhase::Past => {
                    stats.past_trips += 1;
                    stats.days_travelled += trip.length_in_days();
                }
            }
        }

        stats.destinations = places.len();
        stats
    }
}
