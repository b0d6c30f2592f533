//! Trip roster service - the per-trip locked aggregate
//!
//! Every trip sits behind its own `parking_lot::Mutex`. A mutating operation
//! holds that lock across the whole decide, persist, commit cycle:
//!
//! 1. clone the current trip
//! 2. apply the state-machine step to the clone (rejections end here, nothing changed)
//! 3. save the clone through the `TripStore`
//! 4. swap the clone in and return it as the snapshot
//!
//! A failed save therefore leaves the in-memory trip as it was. Operations on
//! different trips never contend; the index `RwLock` is only held long enough
//! to clone a trip's `Arc`.

use crate::domain::{Caller, Email, ListKind, Placement, RegistrationStatus, Trip, TripError, TripSummary};
use crate::infra::config::TripSeed;
use crate::infra::metrics::{Metrics, Operation};
use crate::io::store::{StoreError, TripStore};
use crate::services::clock::Clock;
use chrono::NaiveDate;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a roster operation was turned down
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Trip not found: {trip}")]
    NotFound { trip: String },

    #[error("{email} is already registered for {trip}")]
    AlreadyRegistered { trip: String, email: Email },

    #[error("{email} is not registered for {trip}")]
    NotRegistered { trip: String, email: Email },

    #[error("Check-in for {trip} is only open on {}, today is {today}", fmt_window(.window))]
    OutsideWindow { trip: String, today: NaiveDate, window: Option<NaiveDate> },

    #[error("Trip {trip} is busy, try again")]
    Busy { trip: String },

    #[error("Failed to save trip {trip}: {source}")]
    Storage {
        trip: String,
        #[source]
        source: StoreError,
    },
}

fn sort_summaries(mut summaries: Vec<TripSummary>) -> Vec<TripSummary> {
    summaries.sort_by(|a, b| a.trip_date.cmp(&b.trip_date).then_with(|| a.name.cmp(&b.name)));
    summaries
}

fn fmt_window(window: &Option<NaiveDate>) -> String {
    window.map(|d| d.to_string()).unwrap_or_else(|| "no day".to_string())
}

impl RosterError {
    fn from_trip(trip: &str, err: TripError) -> Self {
        let trip = trip.to_string();
        match err {
            TripError::AlreadyRegistered { email } => RosterError::AlreadyRegistered { trip, email },
            TripError::NotRegistered { email } => RosterError::NotRegistered { trip, email },
            TripError::OutsideWindow { today, window } => {
                RosterError::OutsideWindow { trip, today, window }
            }
        }
    }

    /// Stable machine-readable code
    pub fn kind(&self) -> &'static str {
        match self {
            RosterError::NotFound { .. } => "not_found",
            RosterError::AlreadyRegistered { .. } => "already_registered",
            RosterError::NotRegistered { .. } => "not_registered",
            RosterError::OutsideWindow { .. } => "outside_window",
            RosterError::Busy { .. } => "busy",
            RosterError::Storage { .. } => "storage",
        }
    }

    /// True when the same request may succeed later without changes
    pub fn is_retryable(&self) -> bool {
        matches!(self, RosterError::OutsideWindow { .. } | RosterError::Busy { .. })
    }
}

/// Everything a front end needs to render one trip for one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerView {
    pub trip: Trip,
    pub registered: bool,
    pub status: RegistrationStatus,
    pub status_text: String,
    pub can_check_in: bool,
    pub check_in_date: Option<NaiveDate>,
}

pub struct TripRoster {
    trips: RwLock<FxHashMap<String, Arc<Mutex<Trip>>>>,
    store: Arc<dyn TripStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    lock_timeout: Duration,
}

impl TripRoster {
    /// Empty roster; trips are added by `open` or `add_trip`
    pub fn new(
        store: Arc<dyn TripStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        lock_timeout: Duration,
    ) -> Self {
        Self { trips: RwLock::new(FxHashMap::default()), store, clock, metrics, lock_timeout }
    }

    /// Load every stored trip, then create any seeded trip the store lacks
    ///
    /// Stored state wins over a seed with the same name. Stored trips whose
    /// lists break the roster invariants are repaired and written back.
    pub fn open(
        store: Arc<dyn TripStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        lock_timeout: Duration,
        seeds: &[TripSeed],
    ) -> Result<Self, StoreError> {
        let roster = Self::new(store.clone(), clock, metrics, lock_timeout);

        for mut trip in store.load_all()? {
            let changes = trip.repair();
            if changes > 0 {
                warn!(trip = %trip.name(), changes = %changes, "trip_repaired_on_load");
                store.save(&trip)?;
            }
            if !roster.add_trip(trip) {
                warn!("trip_duplicate_in_store_ignored");
            }
        }

        for seed in seeds {
            if let Some(existing) = roster.trips.read().get(&seed.name) {
                let existing = existing.lock();
                if existing.date() != seed.date || existing.bus_capacity() != seed.bus_capacity {
                    warn!(
                        trip = %seed.name,
                        stored_date = %existing.date(),
                        stored_capacity = %existing.bus_capacity(),
                        seed_date = %seed.date,
                        seed_capacity = %seed.bus_capacity,
                        "trip_seed_differs_from_store"
                    );
                }
                continue;
            }

            let Some(capacity) = NonZeroUsize::new(seed.bus_capacity) else {
                warn!(trip = %seed.name, "trip_seed_zero_capacity_skipped");
                continue;
            };
            let trip = Trip::new(seed.name.clone(), seed.date, capacity);
            store.save(&trip)?;
            info!(trip = %seed.name, date = %seed.date, bus_capacity = %capacity, "trip_seeded");
            roster.add_trip(trip);
        }

        info!(trips = %roster.trips.read().len(), "roster_opened");
        Ok(roster)
    }

    /// Register a trip in memory; returns false if the name is taken
    pub fn add_trip(&self, trip: Trip) -> bool {
        let mut trips = self.trips.write();
        if trips.contains_key(trip.name()) {
            return false;
        }
        trips.insert(trip.name().to_string(), Arc::new(Mutex::new(trip)));
        true
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// GetDetails: current snapshot of one trip
    pub fn get_details(&self, trip: &str) -> Result<Trip, RosterError> {
        let start = Instant::now();
        let result = self.read(trip, |t| t.clone());
        self.observe(Operation::GetDetails, trip, start, result)
    }

    /// Summaries of every trip, soonest first
    ///
    /// Fails with `Busy` if any trip stays locked past the lock timeout.
    pub fn list_trips(&self) -> Result<Vec<TripSummary>, RosterError> {
        let start = Instant::now();
        let result = self
            .slots()
            .iter()
            .map(|(name, slot)| self.lock(name, slot).map(|t| t.summary()))
            .collect::<Result<Vec<_>, _>>()
            .map(sort_summaries);
        self.observe(Operation::ListTrips, "*", start, result)
    }

    /// Summaries for metrics scrapes; not counted as an operation
    ///
    /// A trip still locked after the lock timeout is left out.
    pub fn summaries(&self) -> Vec<TripSummary> {
        let summaries = self
            .slots()
            .iter()
            .filter_map(|(name, slot)| match self.lock(name, slot) {
                Ok(t) => Some(t.summary()),
                Err(_) => {
                    debug!(trip = %name, "trip_summary_skipped_busy");
                    None
                }
            })
            .collect();
        sort_summaries(summaries)
    }

    /// Snapshot plus the caller's status and check-in eligibility
    pub fn caller_view(&self, trip: &str, caller: &Caller) -> Result<CallerView, RosterError> {
        let start = Instant::now();
        let today = self.clock.today();
        let result = self.read(trip, |t| {
            let status = t.status(&caller.email);
            CallerView {
                registered: status.is_registered(),
                status_text: status.text(),
                can_check_in: t.can_check_in(&caller.email, today),
                check_in_date: t.check_in_date(),
                status,
                trip: t.clone(),
            }
        });
        self.observe(Operation::CallerView, trip, start, result)
    }

    /// Register: seat the caller, or waitlist them if the bus is full
    pub fn register(&self, trip: &str, caller: &Caller) -> Result<Trip, RosterError> {
        let start = Instant::now();
        let result = self.mutate(trip, |t, _today| t.register(caller)).map(|(snapshot, placement)| {
            match placement {
                Placement::Bus => {
                    info!(trip = %trip, email = %caller.email, seats_taken = %snapshot.bus_list().len(), "trip_registered_bus");
                }
                Placement::Waitlist(position) => {
                    info!(trip = %trip, email = %caller.email, position = %position, "trip_registered_waitlist");
                }
            }
            self.metrics.record_registration(placement == Placement::Bus);
            snapshot
        });
        self.observe(Operation::Register, trip, start, result)
    }

    /// CheckIn: flag the caller as checked in, on the check-in day only
    pub fn check_in(&self, trip: &str, caller: &Caller) -> Result<Trip, RosterError> {
        let start = Instant::now();
        let result = self.mutate(trip, |t, today| t.check_in(&caller.email, today)).map(
            |(snapshot, list)| {
                info!(trip = %trip, email = %caller.email, list = %list.as_str(), "trip_checked_in");
                self.metrics.record_check_in();
                snapshot
            },
        );
        self.observe(Operation::CheckIn, trip, start, result)
    }

    /// Remove: drop the caller, promoting the waitlist head if a seat freed up
    pub fn remove(&self, trip: &str, caller: &Caller) -> Result<Trip, RosterError> {
        let start = Instant::now();
        let result = self.mutate(trip, |t, _today| t.remove(&caller.email)).map(
            |(snapshot, removal)| {
                info!(
                    trip = %trip,
                    email = %removal.removed.email,
                    list = %removal.from.as_str(),
                    "trip_registration_removed"
                );
                if let Some(promoted) = &removal.promoted {
                    info!(
                        trip = %trip,
                        email = %promoted.email,
                        checked_in = %promoted.check_in.is_checked_in(),
                        "waitlist_promoted"
                    );
                }
                debug_assert!(removal.from == ListKind::Bus || removal.promoted.is_none());
                self.metrics.record_removal(usize::from(removal.promoted.is_some()));
                snapshot
            },
        );
        self.observe(Operation::Remove, trip, start, result)
    }

    fn slots(&self) -> Vec<(String, Arc<Mutex<Trip>>)> {
        self.trips.read().iter().map(|(name, slot)| (name.clone(), slot.clone())).collect()
    }

    fn slot(&self, trip: &str) -> Result<Arc<Mutex<Trip>>, RosterError> {
        self.trips
            .read()
            .get(trip)
            .cloned()
            .ok_or_else(|| RosterError::NotFound { trip: trip.to_string() })
    }

    fn lock<'a>(&self, trip: &str, slot: &'a Mutex<Trip>) -> Result<MutexGuard<'a, Trip>, RosterError> {
        slot.try_lock_for(self.lock_timeout).ok_or_else(|| RosterError::Busy { trip: trip.to_string() })
    }

    fn read<T>(&self, trip: &str, f: impl FnOnce(&Trip) -> T) -> Result<T, RosterError> {
        let slot = self.slot(trip)?;
        let guard = self.lock(trip, &slot)?;
        Ok(f(&guard))
    }

    /// Apply `f` to a copy of the trip, persist it, then publish it
    fn mutate<T>(
        &self,
        trip: &str,
        f: impl FnOnce(&mut Trip, NaiveDate) -> Result<T, TripError>,
    ) -> Result<(Trip, T), RosterError> {
        let slot = self.slot(trip)?;
        let mut guard = self.lock(trip, &slot)?;

        let mut next = guard.clone();
        let outcome = f(&mut next, self.clock.today()).map_err(|e| RosterError::from_trip(trip, e))?;

        self.store
            .save(&next)
            .map_err(|source| RosterError::Storage { trip: trip.to_string(), source })?;

        *guard = next.clone();
        Ok((next, outcome))
    }

    fn observe<T>(
        &self,
        op: Operation,
        trip: &str,
        start: Instant,
        result: Result<T, RosterError>,
    ) -> Result<T, RosterError> {
        self.metrics.record_operation(op, start.elapsed().as_micros() as u64);
        if let Err(e) = &result {
            self.metrics.record_rejection(e.kind());
            match e {
                RosterError::Storage { .. } => {
                    error!(op = %op.as_str(), trip = %trip, error = %e, "roster_storage_failed");
                }
                RosterError::Busy { .. } => {
                    warn!(op = %op.as_str(), trip = %trip, "roster_lock_timeout");
                }
                _ => {
                    debug!(op = %op.as_str(), trip = %trip, kind = %e.kind(), error = %e, "roster_rejected");
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CheckInStatus;
    use crate::io::store::MemoryStore;
    use crate::services::clock::FixedClock;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(name: &str, capacity: usize) -> TripSeed {
        TripSeed { name: name.to_string(), date: date(2025, 5, 10), bus_capacity: capacity }
    }

    struct Harness {
        roster: TripRoster,
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
    }

    fn harness(capacity: usize) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(date(2025, 5, 1)));
        let roster = TripRoster::open(
            store.clone(),
            clock.clone(),
            Arc::new(Metrics::new()),
            Duration::from_millis(50),
            &[seed("May", capacity)],
        )
        .unwrap();
        Harness { roster, store, clock }
    }

    fn caller(tag: &str) -> Caller {
        Caller::new(tag.to_uppercase(), format!("{tag}@example.com").as_str())
    }

    fn emails(list: &[crate::domain::Registrant]) -> Vec<&str> {
        list.iter().map(|r| r.email.as_str()).collect()
    }

    #[test]
    fn test_unknown_trip_is_not_found() {
        let h = harness(2);
        for result in [
            h.roster.get_details("Nope").map(|_| ()),
            h.roster.register("Nope", &caller("a")).map(|_| ()),
            h.roster.check_in("Nope", &caller("a")).map(|_| ()),
            h.roster.remove("Nope", &caller("a")).map(|_| ()),
            h.roster.caller_view("Nope", &caller("a")).map(|_| ()),
        ] {
            assert!(matches!(result, Err(RosterError::NotFound { .. })));
        }
        assert_eq!(h.roster.metrics().rejections("not_found"), 5);
    }

    #[test]
    fn test_scenario_persists_each_step() {
        let h = harness(2);
        h.roster.register("May", &caller("a")).unwrap();
        h.roster.register("May", &caller("b")).unwrap();
        let snap = h.roster.register("May", &caller("c")).unwrap();
        assert_eq!(emails(snap.wait_list()), ["c@example.com"]);

        let snap = h.roster.remove("May", &caller("a")).unwrap();
        assert_eq!(emails(snap.bus_list()), ["b@example.com", "c@example.com"]);
        assert!(snap.wait_list().is_empty());

        let snap = h.roster.remove("May", &caller("b")).unwrap();
        assert_eq!(emails(snap.bus_list()), ["c@example.com"]);

        assert_eq!(h.store.get("May").unwrap(), snap);
        assert_eq!(h.roster.get_details("May").unwrap(), snap);
        assert_eq!(h.roster.metrics().snapshot().promotions_total, 1);
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let h = harness(2);
        h.roster.register("May", &caller("a")).unwrap();
        let err = h.roster.register("May", &Caller::new("A", "A@Example.com")).unwrap_err();
        assert_eq!(err.kind(), "already_registered");
        assert!(!err.is_retryable());
        assert_eq!(emails(h.roster.get_details("May").unwrap().bus_list()), ["a@example.com"]);
    }

    #[test]
    fn test_check_in_follows_clock() {
        let h = harness(2);
        h.roster.register("May", &caller("a")).unwrap();

        h.clock.set(date(2025, 5, 7));
        let err = h.roster.check_in("May", &caller("a")).unwrap_err();
        assert!(matches!(err, RosterError::OutsideWindow { window: Some(w), .. } if w == date(2025, 5, 8)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("2025-05-08"));

        h.clock.set(date(2025, 5, 9));
        assert_eq!(h.roster.check_in("May", &caller("a")).unwrap_err().kind(), "outside_window");

        h.clock.set(date(2025, 5, 8));
        let snap = h.roster.check_in("May", &caller("a")).unwrap();
        assert_eq!(snap.bus_list()[0].check_in, CheckInStatus::CheckedIn);
        assert_eq!(h.store.get("May").unwrap().bus_list()[0].check_in, CheckInStatus::CheckedIn);
    }

    #[test]
    fn test_check_in_unregistered() {
        let h = harness(2);
        h.clock.set(date(2025, 5, 8));
        let err = h.roster.check_in("May", &caller("z")).unwrap_err();
        assert_eq!(err.kind(), "not_registered");
        assert!(h.roster.get_details("May").unwrap().bus_list().is_empty());
    }

    #[test]
    fn test_caller_view() {
        let h = harness(1);
        h.roster.register("May", &caller("a")).unwrap();
        h.roster.register("May", &caller("b")).unwrap();

        let view = h.roster.caller_view("May", &caller("b")).unwrap();
        assert!(view.registered);
        assert_eq!(view.status_text, "You are on the waitlist at position 1.");
        assert!(!view.can_check_in);
        assert_eq!(view.check_in_date, Some(date(2025, 5, 8)));

        h.clock.set(date(2025, 5, 8));
        assert!(h.roster.caller_view("May", &caller("b")).unwrap().can_check_in);

        let view = h.roster.caller_view("May", &caller("z")).unwrap();
        assert!(!view.registered);
        assert!(!view.can_check_in);
        assert_eq!(view.status_text, "");
    }

    #[test]
    fn test_failed_save_leaves_trip_unchanged() {
        let h = harness(1);
        h.roster.register("May", &caller("a")).unwrap();
        h.roster.register("May", &caller("b")).unwrap();
        let before = h.roster.get_details("May").unwrap();

        h.store.fail_saves(true);
        let err = h.roster.remove("May", &caller("a")).unwrap_err();
        assert_eq!(err.kind(), "storage");
        assert_eq!(h.roster.get_details("May").unwrap(), before);
        assert_eq!(h.roster.metrics().snapshot().promotions_total, 0);

        h.store.fail_saves(false);
        let snap = h.roster.remove("May", &caller("a")).unwrap();
        assert_eq!(emails(snap.bus_list()), ["b@example.com"]);
    }

    #[test]
    fn test_busy_when_lock_held() {
        let h = harness(2);
        let slot = h.roster.slot("May").unwrap();
        let _held = slot.lock();

        let err = h.roster.register("May", &caller("a")).unwrap_err();
        assert_eq!(err.kind(), "busy");
        assert!(err.is_retryable());
        assert_eq!(h.roster.metrics().rejections("busy"), 1);
    }

    #[test]
    fn test_listing_waits_no_longer_than_lock_timeout() {
        let h = harness(2);
        let slot = h.roster.slot("May").unwrap();
        let _held = slot.lock();

        let start = Instant::now();
        let err = h.roster.list_trips().unwrap_err();
        assert_eq!(err.kind(), "busy");
        assert!(h.roster.summaries().is_empty());
        assert!(start.elapsed() < Duration::from_secs(1), "waited {:?}", start.elapsed());
        assert_eq!(h.roster.metrics().rejections("busy"), 1);
    }

    #[test]
    fn test_other_trip_not_blocked_by_held_lock() {
        let store = Arc::new(MemoryStore::new());
        let roster = TripRoster::open(
            store,
            Arc::new(FixedClock::new(date(2025, 5, 1))),
            Arc::new(Metrics::new()),
            Duration::from_millis(50),
            &[seed("A", 1), seed("B", 1)],
        )
        .unwrap();

        let slot = roster.slot("A").unwrap();
        let _held = slot.lock();
        assert!(roster.register("B", &caller("x")).is_ok());
    }

    #[test]
    fn test_concurrent_registers_respect_capacity() {
        let store = Arc::new(MemoryStore::new());
        let roster = Arc::new(
            TripRoster::open(
                store,
                Arc::new(FixedClock::new(date(2025, 5, 1))),
                Arc::new(Metrics::new()),
                Duration::from_secs(5),
                &[seed("May", 10)],
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let roster = roster.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let c = Caller::new("P", format!("p{worker}-{i}@example.com").as_str());
                        roster.register("May", &c).unwrap();
                        // Everyone also retries once; must be rejected
                        assert_eq!(roster.register("May", &c).unwrap_err().kind(), "already_registered");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let trip = roster.get_details("May").unwrap();
        assert_eq!(trip.bus_list().len(), 10);
        assert_eq!(trip.wait_list().len(), 70);
    }

    #[test]
    fn test_concurrent_removes_promote_once_per_seat() {
        let store = Arc::new(MemoryStore::new());
        let roster = Arc::new(
            TripRoster::open(
                store,
                Arc::new(FixedClock::new(date(2025, 5, 1))),
                Arc::new(Metrics::new()),
                Duration::from_secs(5),
                &[seed("May", 4)],
            )
            .unwrap(),
        );
        for i in 0..6 {
            roster.register("May", &caller(&format!("r{i}"))).unwrap();
        }

        // Four seated people leave at once; only two waiters exist
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let roster = roster.clone();
                std::thread::spawn(move || roster.remove("May", &caller(&format!("r{i}"))).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let trip = roster.get_details("May").unwrap();
        assert_eq!(emails(trip.bus_list()).len(), 2);
        assert!(trip.wait_list().is_empty());
        assert_eq!(roster.metrics().snapshot().promotions_total, 2);
    }

    #[test]
    fn test_open_prefers_store_and_repairs() {
        let raw = r#"{
            "name": "May", "tripDate": "2025-05-10", "busCapacity": 1,
            "busList": [
                {"name": "A", "email": "a@example.com"},
                {"name": "B", "email": "b@example.com"}
            ],
            "waitList": []
        }"#;
        let stored: Trip = serde_json::from_str(raw).unwrap();
        let store = Arc::new(MemoryStore::with_trips([stored]));

        let roster = TripRoster::open(
            store.clone(),
            Arc::new(FixedClock::new(date(2025, 5, 1))),
            Arc::new(Metrics::new()),
            Duration::from_millis(50),
            &[seed("May", 30), seed("June", 5)],
        )
        .unwrap();

        let may = roster.get_details("May").unwrap();
        assert_eq!(may.bus_capacity(), 1);
        assert_eq!(emails(may.bus_list()), ["a@example.com"]);
        assert_eq!(emails(may.wait_list()), ["b@example.com"]);
        assert_eq!(store.get("May").unwrap(), may);

        assert_eq!(roster.get_details("June").unwrap().bus_capacity(), 5);
        assert!(store.get("June").is_some());
    }

    #[test]
    fn test_list_trips_sorted_by_date() {
        let store = Arc::new(MemoryStore::new());
        let later = TripSeed { name: "Later".to_string(), date: date(2025, 6, 1), bus_capacity: 3 };
        let roster = TripRoster::open(
            store,
            Arc::new(FixedClock::new(date(2025, 5, 1))),
            Arc::new(Metrics::new()),
            Duration::from_millis(50),
            &[later, seed("Sooner", 2)],
        )
        .unwrap();
        roster.register("Sooner", &caller("a")).unwrap();

        let list = roster.list_trips().unwrap();
        let names: Vec<_> = list.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Sooner", "Later"]);
        assert_eq!(list[0].seats_taken, 1);
        assert_eq!(list[0].bus_capacity, 2);
    }
}
