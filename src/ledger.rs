// Reservation ledger: the application state the pricing and availability logic
// runs against. Reference tables are read-mostly; reservations are grouped per
// room so that a commit can re-check availability and bump the room's version
// under that room's lock alone.

use crate::availability::{find_conflicts, validate_extension, ExtensionError};
use crate::inventory::{
    InventoryError, MealPlan, MealPlanId, Reservation, ReservationId, ReservationStatus, Room,
    RoomId, RoomStatus, RoomType, RoomTypeId,
};
use crate::pricing::PricingContext;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Unknown reservation: {0}")]
    UnknownReservation(ReservationId),

    #[error("Reservation {0} already exists")]
    DuplicateReservation(ReservationId),

    #[error("Check-out {check_out} must be after check-in {check_in}")]
    InvalidInterval {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Room {room_id} changed: expected version {expected}, found {actual}")]
    VersionMismatch {
        room_id: RoomId,
        expected: u64,
        actual: u64,
    },

    #[error("Room {room_id} is already booked by {conflicting:?}")]
    Conflict {
        room_id: RoomId,
        conflicting: Vec<ReservationId>,
    },

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct LedgerStats {
    pub commits: AtomicUsize,
    pub extensions: AtomicUsize,
    pub status_changes: AtomicUsize,
    pub conflicts: AtomicUsize,
    pub version_mismatches: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LedgerStatsReport {
    pub commits: usize,
    pub extensions: usize,
    pub status_changes: usize,
    pub conflicts: usize,
    pub version_mismatches: usize,
}

#[derive(Debug, Default)]
struct RoomBook {
    // Bumped on every change to this room's reservations
    version: u64,
    reservations: Vec<Reservation>,
}

/// Consistent read of one room's reservations. Pass `version` back on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub version: u64,
    pub reservations: Vec<Reservation>,
}

/// Serialized form of the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub rooms: Vec<Room>,
    pub room_types: Vec<RoomType>,
    pub meal_plans: Vec<MealPlan>,
    pub reservations: Vec<Reservation>,
}

pub struct ReservationLedger {
    rooms: RwLock<HashMap<RoomId, Room>>,
    room_types: RwLock<HashMap<RoomTypeId, RoomType>>,
    meal_plans: RwLock<HashMap<MealPlanId, MealPlan>>,
    books: DashMap<RoomId, RoomBook>,
    // reservation id -> room id
    index: DashMap<ReservationId, RoomId>,
    next_id: AtomicU64,
    stats: LedgerStats,
}

impl ReservationLedger {
    pub fn new(rooms: Vec<Room>, room_types: Vec<RoomType>, meal_plans: Vec<MealPlan>) -> Self {
        Self {
            rooms: RwLock::new(rooms.into_iter().map(|r| (r.id.clone(), r)).collect()),
            room_types: RwLock::new(room_types.into_iter().map(|t| (t.id.clone(), t)).collect()),
            meal_plans: RwLock::new(meal_plans.into_iter().map(|m| (m.id.clone(), m)).collect()),
            books: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: LedgerStats::default(),
        }
    }

    /// Rebuilds a ledger from a snapshot, rejecting data that breaks the
    /// per-room no-overlap invariant or references unknown rooms.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let ledger = Self::new(snapshot.rooms, snapshot.room_types, snapshot.meal_plans);

        for reservation in snapshot.reservations {
            let id = reservation.id.clone();
            let version = ledger.snapshot(&reservation.room_id).version;
            ledger
                .insert(reservation, version)
                .map_err(|e| LedgerError::CorruptSnapshot(format!("reservation {}: {}", id, e)))?;
        }

        info!(
            rooms = ledger.rooms.read().len(),
            reservations = ledger.index.len(),
            "ledger loaded"
        );
        Ok(ledger)
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub fn to_snapshot(&self) -> LedgerSnapshot {
        let mut rooms: Vec<Room> = self.rooms.read().values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        let mut room_types: Vec<RoomType> = self.room_types.read().values().cloned().collect();
        room_types.sort_by(|a, b| a.id.cmp(&b.id));
        let mut meal_plans: Vec<MealPlan> = self.meal_plans.read().values().cloned().collect();
        meal_plans.sort_by(|a, b| a.id.cmp(&b.id));

        LedgerSnapshot {
            rooms,
            room_types,
            meal_plans,
            reservations: self.all_reservations(),
        }
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    // Runs `f` with the reference tables locked for reading
    pub fn with_pricing<R>(&self, f: impl FnOnce(&PricingContext<'_>) -> R) -> R {
        let rooms = self.rooms.read();
        let room_types = self.room_types.read();
        let meal_plans = self.meal_plans.read();
        f(&PricingContext {
            rooms: &rooms,
            room_types: &room_types,
            meal_plans: &meal_plans,
        })
    }

    pub fn room(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.read().get(room_id).cloned()
    }

    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.read().values().cloned().collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        rooms
    }

    pub fn set_room_status(&self, room_id: &RoomId, status: RoomStatus) -> Result<(), LedgerError> {
        let mut rooms = self.rooms.write();
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| LedgerError::UnknownRoom(room_id.clone()))?;
        room.status = status;
        Ok(())
    }

    pub fn snapshot(&self, room_id: &RoomId) -> RoomSnapshot {
        match self.books.get(room_id) {
            Some(book) => RoomSnapshot {
                room_id: room_id.clone(),
                version: book.version,
                reservations: book.reservations.clone(),
            },
            None => RoomSnapshot {
                room_id: room_id.clone(),
                version: 0,
                reservations: Vec::new(),
            },
        }
    }

    // Every reservation, ordered by check-in then id
    pub fn all_reservations(&self) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self
            .books
            .iter()
            .flat_map(|book| book.reservations.clone())
            .collect();
        all.sort_by(|a, b| a.check_in.cmp(&b.check_in).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn reservation(&self, id: &ReservationId) -> Option<Reservation> {
        let room_id = self.index.get(id).map(|r| r.clone())?;
        let book = self.books.get(&room_id)?;
        book.reservations.iter().find(|r| &r.id == id).cloned()
    }

    pub fn next_reservation_id(&self) -> ReservationId {
        loop {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let id = ReservationId::new(format!("RES-{:06}", n));
            if !self.index.contains_key(&id) {
                return id;
            }
        }
    }

    /// Commits a new reservation if the room's reservation set is still at
    /// `expected_version` and the stay is free. Returns the new version.
    pub fn commit_reservation(
        &self,
        reservation: Reservation,
        expected_version: u64,
    ) -> Result<u64, LedgerError> {
        let id = reservation.id.clone();
        let version = self.insert(reservation, expected_version)?;
        self.stats.commits.fetch_add(1, Ordering::SeqCst);
        info!(reservation = %id, version, "reservation committed");
        Ok(version)
    }

    fn insert(&self, reservation: Reservation, expected_version: u64) -> Result<u64, LedgerError> {
        if reservation.check_out <= reservation.check_in {
            return Err(LedgerError::InvalidInterval {
                check_in: reservation.check_in,
                check_out: reservation.check_out,
            });
        }
        if !self.rooms.read().contains_key(&reservation.room_id) {
            return Err(LedgerError::UnknownRoom(reservation.room_id.clone()));
        }

        // Holding the room's entry serializes check and write for that room
        let room_id = reservation.room_id.clone();
        let mut book = self.books.entry(room_id.clone()).or_default();
        self.check_version(&room_id, book.version, expected_version)?;

        if reservation.is_active() {
            let conflicting: Vec<ReservationId> = find_conflicts(
                &room_id,
                reservation.check_in,
                reservation.check_out,
                None,
                &book.reservations,
            )
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
            if !conflicting.is_empty() {
                self.stats.conflicts.fetch_add(1, Ordering::SeqCst);
                warn!(room_id = %room_id, ?conflicting, "commit rejected, room already booked");
                return Err(LedgerError::Conflict {
                    room_id,
                    conflicting,
                });
            }
        }

        match self.index.entry(reservation.id.clone()) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateReservation(reservation.id)),
            Entry::Vacant(slot) => {
                slot.insert(room_id);
            }
        }

        book.reservations.push(reservation);
        book.version += 1;
        Ok(book.version)
    }

    /// Moves a reservation's check-out later, re-validating under the room lock.
    pub fn commit_extension(
        &self,
        reservation_id: &ReservationId,
        new_check_out: NaiveDate,
        total_amount: f64,
        expected_version: u64,
    ) -> Result<u64, LedgerError> {
        let room_id = self.room_of(reservation_id)?;
        let mut book = self
            .books
            .get_mut(&room_id)
            .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;
        self.check_version(&room_id, book.version, expected_version)?;

        let pos = book
            .reservations
            .iter()
            .position(|r| &r.id == reservation_id)
            .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;

        let current = &book.reservations[pos];
        if let Err(e) = validate_extension(current, new_check_out, &book.reservations) {
            if matches!(e, ExtensionError::Conflict { .. }) {
                self.stats.conflicts.fetch_add(1, Ordering::SeqCst);
            }
            return Err(e.into());
        }

        let reservation = &mut book.reservations[pos];
        let previous = reservation.check_out;
        reservation.check_out = new_check_out;
        reservation.total_amount = total_amount;
        book.version += 1;
        self.stats.extensions.fetch_add(1, Ordering::SeqCst);

        info!(
            reservation = %reservation_id,
            %previous,
            %new_check_out,
            version = book.version,
            "reservation extended"
        );
        Ok(book.version)
    }

    /// Changes a reservation's status. Check-in marks the room occupied and
    /// check-out marks it for cleaning.
    pub fn set_status(
        &self,
        reservation_id: &ReservationId,
        status: ReservationStatus,
    ) -> Result<u64, LedgerError> {
        let room_id = self.room_of(reservation_id)?;
        let version = {
            let mut book = self
                .books
                .get_mut(&room_id)
                .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;
            let reservation = book
                .reservations
                .iter_mut()
                .find(|r| &r.id == reservation_id)
                .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;
            // No-op: readers holding the current version stay valid
            if reservation.status == status {
                return Ok(book.version);
            }
            reservation.set_status(status)?;
            book.version += 1;
            book.version
        };

        match status {
            ReservationStatus::CheckedIn => self.set_room_status(&room_id, RoomStatus::Occupied)?,
            ReservationStatus::CheckedOut => self.set_room_status(&room_id, RoomStatus::ToClean)?,
            _ => {}
        }

        self.stats.status_changes.fetch_add(1, Ordering::SeqCst);
        debug!(reservation = %reservation_id, %status, version, "status changed");
        Ok(version)
    }

    pub fn stats(&self) -> LedgerStatsReport {
        LedgerStatsReport {
            commits: self.stats.commits.load(Ordering::SeqCst),
            extensions: self.stats.extensions.load(Ordering::SeqCst),
            status_changes: self.stats.status_changes.load(Ordering::SeqCst),
            conflicts: self.stats.conflicts.load(Ordering::SeqCst),
            version_mismatches: self.stats.version_mismatches.load(Ordering::SeqCst),
        }
    }

    fn room_of(&self, reservation_id: &ReservationId) -> Result<RoomId, LedgerError> {
        self.index
            .get(reservation_id)
            .map(|r| r.clone())
            .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))
    }

    fn check_version(
        &self,
        room_id: &RoomId,
        actual: u64,
        expected: u64,
    ) -> Result<(), LedgerError> {
        if actual != expected {
            self.stats.version_mismatches.fetch_add(1, Ordering::SeqCst);
            debug!(room_id = %room_id, expected, actual, "stale room snapshot");
            return Err(LedgerError::VersionMismatch {
                room_id: room_id.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
