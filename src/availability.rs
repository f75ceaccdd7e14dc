// Availability checking: decides whether a room can be booked or extended for
// a requested interval without colliding with existing bookings.
//
// Everything here is a pure read over a reservation snapshot supplied by the
// caller. Serializing the check with the eventual write is the ledger's job.

use crate::inventory::{Reservation, ReservationId, ReservationStatus, Room, RoomId};
use crate::stay::intervals_overlap;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtensionError {
    #[error("New check-out {requested} must be after the current check-out {current}")]
    NotLonger {
        current: NaiveDate,
        requested: NaiveDate,
    },

    #[error("Reservation in status {0} cannot be extended")]
    NotExtendable(ReservationStatus),

    #[error("Extension conflicts with reservations {conflicting:?}")]
    Conflict { conflicting: Vec<ReservationId> },
}

fn competing<'a, 'b>(
    room_id: &'b RoomId,
    exclude: Option<&'b ReservationId>,
    reservations: &'a [Reservation],
) -> impl Iterator<Item = &'a Reservation> + 'b
where
    'a: 'b,
{
    reservations.iter().filter(move |r| {
        &r.room_id == room_id && exclude.map_or(true, |id| &r.id != id) && r.is_active()
    })
}

/// Returns every non-canceled reservation of `room_id` whose stay intersects
/// `[check_in, check_out)`, skipping `exclude` (the reservation being extended).
pub fn find_conflicts<'a>(
    room_id: &RoomId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude: Option<&ReservationId>,
    reservations: &'a [Reservation],
) -> Vec<&'a Reservation> {
    competing(room_id, exclude, reservations)
        .filter(|existing| {
            let conflict =
                intervals_overlap(existing.check_in, existing.check_out, check_in, check_out);
            if conflict {
                trace!(
                    room_id = %room_id,
                    existing = %existing.id,
                    existing_check_in = %existing.check_in,
                    existing_check_out = %existing.check_out,
                    "interval conflict"
                );
            }
            conflict
        })
        .collect()
}

/// True when `room_id` has no active reservation intersecting the requested
/// half-open interval. A room with no reservations is always available.
pub fn is_room_available_for_interval(
    room_id: &RoomId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude: Option<&ReservationId>,
    reservations: &[Reservation],
) -> bool {
    !competing(room_id, exclude, reservations).any(|existing| {
        intervals_overlap(existing.check_in, existing.check_out, check_in, check_out)
    })
}

/// Checks that `reservation` may be stretched to `new_check_out`.
///
/// The new date must strictly lengthen the stay, whatever the conflict state.
/// Only the added nights `[current check_out, new_check_out)` are tested, with
/// the reservation itself excluded from the competing set.
pub fn validate_extension(
    reservation: &Reservation,
    new_check_out: NaiveDate,
    reservations: &[Reservation],
) -> Result<(), ExtensionError> {
    if new_check_out <= reservation.check_out {
        return Err(ExtensionError::NotLonger {
            current: reservation.check_out,
            requested: new_check_out,
        });
    }

    if !matches!(
        reservation.status,
        ReservationStatus::Confirmed | ReservationStatus::CheckedIn
    ) {
        return Err(ExtensionError::NotExtendable(reservation.status));
    }

    let conflicting: Vec<ReservationId> = find_conflicts(
        &reservation.room_id,
        reservation.check_out,
        new_check_out,
        Some(&reservation.id),
        reservations,
    )
    .into_iter()
    .map(|r| r.id.clone())
    .collect();

    if conflicting.is_empty() {
        debug!(reservation = %reservation.id, %new_check_out, "extension available");
        Ok(())
    } else {
        debug!(reservation = %reservation.id, %new_check_out, ?conflicting, "extension blocked");
        Err(ExtensionError::Conflict { conflicting })
    }
}

// Borrowed view over one snapshot, for callers testing many intervals at once
pub struct AvailabilityChecker<'a> {
    reservations: &'a [Reservation],
}

impl<'a> AvailabilityChecker<'a> {
    pub fn new(reservations: &'a [Reservation]) -> Self {
        Self { reservations }
    }

    pub fn is_available(
        &self,
        room_id: &RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<&ReservationId>,
    ) -> bool {
        is_room_available_for_interval(room_id, check_in, check_out, exclude, self.reservations)
    }

    pub fn conflicts(
        &self,
        room_id: &RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<&ReservationId>,
    ) -> Vec<&'a Reservation> {
        find_conflicts(room_id, check_in, check_out, exclude, self.reservations)
    }

    pub fn validate_extension(
        &self,
        reservation: &Reservation,
        new_check_out: NaiveDate,
    ) -> Result<(), ExtensionError> {
        validate_extension(reservation, new_check_out, self.reservations)
    }

    // Rooms with no booking in the interval, in input order
    pub fn free_rooms<'r>(
        &self,
        rooms: impl IntoIterator<Item = &'r Room>,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Vec<&'r Room> {
        rooms
            .into_iter()
            .filter(|room| self.is_available(&room.id, check_in, check_out, None))
            .collect()
    }
}
