// Reservation creation workflow
//
// New bookings walk SelectingDates -> SelectingRooms -> EnteringGuestDetails
// -> ReviewingSummary -> Confirmed. Extend mode only changes the check-out
// date and jumps from SelectingDates straight to ReviewingSummary; when the
// extension collides with another booking the operator may check the guest
// out instead, ending in CheckedOut.

use crate::availability::{validate_extension, ExtensionError};
use crate::config::EngineConfig;
use crate::inventory::{Reservation, ReservationId, ReservationStatus, RoomId};
use crate::ledger::{LedgerError, ReservationLedger};
use crate::pricing::{compute_invoice, Adjustments, InvoiceBreakdown, PricingError, RoomSelection};
use crate::stay::{Field, FieldError, StayDates, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStep {
    SelectingDates,
    SelectingRooms,
    EnteringGuestDetails,
    ReviewingSummary,
    Confirmed,
    CheckedOut,
}

impl WorkflowStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::CheckedOut)
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowMode {
    New,
    Extend { reservation_id: ReservationId },
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Cannot {action} while in step {from}")]
    InvalidTransition {
        from: WorkflowStep,
        action: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Stay of {nights} nights exceeds the maximum of {max}")]
    StayTooLong { nights: u32, max: u32 },

    #[error("Check-in date cannot change when extending a reservation")]
    CheckInLocked,

    #[error("At least one room must be selected")]
    NoRoomsSelected,

    #[error("Room {0} selected more than once")]
    DuplicateRoom(RoomId),

    #[error("Room {0} is not available for the selected dates")]
    RoomUnavailable(RoomId),

    #[error("Invalid guest details: {0}")]
    InvalidGuests(String),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDetails {
    pub customer_name: String,
    pub adults: u32,
    pub children: u32,
    // Walk-in guests are checked in as soon as the booking is committed
    #[serde(default)]
    pub check_in_now: bool,
}

pub struct BookingWorkflow {
    mode: WorkflowMode,
    step: WorkflowStep,
    adjustments: Adjustments,
    max_stay_nights: u32,
    dates: Option<StayDates>,
    selections: Vec<RoomSelection>,
    guests: Option<GuestDetails>,
    // Extend mode: the reservation as read when the workflow was opened
    original: Option<Reservation>,
    // Room versions observed when availability was checked, used on commit
    read_versions: HashMap<RoomId, u64>,
    pending_conflict: Option<Vec<ReservationId>>,
    quote: Option<InvoiceBreakdown>,
    committed: Vec<ReservationId>,
}

impl BookingWorkflow {
    pub fn new(config: &EngineConfig) -> Result<Self, WorkflowError> {
        Ok(Self {
            mode: WorkflowMode::New,
            step: WorkflowStep::SelectingDates,
            adjustments: config.booking_adjustments()?,
            max_stay_nights: config.max_stay_nights,
            dates: None,
            selections: Vec::new(),
            guests: None,
            original: None,
            read_versions: HashMap::new(),
            pending_conflict: None,
            quote: None,
            committed: Vec::new(),
        })
    }

    pub fn extend(
        config: &EngineConfig,
        ledger: &ReservationLedger,
        reservation_id: &ReservationId,
    ) -> Result<Self, WorkflowError> {
        let reservation = ledger
            .reservation(reservation_id)
            .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;

        let mut workflow = Self::new(config)?;
        workflow.mode = WorkflowMode::Extend {
            reservation_id: reservation_id.clone(),
        };
        let mut selection = RoomSelection::new(reservation.room_id.clone())?;
        if let Some(plan) = &reservation.meal_plan_id {
            selection = selection.with_meal_plan(plan.clone());
        }
        workflow.selections = vec![selection];
        workflow.guests = Some(GuestDetails {
            customer_name: reservation.customer_name.clone(),
            adults: reservation.adults,
            children: reservation.children,
            check_in_now: false,
        });
        workflow.original = Some(reservation);
        Ok(workflow)
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn mode(&self) -> &WorkflowMode {
        &self.mode
    }

    pub fn dates(&self) -> Option<&StayDates> {
        self.dates.as_ref()
    }

    pub fn selections(&self) -> &[RoomSelection] {
        &self.selections
    }

    // Reservations blocking the requested extension, if the last attempt collided
    pub fn pending_conflict(&self) -> Option<&[ReservationId]> {
        self.pending_conflict.as_deref()
    }

    pub fn committed(&self) -> &[ReservationId] {
        &self.committed
    }

    fn expect_step(
        &self,
        allowed: &[WorkflowStep],
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    fn move_to(&mut self, next: WorkflowStep) {
        debug!(from = %self.step, to = %next, mode = ?self.mode, "workflow step");
        self.step = next;
    }

    pub fn set_dates_from_input(
        &mut self,
        ledger: &ReservationLedger,
        check_in: &str,
        check_out: &str,
    ) -> Result<WorkflowStep, WorkflowError> {
        let dates = StayDates::parse_ordered(check_in, check_out)?;
        self.set_dates(ledger, dates)
    }

    pub fn set_dates(
        &mut self,
        ledger: &ReservationLedger,
        dates: StayDates,
    ) -> Result<WorkflowStep, WorkflowError> {
        self.expect_step(&[WorkflowStep::SelectingDates], "set dates")?;

        if !dates.is_well_ordered() {
            return Err(ValidationError {
                errors: vec![FieldError {
                    field: Field::CheckOut,
                    message: "must be after check-in".to_string(),
                }],
            }
            .into());
        }
        if dates.nights() > self.max_stay_nights {
            return Err(WorkflowError::StayTooLong {
                nights: dates.nights(),
                max: self.max_stay_nights,
            });
        }

        match &self.mode {
            WorkflowMode::New => {
                self.dates = Some(dates);
                self.read_versions.clear();
                self.move_to(WorkflowStep::SelectingRooms);
            }
            WorkflowMode::Extend { reservation_id } => {
                let reservation_id = reservation_id.clone();
                let original_check_in = self
                    .original
                    .as_ref()
                    .map(|r| r.check_in)
                    .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;
                if dates.check_in != original_check_in {
                    return Err(WorkflowError::CheckInLocked);
                }

                let room_id = self.selections[0].room_id.clone();
                let snapshot = ledger.snapshot(&room_id);
                let current = snapshot
                    .reservations
                    .iter()
                    .find(|r| r.id == reservation_id)
                    .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;

                match validate_extension(current, dates.check_out, &snapshot.reservations) {
                    Ok(()) => {
                        self.pending_conflict = None;
                        self.original = Some(current.clone());
                        self.read_versions.insert(room_id, snapshot.version);
                        self.dates = Some(dates);
                        self.move_to(WorkflowStep::ReviewingSummary);
                    }
                    Err(ExtensionError::Conflict { conflicting }) => {
                        warn!(
                            reservation = %reservation_id,
                            ?conflicting,
                            "extension blocked by existing bookings"
                        );
                        self.pending_conflict = Some(conflicting.clone());
                        return Err(ExtensionError::Conflict { conflicting }.into());
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }
        Ok(self.step)
    }

    pub fn select_rooms(
        &mut self,
        ledger: &ReservationLedger,
        selections: Vec<RoomSelection>,
    ) -> Result<WorkflowStep, WorkflowError> {
        self.expect_step(&[WorkflowStep::SelectingRooms], "select rooms")?;
        if selections.is_empty() {
            return Err(WorkflowError::NoRoomsSelected);
        }
        let dates = self.dates.ok_or(WorkflowError::InvalidTransition {
            from: self.step,
            action: "select rooms",
        })?;

        let mut versions = HashMap::new();
        for selection in &selections {
            if ledger.room(&selection.room_id).is_none() {
                return Err(LedgerError::UnknownRoom(selection.room_id.clone()).into());
            }
            let snapshot = ledger.snapshot(&selection.room_id);
            if versions.insert(selection.room_id.clone(), snapshot.version).is_some() {
                return Err(WorkflowError::DuplicateRoom(selection.room_id.clone()));
            }
            if !crate::availability::is_room_available_for_interval(
                &selection.room_id,
                dates.check_in,
                dates.check_out,
                None,
                &snapshot.reservations,
            ) {
                return Err(WorkflowError::RoomUnavailable(selection.room_id.clone()));
            }
        }

        self.read_versions = versions;
        self.selections = selections;
        self.move_to(WorkflowStep::EnteringGuestDetails);
        Ok(self.step)
    }

    pub fn enter_guests(&mut self, guests: GuestDetails) -> Result<WorkflowStep, WorkflowError> {
        self.expect_step(&[WorkflowStep::EnteringGuestDetails], "enter guest details")?;
        if guests.customer_name.trim().is_empty() {
            return Err(WorkflowError::InvalidGuests("customer name is required".to_string()));
        }
        if guests.adults == 0 {
            return Err(WorkflowError::InvalidGuests("at least one adult is required".to_string()));
        }

        self.guests = Some(guests);
        self.move_to(WorkflowStep::ReviewingSummary);
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<WorkflowStep, WorkflowError> {
        let previous = match (self.step, &self.mode) {
            (WorkflowStep::SelectingRooms, _) => WorkflowStep::SelectingDates,
            (WorkflowStep::EnteringGuestDetails, _) => WorkflowStep::SelectingRooms,
            (WorkflowStep::ReviewingSummary, WorkflowMode::New) => {
                WorkflowStep::EnteringGuestDetails
            }
            (WorkflowStep::ReviewingSummary, WorkflowMode::Extend { .. }) => {
                WorkflowStep::SelectingDates
            }
            (from, _) => {
                return Err(WorkflowError::InvalidTransition {
                    from,
                    action: "go back",
                })
            }
        };
        self.quote = None;
        self.move_to(previous);
        Ok(self.step)
    }

    /// Prices the reviewed booking. For an extension only the added nights
    /// are priced; the stored total grows by that amount on confirm.
    pub fn quote(
        &mut self,
        ledger: &ReservationLedger,
    ) -> Result<&InvoiceBreakdown, WorkflowError> {
        self.expect_step(&[WorkflowStep::ReviewingSummary], "quote")?;
        let (dates, guests) = match (self.dates, self.guests.as_ref()) {
            (Some(dates), Some(guests)) => (dates, guests),
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    from: self.step,
                    action: "quote",
                })
            }
        };

        let check_in = match (&self.mode, &self.original) {
            (WorkflowMode::Extend { .. }, Some(original)) => original.check_out,
            _ => dates.check_in,
        };

        let breakdown = ledger.with_pricing(|ctx| {
            compute_invoice(
                &self.selections,
                guests.adults,
                guests.children,
                check_in,
                dates.check_out,
                ctx,
                self.adjustments,
            )
        })?;
        Ok(&*self.quote.insert(breakdown))
    }

    /// Commits the reviewed booking through the ledger.
    ///
    /// Each room is committed against the version read during room selection.
    /// If a later room fails, rooms already committed in this call are
    /// canceled before the error is returned.
    pub fn confirm(
        &mut self,
        ledger: &ReservationLedger,
    ) -> Result<&[ReservationId], WorkflowError> {
        self.expect_step(&[WorkflowStep::ReviewingSummary], "confirm")?;
        if self.quote.is_none() {
            self.quote(ledger)?;
        }
        let quote = match self.quote.clone() {
            Some(quote) => quote,
            None => {
                return Err(WorkflowError::InvalidTransition {
                    from: self.step,
                    action: "confirm",
                })
            }
        };

        match self.mode.clone() {
            WorkflowMode::New => self.commit_new(ledger, &quote)?,
            WorkflowMode::Extend { reservation_id } => {
                let original = self
                    .original
                    .as_ref()
                    .ok_or_else(|| LedgerError::UnknownReservation(reservation_id.clone()))?;
                let version = self
                    .read_versions
                    .get(&original.room_id)
                    .copied()
                    .unwrap_or_default();
                ledger.commit_extension(
                    &reservation_id,
                    quote.check_out,
                    original.total_amount + quote.total,
                    version,
                )?;
                self.committed = vec![reservation_id];
            }
        }

        self.move_to(WorkflowStep::Confirmed);
        info!(reservations = ?self.committed, total = quote.total, "booking confirmed");
        Ok(self.committed.as_slice())
    }

    fn commit_new(
        &mut self,
        ledger: &ReservationLedger,
        quote: &InvoiceBreakdown,
    ) -> Result<(), WorkflowError> {
        let guests = self.guests.clone().ok_or(WorkflowError::InvalidTransition {
            from: self.step,
            action: "confirm",
        })?;
        let share = if quote.subtotal != 0.0 {
            quote.total / quote.subtotal
        } else {
            0.0
        };

        let mut committed = Vec::with_capacity(quote.line_items.len());
        for (item, selection) in quote.line_items.iter().zip(&self.selections) {
            let reservation = Reservation {
                id: ledger.next_reservation_id(),
                room_id: item.room_id.clone(),
                customer_name: guests.customer_name.clone(),
                check_in: quote.check_in,
                check_out: quote.check_out,
                adults: guests.adults,
                children: guests.children,
                status: ReservationStatus::Confirmed,
                total_amount: item.total() * share,
                meal_plan_id: selection.meal_plan_id.clone(),
            };
            let id = reservation.id.clone();
            let version = self.read_versions.get(&item.room_id).copied().unwrap_or_default();

            if let Err(e) = ledger.commit_reservation(reservation, version) {
                warn!(
                    room_id = %item.room_id,
                    error = %e,
                    "rolling back partially committed booking"
                );
                for done in &committed {
                    if let Err(rollback) = ledger.set_status(done, ReservationStatus::Canceled) {
                        warn!(reservation = %done, error = %rollback, "rollback failed");
                    }
                }
                return Err(e.into());
            }
            committed.push(id);
        }

        if guests.check_in_now {
            for id in &committed {
                ledger.set_status(id, ReservationStatus::CheckedIn)?;
            }
        }
        self.committed = committed;
        Ok(())
    }

    /// Ends an extend-mode workflow whose extension collided with another
    /// booking by checking the guest out instead.
    pub fn resolve_by_checkout(
        &mut self,
        ledger: &ReservationLedger,
    ) -> Result<WorkflowStep, WorkflowError> {
        let reservation_id = match (&self.mode, &self.pending_conflict) {
            (WorkflowMode::Extend { reservation_id }, Some(_)) => reservation_id.clone(),
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    from: self.step,
                    action: "check out",
                })
            }
        };

        ledger.set_status(&reservation_id, ReservationStatus::CheckedOut)?;
        self.pending_conflict = None;
        self.move_to(WorkflowStep::CheckedOut);
        info!(reservation = %reservation_id, "guest checked out instead of extending");
        Ok(self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::fixtures::{date, reservation};
    use crate::inventory::MealPlanId;
    use crate::ledger::fixtures::ledger;

    fn guests(adults: u32, children: u32) -> GuestDetails {
        GuestDetails {
            customer_name: "Ada Traveller".to_string(),
            adults,
            children,
            check_in_now: false,
        }
    }

    fn stay(check_in: &str, check_out: &str) -> StayDates {
        StayDates::new(date(check_in), date(check_out))
    }

    #[test]
    fn test_new_booking_happy_path() {
        let ledger = ledger();
        let config = EngineConfig::default();
        let mut wf = BookingWorkflow::new(&config).unwrap();

        assert_eq!(
            wf.set_dates_from_input(&ledger, "2024-01-01", "2024-01-03").unwrap(),
            WorkflowStep::SelectingRooms
        );
        wf.select_rooms(
            &ledger,
            vec![RoomSelection::new("101").unwrap().with_meal_plan("hb")],
        )
        .unwrap();
        wf.enter_guests(guests(2, 1)).unwrap();

        let quote = wf.quote(&ledger).unwrap();
        // 100*2 room + (20*2*2 + 5*2) meals, 10% tax
        assert_eq!(quote.subtotal, 290.0);
        assert!((quote.total - 319.0).abs() < 1e-9);

        let ids = wf.confirm(&ledger).unwrap().to_vec();
        assert_eq!(wf.step(), WorkflowStep::Confirmed);
        assert_eq!(ids.len(), 1);

        let stored = ledger.reservation(&ids[0]).unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
        assert_eq!(stored.children, 1);
        assert!((stored.total_amount - 319.0).abs() < 1e-9);
    }

    #[test]
    fn test_transitions_are_guarded() {
        let ledger = ledger();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();

        assert!(matches!(
            wf.enter_guests(guests(1, 0)),
            Err(WorkflowError::InvalidTransition { from: WorkflowStep::SelectingDates, .. })
        ));
        assert!(matches!(wf.confirm(&ledger), Err(WorkflowError::InvalidTransition { .. })));
        assert!(wf.back().is_err());

        let err = wf.set_dates_from_input(&ledger, "", "2024-01-03").unwrap_err();
        match err {
            WorkflowError::Validation(v) => assert!(v.for_field(Field::CheckIn).is_some()),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            wf.set_dates(&ledger, stay("2024-01-01", "2024-06-01")),
            Err(WorkflowError::StayTooLong { .. })
        ));
    }

    #[test]
    fn test_back_navigation() {
        let ledger = ledger();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-03")).unwrap();
        wf.select_rooms(&ledger, vec![RoomSelection::new("102").unwrap()]).unwrap();
        assert_eq!(wf.back().unwrap(), WorkflowStep::SelectingRooms);
        assert_eq!(wf.back().unwrap(), WorkflowStep::SelectingDates);
        assert_eq!(
            wf.set_dates(&ledger, stay("2024-02-01", "2024-02-03")).unwrap(),
            WorkflowStep::SelectingRooms
        );
    }

    #[test]
    fn test_room_selection_checks() {
        let ledger = ledger();
        ledger
            .commit_reservation(reservation("r1", "101", "2024-01-02", "2024-01-05"), 0)
            .unwrap();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-03")).unwrap();

        assert!(matches!(wf.select_rooms(&ledger, vec![]), Err(WorkflowError::NoRoomsSelected)));
        assert!(matches!(
            wf.select_rooms(&ledger, vec![RoomSelection::new("101").unwrap()]),
            Err(WorkflowError::RoomUnavailable(_))
        ));
        assert!(matches!(
            wf.select_rooms(
                &ledger,
                vec![RoomSelection::new("102").unwrap(), RoomSelection::new("102").unwrap()]
            ),
            Err(WorkflowError::DuplicateRoom(_))
        ));
        assert!(matches!(
            wf.select_rooms(&ledger, vec![RoomSelection::new("999").unwrap()]),
            Err(WorkflowError::Ledger(LedgerError::UnknownRoom(_)))
        ));
        assert_eq!(wf.step(), WorkflowStep::SelectingRooms);
    }

    #[test]
    fn test_race_between_review_and_commit() {
        let ledger = ledger();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-03")).unwrap();
        wf.select_rooms(
            &ledger,
            vec![RoomSelection::new("102").unwrap(), RoomSelection::new("101").unwrap()],
        )
        .unwrap();
        wf.enter_guests(guests(2, 0)).unwrap();

        // another operator grabs room 101 in the meantime
        ledger
            .commit_reservation(reservation("other", "101", "2024-01-02", "2024-01-04"), 0)
            .unwrap();

        let err = wf.confirm(&ledger).unwrap_err();
        assert!(matches!(err, WorkflowError::Ledger(LedgerError::VersionMismatch { .. })));
        assert_eq!(wf.step(), WorkflowStep::ReviewingSummary);

        // the room 102 booking committed first is rolled back
        let room_102 = ledger.snapshot(&RoomId::from("102"));
        assert_eq!(room_102.reservations.len(), 1);
        assert_eq!(room_102.reservations[0].status, ReservationStatus::Canceled);
    }

    #[test]
    fn test_walk_in_is_checked_in() {
        let ledger = ledger();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-02")).unwrap();
        wf.select_rooms(&ledger, vec![RoomSelection::new("201").unwrap()]).unwrap();
        wf.enter_guests(GuestDetails {
            check_in_now: true,
            ..guests(3, 1)
        })
        .unwrap();
        let ids = wf.confirm(&ledger).unwrap().to_vec();
        assert_eq!(
            ledger.reservation(&ids[0]).unwrap().status,
            ReservationStatus::CheckedIn
        );
    }

    #[test]
    fn test_extend_skips_to_summary() {
        let ledger = ledger();
        let mut existing = reservation("r1", "101", "2024-01-01", "2024-01-03");
        existing.total_amount = 220.0;
        ledger.commit_reservation(existing, 0).unwrap();

        let id = ReservationId::from("r1");
        let mut wf = BookingWorkflow::extend(&EngineConfig::default(), &ledger, &id).unwrap();
        assert_eq!(
            wf.set_dates(&ledger, stay("2024-01-01", "2024-01-05")).unwrap(),
            WorkflowStep::ReviewingSummary
        );

        let quote = wf.quote(&ledger).unwrap();
        assert_eq!(quote.nights, 2);
        assert_eq!(quote.subtotal, 200.0);

        wf.confirm(&ledger).unwrap();
        let stored = ledger.reservation(&id).unwrap();
        assert_eq!(stored.check_out, date("2024-01-05"));
        assert!((stored.total_amount - 440.0).abs() < 1e-9);
        assert_eq!(wf.back().unwrap_err().to_string(), "Cannot go back while in step Confirmed");
    }

    #[test]
    fn test_extend_keeps_meal_plan() {
        let ledger = ledger();
        let mut wf = BookingWorkflow::new(&EngineConfig::default()).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-03")).unwrap();
        wf.select_rooms(&ledger, vec![RoomSelection::new("101").unwrap().with_meal_plan("hb")])
            .unwrap();
        wf.enter_guests(guests(2, 0)).unwrap();
        let id = wf.confirm(&ledger).unwrap()[0].clone();
        assert_eq!(
            ledger.reservation(&id).unwrap().meal_plan_id,
            Some(MealPlanId::from("hb"))
        );

        let mut wf = BookingWorkflow::extend(&EngineConfig::default(), &ledger, &id).unwrap();
        wf.set_dates(&ledger, stay("2024-01-01", "2024-01-05")).unwrap();
        let quote = wf.quote(&ledger).unwrap();
        // 2 added nights: 100*2 room + (20*2*2 + 5*2) meals
        assert_eq!(quote.meal_cost, 90.0);
        assert_eq!(quote.subtotal, 290.0);
        assert_eq!(quote.line_items[0].meal_plan.as_deref(), Some("Half Board"));
    }

    #[test]
    fn test_extend_rejections() {
        let ledger = ledger();
        ledger
            .commit_reservation(reservation("r1", "101", "2024-01-01", "2024-01-03"), 0)
            .unwrap();
        let id = ReservationId::from("r1");
        let mut wf = BookingWorkflow::extend(&EngineConfig::default(), &ledger, &id).unwrap();

        assert!(matches!(
            wf.set_dates(&ledger, stay("2024-01-01", "2024-01-03")),
            Err(WorkflowError::Extension(ExtensionError::NotLonger { .. }))
        ));
        assert!(matches!(
            wf.set_dates(&ledger, stay("2024-01-02", "2024-01-06")),
            Err(WorkflowError::CheckInLocked)
        ));
        assert!(wf.resolve_by_checkout(&ledger).is_err());
        let missing = ReservationId::from("nope");
        assert!(matches!(
            BookingWorkflow::extend(&EngineConfig::default(), &ledger, &missing),
            Err(WorkflowError::Ledger(LedgerError::UnknownReservation(_)))
        ));
    }

    #[test]
    fn test_extend_conflict_then_checkout() {
        let ledger = ledger();
        ledger
            .commit_reservation(reservation("r1", "101", "2024-01-01", "2024-01-03"), 0)
            .unwrap();
        ledger
            .commit_reservation(reservation("r2", "101", "2024-01-04", "2024-01-06"), 1)
            .unwrap();
        let id = ReservationId::from("r1");
        ledger.set_status(&id, ReservationStatus::CheckedIn).unwrap();

        let mut wf = BookingWorkflow::extend(&EngineConfig::default(), &ledger, &id).unwrap();
        let err = wf.set_dates(&ledger, stay("2024-01-01", "2024-01-05")).unwrap_err();
        assert!(matches!(err, WorkflowError::Extension(ExtensionError::Conflict { .. })));
        assert_eq!(wf.pending_conflict(), Some(&[ReservationId::from("r2")][..]));
        assert_eq!(wf.step(), WorkflowStep::SelectingDates);

        assert_eq!(wf.resolve_by_checkout(&ledger).unwrap(), WorkflowStep::CheckedOut);
        assert_eq!(
            ledger.reservation(&id).unwrap().status,
            ReservationStatus::CheckedOut
        );
        assert!(wf.step().is_terminal());
    }
}
