// Hotel inventory data model: rooms, room types, meal plans and reservations
// These are the entities the pricing and availability logic reads from a snapshot

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum InventoryError {
    #[error("Unknown room status: {0}")]
    UnknownRoomStatus(String),

    #[error("Unknown reservation status: {0}")]
    UnknownReservationStatus(String),

    #[error("Cannot move reservation {id} from {from} to {to}")]
    InvalidStatusTransition {
        id: ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    },
}

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(RoomId);
string_id!(RoomTypeId);
string_id!(MealPlanId);
string_id!(ReservationId);

// Housekeeping status of a physical room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Cleaned,
    ToClean,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::Cleaned => "cleaned",
            Self::ToClean => "to-clean",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "maintenance" => Ok(Self::Maintenance),
            "cleaned" => Ok(Self::Cleaned),
            "to-clean" => Ok(Self::ToClean),
            other => Err(InventoryError::UnknownRoomStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    pub room_type_id: RoomTypeId,
    #[serde(default)]
    pub status: RoomStatus,
}

impl Room {
    pub fn new(
        id: impl Into<RoomId>,
        number: impl Into<String>,
        room_type_id: impl Into<RoomTypeId>,
    ) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            room_type_id: room_type_id.into(),
            status: RoomStatus::Available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: RoomTypeId,
    pub name: String,
    // Per-night rate
    pub base_price: f64,
    // Maximum number of guests
    pub capacity: u32,
}

impl RoomType {
    pub fn new(
        id: impl Into<RoomTypeId>,
        name: impl Into<String>,
        base_price: f64,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_price,
            capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: MealPlanId,
    pub name: String,
    pub per_person_rate: f64,
    #[serde(default)]
    pub per_room_rate: Option<f64>,
}

impl MealPlan {
    pub fn new(id: impl Into<MealPlanId>, name: impl Into<String>, per_person_rate: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            per_person_rate,
            per_room_rate: None,
        }
    }

    pub fn with_per_room_rate(mut self, rate: f64) -> Self {
        self.per_room_rate = Some(rate);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReservationStatus {
    Confirmed,
    CheckedIn,
    CheckedOut,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked-in",
            Self::CheckedOut => "checked-out",
            Self::Canceled => "canceled",
        }
    }

    /// Whether a reservation in this status still occupies its room for the
    /// purposes of conflict detection. Only canceled bookings release it.
    pub fn blocks_inventory(&self) -> bool {
        !matches!(self, Self::Canceled)
    }

    fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Confirmed, CheckedIn)
                | (Confirmed, Canceled)
                | (CheckedIn, CheckedOut)
                // early departure straight from a confirmed booking
                | (Confirmed, CheckedOut)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "checked-in" => Ok(Self::CheckedIn),
            "checked-out" => Ok(Self::CheckedOut),
            "canceled" => Ok(Self::Canceled),
            other => Err(InventoryError::UnknownReservationStatus(other.to_string())),
        }
    }
}

// A booked stay for one room. Check-out is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub room_id: RoomId,
    pub customer_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
    pub status: ReservationStatus,
    pub total_amount: f64,
    // Carried over to the added nights when the stay is extended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan_id: Option<MealPlanId>,
}

impl Reservation {
    pub fn occupies(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }

    pub fn is_active(&self) -> bool {
        self.status.blocks_inventory()
    }

    pub fn set_status(&mut self, next: ReservationStatus) -> Result<(), InventoryError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(InventoryError::InvalidStatusTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), InventoryError> {
        self.set_status(ReservationStatus::Canceled)
    }

    pub fn check_in_guest(&mut self) -> Result<(), InventoryError> {
        self.set_status(ReservationStatus::CheckedIn)
    }

    pub fn check_out_guest(&mut self) -> Result<(), InventoryError> {
        self.set_status(ReservationStatus::CheckedOut)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn reservation(id: &str, room_id: &str, check_in: &str, check_out: &str) -> Reservation {
        Reservation {
            id: ReservationId::from(id),
            room_id: RoomId::from(room_id),
            customer_name: "Jane Guest".to_string(),
            check_in: date(check_in),
            check_out: date(check_out),
            adults: 2,
            children: 0,
            status: ReservationStatus::Confirmed,
            total_amount: 0.0,
            meal_plan_id: None,
        }
    }
}
