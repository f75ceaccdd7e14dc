// Price calculation for one or more room selections over a stay
//
// Monetary values are f64 and are never rounded while summing; rounding to
// cents happens only when a breakdown is prepared for display.

use crate::inventory::{MealPlan, MealPlanId, Room, RoomId, RoomType, RoomTypeId};
use crate::stay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

// Tax applied by the room-booking flow
pub const BOOKING_TAX_RATE: f64 = 0.10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Room selection requires a room id")]
    EmptyRoomId,

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Unknown room type {room_type_id} for room {room_id}")]
    UnknownRoomType {
        room_id: RoomId,
        room_type_id: RoomTypeId,
    },

    #[error("Unknown meal plan: {0}")]
    UnknownMealPlan(MealPlanId),

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),
}

/// One room picked by the guest, optionally with a meal plan attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSelection {
    pub room_id: RoomId,
    #[serde(default)]
    pub meal_plan_id: Option<MealPlanId>,
}

impl RoomSelection {
    pub fn new(room_id: impl Into<RoomId>) -> Result<Self, PricingError> {
        let room_id = room_id.into();
        if room_id.as_str().trim().is_empty() {
            return Err(PricingError::EmptyRoomId);
        }
        Ok(Self {
            room_id,
            meal_plan_id: None,
        })
    }

    pub fn with_meal_plan(mut self, meal_plan_id: impl Into<MealPlanId>) -> Self {
        self.meal_plan_id = Some(meal_plan_id.into());
        self
    }
}

/// Read-only reference tables the calculator resolves ids against.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub rooms: &'a HashMap<RoomId, Room>,
    pub room_types: &'a HashMap<RoomTypeId, RoomType>,
    pub meal_plans: &'a HashMap<MealPlanId, MealPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustments {
    pub tax_rate: f64,
    pub discount: f64,
}

impl Adjustments {
    pub fn new(tax_rate: f64, discount: f64) -> Result<Self, PricingError> {
        if !tax_rate.is_finite() || tax_rate < 0.0 {
            return Err(PricingError::InvalidAdjustment(format!(
                "tax rate must be a non-negative number, got {}",
                tax_rate
            )));
        }
        if !discount.is_finite() || discount < 0.0 {
            return Err(PricingError::InvalidAdjustment(format!(
                "discount must be a non-negative number, got {}",
                discount
            )));
        }
        Ok(Self { tax_rate, discount })
    }

    // Fixed 10% tax, no discount
    pub fn booking() -> Self {
        Self {
            tax_rate: BOOKING_TAX_RATE,
            discount: 0.0,
        }
    }
}

impl Default for Adjustments {
    fn default() -> Self {
        Self::booking()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCount {
    pub adults: u32,
    pub children: u32,
}

impl GuestCount {
    // Saturates instead of wrapping on absurd head counts
    pub fn total(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub room_id: RoomId,
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: f64,
    pub room_cost: f64,
    pub meal_plan: Option<String>,
    pub meal_cost: f64,
}

impl LineItem {
    pub fn total(&self) -> f64 {
        self.room_cost + self.meal_cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBreakdown {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub guests: GuestCount,
    pub line_items: Vec<LineItem>,
    pub room_cost: f64,
    pub meal_cost: f64,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

impl InvoiceBreakdown {
    /// Copy of the breakdown with every amount rounded to cents, for display.
    pub fn rounded(&self) -> Self {
        let line_items = self
            .line_items
            .iter()
            .map(|item| LineItem {
                nightly_rate: round_currency(item.nightly_rate),
                room_cost: round_currency(item.room_cost),
                meal_cost: round_currency(item.meal_cost),
                ..item.clone()
            })
            .collect();

        Self {
            line_items,
            room_cost: round_currency(self.room_cost),
            meal_cost: round_currency(self.meal_cost),
            subtotal: round_currency(self.subtotal),
            tax: round_currency(self.tax),
            discount: round_currency(self.discount),
            total: round_currency(self.total),
            ..self.clone()
        }
    }
}

pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Meal cost for one room: per-person rate times adults, plus the optional
/// per-room rate, each per night. Children are not charged the per-person rate.
pub fn meal_cost(plan: &MealPlan, adults: u32, nights: u32) -> f64 {
    let nights = nights as f64;
    plan.per_person_rate * adults as f64 * nights + plan.per_room_rate.unwrap_or(0.0) * nights
}

/// Computes the cost breakdown for `selections` over `[check_in, check_out)`.
///
/// Unknown room, room type or meal plan ids are the only failures. Guests
/// above the combined room capacity are logged but still priced, and a
/// discount larger than subtotal plus tax yields a negative total.
pub fn compute_invoice(
    selections: &[RoomSelection],
    adults: u32,
    children: u32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    ctx: &PricingContext<'_>,
    adjustments: Adjustments,
) -> Result<InvoiceBreakdown, PricingError> {
    let nights = stay::nights(check_in, check_out);
    let guests = GuestCount { adults, children };

    let mut line_items = Vec::with_capacity(selections.len());
    let mut capacity = 0u32;

    for selection in selections {
        let room = ctx
            .rooms
            .get(&selection.room_id)
            .ok_or_else(|| PricingError::UnknownRoom(selection.room_id.clone()))?;
        let room_type =
            ctx.room_types
                .get(&room.room_type_id)
                .ok_or_else(|| PricingError::UnknownRoomType {
                    room_id: room.id.clone(),
                    room_type_id: room.room_type_id.clone(),
                })?;

        let plan = match &selection.meal_plan_id {
            Some(id) => Some(
                ctx.meal_plans
                    .get(id)
                    .ok_or_else(|| PricingError::UnknownMealPlan(id.clone()))?,
            ),
            None => None,
        };

        capacity = capacity.saturating_add(room_type.capacity);
        line_items.push(LineItem {
            room_id: room.id.clone(),
            room_number: room.number.clone(),
            room_type: room_type.name.clone(),
            nightly_rate: room_type.base_price,
            room_cost: room_type.base_price * nights as f64,
            meal_plan: plan.map(|p| p.name.clone()),
            meal_cost: plan.map_or(0.0, |p| meal_cost(p, adults, nights)),
        });
    }

    if !selections.is_empty() && guests.total() > capacity {
        warn!(
            guests = guests.total(),
            capacity, "guest count exceeds capacity of selected rooms"
        );
    }

    let room_cost: f64 = line_items.iter().map(|i| i.room_cost).sum();
    let meal_cost: f64 = line_items.iter().map(|i| i.meal_cost).sum();
    let subtotal = room_cost + meal_cost;
    let tax = subtotal * adjustments.tax_rate;
    let total = subtotal + tax - adjustments.discount;

    debug!(
        rooms = line_items.len(),
        nights, subtotal, tax, total, "invoice computed"
    );

    Ok(InvoiceBreakdown {
        check_in,
        check_out,
        nights,
        guests,
        line_items,
        room_cost,
        meal_cost,
        subtotal,
        tax_rate: adjustments.tax_rate,
        tax,
        discount: adjustments.discount,
        total,
    })
}
