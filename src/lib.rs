// Reservation pricing and availability engine for a hotel front desk

pub mod availability;
pub mod config;
pub mod document;
pub mod inventory;
pub mod ledger;
pub mod pricing;
pub mod stay;
pub mod workflow;

// Re-export key types for convenience
pub use availability::{
    find_conflicts, is_room_available_for_interval, validate_extension, AvailabilityChecker,
    ExtensionError,
};
pub use config::{ConfigError, EngineConfig};
pub use document::{DocumentError, InvoiceDocument};
pub use inventory::{
    InventoryError, MealPlan, MealPlanId, Reservation, ReservationId, ReservationStatus, Room,
    RoomId, RoomStatus, RoomType, RoomTypeId,
};
pub use ledger::{LedgerError, LedgerSnapshot, ReservationLedger, RoomSnapshot};
pub use pricing::{
    compute_invoice, Adjustments, InvoiceBreakdown, LineItem, PricingContext, PricingError,
    RoomSelection,
};
pub use stay::{nights, StayDates, ValidationError};
pub use workflow::{BookingWorkflow, GuestDetails, WorkflowError, WorkflowMode, WorkflowStep};
