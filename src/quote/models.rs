//! Quote data model.
//!
//! `QuoteRecord` is the validated, render-ready representation of one MBI
//! (mechanical breakdown insurance) quote. It is built exactly once per
//! inbound message or HTTP request and is immutable afterwards.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The 27 attributes that must be present as non-empty strings in every
/// inbound payload. Names are the camelCase wire names.
pub const REQUIRED_FIELDS: [&str; 27] = [
    "quotationNumber",
    "quotationDate",
    "cover",
    "coverPeriod",
    "maxClaim",
    "additionalCovers",
    "consumableItems",
    "repatriationCosts",
    "accommodationTravel",
    "roadsideAssistance",
    "registration",
    "vin",
    "make",
    "model",
    "variant",
    "vehicleValue",
    "fuelType",
    "ccRating",
    "year",
    "odometer",
    "modifications",
    "exclusions",
    "excessAmount",
    "totalPremium",
    "gst",
    "agentName",
    "agentNumber",
];

/// Stricter subset re-checked for blankness after the structural pass. A blank
/// value here is reported collectively rather than on first failure.
pub const MANDATORY_FIELDS: [&str; 9] = [
    "quotationNumber",
    "quotationDate",
    "cover",
    "registration",
    "vin",
    "make",
    "model",
    "totalPremium",
    "agentName",
];

/// Attributes that default to an empty string when absent.
pub const OPTIONAL_FIELDS: [&str; 3] = [
    "electricPackage",
    "modificationDetails",
    "exclusionDetails",
];

/// A validated MBI quote. All required fields are guaranteed to be non-empty
/// strings, so the renderer may substitute them without further checks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub quotation_number: String,
    pub quotation_date: String,
    pub cover: String,
    pub cover_period: String,
    pub max_claim: String,
    pub additional_covers: String,
    pub consumable_items: String,
    pub repatriation_costs: String,
    pub accommodation_travel: String,
    pub roadside_assistance: String,
    pub registration: String,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub variant: String,
    pub vehicle_value: String,
    pub fuel_type: String,
    pub cc_rating: String,
    pub year: String,
    pub odometer: String,
    pub modifications: String,
    pub exclusions: String,
    pub excess_amount: String,
    pub total_premium: String,
    pub gst: String,
    pub agent_name: String,
    pub agent_number: String,
    #[serde(default)]
    pub electric_package: String,
    #[serde(default)]
    pub modification_details: String,
    #[serde(default)]
    pub exclusion_details: String,
}
