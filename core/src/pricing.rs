//! Segment-aware price adjustment.

use crate::prediction::ValueSegment;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_PRICE:           f64 = 100.0;
pub const DEFAULT_COMPETITIVE_INTENSITY: f64 = 0.5;
const HIGH_COMPETITION:     f64 = 0.7;
const COMPETITION_DISCOUNT: f64 = 0.95;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingRequest {
    pub base_price: Option<f64>,
    /// Customer's value segment; Medium Value when unknown.
    pub customer_segment: Option<ValueSegment>,
    /// 0..1, how contested the market is.
    pub competitive_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub original_price:  f64,
    pub optimized_price: f64,
    /// Percent change, one decimal.
    pub adjustment:      f64,
    pub reasoning:       String,
}

fn segment_multiplier(segment: ValueSegment) -> f64 {
    match segment {
        ValueSegment::Premium     => 1.3,
        ValueSegment::HighValue   => 1.15,
        ValueSegment::LowValue    => 0.9,
        ValueSegment::MediumValue => 1.0,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn optimize_price(request: &PricingRequest) -> PriceQuote {
    let base_price = request.base_price.unwrap_or(DEFAULT_BASE_PRICE);
    let segment = request.customer_segment.unwrap_or(ValueSegment::MediumValue);

    let mut multiplier = segment_multiplier(segment);
    if request.competitive_intensity.unwrap_or(DEFAULT_COMPETITIVE_INTENSITY) > HIGH_COMPETITION {
        multiplier *= COMPETITION_DISCOUNT;
    }

    PriceQuote {
        original_price:  base_price,
        optimized_price: round_to(base_price * multiplier, 2),
        adjustment:      round_to((multiplier - 1.0) * 100.0, 1),
        reasoning:       format!("Adjusted for {} customer segment", segment.as_str()),
    }
}
