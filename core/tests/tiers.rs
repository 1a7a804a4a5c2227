use billchain_analytics::prediction::{RiskLevel, ValueSegment};

/// Risk boundaries are inclusive on the lower edge of each tier.
#[test]
fn risk_level_boundaries_are_exact() {
    assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
    assert_eq!(RiskLevel::from_probability(0.39), RiskLevel::Low);
    assert_eq!(RiskLevel::from_probability(0.40), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_probability(0.69), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_probability(0.70), RiskLevel::High);
    assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
}

/// Higher probability never maps to a lower tier.
#[test]
fn risk_level_is_monotonic() {
    let mut previous = RiskLevel::Low;
    for step in 0..=100 {
        let level = RiskLevel::from_probability(step as f64 / 100.0);
        assert!(level >= previous, "tier dropped at p={}", step as f64 / 100.0);
        previous = level;
    }
}

/// Value segments use strict `>` at 1000, 5000 and 10000.
#[test]
fn value_segment_boundaries_are_exact() {
    let cases = [
        (0.0, ValueSegment::LowValue),
        (1_000.0, ValueSegment::LowValue),
        (1_000.01, ValueSegment::MediumValue),
        (5_000.0, ValueSegment::MediumValue),
        (5_000.01, ValueSegment::HighValue),
        (10_000.0, ValueSegment::HighValue),
        (10_000.01, ValueSegment::Premium),
    ];
    for (cltv, expected) in cases {
        assert_eq!(ValueSegment::from_cltv(cltv), expected, "cltv={cltv}");
    }
}

/// Wire names match what callers display.
#[test]
fn tier_names_serialize_as_display_strings() {
    assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"Medium\"");
    assert_eq!(serde_json::to_string(&ValueSegment::HighValue).unwrap(), "\"High Value\"");
    assert_eq!(ValueSegment::parse("Low Value"), Some(ValueSegment::LowValue));
    assert_eq!(RiskLevel::parse("High"), Some(RiskLevel::High));
    assert_eq!(RiskLevel::parse("extreme"), None);
}
