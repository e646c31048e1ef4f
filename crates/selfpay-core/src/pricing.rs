//! Self-pay discount pricing.
//!
//! A static table maps service category codes to a discount multiplier in
//! (0, 1]. The table is a process-wide constant with no runtime mutation
//! path; the server's computation is always the binding one.

/// Multiplier applied to codes not present in the table (35% off).
pub const DEFAULT_MULTIPLIER: f64 = 0.65;

/// Tolerance, in cents, when comparing a client-claimed total against the
/// server-computed one. Absorbs rounding drift across currency conversions.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 1;

/// Look up the self-pay multiplier for a service category code.
pub fn multiplier_for(service_code: &str) -> f64 {
    match service_code {
        "office_visit" => 0.65,
        "lab_work" => 0.50,
        "imaging" => 0.70,
        "procedure" => 0.65,
        "consultation" => 0.60,
        _ => DEFAULT_MULTIPLIER,
    }
}

/// Compute the discounted self-pay charge in cents.
///
/// Rounds half-up, matching the display-side computation. For any
/// non-negative input, the result is in `[0, original_cents]`.
pub fn discounted_amount_cents(original_cents: i64, service_code: &str) -> i64 {
    if original_cents <= 0 {
        return 0;
    }
    let discounted = (original_cents as f64 * multiplier_for(service_code)).round() as i64;
    discounted.min(original_cents)
}

/// Format a cent amount as a dollar string, e.g. `205.00`.
pub fn format_usd(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        // $250.00 office visit → $162.50
        assert_eq!(discounted_amount_cents(25000, "office_visit"), 16250);
        // $85.00 lab work → $42.50
        assert_eq!(discounted_amount_cents(8500, "lab_work"), 4250);
        // $120.00 imaging → $84.00
        assert_eq!(discounted_amount_cents(12000, "imaging"), 8400);
        // $100.00 consultation → $60.00
        assert_eq!(discounted_amount_cents(10000, "consultation"), 6000);
    }

    #[test]
    fn test_unknown_code_uses_default() {
        assert_eq!(discounted_amount_cents(10000, "ambulance"), 6500);
        assert_eq!(multiplier_for("ambulance"), DEFAULT_MULTIPLIER);
    }

    #[test]
    fn test_zero_amount() {
        assert_eq!(discounted_amount_cents(0, "office_visit"), 0);
        assert_eq!(discounted_amount_cents(0, "unknown"), 0);
    }

    #[test]
    fn test_rounds_half_up() {
        // 25 cents * 0.50 = 12.5 → 13
        assert_eq!(discounted_amount_cents(25, "lab_work"), 13);
        // 1 cent * 0.65 = 0.65 → 1
        assert_eq!(discounted_amount_cents(1, "office_visit"), 1);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(20500), "205.00");
        assert_eq!(format_usd(4250), "42.50");
        assert_eq!(format_usd(7), "0.07");
    }
}
