//! Fee calculator
//!
//! Pure billing arithmetic. Time is billed in quarter hours rounded up, with a
//! minimum of one quarter hour. Hours inside the plan are charged at the base
//! rate and hours beyond it at the overtime rate; the total is rounded to whole
//! currency units.

use super::ParkingError;
use crate::models::{FeeBreakdown, StayCharge, VehicleSession};

/// One billing unit in milliseconds
pub const QUARTER_HOUR_MS: i64 = 15 * 60 * 1000;

/// Compute the charge for a stay.
///
/// # Errors
/// `InvalidInput` for a negative duration, a zero plan, or a negative or
/// non-finite rate.
pub fn calculate_fee(
    entry_time: i64,
    exit_time: i64,
    plan_hours: u32,
    base_rate: f64,
    overtime_rate: f64,
) -> Result<StayCharge, ParkingError> {
    let raw = exit_time
        .checked_sub(entry_time)
        .ok_or_else(|| ParkingError::InvalidInput("Stay duration overflows".to_string()))?;
    if raw < 0 {
        return Err(ParkingError::InvalidInput(format!(
            "Exit time {} is before entry time {}",
            exit_time, entry_time
        )));
    }
    if plan_hours == 0 {
        return Err(ParkingError::InvalidInput(
            "Plan hours must be positive".to_string(),
        ));
    }
    for (name, rate) in [("base", base_rate), ("overtime", overtime_rate)] {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ParkingError::InvalidInput(format!(
                "Invalid {} rate: {}",
                name, rate
            )));
        }
    }

    let quarters = (raw as u64).div_ceil(QUARTER_HOUR_MS as u64).max(1);
    let billed_hours = quarters as f64 * 0.25;
    let plan = plan_hours as f64;

    let (base_billed, overtime_billed, total) = if billed_hours <= plan {
        (billed_hours, 0.0, billed_hours * base_rate)
    } else {
        let overtime = billed_hours - plan;
        (plan, overtime, plan * base_rate + overtime * overtime_rate)
    };

    Ok(StayCharge {
        billed_hours: round_hours(billed_hours),
        base_billed: round_hours(base_billed),
        overtime_billed: round_hours(overtime_billed),
        total: total.round(),
    })
}

/// Amount still owed at exit: `max(0, total - paid)`
pub fn additional_due(total: f64, paid: f64) -> f64 {
    ((total - paid) * 100.0).round().max(0.0) / 100.0
}

/// Bill an active session as if it left at `exit_time`
pub fn fee_breakdown(
    session: &VehicleSession,
    exit_time: i64,
) -> Result<(StayCharge, FeeBreakdown), ParkingError> {
    let charge = calculate_fee(
        session.entry_time,
        exit_time,
        session.plan_hours,
        session.base_rate_snapshot,
        session.overtime_rate_snapshot,
    )?;
    let due = additional_due(charge.total, session.amount_paid);

    let breakdown = FeeBreakdown {
        plate_number: session.plate_number.clone(),
        spot_id: session.spot_id.clone(),
        entry_time: session.entry_time,
        exit_time,
        plan_hours: session.plan_hours,
        base_rate_snapshot: session.base_rate_snapshot,
        overtime_rate_snapshot: session.overtime_rate_snapshot,
        billed_hours: charge.billed_hours,
        base_billed: charge.base_billed,
        overtime_billed: charge.overtime_billed,
        total_amount: charge.total,
        paid_amount: session.amount_paid,
        additional_due: due,
    };
    Ok((charge, breakdown))
}

fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RateSchedule, SpotCategory};
    use proptest::prelude::*;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn test_overtime_split() {
        // 5h15m on a 4h plan at 40/60
        let charge = calculate_fee(0, 5 * HOUR_MS + 15 * 60 * 1000, 4, 40.0, 60.0).unwrap();
        assert_eq!(charge.billed_hours, 5.25);
        assert_eq!(charge.base_billed, 4.0);
        assert_eq!(charge.overtime_billed, 1.25);
        assert_eq!(charge.total, 235.0);
    }

    #[test]
    fn test_exactly_plan_length() {
        let charge = calculate_fee(0, 4 * HOUR_MS, 4, 40.0, 60.0).unwrap();
        assert_eq!(charge.base_billed, 4.0);
        assert_eq!(charge.overtime_billed, 0.0);
        assert_eq!(charge.total, 160.0);
    }

    #[test]
    fn test_zero_duration_bills_one_quarter() {
        let charge = calculate_fee(1_000, 1_000, 4, 40.0, 60.0).unwrap();
        assert_eq!(charge.billed_hours, 0.25);
        assert_eq!(charge.total, 10.0);
    }

    #[test]
    fn test_partial_quarter_rounds_up() {
        let charge = calculate_fee(0, QUARTER_HOUR_MS + 1, 4, 40.0, 60.0).unwrap();
        assert_eq!(charge.billed_hours, 0.5);
        assert_eq!(charge.total, 20.0);
    }

    #[test]
    fn test_extreme_spans_do_not_overflow() {
        let charge = calculate_fee(-(i64::MAX - 10), 0, 4, 40.0, 60.0).unwrap();
        assert!(charge.billed_hours > 1e12);
        assert!(charge.total.is_finite());

        let charge = calculate_fee(0, i64::MAX, 4, 40.0, 60.0).unwrap();
        assert!(charge.overtime_billed > 1e12);

        assert!(matches!(
            calculate_fee(i64::MIN, i64::MAX, 4, 40.0, 60.0),
            Err(ParkingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_total_rounds_to_whole_units() {
        // 0.25h * 10.1 = 2.525
        let charge = calculate_fee(0, QUARTER_HOUR_MS, 4, 10.1, 60.0).unwrap();
        assert_eq!(charge.total, 3.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            calculate_fee(10, 5, 4, 40.0, 60.0),
            Err(ParkingError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate_fee(0, 5, 0, 40.0, 60.0),
            Err(ParkingError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate_fee(0, 5, 4, -1.0, 60.0),
            Err(ParkingError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate_fee(0, 5, 4, 40.0, f64::NAN),
            Err(ParkingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_additional_due_never_negative() {
        assert_eq!(additional_due(190.0, 160.0), 30.0);
        assert_eq!(additional_due(10.0, 160.0), 0.0);
        assert_eq!(additional_due(160.0, 160.0), 0.0);
    }

    #[test]
    fn test_fee_breakdown_uses_snapshot() {
        let session = VehicleSession::open(
            "KA01",
            "D-1",
            SpotCategory::Disability,
            0,
            4,
            &RateSchedule::new(40.0, 60.0),
        );
        let (charge, breakdown) = fee_breakdown(&session, 4 * HOUR_MS + 30 * 60 * 1000).unwrap();
        assert_eq!(charge.total, 190.0);
        assert_eq!(breakdown.total_amount, 190.0);
        assert_eq!(breakdown.paid_amount, 160.0);
        assert_eq!(breakdown.additional_due, 30.0);
        assert_eq!(breakdown.overtime_billed, 0.5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Billing never decreases as the stay grows
        #[test]
        fn fee_is_monotonic_in_duration(
            a in 0i64..(48 * HOUR_MS),
            b in 0i64..(48 * HOUR_MS),
            plan in 1u32..12,
            base in 0.0f64..200.0,
            overtime in 0.0f64..300.0,
        ) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let first = calculate_fee(0, short, plan, base, overtime).unwrap();
            let second = calculate_fee(0, long, plan, base, overtime).unwrap();
            prop_assert!(first.total <= second.total);
            prop_assert!(first.billed_hours <= second.billed_hours);
        }

        /// Billed hours always split into base plus overtime
        #[test]
        fn billed_hours_split_is_exact(
            elapsed in 0i64..(72 * HOUR_MS),
            plan in 1u32..12,
        ) {
            let charge = calculate_fee(0, elapsed, plan, 40.0, 60.0).unwrap();
            prop_assert!(charge.billed_hours >= 0.25);
            prop_assert!(charge.base_billed <= plan as f64);
            prop_assert_eq!(charge.base_billed + charge.overtime_billed, charge.billed_hours);
        }
    }
}
