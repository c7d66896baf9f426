// Round-up calculator
//
// Spare change is the distance from a spend to the next multiple of the
// configured increment:
//   round_up(0.341, 0.1) -> 0.059
//   round_up(0.341, 0.5) -> 0.159
//   round_up(0.5, 0.5)   -> 0 (exact multiple)

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::{AppResult, VaultError};
use crate::ledger::models::LAMPORTS_PER_SOL;

/// Remainders this close to zero count as exact multiples
pub const EXACT_MULTIPLE_EPSILON: Decimal = dec!(0.000001);

/// Decimal places kept in a round-up
pub const ROUND_UP_PRECISION: u32 = 3;

/// Spare change for `amount` against `increment`.
///
/// Panics if `increment` is not positive.
pub fn round_up(amount: Decimal, increment: Decimal) -> Decimal {
    assert!(
        increment > Decimal::ZERO,
        "round-up increment must be positive, got {}",
        increment
    );

    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let remainder = amount % increment;
    if remainder < EXACT_MULTIPLE_EPSILON {
        return Decimal::ZERO;
    }

    (increment - remainder)
        .round_dp_with_strategy(ROUND_UP_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// A usable round-up lies strictly between zero and the increment.
/// Anything else points at a measurement problem upstream.
pub fn is_valid_round_up(round_up: Decimal, increment: Decimal) -> bool {
    round_up > Decimal::ZERO && round_up < increment
}

/// Convert lamports to SOL without loss
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// Convert SOL to lamports, rounding to the nearest lamport
pub fn sol_to_lamports(sol: Decimal) -> AppResult<u64> {
    if sol.is_sign_negative() {
        return Err(VaultError::AmountOutOfRange(format!("negative amount: {}", sol)).into());
    }

    (sol * Decimal::from(LAMPORTS_PER_SOL))
        .round()
        .to_u64()
        .ok_or_else(|| VaultError::AmountOutOfRange(sol.to_string()).into())
}
