//! Fee arithmetic for the Quote Service (spec §4.7 steps 3-4). Pure
//! functions only — no I/O, no state — so they're trivial to unit test
//! against the boundary values spec §8 names.

/// Compute units assumed when a client doesn't estimate (spec §4.7 step 3
/// names `DEFAULT_CU` without pinning a value; chosen to match a typical
/// single SPL-token-transfer-plus-fee-instruction transaction).
pub const DEFAULT_CU: u32 = 200_000;

/// Upper clamp on a client-supplied compute unit estimate (spec §3 boundary:
/// `1_400_001` must clamp, `1_400_000` must pass through).
pub const MAX_CU: u32 = 1_400_000;

/// Priority fee rate, lamports per compute unit (spec names `PRIORITY_PRICE`
/// without pinning a value; 1 lamport/CU matches the cluster's own priority
/// fee floor at time of writing).
pub const PRIORITY_PRICE_LAMPORTS_PER_CU: u64 = 1;

/// Clamps a client-supplied estimate into `[1, MAX_CU]`, then floors it at
/// `DEFAULT_CU` (spec §4.7 step 3: `max(cuEstimate, DEFAULT_CU)`).
pub fn effective_cu(requested: Option<u32>) -> u32 {
    let requested = requested.unwrap_or(DEFAULT_CU).clamp(1, MAX_CU);
    requested.max(DEFAULT_CU)
}

/// `base = BASE_FEE + max(cuEstimate, DEFAULT_CU) · PRIORITY_PRICE + networkFee`.
pub fn base_fee_lamports(base_fee_lamports: u64, network_fee_lamports: u64, cu: u32) -> u64 {
    base_fee_lamports
        .saturating_add((cu as u64).saturating_mul(PRIORITY_PRICE_LAMPORTS_PER_CU))
        .saturating_add(network_fee_lamports)
}

/// `ceil(base / TREASURY_RATIO)`: the minimum fee such that the treasury's
/// fractional share alone still covers expected native gas (spec §4.7 step 4,
/// GLOSSARY "Break-even fee").
pub fn break_even_fee(base: u64, treasury_ratio: u64) -> u64 {
    if treasury_ratio == 0 {
        return base;
    }
    base.saturating_add(treasury_ratio - 1) / treasury_ratio
}

/// `discounted = max(base · (1 − discount), BREAK_EVEN)` (spec §4.7 step 4 /
/// §8 boundary: a 95% discount still floors at break-even).
pub fn apply_discount(base: u64, discount: f64, treasury_ratio: u64) -> u64 {
    let break_even = break_even_fee(base, treasury_ratio);
    let discounted = (base as f64 * (1.0 - discount)).round();
    let discounted = if discounted.is_finite() && discounted >= 0.0 { discounted as u64 } else { 0 };
    discounted.max(break_even)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_cu_floors_at_default_when_caller_estimates_low() {
        assert_eq!(effective_cu(Some(1)), DEFAULT_CU);
    }

    #[test]
    fn effective_cu_clamps_above_max() {
        assert_eq!(effective_cu(Some(MAX_CU + 1)), MAX_CU);
    }

    #[test]
    fn effective_cu_accepts_max_cu_unclamped() {
        assert_eq!(effective_cu(Some(MAX_CU)), MAX_CU);
    }

    #[test]
    fn effective_cu_defaults_when_absent() {
        assert_eq!(effective_cu(None), DEFAULT_CU);
    }

    #[test]
    fn ninety_five_percent_discount_floors_at_break_even() {
        let base = 10_000;
        let discounted = apply_discount(base, 0.95, 2);
        assert_eq!(discounted, break_even_fee(base, 2));
        assert!(discounted > 0);
    }

    #[test]
    fn zero_discount_returns_base_fee() {
        assert_eq!(apply_discount(10_000, 0.0, 2), 10_000);
    }
}
