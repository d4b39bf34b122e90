// src/utils.rs
// Utility functions for the fork risk job

use ethers::types::{Address, U256};

/// REP (and every ERC20 the job touches) uses 18 decimals.
const TOKEN_DECIMALS: usize = 18;

/// Creates a vector of (start_block, end_block) tuples for a given range and chunk size.
/// Both ends are inclusive, matching `eth_getLogs` range semantics.
pub fn create_block_chunks(from_block: u64, to_block: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current_from = from_block;
    while current_from <= to_block {
        let current_to = std::cmp::min(current_from.saturating_add(chunk_size - 1), to_block);
        chunks.push((current_from, current_to));
        if current_to == u64::MAX {
            break;
        }
        current_from = current_to + 1;
    }
    chunks
}

/// Converts a raw 18-decimal token amount into whole-token units.
/// The integer part is converted lossily above 18 significant digits.
pub fn wei_to_tokens(value: U256) -> f64 {
    let unit = U256::exp10(TOKEN_DECIMALS);
    let whole = value / unit;
    let frac = value % unit;
    u256_to_f64_lossy(whole) + frac.as_u128() as f64 / 1e18
}

/// Converts whole-token units into a raw 18-decimal amount. Negative and
/// non-finite inputs map to zero.
pub fn tokens_to_wei(tokens: f64) -> U256 {
    if !tokens.is_finite() || tokens <= 0.0 {
        return U256::zero();
    }
    let whole = tokens.trunc();
    let frac = ((tokens - whole) * 1e18).round() as u128;
    let whole = if whole >= u128::MAX as f64 {
        U256::from(u128::MAX)
    } else {
        U256::from(whole as u128)
    };
    whole * U256::exp10(TOKEN_DECIMALS) + U256::from(frac)
}

fn u256_to_f64_lossy(v: U256) -> f64 {
    if v.is_zero() {
        return 0.0;
    }
    let s = v.to_string();
    let len = s.len();
    let take = if len >= 18 { 18 } else { len };
    let (mantissa_str, _rest) = s.split_at(take);
    let mantissa = mantissa_str.parse::<f64>().unwrap_or(0.0);
    let exp10 = (len - take) as i32;
    mantissa * 10f64.powi(exp10)
}

/// Rounds to two decimal places (the precision published in the snapshot).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Full lowercase hex form, e.g. `0xabcd...` (40 hex digits).
pub fn address_to_string(addr: Address) -> String {
    format!("{:?}", addr).to_lowercase()
}

/// Abbreviated form for display, e.g. `0xabcd…1234`.
pub fn short_address(addr: Address) -> String {
    let full = address_to_string(addr);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_block_chunks_cover_range_inclusively() {
        let chunks = create_block_chunks(100, 2_599, 1_000);
        assert_eq!(chunks, vec![(100, 1_099), (1_100, 2_099), (2_100, 2_599)]);

        assert_eq!(create_block_chunks(5, 5, 1_000), vec![(5, 5)]);
        assert!(create_block_chunks(10, 9, 1_000).is_empty());
    }

    #[test]
    fn test_block_chunks_zero_size_does_not_stall() {
        assert_eq!(create_block_chunks(1, 3, 0), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_wei_conversion() {
        assert_eq!(wei_to_tokens(U256::zero()), 0.0);
        assert_eq!(wei_to_tokens(tokens_to_wei(50_000.0)), 50_000.0);
        assert_eq!(wei_to_tokens(tokens_to_wei(1.5)), 1.5);
        assert_eq!(tokens_to_wei(-3.0), U256::zero());
        assert_eq!(tokens_to_wei(275_000.0), U256::from(275_000u64) * U256::exp10(18));
    }

    #[test]
    fn test_address_formatting() {
        let addr = Address::from_str("0x49244BD018Ca9fd1f06ecC07B9E9De773246e5AA").unwrap();
        assert_eq!(
            address_to_string(addr),
            "0x49244bd018ca9fd1f06ecc07b9e9de773246e5aa"
        );
        assert_eq!(short_address(addr), "0x4924…e5aa");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(18.181818), 18.18);
        assert_eq!(round2(9.996), 10.0);
    }
}
