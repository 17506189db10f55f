use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::{ChainQuery, QueryError};
use crate::request::PreconditionError;

/// Display symbol of the native token.
pub const NATIVE_TOKEN_SYMBOL: &str = "Ⓝ";
/// The native token's fixed precision: one whole token is 10^24 yocto.
pub const NATIVE_TOKEN_DECIMALS: u32 = 24;
/// Upper bound on asset precision. `10^36` still fits in a u128, and no
/// real asset carries more; metadata claiming otherwise is rejected as
/// malformed rather than trusted into amount arithmetic.
pub const MAX_TOKEN_DECIMALS: u32 = 36;

/// NEP-148 fungible token metadata, fetched live from the token contract.
/// Asset precision is not stable across assets, so `decimals` is never
/// hard-coded anywhere in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FungibleTokenMetadata {
    pub spec: String,
    pub name: String,
    pub symbol: String,
    pub icon: Option<String>,
    pub reference: Option<String>,
    pub reference_hash: Option<String>,
    pub decimals: u32,
}

/// Fetches a token's metadata from its contract. Metadata reporting more
/// than [`MAX_TOKEN_DECIMALS`] decimals is malformed.
pub async fn ft_metadata(
    chain: &impl ChainQuery,
    token_id: &str,
) -> Result<FungibleTokenMetadata, QueryError> {
    let value = chain.query_view(token_id, "ft_metadata", json!({})).await?;
    let metadata: FungibleTokenMetadata =
        serde_json::from_value(value).map_err(|e| QueryError::Malformed(e.to_string()))?;
    if metadata.decimals > MAX_TOKEN_DECIMALS {
        return Err(QueryError::Malformed(format!(
            "{token_id} reports {} decimals, above the supported maximum of {MAX_TOKEN_DECIMALS}",
            metadata.decimals
        )));
    }
    Ok(metadata)
}

/// Metadata for several tokens, fetched concurrently. Tokens whose metadata
/// cannot be fetched come back as `None` instead of failing the batch; the
/// result order follows the input order, not fetch completion.
pub async fn ft_metadata_for_accounts(
    chain: &impl ChainQuery,
    token_ids: &[String],
) -> Vec<(String, Option<FungibleTokenMetadata>)> {
    let lookups = token_ids
        .iter()
        .map(|id| async move { (id.clone(), ft_metadata(chain, id).await.ok()) });
    join_all(lookups).await
}

fn with_thousands_separators(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders an indivisible amount as a human decimal. The integer amount is
/// divided by `10^decimals` exactly; no floating point is involved. The
/// whole part gets thousands separators, trailing fraction zeros are
/// trimmed.
///
/// `decimals` must be at most 36.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
    let divisor = 10u128.pow(decimals);
    let whole = with_thousands_separators(&(amount / divisor).to_string());
    let frac = amount % divisor;
    if frac == 0 {
        return whole;
    }
    let frac = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Renders a yocto amount in whole native tokens.
pub fn format_near_amount(amount: u128) -> String {
    format_token_amount(amount, NATIVE_TOKEN_DECIMALS)
}

/// Parses a human decimal amount into indivisible units.
///
/// The text may carry fewer fraction digits than the token's decimals,
/// never more; excess precision is rejected instead of silently rounded.
pub fn parse_token_amount(text: &str, decimals: u32) -> Result<u128, PreconditionError> {
    let trimmed = text.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (trimmed, ""),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(PreconditionError::MalformedAmount(text.to_owned()));
    }
    if frac.len() > decimals as usize {
        return Err(PreconditionError::AmountPrecision {
            text: text.to_owned(),
            decimals,
        });
    }
    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac);
    for _ in frac.len()..decimals as usize {
        digits.push('0');
    }
    digits
        .parse::<u128>()
        .map_err(|_| PreconditionError::AmountOverflow(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainQuery;
    use crate::request::ONE_NEAR;

    #[test]
    fn divides_by_ten_to_the_decimals_exactly() {
        assert_eq!(format_token_amount(ONE_NEAR, 24), "1");
        assert_eq!(format_token_amount(1_234_567, 6), "1.234567");
        assert_eq!(format_token_amount(1_500_000, 6), "1.5");
        assert_eq!(format_token_amount(0, 6), "0");
        assert_eq!(format_token_amount(1, 24), "0.000000000000000000000001");
        assert_eq!(format_token_amount(5, 0), "5");
    }

    #[test]
    fn whole_part_gets_thousands_separators() {
        assert_eq!(format_token_amount(1_234_567_000_000, 6), "1,234,567");
        assert_eq!(format_token_amount(1_000_000_000, 0), "1,000,000,000");
    }

    #[test]
    fn parse_pads_missing_fraction_digits() {
        assert_eq!(parse_token_amount("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(parse_token_amount("1", 24).unwrap(), ONE_NEAR);
        assert_eq!(parse_token_amount("0.000001", 6).unwrap(), 1);
        assert_eq!(parse_token_amount(" 2 ", 2).unwrap(), 200);
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert_eq!(
            parse_token_amount("0.1234567", 6).unwrap_err(),
            PreconditionError::AmountPrecision {
                text: "0.1234567".to_owned(),
                decimals: 6,
            }
        );
    }

    #[test]
    fn parse_rejects_garbage_and_overflow() {
        assert!(matches!(
            parse_token_amount("abc", 6),
            Err(PreconditionError::MalformedAmount(_))
        ));
        assert!(matches!(
            parse_token_amount("-1", 6),
            Err(PreconditionError::MalformedAmount(_))
        ));
        assert!(matches!(
            parse_token_amount(".", 6),
            Err(PreconditionError::MalformedAmount(_))
        ));
        assert!(matches!(
            parse_token_amount("400000000000000000000000000000000000000", 0),
            Err(PreconditionError::AmountOverflow(_))
        ));
    }

    #[test]
    fn parse_and_format_round_trip() {
        let amount = parse_token_amount("12.25", 8).unwrap();
        assert_eq!(format_token_amount(amount, 8), "12.25");
    }

    #[tokio::test]
    async fn metadata_with_oversized_decimals_is_malformed() {
        let mut chain = MockChainQuery::new();
        chain.expect_query_view().returning(|_, _, _| {
            Ok(serde_json::json!({
                "spec": "ft-1.0.0",
                "name": "Hostile",
                "symbol": "EVIL",
                "decimals": 40,
            }))
        });

        assert!(matches!(
            ft_metadata(&chain, "evil.near").await,
            Err(QueryError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn metadata_batch_preserves_input_order() {
        let mut chain = MockChainQuery::new();
        chain.expect_query_view().returning(|account, _, _| {
            if account == "bad.near" {
                Err(QueryError::Network("timeout".to_owned()))
            } else {
                Ok(serde_json::json!({
                    "spec": "ft-1.0.0",
                    "name": account,
                    "symbol": "TKN",
                    "decimals": 6,
                }))
            }
        });

        let ids = vec![
            "usdt.near".to_owned(),
            "bad.near".to_owned(),
            "dai.near".to_owned(),
        ];
        let metadatas = ft_metadata_for_accounts(&chain, &ids).await;
        assert_eq!(metadatas.len(), 3);
        assert_eq!(metadatas[0].0, "usdt.near");
        assert!(metadatas[0].1.is_some());
        assert_eq!(metadatas[1].0, "bad.near");
        assert!(metadatas[1].1.is_none());
        assert_eq!(metadatas[2].0, "dai.near");
        assert!(metadatas[2].1.is_some());
    }
}
