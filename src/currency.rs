//! Currency display - formatting and parsing balance amounts for people.
//!
//! Balances are plain integers in the smallest unit. How that integer reads
//! ("¤12.34", "5g 3s 7c") is a presentation choice made by the
//! [`CurrencySystem`] configured for the game.

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// How balance amounts are shown to and read from players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurrencySystem {
    /// Single unit with decimal subdivisions (credits, dollars)
    Decimal(DecimalCurrency),
    /// Fantasy-style tiers (gold/silver/copper)
    MultiTier(MultiTierCurrency),
}

impl Default for CurrencySystem {
    fn default() -> Self {
        Self::Decimal(DecimalCurrency::default())
    }
}

/// Decimal currency: amounts are minor units, so 1234 with 2 decimals is 12.34.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecimalCurrency {
    pub name: String,
    pub name_plural: String,
    /// Symbol prefix (e.g., "$", "¤")
    pub symbol: String,
    /// Number of decimal places (2 for cents, 0 for whole units only)
    pub decimals: u8,
}

impl Default for DecimalCurrency {
    fn default() -> Self {
        Self {
            name: "credit".to_string(),
            name_plural: "credits".to_string(),
            symbol: "¤".to_string(),
            decimals: 2,
        }
    }
}

/// Multi-tier currency: amounts are base units of the lowest tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiTierCurrency {
    pub tiers: Vec<CurrencyTier>,
    /// Name shown for a zero amount (typically the lowest tier)
    pub base_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyTier {
    pub name: String,
    pub name_plural: String,
    pub symbol: String,
    /// How many base units one of this tier is worth
    pub ratio_to_base: u64,
}

impl CurrencyTier {
    fn new(name: &str, symbol: &str, ratio_to_base: u64) -> Self {
        Self {
            name: name.to_string(),
            name_plural: format!("{}s", name),
            symbol: symbol.to_string(),
            ratio_to_base,
        }
    }
}

impl Default for MultiTierCurrency {
    fn default() -> Self {
        Self {
            tiers: vec![
                CurrencyTier::new("copper", "c", 1),
                CurrencyTier::new("silver", "s", 10),
                CurrencyTier::new("gold", "g", 100),
            ],
            base_unit: "copper".to_string(),
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Render `amount` in the given system.
pub fn format_amount(amount: i64, system: &CurrencySystem) -> String {
    match system {
        CurrencySystem::Decimal(config) => format_decimal(amount, config),
        CurrencySystem::MultiTier(config) => format_multi_tier(amount, config),
    }
}

fn format_decimal(minor_units: i64, config: &DecimalCurrency) -> String {
    if config.decimals == 0 {
        let name = if minor_units.unsigned_abs() == 1 {
            &config.name
        } else {
            &config.name_plural
        };
        return format!("{}{} {}", config.symbol, minor_units, name);
    }
    let Some(divisor) = 10u64.checked_pow(config.decimals as u32) else {
        return format!("{}{}", config.symbol, minor_units);
    };
    let magnitude = minor_units.unsigned_abs();
    let sign = if minor_units < 0 { "-" } else { "" };
    format!(
        "{}{}{}.{:0width$}",
        config.symbol,
        sign,
        magnitude / divisor,
        magnitude % divisor,
        width = config.decimals as usize
    )
}

fn format_multi_tier(base_units: i64, config: &MultiTierCurrency) -> String {
    let mut remaining = base_units.unsigned_abs();
    let mut parts = Vec::new();

    for tier in tiers_descending(config) {
        let count = remaining / tier.ratio_to_base;
        if count > 0 {
            parts.push(format!("{}{}", count, tier.symbol));
            remaining %= tier.ratio_to_base;
        }
    }

    if parts.is_empty() {
        return format!("0 {}", config.base_unit);
    }
    let joined = parts.join(" ");
    if base_units < 0 {
        format!("-{}", joined)
    } else {
        joined
    }
}

fn tiers_descending(config: &MultiTierCurrency) -> Vec<&CurrencyTier> {
    let mut sorted: Vec<&CurrencyTier> = config
        .tiers
        .iter()
        .filter(|t| t.ratio_to_base > 0)
        .collect();
    sorted.sort_by(|a, b| b.ratio_to_base.cmp(&a.ratio_to_base));
    sorted
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse player input such as "12.34", "¤5", "5g 3s" or "5 gold 3 silver".
pub fn parse_amount(input: &str, system: &CurrencySystem) -> Result<i64, LedgerError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid("empty amount"));
    }
    match system {
        CurrencySystem::Decimal(config) => parse_decimal(input, config),
        CurrencySystem::MultiTier(config) => parse_multi_tier(input, config),
    }
}

fn invalid(reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidAmount(reason.into())
}

fn parse_decimal(input: &str, config: &DecimalCurrency) -> Result<i64, LedgerError> {
    // Plural before singular so "credits" doesn't leave a stray "s"
    let mut cleaned = input.replace(&config.name_plural, "");
    cleaned = cleaned.replace(&config.name, "");
    if !config.symbol.is_empty() {
        cleaned = cleaned.replace(&config.symbol, "");
    }
    let cleaned = cleaned.trim();
    let scale = 10i64
        .checked_pow(config.decimals as u32)
        .ok_or_else(|| invalid("too many decimal places configured"))?;

    let Some((whole_str, frac_str)) = cleaned.split_once('.') else {
        let value: i64 = cleaned
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a number", input)))?;
        return value
            .checked_mul(scale)
            .ok_or_else(|| invalid("amount too large"));
    };

    let whole_str = whole_str.trim();
    let frac_str = frac_str.trim();
    if frac_str.is_empty() || !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!("bad fractional part in '{}'", input)));
    }
    if frac_str.len() > config.decimals as usize {
        return Err(invalid(format!(
            "at most {} decimal places allowed",
            config.decimals
        )));
    }
    let negative = whole_str.starts_with('-');
    let whole: i64 = whole_str
        .parse()
        .map_err(|_| invalid(format!("bad whole part in '{}'", input)))?;
    let padded = format!("{:0<width$}", frac_str, width = config.decimals as usize);
    let frac: i64 = padded
        .parse()
        .map_err(|_| invalid(format!("bad fractional part in '{}'", input)))?;

    let whole_units = whole
        .checked_mul(scale)
        .ok_or_else(|| invalid("amount too large"))?;
    let signed_frac = if negative { -frac } else { frac };
    whole_units
        .checked_add(signed_frac)
        .ok_or_else(|| invalid("amount too large"))
}

fn parse_multi_tier(input: &str, config: &MultiTierCurrency) -> Result<i64, LedgerError> {
    if let Ok(value) = input.parse::<i64>() {
        return Ok(value);
    }

    let tokens = tokenize_tiers(input);
    if tokens.len() % 2 != 0 {
        return Err(invalid("missing tier after amount"));
    }

    let mut total: i64 = 0;
    for pair in tokens.chunks(2) {
        let count: i64 = pair[0]
            .parse()
            .map_err(|_| invalid(format!("expected number, got '{}'", pair[0])))?;
        let tier = find_tier(&pair[1], config)
            .ok_or_else(|| invalid(format!("unknown currency tier '{}'", pair[1])))?;
        let ratio = i64::try_from(tier.ratio_to_base).map_err(|_| invalid("tier ratio too large"))?;
        total = count
            .checked_mul(ratio)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| invalid("amount too large"))?;
    }
    Ok(total)
}

/// Split "5g 3 silver" into ["5", "g", "3", "silver"].
fn tokenize_tiers(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in input.split_whitespace() {
        let digits_end = word
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && *c == '-')))
            .map(|(i, _)| i)
            .unwrap_or(word.len());
        if digits_end > 0 && digits_end < word.len() {
            tokens.push(word[..digits_end].to_string());
            tokens.push(word[digits_end..].to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    tokens
}

fn find_tier<'a>(search: &str, config: &'a MultiTierCurrency) -> Option<&'a CurrencyTier> {
    let search = search.to_lowercase();
    config.tiers.iter().find(|tier| {
        tier.symbol.to_lowercase() == search
            || tier.name.to_lowercase() == search
            || tier.name_plural.to_lowercase() == search
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal() -> CurrencySystem {
        CurrencySystem::Decimal(DecimalCurrency::default())
    }

    fn tiers() -> CurrencySystem {
        CurrencySystem::MultiTier(MultiTierCurrency::default())
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_amount(1234, &decimal()), "¤12.34");
        assert_eq!(format_amount(0, &decimal()), "¤0.00");
        assert_eq!(format_amount(-5, &decimal()), "¤-0.05");
        assert_eq!(format_amount(-500, &decimal()), "¤-5.00");
    }

    #[test]
    fn test_format_whole_units() {
        let system = CurrencySystem::Decimal(DecimalCurrency {
            decimals: 0,
            ..DecimalCurrency::default()
        });
        assert_eq!(format_amount(100, &system), "¤100 credits");
        assert_eq!(format_amount(1, &system), "¤1 credit");
    }

    #[test]
    fn test_format_multi_tier() {
        assert_eq!(format_amount(537, &tiers()), "5g 3s 7c");
        assert_eq!(format_amount(100, &tiers()), "1g");
        assert_eq!(format_amount(37, &tiers()), "3s 7c");
        assert_eq!(format_amount(0, &tiers()), "0 copper");
        assert_eq!(format_amount(-12, &tiers()), "-1s 2c");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_amount("12.34", &decimal()).unwrap(), 1234);
        assert_eq!(parse_amount("100", &decimal()).unwrap(), 10000);
        assert_eq!(parse_amount("¤5.5", &decimal()).unwrap(), 550);
        assert_eq!(parse_amount("3 credits", &decimal()).unwrap(), 300);
        assert_eq!(parse_amount("-1.25", &decimal()).unwrap(), -125);
        assert!(parse_amount("1.234", &decimal()).is_err());
        assert!(parse_amount("", &decimal()).is_err());
        assert!(parse_amount("abc", &decimal()).is_err());
    }

    #[test]
    fn test_parse_multi_tier() {
        assert_eq!(parse_amount("537", &tiers()).unwrap(), 537);
        assert_eq!(parse_amount("5 gold 3 silver 7 copper", &tiers()).unwrap(), 537);
        assert_eq!(parse_amount("5g 3s 7c", &tiers()).unwrap(), 537);
        assert_eq!(parse_amount("2 Golds", &tiers()).unwrap(), 200);
        assert!(parse_amount("5", &tiers()).is_ok());
        assert!(parse_amount("5 platinum", &tiers()).is_err());
        assert!(parse_amount("gold 5", &tiers()).is_err());
    }
}
