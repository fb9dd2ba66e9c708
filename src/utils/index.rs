const MAX_EXPONENT: u64 = 1024;

/// Failure to read a decimal amount typed by the user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
	#[error("amount is empty")]
	Empty,
	#[error("amount is negative")]
	Negative,
	#[error("'{0}' is not a decimal number")]
	Invalid(String),
	#[error("more than {0} decimal places")]
	TooManyDecimals(u32),
	#[error("amount is too large")]
	Overflow,
}

/// Exact decimal rendering of a base-unit amount, e.g. `500000000000000000` → `"0.5"`.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
	let Some(scale) = 10u128.checked_pow(decimals) else {
		return amount.to_string();
	};
	if decimals == 0 {
		return amount.to_string();
	}
	let whole = amount / scale;
	let fraction = format!("{:0width$}", amount % scale, width = decimals as usize);
	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		format!("{}.0", whole)
	} else {
		format!("{}.{}", whole, fraction)
	}
}

/// Fixed-precision rendering with half-up rounding, e.g. `0.5` at precision 4 → `"0.5000"`.
pub fn format_display_amount(amount: u128, decimals: u32, precision: u32) -> String {
	let (Some(scale), Some(shown)) = (10u128.checked_pow(decimals), 10u128.checked_pow(precision))
	else {
		return format_token_amount(amount, decimals);
	};

	let scaled = if precision >= decimals {
		let pad = 10u128.pow(precision - decimals);
		match amount.checked_mul(pad) {
			Some(value) => value,
			None => return format_token_amount(amount, decimals),
		}
	} else {
		let unit = scale / shown;
		let rem = amount % unit;
		amount / unit + u128::from(rem * 2 >= unit)
	};

	if precision == 0 {
		return scaled.to_string();
	}
	format!(
		"{}.{:0width$}",
		scaled / shown,
		scaled % shown,
		width = precision as usize
	)
}

/// Parse a decimal string such as `"0.25"` or `"2.5e-1"` into base units.
///
/// Accepts an optional leading `+`, a missing whole part (`".5"`), a trailing dot (`"5."`)
/// and an exponent suffix. Trailing zeros past the last significant decimal are ignored.
pub fn parse_token_amount(text: &str, decimals: u32) -> Result<u128, AmountError> {
	let trimmed = text.trim();
	if trimmed.is_empty() {
		return Err(AmountError::Empty);
	}
	if trimmed.starts_with('-') {
		return Err(AmountError::Negative);
	}
	let invalid = || AmountError::Invalid(trimmed.to_string());
	let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

	let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
		Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().map_err(|_| invalid())?),
		None => (unsigned, 0),
	};
	let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
	let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
	if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
		return Err(invalid());
	}
	if exponent.unsigned_abs() > MAX_EXPONENT {
		return Err(if exponent > 0 {
			AmountError::Overflow
		} else {
			AmountError::TooManyDecimals(decimals)
		});
	}

	// Move the decimal point by the exponent
	let digits = format!("{}{}", whole, fraction);
	let point = whole.len() as i64 + exponent;
	let (whole, fraction) = if point <= 0 {
		(String::new(), format!("{}{}", "0".repeat(point.unsigned_abs() as usize), digits))
	} else if point as usize >= digits.len() {
		(format!("{}{}", digits, "0".repeat(point as usize - digits.len())), String::new())
	} else {
		let (head, tail) = digits.split_at(point as usize);
		(head.to_string(), tail.to_string())
	};
	let fraction = fraction.trim_end_matches('0');
	if fraction.len() > decimals as usize {
		return Err(AmountError::TooManyDecimals(decimals));
	}

	let scale = 10u128.checked_pow(decimals).ok_or(AmountError::Overflow)?;
	let whole_value: u128 = if whole.is_empty() {
		0
	} else {
		whole.parse().map_err(|_| AmountError::Overflow)?
	};
	let fraction_value: u128 = if decimals == 0 {
		0
	} else {
		format!("{:0<width$}", fraction, width = decimals as usize)
			.parse()
			.map_err(|_| AmountError::Overflow)?
	};

	whole_value
		.checked_mul(scale)
		.and_then(|value| value.checked_add(fraction_value))
		.ok_or(AmountError::Overflow)
}

/// `0x1234...abcd` form used wherever an address is shown inline
pub fn short_address(address: &str) -> String {
	if address.len() <= 10 {
		return address.to_string();
	}
	match (address.get(..6), address.get(address.len() - 4..)) {
		(Some(head), Some(tail)) => format!("{}...{}", head, tail),
		_ => address.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ETH: u32 = 18;

	#[test]
	fn formats_exact_amounts() {
		assert_eq!(format_token_amount(500_000_000_000_000_000, ETH), "0.5");
		assert_eq!(format_token_amount(1_000_000_000_000_000_000, ETH), "1.0");
		assert_eq!(format_token_amount(1, ETH), "0.000000000000000001");
		assert_eq!(format_token_amount(42, 0), "42");
	}

	#[test]
	fn display_amount_rounds_to_precision() {
		assert_eq!(format_display_amount(500_000_000_000_000_000, ETH, 4), "0.5000");
		assert_eq!(format_display_amount(1_234_567_000_000_000_000, ETH, 4), "1.2346");
		assert_eq!(format_display_amount(1_234_449_000_000_000_000, ETH, 4), "1.2344");
		assert_eq!(format_display_amount(0, ETH, 4), "0.0000");
		assert_eq!(format_display_amount(15, 1, 3), "1.500");
	}

	#[test]
	fn parses_decimal_amounts() {
		assert_eq!(parse_token_amount("0.25", ETH), Ok(250_000_000_000_000_000));
		assert_eq!(parse_token_amount(" 1 ", ETH), Ok(1_000_000_000_000_000_000));
		assert_eq!(parse_token_amount(".5", ETH), Ok(500_000_000_000_000_000));
		assert_eq!(parse_token_amount("2.", ETH), Ok(2_000_000_000_000_000_000));
		assert_eq!(parse_token_amount("+3", 0), Ok(3));
		assert_eq!(parse_token_amount("0", ETH), Ok(0));
		assert_eq!(parse_token_amount("0.5000000000000000000000", ETH), Ok(500_000_000_000_000_000));
	}

	#[test]
	fn parses_exponent_notation() {
		assert_eq!(parse_token_amount("1e-3", ETH), Ok(1_000_000_000_000_000));
		assert_eq!(parse_token_amount("2.5E-1", ETH), Ok(250_000_000_000_000_000));
		assert_eq!(parse_token_amount("1e2", ETH), Ok(100 * 1_000_000_000_000_000_000));
		assert_eq!(parse_token_amount("1.0e-18", ETH), Ok(1));
		assert_eq!(parse_token_amount("15e+0", 0), Ok(15));
		assert_eq!(
			parse_token_amount("1e-19", ETH),
			Err(AmountError::TooManyDecimals(ETH))
		);
		assert_eq!(parse_token_amount("1e40", ETH), Err(AmountError::Overflow));
		assert_eq!(parse_token_amount("1e99999", ETH), Err(AmountError::Overflow));
	}

	#[test]
	fn rejects_malformed_amounts() {
		assert_eq!(parse_token_amount("", ETH), Err(AmountError::Empty));
		assert_eq!(parse_token_amount("-1", ETH), Err(AmountError::Negative));
		assert_eq!(
			parse_token_amount("abc", ETH),
			Err(AmountError::Invalid("abc".to_string()))
		);
		assert!(matches!(parse_token_amount("1e", ETH), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_token_amount("e5", ETH), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_token_amount("1e2.5", ETH), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_token_amount("1.2.3", ETH), Err(AmountError::Invalid(_))));
		assert!(matches!(parse_token_amount(".", ETH), Err(AmountError::Invalid(_))));
		assert_eq!(
			parse_token_amount("0.0000000000000000001", ETH),
			Err(AmountError::TooManyDecimals(ETH))
		);
		assert_eq!(
			parse_token_amount("999999999999999999999999999", ETH),
			Err(AmountError::Overflow)
		);
	}

	#[test]
	fn shortens_addresses() {
		assert_eq!(
			short_address("0x52908400098527886E0F7030069857D2E4169EE7"),
			"0x5290...9EE7"
		);
		assert_eq!(short_address("0x1234"), "0x1234");
	}
}
