//! `<pin>,<value>` command parsing
//!
//! Follows C `sscanf("%d,%d")`: each number may be preceded by whitespace and
//! a sign, the comma must follow the first number directly, and anything
//! after the second number is ignored. Scanning stops at the first NUL.

use crate::error::ValidationError;

/// A syntactically valid command, not yet range-checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCommand {
    pub pin: i64,
    pub value: i64,
}

pub fn parse(data: &[u8]) -> Result<RawCommand, ValidationError> {
    let data = data.split(|&b| b == 0).next().unwrap_or_default();

    let (pin, rest) = scan_int(data).ok_or(ValidationError::Malformed)?;
    let rest = rest.strip_prefix(b",").ok_or(ValidationError::Malformed)?;
    let (value, _) = scan_int(rest).ok_or(ValidationError::Malformed)?;

    Ok(RawCommand { pin, value })
}

/// One `%d` conversion; `None` on no digits or overflow
fn scan_int(input: &[u8]) -> Option<(i64, &[u8])> {
    let start = input
        .iter()
        .position(|b| !is_c_space(*b))
        .unwrap_or(input.len());
    let input = &input[start..];

    let (negative, input) = match input.first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let digits = input.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let magnitude = input[..digits].iter().try_fold(0i64, |acc, b| {
        acc.checked_mul(10)?.checked_add(i64::from(b - b'0'))
    })?;
    let value = if negative { -magnitude } else { magnitude };

    Some((value, &input[digits..]))
}

fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}
