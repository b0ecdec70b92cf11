//! Scalar conversion of value text.

use crate::{IntFormat, ValueError};

/// Left shift for a binary magnitude suffix (`k`, `m`, `g`, `t`, any case), or
/// 0 if `suffix` is not one.
#[must_use]
pub fn size_shift(suffix: u8) -> u32 {
    match suffix.to_ascii_lowercase() {
        b'k' => 10,
        b'm' => 20,
        b'g' => 30,
        b't' => 40,
        _ => 0,
    }
}

/// Parses a decimal integer that must fit `format`. A leading `-` or `+` is
/// accepted for signed formats only.
///
/// # Errors
///
/// [`ValueError::NotANumber`] for anything but digits,
/// [`ValueError::OutOfRange`] if the value does not fit.
pub fn parse_int(text: &[u8], format: IntFormat) -> Result<i128, ValueError> {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) if format.signed => (true, rest),
        Some((b'+', rest)) if format.signed => (false, rest),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ValueError::NotANumber);
    }

    let mut value: i128 = 0;
    for &d in digits {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i128::from(d - b'0')))
            .ok_or(ValueError::OutOfRange)?;
    }
    check_range(if negative { -value } else { value }, format)
}

/// Converts an integer or size value: strips a magnitude suffix when `size` is
/// set, parses, applies the shift and checks the result against `format`.
///
/// # Errors
///
/// See [`parse_int`]; additionally [`ValueError::ZeroNotAllowed`] when
/// `not_zero` is set and the result is 0.
pub fn parse_integer(
    text: &[u8],
    format: IntFormat,
    size: bool,
    not_zero: bool,
) -> Result<i128, ValueError> {
    let mut digits = text;
    let mut shift = 0;
    if size && text.len() >= 2 {
        if let Some((&last, rest)) = text.split_last() {
            shift = size_shift(last);
            if shift != 0 {
                digits = rest;
            }
        }
    }

    // At most 64 significant bits before a shift of at most 40.
    let value = check_range(parse_int(digits, format)? << shift, format)?;
    if value == 0 && not_zero {
        return Err(ValueError::ZeroNotAllowed);
    }
    Ok(value)
}

/// Accepts `true`/`false` in any case, or an integer equal to 0 or 1.
///
/// # Errors
///
/// [`ValueError::NotABoolean`] for anything else.
pub fn parse_bool(text: &[u8]) -> Result<bool, ValueError> {
    if text.eq_ignore_ascii_case(b"true") {
        return Ok(true);
    }
    if text.eq_ignore_ascii_case(b"false") {
        return Ok(false);
    }
    match parse_int(text, IntFormat::U32) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        _ => Err(ValueError::NotABoolean),
    }
}

fn check_range(value: i128, format: IntFormat) -> Result<i128, ValueError> {
    let (min, max) = format.bounds();
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValueError::OutOfRange)
    }
}
