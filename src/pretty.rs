//! Contains new types for pretty-printing the timestamps and fixed-precision
//! prices found in DBN records.

use std::fmt;

use time::format_description::BorrowedFormatItem;

use crate::FIXED_PRICE_SCALE;

/// A new type for formatting nanosecond UNIX timestamps to the canonical
/// ISO 8601 format.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Ts(pub u64);

/// A new type for formatting the fixed-precision prices used in DBN.
///
/// Supports precision `{:.N}` to print `N` decimal places. By default all 9
/// are printed.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Px(pub i64);

/// Converts a fixed-precision price to a floating point.
///
/// `UNDEF_PRICE` is convert to NaN.
pub fn px_to_f64(px: i64) -> f64 {
    if px == crate::UNDEF_PRICE {
        f64::NAN
    } else {
        px as f64 / FIXED_PRICE_SCALE as f64
    }
}

impl From<u64> for Ts {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<i64> for Px {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const TS_FORMAT: &[BorrowedFormatItem<'static>] = time::macros::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
        );
        let ts = self.0;
        if ts != 0 {
            // always in range because we're widening from u64 to i128
            let dt = time::OffsetDateTime::from_unix_timestamp_nanos(ts as i128).unwrap();
            if let Ok(dt_str) = dt.format(TS_FORMAT) {
                f.pad(&dt_str)?;
            } else {
                // fall back to regular int formatting
                fmt::Display::fmt(&ts, f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DIVISORS: [i64; 9] = [
            0,
            100_000_000,
            10_000_000,
            1_000_000,
            100_000,
            10_000,
            1_000,
            100,
            10,
        ];
        let px = self.0;
        if px == crate::UNDEF_PRICE {
            return f.pad("UNDEF_PRICE");
        }
        let (is_nonnegative, px_abs) = if px < 0 { (false, -px) } else { (true, px) };
        let px_integer = px_abs / FIXED_PRICE_SCALE;
        let px_fraction = px_abs % FIXED_PRICE_SCALE;
        match f.precision() {
            Some(0) => f.pad_integral(is_nonnegative, "", &px_integer.to_string()),
            Some(precision @ ..9) => f.pad_integral(
                is_nonnegative,
                "",
                &format!(
                    "{px_integer}.{:0precision$}",
                    px_fraction / DIVISORS[precision]
                ),
            ),
            _ => f.pad_integral(is_nonnegative, "", &format!("{px_integer}.{px_fraction:09}")),
        }
    }
}
