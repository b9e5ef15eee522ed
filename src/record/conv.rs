use std::{mem, os::raw::c_char, ptr::NonNull, slice};

use super::{HasRType, RecordHeader};
use crate::{Error, Result};

/// Aliases `data` as a slice of raw bytes.
///
/// # Safety
/// `data` must be sized and plain old data (POD), i.e. no pointers.
pub(crate) unsafe fn as_u8_slice<T: Sized>(data: &T) -> &[u8] {
    slice::from_raw_parts((data as *const T).cast(), mem::size_of::<T>())
}

/// Tries to decode a reference to a record of type `T` from `bytes`. The
/// lifetime of the returned reference is tied to the input.
///
/// # Errors
/// This function returns an error if `bytes` is shorter than the size of `T`
/// or if the rtype in the header doesn't match `T`.
pub fn record_from_bytes<T: HasRType>(bytes: &[u8]) -> Result<&T> {
    if bytes.len() < mem::size_of::<T>() {
        return Err(Error::decode(format!(
            "unexpected number of bytes for {}: got {}, want {}",
            std::any::type_name::<T>(),
            bytes.len(),
            mem::size_of::<T>(),
        )));
    }
    // Safety: checked length above and `size_of::<T>()` is always at least
    // the size of a header.
    let non_null = unsafe { NonNull::new_unchecked(bytes.as_ptr().cast_mut()) };
    let header = unsafe { non_null.cast::<RecordHeader>().as_ref() };
    if T::has_rtype(header.rtype) {
        Ok(unsafe { non_null.cast::<T>().as_ref() })
    } else {
        Err(Error::conversion::<T>(format!(
            "record with rtype {:#04X}",
            header.rtype
        )))
    }
}

/// Tries to convert a str slice to a fixed-length null-terminated C char
/// array.
///
/// # Errors
/// This function returns an error if `s` contains more than N - 1 characters.
/// The last character is reserved for the null byte.
pub fn str_to_c_chars<const N: usize>(s: &str) -> Result<[c_char; N]> {
    if s.len() > (N - 1) {
        return Err(Error::encode(format!(
            "string cannot be longer than {}; received str of length {}",
            N - 1,
            s.len(),
        )));
    }
    let mut res = [0; N];
    for (i, byte) in s.as_bytes().iter().enumerate() {
        res[i] = *byte as c_char;
    }
    Ok(res)
}

/// Tries to convert a slice of `c_char`s to a UTF-8 `str`, up to the first
/// null byte. An array with no null byte converts in full.
///
/// # Errors
/// This function returns an error if `chars` contains invalid UTF-8.
pub fn c_chars_to_str<const N: usize>(chars: &[c_char; N]) -> Result<&str> {
    // Safety: a `c_char` array is plain bytes.
    let bytes: &[u8] = unsafe { slice::from_raw_parts(chars.as_ptr().cast(), N) };
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(N);
    std::str::from_utf8(&bytes[..end])
        .map_err(|e| Error::utf8(e, format!("converting c_char array: {chars:?}")))
}

/// Parses a raw nanosecond-precision UNIX timestamp to an `OffsetDateTime`.
/// Returns `None` if `ts` contains the sentinel for a null timestamp.
pub fn ts_to_dt(ts: u64) -> Option<time::OffsetDateTime> {
    if ts == crate::UNDEF_TIMESTAMP {
        None
    } else {
        // u64::MAX is within the maximum allowable range
        Some(time::OffsetDateTime::from_unix_timestamp_nanos(ts as i128).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_str_to_c_chars_trims_nothing() {
        let chars = str_to_c_chars::<22>("hello").unwrap();
        assert_eq!(c_chars_to_str(&chars).unwrap(), "hello");
    }

    #[test]
    fn test_c_chars_to_str_trims_null_padding() {
        let chars: [c_char; 8] = [
            b'h' as c_char,
            b'e' as c_char,
            b'l' as c_char,
            b'l' as c_char,
            b'o' as c_char,
            0,
            0,
            0,
        ];
        assert_eq!(c_chars_to_str(&chars).unwrap(), "hello");
    }

    #[test]
    fn test_c_chars_to_str_without_terminator() {
        let chars: [c_char; 5] = [
            b'h' as c_char,
            b'e' as c_char,
            b'l' as c_char,
            b'l' as c_char,
            b'o' as c_char,
        ];
        assert_eq!(c_chars_to_str(&chars).unwrap(), "hello");
    }

    #[test]
    fn test_str_to_c_chars_full_width() {
        // needs space for the null terminator
        assert!(str_to_c_chars::<5>("hello").is_err());
        assert!(str_to_c_chars::<6>("hello").is_ok());
    }

    #[test]
    fn test_ts_to_dt_epoch() {
        assert_eq!(ts_to_dt(0).unwrap(), datetime!(1970-01-01 00:00 UTC));
    }

    #[test]
    fn test_ts_to_dt_nanos() {
        assert_eq!(
            ts_to_dt(1234567890123456789).unwrap(),
            datetime!(2009-02-13 23:31:30.123456789 UTC)
        );
    }

    #[test]
    fn test_ts_to_dt_undef() {
        assert!(ts_to_dt(crate::UNDEF_TIMESTAMP).is_none());
    }
}
