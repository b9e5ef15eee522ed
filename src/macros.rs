//! Internal macros for wiring record structs into the record trait family.

/// Implements `AsRef<[u8]>`, [`Record`](crate::record::Record),
/// [`RecordMut`](crate::record::RecordMut), and
/// [`HasRType`](crate::record::HasRType) for a record struct beginning with a
/// `hd: RecordHeader` field. Takes the struct name followed by every rtype
/// the struct can decode.
macro_rules! impl_record {
    ($ty:ident, $($rtype:path),+ $(,)?) => {
        impl AsRef<[u8]> for $ty {
            fn as_ref(&self) -> &[u8] {
                unsafe { $crate::record::as_u8_slice(self) }
            }
        }

        impl $crate::record::Record for $ty {
            fn header(&self) -> &$crate::record::RecordHeader {
                &self.hd
            }
        }

        impl $crate::record::RecordMut for $ty {
            fn header_mut(&mut self) -> &mut $crate::record::RecordHeader {
                &mut self.hd
            }
        }

        impl $crate::record::HasRType for $ty {
            fn has_rtype(rtype: u8) -> bool {
                matches!(rtype, $($rtype)|+)
            }
        }
    };
}

pub(crate) use impl_record;
