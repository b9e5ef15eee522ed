//! Decoding DBN from binary streams and from line-delimited JSON.
//! Decoders implement the [`DecodeRecord`] and [`DecodeRecordRef`] traits.

pub mod dbn;
mod json;
mod stream;

pub use self::dbn::{
    Decoder as DbnDecoder, MetadataDecoder as DbnMetadataDecoder, RecordDecoder as DbnRecordDecoder,
};
pub use json::Decoder as JsonDecoder;
pub use stream::StreamIterDecoder;

use crate::{record::HasRType, record_ref::RecordRef};

/// Trait for types that decode references to DBN records of a dynamic type.
pub trait DecodeRecordRef {
    /// Tries to decode a generic reference to a record. Returns `Ok(None)`
    /// if the input has been exhausted.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader returns an
    /// error. If the stream ends in the middle of a record, the error will be
    /// a [`Decode`](crate::Error::Decode) error naming the truncation. After
    /// any error, subsequent calls return the same error.
    fn decode_record_ref(&mut self) -> crate::Result<Option<RecordRef>>;
}

/// Trait for types that decode DBN records of a particular type.
pub trait DecodeRecord {
    /// Tries to decode a reference to a single record of type `T`. Returns
    /// `Ok(None)` if the input has been exhausted.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader returns an
    /// error. If the next record is of a different type than `T`, an
    /// [`Error::Conversion`](crate::Error::Conversion) will be returned.
    fn decode_record<T: HasRType>(&mut self) -> crate::Result<Option<&T>>;
}

/// Trait for decoders that can be converted into a streaming iterator of
/// records of a particular type.
pub trait DecodeStream: DecodeRecord + private::LastRecord {
    /// Converts the decoder into a streaming iterator of records of type `T`.
    /// This lazily decodes the data.
    fn decode_stream<T: HasRType>(self) -> StreamIterDecoder<Self, T>
    where
        Self: Sized;
}

pub(crate) mod private {
    use crate::record_ref::RecordRef;

    /// An implementation detail for accessing the last decoded record.
    pub trait LastRecord {
        /// Returns a [`RecordRef`] pointing to the most recently decoded
        /// record, if any.
        fn last_record(&self) -> Option<RecordRef>;
    }
}

pub(crate) trait FromLittleEndianSlice {
    fn from_le_slice(slice: &[u8]) -> Self;
}

impl FromLittleEndianSlice for u64 {
    /// # Panics
    /// Panics if the length of `slice` is less than 8 bytes.
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(std::mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl FromLittleEndianSlice for u32 {
    /// # Panics
    /// Panics if the length of `slice` is less than 4 bytes.
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(std::mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl FromLittleEndianSlice for u16 {
    /// # Panics
    /// Panics if the length of `slice` is less than 2 bytes.
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(std::mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}
