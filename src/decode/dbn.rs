//! Decoding of DBN metadata and records from binary byte sources.

use std::{
    fs::File,
    io::{self, BufReader},
    mem,
    num::NonZeroU64,
    path::Path,
};

use crate::{
    compat::SYMBOL_CSTR_LEN_V1,
    decode::{private, DecodeRecord, DecodeRecordRef, DecodeStream, FromLittleEndianSlice},
    error::silence_eof_error,
    metadata::ymd_to_date,
    record::{HasRType, Record, RecordHeader},
    record_ref::RecordRef,
    visitor::{self, Visitor},
    Error, MappingInterval, Metadata, Result, SType, Schema, StreamIterDecoder, SymbolMapping,
    DBN_VERSION, METADATA_FIXED_LEN, NULL_SCHEMA, NULL_STYPE, SYMBOL_CSTR_LEN, UNDEF_TIMESTAMP,
};

/// The first three bytes of every DBN metadata header.
pub(crate) const DBN_PREFIX: &[u8] = b"DBN";
pub(crate) const DBN_PREFIX_LEN: usize = DBN_PREFIX.len();

/// Type for decoding files and streams in Databento Binary Encoding (DBN),
/// both metadata and records.
///
/// The metadata is decoded lazily: on the first call to
/// [`metadata()`](Self::metadata) or the first record decode. Both metadata
/// and record errors are sticky; once the decoder has failed, every
/// subsequent call returns the same error, available through
/// [`last_err()`](Self::last_err).
pub struct Decoder<R> {
    metadata: Option<Metadata>,
    decoder: RecordDecoder<R>,
    sent_stream_end: bool,
}

impl<R> Decoder<R>
where
    R: io::Read,
{
    /// Creates a new DBN [`Decoder`] from `reader`. The metadata at the head
    /// of the stream will be decoded on first use.
    pub fn new(reader: R) -> Self {
        Self {
            metadata: None,
            decoder: RecordDecoder::new(reader),
            sent_stream_end: false,
        }
    }

    /// Creates a new DBN [`Decoder`] from `reader`, for streams whose
    /// metadata has already been consumed.
    pub fn with_metadata(reader: R, metadata: Metadata) -> Self {
        Self {
            metadata: Some(metadata),
            decoder: RecordDecoder::new(reader),
            sent_stream_end: false,
        }
    }

    /// Returns a reference to the [`Metadata`] from the stream's head,
    /// decoding it first if it hasn't been read yet.
    ///
    /// # Errors
    /// This function returns an error if the metadata is invalid or the
    /// reader fails. The failure is sticky.
    pub fn metadata(&mut self) -> Result<&Metadata> {
        self.decode_metadata_if_needed()?;
        Ok(self.metadata.as_ref().unwrap())
    }

    /// Returns the error that terminated decoding, if any.
    pub fn last_err(&self) -> Option<&Error> {
        self.decoder.last_err()
    }

    /// Returns the raw bytes of the most recently decoded record, if any.
    /// They're only valid until the next decode call.
    pub fn last_record_bytes(&self) -> Option<&[u8]> {
        self.decoder.last_record_bytes()
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        self.decoder.get_mut()
    }

    /// Returns a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        self.decoder.get_ref()
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.decoder.into_inner()
    }

    /// Decodes the next record and dispatches it to the matching method on
    /// `visitor`. All candle rtypes route to
    /// [`on_ohlcv`](crate::visitor::Visitor::on_ohlcv); version-1-sized
    /// gateway records are upgraded before dispatch. Returns `Ok(false)`
    /// after the end of the stream, calling
    /// [`on_stream_end`](crate::visitor::Visitor::on_stream_end) exactly
    /// once.
    ///
    /// # Errors
    /// This function returns an error if decoding fails or the visitor
    /// returns an error. An unrecognized rtype produces an
    /// [`Error::Conversion`](crate::Error::Conversion); the record has
    /// already been consumed, so the caller may keep scanning. Other errors
    /// are sticky.
    pub fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<bool> {
        self.decode_metadata_if_needed()?;
        match self.decoder.decode_ref()? {
            Some(rec) => {
                if let Err(err) = visitor::dispatch(rec, visitor) {
                    // unknown rtypes are recoverable, everything else ends
                    // the scan
                    if !matches!(err, Error::Conversion { .. }) {
                        self.decoder.last_error = Some(err.clone());
                    }
                    Err(err)
                } else {
                    Ok(true)
                }
            }
            None => {
                if !self.sent_stream_end {
                    self.sent_stream_end = true;
                    visitor.on_stream_end()?;
                }
                Ok(false)
            }
        }
    }

    /// Tries to decode all records into a `Vec`. This eagerly decodes the
    /// data.
    ///
    /// # Errors
    /// This function returns an error if decoding fails or any of the
    /// records is of a different type than `T`.
    pub fn decode_records<T: HasRType + Clone>(mut self) -> Result<Vec<T>> {
        let mut res = Vec::new();
        while let Some(rec) = self.decode_record::<T>()? {
            res.push(rec.clone());
        }
        Ok(res)
    }

    fn decode_metadata_if_needed(&mut self) -> Result<()> {
        if self.metadata.is_some() {
            return Ok(());
        }
        if let Some(err) = self.decoder.last_err() {
            return Err(err.clone());
        }
        match MetadataDecoder::new(self.decoder.get_mut()).decode() {
            Ok(metadata) => {
                self.metadata = Some(metadata);
                Ok(())
            }
            Err(err) => {
                self.decoder.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

impl Decoder<BufReader<File>> {
    /// Creates a DBN [`Decoder`] from the file at `path`.
    ///
    /// # Errors
    /// This function will return an error if it is unable to open the file
    /// at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::io(
                e,
                format!("opening DBN file at path '{}'", path.as_ref().display()),
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R> DecodeRecordRef for Decoder<R>
where
    R: io::Read,
{
    fn decode_record_ref(&mut self) -> Result<Option<RecordRef>> {
        self.decode_metadata_if_needed()?;
        self.decoder.decode_ref()
    }
}

impl<R> DecodeRecord for Decoder<R>
where
    R: io::Read,
{
    fn decode_record<T: HasRType>(&mut self) -> Result<Option<&T>> {
        self.decode_metadata_if_needed()?;
        self.decoder.decode()
    }
}

impl<R> private::LastRecord for Decoder<R>
where
    R: io::Read,
{
    fn last_record(&self) -> Option<RecordRef> {
        private::LastRecord::last_record(&self.decoder)
    }
}

impl<R> DecodeStream for Decoder<R>
where
    R: io::Read,
{
    fn decode_stream<T: HasRType>(self) -> StreamIterDecoder<Self, T> {
        StreamIterDecoder::new(self)
    }
}

/// A DBN decoder of records. Handles the length-prefixed framing: the first
/// byte of every record is its length in 32-bit words.
///
/// The record bytes are read into a scratch buffer that is reused across
/// calls, so a decoded record is only valid until the next call.
pub struct RecordDecoder<R> {
    reader: R,
    // Invariant: holds the complete last record, length prefix included.
    scratch: Vec<u8>,
    last_length: usize,
    pub(crate) last_error: Option<Error>,
}

impl<R> RecordDecoder<R>
where
    R: io::Read,
{
    /// Creates a new `RecordDecoder` that will decode from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            scratch: Vec::new(),
            last_length: 0,
            last_error: None,
        }
    }

    /// Returns the error that terminated decoding, if any.
    pub fn last_err(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Returns the raw bytes of the most recently decoded record, if any.
    /// They're only valid until the next decode call.
    pub fn last_record_bytes(&self) -> Option<&[u8]> {
        (self.last_length > 0).then(|| &self.scratch[..self.last_length])
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Returns a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Tries to decode the next record of type `T`. Returns `Ok(None)` if
    /// the reader is exhausted.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails, the
    /// record is truncated, or the next record's rtype or length doesn't
    /// match `T`.
    pub fn decode<T: HasRType>(&mut self) -> Result<Option<&T>> {
        if let Some(rec_ref) = self.decode_ref()? {
            if rec_ref.record_size() < mem::size_of::<T>() {
                return Err(Error::decode(format!(
                    "record with rtype {:#04X} and length {} is too short for {}",
                    rec_ref.header().rtype,
                    rec_ref.record_size(),
                    std::any::type_name::<T>(),
                )));
            }
            rec_ref
                .get::<T>()
                .ok_or_else(|| {
                    Error::conversion::<T>(format!(
                        "record with rtype {:#04X}",
                        rec_ref.header().rtype
                    ))
                })
                .map(Some)
        } else {
            Ok(None)
        }
    }

    /// Tries to decode a generic reference to a record. Returns `Ok(None)`
    /// on a clean end of the stream.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails or the
    /// stream ends in the middle of a record. Errors are sticky: every
    /// subsequent call returns the same error.
    pub fn decode_ref(&mut self) -> Result<Option<RecordRef>> {
        if let Some(err) = &self.last_error {
            return Err(err.clone());
        }
        self.last_length = 0;
        // the first byte is the record length in 32-bit words; running out
        // of input here is the clean way for a stream to end
        let mut length_word = [0u8; 1];
        if let Err(err) = self.reader.read_exact(&mut length_word) {
            return match silence_eof_error(err) {
                Ok(none) => Ok(none),
                Err(err) => Err(self.stick(Error::io(err, "decoding record length"))),
            };
        }
        let byte_len = length_word[0] as usize * RecordHeader::LENGTH_MULTIPLIER;
        if byte_len < mem::size_of::<RecordHeader>() {
            return Err(self.stick(Error::decode(format!(
                "record length {byte_len} is shorter than the record header"
            ))));
        }
        if self.scratch.len() < byte_len {
            self.scratch.resize(byte_len, 0);
        }
        self.scratch[0] = length_word[0];
        if let Err(err) = self.reader.read_exact(&mut self.scratch[1..byte_len]) {
            // a partial record is a framing error, not a clean end
            return if err.kind() == io::ErrorKind::UnexpectedEof {
                Err(self.stick(Error::decode(format!(
                    "stream ended in the middle of a record: expected {byte_len} bytes"
                ))))
            } else {
                Err(self.stick(Error::io(err, "decoding record")))
            };
        }
        self.last_length = byte_len;
        // Safety: `scratch` contains a full record of `byte_len` bytes.
        Ok(Some(unsafe { RecordRef::new(&self.scratch[..byte_len]) }))
    }

    fn stick(&mut self, err: Error) -> Error {
        self.last_error = Some(err.clone());
        err
    }
}

impl<R> DecodeRecord for RecordDecoder<R>
where
    R: io::Read,
{
    fn decode_record<T: HasRType>(&mut self) -> Result<Option<&T>> {
        self.decode()
    }
}

impl<R> DecodeRecordRef for RecordDecoder<R>
where
    R: io::Read,
{
    fn decode_record_ref(&mut self) -> Result<Option<RecordRef>> {
        self.decode_ref()
    }
}

impl<R> private::LastRecord for RecordDecoder<R>
where
    R: io::Read,
{
    fn last_record(&self) -> Option<RecordRef> {
        self.last_record_bytes()
            // Safety: the buffer contains the full record from the previous
            // successful decode
            .map(|bytes| unsafe { RecordRef::new(bytes) })
    }
}

impl<R> DecodeStream for RecordDecoder<R>
where
    R: io::Read,
{
    fn decode_stream<T: HasRType>(self) -> StreamIterDecoder<Self, T> {
        StreamIterDecoder::new(self)
    }
}

/// Type for decoding [`Metadata`] from Databento Binary Encoding (DBN).
pub struct MetadataDecoder<R> {
    reader: R,
}

impl<R> MetadataDecoder<R>
where
    R: io::Read,
{
    /// Creates a new DBN [`MetadataDecoder`] from `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Decodes and returns DBN [`Metadata`].
    ///
    /// # Errors
    /// This function will return an error if it is unable to parse the
    /// metadata.
    pub fn decode(&mut self) -> Result<Metadata> {
        let mut prefix = [0u8; 8];
        self.reader
            .read_exact(&mut prefix)
            .map_err(|e| Error::io(e, "reading metadata prefix"))?;
        if &prefix[..DBN_PREFIX_LEN] != DBN_PREFIX {
            return Err(Error::decode(
                "stream doesn't start with the DBN magic bytes",
            ));
        }
        let version = prefix[DBN_PREFIX_LEN];
        if version == 0 || version > DBN_VERSION {
            return Err(Error::decode(format!(
                "unsupported DBN version {version}; this decoder reads versions 1 and {DBN_VERSION}"
            )));
        }
        let length = u32::from_le_slice(&prefix[4..]) as usize;
        if length < METADATA_FIXED_LEN {
            return Err(Error::decode(format!(
                "metadata length {length} is shorter than the fixed header"
            )));
        }
        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .map_err(|e| Error::io(e, "reading metadata"))?;
        Self::decode_metadata_fields(version, &body)
    }

    pub(crate) fn decode_metadata_fields(version: u8, buffer: &[u8]) -> Result<Metadata> {
        let mut cursor = MetadataCursor::new(buffer);
        let dataset = cursor.cstr(crate::METADATA_DATASET_CSTR_LEN, "dataset")?;
        let schema = match cursor.u16("schema")? {
            NULL_SCHEMA => None,
            raw => Some(
                Schema::try_from(raw).map_err(|_| Error::conversion::<Schema>(raw.to_string()))?,
            ),
        };
        let start = cursor.u64("start")?;
        let raw_end = cursor.u64("end")?;
        let limit = NonZeroU64::new(cursor.u64("limit")?);
        if version == 1 {
            cursor.skip(mem::size_of::<u64>(), "deprecated record count")?;
        }
        let stype_in = match cursor.u8("stype_in")? {
            NULL_STYPE => None,
            raw => Some(SType::try_from(raw).map_err(|_| Error::conversion::<SType>(raw))?),
        };
        let raw_stype_out = cursor.u8("stype_out")?;
        let stype_out =
            SType::try_from(raw_stype_out).map_err(|_| Error::conversion::<SType>(raw_stype_out))?;
        let ts_out = cursor.u8("ts_out")? != 0;
        let symbol_cstr_len = if version == 1 {
            SYMBOL_CSTR_LEN_V1
        } else {
            let width = cursor.u16("symbol_cstr_len")? as usize;
            if width != SYMBOL_CSTR_LEN {
                return Err(Error::decode(format!(
                    "fixed symbol width {width} doesn't match the v2 width {SYMBOL_CSTR_LEN}"
                )));
            }
            width
        };
        cursor.skip(
            if version == 1 {
                crate::METADATA_RESERVED_LEN_V1
            } else {
                crate::METADATA_RESERVED_LEN
            },
            "reserved",
        )?;
        // schema definitions aren't supported and are skipped over
        let schema_definition_len = cursor.u32("schema definition length")? as usize;
        cursor.skip(schema_definition_len, "schema definition")?;
        let symbols = decode_symbol_list(&mut cursor, symbol_cstr_len)?;
        let partial = decode_symbol_list(&mut cursor, symbol_cstr_len)?;
        let not_found = decode_symbol_list(&mut cursor, symbol_cstr_len)?;
        let mappings = decode_mappings(&mut cursor, symbol_cstr_len)?;

        Ok(Metadata {
            version,
            dataset,
            schema,
            start,
            end: if raw_end == UNDEF_TIMESTAMP {
                None
            } else {
                NonZeroU64::new(raw_end)
            },
            limit,
            stype_in,
            stype_out,
            ts_out,
            symbol_cstr_len,
            symbols,
            partial,
            not_found,
            mappings,
        })
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// A bounds-checked view over the variable-length metadata buffer.
struct MetadataCursor<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> MetadataCursor<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Advances past the next `count` bytes, returning them.
    fn take(&mut self, count: usize, field: &str) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::decode(format!(
                "metadata ended while reading {field}: wanted {count} bytes, {} left",
                self.remaining(),
            )));
        }
        let bytes = &self.buffer[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn skip(&mut self, count: usize, field: &str) -> Result<()> {
        self.take(count, field).map(|_| ())
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16> {
        Ok(u16::from_le_slice(self.take(2, field)?))
    }

    fn u32(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_le_slice(self.take(4, field)?))
    }

    fn u64(&mut self, field: &str) -> Result<u64> {
        Ok(u64::from_le_slice(self.take(8, field)?))
    }

    /// Reads a fixed-width null-padded string, trimming the padding.
    fn cstr(&mut self, width: usize, field: &str) -> Result<String> {
        let bytes = self.take(width, field)?;
        Ok(std::str::from_utf8(bytes)
            .map_err(|e| Error::utf8(e, format!("decoding {field}")))?
            .trim_end_matches('\0')
            .to_owned())
    }
}

fn decode_symbol_list(cursor: &mut MetadataCursor, width: usize) -> Result<Vec<String>> {
    let count = cursor.u32("symbol count")? as usize;
    if cursor.remaining() < count * width {
        return Err(Error::decode(format!(
            "symbol section claims {count} entries but the metadata buffer is too small"
        )));
    }
    (0..count).map(|_| cursor.cstr(width, "symbol")).collect()
}

fn decode_mappings(cursor: &mut MetadataCursor, width: usize) -> Result<Vec<SymbolMapping>> {
    let count = cursor.u32("mapping count")? as usize;
    let mut mappings = Vec::with_capacity(count.min(cursor.remaining() / width.max(1)));
    for _ in 0..count {
        let raw_symbol = cursor.cstr(width, "mapping raw symbol")?;
        let interval_count = cursor.u32("interval count")? as usize;
        let interval_width = 2 * mem::size_of::<u32>() + width;
        if cursor.remaining() < interval_count * interval_width {
            return Err(Error::decode(format!(
                "mapping for '{raw_symbol}' claims {interval_count} intervals but the metadata \
                 buffer is too small"
            )));
        }
        let mut intervals = Vec::with_capacity(interval_count);
        for _ in 0..interval_count {
            let start_date = decode_wire_date(cursor, "interval start date")?;
            let end_date = decode_wire_date(cursor, "interval end date")?;
            let symbol = cursor.cstr(width, "interval symbol")?;
            intervals.push(MappingInterval {
                start_date,
                end_date,
                symbol,
            });
        }
        mappings.push(SymbolMapping {
            raw_symbol,
            intervals,
        });
    }
    Ok(mappings)
}

fn decode_wire_date(cursor: &mut MetadataCursor, field: &str) -> Result<time::Date> {
    let raw = cursor.u32(field)?;
    ymd_to_date(raw).map_err(|_| Error::decode(format!("{raw} isn't a valid {field}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        encode::dbn::{Encoder, MetadataEncoder, RecordEncoder},
        record::{
            str_to_c_chars, ErrorMsg, ImbalanceMsg, MboMsg, Mbp10Msg, Mbp1Msg, OhlcvMsg, Record,
            StatMsg, StatusMsg, TradeMsg, WithTsOut,
        },
        rtype, MetadataBuilder,
    };

    fn test_metadata() -> Metadata {
        MetadataBuilder::new()
            .dataset("XNAS.ITCH")
            .schema(Some(Schema::Trades))
            .start(1609160400000000000)
            .stype_in(Some(SType::InstrumentId))
            .stype_out(SType::InstrumentId)
            .build()
    }

    #[test]
    fn test_cursor_reads_padded_symbol() {
        // two back-to-back fixed-width symbols, the second touching the
        // buffer's end
        let mut buffer = Vec::new();
        for symbol in ["NGZ3", "NG.OPT"] {
            let chars = str_to_c_chars::<{ SYMBOL_CSTR_LEN_V1 }>(symbol).unwrap();
            buffer.extend(chars.iter().map(|c| *c as u8));
        }
        let mut cursor = MetadataCursor::new(&buffer);
        assert_eq!(cursor.cstr(SYMBOL_CSTR_LEN_V1, "symbol").unwrap(), "NGZ3");
        assert_eq!(cursor.cstr(SYMBOL_CSTR_LEN_V1, "symbol").unwrap(), "NG.OPT");
        assert_eq!(cursor.remaining(), 0);
        // a third read runs off the end
        assert!(cursor.cstr(SYMBOL_CSTR_LEN_V1, "symbol").is_err());
    }

    #[test]
    fn test_cursor_rejects_invalid_utf8() {
        // 0xF0 starts a four-byte sequence that never completes
        let mut bytes = [0u8; SYMBOL_CSTR_LEN_V1];
        bytes[0] = 0xF0;
        let mut cursor = MetadataCursor::new(&bytes);
        let res = cursor.cstr(SYMBOL_CSTR_LEN_V1, "symbol");
        assert!(matches!(res, Err(Error::Utf8 { .. })));
    }

    #[test]
    fn test_decode_metadata_wrong_magic() {
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer)
            .encode(&test_metadata())
            .unwrap();
        buffer[0] = b'Z';
        let res = MetadataDecoder::new(buffer.as_slice()).decode();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("magic")));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::too_new(3)]
    fn test_decode_metadata_bad_version(#[case] version: u8) {
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer)
            .encode(&test_metadata())
            .unwrap();
        buffer[3] = version;
        let res = MetadataDecoder::new(buffer.as_slice()).decode();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("version")));
    }

    #[test]
    fn test_decode_metadata_bad_cstr_len() {
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer)
            .encode(&test_metadata())
            .unwrap();
        // symbol_cstr_len lives right after stype_out and ts_out
        let offset = 8 + crate::METADATA_DATASET_CSTR_LEN + 2 + 8 * 3 + 3;
        buffer[offset..offset + 2].copy_from_slice(&22u16.to_le_bytes());
        let res = MetadataDecoder::new(buffer.as_slice()).decode();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("symbol width")));
    }

    #[test]
    fn test_decode_metadata_overstated_symbol_count() {
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer)
            .encode(&test_metadata())
            .unwrap();
        // the `symbols` count sits right after the fixed header and the
        // empty schema definition section
        let offset = 8 + METADATA_FIXED_LEN + 4;
        buffer[offset..offset + 4].copy_from_slice(&1000u32.to_le_bytes());
        let res = MetadataDecoder::new(buffer.as_slice()).decode();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("too small")));
    }

    #[test]
    fn test_ref_decoding_mixed_rtypes() {
        // one stream carrying three different record kinds; the type-erased
        // references sort them back out
        let mut trade = TradeMsg::default();
        trade.sequence = 42;
        let heartbeat = crate::record::SystemMsg::heartbeat(7);
        let mut bar = OhlcvMsg::default();
        bar.volume = 1_000_000;

        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, &test_metadata()).unwrap();
        encoder.encode_record(&trade).unwrap();
        encoder.encode_record(&heartbeat).unwrap();
        encoder.encode_record(&bar).unwrap();

        let mut decoder = Decoder::new(buffer.as_slice());
        let first = decoder.decode_record_ref().unwrap().unwrap();
        assert!(first.has::<TradeMsg>());
        assert_eq!(first.get::<TradeMsg>().unwrap().sequence, 42);
        let second = decoder.decode_record_ref().unwrap().unwrap();
        assert!(second.get::<TradeMsg>().is_none());
        assert!(second.get::<crate::record::SystemMsg>().unwrap().is_heartbeat());
        let third = decoder.decode_record_ref().unwrap().unwrap();
        assert_eq!(third.get::<OhlcvMsg>().unwrap().volume, 1_000_000);
        assert!(decoder.decode_record_ref().unwrap().is_none());
    }

    #[test]
    fn test_lazy_metadata() {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, &test_metadata()).unwrap();
        encoder.encode_record(&TradeMsg::default()).unwrap();

        // metadata decoded implicitly by the first record decode
        let mut decoder = Decoder::new(buffer.as_slice());
        assert!(decoder.decode_record::<TradeMsg>().unwrap().is_some());
        assert_eq!(decoder.metadata().unwrap().dataset, "XNAS.ITCH");
    }

    #[test]
    fn test_metadata_failure_is_sticky() {
        let mut decoder = Decoder::new([b'X'; 16].as_slice());
        assert!(decoder.metadata().is_err());
        assert!(decoder.decode_record_ref().is_err());
        assert!(decoder.last_err().is_some());
    }

    #[test]
    fn test_decode_record_0_length() {
        let buf = vec![0];
        let mut target = RecordDecoder::new(buf.as_slice());
        assert!(
            matches!(target.decode_ref(), Err(Error::Decode(msg)) if msg.contains("shorter than the record header"))
        );
    }

    #[test]
    fn test_decode_partial_record_is_truncation() {
        let buf = vec![6u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        assert!(buf[0] as usize * RecordHeader::LENGTH_MULTIPLIER > buf.len());

        let mut target = RecordDecoder::new(buf.as_slice());
        let res = target.decode_ref();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("middle of a record")));
        // and the error is sticky
        let res = target.decode_ref();
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("middle of a record")));
    }

    #[test]
    fn test_decode_record_length_less_than_header() {
        let buf = vec![3u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        assert_eq!(buf[0] as usize * RecordHeader::LENGTH_MULTIPLIER, buf.len());

        let mut target = RecordDecoder::new(buf.as_slice());
        assert!(
            matches!(target.decode_ref(), Err(Error::Decode(msg)) if msg.contains("shorter than the record header"))
        );
    }

    #[test]
    fn test_decode_record_length_longer_than_buffer() {
        let rec = ErrorMsg::new(1680703198000000000, "Test", true);
        let mut target = RecordDecoder::new(&rec.as_ref()[..rec.record_size() - 1]);
        assert!(matches!(target.decode_ref(), Err(Error::Decode(_))));
    }

    #[rstest]
    #[case::mbo(MboMsg::default())]
    #[case::trade(TradeMsg::default())]
    #[case::mbp1(Mbp1Msg::default())]
    #[case::mbp10(Mbp10Msg::default())]
    #[case::ohlcv(OhlcvMsg::default())]
    #[case::status(StatusMsg::default())]
    #[case::imbalance(ImbalanceMsg::default())]
    #[case::stat(StatMsg::default())]
    fn test_record_identity<R: HasRType + Clone + PartialEq + std::fmt::Debug>(#[case] rec: R) {
        let mut buffer = Vec::new();
        let mut encoder = RecordEncoder::new(&mut buffer);
        encoder.encode_record(&rec).unwrap();
        let mut decoder = RecordDecoder::new(buffer.as_slice());
        let res = decoder.decode::<R>().unwrap().unwrap();
        assert_eq!(*res, rec);
        assert!(decoder.decode::<R>().unwrap().is_none());
    }

    #[test]
    fn test_ts_out_framing() {
        // when the gateway appends its send timestamp, the length prefix
        // covers it, so the same bytes decode both with and without the
        // wrapper
        let mut sent = Vec::new();
        let mut buffer = Vec::new();
        let mut encoder = RecordEncoder::new(&mut buffer);
        for (seq, ts_out) in [(1u32, 1700000000000000001u64), (2, 1700000000000000002)] {
            let mut trade = TradeMsg::default();
            trade.sequence = seq;
            let wrapped = WithTsOut::new(trade, ts_out);
            encoder.encode_record(&wrapped).unwrap();
            sent.push(wrapped);
        }

        let mut wrapped_decoder = RecordDecoder::new(buffer.as_slice());
        for exp in &sent {
            let rec = wrapped_decoder
                .decode::<WithTsOut<TradeMsg>>()
                .unwrap()
                .unwrap();
            assert_eq!(rec, exp);
        }
        // a reader that ignores ts_out still sees the inner records
        let mut plain_decoder = RecordDecoder::new(buffer.as_slice());
        for exp in &sent {
            let rec = plain_decoder.decode::<TradeMsg>().unwrap().unwrap();
            assert_eq!(rec.sequence, exp.rec.sequence);
        }
        assert!(plain_decoder.decode::<TradeMsg>().unwrap().is_none());
    }

    #[test]
    fn test_decode_ohlcv_1s_stream() {
        let bars = [
            OhlcvMsg {
                hd: RecordHeader::new::<OhlcvMsg>(rtype::OHLCV_1S, 1, 5482, 1609160400000000000),
                open: 372025000000000,
                high: 372050000000000,
                low: 372025000000000,
                close: 372050000000000,
                volume: 57,
            },
            OhlcvMsg {
                hd: RecordHeader::new::<OhlcvMsg>(rtype::OHLCV_1S, 1, 5482, 1609160401000000000),
                open: 372050000000000,
                high: 372050000000000,
                low: 372050000000000,
                close: 372050000000000,
                volume: 13,
            },
        ];
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(
            &mut buffer,
            &MetadataBuilder::new()
                .dataset("GLBX.MDP3")
                .schema(Some(Schema::Ohlcv1S))
                .start(1609160400000000000)
                .stype_in(Some(SType::RawSymbol))
                .stype_out(SType::InstrumentId)
                .build(),
        )
        .unwrap();
        encoder.encode_records(&bars).unwrap();

        let decoded = Decoder::new(buffer.as_slice())
            .decode_records::<OhlcvMsg>()
            .unwrap();
        assert_eq!(decoded, bars);
        assert_eq!(decoded[0].hd.rtype, 0x20);
        assert_eq!(decoded[1].volume, 13);
    }

    #[test]
    fn test_scanner_matches_decode_records() {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, &test_metadata()).unwrap();
        let mut recs = Vec::new();
        for i in 0..5u32 {
            let mut rec = TradeMsg::default();
            rec.hd.instrument_id = i;
            rec.sequence = i;
            encoder.encode_record(&rec).unwrap();
            recs.push(rec);
        }

        // record-by-record draining
        let mut scanned = Vec::new();
        let mut decoder = Decoder::new(buffer.as_slice());
        while let Some(rec) = decoder.decode_record::<TradeMsg>().unwrap() {
            scanned.push(rec.clone());
        }
        // batch draining
        let batch = Decoder::new(buffer.as_slice())
            .decode_records::<TradeMsg>()
            .unwrap();
        assert_eq!(scanned, recs);
        assert_eq!(batch, recs);
    }
}
