//! Encoding of DBN metadata and records into binary byte sinks.

use std::{io, num::NonZeroU64};

use crate::{
    metadata::date_to_ymd, record::Record, Error, Metadata, Result, SymbolMapping, DBN_VERSION,
    METADATA_FIXED_LEN, NULL_LIMIT, NULL_RECORD_COUNT, NULL_SCHEMA, NULL_STYPE, UNDEF_TIMESTAMP,
};

/// Type for encoding files and streams in Databento Binary Encoding (DBN):
/// the metadata header followed by records.
pub struct Encoder<W>
where
    W: io::Write,
{
    record_encoder: RecordEncoder<W>,
}

impl<W> Encoder<W>
where
    W: io::Write,
{
    /// Creates a new DBN [`Encoder`] that will write to `writer`.
    ///
    /// # Errors
    /// This function will return an error if it fails to encode `metadata` to
    /// `writer`.
    pub fn new(mut writer: W, metadata: &Metadata) -> Result<Self> {
        MetadataEncoder::new(&mut writer).encode(metadata)?;
        Ok(Self {
            record_encoder: RecordEncoder::new(writer),
        })
    }

    /// Encodes a single record.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_record<R: Record>(&mut self, record: &R) -> Result<()> {
        self.record_encoder.encode_record(record)
    }

    /// Encodes a slice of records.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_records<R: Record>(&mut self, records: &[R]) -> Result<()> {
        self.record_encoder.encode_records(records)
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.record_encoder.get_ref()
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        self.record_encoder.get_mut()
    }
}

/// Type for encoding [`Metadata`] into Databento Binary Encoding (DBN).
///
/// The variable-length sections make the total length awkward to predict, so
/// the encoder assembles everything after the 8-byte prefix in memory first;
/// the length prefix is then simply the size of that buffer.
pub struct MetadataEncoder<W>
where
    W: io::Write,
{
    writer: W,
}

impl<W> MetadataEncoder<W>
where
    W: io::Write,
{
    /// Creates a new [`MetadataEncoder`] that will write to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encodes `metadata` into DBN.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer, if `metadata` is from an unsupported DBN version, or if any
    /// symbol is too long for the fixed-width symbol fields.
    pub fn encode(&mut self, metadata: &Metadata) -> Result<()> {
        if metadata.version == 0 || metadata.version > DBN_VERSION {
            return Err(Error::encode(format!(
                "can't encode metadata with version {}; expected 1 or {DBN_VERSION}",
                metadata.version
            )));
        }
        let body = encode_body(metadata)?;
        let mut framed = Vec::with_capacity(8 + body.len());
        framed.extend_from_slice(b"DBN");
        framed.push(metadata.version);
        framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
        framed.extend_from_slice(&body);
        self.writer
            .write_all(&framed)
            .map_err(|e| Error::io(e, "writing DBN metadata"))
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encodes everything that follows the 8-byte prefix: the version-specific
/// fixed header, then the variable-length symbol sections.
fn encode_body(metadata: &Metadata) -> Result<Vec<u8>> {
    let width = metadata.symbol_cstr_len;
    let mut body = Vec::with_capacity(METADATA_FIXED_LEN);
    push_padded_str(&mut body, &metadata.dataset, crate::METADATA_DATASET_CSTR_LEN)?;
    body.extend_from_slice(
        &metadata
            .schema
            .map_or(NULL_SCHEMA, |schema| schema as u16)
            .to_le_bytes(),
    );
    body.extend_from_slice(&metadata.start.to_le_bytes());
    body.extend_from_slice(
        &metadata
            .end
            .map_or(UNDEF_TIMESTAMP, NonZeroU64::get)
            .to_le_bytes(),
    );
    body.extend_from_slice(&metadata.limit.map_or(NULL_LIMIT, NonZeroU64::get).to_le_bytes());
    if metadata.version == 1 {
        // room for the record count that v1 kept in its fixed header
        body.extend_from_slice(&NULL_RECORD_COUNT.to_le_bytes());
    }
    body.push(metadata.stype_in.map_or(NULL_STYPE, |stype| stype as u8));
    body.push(metadata.stype_out as u8);
    body.push(metadata.ts_out as u8);
    let reserved = if metadata.version == 1 {
        crate::METADATA_RESERVED_LEN_V1
    } else {
        body.extend_from_slice(&(width as u16).to_le_bytes());
        crate::METADATA_RESERVED_LEN
    };
    body.resize(body.len() + reserved, 0);
    // an empty schema definition section
    body.extend_from_slice(&0u32.to_le_bytes());
    for list in [&metadata.symbols, &metadata.partial, &metadata.not_found] {
        push_symbol_list(&mut body, list, width)?;
    }
    push_mappings(&mut body, &metadata.mappings, width)?;
    Ok(body)
}

fn push_symbol_list(body: &mut Vec<u8>, symbols: &[String], width: usize) -> Result<()> {
    body.extend_from_slice(&(symbols.len() as u32).to_le_bytes());
    for symbol in symbols {
        push_padded_str(body, symbol, width)?;
    }
    Ok(())
}

fn push_mappings(body: &mut Vec<u8>, mappings: &[SymbolMapping], width: usize) -> Result<()> {
    body.extend_from_slice(&(mappings.len() as u32).to_le_bytes());
    for mapping in mappings {
        push_padded_str(body, &mapping.raw_symbol, width)?;
        body.extend_from_slice(&(mapping.intervals.len() as u32).to_le_bytes());
        for interval in &mapping.intervals {
            body.extend_from_slice(&date_to_ymd(interval.start_date).to_le_bytes());
            body.extend_from_slice(&date_to_ymd(interval.end_date).to_le_bytes());
            push_padded_str(body, &interval.symbol, width)?;
        }
    }
    Ok(())
}

/// Appends `value` null-padded to exactly `width` bytes, keeping at least
/// one byte for the terminator.
fn push_padded_str(body: &mut Vec<u8>, value: &str, width: usize) -> Result<()> {
    if !value.is_ascii() {
        return Err(Error::Conversion {
            input: value.to_owned(),
            desired_type: "ASCII",
        });
    }
    if value.len() >= width {
        return Err(Error::encode(format!(
            "'{value}' doesn't fit in a fixed-width string of {width} bytes"
        )));
    }
    body.extend_from_slice(value.as_bytes());
    body.resize(body.len() + (width - value.len()), 0);
    Ok(())
}

/// Type for encoding Databento Binary Encoding (DBN) records (not metadata).
pub struct RecordEncoder<W>
where
    W: io::Write,
{
    writer: W,
}

impl<W> RecordEncoder<W>
where
    W: io::Write,
{
    /// Creates a new DBN [`RecordEncoder`] that will write to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encodes a single record. The record's bytes are written to the sink
    /// exactly as they are in memory.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_record<R: Record>(&mut self, record: &R) -> Result<()> {
        self.writer
            .write_all(record.as_ref())
            .map_err(|e| Error::io(e, format!("serializing {}", std::any::type_name::<R>())))
    }

    /// Encodes a slice of records.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_records<R: Record>(&mut self, records: &[R]) -> Result<()> {
        for record in records {
            self.encode_record(record)?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use rstest::rstest;
    use time::macros::date;

    use super::*;
    use crate::{
        decode::dbn::MetadataDecoder, MappingInterval, MetadataBuilder, SType, Schema,
    };

    fn metadata_with_mappings(version: u8) -> Metadata {
        MetadataBuilder::new()
            .version(version)
            .dataset("GLBX.MDP3")
            .schema(Some(Schema::Mbo))
            .start(1657230820000000000)
            .end(NonZeroU64::new(1658960170000000000))
            .limit(NonZeroU64::new(50))
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .symbols(vec!["ES".to_owned(), "NG".to_owned()])
            .partial(vec!["ESM2".to_owned()])
            .not_found(vec!["QQQQQ".to_owned()])
            .mappings(vec![
                SymbolMapping {
                    raw_symbol: "ES.0".to_owned(),
                    intervals: vec![MappingInterval {
                        start_date: date!(2022 - 07 - 26),
                        end_date: date!(2022 - 09 - 01),
                        symbol: "ESU2".to_owned(),
                    }],
                },
                SymbolMapping {
                    raw_symbol: "NG.0".to_owned(),
                    intervals: vec![
                        MappingInterval {
                            start_date: date!(2022 - 07 - 26),
                            end_date: date!(2022 - 08 - 29),
                            symbol: "NGU2".to_owned(),
                        },
                        MappingInterval {
                            start_date: date!(2022 - 08 - 29),
                            end_date: date!(2022 - 09 - 01),
                            symbol: "NGV2".to_owned(),
                        },
                    ],
                },
            ])
            .build()
    }

    #[rstest]
    #[case::v1(1)]
    #[case::v2(2)]
    fn test_metadata_identity(#[case] version: u8) {
        let metadata = metadata_with_mappings(version);
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer).encode(&metadata).unwrap();
        let decoded = MetadataDecoder::new(buffer.as_slice()).decode().unwrap();
        assert_eq!(decoded, metadata);
    }

    #[rstest]
    #[case::v1(1)]
    #[case::v2(2)]
    fn test_encoded_length_matches_prefix(#[case] version: u8) {
        let metadata = metadata_with_mappings(version);
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer).encode(&metadata).unwrap();
        let length = u32::from_le_bytes(buffer[4..8].try_into().unwrap());
        assert_eq!(buffer.len() - 8, length as usize);
    }

    #[rstest]
    #[case::v1(1, 8 + METADATA_FIXED_LEN)]
    #[case::v2(2, 8 + METADATA_FIXED_LEN)]
    fn test_fixed_header_width(#[case] version: u8, #[case] exp: usize) {
        // with no symbols or mappings, only the five empty section counts
        // follow the fixed header
        let metadata = MetadataBuilder::new()
            .version(version)
            .dataset("XNAS.ITCH")
            .schema(None)
            .start(0)
            .stype_in(None)
            .stype_out(SType::InstrumentId)
            .build();
        let mut buffer = Vec::new();
        MetadataEncoder::new(&mut buffer).encode(&metadata).unwrap();
        assert_eq!(buffer.len(), exp + 4 * 5);
    }

    #[test]
    fn test_encode_rejects_long_symbol() {
        let metadata = MetadataBuilder::new()
            .dataset("XNAS.ITCH")
            .schema(Some(Schema::Trades))
            .start(0)
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .symbols(vec!["X".repeat(100)])
            .build();
        let mut buffer = Vec::new();
        let res = MetadataEncoder::new(&mut buffer).encode(&metadata);
        assert!(matches!(res, Err(Error::Encode(_))));
    }

    #[test]
    fn test_encode_rejects_non_ascii() {
        let metadata = MetadataBuilder::new()
            .dataset("XNAS.ITCH")
            .schema(Some(Schema::Trades))
            .start(0)
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .symbols(vec!["éé".to_owned()])
            .build();
        let mut buffer = Vec::new();
        let res = MetadataEncoder::new(&mut buffer).encode(&metadata);
        assert!(matches!(res, Err(Error::Conversion { .. })));
    }
}
