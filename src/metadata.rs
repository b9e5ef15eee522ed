//! The [`Metadata`] header found at the start of every DBN file or stream,
//! its builder, and the symbol-mapping types it carries.

use std::num::NonZeroU64;

use crate::{
    compat::version_symbol_cstr_len, Error, PitSymbolMap, Result, SType, Schema, TsSymbolMap,
};

/// Describes the data that follows in a DBN file or stream. Encoded once at
/// the head; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The DBN schema version. Newly-encoded data uses
    /// [`crate::DBN_VERSION`].
    pub version: u8,
    /// The dataset code.
    pub dataset: String,
    /// The record schema of the stream, or `None` when the stream may mix
    /// record types.
    pub schema: Option<Schema>,
    /// The query start (or the first record of a split file) as nanoseconds
    /// since the UNIX epoch.
    pub start: u64,
    /// The query end (or the last record of a split file) as nanoseconds
    /// since the UNIX epoch, when known.
    pub end: Option<NonZeroU64>,
    /// The record cap requested for the query, if any.
    pub limit: Option<NonZeroU64>,
    /// The symbology type queried by, or `None` for a mix, as with live
    /// sessions.
    pub stype_in: Option<SType>,
    /// The symbology type symbols were resolved to.
    pub stype_out: SType,
    /// Whether each record carries an appended gateway send timestamp.
    pub ts_out: bool,
    /// The width of every fixed-length symbol string that follows,
    /// terminator byte included.
    pub symbol_cstr_len: usize,
    /// The symbols requested in the query.
    pub symbols: Vec<String>,
    /// Requested symbols that failed to resolve on _some_ days of the query
    /// window.
    pub partial: Vec<String>,
    /// Requested symbols that failed to resolve on _every_ day of the query
    /// window.
    pub not_found: Vec<String>,
    /// Per-symbol resolution intervals.
    pub mappings: Vec<SymbolMapping>,
}

impl Metadata {
    /// Creates a builder for building `Metadata`. Set the required fields
    /// `dataset`, `schema`, `start`, `stype_in`, and `stype_out` on it, then
    /// call `build()`.
    pub fn builder() -> MetadataBuilder<Unset, Unset, Unset, Unset, Unset> {
        MetadataBuilder::default()
    }

    /// The raw query start as a datetime.
    pub fn start(&self) -> time::OffsetDateTime {
        // `u64::MAX` is within the allowable range for `OffsetDateTime`s
        time::OffsetDateTime::from_unix_timestamp_nanos(self.start as i128).unwrap()
    }

    /// The raw query end as a datetime, when one was recorded.
    pub fn end(&self) -> Option<time::OffsetDateTime> {
        self.end
            .map(|end| time::OffsetDateTime::from_unix_timestamp_nanos(end.get() as i128).unwrap())
    }

    /// Builds an instrument ID to symbol map for `date`.
    ///
    /// Suits single-day queries and other situations where the mappings are
    /// known not to change; otherwise use [`Self::symbol_map()`].
    ///
    /// # Errors
    /// This function returns an error if the symbology types don't involve
    /// instrument IDs, if a numeric symbol doesn't parse, or if `date` is
    /// outside the query window.
    pub fn symbol_map_for_date(&self, date: time::Date) -> Result<PitSymbolMap> {
        PitSymbolMap::from_metadata(self, date)
    }

    /// Builds a map from date and instrument ID to symbol covering the whole
    /// query window.
    ///
    /// For a single date, [`Self::symbol_map_for_date()`] is lighter.
    ///
    /// # Errors
    /// This function returns an error if the symbology types don't involve
    /// instrument IDs or if a numeric symbol doesn't parse.
    pub fn symbol_map(&self) -> Result<TsSymbolMap> {
        TsSymbolMap::from_metadata(self)
    }
}

/// The optional [`Metadata`] fields, all of which have usable defaults.
/// Shared across every [`MetadataBuilder`] state.
#[derive(Debug, Default)]
struct OptionalFields {
    end: Option<NonZeroU64>,
    limit: Option<NonZeroU64>,
    ts_out: bool,
    symbols: Vec<String>,
    partial: Vec<String>,
    not_found: Vec<String>,
    mappings: Vec<SymbolMapping>,
}

/// Helper for constructing [`Metadata`] with defaults.
///
/// The five required fields are type parameters: each starts [`Unset`] and
/// `build()` only becomes callable once all of them have been given, so a
/// missing field is a compile error rather than a runtime one.
#[derive(Debug)]
pub struct MetadataBuilder<D, Sch, Start, StIn, StOut> {
    version: u8,
    dataset: D,
    schema: Sch,
    start: Start,
    stype_in: StIn,
    stype_out: StOut,
    optional: OptionalFields,
}

/// Marker for a required builder field that hasn't been set yet.
pub struct Unset {}

impl MetadataBuilder<Unset, Unset, Unset, Unset, Unset> {
    /// Creates a fresh builder with every required field unset.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for MetadataBuilder<Unset, Unset, Unset, Unset, Unset> {
    fn default() -> Self {
        Self {
            version: crate::DBN_VERSION,
            dataset: Unset {},
            schema: Unset {},
            start: Unset {},
            stype_in: Unset {},
            stype_out: Unset {},
            optional: OptionalFields::default(),
        }
    }
}

impl<D, Sch, Start, StIn, StOut> MetadataBuilder<D, Sch, Start, StIn, StOut> {
    /// Gives the metadata its [`version`](Metadata::version).
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Gives the metadata its [`dataset`](Metadata::dataset).
    pub fn dataset(
        self,
        dataset: impl ToString,
    ) -> MetadataBuilder<String, Sch, Start, StIn, StOut> {
        MetadataBuilder {
            version: self.version,
            dataset: dataset.to_string(),
            schema: self.schema,
            start: self.start,
            stype_in: self.stype_in,
            stype_out: self.stype_out,
            optional: self.optional,
        }
    }

    /// Gives the metadata its [`schema`](Metadata::schema).
    pub fn schema(
        self,
        schema: Option<Schema>,
    ) -> MetadataBuilder<D, Option<Schema>, Start, StIn, StOut> {
        MetadataBuilder {
            version: self.version,
            dataset: self.dataset,
            schema,
            start: self.start,
            stype_in: self.stype_in,
            stype_out: self.stype_out,
            optional: self.optional,
        }
    }

    /// Gives the metadata its [`start`](Metadata::start).
    pub fn start(self, start: u64) -> MetadataBuilder<D, Sch, u64, StIn, StOut> {
        MetadataBuilder {
            version: self.version,
            dataset: self.dataset,
            schema: self.schema,
            start,
            stype_in: self.stype_in,
            stype_out: self.stype_out,
            optional: self.optional,
        }
    }

    /// Gives the metadata its [`stype_in`](Metadata::stype_in).
    pub fn stype_in(
        self,
        stype_in: Option<SType>,
    ) -> MetadataBuilder<D, Sch, Start, Option<SType>, StOut> {
        MetadataBuilder {
            version: self.version,
            dataset: self.dataset,
            schema: self.schema,
            start: self.start,
            stype_in,
            stype_out: self.stype_out,
            optional: self.optional,
        }
    }

    /// Gives the metadata its [`stype_out`](Metadata::stype_out).
    pub fn stype_out(self, stype_out: SType) -> MetadataBuilder<D, Sch, Start, StIn, SType> {
        MetadataBuilder {
            version: self.version,
            dataset: self.dataset,
            schema: self.schema,
            start: self.start,
            stype_in: self.stype_in,
            stype_out,
            optional: self.optional,
        }
    }

    /// Gives the metadata its [`end`](Metadata::end).
    pub fn end(mut self, end: Option<NonZeroU64>) -> Self {
        self.optional.end = end;
        self
    }

    /// Gives the metadata its [`limit`](Metadata::limit).
    pub fn limit(mut self, limit: Option<NonZeroU64>) -> Self {
        self.optional.limit = limit;
        self
    }

    /// Gives the metadata its [`ts_out`](Metadata::ts_out).
    pub fn ts_out(mut self, ts_out: bool) -> Self {
        self.optional.ts_out = ts_out;
        self
    }

    /// Gives the metadata its [`symbols`](Metadata::symbols).
    pub fn symbols(mut self, symbols: Vec<String>) -> Self {
        self.optional.symbols = symbols;
        self
    }

    /// Gives the metadata its [`partial`](Metadata::partial).
    pub fn partial(mut self, partial: Vec<String>) -> Self {
        self.optional.partial = partial;
        self
    }

    /// Gives the metadata its [`not_found`](Metadata::not_found).
    pub fn not_found(mut self, not_found: Vec<String>) -> Self {
        self.optional.not_found = not_found;
        self
    }

    /// Gives the metadata its [`mappings`](Metadata::mappings).
    pub fn mappings(mut self, mappings: Vec<SymbolMapping>) -> Self {
        self.optional.mappings = mappings;
        self
    }
}

impl MetadataBuilder<String, Option<Schema>, u64, Option<SType>, SType> {
    /// Constructs the [`Metadata`]. Only callable once every required field
    /// has been set.
    pub fn build(self) -> Metadata {
        Metadata {
            version: self.version,
            dataset: self.dataset,
            schema: self.schema,
            start: self.start,
            end: self.optional.end,
            limit: self.optional.limit,
            stype_in: self.stype_in,
            stype_out: self.stype_out,
            ts_out: self.optional.ts_out,
            symbol_cstr_len: version_symbol_cstr_len(self.version),
            symbols: self.optional.symbols,
            partial: self.optional.partial,
            not_found: self.optional.not_found,
            mappings: self.optional.mappings,
        }
    }
}

/// A queried symbol together with the intervals it resolved over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMapping {
    /// The symbol as queried (in `stype_in`).
    pub raw_symbol: String,
    /// What `raw_symbol` resolved to over each date range.
    pub intervals: Vec<MappingInterval>,
}

/// One date range of a symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingInterval {
    /// The first UTC date of the range.
    pub start_date: time::Date,
    /// The UTC date the range ends on (exclusive).
    pub end_date: time::Date,
    /// What the symbol resolved to over this range (in `stype_out`).
    pub symbol: String,
}

/// Converts a date to the compact `YYYYMMDD` integer used on the wire.
pub fn date_to_ymd(date: time::Date) -> u32 {
    date.year() as u32 * 10_000 + date.month() as u32 * 100 + date.day() as u32
}

/// Converts an optional date to the compact `YYYYMMDD` integer used on the
/// wire. An unset date maps to 0.
pub fn maybe_date_to_ymd(date: Option<time::Date>) -> u32 {
    date.map(date_to_ymd).unwrap_or(0)
}

/// Parses a compact `YYYYMMDD` integer into a date.
///
/// # Errors
/// This function returns an error if `ymd` doesn't denote a valid calendar
/// date.
pub fn ymd_to_date(ymd: u32) -> Result<time::Date> {
    let year = ymd / 10_000;
    let remaining = ymd % 10_000;
    let month = u8::try_from(remaining / 100)
        .map_err(|_| Error::conversion::<time::Month>(ymd.to_string()))
        .and_then(|m| {
            time::Month::try_from(m).map_err(|_| Error::conversion::<time::Month>(ymd.to_string()))
        })?;
    let day = (remaining % 100) as u8;
    time::Date::from_calendar_date(year as i32, month, day)
        .map_err(|_| Error::conversion::<time::Date>(ymd.to_string()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use time::macros::date;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let metadata = Metadata::builder()
            .dataset("XNAS.ITCH")
            .schema(Some(Schema::Trades))
            .start(1609160400000000000)
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .build();
        assert_eq!(metadata.version, crate::DBN_VERSION);
        assert_eq!(metadata.symbol_cstr_len, crate::SYMBOL_CSTR_LEN);
        assert!(metadata.end.is_none());
        assert!(!metadata.ts_out);
    }

    #[test]
    fn test_builder_v1_symbol_width() {
        let metadata = Metadata::builder()
            .version(1)
            .dataset("GLBX.MDP3")
            .schema(None)
            .start(0)
            .stype_in(None)
            .stype_out(SType::InstrumentId)
            .build();
        assert_eq!(metadata.symbol_cstr_len, crate::compat::SYMBOL_CSTR_LEN_V1);
    }

    #[test]
    fn test_builder_optional_fields_survive_required_setters() {
        // the optional fields ride along unchanged while the required
        // setters change the builder's type
        let metadata = Metadata::builder()
            .ts_out(true)
            .symbols(vec!["ES.FUT".to_owned()])
            .dataset("GLBX.MDP3")
            .schema(Some(Schema::Mbo))
            .start(1)
            .stype_in(Some(SType::Parent))
            .stype_out(SType::InstrumentId)
            .build();
        assert!(metadata.ts_out);
        assert_eq!(metadata.symbols, vec!["ES.FUT".to_owned()]);
    }

    #[rstest]
    #[case(date!(2024 - 04 - 12), 20240412)]
    #[case(date!(1970 - 01 - 01), 19700101)]
    #[case(date!(2015 - 10 - 31), 20151031)]
    fn test_date_ymd_round_trip(#[case] date: time::Date, #[case] ymd: u32) {
        assert_eq!(date_to_ymd(date), ymd);
        assert_eq!(ymd_to_date(ymd).unwrap(), date);
    }

    #[test]
    fn test_unset_date_maps_to_zero() {
        assert_eq!(maybe_date_to_ymd(None), 0);
        assert_eq!(maybe_date_to_ymd(Some(date!(2024 - 04 - 12))), 20240412);
    }

    #[rstest]
    #[case::bad_month(20101305)]
    #[case::bad_day(20100600)]
    #[case::zero(0)]
    fn test_ymd_to_date_invalid(#[case] ymd: u32) {
        assert!(ymd_to_date(ymd).is_err());
    }
}
