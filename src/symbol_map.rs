//! Maps for translating between instrument IDs and human-readable symbols.

use std::{collections::HashMap, ops::Deref, sync::Arc};

use crate::{
    compat::SymbolMappingRec,
    metadata::MappingInterval,
    record::{Record, SymbolMappingMsg},
    record_ref::RecordRef,
    Error, Metadata, RType, SType,
};

/// A symbol map keyed by date and instrument ID, for use with data whose
/// mappings change over the query range. Commonly built from a [`Metadata`]
/// object via [`Self::from_metadata()`].
///
/// Every calendar day of every mapping interval gets its own entry, so
/// lookups are constant-time at the cost of memory proportional to the sum
/// of interval lengths. Filled once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsSymbolMap(HashMap<(time::Date, u32), Arc<String>>);

/// A symbol map for a single point in time, e.g. live data or a one-day
/// historical request.
///
/// Holds the mapping in both directions: instrument ID to symbol and symbol
/// to instrument ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitSymbolMap {
    symbols: HashMap<u32, String>,
    instrument_ids: HashMap<String, u32>,
}

/// Used for retrieving a symbol mapping for a DBN record.
pub trait SymbolIndex {
    /// Returns the associated symbol mapping for `record`. Returns `None` if
    /// no mapping exists.
    fn get_for_rec<R: Record>(&self, record: &R) -> Option<&String>;
}

impl TsSymbolMap {
    /// Creates a new empty timeseries symbol map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries, one per day per instrument.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Builds a timeseries symbol map from `metadata`.
    ///
    /// # Errors
    /// This function returns an error if the metadata's symbology types
    /// don't involve instrument IDs or if a numeric symbol doesn't parse.
    pub fn from_metadata(metadata: &Metadata) -> crate::Result<Self> {
        let mut res = Self::new();
        res.fill_from_metadata(metadata)?;
        Ok(res)
    }

    /// Drops any existing entries and rebuilds the map from `metadata`.
    ///
    /// # Errors
    /// This function returns an error if the metadata's symbology types
    /// don't involve instrument IDs or if a numeric symbol doesn't parse.
    pub fn fill_from_metadata(&mut self, metadata: &Metadata) -> crate::Result<()> {
        let inverse = is_inverse(metadata)?;
        self.0.clear();
        for mapping in &metadata.mappings {
            if inverse {
                // the numeric side is shared by all of this entry's intervals
                let instrument_id = parse_instrument_id(&mapping.raw_symbol)?;
                for interval in resolved_intervals(mapping) {
                    self.insert(
                        instrument_id,
                        interval.start_date,
                        interval.end_date,
                        Arc::new(interval.symbol.clone()),
                    )?;
                }
            } else {
                let symbol = Arc::new(mapping.raw_symbol.clone());
                for interval in resolved_intervals(mapping) {
                    self.insert(
                        parse_instrument_id(&interval.symbol)?,
                        interval.start_date,
                        interval.end_date,
                        symbol.clone(),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Writes an entry for every calendar day from `start_date` through
    /// `end_date` **inclusive of both ends**. Mapping intervals are
    /// documented as half-open, but the upper boundary day is written anyway,
    /// preserving long-standing behavior; when adjacent intervals touch, the
    /// later insertion wins on the shared day.
    ///
    /// Days that already had an entry are updated.
    ///
    /// # Errors
    /// This function returns an error if `start_date` comes after `end_date`.
    pub fn insert(
        &mut self,
        instrument_id: u32,
        start_date: time::Date,
        end_date: time::Date,
        symbol: Arc<String>,
    ) -> crate::Result<()> {
        if start_date > end_date {
            return Err(Error::BadArgument {
                param_name: "start_date".to_owned(),
                desc: "must not come after end_date".to_owned(),
            });
        }
        let mut day = start_date;
        loop {
            self.0.insert((day, instrument_id), symbol.clone());
            if day >= end_date {
                break;
            }
            day = day.next_day().unwrap();
        }
        Ok(())
    }

    /// Returns the symbol mapped to `instrument_id` on `date`, if any.
    pub fn get(&self, date: time::Date, instrument_id: u32) -> Option<&String> {
        self.0.get(&(date, instrument_id)).map(Deref::deref)
    }

    /// Returns a reference to the inner map.
    pub fn inner(&self) -> &HashMap<(time::Date, u32), Arc<String>> {
        &self.0
    }
}

impl SymbolIndex for TsSymbolMap {
    fn get_for_rec<R: Record>(&self, record: &R) -> Option<&String> {
        record
            .index_date()
            .and_then(|date| self.get(date, record.header().instrument_id))
    }
}

impl TryFrom<&Metadata> for TsSymbolMap {
    type Error = Error;

    fn try_from(metadata: &Metadata) -> Result<Self, Error> {
        Self::from_metadata(metadata)
    }
}

impl PitSymbolMap {
    /// Creates a new empty `PitSymbolMap`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the number of symbol mappings in the map.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Builds a point-in-time symbol map from `metadata`, keeping only the
    /// mapping intervals whose window contains `date`.
    ///
    /// # Errors
    /// This function returns an error if the metadata's symbology types
    /// don't involve instrument IDs, if a numeric symbol doesn't parse, or
    /// if `date` falls outside the metadata's query window.
    pub fn from_metadata(metadata: &Metadata, date: time::Date) -> crate::Result<Self> {
        let mut res = Self::new();
        res.fill_from_metadata(metadata, date)?;
        Ok(res)
    }

    /// Drops any existing entries and rebuilds the map from the mapping
    /// intervals in `metadata` whose window contains `date`.
    ///
    /// # Errors
    /// This function returns an error if the metadata's symbology types
    /// don't involve instrument IDs, if a numeric symbol doesn't parse, or
    /// if `date` falls outside the metadata's query window.
    pub fn fill_from_metadata(&mut self, metadata: &Metadata, date: time::Date) -> crate::Result<()> {
        let inverse = is_inverse(metadata)?;
        check_in_query_window(metadata, date)?;
        self.symbols.clear();
        self.instrument_ids.clear();
        for mapping in &metadata.mappings {
            let Some(interval) = interval_containing(&mapping.intervals, date) else {
                continue;
            };
            if interval.symbol.is_empty() {
                continue;
            }
            // in an inverse mapping the entry's raw symbol is the numeric
            // side; forward mappings have the roles swapped
            let (numeric, text) = if inverse {
                (&mapping.raw_symbol, &interval.symbol)
            } else {
                (&interval.symbol, &mapping.raw_symbol)
            };
            self.insert(parse_instrument_id(numeric)?, text.clone());
        }
        Ok(())
    }

    /// Handles updating the mappings (if required) for a generic record.
    ///
    /// # Errors
    /// This function returns an error when `record` contains a symbol
    /// mapping message with invalid UTF-8.
    pub fn on_record(&mut self, record: RecordRef) -> crate::Result<()> {
        if !matches!(record.rtype(), Ok(RType::SymbolMapping)) {
            return Ok(());
        }
        // >= to also allow `WithTsOut`; undersized records carry nothing
        // usable and are ignored
        if record.record_size() >= std::mem::size_of::<SymbolMappingMsg>() {
            // Safety: checked rtype and length
            self.on_symbol_mapping(unsafe { record.get_unchecked::<SymbolMappingMsg>() })
        } else if record.record_size()
            >= std::mem::size_of::<crate::compat::SymbolMappingMsgV1>()
        {
            // Safety: checked rtype and length
            self.on_symbol_mapping(unsafe {
                record.get_unchecked::<crate::compat::SymbolMappingMsgV1>()
            })
        } else {
            Ok(())
        }
    }

    /// Handles updating the mappings for a symbol mapping record. A failure
    /// leaves the map unchanged; the entry is simply not inserted.
    ///
    /// # Errors
    /// This function returns an error when `symbol_mapping` contains invalid
    /// UTF-8.
    pub fn on_symbol_mapping<S: SymbolMappingRec>(
        &mut self,
        symbol_mapping: &S,
    ) -> crate::Result<()> {
        let stype_out_symbol = symbol_mapping.stype_out_symbol()?;
        self.insert(
            symbol_mapping.header().instrument_id,
            stype_out_symbol.to_owned(),
        );
        Ok(())
    }

    /// Returns a reference to the symbol mapped to the given instrument ID.
    pub fn get(&self, instrument_id: u32) -> Option<&String> {
        self.symbols.get(&instrument_id)
    }

    /// Returns the instrument ID mapped to the given symbol.
    pub fn get_instrument_id(&self, symbol: &str) -> Option<u32> {
        self.instrument_ids.get(symbol).copied()
    }

    /// Returns a reference to the inner instrument ID to symbol map.
    pub fn inner(&self) -> &HashMap<u32, String> {
        &self.symbols
    }

    fn insert(&mut self, instrument_id: u32, symbol: String) {
        self.instrument_ids.insert(symbol.clone(), instrument_id);
        self.symbols.insert(instrument_id, symbol);
    }
}

impl SymbolIndex for PitSymbolMap {
    fn get_for_rec<R: Record>(&self, record: &R) -> Option<&String> {
        self.get(record.header().instrument_id)
    }
}

impl<R: Record> std::ops::Index<&R> for TsSymbolMap {
    type Output = String;

    fn index(&self, index: &R) -> &Self::Output {
        self.get_for_rec(index)
            .expect("symbol mapping for record")
    }
}

impl std::ops::Index<u32> for PitSymbolMap {
    type Output = String;

    fn index(&self, instrument_id: u32) -> &Self::Output {
        self.get(instrument_id)
            .expect("symbol mapping for instrument ID")
    }
}

/// Determines the direction of the metadata's mappings: inverse when the
/// instrument ID sits on the input side.
fn is_inverse(metadata: &Metadata) -> crate::Result<bool> {
    if metadata.stype_out == SType::InstrumentId {
        return Ok(false);
    }
    if metadata.stype_in == Some(SType::InstrumentId) {
        return Ok(true);
    }
    Err(Error::BadArgument {
        param_name: "metadata".to_owned(),
        desc: "either stype_in or stype_out must be instrument ID to build a symbol map"
            .to_owned(),
    })
}

fn parse_instrument_id(symbol: &str) -> crate::Result<u32> {
    symbol
        .parse()
        .map_err(|_| Error::conversion::<u32>(symbol.to_owned()))
}

/// Finds the mapping interval whose half-open `[start_date, end_date)`
/// window contains `date`.
fn interval_containing(intervals: &[MappingInterval], date: time::Date) -> Option<&MappingInterval> {
    intervals
        .iter()
        .find(|interval| date >= interval.start_date && date < interval.end_date)
}

/// Intervals that resolved to a symbol. The legacy symbology format left
/// empty symbols for unresolved days.
fn resolved_intervals(
    mapping: &crate::SymbolMapping,
) -> impl Iterator<Item = &MappingInterval> {
    mapping
        .intervals
        .iter()
        .filter(|interval| !interval.symbol.is_empty())
}

fn check_in_query_window(metadata: &Metadata, date: time::Date) -> crate::Result<()> {
    let outside_range = Err(Error::BadArgument {
        param_name: "date".to_owned(),
        desc: "outside the metadata query window".to_owned(),
    });
    if date < metadata.start().date() {
        return outside_range;
    }
    // the end bound is an instant, so compare against the day's first
    // nanosecond to accept a final interval ending at midnight
    if let Some(end) = metadata.end() {
        if date.midnight().assume_utc() >= end {
            return outside_range;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use rstest::rstest;
    use time::macros::{date, datetime};

    use crate::{
        compat::SymbolMappingMsgV1, record::SymbolMappingMsg, MappingInterval, Metadata, Schema,
        SymbolMapping,
    };

    use super::*;

    fn metadata_w_mappings() -> Metadata {
        Metadata::builder()
            .dataset("XNAS.ITCH")
            .schema(Some(Schema::Trades))
            .stype_in(Some(SType::RawSymbol))
            .stype_out(SType::InstrumentId)
            .start(datetime!(2023-07-01 00:00 UTC).unix_timestamp_nanos() as u64)
            .end(NonZeroU64::new(
                datetime!(2023-08-01 00:00 UTC).unix_timestamp_nanos() as u64,
            ))
            .mappings(vec![
                SymbolMapping {
                    raw_symbol: "AAPL".to_owned(),
                    intervals: vec![MappingInterval {
                        start_date: date!(2023 - 07 - 01),
                        end_date: date!(2023 - 08 - 01),
                        symbol: "32".to_owned(),
                    }],
                },
                SymbolMapping {
                    raw_symbol: "TSLA".to_owned(),
                    intervals: vec![
                        MappingInterval {
                            start_date: date!(2023 - 07 - 01),
                            end_date: date!(2023 - 07 - 15),
                            symbol: "10221".to_owned(),
                        },
                        MappingInterval {
                            start_date: date!(2023 - 07 - 15),
                            end_date: date!(2023 - 08 - 01),
                            symbol: "10213".to_owned(),
                        },
                    ],
                },
                SymbolMapping {
                    raw_symbol: "PLTR".to_owned(),
                    // old symbology format symbol with an empty interval
                    intervals: vec![MappingInterval {
                        start_date: date!(2023 - 07 - 01),
                        end_date: date!(2023 - 08 - 01),
                        symbol: String::new(),
                    }],
                },
            ])
            .build()
    }

    fn inverse_metadata() -> Metadata {
        let mut metadata = metadata_w_mappings();
        metadata.stype_in = Some(SType::InstrumentId);
        metadata.stype_out = SType::RawSymbol;
        metadata.mappings = vec![SymbolMapping {
            raw_symbol: "32".to_owned(),
            intervals: vec![MappingInterval {
                start_date: date!(2023 - 07 - 01),
                end_date: date!(2023 - 08 - 01),
                symbol: "AAPL".to_owned(),
            }],
        }];
        metadata
    }

    #[test]
    fn test_pit_from_metadata() {
        let target =
            PitSymbolMap::from_metadata(&metadata_w_mappings(), date!(2023 - 07 - 20)).unwrap();
        assert_eq!(target[32], "AAPL");
        assert_eq!(target[10213], "TSLA");
        // the reverse direction is kept as well
        assert_eq!(target.get_instrument_id("AAPL"), Some(32));
        assert_eq!(target.get_instrument_id("TSLA"), Some(10213));
        // interval not containing the date
        assert!(target.get(10221).is_none());
        // empty symbols are skipped
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_pit_deterministic() {
        let metadata = metadata_w_mappings();
        let a = PitSymbolMap::from_metadata(&metadata, date!(2023 - 07 - 10)).unwrap();
        let b = PitSymbolMap::from_metadata(&metadata, date!(2023 - 07 - 10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pit_inverse() {
        let target =
            PitSymbolMap::from_metadata(&inverse_metadata(), date!(2023 - 07 - 20)).unwrap();
        assert_eq!(target[32], "AAPL");
        assert_eq!(target.get_instrument_id("AAPL"), Some(32));
    }

    #[rstest]
    #[case::before(date!(2023 - 06 - 30))]
    #[case::at_end(date!(2023 - 08 - 01))]
    #[case::after(date!(2023 - 08 - 02))]
    fn test_pit_date_outside_range(#[case] date: time::Date) {
        let res = PitSymbolMap::from_metadata(&metadata_w_mappings(), date);
        assert!(matches!(res, Err(Error::BadArgument { param_name, .. }) if param_name == "date"));
    }

    #[test]
    fn test_pit_wrong_stypes() {
        let mut metadata = metadata_w_mappings();
        metadata.stype_in = Some(SType::RawSymbol);
        metadata.stype_out = SType::Continuous;
        let res = PitSymbolMap::from_metadata(&metadata, date!(2023 - 07 - 20));
        assert!(matches!(res, Err(Error::BadArgument { .. })));
    }

    #[test]
    fn test_pit_malformed_numeric_symbol() {
        let mut metadata = metadata_w_mappings();
        metadata.mappings[0].intervals[0].symbol = "not-a-number".to_owned();
        let res = PitSymbolMap::from_metadata(&metadata, date!(2023 - 07 - 20));
        assert!(matches!(res, Err(Error::Conversion { .. })));
    }

    #[test]
    fn test_pit_on_symbol_mapping() {
        let mut target = PitSymbolMap::new();
        let rec = SymbolMappingMsg::new(
            5482,
            0,
            SType::RawSymbol,
            "ESM4",
            SType::RawSymbol,
            "ESM4",
            0,
            0,
        )
        .unwrap();
        target.on_symbol_mapping(&rec).unwrap();
        assert_eq!(target[5482], "ESM4");
        assert_eq!(target.get_instrument_id("ESM4"), Some(5482));
    }

    #[test]
    fn test_pit_on_record_v1_sized() {
        let mut target = PitSymbolMap::new();
        let rec = SymbolMappingMsgV1::new(10, 0, "AAPL", "AAPL", 0, 0).unwrap();
        target
            .on_record(unsafe { RecordRef::new(rec.as_ref()) })
            .unwrap();
        assert_eq!(target[10], "AAPL");
    }

    #[test]
    fn test_ts_from_metadata_covers_all_days() {
        let target = TsSymbolMap::from_metadata(&metadata_w_mappings()).unwrap();
        assert_eq!(target.get(date!(2023 - 07 - 01), 32).unwrap(), "AAPL");
        assert_eq!(target.get(date!(2023 - 07 - 31), 32).unwrap(), "AAPL");
        assert_eq!(target.get(date!(2023 - 07 - 14), 10221).unwrap(), "TSLA");
        assert_eq!(target.get(date!(2023 - 07 - 16), 10213).unwrap(), "TSLA");
    }

    #[test]
    fn test_ts_insert_includes_end_date() {
        // the interval is documented half-open but the end day is written
        let mut target = TsSymbolMap::new();
        target
            .insert(
                1,
                date!(2023 - 07 - 01),
                date!(2023 - 07 - 03),
                Arc::new("ABC".to_owned()),
            )
            .unwrap();
        assert_eq!(target.len(), 3);
        assert!(target.get(date!(2023 - 07 - 03), 1).is_some());
        assert!(target.get(date!(2023 - 07 - 04), 1).is_none());
    }

    #[test]
    fn test_ts_insert_single_day() {
        let mut target = TsSymbolMap::new();
        target
            .insert(
                1,
                date!(2023 - 07 - 01),
                date!(2023 - 07 - 01),
                Arc::new("ABC".to_owned()),
            )
            .unwrap();
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_ts_insert_start_after_end() {
        let mut target = TsSymbolMap::new();
        let res = target.insert(
            1,
            date!(2023 - 07 - 02),
            date!(2023 - 07 - 01),
            Arc::new("ABC".to_owned()),
        );
        assert!(matches!(res, Err(Error::BadArgument { .. })));
    }

    #[test]
    fn test_ts_inverse_matches_forward() {
        let forward = TsSymbolMap::from_metadata(&metadata_w_mappings()).unwrap();
        let inverse = TsSymbolMap::from_metadata(&inverse_metadata()).unwrap();
        assert_eq!(
            forward.get(date!(2023 - 07 - 10), 32),
            inverse.get(date!(2023 - 07 - 10), 32)
        );
    }

    #[test]
    fn test_get_for_rec() {
        let map = PitSymbolMap::from_metadata(&metadata_w_mappings(), date!(2023 - 07 - 20)).unwrap();
        let mut rec = crate::record::TradeMsg::default();
        rec.hd.instrument_id = 32;
        assert_eq!(map.get_for_rec(&rec).unwrap(), "AAPL");
    }
}
