//! Enums used in DBN records, metadata, and the live gateway protocol.

use std::fmt::{self, Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A side of the market: the side of a resting order, or of the aggressor
/// for trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Side {
    /// A sell order, or a sell aggressor in a trade.
    Ask = b'A',
    /// A buy order, or a buy aggressor in a trade.
    Bid = b'B',
    /// The source didn't specify a side.
    #[default]
    None = b'N',
}

impl From<Side> for char {
    fn from(side: Side) -> Self {
        u8::from(side) as char
    }
}

/// An order event or book operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Action {
    /// An order's price and/or size changed.
    Modify = b'M',
    /// An aggressing order traded; the book is unaffected.
    Trade = b'T',
    /// A resting order filled; the book is unaffected.
    Fill = b'F',
    /// An order was cancelled, fully or in part.
    Cancel = b'C',
    /// An order joined the book.
    Add = b'A',
    /// The instrument's book was wiped.
    Clear = b'R',
    /// Nothing happened to the book; `flags` or other fields may still
    /// carry information.
    #[default]
    None = b'N',
}

impl From<Action> for char {
    fn from(action: Action) -> Self {
        u8::from(action) as char
    }
}

/// The category an instrument belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InstrumentClass {
    /// A bond.
    Bond = b'B',
    /// A call option.
    Call = b'C',
    /// A future.
    Future = b'F',
    /// A stock.
    Stock = b'K',
    /// A spread mixing instrument classes.
    MixedSpread = b'M',
    /// A put option.
    Put = b'P',
    /// A spread of futures.
    FutureSpread = b'S',
    /// A spread of options.
    OptionSpread = b'T',
    /// A foreign exchange spot.
    FxSpot = b'X',
}

impl From<InstrumentClass> for char {
    fn from(class: InstrumentClass) -> Self {
        u8::from(class) as char
    }
}

/// What an [`InstrumentDefMsg`](crate::record::InstrumentDefMsg) does to the
/// instrument's definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SecurityUpdateAction {
    /// A brand-new definition.
    Add = b'A',
    /// A change to an existing definition.
    Modify = b'M',
    /// A removal of a definition.
    Delete = b'D',
}

/// Whether an instrument is user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum UserDefinedInstrument {
    /// Not user-defined.
    #[default]
    No = b'N',
    /// User-defined.
    Yes = b'Y',
}

/// A symbology type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SType {
    /// The opaque numeric ID assigned to each instrument.
    InstrumentId = 0,
    /// The symbols as the publisher itself assigns them.
    RawSymbol = 1,
    /// A symbology where one symbol follows different instruments over
    /// time, e.g. the front-month future.
    Continuous = 3,
    /// A symbology naming a whole group of instruments through one parent
    /// symbol, e.g. ES.FUT for every ES future.
    Parent = 4,
    /// US equities under NASDAQ Integrated suffix conventions.
    NasdaqSymbol = 5,
    /// US equities under CMS suffix conventions.
    CmsSymbol = 6,
}

impl std::str::FromStr for SType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the first two have aliases from before the symbology rename
        match s {
            "instrument_id" | "product_id" => Ok(SType::InstrumentId),
            "raw_symbol" | "native" => Ok(SType::RawSymbol),
            "continuous" => Ok(SType::Continuous),
            "parent" => Ok(SType::Parent),
            "nasdaq_symbol" | "nasdaq" => Ok(SType::NasdaqSymbol),
            "cms_symbol" | "cms" => Ok(SType::CmsSymbol),
            _ => Err(crate::Error::conversion::<Self>(s.to_owned())),
        }
    }
}

impl SType {
    /// The symbology type's `str` representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SType::InstrumentId => "instrument_id",
            SType::RawSymbol => "raw_symbol",
            SType::Continuous => "continuous",
            SType::Parent => "parent",
            SType::NasdaqSymbol => "nasdaq_symbol",
            SType::CmsSymbol => "cms_symbol",
        }
    }
}

impl AsRef<str> for SType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for SType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub use rtype::RType;

/// Record type codes: the possible values of
/// [`RecordHeader::rtype`][crate::record::RecordHeader::rtype].
pub mod rtype {
    use num_enum::TryFromPrimitive;

    use super::Schema;

    /// A record type. Identifies which struct a record decodes into; see
    /// [`HasRType`](crate::record::HasRType).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
    #[repr(u8)]
    pub enum RType {
        /// Market by price, depth 0: the [`Trades`](super::Schema::Trades)
        /// schema.
        Mbp0 = 0,
        /// Market by price, depth 1: the [`Mbp1`](super::Schema::Mbp1) and
        /// [`Tbbo`](super::Schema::Tbbo) schemas.
        Mbp1 = 0x01,
        /// Market by price, depth 10.
        Mbp10 = 0x0A,
        /// A candle at an unspecified cadence. Generated by no current
        /// schema.
        OhlcvDeprecated = 0x11,
        /// An exchange status record.
        Status = 0x12,
        /// An instrument definition.
        InstrumentDef = 0x13,
        /// An order imbalance record.
        Imbalance = 0x14,
        /// An error from the gateway.
        Error = 0x15,
        /// A symbol mapping record.
        SymbolMapping = 0x16,
        /// A non-error gateway message, heartbeats included.
        System = 0x17,
        /// A statistic from the publisher (not computed by Databento).
        Statistics = 0x18,
        /// A one-second candle.
        Ohlcv1S = 0x20,
        /// A one-minute candle.
        Ohlcv1M = 0x21,
        /// An hourly candle.
        Ohlcv1H = 0x22,
        /// A daily candle cut on the UTC date boundary.
        Ohlcv1D = 0x23,
        /// A daily candle cut at the end of the trading session.
        OhlcvEod = 0x24,
        /// A market-by-order record.
        Mbo = 0xA0,
        /// A consolidated best bid and offer record.
        Cmbp1 = 0xB1,
        /// A best bid and offer record sampled each second.
        Bbo1S = 0xC3,
        /// A best bid and offer record sampled each minute.
        Bbo1M = 0xC4,
    }

    /// Code for market by price, depth 0 (trades).
    pub const MBP_0: u8 = RType::Mbp0 as u8;
    /// Code for market by price, depth 1.
    pub const MBP_1: u8 = RType::Mbp1 as u8;
    /// Code for market by price, depth 10.
    pub const MBP_10: u8 = RType::Mbp10 as u8;
    /// Code for the legacy cadence-free candle.
    pub const OHLCV_DEPRECATED: u8 = RType::OhlcvDeprecated as u8;
    /// Code for exchange status.
    pub const STATUS: u8 = RType::Status as u8;
    /// Code for instrument definitions.
    pub const INSTRUMENT_DEF: u8 = RType::InstrumentDef as u8;
    /// Code for order imbalances.
    pub const IMBALANCE: u8 = RType::Imbalance as u8;
    /// Code for gateway errors.
    pub const ERROR: u8 = RType::Error as u8;
    /// Code for symbol mappings.
    pub const SYMBOL_MAPPING: u8 = RType::SymbolMapping as u8;
    /// Code for non-error gateway messages.
    pub const SYSTEM: u8 = RType::System as u8;
    /// Code for publisher statistics.
    pub const STATISTICS: u8 = RType::Statistics as u8;
    /// Code for one-second candles.
    pub const OHLCV_1S: u8 = RType::Ohlcv1S as u8;
    /// Code for one-minute candles.
    pub const OHLCV_1M: u8 = RType::Ohlcv1M as u8;
    /// Code for hourly candles.
    pub const OHLCV_1H: u8 = RType::Ohlcv1H as u8;
    /// Code for daily candles cut on the UTC date.
    pub const OHLCV_1D: u8 = RType::Ohlcv1D as u8;
    /// Code for daily candles cut at session end.
    pub const OHLCV_EOD: u8 = RType::OhlcvEod as u8;
    /// Code for market-by-order records.
    pub const MBO: u8 = RType::Mbo as u8;
    /// Code for consolidated best bid and offer records.
    pub const CMBP_1: u8 = RType::Cmbp1 as u8;
    /// Code for second-sampled best bid and offer records.
    pub const BBO_1S: u8 = RType::Bbo1S as u8;
    /// Code for minute-sampled best bid and offer records.
    pub const BBO_1M: u8 = RType::Bbo1M as u8;

    /// Returns `true` if `rtype` is one of the open, high, low, close,
    /// volume variants.
    pub const fn is_ohlcv(rtype: u8) -> bool {
        matches!(
            rtype,
            OHLCV_1S | OHLCV_1M | OHLCV_1H | OHLCV_1D | OHLCV_EOD | OHLCV_DEPRECATED
        )
    }

    /// Returns `true` if the two record type codes decode with the same
    /// record struct. That's the case only when they're equal, or when both
    /// are candles, which share one layout across cadences.
    pub const fn are_compatible(lhs: u8, rhs: u8) -> bool {
        lhs == rhs || (is_ohlcv(lhs) && is_ohlcv(rhs))
    }

    /// The schema that generates records of type `rtype`, when exactly one
    /// does. [`OHLCV_DEPRECATED`] maps to several schemas and so returns
    /// `None`.
    pub const fn try_into_schema(rtype: u8) -> Option<Schema> {
        match rtype {
            MBP_0 => Some(Schema::Trades),
            MBP_1 => Some(Schema::Mbp1),
            MBP_10 => Some(Schema::Mbp10),
            STATUS => Some(Schema::Status),
            INSTRUMENT_DEF => Some(Schema::Definition),
            IMBALANCE => Some(Schema::Imbalance),
            STATISTICS => Some(Schema::Statistics),
            OHLCV_1S => Some(Schema::Ohlcv1S),
            OHLCV_1M => Some(Schema::Ohlcv1M),
            OHLCV_1H => Some(Schema::Ohlcv1H),
            OHLCV_1D => Some(Schema::Ohlcv1D),
            OHLCV_EOD => Some(Schema::OhlcvEod),
            MBO => Some(Schema::Mbo),
            CMBP_1 => Some(Schema::Cmbp1),
            BBO_1S => Some(Schema::Bbo1S),
            BBO_1M => Some(Schema::Bbo1M),
            _ => None,
        }
    }

    impl From<Schema> for RType {
        fn from(schema: Schema) -> Self {
            match schema {
                Schema::Mbo => RType::Mbo,
                Schema::Mbp1 | Schema::Tbbo => RType::Mbp1,
                Schema::Mbp10 => RType::Mbp10,
                Schema::Trades => RType::Mbp0,
                Schema::Ohlcv1S => RType::Ohlcv1S,
                Schema::Ohlcv1M => RType::Ohlcv1M,
                Schema::Ohlcv1H => RType::Ohlcv1H,
                Schema::Ohlcv1D => RType::Ohlcv1D,
                Schema::OhlcvEod => RType::OhlcvEod,
                Schema::Definition => RType::InstrumentDef,
                Schema::Statistics => RType::Statistics,
                Schema::Status => RType::Status,
                Schema::Imbalance => RType::Imbalance,
                Schema::Cmbp1 => RType::Cmbp1,
                Schema::Bbo1S => RType::Bbo1S,
                Schema::Bbo1M => RType::Bbo1M,
            }
        }
    }

    impl RType {
        /// Every record type, in code order.
        pub const ALL: [RType; 20] = [
            RType::Mbp0,
            RType::Mbp1,
            RType::Mbp10,
            RType::OhlcvDeprecated,
            RType::Status,
            RType::InstrumentDef,
            RType::Imbalance,
            RType::Error,
            RType::SymbolMapping,
            RType::System,
            RType::Statistics,
            RType::Ohlcv1S,
            RType::Ohlcv1M,
            RType::Ohlcv1H,
            RType::Ohlcv1D,
            RType::OhlcvEod,
            RType::Mbo,
            RType::Cmbp1,
            RType::Bbo1S,
            RType::Bbo1M,
        ];

        /// The record type's `str` representation.
        pub const fn as_str(&self) -> &'static str {
            match self {
                RType::Mbp0 => "mbp-0",
                RType::Mbp1 => "mbp-1",
                RType::Mbp10 => "mbp-10",
                RType::OhlcvDeprecated => "ohlcv-deprecated",
                RType::Ohlcv1S => "ohlcv-1s",
                RType::Ohlcv1M => "ohlcv-1m",
                RType::Ohlcv1H => "ohlcv-1h",
                RType::Ohlcv1D => "ohlcv-1d",
                RType::OhlcvEod => "ohlcv-eod",
                RType::Status => "status",
                RType::InstrumentDef => "instrument-def",
                RType::Imbalance => "imbalance",
                RType::Error => "error",
                RType::SymbolMapping => "symbol-mapping",
                RType::System => "system",
                RType::Statistics => "statistics",
                RType::Mbo => "mbo",
                RType::Cmbp1 => "cmbp-1",
                RType::Bbo1S => "bbo-1s",
                RType::Bbo1M => "bbo-1m",
            }
        }
    }

    impl std::str::FromStr for RType {
        type Err = crate::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::ALL
                .iter()
                .find(|rtype| rtype.as_str() == s)
                .copied()
                .ok_or_else(|| crate::Error::conversion::<Self>(s.to_owned()))
        }
    }

    impl std::fmt::Display for RType {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }
}

/// A record schema: the logical family of records a query produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Schema {
    /// Every order book event, order by order.
    Mbo = 0,
    /// Book updates at depth 1.
    Mbp1 = 1,
    /// Book updates at depth 10.
    Mbp10 = 2,
    /// Trades, each with the best bid and offer from just **before** its
    /// effect.
    Tbbo = 3,
    /// Trades.
    Trades = 4,
    /// One-second candles.
    Ohlcv1S = 5,
    /// One-minute candles.
    Ohlcv1M = 6,
    /// Hourly candles.
    Ohlcv1H = 7,
    /// Daily candles cut on the UTC date boundary.
    Ohlcv1D = 8,
    /// Instrument definitions.
    Definition = 9,
    /// Statistics published by the venues themselves.
    Statistics = 10,
    /// Trading status changes.
    Status = 11,
    /// Auction imbalance events.
    Imbalance = 12,
    /// Daily candles cut at the end of the trading session.
    OhlcvEod = 13,
    /// The consolidated best bid and offer.
    Cmbp1 = 14,
    /// The best bid and offer sampled each second, plus trades.
    Bbo1S = 18,
    /// The best bid and offer sampled each minute, plus trades.
    Bbo1M = 19,
}

impl Schema {
    /// Every schema, in code order.
    pub const ALL: [Schema; 17] = [
        Schema::Mbo,
        Schema::Mbp1,
        Schema::Mbp10,
        Schema::Tbbo,
        Schema::Trades,
        Schema::Ohlcv1S,
        Schema::Ohlcv1M,
        Schema::Ohlcv1H,
        Schema::Ohlcv1D,
        Schema::Definition,
        Schema::Statistics,
        Schema::Status,
        Schema::Imbalance,
        Schema::OhlcvEod,
        Schema::Cmbp1,
        Schema::Bbo1S,
        Schema::Bbo1M,
    ];

    /// The schema's `str` representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Schema::Mbo => "mbo",
            Schema::Mbp1 => "mbp-1",
            Schema::Mbp10 => "mbp-10",
            Schema::Tbbo => "tbbo",
            Schema::Trades => "trades",
            Schema::Ohlcv1S => "ohlcv-1s",
            Schema::Ohlcv1M => "ohlcv-1m",
            Schema::Ohlcv1H => "ohlcv-1h",
            Schema::Ohlcv1D => "ohlcv-1d",
            Schema::OhlcvEod => "ohlcv-eod",
            Schema::Definition => "definition",
            Schema::Statistics => "statistics",
            Schema::Status => "status",
            Schema::Imbalance => "imbalance",
            Schema::Cmbp1 => "cmbp-1",
            Schema::Bbo1S => "bbo-1s",
            Schema::Bbo1M => "bbo-1m",
        }
    }
}

impl std::str::FromStr for Schema {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|schema| schema.as_str() == s)
            .copied()
            .ok_or_else(|| crate::Error::conversion::<Self>(s.to_owned()))
    }
}

impl AsRef<str> for Schema {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format records can be encoded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Encoding {
    /// Databento Binary Encoding.
    Dbn = 0,
    /// Comma-separated values.
    Csv = 1,
    /// JavaScript object notation.
    Json = 2,
}

impl std::str::FromStr for Encoding {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "dbz" for the binary format's predecessor
            "dbn" | "dbz" => Ok(Encoding::Dbn),
            "csv" => Ok(Encoding::Csv),
            "json" => Ok(Encoding::Json),
            _ => Err(crate::Error::conversion::<Self>(s.to_owned())),
        }
    }
}

impl Encoding {
    /// The encoding's `str` representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Encoding::Dbn => "dbn",
            Encoding::Csv => "csv",
            Encoding::Json => "json",
        }
    }
}

impl AsRef<str> for Encoding {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compression format, or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Compression {
    /// Uncompressed.
    None = 0,
    /// Zstandard.
    ZStd = 1,
}

impl std::str::FromStr for Compression {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Compression::None),
            "zstd" => Ok(Compression::ZStd),
            _ => Err(crate::Error::conversion::<Self>(s.to_owned())),
        }
    }
}

impl Compression {
    /// The compression's `str` representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::ZStd => "zstd",
        }
    }
}

impl AsRef<str> for Compression {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statistic a [`StatMsg`](crate::record::StatMsg) carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[non_exhaustive]
#[repr(u16)]
pub enum StatType {
    /// The day's first trade price, in `price`.
    OpeningPrice = 1,
    /// The probable first trade price published pre-open, in `price` and
    /// `quantity`.
    IndicativeOpeningPrice = 2,
    /// The settlement price, in `price`; `ts_ref` holds the trading date it
    /// settles.
    SettlementPrice = 3,
    /// The session's lowest trade price, in `price`.
    TradingSessionLowPrice = 4,
    /// The session's highest trade price, in `price`.
    TradingSessionHighPrice = 5,
    /// Contracts cleared on the previous trading date, in `quantity`.
    ClearedVolume = 6,
    /// The session's lowest offer, in `price`.
    LowestOffer = 7,
    /// The session's highest bid, in `price`.
    HighestBid = 8,
    /// Outstanding contracts, in `quantity`; `ts_ref` holds the trading
    /// date.
    OpenInterest = 9,
    /// The volume-weighted average price of a fixing period, in `price`.
    FixingPrice = 10,
    /// The session's last trade price, in `price`.
    ClosePrice = 11,
    /// The price change since the previous session's close, in `price`.
    NetChange = 12,
    /// The session's volume-weighted average price, in `price`, with the
    /// traded volume in `quantity`.
    Vwap = 13,
}

/// What a [`StatMsg`](crate::record::StatMsg) does to the statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum StatUpdateAction {
    /// A new statistic.
    New = 1,
    /// A removal of a statistic.
    Delete = 2,
}

/// Constants for the bit flag record fields.
pub mod flags {
    /// The last record of the venue packet for its instrument.
    pub const LAST: u8 = 1 << 7;
    /// A top-of-book record rather than an individual order.
    pub const TOB: u8 = 1 << 6;
    /// Sourced from a replay, e.g. a snapshot server.
    pub const SNAPSHOT: u8 = 1 << 5;
    /// An aggregated price level rather than an individual order.
    pub const MBP: u8 = 1 << 4;
    /// `ts_recv` is inaccurate because of clock issues or reordering.
    pub const BAD_TS_RECV: u8 = 1 << 3;
    /// An unrecoverable gap was detected in the channel.
    pub const MAYBE_BAD_BOOK: u8 = 1 << 2;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[test]
    fn test_schema_str_round_trips_all() {
        for schema in Schema::ALL {
            assert_eq!(Schema::from_str(schema.as_str()).unwrap(), schema);
        }
    }

    #[test]
    fn test_rtype_str_round_trips_all() {
        for rtype in RType::ALL {
            assert_eq!(RType::from_str(rtype.as_str()).unwrap(), rtype);
        }
        assert!(RType::from_str("mbp-11").is_err());
    }

    #[rstest]
    #[case::instrument_id(SType::InstrumentId, "instrument_id")]
    #[case::raw_symbol(SType::RawSymbol, "raw_symbol")]
    #[case::continuous(SType::Continuous, "continuous")]
    fn test_stype_str_round_trip(#[case] stype: SType, #[case] exp: &str) {
        assert_eq!(stype.as_str(), exp);
        assert_eq!(SType::from_str(exp).unwrap(), stype);
    }

    #[test]
    fn test_stype_legacy_aliases() {
        assert_eq!(SType::from_str("native").unwrap(), SType::RawSymbol);
        assert_eq!(SType::from_str("product_id").unwrap(), SType::InstrumentId);
    }

    #[rstest]
    #[case::equal(rtype::MBO, rtype::MBO, true)]
    #[case::unequal(rtype::MBO, rtype::MBP_0, false)]
    #[case::candles(rtype::OHLCV_1S, rtype::OHLCV_1D, true)]
    #[case::candle_deprecated(rtype::OHLCV_DEPRECATED, rtype::OHLCV_EOD, true)]
    #[case::candle_vs_other(rtype::OHLCV_1S, rtype::STATISTICS, false)]
    fn test_rtype_compatibility(#[case] lhs: u8, #[case] rhs: u8, #[case] exp: bool) {
        assert_eq!(rtype::are_compatible(lhs, rhs), exp);
        assert_eq!(rtype::are_compatible(rhs, lhs), exp);
    }

    #[test]
    fn test_rtype_schema_round_trip() {
        for schema in Schema::ALL {
            let rtype = RType::from(schema);
            // Tbbo shares Mbp1's rtype, so it maps back to Mbp1
            let exp = if schema == Schema::Tbbo {
                Schema::Mbp1
            } else {
                schema
            };
            assert_eq!(rtype::try_into_schema(rtype as u8), Some(exp));
        }
    }

    #[test]
    fn test_encoding_str_round_trip() {
        for encoding in [Encoding::Dbn, Encoding::Csv, Encoding::Json] {
            assert_eq!(Encoding::from_str(encoding.as_str()).unwrap(), encoding);
        }
        assert_eq!(Encoding::from_str("dbz").unwrap(), Encoding::Dbn);
    }
}
