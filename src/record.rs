//! The market data record types carried by DBN streams and the traits tying
//! them together.

mod conv;
mod impl_default;
mod methods;

use std::{mem, os::raw::c_char};

use crate::{
    enums::rtype,
    macros::impl_record,
    publishers::Publisher,
    RType, SYMBOL_CSTR_LEN,
};
pub(crate) use conv::as_u8_slice;
pub use conv::{c_chars_to_str, record_from_bytes, str_to_c_chars, ts_to_dt};

/// The 16 bytes at the start of every record.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct RecordHeader {
    /// The record size in 32-bit words, header included.
    pub(crate) length: u8,
    /// The discriminator for the record's type; see [`rtype`] for the known
    /// codes and [`HasRType::has_rtype`] for checking whether a struct can
    /// decode a given code.
    pub rtype: u8,
    /// Identifies the venue and dataset this record came from.
    pub publisher_id: u16,
    /// The opaque numeric ID of the instrument.
    pub instrument_id: u32,
    /// When the matching engine received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_event: u64,
}

/// One level of an aggregated book.
#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct BidAskPair {
    /// The bid price.
    pub bid_px: i64,
    /// The ask price.
    pub ask_px: i64,
    /// The bid size.
    pub bid_sz: u32,
    /// The ask size.
    pub ask_sz: u32,
    /// The bid order count.
    pub bid_ct: u32,
    /// The ask order count.
    pub ask_ct: u32,
}

/// One level of a book consolidated from several venues.
#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct ConsolidatedBidAskPair {
    /// The bid price.
    pub bid_px: i64,
    /// The ask price.
    pub ask_px: i64,
    /// The bid size.
    pub bid_sz: u32,
    /// The ask size.
    pub ask_sz: u32,
    /// The publisher with the best bid.
    pub bid_pb: u16,
    #[doc(hidden)]
    pub _reserved1: [u8; 2],
    /// The publisher with the best ask.
    pub ask_pb: u16,
    #[doc(hidden)]
    pub _reserved2: [u8; 2],
}

/// An order book event in the market-by-order feed. The record of the
/// [`Mbo`](crate::enums::Schema::Mbo) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct MboMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The venue-assigned order ID.
    pub order_id: u64,
    /// The order price as a signed fixed-precision integer with nine implied
    /// decimal places (1 unit = 1e-9).
    pub price: i64,
    /// The quantity of the order.
    pub size: u32,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    /// The venue's channel ID.
    pub channel_id: u8,
    /// What happened to the order: **A**dd, **C**ancel, **M**odify,
    /// clea**R**, **T**rade, or **F**ill.
    pub action: c_char,
    /// **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    /// The venue-assigned sequence number.
    pub sequence: u32,
}

/// A single trade: market by price at depth 0. The record of the
/// [`Trades`](crate::enums::Schema::Trades) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct TradeMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The trade price as a signed fixed-precision integer with nine implied
    /// decimal places (1 unit = 1e-9).
    pub price: i64,
    /// The traded quantity.
    pub size: u32,
    /// Always **T**rade in this schema.
    pub action: c_char,
    /// The aggressor's side: **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    /// The book depth the trade occurred at.
    pub depth: u8,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    /// The venue-assigned sequence number.
    pub sequence: u32,
}

/// A top-of-book update: market by price at depth 1. The record of the
/// [`Mbp1`](crate::enums::Schema::Mbp1) and
/// [`Tbbo`](crate::enums::Schema::Tbbo) schemas.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct Mbp1Msg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The event price as a signed fixed-precision integer with nine implied
    /// decimal places (1 unit = 1e-9).
    pub price: i64,
    /// The event quantity.
    pub size: u32,
    /// One of **A**dd, **C**ancel, **M**odify, clea**R**, **T**rade.
    pub action: c_char,
    /// **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    /// The book depth of the change.
    pub depth: u8,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    /// The venue-assigned sequence number.
    pub sequence: u32,
    /// The best bid and offer after the event.
    pub levels: [BidAskPair; 1],
}

/// What the [`Tbbo`](crate::enums::Schema::Tbbo) schema calls its records,
/// which share [`Mbp1Msg`]'s layout.
pub type TbboMsg = Mbp1Msg;

/// A book update with the ten best levels: market by price at depth 10. The
/// record of the [`Mbp10`](crate::enums::Schema::Mbp10) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct Mbp10Msg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The event price as a signed fixed-precision integer with nine implied
    /// decimal places (1 unit = 1e-9).
    pub price: i64,
    /// The event quantity.
    pub size: u32,
    /// One of **A**dd, **C**ancel, **M**odify, clea**R**, **T**rade.
    pub action: c_char,
    /// **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    /// The book depth of the change.
    pub depth: u8,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    /// The venue-assigned sequence number.
    pub sequence: u32,
    /// The ten best levels after the event.
    pub levels: [BidAskPair; 10],
}

/// A candle. The record of the OHLCV family of schemas at every cadence.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct OhlcvMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The bar's opening price.
    pub open: i64,
    /// The bar's highest price.
    pub high: i64,
    /// The bar's lowest price.
    pub low: i64,
    /// The bar's closing price.
    pub close: i64,
    /// The volume traded over the bar.
    pub volume: u64,
}

/// A trading status change. The record of the
/// [`Status`](crate::enums::Schema::Status) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct StatusMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// What kind of status change occurred.
    pub action: u16,
    /// Why the status changed.
    pub reason: u16,
    /// Further detail about the change and its effect on trading.
    pub trading_event: u16,
    /// **Y**es, **N**o, or **~** (unavailable): whether trading is halted.
    pub is_trading: c_char,
    /// **Y**es, **N**o, or **~** (unavailable): whether quoting is halted.
    pub is_quoting: c_char,
    /// **Y**es, **N**o, or **~** (unavailable): whether short selling is
    /// restricted.
    pub is_short_sell_restricted: c_char,
    #[doc(hidden)]
    pub _reserved: [u8; 7],
}

/// The definition of an instrument. The record of the
/// [`Definition`](crate::enums::Schema::Definition) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct InstrumentDefMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The minimum price increment (tick) in fixed-precision units of 1e-9.
    pub min_price_increment: i64,
    /// Multiplier from the venue's display price to the conventional price.
    pub display_factor: i64,
    /// The last eligible trade time as nanoseconds since the UNIX epoch;
    /// [`crate::UNDEF_TIMESTAMP`] when the instrument doesn't expire.
    pub expiration: u64,
    /// When the instrument activated, as nanoseconds since the UNIX epoch;
    /// [`crate::UNDEF_TIMESTAMP`] when not applicable.
    pub activation: u64,
    /// The day's upper price band in fixed-precision units of 1e-9.
    pub high_limit_price: i64,
    /// The day's lower price band in fixed-precision units of 1e-9.
    pub low_limit_price: i64,
    /// The price-banding differential in fixed-precision units of 1e-9.
    pub max_price_variation: i64,
    /// The settlement price for `trading_reference_date`.
    pub trading_reference_price: i64,
    /// The contract size, interpreted together with `unit_of_measure`.
    pub unit_of_measure_qty: i64,
    /// Venue field under development, in fixed-precision units of 1e-9.
    pub min_price_increment_amount: i64,
    /// The price ratio used in spread and leg pricing, in fixed-precision
    /// units of 1e-9.
    pub price_ratio: i64,
    /// The option strike in fixed-precision units of 1e-9.
    pub strike_price: i64,
    /// A bitmap of eligibility attributes.
    pub inst_attrib_value: i32,
    /// The `instrument_id` of the first underlying.
    pub underlying_id: u32,
    /// The publisher's own ID for the instrument; may match
    /// `instrument_id`.
    pub raw_instrument_id: u32,
    /// The implied book depth of the feed.
    pub market_depth_implied: i32,
    /// The outright book depth of the feed.
    pub market_depth: i32,
    /// The instrument's market segment.
    pub market_segment_id: u32,
    /// The maximum tradable volume.
    pub max_trade_vol: u32,
    /// The minimum order entry quantity.
    pub min_lot_size: i32,
    /// The minimum block-trade quantity.
    pub min_lot_size_block: i32,
    /// The round-lot quantity; multiples are also round lots.
    pub min_lot_size_round_lot: i32,
    /// The minimum tradable volume.
    pub min_trade_vol: u32,
    /// Deliverables per instrument (peak days).
    pub contract_multiplier: i32,
    /// Daily decay quantity once `decay_start_date` is reached.
    pub decay_quantity: i32,
    /// The fixed contract value.
    pub original_contract_size: i32,
    /// The trading session date for `trading_reference_price`, in days since
    /// the UNIX epoch.
    pub trading_reference_date: u16,
    /// The venue's channel ID.
    pub appl_id: i16,
    /// The maturity year in the symbol.
    pub maturity_year: u16,
    /// When the contract starts to decay.
    pub decay_start_date: u16,
    /// A zero-based channel ID assigned by Databento.
    pub channel_id: u16,
    /// The price currency.
    pub currency: [c_char; 4],
    /// The settlement currency, when it differs from `currency`.
    pub settl_currency: [c_char; 4],
    /// The spread's strategy type.
    pub secsubtype: [c_char; 6],
    /// The publisher's symbol for the instrument.
    pub raw_symbol: [c_char; SYMBOL_CSTR_LEN],
    /// The security group code.
    pub group: [c_char; 21],
    /// The identifying exchange.
    pub exchange: [c_char; 5],
    /// The underlying asset (product code).
    pub asset: [c_char; 7],
    /// The ISO categorization code.
    pub cfi: [c_char; 7],
    /// The security type, e.g. FUT.
    pub security_type: [c_char; 7],
    /// The unit for `original_contract_size`, e.g. USD or LBS.
    pub unit_of_measure: [c_char; 31],
    /// The symbol of the first underlying.
    pub underlying: [c_char; 21],
    /// The currency of `strike_price`.
    pub strike_price_currency: [c_char; 4],
    /// The instrument's classification.
    pub instrument_class: c_char,
    /// The venue's matching algorithm, typically **F**IFO.
    pub match_algorithm: c_char,
    /// The current trading state.
    pub md_security_trading_status: u8,
    /// The main fraction's price denominator.
    pub main_fraction: u8,
    /// Digits shown right of the tick mark for fractional prices.
    pub price_display_format: u8,
    /// Settlement price type indicators, as a bitmap.
    pub settl_price_type: u8,
    /// The sub fraction's price denominator.
    pub sub_fraction: u8,
    /// The instrument's product complex.
    pub underlying_product: u8,
    /// Whether this definition **A**dds, **M**odifies, or **D**eletes.
    pub security_update_action: c_char,
    /// The maturity month in the symbol.
    pub maturity_month: u8,
    /// The maturity day in the symbol, or 0.
    pub maturity_day: u8,
    /// The maturity week in the symbol, or 0.
    pub maturity_week: u8,
    /// **Y**es or **N**o: whether the instrument is user-defined.
    pub user_defined_instrument: c_char,
    /// How to read `contract_multiplier`: `1` hours, `2` days.
    pub contract_multiplier_unit: i8,
    /// The electricity delivery schedule.
    pub flow_schedule_type: i8,
    /// The spread's tick rule.
    pub tick_rule: u8,
    #[doc(hidden)]
    pub _reserved: [u8; 10],
}

/// An auction imbalance update.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct ImbalanceMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The reference price for the imbalance shares, as a signed
    /// fixed-precision integer with nine implied decimal places.
    pub ref_price: i64,
    /// Unused; set aside for the future.
    pub auction_time: u64,
    /// The hypothetical clearing price for cross and continuous orders
    /// together.
    pub cont_book_clr_price: i64,
    /// The hypothetical clearing price for cross orders alone.
    pub auct_interest_clr_price: i64,
    /// Unused; set aside for the future.
    pub ssr_filling_price: i64,
    /// Unused; set aside for the future.
    pub ind_match_price: i64,
    /// Unused; set aside for the future.
    pub upper_collar: i64,
    /// Unused; set aside for the future.
    pub lower_collar: i64,
    /// Shares eligible to match at `ref_price`.
    pub paired_qty: u32,
    /// Shares unpaired at `ref_price`.
    pub total_imbalance_qty: u32,
    /// Unused; set aside for the future.
    pub market_imbalance_qty: u32,
    /// Unused; set aside for the future.
    pub unpaired_qty: u32,
    /// The venue's auction type code.
    pub auction_type: c_char,
    /// The side of `total_imbalance_qty`: **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// Unused; set aside for the future.
    pub auction_status: u8,
    /// Unused; set aside for the future.
    pub freeze_status: u8,
    /// Unused; set aside for the future.
    pub num_extensions: u8,
    /// Unused; set aside for the future.
    pub unpaired_side: c_char,
    /// A venue-specific code; for Nasdaq, the raw Price Variation Indicator.
    pub significant_imbalance: c_char,
    #[doc(hidden)]
    pub _reserved: [u8; 1],
}

/// A publisher statistic. Which statistic is in
/// [`stat_type`](Self::stat_type).
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct StatMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The statistic's reference timestamp as a count of nanoseconds since
    /// the UNIX epoch; [`crate::UNDEF_TIMESTAMP`] when unused.
    pub ts_ref: u64,
    /// The value for price statistics, fixed-precision with nine implied
    /// decimal places; [`crate::UNDEF_PRICE`] when unused.
    pub price: i64,
    /// The value for quantity statistics;
    /// [`crate::UNDEF_STAT_QUANTITY`] when unused.
    pub quantity: i32,
    /// The venue-assigned sequence number.
    pub sequence: u32,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    /// Which statistic this is; see [`StatType`](crate::enums::StatType).
    pub stat_type: u16,
    /// The venue's channel ID.
    pub channel_id: u16,
    /// 1 for a new statistic, 2 for a deletion (only some stat types
    /// delete).
    pub update_action: u8,
    /// Extra flags for certain stat types.
    pub stat_flags: u8,
    #[doc(hidden)]
    pub _reserved: [u8; 6],
}

/// An error the gateway reports to its client.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct ErrorMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The error text.
    pub err: [c_char; 302],
    /// The error code. Unused in DBN version 2.
    pub code: u8,
    /// Non-zero on the last of a group of errors sent together.
    pub is_last: u8,
}

/// A mapping between a symbol of one [`SType`](crate::enums::SType) and a
/// symbol of another, sent over a live session.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct SymbolMappingMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The symbology type of `stype_in_symbol`.
    pub stype_in: u8,
    /// The input symbol.
    pub stype_in_symbol: [c_char; SYMBOL_CSTR_LEN],
    /// The symbology type of `stype_out_symbol`.
    pub stype_out: u8,
    /// The output symbol.
    pub stype_out_symbol: [c_char; SYMBOL_CSTR_LEN],
    /// Where the mapping interval begins, as nanoseconds since the UNIX
    /// epoch.
    pub start_ts: u64,
    /// Where the mapping interval ends, as nanoseconds since the UNIX epoch.
    pub end_ts: u64,
}

/// A non-error gateway message, heartbeats included.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct SystemMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The message text.
    pub msg: [c_char; 303],
    /// The kind of system message. Unused in DBN version 2.
    pub code: u8,
}

/// A consolidated top-of-book update. The record of the
/// [`Cmbp1`](crate::enums::Schema::Cmbp1) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct Cmbp1Msg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The event price as a signed fixed-precision integer with nine implied
    /// decimal places (1 unit = 1e-9).
    pub price: i64,
    /// The event quantity.
    pub size: u32,
    /// One of **A**dd, **C**ancel, **M**odify, clea**R**, **T**rade.
    pub action: c_char,
    /// **A**sk, **B**id, or **N**one.
    pub side: c_char,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    #[doc(hidden)]
    pub _reserved1: [u8; 1],
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// `ts_recv` minus the exchange send time, capped at 2 seconds.
    pub ts_in_delta: i32,
    #[doc(hidden)]
    pub _reserved2: [u8; 4],
    /// The consolidated best bid and offer.
    pub levels: [ConsolidatedBidAskPair; 1],
}

/// A subsampled top-of-book update. The record of the
/// [`Bbo1S`](crate::enums::Schema::Bbo1S) and
/// [`Bbo1M`](crate::enums::Schema::Bbo1M) schemas.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct BboMsg {
    /// The shared header.
    pub hd: RecordHeader,
    /// The last trade price in the interval, fixed-precision with nine
    /// implied decimal places.
    pub price: i64,
    /// The last trade quantity in the interval.
    pub size: u32,
    #[doc(hidden)]
    pub _reserved1: [u8; 1],
    /// The side that initiated the last trade: **A**sk, **B**id, or
    /// **N**one.
    pub side: c_char,
    /// Bit flags; see [`flags`](crate::enums::flags).
    pub flags: u8,
    #[doc(hidden)]
    pub _reserved2: [u8; 1],
    /// The end of the sampling interval at the capture server, as
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    #[doc(hidden)]
    pub _reserved3: [u8; 4],
    /// The sequence number of the interval's last update.
    pub sequence: u32,
    /// The best bid and offer at the sample point.
    pub levels: [BidAskPair; 1],
}

/// The common interface of every type that starts with a [`RecordHeader`];
/// `rtype` in the header discriminates between them.
pub trait Record: AsRef<[u8]> {
    /// Borrows the header at the start of the record.
    fn header(&self) -> &RecordHeader;

    /// The record's total size in bytes.
    fn record_size(&self) -> usize {
        self.header().record_size()
    }

    /// Converts the header's raw rtype into [`RType`] for exhaustive
    /// matching.
    ///
    /// # Errors
    /// This function returns an error for rtype codes without a known
    /// [`RType`].
    fn rtype(&self) -> crate::Result<RType> {
        self.header().rtype()
    }

    /// Converts the header's raw publisher ID into [`Publisher`] for
    /// exhaustive matching.
    ///
    /// # Errors
    /// This function returns an error for IDs without a known
    /// [`Publisher`].
    fn publisher(&self) -> crate::Result<Publisher> {
        self.header().publisher()
    }

    /// The record's raw primary timestamp: the one to sort by and to index
    /// symbology with.
    fn raw_index_ts(&self) -> u64 {
        self.header().ts_event
    }

    /// The primary timestamp as a datetime, or `None` when it holds the
    /// null sentinel.
    fn index_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.raw_index_ts())
    }

    /// The date component of [`index_ts()`](Self::index_ts).
    fn index_date(&self) -> Option<time::Date> {
        self.index_ts().map(|dt| dt.date())
    }
}

/// Mutable access to the header of a record type.
pub trait RecordMut {
    /// Borrows the header at the start of the record mutably.
    fn header_mut(&mut self) -> &mut RecordHeader;
}

/// Implemented by record types that know which rtype codes they can decode.
pub trait HasRType: Record + RecordMut {
    /// Returns `true` if this type can decode records tagged `rtype`.
    fn has_rtype(rtype: u8) -> bool;
}

impl_record!(MboMsg, rtype::MBO);
impl_record!(TradeMsg, rtype::MBP_0);
impl_record!(Mbp1Msg, rtype::MBP_1);
impl_record!(Mbp10Msg, rtype::MBP_10);
impl_record!(
    OhlcvMsg,
    rtype::OHLCV_1S,
    rtype::OHLCV_1M,
    rtype::OHLCV_1H,
    rtype::OHLCV_1D,
    rtype::OHLCV_EOD,
    rtype::OHLCV_DEPRECATED,
);
impl_record!(StatusMsg, rtype::STATUS);
impl_record!(InstrumentDefMsg, rtype::INSTRUMENT_DEF);
impl_record!(ImbalanceMsg, rtype::IMBALANCE);
impl_record!(StatMsg, rtype::STATISTICS);
impl_record!(ErrorMsg, rtype::ERROR);
impl_record!(SymbolMappingMsg, rtype::SYMBOL_MAPPING);
impl_record!(SystemMsg, rtype::SYSTEM);
impl_record!(Cmbp1Msg, rtype::CMBP_1);
impl_record!(BboMsg, rtype::BBO_1S, rtype::BBO_1M);

/// A record plus the live gateway's send timestamp, appended when the
/// session was opened with `ts_out`.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithTsOut<T: HasRType> {
    /// The wrapped record.
    pub rec: T,
    /// When the gateway sent the record, as nanoseconds since the UNIX
    /// epoch.
    pub ts_out: u64,
}

impl<T: HasRType> WithTsOut<T> {
    /// Wraps `rec`, patching the header's `length` to cover the extra 8
    /// bytes.
    pub fn new(rec: T, ts_out: u64) -> Self {
        let mut res = Self { rec, ts_out };
        res.rec.header_mut().length = (mem::size_of_val(&res) / 4) as u8;
        res
    }

    /// The gateway send time as a datetime.
    pub fn ts_out(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_out)
    }
}

impl<T: HasRType> AsRef<[u8]> for WithTsOut<T> {
    fn as_ref(&self) -> &[u8] {
        unsafe { as_u8_slice(self) }
    }
}

impl<T: HasRType> Record for WithTsOut<T> {
    fn header(&self) -> &RecordHeader {
        self.rec.header()
    }
}

impl<T: HasRType> RecordMut for WithTsOut<T> {
    fn header_mut(&mut self) -> &mut RecordHeader {
        self.rec.header_mut()
    }
}

impl<T: HasRType> HasRType for WithTsOut<T> {
    fn has_rtype(rtype: u8) -> bool {
        T::has_rtype(rtype)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use rstest::rstest;
    use type_layout::{Field, TypeLayout};

    use crate::{MAX_RECORD_LEN, UNDEF_PRICE, UNDEF_TIMESTAMP};

    use super::*;

    #[rstest]
    #[case::header(RecordHeader::default::<MboMsg>(rtype::MBO), 16)]
    #[case::mbo(MboMsg::default(), 56)]
    #[case::ba_pair(BidAskPair::default(), 32)]
    #[case::cba_pair(ConsolidatedBidAskPair::default(), 32)]
    #[case::trade(TradeMsg::default(), 48)]
    #[case::mbp1(Mbp1Msg::default(), size_of::<TradeMsg>() + size_of::<BidAskPair>())]
    #[case::mbp10(Mbp10Msg::default(), size_of::<TradeMsg>() + size_of::<BidAskPair>() * 10)]
    #[case::ohlcv(OhlcvMsg::default(), 56)]
    #[case::status(StatusMsg::default(), 40)]
    #[case::definition(InstrumentDefMsg::default(), 400)]
    #[case::imbalance(ImbalanceMsg::default(), 112)]
    #[case::stat(StatMsg::default(), 64)]
    #[case::error(ErrorMsg::default(), 320)]
    #[case::symbol_mapping(SymbolMappingMsg::default(), 176)]
    #[case::system(SystemMsg::default(), 320)]
    #[case::cmbp1(Cmbp1Msg::default(), 80)]
    #[case::bbo(BboMsg::default(), 80)]
    #[case::with_ts_out(WithTsOut::new(SystemMsg::default(), 0), size_of::<SystemMsg>() + 8)]
    fn test_wire_sizes<R: Sized>(#[case] _rec: R, #[case] exp: usize) {
        assert_eq!(size_of::<R>(), exp);
        assert!(size_of::<R>() <= MAX_RECORD_LEN);
    }

    // The in-memory representation doubles as the wire representation, so
    // the declared fields have to cover every byte: the compiler inserting
    // invisible padding anywhere would silently corrupt the encoding.
    #[rstest]
    #[case::header(RecordHeader::default::<MboMsg>(rtype::MBO))]
    #[case::mbo(MboMsg::default())]
    #[case::ba_pair(BidAskPair::default())]
    #[case::cba_pair(ConsolidatedBidAskPair::default())]
    #[case::trade(TradeMsg::default())]
    #[case::mbp1(Mbp1Msg::default())]
    #[case::mbp10(Mbp10Msg::default())]
    #[case::ohlcv(OhlcvMsg::default())]
    #[case::status(StatusMsg::default())]
    #[case::definition(InstrumentDefMsg::default())]
    #[case::imbalance(ImbalanceMsg::default())]
    #[case::stat(StatMsg::default())]
    #[case::error(ErrorMsg::default())]
    #[case::symbol_mapping(SymbolMappingMsg::default())]
    #[case::system(SystemMsg::default())]
    #[case::cmbp1(Cmbp1Msg::default())]
    #[case::bbo(BboMsg::default())]
    fn test_no_compiler_padding<R: TypeLayout>(#[case] _rec: R) {
        let layout = R::type_layout();
        assert!(
            layout
                .fields
                .iter()
                .all(|field| matches!(field, Field::Field { .. })),
            "compiler-inserted padding in {layout}"
        );
        assert_eq!(size_of::<R>() % RecordHeader::LENGTH_MULTIPLIER, 0);
    }

    #[test]
    fn test_declared_length_matches_size() {
        assert_eq!(
            OhlcvMsg::default().record_size(),
            size_of::<OhlcvMsg>()
        );
        assert_eq!(MboMsg::default().record_size(), size_of::<MboMsg>());
    }

    #[test]
    fn test_record_from_bytes_round_trip() {
        let mut orig = OhlcvMsg::default();
        orig.hd.instrument_id = 5482;
        orig.open = 372025000000000;
        orig.volume = 57;
        let bytes = orig.as_ref();
        assert_eq!(bytes.len(), size_of::<OhlcvMsg>());
        let decoded = record_from_bytes::<OhlcvMsg>(bytes).unwrap();
        assert_eq!(*decoded, orig);
    }

    #[test]
    fn test_record_from_bytes_undersized() {
        let rec = OhlcvMsg::default();
        let bytes = rec.as_ref();
        let res = record_from_bytes::<OhlcvMsg>(&bytes[..bytes.len() - 5]);
        assert!(matches!(res, Err(crate::Error::Decode(_))));
    }

    #[test]
    fn test_record_from_bytes_wrong_rtype() {
        let rec = OhlcvMsg::default();
        let res = record_from_bytes::<MboMsg>(rec.as_ref());
        assert!(matches!(res, Err(crate::Error::Conversion { .. })));
    }

    #[test]
    fn test_candle_compatibility() {
        for rtype in [
            rtype::OHLCV_1S,
            rtype::OHLCV_1M,
            rtype::OHLCV_1H,
            rtype::OHLCV_1D,
            rtype::OHLCV_EOD,
            rtype::OHLCV_DEPRECATED,
        ] {
            assert!(OhlcvMsg::has_rtype(rtype));
        }
        assert!(!OhlcvMsg::has_rtype(rtype::MBO));
    }

    #[test]
    fn test_sentinels_survive_byte_round_trip() {
        // the unset sentinels are part of the wire contract and must come
        // back bit-for-bit, not as some normalized "absent" form
        let rec = StatMsg::default();
        let decoded = record_from_bytes::<StatMsg>(rec.as_ref()).unwrap();
        assert_eq!(decoded.price, UNDEF_PRICE);
        assert_eq!(decoded.ts_ref, UNDEF_TIMESTAMP);
        assert_eq!(decoded.quantity, crate::UNDEF_STAT_QUANTITY);
        assert!(decoded.ts_ref().is_none());
    }

    #[test]
    fn test_header_ts_event_accessor() {
        let mut hd = RecordHeader::default::<OhlcvMsg>(rtype::OHLCV_1S);
        assert!(hd.ts_event().is_none());
        hd.ts_event = 0;
        assert_eq!(
            hd.ts_event().unwrap(),
            time::OffsetDateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn test_mixed_records_through_dyn_trait() {
        let records: Vec<Box<dyn Record>> = vec![
            Box::new(TradeMsg::default()),
            Box::new(OhlcvMsg::default()),
            Box::new(ErrorMsg::new(1, "dyn dispatch", true)),
        ];
        let sizes: Vec<usize> = records.iter().map(|rec| rec.record_size()).collect();
        assert_eq!(sizes, vec![48, 56, 320]);
        assert_eq!(records[0].rtype().unwrap(), RType::Mbp0);
        assert_eq!(records[2].rtype().unwrap(), RType::Error);
    }

    #[test]
    fn test_with_ts_out_length() {
        let rec = WithTsOut::new(OhlcvMsg::default(), 1609160400000000000);
        assert_eq!(rec.record_size(), size_of::<OhlcvMsg>() + 8);
        assert!(rec.ts_out().is_some());
    }
}
