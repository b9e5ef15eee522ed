//! Compatibility shims for DBN version 1 records whose layouts changed in
//! version 2.

use std::os::raw::c_char;

use crate::{
    enums::rtype,
    macros::impl_record,
    record::{c_chars_to_str, str_to_c_chars, ts_to_dt, HasRType, RecordHeader},
    UNDEF_PRICE, UNDEF_TIMESTAMP,
};

/// The length of symbol fields in DBN version 1.
pub const SYMBOL_CSTR_LEN_V1: usize = 22;

/// Returns the length of fixed-width symbol strings in the given DBN version.
pub const fn version_symbol_cstr_len(version: u8) -> usize {
    if version < 2 {
        SYMBOL_CSTR_LEN_V1
    } else {
        crate::SYMBOL_CSTR_LEN
    }
}

/// A trait for compatibility between different versions of symbol mapping
/// records.
pub trait SymbolMappingRec: HasRType {
    /// The input symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_in_symbol` contains invalid
    /// UTF-8.
    fn stype_in_symbol(&self) -> crate::Result<&str>;

    /// The output symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_out_symbol` contains invalid
    /// UTF-8.
    fn stype_out_symbol(&self) -> crate::Result<&str>;

    /// The start of the mapping interval as a datetime, or `None` when it
    /// holds the null sentinel.
    fn start_ts(&self) -> Option<time::OffsetDateTime>;

    /// The end of the mapping interval as a datetime, or `None` when it
    /// holds the null sentinel.
    fn end_ts(&self) -> Option<time::OffsetDateTime>;
}

impl SymbolMappingRec for crate::record::SymbolMappingMsg {
    fn stype_in_symbol(&self) -> crate::Result<&str> {
        Self::stype_in_symbol(self)
    }

    fn stype_out_symbol(&self) -> crate::Result<&str> {
        Self::stype_out_symbol(self)
    }

    fn start_ts(&self) -> Option<time::OffsetDateTime> {
        Self::start_ts(self)
    }

    fn end_ts(&self) -> Option<time::OffsetDateTime> {
        Self::end_ts(self)
    }
}

/// The version 1 form of [`ErrorMsg`](crate::record::ErrorMsg), with a
/// shorter text field.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct ErrorMsgV1 {
    /// The shared header.
    pub hd: RecordHeader,
    /// The error text.
    pub err: [c_char; 64],
}

/// The version 1 form of [`SystemMsg`](crate::record::SystemMsg), with a
/// shorter text field.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct SystemMsgV1 {
    /// The shared header.
    pub hd: RecordHeader,
    /// The message text.
    pub msg: [c_char; 64],
}

/// The version 1 form of
/// [`SymbolMappingMsg`](crate::record::SymbolMappingMsg): 22-byte symbols
/// and no symbology type bytes.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct SymbolMappingMsgV1 {
    /// The shared header.
    pub hd: RecordHeader,
    /// The input symbol.
    pub stype_in_symbol: [c_char; SYMBOL_CSTR_LEN_V1],
    /// The output symbol.
    pub stype_out_symbol: [c_char; SYMBOL_CSTR_LEN_V1],
    #[doc(hidden)]
    pub _reserved: [u8; 4],
    /// Where the mapping interval begins, as nanoseconds since the UNIX
    /// epoch.
    pub start_ts: u64,
    /// Where the mapping interval ends, as nanoseconds since the UNIX epoch.
    pub end_ts: u64,
}

/// The version 1 form of
/// [`InstrumentDefMsg`](crate::record::InstrumentDefMsg), with a 22-byte
/// symbol and a different field order in the character section.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(type_layout::TypeLayout))]
pub struct InstrumentDefMsgV1 {
    /// The shared header.
    pub hd: RecordHeader,
    /// When the capture server received the event, as a count of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The minimum price increment (tick) in fixed-precision units of 1e-9.
    pub min_price_increment: i64,
    /// Multiplier from the venue's display price to the conventional price.
    pub display_factor: i64,
    /// The last eligible trade time as nanoseconds since the UNIX epoch.
    pub expiration: u64,
    /// When the instrument activated, as nanoseconds since the UNIX epoch.
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
    #[doc(hidden)]
    pub _reserved2: [u8; 4],
    /// Deliverables per instrument (peak days).
    pub contract_multiplier: i32,
    /// Daily decay quantity once `decay_start_date` is reached.
    pub decay_quantity: i32,
    /// The fixed contract value.
    pub original_contract_size: i32,
    #[doc(hidden)]
    pub _reserved3: [u8; 4],
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
    pub raw_symbol: [c_char; SYMBOL_CSTR_LEN_V1],
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
    // Realigns `strike_price` on the wire.
    #[doc(hidden)]
    pub _reserved4: [u8; 2],
    /// The option strike in fixed-precision units of 1e-9.
    pub strike_price: i64,
    #[doc(hidden)]
    pub _reserved5: [u8; 6],
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
    pub _reserved6: [u8; 3],
}

impl_record!(ErrorMsgV1, rtype::ERROR);
impl_record!(SystemMsgV1, rtype::SYSTEM);
impl_record!(SymbolMappingMsgV1, rtype::SYMBOL_MAPPING);
impl_record!(InstrumentDefMsgV1, rtype::INSTRUMENT_DEF);

impl ErrorMsgV1 {
    /// The error text as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `err` contains invalid UTF-8.
    pub fn err(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.err)
    }
}

impl SystemMsgV1 {
    /// Whether this message is a gateway heartbeat.
    pub fn is_heartbeat(&self) -> bool {
        self.msg()
            .map(|msg| msg == crate::record::SystemMsg::HEARTBEAT)
            .unwrap_or_default()
    }

    /// The message text as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `msg` contains invalid UTF-8.
    pub fn msg(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.msg)
    }
}

impl SymbolMappingMsgV1 {
    /// Creates a new `SymbolMappingMsgV1`.
    ///
    /// # Errors
    /// This function returns an error if either symbol is too long for its
    /// fixed-width field.
    pub fn new(
        instrument_id: u32,
        ts_event: u64,
        stype_in_symbol: &str,
        stype_out_symbol: &str,
        start_ts: u64,
        end_ts: u64,
    ) -> crate::Result<Self> {
        Ok(Self {
            hd: RecordHeader::new::<Self>(rtype::SYMBOL_MAPPING, 0, instrument_id, ts_event),
            stype_in_symbol: str_to_c_chars(stype_in_symbol)?,
            stype_out_symbol: str_to_c_chars(stype_out_symbol)?,
            _reserved: [0; 4],
            start_ts,
            end_ts,
        })
    }
}

impl SymbolMappingRec for SymbolMappingMsgV1 {
    fn stype_in_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_in_symbol)
    }

    fn stype_out_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_out_symbol)
    }

    fn start_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.start_ts)
    }

    fn end_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.end_ts)
    }
}

impl InstrumentDefMsgV1 {
    /// The publisher's symbol for the instrument as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `raw_symbol` contains invalid
    /// UTF-8.
    pub fn raw_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.raw_symbol)
    }
}

fn widen_cstr<const N: usize, const M: usize>(src: &[c_char; N]) -> [c_char; M] {
    let mut res = [0; M];
    res[..N].copy_from_slice(src);
    res
}

impl From<&ErrorMsgV1> for crate::record::ErrorMsg {
    fn from(v1: &ErrorMsgV1) -> Self {
        let mut res = Self {
            hd: RecordHeader::new::<Self>(
                rtype::ERROR,
                v1.hd.publisher_id,
                v1.hd.instrument_id,
                v1.hd.ts_event,
            ),
            ..Default::default()
        };
        res.err[..v1.err.len()].copy_from_slice(&v1.err);
        res
    }
}

impl From<&SystemMsgV1> for crate::record::SystemMsg {
    fn from(v1: &SystemMsgV1) -> Self {
        let mut res = Self {
            hd: RecordHeader::new::<Self>(
                rtype::SYSTEM,
                v1.hd.publisher_id,
                v1.hd.instrument_id,
                v1.hd.ts_event,
            ),
            ..Default::default()
        };
        res.msg[..v1.msg.len()].copy_from_slice(&v1.msg);
        res
    }
}

impl From<&SymbolMappingMsgV1> for crate::record::SymbolMappingMsg {
    fn from(v1: &SymbolMappingMsgV1) -> Self {
        Self {
            hd: RecordHeader::new::<Self>(
                rtype::SYMBOL_MAPPING,
                v1.hd.publisher_id,
                v1.hd.instrument_id,
                v1.hd.ts_event,
            ),
            // v1 has no stype fields
            stype_in: crate::NULL_STYPE,
            stype_in_symbol: widen_cstr(&v1.stype_in_symbol),
            stype_out: crate::NULL_STYPE,
            stype_out_symbol: widen_cstr(&v1.stype_out_symbol),
            start_ts: v1.start_ts,
            end_ts: v1.end_ts,
        }
    }
}

impl From<&InstrumentDefMsgV1> for crate::record::InstrumentDefMsg {
    fn from(v1: &InstrumentDefMsgV1) -> Self {
        Self {
            hd: RecordHeader::new::<Self>(
                rtype::INSTRUMENT_DEF,
                v1.hd.publisher_id,
                v1.hd.instrument_id,
                v1.hd.ts_event,
            ),
            ts_recv: v1.ts_recv,
            min_price_increment: v1.min_price_increment,
            display_factor: v1.display_factor,
            expiration: v1.expiration,
            activation: v1.activation,
            high_limit_price: v1.high_limit_price,
            low_limit_price: v1.low_limit_price,
            max_price_variation: v1.max_price_variation,
            trading_reference_price: v1.trading_reference_price,
            unit_of_measure_qty: v1.unit_of_measure_qty,
            min_price_increment_amount: v1.min_price_increment_amount,
            price_ratio: v1.price_ratio,
            strike_price: v1.strike_price,
            inst_attrib_value: v1.inst_attrib_value,
            underlying_id: v1.underlying_id,
            raw_instrument_id: v1.raw_instrument_id,
            market_depth_implied: v1.market_depth_implied,
            market_depth: v1.market_depth,
            market_segment_id: v1.market_segment_id,
            max_trade_vol: v1.max_trade_vol,
            min_lot_size: v1.min_lot_size,
            min_lot_size_block: v1.min_lot_size_block,
            min_lot_size_round_lot: v1.min_lot_size_round_lot,
            min_trade_vol: v1.min_trade_vol,
            contract_multiplier: v1.contract_multiplier,
            decay_quantity: v1.decay_quantity,
            original_contract_size: v1.original_contract_size,
            trading_reference_date: v1.trading_reference_date,
            appl_id: v1.appl_id,
            maturity_year: v1.maturity_year,
            decay_start_date: v1.decay_start_date,
            channel_id: v1.channel_id,
            currency: v1.currency,
            settl_currency: v1.settl_currency,
            secsubtype: v1.secsubtype,
            raw_symbol: widen_cstr(&v1.raw_symbol),
            group: v1.group,
            exchange: v1.exchange,
            asset: v1.asset,
            cfi: v1.cfi,
            security_type: v1.security_type,
            unit_of_measure: v1.unit_of_measure,
            underlying: v1.underlying,
            strike_price_currency: v1.strike_price_currency,
            instrument_class: v1.instrument_class,
            match_algorithm: v1.match_algorithm,
            md_security_trading_status: v1.md_security_trading_status,
            main_fraction: v1.main_fraction,
            price_display_format: v1.price_display_format,
            settl_price_type: v1.settl_price_type,
            sub_fraction: v1.sub_fraction,
            underlying_product: v1.underlying_product,
            security_update_action: v1.security_update_action,
            maturity_month: v1.maturity_month,
            maturity_day: v1.maturity_day,
            maturity_week: v1.maturity_week,
            user_defined_instrument: v1.user_defined_instrument,
            contract_multiplier_unit: v1.contract_multiplier_unit,
            flow_schedule_type: v1.flow_schedule_type,
            tick_rule: v1.tick_rule,
            _reserved: Default::default(),
        }
    }
}

impl Default for ErrorMsgV1 {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::ERROR),
            err: [0; 64],
        }
    }
}

impl Default for SystemMsgV1 {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::SYSTEM),
            msg: [0; 64],
        }
    }
}

impl Default for SymbolMappingMsgV1 {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::SYMBOL_MAPPING),
            stype_in_symbol: [0; SYMBOL_CSTR_LEN_V1],
            stype_out_symbol: [0; SYMBOL_CSTR_LEN_V1],
            _reserved: [0; 4],
            start_ts: UNDEF_TIMESTAMP,
            end_ts: UNDEF_TIMESTAMP,
        }
    }
}

impl Default for InstrumentDefMsgV1 {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::INSTRUMENT_DEF),
            ts_recv: UNDEF_TIMESTAMP,
            min_price_increment: UNDEF_PRICE,
            display_factor: UNDEF_PRICE,
            expiration: UNDEF_TIMESTAMP,
            activation: UNDEF_TIMESTAMP,
            high_limit_price: UNDEF_PRICE,
            low_limit_price: UNDEF_PRICE,
            max_price_variation: UNDEF_PRICE,
            trading_reference_price: UNDEF_PRICE,
            unit_of_measure_qty: UNDEF_PRICE,
            min_price_increment_amount: UNDEF_PRICE,
            price_ratio: UNDEF_PRICE,
            inst_attrib_value: 0,
            underlying_id: 0,
            raw_instrument_id: 0,
            market_depth_implied: 0,
            market_depth: 0,
            market_segment_id: 0,
            max_trade_vol: 0,
            min_lot_size: 0,
            min_lot_size_block: 0,
            min_lot_size_round_lot: 0,
            min_trade_vol: 0,
            _reserved2: [0; 4],
            contract_multiplier: 0,
            decay_quantity: 0,
            original_contract_size: 0,
            _reserved3: [0; 4],
            trading_reference_date: 0,
            appl_id: 0,
            maturity_year: 0,
            decay_start_date: 0,
            channel_id: 0,
            currency: [0; 4],
            settl_currency: [0; 4],
            secsubtype: [0; 6],
            raw_symbol: [0; SYMBOL_CSTR_LEN_V1],
            group: [0; 21],
            exchange: [0; 5],
            asset: [0; 7],
            cfi: [0; 7],
            security_type: [0; 7],
            unit_of_measure: [0; 31],
            underlying: [0; 21],
            strike_price_currency: [0; 4],
            instrument_class: 0,
            _reserved4: [0; 2],
            strike_price: UNDEF_PRICE,
            _reserved5: [0; 6],
            match_algorithm: b'F' as c_char,
            md_security_trading_status: 0,
            main_fraction: 0,
            price_display_format: 0,
            settl_price_type: 0,
            sub_fraction: 0,
            underlying_product: 0,
            security_update_action: b'A' as c_char,
            maturity_month: 0,
            maturity_day: 0,
            maturity_week: 0,
            user_defined_instrument: b'N' as c_char,
            contract_multiplier_unit: 0,
            flow_schedule_type: 0,
            tick_rule: 0,
            _reserved6: [0; 3],
        }
    }
}
