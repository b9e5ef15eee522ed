//! Decoding of DBN records from line-delimited JSON, the textual form the
//! live gateway sends when the JSON encoding is selected.

use std::{io, num::NonZeroU64, os::raw::c_char, str::FromStr};

use serde_json::Value;

use crate::{
    compat::version_symbol_cstr_len,
    decode::{private, DecodeRecord, DecodeRecordRef, DecodeStream},
    enums::rtype,
    metadata::ymd_to_date,
    record::{
        as_u8_slice, BboMsg, BidAskPair, Cmbp1Msg, ConsolidatedBidAskPair, ErrorMsg, HasRType,
        ImbalanceMsg, InstrumentDefMsg, MboMsg, Mbp10Msg, Mbp1Msg, OhlcvMsg, RecordHeader,
        StatMsg, StatusMsg, SymbolMappingMsg, SystemMsg, TradeMsg,
    },
    record_ref::RecordRef,
    visitor::{self, Visitor},
    Error, Metadata, Result, SType, Schema, StreamIterDecoder, DBN_VERSION, MAX_RECORD_LEN,
    NULL_STYPE,
};

/// Type for decoding DBN records from `\n`-delimited JSON objects, one
/// record per line. Implements the same pull contract as the binary
/// [`Decoder`](crate::decode::dbn::Decoder).
///
/// Numeric fields that exceed safe floating-point precision (prices,
/// volumes, timestamps) arrive as JSON strings and are parsed best-effort:
/// a malformed numeric string yields the field's zero value rather than an
/// error.
///
/// If the stream leads with a JSON metadata object (one without an `hd`
/// key), it's decoded and made available through
/// [`metadata()`](Self::metadata).
pub struct Decoder<R> {
    reader: R,
    line: String,
    // holds the most recently built record
    buffer: [u8; MAX_RECORD_LEN],
    last_length: usize,
    metadata: Option<Metadata>,
    checked_first_line: bool,
    last_error: Option<Error>,
    sent_stream_end: bool,
}

impl<R> Decoder<R>
where
    R: io::BufRead,
{
    /// Creates a new JSON-line [`Decoder`] from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            buffer: [0; MAX_RECORD_LEN],
            last_length: 0,
            metadata: None,
            checked_first_line: false,
            last_error: None,
            sent_stream_end: false,
        }
    }

    /// Returns the metadata decoded from the head of the stream, if the
    /// stream led with a metadata line and at least one line has been read.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Returns the error that terminated decoding, if any.
    pub fn last_err(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Tries to decode a generic reference to a record from the next line.
    /// Returns `Ok(None)` on a clean end of the stream.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails, a line
    /// isn't valid JSON, or a record line is missing its `hd` header object.
    /// Errors are sticky.
    pub fn decode_ref(&mut self) -> Result<Option<RecordRef>> {
        if let Some(err) = &self.last_error {
            return Err(err.clone());
        }
        self.last_length = 0;
        loop {
            self.line.clear();
            let n_read = match self.reader.read_line(&mut self.line) {
                Ok(n) => n,
                Err(err) => return Err(self.stick(Error::io(err, "reading JSON line"))),
            };
            if n_read == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(err) => {
                    return Err(self.stick(Error::decode(format!("invalid JSON line: {err}"))))
                }
            };
            let first_line = !self.checked_first_line;
            self.checked_first_line = true;
            if value.get("hd").is_none() {
                if first_line {
                    // a leading object without a header is stream metadata
                    match decode_metadata(&value) {
                        Ok(metadata) => {
                            self.metadata = Some(metadata);
                            continue;
                        }
                        Err(err) => return Err(self.stick(err)),
                    }
                }
                return Err(self.stick(Error::decode(
                    "JSON record line missing `hd` header object",
                )));
            }
            let length = match self.build_record(&value) {
                Ok(length) => length,
                // an unrecognized rtype is recoverable: the line has been
                // consumed and the caller may keep scanning
                Err(err @ Error::Conversion { .. }) => return Err(err),
                Err(err) => return Err(self.stick(err)),
            };
            self.last_length = length;
            // Safety: `build_record` wrote a complete record of `length`
            // bytes into the buffer.
            return Ok(Some(unsafe { RecordRef::new(&self.buffer[..length]) }));
        }
    }

    /// Tries to decode the next line as a record of type `T`. Returns
    /// `Ok(None)` if the reader is exhausted.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails, the
    /// line is malformed, or the next record is of a different type than
    /// `T`.
    pub fn decode<T: HasRType>(&mut self) -> Result<Option<&T>> {
        if let Some(rec_ref) = self.decode_ref()? {
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

    /// Decodes the next line and dispatches the record to the matching
    /// method on `visitor`. Returns `Ok(false)` after the end of the stream,
    /// calling [`on_stream_end`](crate::visitor::Visitor::on_stream_end)
    /// exactly once.
    ///
    /// # Errors
    /// This function returns an error if decoding fails or the visitor
    /// returns an error.
    pub fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<bool> {
        match self.decode_ref()? {
            Some(rec) => {
                if let Err(err) = visitor::dispatch(rec, visitor) {
                    if !matches!(err, Error::Conversion { .. }) {
                        self.last_error = Some(err.clone());
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

    fn stick(&mut self, err: Error) -> Error {
        self.last_error = Some(err.clone());
        err
    }

    fn build_record(&mut self, v: &Value) -> Result<usize> {
        let hd = &v["hd"];
        let rtype = get_u8(hd, "rtype");
        match rtype {
            rtype::MBO => Ok(self.put(&mbo_from_json(v, hd))),
            rtype::MBP_0 => Ok(self.put(&trade_from_json(v, hd))),
            rtype::MBP_1 => Ok(self.put(&mbp1_from_json(v, hd))),
            rtype::MBP_10 => Ok(self.put(&mbp10_from_json(v, hd))),
            rtype::OHLCV_1S
            | rtype::OHLCV_1M
            | rtype::OHLCV_1H
            | rtype::OHLCV_1D
            | rtype::OHLCV_EOD
            | rtype::OHLCV_DEPRECATED => Ok(self.put(&ohlcv_from_json(v, hd, rtype))),
            rtype::STATUS => Ok(self.put(&status_from_json(v, hd))),
            rtype::INSTRUMENT_DEF => Ok(self.put(&instrument_def_from_json(v, hd))),
            rtype::IMBALANCE => Ok(self.put(&imbalance_from_json(v, hd))),
            rtype::STATISTICS => Ok(self.put(&stat_from_json(v, hd))),
            rtype::ERROR => Ok(self.put(&error_from_json(v, hd))),
            rtype::SYMBOL_MAPPING => Ok(self.put(&symbol_mapping_from_json(v, hd))),
            rtype::SYSTEM => Ok(self.put(&system_from_json(v, hd))),
            rtype::CMBP_1 => Ok(self.put(&cmbp1_from_json(v, hd))),
            rtype::BBO_1S | rtype::BBO_1M => Ok(self.put(&bbo_from_json(v, hd, rtype))),
            unknown => Err(Error::conversion::<crate::RType>(format!(
                "unrecognized rtype {unknown:#04X}"
            ))),
        }
    }

    fn put<T: HasRType>(&mut self, rec: &T) -> usize {
        let bytes = unsafe { as_u8_slice(rec) };
        self.buffer[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }
}

impl<R> DecodeRecordRef for Decoder<R>
where
    R: io::BufRead,
{
    fn decode_record_ref(&mut self) -> Result<Option<RecordRef>> {
        self.decode_ref()
    }
}

impl<R> DecodeRecord for Decoder<R>
where
    R: io::BufRead,
{
    fn decode_record<T: HasRType>(&mut self) -> Result<Option<&T>> {
        self.decode()
    }
}

impl<R> private::LastRecord for Decoder<R> {
    fn last_record(&self) -> Option<RecordRef> {
        // Safety: the buffer contains the full record from the previous
        // successful decode
        (self.last_length > 0).then(|| unsafe { RecordRef::new(&self.buffer[..self.last_length]) })
    }
}

impl<R> DecodeStream for Decoder<R>
where
    R: io::BufRead,
{
    fn decode_stream<T: HasRType>(self) -> StreamIterDecoder<Self, T> {
        StreamIterDecoder::new(self)
    }
}

/// Parses a numeric JSON value that may be encoded as a string. Malformed
/// strings yield 0.
fn uint(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn int(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn get_u64(obj: &Value, key: &str) -> u64 {
    obj.get(key).map(uint).unwrap_or(0)
}

fn get_i64(obj: &Value, key: &str) -> i64 {
    obj.get(key).map(int).unwrap_or(0)
}

fn get_u32(obj: &Value, key: &str) -> u32 {
    get_u64(obj, key) as u32
}

fn get_i32(obj: &Value, key: &str) -> i32 {
    get_i64(obj, key) as i32
}

fn get_u16(obj: &Value, key: &str) -> u16 {
    get_u64(obj, key) as u16
}

fn get_i16(obj: &Value, key: &str) -> i16 {
    get_i64(obj, key) as i16
}

fn get_u8(obj: &Value, key: &str) -> u8 {
    get_u64(obj, key) as u8
}

fn get_i8(obj: &Value, key: &str) -> i8 {
    get_i64(obj, key) as i8
}

fn get_str<'a>(obj: &'a Value, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn get_char(obj: &Value, key: &str) -> c_char {
    get_str(obj, key).bytes().next().unwrap_or(0) as c_char
}

/// Copies a JSON string field into a fixed-width null-padded array,
/// truncating if necessary.
fn get_cstr<const N: usize>(obj: &Value, key: &str) -> [c_char; N] {
    let mut res = [0; N];
    for (i, byte) in get_str(obj, key).bytes().take(N - 1).enumerate() {
        res[i] = byte as c_char;
    }
    res
}

fn header<T: HasRType>(hd: &Value, rtype: u8) -> RecordHeader {
    RecordHeader::new::<T>(
        rtype,
        get_u16(hd, "publisher_id"),
        get_u32(hd, "instrument_id"),
        get_u64(hd, "ts_event"),
    )
}

fn level(obj: &Value, idx: usize) -> BidAskPair {
    let level = &obj["levels"][idx];
    BidAskPair {
        bid_px: get_i64(level, "bid_px"),
        ask_px: get_i64(level, "ask_px"),
        bid_sz: get_u32(level, "bid_sz"),
        ask_sz: get_u32(level, "ask_sz"),
        bid_ct: get_u32(level, "bid_ct"),
        ask_ct: get_u32(level, "ask_ct"),
    }
}

fn stype_byte(obj: &Value, key: &str) -> u8 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(NULL_STYPE as u64) as u8,
        Some(Value::String(s)) => SType::from_str(s).map(|s| s as u8).unwrap_or(NULL_STYPE),
        _ => NULL_STYPE,
    }
}

fn mbo_from_json(v: &Value, hd: &Value) -> MboMsg {
    MboMsg {
        hd: header::<MboMsg>(hd, rtype::MBO),
        order_id: get_u64(v, "order_id"),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        flags: get_u8(v, "flags"),
        channel_id: get_u8(v, "channel_id"),
        action: get_char(v, "action"),
        side: get_char(v, "side"),
        ts_recv: get_u64(v, "ts_recv"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        sequence: get_u32(v, "sequence"),
    }
}

fn trade_from_json(v: &Value, hd: &Value) -> TradeMsg {
    TradeMsg {
        hd: header::<TradeMsg>(hd, rtype::MBP_0),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        action: get_char(v, "action"),
        side: get_char(v, "side"),
        flags: get_u8(v, "flags"),
        depth: get_u8(v, "depth"),
        ts_recv: get_u64(v, "ts_recv"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        sequence: get_u32(v, "sequence"),
    }
}

fn mbp1_from_json(v: &Value, hd: &Value) -> Mbp1Msg {
    Mbp1Msg {
        hd: header::<Mbp1Msg>(hd, rtype::MBP_1),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        action: get_char(v, "action"),
        side: get_char(v, "side"),
        flags: get_u8(v, "flags"),
        depth: get_u8(v, "depth"),
        ts_recv: get_u64(v, "ts_recv"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        sequence: get_u32(v, "sequence"),
        levels: [level(v, 0)],
    }
}

fn mbp10_from_json(v: &Value, hd: &Value) -> Mbp10Msg {
    Mbp10Msg {
        hd: header::<Mbp10Msg>(hd, rtype::MBP_10),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        action: get_char(v, "action"),
        side: get_char(v, "side"),
        flags: get_u8(v, "flags"),
        depth: get_u8(v, "depth"),
        ts_recv: get_u64(v, "ts_recv"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        sequence: get_u32(v, "sequence"),
        levels: std::array::from_fn(|i| level(v, i)),
    }
}

fn ohlcv_from_json(v: &Value, hd: &Value, rtype: u8) -> OhlcvMsg {
    OhlcvMsg {
        hd: header::<OhlcvMsg>(hd, rtype),
        open: get_i64(v, "open"),
        high: get_i64(v, "high"),
        low: get_i64(v, "low"),
        close: get_i64(v, "close"),
        volume: get_u64(v, "volume"),
    }
}

fn status_from_json(v: &Value, hd: &Value) -> StatusMsg {
    StatusMsg {
        hd: header::<StatusMsg>(hd, rtype::STATUS),
        ts_recv: get_u64(v, "ts_recv"),
        action: get_u16(v, "action"),
        reason: get_u16(v, "reason"),
        trading_event: get_u16(v, "trading_event"),
        is_trading: get_char(v, "is_trading"),
        is_quoting: get_char(v, "is_quoting"),
        is_short_sell_restricted: get_char(v, "is_short_sell_restricted"),
        _reserved: Default::default(),
    }
}

fn instrument_def_from_json(v: &Value, hd: &Value) -> InstrumentDefMsg {
    InstrumentDefMsg {
        hd: header::<InstrumentDefMsg>(hd, rtype::INSTRUMENT_DEF),
        ts_recv: get_u64(v, "ts_recv"),
        min_price_increment: get_i64(v, "min_price_increment"),
        display_factor: get_i64(v, "display_factor"),
        expiration: get_u64(v, "expiration"),
        activation: get_u64(v, "activation"),
        high_limit_price: get_i64(v, "high_limit_price"),
        low_limit_price: get_i64(v, "low_limit_price"),
        max_price_variation: get_i64(v, "max_price_variation"),
        trading_reference_price: get_i64(v, "trading_reference_price"),
        unit_of_measure_qty: get_i64(v, "unit_of_measure_qty"),
        min_price_increment_amount: get_i64(v, "min_price_increment_amount"),
        price_ratio: get_i64(v, "price_ratio"),
        strike_price: get_i64(v, "strike_price"),
        inst_attrib_value: get_i32(v, "inst_attrib_value"),
        underlying_id: get_u32(v, "underlying_id"),
        raw_instrument_id: get_u32(v, "raw_instrument_id"),
        market_depth_implied: get_i32(v, "market_depth_implied"),
        market_depth: get_i32(v, "market_depth"),
        market_segment_id: get_u32(v, "market_segment_id"),
        max_trade_vol: get_u32(v, "max_trade_vol"),
        min_lot_size: get_i32(v, "min_lot_size"),
        min_lot_size_block: get_i32(v, "min_lot_size_block"),
        min_lot_size_round_lot: get_i32(v, "min_lot_size_round_lot"),
        min_trade_vol: get_u32(v, "min_trade_vol"),
        contract_multiplier: get_i32(v, "contract_multiplier"),
        decay_quantity: get_i32(v, "decay_quantity"),
        original_contract_size: get_i32(v, "original_contract_size"),
        trading_reference_date: get_u16(v, "trading_reference_date"),
        appl_id: get_i16(v, "appl_id"),
        maturity_year: get_u16(v, "maturity_year"),
        decay_start_date: get_u16(v, "decay_start_date"),
        channel_id: get_u16(v, "channel_id"),
        currency: get_cstr(v, "currency"),
        settl_currency: get_cstr(v, "settl_currency"),
        secsubtype: get_cstr(v, "secsubtype"),
        raw_symbol: get_cstr(v, "raw_symbol"),
        group: get_cstr(v, "group"),
        exchange: get_cstr(v, "exchange"),
        asset: get_cstr(v, "asset"),
        cfi: get_cstr(v, "cfi"),
        security_type: get_cstr(v, "security_type"),
        unit_of_measure: get_cstr(v, "unit_of_measure"),
        underlying: get_cstr(v, "underlying"),
        strike_price_currency: get_cstr(v, "strike_price_currency"),
        instrument_class: get_char(v, "instrument_class"),
        match_algorithm: get_char(v, "match_algorithm"),
        md_security_trading_status: get_u8(v, "md_security_trading_status"),
        main_fraction: get_u8(v, "main_fraction"),
        price_display_format: get_u8(v, "price_display_format"),
        settl_price_type: get_u8(v, "settl_price_type"),
        sub_fraction: get_u8(v, "sub_fraction"),
        underlying_product: get_u8(v, "underlying_product"),
        security_update_action: get_char(v, "security_update_action"),
        maturity_month: get_u8(v, "maturity_month"),
        maturity_day: get_u8(v, "maturity_day"),
        maturity_week: get_u8(v, "maturity_week"),
        user_defined_instrument: get_char(v, "user_defined_instrument"),
        contract_multiplier_unit: get_i8(v, "contract_multiplier_unit"),
        flow_schedule_type: get_i8(v, "flow_schedule_type"),
        tick_rule: get_u8(v, "tick_rule"),
        _reserved: Default::default(),
    }
}

fn imbalance_from_json(v: &Value, hd: &Value) -> ImbalanceMsg {
    ImbalanceMsg {
        hd: header::<ImbalanceMsg>(hd, rtype::IMBALANCE),
        ts_recv: get_u64(v, "ts_recv"),
        ref_price: get_i64(v, "ref_price"),
        auction_time: get_u64(v, "auction_time"),
        cont_book_clr_price: get_i64(v, "cont_book_clr_price"),
        auct_interest_clr_price: get_i64(v, "auct_interest_clr_price"),
        ssr_filling_price: get_i64(v, "ssr_filling_price"),
        ind_match_price: get_i64(v, "ind_match_price"),
        upper_collar: get_i64(v, "upper_collar"),
        lower_collar: get_i64(v, "lower_collar"),
        paired_qty: get_u32(v, "paired_qty"),
        total_imbalance_qty: get_u32(v, "total_imbalance_qty"),
        market_imbalance_qty: get_u32(v, "market_imbalance_qty"),
        unpaired_qty: get_u32(v, "unpaired_qty"),
        auction_type: get_char(v, "auction_type"),
        side: get_char(v, "side"),
        auction_status: get_u8(v, "auction_status"),
        freeze_status: get_u8(v, "freeze_status"),
        num_extensions: get_u8(v, "num_extensions"),
        unpaired_side: get_char(v, "unpaired_side"),
        significant_imbalance: get_char(v, "significant_imbalance"),
        _reserved: Default::default(),
    }
}

fn stat_from_json(v: &Value, hd: &Value) -> StatMsg {
    StatMsg {
        hd: header::<StatMsg>(hd, rtype::STATISTICS),
        ts_recv: get_u64(v, "ts_recv"),
        ts_ref: get_u64(v, "ts_ref"),
        price: get_i64(v, "price"),
        quantity: get_i32(v, "quantity"),
        sequence: get_u32(v, "sequence"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        stat_type: get_u16(v, "stat_type"),
        channel_id: get_u16(v, "channel_id"),
        update_action: get_u8(v, "update_action"),
        stat_flags: get_u8(v, "stat_flags"),
        _reserved: Default::default(),
    }
}

fn error_from_json(v: &Value, hd: &Value) -> ErrorMsg {
    ErrorMsg {
        hd: header::<ErrorMsg>(hd, rtype::ERROR),
        err: get_cstr(v, "err"),
        code: get_u8(v, "code"),
        is_last: get_u8(v, "is_last"),
    }
}

fn symbol_mapping_from_json(v: &Value, hd: &Value) -> SymbolMappingMsg {
    SymbolMappingMsg {
        hd: header::<SymbolMappingMsg>(hd, rtype::SYMBOL_MAPPING),
        stype_in: stype_byte(v, "stype_in"),
        stype_in_symbol: get_cstr(v, "stype_in_symbol"),
        stype_out: stype_byte(v, "stype_out"),
        stype_out_symbol: get_cstr(v, "stype_out_symbol"),
        start_ts: get_u64(v, "start_ts"),
        end_ts: get_u64(v, "end_ts"),
    }
}

fn system_from_json(v: &Value, hd: &Value) -> SystemMsg {
    SystemMsg {
        hd: header::<SystemMsg>(hd, rtype::SYSTEM),
        msg: get_cstr(v, "msg"),
        code: get_u8(v, "code"),
    }
}

fn cmbp1_from_json(v: &Value, hd: &Value) -> Cmbp1Msg {
    let consolidated = &v["levels"][0];
    Cmbp1Msg {
        hd: header::<Cmbp1Msg>(hd, rtype::CMBP_1),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        action: get_char(v, "action"),
        side: get_char(v, "side"),
        flags: get_u8(v, "flags"),
        _reserved1: Default::default(),
        ts_recv: get_u64(v, "ts_recv"),
        ts_in_delta: get_i32(v, "ts_in_delta"),
        _reserved2: Default::default(),
        levels: [ConsolidatedBidAskPair {
            bid_px: get_i64(consolidated, "bid_px"),
            ask_px: get_i64(consolidated, "ask_px"),
            bid_sz: get_u32(consolidated, "bid_sz"),
            ask_sz: get_u32(consolidated, "ask_sz"),
            bid_pb: get_u16(consolidated, "bid_pb"),
            _reserved1: Default::default(),
            ask_pb: get_u16(consolidated, "ask_pb"),
            _reserved2: Default::default(),
        }],
    }
}

fn bbo_from_json(v: &Value, hd: &Value, rtype: u8) -> BboMsg {
    BboMsg {
        hd: header::<BboMsg>(hd, rtype),
        price: get_i64(v, "price"),
        size: get_u32(v, "size"),
        _reserved1: Default::default(),
        side: get_char(v, "side"),
        flags: get_u8(v, "flags"),
        _reserved2: Default::default(),
        ts_recv: get_u64(v, "ts_recv"),
        _reserved3: Default::default(),
        sequence: get_u32(v, "sequence"),
        levels: [level(v, 0)],
    }
}

fn decode_metadata(v: &Value) -> Result<Metadata> {
    let version = match v.get("version") {
        Some(value) => uint(value) as u8,
        None => DBN_VERSION,
    };
    if version == 0 || version > DBN_VERSION {
        return Err(Error::decode(format!(
            "unsupported DBN version {version} in JSON metadata"
        )));
    }
    let stype_in = SType::from_str(get_str(v, "stype_in")).ok();
    let stype_out =
        SType::from_str(get_str(v, "stype_out")).unwrap_or(SType::InstrumentId);
    Ok(Metadata {
        version,
        dataset: get_str(v, "dataset").to_owned(),
        schema: Schema::from_str(get_str(v, "schema")).ok(),
        start: get_u64(v, "start"),
        end: NonZeroU64::new(get_u64(v, "end")),
        limit: NonZeroU64::new(get_u64(v, "limit")),
        stype_in,
        stype_out,
        ts_out: matches!(v.get("ts_out"), Some(Value::Bool(true)))
            || get_u64(v, "ts_out") == 1,
        symbol_cstr_len: version_symbol_cstr_len(version),
        symbols: string_array(v, "symbols"),
        partial: string_array(v, "partial"),
        not_found: string_array(v, "not_found"),
        mappings: decode_json_mappings(v)?,
    })
}

fn string_array(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn decode_json_mappings(v: &Value) -> Result<Vec<crate::SymbolMapping>> {
    let Some(mappings) = v.get("mappings").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut res = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let mut intervals = Vec::new();
        if let Some(raw_intervals) = mapping.get("intervals").and_then(Value::as_array) {
            for interval in raw_intervals {
                intervals.push(crate::MappingInterval {
                    start_date: decode_json_date(interval, "start_date")?,
                    end_date: decode_json_date(interval, "end_date")?,
                    symbol: get_str(interval, "symbol").to_owned(),
                });
            }
        }
        res.push(crate::SymbolMapping {
            raw_symbol: get_str(mapping, "raw_symbol").to_owned(),
            intervals,
        });
    }
    Ok(res)
}

fn decode_json_date(v: &Value, key: &str) -> Result<time::Date> {
    const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        time::macros::format_description!("[year]-[month]-[day]");
    match v.get(key) {
        Some(Value::Number(n)) => ymd_to_date(n.as_u64().unwrap_or(0) as u32),
        Some(Value::String(s)) => time::Date::parse(s, DATE_FORMAT)
            .map_err(|_| Error::conversion::<time::Date>(s.clone())),
        _ => Err(Error::decode(format!("missing date field `{key}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one<T: HasRType + Clone>(line: &str) -> T {
        let mut decoder = Decoder::new(line.as_bytes());
        let rec = decoder.decode::<T>().unwrap().unwrap().clone();
        rec
    }

    #[test]
    fn test_decode_trade_with_string_numerics() {
        let line = r#"{"ts_recv":"1609160400099150057","hd":{"ts_event":"1609160400098821953","rtype":0,"publisher_id":1,"instrument_id":5482},"action":"T","side":"A","depth":0,"price":"3720250000000","size":5,"flags":129,"ts_in_delta":19251,"sequence":1170380}"#;
        let rec: TradeMsg = decode_one(line);
        assert_eq!(rec.hd.ts_event, 1609160400098821953);
        assert_eq!(rec.hd.publisher_id, 1);
        assert_eq!(rec.hd.instrument_id, 5482);
        assert_eq!(rec.ts_recv, 1609160400099150057);
        assert_eq!(rec.price, 3720250000000);
        assert_eq!(rec.size, 5);
        assert_eq!(rec.action, b'T' as c_char);
        assert_eq!(rec.side, b'A' as c_char);
        assert_eq!(rec.flags, 129);
        assert_eq!(rec.ts_in_delta, 19251);
        assert_eq!(rec.sequence, 1170380);
    }

    #[test]
    fn test_decode_ohlcv() {
        let line = r#"{"hd":{"ts_event":"1609160400000000000","rtype":32,"publisher_id":1,"instrument_id":5482},"open":"372025000000000","high":"372050000000000","low":"372025000000000","close":"372050000000000","volume":"57"}"#;
        let rec: OhlcvMsg = decode_one(line);
        assert_eq!(rec.hd.rtype, rtype::OHLCV_1S);
        assert_eq!(rec.open, 372025000000000);
        assert_eq!(rec.high, 372050000000000);
        assert_eq!(rec.low, 372025000000000);
        assert_eq!(rec.close, 372050000000000);
        assert_eq!(rec.volume, 57);
    }

    #[test]
    fn test_malformed_numeric_string_yields_zero() {
        let line = r#"{"hd":{"ts_event":"not-a-number","rtype":32,"publisher_id":1,"instrument_id":1},"open":"oops","high":"2","low":"1","close":"2","volume":"bad"}"#;
        let rec: OhlcvMsg = decode_one(line);
        assert_eq!(rec.hd.ts_event, 0);
        assert_eq!(rec.open, 0);
        assert_eq!(rec.high, 2);
        assert_eq!(rec.volume, 0);
    }

    #[test]
    fn test_decode_mbp1_levels() {
        let line = r#"{"hd":{"ts_event":"1","rtype":1,"publisher_id":1,"instrument_id":2},"price":"10","size":1,"action":"A","side":"B","flags":128,"depth":0,"ts_recv":"2","ts_in_delta":0,"sequence":7,"levels":[{"bid_px":"9","ask_px":"11","bid_sz":4,"ask_sz":5,"bid_ct":1,"ask_ct":2}]}"#;
        let rec: Mbp1Msg = decode_one(line);
        assert_eq!(rec.levels[0].bid_px, 9);
        assert_eq!(rec.levels[0].ask_px, 11);
        assert_eq!(rec.levels[0].ask_ct, 2);
    }

    #[test]
    fn test_leading_metadata_line() {
        let input = concat!(
            r#"{"version":2,"dataset":"XNAS.ITCH","schema":"trades","start":"1609160400000000000","end":"1609160800000000000","limit":"0","stype_in":"raw_symbol","stype_out":"instrument_id","ts_out":false,"symbols":["MSFT"],"partial":[],"not_found":[],"mappings":[{"raw_symbol":"MSFT","intervals":[{"start_date":"2020-12-28","end_date":"2020-12-29","symbol":"5482"}]}]}"#,
            "\n",
            r#"{"hd":{"ts_event":"1","rtype":0,"publisher_id":1,"instrument_id":5482},"action":"T","side":"N","depth":0,"price":"1","size":1,"flags":0,"ts_in_delta":0,"sequence":1}"#,
            "\n",
        );
        let mut decoder = Decoder::new(input.as_bytes());
        // metadata not available until the first line is read
        assert!(decoder.metadata().is_none());
        assert!(decoder.decode::<TradeMsg>().unwrap().is_some());
        let metadata = decoder.metadata().unwrap();
        assert_eq!(metadata.dataset, "XNAS.ITCH");
        assert_eq!(metadata.schema, Some(crate::Schema::Trades));
        assert_eq!(metadata.symbols, vec!["MSFT".to_owned()]);
        assert_eq!(metadata.mappings.len(), 1);
        assert_eq!(metadata.mappings[0].intervals[0].symbol, "5482");
        assert!(decoder.decode::<TradeMsg>().unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_sticky() {
        let mut decoder = Decoder::new("not json\n".as_bytes());
        assert!(decoder.decode_ref().is_err());
        assert!(decoder.decode_ref().is_err());
        assert!(decoder.last_err().is_some());
    }

    #[test]
    fn test_visit_json_records() {
        use crate::visitor::Visitor;

        #[derive(Default)]
        struct Counter {
            trades: usize,
            ended: bool,
        }
        impl Visitor for Counter {
            fn on_trade(&mut self, _rec: &TradeMsg) -> Result<()> {
                self.trades += 1;
                Ok(())
            }
            fn on_stream_end(&mut self) -> Result<()> {
                self.ended = true;
                Ok(())
            }
        }

        let line = r#"{"hd":{"ts_event":"1","rtype":0,"publisher_id":1,"instrument_id":2},"action":"T","side":"N","depth":0,"price":"1","size":1,"flags":0,"ts_in_delta":0,"sequence":1}"#;
        let input = format!("{line}\n{line}\n");
        let mut decoder = Decoder::new(input.as_bytes());
        let mut counter = Counter::default();
        while decoder.visit(&mut counter).unwrap() {}
        assert_eq!(counter.trades, 2);
        assert!(counter.ended);
    }
}
