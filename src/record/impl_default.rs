use super::*;
use crate::{UNDEF_PRICE, UNDEF_STAT_QUANTITY, UNDEF_TIMESTAMP};

impl RecordHeader {
    /// Creates a default header for the record type `R` with the given
    /// `rtype`. The `length` field is set from the size of `R`; identifying
    /// fields are zeroed and `ts_event` is unset.
    pub fn default<R: HasRType>(rtype: u8) -> Self {
        Self::new::<R>(rtype, 0, 0, UNDEF_TIMESTAMP)
    }
}

impl Default for MboMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::MBO),
            order_id: 0,
            price: UNDEF_PRICE,
            size: 0,
            flags: 0,
            channel_id: 0,
            action: b'N' as c_char,
            side: b'N' as c_char,
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            sequence: 0,
        }
    }
}

impl Default for TradeMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::MBP_0),
            price: UNDEF_PRICE,
            size: 0,
            action: b'T' as c_char,
            side: b'N' as c_char,
            flags: 0,
            depth: 0,
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            sequence: 0,
        }
    }
}

impl Default for Mbp1Msg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::MBP_1),
            price: UNDEF_PRICE,
            size: 0,
            action: b'N' as c_char,
            side: b'N' as c_char,
            flags: 0,
            depth: 0,
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            sequence: 0,
            levels: Default::default(),
        }
    }
}

impl Default for Mbp10Msg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::MBP_10),
            price: UNDEF_PRICE,
            size: 0,
            action: b'N' as c_char,
            side: b'N' as c_char,
            flags: 0,
            depth: 0,
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            sequence: 0,
            levels: Default::default(),
        }
    }
}

impl Default for OhlcvMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::OHLCV_1S),
            open: UNDEF_PRICE,
            high: UNDEF_PRICE,
            low: UNDEF_PRICE,
            close: UNDEF_PRICE,
            volume: 0,
        }
    }
}

impl Default for StatusMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::STATUS),
            ts_recv: UNDEF_TIMESTAMP,
            action: 0,
            reason: 0,
            trading_event: 0,
            is_trading: b'~' as c_char,
            is_quoting: b'~' as c_char,
            is_short_sell_restricted: b'~' as c_char,
            _reserved: Default::default(),
        }
    }
}

impl Default for InstrumentDefMsg {
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
            strike_price: UNDEF_PRICE,
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
            contract_multiplier: 0,
            decay_quantity: 0,
            original_contract_size: 0,
            trading_reference_date: 0,
            appl_id: 0,
            maturity_year: 0,
            decay_start_date: 0,
            channel_id: 0,
            currency: [0; 4],
            settl_currency: [0; 4],
            secsubtype: [0; 6],
            raw_symbol: [0; SYMBOL_CSTR_LEN],
            group: [0; 21],
            exchange: [0; 5],
            asset: [0; 7],
            cfi: [0; 7],
            security_type: [0; 7],
            unit_of_measure: [0; 31],
            underlying: [0; 21],
            strike_price_currency: [0; 4],
            instrument_class: 0,
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
            _reserved: Default::default(),
        }
    }
}

impl Default for ImbalanceMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::IMBALANCE),
            ts_recv: UNDEF_TIMESTAMP,
            ref_price: UNDEF_PRICE,
            auction_time: 0,
            cont_book_clr_price: UNDEF_PRICE,
            auct_interest_clr_price: UNDEF_PRICE,
            ssr_filling_price: UNDEF_PRICE,
            ind_match_price: UNDEF_PRICE,
            upper_collar: UNDEF_PRICE,
            lower_collar: UNDEF_PRICE,
            paired_qty: 0,
            total_imbalance_qty: 0,
            market_imbalance_qty: 0,
            unpaired_qty: 0,
            auction_type: b'~' as c_char,
            side: b'N' as c_char,
            auction_status: 0,
            freeze_status: 0,
            num_extensions: 0,
            unpaired_side: b'N' as c_char,
            significant_imbalance: b'~' as c_char,
            _reserved: Default::default(),
        }
    }
}

impl Default for StatMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::STATISTICS),
            ts_recv: UNDEF_TIMESTAMP,
            ts_ref: UNDEF_TIMESTAMP,
            price: UNDEF_PRICE,
            quantity: UNDEF_STAT_QUANTITY,
            sequence: 0,
            ts_in_delta: 0,
            stat_type: 0,
            channel_id: 0,
            update_action: 0,
            stat_flags: 0,
            _reserved: Default::default(),
        }
    }
}

impl Default for ErrorMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::ERROR),
            err: [0; 302],
            code: 0,
            is_last: 1,
        }
    }
}

impl Default for SymbolMappingMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::SYMBOL_MAPPING),
            stype_in: u8::MAX,
            stype_in_symbol: [0; SYMBOL_CSTR_LEN],
            stype_out: u8::MAX,
            stype_out_symbol: [0; SYMBOL_CSTR_LEN],
            start_ts: UNDEF_TIMESTAMP,
            end_ts: UNDEF_TIMESTAMP,
        }
    }
}

impl Default for SystemMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::SYSTEM),
            msg: [0; 303],
            code: 0,
        }
    }
}

impl Default for Cmbp1Msg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::CMBP_1),
            price: UNDEF_PRICE,
            size: 0,
            action: b'N' as c_char,
            side: b'N' as c_char,
            flags: 0,
            _reserved1: Default::default(),
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            _reserved2: Default::default(),
            levels: Default::default(),
        }
    }
}

impl Default for BboMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::default::<Self>(rtype::BBO_1S),
            price: UNDEF_PRICE,
            size: 0,
            _reserved1: Default::default(),
            side: b'N' as c_char,
            flags: 0,
            _reserved2: Default::default(),
            ts_recv: UNDEF_TIMESTAMP,
            _reserved3: Default::default(),
            sequence: 0,
            levels: Default::default(),
        }
    }
}
