//! A polymorphic sink for DBN records, with one callback per record kind.

use std::mem;

use crate::{
    compat::{ErrorMsgV1, InstrumentDefMsgV1, SymbolMappingMsgV1, SystemMsgV1},
    enums::rtype,
    record::{
        BboMsg, Cmbp1Msg, ErrorMsg, HasRType, ImbalanceMsg, InstrumentDefMsg, MboMsg, Mbp10Msg,
        Mbp1Msg, OhlcvMsg, Record, StatMsg, StatusMsg, SymbolMappingMsg, SystemMsg, TradeMsg,
    },
    record_ref::RecordRef,
    Error, RType, Result,
};

/// A sink for the records of a DBN stream. Implementations override the
/// methods for the record kinds they care about; every method has a no-op
/// default, so a visitor only needs to name the callbacks it uses.
///
/// Any error returned from a callback halts the scan.
#[allow(unused_variables)]
pub trait Visitor {
    /// Called for each market-by-order message.
    fn on_mbo(&mut self, rec: &MboMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each trade message.
    fn on_trade(&mut self, rec: &TradeMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each market-by-price message with a book depth of 1.
    fn on_mbp1(&mut self, rec: &Mbp1Msg) -> Result<()> {
        Ok(())
    }

    /// Called for each market-by-price message with a book depth of 10.
    fn on_mbp10(&mut self, rec: &Mbp10Msg) -> Result<()> {
        Ok(())
    }

    /// Called for each candle, regardless of cadence.
    fn on_ohlcv(&mut self, rec: &OhlcvMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each trading status update.
    fn on_status(&mut self, rec: &StatusMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each instrument definition.
    fn on_instrument_def(&mut self, rec: &InstrumentDefMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each auction imbalance message.
    fn on_imbalance(&mut self, rec: &ImbalanceMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each publisher statistics message.
    fn on_stat(&mut self, rec: &StatMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each error message from the live gateway.
    fn on_error(&mut self, rec: &ErrorMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each symbol mapping message.
    fn on_symbol_mapping(&mut self, rec: &SymbolMappingMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each non-error gateway message, including heartbeats.
    fn on_system(&mut self, rec: &SystemMsg) -> Result<()> {
        Ok(())
    }

    /// Called for each consolidated best bid and offer message.
    fn on_cmbp1(&mut self, rec: &Cmbp1Msg) -> Result<()> {
        Ok(())
    }

    /// Called for each subsampled best bid and offer message.
    fn on_bbo(&mut self, rec: &BboMsg) -> Result<()> {
        Ok(())
    }

    /// Called once when the stream ends cleanly.
    fn on_stream_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [`Visitor`] that ignores every record. Useful for draining a stream or
/// as a base for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisitor;

impl Visitor for NoopVisitor {}

/// Dispatches `rec` to the matching method on `visitor` based on its rtype.
/// All candle rtypes route to [`Visitor::on_ohlcv`]. Gateway records sized
/// for DBN version 1 are upgraded to their current-version counterparts
/// before dispatch.
///
/// # Errors
/// This function returns an error if the record's length is inconsistent
/// with its rtype, if the rtype is unrecognized, or if the visitor callback
/// fails.
pub fn dispatch<V: Visitor>(rec: RecordRef, visitor: &mut V) -> Result<()> {
    match rec.header().rtype {
        rtype::MBO => visitor.on_mbo(get_rec(&rec)?),
        rtype::MBP_0 => visitor.on_trade(get_rec(&rec)?),
        rtype::MBP_1 => visitor.on_mbp1(get_rec(&rec)?),
        rtype::MBP_10 => visitor.on_mbp10(get_rec(&rec)?),
        rtype::OHLCV_1S
        | rtype::OHLCV_1M
        | rtype::OHLCV_1H
        | rtype::OHLCV_1D
        | rtype::OHLCV_EOD
        | rtype::OHLCV_DEPRECATED => visitor.on_ohlcv(get_rec(&rec)?),
        rtype::STATUS => visitor.on_status(get_rec(&rec)?),
        rtype::INSTRUMENT_DEF => {
            if rec.record_size() >= mem::size_of::<InstrumentDefMsg>() {
                visitor.on_instrument_def(get_rec(&rec)?)
            } else {
                visitor.on_instrument_def(&InstrumentDefMsg::from(get_rec::<InstrumentDefMsgV1>(
                    &rec,
                )?))
            }
        }
        rtype::IMBALANCE => visitor.on_imbalance(get_rec(&rec)?),
        rtype::STATISTICS => visitor.on_stat(get_rec(&rec)?),
        rtype::ERROR => {
            if rec.record_size() >= mem::size_of::<ErrorMsg>() {
                visitor.on_error(get_rec(&rec)?)
            } else {
                visitor.on_error(&ErrorMsg::from(get_rec::<ErrorMsgV1>(&rec)?))
            }
        }
        rtype::SYMBOL_MAPPING => {
            if rec.record_size() >= mem::size_of::<SymbolMappingMsg>() {
                visitor.on_symbol_mapping(get_rec(&rec)?)
            } else {
                visitor.on_symbol_mapping(&SymbolMappingMsg::from(get_rec::<SymbolMappingMsgV1>(
                    &rec,
                )?))
            }
        }
        rtype::SYSTEM => {
            if rec.record_size() >= mem::size_of::<SystemMsg>() {
                visitor.on_system(get_rec(&rec)?)
            } else {
                visitor.on_system(&SystemMsg::from(get_rec::<SystemMsgV1>(&rec)?))
            }
        }
        rtype::CMBP_1 => visitor.on_cmbp1(get_rec(&rec)?),
        rtype::BBO_1S | rtype::BBO_1M => visitor.on_bbo(get_rec(&rec)?),
        unknown => Err(Error::conversion::<RType>(format!(
            "unrecognized rtype {unknown:#04X}"
        ))),
    }
}

fn get_rec<'a, T: HasRType>(rec: &RecordRef<'a>) -> Result<&'a T> {
    if rec.record_size() < mem::size_of::<T>() {
        return Err(Error::decode(format!(
            "record with rtype {:#04X} and length {} is too short for {}",
            rec.header().rtype,
            rec.record_size(),
            std::any::type_name::<T>(),
        )));
    }
    // rtype was already matched by the caller
    rec.get::<T>().ok_or_else(|| {
        Error::conversion::<T>(format!("record with rtype {:#04X}", rec.header().rtype))
    })
}

#[cfg(test)]
mod tests {
    use crate::record::RecordHeader;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingVisitor {
        trades: usize,
        candles: usize,
        errors: usize,
        mappings: Vec<String>,
        stream_ended: bool,
    }

    impl Visitor for CountingVisitor {
        fn on_trade(&mut self, _rec: &TradeMsg) -> Result<()> {
            self.trades += 1;
            Ok(())
        }

        fn on_ohlcv(&mut self, _rec: &OhlcvMsg) -> Result<()> {
            self.candles += 1;
            Ok(())
        }

        fn on_error(&mut self, _rec: &ErrorMsg) -> Result<()> {
            self.errors += 1;
            Ok(())
        }

        fn on_symbol_mapping(&mut self, rec: &SymbolMappingMsg) -> Result<()> {
            self.mappings.push(rec.stype_out_symbol()?.to_owned());
            Ok(())
        }

        fn on_stream_end(&mut self) -> Result<()> {
            self.stream_ended = true;
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_candles_share_callback() {
        let mut visitor = CountingVisitor::default();
        for rtype in [rtype::OHLCV_1S, rtype::OHLCV_1D, rtype::OHLCV_DEPRECATED] {
            let mut rec = OhlcvMsg::default();
            rec.hd.rtype = rtype;
            dispatch(unsafe { RecordRef::new(rec.as_ref()) }, &mut visitor).unwrap();
        }
        assert_eq!(visitor.candles, 3);
    }

    #[test]
    fn test_dispatch_unknown_rtype() {
        let mut rec = TradeMsg::default();
        rec.hd.rtype = 0x7F;
        let mut visitor = NoopVisitor;
        let res = dispatch(unsafe { RecordRef::new(rec.as_ref()) }, &mut visitor);
        assert!(matches!(res, Err(Error::Conversion { .. })));
    }

    #[test]
    fn test_dispatch_length_shorter_than_kind() {
        // an MBO header with only enough bytes for the header itself
        let hd = RecordHeader::new::<MboMsg>(rtype::MBO, 1, 2, 3);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(unsafe { crate::record::as_u8_slice(&hd) });
        bytes[0] = 4;
        let mut visitor = NoopVisitor;
        let res = dispatch(unsafe { RecordRef::new(&bytes) }, &mut visitor);
        assert!(matches!(res, Err(Error::Decode(_))));
    }

    #[test]
    fn test_dispatch_v1_symbol_mapping_upgrades() {
        let rec = SymbolMappingMsgV1::new(1, 2, "AAPL", "32", 0, 0).unwrap();
        let mut visitor = CountingVisitor::default();
        dispatch(unsafe { RecordRef::new(rec.as_ref()) }, &mut visitor).unwrap();
        assert_eq!(visitor.mappings, vec!["32".to_owned()]);
    }

    #[test]
    fn test_dispatch_v1_error_upgrades() {
        let mut rec = ErrorMsgV1::default();
        for (i, byte) in b"bad".iter().enumerate() {
            rec.err[i] = *byte as std::os::raw::c_char;
        }
        let mut visitor = CountingVisitor::default();
        dispatch(unsafe { RecordRef::new(rec.as_ref()) }, &mut visitor).unwrap();
        assert_eq!(visitor.errors, 1);
    }
}
