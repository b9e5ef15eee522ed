use std::mem;

use crate::{
    enums::{
        Action, InstrumentClass, SType, SecurityUpdateAction, Side, StatType,
        UserDefinedInstrument,
    },
    Error, Publisher, RType,
};

use super::*;

impl RecordHeader {
    /// The factor between the header's `length` field and a byte count.
    pub const LENGTH_MULTIPLIER: usize = 4;

    /// Creates a header for a record of type `R`. `rtype` must be one of the
    /// codes `R` decodes.
    pub const fn new<R: HasRType>(
        rtype: u8,
        publisher_id: u16,
        instrument_id: u32,
        ts_event: u64,
    ) -> Self {
        Self {
            length: (mem::size_of::<R>() / Self::LENGTH_MULTIPLIER) as u8,
            rtype,
            publisher_id,
            instrument_id,
            ts_event,
        }
    }

    /// The size of the **whole** record in bytes, derived from the `length`
    /// field.
    pub const fn record_size(&self) -> usize {
        self.length as usize * Self::LENGTH_MULTIPLIER
    }

    /// The raw rtype as an [`RType`].
    ///
    /// # Errors
    /// This function returns an error if `rtype` holds an unknown code.
    pub fn rtype(&self) -> crate::Result<RType> {
        RType::try_from(self.rtype)
            .map_err(|_| Error::conversion::<RType>(format!("{:#04X}", self.rtype)))
    }

    /// The raw publisher ID as a [`Publisher`].
    ///
    /// # Errors
    /// This function returns an error if `publisher_id` holds an unknown ID.
    pub fn publisher(&self) -> crate::Result<Publisher> {
        Publisher::try_from(self.publisher_id)
            .map_err(|_| Error::conversion::<Publisher>(format!("{}", self.publisher_id)))
    }

    /// The matching-engine-received timestamp as a datetime, or `None` when
    /// it holds the null sentinel.
    pub fn ts_event(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_event)
    }
}

fn char_to_side(side: c_char) -> crate::Result<Side> {
    Side::try_from(side as u8)
        .map_err(|_| Error::conversion::<Side>(format!("{:#04X}", side as u8)))
}

fn char_to_action(action: c_char) -> crate::Result<Action> {
    Action::try_from(action as u8)
        .map_err(|_| Error::conversion::<Action>(format!("{:#04X}", action as u8)))
}

impl MboMsg {
    /// The raw side as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The raw action as an enum.
    ///
    /// # Errors
    /// This function returns an error if `action` holds an unknown code.
    pub fn action(&self) -> crate::Result<Action> {
        char_to_action(self.action)
    }

    /// The capture-server-received timestamp as a datetime, or `None` when
    /// it holds the null sentinel.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }

    /// The raw `ts_in_delta` as a duration.
    pub fn ts_in_delta(&self) -> time::Duration {
        time::Duration::new(0, self.ts_in_delta)
    }
}

impl TradeMsg {
    /// The raw side as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The raw action as an enum.
    ///
    /// # Errors
    /// This function returns an error if `action` holds an unknown code.
    pub fn action(&self) -> crate::Result<Action> {
        char_to_action(self.action)
    }

    /// The capture-server-received timestamp as a datetime, or `None` when
    /// it holds the null sentinel.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl Mbp1Msg {
    /// The raw side as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The raw action as an enum.
    ///
    /// # Errors
    /// This function returns an error if `action` holds an unknown code.
    pub fn action(&self) -> crate::Result<Action> {
        char_to_action(self.action)
    }

    /// The capture-server-received timestamp as a datetime, or `None` when
    /// it holds the null sentinel.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl Mbp10Msg {
    /// The raw side as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The raw action as an enum.
    ///
    /// # Errors
    /// This function returns an error if `action` holds an unknown code.
    pub fn action(&self) -> crate::Result<Action> {
        char_to_action(self.action)
    }

    /// The capture-server-received timestamp as a datetime, or `None` when
    /// it holds the null sentinel.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl Cmbp1Msg {
    /// The raw side as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The raw action as an enum.
    ///
    /// # Errors
    /// This function returns an error if `action` holds an unknown code.
    pub fn action(&self) -> crate::Result<Action> {
        char_to_action(self.action)
    }
}

impl BboMsg {
    /// The raw side of the last trade as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }
}

impl ImbalanceMsg {
    /// The raw side of `total_imbalance_qty` as an enum.
    ///
    /// # Errors
    /// This function returns an error if `side` holds an unknown code.
    pub fn side(&self) -> crate::Result<Side> {
        char_to_side(self.side)
    }

    /// The capture-server-received timestamp as a datetime.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl StatMsg {
    /// The raw statistic type as an enum.
    ///
    /// # Errors
    /// This function returns an error if `stat_type` holds an unknown code.
    pub fn stat_type(&self) -> crate::Result<StatType> {
        StatType::try_from(self.stat_type)
            .map_err(|_| Error::conversion::<StatType>(format!("{}", self.stat_type)))
    }

    /// The capture-server-received timestamp as a datetime.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }

    /// The statistic's reference timestamp as a datetime, or `None` when it
    /// holds the null sentinel.
    pub fn ts_ref(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_ref)
    }
}

impl StatusMsg {
    /// The capture-server-received timestamp as a datetime.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl InstrumentDefMsg {
    /// The capture-server-received timestamp as a datetime.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }

    /// The expiration as a datetime, or `None` when it holds the null
    /// sentinel.
    pub fn expiration(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.expiration)
    }

    /// The activation as a datetime, or `None` when it holds the null
    /// sentinel.
    pub fn activation(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.activation)
    }

    /// The publisher's symbol for the instrument as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `raw_symbol` contains invalid
    /// UTF-8.
    pub fn raw_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.raw_symbol)
    }

    /// The underlying asset (product code) as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `asset` contains invalid UTF-8.
    pub fn asset(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.asset)
    }

    /// The security type as a `&str`, e.g. FUT.
    ///
    /// # Errors
    /// This function returns an error if `security_type` contains invalid
    /// UTF-8.
    pub fn security_type(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.security_type)
    }

    /// The raw instrument classification as an enum.
    ///
    /// # Errors
    /// This function returns an error if `instrument_class` holds an unknown
    /// code.
    pub fn instrument_class(&self) -> crate::Result<InstrumentClass> {
        InstrumentClass::try_from(self.instrument_class as u8).map_err(|_| {
            Error::conversion::<InstrumentClass>(format!("{:#04X}", self.instrument_class as u8))
        })
    }

    /// The raw `security_update_action` as an enum.
    ///
    /// # Errors
    /// This function returns an error if the field holds an unknown code.
    pub fn security_update_action(&self) -> crate::Result<SecurityUpdateAction> {
        SecurityUpdateAction::try_from(self.security_update_action as u8).map_err(|_| {
            Error::conversion::<SecurityUpdateAction>(format!(
                "{:#04X}",
                self.security_update_action as u8
            ))
        })
    }

    /// The raw `user_defined_instrument` as an enum.
    ///
    /// # Errors
    /// This function returns an error if the field holds an unknown code.
    pub fn user_defined_instrument(&self) -> crate::Result<UserDefinedInstrument> {
        UserDefinedInstrument::try_from(self.user_defined_instrument as u8).map_err(|_| {
            Error::conversion::<UserDefinedInstrument>(format!(
                "{:#04X}",
                self.user_defined_instrument as u8
            ))
        })
    }
}

impl ErrorMsg {
    /// Creates a new `ErrorMsg`, truncating `msg` if it overflows the
    /// fixed-width field.
    pub fn new(ts_event: u64, msg: &str, is_last: bool) -> Self {
        let mut error = Self {
            hd: RecordHeader::new::<Self>(rtype::ERROR, 0, 0, ts_event),
            ..Default::default()
        };
        // leave at least one null byte
        for (i, byte) in msg.as_bytes().iter().take(error.err.len() - 1).enumerate() {
            error.err[i] = *byte as c_char;
        }
        error.is_last = is_last as u8;
        error
    }

    /// The error text as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `err` contains invalid UTF-8.
    pub fn err(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.err)
    }
}

impl SystemMsg {
    /// The text the gateway sends in its heartbeats.
    pub const HEARTBEAT: &'static str = "Heartbeat";

    /// Creates a new `SystemMsg`.
    ///
    /// # Errors
    /// This function returns an error if `msg` overflows the fixed-width
    /// field.
    pub fn new(ts_event: u64, msg: &str) -> crate::Result<Self> {
        Ok(Self {
            hd: RecordHeader::new::<Self>(rtype::SYSTEM, 0, 0, ts_event),
            msg: str_to_c_chars(msg)?,
            code: 0,
        })
    }

    /// Creates a new heartbeat `SystemMsg`.
    pub fn heartbeat(ts_event: u64) -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::SYSTEM, 0, 0, ts_event),
            msg: str_to_c_chars(Self::HEARTBEAT).unwrap(),
            code: 0,
        }
    }

    /// Whether this message is a gateway heartbeat.
    pub fn is_heartbeat(&self) -> bool {
        self.msg()
            .map(|msg| msg == Self::HEARTBEAT)
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

impl SymbolMappingMsg {
    /// Creates a new `SymbolMappingMsg`.
    ///
    /// # Errors
    /// This function returns an error if either symbol overflows its
    /// fixed-width field.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_id: u32,
        ts_event: u64,
        stype_in: SType,
        stype_in_symbol: &str,
        stype_out: SType,
        stype_out_symbol: &str,
        start_ts: u64,
        end_ts: u64,
    ) -> crate::Result<Self> {
        Ok(Self {
            hd: RecordHeader::new::<Self>(rtype::SYMBOL_MAPPING, 0, instrument_id, ts_event),
            stype_in: stype_in as u8,
            stype_in_symbol: str_to_c_chars(stype_in_symbol)?,
            stype_out: stype_out as u8,
            stype_out_symbol: str_to_c_chars(stype_out_symbol)?,
            start_ts,
            end_ts,
        })
    }

    /// The raw input symbology type as an enum.
    ///
    /// # Errors
    /// This function returns an error if `stype_in` holds an unknown code.
    pub fn stype_in(&self) -> crate::Result<SType> {
        SType::try_from(self.stype_in)
            .map_err(|_| Error::conversion::<SType>(format!("{:#04X}", self.stype_in)))
    }

    /// The input symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_in_symbol` contains invalid
    /// UTF-8.
    pub fn stype_in_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_in_symbol)
    }

    /// The raw output symbology type as an enum.
    ///
    /// # Errors
    /// This function returns an error if `stype_out` holds an unknown code.
    pub fn stype_out(&self) -> crate::Result<SType> {
        SType::try_from(self.stype_out)
            .map_err(|_| Error::conversion::<SType>(format!("{:#04X}", self.stype_out)))
    }

    /// The output symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_out_symbol` contains invalid
    /// UTF-8.
    pub fn stype_out_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_out_symbol)
    }

    /// The start of the mapping interval as a datetime, or `None` when it
    /// holds the null sentinel.
    pub fn start_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.start_ts)
    }

    /// The end of the mapping interval as a datetime, or `None` when it
    /// holds the null sentinel.
    pub fn end_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.end_ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_msg_truncates() {
        let long = "e".repeat(500);
        let rec = ErrorMsg::new(0, &long, true);
        assert_eq!(rec.err().unwrap().len(), rec.err.len() - 1);
        assert_eq!(rec.is_last, 1);
    }

    #[test]
    fn test_system_heartbeat() {
        let rec = SystemMsg::heartbeat(1);
        assert!(rec.is_heartbeat());
        assert_eq!(rec.msg().unwrap(), "Heartbeat");
    }

    #[test]
    fn test_symbol_mapping_symbols() {
        let rec = SymbolMappingMsg::new(
            5482,
            2,
            SType::RawSymbol,
            "ESM4",
            SType::InstrumentId,
            "5482",
            0,
            crate::UNDEF_TIMESTAMP,
        )
        .unwrap();
        assert_eq!(rec.stype_in_symbol().unwrap(), "ESM4");
        assert_eq!(rec.stype_out_symbol().unwrap(), "5482");
        assert_eq!(rec.stype_in().unwrap(), SType::RawSymbol);
        assert_eq!(rec.stype_out().unwrap(), SType::InstrumentId);
        assert!(rec.end_ts().is_none());
    }
}
