//! A crate for working with Databento Binary Encoding (DBN): reading and
//! writing DBN streams, decoding the line-delimited JSON form of the same
//! records, resolving symbology, and running sessions against the Live
//! Subscription Gateway (LSG).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::missing_errors_doc)]

pub mod compat;
pub mod decode;
pub mod encode;
pub mod enums;
pub mod error;
pub mod live;
mod macros;
pub mod metadata;
pub mod pretty;
pub mod publishers;
pub mod record;
pub mod record_ref;
pub mod symbol_map;
pub mod visitor;

pub use crate::{
    decode::{DbnDecoder, JsonDecoder, StreamIterDecoder},
    encode::DbnEncoder,
    enums::{
        flags, rtype, Action, Compression, Encoding, InstrumentClass, RType, SType, Schema,
        SecurityUpdateAction, Side, StatType, StatUpdateAction, UserDefinedInstrument,
    },
    error::{Error, Result},
    live::{LiveClient, LiveConfig, Subscription},
    metadata::{MappingInterval, Metadata, MetadataBuilder, SymbolMapping},
    publishers::{Dataset, Publisher, Venue},
    record::{
        BboMsg, BidAskPair, Cmbp1Msg, ConsolidatedBidAskPair, ErrorMsg, HasRType, ImbalanceMsg,
        InstrumentDefMsg, MboMsg, Mbp10Msg, Mbp1Msg, OhlcvMsg, Record, RecordHeader, RecordMut,
        StatMsg, StatusMsg, SymbolMappingMsg, SystemMsg, TbboMsg, TradeMsg, WithTsOut,
    },
    record_ref::RecordRef,
    symbol_map::{PitSymbolMap, SymbolIndex, TsSymbolMap},
    visitor::{NoopVisitor, Visitor},
};

/// The current version of the DBN encoding, which is different from the crate
/// version.
pub const DBN_VERSION: u8 = 2;

/// The length of fixed-width symbol strings in the current DBN version,
/// including a null terminator byte.
pub const SYMBOL_CSTR_LEN: usize = 71;

/// The length in bytes of the largest record type, a
/// [`WithTsOut<InstrumentDefMsg>`].
pub const MAX_RECORD_LEN: usize = std::mem::size_of::<WithTsOut<InstrumentDefMsg>>();

pub(crate) const METADATA_DATASET_CSTR_LEN: usize = 16;
pub(crate) const METADATA_RESERVED_LEN: usize = 53;
pub(crate) const METADATA_RESERVED_LEN_V1: usize = 47;
/// Excludes the magic string, version, and length prefix.
pub(crate) const METADATA_FIXED_LEN: usize = 100;
pub(crate) const NULL_LIMIT: u64 = 0;
pub(crate) const NULL_RECORD_COUNT: u64 = u64::MAX;
pub(crate) const NULL_SCHEMA: u16 = u16::MAX;
pub(crate) const NULL_STYPE: u8 = u8::MAX;

/// The denominator of fixed prices in DBN.
pub const FIXED_PRICE_SCALE: i64 = 1_000_000_000;
/// The sentinel value for an unset or null price.
pub const UNDEF_PRICE: i64 = i64::MAX;
/// The sentinel value for an unset or null order quantity.
pub const UNDEF_ORDER_SIZE: u32 = u32::MAX;
/// The sentinel value for an unset or null stat quantity.
pub const UNDEF_STAT_QUANTITY: i32 = i32::MAX;
/// The sentinel value for an unset or null timestamp.
pub const UNDEF_TIMESTAMP: u64 = u64::MAX;
