//! Encoding DBN metadata and records into binary byte sinks.

pub mod dbn;

pub use self::dbn::{
    Encoder as DbnEncoder, MetadataEncoder as DbnMetadataEncoder, RecordEncoder as DbnRecordEncoder,
};
