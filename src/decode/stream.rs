use std::marker::PhantomData;

use fallible_streaming_iterator::FallibleStreamingIterator;

use super::DecodeStream;
use crate::{record::HasRType, Error, Result};

/// A consuming iterator wrapping a [`DecodeRecord`](super::DecodeRecord).
/// Lazily decodes the contents of the file or other input stream.
///
/// Implements [`FallibleStreamingIterator`].
pub struct StreamIterDecoder<D, T> {
    /// The underlying decoder implementation.
    decoder: D,
    /// Number of elements that have been decoded. `None` indicates the end
    /// of the stream has been reached.
    i: Option<usize>,
    /// Required to associate this type with a specific record type `T`.
    _marker: PhantomData<T>,
}

impl<D, T> StreamIterDecoder<D, T> {
    /// Creates a new streaming decoder using the given `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            i: Some(0),
            _marker: PhantomData,
        }
    }
}

impl<D, T> FallibleStreamingIterator for StreamIterDecoder<D, T>
where
    D: DecodeStream,
    T: HasRType,
{
    type Error = Error;
    type Item = T;

    fn advance(&mut self) -> Result<()> {
        if let Some(i) = self.i.as_mut() {
            match self.decoder.decode_record::<T>() {
                Ok(Some(_)) => {
                    *i += 1;
                    Ok(())
                }
                Ok(None) => {
                    // set end-of-stream sentinel
                    self.i = None;
                    Ok(())
                }
                Err(err) => {
                    self.i = None;
                    Err(err)
                }
            }
        } else {
            Ok(())
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        if self.i.is_some() {
            // Safety: validated the record type in `advance()` with the call
            // to `decode_record`.
            self.decoder
                .last_record()
                .map(|rec| unsafe { rec.get_unchecked() })
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.i.unwrap_or_default(), None)
    }
}

#[cfg(test)]
mod tests {
    use fallible_streaming_iterator::FallibleStreamingIterator;

    use crate::{
        decode::{dbn::RecordDecoder, DecodeStream},
        encode::dbn::RecordEncoder,
        record::TradeMsg,
    };

    #[test]
    fn test_stream_iter_drains_decoder() {
        let mut buffer = Vec::new();
        let mut encoder = RecordEncoder::new(&mut buffer);
        for i in 0..3u32 {
            let mut rec = TradeMsg::default();
            rec.sequence = i;
            encoder.encode_record(&rec).unwrap();
        }
        let mut stream = RecordDecoder::new(buffer.as_slice()).decode_stream::<TradeMsg>();
        let mut seqs = Vec::new();
        while let Some(rec) = stream.next().unwrap() {
            seqs.push(rec.sequence);
        }
        assert_eq!(seqs, vec![0, 1, 2]);
    }
}
