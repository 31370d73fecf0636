//! Zero-copy record parser.
//!
//! Uses bytemuck for safe transmutation from raw bytes.

use bytemuck::{Pod, PodCastError};
use core::mem::size_of;
use crate::records::*;

/// Parse error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer doesn't hold a single record.
    BufferTooSmall,
    /// Buffer length is not a whole number of records.
    InvalidLength,
    /// Buffer is not properly aligned for the record type.
    MisalignedBuffer,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::BufferTooSmall => f.write_str("buffer smaller than one record"),
            ParseError::InvalidLength => f.write_str("buffer is not a whole number of records"),
            ParseError::MisalignedBuffer => f.write_str("buffer is misaligned for the record type"),
        }
    }
}

impl core::error::Error for ParseError {}

/// Zero-copy record parser.
pub struct RecordParser;

impl RecordParser {
    /// View a byte buffer as a slice of records (zero-copy).
    ///
    /// An empty buffer is a valid, empty batch.
    #[inline]
    pub fn cast<T: Pod>(buffer: &[u8]) -> Result<&[T], ParseError> {
        Self::check_length::<T>(buffer)?;
        bytemuck::try_cast_slice(buffer).map_err(map_cast_error)
    }

    /// Mutable view of a byte buffer as records, for output batches.
    #[inline]
    pub fn cast_mut<T: Pod>(buffer: &mut [u8]) -> Result<&mut [T], ParseError> {
        Self::check_length::<T>(buffer)?;
        bytemuck::try_cast_slice_mut(buffer).map_err(map_cast_error)
    }

    /// Parse a tick batch.
    #[inline(always)]
    pub fn ticks(buffer: &[u8]) -> Result<&[Tick], ParseError> {
        Self::cast(buffer)
    }

    /// Parse an order batch.
    #[inline(always)]
    pub fn orders(buffer: &[u8]) -> Result<&[OrderRecord], ParseError> {
        Self::cast(buffer)
    }

    /// Parse a position batch.
    #[inline(always)]
    pub fn positions(buffer: &[u8]) -> Result<&[PositionRecord], ParseError> {
        Self::cast(buffer)
    }

    /// Parse a limit batch.
    #[inline(always)]
    pub fn limits(buffer: &[u8]) -> Result<&[LimitRecord], ParseError> {
        Self::cast(buffer)
    }

    /// Decode records by copy from a buffer of any alignment.
    ///
    /// Fallback for buffers read from files or sockets, where the
    /// allocation is only byte-aligned.
    pub fn read_unaligned<T: Pod>(buffer: &[u8]) -> Result<UnalignedRecords<'_, T>, ParseError> {
        Self::check_length::<T>(buffer)?;
        Ok(UnalignedRecords {
            chunks: buffer.chunks_exact(size_of::<T>()),
            _marker: core::marker::PhantomData,
        })
    }

    #[inline(always)]
    fn check_length<T>(buffer: &[u8]) -> Result<(), ParseError> {
        let size = size_of::<T>();
        if buffer.is_empty() {
            return Ok(());
        }
        if buffer.len() < size {
            return Err(ParseError::BufferTooSmall);
        }
        if buffer.len() % size != 0 {
            return Err(ParseError::InvalidLength);
        }
        Ok(())
    }
}

fn map_cast_error(err: PodCastError) -> ParseError {
    match err {
        PodCastError::TargetAlignmentGreaterAndInputNotAligned
        | PodCastError::AlignmentMismatch => ParseError::MisalignedBuffer,
        PodCastError::OutputSliceWouldHaveSlop
        | PodCastError::SizeMismatch => ParseError::InvalidLength,
    }
}

/// Iterator over records decoded from an unaligned buffer.
pub struct UnalignedRecords<'a, T> {
    chunks: core::slice::ChunksExact<'a, u8>,
    _marker: core::marker::PhantomData<T>,
}

impl<'a, T: Pod> Iterator for UnalignedRecords<'a, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.chunks.next().map(bytemuck::pod_read_unaligned)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<'a, T: Pod> ExactSizeIterator for UnalignedRecords<'a, T> {}
