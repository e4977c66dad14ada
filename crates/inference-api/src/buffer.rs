//! Owned or borrowed byte buffers
//!
//! A `PaddleBuf` either owns its bytes or borrows caller memory for the
//! lifetime `'a`. Owned memory is released on drop; borrowed memory never is.

use crate::PredictorError;
use std::fmt;
use thiserror::Error;

/// Storage behind a buffer
enum Memory<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
    BorrowedMut(&'a mut [u8]),
}

/// Reasons a buffer refuses a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("buffer borrows read-only memory")]
    ReadOnly,
    #[error("buffer holds {available} bytes, {required} required")]
    TooSmall { required: usize, available: usize },
}

/// Contiguous byte buffer holding raw tensor data
pub struct PaddleBuf<'a> {
    memory: Memory<'a>,
}

impl Default for PaddleBuf<'_> {
    fn default() -> Self {
        Self {
            memory: Memory::Borrowed(&[]),
        }
    }
}

impl<'a> PaddleBuf<'a> {
    /// Create an empty, non-owning buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference caller memory without taking ownership
    pub fn borrowed(data: &'a [u8]) -> Self {
        Self {
            memory: Memory::Borrowed(data),
        }
    }

    /// Reference writable caller memory without taking ownership
    pub fn borrowed_mut(data: &'a mut [u8]) -> Self {
        Self {
            memory: Memory::BorrowedMut(data),
        }
    }

    /// Allocate `length` zeroed bytes owned by the buffer
    pub fn with_len(length: usize) -> Self {
        Self::from_vec(vec![0; length])
    }

    /// Take ownership of existing bytes
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            memory: Memory::Owned(bytes),
        }
    }

    /// Owned buffer with the native-endian bytes of `values`
    pub fn from_f32_slice(values: &[f32]) -> Self {
        Self::from_vec(values.iter().flat_map(|v| v.to_ne_bytes()).collect())
    }

    /// Owned buffer with the native-endian bytes of `values`
    pub fn from_i64_slice(values: &[i64]) -> Self {
        Self::from_vec(values.iter().flat_map(|v| v.to_ne_bytes()).collect())
    }

    /// Resize to `length` bytes.
    ///
    /// Owned buffers keep their prefix and zero-fill any growth. A borrowed
    /// buffer is detached from the caller memory and replaced by a fresh
    /// owned allocation; the borrowed bytes are left untouched.
    pub fn resize(&mut self, length: usize) {
        if self.len() == length {
            return;
        }
        if let Memory::Owned(bytes) = &mut self.memory {
            bytes.resize(length, 0);
        } else {
            self.memory = Memory::Owned(vec![0; length]);
        }
    }

    /// Release owned memory and reference writable external memory instead
    pub fn reset(&mut self, data: &'a mut [u8]) {
        self.memory = Memory::BorrowedMut(data);
    }

    /// Release owned memory and reference read-only external memory instead
    pub fn reset_borrowed(&mut self, data: &'a [u8]) {
        self.memory = Memory::Borrowed(data);
    }

    /// Check if the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Pointer to the first byte
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// Whether the buffer frees its memory on drop
    pub fn is_owned(&self) -> bool {
        matches!(self.memory, Memory::Owned(_))
    }

    /// Whether the contents may be written through this buffer
    pub fn is_writable(&self) -> bool {
        !matches!(self.memory, Memory::Borrowed(_))
    }

    /// View the bytes
    pub fn as_slice(&self) -> &[u8] {
        match &self.memory {
            Memory::Owned(bytes) => bytes.as_slice(),
            Memory::Borrowed(data) => data,
            Memory::BorrowedMut(data) => &**data,
        }
    }

    /// Mutable view, `None` when the memory is borrowed read-only
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.memory {
            Memory::Owned(bytes) => Some(bytes.as_mut_slice()),
            Memory::Borrowed(_) => None,
            Memory::BorrowedMut(data) => Some(&mut **data),
        }
    }

    /// Non-owning read-only view of the same bytes
    pub fn share(&self) -> PaddleBuf<'_> {
        PaddleBuf::borrowed(self.as_slice())
    }

    /// Deep copy into an owned buffer
    pub fn to_owned_buf(&self) -> PaddleBuf<'static> {
        PaddleBuf::from_vec(self.as_slice().to_vec())
    }

    /// Move the contents out, leaving this buffer empty and non-owning
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Release owned memory. Borrowed buffers are left as they are.
    pub fn free(&mut self) {
        if self.is_owned() {
            self.memory = Memory::Borrowed(&[]);
        }
    }

    /// Copy `src` into the buffer.
    ///
    /// Owned buffers are resized to `src.len()`. Writable borrowed buffers
    /// must be large enough and are narrowed to the written prefix.
    pub fn write_from(&mut self, src: &[u8]) -> Result<(), WriteError> {
        match &mut self.memory {
            Memory::Owned(bytes) => {
                bytes.clear();
                bytes.extend_from_slice(src);
                Ok(())
            }
            Memory::Borrowed(_) => Err(WriteError::ReadOnly),
            Memory::BorrowedMut(data) => {
                if data.len() < src.len() {
                    return Err(WriteError::TooSmall {
                        required: src.len(),
                        available: data.len(),
                    });
                }
                let whole = std::mem::take(data);
                let (head, _) = whole.split_at_mut(src.len());
                head.copy_from_slice(src);
                *data = head;
                Ok(())
            }
        }
    }

    /// Decode native-endian `f32` values
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, PredictorError> {
        let bytes = self.as_slice();
        check_multiple(bytes.len(), 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                f32::from_ne_bytes(raw)
            })
            .collect())
    }

    /// Decode native-endian `i64` values
    pub fn to_i64_vec(&self) -> Result<Vec<i64>, PredictorError> {
        let bytes = self.as_slice();
        check_multiple(bytes.len(), 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                i64::from_ne_bytes(raw)
            })
            .collect())
    }
}

fn check_multiple(len: usize, elem: usize) -> Result<(), PredictorError> {
    if len % elem != 0 {
        return Err(PredictorError::InvalidInput(format!(
            "buffer of {} bytes is not a whole number of {}-byte elements",
            len, elem
        )));
    }
    Ok(())
}

impl fmt::Debug for PaddleBuf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaddleBuf")
            .field("len", &self.len())
            .field("owned", &self.is_owned())
            .field("writable", &self.is_writable())
            .finish()
    }
}
