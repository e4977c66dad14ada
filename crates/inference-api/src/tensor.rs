//! Tensor descriptors

use crate::buffer::PaddleBuf;
use crate::dtype::PaddleDType;
use crate::lod::{self, Lod};
use crate::PredictorError;

/// Named tensor: shape, element type, raw data and optional LoD
#[derive(Debug, Default)]
pub struct PaddleTensor<'a> {
    /// Variable name
    pub name: String,
    /// Dimension sizes, outermost first
    pub shape: Vec<usize>,
    /// Blob of data
    pub data: PaddleBuf<'a>,
    /// Element type
    pub dtype: PaddleDType,
    /// Ragged sequence offsets (Tensor + LoD = LoDTensor)
    pub lod: Lod,
}

impl<'a> PaddleTensor<'a> {
    /// Create a tensor without LoD
    pub fn new(name: impl Into<String>, shape: Vec<usize>, dtype: PaddleDType, data: PaddleBuf<'a>) -> Self {
        Self {
            name: name.into(),
            shape,
            data,
            dtype,
            lod: Lod::new(),
        }
    }

    /// Attach LoD offsets
    pub fn with_lod(mut self, lod: Lod) -> Self {
        self.lod = lod;
        self
    }

    /// Product of the shape dimensions, `None` on overflow
    pub fn numel(&self) -> Option<usize> {
        checked_product(&self.shape)
    }

    /// Byte length implied by shape, dtype and LoD, `None` on overflow
    pub fn expected_byte_len(&self) -> Option<usize> {
        let elems = match lod::row_count(&self.lod) {
            Some(rows) => checked_product(self.shape.get(1..).unwrap_or(&[]))?.checked_mul(rows)?,
            None => self.numel()?,
        };
        elems.checked_mul(self.dtype.size())
    }

    /// Check buffer size and LoD against the shape
    pub fn validate(&self) -> Result<(), PredictorError> {
        if !self.lod.is_empty() {
            let rows = lod::row_count(&self.lod).unwrap_or(0);
            lod::validate(&self.lod, rows)?;
            if let Some(&first) = self.shape.first() {
                if first != rows {
                    return Err(PredictorError::InvalidLod(format!(
                        "tensor '{}' has {} rows but LoD covers {}",
                        self.name, first, rows
                    )));
                }
            }
        }

        let expected = self.expected_byte_len().ok_or_else(|| {
            PredictorError::InvalidInput(format!(
                "tensor '{}' shape {:?} overflows the addressable size",
                self.name, self.shape
            ))
        })?;
        if self.data.len() != expected {
            return Err(PredictorError::ShapeMismatch {
                name: self.name.clone(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Batch dimension: top-level sequence count with LoD, first dim otherwise
    pub fn batch_size(&self) -> Option<usize> {
        lod::sequence_count(&self.lod).or_else(|| self.shape.first().copied())
    }

    /// Non-owning view sharing this tensor's bytes
    pub fn share(&self) -> PaddleTensor<'_> {
        PaddleTensor {
            name: self.name.clone(),
            shape: self.shape.clone(),
            data: self.data.share(),
            dtype: self.dtype,
            lod: self.lod.clone(),
        }
    }

    /// Detach from borrowed memory by copying the bytes
    pub fn into_owned(self) -> PaddleTensor<'static> {
        PaddleTensor {
            data: self.data.to_owned_buf(),
            name: self.name,
            shape: self.shape,
            dtype: self.dtype,
            lod: self.lod,
        }
    }
}

/// Product of `dims`, `None` on overflow
pub fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

impl PaddleTensor<'static> {
    /// Owned float32 tensor
    pub fn from_f32(name: impl Into<String>, shape: Vec<usize>, values: &[f32]) -> Self {
        Self::new(name, shape, PaddleDType::Float32, PaddleBuf::from_f32_slice(values))
    }

    /// Owned int64 tensor
    pub fn from_i64(name: impl Into<String>, shape: Vec<usize>, values: &[i64]) -> Self {
        Self::new(name, shape, PaddleDType::Int64, PaddleBuf::from_i64_slice(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_plain_tensor() {
        let tensor = PaddleTensor::from_f32("x", vec![2, 3], &[0.0; 6]);
        assert!(tensor.validate().is_ok());
        assert_eq!(tensor.expected_byte_len(), Some(24));
        assert_eq!(tensor.batch_size(), Some(2));

        let short = PaddleTensor::from_f32("x", vec![2, 3], &[0.0; 5]);
        assert!(matches!(
            short.validate(),
            Err(PredictorError::ShapeMismatch { expected: 24, actual: 20, .. })
        ));
    }

    #[test]
    fn test_lod_drives_row_count() {
        let tensor = PaddleTensor::from_i64("words", vec![5, 1], &[1, 2, 3, 4, 5])
            .with_lod(vec![vec![0, 2, 5]]);
        assert!(tensor.validate().is_ok());
        assert_eq!(tensor.batch_size(), Some(2));
        assert_eq!(tensor.expected_byte_len(), Some(40));

        let bad = PaddleTensor::from_i64("words", vec![5, 1], &[1, 2, 3, 4, 5])
            .with_lod(vec![vec![0, 2, 4]]);
        assert!(matches!(bad.validate(), Err(PredictorError::InvalidLod(_))));
    }

    #[test]
    fn test_oversized_shape_is_an_error() {
        let huge = PaddleTensor::new("x", vec![usize::MAX, 2], PaddleDType::Float32, PaddleBuf::new());
        assert_eq!(huge.numel(), None);
        assert!(matches!(huge.validate(), Err(PredictorError::InvalidInput(_))));

        // fits in elements, overflows in bytes
        let wide = PaddleTensor::new("x", vec![1 << 62, 1], PaddleDType::Float32, PaddleBuf::new());
        assert_eq!(wide.numel(), Some(1 << 62));
        assert!(matches!(wide.validate(), Err(PredictorError::InvalidInput(_))));

        let ragged = PaddleTensor::new("w", vec![2, usize::MAX], PaddleDType::Int64, PaddleBuf::new())
            .with_lod(vec![vec![0, 1, 2]]);
        assert!(matches!(ragged.validate(), Err(PredictorError::InvalidInput(_))));
    }

    #[test]
    fn test_share_and_into_owned() {
        let bytes = 1.5f32.to_ne_bytes();
        let tensor = PaddleTensor::new("s", vec![1], PaddleDType::Float32, PaddleBuf::borrowed(&bytes));
        let view = tensor.share();
        assert_eq!(view.data.as_ptr(), bytes.as_ptr());

        let owned = tensor.into_owned();
        assert!(owned.data.is_owned());
        assert_eq!(owned.data.to_f32_vec().unwrap(), vec![1.5]);
    }
}
