//! Element type tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a tensor buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddleDType {
    /// 32-bit IEEE float
    #[default]
    Float32,
    /// 64-bit signed integer
    Int64,
}

impl PaddleDType {
    /// Size of one element in bytes
    pub const fn size(self) -> usize {
        match self {
            PaddleDType::Float32 => 4,
            PaddleDType::Int64 => 8,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddleDType::Float32 => "float32",
            PaddleDType::Int64 => "int64",
        }
    }
}

impl fmt::Display for PaddleDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte size of one element of `dtype`
pub fn paddle_dtype_size(dtype: PaddleDType) -> usize {
    dtype.size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(paddle_dtype_size(PaddleDType::Float32), 4);
        assert_eq!(paddle_dtype_size(PaddleDType::Int64), 8);
    }

    #[test]
    fn test_dtype_serde_names() {
        let json = serde_json::to_string(&PaddleDType::Int64).unwrap();
        assert_eq!(json, "\"int64\"");
        assert_eq!(PaddleDType::Float32.to_string(), "float32");
    }
}
