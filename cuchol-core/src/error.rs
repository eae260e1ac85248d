use thiserror::Error;

/// Errors raised before any device work is issued.
#[derive(Error, Debug)]
pub enum CholError {
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("{what} has length {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid CSR structure: {0}")]
    InvalidStructure(String),

    #[error("{what} = {value} does not fit in a 32-bit index")]
    IndexOverflow { what: &'static str, value: usize },

    #[error("{what} pointer is null")]
    NullPointer { what: &'static str },

    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("invalid solver config: {0}")]
    Config(String),

    #[error("failed to parse solver config: {0}")]
    ConfigJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CholError>;

/// Converts a host size to the `i32` the solver API takes.
pub fn to_index(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| CholError::IndexOverflow { what, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_index() {
        assert_eq!(to_index("n", 17).unwrap(), 17);
        let err = to_index("nnz", i32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, CholError::IndexOverflow { what: "nnz", .. }));
        assert!(err.to_string().contains("2147483648"));
    }
}
