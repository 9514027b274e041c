//! Small geometric helpers shared by the selection and array engines.
//!
//! An [`Order`] together with a shape determines how an N-dimensional coordinate maps to
//! a linear element offset inside a decoded chunk buffer; this is the only piece of
//! "array subset" geometry this crate needs, since gather/scatter is otherwise driven
//! entirely by the per-axis projections computed in [`crate::selection`].

/// The memory layout of a decoded chunk buffer: row-major or column-major.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum Order {
    /// Row-major (C) order: the last axis varies fastest.
    #[default]
    C,
    /// Column-major (Fortran) order: the first axis varies fastest.
    F,
}

impl Order {
    /// Parse from the `"C"`/`"F"` strings used in array descriptors.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "C" => Some(Self::C),
            "F" => Some(Self::F),
            _ => None,
        }
    }

    /// Render back to the `"C"`/`"F"` string used in array descriptors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::F => "F",
        }
    }

    /// Compute the strides (in elements) for `shape` under this order.
    #[must_use]
    pub fn strides(self, shape: &[u64]) -> Vec<u64> {
        let n = shape.len();
        let mut strides = vec![1u64; n];
        match self {
            Self::C => {
                for i in (0..n.saturating_sub(1)).rev() {
                    strides[i] = strides[i + 1] * shape[i + 1];
                }
            }
            Self::F => {
                for i in 1..n {
                    strides[i] = strides[i - 1] * shape[i - 1];
                }
            }
        }
        strides
    }

    /// Compute the linear element offset of `coords` within `shape` under this order.
    #[must_use]
    pub fn linear_offset(self, coords: &[u64], shape: &[u64]) -> u64 {
        let strides = self.strides(shape);
        coords.iter().zip(strides.iter()).map(|(c, s)| c * s).sum()
    }
}

/// The total number of elements described by `shape`.
#[must_use]
pub fn num_elements(shape: &[u64]) -> u64 {
    shape.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_order_strides() {
        assert_eq!(Order::C.strides(&[2, 3, 4]), vec![12, 4, 1]);
    }

    #[test]
    fn f_order_strides() {
        assert_eq!(Order::F.strides(&[2, 3, 4]), vec![1, 2, 6]);
    }

    #[test]
    fn linear_offset_matches_manual_computation() {
        let shape = [2, 3];
        assert_eq!(Order::C.linear_offset(&[1, 2], &shape), 5);
        assert_eq!(Order::F.linear_offset(&[1, 2], &shape), 5);
        assert_eq!(Order::C.linear_offset(&[0, 0], &shape), 0);
    }
}
