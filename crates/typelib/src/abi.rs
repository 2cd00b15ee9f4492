// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 typelib contributors

//! Target ABI parameters used when sizing and aligning types.
//!
//! Importers compute field offsets for their target; the registry only needs
//! the handful of widths that cannot be derived from the type graph itself.

/// Layout rules of the target a registry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abi {
    /// Size (and alignment) of a data pointer.
    pub pointer_size: usize,
    /// Storage width of enumerations.
    pub enum_size: usize,
    /// Upper bound on the alignment of any scalar (4 for i386 doubles).
    pub max_scalar_alignment: usize,
}

impl Abi {
    /// 64-bit Unix (x86_64, aarch64).
    pub const LP64: Self = Self {
        pointer_size: 8,
        enum_size: 4,
        max_scalar_alignment: 8,
    };

    /// 32-bit x86 System V: 8-byte scalars are 4-byte aligned.
    pub const I386: Self = Self {
        pointer_size: 4,
        enum_size: 4,
        max_scalar_alignment: 4,
    };

    /// 32-bit ARM EABI.
    pub const ILP32: Self = Self {
        pointer_size: 4,
        enum_size: 4,
        max_scalar_alignment: 8,
    };

    /// ABI of the running process.
    pub fn host() -> Self {
        Self {
            pointer_size: std::mem::size_of::<usize>(),
            enum_size: std::mem::size_of::<std::os::raw::c_int>(),
            max_scalar_alignment: std::mem::align_of::<u64>(),
        }
    }

    /// Natural alignment of a scalar of `size` bytes on this ABI.
    pub fn scalar_alignment(&self, size: usize) -> usize {
        if size == 0 {
            return 1;
        }
        size.checked_next_power_of_two()
            .map_or(self.max_scalar_alignment, |natural| natural.min(self.max_scalar_alignment))
    }
}

impl Default for Abi {
    fn default() -> Self {
        Self::host()
    }
}

/// Rounds `offset` up to a multiple of `align`.
pub const fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        return offset;
    }
    offset.div_ceil(align) * align
}

/// [`align_up`] returning `None` instead of overflowing.
pub const fn checked_align_up(offset: usize, align: usize) -> Option<usize> {
    if align <= 1 {
        return Some(offset);
    }
    offset.checked_next_multiple_of(align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_alignment_is_capped() {
        assert_eq!(Abi::LP64.scalar_alignment(8), 8);
        assert_eq!(Abi::I386.scalar_alignment(8), 4);
        assert_eq!(Abi::I386.scalar_alignment(2), 2);
        assert_eq!(Abi::LP64.scalar_alignment(3), 4);
        assert_eq!(Abi::LP64.scalar_alignment(0), 1);
        assert_eq!(Abi::LP64.scalar_alignment(usize::MAX), 8);
        assert_eq!(Abi::I386.scalar_alignment(usize::MAX / 2 + 2), 4);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(9, 4), 12);
        assert_eq!(align_up(5, 1), 5);
        assert_eq!(align_up(5, 0), 5);
    }

    #[test]
    fn test_checked_align_up_overflow() {
        assert_eq!(checked_align_up(9, 4), Some(12));
        assert_eq!(checked_align_up(usize::MAX, 1), Some(usize::MAX));
        assert_eq!(checked_align_up(usize::MAX - 2, 8), None);
    }

    #[test]
    fn test_host_matches_process() {
        let abi = Abi::host();
        assert_eq!(abi.pointer_size, std::mem::size_of::<*const u8>());
        assert_eq!(abi.enum_size, 4);
    }
}
