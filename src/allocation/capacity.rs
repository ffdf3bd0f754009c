//! Capacity Normalization
//!
//! ZFS volblocksize and recordsize are powers of two between 512B and 1MiB,
//! so a size aligned to 1MiB (or 1GiB for large volumes) is always a clean
//! multiple of any valid block size.

/// 1 MiB
pub const MIB: u64 = 1024 * 1024;

/// 1 GiB
pub const GIB: u64 = 1024 * MIB;

/// Round a requested size up to its allocation unit.
///
/// Sizes up to and including 1GiB round to the next MiB, larger sizes to the
/// next GiB. Saturates instead of overflowing near `u64::MAX`.
#[inline]
pub fn normalize_capacity(bytes: u64) -> u64 {
    let unit = if bytes > GIB { GIB } else { MIB };
    round_up(bytes, unit)
}

#[inline]
fn round_up(bytes: u64, unit: u64) -> u64 {
    match bytes % unit {
        0 => bytes,
        rem => bytes.checked_add(unit - rem).unwrap_or(u64::MAX - u64::MAX % unit),
    }
}
