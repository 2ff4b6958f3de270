//! Allocation-unit parsing and capacity conversion.
//!
//! OVF expresses disk capacities and memory quantities as a numeric value
//! plus an allocation-unit string in the CIM programmatic-unit form
//! `byte * 2^<exponent>`, e.g. `byte * 2^30` for GB. This module parses
//! that form and normalizes quantities to GB or MB.

use crate::error::{Error, Result};

/// Exponent for MB-scale units (`byte * 2^20`).
pub const MB_EXPONENT: u32 = 20;
/// Exponent for GB-scale units (`byte * 2^30`).
pub const GB_EXPONENT: u32 = 30;
/// Exponent for TB-scale units (`byte * 2^40`).
pub const TB_EXPONENT: u32 = 40;

/// Parse an allocation-unit string into its byte-scale exponent.
///
/// Accepts `byte * 2^<exponent>` with whitespace tolerated around the `*`
/// and the `^`, and at either end (e.g. `"byte * 2 ^ 30   "`). Only the
/// MB (20), GB (30), and TB (40) exponents are recognized.
///
/// # Errors
///
/// Returns [`Error::InvalidAllocationUnit`] for an empty string, a string
/// not matching the pattern, or an unrecognized exponent.
pub fn parse_allocation_units(units: &str) -> Result<u32> {
    let rest = units.trim();
    let rest = rest
        .strip_prefix("byte")
        .ok_or_else(|| Error::invalid_allocation_unit(units))?;
    let rest = rest
        .trim_start()
        .strip_prefix('*')
        .ok_or_else(|| Error::invalid_allocation_unit(units))?;
    let rest = rest
        .trim_start()
        .strip_prefix('2')
        .ok_or_else(|| Error::invalid_allocation_unit(units))?;
    let rest = rest
        .trim_start()
        .strip_prefix('^')
        .ok_or_else(|| Error::invalid_allocation_unit(units))?;

    let exponent = rest
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::invalid_allocation_unit(units))?;

    match exponent {
        MB_EXPONENT | GB_EXPONENT | TB_EXPONENT => Ok(exponent),
        _ => Err(Error::invalid_allocation_unit(units)),
    }
}

/// Convert a textual capacity plus allocation units to whole GB.
///
/// MB-scale capacities divide by 1024 flooring, except that a positive
/// sub-GB quantity yields 1 GB rather than 0 (a 1 MB disk still needs a
/// 1 GB image). A capacity of 0 stays 0.
///
/// # Errors
///
/// Returns [`Error::InvalidCapacityValue`] if the capacity is negative,
/// not numeric, or the TB conversion overflows, and
/// [`Error::InvalidAllocationUnit`] for a bad unit string.
pub fn capacity_in_gb(capacity: &str, units: &str) -> Result<u64> {
    let exponent = parse_allocation_units(units)?;
    let quantity = capacity
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::invalid_capacity(capacity))?;

    match exponent {
        MB_EXPONENT => {
            if quantity == 0 {
                Ok(0)
            } else {
                Ok((quantity / 1024).max(1))
            }
        }
        GB_EXPONENT => Ok(quantity),
        TB_EXPONENT => quantity
            .checked_mul(1024)
            .ok_or_else(|| Error::invalid_capacity(capacity)),
        _ => unreachable!("parse_allocation_units only returns 20, 30 or 40"),
    }
}

/// Scale a raw quantity to MB according to its allocation units.
///
/// Used for memory items, whose `VirtualQuantity` is denominated by the
/// item's `AllocationUnits` (e.g. quantity 7 with `byte * 2^30` is 7 GB,
/// i.e. 7168 MB).
///
/// # Errors
///
/// Returns [`Error::InvalidAllocationUnit`] for a bad unit string and
/// [`Error::InvalidCapacityValue`] if the scaled value overflows.
pub fn quantity_in_mb(quantity: u64, units: &str) -> Result<u64> {
    let exponent = parse_allocation_units(units)?;
    let scale = 1u64 << (exponent - MB_EXPONENT);
    quantity
        .checked_mul(scale)
        .ok_or_else(|| Error::invalid_capacity(quantity.to_string()))
}
