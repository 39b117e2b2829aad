//! Formatting helpers shared by the encoder and the reduction output.

/// Format a float the way the chassis command interpreter expects it.
///
/// Produces the shortest decimal string that round-trips to the same
/// `f64`, always with a fractional part for integral values. This is the
/// format the chassis firmware has always been fed.
///
/// # Example
///
/// ```
/// use zappy_core::format_wire_float;
///
/// assert_eq!(format_wire_float(500.0), "500.0");
/// assert_eq!(format_wire_float(11000.0), "11000.0");
/// assert_eq!(format_wire_float(12.5), "12.5");
/// assert_eq!(format_wire_float(-1000.0), "-1000.0");
/// ```
pub fn format_wire_float(value: f64) -> String {
    // Debug formatting of f64 is shortest-round-trip and keeps ".0".
    format!("{value:?}")
}
