//! Maps `Box<dyn Error>` from the transport boundary to typed `SicsError`.
//!
//! `sics_traits::Transport` returns boxed errors; this module narrows them,
//! with an optional feature-gated path for `sics_hardware::HwError`.

use crate::error::SicsError;

/// Map a trait-boundary error to a typed `SicsError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> SicsError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<sics_hardware::error::HwError>() {
            return match hw {
                sics_hardware::error::HwError::NotOpen
                | sics_hardware::error::HwError::Unplugged => {
                    SicsError::Disconnected(hw.to_string())
                }
                other => SicsError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("not open") || lower.contains("disconnected") || lower.contains("broken pipe")
    {
        SicsError::Disconnected(s)
    } else {
        SicsError::Transport(s)
    }
}
