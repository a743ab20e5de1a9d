//! Safe-selection guard.
//!
//! A pure render-time projection: the displayed value of a select control
//! is its bound value only when that value exists in the currently
//! resolved option set, otherwise the unselected sentinel (`None`). The
//! projection runs on every render and never mutates the committed form
//! value - a selection that is merely not-yet-loaded must survive the
//! window between form open and cache resolution.

use refdata_core::OptionItem;

/// Project a bound value onto the resolved options.
///
/// Returns `current` iff some option carries that id; `None` is the
/// "unselected" sentinel. Never returns a value absent from `options`.
pub fn display_value<'a>(current: Option<&'a str>, options: &[OptionItem]) -> Option<&'a str> {
    match current {
        Some(value) if options.iter().any(|o| o.id == value) => Some(value),
        _ => None,
    }
}
