//! Per-field selection binding.
//!
//! Owns the committed value of one select control. The committed value is
//! changed by exactly three things: explicit user interaction, the
//! controller's parent-change rule (a parent change clears its dependent
//! child), and the original-value restore on load success for edit flows.
//! Background refreshes never touch it - display-time coercion is the
//! guard's job.

use refdata_core::OptionItem;

use crate::guard::display_value;

/// Transient selection state of a single form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionBinding {
    committed: Option<String>,
    /// Value the record was saved with, carried through edit flows. When a
    /// load resolves and this value is among the options, it is restored
    /// as committed - the one sanctioned bypass of render-time coercion.
    original: Option<String>,
}

impl SelectionBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding for an edit flow, seeded with the record's saved value.
    pub fn with_original(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            committed: Some(original.clone()),
            original: Some(original),
        }
    }

    pub fn committed(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Explicit user interaction: pick a value.
    pub fn user_select(&mut self, value: impl Into<String>) {
        self.committed = Some(value.into());
        // Once the user has touched the field, the saved value no longer
        // outranks their choice.
        self.original = None;
    }

    /// Explicit user interaction: clear the field.
    pub fn user_clear(&mut self) {
        self.committed = None;
        self.original = None;
    }

    /// Controller-driven clear on parent change. Keeps `original` so an
    /// edit flow can still restore it if the user returns to the saved
    /// parent.
    pub(crate) fn clear_committed(&mut self) {
        self.committed = None;
    }

    /// On load success: restore the saved value when the fresh options
    /// still contain it. Returns whether a restore happened.
    pub fn restore_original_if_present(&mut self, options: &[OptionItem]) -> bool {
        match &self.original {
            Some(original) if options.iter().any(|o| &o.id == original) => {
                self.committed = Some(original.clone());
                true
            }
            _ => false,
        }
    }

    /// Render-time value, projected through the safe-selection guard.
    pub fn display<'a>(&'a self, options: &[OptionItem]) -> Option<&'a str> {
        display_value(self.committed(), options)
    }
}
