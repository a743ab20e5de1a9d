//! Selection layer over the reference-data cache.
//!
//! Three pieces sit between a form's select controls and the shared cache:
//!
//! - [`guard`]: the render-time projection that never lets a control
//!   display a value absent from its current option set;
//! - [`SelectionBinding`] and [`DependentSelectionController`]: per-form
//!   state driving the parent → child cascade (region → locality) with
//!   epoch-based discard of superseded loads;
//! - [`CatalogService`] and [`OptionsHandle`]: the watch-channel
//!   subscription surface a form binds a plain (non-dependent) dropdown
//!   to, plus the invalidation entry points the CRUD layer calls after
//!   successful mutations.
//!
//! Controllers are instantiated once per dependent pair per open form and
//! never shared; only the underlying cache entries are shared.

pub mod binding;
pub mod controller;
pub mod guard;
pub mod subscription;

pub use binding::SelectionBinding;
pub use controller::{DependentSelectionController, SelectionState};
pub use guard::display_value;
pub use subscription::{CatalogService, OptionsHandle, OptionsState};
