pub mod notedata;
pub mod sm_text;

pub use notedata::{DensityInfo, NoteData, NoteError, NoteRow, OverlayMode};
pub use sm_text::{notedata_to_sm, sm_to_notedata};

/// Canonical time unit for note placement, in beats.
///
/// Exact rational arithmetic: comparisons and arithmetic never drift, so two
/// positions computed along different paths compare equal iff they denote the
/// same beat.
pub type Position = num_rational::Rational64;
