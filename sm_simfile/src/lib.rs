use thiserror::Error;

pub mod msd;
pub mod structs;

mod codec;
mod fields;

pub use codec::{parse_simfile, simfile_to_sm, simfile_to_ssc};
pub use structs::{BeatMap, Chart, Simfile, TimingData};

use msd::MsdError;
use sm_data::NoteError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimfileError {
    #[error(transparent)]
    Msd(#[from] MsdError),

    #[error(transparent)]
    Notes(#[from] NoteError),

    #[error("extraneous tags {0:?} in simfile header")]
    ExtraHeaderTags(Vec<String>),

    #[error("extraneous tags {0:?} in chart")]
    ExtraChartTags(Vec<String>),

    #[error("expected NOTES tag, but got '{0}' instead")]
    ExpectedNotes(String),

    #[error("unexpected content in NOTEDATA tag")]
    NoteDataContent,

    #[error("chart is missing fields")]
    ChartFields,

    #[error("field '{field}': invalid value '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("timing entry '{0}' is not in key=value form")]
    TimingEntry(String),

    #[error("split timing charts cannot be converted to sm")]
    SplitTiming,
}

#[cfg(test)]
mod tests;
