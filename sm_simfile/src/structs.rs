//! Simfile record types.

use sm_data::NoteData;

/// Ordered `beat=value` pairs exactly as they appear inside a timing tag.
///
/// Values stay as their decimal strings: the toolkit never computes with
/// them, and preserving the text is what keeps round-trips lossless.
pub type BeatMap = Vec<(String, String)>;

/// Timing data (BPMs, stops, ...) of possibly part of a simfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingData {
    // sm, minimum information
    pub bpm: BeatMap,
    pub offset: String,
    pub stops: BeatMap,

    // ssc
    pub delays: Option<BeatMap>,
    pub warps: Option<BeatMap>,
    pub time_signatures: Option<BeatMap>,
    pub tick_counts: Option<BeatMap>,
    pub combo_multipliers: Option<BeatMap>,
    pub speeds: Option<BeatMap>,
    pub scrolls: Option<BeatMap>,
    pub fakes: Option<String>,

    pub labels: BeatMap,

    // sm
    pub preview_start: String,
    pub preview_length: String,
    pub display_bpm: Option<String>,

    // rarely used, sm
    pub background_changes: BeatMap,
    pub foreground_changes: BeatMap,

    pub keysounds: Option<String>,
    pub attacks: Option<String>,
}

impl Default for TimingData {
    fn default() -> Self {
        Self {
            // common default value
            bpm: vec![("0".to_string(), "120".to_string())],
            offset: "0".to_string(),
            stops: Vec::new(),
            delays: None,
            warps: None,
            time_signatures: None,
            tick_counts: None,
            combo_multipliers: None,
            speeds: None,
            scrolls: None,
            fakes: None,
            labels: Vec::new(),
            preview_start: "0".to_string(),
            preview_length: "0".to_string(),
            display_bpm: None,
            background_changes: Vec::new(),
            foreground_changes: Vec::new(),
            keysounds: None,
            attacks: None,
        }
    }
}

/// One playable chart: note data plus chart-level metadata.
///
/// Radar values are derived from the note data and deliberately not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    pub game_type: String,

    pub meter: Option<i32>,
    // 'Edit' is the only difficulty allowed multiple times
    pub difficulty: Option<String>,

    pub credit: Option<String>,
    pub description: Option<String>,
    pub chart_name: Option<String>,
    pub chart_style: Option<String>,

    /// Chart-level timing override ("split timing").
    pub timing_data: Option<TimingData>,

    pub notes: NoteData,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            game_type: "unknown".to_string(),
            meter: None,
            difficulty: Some("Edit".to_string()),
            credit: None,
            description: None,
            chart_name: None,
            chart_style: None,
            timing_data: None,
            notes: NoteData::default(),
        }
    }
}

/// Song and artist display metadata, and associated charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simfile {
    pub title: String,
    pub subtitle: Option<String>,
    pub artist: Option<String>,
    pub title_transliterated: Option<String>,
    pub subtitle_transliterated: Option<String>,
    pub artist_transliterated: Option<String>,
    pub genre: Option<String>,
    pub credit: Option<String>,
    pub music: Option<String>,

    // sm resources
    pub banner: Option<String>,
    pub background: Option<String>,
    pub lyrics: Option<String>,
    pub cd_title: Option<String>,

    // ssc resources
    pub preview_video: Option<String>,
    pub jacket: Option<String>,
    pub cd_image: Option<String>,
    pub disc_image: Option<String>,

    pub origin: Option<String>,

    pub selectable: String,

    pub timing_data: TimingData,

    pub charts: Vec<Chart>,
}

impl Default for Simfile {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: None,
            artist: None,
            title_transliterated: None,
            subtitle_transliterated: None,
            artist_transliterated: None,
            genre: None,
            credit: None,
            music: None,
            banner: None,
            background: None,
            lyrics: None,
            cd_title: None,
            preview_video: None,
            jacket: None,
            cd_image: None,
            disc_image: None,
            origin: None,
            selectable: "YES".to_string(),
            timing_data: TimingData::default(),
            charts: Vec::new(),
        }
    }
}

impl Simfile {
    /// 'Split timing': any chart carries its own timing data instead of
    /// inheriting the simfile-level data.
    pub fn is_split_timing(&self) -> bool {
        self.charts.iter().any(|c| c.timing_data.is_some())
    }
}
