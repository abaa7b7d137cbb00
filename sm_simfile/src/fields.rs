//! Explicit record ↔ MSD field tables.
//!
//! Each record type registers an ordered list of fields with encode/decode
//! functions; tags map to field names through an override table for the
//! legacy StepMania names, else by case convention.

use crate::msd::MsdItem;
use crate::SimfileError;

/// One record field's mapping to an MSD tag.
///
/// `encode` returns `None` when the field is absent and should be skipped.
pub(crate) struct Field<T> {
    pub name: &'static str,
    pub encode: fn(&T) -> Result<Option<String>, SimfileError>,
    pub decode: fn(&mut T, &str) -> Result<(), SimfileError>,
}

/// Field names whose tags aren't recoverable by case convention alone:
/// legacy StepMania names plus every underscored field (lowercasing the tag
/// can't reinsert the underscore).
const TAG_OVERRIDES: &[(&str, &str)] = &[
    // TimingData
    ("bpm", "BPMS"),
    ("preview_start", "SAMPLESTART"),
    ("preview_length", "SAMPLELENGTH"),
    ("combo_multipliers", "COMBOS"),
    ("background_changes", "BGCHANGES"),
    ("foreground_changes", "FGCHANGES"),
    ("display_bpm", "DISPLAYBPM"),
    ("time_signatures", "TIMESIGNATURES"),
    ("tick_counts", "TICKCOUNTS"),
    // Chart
    ("game_type", "STEPSTYPE"),
    ("chart_name", "CHARTNAME"),
    ("chart_style", "CHARTSTYLE"),
    // Simfile
    ("title_transliterated", "TITLETRANSLIT"),
    ("subtitle_transliterated", "SUBTITLETRANSLIT"),
    ("artist_transliterated", "ARTISTTRANSLIT"),
    ("lyrics", "LYRICSPATH"),
    ("preview_video", "PREVIEWVID"),
    ("cd_title", "CDTITLE"),
    ("cd_image", "CDIMAGE"),
    ("disc_image", "DISCIMAGE"),
];

pub(crate) fn tag_for(name: &str) -> String {
    for (n, t) in TAG_OVERRIDES {
        if *n == name {
            return (*t).to_string();
        }
    }
    name.to_uppercase().replace('_', "")
}

pub(crate) fn name_for(tag: &str) -> String {
    for (n, t) in TAG_OVERRIDES {
        if *t == tag {
            return (*n).to_string();
        }
    }
    tag.to_lowercase()
}

/// Walk the field table in declared order, emitting one item per present
/// field.
pub(crate) fn record_to_msd<T>(
    record: &T,
    fields: &[Field<T>],
) -> Result<Vec<MsdItem>, SimfileError> {
    let mut items = Vec::new();
    for field in fields {
        if let Some(value) = (field.encode)(record)? {
            items.push(MsdItem::new(tag_for(field.name), value)?);
        }
    }
    Ok(items)
}

/// Decode items into `record` through the field table.
///
/// Items whose tag maps to no known field are returned in input order; the
/// caller decides whether leftovers are expected (chart timing overrides) or
/// corruption.
pub(crate) fn msd_to_record<T>(
    items: &[MsdItem],
    record: &mut T,
    fields: &[Field<T>],
) -> Result<Vec<MsdItem>, SimfileError> {
    let mut excess = Vec::new();
    'items: for item in items {
        let name = name_for(item.tag());
        for field in fields {
            if field.name == name {
                (field.decode)(record, item.value())?;
                continue 'items;
            }
        }
        excess.push(item.clone());
    }
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_naming() {
        assert_eq!(tag_for("title"), "TITLE");
        assert_eq!(tag_for("chart_name"), "CHARTNAME");
        assert_eq!(tag_for("title_transliterated"), "TITLETRANSLIT");
        assert_eq!(tag_for("game_type"), "STEPSTYPE");

        assert_eq!(name_for("TITLE"), "title");
        assert_eq!(name_for("CHARTNAME"), "chart_name");
        assert_eq!(name_for("TITLETRANSLIT"), "title_transliterated");
        assert_eq!(name_for("STEPSTYPE"), "game_type");
        assert_eq!(name_for("SOMETHINGELSE"), "somethingelse");
    }
}
