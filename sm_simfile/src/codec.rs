//! Assembly and disassembly of whole simfiles through the MSD layer.

use sm_data::{notedata_to_sm, sm_to_notedata};

use crate::fields::{msd_to_record, record_to_msd, Field};
use crate::msd::{msd_to_text, parse_msd, MsdItem};
use crate::structs::{BeatMap, Chart, Simfile, TimingData};
use crate::SimfileError;

// why is the convention this particular string?
const SM_INDENT: &str = "     ";

const SSC_VERSION: &str = "0.83";

fn beat_map_to_string(map: &BeatMap) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn parse_beat_map(value: &str) -> Result<BeatMap, SimfileError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            match entry.split_once('=') {
                Some((k, v)) => Ok((k.to_string(), v.to_string())),
                None => Err(SimfileError::TimingEntry(entry.to_string())),
            }
        })
        .collect()
}

const TIMING_FIELDS: &[Field<TimingData>] = &[
    Field {
        name: "bpm",
        encode: |t| Ok(Some(beat_map_to_string(&t.bpm))),
        decode: |t, v| {
            t.bpm = parse_beat_map(v)?;
            Ok(())
        },
    },
    Field {
        name: "offset",
        encode: |t| Ok(Some(t.offset.clone())),
        decode: |t, v| {
            t.offset = v.to_string();
            Ok(())
        },
    },
    Field {
        name: "stops",
        encode: |t| Ok(Some(beat_map_to_string(&t.stops))),
        decode: |t, v| {
            t.stops = parse_beat_map(v)?;
            Ok(())
        },
    },
    Field {
        name: "delays",
        encode: |t| Ok(t.delays.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.delays = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "warps",
        encode: |t| Ok(t.warps.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.warps = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "time_signatures",
        encode: |t| Ok(t.time_signatures.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.time_signatures = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "tick_counts",
        encode: |t| Ok(t.tick_counts.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.tick_counts = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "combo_multipliers",
        encode: |t| Ok(t.combo_multipliers.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.combo_multipliers = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "speeds",
        encode: |t| Ok(t.speeds.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.speeds = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "scrolls",
        encode: |t| Ok(t.scrolls.as_ref().map(beat_map_to_string)),
        decode: |t, v| {
            t.scrolls = Some(parse_beat_map(v)?);
            Ok(())
        },
    },
    Field {
        name: "fakes",
        encode: |t| Ok(t.fakes.clone()),
        decode: |t, v| {
            t.fakes = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "labels",
        encode: |t| Ok(Some(beat_map_to_string(&t.labels))),
        decode: |t, v| {
            t.labels = parse_beat_map(v)?;
            Ok(())
        },
    },
    Field {
        name: "preview_start",
        encode: |t| Ok(Some(t.preview_start.clone())),
        decode: |t, v| {
            t.preview_start = v.to_string();
            Ok(())
        },
    },
    Field {
        name: "preview_length",
        encode: |t| Ok(Some(t.preview_length.clone())),
        decode: |t, v| {
            t.preview_length = v.to_string();
            Ok(())
        },
    },
    Field {
        name: "display_bpm",
        encode: |t| Ok(t.display_bpm.clone()),
        decode: |t, v| {
            t.display_bpm = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "background_changes",
        encode: |t| Ok(Some(beat_map_to_string(&t.background_changes))),
        decode: |t, v| {
            t.background_changes = parse_beat_map(v)?;
            Ok(())
        },
    },
    Field {
        name: "foreground_changes",
        encode: |t| Ok(Some(beat_map_to_string(&t.foreground_changes))),
        decode: |t, v| {
            t.foreground_changes = parse_beat_map(v)?;
            Ok(())
        },
    },
    Field {
        name: "keysounds",
        encode: |t| Ok(t.keysounds.clone()),
        decode: |t, v| {
            t.keysounds = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "attacks",
        encode: |t| Ok(t.attacks.clone()),
        decode: |t, v| {
            t.attacks = Some(v.to_string());
            Ok(())
        },
    },
];

const CHART_FIELDS: &[Field<Chart>] = &[
    Field {
        name: "game_type",
        encode: |c| Ok(Some(c.game_type.clone())),
        decode: |c, v| {
            c.game_type = v.to_string();
            Ok(())
        },
    },
    Field {
        name: "meter",
        encode: |c| Ok(c.meter.map(|m| m.to_string())),
        decode: |c, v| {
            c.meter = Some(v.trim().parse().map_err(|_| SimfileError::InvalidField {
                field: "meter",
                value: v.to_string(),
            })?);
            Ok(())
        },
    },
    Field {
        name: "difficulty",
        encode: |c| Ok(c.difficulty.clone()),
        decode: |c, v| {
            c.difficulty = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "credit",
        encode: |c| Ok(c.credit.clone()),
        decode: |c, v| {
            c.credit = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "description",
        encode: |c| Ok(c.description.clone()),
        decode: |c, v| {
            c.description = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "chart_name",
        encode: |c| Ok(c.chart_name.clone()),
        decode: |c, v| {
            c.chart_name = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "chart_style",
        encode: |c| Ok(c.chart_style.clone()),
        decode: |c, v| {
            c.chart_style = Some(v.to_string());
            Ok(())
        },
    },
    Field {
        name: "notes",
        encode: |c| Ok(Some(format!("\n{}\n", notedata_to_sm(&c.notes)?))),
        decode: |c, v| {
            c.notes = sm_to_notedata(v)?;
            Ok(())
        },
    },
];

fn decode_opt(slot: &mut Option<String>, value: &str) {
    // swallow empty optional strings; prevents empty paths from turning
    // into spurious values downstream
    *slot = if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    };
}

macro_rules! simfile_opt_field {
    ($name:literal, $field:ident) => {
        Field {
            name: $name,
            encode: |s| Ok(s.$field.clone()),
            decode: |s, v| {
                decode_opt(&mut s.$field, v);
                Ok(())
            },
        }
    };
}

const SIMFILE_FIELDS: &[Field<Simfile>] = &[
    Field {
        name: "title",
        encode: |s| Ok(Some(s.title.clone())),
        decode: |s, v| {
            s.title = v.to_string();
            Ok(())
        },
    },
    simfile_opt_field!("subtitle", subtitle),
    simfile_opt_field!("artist", artist),
    simfile_opt_field!("title_transliterated", title_transliterated),
    simfile_opt_field!("subtitle_transliterated", subtitle_transliterated),
    simfile_opt_field!("artist_transliterated", artist_transliterated),
    simfile_opt_field!("genre", genre),
    simfile_opt_field!("credit", credit),
    simfile_opt_field!("music", music),
    simfile_opt_field!("banner", banner),
    simfile_opt_field!("background", background),
    simfile_opt_field!("lyrics", lyrics),
    simfile_opt_field!("cd_title", cd_title),
    simfile_opt_field!("preview_video", preview_video),
    simfile_opt_field!("jacket", jacket),
    simfile_opt_field!("cd_image", cd_image),
    simfile_opt_field!("disc_image", disc_image),
    simfile_opt_field!("origin", origin),
    Field {
        name: "selectable",
        encode: |s| Ok(Some(s.selectable.clone())),
        decode: |s, v| {
            s.selectable = v.to_string();
            Ok(())
        },
    },
];

fn msd_to_timing(items: &[MsdItem]) -> Result<(TimingData, Vec<MsdItem>), SimfileError> {
    let mut timing = TimingData::default();
    let excess = msd_to_record(items, &mut timing, TIMING_FIELDS)?;
    Ok((timing, excess))
}

fn msd_to_chart(items: &[MsdItem]) -> Result<Chart, SimfileError> {
    let mut chart = Chart::default();
    let mut excess = msd_to_record(items, &mut chart, CHART_FIELDS)?;
    // radar values are derived from note data, not a property of it
    excess.retain(|i| i.tag() != "RADARVALUES");
    if !excess.is_empty() {
        // don't create chart-specific timing unless we're sure we need it
        let (timing, rest) = msd_to_timing(&excess)?;
        chart.timing_data = Some(timing);
        excess = rest;
    }
    if !excess.is_empty() {
        return Err(SimfileError::ExtraChartTags(
            excess.iter().map(|i| i.tag().to_string()).collect(),
        ));
    }
    Ok(chart)
}

fn msd_to_simfile_skel(items: &[MsdItem]) -> Result<Simfile, SimfileError> {
    let mut simfile = Simfile::default();
    let excess = msd_to_record(items, &mut simfile, SIMFILE_FIELDS)?;
    let (timing, mut excess) = msd_to_timing(&excess)?;
    simfile.timing_data = timing;
    excess.retain(|i| !i.tag().contains("VERSION"));
    if !excess.is_empty() {
        return Err(SimfileError::ExtraHeaderTags(
            excess.iter().map(|i| i.tag().to_string()).collect(),
        ));
    }
    Ok(simfile)
}

fn push_sm_chart(simfile: &mut Simfile, item: &MsdItem) -> Result<(), SimfileError> {
    let fields: Vec<&str> = item.value().splitn(6, ':').map(str::trim).collect();
    let [steps_type, description, difficulty, meter, _radar, notes_text] = fields.as_slice()
    else {
        return Err(SimfileError::ChartFields);
    };
    simfile.charts.push(Chart {
        game_type: steps_type.to_string(),
        description: Some(description.to_string()),
        difficulty: Some(difficulty.to_string()),
        meter: Some(meter.parse().map_err(|_| SimfileError::InvalidField {
            field: "meter",
            value: meter.to_string(),
        })?),
        notes: sm_to_notedata(notes_text)?,
        ..Chart::default()
    });
    Ok(())
}

enum ParsingState {
    Begin,
    ChartsSm(Simfile),
    ChartsSsc(Simfile),
}

/// Convert simfile text in sm or ssc format into a [`Simfile`].
///
/// Single pass over the item stream; the `NOTES` / `NOTEDATA` sentinel tags
/// switch from header mode into the respective chart mode.
pub fn parse_simfile(text: &str) -> Result<Simfile, SimfileError> {
    let mut curr_items: Vec<MsdItem> = Vec::new();
    let mut state = ParsingState::Begin;

    for item in parse_msd(text) {
        let item = item?;
        state = match state {
            ParsingState::Begin => match item.tag() {
                "NOTES" => {
                    let mut simfile = msd_to_simfile_skel(&curr_items)?;
                    curr_items.clear();
                    push_sm_chart(&mut simfile, &item)?;
                    ParsingState::ChartsSm(simfile)
                }
                "NOTEDATA" => {
                    if !item.value().is_empty() {
                        return Err(SimfileError::NoteDataContent);
                    }
                    let simfile = msd_to_simfile_skel(&curr_items)?;
                    curr_items.clear();
                    ParsingState::ChartsSsc(simfile)
                }
                _ => {
                    curr_items.push(item);
                    ParsingState::Begin
                }
            },
            ParsingState::ChartsSm(mut simfile) => {
                if item.tag() != "NOTES" {
                    return Err(SimfileError::ExpectedNotes(item.tag().to_string()));
                }
                push_sm_chart(&mut simfile, &item)?;
                ParsingState::ChartsSm(simfile)
            }
            ParsingState::ChartsSsc(mut simfile) => {
                if item.tag() == "NOTEDATA" {
                    if !item.value().is_empty() {
                        return Err(SimfileError::NoteDataContent);
                    }
                    simfile.charts.push(msd_to_chart(&curr_items)?);
                    curr_items.clear();
                } else {
                    curr_items.push(item);
                }
                ParsingState::ChartsSsc(simfile)
            }
        };
    }

    match state {
        ParsingState::Begin => msd_to_simfile_skel(&curr_items),
        ParsingState::ChartsSm(simfile) => Ok(simfile),
        ParsingState::ChartsSsc(mut simfile) => {
            simfile.charts.push(msd_to_chart(&curr_items)?);
            Ok(simfile)
        }
    }
}

fn simfile_skel_to_msd(simfile: &Simfile) -> Result<Vec<MsdItem>, SimfileError> {
    let mut items = vec![MsdItem::new("VERSION", SSC_VERSION)?];
    items.extend(record_to_msd(simfile, SIMFILE_FIELDS)?);
    items.extend(record_to_msd(&simfile.timing_data, TIMING_FIELDS)?);
    Ok(items)
}

fn chart_to_msd(chart: &Chart) -> Result<Vec<MsdItem>, SimfileError> {
    let mut items = vec![MsdItem::new("NOTEDATA", "")?];
    if let Some(timing) = &chart.timing_data {
        items.extend(record_to_msd(timing, TIMING_FIELDS)?);
    }
    items.extend(record_to_msd(chart, CHART_FIELDS)?);
    Ok(items)
}

fn chart_header() -> String {
    format!("\n// {}\n", "-".repeat(30))
}

pub fn simfile_to_ssc(simfile: &Simfile) -> Result<String, SimfileError> {
    let mut text = msd_to_text(&simfile_skel_to_msd(simfile)?);
    for chart in &simfile.charts {
        text.push_str(&chart_header());
        text.push_str(&msd_to_text(&chart_to_msd(chart)?));
    }
    Ok(text)
}

pub fn simfile_to_sm(simfile: &Simfile) -> Result<String, SimfileError> {
    if simfile.is_split_timing() {
        return Err(SimfileError::SplitTiming);
    }

    let mut text = msd_to_text(&simfile_skel_to_msd(simfile)?);
    for chart in &simfile.charts {
        let notes = format!(
            "\n\
             {SM_INDENT}{}:\n\
             {SM_INDENT}{}:\n\
             {SM_INDENT}{}:\n\
             {SM_INDENT}{}:\n\
             {SM_INDENT}0,0,0,0,0:\n\
             {}",
            chart.game_type,
            chart.description.as_deref().unwrap_or(""),
            chart.difficulty.as_deref().unwrap_or(""),
            // sm charts must carry a meter; 1 is StepMania's own fallback
            chart.meter.unwrap_or(1),
            notedata_to_sm(&chart.notes)?,
        );
        text.push_str(&MsdItem::new("NOTES", notes)?.to_string());
    }
    Ok(text)
}
