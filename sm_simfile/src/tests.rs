use crate::msd::{msd_to_text, parse_msd, MsdError, MsdItem};
use crate::{parse_simfile, simfile_to_sm, simfile_to_ssc, SimfileError};

fn items(text: &str) -> Vec<MsdItem> {
    parse_msd(text).collect::<Result<Vec<_>, _>>().unwrap()
}

const SOME_TEXT: &str = "#SIMPLETAG:SIMPLEVALUE;\n\
#LONGTAGTHANKSplzzzzzzzzzzzzzzzzzzzz:SHORTVALUE;\n\
#ATAG:VALUE\n\
ON\n\
FOUR\n\
LINES;\n";

#[test]
fn msd_decode() {
    let items = items(SOME_TEXT);
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].tag(), "SIMPLETAG");
    assert_eq!(items[0].value(), "SIMPLEVALUE");
    assert_eq!(items[1].tag(), "LONGTAGTHANKSplzzzzzzzzzzzzzzzzzzzz");
    assert_eq!(items[1].value(), "SHORTVALUE");
    assert_eq!(items[2].tag(), "ATAG");
    assert_eq!(items[2].value(), "VALUE\nON\nFOUR\nLINES");
}

#[test]
fn msd_encode() {
    let fixtures = [
        MsdItem::new("tag", "value").unwrap(),
        MsdItem::new("abcdefghij", "\u{3f9}\u{2764}\u{4e16}").unwrap(),
        MsdItem::new("anothertag", "VALUE\nWITH\nembedded\n\n\nnewlines").unwrap(),
    ];
    for item in &fixtures {
        assert_eq!(
            msd_to_text([item]),
            format!("#{}:{};\n", item.tag(), item.value())
        );
    }
}

#[test]
fn msd_cycle() {
    // encode(decode(text)) == text, and a second trip is stable
    let items_a = items(SOME_TEXT);
    let text_a = msd_to_text(&items_a);
    assert_eq!(text_a, SOME_TEXT);
    let items_b = items(&text_a);
    assert_eq!(items_a, items_b);
    assert_eq!(msd_to_text(&items_b), text_a);
}

#[test]
fn msd_decode_encode_identity() {
    // decode(encode(items)) == items for any valid item sequence
    let fixtures = vec![
        MsdItem::new("TITLE", "with:colon").unwrap(),
        MsdItem::new("EMPTY", "").unwrap(),
        MsdItem::new("MULTI", "a\nb\nc").unwrap(),
    ];
    assert_eq!(items(&msd_to_text(&fixtures)), fixtures);
}

#[test]
fn msd_item_validation() {
    assert_eq!(
        MsdItem::new("bad:tag", "x"),
        Err(MsdError::InvalidTag("bad:tag".to_string()))
    );
    assert_eq!(
        MsdItem::new("tag", "bad;value"),
        Err(MsdError::InvalidValue("bad;value".to_string()))
    );
    // values may contain ':' (the sm NOTES composite depends on it)
    assert!(MsdItem::new("NOTES", "a:b:c").is_ok());
}

#[test]
fn msd_comments_and_blank_lines() {
    let text = "// header comment\n\n#A:1; // trailing\n\n#B:2;\n";
    let items = items(text);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].value(), "1");
    assert_eq!(items[1].tag(), "B");
}

#[test]
fn msd_truncated_item_is_emitted() {
    let items = items("#A:1;\n#B:unterminated\n");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].tag(), "B");
    assert_eq!(items[1].value(), "unterminated\n");
}

#[test]
fn msd_errors() {
    let no_begin: Vec<_> = parse_msd("junk\n").collect();
    assert_eq!(
        no_begin,
        vec![Err(MsdError::ExpectedBegin {
            line: 1,
            found: "j".to_string(),
        })]
    );

    let no_tag_end: Vec<_> = parse_msd("#TAGONLY\n").collect();
    assert!(matches!(
        no_tag_end.as_slice(),
        [Err(MsdError::ExpectedTagEnd { line: 1, .. })]
    ));

    let trailing: Vec<_> = parse_msd("#A:1; garbage\n").collect();
    assert!(matches!(
        trailing.as_slice(),
        [Err(MsdError::TrailingContent { line: 1, .. })]
    ));
}

const EASY_SSC: &str = "#VERSION:0.83;\n\
#TITLE:Easy Song;\n\
#ARTIST:Someone;\n\
#BPMS:0.000=120.000;\n\
#OFFSET:0.000;\n\
#NOTEDATA:;\n\
#STEPSTYPE:dance-single;\n\
#DIFFICULTY:Easy;\n\
#METER:3;\n\
#DESCRIPTION:a test;\n\
#NOTES:\n\
0000\n0000\n0000\n0000\n\
,\n\
1000\n0100\n0010\n0001\n\
;\n";

const EASY_SM: &str = "#TITLE:Easy Song;\n\
#ARTIST:Someone;\n\
#BPMS:0.000=120.000;\n\
#OFFSET:0.000;\n\
#NOTES:\n\
     dance-single:\n\
     a test:\n\
     Easy:\n\
     3:\n\
     0,0,0,0,0:\n\
0000\n0000\n0000\n0000\n\
,\n\
1000\n0100\n0010\n0001\n\
;\n";

#[test]
fn parse_ssc() {
    let simfile = parse_simfile(EASY_SSC).unwrap();
    assert_eq!(simfile.title, "Easy Song");
    assert_eq!(simfile.artist.as_deref(), Some("Someone"));
    assert_eq!(
        simfile.timing_data.bpm,
        vec![("0.000".to_string(), "120.000".to_string())]
    );
    assert_eq!(simfile.timing_data.offset, "0.000");
    assert_eq!(simfile.charts.len(), 1);

    let chart = &simfile.charts[0];
    assert_eq!(chart.game_type, "dance-single");
    assert_eq!(chart.difficulty.as_deref(), Some("Easy"));
    assert_eq!(chart.meter, Some(3));
    assert_eq!(chart.description.as_deref(), Some("a test"));
    assert_eq!(chart.timing_data, None);
    assert_eq!(chart.notes.len(), 4);
}

#[test]
fn sm_and_ssc_load_equivalently() {
    assert_eq!(parse_simfile(EASY_SM).unwrap(), parse_simfile(EASY_SSC).unwrap());
}

#[test]
fn sm_ssc_conversions() {
    // saving an sm-compatible file in either dialect preserves the data
    let original = parse_simfile(EASY_SSC).unwrap();
    let ssc_text = simfile_to_ssc(&original).unwrap();
    let sm_text = simfile_to_sm(&original).unwrap();
    assert_eq!(parse_simfile(&ssc_text).unwrap(), original);
    assert_eq!(parse_simfile(&sm_text).unwrap(), original);
}

#[test]
fn ssc_round_trip_is_stable() {
    let original = parse_simfile(EASY_SSC).unwrap();
    let saved = simfile_to_ssc(&original).unwrap();
    let again = parse_simfile(&saved).unwrap();
    assert_eq!(again, original);
    assert_eq!(simfile_to_ssc(&again).unwrap(), saved);
}

#[test]
fn header_only_simfile() {
    let simfile = parse_simfile("#TITLE:Lonely;\n#OFFSET:-0.009;\n").unwrap();
    assert_eq!(simfile.title, "Lonely");
    assert_eq!(simfile.timing_data.offset, "-0.009");
    assert!(simfile.charts.is_empty());
}

#[test]
fn split_timing_chart() {
    let text = "#TITLE:Split;\n\
#BPMS:0=120;\n\
#NOTEDATA:;\n\
#STEPSTYPE:dance-single;\n\
#METER:9;\n\
#BPMS:0=150;\n\
#STOPS:8=0.500;\n\
#NOTES:\n1000\n0000\n0000\n0000\n;\n";
    let simfile = parse_simfile(text).unwrap();
    assert!(simfile.is_split_timing());

    let timing = simfile.charts[0].timing_data.as_ref().unwrap();
    assert_eq!(timing.bpm, vec![("0".to_string(), "150".to_string())]);
    assert_eq!(timing.stops, vec![("8".to_string(), "0.500".to_string())]);

    // and split timing cannot go back to sm
    assert_eq!(simfile_to_sm(&simfile), Err(SimfileError::SplitTiming));
    // but survives an ssc round trip
    let again = parse_simfile(&simfile_to_ssc(&simfile).unwrap()).unwrap();
    assert_eq!(again, simfile);
}

#[test]
fn radar_values_are_dropped() {
    let text = "#TITLE:R;\n\
#NOTEDATA:;\n\
#STEPSTYPE:dance-single;\n\
#RADARVALUES:0.2,0.3,0.1,0.0,0.0;\n\
#NOTES:\n0000\n;\n";
    let simfile = parse_simfile(text).unwrap();
    assert_eq!(simfile.charts[0].timing_data, None);
}

#[test]
fn unknown_header_tag_is_an_error() {
    let err = parse_simfile("#TITLE:x;\n#BOGUS:1;\n#NOTEDATA:;\n#STEPSTYPE:d;\n").unwrap_err();
    assert_eq!(err, SimfileError::ExtraHeaderTags(vec!["BOGUS".to_string()]));
}

#[test]
fn unknown_chart_tag_is_an_error() {
    let text = "#TITLE:x;\n#NOTEDATA:;\n#STEPSTYPE:d;\n#WHATEVER:1;\n#NOTES:\n0000\n;\n";
    let err = parse_simfile(text).unwrap_err();
    assert_eq!(err, SimfileError::ExtraChartTags(vec!["WHATEVER".to_string()]));
}

#[test]
fn sm_chart_with_missing_fields_is_an_error() {
    let err = parse_simfile("#TITLE:x;\n#NOTES:only:three:fields;\n").unwrap_err();
    assert_eq!(err, SimfileError::ChartFields);
}

#[test]
fn sm_mode_rejects_other_tags() {
    let text = "#TITLE:x;\n#NOTES:a:b:c:1:r:\n0000\n;\n#TITLE:again;\n";
    let err = parse_simfile(text).unwrap_err();
    assert_eq!(err, SimfileError::ExpectedNotes("TITLE".to_string()));
}

#[test]
fn notedata_sentinel_must_be_empty() {
    let err = parse_simfile("#TITLE:x;\n#NOTEDATA:junk;\n").unwrap_err();
    assert_eq!(err, SimfileError::NoteDataContent);
}
