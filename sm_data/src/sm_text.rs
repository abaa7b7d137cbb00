//! SM note-text conversion: comma-separated measures of fixed-width rows.

use num_integer::lcm;

use crate::{NoteData, NoteError, NoteRow, Position};

// regardless of time signature data elsewhere
const BEATS_PER_MEASURE: i64 = 4;
const MEASURE_SEP: char = ',';

/// Decode SM measure text into note rows.
///
/// Each measure divides 4 beats evenly among its rows; rows of all `'0'` are
/// elided.
pub fn sm_to_notedata(text: &str) -> Result<NoteData, NoteError> {
    let mut rows = Vec::new();
    for (measure_index, measure) in text.split(MEASURE_SEP).enumerate() {
        let lines: Vec<&str> = measure.split_whitespace().collect();
        for (row_index, line) in lines.iter().enumerate() {
            if line.chars().all(|c| c == '0') {
                continue;
            }
            let position = (Position::new(row_index as i64, lines.len() as i64)
                + Position::from_integer(measure_index as i64))
                * Position::from_integer(BEATS_PER_MEASURE);
            rows.push(NoteRow::new(position, *line));
        }
    }
    NoteData::new(rows)
}

fn measure_of(position: Position) -> Result<usize, NoteError> {
    let measure = (position / Position::from_integer(BEATS_PER_MEASURE)).floor();
    if measure < Position::from_integer(0) {
        return Err(NoteError::NegativePosition(position));
    }
    Ok(measure.to_integer() as usize)
}

/// Encode note rows back into SM measure text.
///
/// Skipped measures are reconstructed as 4 empty rows; each occupied measure
/// uses the smallest row grid that places every row exactly (lcm of the
/// position denominators).
pub fn notedata_to_sm(data: &NoteData) -> Result<String, NoteError> {
    let Some(width) = data.width() else {
        return Ok(String::new());
    };
    let empty_row = "0".repeat(width);

    let rows: Vec<&NoteRow> = data.rows().collect();
    let mut measures: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let measure_index = measure_of(rows[i].position)?;
        let mut j = i;
        while j < rows.len() && measure_of(rows[j].position)? == measure_index {
            j += 1;
        }
        let group = &rows[i..j];
        i = j;

        // fill in missing measures with empty data
        while measures.len() < measure_index {
            measures.push(vec![empty_row.clone(); BEATS_PER_MEASURE as usize].join("\n"));
        }

        let denom_lcm = group
            .iter()
            .fold(1i64, |acc, r| lcm(acc, *r.position.denom()));
        let grid_len = denom_lcm * BEATS_PER_MEASURE;
        let mut grid = vec![empty_row.clone(); grid_len as usize];
        for r in group {
            let offset = r.position / Position::from_integer(BEATS_PER_MEASURE)
                - Position::from_integer(measure_index as i64);
            let dest = offset * Position::from_integer(grid_len);
            debug_assert!(dest.is_integer());
            grid[dest.to_integer() as usize] = r.notes.clone();
        }
        measures.push(grid.join("\n"));
    }

    Ok(measures.join("\n,\n"))
}
