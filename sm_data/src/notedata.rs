use std::collections::HashMap;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("note rows have different widths ({first} vs {other}) and are not homogenous")]
    RowWidthMismatch { first: usize, other: usize },

    #[error("rows {left} and {right} have identical position {position}")]
    DuplicatePosition {
        left: usize,
        right: usize,
        position: Position,
    },

    #[error("no row at position {0}")]
    RowNotFound(Position),

    #[error("overlay conflict at position {0}")]
    OverlayConflict(Position),

    #[error("column index {index} out of range for row width {width}")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("row position {0} is before the start of the chart")]
    NegativePosition(Position),
}

/// A single row of notes at an exact beat position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub position: Position,
    pub notes: String,
}

impl NoteRow {
    pub fn new(position: Position, notes: impl Into<String>) -> Self {
        Self {
            position,
            notes: notes.into(),
        }
    }
}

/// One run-length entry produced by [`NoteData::density`]: `count`
/// consecutive gaps of exactly `delta` beats between adjacent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityInfo {
    pub delta: Position,
    pub count: usize,
}

/// Strategies for [`NoteData::overlay`] when both containers have a row at
/// the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    KeepSelf,
    KeepOther,
    /// Fail with [`NoteError::OverlayConflict`] instead of dropping data.
    Raise,
}

/// Immutable collection of note rows ordered ascending by position.
///
/// This is a container type only: it stores rows and makes no attempt to
/// interpret what the note symbols mean. Every mutating operation returns a
/// new `NoteData`, so values can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteData {
    rows: Vec<NoteRow>,
}

impl NoteData {
    /// Build from rows in any order. Fails if rows have uneven widths or two
    /// rows share a position.
    pub fn new(rows: impl IntoIterator<Item = NoteRow>) -> Result<Self, NoteError> {
        let mut rows: Vec<NoteRow> = rows.into_iter().collect();
        rows.sort_by_key(|r| r.position);

        if let Some(first) = rows.first() {
            let width = first.notes.chars().count();
            for row in &rows {
                let w = row.notes.chars().count();
                if w != width {
                    return Err(NoteError::RowWidthMismatch { first: width, other: w });
                }
            }
        }
        for i in 1..rows.len() {
            if rows[i - 1].position == rows[i].position {
                return Err(NoteError::DuplicatePosition {
                    left: i - 1,
                    right: i,
                    position: rows[i].position,
                });
            }
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &NoteRow> {
        self.rows.iter()
    }

    /// Width of the rows, or `None` when there are no rows.
    pub fn width(&self) -> Option<usize> {
        self.rows.first().map(|r| r.notes.chars().count())
    }

    /// Index of the leftmost row with position >= `position`.
    fn index_of(&self, position: Position) -> usize {
        self.rows.partition_point(|r| r.position < position)
    }

    pub fn contains(&self, position: Position) -> bool {
        let i = self.index_of(position);
        i < self.rows.len() && self.rows[i].position == position
    }

    pub fn get(&self, position: Position) -> Result<&str, NoteError> {
        let i = self.index_of(position);
        if i < self.rows.len() && self.rows[i].position == position {
            Ok(&self.rows[i].notes)
        } else {
            Err(NoteError::RowNotFound(position))
        }
    }

    /// Contiguous subset over the half-open range `[start, stop)`; `None`
    /// leaves that end unbounded.
    pub fn slice(&self, start: Option<Position>, stop: Option<Position>) -> NoteData {
        let lo = start.map_or(0, |p| self.index_of(p));
        let hi = stop.map_or(self.rows.len(), |p| self.index_of(p));
        if lo >= hi {
            return NoteData::default();
        }
        NoteData {
            rows: self.rows[lo..hi].to_vec(),
        }
    }

    /// Translate every row's position by `amount`.
    pub fn shift(&self, amount: Position) -> NoteData {
        NoteData {
            rows: self
                .rows
                .iter()
                .map(|r| NoteRow::new(r.position + amount, r.notes.clone()))
                .collect(),
        }
    }

    /// Remove all rows in the half-open range `[start, stop)`.
    pub fn clear_range(&self, start: Position, stop: Position) -> NoteData {
        let lo = self.index_of(start);
        let hi = self.index_of(stop);
        let mut rows = self.rows[..lo].to_vec();
        if hi < self.rows.len() {
            rows.extend_from_slice(&self.rows[hi..]);
        }
        NoteData { rows }
    }

    /// Merge `other`'s rows into this container, ordered by position.
    ///
    /// Rows at tied positions are resolved per `mode`, never duplicated.
    pub fn overlay(&self, other: &NoteData, mode: OverlayMode) -> Result<NoteData, NoteError> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if let (Some(a), Some(b)) = (self.width(), other.width()) {
            if a != b {
                return Err(NoteError::RowWidthMismatch { first: a, other: b });
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());

        // Fast-forward past the rows that sort strictly before the other
        // operand; when the other operand occupies a small time range this
        // skips most of the merge.
        let mut i_s = self.index_of(other.rows[0].position);
        rows.extend_from_slice(&self.rows[..i_s]);
        let mut i_o = 0;

        while i_s < self.rows.len() && i_o < other.rows.len() {
            let (s, o) = (&self.rows[i_s], &other.rows[i_o]);
            if s.position < o.position {
                rows.push(s.clone());
                i_s += 1;
            } else if o.position < s.position {
                rows.push(o.clone());
                i_o += 1;
            } else {
                match mode {
                    OverlayMode::Raise => return Err(NoteError::OverlayConflict(s.position)),
                    OverlayMode::KeepSelf => rows.push(s.clone()),
                    OverlayMode::KeepOther => rows.push(o.clone()),
                }
                i_s += 1;
                i_o += 1;
            }
        }
        rows.extend_from_slice(&self.rows[i_s..]);
        rows.extend_from_slice(&other.rows[i_o..]);

        Ok(NoteData { rows })
    }

    /// Rebuild each row as `new[i] = old[columns[i]]`.
    ///
    /// Repeated row patterns are transformed once via a cache keyed by the
    /// original row text.
    pub fn column_swap(&self, columns: &[usize]) -> Result<NoteData, NoteError> {
        let Some(width) = self.width() else {
            return Ok(self.clone());
        };
        for &c in columns {
            if c >= width {
                return Err(NoteError::ColumnOutOfRange { index: c, width });
            }
        }

        let mut cache: HashMap<&str, String> = HashMap::new();
        let mut rows = Vec::with_capacity(self.rows.len());
        for r in &self.rows {
            let notes = cache
                .entry(&r.notes)
                .or_insert_with(|| {
                    let old: Vec<char> = r.notes.chars().collect();
                    columns.iter().map(|&c| old[c]).collect()
                })
                .clone();
            rows.push(NoteRow::new(r.position, notes));
        }
        Ok(NoteData { rows })
    }

    /// Run-length encoding of the gaps between consecutive rows. Lazy and
    /// restartable; 0 or 1 rows yield an empty sequence.
    pub fn density(&self) -> Density<'_> {
        Density {
            rows: &self.rows,
            index: 0,
        }
    }
}

/// Iterator behind [`NoteData::density`].
#[derive(Debug, Clone)]
pub struct Density<'a> {
    rows: &'a [NoteRow],
    index: usize,
}

impl Iterator for Density<'_> {
    type Item = DensityInfo;

    fn next(&mut self) -> Option<DensityInfo> {
        if self.index + 1 >= self.rows.len() {
            return None;
        }
        let delta = self.rows[self.index + 1].position - self.rows[self.index].position;
        let mut count = 1;
        self.index += 1;
        while self.index + 1 < self.rows.len()
            && self.rows[self.index + 1].position - self.rows[self.index].position == delta
        {
            count += 1;
            self.index += 1;
        }
        Some(DensityInfo { delta, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat(n: i64) -> Position {
        Position::from_integer(n)
    }

    fn frac(n: i64, d: i64) -> Position {
        Position::new(n, d)
    }

    /// Mixed-density fixture: a 4th staircase, a lone jump, some 8ths, and a
    /// 7th-division row (not in vanilla SM).
    fn simple() -> NoteData {
        NoteData::new(simple_rows()).unwrap()
    }

    fn simple_rows() -> Vec<NoteRow> {
        let mut rows = Vec::new();
        for (p, n) in ["1000", "0100", "0010", "0001"].iter().enumerate() {
            rows.push(NoteRow::new(beat(4 + p as i64), *n));
        }
        rows.push(NoteRow::new(beat(8), "0110"));
        let eighths = ["0001", "0010", "0010", "1000", "0100", "0000", "0001", "0029"];
        for (p, n) in eighths.iter().enumerate() {
            if *n != "0000" {
                rows.push(NoteRow::new(frac(p as i64, 2) + beat(16), *n));
            }
        }
        rows.push(NoteRow::new(frac(1, 7) + beat(20), "1111"));
        rows
    }

    const SIMPLE_BEYOND: i64 = 25;

    const JACK_LENGTH: i64 = 100;

    fn jack_interval() -> Position {
        frac(3, 4)
    }

    fn long_jack() -> NoteData {
        NoteData::new((0..JACK_LENGTH).map(|i| NoteRow::new(jack_interval() * beat(i), "0101")))
            .unwrap()
    }

    #[test]
    fn validation_rejects_uneven_widths() {
        let err = NoteData::new([
            NoteRow::new(beat(0), "00a0"),
            NoteRow::new(beat(1), "003300"),
        ])
        .unwrap_err();
        assert_eq!(err, NoteError::RowWidthMismatch { first: 4, other: 6 });
    }

    #[test]
    fn validation_rejects_duplicate_positions() {
        let err = NoteData::new((0..2).map(|_| NoteRow::new(beat(0), "0030"))).unwrap_err();
        assert!(matches!(err, NoteError::DuplicatePosition { .. }));
    }

    #[test]
    fn len() {
        assert_eq!(simple().len(), simple_rows().len());
        assert_eq!(long_jack().len(), JACK_LENGTH as usize);
        assert!(NoteData::default().is_empty());
    }

    #[test]
    fn contains() {
        let simple = simple();
        assert!(!simple.contains(beat(0)));
        assert!(!simple.contains(beat(2)));
        assert!(simple.contains(beat(4)));
        assert!(simple.contains(beat(19)));
        assert!(simple.contains(frac(33, 2)));
        assert!(simple.contains(frac(141, 7)));
        assert!(!simple.contains(frac(35, 4)));

        let jack = long_jack();
        assert!(jack.contains(jack_interval() * beat(JACK_LENGTH * 17 / 37)));
        assert!(!jack.contains(jack_interval() * frac(37, 12)));
    }

    #[test]
    fn get() {
        let simple = simple();
        assert_eq!(simple.get(beat(4)).unwrap(), "1000");
        assert_eq!(simple.get(frac(39, 2)).unwrap(), "0029");

        for missing in [beat(0), beat(1), beat(2), frac(21, 2), beat(69), frac(-2, 3)] {
            assert_eq!(simple.get(missing), Err(NoteError::RowNotFound(missing)));
        }
    }

    #[test]
    fn slicing() {
        let simple = simple();

        // empty results
        assert_eq!(simple.slice(Some(beat(0)), Some(beat(0))).len(), 0);
        assert_eq!(simple.slice(Some(beat(0)), Some(beat(4))).len(), 0);
        assert_eq!(simple.slice(Some(beat(4)), Some(beat(4))).len(), 0);
        assert_eq!(simple.slice(Some(beat(SIMPLE_BEYOND)), None).len(), 0);
        assert_eq!(simple.slice(None, Some(beat(-1))).len(), 0);

        // occupied
        let (start, stop) = (beat(6), frac(35, 2));
        let sub = simple.slice(Some(start), Some(stop));
        assert_eq!(sub.len(), 6);
        assert_eq!(simple.get(beat(8)).unwrap(), "0110");
        assert!(sub.contains(start));
        assert!(!sub.contains(stop));

        // occupied unbounded
        assert_eq!(simple.slice(None, None), simple);
        assert_eq!(
            simple.slice(Some(beat(18)), None),
            simple.slice(Some(beat(18)), Some(beat(SIMPLE_BEYOND)))
        );
        assert_eq!(
            simple.slice(None, Some(beat(8))),
            simple.slice(Some(beat(2)), Some(beat(8)))
        );
    }

    #[test]
    fn density() {
        let expected = [
            DensityInfo { delta: beat(1), count: 4 },
            DensityInfo { delta: beat(8), count: 1 },
            DensityInfo { delta: frac(1, 2), count: 4 },
            DensityInfo { delta: beat(1), count: 1 },
            DensityInfo { delta: frac(1, 2), count: 1 },
            DensityInfo { delta: frac(9, 14), count: 1 },
        ];
        assert_eq!(simple().density().collect::<Vec<_>>(), expected);

        assert_eq!(
            long_jack().density().collect::<Vec<_>>(),
            [DensityInfo {
                delta: jack_interval(),
                count: (JACK_LENGTH - 1) as usize,
            }]
        );
    }

    #[test]
    fn density_degenerate() {
        let zero = NoteData::default();
        let single = NoteData::new([NoteRow::new(frac(1, 7), "")]).unwrap();
        assert_eq!(zero.density().count(), 0);
        assert_eq!(single.density().count(), 0);
    }

    #[test]
    fn density_is_restartable() {
        let simple = simple();
        let density = simple.density();
        let first: Vec<_> = density.clone().collect();
        let second: Vec<_> = density.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn shift() {
        let simple = simple();
        assert_eq!(
            simple.shift(beat(20)).get(beat(24)).unwrap(),
            simple.get(beat(4)).unwrap()
        );
        assert_eq!(
            simple.shift(frac(-3, 2)).get(frac(31, 2)).unwrap(),
            simple.get(beat(17)).unwrap()
        );

        // reversible
        assert_eq!(simple.shift(beat(4)).shift(beat(-4)), simple);
        assert_eq!(simple.shift(frac(13, 4)).shift(frac(-13, 4)), simple);
    }

    #[test]
    fn clear_range() {
        let simple = simple();
        let (a, b) = (beat(6), beat(17));
        let cleared = simple.clear_range(a, b);

        assert!(!cleared.contains(beat(2)));
        assert!(cleared.contains(beat(4)));

        assert!(!cleared.contains(beat(6)));
        assert!(!cleared.contains(beat(7)));
        assert!(!cleared.contains(frac(33, 2)));

        assert!(cleared.contains(beat(17)));
        assert!(cleared.contains(beat(18)));

        assert_eq!(cleared.slice(Some(a), Some(b)).len(), 0);

        // idempotence
        let mut curr = cleared.clone();
        for _ in 0..3 {
            curr = curr.clear_range(a, b);
            assert_eq!(curr, cleared);
        }
    }

    #[test]
    fn overlay() {
        let simple = simple();
        let jack = long_jack();

        let beyond = beat(SIMPLE_BEYOND);
        let merged = simple
            .overlay(&jack.shift(beyond), OverlayMode::Raise)
            .unwrap();
        assert_eq!(merged.slice(Some(beyond), None).shift(-beyond), jack);

        let doubled = jack
            .overlay(&jack.shift(jack_interval() / beat(2)), OverlayMode::Raise)
            .unwrap();
        assert_eq!(doubled.len(), jack.len() * 2);

        // overlay is in opposition to slicing and clear_range
        let a = jack_interval() * beat(JACK_LENGTH) / beat(3);
        let b = a * beat(2);
        assert_eq!(
            jack.clear_range(a, b)
                .overlay(&jack.slice(Some(a), Some(b)), OverlayMode::Raise)
                .unwrap(),
            jack
        );
    }

    #[test]
    fn overlay_partition_law() {
        let jack = long_jack();
        let (a, b, c) = (beat(3), frac(45, 2), beat(60));
        assert_eq!(
            jack.slice(Some(a), Some(b))
                .overlay(&jack.slice(Some(b), Some(c)), OverlayMode::KeepOther)
                .unwrap(),
            jack.slice(Some(a), Some(c))
        );
    }

    #[test]
    fn overlay_modes() {
        let jack = long_jack();
        let conflict = jack_interval() * beat(JACK_LENGTH) * frac(3, 2);
        let row_one = NoteRow::new(conflict, "aaaa");
        let row_two = NoteRow::new(conflict, "bbbb");

        let jack_one = jack
            .overlay(&NoteData::new([row_one.clone()]).unwrap(), OverlayMode::Raise)
            .unwrap();
        let jack_two = jack
            .shift(jack_interval() / beat(2))
            .overlay(&NoteData::new([row_two.clone()]).unwrap(), OverlayMode::Raise)
            .unwrap();

        assert_eq!(
            jack_one.overlay(&jack_two, OverlayMode::Raise),
            Err(NoteError::OverlayConflict(conflict))
        );
        let keep_self = jack_one.overlay(&jack_two, OverlayMode::KeepSelf).unwrap();
        let keep_other = jack_one.overlay(&jack_two, OverlayMode::KeepOther).unwrap();

        assert_eq!(keep_self.len(), keep_other.len());
        assert_eq!(keep_self.len(), jack_one.len() + jack_two.len() - 1);
        assert_eq!(
            keep_self.slice(None, Some(conflict)),
            keep_other.slice(None, Some(conflict))
        );
        assert_eq!(keep_self.get(conflict).unwrap(), row_one.notes);
        assert_eq!(keep_other.get(conflict).unwrap(), row_two.notes);

        // "commutativity" of the keep modes
        assert_eq!(
            jack_two.overlay(&jack_one, OverlayMode::KeepOther).unwrap(),
            keep_self
        );
    }

    #[test]
    fn overlay_degenerate() {
        let simple = simple();
        let empty = NoteData::default();
        for mode in [OverlayMode::KeepSelf, OverlayMode::KeepOther, OverlayMode::Raise] {
            assert_eq!(simple.overlay(&empty, mode).unwrap(), simple);
            assert_eq!(empty.overlay(&simple, mode).unwrap(), simple);
        }
    }

    #[test]
    fn column_swap() {
        let single = NoteData::new([NoteRow::new(beat(3), "abcdef")]).unwrap();
        let swaps: [(&[usize], &str); 4] = [
            (&[0, 1, 2, 3, 4, 5], "abcdef"),
            (&[5, 4, 3, 2, 1, 0], "fedcba"),
            (&[2, 5, 3, 1, 4, 0], "cfdbea"),
            (&[1, 2, 1, 2, 1, 2], "bcbcbc"),
        ];

        for (columns, expected) in swaps {
            let result = single.column_swap(columns).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result.get(beat(3)).unwrap(), expected);

            assert_eq!(
                NoteData::default().column_swap(columns).unwrap(),
                NoteData::default()
            );
        }

        let simple = simple();
        assert_eq!(
            simple
                .column_swap(&[3, 2, 1, 0])
                .unwrap()
                .column_swap(&[3, 2, 1, 0])
                .unwrap(),
            simple
        );
    }

    #[test]
    fn column_swap_out_of_range() {
        let single = NoteData::new([NoteRow::new(beat(0), "0100")]).unwrap();
        assert_eq!(
            single.column_swap(&[0, 1, 2, 4]),
            Err(NoteError::ColumnOutOfRange { index: 4, width: 4 })
        );
    }
}
