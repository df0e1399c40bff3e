//! Scanline segmentation: decompose each raster row into black runs.
//!
//! Raster mode etches row by row. Each row is walked left to right; a
//! white-to-black transition opens an [`EtchSegment`] and a
//! black-to-white transition (or the end of the row) closes it. Rows
//! without any black pixel are omitted entirely rather than stored as
//! empty lines.

use image::GrayImage;

use crate::binarize::is_black;
use crate::types::{EtchSegment, Line};

/// Segment every row of the binarized raster into black runs.
///
/// Returns one [`Line`] per row that contains at least one run, in
/// top-to-bottom order. Segments within a line are in increasing,
/// non-overlapping X order by construction.
#[must_use = "returns the segmented lines"]
pub fn segment_rows(raster: &GrayImage) -> Vec<Line> {
    let mut lines = Vec::new();

    for y in 0..raster.height() {
        let y = y.cast_signed();
        let mut segments = Vec::new();
        let mut run_start: Option<i32> = None;

        for x in 0..raster.width() {
            let x = x.cast_signed();
            match (run_start, is_black(raster, x, y)) {
                (None, true) => run_start = Some(x),
                (Some(start), false) => {
                    segments.push(EtchSegment::new(start, x - 1));
                    run_start = None;
                }
                _ => {}
            }
        }

        // A run still open at the last column closes there.
        if let Some(start) = run_start {
            let last = raster.width().cast_signed() - 1;
            segments.push(EtchSegment::new(start, last));
        }

        if !segments.is_empty() {
            lines.push(Line { y, segments });
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::{BLACK, WHITE};
    use image::Luma;

    fn raster(rows: &[&str]) -> GrayImage {
        let height = u32::try_from(rows.len()).unwrap_or(0);
        let width = rows.first().map_or(0, |r| u32::try_from(r.len()).unwrap_or(0));
        GrayImage::from_fn(width, height, |x, y| {
            let row = rows[y as usize].as_bytes();
            Luma([if row[x as usize] == b'#' { BLACK } else { WHITE }])
        })
    }

    #[test]
    fn empty_rows_are_omitted() {
        let img = raster(&["....", "##..", "...."]);
        let lines = segment_rows(&img);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].y, 1);
    }

    #[test]
    fn zero_area_raster_yields_no_lines() {
        assert!(segment_rows(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn multiple_runs_on_one_row() {
        let img = raster(&["##.#..###"]);
        let lines = segment_rows(&img);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].segments,
            vec![
                EtchSegment::new(0, 1),
                EtchSegment::new(3, 3),
                EtchSegment::new(6, 8),
            ],
        );
    }

    #[test]
    fn run_reaching_last_column_is_closed() {
        let img = raster(&["..###"]);
        let lines = segment_rows(&img);
        assert_eq!(lines[0].segments, vec![EtchSegment::new(2, 4)]);
    }

    #[test]
    fn full_black_row_is_one_segment() {
        let img = raster(&["#####"]);
        let lines = segment_rows(&img);
        assert_eq!(lines[0].segments, vec![EtchSegment::new(0, 4)]);
    }

    #[test]
    fn segments_round_trip_to_the_original_row() {
        // Re-deriving each row from its segments reproduces it exactly.
        let rows = ["#.##.", ".....", "#...#", ".###."];
        let img = raster(&rows);
        let lines = segment_rows(&img);

        for y in 0..rows.len() {
            let line = lines.iter().find(|l| l.y == i32::try_from(y).unwrap_or(-1));
            let mut rebuilt = vec![false; rows[y].len()];
            if let Some(line) = line {
                for seg in &line.segments {
                    for x in seg.start..=seg.end {
                        rebuilt[x.unsigned_abs() as usize] = true;
                    }
                }
            }
            for (x, &black) in rebuilt.iter().enumerate() {
                let expected = rows[y].as_bytes()[x] == b'#';
                assert_eq!(black, expected, "mismatch at ({x}, {y})");
            }
        }
    }

    #[test]
    fn segments_are_increasing_and_disjoint() {
        let img = raster(&["#.#.#.#", "##.##.#"]);
        for line in segment_rows(&img) {
            for pair in line.segments.windows(2) {
                assert!(pair[0].end < pair[1].start);
            }
            for seg in &line.segments {
                assert!(seg.start <= seg.end);
            }
        }
    }
}
