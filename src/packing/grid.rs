use std::ops::Range;

use super::Rect;

/// One orientation of one image in the current run
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    /// Index into the run
    pub image: usize,
    /// Width as placed
    pub width: u32,
    /// Height as placed
    pub height: u32,
    pub rotated: bool,
}

impl Candidate {
    pub fn natural(image: usize, width: u32, height: u32) -> Self {
        Self {
            image,
            width,
            height,
            rotated: false,
        }
    }

    pub fn rotated(image: usize, width: u32, height: u32) -> Self {
        Self {
            image,
            width: height,
            height: width,
            rotated: true,
        }
    }

    fn is_tall(&self) -> bool {
        self.height > self.width
    }
}

/// A candidate that found a home
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index of the placed image
    pub image: usize,
    /// Placed extents without the border
    pub rect: Rect,
    pub rotated: bool,
}

/// Variable-size cell grid. Columns and rows are stored by their right and
/// bottom edges; `occupied[column][row]` marks used cells.
struct Grid {
    right_edges: Vec<u32>,
    bottom_edges: Vec<u32>,
    occupied: Vec<Vec<bool>>,
}

impl Grid {
    fn new(width: u32, height: u32) -> Self {
        Self {
            right_edges: vec![width],
            bottom_edges: vec![height],
            occupied: vec![vec![false]],
        }
    }

    fn column_left(&self, column: usize) -> u32 {
        if column == 0 { 0 } else { self.right_edges[column - 1] }
    }

    fn row_top(&self, row: usize) -> u32 {
        if row == 0 { 0 } else { self.bottom_edges[row - 1] }
    }

    /// Smallest run of columns starting at `column` that is at least `width`
    /// wide; returns its end and actual width.
    fn span_columns(&self, column: usize, left: u32, width: u32) -> (usize, u32) {
        let mut end = column;
        let mut span = 0;
        while span < width {
            span = self.right_edges[end] - left;
            end += 1;
        }
        (end, span)
    }

    fn span_rows(&self, row: usize, top: u32, height: u32) -> (usize, u32) {
        let mut end = row;
        let mut span = 0;
        while span < height {
            span = self.bottom_edges[end] - top;
            end += 1;
        }
        (end, span)
    }

    fn is_free(&self, columns: Range<usize>, rows: Range<usize>) -> bool {
        self.occupied[columns]
            .iter()
            .all(|column| column[rows.clone()].iter().all(|&cell| !cell))
    }

    /// Splits `column` so that its left part ends at `right`.
    fn split_column(&mut self, column: usize, right: u32) {
        let copy = self.occupied[column].clone();
        self.occupied.insert(column, copy);
        self.right_edges.insert(column, right);
    }

    /// Splits `row` in every column so that its upper part ends at `bottom`.
    fn split_row(&mut self, row: usize, bottom: u32) {
        for column in &mut self.occupied {
            let cell = column[row];
            column.insert(row, cell);
        }
        self.bottom_edges.insert(row, bottom);
    }

    fn occupy(&mut self, columns: Range<usize>, rows: Range<usize>) {
        for column in &mut self.occupied[columns] {
            for cell in &mut column[rows.clone()] {
                *cell = true;
            }
        }
    }
}

/// Places `candidates` (sorted by height, tallest first) on a `side`×`side`
/// square, reserving `border` pixels right of and below each image.
///
/// Returns `None` when a candidate that is not taller than wide finds no
/// free block, or when nothing was placed. A tall candidate that does not fit
/// is dropped so its wider sibling can try later.
pub(crate) fn place(
    side: u32,
    border: u32,
    candidates: &[Candidate],
    image_count: usize,
) -> Option<Vec<Placement>> {
    let pack_width = side + border;
    let pack_height = side + border;
    let mut grid = Grid::new(pack_width, pack_height);
    let mut placed = vec![false; image_count];
    let mut placements = Vec::new();

    'candidates: for candidate in candidates {
        if !candidate.is_tall() && placed[candidate.image] {
            continue;
        }
        let width = candidate.width + border;
        let height = candidate.height + border;

        for column in 0..grid.right_edges.len() {
            let left = grid.column_left(column);
            if pack_width - left < width {
                if candidate.is_tall() {
                    continue 'candidates;
                }
                return None;
            }

            for row in 0..grid.bottom_edges.len() {
                let top = grid.row_top(row);
                if pack_height - top < height {
                    break;
                }
                if grid.occupied[column][row] {
                    continue;
                }

                let (column_end, span_width) = grid.span_columns(column, left, width);
                let (row_end, span_height) = grid.span_rows(row, top, height);
                if !grid.is_free(column..column_end, row..row_end) {
                    continue;
                }

                placements.push(Placement {
                    image: candidate.image,
                    rect: Rect::new(left, top, candidate.width, candidate.height),
                    rotated: candidate.rotated,
                });
                placed[candidate.image] = true;

                if span_width != width {
                    grid.split_column(column_end - 1, left + width);
                }
                if span_height != height {
                    grid.split_row(row_end - 1, top + height);
                }
                grid.occupy(column..column_end, row..row_end);
                continue 'candidates;
            }
        }

        if !candidate.is_tall() {
            return None;
        }
    }

    if placements.is_empty() {
        None
    } else {
        Some(placements)
    }
}
