//! Plain text compared line by line

use std::ops::{Index, IndexMut, Range};

use refsnap::error::{MINUS, PLUS};
use refsnap::{Difference, Rendering, Snapshotting, StrategyError};

/// Unchanged lines shown around each change
const CONTEXT: usize = 3;

/// `String` values stored as UTF-8 `.txt` references.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lines;

impl Snapshotting<String> for Lines {
    type Format = String;

    fn path_extension(&self) -> Option<&str> {
        Some("txt")
    }

    fn render(&self, value: String) -> Rendering<String> {
        Rendering::ready(value)
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Ok(format.as_bytes().to_vec())
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StrategyError::new(format!("reference is not UTF-8: {}", e)))
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        (reference != candidate).then(|| Difference::new(line_diff(reference, candidate)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit<'a> {
    Keep(&'a str),
    Remove(&'a str),
    Insert(&'a str),
}

impl Edit<'_> {
    fn is_change(&self) -> bool {
        !matches!(self, Edit::Keep(_))
    }
}

/// Shortest edit script between two line lists (Myers, linear space).
/// Within each run of changes, removals come before insertions.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let max_d = max_d(old.len(), new.len());
    let mut forward = Frontier::new(max_d);
    let mut backward = Frontier::new(max_d);
    let mut edits = Vec::with_capacity(old.len().max(new.len()));

    conquer(
        old,
        0..old.len(),
        new,
        0..new.len(),
        &mut forward,
        &mut backward,
        &mut edits,
    );
    for run in edits.split_mut(|e| !e.is_change()) {
        run.sort_by_key(|e| matches!(e, Edit::Insert(_)));
    }
    edits
}

fn max_d(old_len: usize, new_len: usize) -> usize {
    (old_len + new_len + 1) / 2 + 1
}

fn common_prefix(old: &[&str], new: &[&str]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

fn common_suffix(old: &[&str], new: &[&str]) -> usize {
    old.iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Furthest-reaching `x` per diagonal `k = x - y`
struct Frontier {
    offset: isize,
    reach: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            reach: vec![0; 2 * max_d + 2],
        }
    }
}

impl Index<isize> for Frontier {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.reach[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.reach[(k + self.offset) as usize]
    }
}

fn conquer<'a>(
    old: &[&'a str],
    mut old_range: Range<usize>,
    new: &[&'a str],
    mut new_range: Range<usize>,
    forward: &mut Frontier,
    backward: &mut Frontier,
    edits: &mut Vec<Edit<'a>>,
) {
    let prefix = common_prefix(&old[old_range.clone()], &new[new_range.clone()]);
    edits.extend(
        old[old_range.start..old_range.start + prefix]
            .iter()
            .map(|&line| Edit::Keep(line)),
    );
    old_range.start += prefix;
    new_range.start += prefix;

    let suffix = common_suffix(&old[old_range.clone()], &new[new_range.clone()]);
    let kept = &old[old_range.end - suffix..old_range.end];
    old_range.end -= suffix;
    new_range.end -= suffix;

    if old_range.is_empty() {
        edits.extend(new[new_range].iter().map(|&line| Edit::Insert(line)));
    } else if new_range.is_empty() {
        edits.extend(old[old_range].iter().map(|&line| Edit::Remove(line)));
    } else if let Some((x, y)) =
        middle_snake(old, old_range.clone(), new, new_range.clone(), forward, backward)
    {
        conquer(
            old,
            old_range.start..x,
            new,
            new_range.start..y,
            forward,
            backward,
            edits,
        );
        conquer(
            old,
            x..old_range.end,
            new,
            y..new_range.end,
            forward,
            backward,
            edits,
        );
    } else {
        edits.extend(old[old_range].iter().map(|&line| Edit::Remove(line)));
        edits.extend(new[new_range].iter().map(|&line| Edit::Insert(line)));
    }

    edits.extend(kept.iter().map(|&line| Edit::Keep(line)));
}

/// Split point of an optimal edit path, found by searching from both ends.
fn middle_snake(
    old: &[&str],
    old_range: Range<usize>,
    new: &[&str],
    new_range: Range<usize>,
    forward: &mut Frontier,
    backward: &mut Frontier,
) -> Option<(usize, usize)> {
    let (n, m) = (old_range.len(), new_range.len());
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    forward[1] = 0;
    backward[1] = 0;

    for d in 0..max_d(n, m) as isize {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward[k - 1] < forward[k + 1]) {
                forward[k + 1]
            } else {
                forward[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(
                    &old[old_range.start + x..old_range.end],
                    &new[new_range.start + y..new_range.end],
                );
            }
            forward[k] = x;
            if odd && (k - delta).abs() <= d - 1 && forward[k] + backward[delta - k] >= n {
                return Some((old_range.start + x0, new_range.start + y0));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward[k - 1] < backward[k + 1]) {
                backward[k + 1]
            } else {
                backward[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let advance = common_suffix(
                    &old[old_range.start..old_range.start + n - x],
                    &new[new_range.start..new_range.start + m - y],
                );
                x += advance;
                y += advance;
            }
            backward[k] = x;
            if !odd && (k - delta).abs() <= d && backward[k] + forward[delta - k] >= n {
                return Some((old_range.start + n - x, new_range.start + m - y));
            }
        }
    }
    None
}

/// Unified-style diff with `−`/`+` prefixed lines grouped into hunks.
///
/// Lines are split on `\n` only, so a missing trailing newline shows up as
/// a changed empty last line.
pub fn line_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let edits = edit_script(&old_lines, &new_lines);

    // positions[i]: old and new lines consumed before edits[i]
    let mut positions = Vec::with_capacity(edits.len() + 1);
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    positions.push((old_pos, new_pos));
    for edit in &edits {
        match edit {
            Edit::Keep(_) => {
                old_pos += 1;
                new_pos += 1;
            }
            Edit::Remove(_) => old_pos += 1,
            Edit::Insert(_) => new_pos += 1,
        }
        positions.push((old_pos, new_pos));
    }

    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_change())
        .map(|(i, _)| i)
        .collect();

    let mut out = String::new();
    let mut index = 0;
    while index < changes.len() {
        // Merge changes whose context would overlap.
        let first = changes[index];
        let mut last = first;
        index += 1;
        while index < changes.len() && changes[index] - last <= 2 * CONTEXT + 1 {
            last = changes[index];
            index += 1;
        }

        let start = first.saturating_sub(CONTEXT);
        let end = (last + CONTEXT + 1).min(edits.len());
        let (old_start, new_start) = positions[start];
        let (old_end, new_end) = positions[end];

        out.push_str(&format!(
            "@@ {}{},{} {}{},{} @@\n",
            MINUS,
            old_start + 1,
            old_end - old_start,
            PLUS,
            new_start + 1,
            new_end - new_start
        ));
        for edit in &edits[start..end] {
            let (prefix, line) = match edit {
                Edit::Keep(line) => (" ", line),
                Edit::Remove(line) => (MINUS, line),
                Edit::Insert(line) => (PLUS, line),
            };
            out.push_str(prefix);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
