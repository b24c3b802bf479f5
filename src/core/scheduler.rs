//! Partitioning of constraints into batches that touch disjoint bodies.
//!
//! Constraints of one color share no movable body, so a color can be solved
//! in any order (or in parallel) against a snapshot of the body state and
//! written back afterwards without changing the result. Colors are processed
//! one after another, each acting as a barrier.

use std::ops::Range;

/// Upper bound on colors; constraints beyond it share the last color and are
/// serialized within it
pub const MAX_COLORS: usize = 64;

/// Greedy coloring of constraints over island body indices
#[derive(Debug, Default, Clone)]
pub struct ConstraintColoring {
    /// Color assigned to each constraint, in input order
    colors: Vec<usize>,

    /// Constraint order that groups colors contiguously
    order: Vec<usize>,

    /// Range of `order` covered by each color
    ranges: Vec<Range<usize>>,

    /// Colors already used by each body
    body_colors: Vec<u64>,
}

impl ConstraintColoring {
    /// Creates an empty coloring
    pub fn new() -> Self {
        Self::default()
    }

    /// Colors the constraints given as body index pairs
    ///
    /// `None` marks a body that never moves (zero inverse mass and inertia);
    /// such bodies do not constrain the coloring.
    pub fn rebuild<I>(&mut self, body_count: usize, pairs: I)
    where
        I: IntoIterator<Item = (Option<usize>, Option<usize>)>,
    {
        self.colors.clear();
        self.order.clear();
        self.ranges.clear();
        self.body_colors.clear();
        self.body_colors.resize(body_count, 0);

        let mut color_count = 0;
        for (body_a, body_b) in pairs {
            let used = body_a.map_or(0, |i| self.body_colors[i]) | body_b.map_or(0, |i| self.body_colors[i]);
            let color = Self::find_free_color(used);

            if let Some(i) = body_a {
                self.body_colors[i] |= 1 << color;
            }
            if let Some(i) = body_b {
                self.body_colors[i] |= 1 << color;
            }

            self.colors.push(color);
            color_count = color_count.max(color + 1);
        }

        // Counting sort by color keeps the input order within each color.
        let mut counts = vec![0usize; color_count];
        for &color in &self.colors {
            counts[color] += 1;
        }

        let mut start = 0;
        let mut offsets = Vec::with_capacity(color_count);
        for &count in &counts {
            offsets.push(start);
            self.ranges.push(start..start + count);
            start += count;
        }

        self.order.resize(self.colors.len(), 0);
        for (constraint, &color) in self.colors.iter().enumerate() {
            self.order[offsets[color]] = constraint;
            offsets[color] += 1;
        }
    }

    /// First color not set in `used`
    fn find_free_color(used: u64) -> usize {
        let free = (!used).trailing_zeros() as usize;
        free.min(MAX_COLORS - 1)
    }

    /// Number of colors in use
    pub fn color_count(&self) -> usize {
        self.ranges.len()
    }

    /// Constraint indices grouped by color
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Range of `order()` holding each color
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Returns whether the last color is overfull and must be solved serially
    pub fn is_saturated(&self) -> bool {
        self.ranges.len() == MAX_COLORS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_uses_two_colors() {
        // Bodies 0-1-2-3 linked in a chain.
        let mut coloring = ConstraintColoring::new();
        coloring.rebuild(4, vec![(Some(0), Some(1)), (Some(1), Some(2)), (Some(2), Some(3))]);

        assert_eq!(coloring.color_count(), 2);
        assert_eq!(coloring.order(), &[0, 2, 1]);
        assert_eq!(coloring.ranges(), &[0..2, 2..3]);
    }

    #[test]
    fn test_static_bodies_do_not_conflict() {
        // Three boxes resting on the same ground body.
        let mut coloring = ConstraintColoring::new();
        coloring.rebuild(3, vec![(Some(0), None), (Some(1), None), (Some(2), None)]);

        assert_eq!(coloring.color_count(), 1);
    }

    #[test]
    fn test_colors_share_no_body() {
        let pairs = vec![
            (Some(0), Some(1)),
            (Some(0), Some(2)),
            (Some(1), Some(2)),
            (Some(2), Some(3)),
            (Some(3), Some(0)),
        ];
        let mut coloring = ConstraintColoring::new();
        coloring.rebuild(4, pairs.clone());

        for range in coloring.ranges() {
            let mut seen = [false; 4];
            for &c in &coloring.order()[range.clone()] {
                let (a, b) = pairs[c];
                for body in [a, b].into_iter().flatten() {
                    assert!(!seen[body]);
                    seen[body] = true;
                }
            }
        }
    }
}
