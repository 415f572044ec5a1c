//! The x-ordered list of edges crossing the current sample row.
//!
//! The list lives inside the polygon's edge arena: [`HEAD`] and [`TAIL`]
//! are sentinels with x = MIN and x = MAX, so every walk terminates on the
//! tail without a null check. Edges are doubly linked while active so an
//! edge that overtakes its left neighbour can be bubbled back into place.

use crate::cell_list::CoverageAccumulator;
use crate::polygon::{Edge, EdgeState, HEAD, NIL, TAIL};

/// Mutable view of the active list over an edge arena.
pub struct ActiveList<'a> {
    edges: &'a mut [Edge],
}

impl<'a> ActiveList<'a> {
    pub fn new(edges: &'a mut [Edge]) -> Self {
        debug_assert!(edges.len() >= 2);
        debug_assert_eq!(edges[HEAD as usize].state, EdgeState::Sentinel);
        debug_assert_eq!(edges[TAIL as usize].state, EdgeState::Sentinel);
        Self { edges }
    }

    #[inline]
    fn e(&self, i: u32) -> &Edge {
        &self.edges[i as usize]
    }

    #[inline]
    fn e_mut(&mut self, i: u32) -> &mut Edge {
        &mut self.edges[i as usize]
    }

    #[inline]
    fn x(&self, i: u32) -> i32 {
        self.edges[i as usize].x.quo
    }

    #[inline]
    fn next(&self, i: u32) -> u32 {
        self.edges[i as usize].next
    }

    #[inline]
    fn prev(&self, i: u32) -> u32 {
        self.edges[i as usize].prev
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next(HEAD) == TAIL
    }

    /// Number of edges in the list.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Edge indices from left to right.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let mut at = self.next(HEAD);
        std::iter::from_fn(move || {
            if at == TAIL {
                return None;
            }
            let i = at;
            at = self.next(at);
            Some(i)
        })
    }

    /// Current x (quotient) of each edge, left to right.
    pub fn xs(&self) -> Vec<i32> {
        self.iter().map(|i| self.x(i)).collect()
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Spread the pending edges of one pixel row over per-sample-row
    /// buckets, indexed by `ytop - ymin`. Each bucket is doubly linked with
    /// a [`NIL`] prev on its first edge.
    pub fn fill_buckets(&mut self, mut edge: u32, ymin: i32, buckets: &mut [u32]) {
        while edge != NIL {
            let next = self.next(edge);
            let ix = (self.e(edge).ytop - ymin) as usize;
            debug_assert!(ix < buckets.len());
            let first = buckets[ix];
            if first != NIL {
                self.e_mut(first).prev = edge;
            }
            let e = self.e_mut(edge);
            e.next = first;
            e.prev = NIL;
            buckets[ix] = edge;
            edge = next;
        }
    }

    /// Merge an unsorted bucket list into the active list. Pairs of
    /// adjacent edges that cancel each other exactly are dropped first.
    pub fn merge_edges(&mut self, unsorted: u32) {
        if unsorted == NIL {
            return;
        }
        let (_, sorted) = self.sort_edges(unsorted, u32::MAX);
        let filtered = self.filter(sorted);

        let mut at = filtered;
        while at != NIL {
            self.e_mut(at).state = EdgeState::Active;
            at = self.next(at);
        }

        let first = self.next(HEAD);
        let merged = self.merge_sorted(first, filtered);
        self.e_mut(HEAD).next = merged;
        self.e_mut(merged).prev = HEAD;
    }

    /// Merge two x-sorted runs. `a` must be non-empty; its prev link is
    /// inherited by the merged run. Ties keep `a` first.
    fn merge_sorted(&mut self, mut a: u32, mut b: u32) -> u32 {
        if b == NIL {
            return a;
        }
        debug_assert!(a != NIL);

        let mut prev = self.prev(a);
        let mut take_b = self.x(a) > self.x(b);
        let head = if take_b { b } else { a };
        if take_b {
            self.e_mut(b).prev = prev;
        }
        let mut link = NIL;

        loop {
            if take_b {
                let xa = self.x(a);
                while b != NIL && self.x(b) <= xa {
                    prev = b;
                    link = b;
                    b = self.next(b);
                }
                self.e_mut(a).prev = prev;
                self.e_mut(link).next = a;
                if b == NIL {
                    return head;
                }
            } else {
                let xb = self.x(b);
                while a != NIL && self.x(a) <= xb {
                    prev = a;
                    link = a;
                    a = self.next(a);
                }
                self.e_mut(b).prev = prev;
                self.e_mut(link).next = b;
                if a == NIL {
                    return head;
                }
            }
            take_b = !take_b;
        }
    }

    /// Bottom-up merge sort of a NIL-terminated run. Sorts at most
    /// `2^(level+1)` edges and returns `(rest, sorted)`.
    fn sort_edges(&mut self, list: u32, level: u32) -> (u32, u32) {
        let other = self.next(list);
        if other == NIL {
            return (NIL, list);
        }

        let mut remaining = self.next(other);
        let mut sorted;
        if self.x(list) <= self.x(other) {
            sorted = list;
            self.e_mut(other).next = NIL;
        } else {
            sorted = other;
            let list_prev = self.prev(list);
            let o = self.e_mut(other);
            o.prev = list_prev;
            o.next = list;
            let l = self.e_mut(list);
            l.prev = other;
            l.next = NIL;
        }

        let mut i = 0;
        while i < level && remaining != NIL {
            let (rest, run) = self.sort_edges(remaining, i);
            remaining = rest;
            sorted = self.merge_sorted(sorted, run);
            i += 1;
        }
        (remaining, sorted)
    }

    /// Remove adjacent pairs that exactly cancel: opposite direction, same
    /// remaining height, same x and same slope.
    fn filter(&mut self, list: u32) -> u32 {
        let mut head = list;
        let mut e = list;
        while e != NIL {
            let n = self.next(e);
            if n == NIL {
                break;
            }
            if !self.e(e).mirrors(self.e(n)) {
                e = n;
                continue;
            }

            let p = self.prev(e);
            let after = self.next(n);
            self.retire(e);
            self.retire(n);
            if p != NIL {
                self.e_mut(p).next = after;
            } else {
                head = after;
            }
            if after != NIL {
                self.e_mut(after).prev = p;
            }
            e = after;
        }
        head
    }

    // ------------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------------

    fn retire(&mut self, i: u32) {
        self.e_mut(i).state = EdgeState::Retired;
    }

    fn unlink(&mut self, i: u32) {
        let (p, n) = (self.prev(i), self.next(i));
        self.e_mut(p).next = n;
        self.e_mut(n).prev = p;
        self.retire(i);
    }

    /// Advance x by one sample row.
    #[inline]
    fn advance(&mut self, i: u32) {
        let e = self.e_mut(i);
        if e.dy == 0 {
            return;
        }
        e.x.quo += e.dxdy.quo;
        e.x.rem += e.dxdy.rem;
        if e.x.rem >= 0 {
            e.x.quo += 1;
            e.x.rem -= e.dy;
        }
    }

    /// Move `edge`, which now sits left of its predecessor, back into
    /// x order.
    fn reposition(&mut self, edge: u32) {
        let mut pos = self.prev(edge);
        let next = self.next(edge);
        self.e_mut(pos).next = next;
        self.e_mut(next).prev = pos;

        let x = self.x(edge);
        loop {
            pos = self.prev(pos);
            if x >= self.x(pos) {
                break;
            }
        }

        let after = self.next(pos);
        self.e_mut(after).prev = edge;
        let e = self.e_mut(edge);
        e.next = after;
        e.prev = pos;
        self.e_mut(pos).next = edge;
    }

    /// Largest number of sample rows every active edge can be stepped
    /// without changing x, or 0 when some edge is sloped or ends inside
    /// the current pixel row.
    pub fn can_full_step(&self, samples_y: i32) -> i32 {
        debug_assert!(!self.is_empty());
        let mut min_height = i32::MAX;
        for i in self.iter() {
            let e = self.e(i);
            if e.dy != 0 {
                return 0;
            }
            min_height = min_height.min(e.height_left);
        }
        if min_height < samples_y {
            0
        } else {
            min_height
        }
    }

    /// Emit the nonzero-winding spans of the current sample row and step
    /// every edge down one sample row.
    pub fn nonzero_subrow<A: CoverageAccumulator>(&mut self, acc: &mut A) {
        let mut edge = self.next(HEAD);
        let mut prev_x = i32::MIN;
        let mut winding = 0;
        let mut xstart = self.x(edge);

        acc.rewind();
        while edge != TAIL {
            let next = self.next(edge);
            let x = self.x(edge);

            winding += self.e(edge).dir;
            if winding == 0 && self.x(next) != x {
                acc.add_subspan(xstart, x);
                xstart = self.x(next);
            }

            self.e_mut(edge).height_left -= 1;
            if self.e(edge).height_left != 0 {
                self.advance(edge);
                let x = self.x(edge);
                if x < prev_x {
                    self.reposition(edge);
                } else {
                    prev_x = x;
                }
            } else {
                self.unlink(edge);
            }
            edge = next;
        }
    }

    /// Emit the spans of a whole pixel row at once. Only valid after
    /// [`can_full_step`](Self::can_full_step) returned non-zero.
    pub fn nonzero_row<A: CoverageAccumulator>(&mut self, acc: &mut A, samples_y: i32) {
        let mut left = self.next(HEAD);
        while left != TAIL {
            let mut winding = self.e(left).dir;
            self.step_rows(left, samples_y);

            let mut right = self.next(left);
            loop {
                debug_assert!(right != TAIL, "unbalanced winding in active list");
                if right == TAIL {
                    return;
                }
                self.step_rows(right, samples_y);
                winding += self.e(right).dir;
                if winding == 0 {
                    break;
                }
                right = self.next(right);
            }

            acc.add_span(self.x(left), self.x(right));
            left = self.next(right);
        }
    }

    fn step_rows(&mut self, i: u32, rows: i32) {
        let e = self.e_mut(i);
        e.height_left -= rows;
        debug_assert!(e.height_left >= 0);
        if e.height_left == 0 {
            self.unlink(i);
        }
    }

    /// Skip `count` pixel rows on an all-vertical list.
    pub fn step_edges(&mut self, count: i32, samples_y: i32) {
        let rows = count * samples_y;
        let mut edge = self.next(HEAD);
        while edge != TAIL {
            let next = self.next(edge);
            self.step_rows(edge, rows);
            edge = next;
        }
    }
}
