//! Edge arena with per-pixel-row insertion buckets.
//!
//! Edges are stored once in a flat arena and linked by index. Slots 0 and 1
//! hold the head and tail sentinels of the active list, so an empty
//! polygon still has two entries. Each real edge is first linked into the
//! bucket of the pixel row containing its top, and is moved to the active
//! list when the sweep reaches that row.

use smallvec::SmallVec;

use crate::active_list::ActiveList;
use crate::basics::PointFixed;
use crate::error::RasterError;
use crate::grid::{floored_divrem, floored_muldivrem, QuoRem};

/// Null link.
pub const NIL: u32 = u32::MAX;
/// Active list head sentinel slot.
pub const HEAD: u32 = 0;
/// Active list tail sentinel slot.
pub const TAIL: u32 = 1;

const EMBEDDED_EDGES: usize = 64;
const EMBEDDED_BUCKETS: usize = 64;

/// Which list currently owns an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    /// Active list head or tail.
    Sentinel,
    /// Waiting in a row bucket for its first row.
    Pending,
    /// In the active list.
    Active,
    /// Consumed or cancelled; no list references it.
    Retired,
}

/// One polygon side clipped to the sweep's vertical extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub next: u32,
    pub prev: u32,
    pub state: EdgeState,
    /// +1 for downward, -1 for upward.
    pub dir: i32,
    /// Sample rows left to sweep.
    pub height_left: i32,
    /// Current x; the remainder is kept biased by `-dy` so an overflow is
    /// detected with `rem >= 0`.
    pub x: QuoRem,
    /// Per-sample-row x increment.
    pub dxdy: QuoRem,
    /// Zero for vertical edges, which never advance.
    pub dy: i32,
    pub ytop: i32,
}

impl Edge {
    fn sentinel(x: i32) -> Self {
        Edge {
            next: NIL,
            prev: NIL,
            state: EdgeState::Sentinel,
            dir: 0,
            height_left: i32::MAX,
            x: QuoRem::new(x, 0),
            dxdy: QuoRem::default(),
            dy: 0,
            ytop: 0,
        }
    }

    /// Would this edge exactly cancel `other` on every row they share?
    #[inline]
    pub fn mirrors(&self, other: &Edge) -> bool {
        self.dir == -other.dir
            && self.height_left == other.height_left
            && self.x == other.x
            && self.dxdy == other.dxdy
    }
}

/// Edge arena plus row buckets, over sample rows `ymin..ymax`.
pub struct Polygon {
    edges: SmallVec<[Edge; EMBEDDED_EDGES]>,
    y_buckets: SmallVec<[u32; EMBEDDED_BUCKETS]>,
    ymin: i32,
    ymax: i32,
    samples_y: i32,
}

impl Polygon {
    /// Reserve room for `num_edges` edges over the sample rows
    /// `ymin..ymax`. Both bounds are multiples of `samples_y`.
    pub fn new(num_edges: usize, ymin: i32, ymax: i32, samples_y: i32) -> Result<Self, RasterError> {
        let height = ymax as i64 - ymin as i64;
        if height < 0 || height > (i32::MAX - samples_y) as i64 {
            return Err(RasterError::ExtentTooLarge { height });
        }
        let num_buckets = ((height + samples_y as i64 - 1) / samples_y as i64) as usize;

        let mut edges: SmallVec<[Edge; EMBEDDED_EDGES]> = SmallVec::new();
        let want = num_edges
            .checked_add(2)
            .ok_or(RasterError::oom("edges", usize::MAX))?;
        edges
            .try_reserve_exact(want)
            .map_err(|_| RasterError::oom("edges", want))?;

        let mut y_buckets: SmallVec<[u32; EMBEDDED_BUCKETS]> = SmallVec::new();
        y_buckets
            .try_reserve_exact(num_buckets)
            .map_err(|_| RasterError::oom("row buckets", num_buckets))?;
        y_buckets.resize(num_buckets, NIL);

        let mut head = Edge::sentinel(i32::MIN);
        let mut tail = Edge::sentinel(i32::MAX);
        head.next = TAIL;
        tail.prev = HEAD;
        edges.push(head);
        edges.push(tail);

        Ok(Self {
            edges,
            y_buckets,
            ymin,
            ymax,
            samples_y,
        })
    }

    #[inline]
    pub fn ymin(&self) -> i32 {
        self.ymin
    }

    #[inline]
    pub fn ymax(&self) -> i32 {
        self.ymax
    }

    /// Real edges stored, sentinels excluded.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len() - 2
    }

    /// Number of pixel rows covered by the buckets.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.y_buckets.len()
    }

    pub fn edge(&self, i: u32) -> &Edge {
        &self.edges[i as usize]
    }

    /// First edge pending in pixel row `row`, or [`NIL`].
    #[inline]
    pub fn bucket(&self, row: usize) -> u32 {
        self.y_buckets[row]
    }

    fn bucket_index(&self, ytop: i32) -> usize {
        ((ytop - self.ymin) / self.samples_y) as usize
    }

    fn push_edge(&mut self, mut e: Edge) {
        debug_assert!(e.height_left > 0);
        let ix = self.bucket_index(e.ytop);
        e.next = self.y_buckets[ix];
        e.prev = NIL;
        e.state = EdgeState::Pending;
        self.y_buckets[ix] = self.edges.len() as u32;
        self.edges.push(e);
    }

    /// Add one side of a trapezoid: the infinite line through
    /// `(x1, y1)`-`(x2, y2)` restricted to rows `top..bottom`. All values
    /// are in grid units.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(&mut self, x1: i32, x2: i32, y1: i32, y2: i32, top: i32, bottom: i32, dir: i32) {
        // The line is infinite; only its slope and a point on it matter.
        let (x1, x2, y1, y2) = if y2 < y1 {
            (x2, x1, y2, y1)
        } else {
            (x1, x2, y1, y2)
        };
        let dy = y2 - y1;
        if dy == 0 {
            return;
        }

        let ytop = top.max(self.ymin);
        let ybot = bottom.min(self.ymax);
        if ybot <= ytop {
            return;
        }

        let (x, dxdy, edge_dy) = edge_start(x1, y1, x2 - x1, dy, ytop);

        self.push_edge(Edge {
            next: NIL,
            prev: NIL,
            state: EdgeState::Pending,
            dir,
            height_left: ybot - ytop,
            x,
            dxdy,
            dy: edge_dy,
            ytop,
        });
    }

    /// Add the segment `p1`-`p2` (grid units) of a closed outline.
    ///
    /// A segment that exactly retraces the previous one in the opposite
    /// direction cancels it: neither is kept.
    pub fn add_line(&mut self, p1: PointFixed, p2: PointFixed) {
        let (p1, p2, dir) = if p2.y < p1.y { (p2, p1, -1) } else { (p1, p2, 1) };
        let dy = p2.y - p1.y;
        if dy == 0 {
            return;
        }

        let top = p1.y.max(self.ymin);
        let bot = p2.y.min(self.ymax);
        if bot <= top {
            return;
        }

        let (x, dxdy, edge_dy) = edge_start(p1.x, p1.y, p2.x - p1.x, dy, top);

        let e = Edge {
            next: NIL,
            prev: NIL,
            state: EdgeState::Pending,
            dir,
            height_left: bot - top,
            x,
            dxdy,
            dy: edge_dy,
            ytop: top,
        };

        if self.edges.len() > 2 {
            let last = self.edges.len() - 1;
            let prev = self.edges[last];
            if prev.ytop == e.ytop && prev.mirrors(&e) {
                // The previous edge heads its bucket since it was the last push.
                let ix = self.bucket_index(prev.ytop);
                debug_assert_eq!(self.y_buckets[ix], last as u32);
                self.y_buckets[ix] = prev.next;
                self.edges.truncate(last);
                return;
            }
        }

        self.push_edge(e);
    }

    /// Split into the sweep's view of the edges and the row buckets.
    pub fn sweep(&mut self) -> (ActiveList<'_>, &[u32]) {
        (ActiveList::new(&mut self.edges[..]), &self.y_buckets[..])
    }
}

/// Position at row `ytop`, per-row step and stored `dy` of the line
/// through `(x1, y1)` with slope `dx / dy` (`dy > 0`). Vertical lines get a
/// zero `dy` so they never step.
fn edge_start(x1: i32, y1: i32, dx: i32, dy: i32, ytop: i32) -> (QuoRem, QuoRem, i32) {
    if dx == 0 {
        return (QuoRem::new(x1, -dy), QuoRem::default(), 0);
    }
    let dxdy = floored_divrem(dx, dy);
    let mut x = if ytop == y1 {
        QuoRem::new(x1, 0)
    } else {
        let mut x = floored_muldivrem(ytop - y1, dx, dy);
        x.quo += x1;
        x
    };
    x.rem -= dy;
    (x, dxdy, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_edges(p: &Polygon, row: usize) -> Vec<u32> {
        let mut v = Vec::new();
        let mut e = p.bucket(row);
        while e != NIL {
            v.push(e);
            e = p.edge(e).next;
        }
        v
    }

    #[test]
    fn test_sentinels() {
        let p = Polygon::new(4, 0, 60, 15).unwrap();
        assert_eq!(p.num_edges(), 0);
        assert_eq!(p.num_rows(), 4);
        assert_eq!(p.edge(HEAD).x.quo, i32::MIN);
        assert_eq!(p.edge(TAIL).x.quo, i32::MAX);
        assert_eq!(p.edge(HEAD).next, TAIL);
    }

    #[test]
    fn test_extent_too_large() {
        let err = Polygon::new(2, 0, i32::MAX, 15).err().unwrap();
        assert!(matches!(err, RasterError::ExtentTooLarge { .. }));
    }

    #[test]
    fn test_add_edge_clips_and_buckets() {
        let mut p = Polygon::new(4, 15, 75, 15).unwrap();
        // Diagonal x = y from y=0, clipped to start at row 15.
        p.add_edge(0, 100, 0, 100, 0, 100, 1);
        let e = *p.edge(2);
        assert_eq!(e.ytop, 15);
        assert_eq!(e.height_left, 60);
        assert_eq!(e.x.quo, 15);
        assert_eq!(e.x.rem, -100);
        assert_eq!(e.dxdy, QuoRem::new(1, 0));
        assert_eq!(bucket_edges(&p, 0), vec![2]);

        // Entirely outside the extent.
        p.add_edge(0, 0, 0, 10, 0, 10, 1);
        assert_eq!(p.num_edges(), 1);
    }

    #[test]
    fn test_vertical_edge_never_steps() {
        let mut p = Polygon::new(2, 0, 30, 15).unwrap();
        p.add_edge(7, 7, 0, 30, 16, 30, -1);
        let e = *p.edge(2);
        assert_eq!(e.dy, 0);
        assert_eq!(e.x.quo, 7);
        assert_eq!(e.dir, -1);
        assert_eq!(bucket_edges(&p, 1), vec![2]);
    }

    #[test]
    fn test_add_line_direction() {
        let mut p = Polygon::new(2, 0, 30, 15).unwrap();
        p.add_line(PointFixed::new(5, 20), PointFixed::new(5, 2));
        let e = *p.edge(2);
        assert_eq!(e.dir, -1);
        assert_eq!(e.ytop, 2);
        assert_eq!(e.height_left, 18);
    }

    #[test]
    fn test_retraced_line_cancels() {
        let mut p = Polygon::new(4, 0, 30, 15).unwrap();
        p.add_line(PointFixed::new(0, 0), PointFixed::new(10, 20));
        assert_eq!(p.num_edges(), 1);
        p.add_line(PointFixed::new(10, 20), PointFixed::new(0, 0));
        assert_eq!(p.num_edges(), 0);
        assert_eq!(p.bucket(0), NIL);

        // Same geometry in the same direction is kept.
        p.add_line(PointFixed::new(0, 0), PointFixed::new(10, 20));
        p.add_line(PointFixed::new(0, 0), PointFixed::new(10, 20));
        assert_eq!(p.num_edges(), 2);
    }

    #[test]
    fn test_horizontal_line_dropped() {
        let mut p = Polygon::new(1, 0, 30, 15).unwrap();
        p.add_line(PointFixed::new(0, 4), PointFixed::new(10, 4));
        assert_eq!(p.num_edges(), 0);
    }

    #[test]
    fn test_edge_and_line_agree() {
        // The same clipped segment through either entry point.
        for (x1, y1, x2, y2) in [(3, -7, 40, 52), (-9, 4, -30, 31), (12, 0, 12, 45)] {
            let mut a = Polygon::new(2, 0, 45, 15).unwrap();
            a.add_edge(x1, x2, y1, y2, y1, y2, 1);
            let mut b = Polygon::new(2, 0, 45, 15).unwrap();
            b.add_line(PointFixed::new(x1, y1), PointFixed::new(x2, y2));
            assert_eq!(a.edge(2), b.edge(2), "line ({x1}, {y1})-({x2}, {y2})");
        }
    }
}
