//! Sequential neighbor walk assigning integer grid cells.
//!
//! Each walk is a pure function over one sorted sequence: it proposes
//! correspondences and reports the last anchored one so a following walk
//! can keep accumulating from it. Proposals are merged through
//! [`GridMatcher::add`](super::GridMatcher::add), which drops repeats.

use super::spacing::{GridAxis, ToleranceBand};
use super::Correspondence;

/// Proposals from one walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisWalk {
    pub proposals: Vec<Correspondence>,
    /// Last correspondence the walk stepped to.
    pub last: Option<Correspondence>,
    /// Adjacent pairs accepted by the band.
    pub matched_pairs: usize,
    /// Adjacent pairs rejected by the band.
    pub skipped_pairs: usize,
}

/// Grid cell nearest to `image` at `pixel_pitch` pixels per step.
pub fn seed_cell(image: [f64; 2], pixel_pitch: [f64; 2]) -> [i32; 2] {
    [
        (image[0] / pixel_pitch[0]).round() as i32,
        (image[1] / pixel_pitch[1]).round() as i32,
    ]
}

/// Signed whole grid steps from `from` to `to`, rounded half away from zero.
pub fn cell_step(from: [f64; 2], to: [f64; 2], pixel_pitch: [f64; 2]) -> [i32; 2] {
    [
        ((to[0] - from[0]) / pixel_pitch[0]).round() as i32,
        ((to[1] - from[1]) / pixel_pitch[1]).round() as i32,
    ]
}

fn offset(c: Correspondence, to: [f64; 2], pixel_pitch: [f64; 2]) -> Correspondence {
    let step = cell_step(c.image, to, pixel_pitch);
    Correspondence {
        image: to,
        grid: [c.grid[0] + step[0], c.grid[1] + step[1]],
    }
}

/// Walk adjacent pairs of `sorted` (ordered by `axis.order()`), accepting a
/// pair when its gap along `axis` lies in `band`.
///
/// With no `anchor` the first accepted pair is seeded from absolute
/// position. Otherwise every step accumulates from the anchor; when the
/// first point of an accepted pair is not the point last stepped to, it is
/// anchored first so skipped pairs never lose accumulated steps.
pub fn walk_axis(
    sorted: &[[f64; 2]],
    axis: GridAxis,
    band: &ToleranceBand,
    pixel_pitch: [f64; 2],
    anchor: Option<Correspondence>,
) -> AxisWalk {
    let c = axis.component();
    let mut walk = AxisWalk {
        last: anchor,
        ..AxisWalk::default()
    };

    for pair in sorted.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        if !band.contains(p1[c] - p0[c]) {
            walk.skipped_pairs += 1;
            continue;
        }
        walk.matched_pairs += 1;

        let from = match walk.last {
            None => {
                let seeded = Correspondence {
                    image: p0,
                    grid: seed_cell(p0, pixel_pitch),
                };
                walk.proposals.push(seeded);
                seeded
            }
            Some(last) if last.image != p0 => {
                let anchored = offset(last, p0, pixel_pitch);
                walk.proposals.push(anchored);
                anchored
            }
            Some(last) => last,
        };
        let next = offset(from, p1, pixel_pitch);
        walk.proposals.push(next);
        walk.last = Some(next);
    }

    tracing::debug!(
        axis = axis.prefix(),
        matched = walk.matched_pairs,
        skipped = walk.skipped_pairs,
        proposals = walk.proposals.len(),
        "grid walk finished"
    );
    walk
}
