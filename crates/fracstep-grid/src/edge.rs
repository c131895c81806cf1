//! Axis topology: bounded or periodic.

/// How an axis treats indices that step past its ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeBehavior {
    /// Out-of-range indices hit a physical boundary (ghost values apply).
    Bounded,
    /// Out-of-range indices wrap to the opposite side.
    Wrap,
}

/// Outcome of resolving an index along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// The index lies inside the axis (possibly after wrapping).
    Inside(usize),
    /// The index stepped below zero on a bounded axis.
    Below,
    /// The index stepped past the last entry on a bounded axis.
    Above,
}

/// Resolve a single axis index under the given edge behavior.
///
/// # Examples
///
/// ```
/// use fracstep_grid::{resolve_axis, EdgeBehavior, Resolved};
///
/// assert_eq!(resolve_axis(-1, 5, EdgeBehavior::Wrap), Resolved::Inside(4));
/// assert_eq!(resolve_axis(-1, 5, EdgeBehavior::Bounded), Resolved::Below);
/// assert_eq!(resolve_axis(5, 5, EdgeBehavior::Bounded), Resolved::Above);
/// ```
pub fn resolve_axis(val: isize, len: usize, edge: EdgeBehavior) -> Resolved {
    let n = len as isize;
    if val >= 0 && val < n {
        return Resolved::Inside(val as usize);
    }
    match edge {
        EdgeBehavior::Wrap if n > 0 => Resolved::Inside((((val % n) + n) % n) as usize),
        _ if val < 0 => Resolved::Below,
        _ => Resolved::Above,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_axis_in_bounds() {
        assert_eq!(resolve_axis(2, 5, EdgeBehavior::Bounded), Resolved::Inside(2));
        assert_eq!(resolve_axis(0, 5, EdgeBehavior::Wrap), Resolved::Inside(0));
    }

    #[test]
    fn resolve_axis_bounded_out_of_range() {
        assert_eq!(resolve_axis(-1, 5, EdgeBehavior::Bounded), Resolved::Below);
        assert_eq!(resolve_axis(5, 5, EdgeBehavior::Bounded), Resolved::Above);
    }

    #[test]
    fn resolve_axis_wrap() {
        assert_eq!(resolve_axis(-1, 5, EdgeBehavior::Wrap), Resolved::Inside(4));
        assert_eq!(resolve_axis(5, 5, EdgeBehavior::Wrap), Resolved::Inside(0));
        assert_eq!(resolve_axis(7, 5, EdgeBehavior::Wrap), Resolved::Inside(2));
    }

    #[test]
    fn empty_axis_never_inside() {
        assert_eq!(resolve_axis(0, 0, EdgeBehavior::Wrap), Resolved::Above);
        assert_eq!(resolve_axis(-1, 0, EdgeBehavior::Bounded), Resolved::Below);
    }
}
