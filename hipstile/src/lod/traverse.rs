//! Depth-first walk over the healpix quadtree.

use crate::healpix::{HealpixAddress, MAX_ORDER};

/// What to do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Visit the node's four children.
    Descend,
    /// Skip the node's children but keep walking its siblings.
    StopSubtree,
    /// End the whole walk with a caller-chosen signal.
    Abort(i32),
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseOutcome {
    Completed,
    /// The predicate asked to descend below [`MAX_ORDER`].
    LimitReached,
    Aborted(i32),
}

/// Walk the quadtree from the twelve base tiles, depth first, children in
/// index order.
pub fn traverse<F>(mut visit: F) -> TraverseOutcome
where
    F: FnMut(HealpixAddress) -> Visit,
{
    let mut stack: Vec<HealpixAddress> = HealpixAddress::base_faces().collect();
    stack.reverse();

    while let Some(address) = stack.pop() {
        match visit(address) {
            Visit::Descend => {
                if address.order() >= MAX_ORDER {
                    return TraverseOutcome::LimitReached;
                }
                stack.extend(address.children().into_iter().rev());
            }
            Visit::StopSubtree => {}
            Visit::Abort(signal) => return TraverseOutcome::Aborted(signal),
        }
    }
    TraverseOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visits_base_faces_in_order() {
        let mut seen = Vec::new();
        let outcome = traverse(|a| {
            seen.push(a);
            Visit::StopSubtree
        });
        assert_eq!(outcome, TraverseOutcome::Completed);
        assert_eq!(seen.len(), 12);
        assert!(seen.iter().enumerate().all(|(i, a)| a.order() == 0 && a.pix() == i as u64));
    }

    #[test]
    fn test_depth_first_order() {
        let mut seen = Vec::new();
        traverse(|a| {
            seen.push((a.order(), a.pix()));
            if a.order() < 1 && a.pix() == 0 {
                Visit::Descend
            } else {
                Visit::StopSubtree
            }
        });
        assert_eq!(
            &seen[..6],
            &[(0, 0), (1, 0), (1, 1), (1, 2), (1, 3), (0, 1)]
        );
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn test_full_walk_to_order_2() {
        let mut count = 0;
        traverse(|a| {
            count += 1;
            if a.order() < 2 {
                Visit::Descend
            } else {
                Visit::StopSubtree
            }
        });
        assert_eq!(count, 12 + 48 + 192);
    }

    #[test]
    fn test_abort_returns_signal() {
        let mut visited = 0;
        let outcome = traverse(|a| {
            visited += 1;
            if a.order() == 1 && a.pix() == 2 {
                Visit::Abort(-7)
            } else if a.order() < 1 {
                Visit::Descend
            } else {
                Visit::StopSubtree
            }
        });
        assert_eq!(outcome, TraverseOutcome::Aborted(-7));
        assert_eq!(visited, 4);
    }

    #[test]
    fn test_limit_reached() {
        assert_eq!(traverse(|_| Visit::Descend), TraverseOutcome::LimitReached);
    }
}
