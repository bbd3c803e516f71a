//! Selection policy - which dance plays next
//!
//! everything here is pure over a [`Scope`]: the active queue when one is set,
//! otherwise the whole catalog in catalog order.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Direction of a manual step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Candidate indices for selection
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    len: usize,
    queue: Option<&'a [usize]>,
}

impl<'a> Scope<'a> {
    /// Scope over a catalog of `len` entries, narrowed by `queue` when present
    pub fn new(len: usize, queue: Option<&'a [usize]>) -> Self {
        Self { len, queue }
    }

    pub fn size(&self) -> usize {
        match self.queue {
            Some(queue) => queue.len(),
            None => self.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        match self.queue {
            Some(queue) => queue.get(position).copied(),
            None => (position < self.len).then_some(position),
        }
    }

    /// Position of a catalog index inside the scope
    pub fn position(&self, index: usize) -> Option<usize> {
        match self.queue {
            Some(queue) => queue.iter().position(|&i| i == index),
            None => (index < self.len).then_some(index),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.position(index).is_some()
    }

    pub fn first(&self) -> Option<usize> {
        self.get(0)
    }

    fn items(&self) -> Vec<usize> {
        (0..self.size()).filter_map(|p| self.get(p)).collect()
    }
}

/// Circular step through the scope
///
/// With no current entry, or one outside the scope, both directions land on the first item.
pub fn next_sequential(scope: Scope<'_>, current: Option<usize>, direction: Direction) -> Option<usize> {
    let size = scope.size();
    if size == 0 {
        return None;
    }

    match current.and_then(|c| scope.position(c)) {
        Some(pos) => {
            let next = match direction {
                Direction::Forward => (pos + 1) % size,
                Direction::Backward => (pos + size - 1) % size,
            };
            scope.get(next)
        }
        None => scope.first(),
    }
}

/// Uniform pick from the scope, never `current` when there is a choice
pub fn pick_random_excluding<R: Rng + ?Sized>(
    scope: Scope<'_>,
    current: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    let items = scope.items();
    if items.len() <= 1 {
        return items.first().copied();
    }

    let candidates: Vec<usize> = items.into_iter().filter(|&i| Some(i) != current).collect();
    candidates.choose(rng).copied()
}

/// Entry to start from: the current one if it is in scope, else the first of the scope
pub fn resolve_playable(scope: Scope<'_>, current: Option<usize>) -> Option<usize> {
    match current {
        Some(c) if scope.contains(c) => Some(c),
        _ => scope.first(),
    }
}

/// Drop out-of-range and repeated indices; an empty result means no queue
pub fn normalize_queue(indices: &[usize], len: usize) -> Option<Vec<usize>> {
    let mut seen = HashSet::new();
    let queue: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| i < len && seen.insert(i))
        .collect();

    (!queue.is_empty()).then_some(queue)
}

/// Loop and shuffle switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub loop_on: bool,
    pub shuffle_on: bool,
}

impl SelectionPolicy {
    pub fn new(loop_on: bool, shuffle_on: bool) -> Self {
        Self { loop_on, shuffle_on }
    }

    /// Next/previous pressed by the user; loop does not apply
    pub fn next_manual<R: Rng + ?Sized>(
        &self,
        scope: Scope<'_>,
        current: Option<usize>,
        direction: Direction,
        rng: &mut R,
    ) -> Option<usize> {
        if self.shuffle_on {
            pick_random_excluding(scope, current, rng)
        } else {
            next_sequential(scope, current, direction)
        }
    }

    /// Entry to play when the current one finishes
    pub fn next_auto<R: Rng + ?Sized>(
        &self,
        scope: Scope<'_>,
        current: Option<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        match current {
            Some(c) if self.loop_on && c < scope.len => Some(c),
            _ if self.shuffle_on => pick_random_excluding(scope, current, rng),
            _ => next_sequential(scope, current, Direction::Forward),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_sequential_wraps_around() {
        let scope = Scope::new(3, None);
        assert_eq!(next_sequential(scope, Some(2), Direction::Forward), Some(0));
        assert_eq!(next_sequential(scope, Some(0), Direction::Backward), Some(2));
        assert_eq!(next_sequential(scope, Some(1), Direction::Forward), Some(2));
        assert_eq!(next_sequential(scope, None, Direction::Forward), Some(0));
        assert_eq!(next_sequential(scope, None, Direction::Backward), Some(0));
        assert_eq!(next_sequential(Scope::new(0, None), None, Direction::Forward), None);
    }

    #[test]
    fn test_sequential_follows_queue() {
        let queue = [4, 1, 7];
        let scope = Scope::new(10, Some(&queue));
        assert_eq!(next_sequential(scope, Some(1), Direction::Forward), Some(7));
        assert_eq!(next_sequential(scope, Some(4), Direction::Backward), Some(7));
        // current outside the queue
        assert_eq!(next_sequential(scope, Some(3), Direction::Forward), Some(4));
        assert_eq!(next_sequential(scope, Some(3), Direction::Backward), Some(4));
    }

    #[test]
    fn test_shuffle_never_repeats_current() {
        let mut rng = rng();
        let policy = SelectionPolicy::new(false, true);
        let scope = Scope::new(4, None);
        for _ in 0..200 {
            let next = policy.next_manual(scope, Some(2), Direction::Forward, &mut rng).unwrap();
            assert_ne!(next, 2);
            assert!(next < 4);
        }

        let single = [5];
        assert_eq!(
            policy.next_auto(Scope::new(6, Some(&single)), Some(5), &mut rng),
            Some(5)
        );
    }

    #[test]
    fn test_auto_advance_policies() {
        let mut rng = rng();
        let scope = Scope::new(3, None);

        let looping = SelectionPolicy::new(true, true);
        assert_eq!(looping.next_auto(scope, Some(1), &mut rng), Some(1));

        let plain = SelectionPolicy::default();
        assert_eq!(plain.next_auto(scope, Some(2), &mut rng), Some(0));
        assert_eq!(plain.next_auto(scope, None, &mut rng), Some(0));

        // loop without a current entry falls back to sequential
        assert_eq!(SelectionPolicy::new(true, false).next_auto(scope, None, &mut rng), Some(0));
    }

    #[test]
    fn test_resolve_playable() {
        let queue = [2, 0];
        let scope = Scope::new(3, Some(&queue));
        assert_eq!(resolve_playable(scope, Some(0)), Some(0));
        assert_eq!(resolve_playable(scope, Some(1)), Some(2));
        assert_eq!(resolve_playable(scope, None), Some(2));
        assert_eq!(resolve_playable(Scope::new(0, None), None), None);
    }

    #[test]
    fn test_normalize_queue() {
        assert_eq!(normalize_queue(&[3, 1, 3, 9, 0], 4), Some(vec![3, 1, 0]));
        assert_eq!(normalize_queue(&[9], 4), None);
        assert_eq!(normalize_queue(&[], 4), None);
    }
}
