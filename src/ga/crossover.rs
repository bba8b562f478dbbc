use std::collections::{HashMap, HashSet};

use fixedbitset::FixedBitSet;
use rand::Rng;

/// Crossover strategy combining two parent orderings into two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crossover {
    /// Naive single-point positional splice (see [`single_point`]).
    ///
    /// This is *not* permutation-preserving: children of two permutations may contain duplicate
    /// tasks and miss others.
    #[default]
    SinglePoint,
    /// Partially-mapped crossover (PMX, Goldberg & Lingle, 1985), see [`partially_mapped`].
    PartiallyMapped,
    /// Linear order crossover (LOX, Falkenauer & Bouffouix, 1991), see [`linear_order`].
    Order,
}

impl Crossover {
    /// Produce two children of parents `p1` and `p2` with uniformly random cut points in
    /// `[0, n]` where `n` is the length of the shorter parent.
    pub fn apply<R>(&self, p1: &[usize], p2: &[usize], rng: &mut R) -> (Vec<usize>, Vec<usize>)
    where
        R: Rng + ?Sized,
    {
        let n = p1.len().min(p2.len());
        match self {
            Self::SinglePoint => single_point(p1, p2, rng.gen_range(0..=n)),
            Self::PartiallyMapped => {
                let (lo, hi) = segment(n, rng);
                (
                    partially_mapped(p1, p2, lo, hi),
                    partially_mapped(p2, p1, lo, hi),
                )
            }
            Self::Order => {
                let (lo, hi) = segment(n, rng);
                (linear_order(p1, p2, lo, hi), linear_order(p2, p1, lo, hi))
            }
        }
    }
}

fn segment<R>(n: usize, rng: &mut R) -> (usize, usize)
where
    R: Rng + ?Sized,
{
    let a = rng.gen_range(0..=n);
    let b = rng.gen_range(0..=n);
    (a.min(b), a.max(b))
}

/// Splice the prefix `..point` of one parent with the suffix `point..` of the other.
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::ga::crossover;
///
/// let (c1, c2) = crossover::single_point(&[0, 1, 2, 3], &[3, 2, 1, 0], 1);
/// assert_eq!(c1, vec![0, 2, 1, 0]);
/// assert_eq!(c2, vec![3, 1, 2, 3]);
/// ```
pub fn single_point(p1: &[usize], p2: &[usize], point: usize) -> (Vec<usize>, Vec<usize>) {
    let point = point.min(p1.len()).min(p2.len());
    let c1 = p1[..point].iter().chain(&p2[point..]).copied().collect();
    let c2 = p2[..point].iter().chain(&p1[point..]).copied().collect();
    (c1, c2)
}

/// PMX child which inherits the segment `lo..hi` from `template` and the remaining positions
/// from `donor`, resolving conflicts through the mapping defined by the segment.
///
/// The child is a permutation whenever both parents are permutations of the same set.
pub fn partially_mapped(template: &[usize], donor: &[usize], lo: usize, hi: usize) -> Vec<usize> {
    let n = template.len().min(donor.len());
    let hi = hi.min(n);
    let lo = lo.min(hi);
    let in_segment = |k: usize| lo <= k && k < hi;

    let mut child: Vec<Option<usize>> = vec![None; n];
    for k in lo..hi {
        child[k] = Some(template[k]);
    }

    let taken: HashSet<usize> = template[lo..hi].iter().copied().collect();
    let position: HashMap<usize, usize> =
        donor[..n].iter().enumerate().map(|(k, &v)| (v, k)).collect();

    for k in lo..hi {
        let v = donor[k];
        if taken.contains(&v) {
            continue;
        }

        // follow template -> donor mapping until leaving the segment (bounded for non-permutations)
        let mut pos = k;
        for _ in 0..=n {
            if !in_segment(pos) {
                break;
            }
            match position.get(&template[pos]) {
                Some(&next) => pos = next,
                None => break,
            }
        }

        if !in_segment(pos) && child[pos].is_none() {
            child[pos] = Some(v);
        }
    }

    child
        .into_iter()
        .zip(donor)
        .map(|(c, &d)| c.unwrap_or(d))
        .collect()
}

/// LOX child which inherits the segment `lo..hi` from `template` and fills the remaining
/// positions left to right with the tasks of `donor` not in the segment, in `donor`'s order.
///
/// The child is a permutation whenever both parents are permutations of the same set.
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::ga::crossover;
///
/// let child = crossover::linear_order(&[0, 1, 2, 3, 4], &[4, 3, 2, 1, 0], 1, 3);
/// assert_eq!(child, vec![4, 1, 2, 3, 0]);
/// ```
pub fn linear_order(template: &[usize], donor: &[usize], lo: usize, hi: usize) -> Vec<usize> {
    let n = template.len().min(donor.len());
    let hi = hi.min(n);
    let lo = lo.min(hi);

    let taken: HashSet<usize> = template[lo..hi].iter().copied().collect();
    let mut fill = donor.iter().copied().filter(|v| !taken.contains(v));

    (0..n)
        .map(|k| {
            if lo <= k && k < hi {
                template[k]
            } else {
                fill.next().unwrap_or(template[k])
            }
        })
        .collect()
}

/// Check whether `order` is a permutation of tasks `0..n`.
pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = FixedBitSet::with_capacity(n);
    order.iter().all(|&j| j < n && !seen.put(j))
}
