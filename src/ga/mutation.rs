use rand::prelude::*;

/// In-place perturbation of a task ordering which preserves the multiset of its elements.
pub trait Mutate<T>
where
    T: Clone,
{
    fn mutate<R>(&self, xs: &mut [T], rng: &mut R)
    where
        R: Rng + ?Sized;

    fn copy_mutate<R>(&self, xs: &[T], rng: &mut R) -> Vec<T>
    where
        R: Rng + ?Sized,
    {
        let mut xs = xs.to_vec();
        self.mutate(&mut xs, rng);
        xs
    }
}

/// Mutation operator applied to a single ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutation {
    /// Exchange two random positions.
    #[default]
    Swap,
    /// Remove an element from a random position and re-insert it at another one.
    Insert,
}

impl<T> Mutate<T> for Mutation
where
    T: Clone,
{
    fn mutate<R>(&self, xs: &mut [T], rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let n = xs.len();
        if n < 2 {
            return;
        }

        let i = rng.gen_range(0..n);
        let j = rng.gen_range(0..n);

        match self {
            Self::Swap => xs.swap(i, j),
            Self::Insert if i < j => xs[i..=j].rotate_left(1),
            Self::Insert => xs[j..=i].rotate_right(1),
        }
    }
}

/// Applies a [`Mutation`] with given probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutator {
    rate: f64,
    operator: Mutation,
}

impl Mutator {
    /// Create new mutator, `rate` is clamped into `[0, 1]` and `NaN` is treated as zero.
    pub fn new(operator: Mutation, rate: f64) -> Self {
        let rate = if rate.is_nan() { 0. } else { rate.clamp(0., 1.) };
        Self { rate, operator }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn operator(&self) -> Mutation {
        self.operator
    }
}

impl<T> Mutate<T> for Mutator
where
    T: Clone,
{
    fn mutate<R>(&self, xs: &mut [T], rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if self.rate > 0. && rng.gen_bool(self.rate) {
            self.operator.mutate(xs, rng);
        }
    }
}
