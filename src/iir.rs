//! First and second order recursive filters.
//!
//! ```text
//!        b0 + b1*z^-1 + b2*z^-2
//! H(z) = ----------------------
//!         1 + a1*z^-1 + a2*z^-2
//! ```
//!
//! Two state layouts compute the same transfer function. [`direct`] keeps the
//! last inputs and outputs (direct form I), [`transposed`] keeps partial sums
//! (transposed direct form II). The transposed layout touches fewer registers
//! and copes better with coefficients that change while running, so the
//! unqualified [`Iir1`] and [`Iir2`] aliases point at it.

use std::fmt::Debug;

use num_traits::{Float as NumFloat, FloatConst};

/// Sample type every generic block in this crate runs on. Implemented for `f32` and `f64`.
pub trait Float: NumFloat + FloatConst + Default + Debug + Send + Sync + 'static {
    fn from_f64(v: f64) -> Self;
}

impl Float for f32 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Float for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Anything that turns one input sample into one output sample and carries state.
pub trait Filter<T: Float> {
    fn process(&mut self, x: T) -> T;

    /// Clears the running state. Coefficients and design parameters are kept.
    fn reset(&mut self);

    fn process_block(&mut self, input: &[T], output: &mut [T]) {
        for (y, &x) in output.iter_mut().zip(input) {
            *y = self.process(x);
        }
    }

    fn process_in_place(&mut self, buffer: &mut [T]) {
        for s in buffer.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// A recursive filter with a swappable coefficient set.
pub trait Iir<T: Float>: Filter<T> + Default {
    type Coefs: Copy + Default + PartialEq + Debug;

    fn coefficients(&self) -> Self::Coefs;

    fn set_coefficients(&mut self, coefs: Self::Coefs);

    fn copy_coefficients(&mut self, other: &Self) {
        self.set_coefficients(other.coefficients());
    }
}

/// `b0 + b1*z^-1` over `1 + a1*z^-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefs1<T> {
    pub a1: T,
    pub b0: T,
    pub b1: T,
}

impl<T: Float> Default for Coefs1<T> {
    fn default() -> Self {
        Coefs1 { a1: T::zero(), b0: T::one(), b1: T::zero() }
    }
}

/// `b0 + b1*z^-1 + b2*z^-2` over `1 + a1*z^-1 + a2*z^-2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefs2<T> {
    pub a1: T,
    pub a2: T,
    pub b0: T,
    pub b1: T,
    pub b2: T,
}

impl<T: Float> Default for Coefs2<T> {
    fn default() -> Self {
        Coefs2 { a1: T::zero(), a2: T::zero(), b0: T::one(), b1: T::zero(), b2: T::zero() }
    }
}

pub trait FirstOrder<T: Float>: Iir<T, Coefs = Coefs1<T>> {}
impl<T: Float, F: Iir<T, Coefs = Coefs1<T>>> FirstOrder<T> for F {}

pub trait SecondOrder<T: Float>: Iir<T, Coefs = Coefs2<T>> {}
impl<T: Float, F: Iir<T, Coefs = Coefs2<T>>> SecondOrder<T> for F {}

pub mod direct {
    //! Direct form I: `y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]`.

    use super::{Coefs1, Coefs2, Filter, Float, Iir};

    #[derive(Debug, Clone, Default)]
    pub struct Iir1<T: Float> {
        coefs: Coefs1<T>,
        x1: T,
        y1: T,
    }

    impl<T: Float> Filter<T> for Iir1<T> {
        #[inline]
        fn process(&mut self, x: T) -> T {
            let c = &self.coefs;
            let y = c.b0 * x + c.b1 * self.x1 - c.a1 * self.y1;
            self.x1 = x;
            self.y1 = y;
            y
        }

        fn reset(&mut self) {
            self.x1 = T::zero();
            self.y1 = T::zero();
        }
    }

    impl<T: Float> Iir<T> for Iir1<T> {
        type Coefs = Coefs1<T>;

        fn coefficients(&self) -> Coefs1<T> {
            self.coefs
        }

        fn set_coefficients(&mut self, coefs: Coefs1<T>) {
            self.coefs = coefs;
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct Iir2<T: Float> {
        coefs: Coefs2<T>,
        x1: T,
        x2: T,
        y1: T,
        y2: T,
    }

    impl<T: Float> Filter<T> for Iir2<T> {
        #[inline]
        fn process(&mut self, x: T) -> T {
            let c = &self.coefs;
            let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
            self.x2 = self.x1;
            self.x1 = x;
            self.y2 = self.y1;
            self.y1 = y;
            y
        }

        fn reset(&mut self) {
            self.x1 = T::zero();
            self.x2 = T::zero();
            self.y1 = T::zero();
            self.y2 = T::zero();
        }
    }

    impl<T: Float> Iir<T> for Iir2<T> {
        type Coefs = Coefs2<T>;

        fn coefficients(&self) -> Coefs2<T> {
            self.coefs
        }

        fn set_coefficients(&mut self, coefs: Coefs2<T>) {
            self.coefs = coefs;
        }
    }
}

pub mod transposed {
    //! Transposed direct form II:
    //! `y = b0*x + s1; s1 = b1*x - a1*y + s2; s2 = b2*x - a2*y`.

    use super::{Coefs1, Coefs2, Filter, Float, Iir};

    #[derive(Debug, Clone, Default)]
    pub struct Iir1<T: Float> {
        coefs: Coefs1<T>,
        s1: T,
    }

    impl<T: Float> Filter<T> for Iir1<T> {
        #[inline]
        fn process(&mut self, x: T) -> T {
            let c = &self.coefs;
            let y = c.b0 * x + self.s1;
            self.s1 = c.b1 * x - c.a1 * y;
            y
        }

        fn reset(&mut self) {
            self.s1 = T::zero();
        }
    }

    impl<T: Float> Iir<T> for Iir1<T> {
        type Coefs = Coefs1<T>;

        fn coefficients(&self) -> Coefs1<T> {
            self.coefs
        }

        fn set_coefficients(&mut self, coefs: Coefs1<T>) {
            self.coefs = coefs;
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct Iir2<T: Float> {
        coefs: Coefs2<T>,
        s1: T,
        s2: T,
    }

    impl<T: Float> Filter<T> for Iir2<T> {
        #[inline]
        fn process(&mut self, x: T) -> T {
            let c = &self.coefs;
            let y = c.b0 * x + self.s1;
            self.s1 = c.b1 * x - c.a1 * y + self.s2;
            self.s2 = c.b2 * x - c.a2 * y;
            y
        }

        fn reset(&mut self) {
            self.s1 = T::zero();
            self.s2 = T::zero();
        }
    }

    impl<T: Float> Iir<T> for Iir2<T> {
        type Coefs = Coefs2<T>;

        fn coefficients(&self) -> Coefs2<T> {
            self.coefs
        }

        fn set_coefficients(&mut self, coefs: Coefs2<T>) {
            self.coefs = coefs;
        }
    }
}

pub type Iir1<T> = transposed::Iir1<T>;
pub type Iir2<T> = transposed::Iir2<T>;

pub type Iir1F = Iir1<f32>;
pub type Iir1D = Iir1<f64>;
pub type Iir2F = Iir2<f32>;
pub type Iir2D = Iir2<f64>;
