use crate::{Dim, Dyn, Fixed};
use core::fmt::Debug;

/// Rank of every shape and stride descriptor.
pub const RANK: usize = 5;

/// Any [Shape], whatever mix of fixed and runtime dimensions it has.
pub trait ShapeDescriptor: Copy + Debug + Send + Sync + 'static {
    /// The compile-time value of each dimension.
    const FIXED: [Option<usize>; RANK];

    /// The value of dimension `dim`.
    fn get(&self, dim: usize) -> usize;

    /// All dimensions, outermost first.
    fn to_array(&self) -> [usize; RANK];
}

/// Any [Stride], whatever mix of fixed and runtime dimensions it has.
pub trait StrideDescriptor: Copy + Debug + Send + Sync + 'static {
    /// The compile-time value of each dimension.
    const FIXED: [Option<usize>; RANK];

    /// The value of dimension `dim`.
    fn get(&self, dim: usize) -> usize;

    /// All dimensions, outermost first.
    fn to_array(&self) -> [usize; RANK];
}

macro_rules! descriptor {
    ($(#[$meta:meta])* $name:ident, $trait:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub struct $name<D0: Dim = Dyn, D1: Dim = Dyn, D2: Dim = Dyn, D3: Dim = Dyn, D4: Dim = Dyn> {
            dims: (D0, D1, D2, D3, D4),
        }

        impl<D0: Dim, D1: Dim, D2: Dim, D3: Dim, D4: Dim> $name<D0, D1, D2, D3, D4> {
            /// The compile-time value of each dimension.
            pub const FIXED: [Option<usize>; RANK] =
                [D0::FIXED, D1::FIXED, D2::FIXED, D3::FIXED, D4::FIXED];

            /// Number of dimensions supplied at run time.
            pub const RUNTIME_DIMS: usize = D0::FIXED.is_none() as usize
                + D1::FIXED.is_none() as usize
                + D2::FIXED.is_none() as usize
                + D3::FIXED.is_none() as usize
                + D4::FIXED.is_none() as usize;

            #[doc = concat!("Create the ", $what, " from one value per runtime dimension, outermost first.")]
            ///
            /// Passing a different number of values than there are runtime dimensions does
            /// not compile.
            pub fn new<const N: usize>(values: [usize; N]) -> Self {
                const {
                    assert!(
                        N == Self::RUNTIME_DIMS,
                        "The number of values must match the number of runtime dimensions"
                    )
                };
                let mut values = values.into_iter();

                Self {
                    dims: (
                        D0::from_values(&mut values),
                        D1::from_values(&mut values),
                        D2::from_values(&mut values),
                        D3::from_values(&mut values),
                        D4::from_values(&mut values),
                    ),
                }
            }

            /// The value of dimension `dim`.
            ///
            /// # Panics
            ///
            /// If `dim` is not smaller than the rank.
            pub fn get(&self, dim: usize) -> usize {
                match dim {
                    0 => self.dims.0.get(),
                    1 => self.dims.1.get(),
                    2 => self.dims.2.get(),
                    3 => self.dims.3.get(),
                    4 => self.dims.4.get(),
                    _ => panic!("Dimension {dim} is out of range for rank {RANK}"),
                }
            }

            /// All dimensions, outermost first.
            pub fn to_array(&self) -> [usize; RANK] {
                [
                    self.dims.0.get(),
                    self.dims.1.get(),
                    self.dims.2.get(),
                    self.dims.3.get(),
                    self.dims.4.get(),
                ]
            }

            /// Whether every dimension is known at compile time.
            pub const fn is_static() -> bool {
                Self::RUNTIME_DIMS == 0
            }
        }

        impl<D0: Dim, D1: Dim, D2: Dim, D3: Dim, D4: Dim> $trait for $name<D0, D1, D2, D3, D4> {
            const FIXED: [Option<usize>; RANK] = Self::FIXED;

            fn get(&self, dim: usize) -> usize {
                Self::get(self, dim)
            }

            fn to_array(&self) -> [usize; RANK] {
                Self::to_array(self)
            }
        }

        impl<D0: Dim, D1: Dim, D2: Dim, D3: Dim, D4: Dim> Default for $name<D0, D1, D2, D3, D4> {
            fn default() -> Self {
                Self {
                    dims: (
                        D0::default_value(),
                        D1::default_value(),
                        D2::default_value(),
                        D3::default_value(),
                        D4::default_value(),
                    ),
                }
            }
        }

        impl<D0: Dim, D1: Dim, D2: Dim, D3: Dim, D4: Dim> core::fmt::Display
            for $name<D0, D1, D2, D3, D4>
        {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let [d0, d1, d2, d3, d4] = self.to_array();
                write!(f, "[{d0}, {d1}, {d2}, {d3}, {d4}]")
            }
        }
    };
}

descriptor!(
    /// Extents of a 5-D tensor region, outermost dimension first.
    ///
    /// Every dimension is independently fixed at compile time or supplied at run time:
    ///
    /// ```rust
    /// use tilecl_zspace::{Dyn, Fixed, Shape};
    ///
    /// let shape = Shape::<Fixed<1>, Fixed<1>, Fixed<1>, Dyn, Fixed<128>>::new([64]);
    /// assert_eq!(shape.to_array(), [1, 1, 1, 64, 128]);
    /// ```
    Shape,
    ShapeDescriptor,
    "shape"
);

descriptor!(
    /// Element strides of a 5-D tensor region, paired one to one with a [Shape].
    Stride,
    StrideDescriptor,
    "stride"
);

/// A 2-D shape: the three outer dimensions are fixed to one.
pub type Shape2D<R, C> = Shape<Fixed<1>, Fixed<1>, Fixed<1>, R, C>;

/// Strides of a 2-D region; the outer strides are irrelevant since their extents are one.
pub type Stride2D<RS, CS> = Stride<Fixed<0>, Fixed<0>, Fixed<0>, RS, CS>;

/// A fully static 2-D shape.
pub type StaticShape2D<const R: usize, const C: usize> = Shape2D<Fixed<R>, Fixed<C>>;

/// A fully static 2-D stride.
pub type StaticStride2D<const RS: usize, const CS: usize> = Stride2D<Fixed<RS>, Fixed<CS>>;

/// A fully dynamic 5-D shape.
pub type DynShape = Shape<Dyn, Dyn, Dyn, Dyn, Dyn>;

/// A fully dynamic 5-D stride.
pub type DynStride = Stride<Dyn, Dyn, Dyn, Dyn, Dyn>;
