use core::fmt::Debug;

/// Value of a runtime dimension when a descriptor is default constructed.
pub const DYNAMIC_DEFAULT: usize = 1;

/// A single dimension of a [Shape](crate::Shape) or [Stride](crate::Stride).
///
/// A dimension is either known when the kernel is built ([Fixed]) or supplied when the
/// descriptor is constructed ([Dyn]). Fixed dimensions are zero sized, so a fully static
/// descriptor carries no data at all.
pub trait Dim: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// The compile-time value, `None` for runtime dimensions.
    const FIXED: Option<usize>;

    /// The value of the dimension.
    fn get(&self) -> usize;

    /// Build the dimension, consuming one runtime value if the dimension needs it.
    fn from_values<I: Iterator<Item = usize>>(values: &mut I) -> Self;

    /// The dimension of a default constructed descriptor.
    fn default_value() -> Self;
}

/// A dimension fixed at compile time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Fixed<const N: usize>;

/// A dimension supplied at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dyn(pub usize);

impl<const N: usize> Dim for Fixed<N> {
    const FIXED: Option<usize> = Some(N);

    fn get(&self) -> usize {
        N
    }

    fn from_values<I: Iterator<Item = usize>>(_values: &mut I) -> Self {
        Fixed
    }

    fn default_value() -> Self {
        Fixed
    }
}

impl Dim for Dyn {
    const FIXED: Option<usize> = None;

    fn get(&self) -> usize {
        self.0
    }

    fn from_values<I: Iterator<Item = usize>>(values: &mut I) -> Self {
        Dyn(values.next().unwrap_or(DYNAMIC_DEFAULT))
    }

    fn default_value() -> Self {
        Dyn(DYNAMIC_DEFAULT)
    }
}

impl Default for Dyn {
    fn default() -> Self {
        Dyn(DYNAMIC_DEFAULT)
    }
}

/// How the valid extent of a tile is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtentKind {
    /// The whole tile is valid.
    Full,
    /// A compile-time constant.
    Fixed(usize),
    /// A value supplied when the tile is declared.
    Runtime,
}

impl ExtentKind {
    /// The compile-time value of the extent within a tile dimension of `capacity`.
    pub const fn static_value(self, capacity: usize) -> Option<usize> {
        match self {
            ExtentKind::Full => Some(capacity),
            ExtentKind::Fixed(value) => Some(value),
            ExtentKind::Runtime => None,
        }
    }
}

/// The valid extent of a tile along one axis.
pub trait Extent: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// How the extent is known.
    const KIND: ExtentKind;

    /// The extent within a tile dimension of `capacity` elements.
    fn resolve(&self, capacity: usize) -> usize;
}

/// An extent known at compile time, which can be built without runtime values.
pub trait StaticExtent: Extent + Default {}

/// The valid extent covers the whole tile dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Full;

impl Extent for Full {
    const KIND: ExtentKind = ExtentKind::Full;

    fn resolve(&self, capacity: usize) -> usize {
        capacity
    }
}

impl StaticExtent for Full {}

impl<const N: usize> Extent for Fixed<N> {
    const KIND: ExtentKind = ExtentKind::Fixed(N);

    fn resolve(&self, _capacity: usize) -> usize {
        N
    }
}

impl<const N: usize> StaticExtent for Fixed<N> {}

impl Extent for Dyn {
    const KIND: ExtentKind = ExtentKind::Runtime;

    fn resolve(&self, _capacity: usize) -> usize {
        self.0
    }
}
