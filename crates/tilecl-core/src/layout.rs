use derive_more::Display;

/// How a global tensor interprets its shape and strides.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Row-major: the innermost dimension holds the columns of a matrix.
    #[display("ND")]
    Nd,
    /// Column-major: dimension 3 holds the rows and is contiguous.
    #[display("DN")]
    Dn,
    /// Block-interleaved: `[batch, column blocks, row blocks, 16, C0]`, each
    /// `16 × C0` fractal contiguous, fractals of a column block adjacent.
    #[display("NZ")]
    Nz,
    /// Per-channel scales.
    #[display("SCALE")]
    Scale,
    /// Convolution feature map `[N, C1, H, W, C0]`.
    #[display("NC1HWC0")]
    Nc1hwc0,
    /// Convolution filter `[C1HW, N/16, 16, C0]` packed into fractals.
    #[display("FRACTAL_Z")]
    FractalZ,
}

impl LayoutKind {
    /// Const equality, usable inside compile-time assertions.
    pub const fn same_as(&self, other: &LayoutKind) -> bool {
        *self as u8 == *other as u8
    }

    /// Whether the layout describes a convolution operand.
    pub const fn is_conv(&self) -> bool {
        matches!(self, LayoutKind::Nc1hwc0 | LayoutKind::FractalZ)
    }
}

/// Type-level layout tag of a [GlobalTensor](crate::GlobalTensor).
pub trait GmLayout: Send + Sync + 'static {
    /// The layout.
    const KIND: LayoutKind;
}

macro_rules! gm_layout {
    ($name:ident, $kind:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl GmLayout for $name {
            const KIND: LayoutKind = $kind;
        }
    };
}

gm_layout!(Nd, LayoutKind::Nd, "Row-major layout.");
gm_layout!(Dn, LayoutKind::Dn, "Column-major layout.");
gm_layout!(Nz, LayoutKind::Nz, "Block-interleaved layout.");
gm_layout!(Scale, LayoutKind::Scale, "Per-channel scale layout.");
gm_layout!(Nc1hwc0, LayoutKind::Nc1hwc0, "Convolution feature map layout.");
gm_layout!(FractalZ, LayoutKind::FractalZ, "Convolution filter layout.");
