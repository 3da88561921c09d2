use super::{
    Acc, Bias, ColMajor, Left, Mat, NoneBox, OrderKind, Packing, Placement, Right, RowMajor,
    Scaling, TilingOrder, Vector,
};
use alloc::vec::Vec;
use core::{fmt::Debug, marker::PhantomData};
use tilecl_common::{
    Element, PadNull, PadPolicy, PadValue, TileType,
    hardware::{BLOCK_BYTE_SIZE, FRACTAL_AB_SIZE, FRACTAL_C_SIZE},
};
use tilecl_runtime::{AiCore, PlacementId, kernel_assert, memory_management::Placed};
use tilecl_zspace::{Extent, ExtentKind, Full, StaticExtent};

/// Compile-time description of a tile, shared by every [Tile] instantiation.
///
/// Movement engines are written against this trait rather than against [Tile] directly, so
/// their compile-time checks read as plain constants.
pub trait TileDesc: Placed + Debug + Sized {
    /// Element type.
    type Elem: Element;
    /// Tier of the tile.
    type Placement: Placement;

    /// Rows of the buffer.
    const ROWS: usize;
    /// Columns of the buffer.
    const COLS: usize;
    /// Order of the inner blocks.
    const BLOCK: OrderKind;
    /// Order of the elements inside a block.
    const INNER: OrderKind;
    /// Size of an inner block in bytes.
    const FRACTAL: usize;
    /// Value written outside the valid extent on loads.
    const PAD: PadValue;
    /// How the valid rows are known.
    const VALID_ROWS: ExtentKind;
    /// How the valid columns are known.
    const VALID_COLS: ExtentKind;
    /// Mapping from logical coordinates to buffer offsets.
    const PACKING: Packing;

    /// Rows holding meaningful data.
    fn valid_rows(&self) -> usize;

    /// Columns holding meaningful data.
    fn valid_cols(&self) -> usize;

    /// Elements in the buffer.
    fn num_elems() -> usize {
        Self::ROWS * Self::COLS
    }

    /// The whole buffer, in storage order.
    fn elements<'a>(&self, core: &'a AiCore) -> &'a [Self::Elem] {
        let range = core.placement(self);
        core.arena(Self::Placement::TYPE)
            .view(range.offset, Self::num_elems())
    }

    /// The whole buffer, in storage order, mutably.
    fn elements_mut<'a>(&self, core: &'a mut AiCore) -> &'a mut [Self::Elem] {
        let range = core.placement(self);
        core.arena_mut(Self::Placement::TYPE)
            .view_mut(range.offset, Self::num_elems())
    }

    /// The element at logical (`row`, `col`).
    fn get(&self, core: &AiCore, row: usize, col: usize) -> Self::Elem {
        self.elements(core)[Self::PACKING.offset(row, col)]
    }

    /// Overwrite the element at logical (`row`, `col`).
    fn set(&self, core: &mut AiCore, row: usize, col: usize, value: Self::Elem) {
        self.elements_mut(core)[Self::PACKING.offset(row, col)] = value;
    }

    /// The valid region, row after row.
    fn to_vec(&self, core: &AiCore) -> Vec<Self::Elem> {
        let elements = self.elements(core);
        let mut values = Vec::with_capacity(self.valid_rows() * self.valid_cols());
        for row in 0..self.valid_rows() {
            for col in 0..self.valid_cols() {
                values.push(elements[Self::PACKING.offset(row, col)]);
            }
        }
        values
    }

    /// Overwrite the valid region from values given row after row.
    ///
    /// # Panics
    ///
    /// If `values` doesn't hold exactly the valid region.
    fn copy_from_slice(&self, core: &mut AiCore, values: &[Self::Elem]) {
        let (rows, cols) = (self.valid_rows(), self.valid_cols());
        kernel_assert!(
            values.len() == rows * cols,
            "Expected {rows} × {cols} values, got {}",
            values.len()
        );

        let elements = self.elements_mut(core);
        for row in 0..rows {
            for col in 0..cols {
                elements[Self::PACKING.offset(row, col)] = values[row * cols + col];
            }
        }
    }
}

/// A fixed-capacity buffer in an on-chip tier.
///
/// - `P`: the tier, see [Placement].
/// - `ROWS × COLS`: the capacity, in elements.
/// - `B`: order of the inner blocks, see [TilingOrder].
/// - `VR`, `VC`: valid extent, [Full], a [Fixed](tilecl_zspace::Fixed) value or a runtime
///   [Dyn](tilecl_zspace::Dyn) value.
/// - `S`: order inside a block, [NoneBox] for an unblocked tile.
/// - `FRACTAL`: size of a block in bytes, 512 for operands and 1024 for accumulators.
/// - `Pad`: what loads write outside the valid extent.
///
/// A tile is only a descriptor: its data lives in the arena of its tier, at the address given
/// by [AiCore::assign]. Invalid combinations of parameters fail to compile as soon as the tile
/// is constructed.
pub struct Tile<
    P: Placement,
    E: Element,
    const ROWS: usize,
    const COLS: usize,
    B: TilingOrder = RowMajor,
    VR: Extent = Full,
    VC: Extent = Full,
    S: TilingOrder = NoneBox,
    const FRACTAL: usize = FRACTAL_AB_SIZE,
    Pad: PadPolicy = PadNull,
> {
    id: PlacementId,
    address: Option<usize>,
    valid_rows: VR,
    valid_cols: VC,
    _marker: PhantomData<(P, E, B, S, Pad)>,
}

impl<P, E, const ROWS: usize, const COLS: usize, B, VR, VC, S, const FRACTAL: usize, Pad>
    Tile<P, E, ROWS, COLS, B, VR, VC, S, FRACTAL, Pad>
where
    P: Placement,
    E: Element,
    B: TilingOrder,
    VR: Extent,
    VC: Extent,
    S: TilingOrder,
    Pad: PadPolicy,
{
    /// Mapping from logical coordinates to buffer offsets.
    pub const PACKING: Packing = Packing::new(
        ROWS,
        COLS,
        B::KIND,
        S::KIND,
        FRACTAL,
        core::mem::size_of::<E>(),
    );

    const CHECK: () = {
        let size = core::mem::size_of::<E>();
        let packing = Self::PACKING;

        assert!(ROWS > 0 && COLS > 0, "A tile can't be empty");
        assert!(
            FRACTAL == FRACTAL_AB_SIZE || FRACTAL == FRACTAL_C_SIZE,
            "The inner block size must be 512 or 1024 bytes"
        );
        assert!(
            FRACTAL != FRACTAL_C_SIZE || size == 4,
            "1024 byte blocks hold 4 byte elements"
        );
        assert!(
            !matches!(B::KIND, OrderKind::NoneBox),
            "The block order must be row-major or column-major"
        );

        if packing.is_boxed() {
            assert!(
                matches!(P::TYPE, TileType::Vec) || ROWS % packing.inner_rows == 0,
                "Rows must be a multiple of the inner block rows"
            );
            assert!(
                COLS % packing.inner_cols == 0,
                "Columns must be a multiple of the inner block columns"
            );
        } else if matches!(B::KIND, OrderKind::RowMajor) {
            assert!(
                (COLS * size) % BLOCK_BYTE_SIZE == 0,
                "Rows of a row-major tile must be 32 byte aligned"
            );
        } else {
            assert!(
                (ROWS * size) % BLOCK_BYTE_SIZE == 0,
                "Columns of a column-major tile must be 32 byte aligned"
            );
        }

        if let Some(rows) = VR::KIND.static_value(ROWS) {
            assert!(rows > 0 && rows <= ROWS, "Valid rows must be in 1..=ROWS");
        }
        if let Some(cols) = VC::KIND.static_value(COLS) {
            assert!(cols > 0 && cols <= COLS, "Valid columns must be in 1..=COLS");
        }

        match P::TYPE {
            TileType::Left | TileType::Right => assert!(
                E::ELEM.is_operand_type(),
                "Operand tiles hold i8, f16, bf16 or f32"
            ),
            TileType::Acc => {
                assert!(
                    E::ELEM.is_accumulator_type(),
                    "Accumulator tiles hold i32 or f32"
                );
                assert!(
                    FRACTAL == FRACTAL_C_SIZE
                        && matches!(B::KIND, OrderKind::ColMajor)
                        && matches!(S::KIND, OrderKind::RowMajor),
                    "Accumulator tiles are NZ with 1024 byte blocks"
                );
            }
            TileType::Bias | TileType::Scaling => assert!(
                ROWS == 1 && !packing.is_boxed(),
                "Bias and scaling tiles are a single unblocked row"
            ),
            _ => {}
        }
    };

    /// Declare a tile whose valid extent is known at compile time.
    pub fn new() -> Self
    where
        VR: StaticExtent,
        VC: StaticExtent,
    {
        Self::build(VR::default(), VC::default())
    }

    /// Declare a tile with the given valid extent.
    ///
    /// # Panics
    ///
    /// If the valid extent is empty or larger than the tile.
    pub fn with_valid(valid_rows: VR, valid_cols: VC) -> Self {
        let (rows, cols) = (valid_rows.resolve(ROWS), valid_cols.resolve(COLS));
        kernel_assert!(
            rows > 0 && rows <= ROWS,
            "Valid rows {rows} out of range 1..={ROWS}"
        );
        kernel_assert!(
            cols > 0 && cols <= COLS,
            "Valid columns {cols} out of range 1..={COLS}"
        );

        Self::build(valid_rows, valid_cols)
    }

    fn build(valid_rows: VR, valid_cols: VC) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CHECK;

        Self {
            id: PlacementId::new(),
            address: None,
            valid_rows,
            valid_cols,
            _marker: PhantomData,
        }
    }
}

impl<P, E, const ROWS: usize, const COLS: usize, B, VR, VC, S, const FRACTAL: usize, Pad> Default
    for Tile<P, E, ROWS, COLS, B, VR, VC, S, FRACTAL, Pad>
where
    P: Placement,
    E: Element,
    B: TilingOrder,
    VR: StaticExtent,
    VC: StaticExtent,
    S: TilingOrder,
    Pad: PadPolicy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, E, const ROWS: usize, const COLS: usize, B, VR, VC, S, const FRACTAL: usize, Pad> Debug
    for Tile<P, E, ROWS, COLS, B, VR, VC, S, FRACTAL, Pad>
where
    P: Placement,
    E: Element,
    B: TilingOrder,
    VR: Extent,
    VC: Extent,
    S: TilingOrder,
    Pad: PadPolicy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("tier", &P::TYPE)
            .field("elem", &E::ELEM)
            .field("shape", &(ROWS, COLS))
            .field("valid", &(self.valid_rows(), self.valid_cols()))
            .field("block", &B::KIND)
            .field("inner", &S::KIND)
            .field("address", &self.address)
            .finish()
    }
}

impl<P, E, const ROWS: usize, const COLS: usize, B, VR, VC, S, const FRACTAL: usize, Pad> Placed
    for Tile<P, E, ROWS, COLS, B, VR, VC, S, FRACTAL, Pad>
where
    P: Placement,
    E: Element,
    B: TilingOrder,
    VR: Extent,
    VC: Extent,
    S: TilingOrder,
    Pad: PadPolicy,
{
    fn placement_id(&self) -> PlacementId {
        self.id
    }

    fn tier(&self) -> TileType {
        P::TYPE
    }

    fn byte_size(&self) -> usize {
        ROWS * COLS * core::mem::size_of::<E>()
    }

    fn address(&self) -> Option<usize> {
        self.address
    }

    fn bind(&mut self, address: usize) {
        self.address = Some(address);
    }
}

impl<P, E, const ROWS: usize, const COLS: usize, B, VR, VC, S, const FRACTAL: usize, Pad> TileDesc
    for Tile<P, E, ROWS, COLS, B, VR, VC, S, FRACTAL, Pad>
where
    P: Placement,
    E: Element,
    B: TilingOrder,
    VR: Extent,
    VC: Extent,
    S: TilingOrder,
    Pad: PadPolicy,
{
    type Elem = E;
    type Placement = P;

    const ROWS: usize = ROWS;
    const COLS: usize = COLS;
    const BLOCK: OrderKind = B::KIND;
    const INNER: OrderKind = S::KIND;
    const FRACTAL: usize = FRACTAL;
    const PAD: PadValue = Pad::VALUE;
    const VALID_ROWS: ExtentKind = VR::KIND;
    const VALID_COLS: ExtentKind = VC::KIND;
    const PACKING: Packing = Self::PACKING;

    fn valid_rows(&self) -> usize {
        self.valid_rows.resolve(ROWS)
    }

    fn valid_cols(&self) -> usize {
        self.valid_cols.resolve(COLS)
    }
}

/// Staging tile in NZ layout: column-major blocks of row-major fractals.
pub type TileMatNz<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Mat, E, ROWS, COLS, ColMajor, VR, VC, RowMajor, FRACTAL_AB_SIZE, Pad>;

/// Staging tile in ZN layout: row-major blocks of column-major fractals.
pub type TileMatZn<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Mat, E, ROWS, COLS, RowMajor, VR, VC, ColMajor, FRACTAL_AB_SIZE, Pad>;

/// Unblocked row-major staging tile.
pub type TileMatNd<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Mat, E, ROWS, COLS, RowMajor, VR, VC, NoneBox, FRACTAL_AB_SIZE, Pad>;

/// Unblocked column-major staging tile.
pub type TileMatDn<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Mat, E, ROWS, COLS, ColMajor, VR, VC, NoneBox, FRACTAL_AB_SIZE, Pad>;

/// Left operand tile (ZZ): row-major blocks of row-major fractals.
pub type TileLeft<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full> =
    Tile<Left, E, ROWS, COLS, RowMajor, VR, VC, RowMajor>;

/// Right operand tile (ZN): row-major blocks of column-major fractals.
pub type TileRight<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full> =
    Tile<Right, E, ROWS, COLS, RowMajor, VR, VC, ColMajor>;

/// Accumulator tile: NZ with 16 × 16 fractals.
pub type TileAcc<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full> =
    Tile<Acc, E, ROWS, COLS, ColMajor, VR, VC, RowMajor, FRACTAL_C_SIZE>;

/// Row-major vector tile.
pub type TileVec<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Vector, E, ROWS, COLS, RowMajor, VR, VC, NoneBox, FRACTAL_AB_SIZE, Pad>;

/// Column-major vector tile.
pub type TileVecDn<E, const ROWS: usize, const COLS: usize, VR = Full, VC = Full, Pad = PadNull> =
    Tile<Vector, E, ROWS, COLS, ColMajor, VR, VC, NoneBox, FRACTAL_AB_SIZE, Pad>;

/// Bias row of the cube unit.
pub type TileBias<E, const COLS: usize> = Tile<Bias, E, 1, COLS>;

/// Per-column quantization scales, one `u64` entry per column.
pub type TileScaling<const COLS: usize> = Tile<Scaling, u64, 1, COLS>;
