use tilecl_core::TileDesc;
use tilecl_runtime::AiCore;

/// Write the pad value of the tile everywhere outside its valid extent.
///
/// Tiles with the null policy keep whatever their buffer held.
pub(super) fn fill_pad<T: TileDesc>(core: &mut AiCore, tile: &T) {
    let Some(value) = T::PAD.value::<T::Elem>() else {
        return;
    };
    let (rows, cols) = (tile.valid_rows(), tile.valid_cols());
    if rows == T::ROWS && cols == T::COLS {
        return;
    }

    log::trace!("Padding {tile:?} with {value:?}");
    let elements = tile.elements_mut(core);
    for row in 0..T::ROWS {
        for col in 0..T::COLS {
            if row >= rows || col >= cols {
                elements[T::PACKING.offset(row, col)] = value;
            }
        }
    }
}
