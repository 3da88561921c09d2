use tilecl_common::TileType;

/// Capacities of the on-chip tiers, in bytes, and placement checking.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ArenaConfig {
    /// Vector work buffer.
    #[serde(default = "default_vec")]
    pub vec: usize,
    /// Staging buffer.
    #[serde(default = "default_mat")]
    pub mat: usize,
    /// Left operand buffer.
    #[serde(default = "default_operand")]
    pub left: usize,
    /// Right operand buffer.
    #[serde(default = "default_operand")]
    pub right: usize,
    /// Accumulator buffer.
    #[serde(default = "default_acc")]
    pub acc: usize,
    /// Bias table.
    #[serde(default = "default_bias")]
    pub bias: usize,
    /// Scaling buffer.
    #[serde(default = "default_scaling")]
    pub scaling: usize,
    /// Whether assigning a tile over another live tile of the same tier is reported.
    ///
    /// Defaults to on in debug builds only.
    #[serde(default = "default_check_overlap")]
    pub check_overlap: bool,
}

impl ArenaConfig {
    /// Capacity of a tier in bytes.
    pub fn capacity(&self, tier: TileType) -> usize {
        match tier {
            TileType::Vec => self.vec,
            TileType::Mat => self.mat,
            TileType::Left => self.left,
            TileType::Right => self.right,
            TileType::Acc => self.acc,
            TileType::Bias => self.bias,
            TileType::Scaling => self.scaling,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            vec: default_vec(),
            mat: default_mat(),
            left: default_operand(),
            right: default_operand(),
            acc: default_acc(),
            bias: default_bias(),
            scaling: default_scaling(),
            check_overlap: default_check_overlap(),
        }
    }
}

fn default_vec() -> usize {
    192 * 1024
}

fn default_mat() -> usize {
    512 * 1024
}

fn default_operand() -> usize {
    64 * 1024
}

fn default_acc() -> usize {
    128 * 1024
}

fn default_bias() -> usize {
    1024
}

fn default_scaling() -> usize {
    4 * 1024
}

fn default_check_overlap() -> bool {
    cfg!(debug_assertions)
}
