use tilecl_common::{Element, hardware::BURST_MAX};

/// A strided transfer of `count` bursts of `len` contiguous elements.
///
/// Strides are in elements and measured from the start of one burst to the start of the
/// next, on each side.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bursts {
    pub count: usize,
    pub len: usize,
    pub src_stride: usize,
    pub dst_stride: usize,
}

impl Bursts {
    /// A single burst.
    pub fn single(len: usize) -> Self {
        Self::new(1, len, len, len)
    }

    /// Move the bursts. With `atomic`, values are added to the destination.
    pub fn run<E: Element>(
        &self,
        dst: &mut [E],
        dst_start: usize,
        src: &[E],
        src_start: usize,
        atomic: bool,
    ) {
        for burst in 0..self.count {
            let dst = &mut dst[dst_start + burst * self.dst_stride..][..self.len];
            let src = &src[src_start + burst * self.src_stride..][..self.len];

            if atomic {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = d.accumulate(*s);
                }
            } else {
                dst.copy_from_slice(src);
            }
        }
    }

    /// Cut into transfers of at most [BURST_MAX] bursts, each with the index of its first
    /// burst.
    pub fn split(self) -> impl Iterator<Item = (usize, Bursts)> {
        (0..self.count).step_by(BURST_MAX).map(move |first| {
            let count = (self.count - first).min(BURST_MAX);
            (first, Bursts { count, ..self })
        })
    }

    /// Burst length, source gap and destination gap in bytes.
    pub fn in_bytes(&self, elem_size: usize) -> (usize, usize, usize) {
        (
            self.len * elem_size,
            self.src_stride.saturating_sub(self.len) * elem_size,
            self.dst_stride.saturating_sub(self.len) * elem_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn strided_bursts_skip_the_gaps() {
        let src: Vec<i32> = (0..16).collect();
        let mut dst = vec![0; 12];

        Bursts::new(3, 2, 5, 4).run(&mut dst, 1, &src, 0, false);

        assert_eq!(dst, [0, 0, 1, 0, 0, 5, 6, 0, 0, 10, 11, 0]);
    }

    #[test]
    fn atomic_bursts_accumulate() {
        let src = [1.0f32, 2.0, 3.0];
        let mut dst = [10.0f32, 20.0, 30.0];

        Bursts::single(3).run(&mut dst, 0, &src, 0, true);

        assert_eq!(dst, [11.0, 22.0, 33.0]);
    }

    #[test]
    fn split_respects_the_burst_limit() {
        let parts: Vec<_> = Bursts::new(BURST_MAX * 2 + 3, 8, 16, 8).split().collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].0, BURST_MAX);
        assert_eq!(parts[1].1.count, BURST_MAX);
        assert_eq!(parts[2].1.count, 3);
    }

    #[test]
    fn gaps_in_bytes() {
        assert_eq!(Bursts::new(4, 16, 64, 32).in_bytes(2), (32, 96, 32));
    }
}
