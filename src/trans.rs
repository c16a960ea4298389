//! Layout-translation copies and the NaN input screen.

use crate::{c64, Layout};

/// Copies the `m`-by-`n` matrix `src`, stored in `layout` with leading
/// dimension `ld_src`, into `dst` in the opposite layout with leading
/// dimension `ld_dst`.
///
/// The loop bounds are clamped by both leading dimensions, so out-of-contract
/// extents copy nothing instead of walking out of the matrix. Entries of
/// `dst` outside the logical `m`-by-`n` region are left untouched.
pub fn ge_trans<T: Copy>(
    layout: Layout,
    m: i32,
    n: i32,
    src: &[T],
    ld_src: i32,
    dst: &mut [T],
    ld_dst: i32,
) {
    // one loop body serves both directions: `y` runs along the source stride
    // and `x` along the destination stride
    let (x, y) = match layout {
        Layout::RowMajor => (m, n),
        Layout::ColMajor => (n, m),
    };

    for i in 0..y.min(ld_src).max(0) as usize {
        for j in 0..x.min(ld_dst).max(0) as usize {
            dst[i * ld_dst as usize + j] = src[j * ld_src as usize + i];
        }
    }
}

/// Returns `true` when any entry of the `m`-by-`n` matrix `a`, stored in
/// `layout` with leading dimension `lda`, has a NaN real or imaginary part.
///
/// Indices that fall outside `a` are treated as NaN-free, so a screen with a
/// nonsensical leading dimension cannot fault.
pub fn zge_nancheck(layout: Layout, m: i32, n: i32, a: &[c64], lda: i32) -> bool {
    if m <= 0 || n <= 0 || lda <= 0 {
        return false;
    }
    let lda = lda as usize;
    for i in 0..m as usize {
        for j in 0..n as usize {
            if let Some(z) = a.get(layout.index(i, j, lda)) {
                if z.is_nan() {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn rand_mat(len: usize) -> Vec<c64> {
        (0..len)
            .map(|_| c64::new(rand::random(), rand::random()))
            .collect()
    }

    #[test]
    fn round_trip_preserves_every_bit() {
        for m in [0usize, 1, 2, 3, 7] {
            for n in [0usize, 1, 2, 5] {
                let lda = n.max(1) + 2;
                let ldt = m.max(1) + 1;
                let src = rand_mat(m * lda + 4);
                let mut t = vec![c64::zero(); ldt * n.max(1) + 3];
                let mut back = src.clone();
                for i in 0..m {
                    for j in 0..n {
                        back[i * lda + j] = c64::zero();
                    }
                }

                ge_trans(
                    Layout::RowMajor,
                    m as i32,
                    n as i32,
                    &src,
                    lda as i32,
                    &mut t,
                    ldt as i32,
                );
                ge_trans(
                    Layout::ColMajor,
                    m as i32,
                    n as i32,
                    &t,
                    ldt as i32,
                    &mut back,
                    lda as i32,
                );

                // the logical region is restored and the padding was never
                // written
                assert_eq!(back, src);
            }
        }
    }

    #[test]
    fn out_of_contract_extents_copy_nothing() {
        let src = rand_mat(6);
        let mut dst = vec![c64::zero(); 6];
        let before = dst.clone();

        ge_trans(Layout::RowMajor, -3, 2, &src, 2, &mut dst, 2);
        ge_trans(Layout::ColMajor, 3, -2, &src, 2, &mut dst, 2);
        ge_trans(Layout::RowMajor, 3, 2, &src, -1, &mut dst, 2);
        ge_trans(Layout::ColMajor, 3, 2, &src, 2, &mut dst, 0);

        assert_eq!(dst, before);
    }

    #[test]
    fn nan_screen_honors_the_layout() {
        let mut a = vec![c64::zero(); 12];
        assert!(!zge_nancheck(Layout::RowMajor, 3, 2, &a, 4));
        assert!(!zge_nancheck(Layout::ColMajor, 3, 2, &a, 4));

        // row (2, 1) under a row-major stride of 4; the same flat position is
        // stride padding under the column-major reading
        a[9] = c64::new(f64::NAN, 0.0);
        assert!(zge_nancheck(Layout::RowMajor, 3, 2, &a, 4));
        assert!(!zge_nancheck(Layout::ColMajor, 3, 2, &a, 4));
    }

    #[test]
    fn nan_in_padding_is_ignored() {
        let mut a = vec![c64::zero(); 12];
        a[2] = c64::new(0.0, f64::NAN);
        assert!(!zge_nancheck(Layout::RowMajor, 3, 2, &a, 4));
    }

    #[test]
    fn nan_screen_never_walks_past_the_slice() {
        let a = vec![c64::new(1.0, 1.0); 4];
        assert!(!zge_nancheck(Layout::RowMajor, 3, 2, &a, 1_000_000));
        assert!(!zge_nancheck(Layout::ColMajor, -1, 2, &a, 4));
    }
}
