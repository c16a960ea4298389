//! Layout adaptation for a column-major complex singular value decomposition
//! kernel.
//!
//! The divide-and-conquer SVD kernel (`zgesdd`) only understands column-major
//! storage. This crate lets callers hand it matrices in either storage
//! convention: the column-major path forwards directly, while the row-major
//! path stages the input and the requested factor outputs through transposed
//! scratch copies and mirrors everything back afterwards.
//!
//! Two entry points are exposed:
//!
//! - [`zgesdd_work`], the middle-level interface. The caller supplies every
//!   work array, and `lwork == -1` queries the optimal complex work length
//!   without computing anything.
//! - [`zgesdd`], the high-level interface. Work arrays are sized, allocated,
//!   and released internally, with an optional NaN screen of the input
//!   (see [`nancheck`]).
//!
//! The kernel itself is a black box behind the [`Lapack`] trait, together
//! with the transpose, allocation, and diagnostic collaborators the
//! adaptation needs; all but the kernel default to this crate's
//! implementations. Statuses follow the kernel's convention: `0` for
//! success, `-k` when argument `k` is invalid (in this interface's own
//! numbering, where the layout selector is argument 1), a positive value
//! when the kernel did not converge, and the sentinels [`WORK_MEMORY_ERROR`]
//! and [`TRANSPOSE_MEMORY_ERROR`] when a temporary allocation fails.

#![warn(rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

use assert2::assert as fancy_assert;
use core::ptr::NonNull;
use dyn_stack::StackReq;
use num_complex::Complex;
use num_traits::Zero;

pub mod nancheck;
#[cfg(feature = "netlib")]
pub mod netlib;
pub mod scratch;
pub mod trans;

use scratch::ScratchBuf;

/// Complex double-precision scalar, the kernel's element type.
#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

/// Returned when a work-array allocation fails in [`zgesdd`].
pub const WORK_MEMORY_ERROR: i32 = -1010;
/// Returned when a transpose-scratch allocation fails in [`zgesdd_work`].
pub const TRANSPOSE_MEMORY_ERROR: i32 = -1011;

/// Memory layout of a matrix, with the conventional selector values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Layout {
    /// Row-major: elements of a row are contiguous.
    RowMajor = 101,
    /// Column-major: elements of a column are contiguous.
    ColMajor = 102,
}

impl Layout {
    /// Maps a raw selector to a layout, or `None` for unrecognized values.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            101 => Some(Self::RowMajor),
            102 => Some(Self::ColMajor),
            _ => None,
        }
    }

    /// Flat index of element `(i, j)` under this layout with leading
    /// dimension `ld`.
    #[inline]
    pub const fn index(self, i: usize, j: usize, ld: usize) -> usize {
        match self {
            Self::RowMajor => i * ld + j,
            Self::ColMajor => j * ld + i,
        }
    }
}

/// Selects which singular-vector blocks the kernel computes, and whether one
/// of them reuses the input storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobSvd {
    /// All columns of the left factor and all rows of the right factor.
    Full,
    /// Only the first `min(m, n)` columns and rows.
    Thin,
    /// As `Thin`, with one factor written over the input storage.
    Overwrite,
    /// Singular values only.
    No,
}

impl JobSvd {
    /// The job character understood by the kernel.
    pub const fn as_char(self) -> u8 {
        match self {
            Self::Full => b'A',
            Self::Thin => b'S',
            Self::Overwrite => b'O',
            Self::No => b'N',
        }
    }

    /// Parses a job character, case-insensitively.
    pub const fn from_char(jobz: u8) -> Option<Self> {
        match jobz.to_ascii_uppercase() {
            b'A' => Some(Self::Full),
            b'S' => Some(Self::Thin),
            b'O' => Some(Self::Overwrite),
            b'N' => Some(Self::No),
            _ => None,
        }
    }
}

/// Case-insensitive job-character comparison.
#[inline]
fn lsame(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}

/// External routines consumed by the adaptation layer.
///
/// Only the factorization kernel is abstract. The remaining collaborators
/// exist as methods so implementations can observe or replace them; their
/// defaults forward to this crate's [`trans`] and [`scratch`] routines and
/// to a stderr diagnostic line.
pub trait Lapack {
    /// Column-major divide-and-conquer SVD kernel.
    ///
    /// `a` is `m`-by-`n` with leading dimension `lda` and may be overwritten
    /// depending on the job. With `lwork == -1` the kernel only stores the
    /// optimal complex work length in `work[0]`. Returns `0` on success,
    /// `-k` when its `k`-th argument is invalid (1-based, counting from
    /// `jobz`), and a positive value when the computation did not converge.
    fn zgesdd(
        &self,
        jobz: u8,
        m: i32,
        n: i32,
        a: &mut [c64],
        lda: i32,
        s: &mut [f64],
        u: &mut [c64],
        ldu: i32,
        vt: &mut [c64],
        ldvt: i32,
        work: &mut [c64],
        lwork: i32,
        rwork: &mut [f64],
        iwork: &mut [i32],
    ) -> i32;

    /// Copies a matrix into the opposite storage convention.
    fn zge_trans(
        &self,
        layout: Layout,
        m: i32,
        n: i32,
        src: &[c64],
        ld_src: i32,
        dst: &mut [c64],
        ld_dst: i32,
    ) {
        trans::ge_trans(layout, m, n, src, ld_src, dst, ld_dst);
    }

    /// Acquires a temporary block. `None` means allocation failure.
    fn allocate(&self, req: StackReq) -> Option<NonNull<u8>> {
        scratch::allocate(req)
    }

    /// Releases a block previously returned by [`Lapack::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on `self` with an equal
    /// `req`, and must not be released twice.
    unsafe fn release(&self, ptr: NonNull<u8>, req: StackReq) {
        unsafe { scratch::release(ptr, req) };
    }

    /// Reports an invalid argument position or allocation failure. Advisory;
    /// the returned status code is the contract.
    fn xerbla(&self, routine: &'static str, info: i32) {
        match info {
            WORK_MEMORY_ERROR => eprintln!("{routine}: not enough memory to allocate work array"),
            TRANSPOSE_MEMORY_ERROR => {
                eprintln!("{routine}: not enough memory to transpose matrix")
            }
            _ => eprintln!("{routine}: parameter {} had an illegal value", -info),
        }
    }
}

/// Factor-output shape of one call: which factors the job materializes and
/// the column-major extents of each, resolved once and threaded through
/// validation, acquisition, and the mirroring copies.
#[derive(Copy, Clone, Debug)]
struct FactorShape {
    u_wanted: bool,
    vt_wanted: bool,
    nrows_u: i32,
    ncols_u: i32,
    nrows_vt: i32,
    ncols_vt: i32,
}

fn resolve_factor_shape(jobz: u8, m: i32, n: i32) -> FactorShape {
    let full = lsame(jobz, b'A');
    let thin = lsame(jobz, b'S');
    let over = lsame(jobz, b'O');

    let u_wanted = full || thin || (over && m < n);
    let vt_wanted = full || thin || (over && m >= n);

    FactorShape {
        u_wanted,
        vt_wanted,
        nrows_u: if u_wanted { m } else { 1 },
        ncols_u: if full || (over && m < n) {
            m
        } else if thin {
            m.min(n)
        } else {
            1
        },
        nrows_vt: if full || (over && m >= n) {
            n
        } else if thin {
            m.min(n)
        } else {
            1
        },
        ncols_vt: if vt_wanted { n } else { 1 },
    }
}

// the kernel numbers its arguments starting at `jobz`; ours start one
// position earlier, at the layout selector
#[inline]
fn shift_kernel_info(info: i32) -> i32 {
    if info < 0 {
        info - 1
    } else {
        info
    }
}

/// Middle-level interface: every work array is caller-supplied.
///
/// `layout` selects the storage convention of `a`, `u`, and `vt` (`101`
/// row-major, `102` column-major); `s`, `work`, `rwork`, and `iwork` are
/// flat and layout-independent. `lwork == -1` requests a workspace-size
/// query: only `work[0]` is written and nothing is allocated or transposed.
///
/// See the crate docs for the status conventions.
pub fn zgesdd_work<L: Lapack + ?Sized>(
    lapack: &L,
    layout: i32,
    jobz: u8,
    m: i32,
    n: i32,
    a: &mut [c64],
    lda: i32,
    s: &mut [f64],
    u: &mut [c64],
    ldu: i32,
    vt: &mut [c64],
    ldvt: i32,
    work: &mut [c64],
    lwork: i32,
    rwork: &mut [f64],
    iwork: &mut [i32],
) -> i32 {
    const ROUTINE: &str = "zgesdd_work";

    match Layout::from_raw(layout) {
        Some(Layout::ColMajor) => {
            let info = lapack.zgesdd(
                jobz, m, n, a, lda, s, u, ldu, vt, ldvt, work, lwork, rwork, iwork,
            );
            shift_kernel_info(info)
        }
        Some(Layout::RowMajor) => {
            let shape = resolve_factor_shape(jobz, m, n);
            let lda_t = m.max(1);
            let ldu_t = shape.nrows_u.max(1);
            let ldvt_t = shape.nrows_vt.max(1);

            // the leading dimensions are row strides here, so each must
            // cover its column extent; checked before anything is allocated
            if lda < n {
                lapack.xerbla(ROUTINE, -6);
                return -6;
            }
            if ldu < shape.ncols_u {
                lapack.xerbla(ROUTINE, -9);
                return -9;
            }
            if ldvt < shape.ncols_vt {
                lapack.xerbla(ROUTINE, -11);
                return -11;
            }

            // size query: only the transposed leading dimensions matter, no
            // scratch is materialized
            if lwork == -1 {
                let info = lapack.zgesdd(
                    jobz, m, n, a, lda_t, s, u, ldu_t, vt, ldvt_t, work, lwork, rwork, iwork,
                );
                return shift_kernel_info(info);
            }

            // staged scratch: the input copy, then each factor the job
            // materializes; a failure unwinds exactly what was acquired
            let Some(mut a_t) =
                ScratchBuf::<c64, _>::new(lapack, lda_t as usize * n.max(1) as usize)
            else {
                lapack.xerbla(ROUTINE, TRANSPOSE_MEMORY_ERROR);
                return TRANSPOSE_MEMORY_ERROR;
            };
            let mut u_t = None;
            if shape.u_wanted {
                match ScratchBuf::<c64, _>::new(
                    lapack,
                    ldu_t as usize * shape.ncols_u.max(1) as usize,
                ) {
                    Some(buf) => u_t = Some(buf),
                    None => {
                        lapack.xerbla(ROUTINE, TRANSPOSE_MEMORY_ERROR);
                        return TRANSPOSE_MEMORY_ERROR;
                    }
                }
            }
            let mut vt_t = None;
            if shape.vt_wanted {
                match ScratchBuf::<c64, _>::new(lapack, ldvt_t as usize * n.max(1) as usize) {
                    Some(buf) => vt_t = Some(buf),
                    None => {
                        lapack.xerbla(ROUTINE, TRANSPOSE_MEMORY_ERROR);
                        return TRANSPOSE_MEMORY_ERROR;
                    }
                }
            }

            fancy_assert!(a_t.len() >= lda_t as usize * n.max(0) as usize);
            lapack.zge_trans(Layout::RowMajor, m, n, a, lda, &mut a_t, lda_t);

            let info = lapack.zgesdd(
                jobz,
                m,
                n,
                &mut a_t,
                lda_t,
                s,
                u_t.as_deref_mut().unwrap_or(&mut []),
                ldu_t,
                vt_t.as_deref_mut().unwrap_or(&mut []),
                ldvt_t,
                work,
                lwork,
                rwork,
                iwork,
            );
            let info = shift_kernel_info(info);

            // outputs are mirrored back even on a negative status, matching
            // the kernel's partial writes
            lapack.zge_trans(Layout::ColMajor, m, n, &a_t, lda_t, a, lda);
            if let Some(u_t) = &u_t {
                lapack.zge_trans(
                    Layout::ColMajor,
                    shape.nrows_u,
                    shape.ncols_u,
                    u_t,
                    ldu_t,
                    u,
                    ldu,
                );
            }
            if let Some(vt_t) = &vt_t {
                lapack.zge_trans(Layout::ColMajor, shape.nrows_vt, n, vt_t, ldvt_t, vt, ldvt);
            }

            info
        }
        None => {
            lapack.xerbla(ROUTINE, -1);
            -1
        }
    }
}

/// High-level interface: work arrays are sized, allocated, and released
/// internally.
///
/// When the process-wide switch is enabled (see [`nancheck`]) the input
/// matrix is screened first and a NaN entry returns `-5` without invoking
/// the kernel. Work-array allocation failure returns [`WORK_MEMORY_ERROR`].
pub fn zgesdd<L: Lapack + ?Sized>(
    lapack: &L,
    layout: i32,
    jobz: u8,
    m: i32,
    n: i32,
    a: &mut [c64],
    lda: i32,
    s: &mut [f64],
    u: &mut [c64],
    ldu: i32,
    vt: &mut [c64],
    ldvt: i32,
) -> i32 {
    const ROUTINE: &str = "zgesdd";

    let Some(lay) = Layout::from_raw(layout) else {
        lapack.xerbla(ROUTINE, -1);
        return -1;
    };
    if nancheck::get_nancheck() && trans::zge_nancheck(lay, m, n, a, lda) {
        return -5;
    }

    let min_mn = m.min(n).max(0) as usize;
    let max_mn = m.max(n).max(0) as usize;
    let niwork = (8 * min_mn).max(1);
    let nrwork = if lsame(jobz, b'N') {
        (7 * min_mn).max(1)
    } else {
        (5 * min_mn * min_mn + 5 * min_mn)
            .max(2 * max_mn * min_mn + 2 * min_mn * min_mn + min_mn)
            .max(1)
    };

    let Some(mut iwork) = ScratchBuf::<i32, _>::new(lapack, niwork) else {
        lapack.xerbla(ROUTINE, WORK_MEMORY_ERROR);
        return WORK_MEMORY_ERROR;
    };
    let Some(mut rwork) = ScratchBuf::<f64, _>::new(lapack, nrwork) else {
        lapack.xerbla(ROUTINE, WORK_MEMORY_ERROR);
        return WORK_MEMORY_ERROR;
    };

    // workspace query through the middle-level interface
    let mut work_query = [c64::zero()];
    let info = zgesdd_work(
        lapack,
        layout,
        jobz,
        m,
        n,
        a,
        lda,
        s,
        u,
        ldu,
        vt,
        ldvt,
        &mut work_query,
        -1,
        &mut rwork,
        &mut iwork,
    );
    if info != 0 {
        return info;
    }
    let lwork = work_query[0].re as i32;

    let Some(mut work) = ScratchBuf::<c64, _>::new(lapack, lwork.max(1) as usize) else {
        lapack.xerbla(ROUTINE, WORK_MEMORY_ERROR);
        return WORK_MEMORY_ERROR;
    };

    zgesdd_work(
        lapack,
        layout,
        jobz,
        m,
        n,
        a,
        lda,
        s,
        u,
        ldu,
        vt,
        ldvt,
        &mut work,
        lwork,
        &mut rwork,
        &mut iwork,
    )
}
