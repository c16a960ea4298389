//! Hand-declared binding of the reference Fortran kernel.
//!
//! No build script is provided; linking against a LAPACK implementation is
//! the consumer's responsibility. The symbol is declared under the default C
//! calling convention, without trailing character-length arguments.

use crate::{c64, Lapack};

extern "C" {
    fn zgesdd_(
        jobz: *const u8,
        m: *const i32,
        n: *const i32,
        a: *mut c64,
        lda: *const i32,
        s: *mut f64,
        u: *mut c64,
        ldu: *const i32,
        vt: *mut c64,
        ldvt: *const i32,
        work: *mut c64,
        lwork: *const i32,
        rwork: *mut f64,
        iwork: *mut i32,
        info: *mut i32,
    );
}

/// The reference kernel, with the crate's default collaborators for
/// everything else.
#[derive(Copy, Clone, Debug)]
pub struct Netlib;

impl Lapack for Netlib {
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
    ) -> i32 {
        let mut info = 0;
        unsafe {
            zgesdd_(
                &jobz,
                &m,
                &n,
                a.as_mut_ptr(),
                &lda,
                s.as_mut_ptr(),
                u.as_mut_ptr(),
                &ldu,
                vt.as_mut_ptr(),
                &ldvt,
                work.as_mut_ptr(),
                &lwork,
                rwork.as_mut_ptr(),
                iwork.as_mut_ptr(),
                &mut info,
            );
        }
        info
    }
}
