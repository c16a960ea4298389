//! Scratch-buffer acquisition for the translation paths.
//!
//! Buffers are acquired through the [`Lapack`] collaborator so callers and
//! tests can observe, replace, or fail individual acquisitions. Each buffer
//! is an RAII guard: dropping it releases the block through the collaborator
//! that produced it, so a ladder of guards declared in acquisition order
//! unwinds in reverse order on every exit path.

use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use aligned_vec::CACHELINE_ALIGN;
use bytemuck::Zeroable;
use dyn_stack::StackReq;

use crate::Lapack;

/// Default allocation routine: cache-line aligned raw bytes from the global
/// allocator.
pub fn allocate(req: StackReq) -> Option<NonNull<u8>> {
    let layout =
        core::alloc::Layout::from_size_align(req.size_bytes().max(1), req.align_bytes()).ok()?;
    NonNull::new(unsafe { std::alloc::alloc(layout) })
}

/// Default release routine, paired with [`allocate`].
///
/// # Safety
///
/// `ptr` must have been returned by [`allocate`] with an equal `req`, and
/// must not be released twice.
pub unsafe fn release(ptr: NonNull<u8>, req: StackReq) {
    let layout =
        core::alloc::Layout::from_size_align_unchecked(req.size_bytes().max(1), req.align_bytes());
    std::alloc::dealloc(ptr.as_ptr(), layout);
}

/// Owned temporary buffer of `len` zeroed elements, released exactly once
/// when dropped.
pub struct ScratchBuf<'a, T, L: Lapack + ?Sized> {
    ptr: NonNull<T>,
    len: usize,
    req: StackReq,
    lapack: &'a L,
}

impl<'a, T: Copy + Zeroable, L: Lapack + ?Sized> ScratchBuf<'a, T, L> {
    /// Acquires a zeroed buffer of `len` elements through `lapack`, or `None`
    /// when the collaborator reports allocation failure. A size computation
    /// that overflows counts as a failed allocation.
    pub fn new(lapack: &'a L, len: usize) -> Option<Self> {
        let req = StackReq::try_new_aligned::<T>(len, CACHELINE_ALIGN).ok()?;
        let ptr = lapack.allocate(req)?.cast::<T>();
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0u8, len) };
        Some(Self {
            ptr,
            len,
            req,
            lapack,
        })
    }
}

impl<T, L: Lapack + ?Sized> Deref for ScratchBuf<'_, T, L> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, L: Lapack + ?Sized> DerefMut for ScratchBuf<'_, T, L> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T, L: Lapack + ?Sized> Drop for ScratchBuf<'_, T, L> {
    fn drop(&mut self) {
        unsafe { self.lapack.release(self.ptr.cast(), self.req) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c64;
    use core::cell::Cell;

    struct Global;

    impl Lapack for Global {
        fn zgesdd(
            &self,
            _jobz: u8,
            _m: i32,
            _n: i32,
            _a: &mut [c64],
            _lda: i32,
            _s: &mut [f64],
            _u: &mut [c64],
            _ldu: i32,
            _vt: &mut [c64],
            _ldvt: i32,
            _work: &mut [c64],
            _lwork: i32,
            _rwork: &mut [f64],
            _iwork: &mut [i32],
        ) -> i32 {
            unreachable!()
        }
    }

    #[test]
    fn scratch_is_zeroed_and_sized() {
        let buf = ScratchBuf::<c64, _>::new(&Global, 5).unwrap();
        assert_eq!(buf.len(), 5);
        assert!(buf.iter().all(|z| *z == c64::new(0.0, 0.0)));
    }

    #[test]
    fn oversized_request_is_allocation_failure() {
        assert!(ScratchBuf::<c64, _>::new(&Global, usize::MAX).is_none());
    }

    struct Counting {
        allocs: Cell<usize>,
        releases: Cell<usize>,
    }

    impl Lapack for Counting {
        fn zgesdd(
            &self,
            _jobz: u8,
            _m: i32,
            _n: i32,
            _a: &mut [c64],
            _lda: i32,
            _s: &mut [f64],
            _u: &mut [c64],
            _ldu: i32,
            _vt: &mut [c64],
            _ldvt: i32,
            _work: &mut [c64],
            _lwork: i32,
            _rwork: &mut [f64],
            _iwork: &mut [i32],
        ) -> i32 {
            unreachable!()
        }

        fn allocate(&self, req: StackReq) -> Option<NonNull<u8>> {
            self.allocs.set(self.allocs.get() + 1);
            allocate(req)
        }

        unsafe fn release(&self, ptr: NonNull<u8>, req: StackReq) {
            self.releases.set(self.releases.get() + 1);
            release(ptr, req);
        }
    }

    #[test]
    fn drop_releases_exactly_once() {
        let counting = Counting {
            allocs: Cell::new(0),
            releases: Cell::new(0),
        };
        {
            let mut buf = ScratchBuf::<f64, _>::new(&counting, 9).unwrap();
            buf[3] = 2.5;
            assert_eq!(counting.allocs.get(), 1);
            assert_eq!(counting.releases.get(), 0);
        }
        assert_eq!(counting.allocs.get(), 1);
        assert_eq!(counting.releases.get(), 1);
    }
}
