//! Parallel or sequential mapping, chosen by the `parallel` feature.
//!
//! The `cfg` switch lives here so call sites stay free of it. Every helper
//! returns results in input order, and `force_sequential` turns the pool off
//! at runtime.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map `f` over `0..n`, preserving order.
pub fn map_range<F, R>(n: usize, f: F, force_sequential: bool) -> Vec<R>
where
    F: Fn(usize) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            (0..n).map(f).collect()
        } else {
            (0..n).into_par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        (0..n).map(f).collect()
    }
}

/// Map `f` over a slice, preserving order.
pub fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            slice.iter().map(f).collect()
        } else {
            slice.par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        slice.iter().map(f).collect()
    }
}
