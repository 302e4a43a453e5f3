/*!
 * Atomic Cell
 *
 * Lock-free integer container with increment, exchange and
 * compare-and-exchange. Every operation is sequentially consistent.
 */

use std::fmt;
use std::sync::atomic::{
    AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

mod sealed {
    pub trait Sealed {}
}

/// Integer types that have a native atomic counterpart
///
/// Sealed: implemented for `i32`, `i64`, `isize`, `u32`, `u64` and `usize`.
pub trait AtomicInteger: sealed::Sealed + Copy + Eq + fmt::Debug + Send + Sync + 'static {
    #[doc(hidden)]
    type Repr: Send + Sync;

    #[doc(hidden)]
    const ONE: Self;

    #[doc(hidden)]
    fn new_repr(value: Self) -> Self::Repr;
    #[doc(hidden)]
    fn load(repr: &Self::Repr, order: Ordering) -> Self;
    #[doc(hidden)]
    fn store(repr: &Self::Repr, value: Self, order: Ordering);
    #[doc(hidden)]
    fn swap(repr: &Self::Repr, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_add(repr: &Self::Repr, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_sub(repr: &Self::Repr, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn compare_exchange(repr: &Self::Repr, current: Self, new: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn wrapping_add(self, rhs: Self) -> Self;
    #[doc(hidden)]
    fn wrapping_sub(self, rhs: Self) -> Self;
    #[doc(hidden)]
    fn into_value(repr: Self::Repr) -> Self;
}

macro_rules! impl_atomic_integer {
    ($($int:ty => $atomic:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $int {}

            impl AtomicInteger for $int {
                type Repr = $atomic;

                const ONE: Self = 1;

                #[inline]
                fn new_repr(value: Self) -> Self::Repr {
                    <$atomic>::new(value)
                }

                #[inline]
                fn load(repr: &Self::Repr, order: Ordering) -> Self {
                    repr.load(order)
                }

                #[inline]
                fn store(repr: &Self::Repr, value: Self, order: Ordering) {
                    repr.store(value, order)
                }

                #[inline]
                fn swap(repr: &Self::Repr, value: Self, order: Ordering) -> Self {
                    repr.swap(value, order)
                }

                #[inline]
                fn fetch_add(repr: &Self::Repr, value: Self, order: Ordering) -> Self {
                    repr.fetch_add(value, order)
                }

                #[inline]
                fn fetch_sub(repr: &Self::Repr, value: Self, order: Ordering) -> Self {
                    repr.fetch_sub(value, order)
                }

                #[inline]
                fn compare_exchange(
                    repr: &Self::Repr,
                    current: Self,
                    new: Self,
                    order: Ordering,
                ) -> Self {
                    match repr.compare_exchange(current, new, order, order) {
                        Ok(previous) | Err(previous) => previous,
                    }
                }

                #[inline]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$int>::wrapping_add(self, rhs)
                }

                #[inline]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$int>::wrapping_sub(self, rhs)
                }

                #[inline]
                fn into_value(repr: Self::Repr) -> Self {
                    repr.into_inner()
                }
            }
        )*
    };
}

impl_atomic_integer! {
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

const ORDER: Ordering = Ordering::SeqCst;

/// Lock-free integer cell
///
/// All operations are indivisible with respect to each other and never block.
/// Arithmetic wraps on overflow, matching the platform atomics.
///
/// # Examples
///
/// ```
/// use concur_kit::AtomicCell;
///
/// let cell = AtomicCell::new(10_i32);
/// assert_eq!(cell.compare_and_exchange(10, 15), 10);
/// assert_eq!(cell.compare_and_exchange(10, 15), 15);
/// assert_eq!(cell.load(), 15);
/// ```
pub struct AtomicCell<T: AtomicInteger> {
    value: T::Repr,
}

impl<T: AtomicInteger> AtomicCell<T> {
    /// Create a cell holding `initial`
    #[inline]
    pub fn new(initial: T) -> Self {
        Self {
            value: T::new_repr(initial),
        }
    }

    /// Add one and return the new value
    #[inline]
    pub fn increment(&self) -> T {
        T::fetch_add(&self.value, T::ONE, ORDER).wrapping_add(T::ONE)
    }

    /// Subtract one and return the new value
    #[inline]
    pub fn decrement(&self) -> T {
        T::fetch_sub(&self.value, T::ONE, ORDER).wrapping_sub(T::ONE)
    }

    /// Add `delta` and return the new value
    #[inline]
    pub fn add(&self, delta: T) -> T {
        T::fetch_add(&self.value, delta, ORDER).wrapping_add(delta)
    }

    /// Store `new_value` and return the value it replaced
    #[inline]
    pub fn exchange(&self, new_value: T) -> T {
        T::swap(&self.value, new_value, ORDER)
    }

    /// Store `new_value` only if the cell currently holds `expected`
    ///
    /// Returns the value observed before the attempt; it equals `expected`
    /// exactly when the store happened.
    #[inline]
    pub fn compare_and_exchange(&self, expected: T, new_value: T) -> T {
        T::compare_exchange(&self.value, expected, new_value, ORDER)
    }

    #[inline]
    pub fn load(&self) -> T {
        T::load(&self.value, ORDER)
    }

    #[inline]
    pub fn store(&self, value: T) {
        T::store(&self.value, value, ORDER)
    }

    /// Consume the cell and return its value
    #[inline]
    pub fn into_inner(self) -> T {
        T::into_value(self.value)
    }
}

impl<T: AtomicInteger + Default> Default for AtomicCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicInteger> From<T> for AtomicCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicInteger> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell").field(&self.load()).finish()
    }
}
