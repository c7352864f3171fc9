//! Byte-order-safe reads and writes of fixed-width scalars.
//!
//! Every multi-byte field in the tile containers is little-endian. Values
//! are always copied out byte by byte, so callers can read from any offset
//! without worrying about alignment.

/// Scalar types that can be converted to and from explicit byte orders.
pub trait Endian: Copy + Sized {
    /// Size of the encoded value in bytes.
    const SIZE: usize;

    /// Read a little-endian value from the first `SIZE` bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `SIZE`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Read a big-endian value from the first `SIZE` bytes of `bytes`.
    fn read_be(bytes: &[u8]) -> Self;

    /// Write `self` as little-endian into the first `SIZE` bytes of `dest`.
    fn write_le(self, dest: &mut [u8]);

    /// Write `self` as big-endian into the first `SIZE` bytes of `dest`.
    fn write_be(self, dest: &mut [u8]);

    /// Convert a value whose bytes were stored little-endian to host order.
    #[must_use]
    fn le_to_host(self) -> Self;

    /// Convert a host-order value to its little-endian representation.
    #[must_use]
    fn host_to_le(self) -> Self;
}

macro_rules! impl_endian {
    ($($ty:ty),* $(,)?) => {$(
        impl Endian for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..Self::SIZE]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn read_be(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..Self::SIZE]);
                <$ty>::from_be_bytes(raw)
            }

            #[inline]
            fn write_le(self, dest: &mut [u8]) {
                dest[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn write_be(self, dest: &mut [u8]) {
                dest[..Self::SIZE].copy_from_slice(&self.to_be_bytes());
            }

            #[inline]
            fn le_to_host(self) -> Self {
                <$ty>::from_le_bytes(self.to_ne_bytes())
            }

            #[inline]
            fn host_to_le(self) -> Self {
                <$ty>::from_ne_bytes(self.to_le_bytes())
            }
        }
    )*};
}

impl_endian!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a little-endian `T` at `offset`, or `None` if the slice is too short.
#[inline]
#[must_use]
pub fn read_le_at<T: Endian>(bytes: &[u8], offset: usize) -> Option<T> {
    let end = offset.checked_add(T::SIZE)?;
    bytes.get(offset..end).map(T::read_le)
}

/// Read a little-endian `T` from the start of `bytes`.
#[inline]
#[must_use]
pub fn read<T: Endian>(bytes: &[u8]) -> T {
    T::read_le(bytes)
}

/// Write `value` little-endian at the start of `dest`.
#[inline]
pub fn write<T: Endian>(dest: &mut [u8], value: T) {
    value.write_le(dest);
}

/// Round `len` up to the next multiple of four.
#[inline]
#[must_use]
pub const fn pad4(len: usize) -> usize {
    (len + 3) & !3
}
