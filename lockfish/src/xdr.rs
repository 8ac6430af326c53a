/// This module implements helper traits for packing and unpacking
/// packets in XDR standard (RFC 4506)
pub use crate::result::Result;
use crate::result::{DecodeError, Error};
use bytes::{Buf, BufMut, Bytes};
use std::marker::PhantomData;

const PAD_ZERO: [u8; 4] = [0; 4];

/// Number of padding bytes following `len` bytes of opaque data
#[inline]
const fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Error returned by derived `UnpackFrom` implementations for an
/// enum discriminant that does not name a variant.
pub fn unknown_variant(type_name: &'static str, value: u32) -> Error {
    DecodeError::UnknownVariant { type_name, value }.into()
}

/// A trait for packing data in XDR format into a buffer.
pub trait Packer {
    fn pack_uint(&mut self, value: u32);

    fn pack_int(&mut self, value: i32);

    fn pack_hyper(&mut self, value: i64);

    fn pack_uhyper(&mut self, value: u64);

    fn pack_bool(&mut self, value: bool);

    fn pack_enum(&mut self, value: u32) {
        self.pack_uint(value)
    }

    fn pack_opaque(&mut self, value: &[u8]);

    fn pack_opaque_fixed(&mut self, value: &[u8]);

    fn pack_string(&mut self, value: &str);

    /// Packs a counted array: element count followed by the elements
    fn pack_array<I, F>(&mut self, array: &[I], pack_fn: F)
    where
        F: Fn(&mut Self, &I),
    {
        self.pack_uint(array.len() as u32);
        for item in array {
            pack_fn(self, item);
        }
    }

    /// Packs a linked-list array: every element is preceded by a TRUE
    /// marker and the list is terminated by FALSE.
    fn pack_list<I, F>(&mut self, list: &[I], pack_fn: F)
    where
        F: Fn(&mut Self, &I),
    {
        for item in list {
            self.pack_bool(true);
            pack_fn(self, item);
        }
        self.pack_bool(false);
    }
}

impl<Buffer: BufMut> Packer for Buffer {
    #[inline]
    fn pack_uint(&mut self, value: u32) {
        self.put_u32(value)
    }

    #[inline]
    fn pack_int(&mut self, value: i32) {
        self.put_i32(value)
    }

    #[inline]
    fn pack_hyper(&mut self, value: i64) {
        self.put_i64(value)
    }

    #[inline]
    fn pack_uhyper(&mut self, value: u64) {
        self.put_u64(value)
    }

    #[inline]
    fn pack_bool(&mut self, value: bool) {
        self.put_u32(value as u32)
    }

    #[inline]
    fn pack_opaque(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.pack_opaque_fixed(value);
    }

    #[inline]
    fn pack_opaque_fixed(&mut self, value: &[u8]) {
        self.put_slice(value);
        self.put_slice(&PAD_ZERO[..padding(value.len())])
    }

    #[inline]
    fn pack_string(&mut self, value: &str) {
        self.pack_opaque(value.as_bytes())
    }
}

/// A trait for unpacking XDR from a buffer
pub trait Unpacker {
    fn unpack_uint(&mut self) -> Result<u32>;

    fn unpack_int(&mut self) -> Result<i32>;

    fn unpack_hyper(&mut self) -> Result<i64>;

    fn unpack_uhyper(&mut self) -> Result<u64>;

    #[inline]
    fn unpack_bool(&mut self) -> Result<bool> {
        match self.unpack_uint()? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(DecodeError::InvalidBool(n).into()),
        }
    }

    fn unpack_opaque(&mut self) -> Result<Bytes>;

    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes>;

    fn unpack_string(&mut self) -> Result<String> {
        let bytes = self.unpack_opaque()?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn unpack_vec<I, F>(&mut self, unpack_fn: F) -> Result<Vec<I>>
    where
        F: Fn(&mut Self) -> Result<I>,
    {
        let len = self.unpack_uint()? as usize;
        // Do not trust the count for preallocation, each element is at least 4 bytes
        let mut result = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            result.push(unpack_fn(self)?);
        }

        Ok(result)
    }

    /// Returns a lazy iterator over a linked-list array.  The iterator
    /// consumes the list from the buffer as it goes and cannot be restarted;
    /// data following the list is only reachable once it is exhausted.
    fn unpack_list_iter<T>(&mut self) -> ListIter<'_, Self, T>
    where
        Self: Sized,
        T: UnpackFrom<Self>,
    {
        ListIter {
            buf: self,
            done: false,
            _item: PhantomData,
        }
    }

    /// Unpacks a whole linked-list array
    fn unpack_list<T>(&mut self) -> Result<Vec<T>>
    where
        Self: Sized,
        T: UnpackFrom<Self>,
    {
        self.unpack_list_iter().collect()
    }
}

macro_rules! unpack_impl {
    ($TraitFn:ident, $ResT:ty, $GetFn:ident) => {
        #[inline]
        fn $TraitFn(&mut self) -> Result<$ResT> {
            if self.remaining() >= std::mem::size_of::<$ResT>() {
                Ok(self.$GetFn())
            } else {
                Err(DecodeError::NotEnoughData.into())
            }
        }
    };
}

impl<Buffer: Buf> Unpacker for Buffer {
    unpack_impl!(unpack_uint, u32, get_u32);
    unpack_impl!(unpack_int, i32, get_i32);
    unpack_impl!(unpack_hyper, i64, get_i64);
    unpack_impl!(unpack_uhyper, u64, get_u64);

    #[inline]
    fn unpack_opaque(&mut self) -> Result<Bytes> {
        let len = self.unpack_uint()? as usize;
        self.unpack_opaque_fixed(len)
    }

    #[inline]
    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes> {
        let pad = padding(nbytes);
        if self.remaining() < nbytes || self.remaining() - nbytes < pad {
            return Err(DecodeError::NotEnoughData.into());
        }

        let ret = self.copy_to_bytes(nbytes);
        self.advance(pad);
        Ok(ret)
    }
}

/// Lazy iterator over an XDR linked-list array, see
/// [`Unpacker::unpack_list_iter`].
pub struct ListIter<'a, B, T> {
    buf: &'a mut B,
    done: bool,
    _item: PhantomData<T>,
}

impl<'a, B: Unpacker, T: UnpackFrom<B>> Iterator for ListIter<'a, B, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = match self.buf.unpack_bool() {
            Ok(true) => T::unpack_from(self.buf),
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(err) => Err(err),
        };

        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Trait that allows packing objects into a buffer.
pub trait PackTo<B> {
    /// Pack `self` into `buf`
    fn pack_to(&self, buf: &mut B);
}

/// Trait that allows unpacking objects from a buffer
pub trait UnpackFrom<B> {
    fn unpack_from(buf: &mut B) -> Result<Self>
    where
        Self: Sized;
}

/// Allow generic `Vec<T>` implementation of `PackTo` and `UnpackFrom` for the type
/// if the traits are implemented for `T`
pub trait VecPackUnpack {}

macro_rules! impl_pack_to (
    ($type:ty, $method:ident) => {
        impl VecPackUnpack for $type {
        }

        impl<B: Packer> PackTo<B> for $type {
            fn pack_to(&self, buf: &mut B) {
                buf.$method(*self)
            }
        }
    }
);

macro_rules! impl_unpack_from (
    ($type:ty, $method:ident) => {
        impl<B: Unpacker> UnpackFrom<B> for $type {
            fn unpack_from(buf: &mut B) -> Result<Self> {
                buf.$method()
            }
        }
    }
);

// Note: explicitly NOT implemented for u8 to allow trait implementation
// for Vec<u8> and a generic Vec<T>.  XDR does not define encoding for "byte"
// so it would have to be encoded as 4-byte unsigned int which is not what's
// expected for a byte vector.
impl_pack_to!(u32, pack_uint);
impl_pack_to!(i32, pack_int);
impl_pack_to!(i64, pack_hyper);
impl_pack_to!(u64, pack_uhyper);
impl_pack_to!(bool, pack_bool);

impl_unpack_from!(u32, unpack_uint);
impl_unpack_from!(i32, unpack_int);
impl_unpack_from!(i64, unpack_hyper);
impl_unpack_from!(u64, unpack_uhyper);
impl_unpack_from!(bool, unpack_bool);
impl_unpack_from!(Bytes, unpack_opaque);
impl_unpack_from!(String, unpack_string);

/// XDR `void`
impl<B> PackTo<B> for () {
    fn pack_to(&self, _buf: &mut B) {}
}

impl<B> UnpackFrom<B> for () {
    fn unpack_from(_buf: &mut B) -> Result<Self> {
        Ok(())
    }
}

impl<B: Packer> PackTo<B> for &str {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_string(self);
    }
}

impl<B: Packer> PackTo<B> for String {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_string(self);
    }
}

impl<T: PackTo<B>, B: Packer> PackTo<B> for Option<T> {
    fn pack_to(&self, buf: &mut B) {
        match self {
            Some(t) => {
                buf.pack_bool(true);
                t.pack_to(buf);
            }
            None => {
                buf.pack_bool(false);
            }
        }
    }
}

impl<B: Packer> PackTo<B> for Vec<u8> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self);
    }
}

impl<B: Packer> PackTo<B> for Bytes {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self.as_ref());
    }
}

impl<T: VecPackUnpack + PackTo<B>, B: Packer> PackTo<B> for Vec<T> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_array(self, |buf, item| item.pack_to(buf));
    }
}

impl<T: VecPackUnpack + UnpackFrom<B>, B: Unpacker> UnpackFrom<B> for Vec<T> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        buf.unpack_vec(|buf| T::unpack_from(buf))
    }
}

impl<T: UnpackFrom<B>, B: Unpacker> UnpackFrom<B> for Option<T> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        if buf.unpack_bool()? {
            Ok(Some(T::unpack_from(buf)?))
        } else {
            Ok(None)
        }
    }
}

impl<B: Unpacker> UnpackFrom<B> for Vec<u8> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        Ok(buf.unpack_opaque()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_pack_unpack() {
        let mut buf = BytesMut::new();

        buf.pack_uint(0x01020304);
        buf.pack_uhyper(0x0506070809101112);
        buf.pack_int(-1234567);
        buf.pack_hyper(-1234567890111213);
        buf.pack_bool(true);
        buf.pack_bool(false);
        buf.pack_enum(17);
        buf.pack_opaque_fixed(&[0x14, 0x15, 0x16, 0x17, 0x18]);
        buf.pack_opaque(&[0x19, 0x20, 0x21, 0x22, 0x23]);
        buf.pack_string("The quick brown fox jumps over the lazy dog");

        let mut buf = buf.freeze();

        assert_eq!(buf.unpack_uint().unwrap(), 0x01020304);
        assert_eq!(buf.unpack_uhyper().unwrap(), 0x0506070809101112);
        assert_eq!(buf.unpack_int().unwrap(), -1234567);
        assert_eq!(buf.unpack_hyper().unwrap(), -1234567890111213);
        assert!(buf.unpack_bool().unwrap());
        assert!(!buf.unpack_bool().unwrap());
        assert_eq!(buf.unpack_uint().unwrap(), 17);
        assert_eq!(
            buf.unpack_opaque_fixed(5).unwrap().as_ref(),
            &[0x14, 0x15, 0x16, 0x17, 0x18]
        );
        assert_eq!(
            buf.unpack_opaque().unwrap().as_ref(),
            &[0x19, 0x20, 0x21, 0x22, 0x23]
        );
        assert_eq!(
            buf.unpack_string().unwrap(),
            "The quick brown fox jumps over the lazy dog"
        );
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_opaque_padding() {
        let mut buf = BytesMut::new();
        buf.pack_opaque(b"abcde");
        assert_eq!(
            buf.as_ref(),
            &[0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e', 0, 0, 0]
        );

        let mut aligned = BytesMut::new();
        aligned.pack_opaque(b"abcd");
        assert_eq!(aligned.len(), 8);

        // Padding content is ignored on decode
        let mut wire = Bytes::from_static(&[0, 0, 0, 1, b'z', 0xff, 0xff, 0xff, 0, 0, 0, 9]);
        assert_eq!(wire.unpack_opaque().unwrap().as_ref(), b"z");
        assert_eq!(wire.unpack_uint().unwrap(), 9);
    }

    #[test]
    fn test_not_enough_data() {
        let mut short = Bytes::from_static(&[0, 0, 1]);
        assert!(matches!(
            short.unpack_uint(),
            Err(Error::Decode(DecodeError::NotEnoughData))
        ));

        let mut short = Bytes::from_static(&[0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            short.unpack_uhyper(),
            Err(Error::Decode(DecodeError::NotEnoughData))
        ));

        // Length prefix promises more than what follows
        let mut truncated = Bytes::from_static(&[0, 0, 0, 8, 1, 2, 3, 4]);
        assert!(matches!(
            truncated.unpack_opaque(),
            Err(Error::Decode(DecodeError::NotEnoughData))
        ));

        // Data present but padding missing
        let mut unpadded = Bytes::from_static(&[0, 0, 0, 2, 1, 2]);
        assert!(unpadded.unpack_opaque().is_err());
    }

    #[test]
    fn test_bad_bool() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 2]);
        assert!(matches!(
            buf.unpack_bool(),
            Err(Error::Decode(DecodeError::InvalidBool(2)))
        ));
    }

    #[test]
    fn test_bad_utf8() {
        let mut buf = BytesMut::new();
        buf.pack_opaque(&[0xc3, 0x28]);
        assert!(matches!(
            buf.freeze().unpack_string(),
            Err(Error::Decode(DecodeError::InvalidUtf8))
        ));
    }

    #[test]
    fn test_list() {
        let mut buf = BytesMut::new();
        buf.pack_list(&[7u64, 8, 9], |buf, item| buf.pack_uhyper(*item));
        buf.pack_bool(true);
        assert_eq!(buf.len(), 3 * 12 + 4 + 4);

        let mut buf = buf.freeze();
        assert_eq!(buf.unpack_list::<u64>().unwrap(), vec![7, 8, 9]);
        assert!(buf.unpack_bool().unwrap());

        let mut empty = BytesMut::new();
        empty.pack_list::<u32, _>(&[], |buf, item| buf.pack_uint(*item));
        assert_eq!(empty.as_ref(), &[0, 0, 0, 0]);
        assert!(empty.freeze().unpack_list::<u32>().unwrap().is_empty());
    }

    #[test]
    fn test_list_iter_is_lazy() {
        let mut buf = BytesMut::new();
        buf.pack_list(&[1u32, 2], |buf, item| buf.pack_uint(*item));
        let mut buf = buf.freeze();

        let mut iter = buf.unpack_list_iter::<u32>();
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        drop(iter);
        // Only the first element was consumed
        assert_eq!(buf.remaining(), 12);
    }

    #[test]
    fn test_list_truncated() {
        let mut buf = BytesMut::new();
        buf.pack_bool(true);
        buf.pack_uint(1);
        buf.pack_bool(true);
        let mut buf = buf.freeze();

        let items: Vec<_> = buf.unpack_list_iter::<u32>().collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[test]
    fn test_generic_round_trip() {
        let mut buf = BytesMut::new();
        Some(5u32).pack_to(&mut buf);
        None::<u32>.pack_to(&mut buf);
        vec![1u32, 2, 3].pack_to(&mut buf);
        vec![0xaau8, 0xbb].pack_to(&mut buf);
        String::from("name").pack_to(&mut buf);

        let mut buf = buf.freeze();
        assert_eq!(Option::<u32>::unpack_from(&mut buf).unwrap(), Some(5));
        assert_eq!(Option::<u32>::unpack_from(&mut buf).unwrap(), None);
        assert_eq!(Vec::<u32>::unpack_from(&mut buf).unwrap(), vec![1, 2, 3]);
        assert_eq!(Vec::<u8>::unpack_from(&mut buf).unwrap(), vec![0xaa, 0xbb]);
        assert_eq!(String::unpack_from(&mut buf).unwrap(), "name");
    }
}
