//! An object-safe hashing abstraction so the PRF (`crypto::prf`), HMAC
//! (`crypto::hmac`), and handshake transcript (`tls::transcript`) don't
//! need to be generic over a concrete hash type.

use std::marker::PhantomData;

/// Encapsulates an algorithm for creating hashes (SHA-256 only, in this
/// crate's scope).
pub trait Hasher: Send {
    fn block_size(&self) -> usize;

    /// Expected size of the output digest in bytes.
    fn output_size(&self) -> usize;

    /// Appends some data to the internal state of the hasher.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash and returns the digest of all data accumulated so
    /// far. Valid to call `update()` again afterwards; `finish()` is always
    /// cumulative.
    fn finish(&self) -> Vec<u8>;

    fn finish_with(&mut self, data: &[u8]) -> Vec<u8> {
        self.update(data);
        self.finish()
    }

    /// Produces a cloned copy of this hasher, including any data already
    /// seen by `update()`.
    fn box_clone(&self) -> Box<dyn Hasher>;
}

pub trait Factory<T: ?Sized> {
    fn create(&self) -> Box<T>;
    fn box_clone(&self) -> Box<dyn Factory<T>>;
}

pub type HasherFactory = Box<dyn Factory<dyn Hasher>>;

impl Clone for HasherFactory {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub struct DefaultHasherFactory<T: Default + ?Sized> {
    t: PhantomData<T>,
}

impl<T: Default + ?Sized> DefaultHasherFactory<T> {
    pub fn new() -> Self {
        Self { t: PhantomData }
    }
}

impl<T: Hasher + Default + 'static> Factory<dyn Hasher> for DefaultHasherFactory<T> {
    fn create(&self) -> Box<dyn Hasher> {
        Box::new(T::default())
    }

    fn box_clone(&self) -> HasherFactory {
        Box::new(Self::new())
    }
}

pub trait GetHasherFactory {
    fn factory() -> HasherFactory;
}

impl<T: 'static + Default + Hasher> GetHasherFactory for T {
    fn factory() -> HasherFactory {
        Box::new(DefaultHasherFactory::<T>::new())
    }
}
