use std::io;

#[cfg(feature = "serial")]
pub mod serial;

/// A byte-oriented duplex link to the modem.
///
/// Implementors only need to guarantee one byte of readiness at a time:
/// callers check [`has_data_available`](SerialChannel::has_data_available)
/// before every [`read_one_byte`](SerialChannel::read_one_byte).
pub trait SerialChannel: Send {
    /// Write all bytes to the link.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Whether at least one byte can be read without blocking.
    fn has_data_available(&mut self) -> io::Result<bool>;

    /// Read a single byte. Only called after `has_data_available()` returned `true`.
    fn read_one_byte(&mut self) -> io::Result<u8>;
}

impl<T: SerialChannel + ?Sized> SerialChannel for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn has_data_available(&mut self) -> io::Result<bool> {
        (**self).has_data_available()
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        (**self).read_one_byte()
    }
}
