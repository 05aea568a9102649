//! Byte-stream transports
//!
//! Adapts `std::io` streams to the `hdlink-hal` UART traits. The link writes
//! through [`StreamTx`]; the receive loop reads through [`StreamRx`].

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hdlink_hal::{UartRx, UartTx};

pub type BoxedTx = StreamTx<Box<dyn Write + Send>>;
pub type BoxedRx = StreamRx<Box<dyn Read + Send>>;

/// Write half of a stream
pub struct StreamTx<W>(W);

impl<W: Write> StreamTx<W> {
    pub fn new(inner: W) -> Self {
        Self(inner)
    }
}

impl<W: Write> UartTx for StreamTx<W> {
    type Error = io::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

/// Read half of a stream
pub struct StreamRx<R>(R);

impl<R: Read> StreamRx<R> {
    pub fn new(inner: R) -> Self {
        Self(inner)
    }
}

impl<R: Read> UartRx for StreamRx<R> {
    type Error = io::Error;

    fn read_blocking(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            match self.0.read(buffer) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}

/// Standard input and output
pub fn stdio() -> (BoxedTx, BoxedRx) {
    (
        StreamTx::new(Box::new(io::stdout())),
        StreamRx::new(Box::new(io::stdin())),
    )
}

/// Open a device file for reading and writing
///
/// Line settings (baud rate, raw mode) are left to the caller, e.g. `stty`.
pub fn open_device(path: &Path) -> Result<(BoxedTx, BoxedRx)> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let reader = file
        .try_clone()
        .with_context(|| format!("duplicating handle for {}", path.display()))?;
    Ok((
        StreamTx::new(Box::new(file)),
        StreamRx::new(Box::new(reader)),
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_tx_writes_through() {
        let mut out = Vec::new();
        let mut tx = StreamTx::new(&mut out);
        tx.write_blocking(&[0x7E, 0x01]).unwrap();
        tx.write_blocking(&[0x7E]).unwrap();
        tx.flush().unwrap();
        drop(tx);
        assert_eq!(out, vec![0x7E, 0x01, 0x7E]);
    }

    #[test]
    fn test_rx_reports_eof() {
        let mut rx = StreamRx::new(Cursor::new(vec![1, 2, 3]));
        let mut buffer = [0u8; 8];
        assert_eq!(rx.read_blocking(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], &[1, 2, 3]);
        assert_eq!(rx.read_blocking(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_open_missing_device() {
        assert!(open_device(Path::new("/nonexistent/hdlink-tty")).is_err());
    }
}
