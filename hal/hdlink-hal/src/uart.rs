//! UART serial communication abstractions
//!
//! Provides traits for the raw byte stream underneath the link. Device
//! provisioning (baud rate, line discipline) is the implementor's business.

/// UART transmitter
///
/// Byte sink used by the link engine for every outbound frame.
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
///
/// Used by integrations that pull bytes and push them into the engine.
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Read data from the UART
    ///
    /// Blocks until at least one byte is available. Returns `Ok(0)` at end
    /// of stream.
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}
