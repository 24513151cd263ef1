use crate::gpio::LineError;
use crate::link::LinkError;

/// Parameter that was rejected by argument validation.
///
/// Validation happens before any bus transaction is issued, so a rejected call never leaves the
/// hardware or the register shadow in a changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Argument {
    Channel,
    Pin,
    Port,
    Gain,
    BitDepth,
    Voltage,
    ReferenceVoltage,
    Frequency,
    OnTime,
    OffTime,
    Address,
    Length,
    Year,
    Mask,
    Value,
}

/// Errors reported by the board drivers.
///
/// `E` is the error type of the underlying bus transport.  It is passed through untouched in
/// [`Error::Bus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// An argument was outside of its documented range.
    #[error("invalid argument: {0:?}")]
    InvalidArgument(Argument),
    /// The operation needs a bus handle but `connect()` was not called yet.
    #[error("not connected, `connect()` must be called first")]
    NotConnected,
    /// `connect()` was called on a driver which already holds a bus handle.
    #[error("already connected")]
    AlreadyConnected,
    /// The driver was released and can not be used anymore.
    #[error("driver was released")]
    Released,
    /// The bus transaction failed.
    #[error("bus transaction failed")]
    Bus(E),
    /// The ADC did not report a finished conversion within the poll budget.
    #[error("conversion did not complete in time")]
    Timeout,
    /// A write to the RTC memory would run past the end of the SRAM window.
    #[error("write exceeds the battery backed memory")]
    Overflow,
    /// Driving a GPIO line failed.
    #[error("gpio error: {0:?}")]
    Gpio(embedded_hal::digital::ErrorKind),
    /// A GPIO operation was requested but no line was attached to the driver.
    #[error("no gpio line configured")]
    PinNotConfigured,
}

impl<E> Error<E> {
    /// Convert the bus error, leaving every other variant as it is.
    pub fn map_bus<F>(self, f: impl FnOnce(E) -> F) -> Error<F> {
        match self {
            Error::InvalidArgument(arg) => Error::InvalidArgument(arg),
            Error::NotConnected => Error::NotConnected,
            Error::AlreadyConnected => Error::AlreadyConnected,
            Error::Released => Error::Released,
            Error::Bus(e) => Error::Bus(f(e)),
            Error::Timeout => Error::Timeout,
            Error::Overflow => Error::Overflow,
            Error::Gpio(kind) => Error::Gpio(kind),
            Error::PinNotConfigured => Error::PinNotConfigured,
        }
    }
}

impl<E> From<Argument> for Error<E> {
    fn from(arg: Argument) -> Self {
        Error::InvalidArgument(arg)
    }
}

impl<E> From<LinkError> for Error<E> {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::NotConnected => Error::NotConnected,
            LinkError::AlreadyConnected => Error::AlreadyConnected,
            LinkError::Released => Error::Released,
        }
    }
}

impl<E> From<LineError> for Error<E> {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Missing => Error::PinNotConfigured,
            LineError::Pin(kind) => Error::Gpio(kind),
        }
    }
}
