//! GPIO lines used for reset and output-enable signals.
//!
//! Boards do not own a pin permanently.  Each operation that needs one opens it as an output,
//! drives it and drops it again at the end of the scope, which also covers early returns on
//! errors.
use core::convert::Infallible;
use embedded_hal::digital::{Error as _, ErrorKind, ErrorType, OutputPin};

/// Platform GPIO controller able to open numbered pins as outputs.
pub trait GpioController {
    type Pin: OutputPin;

    /// Open pin `number` as an output.  Dropping the returned pin releases it.
    fn open_output(&mut self, number: u8) -> Result<Self::Pin, <Self::Pin as ErrorType>::Error>;
}

/// Controller type for boards that have no GPIO line attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoGpio;

/// Pin of [`NoGpio`].  Never handed out to a driver operation.
#[derive(Debug)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl GpioController for NoGpio {
    type Pin = NoPin;

    fn open_output(&mut self, _number: u8) -> Result<NoPin, Infallible> {
        Ok(NoPin)
    }
}

/// Why driving a line failed.  Converts into the matching [`crate::Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// No line is attached to the board.
    Missing,
    /// Opening or driving the pin failed.
    Pin(ErrorKind),
}

/// A GPIO controller together with the number of the line a board is wired to.
#[derive(Debug)]
pub(crate) struct Line<G> {
    gpio: G,
    number: u8,
}

impl<G: GpioController> Line<G> {
    pub fn new(gpio: G, number: u8) -> Self {
        Self { gpio, number }
    }

    /// Open the line, run `f` on it and release it again.
    pub fn with_pin<R>(
        &mut self,
        f: impl FnOnce(&mut G::Pin) -> Result<R, <G::Pin as ErrorType>::Error>,
    ) -> Result<R, LineError> {
        let mut pin = self
            .gpio
            .open_output(self.number)
            .map_err(|e| LineError::Pin(e.kind()))?;
        trace!("gpio {} opened", self.number);
        f(&mut pin).map_err(|e| LineError::Pin(e.kind()))
    }

    pub fn set_high(&mut self) -> Result<(), LineError> {
        self.with_pin(|p| p.set_high())
    }

    pub fn set_low(&mut self) -> Result<(), LineError> {
        self.with_pin(|p| p.set_low())
    }
}

/// Access an optional line, failing with [`LineError::Missing`] when none is attached.
pub(crate) fn require<G>(line: &mut Option<Line<G>>) -> Result<&mut Line<G>, LineError> {
    line.as_mut().ok_or(LineError::Missing)
}
