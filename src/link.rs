//! Connection lifecycle shared by all boards.
//!
//! A board starts out disconnected.  `connect()` hands it the bus handle(s), after which register
//! operations are possible.  `release()` gives the handle(s) back and is terminal: a released
//! board refuses to connect again.

/// Capability implemented by every board driver.
pub trait ConnectedDevice {
    /// Bus handle(s) owned while connected.
    type Handle;
    /// Error returned by `connect()`.
    type Error;

    /// Take ownership of the bus handle(s) and bring the board into its initial state.
    ///
    /// If bringing the board up fails, the handle is dropped and the board stays disconnected.
    /// `connect()` can then be retried with a fresh handle.  Transports that are expensive to
    /// recreate should be passed as a cheap clone or a reference (`&mut I2C` also implements the
    /// bus traits).
    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error>;

    /// Whether the board currently holds a bus handle.
    fn is_connected(&self) -> bool;

    /// Give back the bus handle(s).
    ///
    /// Returns `None` if the board was never connected or was already released, so calling it
    /// more than once is harmless.
    fn release(&mut self) -> Option<Self::Handle>;
}

/// Why a [`Link`] refused an operation.  Converts into the matching [`crate::Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    NotConnected,
    AlreadyConnected,
    Released,
}

#[derive(Debug)]
enum State<H> {
    Disconnected,
    Connected(H),
    Released,
}

/// Bus handle slot with the connection state machine.
#[derive(Debug)]
pub(crate) struct Link<H> {
    state: State<H>,
}

impl<H> Link<H> {
    pub const fn new() -> Self {
        Self {
            state: State::Disconnected,
        }
    }

    /// Store `handle`.  Fails if already connected or released; `handle` is dropped then.
    pub fn attach(&mut self, handle: H) -> Result<&mut H, LinkError> {
        match self.state {
            State::Connected(_) => return Err(LinkError::AlreadyConnected),
            State::Released => return Err(LinkError::Released),
            State::Disconnected => {}
        }
        self.state = State::Connected(handle);
        self.get()
    }

    /// Access the handle, failing unless connected.
    pub fn get(&mut self) -> Result<&mut H, LinkError> {
        match &mut self.state {
            State::Connected(h) => Ok(h),
            State::Disconnected => Err(LinkError::NotConnected),
            State::Released => Err(LinkError::Released),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    /// Undo a failed `attach()`, the board returns to the disconnected state.
    pub fn detach(&mut self) -> Option<H> {
        match core::mem::replace(&mut self.state, State::Disconnected) {
            State::Connected(h) => Some(h),
            State::Released => {
                self.state = State::Released;
                None
            }
            State::Disconnected => None,
        }
    }

    pub fn release(&mut self) -> Option<H> {
        match core::mem::replace(&mut self.state, State::Released) {
            State::Connected(h) => {
                debug!("bus handle released");
                Some(h)
            }
            State::Disconnected | State::Released => None,
        }
    }
}

impl<H> Default for Link<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Link, LinkError};

    #[test]
    fn lifecycle() {
        let mut link = Link::<u8>::new();
        assert!(!link.is_connected());
        assert_eq!(link.get().unwrap_err(), LinkError::NotConnected);

        *link.attach(1).unwrap() += 1;
        assert!(link.is_connected());
        assert_eq!(link.attach(5).unwrap_err(), LinkError::AlreadyConnected);
        assert_eq!(*link.get().unwrap(), 2);

        assert_eq!(link.release(), Some(2));
        assert_eq!(link.release(), None);
        assert!(!link.is_connected());
        assert_eq!(link.get().unwrap_err(), LinkError::Released);
        assert_eq!(link.attach(3).unwrap_err(), LinkError::Released);
    }

    #[test]
    fn release_without_connect() {
        let mut link = Link::<u8>::new();
        assert_eq!(link.release(), None);
        assert_eq!(link.attach(3).unwrap_err(), LinkError::Released);
    }

    #[test]
    fn detach_after_failed_setup() {
        let mut link = Link::<u8>::new();
        link.attach(1).unwrap();
        assert_eq!(link.detach(), Some(1));
        assert!(!link.is_connected());
        link.attach(2).unwrap();
        assert!(link.is_connected());
    }
}
