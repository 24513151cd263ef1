/// Number of status reads before a conversion is considered lost.
pub const DEFAULT_POLL_BUDGET: u32 = 15_000;

/// Outcome of a poll that did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError<E> {
    /// Every attempt of the budget reported "not ready".
    Timeout,
    /// The read itself failed.  Polling stops at the first failure.
    Bus(E),
}

/// Bounded busy-poll for the conversion-ready handshake.
///
/// There is no sleep between attempts, so the wall-clock duration is bounded by bus latency
/// times the budget.  The calling thread is blocked for the whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConversionPoller {
    budget: u32,
}

impl ConversionPoller {
    /// A poller that makes at most `budget` read attempts.  A budget of 0 is treated as 1.
    pub const fn new(budget: u32) -> Self {
        Self {
            budget: if budget == 0 { 1 } else { budget },
        }
    }

    /// Maximum number of read attempts.
    pub const fn budget(&self) -> u32 {
        self.budget
    }

    /// Call `read` until it reports ready, returning its value.
    ///
    /// `read` returns the value of one attempt together with the ready flag.  After `budget`
    /// attempts without a ready flag, [`PollError::Timeout`] is returned.
    pub fn run<T, E, F>(&self, mut read: F) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Result<(T, bool), E>,
    {
        for attempt in 1..=self.budget {
            let (value, ready) = read().map_err(PollError::Bus)?;
            if ready {
                trace!("conversion ready after {} reads", attempt);
                return Ok(value);
            }
        }
        warn!("conversion not ready after {} reads", self.budget);
        Err(PollError::Timeout)
    }
}

impl Default for ConversionPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionPoller, PollError, DEFAULT_POLL_BUDGET};

    #[test]
    fn returns_first_ready_value() {
        let mut calls = 0;
        let res: Result<u32, PollError<()>> = ConversionPoller::new(10).run(|| {
            calls += 1;
            Ok((calls, calls == 3))
        });
        assert_eq!(res, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn times_out_after_exactly_the_budget() {
        let mut calls = 0;
        let res: Result<(), PollError<()>> = ConversionPoller::default().run(|| {
            calls += 1;
            Ok(((), false))
        });
        assert_eq!(res, Err(PollError::Timeout));
        assert_eq!(calls, DEFAULT_POLL_BUDGET);
    }

    #[test]
    fn ready_on_last_attempt_is_not_a_timeout() {
        let mut calls = 0;
        let res: Result<(), PollError<()>> = ConversionPoller::new(5).run(|| {
            calls += 1;
            Ok(((), calls == 5))
        });
        assert_eq!(res, Ok(()));
    }

    #[test]
    fn bus_errors_stop_polling() {
        let mut calls = 0;
        let res: Result<(), PollError<&str>> = ConversionPoller::new(5).run(|| {
            calls += 1;
            if calls == 2 {
                Err("nak")
            } else {
                Ok(((), false))
            }
        });
        assert_eq!(res, Err(PollError::Bus("nak")));
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_budget_still_reads_once() {
        assert_eq!(ConversionPoller::new(0).budget(), 1);
    }
}
