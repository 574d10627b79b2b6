//! Caller identity and time for one engine call.

use crate::Permit2Error;
use alloy_primitives::Address;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Who is calling and when.
///
/// Supplied by the host for every call. The engine never reads a clock of its
/// own, so deadline and expiration checks are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
	/// The authorized principal of the call.
	pub caller: Address,
	/// Current time in seconds since the Unix epoch.
	pub timestamp: u64,
}

impl CallContext {
	pub fn new(caller: Address, timestamp: u64) -> Self {
		Self { caller, timestamp }
	}

	/// Context stamped with the local wall clock.
	pub fn now(caller: Address) -> Self {
		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or(Duration::ZERO)
			.as_secs();
		Self::new(caller, timestamp)
	}

	/// Returns the caller as an owner, rejecting the zero address.
	pub(crate) fn owner(&self) -> Result<Address, Permit2Error> {
		if self.caller.is_zero() {
			return Err(Permit2Error::Unauthorized);
		}
		Ok(self.caller)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zero_caller_is_unauthorized() {
		let ctx = CallContext::new(Address::ZERO, 10);
		assert!(matches!(ctx.owner(), Err(Permit2Error::Unauthorized)));

		let ctx = CallContext::new(Address::repeat_byte(1), 10);
		assert_eq!(ctx.owner().unwrap(), Address::repeat_byte(1));
	}
}
