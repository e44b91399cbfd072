/// Number of rounds a resolve may take before giving up.
pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// Environment variable overriding [`DEFAULT_MAX_ROUNDS`].
pub const MAX_ROUNDS_ENV: &str = "PINLOCK_MAX_ROUNDS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
	max_rounds: usize,
}

impl Default for ResolverOptions {
	fn default() -> Self {
		Self {
			max_rounds: max_rounds_from(std::env::var(MAX_ROUNDS_ENV).ok().as_deref()),
		}
	}
}

/// Reads a round count as given in [`MAX_ROUNDS_ENV`], falling back to [`DEFAULT_MAX_ROUNDS`].
fn max_rounds_from(value: Option<&str>) -> usize {
	let Some(v) = value else {
		return DEFAULT_MAX_ROUNDS;
	};
	match v.trim().parse::<usize>() {
		Ok(n) if n > 0 => n,
		_ => {
			log::warn!("Ignoring invalid {} value `{}`, using {}", MAX_ROUNDS_ENV, v, DEFAULT_MAX_ROUNDS);
			DEFAULT_MAX_ROUNDS
		}
	}
}

impl ResolverOptions {
	pub fn new(max_rounds: usize) -> Self {
		let mut options = Self { max_rounds: DEFAULT_MAX_ROUNDS };
		options.set_max_rounds(max_rounds);
		options
	}

	pub fn max_rounds(&self) -> usize {
		self.max_rounds
	}
	/// returns if the value is valid or not.
	pub fn set_max_rounds(&mut self, max_rounds: usize) -> bool {
		if max_rounds > 0 {
			self.max_rounds = max_rounds;
			true
		} else {
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test] fn zero_rounds_is_rejected() { let mut o = ResolverOptions::new(5); assert!(!o.set_max_rounds(0)); assert_eq!(o.max_rounds(), 5) }
	#[test] fn new_falls_back_on_zero() { assert_eq!(ResolverOptions::new(0).max_rounds(), DEFAULT_MAX_ROUNDS) }
	#[test] fn rounds_can_be_raised() { let mut o = ResolverOptions::new(1); assert!(o.set_max_rounds(64)); assert_eq!(o.max_rounds(), 64) }
	#[test] fn env_value_is_used() { assert_eq!(max_rounds_from(Some(" 64 ")), 64) }
	#[test] fn env_zero_falls_back() { assert_eq!(max_rounds_from(Some("0")), DEFAULT_MAX_ROUNDS) }
	#[test] fn env_garbage_falls_back() { assert_eq!(max_rounds_from(Some("lots")), DEFAULT_MAX_ROUNDS) }
	#[test] fn env_unset_is_default() { assert_eq!(max_rounds_from(None), DEFAULT_MAX_ROUNDS) }
	#[test] fn default_is_usable() { assert!(ResolverOptions::default().max_rounds() > 0) }
}
