//! Scripted responses and call recording for hand-written collaborator fakes.

use std::{collections::VecDeque, sync::Mutex};

/// Hands out queued responses in order; the final response repeats once the queue drains.
pub struct Script<T> {
	queue: Mutex<VecDeque<T>>,
	calls: Mutex<usize>,
}
impl<T> Script<T>
where
	T: Clone,
{
	pub fn new(responses: impl IntoIterator<Item = T>) -> Self {
		Self { queue: Mutex::new(responses.into_iter().collect()), calls: Mutex::new(0) }
	}

	pub fn repeating(response: T) -> Self {
		Self::new([response])
	}

	/// Returns the next response, or `None` when the script was empty from the start.
	pub fn next(&self) -> Option<T> {
		*self.calls.lock().unwrap_or_else(|err| err.into_inner()) += 1;

		let mut queue = self.queue.lock().unwrap_or_else(|err| err.into_inner());

		if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
	}

	pub fn calls(&self) -> usize {
		*self.calls.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Captures the inputs a fake was called with.
pub struct Recorder<T> {
	seen: Mutex<Vec<T>>,
}
impl<T> Default for Recorder<T> {
	fn default() -> Self {
		Self { seen: Mutex::new(Vec::new()) }
	}
}
impl<T> Recorder<T>
where
	T: Clone,
{
	pub fn record(&self, value: T) {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).push(value);
	}

	pub fn seen(&self) -> Vec<T> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn last_response_repeats() {
		let script = Script::new(["first", "second"]);

		assert_eq!(script.next(), Some("first"));
		assert_eq!(script.next(), Some("second"));
		assert_eq!(script.next(), Some("second"));
		assert_eq!(script.calls(), 3);
	}

	#[test]
	fn empty_script_yields_nothing() {
		let script = Script::<u8>::new([]);

		assert_eq!(script.next(), None);
	}
}
