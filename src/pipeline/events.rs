/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use crate::pipeline::stage::Stage;
use crossbeam_channel::Sender;
use std::path::PathBuf;

/// Notifications a run sends back to whoever started it.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
	/// Integer percentage of completed stages, 0..=100.
	Progress(u8),
	/// Location of the written report. Always the last event of a good run.
	Completed(PathBuf),
	/// Why the run stopped. Always the last event of a failed run.
	Failed(String),
}

/// Sending side of a run's event channel. A receiver that has gone away is
/// not an error: the caller simply stopped listening.
pub struct Progress {
	sender: Option<Sender<PipelineEvent>>,
	steps_completed: u8,
}

impl Progress {
	pub fn new(sender: Sender<PipelineEvent>) -> Self {
		Progress {
			sender: Some(sender),
			steps_completed: 0,
		}
	}

	/// Swallows every event.
	#[cfg(test)]
	pub fn silent() -> Self {
		Progress {
			sender: None,
			steps_completed: 0,
		}
	}

	pub fn start(&mut self) {
		self.steps_completed = 0;
		self.send(PipelineEvent::Progress(0));
	}

	/// Marks one more stage as finished.
	pub fn step(&mut self) {
		self.steps_completed = (self.steps_completed + 1).min(Stage::TOTAL_STEPS);
		self.send(PipelineEvent::Progress(Stage::percent(self.steps_completed)));
	}

	pub fn completed(&mut self, path: PathBuf) {
		self.send(PipelineEvent::Completed(path));
	}

	pub fn failed(&mut self, message: String) {
		self.send(PipelineEvent::Failed(message));
	}

	fn send(&self, event: PipelineEvent) {
		if let Some(sender) = &self.sender {
			let _ = sender.send(event);
		}
	}
}
