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
use std::fmt;

/// Where a pipeline run currently is. Runs move strictly forward through the
/// working stages and end in exactly one of `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Idle,
	Fetching,
	Filtering,
	Enriching,
	Sorting,
	Writing,
	Done,
	Failed,
}

impl Stage {
	/// Number of working stages, each worth one progress step.
	pub const TOTAL_STEPS: u8 = 5;

	/// The stage after this one on a successful run.
	pub fn next(self) -> Stage {
		match self {
			Stage::Idle => Stage::Fetching,
			Stage::Fetching => Stage::Filtering,
			Stage::Filtering => Stage::Enriching,
			Stage::Enriching => Stage::Sorting,
			Stage::Sorting => Stage::Writing,
			Stage::Writing => Stage::Done,
			Stage::Done => Stage::Done,
			Stage::Failed => Stage::Failed,
		}
	}

	#[cfg(test)]
	pub fn is_terminal(self) -> bool {
		matches!(self, Stage::Done | Stage::Failed)
	}

	/// Integer percentage reported once `steps_completed` stages finished.
	pub fn percent(steps_completed: u8) -> u8 {
		let steps = steps_completed.min(Stage::TOTAL_STEPS) as u32;
		(steps * 100 / Stage::TOTAL_STEPS as u32) as u8
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Stage::Idle => "idle",
			Stage::Fetching => "fetching bonds",
			Stage::Filtering => "filtering",
			Stage::Enriching => "fetching credit ratings",
			Stage::Sorting => "sorting",
			Stage::Writing => "writing report",
			Stage::Done => "done",
			Stage::Failed => "failed",
		};
		write!(f, "{}", s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_successful_walk() {
		let mut stage = Stage::Idle;
		let mut working = 0;
		while !stage.is_terminal() {
			stage = stage.next();
			if !stage.is_terminal() {
				working += 1;
			}
		}
		assert_eq!(stage, Stage::Done);
		assert_eq!(working, Stage::TOTAL_STEPS);
	}

	#[test]
	fn test_terminal_stages_stay_put() {
		assert_eq!(Stage::Done.next(), Stage::Done);
		assert_eq!(Stage::Failed.next(), Stage::Failed);
	}

	#[test]
	fn test_percent() {
		let all: Vec<u8> = (0..=5).map(Stage::percent).collect();
		assert_eq!(all, vec![0, 20, 40, 60, 80, 100]);
		assert_eq!(Stage::percent(9), 100);
	}
}
