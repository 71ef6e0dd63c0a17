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
use crate::bond::criteria::{self, SearchCriteria};
use crate::bond::instrument::Instrument;
use crate::market::client::InstrumentSource;
use crate::pipeline::events::{PipelineEvent, Progress};
use crate::pipeline::stage::Stage;
use crate::rating::enricher::RatingSource;
use crate::report::row::ReportRow;
use crate::report::writer::ReportWriter;
use anyhow::{anyhow, Error};
use chrono::NaiveDate;
use crossbeam_channel::{unbounded, Receiver};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// One screening run: fetch, filter, rate, rank and write. Every stage sees
/// the same evaluation date.
pub struct Pipeline<S, R, W> {
	source: S,
	ratings: R,
	writer: W,
	criteria: SearchCriteria,
	today: NaiveDate,
	stage: Stage,
	rows: Vec<ReportRow>,
}

impl<S, R, W> Pipeline<S, R, W>
where
	S: InstrumentSource,
	R: RatingSource,
	W: ReportWriter,
{
	pub fn new(
		source: S,
		ratings: R,
		writer: W,
		criteria: SearchCriteria,
		today: NaiveDate,
	) -> Self {
		Pipeline {
			source,
			ratings,
			writer,
			criteria,
			today,
			stage: Stage::Idle,
			rows: Vec::new(),
		}
	}

	pub fn stage(&self) -> Stage {
		self.stage
	}

	/// Rows handed to the writer by the last successful run.
	pub fn rows(&self) -> &[ReportRow] {
		&self.rows
	}

	/// Runs every stage and reports exactly one terminal event. Errors and
	/// panics from any stage end the run in `Failed`.
	pub fn execute(&mut self, progress: &mut Progress) -> Result<PathBuf, String> {
		info!("starting run for {}", self.today);
		progress.start();

		let outcome =
			match panic::catch_unwind(AssertUnwindSafe(|| self.run(progress))) {
				Ok(result) => result,
				Err(payload) => Err(anyhow!("panicked: {}", panic_message(&*payload))),
			};

		match outcome {
			Ok(path) => {
				self.stage = Stage::Done;
				info!("run finished: {}", path.display());
				progress.completed(path.clone());
				Ok(path)
			},
			Err(e) => {
				error!("run failed while {}: {:#}", self.stage, e);
				let message = format!("{:#}", e);
				self.stage = Stage::Failed;
				progress.failed(message.clone());
				Err(message)
			},
		}
	}

	fn run(&mut self, progress: &mut Progress) -> Result<PathBuf, Error> {
		self.advance();
		let bonds = self.source.fetch_all();
		progress.step();

		self.advance();
		let mut bonds = criteria::apply(bonds, &self.criteria, self.today);
		info!("{} bonds match the criteria", bonds.len());
		progress.step();

		self.advance();
		self.ratings.enrich(&mut bonds);
		progress.step();

		self.advance();
		sort_by_yield(&mut bonds, self.today);
		progress.step();

		self.advance();
		self.rows = bonds.iter().map(|b| b.report_row(self.today)).collect();
		let path = self.writer.write(&self.rows)?;
		progress.step();

		Ok(path)
	}

	fn advance(&mut self) {
		self.stage = self.stage.next();
		info!("stage: {}", self.stage);
	}
}

/// Highest yield first; ties keep their fetched order.
pub fn sort_by_yield(bonds: &mut [Instrument], today: NaiveDate) {
	bonds.sort_by(|a, b| {
		b.approximate_yield(today).total_cmp(&a.approximate_yield(today))
	});
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}

/// What a background run leaves behind once its thread exits.
#[derive(Debug)]
pub struct Finished {
	pub stage: Stage,
	pub rows: Vec<ReportRow>,
}

/// A run in flight on a background thread.
pub struct PipelineHandle {
	pub events: Receiver<PipelineEvent>,
	handle: JoinHandle<Finished>,
}

impl PipelineHandle {
	/// Waits for the worker to exit.
	pub fn join(self) -> Finished {
		self.handle.join().unwrap_or(Finished {
			stage: Stage::Failed,
			rows: Vec::new(),
		})
	}
}

/// Moves the pipeline onto its own worker thread so the caller can keep
/// serving its user while listening on `events`.
pub fn spawn<S, R, W>(mut pipeline: Pipeline<S, R, W>) -> Result<PipelineHandle, Error>
where
	S: InstrumentSource + Send + 'static,
	R: RatingSource + Send + 'static,
	W: ReportWriter + Send + 'static,
{
	let (tx, rx) = unbounded();
	let handle = thread::Builder::new()
		.name("bondscan-pipeline".to_string())
		.spawn(move || {
			let mut progress = Progress::new(tx);
			let _ = pipeline.execute(&mut progress);
			Finished {
				stage: pipeline.stage(),
				rows: pipeline.rows().to_vec(),
			}
		})?;

	Ok(PipelineHandle { events: rx, handle })
}
