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
use crate::report::row::{ReportRow, HEADERS};
use anyhow::{anyhow, Error};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Destination for the finished, ranked report.
pub trait ReportWriter {
	/// Persists `rows` in order and returns where they went.
	fn write(&mut self, rows: &[ReportRow]) -> Result<PathBuf, Error>;
}

/// Writes the report as `bonds_<date>.csv` with a header row.
pub struct CsvReportWriter {
	directory: PathBuf,
	date: NaiveDate,
}

impl CsvReportWriter {
	pub fn new(directory: PathBuf, date: NaiveDate) -> Self {
		CsvReportWriter { directory, date }
	}

	pub fn file_path(&self) -> PathBuf {
		self.directory.join(format!("bonds_{}.csv", self.date))
	}
}

impl ReportWriter for CsvReportWriter {
	fn write(&mut self, rows: &[ReportRow]) -> Result<PathBuf, Error> {
		fs::create_dir_all(&self.directory).map_err(|e| {
			anyhow!("cannot create {}: {}", self.directory.display(), e)
		})?;

		let path = self.file_path();
		let mut writer = csv::Writer::from_path(&path)
			.map_err(|e| anyhow!("cannot open {}: {}", path.display(), e))?;
		// serialize() only emits the header along with the first record
		if rows.is_empty() {
			writer.write_record(HEADERS)?;
		}
		for row in rows {
			writer.serialize(row)?;
		}
		writer.flush()?;

		info!("wrote {} bonds to {}", rows.len(), path.display());
		Ok(path)
	}
}
