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
use std::fmt::Write;

/// Plain-text table for terminal output of the ranked report.
pub struct Table {
	column_count: usize,
	rows: Vec<Row>,
	right_align: Vec<bool>, // indicates columns by index
}

pub enum Row {
	Header(Vec<String>),
	Data(Vec<String>),
	Separator,
}

impl Table {
	pub fn new(column_count: usize) -> Self {
		Self {
			column_count,
			rows: Vec::new(),
			right_align: vec![false; column_count],
		}
	}

	/// The ranked report, at most `limit` rows.
	pub fn from_report(rows: &[ReportRow], limit: Option<usize>) -> Self {
		let mut table = Table::new(HEADERS.len());
		table.add_header(HEADERS.to_vec());
		table.add_separator();
		table.right_align(vec![3, 4, 5, 6, 7]);

		for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
			table.add_row(row.cells().to_vec());
		}

		table
	}

	pub fn add_header(&mut self, row: Vec<&str>) {
		self.rows.push(Row::Header(
			row.into_iter().map(|s| s.to_string()).collect(),
		));
	}

	pub fn add_row(&mut self, row: Vec<String>) {
		self.rows.push(Row::Data(row));
	}

	pub fn add_separator(&mut self) {
		self.rows.push(Row::Separator);
	}

	/// Specifies columns that should be right-aligned by index.
	pub fn right_align(&mut self, cols: Vec<usize>) {
		for col in cols {
			self.right_align[col] = true;
		}
	}

	pub fn print(&self) {
		println!();
		print!("{}", self.render());
	}

	pub fn render(&self) -> String {
		let mut max_widths = vec![0; self.column_count];

		// Calculate maximum column widths for proper spacing
		for row in &self.rows {
			if let Row::Data(data_row) | Row::Header(data_row) = row {
				for (i, value) in data_row.iter().enumerate() {
					max_widths[i] = max_widths[i].max(width(value));
				}
			}
		}

		let mut out = String::new();
		for row in &self.rows {
			match row {
				Row::Header(header_row) => {
					self.render_centered_row(&mut out, &max_widths, header_row)
				},
				Row::Data(data_row) => {
					self.render_data_row(&mut out, &max_widths, data_row)
				},
				Row::Separator => {
					let total_width: usize = max_widths.iter().sum::<usize>()
						+ (3 * (self.column_count - 1));
					let _ = writeln!(out, "{}", "-".repeat(total_width));
				},
			}
		}
		out
	}

	fn render_data_row(
		&self,
		out: &mut String,
		max_widths: &[usize],
		data_row: &[String],
	) {
		let cells: Vec<String> = data_row
			.iter()
			.enumerate()
			.map(|(i, value)| {
				let padding = " ".repeat(max_widths[i] - width(value));
				if self.right_align[i] {
					format!("{}{}", padding, value)
				} else {
					format!("{}{}", value, padding)
				}
			})
			.collect();
		let _ = writeln!(out, "{}", cells.join("   ").trim_end());
	}

	fn render_centered_row(
		&self,
		out: &mut String,
		max_widths: &[usize],
		data_row: &[String],
	) {
		let cells: Vec<String> = data_row
			.iter()
			.enumerate()
			.map(|(i, value)| Table::center_align(value, max_widths[i]))
			.collect();
		let _ = writeln!(out, "{}", cells.join(" | ").trim_end());
	}

	fn center_align(value: &str, width_: usize) -> String {
		let len = width(value);
		if len >= width_ {
			return value.to_string();
		}
		let total_padding = width_ - len;
		let left_padding = total_padding / 2;
		let right_padding = total_padding - left_padding;

		format!(
			"{}{}{}",
			" ".repeat(left_padding),
			value,
			" ".repeat(right_padding)
		)
	}
}

// names from the exchange are often Cyrillic, so count chars, not bytes
fn width(s: &str) -> usize {
	s.chars().count()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_alignment() {
		let mut table = Table::new(2);
		table.add_header(vec!["Name", "Yield"]);
		table.add_separator();
		table.right_align(vec![1]);
		table.add_row(vec!["ОФЗ 26240".to_string(), "9.5".to_string()]);
		table.add_row(vec!["A".to_string(), "14.25".to_string()]);

		let rendered = table.render();
		let lines: Vec<&str> = rendered.lines().collect();
		assert_eq!(lines[0], "  Name    | Yield");
		assert_eq!(lines[1], "-".repeat(9 + 5 + 3));
		assert_eq!(lines[2], "ОФЗ 26240     9.5");
		assert_eq!(lines[3], "A           14.25");
	}

	#[test]
	fn test_from_report_limit() {
		let row = ReportRow {
			name: "OFZ".to_string(),
			rating: "AAA".to_string(),
			isin: "RU000A0JX0J2".to_string(),
			face_value: 1000.0,
			broker_price: 987.4625,
			coupon_value: 40.0,
			days_to_maturity: 365,
			approximate_yield: 13.42,
			face_unit: "SUR".to_string(),
		};
		let rows = vec![row.clone(), row.clone(), row];
		let rendered = Table::from_report(&rows, Some(2)).render();
		assert_eq!(rendered.lines().count(), 4);
		assert!(rendered.contains("987.46"));
	}
}
