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
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Columns requested from the exchange, in the order the row parser reads
/// them.
pub const COLUMNS: [&str; 9] = [
	"SECID",
	"SHORTNAME",
	"FACEVALUE",
	"COUPONVALUE",
	"COUPONPERIOD",
	"MATDATE",
	"PREVLEGALCLOSEPRICE",
	"ACCRUEDINT",
	"FACEUNIT",
];

// -------------
// -- SENDING --
// -------------

#[derive(Debug, Serialize)]
pub struct SecuritiesParams {
	#[serde(rename = "iss.dp")]
	pub decimal_point: &'static str,
	#[serde(rename = "iss.meta")]
	pub meta: &'static str,
	#[serde(rename = "iss.only")]
	pub only: &'static str,
	#[serde(rename = "securities.columns")]
	pub columns: String,
}

impl Default for SecuritiesParams {
	fn default() -> Self {
		SecuritiesParams {
			decimal_point: "comma",
			meta: "off",
			only: "securities",
			columns: COLUMNS.join(","),
		}
	}
}

// ---------------
// -- RECEIVING --
// ---------------

#[derive(Deserialize, Debug, Default)]
pub struct SecuritiesHolder {
	pub securities: Option<Section>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Section {
	#[serde(default)]
	pub columns: Vec<String>,
	#[serde(default)]
	pub data: Vec<Vec<Value>>,
}

/// Positions of the requested columns within one response's tuples,
/// resolved once per section.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
	positions: [usize; COLUMNS.len()],
}

impl ColumnIndex {
	/// Returns the name of the first requested column missing from the
	/// section header, if any.
	pub fn resolve(columns: &[String]) -> Result<Self, &'static str> {
		let by_name: HashMap<&str, usize> = columns
			.iter()
			.enumerate()
			.map(|(i, name)| (name.as_str(), i))
			.collect();

		let mut positions = [0; COLUMNS.len()];
		for (slot, name) in COLUMNS.iter().enumerate() {
			positions[slot] = *by_name.get(name).ok_or(*name)?;
		}

		Ok(ColumnIndex { positions })
	}

	/// The cell for requested column `slot` (an index into `COLUMNS`).
	pub fn cell<'a>(&self, row: &'a [Value], slot: usize) -> &'a Value {
		row.get(self.positions[slot]).unwrap_or(&Value::Null)
	}
}

/// A raw tuple from the feed, kept with its ISIN for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
	pub isin: String,
	pub cells: Vec<Value>,
}

impl Section {
	/// Builds one raw row per tuple keyed by ISIN. A repeated ISIN keeps the
	/// last tuple's values at the position where the ISIN first appeared.
	pub fn rows(self, index: &ColumnIndex) -> Vec<RawRow> {
		let mut rows: Vec<RawRow> = Vec::with_capacity(self.data.len());
		let mut seen: HashMap<String, usize> = HashMap::new();

		for cells in self.data {
			let isin = match index.cell(&cells, 0) {
				Value::String(s) if !s.is_empty() => s.clone(),
				_ => {
					warn!("skipping row without ISIN; row data: {:?}", cells);
					continue;
				},
			};

			if let Some(&at) = seen.get(&isin) {
				rows[at].cells = cells;
			} else {
				seen.insert(isin.clone(), rows.len());
				rows.push(RawRow { isin, cells });
			}
		}

		rows
	}
}
