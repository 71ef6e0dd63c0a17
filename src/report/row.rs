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
use serde::Serialize;

/// Report column headers, in output order.
pub const HEADERS: [&str; 9] = [
	"Name",
	"Credit rating",
	"ISIN",
	"Face value",
	"Broker price",
	"Coupon value",
	"Days to maturity",
	"Approximate yield",
	"Face unit",
];

/// One line of the ranked report. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Credit rating")]
	pub rating: String,
	#[serde(rename = "ISIN")]
	pub isin: String,
	#[serde(rename = "Face value")]
	pub face_value: f64,
	#[serde(rename = "Broker price")]
	pub broker_price: f64,
	#[serde(rename = "Coupon value")]
	pub coupon_value: f64,
	#[serde(rename = "Days to maturity")]
	pub days_to_maturity: i64,
	#[serde(rename = "Approximate yield")]
	pub approximate_yield: f64,
	#[serde(rename = "Face unit")]
	pub face_unit: String,
}

impl ReportRow {
	/// Cells rendered as text, in column order.
	pub fn cells(&self) -> [String; 9] {
		[
			self.name.clone(),
			self.rating.clone(),
			self.isin.clone(),
			format!("{}", self.face_value),
			format!("{:.2}", self.broker_price),
			format!("{}", self.coupon_value),
			self.days_to_maturity.to_string(),
			format!("{:.2}", self.approximate_yield),
			self.face_unit.clone(),
		]
	}
}
