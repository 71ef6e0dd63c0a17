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
use crate::market::models::{ColumnIndex, RawRow};
use crate::report::row::ReportRow;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

/// Broker commission charged on top of the purchase price.
pub const BROKER_FEE: f64 = 0.25 / 100.0;

/// Shown in place of a credit rating that could not be determined.
pub const UNKNOWN_RATING: &str = "Unknown";

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
	#[error("column {column}: expected a number, got {value}")]
	NotANumber { column: &'static str, value: String },

	#[error("column {column}: expected text, got {value}")]
	NotText { column: &'static str, value: String },

	#[error("column {column}: bad date {value:?}")]
	BadDate { column: &'static str, value: String },
}

/// One exchange-listed bond. Everything derived from market data is
/// recomputed against the caller's evaluation date on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
	isin: String,
	pub name: String,
	pub face_value: f64,
	pub coupon_value: f64,
	/// `None` when the bond pays no coupon.
	pub coupon_period_days: Option<u32>,
	pub maturity_date: NaiveDate,
	/// Last close as a percentage of face value. `None` when there was no
	/// trade, which prices the bond at infinity.
	pub market_price_percent: Option<f64>,
	pub accrued_interest: f64,
	pub face_unit: String,
	credit_rating: Option<String>,
}

impl Instrument {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		isin: &str,
		name: &str,
		face_value: f64,
		coupon_value: f64,
		coupon_period_days: Option<u32>,
		maturity_date: NaiveDate,
		market_price_percent: Option<f64>,
		accrued_interest: f64,
		face_unit: &str,
	) -> Self {
		Instrument {
			isin: isin.to_string(),
			name: name.to_string(),
			face_value,
			coupon_value,
			coupon_period_days: coupon_period_days.filter(|&p| p > 0),
			maturity_date,
			market_price_percent: market_price_percent
				.filter(|&p| p != 0.0 && p.is_finite()),
			accrued_interest,
			face_unit: face_unit.to_string(),
			credit_rating: None,
		}
	}

	/// Coerces a feed tuple. Column slots follow `market::models::COLUMNS`.
	pub fn from_row(row: &RawRow, index: &ColumnIndex) -> Result<Self, RowError> {
		let cell = |slot: usize| index.cell(&row.cells, slot);

		let period = number(cell(4), "COUPONPERIOD")?;

		Ok(Instrument::new(
			&row.isin,
			&text(cell(1), "SHORTNAME")?,
			number(cell(2), "FACEVALUE")?.unwrap_or(0.0),
			number(cell(3), "COUPONVALUE")?.unwrap_or(0.0),
			period.filter(|p| *p >= 1.0).map(|p| p.round() as u32),
			date(cell(5), "MATDATE")?,
			number(cell(6), "PREVLEGALCLOSEPRICE")?,
			number(cell(7), "ACCRUEDINT")?.unwrap_or(0.0),
			&text(cell(8), "FACEUNIT")?,
		))
	}

	pub fn isin(&self) -> &str {
		&self.isin
	}

	pub fn credit_rating(&self) -> Option<&str> {
		self.credit_rating.as_deref()
	}

	pub fn set_credit_rating(&mut self, rating: String) {
		self.credit_rating = Some(rating);
	}

	/// Whole days from `today` until redemption; negative once matured.
	pub fn days_to_maturity(&self, today: NaiveDate) -> i64 {
		(self.maturity_date - today).num_days()
	}

	/// Coupons still to be paid. A partial period counts as one more coupon.
	pub fn coupons_remaining(&self, today: NaiveDate) -> i64 {
		let Some(period) = self.coupon_period_days else {
			return 0;
		};

		let days = self.days_to_maturity(today);
		let period = i64::from(period);
		let (full, part) = (days.div_euclid(period), days.rem_euclid(period));
		if part > 0 {
			full + 1
		} else {
			full
		}
	}

	/// Cost of buying one bond through the broker: clean price plus accrued
	/// interest, plus commission.
	pub fn broker_price(&self) -> f64 {
		let percent = self.market_price_percent.unwrap_or(f64::INFINITY);
		let price = self.face_value * percent / 100.0 + self.accrued_interest;
		price * (1.0 + BROKER_FEE)
	}

	/// Annualized simple return, in percent, from buying at the broker price
	/// today and holding to redemption. Zero once the bond has matured.
	pub fn approximate_yield(&self, today: NaiveDate) -> f64 {
		let days = self.days_to_maturity(today);
		if days <= 0 {
			return 0.0;
		}

		let coupons_income =
			self.coupons_remaining(today) as f64 * self.coupon_value;
		let total_income = self.face_value + coupons_income;
		let rate =
			(total_income / self.broker_price() - 1.0) * 100.0 * 365.0
				/ days as f64;

		round2(rate)
	}

	pub fn report_row(&self, today: NaiveDate) -> ReportRow {
		ReportRow {
			name: self.name.clone(),
			rating: self.credit_rating().unwrap_or(UNKNOWN_RATING).to_string(),
			isin: self.isin.clone(),
			face_value: self.face_value,
			broker_price: round2(self.broker_price()),
			coupon_value: self.coupon_value,
			days_to_maturity: self.days_to_maturity(today),
			approximate_yield: self.approximate_yield(today),
			face_unit: self.face_unit.clone(),
		}
	}
}

fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}

fn number(value: &Value, column: &'static str) -> Result<Option<f64>, RowError> {
	match value {
		Value::Null => Ok(None),
		Value::Number(n) => Ok(n.as_f64()),
		Value::String(s) if s.trim().is_empty() => Ok(None),
		Value::String(s) => s
			.trim()
			.replace(',', ".")
			.parse::<f64>()
			.map(Some)
			.map_err(|_| RowError::NotANumber {
				column,
				value: value.to_string(),
			}),
		_ => Err(RowError::NotANumber {
			column,
			value: value.to_string(),
		}),
	}
}

fn text(value: &Value, column: &'static str) -> Result<String, RowError> {
	match value {
		Value::String(s) => Ok(s.clone()),
		_ => Err(RowError::NotText {
			column,
			value: value.to_string(),
		}),
	}
}

fn date(value: &Value, column: &'static str) -> Result<NaiveDate, RowError> {
	let raw = text(value, column)?;
	NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
		.map_err(|_| RowError::BadDate { column, value: raw })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::market::models::COLUMNS;
	use approx::assert_relative_eq;
	use chrono::Duration;
	use serde_json::json;

	fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
	}

	fn bond(days: i64, period: Option<u32>) -> Instrument {
		Instrument::new(
			"RU000A0JX0J2",
			"OFZ 26240",
			1000.0,
			40.0,
			period,
			today() + Duration::days(days),
			Some(98.0),
			5.0,
			"SUR",
		)
	}

	fn index() -> ColumnIndex {
		let cols: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
		ColumnIndex::resolve(&cols).unwrap()
	}

	fn raw(cells: Value) -> RawRow {
		let cells = cells.as_array().unwrap().clone();
		RawRow {
			isin: cells[0].as_str().unwrap().to_string(),
			cells,
		}
	}

	#[test]
	fn test_worked_example() {
		let b = bond(365, Some(182));
		assert_eq!(b.days_to_maturity(today()), 365);
		assert_relative_eq!(b.broker_price(), 987.4625, epsilon = 1e-9);
		assert_eq!(b.coupons_remaining(today()), 3);

		let expected = (((1000.0 + 3.0 * 40.0) / b.broker_price() - 1.0)
			* 100.0 * 365.0
			/ 365.0
			* 100.0)
			.round() / 100.0;
		assert_eq!(b.approximate_yield(today()), expected);
		assert_relative_eq!(b.approximate_yield(today()), 13.42);
	}

	#[test]
	fn test_matured_bonds_yield_zero() {
		for days in [-400, -1, 0] {
			assert_eq!(bond(days, Some(182)).approximate_yield(today()), 0.0);
		}
	}

	#[test]
	fn test_coupons_remaining_ceiling() {
		assert_eq!(bond(182, Some(182)).coupons_remaining(today()), 1);
		assert_eq!(bond(183, Some(182)).coupons_remaining(today()), 2);
		assert_eq!(bond(1, Some(182)).coupons_remaining(today()), 1);
		assert_eq!(bond(0, Some(182)).coupons_remaining(today()), 0);
	}

	#[test]
	fn test_coupons_remaining_monotonic() {
		for period in [1, 30, 91, 182, 365] {
			let mut previous = i64::MIN;
			for days in -400..1200 {
				let n = bond(days, Some(period)).coupons_remaining(today());
				assert!(n >= previous, "period {} days {}", period, days);
				previous = n;
			}
		}
	}

	#[test]
	fn test_no_coupon_sentinel() {
		let b = bond(500, None);
		assert_eq!(b.coupons_remaining(today()), 0);
		assert_eq!(bond(500, Some(0)).coupon_period_days, None);
	}

	#[test]
	fn test_missing_price_is_infinitely_expensive() {
		let mut b = bond(365, Some(182));
		b.market_price_percent = None;
		assert!(b.broker_price().is_infinite());
		assert_relative_eq!(b.approximate_yield(today()), -100.0);
		assert_eq!(
			Instrument::new("X", "X", 1.0, 0.0, None, today(), Some(0.0), 0.0, "SUR")
				.market_price_percent,
			None
		);
	}

	#[test]
	fn test_from_row() {
		let row = raw(json!([
			"RU000A0JX0J2", "OFZ 26240", 1000, "36,9", 182,
			"2030-07-30", 98.5, 12.1, "SUR"
		]));
		let b = Instrument::from_row(&row, &index()).unwrap();
		assert_eq!(b.isin(), "RU000A0JX0J2");
		assert_eq!(b.name, "OFZ 26240");
		assert_eq!(b.coupon_value, 36.9);
		assert_eq!(b.coupon_period_days, Some(182));
		assert_eq!(b.maturity_date, NaiveDate::from_ymd_opt(2030, 7, 30).unwrap());
		assert_eq!(b.market_price_percent, Some(98.5));
		assert_eq!(b.credit_rating(), None);
	}

	#[test]
	fn test_from_row_nulls_use_sentinels() {
		let row = raw(json!([
			"RU000A0JX0J2", "OFZ", null, null, null, "2030-07-30", null, null, "SUR"
		]));
		let b = Instrument::from_row(&row, &index()).unwrap();
		assert_eq!(b.face_value, 0.0);
		assert_eq!(b.coupon_period_days, None);
		assert_eq!(b.market_price_percent, None);
		assert_eq!(b.accrued_interest, 0.0);
	}

	#[test]
	fn test_from_row_rejects_bad_cells() {
		let bad_date = raw(json!([
			"A", "A", 1000, 1, 182, "0000-00-00", 99, 0, "SUR"
		]));
		assert!(matches!(
			Instrument::from_row(&bad_date, &index()),
			Err(RowError::BadDate { column: "MATDATE", .. })
		));

		let no_date = raw(json!(["A", "A", 1000, 1, 182, null, 99, 0, "SUR"]));
		assert!(matches!(
			Instrument::from_row(&no_date, &index()),
			Err(RowError::NotText { column: "MATDATE", .. })
		));

		let bad_number = raw(json!([
			"A", "A", "lots", 1, 182, "2030-01-01", 99, 0, "SUR"
		]));
		assert!(matches!(
			Instrument::from_row(&bad_number, &index()),
			Err(RowError::NotANumber { column: "FACEVALUE", .. })
		));
	}

	#[test]
	fn test_report_row_defaults_rating() {
		let mut b = bond(365, Some(182));
		assert_eq!(b.report_row(today()).rating, UNKNOWN_RATING);
		b.set_credit_rating("AA+(RU)".to_string());
		let row = b.report_row(today());
		assert_eq!(row.rating, "AA+(RU)");
		assert_eq!(row.days_to_maturity, 365);
		assert_eq!(row.broker_price, 987.46);
	}
}
