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
use crate::bond::instrument::{Instrument, BROKER_FEE};
use anyhow::{bail, Error};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// What the user is looking for. Yield thresholds are in the same gross
/// basis as `Instrument::approximate_yield`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
	pub min_yield: f64,
	pub min_days_to_maturity: f64,
	pub max_days_to_maturity: f64,
	/// `None` accepts every face unit.
	pub allowed_face_units: Option<BTreeSet<String>>,
}

impl Default for SearchCriteria {
	fn default() -> Self {
		SearchCriteria {
			min_yield: 0.0,
			min_days_to_maturity: 1.0,
			max_days_to_maturity: f64::INFINITY,
			allowed_face_units: None,
		}
	}
}

impl SearchCriteria {
	/// Converts a yield the user wants to keep after broker costs into the
	/// gross threshold the filter compares against.
	pub fn gross_yield(net_yield: f64) -> f64 {
		net_yield / (1.0 - BROKER_FEE)
	}

	pub fn validate(&self) -> Result<(), Error> {
		for (name, value) in [
			("minimum yield", self.min_yield),
			("minimum days to maturity", self.min_days_to_maturity),
			("maximum days to maturity", self.max_days_to_maturity),
		] {
			if value.is_nan() || value < 0.0 {
				bail!("{} must be a non-negative number", name);
			}
		}

		if self.min_days_to_maturity > self.max_days_to_maturity {
			bail!(
				"minimum days to maturity ({}) exceeds maximum ({})",
				self.min_days_to_maturity,
				self.max_days_to_maturity
			);
		}

		if let Some(units) = &self.allowed_face_units {
			if units.is_empty() {
				bail!("face unit list is empty; omit it to accept any unit");
			}
		}

		Ok(())
	}

	/// Every clause the instrument fails, in evaluation order.
	pub fn rejections(
		&self,
		instrument: &Instrument,
		today: NaiveDate,
	) -> Vec<Clause> {
		let days = instrument.days_to_maturity(today) as f64;
		let mut failed = Vec::new();

		if self.min_days_to_maturity > days {
			failed.push(Clause::MinDays);
		}
		if days > self.max_days_to_maturity {
			failed.push(Clause::MaxDays);
		}
		// written so that a NaN yield fails
		if !(self.min_yield <= instrument.approximate_yield(today)) {
			failed.push(Clause::MinYield);
		}
		if let Some(units) = &self.allowed_face_units {
			if !units.contains(&instrument.face_unit) {
				failed.push(Clause::FaceUnit);
			}
		}

		failed
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
	MinDays,
	MaxDays,
	MinYield,
	FaceUnit,
}

impl fmt::Display for Clause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Clause::MinDays => "matures too soon",
			Clause::MaxDays => "matures too late",
			Clause::MinYield => "yield below minimum",
			Clause::FaceUnit => "face unit not allowed",
		};
		write!(f, "{}", s)
	}
}

/// Keeps the instruments matching every criterion, in their original order.
pub fn apply(
	instruments: Vec<Instrument>,
	criteria: &SearchCriteria,
	today: NaiveDate,
) -> Vec<Instrument> {
	instruments
		.into_iter()
		.filter(|instrument| {
			let failed = criteria.rejections(instrument, today);
			for clause in &failed {
				debug!("{} rejected: {}", instrument.isin(), clause);
			}
			if failed.is_empty() {
				debug!("{} passed all criteria", instrument.isin());
			}
			failed.is_empty()
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
	}

	fn bond(isin: &str, days: i64, price: f64, unit: &str) -> Instrument {
		Instrument::new(
			isin,
			isin,
			1000.0,
			30.0,
			Some(91),
			today() + Duration::days(days),
			Some(price),
			0.0,
			unit,
		)
	}

	fn isins(bonds: &[Instrument]) -> Vec<&str> {
		bonds.iter().map(|b| b.isin()).collect()
	}

	fn sur_only() -> SearchCriteria {
		SearchCriteria {
			min_yield: 10.0,
			min_days_to_maturity: 30.0,
			max_days_to_maturity: 730.0,
			allowed_face_units: Some(BTreeSet::from(["SUR".to_string()])),
		}
	}

	fn mixed() -> Vec<Instrument> {
		vec![
			bond("GOOD1", 365, 95.0, "SUR"),
			bond("CHEAPUSD", 365, 95.0, "USD"),
			bond("SOON", 10, 95.0, "SUR"),
			bond("LATE", 1000, 80.0, "SUR"),
			bond("PRICEY", 365, 110.0, "SUR"),
			bond("GOOD2", 200, 97.0, "SUR"),
			bond("MATURED", -5, 50.0, "SUR"),
		]
	}

	#[test]
	fn test_mixed_scenario() {
		let criteria = sur_only();
		let kept = apply(mixed(), &criteria, today());
		assert_eq!(isins(&kept), vec!["GOOD1", "GOOD2"]);

		for b in &kept {
			assert!(b.approximate_yield(today()) >= 10.0);
			let days = b.days_to_maturity(today());
			assert!((30..=730).contains(&days));
			assert_eq!(b.face_unit, "SUR");
		}
	}

	#[test]
	fn test_idempotent() {
		let criteria = sur_only();
		let once = apply(mixed(), &criteria, today());
		let twice = apply(once.clone(), &criteria, today());
		assert_eq!(once, twice);
	}

	#[test]
	fn test_preserves_order() {
		let criteria = SearchCriteria::default();
		let input = mixed();
		let kept = apply(input.clone(), &criteria, today());

		let positions: Vec<usize> = kept
			.iter()
			.map(|k| input.iter().position(|b| b.isin() == k.isin()).unwrap())
			.collect();
		assert!(positions.windows(2).all(|w| w[0] < w[1]));
	}

	#[test]
	fn test_default_accepts_any_unit() {
		let kept = apply(mixed(), &SearchCriteria::default(), today());
		assert!(kept.iter().any(|b| b.face_unit == "USD"));
		// default minimum of one day drops the matured bond
		assert!(!kept.iter().any(|b| b.isin() == "MATURED"));
	}

	#[test]
	fn test_rejections_name_each_clause() {
		let criteria = sur_only();
		let b = bond("BAD", 1000, 120.0, "EUR");
		assert_eq!(
			criteria.rejections(&b, today()),
			vec![Clause::MaxDays, Clause::MinYield, Clause::FaceUnit]
		);
		let soon = bond("SOON", 5, 95.0, "SUR");
		assert_eq!(criteria.rejections(&soon, today())[0], Clause::MinDays);
	}

	#[test]
	fn test_boundaries_inclusive() {
		let criteria = SearchCriteria {
			min_yield: 0.0,
			min_days_to_maturity: 30.0,
			max_days_to_maturity: 730.0,
			allowed_face_units: None,
		};
		let edge = vec![bond("LOW", 30, 90.0, "SUR"), bond("HIGH", 730, 90.0, "SUR")];
		assert_eq!(apply(edge, &criteria, today()).len(), 2);
	}

	#[test]
	fn test_nan_yield_rejected() {
		let mut worthless = bond("ZERO", 365, 95.0, "SUR");
		worthless.face_value = 0.0;
		worthless.coupon_value = 0.0;
		assert!(worthless.approximate_yield(today()).is_nan());
		let kept = apply(vec![worthless], &SearchCriteria::default(), today());
		assert!(kept.is_empty());
	}

	#[test]
	fn test_validate() {
		assert!(SearchCriteria::default().validate().is_ok());
		assert!(sur_only().validate().is_ok());

		let mut c = SearchCriteria::default();
		c.min_yield = -1.0;
		assert!(c.validate().is_err());

		let mut c = SearchCriteria::default();
		c.min_days_to_maturity = 100.0;
		c.max_days_to_maturity = 10.0;
		assert!(c.validate().is_err());

		let mut c = SearchCriteria::default();
		c.allowed_face_units = Some(BTreeSet::new());
		assert!(c.validate().is_err());
	}

	#[test]
	fn test_gross_yield() {
		assert!(SearchCriteria::gross_yield(10.0) > 10.0);
		assert_eq!(SearchCriteria::gross_yield(0.0), 0.0);
	}
}
