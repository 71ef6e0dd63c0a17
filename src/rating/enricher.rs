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
use crate::bond::instrument::{Instrument, UNKNOWN_RATING};
use anyhow::{anyhow, bail, Error};
use scraper::{ElementRef, Html, Node};
use tracing::{info, warn};

const RATING_SITE_URL: &str = "https://smart-lab.ru/q/bonds";

/// Default label. The Russian pages of the default site read
/// "Кредитный рейтинг" and need `rating.marker` set to match.
pub const RATING_MARKER: &str = "Credit rating";

// elements whose text is never page content
const SKIPPED: [&str; 4] = ["head", "script", "style", "title"];

/// Anything that can attach credit ratings to a batch of instruments.
/// Implementations never fail the batch; unknown ratings get the sentinel.
pub trait RatingSource {
	fn enrich(&self, instruments: &mut [Instrument]);
}

impl<T: RatingSource + ?Sized> RatingSource for Box<T> {
	fn enrich(&self, instruments: &mut [Instrument]) {
		(**self).enrich(instruments)
	}
}

/// Scrapes issuer credit ratings from a bond information site, one page per
/// ISIN. Requests are not paced and never retried.
pub struct RatingEnricher {
	client: reqwest::blocking::Client,
	base_url: String,
	marker: String,
}

impl RatingEnricher {
	pub fn new(base_url: Option<String>, marker: Option<String>) -> Self {
		RatingEnricher {
			client: reqwest::blocking::Client::new(),
			base_url: base_url
				.unwrap_or(RATING_SITE_URL.to_owned())
				.trim_end_matches('/')
				.to_string(),
			marker: marker.unwrap_or(RATING_MARKER.to_owned()),
		}
	}

	/// Fetches and parses the rating for one ISIN.
	pub fn lookup(&self, isin: &str) -> Result<String, Error> {
		let url = format!("{}/{}", self.base_url, isin);
		info!("fetching credit rating for {}", isin);

		let response = self.client.get(&url).send()?;
		if !response.status().is_success() {
			bail!("request failed with status: {}", response.status());
		}

		let body = response.text()?;
		parse_rating(&body, &self.marker)
			.ok_or_else(|| anyhow!("no {:?} section on {}", self.marker, url))
	}
}

impl RatingSource for RatingEnricher {
	fn enrich(&self, instruments: &mut [Instrument]) {
		for instrument in instruments.iter_mut() {
			let rating = match self.lookup(instrument.isin()) {
				Ok(rating) => {
					info!("credit rating for {} is {}", instrument.isin(), rating);
					rating
				},
				Err(e) => {
					warn!("credit rating for {} unknown: {}", instrument.isin(), e);
					UNKNOWN_RATING.to_string()
				},
			};
			instrument.set_credit_rating(rating);
		}
	}
}

/// Leaves every rating as the unknown sentinel without touching the network.
pub struct NoRatings;

impl RatingSource for NoRatings {
	fn enrich(&self, instruments: &mut [Instrument]) {
		for instrument in instruments.iter_mut() {
			instrument.set_credit_rating(UNKNOWN_RATING.to_string());
		}
	}
}

/// Finds the first label element whose own text is `marker` and returns the
/// whitespace-normalized text of the element following it.
pub fn parse_rating(html: &str, marker: &str) -> Option<String> {
	let doc = Html::parse_document(html);
	let marker = normalize(marker);

	let label = doc
		.root_element()
		.descendants()
		.filter_map(ElementRef::wrap)
		.filter(|el| !SKIPPED.contains(&el.value().name()))
		.find(|el| normalize(&own_text(el)) == marker)?;

	let value = label
		.next_siblings()
		.find_map(ElementRef::wrap)?
		.text()
		.collect::<String>();

	let value = normalize(&value);
	if value.is_empty() {
		None
	} else {
		Some(value)
	}
}

fn normalize(s: &str) -> String {
	s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn own_text(el: &ElementRef) -> String {
	el.children()
		.filter_map(|child| match child.value() {
			Node::Text(text) => Some(&**text),
			_ => None,
		})
		.collect::<String>()
}
