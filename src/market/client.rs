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
use crate::bond::instrument::Instrument;
use crate::config::config_file::Market;
use crate::market::http::{Client, Pacer};
use crate::market::models::{
	ColumnIndex, RawRow, SecuritiesHolder, SecuritiesParams,
};
use std::time::Duration;
use tracing::{debug, info, warn};

const MOEX_API_URL: &str = "https://iss.moex.com/iss/engines/stock/markets/bonds";

/// Board groups queried when the config names none.
pub const BOARD_GROUPS: [u32; 3] = [7, 58, 105];

/// The exchange allows 50 requests per minute.
pub const REQUESTS_PER_MINUTE: u32 = 50;

/// Anything that can produce the full list of instruments for one run.
pub trait InstrumentSource {
	fn fetch_all(&mut self) -> Vec<Instrument>;
}

/// Reads bonds from the exchange's public market-data API, one request per
/// board group, keeping request pacing across every group it queries.
pub struct MarketDataClient {
	http: Client,
	board_groups: Vec<u32>,
}

impl MarketDataClient {
	pub fn new(config: Market) -> Self {
		let api_url = config.api_url.unwrap_or(MOEX_API_URL.to_owned());
		let per_minute =
			config.requests_per_minute.unwrap_or(REQUESTS_PER_MINUTE);

		MarketDataClient {
			http: Client::new(
				&api_url,
				Pacer::per_window(per_minute, Duration::from_secs(60)),
			),
			board_groups: config
				.board_groups
				.unwrap_or(BOARD_GROUPS.to_vec()),
		}
	}

	pub fn board_groups(&self) -> &[u32] {
		&self.board_groups
	}

	/// All parseable bonds of one board group. Transport and decoding
	/// failures degrade to an empty list; bad rows are skipped.
	pub fn fetch_segment(&mut self, board_group: u32) -> Vec<Instrument> {
		info!("requesting board group {}", board_group);
		let (index, rows) = match self.fetch_rows(board_group) {
			Some(found) => found,
			None => return Vec::new(),
		};
		info!("board group {} lists {} securities", board_group, rows.len());

		let total = rows.len();
		let mut bonds = Vec::with_capacity(total);
		for (i, row) in rows.into_iter().enumerate() {
			debug!("processing {}/{} - {}", i + 1, total, row.isin);
			match Instrument::from_row(&row, &index) {
				Ok(bond) => bonds.push(bond),
				Err(e) => warn!(
					"skipping {}: {}; row data: {:?}",
					row.isin, e, row.cells
				),
			}
		}

		bonds
	}

	fn fetch_rows(&mut self, board_group: u32) -> Option<(ColumnIndex, Vec<RawRow>)> {
		let endpoint = format!("boardgroups/{}/securities.json", board_group);
		let holder: SecuritiesHolder =
			match self.http.get(&endpoint, Some(SecuritiesParams::default())) {
				Ok(holder) => holder,
				Err(e) => {
					warn!("board group {} request failed: {}", board_group, e);
					return None;
				},
			};

		let Some(section) = holder.securities else {
			warn!("board group {} response has no securities", board_group);
			return None;
		};

		match ColumnIndex::resolve(&section.columns) {
			Ok(index) => {
				let rows = section.rows(&index);
				Some((index, rows))
			},
			Err(missing) => {
				warn!(
					"board group {} response lacks column {}",
					board_group, missing
				);
				None
			},
		}
	}
}

impl InstrumentSource for MarketDataClient {
	fn fetch_all(&mut self) -> Vec<Instrument> {
		let groups = self.board_groups.clone();
		let mut bonds = Vec::new();
		for group in groups {
			bonds.extend(self.fetch_segment(group));
		}
		info!("fetched {} bonds in total", bonds.len());
		bonds
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::market::models::COLUMNS;
	use serde_json::json;
	use std::time::Instant;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn unreachable(groups: Vec<u32>) -> MarketDataClient {
		MarketDataClient::new(Market {
			api_url: Some("http://127.0.0.1:9/iss".to_string()),
			board_groups: Some(groups),
			requests_per_minute: Some(6000),
		})
	}

	#[test]
	fn test_defaults() {
		let client = MarketDataClient::new(Market::default());
		assert_eq!(client.board_groups(), &[7, 58, 105]);
	}

	#[test]
	fn test_transport_error_yields_empty_segment() {
		let mut client = unreachable(vec![7]);
		assert!(client.fetch_segment(7).is_empty());
	}

	#[test]
	fn test_fetch_all_tolerates_every_segment_failing() {
		let mut client = unreachable(vec![7, 58]);
		assert!(client.fetch_all().is_empty());
	}

	#[test]
	fn test_segments_share_one_rate_limit_clock() {
		// 200 per minute leaves 300ms between requests
		let mut client = MarketDataClient::new(Market {
			api_url: Some("http://127.0.0.1:9/iss".to_string()),
			board_groups: Some(vec![7, 58, 105]),
			requests_per_minute: Some(200),
		});

		let start = Instant::now();
		client.fetch_all();
		assert!(start.elapsed() >= Duration::from_millis(600));
	}

	async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
		Mock::given(method("GET"))
			.and(path(route))
			.respond_with(response)
			.mount(server)
			.await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_failed_segment_does_not_hide_others() {
		let body = json!({
			"securities": {
				"columns": COLUMNS,
				"data": [
					["RU000A0JX0J2", "OFZ", 1000, 30, 182, "2031-01-01", 97.5, 3.2, "SUR"],
					["BROKEN", "Broken", 1000, 30, 182, "never", 97.5, 3.2, "SUR"],
					["RU000A1038V6", "Corp", "1000", "45,5", 91, "2029-06-15", null, 0, "SUR"]
				]
			}
		});
		let server = MockServer::start().await;
		mount(&server, "/iss/boardgroups/7/securities.json", ResponseTemplate::new(500)).await;
		mount(
			&server,
			"/iss/boardgroups/58/securities.json",
			ResponseTemplate::new(200).set_body_json(body),
		)
		.await;
		mount(
			&server,
			"/iss/boardgroups/105/securities.json",
			ResponseTemplate::new(200).set_body_string("not json"),
		)
		.await;
		mount(
			&server,
			"/iss/boardgroups/106/securities.json",
			ResponseTemplate::new(200).set_body_string("{}"),
		)
		.await;

		let api_url = format!("{}/iss", server.uri());
		let bonds = tokio::task::spawn_blocking(move || {
			let mut client = MarketDataClient::new(Market {
				api_url: Some(api_url),
				board_groups: Some(vec![7, 58, 105, 106]),
				requests_per_minute: Some(6000),
			});
			client.fetch_all()
		})
		.await
		.unwrap();

		let isins: Vec<&str> = bonds.iter().map(|b| b.isin()).collect();
		assert_eq!(isins, vec!["RU000A0JX0J2", "RU000A1038V6"]);
		assert_eq!(bonds[1].coupon_value, 45.5);
		assert_eq!(bonds[1].market_price_percent, None);
	}
}
