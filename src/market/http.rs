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
use anyhow::bail;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Keeps consecutive requests at least `min_interval` apart. The clock is
/// owned by whoever owns the pacer, so two clients never share one.
#[derive(Debug)]
pub struct Pacer {
	min_interval: Duration,
	last_request: Option<Instant>,
}

impl Pacer {
	pub fn new(min_interval: Duration) -> Self {
		Pacer {
			min_interval,
			last_request: None,
		}
	}

	/// Interval that allows `requests` calls per `window`.
	pub fn per_window(requests: u32, window: Duration) -> Self {
		Pacer::new(window / requests.max(1))
	}

	/// Time left before the next request may go out.
	pub fn remaining(&self, now: Instant) -> Duration {
		match self.last_request {
			Some(last) => {
				self.min_interval.saturating_sub(now.duration_since(last))
			},
			None => Duration::ZERO,
		}
	}

	/// Blocks the calling thread until the interval has elapsed, then marks
	/// the current instant as the last request.
	pub fn wait(&mut self) {
		let wait = self.remaining(Instant::now());
		if !wait.is_zero() {
			info!("waiting {:.2}s before next request", wait.as_secs_f64());
			thread::sleep(wait);
		}
		self.last_request = Some(Instant::now());
	}
}

pub struct Client {
	client: reqwest::blocking::Client,
	base_url: String,
	pacer: Pacer,
}

impl Client {
	pub fn new(base_url: &str, pacer: Pacer) -> Self {
		Client {
			client: reqwest::blocking::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			pacer,
		}
	}

	/// Sends a paced GET and decodes the JSON body. Errors on transport
	/// failures, non-2xx response codes and undecodable bodies.
	pub fn get<Q, R>(
		&mut self,
		endpoint: &str,
		query_params: Option<Q>,
	) -> Result<R, anyhow::Error>
	where
		Q: Serialize,
		R: for<'de> Deserialize<'de>,
	{
		let url = format!("{}/{}", self.base_url, endpoint);

		let mut request = self.client.request(Method::GET, &url);
		if let Some(query_params) = query_params {
			request = request.query(&query_params);
		}

		self.pacer.wait();
		info!("sending GET to {}", url);
		let response = request.send()?;

		// Handle non-2xx response codes
		if !response.status().is_success() {
			bail!("request failed with status: {}", response.status());
		}

		let response_data: R = response.json()?;
		debug!("decoded response from {}", url);
		Ok(response_data)
	}
}
