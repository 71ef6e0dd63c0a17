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
use anyhow::{anyhow, Error};
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub market: Option<Market>,
	pub rating: Option<Rating>,
	pub report: Option<Report>,
	pub criteria: Option<Criteria>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Market {
	pub api_url: Option<String>,
	/// Exchange board groups to query, in order.
	pub board_groups: Option<Vec<u32>>,
	pub requests_per_minute: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rating {
	/// Set to false to skip rating lookups entirely.
	pub enabled: Option<bool>,
	pub url: Option<String>,
	/// Label of the page element preceding the rating value. Defaults to
	/// "Credit rating"; smart-lab.ru pages use "Кредитный рейтинг".
	pub marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Report {
	pub directory: Option<String>,
}

/// Standing search criteria. Command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Criteria {
	pub min_yield: Option<f64>,
	pub min_days: Option<f64>,
	pub max_days: Option<f64>,
	pub face_units: Option<Vec<String>>,
}

impl Config {
	/// Reads the config from the given path, or the default path if none.
	/// The default file is created empty on first use; a custom path must
	/// exist.
	pub fn load(custom_config_path: Option<&String>) -> Result<Config, Error> {
		let config_path = match &custom_config_path {
			None => home_dir()
				.ok_or_else(|| anyhow!("unable to determine home directory"))?
				.join(".config/bondscan/config.toml"),
			Some(p) => PathBuf::from(p),
		};

		// create empty config file if it doesn't exist
		if !config_path.exists() && custom_config_path.is_none() {
			if let Some(parent) = config_path.parent() {
				fs::create_dir_all(parent)?;
			}
			File::create(config_path.clone())?;
		}

		let content = fs::read_to_string(&config_path).map_err(|e| {
			anyhow!("failed to read config {}: {}", config_path.display(), e)
		})?;
		Config::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Config, Error> {
		toml::from_str(content)
			.map_err(|e| anyhow!("failed to parse config: {}", e))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_config() {
		let config = Config::parse("").unwrap();
		assert!(config.market.is_none());
		assert!(config.rating.is_none());
	}

	#[test]
	fn test_full_config() {
		let config = Config::parse(
			r#"
			[market]
			api_url = "http://localhost:8080/iss"
			board_groups = [7, 58]
			requests_per_minute = 30

			[rating]
			enabled = false
			marker = "Кредитный рейтинг"

			[report]
			directory = "/tmp/reports"

			[criteria]
			min_yield = 12.5
			max_days = 730.0
			face_units = ["SUR"]
			"#,
		)
		.unwrap();

		let market = config.market.unwrap();
		assert_eq!(market.board_groups, Some(vec![7, 58]));
		assert_eq!(market.requests_per_minute, Some(30));
		assert_eq!(config.rating.unwrap().enabled, Some(false));
		assert_eq!(
			config.report.unwrap().directory.as_deref(),
			Some("/tmp/reports")
		);
		let criteria = config.criteria.unwrap();
		assert_eq!(criteria.min_yield, Some(12.5));
		assert_eq!(criteria.max_days, Some(730.0));
		assert_eq!(criteria.min_days, None);
	}

	#[test]
	fn test_unknown_key_rejected() {
		assert!(Config::parse("[market]\nboardgroups = [7]").is_err());
	}

	#[test]
	fn test_missing_custom_path() {
		let path = "/nonexistent/bondscan/config.toml".to_string();
		assert!(Config::load(Some(&path)).is_err());
	}
}
