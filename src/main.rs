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
use crate::bond::criteria::SearchCriteria;
use crate::config::config_file::{Config, Criteria};
use crate::market::client::MarketDataClient;
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::runner::{spawn, Pipeline};
use crate::pipeline::stage::Stage;
use crate::rating::enricher::{NoRatings, RatingEnricher, RatingSource};
use crate::report::table::Table;
use crate::report::writer::CsvReportWriter;
use anyhow::{anyhow, bail, Error};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod bond;
mod config;
mod market;
mod pipeline;
mod rating;
mod report;

#[derive(Parser)]
#[command(
	name = "bondscan",
	version,
	about = "Screens exchange-listed bonds and ranks them by yield"
)]
struct Cli {
	/// Minimum approximate yield in percent, before broker costs
	#[arg(long, conflicts_with = "min_net_yield")]
	min_yield: Option<f64>,

	/// Minimum yield in percent to keep after broker costs
	#[arg(long)]
	min_net_yield: Option<f64>,

	/// Minimum days to maturity (default: 1)
	#[arg(long)]
	min_days: Option<f64>,

	/// Maximum days to maturity; 0 means no limit
	#[arg(long)]
	max_days: Option<f64>,

	/// Accept only this face unit, e.g. SUR; repeat for several
	#[arg(short = 'u', long = "face-unit")]
	face_units: Vec<String>,

	/// Directory the report is written to (default: current directory)
	#[arg(short, long)]
	output: Option<String>,

	/// Custom config file location (default: ~/.config/bondscan/config.toml)
	#[arg(long)]
	config: Option<String>,

	/// Skip credit rating lookups
	#[arg(long)]
	no_ratings: bool,

	/// Print the best N bonds once the report is written
	#[arg(short, long)]
	top: Option<usize>,

	/// Also write log output to this file
	#[arg(long)]
	log_file: Option<String>,

	/// Log debug detail, including why each bond was filtered out
	#[arg(short, long)]
	verbose: bool,
}

impl Cli {
	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		for unit in &self.face_units {
			if unit.trim().is_empty() {
				bail!("face unit may not be blank");
			}
		}

		Ok(())
	}
}

fn main() -> Result<(), Error> {
	let args = Cli::parse();
	args.validate()?;
	init_logging(args.verbose, args.log_file.as_deref())?;

	let config = Config::load(args.config.as_ref())?;
	let criteria =
		search_criteria(&args, config.criteria.unwrap_or_default())?;
	let today = today();
	info!("screening with {:?}", criteria);

	let source = MarketDataClient::new(config.market.unwrap_or_default());
	info!("querying board groups {:?}", source.board_groups());

	let rating = config.rating.unwrap_or_default();
	let ratings: Box<dyn RatingSource + Send> =
		if args.no_ratings || rating.enabled == Some(false) {
			Box::new(NoRatings)
		} else {
			Box::new(RatingEnricher::new(rating.url, rating.marker))
		};

	let directory = args
		.output
		.or(config.report.unwrap_or_default().directory)
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from("."));
	let writer = CsvReportWriter::new(directory, today);

	let running =
		spawn(Pipeline::new(source, ratings, writer, criteria, today))?;

	let mut failure = None;
	for event in running.events.iter() {
		match event {
			PipelineEvent::Progress(percent) => eprintln!("[{:>3}%]", percent),
			PipelineEvent::Completed(path) => println!("{}", path.display()),
			PipelineEvent::Failed(message) => failure = Some(message),
		}
	}

	let finished = running.join();
	if finished.stage != Stage::Done {
		bail!(failure.unwrap_or("pipeline worker stopped unexpectedly".into()));
	}

	if let Some(n) = args.top {
		Table::from_report(&finished.rows, Some(n)).print();
	}

	Ok(())
}

/// Combines flags with the config's standing criteria; flags win.
fn search_criteria(
	args: &Cli,
	standing: Criteria,
) -> Result<SearchCriteria, Error> {
	let defaults = SearchCriteria::default();

	let min_yield = match (args.min_yield, args.min_net_yield) {
		(Some(gross), _) => gross,
		(None, Some(net)) => SearchCriteria::gross_yield(net),
		(None, None) => standing.min_yield.unwrap_or(defaults.min_yield),
	};

	let max_days = args
		.max_days
		.or(standing.max_days)
		.filter(|&d| d != 0.0)
		.unwrap_or(defaults.max_days_to_maturity);

	let face_units = if !args.face_units.is_empty() {
		Some(args.face_units.clone())
	} else {
		standing.face_units
	};

	let criteria = SearchCriteria {
		min_yield,
		min_days_to_maturity: args
			.min_days
			.or(standing.min_days)
			.unwrap_or(defaults.min_days_to_maturity),
		max_days_to_maturity: max_days,
		allowed_face_units: face_units.map(|units| {
			units
				.into_iter()
				.map(|u| u.trim().to_uppercase())
				.collect::<BTreeSet<String>>()
		}),
	};

	criteria
		.validate()
		.map_err(|e| anyhow!("invalid search criteria: {}", e))?;
	Ok(criteria)
}

fn init_logging(verbose: bool, log_file: Option<&str>) -> Result<(), Error> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(if verbose { "bondscan=debug" } else { "bondscan=info" })
	});

	let file_layer = match log_file {
		Some(path) => {
			let file = File::create(path)
				.map_err(|e| anyhow!("cannot open log file {}: {}", path, e))?;
			Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
		},
		None => None,
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(file_layer)
		.init();

	Ok(())
}

fn today() -> NaiveDate {
	Local::now().date_naive()
}
