use anyhow::{bail, Context};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pulse_engine::{require_forecast, AnalyticsEngine, EngineConfig, KpiCollector, MemoryKpiSink};
use pulse_facts::{
    DateRange, Granularity, Metric, MemoryFactSource, StaticWorkforce, TicketFact, WorkforceCapacity,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let days = |default: &'static str| {
        Arg::new("days")
            .long("days")
            .default_value(default)
            .value_parser(value_parser!(u32))
            .help("Length of the window in days")
    };

    Command::new("helpdesk-pulse")
        .version(pulse_engine::VERSION)
        .about("Predictive operations analytics for IT helpdesks")
        .subcommand_required(true)
        .arg(
            Arg::new("facts")
                .long("facts")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON file holding an array of ticket facts"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML engine configuration"),
        )
        .arg(
            Arg::new("technicians")
                .long("technicians")
                .global(true)
                .default_value("5")
                .value_parser(value_parser!(u32))
                .help("Active technicians reported by the workforce provider"),
        )
        .arg(
            Arg::new("utilization")
                .long("utilization")
                .global(true)
                .default_value("75")
                .value_parser(value_parser!(f64))
                .help("Average technician utilization, percent"),
        )
        .arg(
            Arg::new("team")
                .long("team")
                .global(true)
                .action(ArgAction::Append)
                .help("Team membership as NAME=tech1,tech2 (repeatable)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("dashboard")
                .about("Composite dashboard for a trailing window")
                .arg(days("30")),
        )
        .subcommand(
            Command::new("team")
                .about("Per-technician performance")
                .arg(Arg::new("name").long("name").help("Team to report on"))
                .arg(days("30")),
        )
        .subcommand(
            Command::new("trend")
                .about("Trend, seasonality and forecast for one metric")
                .arg(Arg::new("metric").long("metric").default_value("ticket_volume"))
                .arg(Arg::new("granularity").long("granularity").default_value("daily"))
                .arg(days("90"))
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Fail when no forecast can be produced"),
                ),
        )
        .subcommand(
            Command::new("bottlenecks")
                .about("Technician, category, customer and process bottlenecks")
                .arg(days("30")),
        )
        .subcommand(
            Command::new("capacity")
                .about("Staffing forecast for the coming days")
                .arg(days("7")),
        )
        .subcommand(Command::new("kpi").about("Collect one KPI snapshot"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_facts(matches: &ArgMatches) -> anyhow::Result<Vec<TicketFact>> {
    let Some(path) = matches.get_one::<PathBuf>("facts") else {
        tracing::warn!("no --facts given, running over an empty fact set");
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let facts: Vec<TicketFact> =
        serde_json::from_str(&text).with_context(|| format!("parsing facts in {}", path.display()))?;
    tracing::info!("loaded {} ticket facts from {}", facts.len(), path.display());
    Ok(facts)
}

fn workforce(matches: &ArgMatches) -> anyhow::Result<StaticWorkforce> {
    let technicians = matches.get_one::<u32>("technicians").copied().unwrap_or(5);
    let utilization = matches.get_one::<f64>("utilization").copied().unwrap_or(75.0);
    let mut workforce = StaticWorkforce::new(WorkforceCapacity::new(technicians, utilization));
    for entry in matches.get_many::<String>("team").into_iter().flatten() {
        let Some((name, members)) = entry.split_once('=') else {
            bail!("team must be NAME=tech1,tech2, got '{entry}'");
        };
        workforce = workforce.with_team(name, members.split(',').map(str::trim).filter(|m| !m.is_empty()));
    }
    Ok(workforce)
}

fn build_engine(matches: &ArgMatches) -> anyhow::Result<AnalyticsEngine> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = AnalyticsEngine::builder(
        Arc::new(MemoryFactSource::new(load_facts(matches)?)),
        Arc::new(workforce(matches)?),
    )
    .config(config)
    .build()?;
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn days(args: &ArgMatches) -> u32 {
    args.get_one::<u32>("days").copied().unwrap_or(30)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let engine = build_engine(matches)?;
    let now = Utc::now();

    match matches.subcommand() {
        Some(("dashboard", args)) => {
            let period = DateRange::hour_aligned_trailing(now, days(args));
            print_json(&engine.dashboard_metrics(Some(period)).await?)
        }
        Some(("team", args)) => {
            let period = DateRange::trailing_days(now, days(args));
            let team = args.get_one::<String>("name").map(String::as_str);
            print_json(&engine.team_performance(period, team).await?)
        }
        Some(("trend", args)) => {
            let metric: Metric = args
                .get_one::<String>("metric")
                .map_or("ticket_volume", String::as_str)
                .parse()?;
            let granularity: Granularity = args
                .get_one::<String>("granularity")
                .map_or("daily", String::as_str)
                .parse()?;
            let period = DateRange::trailing_days(now, days(args));
            let trend = engine.trend_analysis(metric, period, granularity).await?;
            if args.get_flag("strict") {
                require_forecast(&trend)?;
            }
            print_json(&trend)
        }
        Some(("bottlenecks", args)) => {
            let period = DateRange::trailing_days(now, days(args));
            print_json(&engine.detect_bottlenecks(period).await?)
        }
        Some(("capacity", args)) => {
            let period = DateRange::following_days(now, days(args));
            print_json(&engine.capacity_prediction(period).await?)
        }
        Some(("kpi", _)) => {
            let sink = Arc::new(MemoryKpiSink::new());
            let collector: KpiCollector = engine.kpi_collector(sink);
            print_json(&collector.collect_once().await?)
        }
        _ => bail!("unknown command"),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    if let Err(e) = run(&matches).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn team_flags_build_membership() {
        let matches = cli()
            .try_get_matches_from(["helpdesk-pulse", "--team", "network=ana, bo", "team", "--name", "network"])
            .unwrap();
        assert!(workforce(&matches).is_ok());

        let matches = cli()
            .try_get_matches_from(["helpdesk-pulse", "--team", "network", "dashboard"])
            .unwrap();
        assert!(workforce(&matches).is_err());
    }

    #[test]
    fn missing_facts_file_is_an_error() {
        let matches = cli()
            .try_get_matches_from(["helpdesk-pulse", "--facts", "/nonexistent/facts.json", "dashboard"])
            .unwrap();
        assert!(load_facts(&matches).is_err());
    }
}
