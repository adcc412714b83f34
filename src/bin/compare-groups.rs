//! A binary for resolving and comparing groups of observations from the
//! command line.
//!
//! ```shell
//! cargo run --release --bin=compare-groups --features=binaries -- \
//!     --sets obs-sets.json.gz --matrix matrix.json \
//!     deg --group "Leiden/1" --group "My Selections/Selection 1"
//! ```
//!
//! Groups whose names contain a `/` can be given as a JSON array of names
//! instead, such as `--group '["Selections", "CD4/CD8"]'`.
//!
//! The analysis service is reached at `--service-url` (or the
//! `CELLSETS_SERVICE_URL` environment variable).

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use cellsets::Path;
use cellsets::Session;
use cellsets::SetTree;
use cellsets::analysis::Config;
use cellsets::analysis::HttpService;
use cellsets::analysis::config::DEFAULT_BASE_URL;
use cellsets::coordinator::Rendered;
use cellsets::matrix::ObsFeatureMatrix;
use cellsets::matrix::ObsLocations;
use cellsets::session::Dataset;
use cellsets::session::SetOperation;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

/// The number of identifiers previewed for each resolved group.
const PREVIEW: usize = 5;

////////////////////////////////////////////////////////////////////////////////////////
// Inputs
////////////////////////////////////////////////////////////////////////////////////////

/// Reads a JSON document, decompressing it first if its name ends in `.gz`.
fn read_json<T: DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let reader: Box<dyn Read> = match path.extension().is_some_and(|ext| ext == "gz") {
        true => Box::new(GzDecoder::new(file)),
        false => Box::new(file),
    };

    serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Loads the dataset named on the command line.
fn load_dataset(args: &Args) -> Result<Dataset> {
    let obs_sets: SetTree = read_json(&args.sets)?;
    info!("loaded {} canonical root(s)", obs_sets.roots().len());

    let mut dataset = Dataset::new(obs_sets);

    if let Some(path) = &args.matrix {
        let matrix: ObsFeatureMatrix = read_json(path)?;
        info!(
            "loaded a {} x {} matrix",
            matrix.obs_index().len(),
            matrix.feature_index().len()
        );
        dataset = dataset.with_matrix(matrix);
    }

    if let Some(path) = &args.locations {
        let locations: ObsLocations = read_json(path)?;
        info!("loaded {} centroid(s)", locations.obs_index().len());
        dataset = dataset.with_locations(locations);
    }

    Ok(dataset)
}

/// Parses a group given on the command line.
///
/// A value starting with `[` is read as a JSON array of node names, which
/// allows names that contain a `/`. Anything else is a `/`-separated path.
fn parse_group(s: &str) -> Result<Path> {
    if s.trim_start().starts_with('[') {
        let segments: Vec<String> =
            serde_json::from_str(s).with_context(|| format!("parsing group `{s}`"))?;
        return Path::try_from(segments).with_context(|| format!("parsing group `{s}`"));
    }

    Path::from_str(s).with_context(|| format!("parsing group `{s}`"))
}

////////////////////////////////////////////////////////////////////////////////////////
// Output
////////////////////////////////////////////////////////////////////////////////////////

/// Prints a table whose first row is a header.
fn print_table(builder: Builder) {
    let table = builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string();

    println!("{}", table);
}

/// Formats a preview of the first few identifiers.
fn preview(ids: &[String]) -> String {
    let mut result = ids.iter().take(PREVIEW).cloned().collect::<Vec<_>>().join(", ");

    if ids.len() > PREVIEW {
        result.push_str(", ...");
    }

    result
}

////////////////////////////////////////////////////////////////////////////////////////
// Commands
////////////////////////////////////////////////////////////////////////////////////////

/// A set operation over the groups.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Operation {
    /// Observations in any group.
    Union,

    /// Observations in every group.
    Intersection,

    /// Canonical observations in no group.
    Complement,
}

impl From<Operation> for SetOperation {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Union => SetOperation::Union,
            Operation::Intersection => SetOperation::Intersection,
            Operation::Complement => SetOperation::Complement,
        }
    }
}

/// A command.
#[derive(Subcommand)]
enum Command {
    /// Resolves each group to the observations it contains.
    Resolve {
        /// The groups, as `/`-separated paths or JSON arrays of names.
        #[arg(short, long = "group", required = true, value_parser = parse_group)]
        groups: Vec<Path>,
    },

    /// Combines the groups with a set operation.
    Combine {
        /// The operation.
        #[arg(short, long, value_enum)]
        operation: Operation,

        /// The groups, as `/`-separated paths or JSON arrays of names.
        #[arg(short, long = "group", required = true, value_parser = parse_group)]
        groups: Vec<Path>,
    },

    /// Compares the expression of exactly two groups.
    Deg {
        /// The groups, as `/`-separated paths or JSON arrays of names.
        #[arg(short, long = "group", required = true, value_parser = parse_group)]
        groups: Vec<Path>,

        /// Features to mark as highlighted.
        #[arg(long = "highlight")]
        highlighted: Vec<String>,
    },

    /// Scores the spatial interactions between two or more groups.
    Interaction {
        /// The groups, as `/`-separated paths or JSON arrays of names.
        #[arg(short, long = "group", required = true, value_parser = parse_group)]
        groups: Vec<Path>,
    },
}

/// Resolves and compares groups of observations.
#[derive(Parser)]
struct Args {
    /// The canonical set tree (JSON, optionally gzipped).
    #[arg(long)]
    sets: PathBuf,

    /// A user-defined set tree saved from an earlier session.
    #[arg(long)]
    user_sets: Option<PathBuf>,

    /// The observation by feature matrix (JSON, optionally gzipped).
    #[arg(long)]
    matrix: Option<PathBuf>,

    /// The observation centroids (JSON, optionally gzipped).
    #[arg(long)]
    locations: Option<PathBuf>,

    /// The base URL of the analysis service.
    #[arg(long, env = "CELLSETS_SERVICE_URL", default_value = DEFAULT_BASE_URL)]
    service_url: String,

    /// The connection timeout in seconds.
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// The request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

/// Resolves each group and prints a summary.
fn resolve(session: &Session<HttpService>, groups: &[Path]) {
    let mut builder = Builder::default();
    builder.push_record(["Group", "Observations", "Preview"]);

    for group in groups {
        let ids = session.resolve(group);
        builder.push_record([group.to_string(), ids.len().to_string(), preview(&ids)]);
    }

    print_table(builder);
}

/// Combines the groups and prints the result.
fn combine(session: &mut Session<HttpService>, operation: Operation, groups: Vec<Path>) {
    session.check(groups);
    let ids = session.apply(operation.into());

    let mut builder = Builder::default();
    builder.push_record(["Operation", "Observations", "Preview"]);
    builder.push_record([
        format!("{operation:?}").to_lowercase(),
        ids.len().to_string(),
        preview(&ids),
    ]);

    print_table(builder);
}

/// Compares two groups and prints the volcano plot data.
async fn deg(
    session: &mut Session<HttpService>,
    groups: Vec<Path>,
    highlighted: Vec<String>,
) -> Result<()> {
    if groups.len() != 2 {
        bail!("a comparison needs exactly two groups, found {}", groups.len());
    }

    session.set_feature_selection(highlighted, None);
    session.select(groups);

    let volcano = match session.refresh_deg().await {
        Rendered::Ready(volcano) => volcano,
        Rendered::NoData => {
            warn!("the comparison returned no data");
            return Ok(());
        }
        _ => bail!("both groups must have at least one row in the matrix"),
    };

    info!(
        "comparing `{}` against `{}`",
        volcano.groups[0], volcano.groups[1]
    );

    let mut builder = Builder::default();
    builder.push_record([
        "Feature",
        "log2 FC",
        "p-value",
        "-log10 p",
        "Regulation",
        "Highlighted",
    ]);

    for point in &volcano.points {
        builder.push_record([
            point.record.feature.clone(),
            format!("{:.3}", point.record.log2_fold_change),
            format!("{:.3e}", point.record.p_value),
            format!("{:.3}", point.record.neg_log_p_value),
            point.regulation.to_string(),
            point.is_highlighted.to_string(),
        ]);
    }

    print_table(builder);
    Ok(())
}

/// Scores the interactions between groups and prints the heatmap data.
async fn interaction(session: &mut Session<HttpService>, groups: Vec<Path>) -> Result<()> {
    session.select(groups);

    let heatmap = match session.refresh_interaction().await {
        Rendered::Ready(heatmap) => heatmap,
        Rendered::NoData => {
            warn!("the interaction scoring returned no data");
            return Ok(());
        }
        _ => bail!("at least two groups must have located observations"),
    };

    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once(String::new()).chain(heatmap.rows.iter().map(|row| row.id.clone())),
    );

    for row in &heatmap.rows {
        builder.push_record(
            std::iter::once(row.id.clone())
                .chain(row.data.iter().map(|cell| format!("{:.3}", cell.y))),
        );
    }

    print_table(builder);
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

/// Loads the dataset and runs the requested command.
async fn run(args: Args) -> Result<()> {
    let config = Config::default()
        .with_base_url(args.service_url.clone())
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_request_timeout(Duration::from_secs(args.request_timeout));

    let service = HttpService::try_new(config).context("creating the analysis client")?;
    let dataset = load_dataset(&args)?;
    let mut session = Session::new(service, dataset);

    if let Some(path) = &args.user_sets {
        let user: SetTree = read_json(path)?;
        session.restore(user);
    }

    match args.command {
        Command::Resolve { groups } => resolve(&session, &groups),
        Command::Combine { operation, groups } => combine(&mut session, operation, groups),
        Command::Deg {
            groups,
            highlighted,
        } => deg(&mut session, groups, highlighted).await?,
        Command::Interaction { groups } => interaction(&mut session, groups).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    run(args).await
}
