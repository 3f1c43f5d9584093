use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use eeview::actions::{Confirmation, PendingAction};
use eeview::app::{App, ChartRequest, ProgressSink};
use eeview::chart::{ChartKind, Series, shaper};
use eeview::clipboard::JsonLineBridge;
use eeview::config::{ConfigLoader, ResolvedConfig};
use eeview::domain::{AssetId, AssetKind};
use eeview::earthengine::EarthEngineClient;
use eeview::error::EeError;
use eeview::namespace::{MemoryNamespace, RemoteNamespace};
use eeview::output::{self, JsonOutput, OutputMode, StderrProgress};
use eeview::tasks::{Operation, StaticTasks, TaskClient};
use eeview::tree::AssetTree;
use eeview::tui::{self, Browser};

#[derive(Parser)]
#[command(name = "eeview")]
#[command(about = "Browse Earth Engine assets, follow export tasks and chart reduction results")]
#[command(version, author)]
struct Cli {
    /// Path to an eeview.json config file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    /// Commit destructive actions without asking.
    #[arg(long, global = true)]
    yes: bool,

    /// Use a built-in in-memory namespace instead of the remote API.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Browse and edit the asset tree")]
    Assets(AssetsArgs),
    #[command(about = "List the export tasks of the configured project")]
    Tasks,
    #[command(about = "Render a label -> category -> value JSON series as a figure")]
    Chart(ChartArgs),
    #[command(about = "Open the interactive browser (default)")]
    Browse(BrowseArgs),
}

#[derive(Args)]
struct AssetsArgs {
    #[command(subcommand)]
    command: AssetsCommand,
}

#[derive(Subcommand)]
enum AssetsCommand {
    #[command(about = "List a folder (the project list when omitted)")]
    List { folder: Option<String> },
    #[command(about = "Walk every asset below a folder")]
    Tree {
        folder: Option<String>,
        #[arg(long)]
        depth: Option<usize>,
    },
    #[command(about = "Delete an asset and everything below it")]
    Delete { id: String },
    #[command(about = "Move or rename an asset")]
    Move { id: String, destination: String },
    #[command(about = "Create a folder")]
    Mkdir { parent: String, name: String },
}

#[derive(Args)]
struct ChartArgs {
    #[arg(long, value_enum)]
    kind: Option<ChartKind>,

    /// JSON series file, `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    #[arg(long, default_value = "label")]
    label_name: String,

    #[arg(long, value_delimiter = ',')]
    colors: Option<Vec<String>>,

    /// Keep only these labels, in this order.
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Re-key every label by these categories, in this order.
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Swap labels and categories before rendering.
    #[arg(long)]
    transpose: bool,

    /// Histogram of the single label's values with this many bins.
    #[arg(long, conflicts_with_all = ["kind", "bands"])]
    hist: Option<usize>,

    /// Input is `band -> [[bin start, count], ...]`; draw step outlines with
    /// bin starts truncated to this many decimals.
    #[arg(long, conflicts_with = "kind")]
    bands: Option<i32>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct BrowseArgs {
    folder: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<EeError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EeError) -> u8 {
    match error {
        EeError::AssetNotFound(_)
        | EeError::InvalidAssetId(_)
        | EeError::InvalidDestination(_)
        | EeError::InvalidFolderName(_)
        | EeError::RelativeParent(_)
        | EeError::UnsupportedChartKind(_)
        | EeError::ChartData(_)
        | EeError::InvalidDate(_) => 2,
        EeError::RemoteHttp(_) | EeError::RemoteStatus { .. } | EeError::RemoteRejected(_) => 3,
        EeError::MissingCredentials
        | EeError::MissingProject
        | EeError::ConfigRead(_)
        | EeError::ConfigParse(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let session = Session {
        output_mode,
        yes: cli.yes,
        chart_colors: config.chart_colors.clone(),
        project: config.project.clone(),
    };

    // charts never touch the remote API
    if matches!(cli.command, Some(Commands::Chart(_))) {
        return dispatch(cli.command, MemoryNamespace::new(), StaticTasks::default(), &session);
    }

    if cli.demo {
        let session = Session {
            project: session.project.or_else(|| Some(DEMO_PROJECT.to_string())),
            ..session
        };
        let tasks = StaticTasks(demo_operations()?);
        return dispatch(cli.command, demo_namespace(), tasks, &session);
    }
    let client = remote_client(&config)?;
    dispatch(cli.command, &client, &client, &session)
}

struct Session {
    output_mode: OutputMode,
    yes: bool,
    chart_colors: Option<Vec<String>>,
    project: Option<String>,
}

fn remote_client(config: &ResolvedConfig) -> Result<EarthEngineClient, EeError> {
    tracing::debug!(api = %config.api_url, project = ?config.project, "connecting");
    EarthEngineClient::new(config)
}

fn dispatch<N: RemoteNamespace, T: TaskClient>(
    command: Option<Commands>,
    namespace: N,
    tasks: T,
    session: &Session,
) -> miette::Result<()> {
    match command {
        Some(Commands::Assets(args)) => {
            let app = App::new(namespace, tasks).with_project(session.project.clone());
            run_assets(&app, args.command, session)
        }
        Some(Commands::Tasks) => {
            let app = App::new(namespace, tasks).with_project(session.project.clone());
            let result = app.tasks(progress(session))?;
            JsonOutput::print_tasks(&result).into_diagnostic()
        }
        Some(Commands::Chart(args)) => {
            let app = App::new(namespace, tasks).with_chart_colors(session.chart_colors.clone());
            run_chart(&app, args, session)
        }
        Some(Commands::Browse(args)) => run_browser(namespace, tasks, args.folder, session),
        None => run_browser(namespace, tasks, None, session),
    }
}

fn progress(session: &Session) -> &'static dyn ProgressSink {
    match session.output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &StderrProgress,
    }
}

fn run_assets<N: RemoteNamespace, T: TaskClient>(
    app: &App<N, T>,
    command: AssetsCommand,
    session: &Session,
) -> miette::Result<()> {
    let sink = progress(session);
    match command {
        AssetsCommand::List { folder } => {
            let folder = parse_folder(folder.as_deref())?;
            let listing = app.list(&folder, sink)?;
            JsonOutput::print_listing(&listing).into_diagnostic()
        }
        AssetsCommand::Tree { folder, depth } => {
            let folder = parse_folder(folder.as_deref())?;
            let tree = app.tree(&folder, depth, sink)?;
            JsonOutput::print_tree(&tree).into_diagnostic()
        }
        AssetsCommand::Delete { id } => {
            let id: AssetId = id.parse()?;
            let result = app.delete(&id, |confirmation| confirm(confirmation, session), sink)?;
            JsonOutput::print_mutation(&result).into_diagnostic()
        }
        AssetsCommand::Move { id, destination } => {
            let id: AssetId = id.parse()?;
            let result = app.move_asset(
                &id,
                &destination,
                |confirmation| confirm(confirmation, session),
                sink,
            )?;
            JsonOutput::print_mutation(&result).into_diagnostic()
        }
        AssetsCommand::Mkdir { parent, name } => {
            let parent: AssetId = parent.parse()?;
            let result =
                app.mkdir(&parent, &name, |confirmation| confirm(confirmation, session), sink)?;
            JsonOutput::print_mutation(&result).into_diagnostic()
        }
    }
}

fn parse_folder(value: Option<&str>) -> Result<AssetId, EeError> {
    value.map_or_else(|| Ok(AssetId::root()), str::parse)
}

/// `--yes` commits, non-interactive runs decline, otherwise ask on the terminal.
fn confirm(confirmation: &Confirmation, session: &Session) -> bool {
    if session.yes {
        return true;
    }
    if matches!(session.output_mode, OutputMode::NonInteractive) {
        tracing::info!(action = confirmation.action.label(), "not confirmed, pass --yes to commit");
        return false;
    }

    let target = match &confirmation.action {
        PendingAction::Delete { asset } | PendingAction::Move { asset, .. } => asset.id.to_string(),
        PendingAction::CreateFolder { parent, name } => format!("{parent}/{name}"),
    };
    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "{} {target}", confirmation.action.label());
    for id in &confirmation.affected {
        let _ = writeln!(stderr, "  {id}");
    }
    let _ = write!(stderr, "Proceed? [y/N] ");
    let _ = stderr.flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn run_chart<N: RemoteNamespace, T: TaskClient>(
    app: &App<N, T>,
    args: ChartArgs,
    session: &Session,
) -> miette::Result<()> {
    let content = read_input(&args.input)?;
    let colors = args.colors.clone().or_else(|| session.chart_colors.clone());

    let figure = if let Some(precision) = args.bands {
        let bands: IndexMap<String, Vec<(f64, f64)>> = serde_json::from_str(&content)
            .map_err(|err| EeError::ChartData(err.to_string()))?;
        shaper::render_step_histogram(&bands, colors.as_deref(), precision, None)?
    } else {
        let series = shape_series(&content, &args)?;
        match (args.hist, args.kind) {
            (Some(bins), _) => {
                let Some((label, values)) = series.first().filter(|_| series.len() == 1) else {
                    return Err(EeError::ChartData(
                        "histogram chart can only be used with one label".into(),
                    )
                    .into());
                };
                let values: Vec<f64> = values.values().copied().collect();
                let histogram = shaper::histogram(&values, bins)?;
                let color = colors.as_ref().and_then(|colors| colors.first());
                shaper::render_histogram(&histogram, label, color.map(String::as_str), None)
            }
            (None, Some(kind)) => app.chart(
                ChartRequest {
                    kind,
                    series,
                    label_name: args.label_name.clone(),
                    colors: args.colors.clone(),
                    target: None,
                },
                progress(session),
            )?,
            (None, None) => {
                return Err(miette::Report::msg(
                    "one of --kind, --hist or --bands is required",
                ));
            }
        }
    };

    match args.output {
        Some(path) => {
            let written = output::write_figure(&figure, &path)?;
            tracing::info!(path = %written, "figure saved");
            Ok(())
        }
        None => JsonOutput::print_figure(&figure).into_diagnostic(),
    }
}

fn shape_series(content: &str, args: &ChartArgs) -> Result<Series, EeError> {
    let mut series: Series =
        serde_json::from_str(content).map_err(|err| EeError::ChartData(err.to_string()))?;
    if args.transpose {
        series = shaper::transpose(&series);
    }
    if let Some(labels) = &args.labels {
        series = shaper::select_labels(&series, labels)?;
    }
    if let Some(categories) = &args.categories {
        series = shaper::select_categories(&series, categories)?;
    }
    Ok(series)
}

fn read_input(input: &str) -> miette::Result<String> {
    if input == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .into_diagnostic()?;
        return Ok(content);
    }
    fs::read_to_string(input)
        .map_err(|err| EeError::Filesystem(format!("{input}: {err}")).into())
}

fn run_browser<N: RemoteNamespace, T: TaskClient>(
    namespace: N,
    tasks: T,
    folder: Option<String>,
    session: &Session,
) -> miette::Result<()> {
    if matches!(session.output_mode, OutputMode::NonInteractive) {
        return Err(miette::Report::msg(
            "command required (try `eeview assets --help`)",
        ));
    }
    let folder = tui::start_folder(folder.as_deref())?;
    let tree = AssetTree::open_at(namespace, folder)?;
    let mut browser = Browser::new(tree, tasks, JsonLineBridge::new(Vec::new()));
    browser.run()?;

    // clipboard messages are handed to the host once the terminal is restored
    let buffered = browser.into_clipboard().into_inner();
    io::stdout().write_all(&buffered).into_diagnostic()
}

const DEMO_PROJECT: &str = "demo-project";

fn demo_namespace() -> MemoryNamespace {
    MemoryNamespace::new()
        .with_project(DEMO_PROJECT, true)
        .with_project("disabled-project", false)
        .with_asset("projects/demo-project/assets/landsat/scene2", AssetKind::Image)
        .with_asset("projects/demo-project/assets/landsat/scene10", AssetKind::Image)
        .with_asset("projects/demo-project/assets/landsat/composites", AssetKind::ImageCollection)
        .with_asset("projects/demo-project/assets/boundaries", AssetKind::FeatureCollection)
        .with_asset("projects/demo-project/assets/samples", AssetKind::Table)
        .with_asset("projects/demo-project/assets/exports/ndvi_2023", AssetKind::Image)
}

fn demo_operations() -> Result<Vec<Operation>, EeError> {
    serde_json::from_value(serde_json::json!([
        {
            "name": "projects/demo-project/operations/EXPORT1",
            "metadata": {
                "state": "SUCCEEDED",
                "type": "EXPORT_IMAGE",
                "description": "ndvi_2023",
                "attempt": 1,
                "startTime": "2023-06-01T10:00:00Z",
                "endTime": "2023-06-01T10:12:31Z",
                "batchEecuUsageSeconds": 431.25
            }
        },
        {
            "name": "projects/demo-project/operations/EXPORT2",
            "metadata": {
                "state": "RUNNING",
                "type": "EXPORT_FEATURES",
                "description": "boundaries_table",
                "attempt": 1,
                "startTime": "2023-06-01T11:00:00Z"
            }
        }
    ]))
    .map_err(|err| EeError::ConfigParse(err.to_string()))
}
