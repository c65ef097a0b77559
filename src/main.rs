use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use nzbfeed::config::Config;
use nzbfeed::dialog::{
    DialogError, DialogEvent, DialogSettings, DialogState, FeedDialog, FeedSource, PreviewParams,
};
use nzbfeed::feed::{menu_entries, FeedDefinition, NamingMode, Projection, StatusFilter};
use nzbfeed::host::{fetch_all, DialogHost, Notice};
use nzbfeed::rpc::{JsonRpcClient, RemoteApi};
use nzbfeed::util::{strip_control_chars, validate_feed_url, SOFT_BREAK};

/// Get the config file path (~/.config/nzbfeed/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("nzbfeed")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "nzbfeed", about = "View, preview and fetch NZBGet feed items")]
struct Args {
    /// Config file (default: ~/.config/nzbfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server URL, overrides `server_url` from the config file
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the feeds configured on the server
    Feeds,
    /// Ask the server to refresh every feed now
    FetchAll,
    /// Show the items of a saved feed
    View {
        /// Feed number as listed by `feeds`
        id: u32,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Show the items of a feed definition without saving it
    Preview {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Feed filter expression
        #[arg(long, default_value = "")]
        filter: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        priority: String,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ViewArgs {
    /// Status filter: all, new, fetched or backlog
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// Show filenames instead of titles
    #[arg(long)]
    filenames: bool,

    /// Enqueue the items with these URLs
    #[arg(long, value_name = "URL", num_args = 1..)]
    select: Vec<String>,

    /// Enqueue every item shown by the status filter
    #[arg(long)]
    select_visible: bool,

    /// Retry a halted batch up to N times
    #[arg(long, value_name = "N", default_value_t = 0)]
    retry: u32,
}

impl ViewArgs {
    fn wants_fetch(&self) -> bool {
        self.select_visible || !self.select.is_empty()
    }
}

/// Host for a terminal: prints notices and the table, checks rows from the command line.
struct ConsoleHost {
    page_size: usize,
    checked: HashSet<String>,
    title: String,
    table: Option<Projection>,
    pager_visible: bool,
}

impl ConsoleHost {
    fn new(page_size: usize, checked: HashSet<String>) -> Self {
        Self {
            page_size,
            checked,
            title: String::new(),
            table: None,
            pager_visible: false,
        }
    }

    fn check_visible(&mut self) {
        if let Some(table) = &self.table {
            self.checked = table.ids().map(str::to_owned).collect();
        }
    }

    fn print_table(&self) {
        let Some(table) = &self.table else {
            return;
        };
        let counts = table.counts;

        println!("{}", strip_control_chars(&self.title));
        println!(
            "ALL {}  NEW {}  FETCHED {}  BACKLOG {}  (showing {})",
            counts.all(),
            counts.new,
            counts.fetched,
            counts.backlog,
            table.filter
        );
        if table.names_differ && table.naming == NamingMode::Title {
            println!("Some filenames differ from titles; use --filenames to see them");
        }
        println!();
        println!(
            "{:<8} {:<60} {:<16} {:>6} {:>10}",
            "STATUS",
            table.naming.column_header(),
            "CATEGORY",
            "AGE",
            "SIZE"
        );

        for row in table.rows.iter().take(self.page_size) {
            let name = row.name.replace(SOFT_BREAK, "");
            println!(
                "{:<8} {:<60} {:<16} {:>6} {:>10}",
                row.status_label,
                strip_control_chars(&name),
                strip_control_chars(&row.category),
                row.age,
                row.size
            );
        }
        if self.pager_visible {
            let pages = table.rows.len().div_ceil(self.page_size);
            println!(
                "... {} more rows (page 1 of {pages})",
                table.rows.len() - self.page_size
            );
        }
    }
}

impl DialogHost for ConsoleHost {
    fn pause_refresh(&mut self) {
        tracing::debug!("Refresh paused");
    }

    fn resume_refresh(&mut self) {
        tracing::debug!("Refresh resumed");
    }

    fn notify(&mut self, notice: Notice) {
        println!("{notice}");
    }

    fn alert(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {}", strip_control_chars(message));
    }

    fn update_table(&mut self, projection: &Projection, pager_visible: bool) {
        self.table = Some(projection.clone());
        self.pager_visible = pager_visible;
    }

    fn checked_rows(&self) -> HashSet<String> {
        self.checked.clone()
    }

    fn clear_table(&mut self) {
        self.table = None;
        self.pager_visible = false;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_transmit_visible(&mut self, visible: bool) {
        if visible {
            eprintln!("Transmitting...");
        }
    }

    fn dispatch_progress(&mut self, completed: usize, total: usize) {
        eprintln!("[{completed}/{total}]");
    }
}

/// Settles the dialog, cancelling it on Ctrl-C. Returns false when cancelled.
async fn settle_or_cancel<R: RemoteApi + 'static, H: DialogHost>(
    dialog: &mut FeedDialog<R, H>,
    events: &mut mpsc::Receiver<DialogEvent>,
) -> bool {
    let interrupted = tokio::select! {
        _ = dialog.settle(events) => false,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            true
        }
    };

    if interrupted {
        dialog.cancel();
        eprintln!("Cancelled");
    }
    !interrupted
}

async fn run_view(
    client: Arc<JsonRpcClient>,
    config: &Config,
    source: FeedSource,
    args: ViewArgs,
) -> Result<()> {
    let settings = DialogSettings::from(config);
    let host = ConsoleHost::new(settings.page_size, args.select.iter().cloned().collect());
    let (mut dialog, mut events) = FeedDialog::new(client, host, settings);

    dialog.show_modal(source);
    if !settle_or_cancel(&mut dialog, &mut events).await {
        return Ok(());
    }
    if dialog.state() != DialogState::Ready {
        bail!("Feed could not be loaded");
    }

    if args.filenames {
        dialog.set_naming(NamingMode::Filename)?;
    }
    if args.status != StatusFilter::All {
        dialog.set_filter(args.status)?;
    }
    dialog.host().print_table();

    if !args.wants_fetch() {
        dialog.cancel();
        return Ok(());
    }
    if args.select_visible {
        dialog.host_mut().check_visible();
    }

    match dialog.fetch() {
        Ok(()) => {}
        Err(DialogError::EmptySelection) => {
            dialog.cancel();
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let mut retries_left = args.retry;
    loop {
        if !settle_or_cancel(&mut dialog, &mut events).await {
            return Ok(());
        }
        if dialog.state() == DialogState::Closed {
            return Ok(());
        }
        if retries_left == 0 {
            break;
        }
        retries_left -= 1;
        match dialog.retry() {
            Ok(()) => {}
            // Panicked batch: nothing recorded to resume from
            Err(DialogError::NothingToRetry) => break,
            Err(e) => return Err(e.into()),
        }
    }

    dialog.cancel();
    bail!("Not every selected item was added to the queue")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, the table goes to stdout
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();
    if let Some(server) = args.server {
        config.server_url = server;
    }

    let client = Arc::new(
        JsonRpcClient::new(&config)
            .with_context(|| format!("Cannot use server URL '{}'", config.server_url))?,
    );

    match args.command {
        Command::Feeds => {
            let options = client
                .load_config()
                .await
                .context("Failed to read server options")?;
            let entries = menu_entries(&options);
            if entries.is_empty() {
                println!("No feeds configured");
            }
            for (id, label) in entries {
                println!("{id:>3}  {}", strip_control_chars(&label));
            }
        }
        Command::FetchAll => {
            let mut host = ConsoleHost::new(config.page_size, HashSet::new());
            fetch_all(client.as_ref(), &mut host)
                .await
                .context("Failed to start feed refresh")?;
        }
        Command::View { id, view } => {
            let options = client
                .load_config()
                .await
                .context("Failed to read server options")?;
            let definition = FeedDefinition::read(&options, id)
                .filter(FeedDefinition::has_url)
                .with_context(|| format!("Feed {id} is not configured"))?;
            run_view(client, &config, FeedSource::Saved(definition), view).await?;
        }
        Command::Preview {
            url,
            name,
            filter,
            category,
            priority,
            view,
        } => {
            validate_feed_url(&url).with_context(|| format!("Invalid feed URL '{url}'"))?;
            let params = PreviewParams {
                name,
                url,
                filter,
                category,
                priority,
            };
            run_view(client, &config, FeedSource::Preview(params), view).await?;
        }
    }

    Ok(())
}
