mod state;

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use labelloop_core::session::{Session, SessionStore};
use labelloop_core::shared::constants::DEFAULT_SERVER_URL;
use labelloop_core::shared::crop::CropCandidate;
use labelloop_core::shared::image::ImageRecord;
use labelloop_core::shared::rect::CropRect;
use labelloop_core::store::domain::dataset_store::DatasetStore;
use labelloop_core::store::infrastructure::http_dataset_store::HttpDatasetStore;
use labelloop_core::workflow::consistency;
use labelloop_core::workflow::crop::{CommitCrops, CropSession};
use labelloop_core::workflow::curation::Curation;
use labelloop_core::workflow::image_queue::ImageQueue;
use labelloop_core::workflow::label_stats::LabelStatsCache;
use labelloop_core::workflow::labeled_history::LabeledHistory;
use labelloop_core::workflow::save_label::{SaveLabel, SaveOutcome};
use labelloop_core::workflow::WorkflowError;

use crate::state::AppState;

/// Image annotation workflow against a labelloop dataset server.
#[derive(Parser)]
#[command(name = "labelloop")]
struct Cli {
    /// Base URL of the dataset server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a session credential for subsequent commands.
    Login {
        /// Identity recorded on every label you write.
        email: String,
        /// Bearer token issued by the server.
        #[arg(long)]
        token: String,
    },
    /// Forget the stored session.
    Logout,
    /// List datasets available on the server.
    Datasets,
    /// Labeled/unlabeled and consistency breakdown of a dataset.
    Stats {
        /// Dataset id; defaults to the last one used.
        dataset: Option<String>,
    },
    /// Export a dataset's labels as CSV.
    Export {
        /// Dataset id; defaults to the last one used.
        dataset: Option<String>,
        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Interactive labeling session over a dataset's image queue.
    Label {
        /// Dataset id; defaults to the last one used.
        dataset: Option<String>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let sessions = Arc::new(SessionStore::new());
    if let Some(path) = Session::default_path() {
        if let Ok(session) = Session::load(&path) {
            sessions.set(session);
        }
    }
    log::debug!("using annotation server at {}", cli.server);
    let store: Arc<dyn DatasetStore> =
        Arc::new(HttpDatasetStore::new(&cli.server, sessions.clone())?);

    match cli.command {
        Command::Login { email, token } => login(&email, &token, &sessions),
        Command::Logout => logout(&sessions),
        Command::Datasets => list_datasets(store.as_ref()),
        Command::Stats { dataset } => dataset_stats(store.as_ref(), dataset),
        Command::Export { dataset, output } => export_csv(store.as_ref(), dataset, &output),
        Command::Label { dataset } => label_loop(store, sessions, dataset),
    }
}

fn login(
    email: &str,
    token: &str,
    sessions: &SessionStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(email, token);
    let path = Session::default_path().ok_or("no config directory on this platform")?;
    session.save(&path)?;
    sessions.set(session);
    println!("Signed in as {email}");
    Ok(())
}

fn logout(sessions: &SessionStore) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = Session::default_path() {
        Session::delete(&path)?;
    }
    sessions.clear();
    println!("Signed out");
    Ok(())
}

fn list_datasets(store: &dyn DatasetStore) -> Result<(), Box<dyn std::error::Error>> {
    let datasets = store.list_datasets()?;
    if datasets.is_empty() {
        println!("No datasets on the server");
        return Ok(());
    }
    for ds in datasets {
        println!("{}  {} ({} images)", ds.id, ds.name, ds.images.len());
    }
    Ok(())
}

fn dataset_stats(
    store: &dyn DatasetStore,
    dataset: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset_id = resolve_dataset(dataset)?;
    let snapshot = store.fetch_dataset(&dataset_id)?;
    let breakdown = consistency::classify(&snapshot);

    println!("Dataset {} ({})", snapshot.name, dataset_id);
    println!("  total:        {}", breakdown.total);
    println!("  labeled:      {}", breakdown.labeled);
    println!("  unlabeled:    {}", breakdown.unlabeled);
    println!("  consistent:   {}", breakdown.consistent.len());
    println!("  inconsistent: {}", breakdown.inconsistent.len());
    for image in &breakdown.inconsistent {
        let labels: Vec<_> = image.distinct_labels().into_iter().collect();
        println!("    {}  {}", image.filename, labels.join(" / "));
    }
    Ok(())
}

fn export_csv(
    store: &dyn DatasetStore,
    dataset: Option<String>,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset_id = resolve_dataset(dataset)?;
    let csv = store.export_csv(&dataset_id)?;
    std::fs::write(output, csv)?;
    println!("Exported labels to {}", output.display());
    Ok(())
}

/// Dataset id from the argument or the previous run, remembered for next time.
fn resolve_dataset(dataset: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    let mut state = AppState::load();
    let dataset_id = dataset
        .or(state.selected_dataset.clone())
        .ok_or("no dataset selected; pass a dataset id")?;
    state.selected_dataset = Some(dataset_id.clone());
    state.save();
    Ok(dataset_id)
}

struct LabelSession {
    store: Arc<dyn DatasetStore>,
    sessions: Arc<SessionStore>,
    save: SaveLabel,
    commit: CommitCrops,
    curation: Curation,
    dataset_id: String,
    queue: ImageQueue,
    history: LabeledHistory,
    stats: LabelStatsCache,
    crops: Option<CropSession>,
}

fn label_loop(
    store: Arc<dyn DatasetStore>,
    sessions: Arc<SessionStore>,
    dataset: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset_id = resolve_dataset(dataset)?;
    let invalidations = sessions.subscribe();

    let mut session = LabelSession {
        save: SaveLabel::new(store.clone(), sessions.clone()),
        commit: CommitCrops::new(store.clone(), sessions.clone()),
        curation: Curation::new(store.clone(), sessions.clone()),
        store,
        sessions,
        dataset_id,
        queue: ImageQueue::new(),
        history: LabeledHistory::new(),
        stats: LabelStatsCache::new(),
        crops: None,
    };
    session.reload()?;

    println!(
        "{} images queued. Type a label to save it, :h for commands, :q to quit.",
        session.queue.len()
    );
    session.show_current();

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input == ":q" {
            break;
        }
        if !input.is_empty() {
            if let Err(e) = session.dispatch(input) {
                eprintln!("{e}");
                if e.is_auth() {
                    break;
                }
            }
            if invalidations.try_recv().is_ok() {
                eprintln!("Session expired; run `labelloop login` and start again.");
                break;
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

impl LabelSession {
    fn reload(&mut self) -> Result<(), WorkflowError> {
        let images = self
            .store
            .list_images(&self.dataset_id)
            .map_err(|e| WorkflowError::from_write(e, &self.sessions))?;
        let unlabeled: Vec<ImageRecord> =
            images.into_iter().filter(|img| !img.is_labeled()).collect();
        self.queue.load(unlabeled);
        self.fetch_history(0);
        self.crops = None;
        Ok(())
    }

    fn dispatch(&mut self, input: &str) -> Result<(), WorkflowError> {
        let mut parts = input.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match head {
            ":h" => self.show_help(),
            ":n" => {
                if !self.queue.next() {
                    println!("Already at the last image");
                }
                self.show_current();
            }
            ":p" => {
                if !self.queue.prev() {
                    println!("Already at the first image");
                }
                self.show_current();
            }
            ":g" => {
                let id = rest.first().copied().unwrap_or_default();
                if !self.queue.jump_to(id) {
                    println!("No image {id} in the queue; back at the front");
                }
                self.show_current();
            }
            ":crop" => self.add_crop(&rest)?,
            ":drop" => self.drop_crop(&rest),
            ":commit" => self.commit_crops()?,
            ":hist" => self.show_history(rest.first().copied()),
            ":relabel" => self.relabel(&rest)?,
            ":hide" => self.hide_current(),
            ":del" => self.delete_current()?,
            ":reset" => self.reset_label(&rest)?,
            ":stats" => self.show_stats(),
            ":export" => self.export(&rest)?,
            ":reload" => {
                self.reload()?;
                println!("{} images queued", self.queue.len());
                self.show_current();
            }
            other if other.starts_with(':') => {
                println!("Unknown command {other}; :h lists commands");
            }
            _ => self.save_current(input)?,
        }
        Ok(())
    }

    fn show_help(&self) {
        println!("  <label>                save label for the current image and advance");
        println!("  :n / :p                move through the queue");
        println!("  :g <id>                jump to an image by id");
        println!("  :crop x y w h label    stage a crop of the current image");
        println!("  :drop <index>          discard a staged crop (1-based)");
        println!("  :commit                upload staged crops as new samples");
        println!("  :hist [n|p]            recently labeled images, page forward/back");
        println!("  :relabel <id> <label>  correct an earlier label");
        println!("  :hide                  skip the current image for this session");
        println!("  :del                   delete the current image");
        println!("  :reset <id>            clear an image's label");
        println!("  :stats                 label distribution of the current image");
        println!("  :export <file>         export labels as CSV");
        println!("  :reload                re-fetch the queue from the server");
        println!("  :q                     quit");
    }

    fn show_current(&self) {
        match self.queue.current() {
            Some(image) => {
                let position = self.queue.current_index().unwrap_or_default() + 1;
                println!(
                    "[{position}/{}] {} ({})",
                    self.queue.len(),
                    image.filename,
                    image.id
                );
            }
            None => println!("Queue is empty; :reload to re-fetch or :q to quit"),
        }
    }

    fn save_current(&mut self, label: &str) -> Result<(), WorkflowError> {
        let outcome = self.save.execute(
            &mut self.queue,
            &mut self.history,
            &mut self.stats,
            &self.dataset_id,
            label,
        )?;
        println!("Saved \"{}\"", label.trim());
        if outcome == SaveOutcome::QueueExhausted {
            println!("That was the last image in the queue.");
        }
        self.show_current();
        Ok(())
    }

    fn add_crop(&mut self, args: &[&str]) -> Result<(), WorkflowError> {
        let (coords, label) = match args {
            [x, y, w, h, label @ ..] if !label.is_empty() => ([*x, *y, *w, *h], label.join(" ")),
            _ => {
                println!("Usage: :crop x y w h label");
                return Ok(());
            }
        };
        let parsed: Vec<i32> = coords.iter().filter_map(|v| v.parse().ok()).collect();
        let [x, y, w, h] = parsed.as_slice() else {
            println!("Crop coordinates must be integers");
            return Ok(());
        };
        let rect = CropRect::new(*x, *y, *w, *h);
        let source = self.queue.current().cloned().ok_or(WorkflowError::NoImage)?;

        // A batch is tied to one source image; moving on discards it.
        if self
            .crops
            .as_ref()
            .is_some_and(|c| c.source().id != source.id)
        {
            println!("Discarding staged crops of the previous image");
            self.crops = None;
        }

        let bytes = self
            .store
            .fetch_file(&source)
            .map_err(|e| WorkflowError::Network(e.to_string()))?;
        let pixels = image::load_from_memory(&bytes)
            .map_err(|e| WorkflowError::Network(e.to_string()))?;
        let candidate =
            CropCandidate::render(&pixels, rect, &label).map_err(|_| WorkflowError::EmptyCropRect)?;

        let crops = self
            .crops
            .get_or_insert_with(|| CropSession::new(source.clone()));
        crops.add_candidate(candidate)?;
        println!(
            "Staged crop \"{label}\" ({} in batch)",
            crops.candidates().len()
        );
        Ok(())
    }

    fn drop_crop(&mut self, args: &[&str]) {
        let Some(index) = args.first().and_then(|v| v.parse::<usize>().ok()) else {
            println!("Usage: :drop <index> (1-based)");
            return;
        };
        match self
            .crops
            .as_mut()
            .and_then(|c| c.remove_candidate(index.wrapping_sub(1)))
        {
            Some(removed) => println!("Dropped crop \"{}\"", removed.label),
            None => println!("No staged crop {index}"),
        }
    }

    fn commit_crops(&mut self) -> Result<(), WorkflowError> {
        let Some(crops) = self.crops.as_mut() else {
            return Err(WorkflowError::NothingToCommit);
        };
        let outcome = self.commit.execute(
            crops,
            &mut self.queue,
            &mut self.history,
            &self.dataset_id,
        )?;
        println!("Created {} labeled samples", outcome.created.len());
        if !outcome.source_deleted {
            println!("Source image is still on the server; it may reappear on reload.");
        }
        self.crops = None;
        self.show_current();
        Ok(())
    }

    fn fetch_history(&mut self, page: usize) {
        match self.store.labeled_page(&self.dataset_id, page) {
            Ok(fetched) => self.history.load(page, fetched),
            Err(e) => eprintln!("Could not fetch labeled history: {e}"),
        }
    }

    fn show_history(&mut self, direction: Option<&str>) {
        match direction {
            Some("n") => {
                if let Some(page) = self.history.next_page() {
                    self.fetch_history(page);
                } else {
                    println!("Already on the last page");
                }
            }
            Some("p") => {
                if let Some(page) = self.history.prev_page() {
                    self.fetch_history(page);
                } else {
                    println!("Already on the first page");
                }
            }
            _ => {}
        }
        println!(
            "Recently labeled (page {}, {} total):",
            self.history.page() + 1,
            self.history.total()
        );
        for image in self.history.entries() {
            let marker = if image.is_cropped { "crop " } else { "     " };
            println!(
                "  {marker}{}  {}  {}",
                image.id,
                image.label.as_deref().unwrap_or("-"),
                image.filename
            );
        }
    }

    fn relabel(&mut self, args: &[&str]) -> Result<(), WorkflowError> {
        let [id, label @ ..] = args else {
            println!("Usage: :relabel <id> <label>");
            return Ok(());
        };
        if label.is_empty() {
            println!("Usage: :relabel <id> <label>");
            return Ok(());
        }
        self.save.relabel(
            &mut self.queue,
            &mut self.history,
            &mut self.stats,
            &self.dataset_id,
            id,
            &label.join(" "),
        )?;
        println!("Relabeled {id}");
        Ok(())
    }

    /// Local-only removal; the image stays on the server and comes back
    /// with the next reload.
    fn hide_current(&mut self) {
        let Some(image_id) = self.queue.current().map(|img| img.id.clone()) else {
            println!("Queue is empty");
            return;
        };
        self.queue.remove(&image_id);
        println!("Hidden until reload");
        self.show_current();
    }

    fn delete_current(&mut self) -> Result<(), WorkflowError> {
        let image_id = self
            .queue
            .current()
            .map(|img| img.id.clone())
            .ok_or(WorkflowError::NoImage)?;
        self.curation.delete_image(
            &mut self.queue,
            &mut self.history,
            &mut self.stats,
            &self.dataset_id,
            &image_id,
        )?;
        println!("Deleted {image_id}");
        self.show_current();
        Ok(())
    }

    fn reset_label(&mut self, args: &[&str]) -> Result<(), WorkflowError> {
        let Some(id) = args.first() else {
            println!("Usage: :reset <id>");
            return Ok(());
        };
        self.curation.clear_label(
            &mut self.queue,
            &mut self.history,
            &mut self.stats,
            &self.dataset_id,
            id,
        )?;
        println!("Cleared label of {id}");
        Ok(())
    }

    fn show_stats(&mut self) {
        let Some(image_id) = self.queue.current().map(|img| img.id.clone()) else {
            println!("Queue is empty");
            return;
        };
        let shares = self
            .stats
            .fetch(self.store.as_ref(), &self.dataset_id, &image_id);
        if shares.is_empty() {
            println!("No label statistics for this image");
            return;
        }
        for share in shares {
            println!(
                "  {:<20} {:>4}  {:.1}%",
                share.label, share.count, share.percentage
            );
        }
    }

    fn export(&mut self, args: &[&str]) -> Result<(), WorkflowError> {
        let Some(path) = args.first() else {
            println!("Usage: :export <file>");
            return Ok(());
        };
        let csv = self
            .store
            .export_csv(&self.dataset_id)
            .map_err(|e| WorkflowError::from_write(e, &self.sessions))?;
        if let Err(e) = std::fs::write(path, csv) {
            eprintln!("Could not write {path}: {e}");
        } else {
            println!("Exported labels to {path}");
        }
        Ok(())
    }
}
