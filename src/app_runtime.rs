//! Application runtime bootstrap and the line-oriented command shell.

use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::{
    carousel::window_controller::{WindowController, WindowView},
    catalog::{map_discover_page, parse_discover_page},
    config::{CatalogConfig, Config, FavoritesBackend, FavoritesConfig},
    config_persistence::{load_config_file, persist_config_file},
    db_manager::DbManager,
    favorites::{
        favorite_item::FavoriteItem,
        favorites_store::{FavoriteChange, FavoritesStore, LoadStatus},
        storage::{JsonFileStorage, KeyValueStorage, MemoryStorage, StorageError},
    },
    protocol::{FavoritesMessage, Message},
    viewport::{SharedViewport, ViewportPort},
};

const BUS_CAPACITY: usize = 256;
const SQLITE_FILE_NAME: &str = "marquee.db";

const HELP_TEXT: &str = "\
commands:
  resize <px>               set the viewport width
  items <n>                 set the carousel item count
  catalog <file>            load a discover page (JSON) as carousel items
  goto <i>                  move the window to index i (clamped)
  next | prev               step the window by one item
  view                      show the current window
  fav add <id> [title...]   add a favorite
  fav rm <id>               remove a favorite
  fav toggle <id> [title...]
  fav list                  list favorites in insertion order
  fav show <id>             show one favorite
  help                      show this text
  quit                      exit";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ShellCommand {
    Resize(u32),
    Items(usize),
    Catalog(PathBuf),
    Goto(i64),
    Next,
    Prev,
    View,
    FavAdd { id: String, title: Option<String> },
    FavRemove(String),
    FavToggle { id: String, title: Option<String> },
    FavList,
    FavShow(String),
    Help,
    Quit,
}

fn parse_number<T: std::str::FromStr>(
    command: &str,
    argument: Option<&str>,
    what: &str,
) -> Result<T, String> {
    let Some(argument) = argument else {
        return Err(format!("'{}' expects {}", command, what));
    };
    argument
        .parse::<T>()
        .map_err(|_| format!("'{}' expects {}, got '{}'", command, what, argument))
}

fn parse_fav_target(
    subcommand: &str,
    arguments: &[&str],
) -> Result<(String, Option<String>), String> {
    let Some((id, title_words)) = arguments.split_first() else {
        return Err(format!("'fav {}' expects an item id", subcommand));
    };
    let title = (!title_words.is_empty()).then(|| title_words.join(" "));
    Ok((id.to_string(), title))
}

/// Parses one input line. Blank lines are rejected; callers skip them first.
pub(crate) fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, arguments)) = words.split_first() else {
        return Err("empty command".to_string());
    };

    match command {
        "resize" => parse_number(command, arguments.first().copied(), "a width in pixels")
            .map(ShellCommand::Resize),
        "items" => parse_number(command, arguments.first().copied(), "an item count")
            .map(ShellCommand::Items),
        "goto" => parse_number(command, arguments.first().copied(), "an index")
            .map(ShellCommand::Goto),
        "catalog" => match arguments {
            [] => Err("'catalog' expects a file path".to_string()),
            _ => Ok(ShellCommand::Catalog(PathBuf::from(arguments.join(" ")))),
        },
        "next" => Ok(ShellCommand::Next),
        "prev" => Ok(ShellCommand::Prev),
        "view" => Ok(ShellCommand::View),
        "help" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "fav" => {
            let Some((&subcommand, rest)) = arguments.split_first() else {
                return Err("'fav' expects add, rm, toggle, list or show".to_string());
            };
            match subcommand {
                "add" => parse_fav_target(subcommand, rest)
                    .map(|(id, title)| ShellCommand::FavAdd { id, title }),
                "toggle" => parse_fav_target(subcommand, rest)
                    .map(|(id, title)| ShellCommand::FavToggle { id, title }),
                "rm" | "remove" => parse_fav_target(subcommand, rest)
                    .map(|(id, _)| ShellCommand::FavRemove(id)),
                "show" => parse_fav_target(subcommand, rest)
                    .map(|(id, _)| ShellCommand::FavShow(id)),
                "list" => Ok(ShellCommand::FavList),
                other => Err(format!("unknown fav subcommand '{}'", other)),
            }
        }
        other => Err(format!(
            "unknown command '{}'. Type 'help' for a list of commands",
            other
        )),
    }
}

/// Opens the configured favorites backend under `data_dir`.
pub(crate) fn open_favorites_storage(
    config: &FavoritesConfig,
    data_dir: Option<&Path>,
) -> Result<Box<dyn KeyValueStorage>, StorageError> {
    match (config.backend, data_dir) {
        (FavoritesBackend::Memory, _) => Ok(Box::new(MemoryStorage::new())),
        (_, None) => Err(StorageError::Unavailable(
            "no user data directory on this platform".to_string(),
        )),
        (FavoritesBackend::JsonFile, Some(data_dir)) => {
            Ok(Box::new(JsonFileStorage::new(data_dir)))
        }
        (FavoritesBackend::Sqlite, Some(data_dir)) => {
            std::fs::create_dir_all(data_dir)?;
            let db = DbManager::open(&data_dir.join(SQLITE_FILE_NAME))?;
            Ok(Box::new(db))
        }
    }
}

pub(crate) enum ShellOutcome {
    Continue(Vec<String>),
    Quit,
}

/// One interactive session: a browse carousel, the favorites store, and
/// the bus both publish to.
pub(crate) struct ShellSession<S: KeyValueStorage> {
    viewport: SharedViewport,
    carousel: WindowController<SharedViewport>,
    favorites: FavoritesStore<S>,
    catalog_config: CatalogConfig,
    catalog_items: Vec<FavoriteItem>,
    bus_sender: broadcast::Sender<Message>,
    bus_receiver: broadcast::Receiver<Message>,
    /// Set when the latest real change could not be written.
    write_warning_pending: bool,
}

fn format_item(item: &FavoriteItem) -> String {
    let mut line = format!("{}  {}", item.id, item.title);
    if let Some(year) = &item.year {
        line.push_str(&format!(" ({})", year));
    }
    if let Some(rating) = item.rating {
        line.push_str(&format!("  {:.1}", rating));
    }
    line
}

fn format_view(
    label: &str,
    view: &WindowView,
    visible: &std::ops::Range<usize>,
    count: usize,
) -> String {
    format!(
        "[{}] showing {}..{} of {} | active {}/{} | {} per view | offset {:.1}% | nav {}",
        label,
        visible.start,
        visible.end,
        count,
        view.active_index,
        view.max_index,
        view.items_per_view,
        view.offset_percent,
        if view.navigation_enabled { "on" } else { "off" }
    )
}

impl<S: KeyValueStorage> ShellSession<S> {
    pub(crate) fn new(
        config: &Config,
        favorites: FavoritesStore<S>,
        bus_sender: broadcast::Sender<Message>,
    ) -> Self {
        let bus_receiver = bus_sender.subscribe();
        let viewport = SharedViewport::new(config.ui.window_width, bus_sender.clone());
        let carousel = WindowController::new(
            "browse",
            viewport.clone(),
            config.carousel.breakpoint_table(),
            0,
        );
        Self {
            viewport,
            carousel,
            favorites,
            catalog_config: config.catalog.clone(),
            catalog_items: Vec::new(),
            bus_sender,
            bus_receiver,
            write_warning_pending: false,
        }
    }

    pub(crate) fn viewport_width_px(&self) -> u32 {
        self.viewport.measure_width_px()
    }

    pub(crate) fn favorites(&self) -> &FavoritesStore<S> {
        &self.favorites
    }

    pub(crate) fn carousel(&self) -> &WindowController<SharedViewport> {
        &self.carousel
    }

    pub(crate) fn execute(&mut self, command: ShellCommand) -> ShellOutcome {
        let mut output = Vec::new();
        match command {
            ShellCommand::Quit => return ShellOutcome::Quit,
            ShellCommand::Help => output.push(HELP_TEXT.to_string()),
            ShellCommand::Resize(width_px) => {
                self.viewport.resize(width_px);
                output.extend(self.render());
            }
            ShellCommand::Items(item_count) => {
                self.carousel.set_item_count(item_count);
                output.extend(self.render());
            }
            ShellCommand::Catalog(path) => match self.load_catalog(&path) {
                Ok(count) => {
                    output.push(format!("loaded {} items from {}", count, path.display()));
                    output.extend(self.render());
                }
                Err(err) => output.push(err),
            },
            ShellCommand::Goto(index) => {
                self.carousel.set_active_index(index);
                output.extend(self.render());
            }
            ShellCommand::Next => {
                if !self.carousel.can_step_forward() {
                    output.push("already at the last window".to_string());
                }
                self.carousel.step_forward();
                output.extend(self.render());
            }
            ShellCommand::Prev => {
                if !self.carousel.can_step_backward() {
                    output.push("already at the first window".to_string());
                }
                self.carousel.step_backward();
                output.extend(self.render());
            }
            ShellCommand::View => output.extend(self.render()),
            ShellCommand::FavAdd { id, title } => {
                let item = self.resolve_item(&id, title);
                let change = self.favorites.add(item);
                self.publish_favorite_change(&id, change);
            }
            ShellCommand::FavRemove(id) => {
                let change = self.favorites.remove(&id);
                self.publish_favorite_change(&id, change);
            }
            ShellCommand::FavToggle { id, title } => {
                let item = self.resolve_item(&id, title);
                let change = self.favorites.toggle(item);
                self.publish_favorite_change(&id, change);
            }
            ShellCommand::FavList => {
                if self.favorites.count() == 0 {
                    output.push("no favorites yet".to_string());
                }
                output.extend(self.favorites.list().iter().map(format_item));
            }
            ShellCommand::FavShow(id) => match self.favorites.get(&id) {
                Some(item) => {
                    output.push(format_item(item));
                    output.push(format!("  {}", item.description));
                    output.push(format!("  {}", item.image));
                }
                None => output.push(format!("'{}' is not a favorite", id)),
            },
        }
        output.extend(self.drain_bus_notices());
        ShellOutcome::Continue(output)
    }

    /// Resize notices are picked up here, right before the window is drawn.
    fn render(&mut self) -> Vec<String> {
        self.carousel.poll_viewport();
        let visible = self.carousel.visible_range();
        let mut lines = vec![format_view(
            self.carousel.label(),
            &self.carousel.view(),
            &visible,
            self.carousel.state().item_count,
        )];
        for index in visible {
            if let Some(item) = self.catalog_items.get(index) {
                let marker = if self.favorites.is_favorite(&item.id) {
                    '*'
                } else {
                    ' '
                };
                lines.push(format!("  {} {}", marker, format_item(item)));
            }
        }
        lines
    }

    fn load_catalog(&mut self, path: &Path) -> Result<usize, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        let page = parse_discover_page(&text)?;
        self.catalog_items = map_discover_page(&page, &self.catalog_config);
        self.carousel.set_item_count(self.catalog_items.len());
        info!(
            "Loaded catalog page {}/{} ({} of {} results) from {}",
            page.page,
            page.total_pages,
            self.catalog_items.len(),
            page.total_results,
            path.display()
        );
        Ok(self.catalog_items.len())
    }

    /// Catalog entries win over a bare id so favorites keep their display fields.
    fn resolve_item(&self, id: &str, title: Option<String>) -> FavoriteItem {
        if let Some(item) = self.catalog_items.iter().find(|item| item.id == id) {
            return item.clone();
        }
        FavoriteItem::new(id, title.unwrap_or_else(|| id.to_string()))
    }

    /// Only real changes reach the bus.
    fn publish_favorite_change(&mut self, id: &str, change: FavoriteChange) {
        if !change.is_change() {
            debug!("Favorite {} unchanged", id);
            return;
        }
        self.write_warning_pending = self.favorites.last_write_failed();
        let _ = self
            .bus_sender
            .send(Message::Favorites(FavoritesMessage::StateChanged {
                id: id.to_string(),
                favorited: self.favorites.is_favorite(id),
                count: self.favorites.count(),
            }));
    }

    fn drain_bus_notices(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.bus_receiver.try_recv() {
                Ok(Message::Favorites(FavoritesMessage::StateChanged {
                    id,
                    favorited,
                    count,
                })) => {
                    let verb = if favorited { "saved" } else { "not saved" };
                    lines.push(format!("{} {} ({} favorites)", id, verb, count));
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Shell bus receiver lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        if std::mem::take(&mut self.write_warning_pending) {
            lines.push("warning: favorites could not be saved".to_string());
        }
        lines
    }

    /// Releases the carousel's resize subscription.
    pub(crate) fn finish(self) -> u32 {
        let width_px = self.viewport_width_px();
        self.carousel.teardown();
        width_px
    }
}

/// Feeds lines from `input` to the session until `quit` or end of input.
pub(crate) fn run_shell<S, R, W>(
    session: &mut ShellSession<S>,
    input: R,
    output: &mut W,
) -> io::Result<()>
where
    S: KeyValueStorage,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", session.render().join("\n"))?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => match session.execute(command) {
                ShellOutcome::Continue(lines) => {
                    for line in lines {
                        writeln!(output, "{}", line)?;
                    }
                }
                ShellOutcome::Quit => break,
            },
            Err(err) => writeln!(output, "error: {}", err)?,
        }
        output.flush()?;
    }
    Ok(())
}

fn describe_load_status(status: &LoadStatus) -> String {
    match status {
        LoadStatus::Restored {
            count,
            dropped_duplicates,
        } if *dropped_duplicates > 0 => format!(
            "restored {} favorites ({} duplicates dropped)",
            count, dropped_duplicates
        ),
        LoadStatus::Restored { count, .. } => format!("restored {} favorites", count),
        LoadStatus::Empty => "no saved favorites".to_string(),
        LoadStatus::Recovered { reason } => {
            format!("saved favorites were unreadable, starting empty ({})", reason)
        }
    }
}

/// Owns startup wiring and runs the shell on stdin/stdout.
pub(crate) struct AppRuntime {
    config: Config,
    config_file: PathBuf,
    session: ShellSession<Box<dyn KeyValueStorage>>,
}

impl AppRuntime {
    /// Loads config, opens favorites storage and builds the session.
    pub(crate) fn build() -> Result<Self, Box<dyn std::error::Error>> {
        let config_root = dirs::config_dir()
            .ok_or("No config directory available on this platform")?
            .join("marquee");
        let config_file = config_root.join("config.toml");

        if let Err(err) = std::fs::create_dir_all(&config_root) {
            return Err(format!(
                "Failed to create config directory {}: {}",
                config_root.display(),
                err
            )
            .into());
        }

        let config = load_config_file(&config_file);
        let data_dir = dirs::data_dir().map(|dir| dir.join("marquee"));
        let storage = match open_favorites_storage(&config.favorites, data_dir.as_deref()) {
            Ok(storage) => storage,
            Err(err) => {
                warn!(
                    "Favorites storage unavailable ({}). Favorites will not survive this session.",
                    err
                );
                Box::new(MemoryStorage::new())
            }
        };
        let favorites = FavoritesStore::load(storage, config.favorites.storage_key.clone());
        info!(
            "Favorites '{}': {}",
            favorites.storage_key(),
            describe_load_status(favorites.load_status())
        );

        let (bus_sender, _) = broadcast::channel(BUS_CAPACITY);
        let session = ShellSession::new(&config, favorites, bus_sender);

        Ok(Self {
            config,
            config_file,
            session,
        })
    }

    /// Runs the shell, then remembers the final viewport width.
    pub(crate) fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Self {
            mut config,
            config_file,
            mut session,
        } = self;

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        run_shell(&mut session, stdin.lock(), &mut stdout)?;

        config.ui.window_width = session.finish();
        persist_config_file(&config, &config_file);

        info!("Application exiting");
        Ok(())
    }
}
