use iced::widget::image as image_widget;
use iced::widget::{button, checkbox, column, container, row, scrollable, text, Column, Space};
use iced::{Alignment, Color, Element, Length, Task, Theme};
use log::{error, info, warn};
use rfd::FileDialog;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod lut;
mod state;

use config::Settings;
use error::LutError;
use lut::compute::CpuLutCompute;
use lut::loader::{decode_data_uri, load_image, FsReader};
use lut::tree::{scan_lut_tree_async, TreeScan};
use lut::ApplyPipeline;
use state::data::{FolderNode, ImageRef};
use state::library::LutLibrary;
use state::session::{Click, LutSession};

type Pipeline = ApplyPipeline<FsReader, CpuLutCompute>;

const ERROR_COLOR: Color = Color {
    r: 0.9,
    g: 0.35,
    b: 0.35,
    a: 1.0,
};

/// Main application state
struct LutPanel {
    settings: Settings,
    /// Remembered LUT folders (None if the catalog could not be opened)
    library: Option<LutLibrary>,
    /// Folder trees and expanded folders
    session: LutSession,
    /// Apply pipeline for the open image
    pipeline: Option<Arc<Pipeline>>,
    /// Path of the open image, used to remember the applied LUT
    image_path: Option<String>,
    /// Bumped every time an image is opened; results for older images are dropped
    image_session: u64,
    /// Decoded preview for display
    preview: Option<image_widget::Handle>,
    /// True while a LUT request is in flight; clicks on LUTs are ignored meanwhile
    applying: bool,
    lut_active: bool,
    favorites: BTreeSet<String>,
    /// Status message to display to the user
    status: String,
    status_is_error: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Add LUT Folder"
    AddLutFolder,
    /// Background scan of a LUT folder finished
    FolderScanned(PathBuf, Arc<Result<TreeScan, LutError>>),
    /// User clicked ✕ next to a LUT folder
    RemoveFolder(String),
    ShowHiddenToggled(bool),
    /// User clicked "Open Image"
    OpenImage,
    ImageLoaded(String, Result<ImageRef, Arc<LutError>>),
    /// The pipeline now works on the image of this session
    SessionStarted(u64),
    /// User clicked an entry of the LUT tree
    TreeClicked(String),
    LutApplied {
        session: u64,
        lut_path: String,
        result: Result<ImageRef, Arc<LutError>>,
    },
    /// User clicked "Remove LUT"
    RemoveLut,
    LutRemoved(u64, ImageRef),
    ToggleFavorite(String),
}

impl LutPanel {
    fn new(settings: Settings) -> (Self, Task<Message>) {
        let library = match LutLibrary::new() {
            Ok(library) => Some(library),
            Err(e) => {
                error!("❌ Could not open LUT catalog: {}", e);
                None
            }
        };

        Self::with_library(settings, library)
    }

    fn with_library(settings: Settings, library: Option<LutLibrary>) -> (Self, Task<Message>) {
        let mut startup = Vec::new();
        let mut favorites = BTreeSet::new();

        if let Some(library) = &library {
            // Re-scan the folders added in earlier sessions
            if settings.restore_folders {
                if let Err(e) = library.verify_folders() {
                    warn!("⚠️  Could not verify LUT folders: {}", e);
                }
                match library.folders() {
                    Ok(folders) => {
                        for folder in folders {
                            startup.push(scan_task(PathBuf::from(folder), settings.clone()));
                        }
                    }
                    Err(e) => warn!("⚠️  Could not read LUT folders: {}", e),
                }
            }

            match library.favorites() {
                Ok(saved) => favorites.extend(saved),
                Err(e) => warn!("⚠️  Could not read favorites: {}", e),
            }
        }

        let status = match &library {
            Some(_) => format!("Ready. {} LUT folders.", startup.len()),
            None => "Ready. LUT folders will not be remembered.".to_string(),
        };

        let panel = LutPanel {
            settings,
            library,
            session: LutSession::new(),
            pipeline: None,
            image_path: None,
            image_session: 0,
            preview: None,
            applying: false,
            lut_active: false,
            favorites,
            status,
            status_is_error: false,
        };

        (panel, Task::batch(startup))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::AddLutFolder => {
                let folder = FileDialog::new()
                    .set_title("Select LUT Folder")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.set_status(format!("Scanning {}...", folder_path.display()));
                    return scan_task(folder_path, self.settings.clone());
                }

                Task::none()
            }
            Message::FolderScanned(folder, result) => {
                match result.as_ref() {
                    Ok(scan) => {
                        if let Some(library) = &self.library {
                            if let Err(e) = library.add_folder(&scan.root.path) {
                                warn!("⚠️  Could not remember folder {}: {}", scan.root.path, e);
                            }
                        }

                        if scan.is_partial() {
                            warn!("⚠️  {} paths skipped in {}", scan.warnings.len(), folder.display());
                            if let Some(first) = scan.warnings.first() {
                                self.report(first);
                            }
                        } else {
                            self.set_status(format!("Loaded {}", folder.display()));
                        }
                        self.session.set_tree(scan.root.clone());
                    }
                    Err(e) => {
                        error!("❌ Failed to load folder tree {}: {}", folder.display(), e);
                        self.report(e);
                    }
                }
                Task::none()
            }
            Message::RemoveFolder(root_path) => {
                if self.session.remove_folder(&root_path) {
                    if let Some(library) = &self.library {
                        if let Err(e) = library.remove_folder(&root_path) {
                            warn!("⚠️  Could not forget folder {}: {}", root_path, e);
                        }
                    }
                    self.set_status(format!("Removed {}", root_path));
                }
                Task::none()
            }
            Message::ShowHiddenToggled(show_hidden) => {
                self.settings.show_hidden = show_hidden;
                if let Some(path) = Settings::default_path() {
                    if let Err(e) = self.settings.save_to(&path) {
                        warn!("⚠️  {}", e);
                    }
                }

                // The filter is applied while scanning, so every folder is scanned again
                let rescans: Vec<_> = self
                    .session
                    .roots()
                    .iter()
                    .map(|root| scan_task(PathBuf::from(&root.path), self.settings.clone()))
                    .collect();
                Task::batch(rescans)
            }
            Message::OpenImage => {
                if self.applying {
                    return Task::none();
                }
                let file = FileDialog::new()
                    .set_title("Select Image")
                    .add_filter("Images", &["png", "jpg", "jpeg", "tif", "tiff", "webp"])
                    .pick_file();

                if let Some(path) = file {
                    let path = path.to_string_lossy().into_owned();
                    return Task::perform(
                        async move {
                            let result = load_image(&FsReader, &path).await.map_err(Arc::new);
                            (path, result)
                        },
                        |(path, result)| Message::ImageLoaded(path, result),
                    );
                }

                Task::none()
            }
            Message::ImageLoaded(path, Ok(image)) => {
                // A LUT still in flight now belongs to the previous image
                self.image_session += 1;
                let session = self.image_session;
                self.image_path = Some(path);
                self.show_preview(&image);
                self.lut_active = false;

                match &self.pipeline {
                    Some(pipeline) => {
                        let pipeline = Arc::clone(pipeline);
                        Task::perform(async move { pipeline.set_image(image).await }, move |_| {
                            Message::SessionStarted(session)
                        })
                    }
                    None => {
                        self.pipeline = Some(Arc::new(ApplyPipeline::new(FsReader, CpuLutCompute, image)));
                        Task::done(Message::SessionStarted(session))
                    }
                }
            }
            Message::ImageLoaded(_, Err(e)) => {
                self.report(&e);
                Task::none()
            }
            Message::SessionStarted(session) => {
                if session != self.image_session {
                    return Task::none();
                }
                self.set_status("Image loaded. Pick a LUT to preview it.");

                // Bring back the LUT this image had last time
                match self.saved_lut() {
                    Some(lut_path) => {
                        info!("🔁 Restoring {} for {:?}", lut_path, self.image_path);
                        self.apply_lut(lut_path)
                    }
                    None => Task::none(),
                }
            }
            Message::TreeClicked(path) => match self.session.click(&path) {
                Some(Click::Asset(lut_path)) => self.apply_lut(lut_path),
                Some(Click::Toggled { .. }) | None => Task::none(),
            },
            Message::LutApplied {
                session,
                lut_path,
                result,
            } => {
                self.applying = false;
                if session != self.image_session {
                    info!("⏭️  Dropping {} result for a previous image", lut_path);
                    return Task::none();
                }

                match result {
                    Ok(preview) => {
                        self.show_preview(&preview);
                        self.lut_active = true;
                        self.set_status(format!("Applied {}", lut_path));
                        if let (Some(library), Some(image_path)) = (&self.library, &self.image_path) {
                            if let Err(e) = library.save_applied_lut(image_path, &lut_path) {
                                warn!("⚠️  Could not remember applied LUT: {}", e);
                            }
                        }
                    }
                    Err(e) => self.report(&e),
                }
                Task::none()
            }
            Message::RemoveLut => {
                if self.applying {
                    return Task::none();
                }
                let Some(pipeline) = self.pipeline.as_ref().map(Arc::clone) else {
                    return Task::none();
                };
                let session = self.image_session;
                Task::perform(async move { pipeline.revert().await }, move |image| {
                    Message::LutRemoved(session, image)
                })
            }
            Message::LutRemoved(session, image) => {
                if session != self.image_session {
                    return Task::none();
                }
                self.show_preview(&image);
                self.lut_active = false;
                self.set_status("LUT removed.");
                if let (Some(library), Some(image_path)) = (&self.library, &self.image_path) {
                    if let Err(e) = library.clear_applied_lut(image_path) {
                        warn!("⚠️  Could not forget applied LUT: {}", e);
                    }
                }
                Task::none()
            }
            Message::ToggleFavorite(lut_path) => {
                let Some(library) = &self.library else {
                    return Task::none();
                };
                match library.toggle_favorite(&lut_path) {
                    Ok(true) => {
                        self.set_status(format!("⭐ {} added to favorites", lut_path));
                        self.favorites.insert(lut_path);
                    }
                    Ok(false) => {
                        self.set_status(format!("{} removed from favorites", lut_path));
                        self.favorites.remove(&lut_path);
                    }
                    Err(e) => self.report(&LutError::from(e)),
                }
                Task::none()
            }
        }
    }

    /// Send a LUT to the pipeline, one request at a time
    fn apply_lut(&mut self, lut_path: String) -> Task<Message> {
        if self.applying {
            info!("⏳ Ignoring {} while a LUT is being applied", lut_path);
            return Task::none();
        }
        let Some(pipeline) = self.pipeline.as_ref().map(Arc::clone) else {
            self.set_status("Open an image before applying a LUT.");
            return Task::none();
        };

        self.applying = true;
        self.set_status(format!("Applying {}...", lut_path));
        let session = self.image_session;

        Task::perform(
            async move {
                let result = pipeline.apply(&lut_path).await.map_err(Arc::new);
                (lut_path, result)
            },
            move |(lut_path, result)| Message::LutApplied {
                session,
                lut_path,
                result,
            },
        )
    }

    fn saved_lut(&self) -> Option<String> {
        let library = self.library.as_ref()?;
        let image_path = self.image_path.as_ref()?;
        match library.applied_lut(image_path) {
            Ok(lut_path) => lut_path,
            Err(e) => {
                warn!("⚠️  Could not read applied LUT: {}", e);
                None
            }
        }
    }

    fn show_preview(&mut self, image: &ImageRef) {
        match decode_data_uri(image.as_str()) {
            Ok(bytes) => self.preview = Some(image_widget::Handle::from_bytes(bytes)),
            Err(e) => warn!("⚠️  Could not display preview: {}", e),
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_is_error = false;
    }

    /// Show an error in the status line; warnings keep the normal color
    fn report(&mut self, e: &LutError) {
        self.status = e.user_message();
        self.status_is_error = e.is_user_fatal();
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let toolbar = row![
            text("LUT Processing").size(24),
            button("Add LUT Folder").on_press(Message::AddLutFolder).padding(8),
            button("Open Image").on_press(Message::OpenImage).padding(8),
            button("Remove LUT")
                .on_press_maybe(self.lut_active.then_some(Message::RemoveLut))
                .padding(8),
            checkbox("Show hidden", self.settings.show_hidden).on_toggle(Message::ShowHiddenToggled),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let tree: Element<Message> = if self.session.roots().is_empty() {
            text("No LUT folders selected. Please add a folder to start.").into()
        } else {
            scrollable(self.tree_view()).width(Length::Fixed(320.0)).into()
        };

        let preview: Element<Message> = match &self.preview {
            Some(handle) => image_widget(handle.clone()).width(Length::Fill).into(),
            None => text("No image open.").into(),
        };

        let status = text(&self.status).size(16);
        let status = if self.status_is_error {
            status.color(ERROR_COLOR)
        } else {
            status
        };

        let content = column![
            toolbar,
            row![tree, preview].spacing(20).height(Length::Fill),
            status,
        ]
        .spacing(20)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Visible tree rows: roots plus the children of expanded folders
    fn tree_view(&self) -> Column<Message> {
        let roots = self.session.roots();
        let mut rows = Column::new().spacing(2);
        let mut stack: Vec<(&FolderNode, usize)> = roots.iter().rev().map(|root| (root.as_ref(), 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            let expanded = self.session.is_expanded(&node.path);
            let label = match (node.is_dir, expanded) {
                (true, true) => format!("▾ 📂 {}", node.name),
                (true, false) => format!("▸ 📁 {}", node.name),
                (false, _) => format!("🎨 {}", node.name),
            };

            let mut entry = row![
                Space::with_width(Length::Fixed(depth as f32 * 16.0)),
                button(text(label))
                    .on_press(Message::TreeClicked(node.path.clone()))
                    .padding([2, 6]),
            ]
            .spacing(4);

            if depth == 0 {
                entry = entry.push(
                    button(text("✕"))
                        .on_press(Message::RemoveFolder(node.path.clone()))
                        .padding([2, 4]),
                );
            } else if !node.is_dir {
                let star = if self.favorites.contains(&node.path) { "★" } else { "☆" };
                entry = entry.push(
                    button(text(star))
                        .on_press(Message::ToggleFavorite(node.path.clone()))
                        .padding([2, 4]),
                );
            }
            rows = rows.push(entry);

            if node.is_dir && expanded {
                stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
            }
        }

        rows
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Scan a LUT folder in the background
fn scan_task(folder: PathBuf, settings: Settings) -> Task<Message> {
    let target = folder.clone();
    Task::perform(scan_lut_tree_async(folder, settings), move |result| {
        Message::FolderScanned(target.clone(), Arc::new(result))
    })
}

fn main() -> iced::Result {
    let settings = Settings::load();
    if let Err(e) = logging::init_logging(&settings.log_level) {
        eprintln!("⚠️  Logging disabled: {}", e);
    }
    info!("🎨 LUT panel starting");

    iced::application("LUT Panel", LutPanel::update, LutPanel::view)
        .theme(LutPanel::theme)
        .centered()
        .run_with(move || LutPanel::new(settings))
}
