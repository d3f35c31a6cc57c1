use iced::widget::stack;
use iced::{event, keyboard, mouse, window, Element, Event, Size, Subscription, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod hdr;
mod state;
mod ui;

use state::surface::{DragEvent, Effect, Surface, PLACEHOLDER_SIZE};
use state::watch::{self, WatchEvent};

/// Main application state
struct HdrViewer {
    /// The single image-bearing surface
    surface: Surface,
    /// Whether the File menu is expanded
    menu_open: bool,
    /// The menu is only drawn while the cursor is over the window
    cursor_inside: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked the "File" menu title
    ToggleMenu,
    /// "Open..." menu entry or Ctrl+O
    Open,
    /// "Exit" menu entry
    Exit,
    /// Cursor entered (true) or left (false) the window
    CursorInside(bool),
    /// Files hovered over / dropped on the window
    Drag(DragEvent),
    /// The watched file changed or disappeared
    Watch(WatchEvent),
}

impl HdrViewer {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        info!("🎨 {} started", config::WINDOW_TITLE);

        (
            HdrViewer {
                surface: Surface::new(),
                menu_open: false,
                cursor_inside: false,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ToggleMenu => {
                self.menu_open = !self.menu_open;
                Task::none()
            }
            Message::Open => {
                self.menu_open = false;
                self.open()
            }
            Message::Exit => {
                info!("👋 Exiting");
                iced::exit()
            }
            Message::CursorInside(inside) => {
                self.cursor_inside = inside;
                if !inside {
                    self.menu_open = false;
                }
                Task::none()
            }
            Message::Drag(event) => {
                let effect = self.surface.handle_drag(event);
                apply(effect)
            }
            Message::Watch(event) => {
                let effect = self.surface.handle_watch(event);
                apply(effect)
            }
        }
    }

    /// Show the open dialog and load the chosen file
    fn open(&mut self) -> Task<Message> {
        let Some(path) = pick_hdr_file() else {
            return Task::none();
        };

        match self.surface.load(&path) {
            Ok(effect) => apply(Some(effect)),
            Err(err) => {
                warn!("⚠️  {}", err);
                show_load_failure(err.path());
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let surface = ui::surface::view(&self.surface);

        // Keep the whole image visible unless the user is pointing at the window
        if self.cursor_inside {
            stack![surface, ui::menu::view(self.menu_open)].into()
        } else {
            surface
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let window_events = event::listen_with(window_event);
        let shortcuts = keyboard::on_key_press(shortcut);
        let watcher = match self.surface.watch_target() {
            Some(target) => watch::subscription(target).map(Message::Watch),
            None => Subscription::none(),
        };

        Subscription::batch([window_events, shortcuts, watcher])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Turn a surface effect into window work
fn apply(effect: Option<Effect>) -> Task<Message> {
    match effect {
        Some(Effect::SizeChanged(size)) => resize_window(size),
        None => Task::none(),
    }
}

/// Resize the main window to exactly `size`
fn resize_window(size: Size<u32>) -> Task<Message> {
    info!("📐 Resizing window to {}x{}", size.width, size.height);
    let size = Size::new(size.width as f32, size.height as f32);
    window::get_latest().and_then(move |id| window::resize(id, size))
}

/// Map file drag and cursor presence events
fn window_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Mouse(mouse::Event::CursorEntered) => Some(Message::CursorInside(true)),
        Event::Mouse(mouse::Event::CursorLeft) => Some(Message::CursorInside(false)),
        Event::Window(window::Event::FileHovered(_)) => Some(Message::Drag(DragEvent::Entered)),
        Event::Window(window::Event::FilesHoveredLeft) => Some(Message::Drag(DragEvent::Left)),
        Event::Window(window::Event::FileDropped(path)) => {
            Some(Message::Drag(DragEvent::Dropped(path)))
        }
        _ => None,
    }
}

/// Ctrl+O (Cmd+O on macOS) opens a file
fn shortcut(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    match key.as_ref() {
        keyboard::Key::Character("o") | keyboard::Key::Character("O") if modifiers.command() => {
            Some(Message::Open)
        }
        _ => None,
    }
}

/// Native open dialog filtered to HDR images, starting in the working directory
fn pick_hdr_file() -> Option<PathBuf> {
    let mut dialog = FileDialog::new()
        .set_title("Open File")
        .add_filter(config::DIALOG_FILTER_NAME, config::HDR_EXTENSIONS);

    if let Ok(cwd) = std::env::current_dir() {
        dialog = dialog.set_directory(cwd);
    }

    dialog.pick_file()
}

fn load_failure_text(path: &Path) -> String {
    format!("Failed to load {}", path.display())
}

/// Blocking information box naming the file that failed to load
fn show_load_failure(path: &Path) {
    MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(config::WINDOW_TITLE)
        .set_description(load_failure_text(path))
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> iced::Result {
    init_logging();

    iced::application(config::WINDOW_TITLE, HdrViewer::update, HdrViewer::view)
        .subscription(HdrViewer::subscription)
        .theme(HdrViewer::theme)
        .window(window::Settings {
            size: Size::new(PLACEHOLDER_SIZE.width as f32, PLACEHOLDER_SIZE.height as f32),
            resizable: false,
            level: window::Level::AlwaysOnTop,
            ..window::Settings::default()
        })
        .run_with(HdrViewer::new)
}
