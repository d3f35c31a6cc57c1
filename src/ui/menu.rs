//! The "File" menu overlaid on the top-left corner of the window
//!
//! iced has no native menu bar, so this is a text button that toggles a
//! small bordered panel of entries.
use iced::widget::{button, column, container, horizontal_rule, horizontal_space, row, text};
use iced::{Element, Length};

use crate::Message;

/// Shortcut label shown next to "Open..."
#[cfg(target_os = "macos")]
const OPEN_SHORTCUT: &str = "Cmd+O";
#[cfg(not(target_os = "macos"))]
const OPEN_SHORTCUT: &str = "Ctrl+O";

/// Build the menu, expanded when `open` is set
pub fn view(open: bool) -> Element<'static, Message> {
    let title = button(text("File").size(13))
        .padding([2, 8])
        .style(button::text)
        .on_press(Message::ToggleMenu);

    let mut menu = column![title];

    if open {
        let entries = column![
            entry("Open...", OPEN_SHORTCUT, Message::Open),
            horizontal_rule(1),
            entry("Exit", "", Message::Exit),
        ]
        .width(Length::Fixed(150.0));

        menu = menu.push(container(entries).padding(2).style(container::bordered_box));
    }

    menu.into()
}

fn entry(label: &'static str, shortcut: &'static str, message: Message) -> Element<'static, Message> {
    button(row![text(label).size(13), horizontal_space(), text(shortcut).size(11)])
        .width(Length::Fill)
        .padding([3, 8])
        .style(button::text)
        .on_press(message)
        .into()
}
