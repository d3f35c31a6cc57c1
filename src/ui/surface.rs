//! Rendering of the display surface
use iced::widget::{container, Image, Space};
use iced::{Background, ContentFit, Element, Length, Theme};

use crate::state::surface::Surface;
use crate::Message;

/// The image stretched over the whole client area, or an empty area
/// while nothing is loaded
pub fn view(surface: &Surface) -> Element<'_, Message> {
    let content: Element<'_, Message> = match surface.handle() {
        Some(handle) => Image::new(handle.clone())
            .width(Length::Fill)
            .height(Length::Fill)
            .content_fit(ContentFit::Fill)
            .into(),
        None => Space::new(Length::Fill, Length::Fill).into(),
    };

    let highlighted = surface.is_highlighted();

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .style(move |theme: &Theme| {
            let palette = theme.extended_palette();
            let color = if highlighted {
                palette.primary.weak.color
            } else {
                palette.background.base.color
            };

            container::Style {
                background: Some(Background::Color(color)),
                ..container::Style::default()
            }
        })
        .into()
}
