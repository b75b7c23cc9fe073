//! Render surface — message bubbles, composer, loading and error overlays
//!
//! Bubble side follows the author and the panel layout; text alignment inside
//! a bubble follows the direction detected from its own text.

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::Frame;

use super::composer::Composer;
use crate::chat::{ColorScheme, Role, UiMessage};
use crate::direction::{detect_direction, Direction};
use crate::panel::{BlockingError, BubbleLayout, PanelState};

/// Shown while the session is being established
pub const LOADING_TEXT: &str = "טוען שיחה...";
/// Bubble shown while the assistant is responding
pub const TYPING_INDICATOR: &str = "…";

const COMPOSER_PLACEHOLDER: &str = "כתבו הודעה";
const BUBBLE_WIDTH_PERCENT: u16 = 75;
const MIN_BUBBLE_WIDTH: u16 = 12;

const USER_BUBBLE: Color = Color::Rgb(0xDC, 0xF8, 0xC6);
const ASSISTANT_BUBBLE: Color = Color::Rgb(0xF1, 0xF1, 0xF1);
const ACCENT: Color = Color::Rgb(0x26, 0x2F, 0x5A);

/// Everything one frame needs
pub struct PanelView<'a> {
    pub state: &'a PanelState,
    pub messages: &'a [UiMessage],
    pub composer: &'a Composer,
    pub layout: BubbleLayout,
    pub color_scheme: ColorScheme,
    pub streaming: bool,
}

// ============================================================================
// Placement
// ============================================================================

/// Which edge of the thread a bubble hugs.
pub fn bubble_side(role: Role, layout: BubbleLayout) -> Alignment {
    match (layout, role) {
        (BubbleLayout::Rtl, _) => Alignment::Right,
        (BubbleLayout::Ltr, Role::User) => Alignment::Right,
        (BubbleLayout::Ltr, Role::Assistant) => Alignment::Left,
    }
}

/// Alignment of text within its bubble.
pub fn text_alignment(direction: Direction) -> Alignment {
    match direction {
        Direction::Rtl => Alignment::Right,
        Direction::Ltr => Alignment::Left,
    }
}

fn bubble_width(available: u16) -> u16 {
    let width = available.saturating_mul(BUBBLE_WIDTH_PERCENT) / 100;
    width.max(MIN_BUBBLE_WIDTH).min(available)
}

fn bubble_rect(area: Rect, side: Alignment, width: u16, y: u16, height: u16) -> Rect {
    let x = match side {
        Alignment::Right => area.right().saturating_sub(width),
        _ => area.x,
    };
    Rect::new(x, y, width, height)
}

fn surface_style(scheme: ColorScheme) -> Style {
    match scheme {
        ColorScheme::Light => Style::default().bg(Color::White).fg(Color::Black),
        ColorScheme::Dark => Style::default()
            .bg(Color::Rgb(0x0F, 0x17, 0x2A))
            .fg(Color::Rgb(0xE2, 0xE8, 0xF0)),
    }
}

fn bubble<'a>(role: Role, text: &'a str) -> Paragraph<'a> {
    let fill = match role {
        Role::User => USER_BUBBLE,
        Role::Assistant => ASSISTANT_BUBBLE,
    };
    Paragraph::new(text)
        .alignment(text_alignment(detect_direction(text)))
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(fill).fg(Color::Black))
        .block(Block::default().padding(Padding::horizontal(1)))
}

// ============================================================================
// Drawing
// ============================================================================

pub fn draw(frame: &mut Frame, view: &PanelView) {
    let area = frame.area();
    frame.render_widget(Block::default().style(surface_style(view.color_scheme)), area);

    if let Some(error) = view.state.blocking_error() {
        draw_error(frame, area, &error);
        return;
    }
    if !view.state.is_live() {
        draw_loading(frame, area);
        return;
    }

    let [thread, composer] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(area);
    draw_thread(frame, thread, view);
    draw_composer(frame, composer, view.composer);
}

/// Stack bubbles upward from the bottom of `area`, newest last.
fn draw_thread(frame: &mut Frame, area: Rect, view: &PanelView) {
    let width = bubble_width(area.width);
    let mut bubbles: Vec<(Alignment, Paragraph)> = view
        .messages
        .iter()
        .map(|m| (bubble_side(m.role, view.layout), bubble(m.role, &m.text)))
        .collect();
    if view.streaming {
        bubbles.push((
            bubble_side(Role::Assistant, view.layout),
            bubble(Role::Assistant, TYPING_INDICATOR),
        ));
    }

    let mut bottom = area.bottom();
    for (side, paragraph) in bubbles.into_iter().rev() {
        if bottom <= area.y {
            break;
        }
        let lines = paragraph.line_count(width.saturating_sub(2));
        let full = u16::try_from(lines).unwrap_or(u16::MAX);
        let height = full.min(bottom - area.y);
        let top = bottom - height;
        // Clipped bubbles keep their last lines visible
        let paragraph = paragraph.scroll((full - height, 0));
        frame.render_widget(paragraph, bubble_rect(area, side, width, top, height));
        bottom = top.saturating_sub(1);
    }
}

fn draw_composer(frame: &mut Frame, area: Rect, composer: &Composer) {
    let (title, border) = if composer.is_sending() {
        (" שולח… ", Style::default().fg(Color::DarkGray))
    } else {
        (" שלח ⏎ ", Style::default().fg(ACCENT))
    };
    let line = if composer.input().is_empty() {
        Line::from(Span::styled(
            COMPOSER_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(composer.input())
    };
    let mut style = Style::default();
    if composer.is_sending() {
        style = style.add_modifier(Modifier::DIM);
    }

    let input = Paragraph::new(line)
        .alignment(text_alignment(detect_direction(composer.input())))
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border)
                .title(Line::from(title).alignment(Alignment::Right)),
        );
    frame.render_widget(input, area);
}

fn draw_loading(frame: &mut Frame, area: Rect) {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(area);
    let loading = Paragraph::new(LOADING_TEXT)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::ITALIC));
    frame.render_widget(loading, middle);
}

/// The blocking error replaces the surface entirely.
fn draw_error(frame: &mut Frame, area: Rect, error: &BlockingError) {
    let width = area.width.saturating_sub(4).min(60);
    let [_, column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, card, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(7),
        Constraint::Fill(1),
    ])
    .areas(column);

    let mut lines = vec![
        Line::from(error.message.as_str()).alignment(text_alignment(detect_direction(
            &error.message,
        ))),
        Line::default(),
    ];
    let hint = if error.retryable {
        "[r] Restart chat   [q] Quit"
    } else {
        "[q] Quit"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(ACCENT))));

    let overlay = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Red))
                .title(" Chat unavailable ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(Clear, card);
    frame.render_widget(overlay, card);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use crate::panel::PanelEvent;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn live_state() -> PanelState {
        let mut state = PanelState::new(true);
        let generation = state.generation();
        state.apply(generation, PanelEvent::CredentialObtained);
        state.apply(generation, PanelEvent::WidgetReady);
        assert!(state.is_live());
        state
    }

    fn message(id: &str, role: Role, text: &str) -> UiMessage {
        UiMessage {
            id: id.into(),
            role,
            text: text.into(),
        }
    }

    fn render(view: &PanelView) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(40, 16)).unwrap();
        terminal.draw(|frame| draw(frame, view)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn view<'a>(
        state: &'a PanelState,
        messages: &'a [UiMessage],
        composer: &'a Composer,
    ) -> PanelView<'a> {
        PanelView {
            state,
            messages,
            composer,
            layout: BubbleLayout::Ltr,
            color_scheme: ColorScheme::Light,
            streaming: false,
        }
    }

    #[test]
    fn test_bubble_side_by_role_and_layout() {
        assert_eq!(bubble_side(Role::User, BubbleLayout::Ltr), Alignment::Right);
        assert_eq!(bubble_side(Role::Assistant, BubbleLayout::Ltr), Alignment::Left);
        assert_eq!(bubble_side(Role::User, BubbleLayout::Rtl), Alignment::Right);
        assert_eq!(bubble_side(Role::Assistant, BubbleLayout::Rtl), Alignment::Right);
    }

    #[test]
    fn test_text_alignment_follows_direction() {
        assert_eq!(text_alignment(detect_direction("שלום")), Alignment::Right);
        assert_eq!(text_alignment(detect_direction("hello")), Alignment::Left);
    }

    #[test]
    fn test_bubble_width_bounds() {
        assert_eq!(bubble_width(40), 30);
        assert_eq!(bubble_width(10), 10);
        assert_eq!(bubble_width(14), 12);
    }

    #[test]
    fn test_loading_until_live() {
        let state = PanelState::new(true);
        let composer = Composer::default();
        let rows = render(&view(&state, &[], &composer));
        assert!(rows.iter().any(|row| row.contains(LOADING_TEXT)));
    }

    #[test]
    fn test_messages_placed_by_role() {
        let state = live_state();
        let composer = Composer::default();
        let messages = vec![
            message("1", Role::User, "ping"),
            message("2", Role::Assistant, "pong"),
        ];
        let rows = render(&view(&state, &messages, &composer));

        let user_row = rows.iter().find(|row| row.contains("ping")).unwrap();
        let assistant_row = rows.iter().find(|row| row.contains("pong")).unwrap();
        // User bubble starts past the left quarter, assistant bubble hugs the left edge
        assert!(user_row.find("ping").unwrap() >= 10);
        assert!(assistant_row.find("pong").unwrap() <= 2);

        let user_y = rows.iter().position(|row| row.contains("ping")).unwrap();
        let assistant_y = rows.iter().position(|row| row.contains("pong")).unwrap();
        assert!(user_y < assistant_y);
    }

    #[test]
    fn test_streaming_shows_indicator() {
        let state = live_state();
        let composer = Composer::default();
        let messages = vec![message("1", Role::User, "ping")];
        let mut panel = view(&state, &messages, &composer);
        panel.streaming = true;
        let rows = render(&panel);
        assert!(rows.iter().any(|row| row.contains(TYPING_INDICATOR)));
    }

    #[test]
    fn test_retryable_error_offers_restart() {
        let mut state = live_state();
        let generation = state.generation();
        state.apply(generation, PanelEvent::WidgetError("stream lost".into()));
        let composer = Composer::default();
        let rows = render(&view(&state, &[], &composer));

        assert!(rows.iter().any(|row| row.contains("stream lost")));
        assert!(rows.iter().any(|row| row.contains("[r] Restart")));
    }

    #[test]
    fn test_configuration_error_has_no_restart() {
        let mut state = PanelState::new(true);
        let generation = state.generation();
        state.apply(
            generation,
            PanelEvent::CredentialFailed(PanelError::Configuration("Set it".into())),
        );
        let composer = Composer::default();
        let rows = render(&view(&state, &[], &composer));

        assert!(rows.iter().any(|row| row.contains("Set it")));
        assert!(!rows.iter().any(|row| row.contains("[r] Restart")));
    }
}
