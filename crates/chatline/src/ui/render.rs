use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use serde_json::Value;

use crate::app::{ChatTab, ChatWidget};
use crate::infra::tab_store::{StoreKey, TabDataStore};
use crate::ui::components::chat_list::ChatList;
use crate::ui::components::footer_bar::{CharacterCount, FooterBar};
use crate::ui::components::prompt_input::PromptInputBox;
use crate::ui::components::quick_pick::QuickPickList;
use crate::ui::components::tab_bar::{TabBar, TabLabel};
use crate::ui::components::top_bar::TopBarLine;
use crate::ui::state::overlay::OverlayContent;
use crate::ui::util::{compute_prompt_layout, prompt_height, wrap_text};

/// A trait for UI components that enforces a standard rendering interface.
pub trait Component {
    /// Renders a component in the provided frame and area.
    fn render(&self, f: &mut Frame, area: Rect);
}

/// Renders a complete frame: tab bar, conversation, prompt and controls.
pub fn render(f: &mut Frame, widget: &ChatWidget) {
    let area = f.area();
    let outer_chunks = Layout::default()
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    TabBar::new(tab_labels(widget)).render(f, outer_chunks[0]);

    let (Some(tab_id), Some(tab)) = (widget.selected_tab_id(), widget.selected_tab()) else {
        render_empty_state(f, outer_chunks[1]);

        return;
    };
    let Some(store) = widget.services().tabs.tab_store(&tab_id) else {
        render_empty_state(f, outer_chunks[1]);

        return;
    };

    render_tab(f, outer_chunks[1], widget, tab, &store);
}

fn tab_labels(widget: &ChatWidget) -> Vec<TabLabel> {
    let selected_tab_id = widget.selected_tab_id();

    widget
        .tab_ids()
        .into_iter()
        .map(|tab_id| {
            let store = widget.services().tabs.tab_store(&tab_id);

            TabLabel {
                is_loading: store
                    .as_ref()
                    .is_some_and(|store| store.get_bool(StoreKey::LoadingChat)),
                is_selected: selected_tab_id.as_deref() == Some(tab_id.as_str()),
                title: store
                    .map(|store| store.get_string(StoreKey::TabTitle))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn render_empty_state(f: &mut Frame, area: Rect) {
    let hint = Paragraph::new(Line::from(Span::styled(
        " No open tabs. Press Ctrl+T to start a chat.",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(hint, area);
}

fn render_tab(f: &mut Frame, area: Rect, widget: &ChatWidget, tab: &ChatTab, store: &TabDataStore) {
    let prompt_input = tab.prompt_input();
    let text_input = prompt_input.text_input();
    let texts = &widget.services().config.texts;

    let is_prompt_visible = store.get(StoreKey::PromptInputVisible) != Value::Bool(false);
    let info_lines = notice_lines(store, area.width);
    let top_bar_height = u16::from(!prompt_input.top_bar().is_hidden());
    let prompt_area_height = if is_prompt_visible {
        let line_count = compute_prompt_layout(text_input.document(), area.width)
            .lines
            .len();
        prompt_height(line_count)
    } else {
        0
    };

    let chunks = Layout::default()
        .constraints([
            Constraint::Min(3),
            Constraint::Length(u16::try_from(info_lines.len()).unwrap_or(u16::MAX)),
            Constraint::Length(top_bar_height),
            Constraint::Length(prompt_area_height),
            Constraint::Length(1),
        ])
        .split(area);
    let (chat_area, info_area, top_bar_area, prompt_area, footer_area) =
        (chunks[0], chunks[1], chunks[2], chunks[3], chunks[4]);

    ChatList::new(tab.chat().groups(), &texts.thanks_for_voting)
        .scroll_snapped(tab.chat().is_scroll_snapped())
        .render(f, chat_area);

    if !info_lines.is_empty() {
        f.render_widget(Paragraph::new(info_lines), info_area);
    }

    TopBarLine::new(prompt_input.top_bar()).render(f, top_bar_area);

    if is_prompt_visible {
        let label = store.get_string(StoreKey::PromptInputLabel);
        let title = if label.is_empty() {
            " Prompt ".to_string()
        } else {
            format!(" {label} ")
        };
        let attachment_lines = prompt_input.attachment().content().lines().count();

        PromptInputBox::new(&title, text_input.document())
            .placeholder(text_input.placeholder())
            .command(prompt_input.selected_command())
            .attachment_lines(attachment_lines)
            .focused(text_input.is_focused())
            .disabled(text_input.is_disabled())
            .render(f, prompt_area);
    }

    let character_count = prompt_input
        .indicator_snapshot()
        .filter(|snapshot| !snapshot.hidden)
        .and_then(|snapshot| match snapshot.content {
            OverlayContent::CharacterIndicator { used, max } => Some(CharacterCount { max, used }),
            _ => None,
        });
    FooterBar::new(prompt_input.controls(), &texts.send, &texts.stop_generating)
        .character_count(character_count)
        .render(f, footer_area);

    let overlay_bottom = if top_bar_height > 0 {
        top_bar_area.y
    } else {
        prompt_area.y
    };
    render_overlays(f, widget, tab, chat_area, overlay_bottom);
}

/// Collects the sticky card and the info text shown above the prompt.
fn notice_lines(store: &TabDataStore, width: u16) -> Vec<Line<'static>> {
    let inner_width = usize::from(width.saturating_sub(2));
    let sticky_card = match store.get(StoreKey::PromptInputStickyCard) {
        Value::String(text) => text,
        Value::Object(card) => card
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    let info = store.get_string(StoreKey::PromptInputInfo);

    [(sticky_card, Color::Yellow), (info, Color::Gray)]
        .into_iter()
        .filter(|(text, _)| !text.is_empty())
        .flat_map(|(text, color)| {
            wrap_text(&text, inner_width)
                .into_iter()
                .map(move |line| {
                    Line::from(Span::styled(format!(" {line}"), Style::default().fg(color)))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Draws the quick-pick list or the pill placeholder card above
/// `overlay_bottom`, over the conversation.
fn render_overlays(f: &mut Frame, widget: &ChatWidget, tab: &ChatTab, chat_area: Rect, overlay_bottom: u16) {
    let prompt_input = tab.prompt_input();
    let texts = &widget.services().config.texts;
    let available_height = overlay_bottom.saturating_sub(chat_area.y);

    if let Some(snapshot) = prompt_input.quick_pick_snapshot().filter(|snapshot| !snapshot.hidden)
        && let OverlayContent::QuickPick(view) = &snapshot.content
    {
        let list = QuickPickList::new(view, &texts.no_matches);
        let height = list.height(available_height.min(chat_area.height));
        let overlay_area = Rect::new(
            chat_area.x,
            overlay_bottom.saturating_sub(height),
            chat_area.width,
            height,
        );
        list.render(f, overlay_area);

        return;
    }

    if let Some(OverlayContent::Card { text }) = prompt_input.text_input().placeholder_card() {
        let lines = wrap_text(text, usize::from(chat_area.width.saturating_sub(2)));
        let height = u16::try_from(lines.len())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .min(available_height);
        let overlay_area = Rect::new(
            chat_area.x,
            overlay_bottom.saturating_sub(height),
            chat_area.width,
            height,
        );
        let card = Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );

        f.render_widget(Clear, overlay_area);
        f.render_widget(card, overlay_area);
    }
}
