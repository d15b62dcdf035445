use super::{AsciiGrid, NoticeKind, Tab, UiState};
use image::RgbImage;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

pub(super) fn render(f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs
            Constraint::Min(0),    // body
            Constraint::Length(1), // key help
        ])
        .split(f.area());

    let titles = Tab::ALL.iter().map(|t| t.title());
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(Block::default().borders(Borders::ALL).title(" rollcall "))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        Tab::Register => render_register(f, chunks[1], state),
        Tab::Live => render_live(f, chunks[1], state),
    }

    let help = match state.tab {
        Tab::Register => "Type a name, Enter to capture and register | Tab: switch | Esc: quit",
        Tab::Live => "Tab: switch | Esc: quit",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    if let Some(notice) = &state.notice {
        let color = match notice.kind {
            NoticeKind::Info => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        let area = centered(f.area(), 50, 7);
        f.render_widget(Clear, area);
        let body = Paragraph::new(vec![
            Line::from(notice.message.as_str()),
            Line::from(""),
            Line::from(Span::styled("[Enter] OK", Style::default().fg(Color::DarkGray))),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", notice.title)),
        );
        f.render_widget(body, area);
    }
}

fn render_register(f: &mut Frame, area: Rect, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(format!("{}_", state.name_input)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Employee Name ({} registered) ", state.employees)),
    );
    f.render_widget(input, chunks[0]);

    let block = Block::default().borders(Borders::ALL).title(" Camera ");
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);
    match &state.preview {
        Some(image) => f.render_widget(Paragraph::new(frame_lines(image, inner, |_| {})), inner),
        None => f.render_widget(waiting(), inner),
    }
}

fn render_live(f: &mut Frame, area: Rect, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let status = Line::from(vec![
        Span::styled(
            state.status.as_deref().unwrap_or("Waiting for a known face"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::raw(state.last_mark.as_deref().unwrap_or("")),
    ]);
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL).title(" Status ")),
        chunks[0],
    );

    let block = Block::default().borders(Borders::ALL).title(" Live ");
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);
    let Some(live) = &state.live else {
        f.render_widget(waiting(), inner);
        return;
    };

    let lines = frame_lines(&live.image, inner, |grid| {
        for face in &live.faces {
            grid.draw_face(&face.region, &face.label);
        }
        grid.footer(&live.clock);
    });
    let known = live.faces.iter().any(|face| face.is_known());
    let color = if known { Color::Green } else { Color::Gray };
    f.render_widget(Paragraph::new(lines).style(Style::default().fg(color)), inner);
}

fn frame_lines(image: &RgbImage, area: Rect, annotate: impl FnOnce(&mut AsciiGrid)) -> Vec<Line<'static>> {
    let mut grid = AsciiGrid::from_image(image, area.width as usize, area.height as usize);
    annotate(&mut grid);
    grid.lines().into_iter().map(Line::from).collect()
}

fn waiting() -> Paragraph<'static> {
    Paragraph::new("Waiting for camera...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
