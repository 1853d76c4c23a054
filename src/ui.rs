use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;

use crate::datemath;
use crate::keymap::KeyMap;
use crate::screens::{
    BirthdayEditorScreen, BirthdayListScreen, EditorField, PhoneEntryScreen, Screen,
};

const APP_TITLE: &str = "Birthday Bot";

fn header_style() -> Style {
    Style::default()
        .fg(Color::Indexed(99))
        .add_modifier(Modifier::BOLD)
}

fn dim_style() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn error_style() -> Style {
    Style::default().fg(Color::Red)
}

fn selected_style() -> Style {
    // The original's table palette: light text on indigo.
    Style::default().fg(Color::Indexed(229)).bg(Color::Indexed(57))
}

pub fn draw(frame: &mut Frame, screen: &Screen, keymap: &KeyMap) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    frame.render_widget(
        Paragraph::new(Span::styled(APP_TITLE, header_style())),
        chunks[0],
    );

    match screen {
        Screen::PhoneEntry(entry) => draw_phone_entry(frame, entry, chunks[1], chunks[2]),
        Screen::BirthdayList(list) => draw_birthday_list(frame, list, keymap, chunks[1], chunks[2]),
        Screen::BirthdayEditor(editor) => draw_birthday_editor(frame, editor, chunks[1], chunks[2]),
    }
}

fn draw_phone_entry(frame: &mut Frame, entry: &PhoneEntryScreen, body: Rect, footer: Rect) {
    let mut lines = vec![
        Line::from("Enter your phone number."),
        Line::from(Span::styled(
            "Reminders will be sent to this number.",
            dim_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("> "),
            Span::raw(entry.draft_number.clone()),
            Span::styled("█", dim_style()),
        ]),
    ];
    if let Some(error) = &entry.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), error_style())));
    }

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Welcome")),
        body,
    );
    frame.render_widget(
        Paragraph::new(Span::styled("enter submit • ctrl+c quit", dim_style())),
        footer,
    );
}

fn draw_birthday_list(
    frame: &mut Frame,
    list: &BirthdayListScreen,
    keymap: &KeyMap,
    body: Rect,
    footer: Rect,
) {
    let rows: Vec<Row> = list
        .rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.name.clone()),
                Cell::from(format!("{}/{}/{}", row.month, row.day, row.year)),
                Cell::from(datemath::days_til_label(row.days_until)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(12),
            Constraint::Length(16),
        ],
    )
    .header(
        Row::new(vec!["Name", "Birthday", "How Soon?"])
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Birthdays · {}", list.owner)),
    )
    .highlight_style(selected_style())
    .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select((!list.rows.is_empty()).then_some(list.selected));
    frame.render_stateful_widget(table, body, &mut state);

    let footer_line = match &list.error {
        Some(error) => Line::from(Span::styled(error.clone(), error_style())),
        None => Line::from(Span::styled(
            format!(
                "{} up • {} down • {} create • {} edit • {} quit",
                keymap.up.label(),
                keymap.down.label(),
                keymap.create.label(),
                keymap.edit.label(),
                keymap.quit.label(),
            ),
            dim_style(),
        )),
    };
    frame.render_widget(Paragraph::new(footer_line), footer);
}

fn draw_birthday_editor(
    frame: &mut Frame,
    editor: &BirthdayEditorScreen,
    body: Rect,
    footer: Rect,
) {
    let title = if editor.editing_id == 0 {
        "New Birthday Reminder"
    } else {
        "Edit Birthday Reminder"
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if editor.loading {
        frame.render_widget(
            Paragraph::new(Span::styled("loading…", dim_style())).block(block),
            body,
        );
        frame.render_widget(
            Paragraph::new(Span::styled("esc back • ctrl+c quit", dim_style())),
            footer,
        );
        return;
    }

    let confirm_value = if editor.confirmed { "Yep" } else { "Nope" };
    let mut lines = vec![
        field_line("Name", &editor.draft_name, editor.field == EditorField::Name),
        field_line(
            "Month",
            datemath::month_name(editor.draft_month),
            editor.field == EditorField::Month,
        ),
        field_line("Day", &editor.draft_day, editor.field == EditorField::Day),
        field_line("Year", &editor.draft_year, editor.field == EditorField::Year),
        field_line(
            "Save Changes?",
            confirm_value,
            editor.field == EditorField::Confirm,
        ),
    ];
    if let Some(error) = &editor.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), error_style())));
    }

    frame.render_widget(Paragraph::new(lines).block(block), body);

    let hint = match editor.field {
        EditorField::Month => "↑/↓ pick • enter next • esc back",
        EditorField::Confirm => "y save • n discard • esc back",
        _ => "enter next • esc back • ctrl+c quit",
    };
    frame.render_widget(Paragraph::new(Span::styled(hint, dim_style())), footer);
}

fn field_line<'a>(label: &'a str, value: &'a str, active: bool) -> Line<'a> {
    let marker = if active { "> " } else { "  " };
    let value_span = if active {
        Span::styled(value, Style::default().add_modifier(Modifier::BOLD))
    } else {
        Span::raw(value)
    };
    Line::from(vec![
        Span::styled(marker, header_style()),
        Span::styled(format!("{label:<14}"), dim_style()),
        value_span,
    ])
}
