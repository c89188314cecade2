use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use topmodel_shared::{style_label, GeneratedImage, StyleOption, APP_NAME, STYLE_OPTIONS};

use crate::api::ImageGenerator;
use crate::app::{App, ProfileField, VimMode, GENERATING_TIPS};
use crate::machine::Step;

const TERMS: [(&str, &str); 5] = [
    (
        "1. Gender in fashion",
        "Fashion is art and expression. Generated images may show androgynous or unconventional styles.",
    ),
    (
        "2. Community display",
        "Images generated with your face appear in the community feed for up to 7 days, visible to other users.",
    ),
    (
        "3. External sharing",
        "You may share your images outside the app. Others may do the same with images in the feed.",
    ),
    (
        "4. Data and images",
        "Your selfie is used only to generate your images.",
    ),
    (
        "5. Responsibility",
        "Do not upload photos of other people without consent, or illegal or offensive content.",
    ),
];

const FAQ: [(&str, &str); 3] = [
    (
        "How is my selfie used?",
        "It is the base for the model's face in the generated photos.",
    ),
    (
        "Can I use photos of other people?",
        "The free version only uses the selfie from your sign-up. PLUS allows other uploads.",
    ),
    (
        "Are my images private?",
        "Generated images stay in the community feed for 7 days, as stated in the terms.",
    ),
];

pub fn draw<G: ImageGenerator>(f: &mut Frame, app: &App<G>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(0),    // Screen
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    match app.machine.step() {
        Step::Login => draw_login(f, chunks[1]),
        Step::TermsAgreement => draw_terms(f, chunks[1], app),
        Step::ProfileSetup => draw_profile_setup(f, chunks[1], app),
        Step::SelfieCapture => draw_selfie(f, chunks[1], app),
        Step::StyleSelection => draw_style_selection(f, chunks[1], app),
        Step::Generating => draw_generating(f, chunks[1], app),
        Step::MainView => draw_main(f, chunks[1], app),
        Step::PaymentScreen => draw_payment(f, chunks[1]),
        Step::InfoScreen => draw_info(f, chunks[1]),
        Step::ProfileScreen => draw_profile(f, chunks[1], app),
    }

    draw_status_bar(f, chunks[2], app);

    if let Some(image) = app.machine.selected_image() {
        draw_image_modal(f, app, image);
    }

    if let Some(error) = app.machine.error() {
        draw_error_popup(f, error);
    }
}

fn draw_header<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let mut spans = vec![Span::styled(
        APP_NAME,
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    )];

    if let Some(user) = app.machine.user() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("@{}", user.name),
            Style::default().fg(Color::Yellow),
        ));
    }

    let cooldown = app.machine.cooldown();
    let now = Utc::now();
    if !cooldown.can_generate(now) {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("next generation in {}", cooldown.remaining(now)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_login(f: &mut Frame, area: Rect) {
    let form_area = centered_rect(50, 40, area);
    let block = Block::default()
        .title(" Welcome ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = vec![
        Line::from(Span::styled(
            APP_NAME,
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Turn your selfie into a fashion shoot."),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: sign in",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        form_area,
    );
}

fn draw_terms<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let mut lines = vec![
        Line::from("By using the app you agree to the following terms:"),
        Line::from(""),
    ];
    for (title, body) in TERMS {
        lines.push(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(body));
        lines.push(Line::from(""));
    }

    let mark = if app.terms_accepted { "[x]" } else { "[ ]" };
    lines.push(Line::from(Span::styled(
        format!("{} I have read and agree to the terms", mark),
        Style::default().fg(Color::Yellow),
    )));

    let block = Block::default()
        .title(" Terms of Service ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn input_field(title: &str, value: &str, focused: bool, editing: bool) -> Paragraph<'static> {
    let border = match (focused, editing) {
        (true, true) => Style::default().fg(Color::Green),
        (true, false) => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    };
    let text = if focused && editing {
        format!("{}_", value)
    } else {
        value.to_string()
    };
    Paragraph::new(text).block(
        Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(border),
    )
}

fn draw_profile_setup<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let form_area = centered_rect(60, 60, area);
    let block = Block::default()
        .title(" Your profile ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let editing = app.vim_mode == VimMode::Insert;
    let form = &app.profile;
    let fields = [
        ("Model name", &form.name, ProfileField::Name),
        ("City", &form.city, ProfileField::City),
        ("Country", &form.country, ProfileField::Country),
    ];
    for (i, (title, value, field)) in fields.into_iter().enumerate() {
        f.render_widget(
            input_field(title, value, form.focus == field, editing),
            rows[i],
        );
    }
}

fn draw_selfie<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let form_area = centered_rect(70, 40, area);
    let block = Block::default()
        .title(" Selfie ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    f.render_widget(
        Paragraph::new("Path to a clear, front-facing photo (JPEG, PNG or WebP).")
            .wrap(Wrap { trim: true }),
        rows[0],
    );
    f.render_widget(
        input_field(
            "File",
            &app.selfie_path,
            true,
            app.vim_mode == VimMode::Insert,
        ),
        rows[1],
    );
}

/// Catalogue row: label plus the start of the prompt it sends.
fn style_line(style: &StyleOption, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(
            format!("{} ", style_label(style)),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(truncate(style.prompt, 60), Style::default().fg(Color::Gray)),
    ])
}

fn style_items(selected: usize, custom_prompt: &str) -> Vec<ListItem<'static>> {
    let mut items: Vec<ListItem> = STYLE_OPTIONS
        .iter()
        .enumerate()
        .map(|(i, style)| ListItem::new(style_line(style, i == selected)))
        .collect();

    let marker = if selected == STYLE_OPTIONS.len() { "> " } else { "  " };
    let custom = if custom_prompt.is_empty() {
        "describe your own style".to_string()
    } else {
        custom_prompt.to_string()
    };
    items.push(ListItem::new(Line::from(vec![
        Span::raw(marker),
        Span::styled("Custom ", Style::default().fg(Color::Cyan)),
        Span::raw(custom),
    ])));
    items
}

fn draw_style_selection<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let list = List::new(style_items(app.style_cursor, &app.custom_prompt)).block(
        Block::default()
            .title(" Choose a style ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, area);
}

fn draw_generating<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let tip = GENERATING_TIPS[app.tip_index % GENERATING_TIPS.len()];
    let style = app.machine.pending_prompt().unwrap_or_default();
    let text = vec![
        Line::from(Span::styled(
            "Generating your masterpiece...",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("The AI is working on your photo. This can take a minute."),
        Line::from(Span::styled(truncate(style, 80), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(tip, Style::default().fg(Color::DarkGray))),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        centered_rect(70, 40, area),
    );
}

fn feed_item(image: &GeneratedImage) -> ListItem<'static> {
    let heart = if image.liked_by_user { "♥" } else { "♡" };
    ListItem::new(vec![
        Line::from(vec![
            Span::styled(
                format!("@{}", image.author),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}, {}", image.author_city, image.author_country),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("  {} {}", heart, image.likes),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(Span::styled(
            truncate(&image.prompt, 90),
            Style::default().fg(Color::Gray),
        )),
    ])
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn draw_main<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    // Generate panel
    let now = Utc::now();
    let cooldown = app.machine.cooldown();
    let title = if cooldown.can_generate(now) {
        " Generate (1-6, c: custom) ".to_string()
    } else {
        format!(" Generate available in {} ", cooldown.remaining(now))
    };
    let selected = if app.vim_mode == VimMode::Insert {
        STYLE_OPTIONS.len()
    } else {
        usize::MAX
    };
    let styles = List::new(style_items(selected, &app.custom_prompt)).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(styles, chunks[0]);

    // Community feed
    let feed = app.machine.feed(now);
    let block = Block::default()
        .title(format!(" Community ({}) ", feed.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    if feed.is_empty() {
        f.render_widget(
            Paragraph::new("No images yet. Generate the first one!")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block),
            chunks[1],
        );
        return;
    }

    let items: Vec<ListItem> = feed.iter().map(|image| feed_item(image)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default();
    state.select(Some(app.feed_cursor));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_image_modal<G: ImageGenerator>(f: &mut Frame, app: &App<G>, image: &GeneratedImage) {
    let area = centered_rect(70, 60, f.area());
    f.render_widget(Clear, area);

    let now = Utc::now();
    let cooldown = app.machine.cooldown();
    let generate_hint = if cooldown.can_generate(now) {
        "g: generate with this style".to_string()
    } else {
        format!("generate available in {}", cooldown.remaining(now))
    };
    let heart = if image.liked_by_user { "♥" } else { "♡" };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("@{}", image.author),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}, {}", image.author_city, image.author_country),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(format!(
            "{} {}   created {}",
            heart,
            image.likes,
            image.created_at.format("%Y-%m-%d %H:%M")
        )),
        Line::from(""),
        Line::from(image.prompt.clone()),
        Line::from(""),
        Line::from(Span::styled(
            format!("l: like | s: save | {} | Esc: close", generate_hint),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Image ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn draw_payment(f: &mut Frame, area: Rect) {
    let plans = vec![
        Line::from(Span::styled(
            "Choose the perfect plan to boost your model career.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("PLUS  one-time payment", Style::default().fg(Color::Yellow))),
        Line::from("  Unlock photo upload: use any photo from your device, not just your selfie."),
        Line::from(""),
        Line::from(Span::styled("PRO  the full model experience", Style::default().fg(Color::Magenta))),
        Line::from("  Unlimited generations without waiting, HD quality, no watermark."),
    ];
    let block = Block::default()
        .title(" Plans ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(plans).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn draw_info(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Frequently asked questions",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (q, a) in FAQ {
        lines.push(Line::from(Span::styled(q, Style::default().fg(Color::Yellow))));
        lines.push(Line::from(a));
        lines.push(Line::from(""));
    }
    let block = Block::default()
        .title(" Info ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn draw_profile<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let Some(user) = app.machine.user() else {
        return;
    };
    let mine = app
        .machine
        .images()
        .iter()
        .filter(|i| i.author == user.name)
        .count();

    let lines = vec![
        Line::from(Span::styled(
            format!("@{}", user.name),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{}, {}", user.city, user.country)),
        Line::from(format!("Language: {}", user.language.code())),
        Line::from(format!("Images generated: {}", mine)),
        Line::from(""),
        Line::from(Span::styled(
            format!("Saved images go to {}", app.download_dir().display()),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Block::default()
        .title(" Profile ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status_bar<G: ImageGenerator>(f: &mut Frame, area: Rect, app: &App<G>) {
    let (mode, mode_color) = match app.vim_mode {
        VimMode::Normal => ("NORMAL", Color::Blue),
        VimMode::Insert => ("INSERT", Color::Green),
    };

    let hints = if app.vim_mode == VimMode::Insert {
        "Enter: submit | Esc: cancel"
    } else if app.machine.selected_image().is_some() {
        "l: like | s: save | g: generate | Esc: close"
    } else {
        match app.machine.step() {
            Step::Login => "Enter: sign in | q: quit",
            Step::TermsAgreement => "Space: toggle agreement | Enter: continue | q: quit",
            Step::ProfileSetup => "i: edit | j/k: field | Enter: continue | q: quit",
            Step::SelfieCapture => "i: edit path | Enter: confirm | q: quit",
            Step::StyleSelection => "j/k: move | Enter: select | i: custom | q: quit",
            Step::Generating => "please wait...",
            Step::MainView => {
                "j/k: move | Enter: open | l: like | s: save | r: regenerate | p: plans | i: info | u: profile | q: quit"
            }
            Step::ProfileScreen => "n: next language | L: logout | Esc: back",
            Step::PaymentScreen | Step::InfoScreen => "Esc: back | q: quit",
        }
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default().bg(mode_color).fg(Color::White),
        ),
        Span::raw(" "),
    ];
    match &app.notice {
        Some(notice) => spans.push(Span::styled(notice.as_str(), Style::default().fg(Color::Green))),
        None => spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_error_popup(f: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Error (any key to dismiss) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = Paragraph::new(error)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
