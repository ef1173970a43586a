//! Portfolio Example - Scroll a terminal page and watch sections reveal
//!
//! Controls:
//! - Up/Down or j/k scroll one row
//! - PageUp/PageDown scroll one screen
//! - q or Esc quits
//!
//! Logs go to stderr, filtered by RUST_LOG:
//!
//! Run with: RUST_LOG=spark_reveal=debug cargo run --example portfolio 2>reveal.log

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing_subscriber::EnvFilter;

use spark_reveal::{
    Bounds, FrameClock, ProgressBar, ProgressBarProps, RevealConfig, RevealHost, ScrollReveal,
    ScrollRevealProps, Typewriter, TypewriterProps, mount, reset_all, scroll_to, scroll_top,
    set_bounds, set_viewport_height, tick,
};

const FRAME: Duration = Duration::from_millis(16);
const BAR_WIDTH: usize = 30;

const SKILLS: &[(&str, &str, &str)] = &[
    ("HTML & CSS", "ADVANCED", "90%"),
    ("JavaScript (ES6+)", "INTERMEDIATE", "75%"),
    ("React / Vite", "INTERMEDIATE", "65%"),
    ("Node.js", "BASIC", "40%"),
    ("SQL", "BASIC", "35%"),
];

const PROJECTS: &[(&str, &str)] = &[
    ("Weather Board", "Forecast dashboard with offline cache"),
    ("Task Garden", "Kanban planner with drag and drop"),
    ("Pixel Diary", "Daily sketch journal with sharing"),
];

/// Everything mounted on the page, with its row in the document.
struct Page {
    name: Typewriter,
    tagline: Typewriter,
    card: ScrollReveal,
    card_top: f32,
    skills: Vec<(ProgressBar, f32)>,
    projects: Vec<(ScrollReveal, f32, &'static str, &'static str)>,
    length: f32,
}

fn build_page(host: &RevealHost, config: &RevealConfig, viewport: f32) -> Page {
    let card_top = viewport + 4.0;
    let (card, (name, tagline)) =
        ScrollReveal::mount(host, ScrollRevealProps::from_config(&config.reveal), || {
            let name =
                Typewriter::mount(host, TypewriterProps::from_config("[YOUR NAME]", &config.typewriter));
            let tagline = Typewriter::mount(
                host,
                TypewriterProps::from_config("Front-end developer", &config.typewriter),
            );
            (name, tagline)
        });
    set_bounds(card.index(), Bounds::new(card_top, 6.0));
    set_bounds(name.index(), Bounds::new(card_top + 2.0, 1.0));
    set_bounds(tagline.index(), Bounds::new(card_top + 3.0, 1.0));

    let mut row = card_top + viewport;
    let skills = SKILLS
        .iter()
        .map(|&(skill, level, target)| {
            let bar = ProgressBar::mount(
                host,
                ProgressBarProps::from_config(skill, level, target, &config.progress),
            );
            set_bounds(bar.index(), Bounds::new(row, 1.0));
            row += 2.0;
            (bar, row - 2.0)
        })
        .collect();

    row += viewport / 2.0;
    let projects = PROJECTS
        .iter()
        .map(|&(title, blurb)| {
            let (block, ()) =
                ScrollReveal::mount(host, ScrollRevealProps::from_config(&config.reveal), || {});
            set_bounds(block.index(), Bounds::new(row, 3.0));
            row += 5.0;
            (block, row - 5.0, title, blurb)
        })
        .collect();

    Page {
        name,
        tagline,
        card,
        card_top,
        skills,
        projects,
        length: row + viewport / 2.0,
    }
}

fn draw_line(out: &mut impl Write, top: f32, row: f32, rows: u16, text: &str, dim: bool) -> io::Result<()> {
    let screen_row = (row - top).round();
    if screen_row < 0.0 || screen_row >= f32::from(rows) {
        return Ok(());
    }
    queue!(out, cursor::MoveTo(2, screen_row as u16))?;
    if dim {
        queue!(out, SetAttribute(Attribute::Dim), Print(text), SetAttribute(Attribute::Reset))
    } else {
        queue!(out, Print(text))
    }
}

fn typed(typewriter: &Typewriter) -> String {
    let cursor = if typewriter.cursor_visible() { "|" } else { " " };
    format!("{}{cursor}", typewriter.displayed_text())
}

fn render(out: &mut impl Write, page: &Page, rows: u16) -> io::Result<()> {
    let top = scroll_top();
    queue!(out, terminal::Clear(ClearType::All))?;

    draw_line(out, top, 1.0, rows, "Hi, welcome to my portfolio", false)?;
    draw_line(out, top, 3.0, rows, "scroll down (j / Down)", true)?;

    let style = page.card.style();
    if style.opacity > 0.0 {
        let shift = (style.offset_y / 10.0).round();
        let dim = style.opacity < 0.6;
        let card = page.card_top + shift;
        draw_line(out, top, card, rows, "+----------------------------------+", dim)?;
        draw_line(out, top, card + 2.0, rows, &typed(&page.name), dim)?;
        draw_line(out, top, card + 3.0, rows, &typed(&page.tagline), dim)?;
        draw_line(out, top, card + 5.0, rows, "+----------------------------------+", dim)?;
    }

    for (bar, row) in &page.skills {
        let filled = (bar.fill_fraction() * BAR_WIDTH as f32).round() as usize;
        let line = format!(
            "{:<18} [{}{}] {:>5.1}% {}",
            bar.name(),
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
            bar.fill(),
            bar.level(),
        );
        draw_line(out, top, *row, rows, &line, false)?;
    }

    for (block, row, title, blurb) in &page.projects {
        let style = block.style();
        if style.opacity <= 0.0 {
            continue;
        }
        let row = row + (style.offset_y / 10.0).round();
        let dim = style.opacity < 0.6;
        draw_line(out, top, row, rows, title, dim)?;
        draw_line(out, top, row + 1.0, rows, blurb, true)?;
    }

    out.flush()
}

fn run(out: &mut impl Write) -> io::Result<()> {
    let (_, rows) = terminal::size()?;
    let viewport = f32::from(rows);
    set_viewport_height(viewport);

    let config = RevealConfig::load("reveal.toml").unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default reveal config");
        RevealConfig::default()
    });
    let host = RevealHost::local();
    let handle = mount();
    let page = build_page(&host, &config, viewport);
    let max_scroll = (page.length - viewport).max(0.0);

    let mut clock = FrameClock::new();
    while tick(&handle, clock.elapsed()) {
        render(out, &page, rows)?;

        if !event::poll(FRAME)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let delta = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                handle.stop();
                continue;
            }
            KeyCode::Down | KeyCode::Char('j') => 1.0,
            KeyCode::Up | KeyCode::Char('k') => -1.0,
            KeyCode::PageDown => viewport,
            KeyCode::PageUp => -viewport,
            _ => continue,
        };
        scroll_to((scroll_top() + delta).min(max_scroll));
    }

    Ok(())
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    reset_all();

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let result = run(&mut stdout);

    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}
