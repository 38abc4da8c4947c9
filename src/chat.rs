use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::flow::table::FlowTable;
use crate::flow::{Effect, FlowConfig, FlowEngine, FlowError};
use crate::poi::{self, Key, PoiEvent, PoiId, PoiMap};
use crate::widget::{Point, Viewport, WidgetConfig, WidgetController};

/// Focusable elements inside the map drawer: close button and video frame.
const DRAWER_FOCUSABLE: usize = 2;

// ---------------------------------------------------------------------------
// Terminal input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Choose(usize),
    Expand,
    Collapse,
    ToggleAvatar,
    Drag { from: Point, to: Point },
    Touch { from: Point, to: Point },
    Resize(Viewport),
    Video,
    Zoom(bool),
    ToggleMap,
    OpenPoi(PoiId),
    Hover(PoiId),
    Unhover(PoiId),
    Click(Option<PoiId>),
    Legend,
    Key(Key),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let numbers = |args: &[&str]| -> Result<Vec<f64>, String> {
        args.iter()
            .map(|a| a.parse::<f64>().map_err(|_| format!("'{a}' is not a number")))
            .collect()
    };

    match words.as_slice() {
        [n] if n.bytes().all(|b| b.is_ascii_digit()) => match n.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Input::Choose(n - 1)),
            _ => Err("options are numbered from 1".into()),
        },
        ["expand"] => Ok(Input::Expand),
        ["avatar"] => Ok(Input::ToggleAvatar),
        ["collapse" | "close"] => Ok(Input::Collapse),
        ["drag", args @ ..] => match numbers(args)?.as_slice() {
            [x1, y1, x2, y2] => Ok(Input::Drag {
                from: Point::new(*x1, *y1),
                to: Point::new(*x2, *y2),
            }),
            _ => Err("usage: drag <x1> <y1> <x2> <y2>".into()),
        },
        ["touch", args @ ..] => match numbers(args)?.as_slice() {
            [x1, y1, x2, y2] => Ok(Input::Touch {
                from: Point::new(*x1, *y1),
                to: Point::new(*x2, *y2),
            }),
            _ => Err("usage: touch <x1> <y1> <x2> <y2>".into()),
        },
        ["resize", args @ ..] => match numbers(args)?.as_slice() {
            [w, h] if *w > 0.0 && *h > 0.0 => Ok(Input::Resize(Viewport::new(*w, *h))),
            _ => Err("usage: resize <width> <height>".into()),
        },
        ["video"] => Ok(Input::Video),
        ["zoom"] => Ok(Input::Zoom(true)),
        ["unzoom"] => Ok(Input::Zoom(false)),
        ["map"] => Ok(Input::ToggleMap),
        ["poi", id] => id.parse().map(Input::OpenPoi),
        ["hover", id] => id.parse().map(Input::Hover),
        ["unhover", id] => id.parse().map(Input::Unhover),
        ["click"] => Ok(Input::Click(None)),
        ["click", id] => id.parse().map(|id| Input::Click(Some(id))),
        ["legend"] => Ok(Input::Legend),
        ["status"] => Ok(Input::Status),
        ["esc"] => Ok(Input::Key(Key::Escape)),
        ["tab"] => Ok(Input::Key(Key::Tab { shift: false })),
        ["shift-tab"] => Ok(Input::Key(Key::Tab { shift: true })),
        ["help"] => Ok(Input::Help),
        ["quit" | "exit"] => Ok(Input::Quit),
        _ => Err(format!("unrecognised input '{}', type 'help'", line.trim())),
    }
}

fn show_help() {
    println!("  <n>                          choose option n");
    println!("  expand | collapse | avatar   show or hide the full-screen avatar");
    println!("  drag <x1> <y1> <x2> <y2>     drag the avatar widget with the mouse");
    println!("  touch <x1> <y1> <x2> <y2>    drag it with one finger");
    println!("  resize <w> <h>               resize the viewport");
    println!("  video                        show the embedded player address");
    println!("  zoom | unzoom                enlarge the floor map");
    println!("  map | poi <id>               open the campus map drawer");
    println!("  hover | unhover <id>         show or hide a pin's tooltip");
    println!("  click [id]                   click a pin, or the page outside the pins");
    println!("  legend                       list the map legend");
    println!("  esc | tab | shift-tab        keyboard inside the drawer");
    println!("  status                       where the conversation and widgets are");
    println!("  quit");
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct Session {
    engine: FlowEngine,
    widget: WidgetController,
    map: PoiMap,
}

impl Session {
    fn new(table: Arc<FlowTable>, viewport: Viewport) -> Result<(Self, Vec<PoiEvent>)> {
        let engine =
            FlowEngine::new(table, FlowConfig::default()).context("failed to start the chat")?;
        let widget = WidgetController::new(viewport, WidgetConfig::default());
        let (map, events) = PoiMap::new(false, DRAWER_FOCUSABLE);
        Ok((
            Self {
                engine,
                widget,
                map,
            },
            events,
        ))
    }

    fn show_effects(&mut self) {
        for effect in self.engine.drain_effects() {
            match effect {
                Effect::Message(entry) => {
                    let who = if entry.from_system { "Lia" } else { "Você" };
                    println!("\n[{who}]: {}", entry.text);
                }
                Effect::OptionsShown(labels) => {
                    println!();
                    for (i, label) in labels.iter().enumerate() {
                        println!("  [{}] {label}", i + 1);
                    }
                }
                Effect::OptionsHidden => {}
                Effect::VideoChanged(video) => {
                    println!("(Avatar video: {})", video.embed_url(&self.engine.state().embed));
                }
                Effect::MapShown(map) => {
                    println!("\n[Mapa: {} ({})]", map.image, map.caption());
                }
                Effect::TranscriptCleared => println!("\n----------------------------------------"),
            }
        }
    }

    fn show_widget(&self) {
        let p = self.widget.position();
        let size = self.widget.size();
        let viewport = self.widget.viewport();
        if self.widget.is_expanded() {
            println!("(Avatar 3D em tela cheia)");
        } else {
            println!(
                "(Avatar widget {:.0}x{:.0} at {:.0}, {:.0} in {:.0}x{:.0})",
                size.width, size.height, p.x, p.y, viewport.width, viewport.height
            );
        }
    }

    /// Returns false when the user asked to leave.
    fn handle(&mut self, input: Input) -> Result<bool> {
        match input {
            Input::Choose(index) => match self.engine.select_option(index) {
                Ok(()) => {}
                Err(e @ (FlowError::OptionsNotVisible | FlowError::NoSuchOption { .. })) => {
                    println!("({e})");
                }
                Err(e) => return Err(e).context("conversation failed"),
            },
            Input::Expand => {
                self.widget.expand();
                self.show_widget();
            }
            Input::Collapse => {
                self.widget.collapse();
                self.show_widget();
            }
            Input::ToggleAvatar => {
                self.widget.toggle_expanded();
                self.show_widget();
            }
            Input::Touch { from, to } => {
                if self.widget.touch_start(&[from]) {
                    self.log_drag_state();
                    self.widget.touch_move(&[to]);
                    self.widget.touch_end();
                } else {
                    println!("(Collapse the avatar before dragging it)");
                }
                self.show_widget();
            }
            Input::Drag { from, to } => {
                if self.widget.begin_drag(from) {
                    self.log_drag_state();
                    self.widget.drag_move(to);
                    self.widget.end_drag();
                } else {
                    println!("(Collapse the avatar before dragging it)");
                }
                self.show_widget();
            }
            Input::Resize(viewport) => {
                self.widget.resize_viewport(viewport);
                self.show_widget();
            }
            Input::Video => match &self.engine.state().active_video {
                Some(video) => {
                    println!("{}", video.url());
                    println!("{}", video.embed_url(&self.engine.state().embed));
                }
                None => println!("(No avatar video yet)"),
            },
            Input::Zoom(on) => match self.engine.active_map_mut() {
                Some(map) => {
                    if on {
                        map.open_zoom();
                    } else {
                        map.close_zoom();
                    }
                    println!("({})", map.alt_text());
                }
                None => println!("(No floor map on screen)"),
            },
            Input::ToggleMap => {
                let events = self.map.toggle_drawer();
                self.show_map_events(&events);
            }
            Input::OpenPoi(id) => {
                let events = self.map.open_poi(id);
                self.show_map_events(&events);
            }
            Input::Hover(id) => {
                self.map.show_tooltip(id);
                self.show_tooltip();
            }
            Input::Unhover(id) => {
                self.map.close_tooltip(id);
                self.show_tooltip();
            }
            Input::Click(pin) => {
                self.map.press(pin);
                if let Some(id) = pin {
                    let events = self.map.open_poi(id);
                    self.show_map_events(&events);
                }
                self.show_tooltip();
            }
            Input::Legend => {
                for item in poi::LEGEND {
                    println!("  - {item}");
                }
            }
            Input::Status => self.show_status(),
            Input::Key(key) => {
                let events = self.map.key(key);
                self.show_map_events(&events);
                if let Some(focus) = self.map.focused() {
                    println!("(Focus on drawer element {})", focus + 1);
                }
            }
            Input::Help => show_help(),
            Input::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn log_drag_state(&self) {
        debug!(
            "Drag listeners attached: {}, player accepts pointer: {}",
            self.widget.listeners_attached(),
            self.widget.player_accepts_pointer()
        );
    }

    fn show_tooltip(&self) {
        match self.map.tooltip() {
            Some(id) => println!("(Tooltip: {})", poi::poi(id).name),
            None => println!("(No tooltip)"),
        }
    }

    fn show_status(&self) {
        let state = self.engine.state();
        println!("(Node: {})", self.engine.current_node_id());
        if let Some(video) = &state.active_video {
            println!("(Avatar video: {})", video.url());
        }
        if let Some(map) = &state.active_map {
            let zoom = if map.is_zoomed() { ", ampliado" } else { "" };
            println!("(Mapa do {}{zoom})", map.floor);
        }
        self.show_widget();
        println!(
            "(Campus map drawer: {}, page scroll {})",
            if self.map.is_drawer_open() { "open" } else { "closed" },
            if self.map.scroll_locked() { "locked" } else { "free" }
        );
    }

    fn show_map_events(&self, events: &[PoiEvent]) {
        for event in events {
            match event {
                PoiEvent::Opened(id) => {
                    let poi = poi::poi(*id);
                    let status = if poi.active { "intérprete disponível" } else { "em breve" };
                    println!(
                        "(Mapa: {} em {:.0}%, {:.0}% [{}] - {status})",
                        poi.name, poi.x, poi.y, poi.color
                    );
                }
                PoiEvent::DrawerClosed => println!("(Mapa fechado)"),
            }
        }
        if self.map.scroll_locked() {
            println!("(Page scroll locked while the map drawer is open)");
        }
    }
}

fn read_line() -> Result<Option<String>> {
    print!("\n> ");
    io::stdout().flush()?;
    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .context("failed to read from stdin")?;
    Ok((read > 0).then_some(input))
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

pub fn run(table: Arc<FlowTable>, viewport: Viewport) -> Result<()> {
    println!("\n========================================");
    println!("   NEOTALK - MAPA INTERATIVO ACESSÍVEL");
    println!("========================================");
    println!("Type 'help' for commands.");

    let (mut session, events) = Session::new(table, viewport)?;
    session.show_map_events(&events);
    session.show_widget();

    loop {
        session.show_effects();

        if let Some(wait) = session.engine.next_deadline() {
            thread::sleep(wait);
            session.engine.advance(wait).context("auto-advance failed")?;
            continue;
        }

        let Some(line) = read_line()? else {
            info!("stdin closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_input(&line) {
            Ok(input) => {
                if !session.handle(input)? {
                    break;
                }
            }
            Err(msg) => {
                warn!("Rejected input: {}", line.trim());
                println!("({msg})");
            }
        }
    }

    println!("Até logo!");
    Ok(())
}
