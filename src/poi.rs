use std::fmt;
use std::str::FromStr;

use log::{debug, info};

/// Points of interest on the campus map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoiId {
    Recepcao,
    Napne,
    Biblioteca,
}

impl PoiId {
    pub fn as_str(self) -> &'static str {
        match self {
            PoiId::Recepcao => "recepcao",
            PoiId::Napne => "napne",
            PoiId::Biblioteca => "biblioteca",
        }
    }
}

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoiId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        POIS.iter()
            .find(|poi| poi.id.as_str() == s.trim().to_lowercase())
            .map(|poi| poi.id)
            .ok_or_else(|| format!("unknown point of interest '{s}'"))
    }
}

/// A pin on the map. `x` and `y` are percentages of the map's box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poi {
    pub id: PoiId,
    pub name: &'static str,
    pub x: f32,
    pub y: f32,
    pub color: &'static str,
    pub active: bool,
}

pub const POIS: [Poi; 3] = [
    Poi {
        id: PoiId::Recepcao,
        name: "Recepção",
        x: 49.0,
        y: 63.0,
        color: "#79D56B",
        active: true,
    },
    Poi {
        id: PoiId::Napne,
        name: "NAPNE",
        x: 76.0,
        y: 36.0,
        color: "#FF3B3B",
        active: true,
    },
    Poi {
        id: PoiId::Biblioteca,
        name: "Biblioteca",
        x: 60.0,
        y: 20.0,
        color: "#FF3B3B",
        active: false,
    },
];

pub const LEGEND: [&str; 7] = [
    "Recepção",
    "NAPNE",
    "Biblioteca",
    "Auditório",
    "Elevadores",
    "Banheiros",
    "Áreas de descanso",
];

pub fn poi(id: PoiId) -> &'static Poi {
    match id {
        PoiId::Recepcao => &POIS[0],
        PoiId::Napne => &POIS[1],
        PoiId::Biblioteca => &POIS[2],
    }
}

// ---------------------------------------------------------------------------
// Map view state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Tab { shift: bool },
}

/// Notifications for the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiEvent {
    Opened(PoiId),
    DrawerClosed,
}

/// Interactive map with a side drawer showing the interpreter video of the
/// active point of interest.
///
/// While the drawer is open it behaves as a modal: page scroll is locked and
/// Tab cycles focus among the drawer's own focusable elements.
#[derive(Debug)]
pub struct PoiMap {
    drawer_open: bool,
    active_poi: PoiId,
    tooltip: Option<PoiId>,
    focusable: usize,
    focus: Option<usize>,
}

impl PoiMap {
    /// `focusable` is the number of focusable elements inside the drawer.
    pub fn new(default_open: bool, focusable: usize) -> (Self, Vec<PoiEvent>) {
        let mut map = Self {
            drawer_open: false,
            active_poi: PoiId::Recepcao,
            tooltip: None,
            focusable,
            focus: None,
        };
        let mut events = Vec::new();
        if default_open {
            map.open_drawer(&mut events);
        }
        (map, events)
    }

    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn scroll_locked(&self) -> bool {
        self.drawer_open
    }

    pub fn active_poi(&self) -> &'static Poi {
        poi(self.active_poi)
    }

    pub fn tooltip(&self) -> Option<PoiId> {
        self.tooltip
    }

    pub fn focused(&self) -> Option<usize> {
        self.focus
    }

    pub fn open_poi(&mut self, id: PoiId) -> Vec<PoiEvent> {
        self.active_poi = id;
        let mut events = Vec::new();
        self.open_drawer(&mut events);
        events
    }

    pub fn toggle_drawer(&mut self) -> Vec<PoiEvent> {
        let mut events = Vec::new();
        if self.drawer_open {
            self.close_drawer(&mut events);
        } else {
            self.open_drawer(&mut events);
        }
        events
    }

    pub fn show_tooltip(&mut self, id: PoiId) {
        self.tooltip = Some(id);
    }

    /// Closes the tooltip only if it belongs to `id`.
    pub fn close_tooltip(&mut self, id: PoiId) {
        if self.tooltip == Some(id) {
            self.tooltip = None;
        }
    }

    /// A mouse press anywhere on the page; `pin` is the pin it landed on.
    pub fn press(&mut self, pin: Option<PoiId>) {
        if pin.is_none() {
            self.tooltip = None;
        }
    }

    pub fn key(&mut self, key: Key) -> Vec<PoiEvent> {
        let mut events = Vec::new();
        if !self.drawer_open {
            return events;
        }
        match key {
            Key::Escape => self.close_drawer(&mut events),
            Key::Tab { shift } => self.cycle_focus(shift),
        }
        events
    }

    fn cycle_focus(&mut self, backwards: bool) {
        if self.focusable == 0 {
            return;
        }
        let last = self.focusable - 1;
        self.focus = Some(match (self.focus, backwards) {
            (None, _) => 0,
            (Some(i), false) if i >= last => 0,
            (Some(0), true) => last,
            (Some(i), false) => i + 1,
            (Some(i), true) => i - 1,
        });
        debug!("Drawer focus -> {:?}", self.focus);
    }

    fn open_drawer(&mut self, events: &mut Vec<PoiEvent>) {
        self.drawer_open = true;
        self.focus = (self.focusable > 0).then_some(0);
        info!("Map drawer opened on {}", self.active_poi);
        events.push(PoiEvent::Opened(self.active_poi));
    }

    fn close_drawer(&mut self, events: &mut Vec<PoiEvent>) {
        self.drawer_open = false;
        self.tooltip = None;
        self.focus = None;
        info!("Map drawer closed");
        events.push(PoiEvent::DrawerClosed);
    }
}
