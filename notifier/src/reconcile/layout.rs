//! Window placement: a column-major slot grid walked by a cursor.
//!
//! Slots are laid out from the top-right corner of the screen. Each column
//! holds as many windows as fit between the top margin and the bottom edge;
//! when a column is full the cursor continues at the top of the next column
//! to the left, and back to the first column when columns run out.

use serde::{Deserialize, Serialize};

/// Screen rectangle of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn intersects(&self, other: &Frame) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// When the cursor returns to the first slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorResetPolicy {
    /// Only once no window is visible.
    #[default]
    WhenEmpty,
    /// After every window close.
    OnEveryClose,
}

impl CursorResetPolicy {
    pub fn from_str_setting(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "every_close" | "on_every_close" => Self::OnEveryClose,
            _ => Self::WhenEmpty,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhenEmpty => "when_empty",
            Self::OnEveryClose => "every_close",
        }
    }
}

/// Geometry inputs for the slot grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub top_margin: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub spacing: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            top_margin: 50,
            window_width: 300,
            window_height: 120,
            spacing: 10,
        }
    }
}

impl LayoutConfig {
    /// Number of windows that fit in one column (at least one).
    pub fn rows(&self) -> u32 {
        let usable = self.screen_height.saturating_sub(self.top_margin);
        if usable < self.window_height {
            return 1;
        }
        (usable - self.window_height) / self.row_pitch() + 1
    }

    /// Number of columns that fit on screen (at least one).
    pub fn columns(&self) -> u32 {
        (self.screen_width / self.column_pitch()).max(1)
    }

    pub fn slot_count(&self) -> usize {
        self.rows() as usize * self.columns() as usize
    }

    fn row_pitch(&self) -> u32 {
        (self.window_height + self.spacing).max(1)
    }

    fn column_pitch(&self) -> u32 {
        (self.window_width + self.spacing).max(1)
    }

    /// Frame of slot `index`, column-major.
    pub fn slot_frame(&self, index: usize) -> Frame {
        let rows = self.rows() as usize;
        let index = index % self.slot_count();
        let column = (index / rows) as u32;
        let row = (index % rows) as u32;
        let x = self.screen_width as i64 - ((column + 1) * self.column_pitch()) as i64;
        Frame {
            x: x.max(0) as i32,
            y: (self.top_margin + row * self.row_pitch()) as i32,
            width: self.window_width,
            height: self.window_height,
        }
    }
}

/// A slot chosen by [`LayoutCursor::next_free`], not yet committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub index: usize,
    pub frame: Frame,
}

/// Next unoccupied placement position.
#[derive(Debug, Clone)]
pub struct LayoutCursor {
    config: LayoutConfig,
    next: usize,
}

impl LayoutCursor {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config, next: 0 }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Index of the slot the next search starts from.
    pub fn position(&self) -> usize {
        self.next
    }

    /// First slot at or after the cursor that does not intersect `occupied`.
    ///
    /// When every slot is taken the cursor slot itself is returned and the
    /// new window will overlap an existing one.
    pub fn next_free<'a>(&self, occupied: impl Iterator<Item = &'a Frame> + Clone) -> Slot {
        let total = self.config.slot_count();
        for step in 0..total {
            let index = (self.next + step) % total;
            let frame = self.config.slot_frame(index);
            if !occupied.clone().any(|o| o.intersects(&frame)) {
                return Slot { index, frame };
            }
        }
        tracing::debug!(slots = total, "No free window slot, overlapping");
        let index = self.next % total;
        Slot {
            index,
            frame: self.config.slot_frame(index),
        }
    }

    /// Move past a slot that now holds a window.
    pub fn commit(&mut self, slot: Slot) {
        self.next = (slot.index + 1) % self.config.slot_count();
    }

    /// Return to the top margin of the first column.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
