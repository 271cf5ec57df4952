use std::collections::{BTreeMap, HashMap};
use std::io::{BufWriter, Stdout, Write, stdout};

use ascii_assets::TerminalChar;
use common_stdx::Point;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use log::debug;

use crate::{
    ImageLayer, ImageResource, PanelId, PanelShell, PanelSurface, error::SurfaceError,
};

// rows below the silhouette: name, health bar, statuses
const FOOTER_ROWS: u16 = 3;

#[derive(Debug)]
struct TerminalPanel {
    shell: PanelShell,
    slot: Option<usize>,
    highlighted: bool,
    name: String,
    health: Option<(f32, u16)>,
    statuses: BTreeMap<String, String>,
    layers: BTreeMap<ImageLayer, Vec<(Point<i32>, TerminalChar)>>,
}

impl TerminalPanel {
    fn new(shell: PanelShell) -> Self {
        TerminalPanel {
            shell,
            slot: None,
            highlighted: false,
            name: String::new(),
            health: None,
            statuses: BTreeMap::new(),
            layers: BTreeMap::new(),
        }
    }

    fn outer_size(&self) -> (u16, u16) {
        (self.shell.width + 2, self.shell.height + FOOTER_ROWS + 2)
    }

    /// Topmost visible cell at `pos`: markers over the silhouette.
    fn cell_at(&self, pos: Point<i32>) -> Option<TerminalChar> {
        self.layers
            .iter()
            .rev()
            .find_map(|(_, cells)| cells.iter().find(|(p, _)| *p == pos).map(|(_, c)| *c))
    }
}

/// Draws panels side by side on a crossterm terminal, one column per slot.
#[derive(Debug)]
pub struct TerminalSurface {
    out: BufWriter<Stdout>,
    panels: HashMap<PanelId, TerminalPanel>,
    column_stride: u16,
    top: u16,
}

impl TerminalSurface {
    pub fn new(column_stride: u16, top: u16) -> Self {
        TerminalSurface {
            out: BufWriter::new(stdout()),
            panels: HashMap::new(),
            column_stride,
            top,
        }
    }

    fn panel(&self, id: PanelId) -> Result<&TerminalPanel, SurfaceError> {
        self.panels.get(&id).ok_or(SurfaceError::UnknownPanel(id))
    }

    fn panel_mut(&mut self, id: PanelId) -> Result<&mut TerminalPanel, SurfaceError> {
        self.panels.get_mut(&id).ok_or(SurfaceError::UnknownPanel(id))
    }

    fn origin(&self, panel: &TerminalPanel) -> Option<(u16, u16)> {
        let slot = panel.slot?;
        let stride = self.column_stride.max(panel.outer_size().0 + 1);
        Some(((slot as u16).saturating_mul(stride), self.top))
    }

    fn write_at(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: Option<Color>,
        bg: Option<Color>,
    ) -> Result<(), SurfaceError> {
        queue!(self.out, MoveTo(x, y))?;
        if let Some(fg) = fg {
            queue!(self.out, SetForegroundColor(fg))?;
        }
        if let Some(bg) = bg {
            queue!(self.out, SetBackgroundColor(bg))?;
        }
        queue!(self.out, Print(text), ResetColor)?;
        Ok(())
    }

    fn repaint_border(&mut self, id: PanelId) -> Result<(), SurfaceError> {
        let panel = self.panel(id)?;
        let Some((x, y)) = self.origin(panel) else {
            return Ok(());
        };
        let (w, h) = panel.outer_size();
        let (horizontal, vertical, color) = if panel.highlighted {
            ('═', '║', Some(Color::Yellow))
        } else {
            ('─', '│', None)
        };
        let bar: String = std::iter::repeat_n(horizontal, (w - 2) as usize).collect();
        let top_line = format!("┌{bar}┐");
        let bottom_line = format!("└{bar}┘");
        self.write_at(x, y, &top_line, color, None)?;
        for row in 1..h - 1 {
            self.write_at(x, y + row, &vertical.to_string(), color, None)?;
            self.write_at(x + w - 1, y + row, &vertical.to_string(), color, None)?;
        }
        self.write_at(x, y + h - 1, &bottom_line, color, None)
    }

    fn repaint_cells(
        &mut self,
        id: PanelId,
        from: Point<i32>,
        size: (u16, u16),
    ) -> Result<(), SurfaceError> {
        let panel = self.panel(id)?;
        let Some((x, y)) = self.origin(panel) else {
            return Ok(());
        };
        let (w, h) = (panel.shell.width as i32, panel.shell.height as i32);
        let mut writes = Vec::new();
        for dy in 0..size.1 as i32 {
            for dx in 0..size.0 as i32 {
                let pos = Point::new(from.x + dx, from.y + dy);
                if pos.x < 0 || pos.y < 0 || pos.x >= w || pos.y >= h {
                    continue;
                }
                writes.push((pos, panel.cell_at(pos)));
            }
        }
        for (pos, cell) in writes {
            let cx = x + 1 + pos.x as u16;
            let cy = y + 1 + pos.y as u16;
            match cell {
                Some(c) => {
                    let fg = c.fg_color.map(|_| to_crossterm_color(c.fg_color));
                    let bg = c.bg_color.map(|_| to_crossterm_color(c.bg_color));
                    self.write_at(cx, cy, &c.chr.to_string(), fg, bg)?
                }
                None => self.write_at(cx, cy, " ", None, None)?,
            }
        }
        Ok(())
    }

    fn repaint_footer_row(&mut self, id: PanelId, row: u16) -> Result<(), SurfaceError> {
        let panel = self.panel(id)?;
        let Some((x, y)) = self.origin(panel) else {
            return Ok(());
        };
        let width = panel.shell.width as usize;
        let (text, color) = match row {
            0 => (panel.name.clone(), None),
            1 => match panel.health {
                Some((fraction, bar_width)) => health_bar(fraction, bar_width),
                None => (String::new(), None),
            },
            _ => (
                panel.statuses.values().cloned().collect::<Vec<_>>().join(" "),
                Some(Color::Cyan),
            ),
        };
        let line: String = text
            .chars()
            .chain(std::iter::repeat(' '))
            .take(width)
            .collect();
        let ry = y + 1 + panel.shell.height + row;
        self.write_at(x + 1, ry, &line, color, None)
    }

    fn repaint_all(&mut self, id: PanelId) -> Result<(), SurfaceError> {
        let (w, h) = {
            let p = self.panel(id)?;
            (p.shell.width, p.shell.height)
        };
        self.repaint_border(id)?;
        self.repaint_cells(id, Point::new(0, 0), (w, h))?;
        for row in 0..FOOTER_ROWS {
            self.repaint_footer_row(id, row)?;
        }
        Ok(())
    }

    fn blank(&mut self, id: PanelId) -> Result<(), SurfaceError> {
        let panel = self.panel(id)?;
        let Some((x, y)) = self.origin(panel) else {
            return Ok(());
        };
        let (w, h) = panel.outer_size();
        let line = " ".repeat(w as usize);
        for row in 0..h {
            self.write_at(x, y + row, &line, None, None)?;
        }
        Ok(())
    }
}

impl PanelSurface for TerminalSurface {
    fn create_shell(&mut self, panel: PanelId, shell: &PanelShell) -> Result<(), SurfaceError> {
        debug!("terminal shell for panel {panel} ({}x{})", shell.width, shell.height);
        self.panels.insert(panel, TerminalPanel::new(shell.clone()));
        Ok(())
    }

    fn destroy_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError> {
        self.blank(panel)?;
        self.panels.remove(&panel);
        Ok(())
    }

    fn show_shell(&mut self, panel: PanelId, slot: usize) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?.slot = Some(slot);
        self.repaint_all(panel)
    }

    fn hide_shell(&mut self, panel: PanelId) -> Result<(), SurfaceError> {
        self.blank(panel)?;
        let shell = self.panel(panel)?.shell.clone();
        self.panels.insert(panel, TerminalPanel::new(shell));
        Ok(())
    }

    fn draw_image(
        &mut self,
        panel: PanelId,
        layer: ImageLayer,
        top_left: Point<i32>,
        image: &ImageResource,
    ) -> Result<(), SurfaceError> {
        let (w, h) = image.size();
        let mut cells = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                if let Some(c) = image.pixel(x, y)
                    && c.chr != ' '
                {
                    cells.push((Point::new(top_left.x + x as i32, top_left.y + y as i32), *c));
                }
            }
        }
        self.panel_mut(panel)?.layers.insert(layer, cells);
        self.repaint_cells(panel, top_left, (w, h))
    }

    fn clear_image(&mut self, panel: PanelId, layer: &ImageLayer) -> Result<(), SurfaceError> {
        let Some(cells) = self.panel_mut(panel)?.layers.remove(layer) else {
            return Ok(());
        };
        for (pos, _) in cells {
            self.repaint_cells(panel, pos, (1, 1))?;
        }
        Ok(())
    }

    fn set_name(&mut self, panel: PanelId, name: &str) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?.name = name.to_string();
        self.repaint_footer_row(panel, 0)
    }

    fn set_border(&mut self, panel: PanelId, highlighted: bool) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?.highlighted = highlighted;
        self.repaint_border(panel)
    }

    fn set_health(
        &mut self,
        panel: PanelId,
        fraction: f32,
        bar_width: u16,
    ) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?.health = Some((fraction, bar_width));
        self.repaint_footer_row(panel, 1)
    }

    fn add_status(&mut self, panel: PanelId, key: &str, glyph: &str) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?
            .statuses
            .insert(key.to_string(), glyph.to_string());
        self.repaint_footer_row(panel, 2)
    }

    fn remove_status(&mut self, panel: PanelId, key: &str) -> Result<(), SurfaceError> {
        self.panel_mut(panel)?.statuses.remove(key);
        self.repaint_footer_row(panel, 2)
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        self.out.flush()?;
        Ok(())
    }
}

fn health_bar(fraction: f32, bar_width: u16) -> (String, Option<Color>) {
    let filled = (fraction.clamp(0.0, 1.0) * bar_width as f32).round() as usize;
    let empty = (bar_width as usize).saturating_sub(filled);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));
    let color = if fraction > 0.5 {
        Color::Green
    } else if fraction > 0.25 {
        Color::Yellow
    } else {
        Color::Red
    };
    (bar, Some(color))
}

pub fn to_crossterm_color(colour: Option<ascii_assets::Color>) -> Color {
    if let Some(colour) = colour {
        if colour.reset {
            Color::Reset
        } else {
            let (r, g, b) = colour.rgb;
            Color::Rgb { r, g, b }
        }
    } else {
        Color::Reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_bar_fills_proportionally() {
        let (bar, color) = health_bar(0.5, 10);
        assert_eq!(bar.chars().filter(|c| *c == '█').count(), 5);
        assert_eq!(bar.chars().count(), 10);
        assert_eq!(color, Some(Color::Yellow));
        assert_eq!(health_bar(1.0, 4).1, Some(Color::Green));
        assert_eq!(health_bar(0.1, 4).1, Some(Color::Red));
    }
}
