use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use ascii_assets::{AsciiSprite, AsciiVideo, Color, TerminalChar};
use crossbeam_channel::unbounded;
use crossterm::event::{Event, KeyCode, MouseButton, MouseEventKind, poll, read};
use env_logger::Builder;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use ltoverlay::{
    AppError, BodyPart, ChannelCommandSink, DisplayOverrides, EntityFeed, EntitySnapshot,
    LayoutRecord, OverlayConfig, OverlayEngine, TerminalSurface, WoundRank, init_terminal,
    restore_terminal, start_overlay,
};

const COLUMN_STRIDE: u16 = 24;
const DEMO_ROOT: &str = "assets/demo";

fn main() -> Result<(), AppError> {
    setup_logger("./ltoverlay.log".to_string())?;

    let config = match std::env::args().nth(1) {
        Some(path) => OverlayConfig::load(path)?,
        None => {
            let config = OverlayConfig {
                asset_root: format!("{DEMO_ROOT}/families"),
                layout_root: format!("{DEMO_ROOT}/layouts"),
                ..OverlayConfig::default()
            };
            generate_demo_assets(&config)?;
            config
        }
    };

    let (cmd_tx, cmd_rx) = unbounded();
    let interval = config.interval();
    let max_shown = config.max_shown;
    let engine = OverlayEngine::from_config(config, TerminalSurface::new(COLUMN_STRIDE, 1))
        .with_command_sink(Box::new(ChannelCommandSink::new(cmd_tx)));

    init_terminal()?;
    let handle = start_overlay(engine, DemoFeed::new(7), interval);

    let mut shown = max_shown;
    let mut running = true;
    while running {
        if poll(Duration::from_millis(20))? {
            match read()? {
                Event::Key(k) => match k.code {
                    KeyCode::Esc | KeyCode::Char('q') => running = false,
                    KeyCode::Char('r') => handle.reload()?,
                    KeyCode::Char('+') => {
                        shown += 1;
                        handle.set_max_shown(shown)?;
                    }
                    KeyCode::Char('-') => {
                        shown = shown.saturating_sub(1);
                        handle.set_max_shown(shown)?;
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                        let slot = c as usize - '1' as usize;
                        handle.click_slot(slot)?;
                    }
                    _ => {}
                },
                Event::Mouse(m) => {
                    if m.kind == MouseEventKind::Down(MouseButton::Left) {
                        handle.click_slot((m.column / COLUMN_STRIDE) as usize)?;
                    }
                }
                _ => {}
            }
        }
        for command in cmd_rx.try_iter() {
            info!("game command: {command}");
        }
    }

    let stats = handle.shutdown()?;
    restore_terminal()?;
    info!("final stats: {stats:?}");
    Ok(())
}

fn setup_logger(logfilepath: String) -> Result<(), AppError> {
    let log_file = File::create(logfilepath)?;
    Builder::new()
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] - {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug)
        .init();
    Ok(())
}

/// Random entities wandering in and out of view.
struct DemoFeed {
    rng: StdRng,
    roster: Vec<EntitySnapshot>,
    next_id: u64,
}

const NAMES: [&str; 6] = ["Valravn", "Grey Wolf", "Marsh Wolf", "Bandit", "Sentry", "Troll"];
const NOUNS: [(&str, &str); 6] = [
    ("valravn", "bird"),
    ("grey wolf", "wolf"),
    ("marsh wolf", "wolf"),
    ("bandit", "humanoid"),
    ("sentry", "humanoid"),
    ("troll", "giant"),
];
const PARTS: [&str; 5] = ["head", "chest", "left_arm", "right_arm", "legs"];
const STATUSES: [&str; 4] = ["stunned", "bleeding", "poisoned", "webbed"];

impl DemoFeed {
    fn new(seed: u64) -> Self {
        let mut feed = DemoFeed {
            rng: StdRng::seed_from_u64(seed),
            roster: Vec::new(),
            next_id: 1,
        };
        for _ in 0..4 {
            feed.spawn();
        }
        feed
    }

    fn spawn(&mut self) {
        let pick = self.rng.gen_range(0..NAMES.len());
        let (noun, family) = NOUNS[pick];
        let entity = EntitySnapshot::new(self.next_id, NAMES[pick], noun, family)
            .with_health(self.rng.gen_range(0.4..1.0));
        self.next_id += 1;
        self.roster.push(entity);
    }
}

impl EntityFeed for DemoFeed {
    fn snapshot(&mut self) -> Vec<EntitySnapshot> {
        if self.rng.gen_bool(0.05) && !self.roster.is_empty() {
            let gone = self.rng.gen_range(0..self.roster.len());
            self.roster.remove(gone);
        }
        if self.roster.len() < 7 && self.rng.gen_bool(0.08) {
            self.spawn();
        }

        let target = self.rng.gen_bool(0.02).then(|| self.rng.gen_range(0..8));
        for (idx, entity) in self.roster.iter_mut().enumerate() {
            if self.rng.gen_bool(0.3) {
                let delta: f32 = self.rng.gen_range(-0.05..0.02);
                entity.health = (entity.health + delta).clamp(0.0, 1.0);
            }
            if self.rng.gen_bool(0.04)
                && let Some(part) = PARTS.choose(&mut self.rng)
                && let Some(rank) = WoundRank::from_severity(self.rng.gen_range(1..4))
            {
                entity.wounds.insert(BodyPart::new(part), rank);
            }
            if self.rng.gen_bool(0.03)
                && let Some(status) = STATUSES.choose(&mut self.rng)
            {
                let status = status.to_string();
                if !entity.statuses.remove(&status) {
                    entity.statuses.insert(status);
                }
            }
            if let Some(target) = target {
                entity.is_target = idx == target;
            }
        }
        self.roster.retain(|e| e.health > 0.0);
        self.roster.clone()
    }
}

fn cell(chr: char, rgb: Option<(u8, u8, u8)>) -> TerminalChar {
    TerminalChar {
        chr,
        fg_color: rgb.map(|rgb| Color { rgb, reset: false }),
        bg_color: None,
    }
}

fn write_image(
    path: &Path,
    width: usize,
    height: usize,
    pixels: Vec<TerminalChar>,
) -> Result<(), AppError> {
    let video = AsciiVideo {
        width: width as _,
        height: height as _,
        frames: vec![AsciiSprite {
            pixels,
            width: width as _,
            height: height as _,
        }],
    };
    let path = path.to_string_lossy().to_string();
    video.write_to_file(path.as_str())?;
    Ok(())
}

/// An oval body outline, `width` by `height` cells.
fn silhouette(width: usize, height: usize, chr: char, rgb: (u8, u8, u8)) -> Vec<TerminalChar> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f32 + 0.5 - cx) / cx;
            let dy = (y as f32 + 0.5 - cy) / cy;
            let inside = dx * dx + dy * dy <= 1.0;
            pixels.push(cell(if inside { chr } else { ' ' }, Some(rgb)));
        }
    }
    pixels
}

fn generate_demo_assets(config: &OverlayConfig) -> Result<(), AppError> {
    let families = [
        ("default", '.', (150, 150, 150)),
        ("bird", '^', (120, 160, 255)),
        ("wolf", '#', (170, 140, 100)),
        ("humanoid", '@', (220, 200, 170)),
    ];
    let marker_colors = [(255, 220, 0), (255, 140, 0), (255, 0, 0)];
    let (width, height) = (20, 10);

    for (family, chr, rgb) in families {
        let dir = Path::new(&config.asset_root).join(family);
        fs::create_dir_all(&dir)?;
        let outline = silhouette(width, height, chr, rgb);
        write_image(&dir.join("silhouette.ascv"), width, height, outline)?;
        for (rank, color) in marker_colors.iter().enumerate() {
            let name = format!("rank{}.ascv", rank + 1);
            write_image(&dir.join(name), 1, 1, vec![cell('x', Some(*color))])?;
        }
    }

    let coords: BTreeMap<BodyPart, (i32, i32)> = [
        ("head", (10, 1)),
        ("chest", (10, 4)),
        ("left_arm", (5, 4)),
        ("right_arm", (15, 4)),
        ("legs", (10, 8)),
    ]
    .into_iter()
    .map(|(part, xy)| (BodyPart::new(part), xy))
    .collect();

    fs::create_dir_all(&config.layout_root)?;
    for (family, _, _) in families {
        let mut record = LayoutRecord {
            coords: coords.clone(),
            ..LayoutRecord::default()
        };
        if family == "bird" {
            // birds have no arms
            record.coords.remove(&BodyPart::new("left_arm"));
            record.coords.remove(&BodyPart::new("right_arm"));
            record.display = DisplayOverrides {
                show_status: Some(false),
                ..DisplayOverrides::default()
            };
        }
        let json = serde_json::to_string_pretty(&record).map_err(std::io::Error::from)?;
        fs::write(Path::new(&config.layout_root).join(format!("{family}.json")), json)?;
    }
    info!("demo assets written below {DEMO_ROOT}");
    Ok(())
}
