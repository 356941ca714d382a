// 配置：colourful.toml（[view] 卡片尺寸/滚动参数，[keys] 单字符快捷键）+ 主题

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use ratatui::style::Color;
use serde::Deserialize;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "colourful.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub card_width: u16,
    pub card_height: u16,
    pub gap_x: u16,
    pub gap_y: u16,
    /// 距边缘多少格以内时隐藏方向提示
    pub edge_threshold: u32,
    pub center_delay_ms: u64,
    /// 方向键每次滚动的格数
    pub scroll_step: u32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            card_width: 30,
            card_height: 9,
            gap_x: 2,
            gap_y: 1,
            edge_threshold: 2,
            center_delay_ms: 100,
            scroll_step: 4,
        }
    }
}

impl ViewSettings {
    pub fn center_delay(&self) -> Duration {
        Duration::from_millis(self.center_delay_ms)
    }

    fn sanitized(mut self) -> Self {
        // 卡片至少要容纳边框与两行内容
        self.card_width = self.card_width.max(8);
        self.card_height = self.card_height.max(4);
        self.scroll_step = self.scroll_step.max(1);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    #[serde(default)]
    view: ViewSettings,
    #[serde(default)]
    keys: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub view: ViewSettings,
    pub keymap: HashMap<char, KeyAction>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view: ViewSettings::default(),
            keymap: default_keymap(),
        }
    }
}

/// 读取配置；显式路径读不到是错误，探测不到则用默认值
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };
    let Some(path) = path else {
        debug!("未找到 {}，使用默认配置", CONFIG_FILE_NAME);
        return Ok(Config::default());
    };
    let content = fs::read_to_string(&path)
        .with_context(|| format!("读取配置失败: {}", path.display()))?;
    let cfg = parse_config(&content)
        .with_context(|| format!("解析配置失败: {}", path.display()))?;
    debug!(path = %path.display(), "已载入配置");
    Ok(cfg)
}

fn find_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|anc| anc.join(CONFIG_FILE_NAME))
        .find(|p| p.exists())
}

pub fn parse_config(content: &str) -> Result<Config> {
    let raw: ConfigToml = toml::from_str(content)?;
    Ok(Config {
        view: raw.view.sanitized(),
        keymap: parse_keymap(raw.keys),
    })
}

// ---------------- Keymap ----------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    OpenFilter,
    ClearAll,
    Center,
    ResetOrigin,
    CollapseAll,
}

pub fn parse_keymap(map: HashMap<String, String>) -> HashMap<char, KeyAction> {
    let mut out = HashMap::new();
    for (k, v) in map {
        let mut chars = k.chars();
        match (chars.next(), chars.next(), action_from_str(&v)) {
            (Some(ch), None, Some(act)) => {
                out.insert(ch, act);
            }
            _ => warn!(key = %k, action = %v, "忽略无效的快捷键配置"),
        }
    }
    if out.is_empty() {
        out = default_keymap();
    }
    out
}

fn action_from_str(s: &str) -> Option<KeyAction> {
    use KeyAction::*;
    Some(match s {
        "scroll_up" => ScrollUp,
        "scroll_down" => ScrollDown,
        "scroll_left" => ScrollLeft,
        "scroll_right" => ScrollRight,
        "open_filter" => OpenFilter,
        "clear_all" => ClearAll,
        "center" => Center,
        "reset_origin" => ResetOrigin,
        "collapse_all" => CollapseAll,
        _ => return None,
    })
}

pub fn default_keymap() -> HashMap<char, KeyAction> {
    use KeyAction::*;
    let mut m = HashMap::new();
    m.insert('k', ScrollUp);
    m.insert('j', ScrollDown);
    m.insert('h', ScrollLeft);
    m.insert('l', ScrollRight);
    m.insert('/', OpenFilter);
    m.insert('x', ClearAll);
    m.insert('c', Center);
    m.insert('r', ResetOrigin);
    m.insert('z', CollapseAll);
    m
}

// ---------------- 主题 ----------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeKind {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub ink: Color,
    pub bar_bg: Color,
    pub selection_bg: Color,
    pub card_bg: Color,
    pub tag_bg: Color,
}

pub fn theme_of(kind: ThemeKind) -> Theme {
    match kind {
        ThemeKind::Dark => Theme {
            fg: Color::Rgb(220, 220, 220),
            muted: Color::Rgb(140, 140, 140),
            accent: Color::Rgb(229, 149, 0), // 橙色，与标题一致
            ink: Color::Rgb(120, 170, 255),
            bar_bg: Color::Rgb(35, 40, 46),
            selection_bg: Color::Rgb(60, 65, 72),
            card_bg: Color::Rgb(28, 32, 38),
            tag_bg: Color::Rgb(70, 52, 20),
        },
        ThemeKind::Light => Theme {
            fg: Color::Rgb(30, 30, 30),
            muted: Color::Rgb(120, 120, 120),
            accent: Color::Rgb(229, 149, 0),
            ink: Color::Rgb(0, 38, 66),
            bar_bg: Color::Rgb(235, 240, 245),
            selection_bg: Color::Rgb(210, 220, 235),
            card_bg: Color::Rgb(250, 250, 250),
            tag_bg: Color::Rgb(255, 228, 180),
        },
    }
}
