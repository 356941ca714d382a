// 应用状态与事件分发：键盘、鼠标、焦点；每帧由 ui::draw 回写布局区域供命中测试

use std::{
    collections::{HashMap, HashSet},
    sync::mpsc::{Receiver, TryRecvError},
    time::{Duration, Instant},
};

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use tracing::{error, info};

use crate::{
    card::{CardStates, GridLayout},
    config::{Config, KeyAction, Theme, ViewSettings},
    data::{LoadOutcome, Record, RecordId},
    filter::{filtered_indices, CountryFilter},
    scroll::{Direction, ScrollController},
};

const FAST_TICK: Duration = Duration::from_millis(16);
const IDLE_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

/// 上一帧各区域的位置，鼠标事件据此命中
#[derive(Debug, Default, Clone)]
pub struct LayoutAreas {
    pub filter_bar: Rect,
    pub tag_removers: Vec<(Rect, String)>,
    pub clear_all: Option<Rect>,
    pub dropdown: Option<Rect>,
    pub options: Vec<(Rect, String)>,
    pub grid: Rect,
    pub affordances: Vec<(Rect, Direction)>,
}

#[derive(Debug)]
pub struct App {
    pub records: Vec<Record>,
    pub filter: CountryFilter,
    pub visible: Vec<usize>,
    pub cards: CardStates,
    pub scroll: ScrollController,
    pub view: ViewSettings,
    pub theme: Theme,
    pub keymap: HashMap<char, KeyAction>,
    pub layout: LayoutAreas,
    pub load_state: LoadState,
    pub source_label: String,
    loader: Option<Receiver<LoadOutcome>>,
}

impl App {
    pub fn new(
        source_label: String,
        config: Config,
        theme: Theme,
        loader: Option<Receiver<LoadOutcome>>,
    ) -> Self {
        Self {
            records: Vec::new(),
            filter: CountryFilter::default(),
            visible: Vec::new(),
            cards: CardStates::default(),
            scroll: ScrollController::new(config.view.edge_threshold, config.view.center_delay()),
            view: config.view,
            theme,
            keymap: config.keymap,
            layout: LayoutAreas::default(),
            load_state: LoadState::Loading,
            source_label,
            loader,
        }
    }

    pub fn grid(&self) -> GridLayout {
        GridLayout::for_count(self.visible.len(), &self.view)
    }

    pub fn visible_records(&self) -> impl Iterator<Item = &Record> {
        self.visible.iter().map(|&i| &self.records[i])
    }

    pub fn set_records(&mut self, records: Vec<Record>, now: Instant) {
        self.filter = CountryFilter::new(&records);
        self.records = records;
        self.cards.clear();
        self.load_state = LoadState::Ready;
        self.selection_changed(now);
    }

    fn selection_changed(&mut self, now: Instant) {
        self.visible = filtered_indices(&self.records, self.filter.selection());
        let ids: HashSet<RecordId> = self.visible_records().map(|r| r.id).collect();
        self.cards.retain_visible(&ids);
        self.scroll.content_changed(now, !self.visible.is_empty());
        info!(
            selected = ?self.filter.selection(),
            visible = self.visible.len(),
            "可见卡片已更新"
        );
    }

    pub fn poll_loader(&mut self, now: Instant) {
        let Some(rx) = self.loader.as_ref() else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                error!(source = %self.source_label, "载入线程意外退出");
                self.loader = None;
                self.load_state = LoadState::Failed;
                return;
            }
        };
        self.loader = None;
        match outcome {
            Ok(records) => self.set_records(records, now),
            Err(err) => {
                // 不重试：保持空列表，界面照常运行
                let err = anyhow::Error::new(err);
                error!("载入数据失败: {err:#}");
                self.load_state = LoadState::Failed;
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.poll_loader(now);
        self.scroll.tick(now);
    }

    pub fn poll_interval(&self) -> Duration {
        if self.scroll.is_animating() {
            FAST_TICK
        } else {
            IDLE_TICK
        }
    }

    /// 返回 true 表示退出
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.filter.is_open() {
            self.handle_filter_key(key, now);
            return false;
        }
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up => self.apply_action(KeyAction::ScrollUp, now),
            KeyCode::Down => self.apply_action(KeyAction::ScrollDown, now),
            KeyCode::Left => self.apply_action(KeyAction::ScrollLeft, now),
            KeyCode::Right => self.apply_action(KeyAction::ScrollRight, now),
            KeyCode::PageUp => self.scroll.scroll_page(Direction::Up),
            KeyCode::PageDown => self.scroll.scroll_page(Direction::Down),
            KeyCode::Home => self.apply_action(KeyAction::ResetOrigin, now),
            KeyCode::Char(c) => match self.keymap.get(&c).copied() {
                Some(action) => self.apply_action(action, now),
                // 未绑定的可见字符直接开始搜索
                None if !c.is_control() && !key.modifiers.contains(KeyModifiers::ALT) => {
                    self.filter.push_char(c)
                }
                None => {}
            },
            _ => {}
        }
        false
    }

    fn handle_filter_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => self.filter.close(),
            KeyCode::Enter => {
                if self.filter.select_highlighted() {
                    self.selection_changed(now);
                }
            }
            KeyCode::Up => self.filter.move_highlight(-1),
            KeyCode::Down => self.filter.move_highlight(1),
            KeyCode::Backspace if self.filter.search().is_empty() => {
                if self.filter.deselect_last() {
                    self.selection_changed(now);
                }
            }
            KeyCode::Backspace => self.filter.pop_char(),
            KeyCode::Char(c) => self.filter.push_char(c),
            _ => {}
        }
    }

    pub fn apply_action(&mut self, action: KeyAction, now: Instant) {
        let step = self.view.scroll_step;
        match action {
            KeyAction::ScrollUp => self.scroll.scroll_step(Direction::Up, step),
            KeyAction::ScrollDown => self.scroll.scroll_step(Direction::Down, step),
            KeyAction::ScrollLeft => self.scroll.scroll_step(Direction::Left, step),
            KeyAction::ScrollRight => self.scroll.scroll_step(Direction::Right, step),
            KeyAction::OpenFilter => self.filter.open(),
            KeyAction::ClearAll => {
                if self.filter.clear_all() {
                    self.selection_changed(now);
                }
            }
            KeyAction::Center => self.scroll.center(),
            KeyAction::ResetOrigin => self.scroll.scroll_to(0, 0),
            KeyAction::CollapseAll => self.cards.clear(),
        }
    }

    pub fn handle_mouse(&mut self, ev: MouseEvent, now: Instant) {
        let (col, row) = (ev.column, ev.row);
        let step = self.view.scroll_step;
        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_left_down(col, row, now),
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.scroll.is_dragging() {
                    // 指针拖出视口即视为释放
                    if rect_contains(self.layout.grid, col, row) {
                        self.scroll.drag_to(col, row);
                    } else {
                        self.scroll.end_drag();
                    }
                }
            }
            // 任意位置松开都结束拖拽
            MouseEventKind::Up(_) => {
                self.scroll.end_drag();
            }
            MouseEventKind::ScrollUp => self.wheel(col, row, Direction::Up, step),
            MouseEventKind::ScrollDown => self.wheel(col, row, Direction::Down, step),
            MouseEventKind::ScrollLeft => self.wheel(col, row, Direction::Left, step),
            MouseEventKind::ScrollRight => self.wheel(col, row, Direction::Right, step),
            _ => {}
        }
    }

    pub fn handle_focus_lost(&mut self) {
        self.scroll.end_drag();
    }

    fn wheel(&mut self, col: u16, row: u16, dir: Direction, step: u32) {
        if let Some(dd) = self.layout.dropdown {
            if rect_contains(dd, col, row) {
                match dir {
                    Direction::Up => self.filter.move_highlight(-1),
                    Direction::Down => self.filter.move_highlight(1),
                    _ => {}
                }
                return;
            }
        }
        if rect_contains(self.layout.grid, col, row) {
            self.scroll.scroll_step(dir, step);
        }
    }

    fn handle_left_down(&mut self, col: u16, row: u16, now: Instant) {
        if self.filter.is_open() {
            if self.layout.dropdown.is_some_and(|dd| rect_contains(dd, col, row)) {
                if let Some(country) = hit(&self.layout.options, col, row) {
                    if self.filter.select(&country) {
                        self.selection_changed(now);
                    }
                }
                return;
            }
            // 点到下拉框以外即关闭
            self.filter.close();
            return;
        }
        if let Some(country) = hit(&self.layout.tag_removers, col, row) {
            if self.filter.deselect(&country) {
                self.selection_changed(now);
            }
            return;
        }
        if self.layout.clear_all.is_some_and(|r| rect_contains(r, col, row)) {
            if self.filter.clear_all() {
                self.selection_changed(now);
            }
            return;
        }
        if rect_contains(self.layout.filter_bar, col, row) {
            self.filter.toggle();
            return;
        }
        if let Some(dir) = hit(&self.layout.affordances, col, row) {
            self.scroll.scroll_page(dir);
            return;
        }
        if rect_contains(self.layout.grid, col, row) {
            // 在卡片上按下只翻牌，不开始拖拽
            match self.card_at(col, row) {
                Some(id) => {
                    self.cards.toggle(id);
                }
                None => self.scroll.begin_drag(col, row),
            }
        }
    }

    /// 屏幕坐标命中的卡片
    pub fn card_at(&self, col: u16, row: u16) -> Option<RecordId> {
        let g = self.layout.grid;
        if !rect_contains(g, col, row) {
            return None;
        }
        let (ox, oy) = self.scroll.offset();
        let x = ox + (col - g.x) as u32;
        let y = oy + (row - g.y) as u32;
        let slot = self.grid().slot_at(x, y)?;
        self.visible.get(slot).map(|&i| self.records[i].id)
    }
}

pub fn rect_contains(r: Rect, col: u16, row: u16) -> bool {
    col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height
}

fn hit<T: Clone>(regions: &[(Rect, T)], col: u16, row: u16) -> Option<T> {
    regions
        .iter()
        .find(|(r, _)| rect_contains(*r, col, row))
        .map(|(_, v)| v.clone())
}
