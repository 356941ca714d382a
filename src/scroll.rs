// 视口滚动：方向提示、首次居中、筛选后回到原点、平滑滚动与拖拽平移

use std::time::{Duration, Instant};

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub offset_x: u32,
    pub offset_y: u32,
    pub viewport_w: u32,
    pub viewport_h: u32,
    pub content_w: u32,
    pub content_h: u32,
}

impl ScrollMetrics {
    pub fn max_x(&self) -> u32 {
        self.content_w.saturating_sub(self.viewport_w)
    }

    pub fn max_y(&self) -> u32 {
        self.content_h.saturating_sub(self.viewport_h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Affordances {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Affordances {
    /// 距边缘超过 threshold 才显示；`a < b - t` 写成 `a + t < b` 避免下溢
    pub fn compute(m: &ScrollMetrics, threshold: u32) -> Self {
        Self {
            up: m.offset_y > threshold,
            down: m.offset_y + m.viewport_h + threshold < m.content_h,
            left: m.offset_x > threshold,
            right: m.offset_x + m.viewport_w + threshold < m.content_w,
        }
    }

    pub fn shows(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// 一次拖拽：按下时的指针位置与滚动偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub start_col: u16,
    pub start_row: u16,
    pub start_x: u32,
    pub start_y: u32,
}

#[derive(Debug)]
pub struct ScrollController {
    metrics: ScrollMetrics,
    affordances: Affordances,
    threshold: u32,
    behavior: ScrollBehavior,
    target: Option<(u32, u32)>,
    drag: Option<DragSession>,
    has_rendered: bool,
    center_due: Option<Instant>,
    center_delay: Duration,
}

impl ScrollController {
    pub fn new(threshold: u32, center_delay: Duration) -> Self {
        Self {
            metrics: ScrollMetrics::default(),
            affordances: Affordances::default(),
            threshold,
            behavior: ScrollBehavior::Smooth,
            target: None,
            drag: None,
            has_rendered: false,
            center_due: None,
            center_delay,
        }
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn offset(&self) -> (u32, u32) {
        (self.metrics.offset_x, self.metrics.offset_y)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// 还有动画或待执行的居中时，主循环需要更快地 tick
    pub fn is_animating(&self) -> bool {
        self.target.is_some() || self.center_due.is_some()
    }

    /// 每帧布局后调用：更新视口/内容尺寸并把偏移收回合法范围
    pub fn set_extents(&mut self, viewport_w: u32, viewport_h: u32, content_w: u32, content_h: u32) {
        self.metrics.viewport_w = viewport_w;
        self.metrics.viewport_h = viewport_h;
        self.metrics.content_w = content_w;
        self.metrics.content_h = content_h;
        self.metrics.offset_x = self.metrics.offset_x.min(self.metrics.max_x());
        self.metrics.offset_y = self.metrics.offset_y.min(self.metrics.max_y());
        if let Some((x, y)) = self.target {
            self.target = Some(self.clamp(x, y));
        }
        self.refresh();
    }

    /// 可见卡片集合变化：第一次有内容时延迟居中，之后一律回到原点
    pub fn content_changed(&mut self, now: Instant, has_content: bool) {
        if !self.has_rendered {
            if has_content {
                self.has_rendered = true;
                self.center_due = Some(now + self.center_delay);
                debug!(delay_ms = self.center_delay.as_millis() as u64, "安排首次居中");
            }
            return;
        }
        self.center_due = None;
        self.target = None;
        self.jump_to(0, 0);
        debug!("可见集合变化，回到原点");
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(due) = self.center_due {
            // 等布局量出内容宽度后再居中，否则延迟为 0 时会按空画布居中
            if now >= due && self.metrics.content_w > 0 {
                self.center_due = None;
                self.target = None;
                self.center();
            }
        }
        let Some((tx, ty)) = self.target else {
            return;
        };
        let step = |cur: u32, to: u32| -> u32 {
            let diff = to.abs_diff(cur);
            let delta = (diff / 3).max(1).min(diff);
            if to > cur {
                cur + delta
            } else {
                cur - delta
            }
        };
        self.metrics.offset_x = step(self.metrics.offset_x, tx);
        self.metrics.offset_y = step(self.metrics.offset_y, ty);
        if (self.metrics.offset_x, self.metrics.offset_y) == (tx, ty) {
            self.target = None;
        }
        self.refresh();
    }

    /// 水平居中、垂直回到顶部
    pub fn center(&mut self) {
        let x = self.metrics.max_x() / 2;
        self.jump_to(x, 0);
        debug!(x, "视口水平居中");
    }

    pub fn scroll_to(&mut self, x: u32, y: u32) {
        let (x, y) = self.clamp(x, y);
        match self.behavior {
            ScrollBehavior::Instant => self.jump_to(x, y),
            ScrollBehavior::Smooth => self.target = Some((x, y)),
        }
    }

    /// 以当前动画目标为基准叠加，连续按键不会丢步
    pub fn scroll_by(&mut self, dx: i64, dy: i64) {
        let (bx, by) = self.target.unwrap_or(self.offset());
        let x = (bx as i64 + dx).max(0) as u32;
        let y = (by as i64 + dy).max(0) as u32;
        self.scroll_to(x, y);
    }

    pub fn scroll_step(&mut self, dir: Direction, amount: u32) {
        let a = amount as i64;
        match dir {
            Direction::Up => self.scroll_by(0, -a),
            Direction::Down => self.scroll_by(0, a),
            Direction::Left => self.scroll_by(-a, 0),
            Direction::Right => self.scroll_by(a, 0),
        }
    }

    /// 点击方向提示：朝该方向滚动一屏
    pub fn scroll_page(&mut self, dir: Direction) {
        let amount = match dir {
            Direction::Up | Direction::Down => self.metrics.viewport_h,
            Direction::Left | Direction::Right => self.metrics.viewport_w,
        };
        self.scroll_step(dir, amount.max(1));
    }

    pub fn begin_drag(&mut self, col: u16, row: u16) {
        self.target = None;
        self.behavior = ScrollBehavior::Instant;
        self.drag = Some(DragSession {
            start_col: col,
            start_row: row,
            start_x: self.metrics.offset_x,
            start_y: self.metrics.offset_y,
        });
        trace!(col, row, "开始拖拽");
    }

    /// 内容跟随指针：offset = 起始偏移 − 指针位移
    pub fn drag_to(&mut self, col: u16, row: u16) {
        let Some(s) = self.drag else {
            return;
        };
        let x = s.start_x as i64 - (col as i64 - s.start_col as i64);
        let y = s.start_y as i64 - (row as i64 - s.start_row as i64);
        self.jump_to(x.max(0) as u32, y.max(0) as u32);
    }

    /// 任意释放路径都走这里；返回是否确实结束了一次拖拽
    pub fn end_drag(&mut self) -> bool {
        let ended = self.drag.take().is_some();
        if ended {
            self.behavior = ScrollBehavior::Smooth;
            trace!("结束拖拽");
        }
        ended
    }

    fn clamp(&self, x: u32, y: u32) -> (u32, u32) {
        (x.min(self.metrics.max_x()), y.min(self.metrics.max_y()))
    }

    fn jump_to(&mut self, x: u32, y: u32) {
        let (x, y) = self.clamp(x, y);
        self.metrics.offset_x = x;
        self.metrics.offset_y = y;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.affordances = Affordances::compute(&self.metrics, self.threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(ox: u32, oy: u32) -> ScrollMetrics {
        ScrollMetrics {
            offset_x: ox,
            offset_y: oy,
            viewport_w: 400,
            viewport_h: 300,
            content_w: 1000,
            content_h: 900,
        }
    }

    fn controller() -> ScrollController {
        let mut c = ScrollController::new(2, Duration::from_millis(100));
        c.set_extents(40, 20, 100, 60);
        c
    }

    fn settle(c: &mut ScrollController) {
        let now = Instant::now();
        for _ in 0..200 {
            c.tick(now);
        }
    }

    #[test]
    fn affordance_thresholds_are_strict() {
        let at_origin = Affordances::compute(&metrics(0, 0), 50);
        assert_eq!(
            at_origin,
            Affordances {
                up: false,
                down: true,
                left: false,
                right: true
            }
        );
        let edge = Affordances::compute(&metrics(50, 50), 50);
        assert!(!edge.up && !edge.left);
        let past = Affordances::compute(&metrics(51, 51), 50);
        assert!(past.up && past.left);
        // 距离远端恰好 50：隐藏；51：显示
        let far = Affordances::compute(&metrics(550, 550), 50);
        assert!(!far.right && !far.down);
        let near = Affordances::compute(&metrics(549, 549), 50);
        assert!(near.right && near.down);
    }

    #[test]
    fn small_content_shows_nothing() {
        let m = ScrollMetrics {
            viewport_w: 80,
            viewport_h: 24,
            content_w: 30,
            content_h: 9,
            ..ScrollMetrics::default()
        };
        assert_eq!(Affordances::compute(&m, 2), Affordances::default());
    }

    #[test]
    fn first_content_is_centered_after_delay() {
        let mut c = controller();
        let t0 = Instant::now();
        c.content_changed(t0, true);
        c.tick(t0);
        assert_eq!(c.offset(), (0, 0));
        c.tick(t0 + Duration::from_millis(100));
        assert_eq!(c.offset(), (30, 0));
        assert!(c.affordances().left && c.affordances().right);
        assert!(!c.is_animating());
    }

    #[test]
    fn zero_delay_center_waits_for_layout() {
        let mut c = ScrollController::new(2, Duration::ZERO);
        let t0 = Instant::now();
        c.content_changed(t0, true);
        c.tick(t0);
        assert!(c.is_animating());
        c.set_extents(40, 20, 100, 60);
        c.tick(t0);
        assert_eq!(c.offset(), (30, 0));
        assert!(!c.is_animating());
    }

    #[test]
    fn empty_first_load_does_not_center() {
        let mut c = controller();
        let t0 = Instant::now();
        c.content_changed(t0, false);
        assert!(!c.is_animating());
        c.content_changed(t0, true);
        assert!(c.is_animating());
    }

    #[test]
    fn later_changes_reset_to_origin() {
        let mut c = controller();
        let t0 = Instant::now();
        c.content_changed(t0, true);
        c.tick(t0 + Duration::from_secs(1));
        c.scroll_to(10, 10);
        settle(&mut c);
        assert_eq!(c.offset(), (10, 10));
        c.content_changed(t0, true);
        assert_eq!(c.offset(), (0, 0));
    }

    #[test]
    fn change_before_center_fires_cancels_it() {
        let mut c = controller();
        let t0 = Instant::now();
        c.content_changed(t0, true);
        c.content_changed(t0, true);
        c.tick(t0 + Duration::from_secs(1));
        assert_eq!(c.offset(), (0, 0));
    }

    #[test]
    fn smooth_scroll_converges_and_clamps() {
        let mut c = controller();
        c.scroll_by(500, 7);
        assert_eq!(c.offset(), (0, 0));
        assert!(c.is_animating());
        settle(&mut c);
        assert_eq!(c.offset(), (60, 7));
        assert!(!c.is_animating());
    }

    #[test]
    fn page_scroll_moves_by_viewport() {
        let mut c = controller();
        c.scroll_page(Direction::Down);
        settle(&mut c);
        assert_eq!(c.offset(), (0, 20));
        c.scroll_page(Direction::Up);
        settle(&mut c);
        assert_eq!(c.offset(), (0, 0));
    }

    #[test]
    fn drag_follows_pointer_inverted() {
        let mut c = controller();
        c.scroll_to(20, 20);
        settle(&mut c);
        c.begin_drag(10, 10);
        assert_eq!(c.behavior, ScrollBehavior::Instant);
        c.drag_to(4, 13);
        assert_eq!(c.offset(), (26, 17));
        c.drag_to(100, 100);
        assert_eq!(c.offset(), (0, 0));
        c.drag_to(0, 0);
        assert_eq!(c.offset(), (30, 30));
        assert!(c.end_drag());
        assert_eq!(c.behavior, ScrollBehavior::Smooth);
        assert!(!c.end_drag());
        c.drag_to(50, 50);
        assert_eq!(c.offset(), (30, 30));
    }

    #[test]
    fn drag_cancels_running_animation() {
        let mut c = controller();
        c.scroll_by(40, 0);
        c.begin_drag(0, 0);
        assert!(!c.is_animating());
        c.tick(Instant::now());
        assert_eq!(c.offset(), (0, 0));
    }

    #[test]
    fn shrinking_content_clamps_offset() {
        let mut c = controller();
        c.scroll_to(60, 40);
        settle(&mut c);
        c.set_extents(40, 20, 50, 25);
        assert_eq!(c.offset(), (10, 5));
    }
}
