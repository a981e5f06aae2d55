//! Infinite-scroll trigger.
//!
//! Headless model of a visibility-intersection observer: the embedding view
//! reports the viewport and sentinel geometry, the trigger decides whether
//! enough of the sentinel is visible and fires once per arming.
//!
//! ### Semantics
//!
//! - Root margin grows (or shrinks, when negative) the viewport box before the test.
//! - Intersection ratio is `visible area / sentinel area`; a zero-area
//!   sentinel counts as fully visible when it lies inside the root box.
//! - Without observer support the trigger never reports visible.

use std::str::FromStr;

use crate::Error;

/// Axis-aligned box in viewport pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap with `other`, edges inclusive. `None` when the boxes are apart.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Apply a root margin to this box.
    pub fn expand(&self, margin: &RootMargin) -> Rect {
        let top = margin.top.resolve(self.height);
        let right = margin.right.resolve(self.width);
        let bottom = margin.bottom.resolve(self.height);
        let left = margin.left.resolve(self.width);
        Rect::new(self.x - left, self.y - top, self.width + left + right, self.height + top + bottom)
    }
}

/// One root-margin component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Length {
    /// Resolve against the matching dimension of the root box.
    pub fn resolve(&self, base: f64) -> f64 {
        match self {
            Length::Px(px) => *px,
            Length::Percent(pct) => base * pct / 100.0,
        }
    }
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, percent) = if let Some(n) = s.strip_suffix('%') {
            (n, true)
        } else if let Some(n) = s.strip_suffix("px") {
            (n, false)
        } else if s == "0" {
            (s, false)
        } else {
            return Err(Error::InvalidInput(format!("root margin must be in px or %: {s}")));
        };

        number
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| if percent { Length::Percent(v) } else { Length::Px(v) })
            .ok_or_else(|| Error::InvalidInput(format!("invalid root margin length: {s}")))
    }
}

/// CSS-style margin around the viewport box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Default for RootMargin {
    fn default() -> Self {
        let zero = Length::Percent(0.0);
        Self { top: zero, right: zero, bottom: zero, left: zero }
    }
}

impl FromStr for RootMargin {
    type Err = Error;

    /// Parse the 1-4 value shorthand (`"10px"`, `"0px 0px 200px"`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(Length::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let margin = match parts.as_slice() {
            [all] => RootMargin { top: *all, right: *all, bottom: *all, left: *all },
            [vertical, horizontal] => {
                RootMargin { top: *vertical, right: *horizontal, bottom: *vertical, left: *horizontal }
            }
            [top, horizontal, bottom] => RootMargin { top: *top, right: *horizontal, bottom: *bottom, left: *horizontal },
            [top, right, bottom, left] => RootMargin { top: *top, right: *right, bottom: *bottom, left: *left },
            _ => return Err(Error::InvalidInput(format!("root margin needs 1 to 4 values: {s:?}"))),
        };
        Ok(margin)
    }
}

/// Trigger configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerOptions {
    /// Fraction of the sentinel that must be visible, in `[0, 1]`.
    pub threshold: f64,
    pub root_margin: RootMargin,
    /// Stop observing after the first visible observation.
    pub freeze_once_visible: bool,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self { threshold: 0.5, root_margin: RootMargin::default(), freeze_once_visible: false }
    }
}

impl TriggerOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidInput(format!("threshold must be within [0, 1], got {}", self.threshold)));
        }
        Ok(())
    }
}

/// Identifies the element a trigger is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentinelId(pub u64);

/// Fraction of `target` visible inside `root` after applying `margin`.
pub fn intersection_ratio(root: &Rect, target: &Rect, margin: &RootMargin) -> f64 {
    let root = root.expand(margin);
    let Some(overlap) = root.intersection(target) else {
        return 0.0;
    };

    let area = target.area();
    if area == 0.0 {
        return 1.0;
    }
    (overlap.area() / area).clamp(0.0, 1.0)
}

/// Visibility detector for the "load more" sentinel at the end of a list.
#[derive(Debug, Clone)]
pub struct InfiniteScrollTrigger {
    options: TriggerOptions,
    supported: bool,
    observing: Option<SentinelId>,
    visible: bool,
    frozen: bool,
    armed: bool,
}

impl Default for InfiniteScrollTrigger {
    fn default() -> Self {
        Self::new(TriggerOptions::default())
    }
}

impl InfiniteScrollTrigger {
    pub fn new(options: TriggerOptions) -> Self {
        Self { options, supported: true, observing: None, visible: false, frozen: false, armed: true }
    }

    /// A trigger for runtimes without visibility observation. It never fires.
    pub fn unsupported(options: TriggerOptions) -> Self {
        Self { supported: false, ..Self::new(options) }
    }

    pub fn options(&self) -> &TriggerOptions {
        &self.options
    }

    /// Start observing `sentinel`, replacing any previous observation.
    ///
    /// Returns false when nothing is observed (unsupported runtime or frozen).
    pub fn attach(&mut self, sentinel: SentinelId) -> bool {
        if !self.supported || self.frozen {
            return false;
        }
        if self.observing == Some(sentinel) {
            return true;
        }
        if let Some(previous) = self.observing.take() {
            tracing::debug!(sentinel = previous.0, "disposing observer");
        }
        self.observing = Some(sentinel);
        self.visible = false;
        true
    }

    /// Stop observing. Visibility is kept as last observed.
    pub fn detach(&mut self) {
        self.observing = None;
    }

    pub fn is_observing(&self) -> bool {
        self.observing.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Feed one intersection observation and return the resulting visibility.
    pub fn observe(&mut self, root: Rect, sentinel: Rect) -> bool {
        if self.observing.is_none() {
            return self.visible;
        }

        let threshold = self.options.threshold;
        let ratio = intersection_ratio(&root, &sentinel, &self.options.root_margin);
        self.visible = if threshold == 0.0 {
            root.expand(&self.options.root_margin)
                .intersection(&sentinel)
                .is_some()
        } else {
            ratio >= threshold
        };

        if !self.visible {
            self.armed = true;
        } else if self.options.freeze_once_visible {
            self.frozen = true;
            self.observing = None;
        }
        self.visible
    }

    /// Consume the pending trigger: true once per arming while the sentinel is visible.
    pub fn take_trigger(&mut self) -> bool {
        if self.visible && self.armed {
            self.armed = false;
            return true;
        }
        false
    }

    /// Allow the next visible observation to fire again.
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    /// Forget visibility and arm again, e.g. when the list behind the sentinel is swapped.
    pub fn reset(&mut self) {
        self.visible = false;
        self.armed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 400.0, 800.0)
    }

    #[test]
    fn test_parse_root_margin_shorthand() {
        let margin: RootMargin = "0px 0px 200px".parse().unwrap();
        assert_eq!(margin.top, Length::Px(0.0));
        assert_eq!(margin.bottom, Length::Px(200.0));
        assert_eq!(margin.left, Length::Px(0.0));

        let margin: RootMargin = "10%".parse().unwrap();
        assert_eq!(margin.right, Length::Percent(10.0));

        assert!("".parse::<RootMargin>().is_err());
        assert!("10em".parse::<RootMargin>().is_err());
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
    }

    #[test]
    fn test_intersection_ratio() {
        let margin = RootMargin::default();
        let half_in = Rect::new(0.0, 780.0, 400.0, 40.0);
        assert!((intersection_ratio(&viewport(), &half_in, &margin) - 0.5).abs() < f64::EPSILON);

        let below = Rect::new(0.0, 900.0, 400.0, 40.0);
        assert_eq!(intersection_ratio(&viewport(), &below, &margin), 0.0);

        let zero_height = Rect::new(0.0, 500.0, 400.0, 0.0);
        assert_eq!(intersection_ratio(&viewport(), &zero_height, &margin), 1.0);
    }

    #[test]
    fn test_root_margin_extends_viewport() {
        let margin: RootMargin = "0px 0px 200px 0px".parse().unwrap();
        let below = Rect::new(0.0, 900.0, 400.0, 40.0);
        assert_eq!(intersection_ratio(&viewport(), &below, &margin), 1.0);
    }

    #[test]
    fn test_majority_threshold() {
        let mut trigger = InfiniteScrollTrigger::default();
        assert!(trigger.attach(SentinelId(1)));

        assert!(!trigger.observe(viewport(), Rect::new(0.0, 790.0, 400.0, 40.0)));
        assert!(trigger.observe(viewport(), Rect::new(0.0, 770.0, 400.0, 40.0)));
    }

    #[test]
    fn test_fires_once_per_arming() {
        let mut trigger = InfiniteScrollTrigger::default();
        trigger.attach(SentinelId(1));
        let visible = Rect::new(0.0, 100.0, 400.0, 40.0);
        let hidden = Rect::new(0.0, 2000.0, 400.0, 40.0);

        trigger.observe(viewport(), visible);
        assert!(trigger.take_trigger());
        trigger.observe(viewport(), visible);
        assert!(!trigger.take_trigger());

        trigger.rearm();
        assert!(trigger.take_trigger());

        // leaving the viewport re-arms
        trigger.observe(viewport(), hidden);
        trigger.observe(viewport(), visible);
        assert!(trigger.take_trigger());
    }

    #[test]
    fn test_unsupported_never_visible() {
        let mut trigger = InfiniteScrollTrigger::unsupported(TriggerOptions::default());
        assert!(!trigger.attach(SentinelId(1)));
        assert!(!trigger.observe(viewport(), Rect::new(0.0, 100.0, 400.0, 40.0)));
        assert!(!trigger.take_trigger());
    }

    #[test]
    fn test_detached_ignores_observations() {
        let mut trigger = InfiniteScrollTrigger::default();
        assert!(!trigger.observe(viewport(), Rect::new(0.0, 100.0, 400.0, 40.0)));

        trigger.attach(SentinelId(1));
        trigger.detach();
        assert!(!trigger.is_observing());
        assert!(!trigger.observe(viewport(), Rect::new(0.0, 100.0, 400.0, 40.0)));
    }

    #[test]
    fn test_reattach_replaces_observer() {
        let mut trigger = InfiniteScrollTrigger::default();
        trigger.attach(SentinelId(1));
        trigger.observe(viewport(), Rect::new(0.0, 100.0, 400.0, 40.0));
        assert!(trigger.is_visible());

        assert!(trigger.attach(SentinelId(2)));
        assert!(trigger.is_observing());
        assert!(!trigger.is_visible());
    }

    #[test]
    fn test_freeze_once_visible() {
        let options = TriggerOptions { freeze_once_visible: true, ..Default::default() };
        let mut trigger = InfiniteScrollTrigger::new(options);
        trigger.attach(SentinelId(1));

        assert!(trigger.observe(viewport(), Rect::new(0.0, 100.0, 400.0, 40.0)));
        assert!(!trigger.is_observing());
        assert!(trigger.observe(viewport(), Rect::new(0.0, 2000.0, 400.0, 40.0)));
        assert!(!trigger.attach(SentinelId(1)));
    }

    #[test]
    fn test_zero_threshold_counts_touching() {
        let options = TriggerOptions { threshold: 0.0, ..Default::default() };
        let mut trigger = InfiniteScrollTrigger::new(options);
        trigger.attach(SentinelId(1));
        assert!(trigger.observe(viewport(), Rect::new(0.0, 799.0, 400.0, 40.0)));
        assert!(!trigger.observe(viewport(), Rect::new(0.0, 801.0, 400.0, 40.0)));
    }

    #[test]
    fn test_validate_threshold() {
        assert!(TriggerOptions::default().validate().is_ok());
        let options = TriggerOptions { threshold: 1.5, ..Default::default() };
        assert!(options.validate().is_err());
    }
}
