//! Candlestick pattern library
//!
//! Fixed-confidence reversal and continuation patterns evaluated on the bars
//! ending at an index. Each pattern is a small configurable struct implementing
//! [`CandlePattern`]; [`BuiltinPattern`] wraps them all for enum dispatch.
//!
//! | Pattern | Bars | Direction | Confidence |
//! |---|---|---|---|
//! | Morning / Evening Star | 3 | Bullish / Bearish | 85 |
//! | Three White Soldiers / Black Crows | 3 | Bullish / Bearish | 80 |
//! | Bullish / Bearish Engulfing | 2 | Bullish / Bearish | 75 |
//! | Hammer / Shooting Star | 1 | Bullish / Bearish | 70 |
//! | Doji | 1 | Neutral | 60 |

use serde::Serialize;

use crate::series::PriceSeries;
use crate::{AnalysisError, Direction, OHLCVExt, Result, OHLCV};

/// Bars looked at by [`scan_latest`]
pub const LATEST_WINDOW: usize = 3;

// ============================================================
// CORE TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PatternId(pub &'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandleMatch {
    pub pattern: PatternId,
    pub direction: Direction,
    /// 0..=100
    pub confidence: u8,
    pub description: &'static str,
    /// Index of the last bar of the pattern
    pub index: usize,
}

/// A pattern over the `min_bars()` bars ending at an index.
pub trait CandlePattern: Send + Sync {
    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;
    fn direction(&self) -> Direction;
    fn confidence(&self) -> u8;
    fn description(&self) -> &'static str {
        ""
    }

    /// `window` holds exactly `min_bars()` bars, oldest first.
    fn matches<T: OHLCV>(&self, window: &[T]) -> bool;

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<CandleMatch> {
        let n = self.min_bars();
        if index >= bars.len() || index + 1 < n {
            return None;
        }
        self.matches(&bars[index + 1 - n..=index]).then(|| CandleMatch {
            pattern: self.id(),
            direction: self.direction(),
            confidence: self.confidence(),
            description: self.description(),
            index,
        })
    }
}

// ============================================================
// THREE-BAR PATTERNS
// ============================================================

/// Bearish bar, small-bodied star, bullish bar closing above the first body's midpoint.
#[derive(Debug, Clone, Copy)]
pub struct MorningStarPattern {
    /// Star body must be smaller than this fraction of the first body
    pub star_body_ratio: f64,
}

impl Default for MorningStarPattern {
    fn default() -> Self {
        Self { star_body_ratio: 0.3 }
    }
}

impl CandlePattern for MorningStarPattern {
    fn id(&self) -> PatternId {
        PatternId("MORNING_STAR")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn direction(&self) -> Direction {
        Direction::Bullish
    }

    fn confidence(&self) -> u8 {
        85
    }

    fn description(&self) -> &'static str {
        "Strong bullish reversal pattern"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        let (first, star, last) = (&w[0], &w[1], &w[2]);
        first.is_bearish()
            && star.body() < first.body() * self.star_body_ratio
            && last.is_bullish()
            && last.close() > (first.open() + first.close()) / 2.0
    }
}

/// Bullish bar, small-bodied star, bearish bar closing below the first body's midpoint.
#[derive(Debug, Clone, Copy)]
pub struct EveningStarPattern {
    pub star_body_ratio: f64,
}

impl Default for EveningStarPattern {
    fn default() -> Self {
        Self { star_body_ratio: 0.3 }
    }
}

impl CandlePattern for EveningStarPattern {
    fn id(&self) -> PatternId {
        PatternId("EVENING_STAR")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn direction(&self) -> Direction {
        Direction::Bearish
    }

    fn confidence(&self) -> u8 {
        85
    }

    fn description(&self) -> &'static str {
        "Strong bearish reversal pattern"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        let (first, star, last) = (&w[0], &w[1], &w[2]);
        first.is_bullish()
            && star.body() < first.body() * self.star_body_ratio
            && last.is_bearish()
            && last.close() < (first.open() + first.close()) / 2.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeWhiteSoldiersPattern;

impl CandlePattern for ThreeWhiteSoldiersPattern {
    fn id(&self) -> PatternId {
        PatternId("THREE_WHITE_SOLDIERS")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn direction(&self) -> Direction {
        Direction::Bullish
    }

    fn confidence(&self) -> u8 {
        80
    }

    fn description(&self) -> &'static str {
        "Strong uptrend continuation"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        w.iter().all(|b| b.is_bullish()) && w[1].close() > w[0].close() && w[2].close() > w[1].close()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeBlackCrowsPattern;

impl CandlePattern for ThreeBlackCrowsPattern {
    fn id(&self) -> PatternId {
        PatternId("THREE_BLACK_CROWS")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn direction(&self) -> Direction {
        Direction::Bearish
    }

    fn confidence(&self) -> u8 {
        80
    }

    fn description(&self) -> &'static str {
        "Strong downtrend continuation"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        w.iter().all(|b| b.is_bearish()) && w[1].close() < w[0].close() && w[2].close() < w[1].close()
    }
}

// ============================================================
// TWO-BAR PATTERNS
// ============================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingPattern;

impl CandlePattern for BullishEngulfingPattern {
    fn id(&self) -> PatternId {
        PatternId("BULLISH_ENGULFING")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn direction(&self) -> Direction {
        Direction::Bullish
    }

    fn confidence(&self) -> u8 {
        75
    }

    fn description(&self) -> &'static str {
        "Strong bullish reversal signal"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        crate::indicators::is_bullish_engulfing(&w[0], &w[1])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BearishEngulfingPattern;

impl CandlePattern for BearishEngulfingPattern {
    fn id(&self) -> PatternId {
        PatternId("BEARISH_ENGULFING")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn direction(&self) -> Direction {
        Direction::Bearish
    }

    fn confidence(&self) -> u8 {
        75
    }

    fn description(&self) -> &'static str {
        "Strong bearish reversal signal"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        crate::indicators::is_bearish_engulfing(&w[0], &w[1])
    }
}

// ============================================================
// SINGLE-BAR PATTERNS
// ============================================================

/// Long lower shadow, almost no upper shadow. Either body colour.
#[derive(Debug, Clone, Copy)]
pub struct HammerPattern {
    pub shadow_factor: f64,
    pub opposite_shadow_limit: f64,
}

impl Default for HammerPattern {
    fn default() -> Self {
        Self {
            shadow_factor: 2.0,
            opposite_shadow_limit: 0.3,
        }
    }
}

impl CandlePattern for HammerPattern {
    fn id(&self) -> PatternId {
        PatternId("HAMMER")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn direction(&self) -> Direction {
        Direction::Bullish
    }

    fn confidence(&self) -> u8 {
        70
    }

    fn description(&self) -> &'static str {
        "Potential bullish reversal"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        let b = &w[0];
        b.lower_shadow() > b.body() * self.shadow_factor && b.upper_shadow() < b.body() * self.opposite_shadow_limit
    }
}

/// Long upper shadow, almost no lower shadow. Either body colour.
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarPattern {
    pub shadow_factor: f64,
    pub opposite_shadow_limit: f64,
}

impl Default for ShootingStarPattern {
    fn default() -> Self {
        Self {
            shadow_factor: 2.0,
            opposite_shadow_limit: 0.3,
        }
    }
}

impl CandlePattern for ShootingStarPattern {
    fn id(&self) -> PatternId {
        PatternId("SHOOTING_STAR")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn direction(&self) -> Direction {
        Direction::Bearish
    }

    fn confidence(&self) -> u8 {
        70
    }

    fn description(&self) -> &'static str {
        "Potential bearish reversal"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        let b = &w[0];
        b.upper_shadow() > b.body() * self.shadow_factor && b.lower_shadow() < b.body() * self.opposite_shadow_limit
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DojiPattern {
    /// Body must be smaller than this fraction of the range
    pub body_ratio: f64,
}

impl Default for DojiPattern {
    fn default() -> Self {
        Self { body_ratio: 0.1 }
    }
}

impl CandlePattern for DojiPattern {
    fn id(&self) -> PatternId {
        PatternId("DOJI")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn direction(&self) -> Direction {
        Direction::Neutral
    }

    fn confidence(&self) -> u8 {
        60
    }

    fn description(&self) -> &'static str {
        "Indecision, potential reversal"
    }

    fn matches<T: OHLCV>(&self, w: &[T]) -> bool {
        let b = &w[0];
        b.body() < b.range() * self.body_ratio
    }
}

impl_with_defaults!(
    MorningStarPattern,
    EveningStarPattern,
    ThreeWhiteSoldiersPattern,
    ThreeBlackCrowsPattern,
    BullishEngulfingPattern,
    BearishEngulfingPattern,
    HammerPattern,
    ShootingStarPattern,
    DojiPattern,
);

// ============================================================
// BUILTIN PATTERNS - generated via macro
// ============================================================

macro_rules! define_builtin_patterns {
    (
        $(
            $variant:ident($pattern:ty)
        ),* $(,)?
    ) => {
        /// All builtin patterns - fast path via enum dispatch
        #[derive(Debug, Clone, Copy)]
        pub enum BuiltinPattern {
            $($variant($pattern)),*
        }

        impl BuiltinPattern {
            /// Every builtin pattern with default settings, library order
            pub fn all() -> Vec<BuiltinPattern> {
                vec![$(Self::$variant(<$pattern>::default())),*]
            }

            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<CandleMatch> {
                match self {
                    $(Self::$variant(p) => CandlePattern::detect(p, bars, index)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(p) => CandlePattern::id(p)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(p) => CandlePattern::min_bars(p)),*
                }
            }
        }
    };
}

define_builtin_patterns! {
    MorningStar(MorningStarPattern),
    EveningStar(EveningStarPattern),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersPattern),
    ThreeBlackCrows(ThreeBlackCrowsPattern),
    Hammer(HammerPattern),
    ShootingStar(ShootingStarPattern),
    Doji(DojiPattern),
    BullishEngulfing(BullishEngulfingPattern),
    BearishEngulfing(BearishEngulfingPattern),
}

// ============================================================
// SCANNING
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleReport {
    pub patterns: Vec<CandleMatch>,
    /// Highest confidence; the earliest in library order on ties
    pub most_significant: Option<CandleMatch>,
}

impl CandleReport {
    fn from_matches(patterns: Vec<CandleMatch>) -> Self {
        let most_significant = patterns
            .iter()
            .fold(None::<CandleMatch>, |best, m| match best {
                Some(b) if b.confidence >= m.confidence => Some(b),
                _ => Some(*m),
            });
        Self {
            patterns,
            most_significant,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.patterns.len()
    }
}

/// Evaluate every builtin pattern on the last bar. Needs three bars.
pub fn scan_latest(series: &PriceSeries) -> Result<CandleReport> {
    AnalysisError::require(LATEST_WINDOW, series.len())?;
    let last = series.len() - 1;
    let matches = BuiltinPattern::all()
        .iter()
        .filter_map(|p| p.detect(series.bars(), last))
        .collect();
    Ok(CandleReport::from_matches(matches))
}

/// Evaluate `patterns` on every bar, oldest first.
pub fn scan<T: OHLCV>(bars: &[T], patterns: &[BuiltinPattern]) -> Vec<CandleMatch> {
    (0..bars.len())
        .flat_map(|i| patterns.iter().filter_map(move |p| p.detect(bars, i)))
        .collect()
}

// ============================================================
// TESTS
// ============================================================
