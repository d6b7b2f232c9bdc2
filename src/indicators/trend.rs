//! Trend indicators: moving averages, MACD, Bollinger Bands, ADX.

use crate::math::{ema, rolling_mean, rolling_mean_opt, rolling_std, wilder_smooth};
use crate::{OHLCVExt, Series, OHLCV};

pub fn sma(closes: &[f64], period: usize) -> Series {
    rolling_mean(closes, period)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macd {
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
}

/// EMA(fast) - EMA(slow), its EMA(signal) and the difference of the two.
/// Seeded EMAs make every column defined from the first bar.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| Some(m - s)).collect();

    Macd {
        macd: line.into_iter().map(Some).collect(),
        signal: signal_line.into_iter().map(Some).collect(),
        histogram,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bollinger {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// Middle = SMA(period), bands at `k` sample standard deviations.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Bollinger {
    let middle = rolling_mean(closes, period);
    let std = rolling_std(closes, period);
    let band = |sign: f64| -> Series {
        middle
            .iter()
            .zip(&std)
            .map(|(m, s)| Some((*m)? + sign * k * (*s)?))
            .collect()
    };
    Bollinger {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adx {
    pub plus_di: Series,
    pub minus_di: Series,
    pub adx: Series,
}

/// Wilder ADX: +DM/-DM and true range smoothed with Wilder's method,
/// directional indicators from their ratio, then DX averaged over `period`.
pub fn adx<T: OHLCV>(bars: &[T], period: usize) -> Adx {
    let n = bars.len();
    if n < 2 || period == 0 {
        return Adx {
            plus_di: vec![None; n],
            minus_di: vec![None; n],
            adx: vec![None; n],
        };
    }

    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut tr = Vec::with_capacity(n - 1);
    for w in bars.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let up = cur.high() - prev.high();
        let down = prev.low() - cur.low();
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        tr.push(cur.true_range(Some(prev.close())));
    }

    let s_tr = wilder_smooth(&tr, period);
    let s_plus = wilder_smooth(&plus_dm, period);
    let s_minus = wilder_smooth(&minus_dm, period);

    let di = |dm: &Series| -> Series {
        std::iter::once(None)
            .chain(dm.iter().zip(&s_tr).map(|(d, t)| match (*d, *t) {
                (Some(d), Some(t)) if t > 0.0 => Some(100.0 * d / t),
                _ => None,
            }))
            .collect()
    };
    let plus_di = di(&s_plus);
    let minus_di = di(&s_minus);

    let dx: Series = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let (p, m) = ((*p)?, (*m)?);
            (p + m > 0.0).then(|| 100.0 * (p - m).abs() / (p + m))
        })
        .collect();

    Adx {
        adx: rolling_mean_opt(&dx, period),
        plus_di,
        minus_di,
    }
}

// ============================================================
// TESTS
// ============================================================
