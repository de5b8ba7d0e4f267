use std::sync::{Arc, Mutex, PoisonError};

use crate::data::TickSink;
use crate::domain::CandlePoint;

/// Whatever draws the candles. Methods take `&self`: a surface is shared between
/// its controller and the live price stream.
pub trait ChartSurface: Send + Sync {
    /// Replace the whole series.
    fn set_data(&self, candles: Vec<CandlePoint>);
    fn last_candle(&self) -> Option<CandlePoint>;
    /// Replace the bar with the same `time`, or append a newer one.
    fn update(&self, candle: CandlePoint);
    /// Fold `price` into the last bar in one step. No-op on an empty series.
    fn apply_tick(&self, price: f64);
    fn fit_content(&self);
    /// Detach. Later calls are ignored.
    fn remove(&self);
}

/// Folds stream prices into the surface's current bar.
pub struct SurfaceTickSink {
    surface: Arc<dyn ChartSurface>,
}

impl SurfaceTickSink {
    pub fn new(surface: Arc<dyn ChartSurface>) -> Self {
        Self { surface }
    }
}

impl TickSink for SurfaceTickSink {
    fn on_tick(&self, price: f64) {
        self.surface.apply_tick(price);
    }
}

#[derive(Debug, Default)]
struct SeriesState {
    candles: Vec<CandlePoint>,
    removed: bool,
    fit_count: usize,
    revision: u64,
}

/// In-memory surface. The CLI prints from it; tests inspect it.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    state: Arc<Mutex<SeriesState>>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SeriesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<CandlePoint> {
        self.lock().candles.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_removed(&self) -> bool {
        self.lock().removed
    }

    pub fn fit_count(&self) -> usize {
        self.lock().fit_count
    }

    /// Bumped on every mutation; lets a poller detect changes cheaply.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }
}

impl ChartSurface for CandleSeries {
    fn set_data(&self, candles: Vec<CandlePoint>) {
        let mut s = self.lock();
        if s.removed {
            return;
        }
        s.candles = candles;
        s.revision += 1;
    }

    fn last_candle(&self) -> Option<CandlePoint> {
        self.lock().candles.last().copied()
    }

    fn update(&self, candle: CandlePoint) {
        let mut s = self.lock();
        if s.removed {
            return;
        }
        match s.candles.last().map(|c| c.time) {
            Some(t) if t == candle.time => {
                if let Some(last) = s.candles.last_mut() {
                    *last = candle;
                }
            }
            Some(t) if t > candle.time => return,
            _ => s.candles.push(candle),
        }
        s.revision += 1;
    }

    fn apply_tick(&self, price: f64) {
        let mut s = self.lock();
        if s.removed {
            return;
        }
        let applied = match s.candles.last_mut() {
            Some(last) => {
                last.apply_tick(price);
                true
            }
            None => false,
        };
        if applied {
            s.revision += 1;
        }
    }

    fn fit_content(&self) {
        let mut s = self.lock();
        if !s.removed {
            s.fit_count += 1;
        }
    }

    fn remove(&self) {
        let mut s = self.lock();
        s.removed = true;
        s.candles.clear();
        s.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> CandlePoint {
        CandlePoint::new(time, 100.0, 105.0, 95.0, close)
    }

    #[test]
    fn update_replaces_same_bucket_and_appends_newer() {
        let series = CandleSeries::new();
        series.set_data(vec![bar(1000, 102.0)]);
        series.update(bar(1000, 103.0));
        series.update(bar(1060, 104.0));
        series.update(bar(500, 1.0));

        let data = series.snapshot();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].close, 103.0);
        assert_eq!(data[1].time, 1060);
    }

    #[test]
    fn sink_extends_last_bar() {
        let series = CandleSeries::new();
        series.set_data(vec![CandlePoint::new(1000, 100.0, 105.0, 95.0, 102.0)]);
        let sink = SurfaceTickSink::new(Arc::new(series.clone()));

        sink.on_tick(110.0);
        assert_eq!(
            series.last_candle(),
            Some(CandlePoint::new(1000, 100.0, 110.0, 95.0, 110.0))
        );
    }

    #[test]
    fn tick_after_replace_keeps_new_bar() {
        let series = CandleSeries::new();
        series.set_data(vec![CandlePoint::new(3600, 100.0, 105.0, 95.0, 102.0)]);
        let sink = SurfaceTickSink::new(Arc::new(series.clone()));

        // Same bucket start, different range: the tick must land on the new bar.
        series.set_data(vec![CandlePoint::new(3600, 101.0, 101.5, 100.5, 101.0)]);
        sink.on_tick(102.0);

        assert_eq!(
            series.snapshot(),
            vec![CandlePoint::new(3600, 101.0, 102.0, 100.5, 102.0)]
        );
    }

    #[test]
    fn apply_tick_bumps_revision_only_when_applied() {
        let series = CandleSeries::new();
        series.apply_tick(5.0);
        assert_eq!(series.revision(), 0);

        series.set_data(vec![bar(1000, 102.0)]);
        let before = series.revision();
        series.apply_tick(90.0);
        assert_eq!(series.revision(), before + 1);
        assert_eq!(series.last_candle().map(|c| (c.low, c.close)), Some((90.0, 90.0)));

        series.remove();
        series.apply_tick(1.0);
        assert!(series.is_empty());
    }

    #[test]
    fn sink_on_empty_series_is_noop() {
        let series = CandleSeries::new();
        SurfaceTickSink::new(Arc::new(series.clone())).on_tick(1.0);
        assert!(series.is_empty());
    }

    #[test]
    fn removed_surface_ignores_writes() {
        let series = CandleSeries::new();
        series.set_data(vec![bar(1000, 102.0)]);
        series.remove();
        series.set_data(vec![bar(2000, 1.0)]);
        series.fit_content();
        assert!(series.is_empty());
        assert!(series.is_removed());
        assert_eq!(series.fit_count(), 0);
    }
}
