mod chart_controller;
mod context;
mod dashboard;
mod surface;

pub use chart_controller::{ChartController, ChartInputs, ControllerState, LoadOutcome};
pub use context::ChartContext;
pub use dashboard::{DashboardService, Freshness, WidgetData, fetch_through, hyperliquid_funding};
pub use surface::{CandleSeries, ChartSurface, SurfaceTickSink};
