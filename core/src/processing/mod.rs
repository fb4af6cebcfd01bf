pub mod averager;
pub mod comparison;
pub mod matcher;
pub mod outlier;
pub mod trend;
pub mod velocity;

pub use averager::{EpochSeries, TemporalAverager};
pub use comparison::{gnss_trend, SeriesFit, StationComparison};
pub use matcher::SpatialMatcher;
pub use outlier::{
    FilteredVelocities, OutlierFilter, REGIONAL_MAP_IQR_FACTOR, STATION_MAP_IQR_FACTOR,
};
pub use trend::{Trend, TrendFitter};
pub use velocity::VelocityField;
