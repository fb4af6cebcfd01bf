pub mod distance;

pub use distance::{haversine_distance, haversine_distances, EARTH_RADIUS_M};
