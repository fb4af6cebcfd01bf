pub mod gnss;
pub mod insar;
pub mod plane;
pub mod station;

pub use gnss::{find_station_file, GnssSample, GnssSeries};
pub use insar::{aligned_path, Epoch, InsarDataset, MeasurementPoint, PointRecord};
pub use plane::PlaneCorrection;
pub use station::{load_stations, Station};
