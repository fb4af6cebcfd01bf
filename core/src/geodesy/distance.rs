use ndarray::{Array1, ArrayView1, Zip};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine surface distance in meters between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = lon2.to_radians() - lon1.to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distances from one reference point to every target point.
///
/// Evaluates the same kernel as [`haversine_distance`] element by element, so
/// both forms agree exactly for identical inputs.
pub fn haversine_distances(
    lat: f64,
    lon: f64,
    lats: ArrayView1<f64>,
    lons: ArrayView1<f64>,
) -> Array1<f64> {
    Zip::from(lats)
        .and(lons)
        .map_collect(|&target_lat, &target_lon| haversine_distance(lat, lon, target_lat, target_lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance(40.0, -3.0, 40.0, -3.0), 0.0);
        assert_eq!(haversine_distance(-89.9, 179.9, -89.9, 179.9), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let forward = haversine_distance(40.4168, -3.7038, 41.3874, 2.1686);
        let backward = haversine_distance(41.3874, 2.1686, 40.4168, -3.7038);
        assert!((forward - backward).abs() < 1e-6);
        // Madrid to Barcelona is roughly 505 km.
        assert!((forward - 505_000.0).abs() < 5_000.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_M * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn batch_form_matches_scalar_form() {
        let lats = array![40.0, 40.001, 39.99, -12.5];
        let lons = array![-3.0, -3.002, -2.995, 130.0];
        let batch = haversine_distances(40.0, -3.0, lats.view(), lons.view());
        for i in 0..lats.len() {
            assert_eq!(batch[i], haversine_distance(40.0, -3.0, lats[i], lons[i]));
        }
    }
}
