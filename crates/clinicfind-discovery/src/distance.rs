//! Great-circle distance and radius-bounded ranking.

use serde::Serialize;

use clinicfind_core::{ClinicRecord, Coordinate};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two coordinates, in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A candidate clinic with its distance from the origin, when known.
#[derive(Debug, Clone, Serialize)]
pub struct RankedClinic {
    pub clinic: ClinicRecord,
    /// `None` in unbounded mode (no origin was resolved).
    pub distance_km: Option<f64>,
}

/// Keeps clinics within `radius_km` of `origin`, nearest first.
///
/// Clinics with a missing or invalid coordinate are silently excluded. Ties
/// keep their input order.
#[must_use]
pub fn bound_by_radius(
    origin: Coordinate,
    clinics: Vec<ClinicRecord>,
    radius_km: f64,
) -> Vec<RankedClinic> {
    let total = clinics.len();
    let mut without_coordinate = 0usize;

    let mut ranked: Vec<RankedClinic> = clinics
        .into_iter()
        .filter_map(|clinic| {
            let Some(coordinate) = clinic.coordinate.filter(Coordinate::is_valid) else {
                without_coordinate += 1;
                tracing::debug!(clinic_id = %clinic.id, "excluding clinic without coordinate");
                return None;
            };
            let distance = haversine_km(origin, coordinate);
            (distance <= radius_km).then_some(RankedClinic {
                clinic,
                distance_km: Some(distance),
            })
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| {
        let a = a.distance_km.unwrap_or(f64::INFINITY);
        let b = b.distance_km.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });

    tracing::info!(
        total,
        without_coordinate,
        retained = ranked.len(),
        radius_km,
        "distance bounding complete"
    );
    ranked
}

/// Passes every clinic through in input order with no distance.
#[must_use]
pub fn unbounded(clinics: Vec<ClinicRecord>) -> Vec<RankedClinic> {
    clinics
        .into_iter()
        .map(|clinic| RankedClinic {
            clinic,
            distance_km: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn clinic_at(id: &str, lat: f64, lng: f64) -> ClinicRecord {
        let mut clinic = ClinicRecord::new(id, id);
        clinic.coordinate = Some(coord(lat, lng));
        clinic
    }

    fn ids(ranked: &[RankedClinic]) -> Vec<&str> {
        ranked.iter().map(|r| r.clinic.id.as_str()).collect()
    }

    const BENGALURU: (f64, f64) = (12.9716, 77.5946);

    #[test]
    fn zero_distance_to_self() {
        let origin = coord(BENGALURU.0, BENGALURU.1);
        assert!(haversine_km(origin, origin).abs() < 1e-12);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = coord(12.9716, 77.5946);
        let b = coord(28.6139, 77.2090);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn known_distances_are_close() {
        let origin = coord(BENGALURU.0, BENGALURU.1);
        let koramangala = haversine_km(origin, coord(12.9352, 77.6245));
        assert!((4.5..5.2).contains(&koramangala), "got {koramangala}");
        let airport_side = haversine_km(origin, coord(13.2846, 77.5878));
        assert!((34.0..36.0).contains(&airport_side), "got {airport_side}");
    }

    #[test]
    fn bengaluru_radius_example() {
        let origin = coord(BENGALURU.0, BENGALURU.1);
        let ranked = bound_by_radius(
            origin,
            vec![
                clinic_at("far", 13.2846, 77.5878),
                clinic_at("near", 12.9352, 77.6245),
            ],
            10.0,
        );
        assert_eq!(ids(&ranked), vec!["near"]);
        let distance = ranked[0].distance_km.unwrap();
        assert!(distance <= 10.0);
    }

    #[test]
    fn output_is_sorted_ascending_and_within_radius() {
        let origin = coord(BENGALURU.0, BENGALURU.1);
        let clinics = vec![
            clinic_at("c", 13.02, 77.60),
            clinic_at("a", 12.975, 77.595),
            clinic_at("x", 14.0, 78.0),
            clinic_at("b", 12.99, 77.61),
        ];
        let ranked = bound_by_radius(origin, clinics.clone(), 10.0);

        assert_eq!(ids(&ranked), vec!["a", "b", "c"]);
        for pair in ranked.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        for clinic in &clinics {
            let d = haversine_km(origin, clinic.coordinate.unwrap());
            let retained = ranked.iter().any(|r| r.clinic.id == clinic.id);
            assert_eq!(retained, d <= 10.0, "clinic {} at {d} km", clinic.id);
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let origin = coord(0.0, 0.0);
        let ranked = bound_by_radius(
            origin,
            vec![
                clinic_at("first", 0.01, 0.0),
                clinic_at("closer", 0.005, 0.0),
                clinic_at("second", 0.01, 0.0),
                clinic_at("third", 0.01, 0.0),
            ],
            10.0,
        );
        assert_eq!(ids(&ranked), vec!["closer", "first", "second", "third"]);
    }

    #[test]
    fn clinics_without_valid_coordinate_are_excluded() {
        let origin = coord(BENGALURU.0, BENGALURU.1);
        let mut bogus = ClinicRecord::new("bogus", "bogus");
        bogus.coordinate = Some(Coordinate {
            lat: f64::NAN,
            lng: 77.59,
        });
        let ranked = bound_by_radius(
            origin,
            vec![
                ClinicRecord::new("none", "none"),
                bogus,
                clinic_at("ok", 12.97, 77.59),
            ],
            10.0,
        );
        assert_eq!(ids(&ranked), vec!["ok"]);
    }

    #[test]
    fn boundary_distance_is_retained() {
        let origin = coord(0.0, 0.0);
        let target = coord(0.05, 0.0);
        let exact = haversine_km(origin, target);
        let ranked = bound_by_radius(origin, vec![clinic_at("edge", 0.05, 0.0)], exact);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn unbounded_keeps_search_order_and_coordinate_less_clinics() {
        let ranked = unbounded(vec![
            clinic_at("b", 1.0, 1.0),
            ClinicRecord::new("a", "a"),
        ]);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
        assert!(ranked.iter().all(|r| r.distance_km.is_none()));
    }
}
