use geo::{Contains, Coordinate, LineString, Point, Polygon};
use std::collections::HashMap;

/// A polygonal region of a camera view.
///
/// Zone geometry is defined elsewhere; the tracking core only consumes it.
///
#[derive(Debug, Clone)]
pub struct Zone {
    pub zone_id: u64,
    pub camera_id: u64,
    pub name: String,
    /// vertices in pixel coordinates, implicit closing edge
    pub polygon: Vec<(f32, f32)>,
    pub active: bool,
}

impl Zone {
    pub fn new(
        zone_id: u64,
        camera_id: u64,
        name: impl Into<String>,
        polygon: Vec<(f32, f32)>,
    ) -> Self {
        Self {
            zone_id,
            camera_id,
            name: name.into(),
            polygon,
            active: true,
        }
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        point_in_polygon(point, &self.polygon)
    }
}

/// The zone capability the tracking manager depends on.
///
/// Implementations must return zones in a stable iteration order: zones are
/// not assumed mutually exclusive and the first containing zone wins. Missing
/// zone data is simply an empty vector, never an error.
///
pub trait ZoneProvider: Send + Sync {
    fn zones_for_camera(&self, camera_id: u64) -> Vec<Zone>;
}

/// Point-in-polygon test over the crate geometry stack
///
pub fn point_in_polygon(point: (f32, f32), polygon: &[(f32, f32)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let exterior = LineString(
        polygon
            .iter()
            .map(|&(x, y)| Coordinate {
                x: x as f64,
                y: y as f64,
            })
            .collect(),
    );

    Polygon::new(exterior, vec![]).contains(&Point::new(point.0 as f64, point.1 as f64))
}

/// In-memory provider for tests and static deployments
///
#[derive(Debug, Default)]
pub struct StaticZones {
    by_camera: HashMap<u64, Vec<Zone>>,
}

impl StaticZones {
    pub fn new(zones: Vec<Zone>) -> Self {
        let mut by_camera: HashMap<u64, Vec<Zone>> = HashMap::default();
        for z in zones {
            by_camera.entry(z.camera_id).or_default().push(z);
        }
        Self { by_camera }
    }
}

impl ZoneProvider for StaticZones {
    fn zones_for_camera(&self, camera_id: u64) -> Vec<Zone> {
        self.by_camera.get(&camera_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::zones::{point_in_polygon, StaticZones, Zone, ZoneProvider};

    fn square(x0: f32, x1: f32) -> Vec<(f32, f32)> {
        vec![(x0, 0.0), (x1, 0.0), (x1, 100.0), (x0, 100.0)]
    }

    #[test]
    fn containment() {
        let poly = square(0.0, 100.0);
        assert!(point_in_polygon((50.0, 50.0), &poly));
        assert!(!point_in_polygon((150.0, 50.0), &poly));
        assert!(!point_in_polygon((-1.0, 50.0), &poly));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        assert!(!point_in_polygon((0.0, 0.0), &[]));
        assert!(!point_in_polygon((0.0, 0.0), &[(0.0, 0.0), (1.0, 1.0)]));
    }

    #[test]
    fn static_provider_partitions_by_camera() {
        let provider = StaticZones::new(vec![
            Zone::new(1, 1, "entry", square(0.0, 100.0)),
            Zone::new(2, 1, "floor", square(100.0, 200.0)),
            Zone::new(3, 2, "dock", square(0.0, 100.0)),
        ]);

        let cam1 = provider.zones_for_camera(1);
        assert_eq!(cam1.len(), 2);
        assert_eq!(cam1[0].zone_id, 1);
        assert_eq!(cam1[1].zone_id, 2);

        assert_eq!(provider.zones_for_camera(2).len(), 1);
        assert!(provider.zones_for_camera(3).is_empty());
    }
}
