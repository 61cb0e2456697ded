// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nearest connectable port under the pointer.

use crate::connectable::ConnectablePorts;
use crate::graph::Graph;
use crate::port::{Port, PortKey};
use crate::provider::{resolve_port, GeometryProvider, PortProvider};
use egui::Pos2;

/// Nearest key of `set` to `pointer`, with its distance.
///
/// Ports without a computed connection point are skipped for this call.
/// Equal distances keep the first port in set order. `max_distance` caps
/// the search; `None` searches the whole set.
pub fn nearest_connectable_key<'a, G: GeometryProvider + ?Sized>(
    pointer: Pos2,
    set: &'a ConnectablePorts,
    geometry: &G,
    exclude: Option<&PortKey>,
    max_distance: Option<f32>,
) -> Option<(&'a PortKey, f32)> {
    let mut best: Option<(&PortKey, f32)> = None;

    for key in &set.ids {
        if exclude == Some(key) {
            continue;
        }
        let Some(point) = geometry.connection_point(key) else {
            continue;
        };
        let distance = point.distance(pointer);
        if max_distance.is_some_and(|max| distance > max) {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((key, distance));
        }
    }

    best
}

/// Resolve the nearest connectable port to `pointer`
pub fn find_nearest_connectable_port<P, G>(
    pointer: Pos2,
    set: &ConnectablePorts,
    graph: &Graph,
    ports: &P,
    geometry: &G,
    exclude: Option<&PortKey>,
    max_distance: Option<f32>,
) -> Option<Port>
where
    P: PortProvider + ?Sized,
    G: GeometryProvider + ?Sized,
{
    let (key, _) = nearest_connectable_key(pointer, set, geometry, exclude, max_distance)?;
    resolve_port(graph, ports, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectable::compute_connectable_set;
    use crate::layout::PortPositionCache;
    use crate::testing::Fixture;
    use crate::validate::ValidationContext;

    fn set_for(fx: &Fixture, anchor: &PortKey) -> ConnectablePorts {
        compute_connectable_set(Some(anchor), &fx.graph, &fx.registry, &fx.registry, ValidationContext::default())
    }

    #[test]
    fn test_picks_nearest() {
        let fx = Fixture::new();
        let set = set_for(&fx, &fx.out_a);
        let near_c = fx.geometry.connection_point(&fx.in_c).unwrap() + egui::vec2(3.0, 2.0);

        let port = find_nearest_connectable_port(near_c, &set, &fx.graph, &fx.registry, &fx.geometry, None, None)
            .unwrap();
        assert_eq!(port.key(), fx.in_c);
    }

    #[test]
    fn test_empty_set_has_no_candidate() {
        let fx = Fixture::new();
        let set = ConnectablePorts::empty();
        let found = find_nearest_connectable_port(Pos2::ZERO, &set, &fx.graph, &fx.registry, &fx.geometry, None, None);
        assert!(found.is_none());
    }

    #[test]
    fn test_skips_ports_without_geometry() {
        let fx = Fixture::new();
        let set = set_for(&fx, &fx.out_a);
        let mut geometry = PortPositionCache::new();
        geometry.set(fx.many_b.clone(), Pos2::new(1000.0, 1000.0));

        let (key, _) = nearest_connectable_key(Pos2::ZERO, &set, &geometry, None, None).unwrap();
        assert_eq!(key, &fx.many_b);

        let empty = PortPositionCache::new();
        assert!(nearest_connectable_key(Pos2::ZERO, &set, &empty, None, None).is_none());
    }

    #[test]
    fn test_tie_keeps_first_in_set_order() {
        let fx = Fixture::new();
        let set = set_for(&fx, &fx.out_a);
        let mut geometry = PortPositionCache::new();
        for key in &set.ids {
            geometry.set(key.clone(), Pos2::new(10.0, 0.0));
        }

        let (key, _) = nearest_connectable_key(Pos2::ZERO, &set, &geometry, None, None).unwrap();
        assert_eq!(Some(key), set.ids.first());
    }

    #[test]
    fn test_exclude_and_radius() {
        let fx = Fixture::new();
        let set = set_for(&fx, &fx.out_a);
        let at_b = fx.geometry.connection_point(&fx.in_b).unwrap();

        let (key, _) = nearest_connectable_key(at_b, &set, &fx.geometry, Some(&fx.in_b), None).unwrap();
        assert_ne!(key, &fx.in_b);

        let far = at_b + egui::vec2(5000.0, 0.0);
        assert!(nearest_connectable_key(far, &set, &fx.geometry, None, Some(50.0)).is_none());
    }
}
