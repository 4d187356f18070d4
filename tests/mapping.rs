use std::sync::Arc;

use float_eq::assert_float_eq;
use proptest::prelude::*;
use rstest::rstest;

use trackmap::{DirectionSet, FixelDataset, Grid, MapperBuilder, Point, Streamline, Vector};
use trackmap::index::index3_to_1;
use trackmap::mapping::{Accumulator, Dixel, Fixel, FixelDensity, TrackDensity, Voxel, VoxelDir, map_streamlines};
use units::degree;

fn grid(n: usize, size: f32) -> Grid {
    Grid::axis_aligned([n; 3], Vector::repeat(size), Point::origin()).unwrap()
}

/// Evenly spaced vertices on the straight line from `start` to `stop`
fn straight(start: Point, stop: Point, segments: usize) -> Streamline {
    let step = (stop - start) / segments as f32;
    Streamline::new((0..=segments).map(|i| start + step * i as f32).collect())
}

// ----- Length conservation ------------------------------------------------------------
proptest! {
    #[test]
    fn precise_lengths_add_up_to_arc_length(
        x0 in 1.0..(8.0 as f32), y0 in 1.0..(8.0 as f32), z0 in 1.0..(8.0 as f32),
        x1 in 1.0..(8.0 as f32), y1 in 1.0..(8.0 as f32), z1 in 1.0..(8.0 as f32),
        segments in 1..40_usize,
        size in prop_oneof![Just(0.7_f32), Just(1.0), Just(2.5)],
    ) {
        let grid = Grid::axis_aligned([20; 3], Vector::repeat(size), Point::origin()).unwrap();
        let mut mapper = MapperBuilder::new(grid).precise(true).build::<Voxel>().unwrap();
        let s = straight(Point::new(x0, y0, z0), Point::new(x1, y1, z1), segments);
        let set = mapper.map(&s);
        assert_float_eq!(set.total_length(), s.length(), abs <= 1e-3 + 1e-5 * s.length());
    }
}

#[rstest(/**/ upsample,
         case(1),
         case(4),
)]
fn curved_streamline_length_is_conserved(upsample: usize) {
    let grid = grid(40, 1.0);
    let mut mapper = MapperBuilder::new(grid).precise(true).upsample_ratio(upsample).build::<Voxel>().unwrap();
    // Quarter circle of radius 15 mm around (5, 5, 10)
    let points = (0..=30)
        .map(|k| k as f32 * std::f32::consts::FRAC_PI_2 / 30.0)
        .map(|a| Point::new(5.0 + 15.0 * a.cos(), 5.0 + 15.0 * a.sin(), 10.0))
        .collect();
    let s = Streamline::new(points);
    let set = mapper.map(&s);
    assert_float_eq!(set.total_length(), s.length(), rel <= 5e-3);
}

// ----- Single-voxel containment ---------------------------------------------------------
#[test]
fn streamline_inside_one_voxel() {
    let mut mapper = MapperBuilder::new(grid(5, 2.0)).precise(true).build::<VoxelDir>().unwrap();
    let s = Streamline::from_components([(4.1, 4.0, 3.8), (4.3, 4.2, 3.9), (4.6, 4.1, 4.2)]);
    let set = mapper.map(&s);
    assert_eq!(set.len(), 1);
    let entry = set.get(&[2, 2, 2]).unwrap();
    assert_float_eq!(entry.length, s.length(), rel <= 1e-6);
    // Direction from entry (first vertex) to exit (last vertex)
    let chord = (s.points[2] - s.points[0]).normalize();
    assert_float_eq!(entry.dir.dot(&chord), 1.0, abs <= 1e-5);
}

// ----- Bounds skipping ------------------------------------------------------------------
#[rstest(/**/ precise,
         case(true),
         case(false),
)]
fn leaving_the_grid_is_not_an_error(precise: bool) {
    let mut mapper = MapperBuilder::new(grid(4, 1.0)).precise(precise).build::<Voxel>().unwrap();
    let s = straight(Point::new(-6.0, 1.0, 1.0), Point::new(6.0, 1.0, 1.0), 48);
    let set = mapper.map(&s);
    assert_eq!(set.len(), 4);
    assert!(set.iter().all(|e| e.voxel[1] == 1 && e.voxel[2] == 1));
    if precise {
        // Grid spans x in [-0.5, 3.5]
        assert_float_eq!(set.total_length(), 4.0, abs <= 0.01);
    }
}

#[test]
fn streamline_entirely_outside() {
    let mut mapper = MapperBuilder::new(grid(4, 1.0)).precise(true).build::<Voxel>().unwrap();
    let s = straight(Point::new(10.0, 10.0, 10.0), Point::new(20.0, 10.0, 10.0), 10);
    assert!(mapper.map(&s).is_empty());
}

#[rstest(/**/ precise, expected,
         case(false, vec![[1, 1, 1],                       [2, 3, 1]]),
         case(true , vec![[1, 1, 1], [2, 1, 1], [2, 2, 1], [2, 3, 1]]),
)]
fn non_finite_vertices_are_skipped(precise: bool, expected: Vec<[usize; 3]>) {
    let mut mapper = MapperBuilder::new(grid(4, 1.0)).precise(precise).build::<Voxel>().unwrap();
    let s = Streamline::from_components([
        (1.0, 1.0, 1.0), (2.0, 1.0, 1.0), (f32::NAN, 1.0, 1.0), (2.0, 2.0, 1.0), (2.0, 3.0, 1.0),
    ]);
    let set = mapper.map(&s);
    let mut voxels: Vec<_> = set.iter().map(|e| e.voxel).collect();
    voxels.sort();
    assert_eq!(voxels, expected);
    assert!(set.iter().all(|e| e.length.is_finite()));
    if precise {
        // Each finite run crosses one voxel boundary at its midpoint
        assert!(set.iter().all(|e| (e.length - 0.5).abs() < 1e-3), "{set:?}");
    }
}

// ----- Dixels ---------------------------------------------------------------------------
#[test]
fn dixel_matches_its_own_direction() {
    let directions = Arc::new(DirectionSet::fibonacci(300).unwrap());
    let mut mapper = MapperBuilder::new(grid(10, 1.0)).precise(true)
        .dixel(directions.clone())
        .build::<Dixel>().unwrap();
    for bin in [0, 17, 150, 299] {
        let d = *directions.get(bin);
        let start = Point::new(5.0, 5.0, 5.0) - d * 0.3;
        let set = mapper.map(&straight(start, start + d * 0.6, 3));
        assert_eq!(set.len(), 1);
        assert!(set.get(&([5, 5, 5], bin)).is_some(), "bin {bin}: {set:?}");
    }
}

// ----- Fixels ---------------------------------------------------------------------------
fn fixels_at_angles(angles_degrees: &[f32]) -> Arc<FixelDataset> {
    let n = [3, 3, 3];
    let mut voxels = vec![vec![]; 27];
    voxels[index3_to_1([1, 1, 1], n)] = angles_degrees.iter()
        .map(|a| a.to_radians())
        .map(|a| Vector::new(a.cos(), a.sin(), 0.0))
        .collect();
    Arc::new(FixelDataset::from_voxels(n, voxels).unwrap())
}

#[rstest(/**/ angles       , expected,
         case(&[80.0, 30.0], Some(1)),
         case(&[30.0, 80.0], Some(0)),
         case(&[80.0      ], None   ),
         case(&[          ], None   ),
)]
fn fixel_angular_threshold(angles: &[f32], expected: Option<usize>) {
    let fixels = fixels_at_angles(angles);
    let mut mapper = MapperBuilder::new(grid(3, 1.0)).precise(true).fixel(fixels).build::<Fixel>().unwrap();
    // Along x, inside voxel [1,1,1]
    let set = mapper.map(&straight(Point::new(0.7, 1.0, 1.0), Point::new(1.3, 1.0, 1.0), 2));
    let assigned: Vec<usize> = set.iter().map(|e| e.fixel).collect();
    assert_eq!(assigned, expected.into_iter().collect::<Vec<_>>());
}

#[test]
fn fixel_threshold_can_be_widened() {
    let fixels = fixels_at_angles(&[80.0]);
    let mut mapper = MapperBuilder::new(grid(3, 1.0))
        .fixel_with_angle(fixels, degree(85.0))
        .build::<Fixel>().unwrap();
    let set = mapper.map(&straight(Point::new(0.7, 1.0, 1.0), Point::new(1.3, 1.0, 1.0), 2));
    assert_eq!(set.len(), 1);
}

// ----- Parallel accumulation ------------------------------------------------------------
#[test]
fn parallel_fixel_density() {
    let fixels = fixels_at_angles(&[0.0, 90.0]);
    let mapper = MapperBuilder::new(grid(3, 1.0)).precise(true).fixel(fixels.clone()).build::<Fixel>().unwrap();
    let along_x = straight(Point::new(0.6, 1.0, 1.0), Point::new(1.4, 1.0, 1.0), 4);
    let along_y = straight(Point::new(1.0, 0.6, 1.0), Point::new(1.0, 1.4, 1.0), 4).with_weight(2.0);
    let input: Vec<_> = (0..50).map(|i| if i % 2 == 0 { along_x.clone() } else { along_y.clone() }).collect();
    let density = map_streamlines(&mapper, &input, 8, FixelDensity::new(fixels.n_fixels()), false);
    assert_float_eq!(density.data[0], 25.0 * 0.8      , rel <= 1e-4);
    assert_float_eq!(density.data[1], 25.0 * 0.8 * 2.0, rel <= 1e-4);
}

#[test]
fn track_density_of_dixels() {
    let grid = grid(6, 1.0);
    let directions = Arc::new(DirectionSet::fibonacci(60).unwrap());
    let mapper = MapperBuilder::new(grid).precise(true).dixel(directions).build::<Dixel>().unwrap();
    let s = straight(Point::new(0.0, 2.0, 2.0), Point::new(5.0, 2.0, 2.0), 10);
    let density = map_streamlines(&mapper, &[s.clone(), s], 1, TrackDensity::new(grid), false);
    assert_float_eq!(density.total(), 10.0, abs <= 1e-3);
    assert_float_eq!(density.data[index3_to_1([3, 2, 2], grid.n)], 2.0, abs <= 0.02);
    let serial: f32 = {
        let mut mapper = mapper.clone();
        let mut acc = TrackDensity::new(grid);
        acc.merge(&mapper.map(&straight(Point::new(0.0, 2.0, 2.0), Point::new(5.0, 2.0, 2.0), 10)));
        acc.total()
    };
    assert_float_eq!(serial, 5.0, abs <= 1e-3);
}
