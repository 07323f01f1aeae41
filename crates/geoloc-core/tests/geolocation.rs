//! Image to ground round trips through a slanted sensor and layered terrain.

use approx::assert_abs_diff_eq;
use geoloc_core::{
    BoundedRayMarchSolver, ConstantOffsetProvider, DefaultedSensorModel, ElevationChain,
    ElevationModel, ImageCoordinate, SensorModel, SensorModelOptions, Solver, SolverBounds,
    WorldCoordinate,
};

/// Pixels per radian.
const SCALE: f64 = 1e6;
/// Horizontal displacement of the image per meter of height (rad/m).
const PARALLAX: [f64; 2] = [1e-7, -5e-8];

/// An oblique sensor: higher points appear shifted in the image.
struct ObliqueSensor {
    bounds: SolverBounds,
}

impl ObliqueSensor {
    fn project(lon: f64, lat: f64, height: f64) -> [f64; 2] {
        [
            (lon + PARALLAX[0] * height) * SCALE,
            (lat + PARALLAX[1] * height) * SCALE,
        ]
    }
}

impl SensorModel for ObliqueSensor {
    fn image_to_world(
        &self,
        image_coordinate: &ImageCoordinate,
        elevation_model: Option<&dyn ElevationModel>,
        _options: Option<&SensorModelOptions>,
    ) -> WorldCoordinate {
        let flat = ElevationChain::constant(0.0);
        let elevation_model: &dyn ElevationModel = match elevation_model {
            Some(model) => model,
            None => &flat,
        };
        let target = [image_coordinate.x, image_coordinate.y];

        let cost = move |p: &[f64; 2], model: &dyn ElevationModel| -> f64 {
            let mut ground = WorldCoordinate::new(p[0], p[1], 0.0);
            model.set_elevation(&mut ground);
            let pixel = Self::project(ground.longitude, ground.latitude, ground.elevation);
            (pixel[0] - target[0]).powi(2) + (pixel[1] - target[1]).powi(2)
        };
        let guess = [target[0] / SCALE, target[1] / SCALE];

        let solution = BoundedRayMarchSolver::new(cost, elevation_model, guess, 1e-3)
            .with_bounds(self.bounds)
            .solve();
        assert!(solution.success, "solve failed at {:?}", solution.coordinate);
        solution.coordinate
    }

    fn world_to_image(&self, world_coordinate: &WorldCoordinate) -> ImageCoordinate {
        let pixel = Self::project(
            world_coordinate.longitude,
            world_coordinate.latitude,
            world_coordinate.elevation,
        );
        ImageCoordinate::new(pixel[0], pixel[1])
    }
}

/// Terrain rising 100 m per milliradian of longitude, stored against a datum
/// 10 m above the ellipsoid.
fn terrain() -> ElevationChain {
    ElevationChain::normalized(ElevationChain::offset(
        ElevationChain::source(|c: &mut WorldCoordinate| -> bool {
            c.elevation = 200.0 + 1e5 * c.longitude;
            true
        }),
        ConstantOffsetProvider::new(-10.0),
    ))
}

fn assert_close(actual: &WorldCoordinate, expected: &WorldCoordinate) {
    assert_abs_diff_eq!(actual.longitude, expected.longitude, epsilon = 1e-6);
    assert_abs_diff_eq!(actual.latitude, expected.latitude, epsilon = 1e-6);
    assert_abs_diff_eq!(actual.elevation, expected.elevation, epsilon = 1.0);
}

fn ground_truth(terrain: &ElevationChain) -> WorldCoordinate {
    let mut truth = WorldCoordinate::new(0.002, 0.001, f64::NAN);
    assert!(terrain.set_elevation(&mut truth));
    truth
}

#[test]
fn test_image_to_world_marching_up_from_baseline() {
    let terrain = terrain();
    let truth = ground_truth(&terrain);
    assert_abs_diff_eq!(truth.elevation, 390.0, epsilon = 1e-9);

    let sensor = ObliqueSensor {
        bounds: SolverBounds::none(),
    };
    let pixel = sensor.world_to_image(&truth);
    let located = sensor.image_to_world(&pixel, Some(&terrain), None);
    assert_close(&located, &truth);
}

#[test]
fn test_image_to_world_marching_down_from_height_bound() {
    let terrain = terrain();
    let truth = ground_truth(&terrain);

    let sensor = ObliqueSensor {
        bounds: SolverBounds::none().with_height(-100.0, 2000.0),
    };
    let pixel = sensor.world_to_image(&truth);
    let located = sensor.image_to_world(&pixel, Some(&terrain), None);
    assert_close(&located, &truth);
}

#[test]
fn test_defaulted_sensor_supplies_terrain() {
    let sensor = DefaultedSensorModel::new(ObliqueSensor {
        bounds: SolverBounds::none().with_height(0.0, 1000.0),
    })
    .with_elevation_model(terrain());

    let truth = ground_truth(&terrain());
    let unknown_height = WorldCoordinate::new(truth.longitude, truth.latitude, f64::NAN);
    let pixel = sensor.world_to_image(&unknown_height);
    assert_abs_diff_eq!(pixel.x, sensor.inner().world_to_image(&truth).x, epsilon = 1e-9);

    let located = sensor.image_to_world(&pixel, None, None);
    assert_close(&located, &truth);

    // Without terrain the same pixel lands on the ellipsoid further along the ray.
    let ignore = SensorModelOptions {
        ignore_default_elevation_model: Some(true),
    };
    let on_ellipsoid = sensor.image_to_world(&pixel, None, Some(&ignore));
    assert_abs_diff_eq!(on_ellipsoid.elevation, 0.0);
    assert_abs_diff_eq!(
        on_ellipsoid.longitude,
        truth.longitude + PARALLAX[0] * truth.elevation,
        epsilon = 1e-6
    );
}

#[test]
fn test_solver_is_shareable_across_threads() {
    let terrain = terrain();
    let truth = ground_truth(&terrain);
    let sensor = ObliqueSensor {
        bounds: SolverBounds::none(),
    };
    let pixel = sensor.world_to_image(&truth);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| sensor.image_to_world(&pixel, Some(&terrain), None)))
            .collect();
        for handle in handles {
            assert_close(&handle.join().unwrap(), &truth);
        }
    });
}
