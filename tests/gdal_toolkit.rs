use std::path::Path;

use approx::assert_relative_eq;
use gdal::DriverManager;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;

use spectile::io::toolkit::{CoordinateTransforms, PointTransform, RasterToolkit, WGS84};
use spectile::{GdalToolkit, ToolkitConfig};

fn write_geotiff(path: &Path, cols: usize, rows: usize) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = driver
        .create_with_band_type::<u16, _>(path, cols, rows, 2)
        .unwrap();
    ds.set_geo_transform(&[116.0, 0.001, 0.0, 40.0, 0.0, -0.001])
        .unwrap();
    let wkt = SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap();
    ds.set_projection(&wkt).unwrap();
    for (band, offset) in [(1usize, 10u16), (2, 100)] {
        let data: Vec<u16> = (0..cols * rows).map(|i| offset + (i % 50) as u16).collect();
        let mut buf = Buffer::new((cols, rows), data);
        ds.rasterband(band)
            .unwrap()
            .write((0, 0), (cols, rows), &mut buf)
            .unwrap();
    }
}

#[test]
fn describes_a_geotiff_through_the_binding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.tif");
    write_geotiff(&path, 64, 32);

    let toolkit = GdalToolkit::new(ToolkitConfig::default());
    let info = toolkit.describe(&path).unwrap();

    assert_eq!((info.width, info.height, info.band_count), (64, 32, 2));
    assert_relative_eq!(info.geo_transform[1], 0.001);
    assert!(info.projection.unwrap().contains("WGS 84"));

    let (min, max) = toolkit.band_range(&path, 2).unwrap();
    assert_relative_eq!(min, 100.0);
    assert_relative_eq!(max, 149.0);
}

#[test]
fn missing_raster_is_an_error() {
    let toolkit = GdalToolkit::new(ToolkitConfig::default());
    assert!(toolkit.describe(Path::new("/nonexistent/scene.img")).is_err());
}

#[test]
fn geodetic_transform_is_lon_lat() {
    let toolkit = GdalToolkit::new(ToolkitConfig::default());

    let identity = toolkit.geodetic_transform(WGS84).unwrap();
    let (x, y) = identity.transform(116.5, 40.1).unwrap();
    assert_relative_eq!(x, 116.5, epsilon = 1e-9);
    assert_relative_eq!(y, 40.1, epsilon = 1e-9);

    // UTM 50N false easting at the central meridian (117 E)
    let utm = toolkit.geodetic_transform("EPSG:32650").unwrap();
    let (lon, lat) = utm.transform(500_000.0, 0.0).unwrap();
    assert_relative_eq!(lon, 117.0, epsilon = 1e-7);
    assert_relative_eq!(lat, 0.0, epsilon = 1e-7);

    assert!(toolkit.geodetic_transform("not a crs at all").is_err());
}
