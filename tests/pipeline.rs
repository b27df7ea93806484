//! End-to-end runs of the public API against files on disk.

use sat_raster::config::PipelineConfig;
use sat_raster::geotiff::{self, WriteOptions};
use sat_raster::profile::Driver;
use sat_raster::{
    Boundary, Codec, Crs, GeoTransform, Profile, Raster, RasterError, SampleType, boundary,
    clip_raster, pipeline, recompress, reproject, WarpOptions,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn utm() -> Crs {
    Crs::parse("EPSG:32611").unwrap()
}

/// 100×100 single-band uint8 scene, 30 m pixels, no-data 0, every pixel 1..=250.
fn scene() -> Raster {
    let profile = Profile {
        driver: Driver::GTiff,
        dtype: SampleType::U8,
        width: 100,
        height: 100,
        count: 1,
        crs: Some(utm()),
        transform: GeoTransform::from_origin(500_000.0, 3_800_000.0, 30.0, 30.0),
        nodata: Some(0.0),
        compress: Codec::Lzw,
    };
    let band = (0..100 * 100).map(|i| (i % 250 + 1) as f64).collect();
    Raster::new(profile, vec![band]).unwrap()
}

fn write(dir: &Path, name: &str, raster: &Raster) -> PathBuf {
    let path = dir.join(name);
    geotiff::write(&path, raster, &WriteOptions::default()).unwrap();
    path
}

fn utm_geojson(dir: &Path, rings: &str) -> PathBuf {
    let path = dir.join("aoi.geojson");
    let text = format!(
        r#"{{
            "type": "FeatureCollection",
            "crs": {{ "type": "name", "properties": {{ "name": "EPSG:32611" }} }},
            "features": [{{
                "type": "Feature",
                "properties": {{}},
                "geometry": {{ "type": "Polygon", "coordinates": {rings} }}
            }}]
        }}"#
    );
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn left_half_clip_from_disk() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "scene.tif", &scene());
    let aoi = utm_geojson(
        tmp.path(),
        "[[[500000, 3797000], [501500, 3797000], [501500, 3800000], [500000, 3800000], [500000, 3797000]]]",
    );

    let raster = Raster::open(&src).unwrap();
    let boundary = boundary::load(&aoi).unwrap();
    let clipped = clip_raster(&raster, &boundary, true).unwrap();
    assert_eq!((clipped.width(), clipped.height()), (50, 100));
    assert_eq!(clipped.transform().c, 500_000.0);
    assert_eq!(clipped.valid_count(0), 50 * 100);

    let dst = write(tmp.path(), "clipped.tif", &clipped);
    let back = Raster::open(&dst).unwrap();
    assert_eq!(back, clipped);
}

#[test]
fn full_extent_clip_is_identity() {
    let scene = scene();
    let b = scene.bounds();
    let ring = geo::LineString::from(vec![
        (b.left, b.bottom),
        (b.right, b.bottom),
        (b.right, b.top),
        (b.left, b.top),
        (b.left, b.bottom),
    ]);
    let boundary = Boundary::new(vec![geo::Polygon::new(ring, vec![])], scene.crs());
    let clipped = clip_raster(&scene, &boundary, true).unwrap();
    assert_eq!(clipped, scene);
}

#[test]
fn reproject_round_trip_keeps_dimensions() {
    let scene = scene();
    let options = WarpOptions::default();
    let geographic = reproject(&scene, Crs::WGS84, &options).unwrap();
    let back = reproject(&geographic, utm(), &options).unwrap();
    assert!(back.width().abs_diff(100) <= 1);
    assert!(back.height().abs_diff(100) <= 1);
    assert_eq!(back.crs(), Some(utm()));
}

#[test]
fn lossless_recompress_then_jpeg() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "scene.tif", &scene());

    let deflated = tmp.path().join("deflate.tif");
    recompress(&src, &deflated, Codec::Deflate, &WriteOptions::default()).unwrap();
    assert_eq!(Raster::open(&deflated).unwrap().bands(), scene().bands());

    let jpeg = tmp.path().join("compressed.tif");
    let report = recompress(&src, &jpeg, Codec::Jpeg, &WriteOptions::default()).unwrap();
    assert_eq!(report.output_bytes, std::fs::metadata(&jpeg).unwrap().len());
    let back = Raster::open(&jpeg).unwrap();
    assert_eq!(back.profile().compress, Codec::Jpeg);
    assert_eq!(back.transform(), scene().transform());
}

#[test]
fn full_pipeline_into_output_dir() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "scene.tif", &scene());
    let aoi = utm_geojson(
        tmp.path(),
        "[[[500600, 3798500], [501800, 3798500], [501800, 3799400], [500600, 3799400], [500600, 3798500]]]",
    );
    let out_dir = tmp.path().join("out");

    let outputs = pipeline::run(&src, &aoi, &out_dir, &PipelineConfig::default()).unwrap();
    assert_eq!((outputs.clipped_raster.width(), outputs.clipped_raster.height()), (40, 30));

    let compressed = Raster::open(&out_dir.join("compressed.tif")).unwrap();
    assert_eq!(compressed.crs(), Some(Crs::WGS84));
    assert_eq!(compressed.profile().compress, Codec::Jpeg);
    assert!(out_dir.join("clipped_4326.tif").exists());
}

#[test]
fn empty_boundary_is_rejected_without_output() {
    let tmp = TempDir::new().unwrap();
    let src = write(tmp.path(), "scene.tif", &scene());
    let aoi = tmp.path().join("empty.geojson");
    std::fs::write(&aoi, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
    let dst = tmp.path().join("clipped.tif");

    let err = pipeline::clip_file(&src, &aoi, &dst, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, RasterError::EmptyGeometry));
    assert!(!dst.exists());
}

#[test]
fn jpeg_rejects_float_scene() {
    let tmp = TempDir::new().unwrap();
    let (mut profile, bands) = scene().into_parts();
    profile.dtype = SampleType::F32;
    let src = write(tmp.path(), "float.tif", &Raster::new(profile, bands).unwrap());
    let dst = tmp.path().join("compressed.tif");
    let err = recompress(&src, &dst, Codec::Jpeg, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, RasterError::UnsupportedSampleType { .. }));
    assert!(!dst.exists());
}
