use std::collections::HashSet;
use std::fs;
use std::path::Path;

use annotator::{AnnotateConfig, AnnotateError, AnnotationBuilder};
use compositor::{ComposeConfig, ComposeWarning, Compositor, DatasetMetadata};
use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
use synth_common::{DatasetInfo, Manifest, MaskDefinitions};

/// Opaque disc on a transparent square
fn write_cutout(path: &Path, size: u32, color: [u8; 3]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let r = size as f32 / 2.0 - 1.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - size as f32 / 2.0;
        let dy = y as f32 + 0.5 - size as f32 / 2.0;
        if dx * dx + dy * dy <= r * r {
            Rgba([color[0], color[1], color[2], 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
    .save(path)
    .unwrap();
}

fn write_background(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x / 3 % 256) as u8, (y / 3 % 256) as u8, 128]))
        .save(path)
        .unwrap();
}

/// `bird/eagle` and `bird/owl` with three cutouts each, two backgrounds
fn bird_assets(root: &Path) {
    let fg = root.join("foregrounds").join("bird");
    write_cutout(&fg.join("owl").join("owl_a.png"), 160, [210, 170, 60]);
    write_cutout(&fg.join("owl").join("owl_b.png"), 140, [190, 140, 50]);
    write_cutout(&fg.join("eagle").join("eagle_a.png"), 180, [80, 50, 20]);
    write_cutout(&fg.join("owl").join("owl_c.png"), 100, [230, 200, 90]);
    write_cutout(&fg.join("eagle").join("eagle_b.png"), 120, [100, 70, 30]);
    write_cutout(&fg.join("eagle").join("eagle_c.png"), 150, [60, 40, 10]);
    write_background(&root.join("backgrounds").join("field.png"), 800, 600);
    write_background(&root.join("backgrounds").join("lake.jpg"), 512, 512);
}

fn bird_config(input: &Path, output: &Path) -> ComposeConfig {
    ComposeConfig {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        count: 5,
        width: 512,
        height: 512,
        min_objects: 1,
        max_objects: 3,
        seed: 42,
        min_visible_pixels: 64,
        dataset: DatasetMetadata {
            description: "birds".to_string(),
            date_created: Some("06/01/2024".to_string()),
            ..DatasetMetadata::default()
        },
        ..ComposeConfig::default()
    }
}

fn compose_and_annotate(config: ComposeConfig) -> Manifest {
    let output = config.output_dir.clone();
    Compositor::from_config(config).unwrap().run().unwrap();
    let report = AnnotationBuilder::new(AnnotateConfig::for_dataset(&output))
        .unwrap()
        .run()
        .unwrap();
    assert!(report.failures.is_empty());
    Manifest::load(&report.output_path).unwrap()
}

fn mask_pixel_count(path: &Path) -> u64 {
    image::open(path)
        .unwrap()
        .to_luma8()
        .pixels()
        .filter(|p| p[0] > 127)
        .count() as u64
}

#[test]
fn test_bird_dataset_end_to_end() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());

    let report = Compositor::from_config(bird_config(input.path(), output.path()))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.samples, 5);
    assert!((5..=15).contains(&(report.instances + report.dropped)));
    let definitions = MaskDefinitions::load(&report.mask_definitions_path).unwrap();
    assert_eq!(definitions.samples.len(), 5);
    assert_eq!(definitions.mask_count(), report.instances);

    let annotated = AnnotationBuilder::new(AnnotateConfig::for_dataset(output.path()))
        .unwrap()
        .run()
        .unwrap();
    assert!(annotated.failures.is_empty());
    let manifest = Manifest::load(&annotated.output_path).unwrap();
    manifest.check_invariants().unwrap();

    assert_eq!(manifest.images.len(), 5);
    for (i, image) in manifest.images.iter().enumerate() {
        assert_eq!(image.id, i as u64 + 1);
        assert_eq!(image.file_name, format!("images/{i:08}.png"));
        assert_eq!((image.width, image.height), (512, 512));
        assert!(output.path().join(&image.file_name).is_file());
    }

    let names: Vec<_> = manifest.categories.iter().map(|c| (c.id, c.name.as_str(), c.supercategory.as_str())).collect();
    assert_eq!(names, vec![(1, "eagle", "bird"), (2, "owl", "bird")]);

    let per_image = |id| manifest.annotations.iter().filter(|a| a.image_id == id).count();
    for image in &manifest.images {
        assert!(per_image(image.id) <= 3);
    }
    assert!(!manifest.annotations.is_empty());

    let ids: HashSet<_> = manifest.annotations.iter().map(|a| a.id).collect();
    assert_eq!(ids.len(), manifest.annotations.len());
    for annotation in &manifest.annotations {
        assert_eq!(annotation.iscrowd, 0);
        assert!(!annotation.segmentation.is_empty());
        for ring in &annotation.segmentation {
            assert!(ring.len() >= 6);
            assert_eq!(ring.len() % 2, 0);
        }
    }
}

#[test]
fn test_bboxes_within_image_and_areas_exact() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());

    let manifest = compose_and_annotate(bird_config(input.path(), output.path()));
    let definitions = MaskDefinitions::load(&output.path().join(MaskDefinitions::FILE_NAME)).unwrap();
    let masks: Vec<_> = definitions.samples.iter().flat_map(|s| s.masks.iter()).collect();
    assert_eq!(masks.len(), manifest.annotations.len());

    for (annotation, record) in manifest.annotations.iter().zip(&masks) {
        let [x, y, w, h] = annotation.bbox;
        assert!(x >= 0.0 && y >= 0.0 && w > 0.0 && h > 0.0);
        assert!(x + w <= 512.0 && y + h <= 512.0);
        assert_eq!(annotation.bbox, record.bounding_box_hint.to_coco());

        let pixels = mask_pixel_count(&output.path().join(&record.mask_file_name));
        assert_eq!(annotation.area, pixels as f64);
    }
}

#[test]
fn test_same_seed_is_byte_identical() {
    let input = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let serial = ComposeConfig { threads: Some(1), ..bird_config(input.path(), first.path()) };
    let parallel = ComposeConfig { threads: Some(4), ..bird_config(input.path(), second.path()) };
    let a = compose_and_annotate(serial);
    let b = compose_and_annotate(parallel);

    for image in &a.images {
        let left = fs::read(first.path().join(&image.file_name)).unwrap();
        let right = fs::read(second.path().join(&image.file_name)).unwrap();
        assert_eq!(left, right, "{} differs", image.file_name);
    }
    assert_eq!(
        fs::read_to_string(first.path().join(MaskDefinitions::FILE_NAME)).unwrap(),
        fs::read_to_string(second.path().join(MaskDefinitions::FILE_NAME)).unwrap()
    );
    assert_eq!(
        fs::read(first.path().join(DatasetInfo::FILE_NAME)).unwrap(),
        fs::read(second.path().join(DatasetInfo::FILE_NAME)).unwrap()
    );
    assert_eq!(
        fs::read(first.path().join(Manifest::FILE_NAME)).unwrap(),
        fs::read(second.path().join(Manifest::FILE_NAME)).unwrap()
    );
    assert_eq!(a.info.date_created, "06/01/2024");
    assert_eq!(a.images, b.images);
    assert_eq!(a.annotations, b.annotations);
    assert_eq!(a.categories, b.categories);
}

#[test]
fn test_annotation_is_idempotent() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    compose_and_annotate(bird_config(input.path(), output.path()));

    let path = output.path().join(Manifest::FILE_NAME);
    let first = fs::read(&path).unwrap();
    AnnotationBuilder::new(AnnotateConfig::for_dataset(output.path()))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(first, fs::read(&path).unwrap());
}

#[test]
fn test_foreground_without_alpha_is_skipped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    let flat = input.path().join("foregrounds").join("bird").join("owl").join("flat.png");
    RgbImage::from_pixel(64, 64, Rgb([255, 0, 0])).save(&flat).unwrap();

    let compositor = Compositor::from_config(bird_config(input.path(), output.path())).unwrap();
    assert_eq!(compositor.catalog().foregrounds().len(), 6);
    assert!(compositor.catalog().foregrounds().iter().all(|f| f.path != flat));

    let report = compositor.run().unwrap();
    assert_eq!(report.samples, 5);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        ComposeWarning::SkippedAsset { path, .. } if *path == flat
    )));
}

#[test]
fn test_fully_occluded_instance_is_dropped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    // A canvas-sized cutout placed at the same spot twice: the second copy hides the first
    write_cutout(&input.path().join("foregrounds/bird/owl/owl.png"), 64, [200, 100, 0]);
    write_background(&input.path().join("backgrounds/bg.png"), 64, 64);

    let config = ComposeConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        count: 2,
        width: 64,
        height: 64,
        min_objects: 2,
        max_objects: 2,
        scale_range: [1.0, 1.0],
        rotation_range: [0.0, 0.0],
        brightness_range: [1.0, 1.0],
        allow_duplicates: true,
        ..ComposeConfig::default()
    };
    let report = Compositor::from_config(config).unwrap().run().unwrap();

    assert_eq!(report.samples, 2);
    assert_eq!(report.instances, 2);
    assert_eq!(report.dropped, 2);
    assert!(report.warnings.iter().all(|w| matches!(
        w,
        ComposeWarning::FullyOccludedInstance { paint_index: 0, visible_pixels: 0, .. }
    )));

    let definitions = MaskDefinitions::load(&report.mask_definitions_path).unwrap();
    for sample in &definitions.samples {
        assert_eq!(sample.masks.len(), 1);
        assert!(mask_pixel_count(&output.path().join(&sample.masks[0].mask_file_name)) > 0);
    }
    let stray = fs::read_dir(output.path().join("masks")).unwrap().count();
    assert_eq!(stray, 2);
}

#[test]
fn test_categories_round_trip() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    let manifest = compose_and_annotate(bird_config(input.path(), output.path()));

    let (info, _) = DatasetInfo::load(&output.path().join(DatasetInfo::FILE_NAME)).unwrap();
    assert_eq!(info.categories.len(), manifest.categories.len());
    for (listed, emitted) in info.categories.iter().zip(&manifest.categories) {
        assert_eq!(listed.name, emitted.name);
        assert_eq!(listed.supercategory, emitted.supercategory);
    }
    assert_eq!(manifest.info.description, info.info.description);

    let definitions = MaskDefinitions::load(&output.path().join(MaskDefinitions::FILE_NAME)).unwrap();
    let records: Vec<_> = definitions.samples.iter().flat_map(|s| s.masks.iter()).collect();
    for (annotation, record) in manifest.annotations.iter().zip(records) {
        let category = manifest.category_of(annotation).unwrap();
        assert_eq!(category.name, record.category);
        assert_eq!(category.supercategory, record.supercategory);
    }
}

#[test]
fn test_missing_mask_file_skips_sample() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    Compositor::from_config(bird_config(input.path(), output.path()))
        .unwrap()
        .run()
        .unwrap();

    let definitions = MaskDefinitions::load(&output.path().join(MaskDefinitions::FILE_NAME)).unwrap();
    let victim = &definitions.samples[2];
    fs::remove_file(output.path().join(&victim.masks[0].mask_file_name)).unwrap();

    let report = AnnotationBuilder::new(AnnotateConfig::for_dataset(output.path()))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].image_file_name, victim.image_file_name);
    assert_eq!(report.images, 4);

    let manifest = Manifest::load(&report.output_path).unwrap();
    manifest.check_invariants().unwrap();
    assert!(manifest.images.iter().all(|i| i.file_name != victim.image_file_name));
}

#[test]
fn test_truncated_dataset_info_is_fatal() {
    let output = tempfile::tempdir().unwrap();
    fs::write(output.path().join(MaskDefinitions::FILE_NAME), "[]").unwrap();
    fs::write(output.path().join(DatasetInfo::FILE_NAME), r#"{"info": {"description": "x"}"#).unwrap();

    let result = AnnotationBuilder::new(AnnotateConfig::for_dataset(output.path()))
        .unwrap()
        .run();
    assert!(matches!(result, Err(AnnotateError::MalformedMetadata { .. })));
    assert!(!output.path().join(Manifest::FILE_NAME).exists());
}

#[test]
fn test_mask_files_are_binary() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    bird_assets(input.path());
    Compositor::from_config(bird_config(input.path(), output.path()))
        .unwrap()
        .run()
        .unwrap();

    for entry in fs::read_dir(output.path().join("masks")).unwrap() {
        let mask: GrayImage = image::open(entry.unwrap().path()).unwrap().to_luma8();
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(mask.pixels().any(|p| p[0] == 255));
    }
}
