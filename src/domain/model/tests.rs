// Unit tests for domain models

use super::*;

fn id(value: &str) -> RepresentationId {
    RepresentationId::new(value).unwrap()
}

#[test]
fn test_quality_ordering_is_ascending_fidelity() {
    assert!(Quality::Low < Quality::Medium);
    assert!(Quality::Medium < Quality::High);
    assert_eq!(Quality::High.to_string(), "HIGH");
}

#[test]
fn test_representation_rejects_zero_dimensions() {
    assert!(Representation::new(0, 360, 15.0).is_err());
    assert!(Representation::new(640, 0, 15.0).is_err());
}

#[test]
fn test_representation_rejects_non_positive_frame_rate() {
    assert!(Representation::new(640, 360, 0.0).is_err());
    assert!(Representation::new(640, 360, -30.0).is_err());
    assert!(Representation::new(640, 360, f64::NAN).is_err());
}

#[test]
fn test_representation_filters() {
    let rep = Representation::new(1280, 720, 30.0).unwrap();
    assert_eq!(rep.scale_filter(), "scale=1280:720");
    assert_eq!(rep.fps_filter(), "fps=30");
    assert_eq!(Representation::new(640, 360, 29.97).unwrap().fps_filter(), "fps=29.97");
}

#[test]
fn test_representation_id_must_be_a_plain_directory_name() {
    assert!(RepresentationId::new("0").is_ok());
    assert!(RepresentationId::new("hd").is_ok());
    assert!(RepresentationId::new("").is_err());
    assert!(RepresentationId::new("..").is_err());
    assert!(RepresentationId::new("a/b").is_err());
    assert!(RepresentationId::new(".hidden").is_err());
}

#[test]
fn test_reference_ladder() {
    let ladder = RepresentationLadder::reference();
    assert_eq!(ladder.len(), 3);

    let entries: Vec<_> = ladder.entries().collect();
    assert_eq!(entries[0].quality, Quality::Low);
    assert_eq!(entries[0].representation, Representation::new(640, 360, 15.0).unwrap());
    assert_eq!(entries[0].id.as_str(), "0");
    assert_eq!(entries[1].id.as_str(), "1");
    assert_eq!(entries[2].representation.width, 3840);
    assert_eq!(entries[2].id.as_str(), "2");

    assert!(crate::domain::rules::LadderRules::validate(&ladder).is_ok());
}

#[test]
fn test_ladder_entries_follow_quality_order_regardless_of_input_order() {
    let ladder = RepresentationLadder::new(vec![
        (Quality::High, Representation::new(1920, 1080, 60.0).unwrap(), id("2")),
        (Quality::Low, Representation::new(640, 360, 15.0).unwrap(), id("0")),
    ])
    .unwrap();

    let qualities: Vec<_> = ladder.qualities().collect();
    assert_eq!(qualities, vec![Quality::Low, Quality::High]);
    assert!(ladder.get(Quality::Medium).is_none());
}

#[test]
fn test_ladder_rejects_duplicate_quality() {
    let rep = Representation::new(640, 360, 15.0).unwrap();
    let result = RepresentationLadder::new(vec![
        (Quality::Low, rep, id("0")),
        (Quality::Low, rep, id("1")),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_source_asset_name_strips_extension() {
    let asset = SourceAsset::new("test_sequences/bunny.y4m").unwrap();
    assert_eq!(asset.name(), "bunny");
    assert!(asset.path().is_absolute());
    assert!(asset.path().ends_with("test_sequences/bunny.y4m"));

    let asset = SourceAsset::new("/videos/clip.v2.mp4").unwrap();
    assert_eq!(asset.name(), "clip.v2");

    let asset = SourceAsset::new("noext").unwrap();
    assert_eq!(asset.name(), "noext");
}

#[test]
fn test_presentation_relocate_rebases_paths() {
    let presentation = PackagedPresentation {
        asset_name: "bunny".to_string(),
        output_dir: PathBuf::from("/out/.bunny.staging"),
        manifest_path: PathBuf::from("/out/.bunny.staging/bunny.mpd"),
        representations: vec![PackagedRepresentation {
            quality: Quality::Low,
            id: id("0"),
            directory: PathBuf::from("/out/.bunny.staging/0"),
            init_segment: PathBuf::from("/out/.bunny.staging/0/init.mp4"),
            segment_count: 3,
        }],
    };

    let moved = presentation.relocate(Path::new("/out/bunny"));
    assert_eq!(moved.manifest_path, PathBuf::from("/out/bunny/bunny.mpd"));
    assert_eq!(moved.representations[0].directory, PathBuf::from("/out/bunny/0"));
    assert_eq!(
        moved.representations[0].init_segment,
        PathBuf::from("/out/bunny/0/init.mp4")
    );
    assert_eq!(moved.total_segments(), 3);
}

#[test]
fn test_job_state_display() {
    assert_eq!(JobState::Encoding { index: 2, total: 3 }.to_string(), "ENCODING(2/3)");
    assert_eq!(JobState::Failed.to_string(), "FAILED");
}
