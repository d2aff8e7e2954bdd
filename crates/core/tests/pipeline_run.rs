//! Conversion pipeline behavior against a scripted toolchain.

mod common;

use std::sync::Arc;

use common::test_env;
use webreel_core::exec::ToolRunner;
use webreel_core::metadata::{sidecar_file_name, OutputMetadata};
use webreel_core::probe::StreamKind;
use webreel_core::testing::{fixtures, MockRunner};
use webreel_core::{Config, ConversionPipeline, ErrorSink, ProgressPublisher, TaskState};

fn build_pipeline(
    config: &Config,
    runner: &Arc<MockRunner>,
) -> (ConversionPipeline, Arc<ProgressPublisher>, Arc<ErrorSink>) {
    let publisher = Arc::new(ProgressPublisher::new());
    let errors = Arc::new(ErrorSink::new());
    let pipeline = ConversionPipeline::new(
        config.clone(),
        Arc::clone(runner) as Arc<dyn ToolRunner>,
        Arc::clone(&publisher),
        Arc::clone(&errors),
    );
    (pipeline, publisher, errors)
}

#[tokio::test]
async fn test_fully_compliant_asset_is_copied_and_extracted() {
    let env = test_env();
    env.seed_source("show.mkv");
    let runner = Arc::new(MockRunner::new(fixtures::fake_toolchain));
    let (pipeline, _, _) = build_pipeline(&env.config, &runner);

    let asset = fixtures::asset(
        env.config.paths.source_root.join("show.mkv"),
        vec![fixtures::stream(
            StreamKind::Audio,
            1,
            "aac",
            Some("LC"),
            Some("jpn"),
            None,
        )],
        vec![fixtures::stream(
            StreamKind::Video,
            0,
            "h264",
            Some("High"),
            None,
            None,
        )],
        vec![fixtures::stream(StreamKind::Subtitle, 2, "ass", None, None, None)],
    );

    let progress = pipeline.run(&[asset]).await.unwrap();

    assert_eq!(progress.assets_processed, 1);
    assert_eq!(progress.assets_failed, 0);
    assert_eq!(progress.video_streams_copied, 1);
    assert_eq!(progress.video_streams_transcoded, 0);
    assert_eq!(progress.audio_streams_copied, 1);
    assert_eq!(progress.audio_streams_transcoded, 0);
    assert_eq!(progress.subtitle_tracks_extracted, 1);
    assert_eq!(progress.subtitle_tracks_skipped, 0);
    assert!(progress.is_finished());
    assert_eq!(progress.tasks[0].state, TaskState::Done);

    // Copied+transcoded sums match what was processed per stream kind.
    assert_eq!(
        progress.video_streams_copied + progress.video_streams_transcoded,
        1
    );
    assert_eq!(
        progress.audio_streams_copied + progress.audio_streams_transcoded,
        1
    );

    // Both the video and audio invocations chose stream copy.
    let ffmpeg_calls = runner.calls_of("ffmpeg");
    let video_call = &ffmpeg_calls[0];
    assert!(video_call.args.contains(&"-vcodec".to_string()));
    assert!(video_call.args.contains(&"copy".to_string()));
    let audio_call = &ffmpeg_calls[1];
    assert!(audio_call.args.contains(&"-acodec".to_string()));
    assert!(audio_call.args.contains(&"copy".to_string()));

    // The sidecar lands next to the artifacts and carries exactly one audio
    // entry (jpn) and one subtitle entry.
    let sidecar_path = env.config.paths.dest_root.join(sidecar_file_name("show"));
    let text = std::fs::read_to_string(&sidecar_path).unwrap();
    let sidecar: OutputMetadata = serde_json::from_str(&text).unwrap();
    assert_eq!(sidecar.name, "show");
    assert!(sidecar.video.is_some());
    assert_eq!(sidecar.audios.len(), 1);
    assert_eq!(sidecar.audios[0].language.as_deref(), Some("jpn"));
    assert_eq!(sidecar.audios[0].codec, "aac");
    assert!(!sidecar.audios[0].manifest.is_empty());
    assert_eq!(sidecar.subtitles.len(), 1);
    assert_eq!(sidecar.subtitles[0].format, "ass");
    assert_eq!(sidecar.subtitles[0].title, "Subtitle Stream 1");
    assert!(sidecar.subtitles[0].text.contains("Dialogue"));

    // Segmentation superseded the intermediates and the manifest files.
    assert!(!env.config.paths.dest_root.join("show.mp4").exists());
    assert!(!env.config.paths.dest_root.join("show.mpd").exists());
    assert!(env
        .config
        .paths
        .dest_root
        .join("show_dashinit.mp4")
        .exists());
    // The subtitle scratch file was cleaned up too.
    assert!(!env.config.paths.temp_root.join("show-sub-0.ass").exists());
}

#[tokio::test]
async fn test_noncompliant_video_is_reencoded() {
    let env = test_env();
    env.seed_source("movie.mkv");
    let runner = Arc::new(MockRunner::new(fixtures::fake_toolchain));
    let (pipeline, _, _) = build_pipeline(&env.config, &runner);

    let asset = fixtures::asset(
        env.config.paths.source_root.join("movie.mkv"),
        vec![],
        vec![fixtures::stream(
            StreamKind::Video,
            0,
            "hevc",
            Some("Main"),
            None,
            None,
        )],
        vec![],
    );

    let progress = pipeline.run(&[asset]).await.unwrap();

    assert_eq!(progress.video_streams_transcoded, 1);
    assert_eq!(progress.video_streams_copied, 0);
    assert!(progress.tasks[0].needs_video_conversion);

    let video_call = &runner.calls_of("ffmpeg")[0];
    assert!(video_call.args.contains(&"libx264".to_string()));
    assert!(video_call.args.contains(&"yuv420p".to_string()));
    // The keyframe interval is pinned for the segmenter.
    assert!(video_call.args.contains(&"-g".to_string()));
    assert!(video_call.args.contains(&"48".to_string()));
}

#[tokio::test]
async fn test_unaccepted_subtitle_is_skipped_without_extraction() {
    let env = test_env();
    env.seed_source("film.mkv");
    let runner = Arc::new(MockRunner::new(fixtures::fake_toolchain));
    let (pipeline, _, _) = build_pipeline(&env.config, &runner);

    let asset = fixtures::asset(
        env.config.paths.source_root.join("film.mkv"),
        vec![],
        vec![fixtures::stream(
            StreamKind::Video,
            0,
            "h264",
            Some("High"),
            None,
            None,
        )],
        vec![fixtures::stream(
            StreamKind::Subtitle,
            2,
            "hdmv_pgs_subtitle",
            None,
            Some("eng"),
            None,
        )],
    );

    let progress = pipeline.run(&[asset]).await.unwrap();

    assert_eq!(progress.subtitle_tracks_skipped, 1);
    assert_eq!(progress.subtitle_tracks_extracted, 0);
    assert_eq!(progress.assets_processed, 1);

    // No extraction invocation was made for the bitmap subtitle.
    let extraction_calls: Vec<_> = runner
        .calls_of("ffmpeg")
        .into_iter()
        .filter(|call| call.args.iter().any(|a| a.starts_with("0:s:")))
        .collect();
    assert!(extraction_calls.is_empty());

    // And no subtitle entry was produced.
    let text = std::fs::read_to_string(
        env.config.paths.dest_root.join(sidecar_file_name("film")),
    )
    .unwrap();
    let sidecar: OutputMetadata = serde_json::from_str(&text).unwrap();
    assert!(sidecar.subtitles.is_empty());
}

fn three_assets(config: &Config) -> Vec<webreel_core::DetectedAsset> {
    ["one", "two", "three"]
        .iter()
        .map(|name| {
            fixtures::asset(
                config.paths.source_root.join(format!("{name}.mkv")),
                vec![fixtures::stream(
                    StreamKind::Audio,
                    1,
                    "flac",
                    None,
                    None,
                    None,
                )],
                vec![fixtures::stream(
                    StreamKind::Video,
                    0,
                    "h264",
                    Some("High"),
                    None,
                    None,
                )],
                vec![],
            )
        })
        .collect()
}

/// Fails audio-stage invocations against the second asset only.
fn failing_audio_handler(
    program: &std::path::Path,
    args: &[String],
) -> Result<webreel_core::ToolOutput, webreel_core::ExecError> {
    let is_audio = args.iter().any(|a| a.starts_with("0:a:"));
    let is_second = args.iter().any(|a| a.contains("two.mkv"));
    if is_audio && is_second {
        return Ok(fixtures::tool_err(1, "Error while decoding stream #0:1"));
    }
    fixtures::fake_toolchain(program, args)
}

#[tokio::test]
async fn test_mid_run_failure_is_isolated_to_one_asset() {
    let env = test_env();
    for name in ["one.mkv", "two.mkv", "three.mkv"] {
        env.seed_source(name);
    }
    let runner = Arc::new(MockRunner::new(failing_audio_handler));
    let (pipeline, _, errors) = build_pipeline(&env.config, &runner);

    let progress = pipeline.run(&three_assets(&env.config)).await.unwrap();

    assert_eq!(progress.assets_processed, 2);
    assert_eq!(progress.assets_failed, 1);
    assert!(!progress.tasks[0].failed);
    assert!(progress.tasks[1].failed);
    assert!(!progress.tasks[2].failed);
    assert_eq!(progress.tasks[0].state, TaskState::Done);
    assert_eq!(progress.tasks[1].state, TaskState::Failed);
    assert_eq!(progress.tasks[2].state, TaskState::Done);
    assert!(progress.is_finished());

    // The failure was reported on the recoverable channel with the tool's
    // diagnostic line attached.
    let reports = errors.recent_recoverable();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].message.contains("two"));
    assert!(reports[0]
        .technical_details
        .contains("Error while decoding stream"));
    assert!(errors.recent_critical().is_empty());

    // Assets one and three still produced sidecars; two did not.
    assert!(env
        .config
        .paths
        .dest_root
        .join(sidecar_file_name("one"))
        .exists());
    assert!(!env
        .config
        .paths
        .dest_root
        .join(sidecar_file_name("two"))
        .exists());
    assert!(env
        .config
        .paths
        .dest_root
        .join(sidecar_file_name("three"))
        .exists());
}

#[tokio::test]
async fn test_abort_on_failure_ends_the_run_early() {
    let env = test_env();
    for name in ["one.mkv", "two.mkv", "three.mkv"] {
        env.seed_source(name);
    }
    let mut config = env.config.clone();
    config.pipeline.abort_on_failure = true;

    let runner = Arc::new(MockRunner::new(failing_audio_handler));
    let (pipeline, publisher, _) = build_pipeline(&config, &runner);

    let result = pipeline.run(&three_assets(&config)).await;
    assert!(result.is_err());

    // The published snapshot still reached a terminal state, with the third
    // asset never attempted.
    let progress = publisher.latest().unwrap();
    assert!(progress.is_finished());
    assert_eq!(progress.assets_processed, 1);
    assert_eq!(progress.assets_failed, 1);
    assert_eq!(progress.tasks.len(), 2);
}

#[tokio::test]
async fn test_relocate_processed_moves_source_out_of_scan_root() {
    let env = test_env();
    let source = env.seed_source("done.mkv");
    let mut config = env.config.clone();
    config.pipeline.relocate_processed = true;

    let runner = Arc::new(MockRunner::new(fixtures::fake_toolchain));
    let (pipeline, _, _) = build_pipeline(&config, &runner);

    let asset = fixtures::asset(
        source.clone(),
        vec![],
        vec![fixtures::stream(
            StreamKind::Video,
            0,
            "h264",
            Some("High"),
            None,
            None,
        )],
        vec![],
    );

    let progress = pipeline.run(&[asset]).await.unwrap();
    assert_eq!(progress.assets_processed, 1);

    assert!(!source.exists());
    assert!(config.paths.processed_root.join("done.mkv").exists());
}

#[tokio::test]
async fn test_progress_is_published_after_every_step() {
    let env = test_env();
    env.seed_source("clip.mkv");
    let runner = Arc::new(MockRunner::new(fixtures::fake_toolchain));
    let (pipeline, publisher, _) = build_pipeline(&env.config, &runner);

    let mut rx = publisher.subscribe();
    let asset = fixtures::asset(
        env.config.paths.source_root.join("clip.mkv"),
        vec![fixtures::stream(
            StreamKind::Audio,
            1,
            "mp3",
            None,
            None,
            None,
        )],
        vec![fixtures::stream(
            StreamKind::Video,
            0,
            "h264",
            Some("High"),
            None,
            None,
        )],
        vec![],
    );

    let progress = pipeline.run(&[asset]).await.unwrap();

    // video + audio + two segmentations + sidecar
    assert_eq!(progress.tasks[0].steps_total, 5);
    assert_eq!(progress.tasks[0].steps_done, 5);

    // The subscriber sees the terminal snapshot.
    rx.changed().await.ok();
    let seen = rx.borrow().clone().unwrap();
    assert!(seen.is_finished());
    assert_eq!(seen.audio_streams_copied, 1);
}
