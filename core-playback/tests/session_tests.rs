//! Tests for the playback session actor
//!
//! Sessions run against a scripted media engine on a paused tokio clock,
//! so retry delays elapse only when the test sleeps.

mod common;

use bridge_traits::EngineKind;
use common::{settle, CollectingSink, CreatedEngine, Harness};
use core_playback::{
    DecoderPreference, EngineState, FaultCode, PlaybackError, PlaybackFault, SessionHandle, SessionOptions,
    SessionPhase, SourceRequest, VideoFormat,
};
use core_runtime::events::{EventStream, ServiceEvent, SessionEvent, PLAYBACK_ERROR_CODE};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const MOVIE: &str = "https://cdn.example.com/movie.mp4";
const VOD_HLS: &str = "https://cdn.example.com/vod/master.m3u8";
const LIVE_HLS: &str = "https://cdn.example.com/live/channel.m3u8";

async fn start(harness: &Harness, request: SourceRequest) -> (SessionHandle, CreatedEngine) {
    let session = harness.spawn();
    let engine = harness.factory.last();
    session.set_source(request).await.unwrap();
    (session, engine)
}

fn fault(code: FaultCode) -> PlaybackFault {
    PlaybackFault::new(code)
}

fn session_events(stream: &mut EventStream) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        if let ServiceEvent::Session(event) = event {
            events.push(event);
        }
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_initialized_on_first_ready_with_display_size() {
    let harness = Harness::new();
    let session = harness.spawn();
    let engine = harness.factory.last();
    {
        let mut record = engine.record.lock();
        record.duration_ms = 10_000;
        record.video_format = Some(VideoFormat {
            width: 1920,
            height: 1080,
            rotation_degrees: 90,
        });
    }

    session
        .set_source(SourceRequest::new(MOVIE).with_key("movie-1"))
        .await
        .unwrap();
    engine.listener.on_state_changed(EngineState::Buffering);
    engine.listener.on_state_changed(EngineState::Ready);
    engine.listener.on_state_changed(EngineState::Ready);
    settle().await;

    // Nothing is lost before the host attaches.
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());
    assert_eq!(
        sink.names(),
        vec![
            "bufferingUpdate",
            "bufferingStart",
            "initialized",
            "bufferingEnd",
            "bufferingEnd"
        ]
    );

    let initialized = sink.last("initialized").unwrap();
    assert_eq!(initialized.get("key"), Some(&json!("movie-1")));
    assert_eq!(initialized.get("duration"), Some(&json!(10_000)));
    assert_eq!(initialized.get("width"), Some(&json!(1080)));
    assert_eq!(initialized.get("height"), Some(&json!(1920)));

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 1);
    assert_eq!(record.prepares, 1);
    assert!(record.ranker.is_some());
    assert_eq!(
        record.last_pipeline().unwrap().engine,
        Some(EngineKind::Standard)
    );
    drop(record);

    assert_eq!(session.phase().await, SessionPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_new_source_reports_initialized_again() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE).with_key("a")).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    engine.listener.on_state_changed(EngineState::Ready);
    settle().await;
    session
        .set_source(SourceRequest::new(VOD_HLS).with_key("b"))
        .await
        .unwrap();
    engine.listener.on_state_changed(EngineState::Ready);
    settle().await;

    assert_eq!(sink.count("initialized"), 2);
    assert_eq!(
        sink.last("initialized").unwrap().get("key"),
        Some(&json!("b"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_completed_carries_source_key() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE).with_key("ep-7")).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    engine.listener.on_state_changed(EngineState::Ended);
    settle().await;

    assert_eq!(
        sink.last("completed").unwrap().get("key"),
        Some(&json!("ep-7"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_network_fault_retries_after_delay_and_resumes() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    session.play();
    settle().await;

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;
    assert_eq!(session.phase().await, SessionPhase::Retrying);
    assert_eq!(engine.record.lock().pipelines.len(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(engine.record.lock().pipelines.len(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let record = engine.record.lock();
        assert_eq!(record.pipelines.len(), 2);
        assert_eq!(record.prepares, 2);
        assert_eq!(record.plays, 2);
        assert!(record.playing);
    }
    assert_eq!(session.phase().await, SessionPhase::Buffering);
}

#[tokio::test(start_paused = true)]
async fn test_paused_session_is_not_resumed_by_retry() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionTimeout));
    tokio::time::sleep(Duration::from_millis(600)).await;

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 2);
    assert_eq!(record.plays, 0);
    drop(record);
    drop(session);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_after_retries_exhausted() {
    let harness = Harness::new();
    let mut bus = EventStream::new(harness.events.subscribe());
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    for _ in 0..2 {
        engine
            .listener
            .on_fault(fault(FaultCode::ConnectionTimeout));
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    assert_eq!(sink.count("error"), 0);
    assert_eq!(engine.record.lock().pipelines.len(), 3);

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionTimeout));
    settle().await;

    let error = sink.last("error").unwrap();
    assert_eq!(error.get("code"), Some(&json!(PLAYBACK_ERROR_CODE)));
    assert!(error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap()
        .contains("io_network_connection_timeout"));
    assert_eq!(session.phase().await, SessionPhase::Fatal);

    // Further faults stay silent.
    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionTimeout));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sink.count("error"), 1);
    assert_eq!(engine.record.lock().pipelines.len(), 3);

    assert!(session_events(&mut bus)
        .iter()
        .any(|event| matches!(event, SessionEvent::Failed { code, .. } if code == PLAYBACK_ERROR_CODE)));
}

#[tokio::test(start_paused = true)]
async fn test_ready_resets_retry_budget() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    for _ in 0..5 {
        engine
            .listener
            .on_fault(fault(FaultCode::ConnectionFailed));
        tokio::time::sleep(Duration::from_millis(600)).await;
        engine.listener.on_state_changed(EngineState::Ready);
        settle().await;
    }

    assert_eq!(sink.count("error"), 0);
    assert_eq!(engine.record.lock().pipelines.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_faults_during_pending_retry_are_coalesced() {
    let harness = Harness::new();
    let (_session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;

    for _ in 0..3 {
        engine
            .listener
            .on_fault(fault(FaultCode::ConnectionFailed));
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(engine.record.lock().pipelines.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_network_format_fault_is_fatal_immediately() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    engine
        .listener
        .on_fault(fault(FaultCode::ParsingContainerUnsupported));
    settle().await;

    let message = sink.last("error").unwrap().get("message").cloned().unwrap();
    assert!(message.as_str().unwrap().starts_with("format error"));
    assert_eq!(engine.record.lock().pipelines.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_decoder_fault_is_left_to_engine() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());
    engine.listener.on_state_changed(EngineState::Ready);
    settle().await;

    engine.listener.on_fault(fault(FaultCode::DecoderInitFailed));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(sink.count("error"), 0);
    assert_eq!(engine.record.lock().pipelines.len(), 1);
    assert_eq!(session.phase().await, SessionPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_behind_live_window_seeks_to_live_edge() {
    let harness = Harness::new();
    let (_session, engine) = start(&harness, SourceRequest::new(LIVE_HLS)).await;

    engine.listener.on_fault(fault(FaultCode::BehindLiveWindow));
    settle().await;

    let record = engine.record.lock();
    assert_eq!(record.default_position_seeks, 1);
    assert_eq!(record.prepares, 2);
    assert_eq!(record.pipelines.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_retry_resumes_even_when_paused() {
    let harness = Harness::new();
    let (_session, engine) = start(&harness, SourceRequest::new(LIVE_HLS)).await;

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    tokio::time::sleep(Duration::from_millis(600)).await;

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 2);
    assert_eq!(record.plays, 1);
}

#[tokio::test(start_paused = true)]
async fn test_set_source_cancels_pending_retry() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;
    session
        .set_source(SourceRequest::new("https://cdn.example.com/next.mp4"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 2);
    assert_eq!(
        record.last_pipeline().unwrap().descriptor.uri.as_str(),
        "https://cdn.example.com/next.mp4"
    );
    drop(record);
    assert_eq!(session.phase().await, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_source_still_cancels_pending_retry() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    session.play();
    settle().await;

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;
    assert_eq!(session.phase().await, SessionPhase::Retrying);

    let err = session
        .set_source(SourceRequest::new(MOVIE).with_format_hint("flv"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::UnsupportedMediaType(_)));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(engine.record.lock().pipelines.len(), 1);
    assert_eq!(session.phase().await, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_decoder_ranker_kept_across_sources() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let first = engine.record.lock().ranker.clone().unwrap();

    session
        .set_source(SourceRequest::new(VOD_HLS).with_decoder_preference(DecoderPreference::HardwareFirst))
        .await
        .unwrap();
    let second = engine.record.lock().ranker.clone().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    session
        .set_source(SourceRequest::new(MOVIE).with_decoder_preference(DecoderPreference::SoftwareFirst))
        .await
        .unwrap();
    let third = engine.record.lock().ranker.clone().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.preference(), DecoderPreference::SoftwareFirst);
}

#[tokio::test(start_paused = true)]
async fn test_high_performance_engine_for_hls_only() {
    let harness = Harness::new();
    let (_vod, engine) = start(&harness, SourceRequest::new(VOD_HLS)).await;
    assert_eq!(
        engine.record.lock().last_pipeline().unwrap().engine,
        Some(EngineKind::HighPerformance)
    );

    let (_movie, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    assert_eq!(
        engine.record.lock().last_pipeline().unwrap().engine,
        Some(EngineKind::Standard)
    );

    assert_eq!(harness.builder.builds(), 1);
    assert_eq!(harness.registry.lease_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_high_performance_engine_optional_for_all_http() {
    let harness = Harness::new();
    let mut options = SessionOptions::default();
    options.network.high_performance_for_all_http = true;
    let session = harness.spawn_with(options);
    let engine = harness.factory.last();

    session.set_source(SourceRequest::new(MOVIE)).await.unwrap();
    assert_eq!(
        engine.record.lock().last_pipeline().unwrap().engine,
        Some(EngineKind::HighPerformance)
    );
}

#[tokio::test(start_paused = true)]
async fn test_engine_shared_across_sessions_and_shut_down_with_last() {
    let harness = Harness::new();
    let (first, _) = start(&harness, SourceRequest::new(VOD_HLS)).await;
    let (second, _) = start(&harness, SourceRequest::new(LIVE_HLS)).await;

    assert_eq!(harness.builder.builds(), 1);
    assert_eq!(harness.registry.lease_count(), 2);

    first.dispose().await;
    assert!(harness.registry.is_running());
    second.dispose().await;
    assert_eq!(harness.registry.lease_count(), 0);
    assert!(harness.builder.engine().unwrap().is_shut_down());
}

#[tokio::test(start_paused = true)]
async fn test_downgrade_after_retries_on_high_performance_engine() {
    let harness = Harness::new();
    let mut bus = EventStream::new(harness.events.subscribe());
    let (session, engine) = start(&harness, SourceRequest::new(VOD_HLS)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());
    session.play();
    settle().await;

    for _ in 0..2 {
        engine
            .listener
            .on_fault(fault(FaultCode::ConnectionFailed));
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 4);
    assert_eq!(
        record.last_pipeline().unwrap().engine,
        Some(EngineKind::Standard)
    );
    assert!(record.playing);
    drop(record);

    assert_eq!(sink.count("error"), 0);
    assert_eq!(harness.registry.lease_count(), 0);
    assert!(session_events(&mut bus)
        .iter()
        .any(|event| matches!(event, SessionEvent::EngineDowngraded { .. })));

    // The session stays on the standard engine for later sources.
    session.set_source(SourceRequest::new(VOD_HLS)).await.unwrap();
    assert_eq!(
        engine.record.lock().last_pipeline().unwrap().engine,
        Some(EngineKind::Standard)
    );
}

#[tokio::test(start_paused = true)]
async fn test_live_downgrade_resumes_playback() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(LIVE_HLS)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());
    session.play();
    settle().await;

    for _ in 0..2 {
        engine
            .listener
            .on_fault(fault(FaultCode::ConnectionFailed));
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 4);
    assert_eq!(
        record.last_pipeline().unwrap().engine,
        Some(EngineKind::Standard)
    );
    assert!(record.playing);
    drop(record);
    assert_eq!(sink.count("error"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_format_fault_on_high_performance_engine_is_surfaced() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(VOD_HLS)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());
    session.play();
    settle().await;

    for _ in 0..2 {
        engine
            .listener
            .on_fault(fault(FaultCode::ParsingManifestMalformed));
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
    engine
        .listener
        .on_fault(fault(FaultCode::ParsingManifestMalformed));
    settle().await;

    assert_eq!(sink.count("error"), 1);
    let message = sink.last("error").unwrap().get("message").cloned().unwrap();
    assert!(message.as_str().unwrap().starts_with("format error"));
    assert_eq!(session.phase().await, SessionPhase::Fatal);

    let record = engine.record.lock();
    assert_eq!(record.pipelines.len(), 3);
    assert_eq!(
        record.last_pipeline().unwrap().engine,
        Some(EngineKind::HighPerformance)
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_source_returns_error_without_event() {
    let harness = Harness::new();
    let session = harness.spawn();
    let engine = harness.factory.last();
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    let err = session.set_source(SourceRequest::new("")).await.unwrap_err();
    assert!(err.is_configuration_error(), "unexpected error {:?}", err);

    let err = session
        .set_source(SourceRequest::new(MOVIE).with_format_hint("flv"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::UnsupportedMediaType(_)));

    let err = session
        .set_source(SourceRequest::new("rtmp://live.example.com/app").with_format_hint("hls"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::UnsupportedMediaType(_)));

    settle().await;
    assert!(sink.names().is_empty());
    assert!(engine.record.lock().pipelines.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cache_layer_only_for_http_sources() {
    let harness = Harness::new();
    let (_http, engine) =
        start(&harness, SourceRequest::new(MOVIE).with_cache(1_000_000, 100_000)).await;
    assert!(engine.record.lock().last_pipeline().unwrap().is_cached());
    assert!(harness.context.cache.get().is_some());

    let (_rtmp, engine) = start(
        &harness,
        SourceRequest::new("rtmp://live.example.com/app/stream").with_cache(1_000_000, 100_000),
    )
    .await;
    let pipeline = engine.record.lock().last_pipeline().unwrap();
    assert!(!pipeline.is_cached());
    assert_eq!(pipeline.engine, None);
}

#[tokio::test(start_paused = true)]
async fn test_playback_controls_reach_engine() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;

    session.set_volume(3.0);
    settle().await;
    assert_eq!(engine.record.lock().volume, Some(1.0));
    session.set_volume(-0.5);
    settle().await;
    assert_eq!(engine.record.lock().volume, Some(0.0));
    session.set_volume(f64::NAN);
    settle().await;
    assert_eq!(engine.record.lock().volume, Some(0.0));

    session.set_speed(1.5);
    session.set_speed(0.0);
    session.set_speed(f64::INFINITY);
    session.set_looping(true);
    session.set_track_constraints(1280, 720, 0);
    session.set_audio_track("de");
    session.seek(42_000);
    session.pause();
    settle().await;

    let record = engine.record.lock();
    assert_eq!(record.speed, Some(1.5));
    assert_eq!(record.repeat, Some(true));
    let constraints = record.constraints.unwrap();
    assert_eq!(constraints.max_video_size, Some((1280, 720)));
    assert_eq!(constraints.max_bitrate, None);
    assert_eq!(record.language.as_deref(), Some("de"));
    assert_eq!(record.seeks, vec![42_000]);
    assert_eq!(record.pauses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_absolute_position_adds_window_start() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(LIVE_HLS)).await;
    engine.record.lock().position_ms = 5_000;

    assert_eq!(session.position().await, 5_000);
    assert_eq!(session.absolute_position().await, 5_000);

    engine.record.lock().window_start_ms = Some(1_700_000_000_000);
    assert_eq!(session.absolute_position().await, 1_700_000_005_000);
}

#[tokio::test(start_paused = true)]
async fn test_buffering_updates_are_throttled() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    engine.listener.on_buffered_position_changed(1_000);
    engine.listener.on_buffered_position_changed(1_000);
    settle().await;
    assert_eq!(sink.count("bufferingUpdate"), 1);

    engine.listener.on_buffered_position_changed(2_000);
    engine.listener.on_buffered_position_changed(2_000);
    settle().await;
    assert_eq!(sink.count("bufferingUpdate"), 2);

    harness.clock.advance(Duration::from_millis(600));
    engine.listener.on_buffered_position_changed(2_000);
    settle().await;
    assert_eq!(sink.count("bufferingUpdate"), 3);

    // Entering buffering always reports, even without movement.
    engine.record.lock().buffered_ms = 2_000;
    engine.listener.on_state_changed(EngineState::Buffering);
    settle().await;
    assert_eq!(sink.count("bufferingUpdate"), 4);
    assert_eq!(
        sink.last("bufferingUpdate").unwrap().get("values"),
        Some(&json!([[0, 2_000]]))
    );
}

#[tokio::test(start_paused = true)]
async fn test_detached_observer_gets_backlog_on_reattach() {
    let harness = Harness::new();
    let (session, engine) = start(&harness, SourceRequest::new(MOVIE)).await;
    let first = CollectingSink::new();
    session.attach_events(first.clone());
    session.detach_events();

    engine.listener.on_state_changed(EngineState::Ended);
    settle().await;
    assert!(first.names().is_empty());

    let second = CollectingSink::new();
    session.attach_events(second.clone());
    assert_eq!(second.names(), vec!["completed"]);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_is_idempotent_and_final() {
    let harness = Harness::new();
    let mut bus = EventStream::new(harness.events.subscribe());
    let (session, engine) = start(&harness, SourceRequest::new(VOD_HLS)).await;
    let sink = CollectingSink::new();
    session.attach_events(sink.clone());

    engine
        .listener
        .on_fault(fault(FaultCode::ConnectionFailed));
    settle().await;

    session.dispose().await;
    session.dispose().await;
    assert!(session.is_disposed());
    assert!(sink.ended());

    {
        let record = engine.record.lock();
        assert!(record.released);
        assert!(record.stops >= 1);
    }
    assert_eq!(harness.registry.lease_count(), 0);

    // The pending retry never fires and late engine reports are dropped.
    engine.listener.on_state_changed(EngineState::Ready);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(engine.record.lock().pipelines.len(), 1);
    assert!(sink.names().is_empty());

    assert!(matches!(
        session.set_source(SourceRequest::new(MOVIE)).await,
        Err(PlaybackError::Disposed)
    ));
    session.play();
    assert_eq!(session.position().await, 0);

    let disposed = session_events(&mut bus)
        .into_iter()
        .filter(|event| matches!(event, SessionEvent::Disposed { .. }))
        .count();
    assert_eq!(disposed, 1);
}
