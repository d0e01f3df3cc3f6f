//! End-to-end behaviour of the radar widget against scripted collaborators.

mod common;

use std::time::Duration;

use common::{displayed, pump, widget, MapOp, ScriptedBackend, BOUNDS, BRISBANE, SYDNEY};
use radar_loop::{
    GeoPoint, RadarConfig, RadarProduct, Viewport, VisibilitySignal, WidgetEvent, WidgetHandle,
};

#[tokio::test]
async fn test_index_cycles_through_short_frame_set() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frame_index(), 0);
    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert!(w.is_animating());

    let mut seen = Vec::new();
    for _ in 0..7 {
        w.handle(WidgetEvent::Tick);
        pump(&mut w, &mut rx).await;
        seen.push(w.frame_index());
        assert_eq!(displayed(&w).as_deref(), w.frames().get(w.frame_index()));
    }
    assert_eq!(seen, vec![1, 2, 0, 1, 2, 0, 1]);
    assert_eq!(backend.timestamp_call_count(), 1);
}

#[tokio::test]
async fn test_overlay_never_blank_during_swaps() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3", "t4"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    for _ in 0..6 {
        w.handle(WidgetEvent::Tick);
        pump(&mut w, &mut rx).await;
    }

    let counts = w.map().overlay_counts();
    assert_eq!(counts.first(), Some(&1));
    assert!(counts.iter().all(|&count| count >= 1), "blank frame in {counts:?}");
    assert!(counts.iter().all(|&count| count <= 2));
    assert_eq!(w.map().attached.len(), 1);

    // Every detach follows the attach of its replacement.
    let ops = &w.map().ops;
    for (i, op) in ops.iter().enumerate() {
        if let MapOp::Detach(_) = op {
            assert!(matches!(ops[i - 1], MapOp::Attach(..)));
        }
    }
}

#[tokio::test]
async fn test_frame_set_keeps_most_recent_frames() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frames().as_slice(), &["t4", "t5", "t6", "t7", "t8"]);
    assert_eq!(displayed(&w).as_deref(), Some("t4"));
}

#[tokio::test]
async fn test_superseded_timestamp_fetch_is_discarded() {
    let backend = ScriptedBackend::with_frames(&[]);
    backend.set_frames_at(SYDNEY, &["old1", "old2"]);
    backend.set_frames_at(BRISBANE, &["new1", "new2", "new3"]);
    backend.gate_timestamps(SYDNEY);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert!(w.frames().is_empty());

    w.map_mut().center = BRISBANE;
    w.handle(WidgetEvent::Pan);
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frames().as_slice(), &["new1", "new2", "new3"]);
    assert_eq!(displayed(&w).as_deref(), Some("new1"));

    backend.release_timestamps(SYDNEY);
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frames().as_slice(), &["new1", "new2", "new3"]);
    assert_eq!(w.frame_index(), 0);
    assert_eq!(displayed(&w).as_deref(), Some("new1"));
    assert_eq!(w.map().attach_count(), 1);
    assert_eq!(backend.timestamp_call_count(), 2);
}

#[tokio::test]
async fn test_superseded_overlay_does_not_clobber_newer_frame() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    backend.gate_image("t1");
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w), None);

    w.handle(WidgetEvent::NextFrame);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t2"));

    backend.release_image("t1");
    pump(&mut w, &mut rx).await;

    assert_eq!(displayed(&w).as_deref(), Some("t2"));
    assert_eq!(w.map().attach_count(), 1);
}

#[tokio::test]
async fn test_hidden_widget_freezes_on_last_frame() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    w.handle(WidgetEvent::Tick);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t2"));

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(false)));
    assert!(!w.is_animating());

    let calls = backend.image_call_count();
    for _ in 0..3 {
        w.handle(WidgetEvent::Tick);
        pump(&mut w, &mut rx).await;
    }
    assert_eq!(w.frame_index(), 1);
    assert_eq!(backend.image_call_count(), calls);
    assert_eq!(displayed(&w).as_deref(), Some("t2"));
    assert_eq!(w.map().attached.len(), 1);

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(true)));
    assert!(w.is_animating());
}

#[tokio::test]
async fn test_background_tab_pauses_animation() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Foreground(false)));
    assert!(!w.is_animating());
    assert!(!w.status().visible);

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Foreground(true)));
    assert!(w.is_animating());
}

#[tokio::test]
async fn test_missing_bounds_keeps_previous_overlay() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    backend.drop_bounds_for("t2");
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    w.handle(WidgetEvent::Tick);
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frame_index(), 1);
    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert_eq!(w.map().attach_count(), 1);
    assert!(w.status().last_error.is_some());
}

#[tokio::test]
async fn test_overlay_uses_service_bounds() {
    let backend = ScriptedBackend::with_frames(&["t1"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    let overlay = w.live_overlay().unwrap();
    assert_eq!(overlay.bounds, BOUNDS);
    assert_eq!(overlay.viewport.center, SYDNEY);
    assert!((overlay.opacity - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_timestamp_failure_clears_frames_but_keeps_overlay() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t1"));

    backend.fail_timestamps(Some(503));
    w.handle(WidgetEvent::UserRefresh);
    pump(&mut w, &mut rx).await;

    assert!(w.frames().is_empty());
    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert!(!w.is_animating());
    assert!(w.status().last_error.unwrap().contains("503"));

    let calls = backend.image_call_count();
    w.handle(WidgetEvent::Tick);
    w.handle(WidgetEvent::NextFrame);
    pump(&mut w, &mut rx).await;
    assert_eq!(backend.image_call_count(), calls);
}

#[tokio::test]
async fn test_empty_frame_set_makes_no_image_request() {
    let backend = ScriptedBackend::with_frames(&[]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    assert!(w.frames().is_empty());
    assert_eq!(backend.image_call_count(), 0);
    assert!(!w.is_animating());
    assert_eq!(displayed(&w), None);
}

#[tokio::test]
async fn test_short_pan_reuses_frames_and_zoom_refetches() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    // Roughly 1.1 km north.
    w.map_mut().center = GeoPoint::new(SYDNEY.lat + 0.01, SYDNEY.lon);
    w.handle(WidgetEvent::Pan);
    pump(&mut w, &mut rx).await;
    assert_eq!(backend.timestamp_call_count(), 1);
    assert_eq!(w.locked_viewport().unwrap().center, SYDNEY);

    w.map_mut().zoom = 6;
    w.handle(WidgetEvent::Zoom);
    pump(&mut w, &mut rx).await;

    let calls = backend.timestamp_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, RadarProduct::RegionalRadar);
    assert_eq!(calls[1].0.zoom, 6);
    assert_eq!(calls[1].1, RadarProduct::Radar);
}

#[tokio::test]
async fn test_frames_stay_paired_with_their_viewport_during_refetch() {
    let backend = ScriptedBackend::with_frames(&[]);
    backend.set_frames_at(SYDNEY, &["syd1", "syd2", "syd3"]);
    backend.set_frames_at(BRISBANE, &["bne1", "bne2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("syd1"));

    // Zoom out over Brisbane while its frame list is slow to arrive.
    backend.gate_timestamps(BRISBANE);
    w.map_mut().center = BRISBANE;
    w.map_mut().zoom = 5;
    w.handle(WidgetEvent::Zoom);
    w.handle(WidgetEvent::Tick);
    pump(&mut w, &mut rx).await;

    let live = w.live_overlay().unwrap();
    assert_eq!(live.timestamp, "syd2");
    assert_eq!(live.viewport, Viewport::new(SYDNEY, 10));

    backend.release_timestamps(BRISBANE);
    pump(&mut w, &mut rx).await;

    let live = w.live_overlay().unwrap();
    assert_eq!(live.timestamp, "bne1");
    assert_eq!(live.viewport, Viewport::new(BRISBANE, 5));
    let calls = backend.timestamp_calls.lock().unwrap().clone();
    assert_eq!(calls[1].1, RadarProduct::Radar);
}

#[tokio::test]
async fn test_opacity_change_restyles_live_overlay() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    w.handle(WidgetEvent::TogglePlay);
    let image_calls = backend.image_call_count();

    w.handle(WidgetEvent::ConfigChanged(RadarConfig { opacity: 0.3, ..Default::default() }));
    pump(&mut w, &mut rx).await;

    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert!((w.live_overlay().unwrap().opacity - 0.3).abs() < f32::EPSILON);
    assert_eq!(w.map().attached.len(), 1);
    assert!((w.map().attached[0].1.opacity - 0.3).abs() < f32::EPSILON);
    assert_eq!(backend.image_call_count(), image_calls);
    assert_eq!(backend.timestamp_call_count(), 1);
    assert!(!w.is_animating());
}

#[tokio::test]
async fn test_toggle_play_overrides_visibility_resume() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    w.handle(WidgetEvent::TogglePlay);
    assert!(!w.is_animating());
    assert!(!w.status().playing);

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(false)));
    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(true)));
    assert!(!w.is_animating());

    w.handle(WidgetEvent::TogglePlay);
    assert!(w.is_animating());
}

#[tokio::test]
async fn test_manual_frame_steps() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    let config = RadarConfig { autoplay: false, ..Default::default() };
    let (mut w, mut rx) = widget(&backend, config);

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert!(!w.is_animating());

    w.handle(WidgetEvent::PreviousFrame);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t3"));

    w.handle(WidgetEvent::NextFrame);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t1"));
}

#[tokio::test]
async fn test_home_moved_recenters_and_refetches() {
    let backend = ScriptedBackend::with_frames(&["t1"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    w.handle(WidgetEvent::HomeMoved(BRISBANE));
    pump(&mut w, &mut rx).await;

    assert!(w.map().ops.contains(&MapOp::SetView(BRISBANE, 10)));
    assert_eq!(w.locked_viewport().unwrap().center, BRISBANE);
    assert_eq!(backend.timestamp_call_count(), 2);
}

#[tokio::test]
async fn test_home_moved_ignored_with_explicit_center() {
    let backend = ScriptedBackend::with_frames(&["t1"]);
    let config = RadarConfig {
        latitude: Some(SYDNEY.lat),
        longitude: Some(SYDNEY.lon),
        ..Default::default()
    };
    let (mut w, mut rx) = widget(&backend, config);

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    w.handle(WidgetEvent::HomeMoved(BRISBANE));
    pump(&mut w, &mut rx).await;

    assert_eq!(w.map().center, SYDNEY);
    assert_eq!(backend.timestamp_call_count(), 1);
}

#[tokio::test]
async fn test_config_change_refetches_with_new_frame_count() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3", "t4", "t5"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert_eq!(w.frames().len(), 5);

    let config = RadarConfig { frame_count: 2, animation_interval_ms: 1500, ..Default::default() };
    w.handle(WidgetEvent::ConfigChanged(config));
    pump(&mut w, &mut rx).await;

    assert_eq!(w.frames().as_slice(), &["t4", "t5"]);
    assert_eq!(w.config().animation_interval(), Duration::from_millis(1500));
    assert_eq!(backend.timestamp_call_count(), 2);
}

#[tokio::test]
async fn test_invalid_config_change_is_ignored() {
    let backend = ScriptedBackend::with_frames(&["t1"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    w.handle(WidgetEvent::ConfigChanged(RadarConfig { frame_count: 0, ..Default::default() }));
    assert_eq!(w.config().frame_count, 5);
    assert!(w.status().last_error.is_some());
}

#[tokio::test]
async fn test_attach_failure_keeps_previous_overlay() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    w.map_mut().fail_attach = true;
    w.handle(WidgetEvent::NextFrame);
    pump(&mut w, &mut rx).await;

    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert_eq!(w.map().attached.len(), 1);
    assert!(w.status().last_error.is_some());
}

#[tokio::test]
async fn test_dispose_releases_everything() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let (mut w, mut rx) = widget(&backend, RadarConfig::default());

    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;

    backend.gate_image("t2");
    w.handle(WidgetEvent::NextFrame);
    w.handle(WidgetEvent::Dispose);

    assert!(w.is_disposed());
    assert!(!w.is_animating());
    assert!(w.map().removed);
    assert!(w.map().attached.is_empty());
    assert_eq!(w.map().ops.last(), Some(&MapOp::Remove));

    backend.release_image("t2");
    w.handle(WidgetEvent::Tick);
    w.handle(WidgetEvent::UserRefresh);
    pump(&mut w, &mut rx).await;

    assert_eq!(displayed(&w), None);
    assert_eq!(backend.timestamp_call_count(), 1);
    assert!(w.status().disposed);
}

#[tokio::test(start_paused = true)]
async fn test_driver_animates_on_timer() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    let (w, rx) = widget(&backend, RadarConfig::default());
    let handle = WidgetHandle::spawn(w, rx);
    let mut status = handle.subscribe();

    // Settle delay (100 ms) then the first animation tick 800 ms later.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let first = handle.status();
    assert_eq!(first.frames.len(), 3);
    assert_eq!(first.index, 0);
    assert_eq!(first.displayed.as_deref(), Some("t1"));
    assert!(first.animating);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(handle.status().index, 1);
    assert_eq!(handle.status().displayed.as_deref(), Some("t2"));

    handle.send(WidgetEvent::Visibility(VisibilitySignal::Viewport(false)));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.status().index, 1);
    assert!(!handle.status().animating);

    handle.dispose();
    let disposed = status.wait_for(|s| s.disposed).await.unwrap();
    assert!(!disposed.animating);
}

#[tokio::test(start_paused = true)]
async fn test_driver_refreshes_only_while_visible() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2", "t3"]);
    let config = RadarConfig { refresh_interval_secs: 10, ..Default::default() };
    let (w, rx) = widget(&backend, config);
    let handle = WidgetHandle::spawn(w, rx);

    // Load after the settle delay, first refresh 10 s later.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.timestamp_call_count(), 1);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(backend.timestamp_call_count(), 2);

    handle.send(WidgetEvent::Visibility(VisibilitySignal::Foreground(false)));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.timestamp_call_count(), 2);

    // Becoming visible restarts the timer without an immediate fetch.
    handle.send(WidgetEvent::Visibility(VisibilitySignal::Foreground(true)));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.timestamp_call_count(), 2);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(backend.timestamp_call_count(), 3);

    handle.dispose();
}

#[tokio::test(start_paused = true)]
async fn test_load_while_hidden_starts_no_timers() {
    let backend = ScriptedBackend::with_frames(&["t1", "t2"]);
    let config = RadarConfig { refresh_interval_secs: 10, ..Default::default() };
    let (mut w, mut rx) = widget(&backend, config);

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(false)));
    w.handle(WidgetEvent::Load);
    pump(&mut w, &mut rx).await;
    assert_eq!(displayed(&w).as_deref(), Some("t1"));
    assert!(!w.is_animating());

    let idle = tokio::time::timeout(Duration::from_secs(60), w.next_timer_event()).await;
    assert!(idle.is_err());
    assert_eq!(backend.timestamp_call_count(), 1);

    w.handle(WidgetEvent::Visibility(VisibilitySignal::Viewport(true)));
    let event = tokio::time::timeout(Duration::from_secs(60), w.next_timer_event()).await;
    assert!(matches!(event, Ok(WidgetEvent::Tick)));
}
