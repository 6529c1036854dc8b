//! Integration tests for the ownership handoff protocol, driven through the
//! recording harness: realistic navigation interleavings on the lifecycle
//! registry, a shared recording media engine, and factory-built windows.

use floatpane_core::{EdgeInsets, HostKind, HostRef, OverlayError, Size, WindowGeometry};
use floatpane_testing::{EngineCall, OverlayHarness};
use floatpane_window::{MediaHandle, OverlayWindow, ScreenMode, WindowCache, WindowObserver};
use std::cell::RefCell;
use std::rc::Rc;

const SCREEN: Size = Size {
    width: 1000.0,
    height: 2000.0,
};

const MAIN: HostKind = HostKind(1);
const DETAIL: HostKind = HostKind(2);
const SETTINGS: HostKind = HostKind(3);

struct RecordingObserver {
    errors: Rc<RefCell<Vec<String>>>,
}

impl WindowObserver for RecordingObserver {
    fn on_error(&self, error: &OverlayError) {
        self.errors.borrow_mut().push(error.to_string());
    }
}

fn observed_errors(window: &OverlayWindow) -> Rc<RefCell<Vec<String>>> {
    let errors = Rc::new(RefCell::new(Vec::new()));
    window.set_observer(Rc::new(RecordingObserver {
        errors: errors.clone(),
    }));
    errors
}

/// Harness with one shown, playing window on a MAIN host.
fn shown_window(harness: &OverlayHarness) -> (floatpane_core::HostDesc, OverlayWindow) {
    let host = harness.world.launch(MAIN);
    let built = harness.window_for(host);
    built.window.adopt_media(MediaHandle::new());
    built.window.set_playback(true);
    built.window.show();
    (host, built.window)
}

#[test]
fn forward_navigation_moves_the_window_and_the_media() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    assert!(window.is_showing());
    assert!(window.is_registered());

    let before = harness.built().len();
    harness.world.navigate(h1, DETAIL);

    // The source is hidden but keeps listening for its host's return.
    assert!(!window.is_showing());
    assert!(window.is_registered());
    assert!(window.is_handoff_pending());
    assert!(!window.owns_media());

    let shadows = harness.built_after(before);
    assert_eq!(shadows.len(), 1);
    let shadow = &shadows[0].window;
    assert!(shadow.is_showing());
    assert!(shadow.is_registered());
    assert!(shadow.owns_media());
    // Geometry traveled with the payload.
    assert_eq!(shadow.geometry(), window.geometry());
    // Playback restarted on the destination surface.
    assert_eq!(harness.engine.attached_surface(), Some(2));
    assert!(harness.engine.is_playing());
}

#[test]
fn returning_reverses_the_transfer_bit_for_bit() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.set_screen_mode(ScreenMode::Minimized);
    let geometry_before = window.geometry();
    let mode_before = window.screen_mode();

    let before = harness.built().len();
    let h2 = harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();

    harness.world.navigate_back(h2, h1);

    assert!(window.is_showing());
    assert!(window.is_registered());
    assert!(!window.is_handoff_pending());
    assert!(window.owns_media());
    assert!(window.playback_started());
    assert_eq!(window.geometry(), geometry_before);
    assert_eq!(window.screen_mode(), mode_before);

    assert!(shadow.is_terminated());
    assert!(!shadow.is_registered());
    assert!(!shadow.owns_media());

    // Back on the original surface and playing again.
    assert_eq!(harness.engine.attached_surface(), Some(1));
    assert!(harness.engine.is_playing());
}

#[test]
fn paused_playback_intent_survives_the_round_trip() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.set_playback(false);

    let h2 = harness.world.navigate(h1, DETAIL);
    harness.world.navigate_back(h2, h1);

    assert!(window.owns_media());
    assert!(!window.playback_started());
    assert!(!harness.engine.is_playing());
}

#[test]
fn intercepted_host_dismisses_the_window_without_a_shadow() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.add_intercepted(DETAIL);

    let before = harness.built().len();
    harness.world.navigate(h1, DETAIL);

    assert!(window.is_terminated());
    assert!(!window.is_showing());
    assert!(!window.is_registered());
    assert!(!window.owns_media());
    assert_eq!(harness.built().len(), before);
    assert_eq!(harness.engine.attached_surface(), None);
}

#[test]
fn blacklisted_host_keeps_the_shadow_hidden_but_registered() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.add_blacklisted(DETAIL);

    let before = harness.built().len();
    let h2 = harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();

    assert!(!shadow.is_showing());
    assert!(shadow.is_registered());
    assert!(shadow.owns_media());
    // Hidden shadow never attached the surface.
    assert_eq!(harness.engine.attached_surface(), None);

    harness.world.navigate_back(h2, h1);
    assert!(window.is_showing());
    assert!(window.owns_media());
    assert_eq!(harness.engine.attached_surface(), Some(1));
}

#[test]
fn blacklisted_own_host_leaves_the_original_dormant_after_merge() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.add_blacklisted(MAIN);

    let h2 = harness.world.navigate(h1, DETAIL);
    harness.world.navigate_back(h2, h1);

    // Merged back, but the host is blacklisted: dormant and watching.
    assert!(!window.is_showing());
    assert!(window.is_registered());
    assert!(window.owns_media());

    // The caller-driven shrink path brings it back.
    assert!(window.remove_blacklisted(MAIN));
    window.show();
    assert!(window.is_showing());
}

#[test]
fn dismissed_shadow_aborts_the_handoff() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);

    let before = harness.built().len();
    let h2 = harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();

    // The user closes the floating window on the new screen.
    shadow.dismiss();
    assert!(!shadow.is_registered());

    harness.world.navigate_back(h2, h1);

    // Aborted: the original unregisters and stays hidden until re-shown.
    assert!(!window.is_showing());
    assert!(!window.is_registered());
    assert!(!window.is_handoff_pending());
    assert!(!window.owns_media());
}

#[test]
fn failed_shadow_construction_reports_and_leaves_the_source_dismissed() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    let errors = observed_errors(&window);

    let before = harness.built().len();
    harness.fail_next_create();
    harness.world.navigate(h1, DETAIL);

    assert_eq!(harness.built().len(), before);
    assert!(!window.is_showing());
    assert!(window.is_registered());
    assert!(!window.is_handoff_pending());
    // Media never left the source.
    assert!(window.owns_media());
    assert!(errors.borrow().iter().any(|e| e.contains("resource unavailable")));

    // The caller re-shows explicitly; no retry happened on its own.
    window.show();
    assert!(window.is_showing());
}

#[test]
fn destroyed_host_defers_the_unregister_one_tick() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    let registry = harness.world.registry();
    let listeners_before = registry.listener_count();

    harness.world.pause(h1);
    harness.world.stop(h1);
    harness.world.destroy(h1);

    // Torn down synchronously, but still listening until the next tick.
    assert!(window.is_terminated());
    assert!(!window.is_showing());
    assert!(!window.owns_media());
    assert_eq!(registry.listener_count(), listeners_before);

    harness.runtime.drain();
    assert_eq!(registry.listener_count(), listeners_before - 1);
}

#[test]
fn filter_sets_only_grow_across_handoffs() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.add_blacklisted(SETTINGS);
    window.add_intercepted(HostKind(9));
    let blacklist_before = window.filters().blacklist_len();
    let intercept_before = window.filters().intercept_len();

    let before = harness.built().len();
    let h2 = harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();

    // The shadow inherited everything via union.
    assert!(shadow.filters().blacklist_len() >= blacklist_before);
    assert!(shadow.filters().intercept_len() >= intercept_before);

    // Extra entries added on the destination merge back on return.
    shadow.add_blacklisted(HostKind(7));
    harness.world.navigate_back(h2, h1);

    assert!(window.filters().hides(HostKind(7)));
    assert!(window.filters().blacklist_len() >= blacklist_before + 1);
    assert!(window.filters().intercept_len() >= intercept_before);
}

#[test]
fn out_of_order_lifecycle_terminates_the_session() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    let errors = observed_errors(&window);

    harness.world.pause(h1);
    harness.world.pause(h1);

    assert!(window.is_terminated());
    assert!(!window.is_registered());
    assert!(errors.borrow().iter().any(|e| e.contains("protocol violation")));
}

#[test]
fn second_pending_handoff_is_rejected_but_preserves_the_first() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    let errors = observed_errors(&window);

    let before = harness.built().len();
    harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();

    // A third host appears while the original's handoff is still pending.
    harness.world.create_host(SETTINGS);

    assert!(errors.borrow().iter().any(|e| e.contains("protocol violation")));
    assert!(window.is_handoff_pending());
    assert!(!window.is_terminated());
    // The in-flight chain kept working: the shadow handed itself off.
    assert!(shadow.is_handoff_pending());
}

#[test]
fn chained_handoffs_keep_exactly_one_media_owner() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);

    let owners = |windows: &[&OverlayWindow]| {
        windows.iter().filter(|w| w.owns_media()).count()
    };

    let before = harness.built().len();
    let h2 = harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();
    assert_eq!(owners(&[&window, &shadow]), 1);

    let before = harness.built().len();
    let h3 = harness.world.navigate(h2, SETTINGS);
    let shadow2 = harness.built_after(before)[0].window.clone();
    assert_eq!(owners(&[&window, &shadow, &shadow2]), 1);
    assert!(shadow2.owns_media());

    harness.world.navigate_back(h3, h2);
    assert_eq!(owners(&[&window, &shadow, &shadow2]), 1);
    assert!(shadow.owns_media());

    harness.world.navigate_back(h2, h1);
    assert_eq!(owners(&[&window, &shadow, &shadow2]), 1);
    assert!(window.owns_media());
    assert!(window.is_showing());
}

#[test]
fn transfer_pauses_and_detaches_before_reattaching() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, _window) = shown_window(&harness);
    harness.engine.clear_calls();

    harness.world.navigate(h1, DETAIL);

    let calls = harness.engine.calls();
    let detach = calls
        .iter()
        .position(|call| *call == EngineCall::DetachSurface)
        .expect("source detached its surface");
    let attach = calls
        .iter()
        .position(|call| *call == EngineCall::AttachSurface(2))
        .expect("destination attached its surface");
    // The atomic transfer step: pause, detach, then the destination attaches.
    assert!(calls[..detach].contains(&EngineCall::Pause));
    assert!(detach < attach);
}

#[test]
fn window_cache_reuses_live_sessions_per_host() {
    let harness = OverlayHarness::new(SCREEN);
    let cache = WindowCache::new();
    let host = harness.world.launch(MAIN);
    let context = harness.world.context_for(host);

    let first = cache
        .obtain(&context, |host| harness.window_for(host).window)
        .expect("host resolvable");
    let second = cache
        .obtain(&context, |_| unreachable!("must reuse the cached window"))
        .expect("host resolvable");
    first.set_geometry(WindowGeometry {
        x: 5.0,
        y: 6.0,
        width: 70.0,
        height: 80.0,
    });
    // Both handles are the same session.
    assert_eq!(second.geometry(), first.geometry());
    assert_eq!(cache.len(), 1);

    // A terminated window is replaced on the next obtain.
    first.dismiss();
    let third = cache
        .obtain(&context, |host| harness.window_for(host).window)
        .expect("host resolvable");
    assert!(!third.is_terminated());

    let error = cache
        .obtain(&HostRef::detached(), |_| unreachable!())
        .unwrap_err();
    assert!(matches!(error, OverlayError::NoAssociatedHost { .. }));
}

#[test]
fn show_without_a_resolvable_host_is_a_reported_no_op() {
    let harness = OverlayHarness::new(SCREEN);
    let host = harness.world.launch(MAIN);
    let built = harness.window_for(host);
    let errors = observed_errors(&built.window);

    harness.world.pause(host);
    harness.world.stop(host);
    harness.world.destroy(host);
    harness.runtime.drain();

    built.window.show();
    assert!(!built.window.is_showing());
    assert!(errors.borrow().iter().any(|e| e.contains("no associated host")));
}

#[test]
fn border_snapping_respects_insets_after_transfer() {
    let harness = OverlayHarness::new(SCREEN);
    let (h1, window) = shown_window(&harness);
    window.set_border(EdgeInsets {
        left: 16.0,
        top: 40.0,
        right: 16.0,
        bottom: 60.0,
    });
    window.set_geometry(WindowGeometry {
        x: 700.0,
        y: 100.0,
        width: 300.0,
        height: 200.0,
    });
    window.snap_to_border();
    let snapped = window.geometry();
    assert_eq!(snapped.x, SCREEN.width - 300.0 - 16.0);

    let before = harness.built().len();
    harness.world.navigate(h1, DETAIL);
    let shadow = harness.built_after(before)[0].window.clone();
    assert_eq!(shadow.geometry(), snapped);
}
