//! Concurrent reloads, library refreshes and file events.
//!
//! The documentation generator is held on a channel so that requests can be
//! made while a reload is in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rfcomplete::Result;
use rfcomplete::ide::Suggestion;
use rfcomplete::project::{GenerateRequest, LoadState, MemoryFs, RawOutput, ReloadOutcome, Settings, Workspace};

struct Gate {
    started: Sender<()>,
    release: Mutex<Receiver<()>>,
    calls: AtomicUsize,
}

fn gated_workspace() -> (Arc<Workspace>, Arc<Gate>, Receiver<()>, Sender<()>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let gate = Arc::new(Gate {
        started: started_tx,
        release: Mutex::new(release_rx),
        calls: AtomicUsize::new(0),
    });

    let fs = MemoryFs::new()
        .with_file("/proj/lib.robot", "*** Keywords ***\nFoo\n")
        .with_file(
            "/proj/suite.robot",
            "*** Settings ***\nResource    lib.robot\n*** Test Cases ***\nT\n    Foo\n",
        );
    let settings = Settings::new()
        .with_libdoc_dir("/cache")
        .with_fallback_library_dir(None::<PathBuf>);

    let generator = {
        let gate = gate.clone();
        move |_: &GenerateRequest<'_>| -> Result<RawOutput> {
            gate.calls.fetch_add(1, Ordering::SeqCst);
            let _ = gate.started.send(());
            let _ = gate.release.lock().recv();
            Ok(RawOutput::failed("interpreter not found"))
        }
    };
    let workspace = Arc::new(Workspace::new(settings, fs, generator).unwrap());
    (workspace, gate, started_rx, release_tx)
}

fn displayed(suggestions: Vec<Suggestion>) -> Vec<String> {
    suggestions.into_iter().map(|s| s.display_text).collect()
}

#[test]
fn test_requests_during_a_reload_collapse_into_one_rerun() {
    let (workspace, gate, started, release) = gated_workspace();

    let first = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    started.recv().unwrap();
    assert_eq!(workspace.load_state(), LoadState::Loading);

    assert_eq!(workspace.reload(), ReloadOutcome::Scheduled);
    assert_eq!(workspace.reload(), ReloadOutcome::Scheduled);

    // One release for the running reload, one for the single re-run.
    release.send(()).unwrap();
    release.send(()).unwrap();
    assert_eq!(first.join().unwrap(), ReloadOutcome::Reloaded);

    assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
    assert_eq!(workspace.load_state(), LoadState::Loaded);
}

#[test]
fn test_queries_see_the_previous_index_during_a_reload() {
    let (workspace, _gate, started, release) = gated_workspace();
    let suite = Some(Path::new("/proj/suite.robot"));

    let first = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    started.recv().unwrap();
    // Scanning is done, but the new index is not installed yet.
    assert!(workspace.suggestions("foo", suite).is_empty());
    assert_eq!(workspace.with_index(|index| index.len()), 0);
    release.send(()).unwrap();
    first.join().unwrap();

    assert_eq!(displayed(workspace.suggestions("foo", suite)), vec!["Foo"]);
}

#[test]
fn test_sequential_reloads_each_run() {
    let (workspace, gate, _started, release) = gated_workspace();
    for _ in 0..3 {
        release.send(()).unwrap();
    }
    assert_eq!(workspace.open_project("/proj"), ReloadOutcome::Reloaded);
    assert_eq!(workspace.reload(), ReloadOutcome::Reloaded);
    assert_eq!(workspace.reload(), ReloadOutcome::Reloaded);
    assert_eq!(gate.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_edits_during_a_reload_survive_the_swap() {
    let (workspace, gate, started, release) = gated_workspace();
    let suite = Some(Path::new("/proj/suite.robot"));

    let first = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    started.recv().unwrap();
    let key = workspace.update_file(
        Path::new("/proj/lib.robot"),
        "*** Keywords ***\nFoo\nBrand New Keyword\n",
    );
    assert!(key.is_some());
    release.send(()).unwrap();
    assert_eq!(first.join().unwrap(), ReloadOutcome::Reloaded);

    assert_eq!(displayed(workspace.suggestions("brand new", suite)), vec!["Brand New Keyword"]);
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removals_during_a_reload_survive_the_swap() {
    let (workspace, _gate, started, release) = gated_workspace();
    let first = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    started.recv().unwrap();
    workspace.remove_file(Path::new("/proj/lib.robot"));
    release.send(()).unwrap();
    first.join().unwrap();

    assert!(workspace.suggestions("foo", Some(Path::new("/proj/suite.robot"))).is_empty());
    assert!(workspace.with_index(|index| index.file_by_path(Path::new("/proj/lib.robot")).is_none()));
}

#[test]
fn test_library_imported_during_a_reload_is_acquired_after_it() {
    let (workspace, gate, started, release) = gated_workspace();
    let first = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    started.recv().unwrap();
    workspace.update_file(
        Path::new("/proj/suite.robot"),
        "*** Settings ***\nResource    lib.robot\nLibrary    Extra\n*** Test Cases ***\nT\n    Foo\n",
    );
    // The reload's own run, then the follow-up refresh.
    release.send(()).unwrap();
    release.send(()).unwrap();
    first.join().unwrap();

    assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
    workspace.with_libraries(|libraries| assert!(libraries.library("Extra").is_some()));
}

#[derive(Default)]
struct InFlight {
    calls: AtomicUsize,
    current: AtomicUsize,
    max: AtomicUsize,
}

fn tracking_workspace(flight: Arc<InFlight>) -> Arc<Workspace> {
    let fs = MemoryFs::new().with_file(
        "/proj/suite.robot",
        "*** Settings ***\nLibrary    Collections\n*** Test Cases ***\nT\n    No Operation\n",
    );
    let settings = Settings::new()
        .with_libdoc_dir("/cache")
        .with_fallback_library_dir(None::<PathBuf>);
    let generator = move |_: &GenerateRequest<'_>| -> Result<RawOutput> {
        flight.calls.fetch_add(1, Ordering::SeqCst);
        let now = flight.current.fetch_add(1, Ordering::SeqCst) + 1;
        flight.max.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        flight.current.fetch_sub(1, Ordering::SeqCst);
        Ok(RawOutput::failed("interpreter not found"))
    };
    Arc::new(Workspace::new(settings, fs, generator).unwrap())
}

fn importing(n: usize) -> String {
    format!("*** Settings ***\nLibrary    Lib{n}\n*** Test Cases ***\nT{n}\n    No Operation\n")
}

#[test]
fn test_library_refreshes_run_one_at_a_time() {
    let flight = Arc::new(InFlight::default());
    let workspace = tracking_workspace(flight.clone());

    let editors: Vec<_> = (1..=3)
        .map(|n| {
            let workspace = workspace.clone();
            thread::spawn(move || workspace.update_file(Path::new(&format!("/proj/s{n}.robot")), &importing(n)))
        })
        .collect();
    for editor in editors {
        assert!(editor.join().unwrap().is_some());
    }

    assert_eq!(flight.max.load(Ordering::SeqCst), 1);
    assert!((1..=3).contains(&flight.calls.load(Ordering::SeqCst)));
    // The last run started after every edit was indexed.
    workspace.with_libraries(|libraries| {
        for name in ["Lib1", "Lib2", "Lib3"] {
            assert!(libraries.library(name).is_some(), "{name} was not acquired");
        }
    });
}

#[test]
fn test_reloads_and_refreshes_share_one_acquisition_at_a_time() {
    let flight = Arc::new(InFlight::default());
    let workspace = tracking_workspace(flight.clone());

    let reload = {
        let workspace = workspace.clone();
        thread::spawn(move || workspace.open_project("/proj"))
    };
    let editors: Vec<_> = (1..=3)
        .map(|n| {
            let workspace = workspace.clone();
            thread::spawn(move || workspace.update_file(Path::new(&format!("/buffers/s{n}.robot")), &importing(n)))
        })
        .collect();
    for editor in editors {
        editor.join().unwrap();
    }
    reload.join().unwrap();

    assert_eq!(flight.max.load(Ordering::SeqCst), 1);
    assert_eq!(workspace.load_state(), LoadState::Loaded);
}
