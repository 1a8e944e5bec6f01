use label_logic::{Boundary, LabelError, RecordStore, SNAPSHOT_FILE, Session};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    images: Vec<PathBuf>,
    destination: PathBuf,
}

fn fixture(names: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::create_dir(&input).unwrap();

    let images = names
        .iter()
        .map(|name| {
            let path = input.join(name);
            fs::write(&path, format!("pixels of {name}")).unwrap();
            path
        })
        .collect();

    Fixture {
        destination: dir.path().join("sorted"),
        images,
        _dir: dir,
    }
}

fn labels() -> Vec<String> {
    vec!["cat".to_string(), "dog".to_string()]
}

fn session(f: &Fixture) -> Session {
    let store = RecordStore::initialize(f.images.iter().cloned());
    Session::new(store, labels(), &f.destination).unwrap()
}

fn read_snapshot(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_vote_scenario() {
    let f = fixture(&["a.jpg", "b.jpg", "c.jpg"]);
    let mut session = session(&f);

    let vote = session.vote("cat").unwrap();
    assert_eq!(vote.position, 0);
    assert_eq!(vote.boundary, None);
    assert_eq!(session.position(), 1);

    // Copy is in place
    let copied = f.destination.join("cat").join("a.jpg");
    assert_eq!(vote.copied_to, copied);
    assert_eq!(fs::read_to_string(&copied).unwrap(), "pixels of a.jpg");
    // Original untouched
    assert!(f.images[0].is_file());

    // Snapshot written before vote returned
    let snapshot = read_snapshot(&f.destination.join(SNAPSHOT_FILE));
    let path = |i: usize| f.images[i].to_str().unwrap().to_string();
    assert_eq!(
        snapshot,
        json!({
            "0": { "path": path(0), "label": "cat" },
            "1": { "path": path(1), "label": null },
            "2": { "path": path(2), "label": null },
        })
    );
    assert_eq!(session.store().get(0).unwrap().label.as_deref(), Some("cat"));
}

#[test]
fn test_next_at_last_does_nothing_on_disk() {
    let f = fixture(&["a.jpg", "b.jpg", "c.jpg"]);
    let mut session = session(&f);

    session.seek(2).unwrap();
    let boundary = session.next();
    assert_eq!(boundary, Some(Boundary::PastLast));
    assert_eq!(boundary.unwrap().message(), "cannot go past last image");
    assert_eq!(session.position(), 2);
    assert!(!f.destination.exists());
}

#[test]
fn test_vote_on_last_stays_and_reports() {
    let f = fixture(&["a.jpg", "b.jpg"]);
    let mut session = session(&f);

    session.vote("dog").unwrap();
    let vote = session.vote("cat").unwrap();
    assert_eq!(vote.position, 1);
    assert_eq!(vote.boundary, Some(Boundary::PastLast));
    assert_eq!(session.position(), 1);

    // Changing a vote copies again under the new label
    session.vote("dog").unwrap();
    assert!(f.destination.join("cat").join("b.jpg").is_file());
    assert!(f.destination.join("dog").join("b.jpg").is_file());
    let snapshot = read_snapshot(&session.snapshot_path());
    assert_eq!(snapshot["1"]["label"], "dog");
    assert_eq!(session.progress().labeled, 2);
}

#[test]
fn test_invalid_label_mutates_nothing() {
    let f = fixture(&["a.jpg", "b.jpg"]);
    let mut session = session(&f);

    match session.vote("bird") {
        Err(LabelError::InvalidLabel(label)) => assert_eq!(label, "bird"),
        other => panic!("Expected InvalidLabel, got {:?}", other),
    }
    assert_eq!(session.position(), 0);
    assert_eq!(session.store().labeled_count(), 0);
    assert!(!f.destination.exists());
}

#[test]
fn test_vote_key() {
    let f = fixture(&["a.jpg", "b.jpg", "c.jpg"]);
    let mut session = session(&f);

    assert_eq!(session.vote_key(2).unwrap().label, "dog");
    assert_eq!(session.vote_key(1).unwrap().label, "cat");
    assert!(matches!(
        session.vote_key(0),
        Err(LabelError::InvalidLabel(_))
    ));
    assert!(matches!(
        session.vote_key(3),
        Err(LabelError::InvalidLabel(_))
    ));
    assert_eq!(session.position(), 2);
}

#[test]
fn test_copy_failure_restores_label() {
    let f = fixture(&["a.jpg", "b.jpg"]);
    let mut session = session(&f);

    session.vote("cat").unwrap();
    session.prev();
    fs::remove_file(&f.images[0]).unwrap();
    assert!(!session.is_available());

    match session.vote("dog") {
        Err(LabelError::CopyFailure { from, .. }) => assert_eq!(from, f.images[0]),
        other => panic!("Expected CopyFailure, got {:?}", other),
    }
    // Label, position and snapshot all still show the first vote
    assert_eq!(session.position(), 0);
    assert_eq!(session.current().unwrap().label.as_deref(), Some("cat"));
    let snapshot = read_snapshot(&session.snapshot_path());
    assert_eq!(snapshot["0"]["label"], "cat");
}

#[test]
fn test_persist_failure_restores_label() {
    let f = fixture(&["a.jpg", "b.jpg"]);
    let mut session = session(&f);

    // A directory where the snapshot should go
    let snapshot = session.snapshot_path();
    fs::create_dir_all(snapshot.join("blocked")).unwrap();

    assert!(matches!(
        session.vote("cat"),
        Err(LabelError::PersistFailure { .. })
    ));
    assert_eq!(session.position(), 0);
    assert_eq!(session.current().unwrap().label, None);
}

#[test]
fn test_jump_to_unlabeled() {
    let f = fixture(&["a.jpg", "b.jpg", "c.jpg"]);
    let mut session = session(&f);

    session.vote("cat").unwrap();
    session.vote("cat").unwrap();
    session.seek(0).unwrap();
    assert_eq!(session.jump_to_unlabeled(), None);
    assert_eq!(session.position(), 2);

    session.vote("dog").unwrap();
    session.seek(0).unwrap();
    assert_eq!(session.jump_to_unlabeled(), Some(Boundary::AllLabeled));
    assert_eq!(session.position(), 2);
}

#[test]
fn test_resume_with_missing_file() {
    let f = fixture(&["a.jpg", "b.jpg", "c.jpg"]);
    let mut first = session(&f);
    first.vote("cat").unwrap();
    first.vote("dog").unwrap();
    let snapshot = first.snapshot_path();
    drop(first);

    fs::remove_file(&f.images[1]).unwrap();

    let store = RecordStore::load(&snapshot).unwrap();
    let mut resumed = Session::new(store, labels(), &f.destination).unwrap();

    // Resuming starts at the first position
    assert_eq!(resumed.position(), 0);
    assert!(resumed.is_available());

    resumed.next();
    assert_eq!(resumed.position(), 1);
    assert!(!resumed.is_available());
    assert_eq!(resumed.current().unwrap().label.as_deref(), Some("dog"));

    resumed.next();
    assert!(resumed.is_available());
    assert_eq!(resumed.jump_to_unlabeled(), None);
    assert_eq!(resumed.position(), 2);
}

#[test]
fn test_new_rejects_bad_configuration() {
    let f = fixture(&["a.jpg"]);
    let store = || RecordStore::initialize(f.images.iter().cloned());
    let labels = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    assert!(matches!(
        Session::new(RecordStore::default(), labels(&["cat"]), &f.destination),
        Err(LabelError::NoImagesFound)
    ));
    assert!(matches!(
        Session::new(store(), Vec::new(), &f.destination),
        Err(LabelError::NoLabels)
    ));
    assert!(matches!(
        Session::new(store(), labels(&["cat", "dog", "cat"]), &f.destination),
        Err(LabelError::DuplicateLabel(l)) if l == "cat"
    ));
    for bad in ["", ".", "..", "a/b", "a\\b", "/abs"] {
        assert!(
            matches!(
                Session::new(store(), labels(&[bad]), &f.destination),
                Err(LabelError::InvalidLabelName(_))
            ),
            "{bad:?} accepted"
        );
    }
    assert!(Session::new(store(), labels(&["blurry photo", "ok-1"]), &f.destination).is_ok());
}
