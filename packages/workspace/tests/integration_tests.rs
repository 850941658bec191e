//! File system changes flowing from the watcher into open documents

use scened_editor::{EditorConfig, Severity};
use scened_workspace::{DocumentUpdate, FileWatcher, Workspace};
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for_updates(workspace: &mut Workspace, watcher: &FileWatcher) -> Vec<DocumentUpdate> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let updates = workspace.poll(watcher);
        if !updates.is_empty() {
            return updates;
        }
        thread::sleep(Duration::from_millis(50));
    }
    Vec::new()
}

#[test]
fn test_deleted_prototype_is_reported_and_recovered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("enemy.go"), "").unwrap();
    fs::write(
        dir.path().join("level.collection"),
        "name: \"level\"\ninstances {\n  id: \"enemy\"\n  prototype: \"/enemy.go\"\n}\n",
    )
    .unwrap();

    let watcher = FileWatcher::new(dir.path()).unwrap();
    let mut workspace = Workspace::new(dir.path(), EditorConfig::default()).unwrap();
    assert!(workspace.open("/level.collection").unwrap().status().is_ok());

    fs::remove_file(dir.path().join("enemy.go")).unwrap();
    let updates = wait_for_updates(&mut workspace, &watcher);
    assert_eq!(updates, vec![DocumentUpdate::Reloaded("/level.collection".into())]);
    let status = workspace.document("/level.collection").unwrap().status();
    assert_eq!(status.severity, Severity::Error);

    fs::write(dir.path().join("enemy.go"), "").unwrap();
    let updates = wait_for_updates(&mut workspace, &watcher);
    assert!(!updates.is_empty());
    assert!(workspace.document("/level.collection").unwrap().status().is_ok());
}
