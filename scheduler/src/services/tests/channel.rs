//! Tests for the file-backed command channel

use shared::{ControlAction, ControlMessage};

use super::common::{temp_channel, test_record};
use crate::services::FileChannel;
use crate::traits::CommandQueue;

#[test]
fn test_new_channel_is_seeded_empty() {
    let (_dir, channel) = temp_channel();

    assert_eq!(std::fs::read_to_string(channel.path()).unwrap(), "[]");
    assert!(channel.get().is_empty());
}

#[test]
fn test_open_keeps_existing_content() {
    let (dir, channel) = temp_channel();
    channel.push(ControlMessage::status());

    // A second opener must not reseed a store that already exists
    let reopened = FileChannel::open_at(dir.path().join("test.queue.json")).unwrap();
    assert_eq!(reopened.get().len(), 1);
}

#[test]
fn test_open_fails_for_unusable_location() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = FileChannel::open_at(dir.path().join("missing").join("q.json"));

    assert!(matches!(result, Err(crate::error::SchedulerError::ChannelInit { .. })));
}

#[test]
fn test_push_preserves_order() {
    let (_dir, channel) = temp_channel();
    channel.push(ControlMessage::status());
    channel.push(ControlMessage::stop(true));
    channel.push(ControlMessage::allocate(vec![test_record(10, "a")]));

    let actions: Vec<ControlAction> = channel.get().iter().map(|m| m.action()).collect();
    assert_eq!(
        actions,
        vec![ControlAction::Status, ControlAction::Stop, ControlAction::Allocate]
    );
}

#[test]
fn test_send_then_receive_returns_stamped_message() {
    let (_dir, channel) = temp_channel();
    channel.send(ControlMessage::status());

    let message = channel.receive(ControlAction::Status).expect("status message");
    assert!(message.time.is_some());
    assert!(channel.get().is_empty());
}

#[test]
fn test_receive_removes_only_first_match() {
    let (_dir, channel) = temp_channel();
    channel.push(ControlMessage::stop(false));
    channel.push(ControlMessage::status());
    channel.push(ControlMessage::stop(true));

    let taken = channel.receive(ControlAction::Stop).unwrap();
    assert_eq!(taken, ControlMessage::stop(false));
    assert_eq!(
        channel.get(),
        vec![ControlMessage::status(), ControlMessage::stop(true)]
    );
}

#[test]
fn test_receive_later_message_leaves_earlier_one() {
    let (_dir, channel) = temp_channel();
    let report = ControlMessage::allocate(vec![test_record(10, "a")]);
    channel.push(report.clone());
    channel.push(ControlMessage::status());

    assert!(channel.receive(ControlAction::Status).is_some());
    assert_eq!(channel.get(), vec![report]);
}

#[test]
fn test_receive_without_match_leaves_store_unchanged() {
    let (_dir, channel) = temp_channel();
    assert!(channel.receive(ControlAction::Stop).is_none());
    assert!(channel.get().is_empty());

    channel.push(ControlMessage::status());
    assert!(channel.receive(ControlAction::StatusReply).is_none());
    assert_eq!(channel.get(), vec![ControlMessage::status()]);
}

#[test]
fn test_corrupt_store_reads_as_empty() {
    let (_dir, channel) = temp_channel();
    std::fs::write(channel.path(), "{not json").unwrap();

    assert!(channel.get().is_empty());
    assert!(channel.receive(ControlAction::Status).is_none());

    // The next write replaces the corrupt document
    channel.push(ControlMessage::status());
    assert_eq!(channel.get(), vec![ControlMessage::status()]);
}

#[test]
fn test_empty_file_reads_as_empty() {
    let (_dir, channel) = temp_channel();
    std::fs::write(channel.path(), "").unwrap();

    assert!(channel.get().is_empty());
}

#[test]
fn test_set_replaces_everything() {
    let (_dir, channel) = temp_channel();
    channel.push(ControlMessage::status());
    channel.set(vec![ControlMessage::stop(false)]);

    assert_eq!(channel.get(), vec![ControlMessage::stop(false)]);

    channel.set(Vec::new());
    assert_eq!(std::fs::read_to_string(channel.path()).unwrap(), "[]");
}

#[test]
fn test_two_handles_share_one_store() {
    let (dir, sender) = temp_channel();
    let receiver = FileChannel::open_at(dir.path().join("test.queue.json")).unwrap();

    sender.send(ControlMessage::stop(true));
    let message = receiver.receive(ControlAction::Stop).unwrap();

    assert_eq!(message.payload, ControlMessage::stop(true).payload);
    assert!(sender.get().is_empty());
}

#[test]
fn test_path_for_key_is_sanitized() {
    let path = FileChannel::path_for_key("my app/key");
    assert_eq!(path.file_name().unwrap(), "my_app_key.queue.json");
    assert_eq!(path.parent().unwrap(), std::env::temp_dir());
}

#[test]
fn test_undecodable_entry_survives_receive() {
    let (_dir, channel) = temp_channel();
    channel.push(ControlMessage::stop(true));
    // An action this build does not know, written by some other sender
    let mut content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(channel.path()).unwrap()).unwrap();
    content
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"action": "restart"}));
    std::fs::write(channel.path(), content.to_string()).unwrap();

    assert!(channel.receive(ControlAction::Status).is_none());
    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(channel.path()).unwrap()).unwrap();
    assert_eq!(stored.len(), 2);

    assert_eq!(channel.get(), vec![ControlMessage::stop(true)]);
    assert_eq!(channel.receive(ControlAction::Stop), Some(ControlMessage::stop(true)));

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(channel.path()).unwrap()).unwrap();
    assert_eq!(stored, vec![serde_json::json!({"action": "restart"})]);
}

#[test]
fn test_rewrite_leaves_no_staging_file() {
    let (dir, channel) = temp_channel();
    channel.push(ControlMessage::status());
    channel.receive(ControlAction::Status);

    assert!(!dir.path().join("test.queue.json.tmp").exists());
    assert_eq!(std::fs::read_to_string(channel.path()).unwrap(), "[]");
}

#[test]
fn test_failed_write_keeps_previous_content() {
    let (dir, channel) = temp_channel();
    channel.push(ControlMessage::status());

    // Staging cannot be created while a directory occupies its name
    let staging = dir.path().join("test.queue.json.tmp");
    std::fs::create_dir(&staging).unwrap();
    channel.push(ControlMessage::stop(false));
    assert!(channel.receive(ControlAction::Status).is_none());

    std::fs::remove_dir(&staging).unwrap();
    assert_eq!(channel.get(), vec![ControlMessage::status()]);
}

#[test]
fn test_concurrent_pushes_through_separate_handles() {
    const WRITERS: usize = 8;
    const PUSHES: usize = 50;
    let (dir, channel) = temp_channel();
    let path = dir.path().join("test.queue.json");

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let path = path.clone();
            std::thread::spawn(move || {
                let writer = FileChannel::open_at(path).unwrap();
                for _ in 0..PUSHES {
                    writer.push(ControlMessage::status());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(channel.get().len(), WRITERS * PUSHES);
    let mut received = 0;
    while channel.receive(ControlAction::Status).is_some() {
        received += 1;
    }
    assert_eq!(received, WRITERS * PUSHES);
}
