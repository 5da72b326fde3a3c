//! Tests for status, pause, resume, remove and the control protocol.

use super::parse;
use crate::cli::control_socket::ControlCommand;
use crate::cli::CliCommand;

#[test]
fn cli_parse_status() {
    match parse(&["bookdl", "status"]) {
        CliCommand::Status => {}
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_pause() {
    match parse(&["bookdl", "pause", "42"]) {
        CliCommand::Pause { id } => assert_eq!(id, 42),
        _ => panic!("expected Pause"),
    }
}

#[test]
fn cli_parse_resume() {
    match parse(&["bookdl", "resume", "1"]) {
        CliCommand::Resume { id } => assert_eq!(id, 1),
        _ => panic!("expected Resume"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["bookdl", "remove", "99"]) {
        CliCommand::Remove { id, delete_files } => {
            assert_eq!(id, 99);
            assert!(!delete_files);
        }
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_remove_delete_files() {
    match parse(&["bookdl", "remove", "1", "--delete-files"]) {
        CliCommand::Remove { id, delete_files } => {
            assert_eq!(id, 1);
            assert!(delete_files);
        }
        _ => panic!("expected Remove with --delete-files"),
    }
}

#[test]
fn control_lines_roundtrip() {
    for cmd in [
        ControlCommand::Pause(3),
        ControlCommand::Resume(4),
        ControlCommand::Remove(5),
    ] {
        assert_eq!(ControlCommand::parse(&cmd.to_line()), Some(cmd));
    }
}

#[test]
fn control_rejects_garbage() {
    assert_eq!(ControlCommand::parse("pause"), None);
    assert_eq!(ControlCommand::parse("pause x"), None);
    assert_eq!(ControlCommand::parse("cancel 1"), None);
    assert_eq!(ControlCommand::parse("  remove 7  "), Some(ControlCommand::Remove(7)));
}
