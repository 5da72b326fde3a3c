//! Tests for add and run subcommands.

use super::parse;
use crate::cli::commands::parse_header;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_add() {
    match parse(&["bookdl", "add", "https://example.com/book.epub"]) {
        CliCommand::Add { url, headers } => {
            assert_eq!(url, "https://example.com/book.epub");
            assert!(headers.is_empty());
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_headers() {
    match parse(&[
        "bookdl",
        "add",
        "https://example.com/x",
        "--header",
        "Authorization: Bearer abc",
        "-H",
        "Cookie:session=1",
    ]) {
        CliCommand::Add { headers, .. } => assert_eq!(
            headers,
            vec![
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("Cookie".to_string(), "session=1".to_string()),
            ]
        ),
        _ => panic!("expected Add with headers"),
    }
}

#[test]
fn cli_rejects_malformed_header() {
    assert!(Cli::try_parse_from(["bookdl", "add", "https://x", "--header", "novalue"]).is_err());
    assert!(parse_header("Bad Name: v").is_err());
    assert!(parse_header(": v").is_err());
    assert_eq!(
        parse_header("X-Empty:").unwrap(),
        ("X-Empty".to_string(), String::new())
    );
}

#[test]
fn cli_parse_run() {
    match parse(&["bookdl", "run"]) {
        CliCommand::Run { jobs } => assert!(jobs.is_none()),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_jobs() {
    match parse(&["bookdl", "run", "--jobs", "4"]) {
        CliCommand::Run { jobs } => assert_eq!(jobs, Some(4)),
        _ => panic!("expected Run with --jobs"),
    }
}
