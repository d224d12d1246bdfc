use super::*;
use crate::git::GitError;
use crate::git::constants::special::RECORD_SENTINEL;
use crate::model::{FileKind, Rev};
use std::path::Path;

fn ctx<'a>(left: &'a Rev, right: &'a Rev) -> EntryContext<'a> {
    EntryContext {
        root: Path::new("/repo"),
        kind: FileKind::Working,
        left,
        right,
        commit: None,
    }
}

fn header_lines(hash: &str, parents: &str, subject: &str) -> Vec<String> {
    vec![
        format!("{hash} {parents}"),
        "Alice".to_string(),
        "1700000000 +0900".to_string(),
        "3 days ago".to_string(),
        subject.to_string(),
    ]
}

#[test]
fn test_parse_name_status_modified() {
    let parsed = Parser::parse_name_status_line("M\tsrc/main.rs").unwrap();
    assert_eq!(parsed.status, FileStatus::Modified);
    assert_eq!(parsed.path, "src/main.rs");
    assert_eq!(parsed.old_path, None);
}

#[test]
fn test_parse_name_status_rename_with_score() {
    let parsed = Parser::parse_name_status_line("R087\told/name.rs\tnew/name.rs").unwrap();
    assert_eq!(parsed.status, FileStatus::Renamed);
    assert_eq!(parsed.path, "new/name.rs");
    assert_eq!(parsed.old_path.as_deref(), Some("old/name.rs"));
}

#[test]
fn test_parse_name_status_copy() {
    let parsed = Parser::parse_name_status_line("C100\ta.rs\tb.rs").unwrap();
    assert_eq!(parsed.status, FileStatus::Copied);
    assert_eq!(parsed.old_path.as_deref(), Some("a.rs"));
}

#[test]
fn test_parse_name_status_combined_merge() {
    let parsed = Parser::parse_name_status_line("MM\tshared.rs").unwrap();
    assert_eq!(parsed.status, FileStatus::Modified);
    assert_eq!(parsed.path, "shared.rs");
}

#[test]
fn test_parse_name_status_path_with_spaces() {
    let parsed = Parser::parse_name_status_line("A\tdocs/read me.md").unwrap();
    assert_eq!(parsed.path, "docs/read me.md");
}

#[test]
fn test_parse_name_status_rejects_malformed() {
    assert!(Parser::parse_name_status_line("").is_none());
    assert!(Parser::parse_name_status_line("M").is_none());
    assert!(Parser::parse_name_status_line("M\t").is_none());
    assert!(Parser::parse_name_status_line("Z\tfile").is_none());
    assert!(Parser::parse_name_status_line("m\tfile").is_none());
    // Rename without new name
    assert!(Parser::parse_name_status_line("R100\told").is_none());
    // Modification with an extra field
    assert!(Parser::parse_name_status_line("M\ta\tb").is_none());
}

#[test]
fn test_parse_numstat_counts() {
    let parsed = Parser::parse_numstat_line("12\t3\tsrc/lib.rs").unwrap();
    let stats = parsed.stats.unwrap();
    assert_eq!(stats.additions, 12);
    assert_eq!(stats.deletions, 3);
    assert_eq!(parsed.path, "src/lib.rs");
}

#[test]
fn test_parse_numstat_binary_is_absent() {
    let parsed = Parser::parse_numstat_line("-\t-\tlogo.png").unwrap();
    assert_eq!(parsed.stats, None);
    assert_eq!(parsed.path, "logo.png");
}

#[test]
fn test_parse_numstat_rename_path_kept_verbatim() {
    let parsed = Parser::parse_numstat_line("0\t0\tsrc/{old.rs => new.rs}").unwrap();
    assert_eq!(parsed.path, "src/{old.rs => new.rs}");
}

#[test]
fn test_parse_numstat_too_few_fields() {
    assert!(Parser::parse_numstat_line("1\t2").is_none());
}

#[test]
fn test_pair_file_entries_by_position() {
    let (left, right) = (Rev::Index, Rev::Local);
    let name_status = ["M\tb.rs", "R090\told.rs\tnew.rs", "A\timage.png"];
    // Numstat paths differ from name-status paths for renames; position wins
    let numstat = ["4\t1\tb.rs", "2\t2\t{old.rs => new.rs}", "-\t-\timage.png"];

    let entries = Parser::pair_file_entries(&name_status, &numstat, &ctx(&left, &right)).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].path, "b.rs");
    assert_eq!(entries[0].stats.unwrap().additions, 4);
    assert_eq!(entries[1].path, "new.rs");
    assert_eq!(entries[1].old_path.as_deref(), Some("old.rs"));
    assert_eq!(entries[1].stats.unwrap().deletions, 2);
    assert_eq!(entries[2].stats, None);
    assert_eq!(entries[2].absolute_path, Path::new("/repo/image.png"));
    assert_eq!(entries[2].left, Rev::Index);
    assert_eq!(entries[2].right, Rev::Local);
}

#[test]
fn test_pair_file_entries_ignores_blank_lines() {
    let (left, right) = (Rev::Index, Rev::Local);
    let entries = Parser::pair_file_entries(
        &["", "M\ta.rs", ""],
        &["1\t1\ta.rs", ""],
        &ctx(&left, &right),
    )
    .unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_pair_file_entries_count_mismatch() {
    let (left, right) = (Rev::Index, Rev::Local);
    let result = Parser::pair_file_entries(&["M\ta.rs", "M\tb.rs"], &["1\t1\ta.rs"], &ctx(&left, &right));
    assert!(matches!(
        result,
        Err(GitError::StreamMismatch {
            name_status: 2,
            numstat: 1
        })
    ));
}

#[test]
fn test_pair_file_entries_lenient_drops_stats() {
    let (left, right) = (Rev::Index, Rev::Local);
    let entries = Parser::pair_file_entries_lenient(
        &["M\ta.rs", "M\tb.rs"],
        &["1\t1\ta.rs"],
        &ctx(&left, &right),
    )
    .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.stats.is_none()));
}

#[test]
fn test_pair_file_entries_bad_name_status_line() {
    let (left, right) = (Rev::Index, Rev::Local);
    let result = Parser::pair_file_entries(&["garbage"], &["1\t1\ta.rs"], &ctx(&left, &right));
    assert!(matches!(result, Err(GitError::ParseError(_))));
}

#[test]
fn test_untracked_entries() {
    let (left, right) = (Rev::Index, Rev::Local);
    let entries = Parser::untracked_entries(&["new.txt", "", "dir/other.txt"], &ctx(&left, &right));
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == FileStatus::Untracked));
    assert!(entries.iter().all(|e| e.stats.is_none()));
}

#[test]
fn test_parse_log_header() {
    let commit = Parser::parse_log_header(&header_lines("abc123", "p1 p2", "Merge branch")).unwrap();
    assert_eq!(commit.hash, "abc123");
    assert_eq!(commit.parents, vec!["p1", "p2"]);
    assert!(commit.is_merge());
    assert_eq!(commit.author, "Alice");
    assert_eq!(commit.author_time, 1_700_000_000);
    assert_eq!(commit.time_offset, "+0900");
    assert_eq!(commit.relative_date, "3 days ago");
    assert_eq!(commit.subject, "Merge branch");
}

#[test]
fn test_parse_log_header_root_commit() {
    // `%H %P` leaves a trailing space when there is no parent
    let commit = Parser::parse_log_header(&header_lines("abc123", "", "")).unwrap();
    assert!(commit.parents.is_empty());
    assert_eq!(commit.subject, "");
}

#[test]
fn test_parse_log_header_too_short() {
    let result = Parser::parse_log_header(&["abc".to_string()]);
    assert!(matches!(result, Err(GitError::ParseError(_))));
}

#[test]
fn test_parse_raw_date_negative_offset() {
    let (seconds, offset) = Parser::parse_raw_date("1234 -0130").unwrap();
    assert_eq!(seconds, 1234);
    assert_eq!(offset, "-0130");
    assert!(Parser::parse_raw_date("yesterday").is_err());
}

// =============================================================================
// Stream alignment
// =============================================================================

fn feed(aligner: &mut StreamAligner, stream: Stream, lines: &[String]) -> Vec<RawRecord> {
    let mut out = Vec::new();
    for line in lines {
        out.extend(aligner.push_line(stream, line).unwrap());
    }
    out
}

fn header_stream(hashes: &[&str]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, hash) in hashes.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(RECORD_SENTINEL.to_string());
        lines.extend(header_lines(hash, "parent", &format!("commit {i}")));
        lines.push(String::new());
        lines.push(format!("M\tfile{i}.rs"));
    }
    lines
}

fn numstat_stream(hashes: &[&str]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, hash) in hashes.iter().enumerate() {
        lines.push(RECORD_SENTINEL.to_string());
        lines.push(hash.to_string());
        lines.push(String::new());
        lines.push(format!("{i}\t0\tfile{i}.rs"));
    }
    lines
}

#[test]
fn test_aligner_releases_in_order() {
    let hashes = ["a1", "b2", "c3"];
    let mut aligner = StreamAligner::new();

    // Header stream races ahead; nothing is released until numstat catches up
    let early = feed(&mut aligner, Stream::Header, &header_stream(&hashes));
    assert_eq!(early.len(), 0);

    let mut records = feed(&mut aligner, Stream::Numstat, &numstat_stream(&hashes));
    records.extend(aligner.finish(Stream::Header).unwrap());
    records.extend(aligner.finish(Stream::Numstat).unwrap());

    let indices: Vec<usize> = records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(records[1].header[0], "b2 parent");
    assert_eq!(records[1].name_status, vec!["M\tfile1.rs"]);
    assert_eq!(records[1].numstat, vec!["1\t0\tfile1.rs"]);
    assert!(aligner.is_finished());
}

#[test]
fn test_aligner_interleaved_streams() {
    let hashes = ["a1", "b2"];
    let header = header_stream(&hashes);
    let numstat = numstat_stream(&hashes);
    let mut aligner = StreamAligner::new();

    let mut released = Vec::new();
    let mut h = header.iter();
    let mut n = numstat.iter();
    loop {
        let (hl, nl) = (h.next(), n.next());
        if hl.is_none() && nl.is_none() {
            break;
        }
        if let Some(line) = hl {
            released.extend(aligner.push_line(Stream::Header, line).unwrap());
        }
        if let Some(line) = nl {
            released.extend(aligner.push_line(Stream::Numstat, line).unwrap());
        }
    }
    // The first record closes when the second sentinel arrives on both streams
    assert_eq!(released.len(), 1);
    released.extend(aligner.finish(Stream::Numstat).unwrap());
    released.extend(aligner.finish(Stream::Header).unwrap());
    assert_eq!(released.len(), 2);
    assert_eq!(aligner.released(), 2);
}

#[test]
fn test_aligner_record_count_mismatch() {
    let mut aligner = StreamAligner::new();
    feed(&mut aligner, Stream::Header, &header_stream(&["a1", "b2"]));
    feed(&mut aligner, Stream::Numstat, &numstat_stream(&["a1"]));

    aligner.finish(Stream::Header).unwrap();
    let result = aligner.finish(Stream::Numstat);
    assert!(matches!(
        result,
        Err(GitError::StreamMismatch {
            name_status: 2,
            numstat: 1
        })
    ));
}

#[test]
fn test_aligner_hash_disagreement() {
    let mut aligner = StreamAligner::new();
    feed(&mut aligner, Stream::Header, &header_stream(&["a1"]));
    feed(&mut aligner, Stream::Numstat, &numstat_stream(&["zz"]));
    aligner.finish(Stream::Header).unwrap();
    assert!(matches!(
        aligner.finish(Stream::Numstat),
        Err(GitError::ParseError(_))
    ));
}

#[test]
fn test_aligner_empty_history() {
    let mut aligner = StreamAligner::new();
    assert!(aligner.finish(Stream::Header).unwrap().is_empty());
    assert!(aligner.finish(Stream::Numstat).unwrap().is_empty());
    assert_eq!(aligner.released(), 0);
}

#[test]
fn test_aligner_rejects_output_before_first_record() {
    let mut aligner = StreamAligner::new();
    assert!(aligner.push_line(Stream::Header, "").unwrap().is_empty());
    assert!(aligner.push_line(Stream::Header, "stray").is_err());
}
