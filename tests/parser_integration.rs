//! Exercises `ResponseParser` against realistic, multi-feed byte sequences rather than
//! mechanical round-trip grids (spec §8).

use corewire::http::parser::{FeedOutcome, ResponseParser};

#[test]
fn chunked_response_split_across_arbitrary_feed_boundaries() {
    let full = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nX-Trace: abc\r\n\r\n\
                 7\r\nMozilla\r\n9\r\nDeveloper\r\n7\r\nNetwork\r\n0\r\n\r\n";

    let mut parser = ResponseParser::new();
    let mut body = Vec::new();
    let mut done = false;

    // Feed one byte at a time to prove the state machine never assumes whole-frame delivery.
    for byte in full {
        let mut outcome = parser.feed(std::slice::from_ref(byte));
        loop {
            match outcome {
                FeedOutcome::NeedMore => break,
                FeedOutcome::HeadersDone => {
                    assert_eq!(parser.status_code(), 200);
                    assert_eq!(parser.header("x-trace"), Some("abc"));
                }
                FeedOutcome::ChunkReady => {
                    if let Some(chunk) = parser.take_chunk() {
                        body.extend_from_slice(&chunk);
                    }
                }
                FeedOutcome::Done => done = true,
                FeedOutcome::Error(msg) => panic!("unexpected parse error: {}", msg),
            }
            outcome = parser.feed(&[]);
        }
    }

    assert!(done);
    assert_eq!(body, b"MozillaDeveloperNetwork");
}

#[test]
fn content_length_response_arrives_in_two_large_feeds() {
    let mut parser = ResponseParser::new();
    let head = b"HTTP/1.1 201 Created\r\nContent-Length: 11\r\n\r\n";
    let half1 = b"hello";
    let half2 = b" world";

    assert_eq!(parser.feed(head), FeedOutcome::HeadersDone);
    assert_eq!(parser.feed(half1), FeedOutcome::ChunkReady);
    assert_eq!(parser.take_chunk(), Some(b"hello".to_vec()));
    assert_eq!(parser.feed(half2), FeedOutcome::ChunkReady);
    assert_eq!(parser.take_chunk(), Some(b" world".to_vec()));
    assert_eq!(parser.feed(&[]), FeedOutcome::Done);
    assert!(parser.is_done());
}

#[test]
fn malformed_status_line_reports_error_and_stays_errored() {
    let mut parser = ResponseParser::new();
    let outcome = parser.feed(b"GARBAGE\r\n\r\n");
    assert!(matches!(outcome, FeedOutcome::Error(_)));
}
