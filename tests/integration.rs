use std::io::{Cursor, Read};

use imfmime::{MimeTokenStream, ParserConfig, Token};

fn collect_tokens<R: Read>(stream: &mut MimeTokenStream<R>) -> Vec<Token> {
    let mut tokens = Vec::new();
    loop {
        let token = stream.next().unwrap();
        let done = token == Token::EndOfStream;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

fn read_body(stream: &mut MimeTokenStream<impl Read>) -> Vec<u8> {
    let mut reader = stream.body_reader().unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    out
}

fn simple_mixed_message() -> String {
    concat!(
        "Content-Type: multipart/mixed; boundary=1729\r\n",
        "MIME-Version: 1.0\r\n",
        "From: a@example.com\r\n",
        "To: b@example.com\r\n",
        "Subject: test\r\n",
        "\r\n",
        "A Preamble\r\n",
        "--1729\r\n",
        "\r\n",
        "Simple plain text\r\n",
        "--1729\r\n",
        "Content-Type: text/plain; charset=US-ASCII\r\n",
        "\r\n",
        "Some more text\r\n",
        "--1729--\r\n",
        "An Epilogue"
    )
    .to_string()
}

#[test]
fn s1_simple_mixed_message_token_sequence() {
    let input = simple_mixed_message();
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.into_bytes()), ParserConfig::default()).unwrap();

    let mut tokens = Vec::new();
    loop {
        let token = stream.next().unwrap();
        match token {
            Token::Preamble => assert_eq!(read_body(&mut stream), b"A Preamble"),
            Token::Epilogue => assert_eq!(read_body(&mut stream), b"An Epilogue"),
            _ => {}
        }
        let done = token == Token::EndOfStream;
        tokens.push(token);
        if done {
            break;
        }
    }

    assert_eq!(
        tokens,
        vec![
            Token::StartHeader,
            Token::Field,
            Token::Field,
            Token::Field,
            Token::Field,
            Token::Field,
            Token::EndHeader,
            Token::StartMultipart,
            Token::Preamble,
            Token::StartBodypart,
            Token::StartHeader,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            Token::Epilogue,
            Token::EndMultipart,
            Token::EndMessage,
            Token::EndOfStream,
        ]
    );
}

#[test]
fn s1_bodypart_bodies_carry_expected_bytes() {
    let input = simple_mixed_message();
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.into_bytes()), ParserConfig::default()).unwrap();

    let mut bodies = Vec::new();
    loop {
        let token = stream.next().unwrap();
        if token == Token::Body {
            bodies.push(read_body(&mut stream));
        }
        if token == Token::EndOfStream {
            break;
        }
    }

    assert_eq!(bodies, vec![b"Simple plain text".to_vec(), b"Some more text".to_vec()]);
    assert!(stream.warnings().is_empty());
    assert!(!stream.unexpected_eof());
}

#[test]
fn s2_nested_multiparts_close_in_order() {
    let input = concat!(
        "Content-Type: multipart/mixed; boundary=outer-boundary\r\n",
        "\r\n",
        "--outer-boundary\r\n",
        "Content-Type: multipart/alternative; boundary=inner-boundary\r\n",
        "\r\n",
        "--inner-boundary\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Some text\r\n",
        "--inner-boundary--\r\n",
        "foo\r\n",
        "--outer-boundary--\r\n",
    );
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.as_bytes().to_vec()), ParserConfig::default())
            .unwrap();

    let tokens = collect_tokens(&mut stream);
    assert_eq!(
        tokens,
        vec![
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::StartMultipart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::StartMultipart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            Token::Epilogue,
            Token::EndMultipart,
            Token::EndBodypart,
            Token::EndMultipart,
            Token::EndMessage,
            Token::EndOfStream,
        ]
    );
}

#[test]
fn s3_message_rfc822_recurses_inside_a_bodypart() {
    let inner = simple_mixed_message();
    let input = format!(
        concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: message/rfc822\r\n",
            "\r\n",
            "{}\r\n",
            "--outer--\r\n",
        ),
        inner
    );
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.into_bytes()), ParserConfig::default()).unwrap();

    let tokens = collect_tokens(&mut stream);

    assert_eq!(tokens.first(), Some(&Token::StartHeader));
    assert_eq!(tokens.last(), Some(&Token::EndOfStream));

    let bodypart_start = tokens
        .iter()
        .position(|t| *t == Token::StartBodypart)
        .unwrap();
    let message_start = tokens
        .iter()
        .position(|t| *t == Token::StartMessage)
        .unwrap();
    let message_end = tokens.iter().rposition(|t| *t == Token::EndMessage).unwrap();
    let bodypart_end = tokens
        .iter()
        .position(|t| *t == Token::EndBodypart)
        .unwrap();

    assert!(bodypart_start < message_start);
    assert!(message_start < message_end);
    assert!(message_end < bodypart_end);

    // Two EndMessage tokens: the recursed inner message and, since S1's
    // own body is itself a multipart/mixed entity, none further — but the
    // inner message's own nested StartMultipart/EndMultipart pair must
    // still appear between StartMessage and EndMessage.
    let inner_multipart_start = tokens[message_start..message_end]
        .iter()
        .position(|t| *t == Token::StartMultipart);
    assert!(inner_multipart_start.is_some());
}

#[test]
fn s4_headless_parse_suppresses_leading_start_multipart() {
    let body = concat!(
        "A Preamble\r\n",
        "--1729\r\n",
        "\r\n",
        "Simple plain text\r\n",
        "--1729\r\n",
        "Content-Type: text/plain; charset=US-ASCII\r\n",
        "\r\n",
        "Some more text\r\n",
        "--1729--\r\n",
        "An Epilogue"
    );
    let mut stream = MimeTokenStream::parse_headless(
        Cursor::new(body.as_bytes().to_vec()),
        "multipart/mixed; boundary=1729",
        ParserConfig::default(),
    )
    .unwrap();

    assert_eq!(stream.next().unwrap(), Token::Preamble);
    assert_eq!(read_body(&mut stream), b"A Preamble");
    assert_eq!(stream.next().unwrap(), Token::StartBodypart);

    let rest = collect_tokens(&mut stream);
    assert_eq!(
        rest,
        vec![
            Token::StartHeader,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            Token::Epilogue,
            Token::EndMultipart,
            Token::EndMessage,
            Token::EndOfStream,
        ]
    );
}

#[test]
fn truncated_multipart_is_flagged_without_hard_failure() {
    let input = concat!(
        "Content-Type: multipart/mixed; boundary=X\r\n",
        "\r\n",
        "--X\r\n",
        "\r\n",
        "unterminated part body with no closing boundary"
    );
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.as_bytes().to_vec()), ParserConfig::default())
            .unwrap();

    let tokens = collect_tokens(&mut stream);
    assert_eq!(tokens.last(), Some(&Token::EndOfStream));
    assert!(stream.unexpected_eof());
    assert!(stream
        .warnings()
        .iter()
        .any(|w| matches!(w, imfmime::Warning::UnexpectedEof { .. })));
}

#[test]
fn ancestor_boundary_interrupts_unclosed_nested_multipart() {
    // The inner `multipart/mixed` (boundary=inner) never sees its own
    // close-delimiter `--inner--`: the next boundary-shaped text to
    // appear is the *outer* multipart's close-delimiter, `--outer--`.
    // Every frame still open below the outer multipart (the innermost
    // bodypart, then the inner multipart itself) must close straight to
    // its `End*` token with no fabricated `Epilogue`, and this must not
    // be reported as an unexpected EOF — the outer multipart's own
    // close-delimiter genuinely was found.
    let input = concat!(
        "Content-Type: multipart/mixed; boundary=outer\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/mixed; boundary=inner\r\n",
        "\r\n",
        "--inner\r\n",
        "\r\n",
        "inner part body\r\n",
        "--outer--\r\n",
    );
    let mut stream =
        MimeTokenStream::parse(Cursor::new(input.as_bytes().to_vec()), ParserConfig::default())
            .unwrap();

    let mut tokens = Vec::new();
    loop {
        let token = stream.next().unwrap();
        if token == Token::Body {
            assert_eq!(read_body(&mut stream), b"inner part body");
        }
        if token == Token::Epilogue {
            assert_eq!(read_body(&mut stream), b"");
        }
        let done = token == Token::EndOfStream;
        tokens.push(token);
        if done {
            break;
        }
    }

    assert_eq!(
        tokens,
        vec![
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::StartMultipart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::Field,
            Token::EndHeader,
            Token::StartMultipart,
            Token::StartBodypart,
            Token::StartHeader,
            Token::EndHeader,
            Token::Body,
            Token::EndBodypart,
            // The inner multipart closes directly, with no Epilogue
            // fabricated for the close-delimiter it never saw.
            Token::EndMultipart,
            Token::EndBodypart,
            Token::Epilogue,
            Token::EndMultipart,
            Token::EndMessage,
            Token::EndOfStream,
        ]
    );

    // The outer multipart's own close-delimiter was genuinely found, so
    // this is not flagged as an unexpected EOF.
    assert!(!stream.unexpected_eof());
}
